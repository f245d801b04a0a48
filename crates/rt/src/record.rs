//! Decoded forwarding entries.

use crate::flags::RouteFlags;
use vrouter_types::{AddressFamily, MacAddress, RouteKey};

/// Resolved link-layer address attached to an IP route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchedMac {
    pub mac: MacAddress,
    /// Index reported alongside the MAC, when the engine sends one.
    pub index: Option<i32>,
}

/// One forwarding entry returned by the engine.
///
/// Records are built fresh for every response message and handed to the
/// presenter by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub key: RouteKey,
    pub vrf_id: i32,
    /// Length of the covering route used when this one is deleted.
    pub replace_prefix_len: u8,
    pub flags: RouteFlags,
    /// Label or VNID; present only when the label-valid flag is set.
    pub label: Option<i32>,
    pub next_hop_id: i32,
    /// IP families only.
    pub stitched_mac: Option<StitchedMac>,
    /// Bridge table slot; bridge entries only.
    pub entry_index: Option<i32>,
}

impl RouteRecord {
    pub fn family(&self) -> AddressFamily {
        self.key.family()
    }
}
