//! Forwarding table address families.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linux socket family numbers used as wire tags.
const AF_INET: u8 = 2;
const AF_BRIDGE: u8 = 7;
const AF_INET6: u8 = 10;

/// One of the forwarding tables held by the vRouter.
///
/// The family fixes the width of the key: 4 bytes for IPv4 prefixes,
/// 16 bytes for IPv6 prefixes and 6 bytes for bridge (MAC) entries.
///
/// # Examples
///
/// ```
/// use vrouter_types::AddressFamily;
///
/// let family: AddressFamily = "inet6".parse().unwrap();
/// assert_eq!(family.address_size(), 16);
/// assert_eq!(family.bit_width(), 128);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4 unicast routes
    #[default]
    Inet,
    /// IPv6 unicast routes
    Inet6,
    /// Layer 2 bridge table keyed by MAC address
    Bridge,
}

impl AddressFamily {
    /// All families, in selector order.
    pub const ALL: [AddressFamily; 3] = [
        AddressFamily::Inet,
        AddressFamily::Bridge,
        AddressFamily::Inet6,
    ];

    /// Number of key bytes for this family.
    pub const fn address_size(self) -> usize {
        match self {
            AddressFamily::Inet => 4,
            AddressFamily::Inet6 => 16,
            AddressFamily::Bridge => 6,
        }
    }

    /// Number of key bits; the upper bound of a prefix length.
    pub const fn bit_width(self) -> u8 {
        match self {
            AddressFamily::Inet => 32,
            AddressFamily::Inet6 => 128,
            AddressFamily::Bridge => 48,
        }
    }

    /// Returns true for the IP unicast families.
    pub const fn is_ip(self) -> bool {
        matches!(self, AddressFamily::Inet | AddressFamily::Inet6)
    }

    /// The family number carried on the wire.
    pub const fn wire_tag(self) -> u8 {
        match self {
            AddressFamily::Inet => AF_INET,
            AddressFamily::Inet6 => AF_INET6,
            AddressFamily::Bridge => AF_BRIDGE,
        }
    }

    /// Maps a wire family number back to a family.
    pub fn from_wire_tag(tag: u8) -> Result<Self, ParseError> {
        match tag {
            AF_INET => Ok(AddressFamily::Inet),
            AF_INET6 => Ok(AddressFamily::Inet6),
            AF_BRIDGE => Ok(AddressFamily::Bridge),
            other => Err(ParseError::UnknownFamilyTag(other)),
        }
    }

    /// Maps the numeric command line selector (0 = inet, 1 = bridge,
    /// 2 = inet6) to a family.
    pub fn from_selector(selector: u8) -> Result<Self, ParseError> {
        Self::ALL
            .get(usize::from(selector))
            .copied()
            .ok_or_else(|| ParseError::InvalidFamily(selector.to_string()))
    }

    /// Short label used in table captions ("inet4", "inet6", "bridge").
    pub const fn table_label(self) -> &'static str {
        match self {
            AddressFamily::Inet => "inet4",
            AddressFamily::Inet6 => "inet6",
            AddressFamily::Bridge => "bridge",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressFamily::Inet => "inet",
            AddressFamily::Inet6 => "inet6",
            AddressFamily::Bridge => "bridge",
        };
        f.write_str(name)
    }
}

impl FromStr for AddressFamily {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inet" | "inet4" | "ipv4" => Ok(AddressFamily::Inet),
            "inet6" | "ipv6" => Ok(AddressFamily::Inet6),
            "bridge" => Ok(AddressFamily::Bridge),
            _ => Err(ParseError::InvalidFamily(s.to_string())),
        }
    }
}
