//! Command line interface of `rt`.

use crate::codec::Operation;
use crate::config::DEFAULT_CONFIG_PATH;
use crate::flags::ArpFlags;
use crate::request::RouteParams;
use clap::{ArgGroup, Parser};
use std::net::IpAddr;
use std::path::PathBuf;
use vrouter_types::{AddressFamily, MacAddress, RouteKey};

/// Create, delete and dump vRouter forwarding tables
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "rt", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["create", "delete", "dump", "dump_vrf"]),
))]
pub struct Cli {
    /// Create a route
    #[arg(short = 'c')]
    pub create: bool,

    /// Delete a route
    #[arg(short = 'd')]
    pub delete: bool,

    /// Dump the table of the VRF given with -v
    #[arg(short = 'b')]
    pub dump: bool,

    /// Dump the table of VRF <VRF_ID>
    #[arg(long = "dump", value_name = "VRF_ID", conflicts_with = "vrf_id")]
    pub dump_vrf: Option<i32>,

    /// VRF id
    #[arg(short = 'v', value_name = "VRF_ID")]
    pub vrf_id: Option<i32>,

    /// Next hop id
    #[arg(short = 'n', value_name = "NH_ID", allow_negative_numbers = true)]
    pub next_hop_id: Option<i32>,

    /// Route prefix (IPv4 or IPv6 address)
    #[arg(short = 'p', value_name = "PREFIX")]
    pub prefix: Option<IpAddr>,

    /// Prefix length
    #[arg(short = 'l', value_name = "LEN")]
    pub prefix_len: Option<u8>,

    /// MPLS label or VNID
    #[arg(short = 't', value_name = "LABEL")]
    pub label: Option<u32>,

    /// Table selector: 0 inet, 1 bridge, 2 inet6
    #[arg(short = 'f', value_name = "0|1|2", value_parser = parse_selector)]
    pub selector: Option<AddressFamily>,

    /// Table by name: inet, inet6 or bridge
    #[arg(long = "family", value_name = "FAMILY", conflicts_with = "selector")]
    pub family: Option<AddressFamily>,

    /// Destination MAC address
    #[arg(short = 'e', value_name = "MAC")]
    pub dst_mac: Option<MacAddress>,

    /// Replacement route prefix length (delete only)
    #[arg(short = 'r', value_name = "LEN")]
    pub replace_prefix_len: Option<u8>,

    /// Proxy ARP for this route
    #[arg(short = 'P')]
    pub proxy: bool,

    /// Trap ARP requests to the agent for this route
    #[arg(short = 'T')]
    pub trap: bool,

    /// Flood ARP for this route
    #[arg(short = 'F')]
    pub flood: bool,

    /// Configuration file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Resume a dump after this key (prefix/len or MAC)
    #[arg(long, value_name = "KEY")]
    pub resume_after: Option<RouteKey>,
}

fn parse_selector(value: &str) -> Result<AddressFamily, String> {
    let selector: u8 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a table selector"))?;
    AddressFamily::from_selector(selector).map_err(|e| e.to_string())
}

impl Cli {
    pub fn operation(&self) -> Operation {
        if self.create {
            Operation::Add
        } else if self.delete {
            Operation::Delete
        } else {
            Operation::Dump
        }
    }

    /// Table chosen with -f or --family, else `default`.
    pub fn family_or(&self, default: AddressFamily) -> AddressFamily {
        self.selector.or(self.family).unwrap_or(default)
    }

    pub fn vrf(&self) -> Option<i32> {
        self.dump_vrf.or(self.vrf_id)
    }

    pub fn params(&self) -> RouteParams {
        RouteParams {
            vrf_id: self.vrf(),
            next_hop_id: self.next_hop_id,
            prefix: self.prefix,
            prefix_len: self.prefix_len,
            label: self.label,
            dst_mac: self.dst_mac,
            replace_prefix_len: self.replace_prefix_len,
            arp: ArpFlags {
                proxy: self.proxy,
                trap: self.trap,
                flood: self.flood,
            },
            marker: self.resume_after,
        }
    }
}
