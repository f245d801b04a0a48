//! Route label flags and their display legend.
//!
//! The same numeric bit means different things in the IP route tables and
//! in the bridge table, so each gets its own bitset type and its own legend.

use bitflags::bitflags;
use std::fmt;
use vrouter_types::AddressFamily;

bitflags! {
    /// Label flags of an inet or inet6 route.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InetRouteFlags: u16 {
        const LABEL_VALID = 0x01;
        const ARP_PROXY = 0x02;
        const ARP_TRAP = 0x04;
        const ARP_FLOOD = 0x08;
    }
}

bitflags! {
    /// Label flags of a bridge table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BridgeEntryFlags: u16 {
        const LABEL_VALID = 0x02;
        const DHCP_FLOOD = 0x04;
    }
}

/// ARP handling requested for an IP route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArpFlags {
    pub proxy: bool,
    pub trap: bool,
    pub flood: bool,
}

impl From<ArpFlags> for InetRouteFlags {
    fn from(arp: ArpFlags) -> Self {
        let mut flags = InetRouteFlags::empty();
        flags.set(InetRouteFlags::ARP_PROXY, arp.proxy);
        flags.set(InetRouteFlags::ARP_TRAP, arp.trap);
        flags.set(InetRouteFlags::ARP_FLOOD, arp.flood);
        flags
    }
}

impl From<InetRouteFlags> for ArpFlags {
    fn from(flags: InetRouteFlags) -> Self {
        Self {
            proxy: flags.contains(InetRouteFlags::ARP_PROXY),
            trap: flags.contains(InetRouteFlags::ARP_TRAP),
            flood: flags.contains(InetRouteFlags::ARP_FLOOD),
        }
    }
}

/// Flags of a decoded record, tagged with the table they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteFlags {
    Inet(InetRouteFlags),
    Bridge(BridgeEntryFlags),
}

impl RouteFlags {
    /// Interprets raw wire bits for `family`; unknown bits are dropped.
    pub fn from_wire(family: AddressFamily, bits: u16) -> Self {
        if family.is_ip() {
            RouteFlags::Inet(InetRouteFlags::from_bits_truncate(bits))
        } else {
            RouteFlags::Bridge(BridgeEntryFlags::from_bits_truncate(bits))
        }
    }

    pub fn bits(&self) -> u16 {
        match self {
            RouteFlags::Inet(flags) => flags.bits(),
            RouteFlags::Bridge(flags) => flags.bits(),
        }
    }

    pub fn label_valid(&self) -> bool {
        match self {
            RouteFlags::Inet(flags) => flags.contains(InetRouteFlags::LABEL_VALID),
            RouteFlags::Bridge(flags) => flags.contains(BridgeEntryFlags::LABEL_VALID),
        }
    }

    /// ARP flags; always all-false for bridge entries.
    pub fn arp(&self) -> ArpFlags {
        match self {
            RouteFlags::Inet(flags) => ArpFlags::from(*flags),
            RouteFlags::Bridge(_) => ArpFlags::default(),
        }
    }

    /// Short symbols of the set flags, in legend order (e.g. `LPF`).
    pub fn symbols(&self) -> String {
        let bits = self.bits();
        let legend = match self {
            RouteFlags::Inet(_) => INET_LEGEND,
            RouteFlags::Bridge(_) => BRIDGE_LEGEND,
        };
        legend
            .iter()
            .filter(|entry| bits & entry.bit != 0)
            .map(|entry| entry.symbol)
            .collect()
    }
}

/// One legend line: flag bit, short symbol, description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegendEntry {
    pub bit: u16,
    pub symbol: &'static str,
    pub description: &'static str,
}

/// Legend shared by the inet and inet6 tables.
pub const INET_LEGEND: &[LegendEntry] = &[
    LegendEntry {
        bit: InetRouteFlags::LABEL_VALID.bits(),
        symbol: "L",
        description: "Label Valid",
    },
    LegendEntry {
        bit: InetRouteFlags::ARP_PROXY.bits(),
        symbol: "P",
        description: "Proxy ARP",
    },
    LegendEntry {
        bit: InetRouteFlags::ARP_TRAP.bits(),
        symbol: "T",
        description: "Trap ARP",
    },
    LegendEntry {
        bit: InetRouteFlags::ARP_FLOOD.bits(),
        symbol: "F",
        description: "Flood ARP",
    },
];

/// Legend of the bridge table.
pub const BRIDGE_LEGEND: &[LegendEntry] = &[
    LegendEntry {
        bit: BridgeEntryFlags::LABEL_VALID.bits(),
        symbol: "L",
        description: "Label Valid",
    },
    LegendEntry {
        bit: BridgeEntryFlags::DHCP_FLOOD.bits(),
        symbol: "Df",
        description: "DHCP flood",
    },
];

/// Legend entries for `family`, in display order.
pub fn symbols_for(family: AddressFamily) -> &'static [LegendEntry] {
    match family {
        AddressFamily::Inet | AddressFamily::Inet6 => INET_LEGEND,
        AddressFamily::Bridge => BRIDGE_LEGEND,
    }
}

/// Legend caption printed above a dump table.
#[derive(Debug, Clone, Copy)]
pub struct Legend(pub AddressFamily);

impl fmt::Display for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Flags: ")?;
        for (i, entry) in symbols_for(self.0).iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", entry.symbol, entry.description)?;
        }
        Ok(())
    }
}
