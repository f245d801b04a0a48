//! Route keys: the identity of a forwarding entry and the dump marker.

use crate::{AddressFamily, MacAddress, ParseError};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Identity of one forwarding entry.
///
/// IP keys are a prefix plus its length; bridge keys are a MAC address with
/// an implied length of 48 bits. The derived ordering is the canonical key
/// order used for pagination: numeric prefix first, then prefix length, and
/// numeric MAC for the bridge table.
///
/// # Examples
///
/// ```
/// use vrouter_types::{AddressFamily, RouteKey};
///
/// let a: RouteKey = "10.0.0.0/24".parse().unwrap();
/// let b: RouteKey = "10.0.1.0/24".parse().unwrap();
/// assert!(a < b);
/// assert_eq!(a.family(), AddressFamily::Inet);
/// assert!(RouteKey::zero(AddressFamily::Inet) < a);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteKey {
    Inet { prefix: Ipv4Addr, prefix_len: u8 },
    Inet6 { prefix: Ipv6Addr, prefix_len: u8 },
    Bridge { mac: MacAddress },
}

impl RouteKey {
    /// The lowest key of a family: all-zero address, length 0 (or the zero
    /// MAC for the bridge table).
    pub const fn zero(family: AddressFamily) -> Self {
        match family {
            AddressFamily::Inet => RouteKey::Inet {
                prefix: Ipv4Addr::UNSPECIFIED,
                prefix_len: 0,
            },
            AddressFamily::Inet6 => RouteKey::Inet6 {
                prefix: Ipv6Addr::UNSPECIFIED,
                prefix_len: 0,
            },
            AddressFamily::Bridge => RouteKey::Bridge {
                mac: MacAddress::ZERO,
            },
        }
    }

    /// Builds an IP key, rejecting lengths beyond the family bit width.
    pub fn new_ip(prefix: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        let key = match prefix {
            IpAddr::V4(prefix) => RouteKey::Inet { prefix, prefix_len },
            IpAddr::V6(prefix) => RouteKey::Inet6 { prefix, prefix_len },
        };
        let family = key.family();
        if prefix_len > family.bit_width() {
            return Err(ParseError::PrefixTooLong {
                family,
                len: prefix_len,
                max: family.bit_width(),
            });
        }
        Ok(key)
    }

    pub const fn bridge(mac: MacAddress) -> Self {
        RouteKey::Bridge { mac }
    }

    /// Builds a key from raw octets as they travel on the wire.
    ///
    /// `octets` must be exactly [`AddressFamily::address_size`] bytes long.
    /// `prefix_len` is ignored for the bridge table.
    pub fn from_octets(
        family: AddressFamily,
        octets: &[u8],
        prefix_len: u8,
    ) -> Result<Self, ParseError> {
        if octets.len() != family.address_size() {
            return Err(ParseError::AddressSize {
                family,
                expected: family.address_size(),
                actual: octets.len(),
            });
        }

        match family {
            AddressFamily::Inet => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(octets);
                Self::new_ip(IpAddr::V4(Ipv4Addr::from(buf)), prefix_len)
            }
            AddressFamily::Inet6 => {
                let mut buf = [0u8; 16];
                buf.copy_from_slice(octets);
                Self::new_ip(IpAddr::V6(Ipv6Addr::from(buf)), prefix_len)
            }
            AddressFamily::Bridge => MacAddress::from_slice(octets).map(RouteKey::bridge),
        }
    }

    pub const fn family(&self) -> AddressFamily {
        match self {
            RouteKey::Inet { .. } => AddressFamily::Inet,
            RouteKey::Inet6 { .. } => AddressFamily::Inet6,
            RouteKey::Bridge { .. } => AddressFamily::Bridge,
        }
    }

    /// Prefix length in bits; always 48 for bridge keys.
    pub const fn prefix_len(&self) -> u8 {
        match self {
            RouteKey::Inet { prefix_len, .. } | RouteKey::Inet6 { prefix_len, .. } => *prefix_len,
            RouteKey::Bridge { .. } => AddressFamily::Bridge.bit_width(),
        }
    }

    /// Key octets, exactly `family().address_size()` bytes.
    pub fn octets(&self) -> Vec<u8> {
        match self {
            RouteKey::Inet { prefix, .. } => prefix.octets().to_vec(),
            RouteKey::Inet6 { prefix, .. } => prefix.octets().to_vec(),
            RouteKey::Bridge { mac } => mac.octets().to_vec(),
        }
    }

    /// The IP prefix address, if this is an IP key.
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            RouteKey::Inet { prefix, .. } => Some(IpAddr::V4(*prefix)),
            RouteKey::Inet6 { prefix, .. } => Some(IpAddr::V6(*prefix)),
            RouteKey::Bridge { .. } => None,
        }
    }

    /// The MAC address, if this is a bridge key.
    pub fn mac(&self) -> Option<MacAddress> {
        match self {
            RouteKey::Bridge { mac } => Some(*mac),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero(self.family())
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKey::Inet { prefix, prefix_len } => write!(f, "{prefix}/{prefix_len}"),
            RouteKey::Inet6 { prefix, prefix_len } => write!(f, "{prefix}/{prefix_len}"),
            RouteKey::Bridge { mac } => write!(f, "{mac}"),
        }
    }
}

impl FromStr for RouteKey {
    type Err = ParseError;

    /// Parses `addr/len` as an IP key and anything else as a MAC.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((addr, len)) = s.rsplit_once('/') else {
            return s.parse::<MacAddress>().map(RouteKey::bridge);
        };

        let invalid = || ParseError::InvalidRouteKey(s.to_string());
        let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
        let len: u8 = len.parse().map_err(|_| invalid())?;
        Self::new_ip(addr, len)
    }
}
