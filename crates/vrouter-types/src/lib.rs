//! Value types shared by the vRouter route table client.
//!
//! - [`AddressFamily`]: the three forwarding tables (inet, inet6, bridge)
//! - [`MacAddress`]: 48-bit Ethernet addresses used as bridge table keys
//! - [`RouteKey`]: the identity of a forwarding entry, ordered the way the
//!   forwarding engine walks its tables during a dump

mod family;
mod key;
mod mac;

pub use family::AddressFamily;
pub use key::RouteKey;
pub use mac::MacAddress;

/// Rejected textual or binary input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address: {0}")]
    InvalidMacAddress(String),

    #[error("invalid address family: {0}")]
    InvalidFamily(String),

    #[error("unknown address family tag {0}")]
    UnknownFamilyTag(u8),

    #[error("invalid route key: {0}")]
    InvalidRouteKey(String),

    #[error("prefix length {len} exceeds {max} bits for {family}")]
    PrefixTooLong {
        family: AddressFamily,
        len: u8,
        max: u8,
    },

    #[error("{family} key needs {expected} bytes, got {actual}")]
    AddressSize {
        family: AddressFamily,
        expected: usize,
        actual: usize,
    },
}
