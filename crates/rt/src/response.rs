//! Turns received route objects into [`RouteRecord`]s.

use crate::codec::{RouteMessage, WireRecord};
use crate::error::DecodeError;
use crate::flags::RouteFlags;
use crate::record::{RouteRecord, StitchedMac};
use tracing::trace;
use vrouter_types::{AddressFamily, MacAddress, RouteKey};

/// Family-aware decoder for response records.
///
/// A record that cannot be decoded is an error, never skipped: the dump
/// marker must always be the key of the last record actually seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decodes one wire record, dispatching on its family tag.
    pub fn decode(&self, wire: &WireRecord) -> Result<RouteRecord, DecodeError> {
        let message = RouteMessage::decode(wire.as_bytes())?;
        let family = AddressFamily::from_wire_tag(message.family_tag)
            .map_err(|_| DecodeError::UnknownFamily(message.family_tag))?;

        let record = match family {
            AddressFamily::Inet | AddressFamily::Inet6 => decode_ip(family, &message)?,
            AddressFamily::Bridge => decode_bridge(&message)?,
        };

        trace!(key = %record.key, nh = record.next_hop_id, "decoded route record");
        Ok(record)
    }
}

fn decode_ip(family: AddressFamily, message: &RouteMessage) -> Result<RouteRecord, DecodeError> {
    expect_size(family, "prefix", &message.prefix, family.address_size())?;
    let key = RouteKey::from_octets(family, &message.prefix, message.prefix_len)?;

    let stitched_mac = match message.mac.len() {
        0 => None,
        MacAddress::LEN => Some(StitchedMac {
            mac: MacAddress::from_slice(&message.mac)?,
            index: (message.index >= 0).then_some(message.index),
        }),
        _ => {
            expect_size(family, "stitched MAC", &message.mac, MacAddress::LEN)?;
            None
        }
    };

    let flags = RouteFlags::from_wire(family, message.label_flags);
    Ok(RouteRecord {
        key,
        vrf_id: message.vrf_id,
        replace_prefix_len: message.replace_prefix_len,
        label: flags.label_valid().then_some(message.label),
        flags,
        next_hop_id: message.next_hop_id,
        stitched_mac,
        entry_index: None,
    })
}

fn decode_bridge(message: &RouteMessage) -> Result<RouteRecord, DecodeError> {
    let family = AddressFamily::Bridge;
    expect_size(family, "MAC", &message.mac, MacAddress::LEN)?;
    let key = RouteKey::bridge(MacAddress::from_slice(&message.mac)?);

    let flags = RouteFlags::from_wire(family, message.label_flags);
    Ok(RouteRecord {
        key,
        vrf_id: message.vrf_id,
        replace_prefix_len: message.replace_prefix_len,
        label: flags.label_valid().then_some(message.label),
        flags,
        next_hop_id: message.next_hop_id,
        stitched_mac: None,
        entry_index: Some(message.index),
    })
}

fn expect_size(
    family: AddressFamily,
    field: &'static str,
    bytes: &[u8],
    expected: usize,
) -> Result<(), DecodeError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(DecodeError::AddressSize {
            family,
            field,
            expected,
            actual: bytes.len(),
        })
    }
}
