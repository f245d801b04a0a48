//! Validation and encoding of add, delete and dump requests.
//!
//! | Operation | Family      | Required                                              |
//! |-----------|-------------|-------------------------------------------------------|
//! | add       | inet/inet6  | prefix, prefix length, next hop >= 0, vrf >= 0;        |
//! |           |             | replacement prefix length, if given, <= bit width     |
//! | add       | bridge      | destination MAC, vrf >= 0, next hop >= 0              |
//! | delete    | inet/inet6  | as add, plus replacement prefix length <= bit width  |
//! | delete    | bridge      | destination MAC, vrf >= 0                             |
//! | dump      | any         | vrf >= 0                                              |

use crate::codec::{Operation, RouteMessage};
use crate::error::ValidationError;
use crate::flags::{ArpFlags, BridgeEntryFlags, InetRouteFlags};
use std::net::IpAddr;
use vrouter_types::{AddressFamily, MacAddress, RouteKey};

/// Parameters of a route operation as collected from the user.
///
/// Everything is optional; [`RequestBuilder::build`] decides what the
/// operation and family need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub vrf_id: Option<i32>,
    pub next_hop_id: Option<i32>,
    pub prefix: Option<IpAddr>,
    pub prefix_len: Option<u8>,
    /// MPLS label or VNID.
    pub label: Option<u32>,
    pub dst_mac: Option<MacAddress>,
    pub replace_prefix_len: Option<u8>,
    /// Meaningful for IP routes only; ignored for the bridge table.
    pub arp: ArpFlags,
    /// Dump only: resume after this key.
    pub marker: Option<RouteKey>,
}

impl RouteParams {
    /// Parameters of one dump round.
    pub fn dump(vrf_id: i32, marker: Option<RouteKey>) -> Self {
        Self {
            vrf_id: Some(vrf_id),
            marker,
            ..Self::default()
        }
    }
}

/// Builds wire requests from validated parameters. Pure; never touches the
/// transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &self,
        operation: Operation,
        family: AddressFamily,
        params: &RouteParams,
    ) -> Result<RouteMessage, ValidationError> {
        let check = Check {
            operation,
            family,
        };

        let mut msg = RouteMessage::new(operation, family.wire_tag());
        msg.vrf_id = check.non_negative("vrf id", params.vrf_id)?;

        match operation {
            Operation::Dump => self.fill_dump(&check, params, &mut msg)?,
            Operation::Add | Operation::Delete if family.is_ip() => {
                self.fill_ip(&check, params, &mut msg)?
            }
            Operation::Add | Operation::Delete => self.fill_bridge(&check, params, &mut msg)?,
        }

        Ok(msg)
    }

    fn fill_dump(
        &self,
        check: &Check,
        params: &RouteParams,
        msg: &mut RouteMessage,
    ) -> Result<(), ValidationError> {
        let Some(marker) = params.marker else {
            return Ok(());
        };
        if marker.family() != check.family {
            return Err(check.invalid(
                "marker",
                format!("{marker} is not a {} key", check.family),
            ));
        }
        msg.marker = marker.octets();
        msg.marker_prefix_len = marker.prefix_len();
        Ok(())
    }

    fn fill_ip(
        &self,
        check: &Check,
        params: &RouteParams,
        msg: &mut RouteMessage,
    ) -> Result<(), ValidationError> {
        let family = check.family;
        let prefix = check.required("prefix", params.prefix)?;
        let prefix_len = check.required("prefix length", params.prefix_len)?;
        msg.next_hop_id = check.non_negative("next hop id", params.next_hop_id)?;

        let key = RouteKey::new_ip(prefix, prefix_len)
            .map_err(|e| check.invalid("prefix length", e.to_string()))?;
        if key.family() != family {
            return Err(check.invalid(
                "prefix",
                format!("{prefix} is not an {family} address"),
            ));
        }

        let replace = match check.operation {
            Operation::Delete => {
                Some(check.required("replacement prefix length", params.replace_prefix_len)?)
            }
            _ => params.replace_prefix_len,
        };
        if let Some(replace) = replace {
            if replace > family.bit_width() {
                return Err(check.invalid(
                    "replacement prefix length",
                    format!("{replace} exceeds {} bits", family.bit_width()),
                ));
            }
            msg.replace_prefix_len = replace;
        }

        let mut flags = InetRouteFlags::from(params.arp);
        if let Some(label) = params.label {
            msg.label = check.label(label)?;
            flags |= InetRouteFlags::LABEL_VALID;
        }

        msg.prefix = key.octets();
        msg.prefix_len = key.prefix_len();
        msg.label_flags = flags.bits();
        if let Some(mac) = params.dst_mac {
            msg.mac = mac.octets().to_vec();
        }
        Ok(())
    }

    fn fill_bridge(
        &self,
        check: &Check,
        params: &RouteParams,
        msg: &mut RouteMessage,
    ) -> Result<(), ValidationError> {
        let mac = check.required("destination MAC", params.dst_mac)?;
        msg.next_hop_id = match check.operation {
            Operation::Add => check.non_negative("next hop id", params.next_hop_id)?,
            _ => params.next_hop_id.unwrap_or(-1),
        };

        let mut flags = BridgeEntryFlags::empty();
        if let Some(label) = params.label {
            msg.label = check.label(label)?;
            flags |= BridgeEntryFlags::LABEL_VALID;
        }

        msg.mac = mac.octets().to_vec();
        msg.label_flags = flags.bits();
        Ok(())
    }
}

struct Check {
    operation: Operation,
    family: AddressFamily,
}

impl Check {
    fn missing(&self, field: &'static str) -> ValidationError {
        ValidationError::MissingField {
            operation: self.operation,
            family: self.family,
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: String) -> ValidationError {
        ValidationError::InvalidField {
            operation: self.operation,
            family: self.family,
            field,
            reason,
        }
    }

    fn required<T>(&self, field: &'static str, value: Option<T>) -> Result<T, ValidationError> {
        value.ok_or_else(|| self.missing(field))
    }

    fn non_negative(&self, field: &'static str, value: Option<i32>) -> Result<i32, ValidationError> {
        let value = self.required(field, value)?;
        if value < 0 {
            return Err(self.invalid(field, format!("{value} is negative")));
        }
        Ok(value)
    }

    fn label(&self, label: u32) -> Result<i32, ValidationError> {
        i32::try_from(label).map_err(|_| self.invalid("label", format!("{label} is out of range")))
    }
}
