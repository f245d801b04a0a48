//! Route table client: one entry point for add, delete and dump.

use crate::codec::Operation;
use crate::dump::{DumpCursor, DumpStream};
use crate::error::{Result, ValidationError};
use crate::request::{RequestBuilder, RouteParams};
use crate::transport::Transport;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vrouter_types::{AddressFamily, RouteKey};

/// Drives route operations over a [`Transport`].
pub struct RouteClient<T: Transport> {
    transport: T,
    builder: RequestBuilder,
    cancel: Option<Arc<AtomicBool>>,
}

impl<T: Transport> RouteClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            builder: RequestBuilder::new(),
            cancel: None,
        }
    }

    /// Dumps started by this client stop between rounds once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Validates and sends one add or delete request, then waits for the
    /// acknowledgement.
    ///
    /// Nothing is sent when validation fails. The request is never
    /// retried. For [`Operation::Dump`] use [`RouteClient::dump`]; passing it
    /// here sends a single round and discards the records.
    #[instrument(skip(self, params))]
    pub fn execute(
        &mut self,
        operation: Operation,
        family: AddressFamily,
        params: &RouteParams,
    ) -> Result<()> {
        let request = self.builder.build(operation, family, params)?;

        self.transport.send(&request)?;
        let batch = self.transport.receive()?;
        if !batch.records.is_empty() {
            warn!(
                records = batch.records.len(),
                "Ignoring records in acknowledgement"
            );
        }

        info!(vrf = request.vrf_id, "Route request acknowledged");
        Ok(())
    }

    /// Starts a dump of one table, from the beginning or after `resume_after`.
    ///
    /// Nothing is sent until the stream is polled.
    pub fn dump(
        &mut self,
        family: AddressFamily,
        vrf_id: i32,
        resume_after: Option<RouteKey>,
    ) -> Result<DumpStream<'_, T>> {
        let cursor = match resume_after {
            Some(key) if key.family() != family => {
                return Err(ValidationError::InvalidField {
                    operation: Operation::Dump,
                    family,
                    field: "marker",
                    reason: format!("{key} is not a {family} key"),
                }
                .into());
            }
            Some(key) => DumpCursor::resume_after(vrf_id, key),
            None => DumpCursor::new(family, vrf_id),
        };
        debug!(%family, vrf = vrf_id, marker = %cursor.marker(), "Starting dump");

        let mut stream = DumpStream::new(&mut self.transport, cursor).with_builder(self.builder);
        if let Some(flag) = &self.cancel {
            stream = stream.with_cancel_flag(Arc::clone(flag));
        }
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RouteMessage;
    use crate::error::{RtError, TransportError};
    use crate::transport::{MockTransport, ResponseBatch};
    use mockall::predicate::function;
    use vrouter_types::MacAddress;

    fn bridge_add() -> RouteParams {
        RouteParams {
            vrf_id: Some(3),
            next_hop_id: Some(7),
            dst_mac: Some("AA:BB:CC:DD:EE:FF".parse().unwrap()),
            ..RouteParams::default()
        }
    }

    #[test]
    fn test_bridge_add_sent_once() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|m: &RouteMessage| {
                m.operation == Operation::Add
                    && m.family_tag == AddressFamily::Bridge.wire_tag()
                    && m.vrf_id == 3
                    && m.next_hop_id == 7
                    && m.mac == MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]).octets()
            }))
            .times(1)
            .returning(|_| Ok(()));
        transport
            .expect_receive()
            .times(1)
            .returning(|| Ok(ResponseBatch::ack()));

        let mut client = RouteClient::new(transport);
        client
            .execute(Operation::Add, AddressFamily::Bridge, &bridge_add())
            .unwrap();
    }

    #[test]
    fn test_validation_failure_sends_nothing() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        transport.expect_receive().never();

        let mut client = RouteClient::new(transport);
        let params = RouteParams {
            vrf_id: Some(0),
            next_hop_id: Some(1),
            prefix: Some("10.0.0.0".parse().unwrap()),
            prefix_len: Some(8),
            replace_prefix_len: Some(33),
            ..RouteParams::default()
        };
        let err = client
            .execute(Operation::Delete, AddressFamily::Inet, &params)
            .unwrap_err();
        assert!(matches!(
            err,
            RtError::Validation(ValidationError::InvalidField {
                field: "replacement prefix length",
                ..
            })
        ));
    }

    #[test]
    fn test_rejection_is_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| Ok(()));
        transport
            .expect_receive()
            .times(1)
            .returning(|| Err(TransportError::Rejected { errno: 17 }));

        let mut client = RouteClient::new(transport);
        let err = client
            .execute(Operation::Add, AddressFamily::Bridge, &bridge_add())
            .unwrap_err();
        assert!(matches!(
            err,
            RtError::Transport(TransportError::Rejected { errno: 17 })
        ));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_dump_resume_uses_key_family() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .with(function(|m: &RouteMessage| m.marker == vec![10, 0, 1, 0]))
            .times(1)
            .returning(|_| Ok(()));
        transport
            .expect_receive()
            .times(1)
            .returning(|| Ok(ResponseBatch::new(Vec::new(), false)));

        let mut client = RouteClient::new(transport);
        let key: RouteKey = "10.0.1.0/24".parse().unwrap();
        let records: Vec<_> = client
            .dump(AddressFamily::Inet, 0, Some(key))
            .unwrap()
            .collect();
        assert!(records.is_empty());
    }

    #[test]
    fn test_dump_resume_family_mismatch() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let mut client = RouteClient::new(transport);
        let key: RouteKey = "10.0.1.0/24".parse().unwrap();
        let err = client
            .dump(AddressFamily::Bridge, 0, Some(key))
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
