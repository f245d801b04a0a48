//! Request/response exchange with the forwarding engine.
//!
//! The engine and client only see the [`Transport`] trait. The netlink
//! implementation lives in [`crate::netlink`]; [`ScriptedTransport`] replays
//! canned responses for tests and offline use.

use crate::codec::{Frame, RouteMessage, WireRecord, DUMP_INCOMPLETE};
use crate::error::TransportError;
use std::collections::VecDeque;
use tracing::trace;

/// Records returned for one request, plus the continuation indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseBatch {
    pub records: Vec<WireRecord>,
    /// Set while the engine holds more dump records past the last one sent.
    pub more_pending: bool,
}

impl ResponseBatch {
    pub fn new(records: Vec<WireRecord>, more_pending: bool) -> Self {
        Self {
            records,
            more_pending,
        }
    }

    /// An acknowledgement without records.
    pub fn ack() -> Self {
        Self::default()
    }

    /// Interprets a complete response frame.
    ///
    /// A negative status is the errno of a rejected request. Otherwise the
    /// incomplete bit of the status is the continuation indicator.
    pub fn from_frame(frame: Frame) -> Result<Self, TransportError> {
        let status = frame.status.ok_or(TransportError::MissingStatus)?;
        if status < 0 {
            return Err(TransportError::Rejected { errno: -status });
        }
        Ok(Self {
            records: frame.records,
            more_pending: status & DUMP_INCOMPLETE != 0,
        })
    }

    /// The frame a server would send for this batch.
    pub fn to_frame(&self) -> Frame {
        let status = if self.more_pending { DUMP_INCOMPLETE } else { 0 };
        Frame::new(self.records.clone(), Some(status))
    }
}

/// Blocking, single-outstanding-request exchange with the forwarding engine.
///
/// Callers send one request and receive its response before sending the
/// next. Any timeout is the implementation's business.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn send(&mut self, request: &RouteMessage) -> Result<(), TransportError>;

    fn receive(&mut self) -> Result<ResponseBatch, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, request: &RouteMessage) -> Result<(), TransportError> {
        (**self).send(request)
    }

    fn receive(&mut self) -> Result<ResponseBatch, TransportError> {
        (**self).receive()
    }
}

/// In-memory transport that replays queued responses in order and keeps
/// every request it was given.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<Result<ResponseBatch, TransportError>>,
    sent: Vec<RouteMessage>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_batch(&mut self, batch: ResponseBatch) -> &mut Self {
        self.replies.push_back(Ok(batch));
        self
    }

    /// Queues a failed exchange.
    pub fn push_error(&mut self, error: TransportError) -> &mut Self {
        self.replies.push_back(Err(error));
        self
    }

    /// Requests sent so far, oldest first.
    pub fn sent(&self) -> &[RouteMessage] {
        &self.sent
    }

    /// Responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, request: &RouteMessage) -> Result<(), TransportError> {
        trace!(op = %request.operation, vrf = request.vrf_id, "scripted send");
        self.sent.push(request.clone());
        Ok(())
    }

    fn receive(&mut self) -> Result<ResponseBatch, TransportError> {
        // Running dry looks like a peer that never answers.
        self.replies.pop_front().unwrap_or(Err(TransportError::Timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Operation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_frame_continuation() {
        let record = WireRecord(vec![1, 2, 3]);
        let batch =
            ResponseBatch::from_frame(Frame::new(vec![record.clone()], Some(DUMP_INCOMPLETE)))
                .unwrap();
        assert_eq!(batch, ResponseBatch::new(vec![record], true));

        let last = ResponseBatch::from_frame(Frame::new(Vec::new(), Some(3))).unwrap();
        assert!(!last.more_pending);
    }

    #[test]
    fn test_from_frame_negative_status() {
        let err = ResponseBatch::from_frame(Frame::new(Vec::new(), Some(-17))).unwrap_err();
        assert!(matches!(err, TransportError::Rejected { errno: 17 }));
    }

    #[test]
    fn test_from_frame_without_status() {
        let err = ResponseBatch::from_frame(Frame::default()).unwrap_err();
        assert!(matches!(err, TransportError::MissingStatus));
    }

    #[test]
    fn test_to_frame_matches_from_frame() {
        let batch = ResponseBatch::new(vec![WireRecord(vec![9])], true);
        assert_eq!(ResponseBatch::from_frame(batch.to_frame()).unwrap(), batch);
    }

    #[test]
    fn test_scripted_replays_in_order() {
        let mut transport = ScriptedTransport::new();
        transport
            .push_batch(ResponseBatch::new(Vec::new(), true))
            .push_error(TransportError::Rejected { errno: 22 });

        let request = RouteMessage::new(Operation::Dump, 2);
        transport.send(&request).unwrap();
        assert!(transport.receive().unwrap().more_pending);
        assert!(matches!(
            transport.receive(),
            Err(TransportError::Rejected { errno: 22 })
        ));
        assert!(matches!(transport.receive(), Err(TransportError::Timeout)));
        assert_eq!(transport.sent(), &[request]);
        assert_eq!(transport.pending(), 0);
    }
}
