//! Paginated, marker-driven table dump.
//!
//! A dump is a sequence of rounds. Each round sends a dump request carrying
//! the key of the last record seen (the marker), receives one batch and
//! drains it. The engine asks for another round only while the batch says
//! more records are pending, and each round must move the marker forward
//! in key order, which bounds the number of rounds by the size of the table.
//!
//! ```text
//! Idle -> Requesting -> AwaitingResponse -> Draining -> Requesting ...
//!                              |               |
//!                              v               v
//!                          Complete     Complete | Cancelled
//! any -> Failed
//! ```
//!
//! A dump is a best-effort snapshot: entries added or removed while it runs
//! may or may not be seen.

use crate::codec::{Operation, WireRecord};
use crate::error::{DecodeError, DumpError, ResumePoint};
use crate::record::RouteRecord;
use crate::request::{RequestBuilder, RouteParams};
use crate::response::ResponseDecoder;
use crate::transport::Transport;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use vrouter_types::{AddressFamily, RouteKey};

/// Position of a dump in one table, owned by that dump alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpCursor {
    family: AddressFamily,
    vrf_id: i32,
    last_key: Option<RouteKey>,
}

impl DumpCursor {
    /// Cursor at the start of the table.
    pub fn new(family: AddressFamily, vrf_id: i32) -> Self {
        Self {
            family,
            vrf_id,
            last_key: None,
        }
    }

    /// Cursor continuing after `key`, e.g. the marker reported by a failed
    /// dump.
    pub fn resume_after(vrf_id: i32, key: RouteKey) -> Self {
        Self {
            family: key.family(),
            vrf_id,
            last_key: Some(key),
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn vrf_id(&self) -> i32 {
        self.vrf_id
    }

    /// Key of the last record seen, if any.
    pub fn last_key(&self) -> Option<RouteKey> {
        self.last_key
    }

    /// Current marker; the family's zero key before any record was seen.
    ///
    /// This is the logical position only. The first request goes out with
    /// an empty marker rather than the zero key.
    pub fn marker(&self) -> RouteKey {
        self.last_key.unwrap_or(RouteKey::zero(self.family))
    }

    /// Whether `key` lies past the marker.
    ///
    /// Before the first record every key qualifies, so a default route
    /// (equal to the zero key) is not lost.
    pub fn accepts(&self, key: &RouteKey) -> bool {
        self.last_key.map_or(true, |last| *key > last)
    }

    fn advance(&mut self, key: RouteKey) {
        self.last_key = Some(key);
    }
}

/// State of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpState {
    Idle,
    Requesting,
    AwaitingResponse,
    Draining,
    Complete,
    Failed,
    Cancelled,
}

impl fmt::Display for DumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DumpState::Idle => "idle",
            DumpState::Requesting => "requesting",
            DumpState::AwaitingResponse => "awaiting-response",
            DumpState::Draining => "draining",
            DumpState::Complete => "complete",
            DumpState::Failed => "failed",
            DumpState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Outcome of a dump that ran to the end or was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    /// Records emitted.
    pub records: u64,
    /// Requests sent.
    pub rounds: u32,
    /// Final marker.
    pub last_key: Option<RouteKey>,
    /// Stopped on request before the table was exhausted.
    pub cancelled: bool,
}

/// Lazy sequence of the records of one table.
///
/// Yields records in the order the engine returns them, then `None`. A
/// failure is yielded once as `Some(Err(_))`, after which the stream is
/// exhausted. Streams cannot be restarted; build a new one from
/// [`DumpError::resume_after`] to continue.
pub struct DumpStream<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
    builder: RequestBuilder,
    decoder: ResponseDecoder,
    cursor: DumpCursor,
    state: DumpState,
    history: Vec<DumpState>,
    round: u32,
    batch: VecDeque<WireRecord>,
    more_pending: bool,
    round_start: Option<RouteKey>,
    emitted: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'t, T: Transport + ?Sized> DumpStream<'t, T> {
    pub fn new(transport: &'t mut T, cursor: DumpCursor) -> Self {
        Self {
            transport,
            builder: RequestBuilder::new(),
            decoder: ResponseDecoder::new(),
            cursor,
            state: DumpState::Idle,
            history: vec![DumpState::Idle],
            round: 0,
            batch: VecDeque::new(),
            more_pending: false,
            round_start: None,
            emitted: 0,
            cancel: None,
        }
    }

    /// Uses `builder` for the dump requests.
    pub fn with_builder(mut self, builder: RequestBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Stops the dump before the next round once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> DumpState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[DumpState] {
        &self.history
    }

    pub fn cursor(&self) -> &DumpCursor {
        &self.cursor
    }

    pub fn summary(&self) -> DumpSummary {
        DumpSummary {
            records: self.emitted,
            rounds: self.round,
            last_key: self.cursor.last_key(),
            cancelled: self.state == DumpState::Cancelled,
        }
    }

    /// Drives the dump to the end, handing each record to `sink`.
    ///
    /// Sink errors stop the dump immediately and are returned as is.
    #[instrument(skip_all, fields(family = %self.cursor.family, vrf = self.cursor.vrf_id))]
    pub fn run<F, E>(mut self, mut sink: F) -> Result<DumpSummary, E>
    where
        F: FnMut(RouteRecord) -> Result<(), E>,
        E: From<DumpError>,
    {
        while let Some(item) = self.next() {
            sink(item?)?;
        }
        let summary = self.summary();
        debug!(
            records = summary.records,
            rounds = summary.rounds,
            cancelled = summary.cancelled,
            "Dump finished"
        );
        Ok(summary)
    }

    fn transition(&mut self, next: DumpState) {
        debug!(round = self.round, from = %self.state, to = %next, "Dump state change");
        self.state = next;
        self.history.push(next);
    }

    fn resume_point(&self) -> ResumePoint {
        ResumePoint(self.cursor.last_key())
    }

    fn fail(&mut self, error: DumpError) -> Option<Result<RouteRecord, DumpError>> {
        warn!(round = self.round, error = %error, "Dump failed");
        self.batch.clear();
        self.transition(DumpState::Failed);
        Some(Err(error))
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn request(&mut self) -> Result<(), DumpError> {
        self.round += 1;
        let params = RouteParams::dump(self.cursor.vrf_id, self.cursor.last_key());
        let request = self
            .builder
            .build(Operation::Dump, self.cursor.family, &params)
            .map_err(|source| DumpError::Request {
                round: self.round,
                source,
            })?;

        debug!(round = self.round, marker = %self.cursor.marker(), "Requesting dump batch");
        self.transport
            .send(&request)
            .map_err(|source| DumpError::Transport {
                round: self.round,
                resume: self.resume_point(),
                source,
            })
    }

    fn await_batch(&mut self) -> Result<bool, DumpError> {
        let batch = self
            .transport
            .receive()
            .map_err(|source| DumpError::Transport {
                round: self.round,
                resume: self.resume_point(),
                source,
            })?;

        debug!(
            round = self.round,
            records = batch.records.len(),
            more_pending = batch.more_pending,
            "Received dump batch"
        );
        let empty = batch.records.is_empty();
        self.batch = batch.records.into();
        self.more_pending = batch.more_pending;
        self.round_start = self.cursor.last_key();
        Ok(empty && !batch.more_pending)
    }

    /// Decodes the next queued record; `Ok(None)` for a suppressed one.
    fn drain_one(&mut self, wire: &WireRecord) -> Result<Option<RouteRecord>, DumpError> {
        let decode_error = |this: &Self, source: DecodeError| DumpError::Decode {
            round: this.round,
            resume: this.resume_point(),
            source,
        };

        let record = self
            .decoder
            .decode(wire)
            .map_err(|source| decode_error(self, source))?;
        if record.family() != self.cursor.family {
            return Err(decode_error(
                self,
                DecodeError::FamilyMismatch {
                    expected: self.cursor.family,
                    actual: record.family(),
                },
            ));
        }

        if !self.cursor.accepts(&record.key) {
            warn!(
                round = self.round,
                key = %record.key,
                marker = %self.cursor.marker(),
                "Skipping record not past the marker"
            );
            return Ok(None);
        }

        self.cursor.advance(record.key);
        self.emitted += 1;
        Ok(Some(record))
    }

    fn finish_round(&mut self) -> Result<(), DumpError> {
        if !self.more_pending {
            self.transition(DumpState::Complete);
            return Ok(());
        }
        if self.cursor.last_key() == self.round_start {
            return Err(DumpError::Stalled {
                round: self.round,
                resume: self.resume_point(),
            });
        }
        if self.cancelled() {
            debug!(round = self.round, marker = %self.cursor.marker(), "Dump cancelled");
            self.transition(DumpState::Cancelled);
            return Ok(());
        }
        self.transition(DumpState::Requesting);
        Ok(())
    }
}

impl<T: Transport + ?Sized> Iterator for DumpStream<'_, T> {
    type Item = Result<RouteRecord, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                DumpState::Idle => self.transition(DumpState::Requesting),
                DumpState::Requesting => {
                    if let Err(e) = self.request() {
                        return self.fail(e);
                    }
                    self.transition(DumpState::AwaitingResponse);
                }
                DumpState::AwaitingResponse => match self.await_batch() {
                    Ok(true) => self.transition(DumpState::Complete),
                    Ok(false) => self.transition(DumpState::Draining),
                    Err(e) => return self.fail(e),
                },
                DumpState::Draining => match self.batch.pop_front() {
                    Some(wire) => match self.drain_one(&wire) {
                        Ok(Some(record)) => return Some(Ok(record)),
                        Ok(None) => {}
                        Err(e) => return self.fail(e),
                    },
                    None => {
                        if let Err(e) = self.finish_round() {
                            return self.fail(e);
                        }
                    }
                },
                DumpState::Complete | DumpState::Failed | DumpState::Cancelled => return None,
            }
        }
    }
}
