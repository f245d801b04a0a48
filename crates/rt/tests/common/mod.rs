//! In-memory forwarding engine for integration tests.
//!
//! Speaks the real frame encoding in both directions and answers dumps
//! page by page, returning the entries strictly after the request marker.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::ops::Bound;
use vrouter_rt::codec::{Frame, RouteMessage, WireRecord, DUMP_INCOMPLETE};
use vrouter_rt::{AddressFamily, Operation, ResponseBatch, RouteKey, Transport, TransportError};

const EINVAL: i32 = 22;
const ENOENT: i32 = 2;

pub struct FakeEngine {
    tables: BTreeMap<(AddressFamily, i32), BTreeMap<RouteKey, RouteMessage>>,
    batch_size: usize,
    reply: Option<Frame>,
    requests: Vec<RouteMessage>,
}

impl FakeEngine {
    pub fn new(batch_size: usize) -> Self {
        Self {
            tables: BTreeMap::new(),
            batch_size,
            reply: None,
            requests: Vec::new(),
        }
    }

    /// Engine holding inet or inet6 routes `keys` in `vrf_id`.
    pub fn with_routes(batch_size: usize, vrf_id: i32, keys: &[&str]) -> Self {
        let mut engine = Self::new(batch_size);
        for key in keys {
            engine.insert(vrf_id, key.parse().expect("valid key"), 1);
        }
        engine
    }

    pub fn insert(&mut self, vrf_id: i32, key: RouteKey, next_hop_id: i32) {
        let mut entry = RouteMessage::new(Operation::Dump, key.family().wire_tag());
        entry.vrf_id = vrf_id;
        entry.next_hop_id = next_hop_id;
        match key.family() {
            AddressFamily::Bridge => entry.mac = key.octets(),
            _ => {
                entry.prefix = key.octets();
                entry.prefix_len = key.prefix_len();
            }
        }
        self.table(key.family(), vrf_id).insert(key, entry);
    }

    pub fn keys(&self, family: AddressFamily, vrf_id: i32) -> Vec<RouteKey> {
        self.tables
            .get(&(family, vrf_id))
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every request received, decoded from the wire.
    pub fn requests(&self) -> &[RouteMessage] {
        &self.requests
    }

    /// Markers of the dump requests, `None` for a dump from the start.
    pub fn dump_markers(&self) -> Vec<Option<RouteKey>> {
        self.requests
            .iter()
            .filter(|r| r.operation == Operation::Dump)
            .map(marker_of)
            .collect()
    }

    fn table(&mut self, family: AddressFamily, vrf_id: i32) -> &mut BTreeMap<RouteKey, RouteMessage> {
        self.tables.entry((family, vrf_id)).or_default()
    }

    fn handle(&mut self, request: &RouteMessage) -> Frame {
        let Ok(family) = AddressFamily::from_wire_tag(request.family_tag) else {
            return status(-EINVAL);
        };
        let Some(key) = key_of(family, request) else {
            return status(-EINVAL);
        };

        match request.operation {
            Operation::Add => {
                let mut entry = request.clone();
                entry.operation = Operation::Dump;
                self.table(family, request.vrf_id).insert(key, entry);
                status(0)
            }
            Operation::Delete => match self.table(family, request.vrf_id).remove(&key) {
                Some(_) => status(0),
                None => status(-ENOENT),
            },
            Operation::Dump => self.page(family, request),
        }
    }

    fn page(&mut self, family: AddressFamily, request: &RouteMessage) -> Frame {
        let batch_size = self.batch_size;
        let start = match marker_of(request) {
            Some(marker) => Bound::Excluded(marker),
            None => Bound::Unbounded,
        };

        let table = self.table(family, request.vrf_id);
        let mut entries = table.range((start, Bound::Unbounded));
        let records = entries
            .by_ref()
            .take(batch_size)
            .map(|(_, entry)| WireRecord::from(entry))
            .collect();
        let more = entries.next().is_some();

        Frame::new(records, Some(if more { DUMP_INCOMPLETE } else { 0 }))
    }
}

fn status(code: i32) -> Frame {
    Frame::new(Vec::new(), Some(code))
}

fn key_of(family: AddressFamily, request: &RouteMessage) -> Option<RouteKey> {
    match (request.operation, family) {
        (Operation::Dump, _) => Some(RouteKey::zero(family)),
        (_, AddressFamily::Bridge) => RouteKey::from_octets(family, &request.mac, 0).ok(),
        _ => RouteKey::from_octets(family, &request.prefix, request.prefix_len).ok(),
    }
}

fn marker_of(request: &RouteMessage) -> Option<RouteKey> {
    if request.marker.is_empty() {
        return None;
    }
    let family = AddressFamily::from_wire_tag(request.family_tag).ok()?;
    RouteKey::from_octets(family, &request.marker, request.marker_prefix_len).ok()
}

fn envelope(e: impl std::fmt::Display) -> TransportError {
    TransportError::Envelope(e.to_string())
}

impl Transport for FakeEngine {
    fn send(&mut self, request: &RouteMessage) -> Result<(), TransportError> {
        let wire = Frame::request(request).encode();
        let frame = Frame::decode(&wire).map_err(envelope)?;
        let record = frame.records.first().ok_or_else(|| envelope("empty request"))?;
        let message = RouteMessage::decode(record.as_bytes()).map_err(envelope)?;

        let reply = self.handle(&message);
        self.requests.push(message);
        self.reply = Some(reply);
        Ok(())
    }

    fn receive(&mut self) -> Result<ResponseBatch, TransportError> {
        let reply = self.reply.take().ok_or(TransportError::Timeout)?;
        let frame = Frame::decode(&reply.encode()).map_err(envelope)?;
        ResponseBatch::from_frame(frame)
    }
}
