//! Paginated dumps against an in-memory engine.

mod common;

use common::FakeEngine;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vrouter_rt::codec::RouteMessage;
use vrouter_rt::table;
use vrouter_rt::{
    AddressFamily, DumpCursor, DumpError, DumpState, DumpStream, MacAddress, ResponseBatch,
    RouteClient, RouteKey, RouteRecord, RtError, Transport, TransportError,
};

fn key(text: &str) -> RouteKey {
    text.parse().expect("valid key")
}

fn collect(engine: &mut FakeEngine, family: AddressFamily, vrf_id: i32) -> Vec<RouteRecord> {
    DumpStream::new(engine, DumpCursor::new(family, vrf_id))
        .collect::<Result<_, _>>()
        .expect("dump succeeds")
}

#[test]
fn test_empty_table_completes_without_records() {
    let mut engine = FakeEngine::new(4);

    let mut stream = DumpStream::new(&mut engine, DumpCursor::new(AddressFamily::Inet, 5));
    assert!(stream.next().is_none());
    assert_eq!(
        stream.history(),
        &[
            DumpState::Idle,
            DumpState::Requesting,
            DumpState::AwaitingResponse,
            DumpState::Complete,
        ]
    );
    assert_eq!(stream.summary().records, 0);
    assert_eq!(engine.requests().len(), 1);
}

#[test]
fn test_one_record_per_batch() {
    let mut engine =
        FakeEngine::with_routes(1, 5, &["10.0.1.0/24", "10.0.0.0/24", "10.0.2.0/24"]);

    let mut stream = DumpStream::new(&mut engine, DumpCursor::new(AddressFamily::Inet, 5));
    let mut seen = Vec::new();
    for record in stream.by_ref() {
        seen.push(record.unwrap().key.to_string());
    }
    assert_eq!(seen, ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]);
    assert_eq!(stream.state(), DumpState::Complete);
    assert_eq!(stream.cursor().last_key(), Some(key("10.0.2.0/24")));
    assert_eq!(stream.summary().rounds, 3);

    assert_eq!(
        engine.dump_markers(),
        [None, Some(key("10.0.0.0/24")), Some(key("10.0.1.0/24"))]
    );
}

#[test]
fn test_default_route_is_listed() {
    let mut engine = FakeEngine::with_routes(2, 0, &["0.0.0.0/0", "10.0.0.0/8", "192.168.0.0/16"]);

    let records = collect(&mut engine, AddressFamily::Inet, 0);
    let keys: Vec<_> = records.iter().map(|r| r.key).collect();
    assert_eq!(
        keys,
        [key("0.0.0.0/0"), key("10.0.0.0/8"), key("192.168.0.0/16")]
    );
}

#[test]
fn test_same_prefix_different_lengths() {
    let mut engine = FakeEngine::with_routes(1, 0, &["10.0.0.0/24", "10.0.0.0/8", "10.0.0.0/16"]);

    let records = collect(&mut engine, AddressFamily::Inet, 0);
    let keys: Vec<_> = records.iter().map(|r| r.key.to_string()).collect();
    assert_eq!(keys, ["10.0.0.0/8", "10.0.0.0/16", "10.0.0.0/24"]);
}

#[test]
fn test_inet6_dump() {
    let mut engine = FakeEngine::with_routes(2, 1, &["2001:db8::/32", "::/0", "fe80::/10"]);

    let records = collect(&mut engine, AddressFamily::Inet6, 1);
    let keys: Vec<_> = records.iter().map(|r| r.key.to_string()).collect();
    assert_eq!(keys, ["::/0", "2001:db8::/32", "fe80::/10"]);
    assert!(engine
        .requests()
        .iter()
        .all(|r| r.family_tag == AddressFamily::Inet6.wire_tag()));
}

#[test]
fn test_bridge_dump_marker() {
    let mut engine = FakeEngine::new(2);
    for last in [5u8, 1, 4, 2, 3] {
        engine.insert(3, RouteKey::bridge(MacAddress::new([2, 0, 0, 0, 0, last])), 7);
    }

    let records = collect(&mut engine, AddressFamily::Bridge, 3);
    let macs: Vec<_> = records
        .iter()
        .map(|r| r.key.mac().unwrap().octets()[5])
        .collect();
    assert_eq!(macs, [1, 2, 3, 4, 5]);

    let dumps: Vec<_> = engine
        .requests()
        .iter()
        .filter(|r| !r.marker.is_empty())
        .collect();
    assert_eq!(dumps.len(), 2);
    assert!(dumps.iter().all(|r| r.marker_prefix_len == 48));
}

#[test]
fn test_vrfs_are_separate() {
    let mut engine = FakeEngine::with_routes(8, 1, &["10.0.0.0/24"]);
    engine.insert(2, key("10.9.0.0/24"), 1);

    let records = collect(&mut engine, AddressFamily::Inet, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, key("10.9.0.0/24"));
    assert_eq!(records[0].vrf_id, 2);
}

#[test]
fn test_resume_after_marker() {
    let mut engine =
        FakeEngine::with_routes(10, 0, &["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]);

    let mut client = RouteClient::new(engine);
    let records: Vec<_> = client
        .dump(AddressFamily::Inet, 0, Some(key("10.0.0.0/24")))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let keys: Vec<_> = records.iter().map(|r: &RouteRecord| r.key.to_string()).collect();
    assert_eq!(keys, ["10.0.1.0/24", "10.0.2.0/24"]);

    engine = client.into_transport();
    assert_eq!(engine.dump_markers(), [Some(key("10.0.0.0/24"))]);
}

#[test]
fn test_cancel_keeps_marker() {
    let engine = FakeEngine::with_routes(1, 0, &["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]);
    let cancel = Arc::new(AtomicBool::new(false));
    let mut client = RouteClient::new(engine).with_cancel_flag(cancel.clone());

    let mut seen = 0;
    let summary = client
        .dump(AddressFamily::Inet, 0, None)
        .unwrap()
        .run(|_| {
            seen += 1;
            cancel.store(true, Ordering::SeqCst);
            Ok::<_, RtError>(())
        })
        .unwrap();

    assert_eq!(seen, 1);
    assert!(summary.cancelled);
    assert_eq!(summary.last_key, Some(key("10.0.0.0/24")));
}

#[test]
fn test_render_dump() {
    let mut engine = FakeEngine::with_routes(1, 5, &["10.0.0.0/24", "10.0.1.0/24"]);
    let records = collect(&mut engine, AddressFamily::Inet, 5);

    let out = table::render(Vec::new(), AddressFamily::Inet, 5, records).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "Vrouter inet4 routing table 0/5/unicast");
    assert_eq!(lines.len(), 6);
    assert!(lines[4].starts_with("10.0.0.0/24"));
    assert!(lines[5].starts_with("10.0.1.0/24"));
}

#[test]
fn test_failure_reports_resume_marker() {
    // An engine that stops answering after the first page.
    struct Flaky {
        inner: FakeEngine,
        answered: usize,
    }

    impl Transport for Flaky {
        fn send(&mut self, request: &RouteMessage) -> Result<(), TransportError> {
            self.inner.send(request)
        }

        fn receive(&mut self) -> Result<ResponseBatch, TransportError> {
            self.answered += 1;
            if self.answered > 1 {
                return Err(TransportError::Timeout);
            }
            self.inner.receive()
        }
    }

    let mut flaky = Flaky {
        inner: FakeEngine::with_routes(2, 0, &["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]),
        answered: 0,
    };

    let results: Vec<_> =
        DumpStream::new(&mut flaky, DumpCursor::new(AddressFamily::Inet, 0)).collect();
    assert_eq!(results.len(), 3);
    let err = match &results[2] {
        Err(err) => err,
        Ok(record) => panic!("unexpected record {}", record.key),
    };
    assert!(matches!(err, DumpError::Transport { round: 2, .. }));
    assert_eq!(err.resume_after(), Some(key("10.0.1.0/24")));

    // Resuming from the reported marker picks up the rest.
    let records: Vec<_> = DumpStream::new(
        &mut flaky.inner,
        DumpCursor::resume_after(0, err.resume_after().unwrap()),
    )
    .collect::<Result<_, _>>()
    .unwrap();
    let keys: Vec<_> = records.iter().map(|r: &RouteRecord| r.key.to_string()).collect();
    assert_eq!(keys, ["10.0.2.0/24"]);
}
