//! Shared helpers for the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use coedit_core::{Color, DocId, MockChannel, ParticipantId, RevisionBroadcast};
use coedit_logging::ParticipantContextGuard;
use coedit_ot::{Operation, TextOperation};
use coedit_sync::{EngineEvents, SyncConfig, SyncEngine, SyncEvent};
use serde_json::Value;

pub type Engine = SyncEngine<TextOperation>;
pub type Events = EngineEvents<TextOperation>;
pub type Event = SyncEvent<TextOperation>;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn doc() -> DocId {
    DocId::new("notes").unwrap()
}

pub fn participant(name: &str) -> ParticipantId {
    ParticipantId::new(name).unwrap()
}

pub fn color(name: &str) -> Color {
    Color::new(format!("color-{name}"))
}

/// Start an engine for `name` on `channel`
pub fn start(channel: &MockChannel, name: &str, config: SyncConfig) -> (Engine, Events) {
    coedit_logging::init_testing();

    let participant = participant(name);
    let _context = ParticipantContextGuard::new(&participant);
    SyncEngine::start(
        Arc::new(channel.clone()),
        participant,
        color(name),
        doc(),
        config,
    )
}

/// Start an engine and wait for `Ready`, skipping the history and cursors
/// raised from the snapshot
pub async fn start_ready(channel: &MockChannel, name: &str) -> (Engine, Events) {
    let (engine, mut events) = start(channel, name, SyncConfig::default());
    loop {
        match next_sync_event(&mut events).await {
            SyncEvent::Ready => return (engine, events),
            SyncEvent::Operation(_) => continue,
            other => panic!("unexpected event before ready: {:?}", other),
        }
    }
}

pub async fn next_event(events: &mut Events) -> Event {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for an engine event")
        .expect("event stream ended")
}

/// Next event that is not a presence update
pub async fn next_sync_event(events: &mut Events) -> Event {
    loop {
        match next_event(events).await {
            SyncEvent::Cursor { .. } => continue,
            event => return event,
        }
    }
}

/// Let every spawned task run until nothing is left to do
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Events already queued, without waiting
pub fn queued(events: &mut Events) -> Vec<Event> {
    std::iter::from_fn(|| events.try_recv()).collect()
}

/// Read events until the stream ends
pub async fn remaining(events: &mut Events) -> Vec<Event> {
    let mut seen = Vec::new();
    loop {
        match tokio::time::timeout(EVENT_TIMEOUT, events.recv()).await {
            Ok(Some(event)) => seen.push(event),
            Ok(None) => return seen,
            Err(_) => panic!("event stream did not end; saw {:?}", seen),
        }
    }
}

pub fn broadcast(id: &str, author: &str, op: &TextOperation) -> RevisionBroadcast {
    broadcast_raw(id, author, op.to_json().unwrap())
}

pub fn broadcast_raw(id: &str, author: &str, ops: Value) -> RevisionBroadcast {
    RevisionBroadcast {
        doc_id: doc(),
        doc_op_id: id.to_string(),
        ops,
        author: participant(author),
    }
}

/// `count` single-letter inserts, each appending to the result of the previous one
pub fn appending_ops(count: usize) -> Vec<TextOperation> {
    (0..count)
        .map(|i| {
            let letter = char::from(b'a' + i as u8).to_string();
            TextOperation::new().retain(i).insert(&letter)
        })
        .collect()
}

pub fn compose_all(ops: &[TextOperation]) -> TextOperation {
    ops.iter()
        .try_fold(TextOperation::new(), |doc, op| doc.compose(op))
        .unwrap()
}

pub fn text(engine: &Engine) -> String {
    engine.document().unwrap().apply("").unwrap()
}
