//! The sync engine
//!
//! [`SyncEngine::start`] spawns a driver task on the current tokio runtime
//! and hands back the engine handle together with its event stream. The
//! driver subscribes to revision broadcasts, fetches the initial snapshot,
//! folds it into the replica, then relays live revisions and cursors until
//! the engine is disposed.
//!
//! All engine state lives behind one lock and every mutation happens
//! synchronously while it is held, so the replica only ever sees one drain
//! at a time. The lock is never held across an await point.

use std::sync::Arc;

use coedit_core::{
    Color, Cursor, CursorBroadcast, DocId, DocumentChannel, ParticipantId, RevisionBroadcast,
    RevisionPayload, RevisionSubmission, Snapshot, SnapshotRequest, Subscription,
};
use coedit_ot::Operation;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, oneshot, watch};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::config::{HistoryReplay, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::events::{EngineEvents, SyncEvent};
use crate::lifecycle::Lifecycle;
use crate::presence::PresenceRelay;
use crate::revision_id::{RevisionId, try_decode};
use crate::revision_log::RevisionLog;

/// What happened to a call to [`SyncEngine::send_operation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The channel took the submission. `committed` is its own verdict; the
    /// authoritative outcome still arrives as `Ack` or `Retry`.
    Transmitted { committed: bool },
    /// The engine was not active yet. A `Retry` follows `Ready`.
    Deferred,
}

/// Completion handle for a send. Dropping it does not cancel the send.
#[derive(Debug)]
pub struct PendingSend {
    receiver: oneshot::Receiver<SyncResult<SendOutcome>>,
}

impl PendingSend {
    fn resolved(outcome: SyncResult<SendOutcome>) -> Self {
        let (tx, receiver) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { receiver }
    }

    /// Wait for the channel's answer
    ///
    /// # Errors
    ///
    /// Returns the transport error if the channel rejected the submission.
    pub async fn outcome(self) -> SyncResult<SendOutcome> {
        self.receiver.await.map_err(|_| SyncError::SendAbandoned)?
    }
}

struct EngineState<O> {
    lifecycle: Lifecycle,
    log: Option<RevisionLog<O>>,
    presence: PresenceRelay,
    channel: Option<Arc<dyn DocumentChannel>>,
    events: Option<mpsc::UnboundedSender<SyncEvent<O>>>,
    /// `dispose()` was called while initializing
    dispose_requested: bool,
    /// `send_operation()` was called while initializing
    retry_on_ready: bool,
}

impl<O: Operation> EngineState<O> {
    fn emit(&self, event: SyncEvent<O>) {
        if let Some(events) = &self.events {
            // The host may have dropped its receiver; nothing to do then.
            let _ = events.send(event);
        }
    }

    fn emit_all(&self, events: impl IntoIterator<Item = SyncEvent<O>>) {
        for event in events {
            self.emit(event);
        }
    }

    fn teardown(&mut self) {
        if let Err(e) = self.lifecycle.transition(Lifecycle::Disposed) {
            debug!(error = %e, "teardown on already disposed engine");
        }
        self.log = None;
        self.channel = None;
        self.events = None;
    }
}

struct Shared<O> {
    doc_id: DocId,
    participant: ParticipantId,
    config: SyncConfig,
    span: Span,
    state: Mutex<EngineState<O>>,
    /// Wakes the driver so it drops its subscriptions
    shutdown: Notify,
    /// Flipped once the driver has exited
    stopped: watch::Sender<bool>,
}

impl<O: Operation> Shared<O> {
    fn is_own(&self, participant: &ParticipantId) -> bool {
        participant == &self.participant
    }

    /// Fold the snapshot and any broadcasts queued during the fetch into the log
    fn bootstrap(&self, snapshot: Snapshot, revisions: &mut Subscription<RevisionBroadcast>) {
        let mut state = self.state.lock();
        let quiet = state.dispose_requested;
        let Some(log) = state.log.as_mut() else {
            return;
        };

        if let Some(first) = snapshot.revisions.first() {
            match try_decode(&first.id) {
                Ok(index) => log.start_at(index),
                Err(e) => warn!(id = %first.id, error = %e, "snapshot starts with a malformed revision id"),
            }
        }

        let mut accepted = 0usize;
        for entry in snapshot.revisions {
            if log.insert(&entry.id, entry.revision) {
                accepted += 1;
            }
        }
        while let Some(broadcast) = revisions.try_recv() {
            if broadcast.doc_id == self.doc_id && log.insert(&broadcast.doc_op_id, broadcast.to_raw()) {
                accepted += 1;
            }
        }

        let drained = log.drain(self.config.report_skipped_revisions);
        info!(
            revisions = accepted,
            counter = log.counter(),
            "applied snapshot"
        );
        if quiet {
            return;
        }

        match self.config.history {
            HistoryReplay::PerRevision => state.emit_all(drained),
            HistoryReplay::Composed => {
                let history = drained
                    .iter()
                    .any(|event| matches!(event, SyncEvent::Operation(_)))
                    .then(|| log.replica().document().clone());
                state.emit_all(
                    drained
                        .into_iter()
                        .filter(|event| !matches!(event, SyncEvent::Operation(_))),
                );
                if let Some(document) = history {
                    state.emit(SyncEvent::Operation(document));
                }
            }
            HistoryReplay::Silent => state.emit_all(
                drained
                    .into_iter()
                    .filter(|event| !matches!(event, SyncEvent::Operation(_))),
            ),
        }
        for cursor in snapshot.cursors {
            if let Some(event) = self.cursor_event(cursor) {
                state.emit(event);
            }
        }
    }

    /// Go live. Returns false if a dispose was requested meanwhile and the
    /// engine has been torn down instead.
    fn activate(&self) -> bool {
        let mut state = self.state.lock();
        if let Err(e) = state.lifecycle.transition(Lifecycle::Active) {
            warn!(error = %e, "engine could not become active");
            return false;
        }
        info!("engine ready");
        state.emit(SyncEvent::Ready);

        if state.dispose_requested {
            info!("disposing after deferred dispose request");
            state.teardown();
            return false;
        }
        if std::mem::take(&mut state.retry_on_ready) {
            state.emit(SyncEvent::Retry);
        }
        true
    }

    /// The snapshot fetch failed; the engine can never become ready
    fn abort(&self) {
        let mut state = self.state.lock();
        state.teardown();
    }

    fn on_revision(&self, broadcast: RevisionBroadcast) {
        if broadcast.doc_id != self.doc_id {
            return;
        }
        let mut state = self.state.lock();
        if !state.lifecycle.is_active() {
            return;
        }
        let Some(log) = state.log.as_mut() else {
            return;
        };

        if !log.insert(&broadcast.doc_op_id, broadcast.to_raw()) {
            debug!(id = %broadcast.doc_op_id, "ignoring stale or malformed revision id");
            return;
        }
        let events = log.drain(self.config.report_skipped_revisions);
        state.emit_all(events);
    }

    fn on_cursor(&self, broadcast: CursorBroadcast) {
        let state = self.state.lock();
        if !state.lifecycle.is_active() {
            return;
        }
        if let Some(event) = self.cursor_event(broadcast) {
            state.emit(event);
        }
    }

    fn cursor_event(&self, broadcast: CursorBroadcast) -> Option<SyncEvent<O>> {
        if self.is_own(&broadcast.id) && !self.config.relay_own_cursor {
            return None;
        }
        Some(SyncEvent::Cursor {
            cursor: broadcast.cursor(),
            participant: broadcast.id,
            color: broadcast.color,
        })
    }

    /// The channel refused a send; forget it so it cannot be matched later
    fn abandon_send(&self, id: &RevisionId) {
        let mut state = self.state.lock();
        if let Some(log) = state.log.as_mut() {
            log.abandon(id);
        }
    }
}

/// Driver task: bootstrap, then relay broadcasts until shutdown
async fn run<O: Operation>(shared: Arc<Shared<O>>, channel: Arc<dyn DocumentChannel>) {
    // Let the caller finish wiring up before anything happens
    tokio::task::yield_now().await;

    drive(&shared, channel).await;

    debug!("driver stopped");
    shared.stopped.send_replace(true);
}

async fn drive<O: Operation>(shared: &Shared<O>, channel: Arc<dyn DocumentChannel>) {
    // Subscribe before requesting the snapshot so nothing broadcast during
    // the fetch is lost.
    let mut revisions = channel.subscribe_revisions();

    let request = SnapshotRequest {
        doc_id: shared.doc_id.clone(),
        with_cursors: true,
    };
    let snapshot = match channel.request_snapshot(request).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "snapshot request failed");
            shared.abort();
            return;
        }
    };
    shared.bootstrap(snapshot, &mut revisions);

    // Ready is raised on a later turn than the snapshot reply
    tokio::task::yield_now().await;
    let mut cursors = channel.subscribe_cursors();
    drop(channel);
    if !shared.activate() {
        return;
    }

    loop {
        tokio::select! {
            _ = shared.shutdown.notified() => break,
            Some(broadcast) = revisions.recv() => shared.on_revision(broadcast),
            Some(broadcast) = cursors.recv() => shared.on_cursor(broadcast),
            else => break,
        }
    }
}

/// Keeps one participant's replica of one document in sync over a [`DocumentChannel`].
///
/// Dropping the engine disposes it.
pub struct SyncEngine<O: Operation> {
    shared: Arc<Shared<O>>,
}

impl<O: Operation> SyncEngine<O> {
    /// Start syncing `doc_id` as `participant`.
    ///
    /// Must be called from within a tokio runtime. The returned event stream
    /// is the only way to observe the engine; nothing is raised before the
    /// caller regains control.
    pub fn start(
        channel: Arc<dyn DocumentChannel>,
        participant: ParticipantId,
        color: Color,
        doc_id: DocId,
        config: SyncConfig,
    ) -> (Self, EngineEvents<O>) {
        let span = info_span!(
            "sync_engine",
            doc_id = %doc_id,
            participant = %participant.short_id()
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut presence = PresenceRelay::new(participant.clone(), color);
        if let Some(update) = presence.update(None) {
            if let Err(e) = channel.send_cursor(update) {
                span.in_scope(|| warn!(error = %e, "failed to clear cursor"));
            }
        }

        let state = EngineState {
            lifecycle: Lifecycle::Initializing,
            log: Some(RevisionLog::new(participant.clone())),
            presence,
            channel: Some(channel.clone()),
            events: Some(events_tx),
            dispose_requested: false,
            retry_on_ready: false,
        };
        let (stopped, _) = watch::channel(false);
        let shared = Arc::new(Shared {
            doc_id,
            participant,
            config,
            span: span.clone(),
            state: Mutex::new(state),
            shutdown: Notify::new(),
            stopped,
        });

        tokio::spawn(run(shared.clone(), channel).instrument(span));
        (Self { shared }, EngineEvents::new(events_rx))
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.shared.participant
    }

    pub fn doc_id(&self) -> &DocId {
        &self.shared.doc_id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.state.lock().lifecycle
    }

    /// Transmit a local operation for the next revision slot.
    ///
    /// Only one send may be unresolved at a time: wait for `Ack` or `Retry`
    /// before sending again. While initializing nothing is transmitted and a
    /// `Retry` is raised right after `Ready`.
    ///
    /// # Panics
    ///
    /// Panics if `operation` does not apply to the current document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Disposed`] after disposal, or an operation error
    /// if `operation` cannot be serialized.
    pub fn send_operation(&self, operation: O) -> SyncResult<PendingSend> {
        let mut state = self.shared.state.lock();
        match state.lifecycle {
            Lifecycle::Disposed => return Err(SyncError::Disposed),
            Lifecycle::Initializing => {
                state.retry_on_ready = true;
                return Ok(PendingSend::resolved(Ok(SendOutcome::Deferred)));
            }
            Lifecycle::Active => {}
        }

        let op = operation.to_json()?;
        let channel = state.channel.clone().ok_or(SyncError::Disposed)?;
        let log = state.log.as_mut().ok_or(SyncError::Disposed)?;
        let id = log.prepare_send(operation);
        drop(state);

        let submission = RevisionSubmission {
            doc_id: self.shared.doc_id.clone(),
            revision: RevisionPayload {
                id: id.to_string(),
                author: self.shared.participant.clone(),
                op,
            },
        };
        let (tx, receiver) = oneshot::channel();
        let shared = self.shared.clone();
        let span = self.shared.span.clone();

        tokio::spawn(
            async move {
                let outcome = match channel.send_revision(submission).await {
                    Ok(committed) => {
                        debug!(id = %id, committed, "revision sent");
                        Ok(SendOutcome::Transmitted { committed })
                    }
                    Err(e) => {
                        error!(id = %id, error = %e, "revision send failed");
                        shared.abandon_send(&id);
                        Err(SyncError::Transport(e))
                    }
                };
                let _ = tx.send(outcome);
            }
            .instrument(span),
        );

        Ok(PendingSend { receiver })
    }

    /// Publish this participant's cursor, `None` meaning no cursor.
    ///
    /// Repeated clears after the first are not transmitted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Disposed`] after disposal, or the transport error.
    pub fn send_cursor(&self, cursor: Option<Cursor>) -> SyncResult<()> {
        let mut state = self.shared.state.lock();
        if state.lifecycle.is_disposed() {
            return Err(SyncError::Disposed);
        }
        let Some(update) = state.presence.update(cursor) else {
            return Ok(());
        };
        let channel = state.channel.clone().ok_or(SyncError::Disposed)?;
        drop(state);

        channel.send_cursor(update)?;
        Ok(())
    }

    /// Change the color sent with subsequent cursor updates
    pub fn set_color(&self, color: Color) -> SyncResult<()> {
        let mut state = self.shared.state.lock();
        if state.lifecycle.is_disposed() {
            return Err(SyncError::Disposed);
        }
        state.presence.set_color(color);
        Ok(())
    }

    /// The document as composed so far
    pub fn document(&self) -> SyncResult<O> {
        let state = self.shared.state.lock();
        state
            .log
            .as_ref()
            .map(|log| log.replica().document().clone())
            .ok_or(SyncError::Disposed)
    }

    /// Whether no revision has been applied yet
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotReady`] while initializing.
    pub fn is_history_empty(&self) -> SyncResult<bool> {
        let state = self.shared.state.lock();
        match state.lifecycle {
            Lifecycle::Initializing => Err(SyncError::NotReady),
            Lifecycle::Disposed => Err(SyncError::Disposed),
            Lifecycle::Active => state
                .log
                .as_ref()
                .map(|log| log.counter() == 0)
                .ok_or(SyncError::Disposed),
        }
    }

    /// Tear the engine down.
    ///
    /// While initializing this only takes effect once the snapshot has been
    /// applied and `Ready` raised. Calling it again is a no-op.
    pub fn dispose(&self) {
        let mut state = self.shared.state.lock();
        match state.lifecycle {
            Lifecycle::Initializing => {
                state.dispose_requested = true;
            }
            Lifecycle::Active => {
                self.shared.span.in_scope(|| info!("engine disposed"));
                state.teardown();
                self.shared.shutdown.notify_one();
            }
            Lifecycle::Disposed => {}
        }
    }

    /// Resolves once the engine is disposed and its driver has released
    /// every channel subscription
    pub async fn disposed(&self) {
        let mut stopped = self.shared.stopped.subscribe();
        let _ = stopped.wait_for(|stopped| *stopped).await;
    }
}

impl<O: Operation> Drop for SyncEngine<O> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_core::{CommitPolicy, MockChannel, raw_revision};
    use coedit_ot::TextOperation;
    use serde_json::json;

    fn doc() -> DocId {
        DocId::new("doc").unwrap()
    }

    fn alice() -> ParticipantId {
        ParticipantId::new("alice").unwrap()
    }

    fn start(channel: &MockChannel) -> (SyncEngine<TextOperation>, EngineEvents<TextOperation>) {
        SyncEngine::start(
            Arc::new(channel.clone()),
            alice(),
            Color::new("#ff0000"),
            doc(),
            SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_nothing_raised_before_first_yield() {
        let channel = MockChannel::new();
        let (engine, mut events) = start(&channel);

        assert_eq!(engine.lifecycle(), Lifecycle::Initializing);
        assert!(events.try_recv().is_none());
        assert_eq!(channel.snapshot_requests(), 0);
        // The cleared cursor goes out immediately
        assert_eq!(channel.cursor_updates().len(), 1);
        assert!(matches!(engine.is_history_empty(), Err(SyncError::NotReady)));

        assert_eq!(events.recv().await, Some(SyncEvent::Ready));
        assert_eq!(engine.lifecycle(), Lifecycle::Active);
        assert!(engine.is_history_empty().unwrap());
    }

    #[tokio::test]
    async fn test_history_is_composed_before_ready() {
        let channel = MockChannel::new();
        let bob = ParticipantId::new("bob").unwrap();
        channel.seed_revision(&doc(), "A0", raw_revision(&bob, json!(["ab"])));
        channel.seed_revision(&doc(), "A1", raw_revision(&bob, json!([2, "c"])));

        let (engine, mut events) = start(&channel);
        assert_eq!(
            events.recv().await,
            Some(SyncEvent::Operation(TextOperation::new().insert("abc")))
        );
        assert_eq!(events.recv().await, Some(SyncEvent::Ready));

        assert_eq!(engine.document().unwrap().apply("").unwrap(), "abc");
        assert!(!engine.is_history_empty().unwrap());
    }

    #[tokio::test]
    async fn test_send_while_initializing_defers() {
        let channel = MockChannel::new();
        let (engine, mut events) = start(&channel);

        let pending = engine.send_operation(TextOperation::new().insert("x")).unwrap();
        assert_eq!(pending.outcome().await.unwrap(), SendOutcome::Deferred);
        assert!(channel.submissions().is_empty());

        assert_eq!(events.recv().await, Some(SyncEvent::Ready));
        assert_eq!(events.recv().await, Some(SyncEvent::Retry));
    }

    #[tokio::test]
    async fn test_send_and_ack() {
        let channel = MockChannel::new();
        let (engine, mut events) = start(&channel);
        assert_eq!(events.recv().await, Some(SyncEvent::Ready));

        let op = TextOperation::new().insert("hello");
        let outcome = engine.send_operation(op.clone()).unwrap().outcome().await.unwrap();
        assert_eq!(outcome, SendOutcome::Transmitted { committed: true });
        assert_eq!(events.recv().await, Some(SyncEvent::Ack));
        assert_eq!(engine.document().unwrap(), op);

        let submission = &channel.submissions()[0];
        assert_eq!(submission.revision.id, "A0");
        assert_eq!(submission.revision.op, json!(["hello"]));
    }

    #[tokio::test]
    async fn test_record_only_channel_leaves_send_unresolved() {
        let channel = MockChannel::new();
        channel.set_commit_policy(CommitPolicy::RecordOnly);
        let (engine, mut events) = start(&channel);
        assert_eq!(events.recv().await, Some(SyncEvent::Ready));

        let outcome = engine
            .send_operation(TextOperation::new().insert("x"))
            .unwrap()
            .outcome()
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Transmitted { committed: false });
        assert!(events.try_recv().is_none());
        assert_eq!(engine.document().unwrap(), TextOperation::new());
    }

    #[tokio::test]
    async fn test_every_call_fails_after_dispose() {
        let channel = MockChannel::new();
        let (engine, mut events) = start(&channel);
        assert_eq!(events.recv().await, Some(SyncEvent::Ready));

        engine.dispose();
        engine.disposed().await;
        engine.dispose();

        assert_eq!(engine.lifecycle(), Lifecycle::Disposed);
        assert!(matches!(
            engine.send_operation(TextOperation::new()),
            Err(SyncError::Disposed)
        ));
        assert!(matches!(engine.send_cursor(None), Err(SyncError::Disposed)));
        assert!(matches!(engine.set_color(Color::new("#000")), Err(SyncError::Disposed)));
        assert!(matches!(engine.document(), Err(SyncError::Disposed)));
        assert!(matches!(engine.is_history_empty(), Err(SyncError::Disposed)));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_failed_snapshot_disposes() {
        struct BrokenChannel(MockChannel);

        #[async_trait::async_trait]
        impl DocumentChannel for BrokenChannel {
            fn subscribe_revisions(&self) -> Subscription<RevisionBroadcast> {
                self.0.subscribe_revisions()
            }
            fn subscribe_cursors(&self) -> Subscription<CursorBroadcast> {
                self.0.subscribe_cursors()
            }
            async fn request_snapshot(
                &self,
                _request: SnapshotRequest,
            ) -> Result<Snapshot, coedit_core::TransportError> {
                Err(coedit_core::TransportError::RequestFailed("offline".to_string()))
            }
            async fn send_revision(
                &self,
                submission: RevisionSubmission,
            ) -> Result<bool, coedit_core::TransportError> {
                self.0.send_revision(submission).await
            }
            fn send_cursor(
                &self,
                update: coedit_core::CursorUpdate,
            ) -> Result<(), coedit_core::TransportError> {
                self.0.send_cursor(update)
            }
        }

        let mock = MockChannel::new();
        let (engine, mut events) = SyncEngine::<TextOperation>::start(
            Arc::new(BrokenChannel(mock.clone())),
            alice(),
            Color::new("#ff0000"),
            doc(),
            SyncConfig::default(),
        );

        engine.disposed().await;
        assert_eq!(engine.lifecycle(), Lifecycle::Disposed);
        assert_eq!(events.recv().await, None);
        assert_eq!(mock.revision_subscribers(), 0);
    }
}
