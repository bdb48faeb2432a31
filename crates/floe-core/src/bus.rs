//! The event bus: a four-phase publish pipeline over middleware lanes.
//!
//! Each publish walks the lanes in a fixed order:
//!
//! 1. **Pre** runs ordered and awaited on the publisher's task; handlers may
//!    transform the event or truncate it, which cancels every later phase.
//! 2. **Async** spawns one detached worker per matching middleware, each on
//!    its own clone of the event.
//! 3. **Sync** also spawns detached workers, but is the lane responders put
//!    ordered side-effect chains in; `publish` does not await it. Callers
//!    that need the quiescent point await [`EventBus::settled`].
//! 4. **Post** runs ordered and awaited again, observing the event as the
//!    pre phase left it.
//!
//! Detached workers are supervised: a panicking worker is logged and
//! reported as a [`WorkerFault`] on the channel behind
//! [`EventBus::fault_receiver`], instead of disappearing silently.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tracing::{debug, error, Instrument};

use crate::event::{Event, EventKind};
use crate::middleware::{Middleware, MiddlewareId};

/// The four lanes of the publish pipeline, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Ordered, awaited, may transform or truncate.
    Pre,
    /// Detached, one worker per middleware, event cloned per worker.
    Async,
    /// Detached like `Async`, but the conventional lane for responder
    /// side-effect chains; not awaited by `publish`.
    Sync,
    /// Ordered, awaited, observes the pre-phase result.
    Post,
}

impl Phase {
    /// All lanes in traversal order.
    pub const ALL: [Phase; 4] = [Phase::Pre, Phase::Async, Phase::Sync, Phase::Post];

    fn index(self) -> usize {
        match self {
            Phase::Pre => 0,
            Phase::Async => 1,
            Phase::Sync => 2,
            Phase::Post => 3,
        }
    }

    /// Lane label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Async => "async",
            Phase::Sync => "sync",
            Phase::Post => "post",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The event passed the pre phase; detached workers were spawned and
    /// the post phase ran.
    Delivered,
    /// A pre-phase handler truncated the event; no later phase saw it.
    Truncated,
}

impl PublishOutcome {
    /// True when the event reached the detached and post lanes.
    pub fn is_delivered(&self) -> bool {
        matches!(self, PublishOutcome::Delivered)
    }
}

/// Report of a detached worker that panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerFault {
    /// The middleware whose chain was running.
    pub middleware: MiddlewareId,
    /// The lane the worker was spawned for.
    pub phase: Phase,
}

struct BusInner {
    lanes: [RwLock<Vec<Middleware>>; 4],
    in_flight: AtomicUsize,
    quiescent: Notify,
    fault_tx: UnboundedSender<WorkerFault>,
    fault_rx: Mutex<Option<UnboundedReceiver<WorkerFault>>>,
}

/// The publish pipeline. Cheap to clone; all copies share the same lanes.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(BusInner {
                lanes: [
                    RwLock::new(Vec::new()),
                    RwLock::new(Vec::new()),
                    RwLock::new(Vec::new()),
                    RwLock::new(Vec::new()),
                ],
                in_flight: AtomicUsize::new(0),
                quiescent: Notify::new(),
                fault_tx,
                fault_rx: Mutex::new(Some(fault_rx)),
            }),
        }
    }

    /// Appends a middleware to the given lane.
    pub fn add_middleware(&self, phase: Phase, middleware: Middleware) {
        debug!(phase = %phase, middleware = %middleware.id(), "middleware added");
        self.inner.lanes[phase.index()].write().push(middleware);
    }

    /// Appends to the pre lane.
    pub fn add_pre_middleware(&self, middleware: Middleware) {
        self.add_middleware(Phase::Pre, middleware);
    }

    /// Appends to the async lane.
    pub fn add_async_middleware(&self, middleware: Middleware) {
        self.add_middleware(Phase::Async, middleware);
    }

    /// Appends to the sync lane.
    pub fn add_sync_middleware(&self, middleware: Middleware) {
        self.add_middleware(Phase::Sync, middleware);
    }

    /// Appends to the post lane.
    pub fn add_post_middleware(&self, middleware: Middleware) {
        self.add_middleware(Phase::Post, middleware);
    }

    /// Removes every middleware whose id is in `ids`, across all lanes.
    /// Returns false when `ids` is empty or nothing matched.
    pub fn remove_by_id(&self, ids: &[MiddlewareId]) -> bool {
        if ids.is_empty() {
            return false;
        }
        let mut removed = false;
        for lane in &self.inner.lanes {
            let mut guard = lane.write();
            let before = guard.len();
            guard.retain(|m| !ids.contains(&m.id()));
            removed |= guard.len() != before;
        }
        removed
    }

    /// Removes every middleware carrying the tag, across all lanes.
    /// Returns the number removed.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        let mut removed = 0;
        for lane in &self.inner.lanes {
            let mut guard = lane.write();
            let before = guard.len();
            guard.retain(|m| !m.has_tag(tag));
            removed += before - guard.len();
        }
        if removed > 0 {
            debug!(tag, removed, "middleware removed by tag");
        }
        removed
    }

    /// Empties one lane.
    pub fn clear_lane(&self, phase: Phase) {
        self.inner.lanes[phase.index()].write().clear();
    }

    /// Empties all four lanes.
    pub fn clear(&self) {
        for lane in &self.inner.lanes {
            lane.write().clear();
        }
    }

    /// Number of middleware in a lane.
    pub fn middleware_count(&self, phase: Phase) -> usize {
        self.inner.lanes[phase.index()].read().len()
    }

    /// Takes the fault channel receiver. Yields `Some` exactly once; a
    /// supervisor task is expected to own it for the bus's lifetime.
    pub fn fault_receiver(&self) -> Option<UnboundedReceiver<WorkerFault>> {
        self.inner.fault_rx.lock().take()
    }

    /// Publishes an event through the pipeline.
    ///
    /// Returns once the pre and post lanes have run; detached workers from
    /// the async and sync lanes may still be in flight. Lane membership is
    /// snapshotted per phase, so registrations made while a publish is in
    /// progress affect later phases of that same publish.
    pub async fn publish(&self, event: Event) -> PublishOutcome {
        let kind = event.kind();
        let span =
            tracing::debug_span!("publish", kind = %kind, event_id = %event.core().event_id);
        self.publish_inner(event, kind).instrument(span).await
    }

    async fn publish_inner(&self, mut event: Event, kind: EventKind) -> PublishOutcome {
        for middleware in self.snapshot(Phase::Pre, kind) {
            match middleware.run(event).await {
                Some(next) => event = next,
                None => {
                    debug!(middleware = %middleware.id(), "event truncated in pre phase");
                    return PublishOutcome::Truncated;
                }
            }
        }

        for middleware in self.snapshot(Phase::Async, kind) {
            self.spawn_supervised(&middleware, Phase::Async, event.clone());
        }
        for middleware in self.snapshot(Phase::Sync, kind) {
            self.spawn_supervised(&middleware, Phase::Sync, event.clone());
        }

        for middleware in self.snapshot(Phase::Post, kind) {
            match middleware.run(event).await {
                Some(next) => event = next,
                None => {
                    debug!(middleware = %middleware.id(), "post phase truncated");
                    break;
                }
            }
        }

        PublishOutcome::Delivered
    }

    /// Resolves once no detached worker is in flight.
    ///
    /// This is the explicit quiescent point for the non-awaited sync and
    /// async lanes; graceful shutdown publishes its last event and then
    /// awaits this before dropping the runtime.
    pub async fn settled(&self) {
        loop {
            let notified = self.inner.quiescent.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn snapshot(&self, phase: Phase, kind: EventKind) -> Vec<Middleware> {
        self.inner.lanes[phase.index()]
            .read()
            .iter()
            .filter(|m| m.applies_to(kind))
            .cloned()
            .collect()
    }

    fn spawn_supervised(&self, middleware: &Middleware, phase: Phase, event: Event) {
        let id = middleware.id();
        let handle = middleware.run_detached(event);
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.clone();
        tokio::spawn(async move {
            if let Err(err) = handle.await
                && err.is_panic()
            {
                error!(middleware = %id, phase = %phase, "detached worker panicked");
                let _ = inner.fault_tx.send(WorkerFault {
                    middleware: id,
                    phase,
                });
            }
            if inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                inner.quiescent.notify_waiters();
            }
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("pre", &self.middleware_count(Phase::Pre))
            .field("async", &self.middleware_count(Phase::Async))
            .field("sync", &self.middleware_count(Phase::Sync))
            .field("post", &self.middleware_count(Phase::Post))
            .field("in_flight", &self.inner.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientId;
    use crate::event::{
        DisconnectedEvent, EventCore, GroupMessageEvent, MessageCore,
        PrivateMessageEvent,
    };
    use crate::message::MessageBody;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    fn group_message(text: &str) -> Event {
        Event::GroupMessage(GroupMessageEvent {
            message: MessageCore {
                core: EventCore::new(ClientId::nil(), 1000),
                message_id: 1,
                sender_id: 2,
                sender_name: "s".into(),
                sender_is_friend: false,
                group_id: 3,
                group_name: "g".into(),
                body: MessageBody::from(text),
            },
        })
    }

    fn private_message(text: &str) -> Event {
        Event::PrivateMessage(PrivateMessageEvent {
            message: MessageCore {
                core: EventCore::new(ClientId::nil(), 1000),
                message_id: 1,
                sender_id: 2,
                sender_name: "s".into(),
                sender_is_friend: true,
                group_id: 2,
                group_name: "s".into(),
                body: MessageBody::from(text),
            },
            target_id: 1000,
        })
    }

    fn counting(counter: Arc<AtomicUsize>) -> Middleware {
        Middleware::new().then_fn(move |event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(event)
            }
        })
    }

    #[tokio::test]
    async fn kind_filter_routes_events() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.add_pre_middleware(
            counting(hits.clone()).on_kinds([EventKind::GroupMessage]),
        );

        bus.publish(private_message("a")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.publish(group_message("b")).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pre_truncation_cancels_every_later_phase() {
        let bus = EventBus::new();
        let later = Arc::new(AtomicUsize::new(0));
        bus.add_pre_middleware(Middleware::new().then_fn(|_| async move { None }));
        bus.add_async_middleware(counting(later.clone()));
        bus.add_sync_middleware(counting(later.clone()));
        bus.add_post_middleware(counting(later.clone()));

        let outcome = bus.publish(group_message("drop me")).await;
        bus.settled().await;

        assert_eq!(outcome, PublishOutcome::Truncated);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pre_transform_is_visible_to_post() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(String::new()));
        let seen2 = seen.clone();

        bus.add_pre_middleware(Middleware::new().then_fn(|mut event: Event| async move {
            if let Some(message) = event.message_core_mut() {
                message.body = MessageBody::from("rewritten");
            }
            Some(event)
        }));
        bus.add_post_middleware(Middleware::new().then_fn(move |event: Event| {
            let seen = seen2.clone();
            async move {
                if let Some(message) = event.message_core() {
                    *seen.lock() = message.body.plain_text();
                }
                Some(event)
            }
        }));

        bus.publish(group_message("original")).await;
        assert_eq!(*seen.lock(), "rewritten");
    }

    #[tokio::test]
    async fn detached_workers_mutate_clones_not_the_pipeline_event() {
        let bus = EventBus::new();
        let post_saw = Arc::new(Mutex::new(String::new()));
        let post_saw2 = post_saw.clone();

        bus.add_async_middleware(Middleware::new().then_fn(|mut event: Event| async move {
            if let Some(message) = event.message_core_mut() {
                message.body.push_text(" tampered");
            }
            Some(event)
        }));
        bus.add_post_middleware(Middleware::new().then_fn(move |event: Event| {
            let post_saw = post_saw2.clone();
            async move {
                if let Some(message) = event.message_core() {
                    *post_saw.lock() = message.body.plain_text();
                }
                Some(event)
            }
        }));

        bus.publish(group_message("clean")).await;
        bus.settled().await;
        assert_eq!(*post_saw.lock(), "clean");
    }

    #[tokio::test]
    async fn publish_does_not_await_sync_workers() {
        let bus = EventBus::new();
        let gate = Arc::new(Semaphore::new(0));
        let done = Arc::new(AtomicUsize::new(0));
        let gate2 = gate.clone();
        let done2 = done.clone();

        bus.add_sync_middleware(Middleware::new().then_fn(move |event| {
            let gate = gate2.clone();
            let done = done2.clone();
            async move {
                let _permit = gate.acquire().await.expect("gate open");
                done.fetch_add(1, Ordering::SeqCst);
                Some(event)
            }
        }));

        let outcome = bus.publish(group_message("x")).await;
        assert!(outcome.is_delivered());
        assert_eq!(done.load(Ordering::SeqCst), 0);

        gate.add_permits(1);
        bus.settled().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_worker_reports_a_fault() {
        let bus = EventBus::new();
        let mut faults = bus.fault_receiver().expect("first take");
        assert!(bus.fault_receiver().is_none());

        let bad = Middleware::new()
            .then_fn(|_: Event| async move { panic!("handler bug") });
        let bad_id = bad.id();
        bus.add_async_middleware(bad);

        bus.publish(group_message("boom")).await;
        bus.settled().await;

        let fault = faults.recv().await.expect("fault delivered");
        assert_eq!(fault.middleware, bad_id);
        assert_eq!(fault.phase, Phase::Async);
    }

    #[tokio::test]
    async fn remove_by_tag_purges_all_lanes() {
        let bus = EventBus::new();
        for phase in Phase::ALL {
            bus.add_middleware(phase, Middleware::new().tagged(["plugin"]));
            bus.add_middleware(phase, Middleware::new().tagged(["keep"]));
        }

        assert_eq!(bus.remove_by_tag("plugin"), 4);
        for phase in Phase::ALL {
            assert_eq!(bus.middleware_count(phase), 1);
        }
    }

    #[tokio::test]
    async fn remove_by_id_handles_empty_and_stale_input() {
        let bus = EventBus::new();
        let kept = Middleware::new();
        let dropped = Middleware::new();
        let dropped_id = dropped.id();
        bus.add_pre_middleware(kept);
        bus.add_sync_middleware(dropped);

        assert!(!bus.remove_by_id(&[]));
        assert!(bus.remove_by_id(&[dropped_id]));
        assert!(!bus.remove_by_id(&[dropped_id]));
        assert_eq!(bus.middleware_count(Phase::Pre), 1);
        assert_eq!(bus.middleware_count(Phase::Sync), 0);
    }

    #[tokio::test]
    async fn settled_returns_immediately_when_idle() {
        let bus = EventBus::new();
        let event = Event::Disconnected(DisconnectedEvent {
            core: EventCore::new(ClientId::nil(), 0),
        });
        bus.publish(event).await;
        bus.settled().await;
    }
}
