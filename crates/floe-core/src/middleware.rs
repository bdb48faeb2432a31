//! Middleware: an ordered chain of async event handlers plus routing filters.
//!
//! A [`Middleware`] is cheap to clone; the chain lives behind an `Arc` and
//! builder methods copy-on-write through `Arc::make_mut`, so a clone taken by
//! the bus is unaffected by later builder calls on the original.
//!
//! Each handler receives the event by value and returns `Some(event)` to pass
//! it (possibly modified) to the next handler, or `None` to truncate the
//! chain. What truncation means beyond the chain itself is decided by the
//! phase the bus runs the chain in.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::trace;
use uuid::Uuid;

use crate::event::{Event, EventKind};

/// A single async step in a middleware chain.
///
/// Returning `None` truncates the chain.
pub type EventHandler =
    Arc<dyn Fn(Event) -> BoxFuture<'static, Option<Event>> + Send + Sync>;

/// Lifts an async closure into an [`EventHandler`].
pub fn handler_fn<F, Fut>(f: F) -> EventHandler
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Event>> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// Stable identity of a middleware, used for targeted removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MiddlewareId(Uuid);

impl MiddlewareId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MiddlewareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone)]
struct MiddlewareInner {
    id: MiddlewareId,
    kinds: Vec<EventKind>,
    tags: Vec<String>,
    handlers: Vec<EventHandler>,
}

/// An ordered handler chain with kind and tag filters.
///
/// An empty kind filter means the middleware is global and applies to every
/// kind. Tags are free-form labels used for bulk removal.
#[derive(Clone)]
pub struct Middleware {
    inner: Arc<MiddlewareInner>,
}

impl Middleware {
    /// Creates an empty global middleware with a fresh id.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MiddlewareInner {
                id: MiddlewareId::new(),
                kinds: Vec::new(),
                tags: Vec::new(),
                handlers: Vec::new(),
            }),
        }
    }

    /// Restricts the middleware to the given kinds. Cumulative.
    pub fn on_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = EventKind>,
    {
        let inner = Arc::make_mut(&mut self.inner);
        for kind in kinds {
            if !inner.kinds.contains(&kind) {
                inner.kinds.push(kind);
            }
        }
        self
    }

    /// Labels the middleware for bulk removal. Cumulative.
    pub fn tagged<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.inner)
            .tags
            .extend(tags.into_iter().map(Into::into));
        self
    }

    /// Appends a handler to the end of the chain.
    pub fn then(mut self, handler: EventHandler) -> Self {
        Arc::make_mut(&mut self.inner).handlers.push(handler);
        self
    }

    /// Appends an async closure to the end of the chain.
    pub fn then_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Event>> + Send + 'static,
    {
        self.then(handler_fn(f))
    }

    /// The middleware's stable identity.
    pub fn id(&self) -> MiddlewareId {
        self.inner.id
    }

    /// True when no kind filter is set.
    pub fn is_global(&self) -> bool {
        self.inner.kinds.is_empty()
    }

    /// Whether events of this kind are routed through the chain.
    pub fn applies_to(&self, kind: EventKind) -> bool {
        self.is_global() || self.inner.kinds.contains(&kind)
    }

    /// True when the middleware carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.inner.tags.iter().any(|t| t == tag)
    }

    /// Number of handlers in the chain.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    /// Runs the chain in order. Returns the event as left by the last
    /// handler, or `None` when a handler truncated.
    pub async fn run(&self, mut event: Event) -> Option<Event> {
        for handler in &self.inner.handlers {
            match handler(event).await {
                Some(next) => event = next,
                None => {
                    trace!(middleware = %self.inner.id, "chain truncated");
                    return None;
                }
            }
        }
        Some(event)
    }

    /// Runs the chain on its own task. The chain's outcome, including any
    /// transformed event, stays within the task.
    pub fn run_detached(&self, event: Event) -> tokio::task::JoinHandle<()> {
        let chain = self.clone();
        tokio::spawn(async move {
            let _ = chain.run(event).await;
        })
    }
}

impl Default for Middleware {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("id", &self.inner.id)
            .field("kinds", &self.inner.kinds)
            .field("tags", &self.inner.tags)
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientId;
    use crate::event::{DisconnectedEvent, EventCore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn probe() -> Event {
        Event::Disconnected(DisconnectedEvent {
            core: EventCore::new(ClientId::nil(), 0),
        })
    }

    #[tokio::test]
    async fn handlers_run_in_order_and_thread_the_event() {
        let chain = Middleware::new()
            .then_fn(|mut event: Event| async move {
                event.core_mut().tags.push("first".into());
                Some(event)
            })
            .then_fn(|mut event: Event| async move {
                event.core_mut().tags.push("second".into());
                Some(event)
            });

        let out = chain.run(probe()).await.expect("no truncation");
        assert_eq!(out.core().tags, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn truncation_stops_remaining_handlers() {
        let reached = Arc::new(AtomicUsize::new(0));
        let reached2 = reached.clone();

        let chain = Middleware::new()
            .then_fn(|_| async move { None })
            .then_fn(move |event| {
                let reached = reached2.clone();
                async move {
                    reached.fetch_add(1, Ordering::SeqCst);
                    Some(event)
                }
            });

        assert!(chain.run(probe()).await.is_none());
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clone_is_isolated_from_later_builder_calls() {
        let original = Middleware::new().then_fn(|e| async move { Some(e) });
        let snapshot = original.clone();
        let extended = original.then_fn(|e| async move { Some(e) });

        assert_eq!(snapshot.handler_count(), 1);
        assert_eq!(extended.handler_count(), 2);
        assert_eq!(snapshot.id(), extended.id());
    }

    #[test]
    fn kind_filter_and_tags() {
        let chain = Middleware::new()
            .on_kinds([EventKind::GroupMessage, EventKind::GroupMessage])
            .tagged(["logging"]);

        assert!(!chain.is_global());
        assert!(chain.applies_to(EventKind::GroupMessage));
        assert!(!chain.applies_to(EventKind::PrivateMessage));
        assert!(chain.has_tag("logging"));
        assert!(!chain.has_tag("metrics"));
    }

    #[tokio::test]
    async fn detached_run_completes() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let chain = Middleware::new().then_fn(move |event| {
            let ran = ran2.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Some(event)
            }
        });

        chain.run_detached(probe()).await.expect("worker join");
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
