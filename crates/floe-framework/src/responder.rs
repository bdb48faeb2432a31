//! Responders: typed callbacks bound to bus middleware.
//!
//! A [`Responder`] is a builder that collects event kinds, [`Rule`]s and
//! typed handlers, then registers one middleware per used lane on the bus.
//! Handlers are plain async functions over an [`EventView`]; the binder
//! wraps them so that kind acceptance and rule evaluation happen before the
//! view is extracted, and a handler whose view or rules do not apply simply
//! passes the event along unchanged rather than truncating the chain.
//!
//! Two handler shapes are accepted, distinguished by return type:
//!
//! - **consumers** `async fn(V)` observe the view;
//! - **transformers** `async fn(V) -> V` have their result merged back into
//!   the event, visible to later handlers in the same chain (and, in the pre
//!   lane, to every later phase).
//!
//! Rules are snapshotted when `handle`/`handle_in` is called, so rules must
//! be added before the handlers they are meant to guard.

use std::future::Future;
use std::sync::Arc;

use floe_core::bus::{EventBus, Phase};
use floe_core::event::{Event, EventKind};
use floe_core::middleware::{handler_fn, EventHandler, Middleware, MiddlewareId};
use floe_core::view::EventView;

use crate::rule::Rule;

/// A typed handler acceptable to [`Responder::handle`].
///
/// Implemented for async functions over any [`EventView`], in consumer and
/// transformer shape. The marker parameter `T` only disambiguates the two
/// blanket impls.
pub trait ResponderHandler<T>: Send + Sync + Sized + 'static {
    /// Wraps the function into a chain step guarded by the given rules.
    fn bind(self, rules: Vec<Rule>) -> EventHandler;
}

/// Marker for `async fn(V)` handlers.
pub struct Consumer<V>(std::marker::PhantomData<V>);

/// Marker for `async fn(V) -> V` handlers.
pub struct Transformer<V>(std::marker::PhantomData<V>);

impl<F, Fut, V> ResponderHandler<Consumer<V>> for F
where
    F: Fn(V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    V: EventView,
{
    fn bind(self, rules: Vec<Rule>) -> EventHandler {
        let f = Arc::new(self);
        handler_fn(move |mut event: Event| {
            let f = f.clone();
            let rules = rules.clone();
            async move {
                if !V::accepts(event.kind()) {
                    return Some(event);
                }
                for rule in &rules {
                    if !rule.check(&mut event) {
                        return Some(event);
                    }
                }
                match V::extract(&event) {
                    Some(view) => {
                        f(view).await;
                        Some(event)
                    }
                    None => Some(event),
                }
            }
        })
    }
}

impl<F, Fut, V> ResponderHandler<Transformer<V>> for F
where
    F: Fn(V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = V> + Send + 'static,
    V: EventView,
{
    fn bind(self, rules: Vec<Rule>) -> EventHandler {
        let f = Arc::new(self);
        handler_fn(move |mut event: Event| {
            let f = f.clone();
            let rules = rules.clone();
            async move {
                if !V::accepts(event.kind()) {
                    return Some(event);
                }
                for rule in &rules {
                    if !rule.check(&mut event) {
                        return Some(event);
                    }
                }
                match V::extract(&event) {
                    Some(view) => {
                        f(view).await.merge(&mut event);
                        Some(event)
                    }
                    None => Some(event),
                }
            }
        })
    }
}

/// Builder binding typed handlers to the bus.
pub struct Responder {
    bus: EventBus,
    kinds: Vec<EventKind>,
    rules: Vec<Rule>,
    tags: Vec<String>,
    chains: [Middleware; 4],
}

fn lane_index(phase: Phase) -> usize {
    match phase {
        Phase::Pre => 0,
        Phase::Async => 1,
        Phase::Sync => 2,
        Phase::Post => 3,
    }
}

impl Responder {
    /// Starts a responder on the given bus, matching every kind until
    /// [`on_kinds`](Self::on_kinds) narrows it.
    pub fn new(bus: &EventBus) -> Self {
        Self {
            bus: bus.clone(),
            kinds: Vec::new(),
            rules: Vec::new(),
            tags: Vec::new(),
            chains: [
                Middleware::new(),
                Middleware::new(),
                Middleware::new(),
                Middleware::new(),
            ],
        }
    }

    /// Narrows the responder to the given kinds. Cumulative.
    pub fn on_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = EventKind>,
    {
        for kind in kinds {
            if !self.kinds.contains(&kind) {
                self.kinds.push(kind);
            }
        }
        self
    }

    /// Adds a guard rule for handlers registered after this call.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Labels the registered middleware for bulk removal.
    pub fn tagged<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Binds a handler into the sync lane, the default for side-effect
    /// responders.
    pub fn handle<F, T>(self, f: F) -> Self
    where
        F: ResponderHandler<T>,
    {
        self.handle_in(Phase::Sync, f)
    }

    /// Binds a handler into the given lane.
    pub fn handle_in<F, T>(mut self, phase: Phase, f: F) -> Self
    where
        F: ResponderHandler<T>,
    {
        let step = f.bind(self.rules.clone());
        let idx = lane_index(phase);
        let chain = self.chains[idx].clone().then(step);
        self.chains[idx] = chain;
        self
    }

    /// Registers one middleware per lane that received handlers. Lanes
    /// without handlers are skipped entirely.
    pub fn register(self) -> ResponderHandle {
        let mut ids = Vec::new();
        for phase in Phase::ALL {
            let chain = self.chains[lane_index(phase)].clone();
            if chain.handler_count() == 0 {
                continue;
            }
            let chain = chain
                .on_kinds(self.kinds.iter().copied())
                .tagged(self.tags.iter().cloned());
            ids.push(chain.id());
            self.bus.add_middleware(phase, chain);
        }
        ResponderHandle {
            bus: self.bus,
            ids,
        }
    }
}

/// Handle to a registered responder, used for removal.
#[derive(Debug, Clone)]
pub struct ResponderHandle {
    bus: EventBus,
    ids: Vec<MiddlewareId>,
}

impl ResponderHandle {
    /// Removes the responder's middleware from every lane. Idempotent:
    /// returns false when nothing was left to remove.
    pub fn remove(&self) -> bool {
        self.bus.remove_by_id(&self.ids)
    }

    /// Ids of the registered middleware, one per used lane.
    pub fn middleware_ids(&self) -> &[MiddlewareId] {
        &self.ids
    }
}
