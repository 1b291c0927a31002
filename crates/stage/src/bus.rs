//! Typed publish/subscribe between decoupled components.
//!
//! Listeners are keyed by the [`Target`] they are attached to and the concrete
//! event type. Emitting an event only reaches listeners registered for that
//! exact pair, which mirrors dispatching a custom event on one element.
//!
//! # Example
//!
//! ```rust
//! use stage::{Event, EventBus, Target};
//!
//! #[derive(Debug)]
//! struct Resized(u16);
//!
//! impl Event for Resized {
//!     const NAME: &'static str = "resize";
//! }
//!
//! let bus = EventBus::new();
//! let sub = bus.subscribe::<Resized, _>(Target::Window, |e| assert_eq!(e.0, 80));
//! assert_eq!(bus.emit(Target::Window, &Resized(80)), 1);
//!
//! drop(sub);
//! assert_eq!(bus.emit(Target::Window, &Resized(80)), 0);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::document::NodeId;

/// A payload that can travel over the [`EventBus`].
///
/// `NAME` is the wire-style event name used in logs (`"pagination:pageChange"`,
/// `"contentLoaded"`, ...).
pub trait Event: Any + Send + Sync + 'static {
    /// Event name used for diagnostics.
    const NAME: &'static str;
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Process-wide listeners (resize, history, row actions).
    Window,
    /// Document-wide listeners (link clicks).
    Document,
    /// Listeners bound to one element node. Dropped when the node is removed.
    Element(NodeId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window => write!(f, "window"),
            Self::Document => write!(f, "document"),
            Self::Element(node) => write!(f, "element#{}", node.get()),
        }
    }
}

type Key = (Target, TypeId);
type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

struct Listener {
    id: u64,
    handler: Handler,
}

struct Inner {
    listeners: RwLock<HashMap<Key, Vec<Listener>>>,
    next_id: AtomicU64,
}

/// Event bus shared by the router, page modules and table controllers.
///
/// Cloning is cheap; every clone talks to the same listener registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `handler` for events of type `E` emitted on `target`.
    ///
    /// The listener lives exactly as long as the returned [`Subscription`].
    pub fn subscribe<E, F>(&self, target: Target, handler: F) -> Subscription
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });
        let key = (target, TypeId::of::<E>());
        self.inner
            .listeners
            .write()
            .entry(key)
            .or_default()
            .push(Listener { id, handler });
        trace!(event = E::NAME, %target, listener = id, "listener added");

        Subscription {
            bus: Arc::downgrade(&self.inner),
            key,
            id,
            event: E::NAME,
        }
    }

    /// Delivers `event` to every listener bound to `target`.
    ///
    /// Handlers run outside the registry lock, so they may subscribe,
    /// unsubscribe or emit. Returns the number of handlers invoked.
    pub fn emit<E: Event>(&self, target: Target, event: &E) -> usize {
        let handlers: Vec<Handler> = {
            let listeners = self.inner.listeners.read();
            listeners
                .get(&(target, TypeId::of::<E>()))
                .map(|list| list.iter().map(|l| Arc::clone(&l.handler)).collect())
                .unwrap_or_default()
        };
        trace!(event = E::NAME, %target, handlers = handlers.len(), "emit");
        for handler in &handlers {
            handler(event as &dyn Any);
        }
        handlers.len()
    }

    /// Drops every listener attached to `target`, whatever its event type.
    ///
    /// Returns the number of listeners removed.
    pub fn release_target(&self, target: Target) -> usize {
        let mut listeners = self.inner.listeners.write();
        let mut removed = 0;
        listeners.retain(|(t, _), list| {
            if *t == target {
                removed += list.len();
                false
            } else {
                true
            }
        });
        if removed > 0 {
            trace!(%target, removed, "listeners released");
        }
        removed
    }

    /// Number of `E` listeners currently bound to `target`.
    #[must_use]
    pub fn listener_count<E: Event>(&self, target: Target) -> usize {
        self.inner
            .listeners
            .read()
            .get(&(target, TypeId::of::<E>()))
            .map_or(0, Vec::len)
    }

    /// Number of listeners across all targets and event types.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.inner.listeners.read().values().map(Vec::len).sum()
    }
}

/// Handle to one registered listener.
///
/// Dropping the handle removes the listener. Dropping it after the bus is gone,
/// or after the target was released, is a no-op.
#[must_use = "dropping a Subscription removes its listener immediately"]
pub struct Subscription {
    bus: Weak<Inner>,
    key: Key,
    id: u64,
    event: &'static str,
}

impl Subscription {
    /// Name of the event this listener handles.
    #[must_use]
    pub fn event(&self) -> &'static str {
        self.event
    }

    /// Target the listener is attached to.
    #[must_use]
    pub fn target(&self) -> Target {
        self.key.0
    }

    /// Whether the listener is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.bus.upgrade().is_some_and(|inner| {
            inner
                .listeners
                .read()
                .get(&self.key)
                .is_some_and(|list| list.iter().any(|l| l.id == self.id))
        })
    }

    /// Removes the listener now. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("target", &self.key.0)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let mut listeners = inner.listeners.write();
        if let Some(list) = listeners.get_mut(&self.key) {
            list.retain(|l| l.id != self.id);
            if list.is_empty() {
                listeners.remove(&self.key);
            }
        }
        trace!(event = self.event, target = %self.key.0, listener = self.id, "listener removed");
    }
}
