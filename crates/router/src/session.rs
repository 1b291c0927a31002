//! Navigation sessions.
//!
//! A [`NavigationSession`] owns everything one displayed route created outside
//! the content container: window and document listeners, background tasks,
//! intervals and retained objects such as table controllers. Tearing it down
//! releases all of them. Teardown is idempotent and also runs on drop.
//!
//! Page modules only see a [`PageContext`]. Once the session is torn down, the
//! context refuses new registrations, so a page initializer that is still
//! running when its route is left cannot leak into the next page.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use stage::{Document, ElementRef, Event, EventBus, Subscription, Target};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::BoxFuture;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

pub(crate) type IdleWait = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// What a teardown released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeardownReport {
    pub listeners: usize,
    pub tasks: usize,
    pub retained: usize,
}

struct SessionInner {
    id: u64,
    route: String,
    started_at: Instant,
    closed: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    retained: Mutex<Vec<Box<dyn Any + Send + Sync>>>,
    idle_waits: Mutex<Vec<IdleWait>>,
}

impl SessionInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn teardown(&self) -> Option<TeardownReport> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return None;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let retained = std::mem::take(&mut *self.retained.lock());
        self.idle_waits.lock().clear();

        for task in &tasks {
            task.abort();
        }
        let report = TeardownReport {
            listeners: subscriptions.len(),
            tasks: tasks.len(),
            retained: retained.len(),
        };
        drop(subscriptions);
        drop(retained);

        debug!(
            session = self.id,
            route = %self.route,
            listeners = report.listeners,
            tasks = report.tasks,
            retained = report.retained,
            duration_ms = self.started_at.elapsed().as_millis() as u64,
            "session torn down"
        );
        Some(report)
    }
}

/// Resource scope of the currently displayed route.
pub struct NavigationSession {
    inner: Arc<SessionInner>,
    document: Document,
    bus: EventBus,
}

impl fmt::Debug for NavigationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationSession")
            .field("id", &self.inner.id)
            .field("route", &self.inner.route)
            .field("closed", &self.inner.is_closed())
            .finish_non_exhaustive()
    }
}

impl NavigationSession {
    /// Opens a session for `route`.
    pub fn new(route: impl Into<String>, document: Document, bus: EventBus) -> Self {
        let inner = Arc::new(SessionInner {
            id: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            route: route.into(),
            started_at: Instant::now(),
            closed: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            retained: Mutex::new(Vec::new()),
            idle_waits: Mutex::new(Vec::new()),
        });
        debug!(session = inner.id, route = %inner.route, "session opened");
        Self {
            inner,
            document,
            bus,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[must_use]
    pub fn route(&self) -> &str {
        &self.inner.route
    }

    /// Handle given to the route's page module.
    #[must_use]
    pub fn context(&self) -> PageContext {
        PageContext {
            session: Arc::clone(&self.inner),
            document: self.document.clone(),
            bus: self.bus.clone(),
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Tracked listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Releases everything the session owns.
    ///
    /// Returns `None` when the session was already torn down.
    pub fn teardown(&self) -> Option<TeardownReport> {
        self.inner.teardown()
    }

    pub(crate) fn idle_waits(&self) -> Vec<IdleWait> {
        self.inner.idle_waits.lock().clone()
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

/// What a page module may use while its route is displayed.
#[derive(Clone)]
pub struct PageContext {
    session: Arc<SessionInner>,
    document: Document,
    bus: EventBus,
}

impl fmt::Debug for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("session", &self.session.id)
            .field("route", &self.session.route)
            .finish_non_exhaustive()
    }
}

impl PageContext {
    /// Route this context belongs to.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.session.route
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Whether the route is still displayed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.session.is_closed()
    }

    /// Looks up an element of the page.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<ElementRef> {
        self.document.get_element_by_id(id)
    }

    /// Listens for `E` on the window or document until the route is left.
    ///
    /// Returns `false`, registering nothing, when the route was already left.
    pub fn listen_global<E, F>(&self, target: Target, handler: F) -> bool
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut subscriptions = self.session.subscriptions.lock();
        if self.session.is_closed() {
            debug!(session = self.session.id, event = E::NAME, "listener refused, session closed");
            return false;
        }
        subscriptions.push(self.bus.subscribe::<E, F>(target, handler));
        true
    }

    /// Listens for `E` on one element of the page.
    pub fn listen<E, F>(&self, element: &ElementRef, handler: F) -> bool
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listen_global(element.target(), handler)
    }

    /// Runs `task` until it finishes or the route is left.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!(session = self.session.id, "no runtime to spawn page task");
            return false;
        };
        let mut tasks = self.session.tasks.lock();
        if self.session.is_closed() {
            return false;
        }
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle.spawn(task));
        true
    }

    /// Calls `tick` every `period` until the route is left.
    ///
    /// The first call happens one period from now.
    pub fn interval<F>(&self, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        self.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut timer = tokio::time::interval_at(start, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                tick();
            }
        })
    }

    /// Keeps `value` alive until the route is left.
    pub fn retain<T: Send + Sync + 'static>(&self, value: T) {
        let mut retained = self.session.retained.lock();
        if !self.session.is_closed() {
            retained.push(Box::new(value));
        }
    }

    /// Registers a future factory that resolves once some page work is idle.
    ///
    /// [`crate::Router::wait_idle`] awaits every idle wait of the current session.
    pub fn track_idle<F>(&self, wait: F)
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let mut waits = self.session.idle_waits.lock();
        if !self.session.is_closed() {
            waits.push(Arc::new(wait));
        }
    }
}
