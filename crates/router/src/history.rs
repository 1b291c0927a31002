//! In-memory navigation history.
//!
//! Mirrors the browser history API: `push` and `replace` change the current
//! entry silently, `back` and `forward` move the cursor and emit a
//! [`PopState`] on the window for the router to act on.

use std::sync::Arc;

use parking_lot::Mutex;
use stage::{EventBus, Target};
use tracing::debug;

use crate::events::PopState;

/// How the current entry was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationType {
    Push,
    Replace,
    Pop,
}

#[derive(Debug)]
struct State {
    entries: Vec<String>,
    index: usize,
    last: NavigationType,
}

/// Shared history stack. Clones see the same stack.
#[derive(Debug, Clone)]
pub struct History {
    state: Arc<Mutex<State>>,
    bus: EventBus,
}

impl History {
    /// Starts a history whose only entry is `initial`.
    pub fn new(bus: EventBus, initial: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: vec![initial.into()],
                index: 0,
                last: NavigationType::Replace,
            })),
            bus,
        }
    }

    /// The current path.
    #[must_use]
    pub fn current(&self) -> String {
        let state = self.state.lock();
        state.entries[state.index].clone()
    }

    /// How the current entry was reached.
    #[must_use]
    pub fn last_navigation(&self) -> NavigationType {
        self.state.lock().last
    }

    /// Adds `path` after the current entry, dropping any forward entries.
    pub fn push(&self, path: impl Into<String>) {
        let path = path.into();
        let mut state = self.state.lock();
        let keep = state.index + 1;
        state.entries.truncate(keep);
        state.entries.push(path.clone());
        state.index = keep;
        state.last = NavigationType::Push;
        debug!(%path, depth = state.entries.len(), "history push");
    }

    /// Overwrites the current entry.
    pub fn replace(&self, path: impl Into<String>) {
        let path = path.into();
        let mut state = self.state.lock();
        let index = state.index;
        state.entries[index] = path.clone();
        state.last = NavigationType::Replace;
        debug!(%path, "history replace");
    }

    /// Steps back one entry and emits [`PopState`]. Returns the new path.
    pub fn back(&self) -> Option<String> {
        self.step(-1)
    }

    /// Steps forward one entry and emits [`PopState`]. Returns the new path.
    pub fn forward(&self) -> Option<String> {
        self.step(1)
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.state.lock().index > 0
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        let state = self.state.lock();
        state.index + 1 < state.entries.len()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn step(&self, delta: isize) -> Option<String> {
        let path = {
            let mut state = self.state.lock();
            let index = state.index.checked_add_signed(delta)?;
            if index >= state.entries.len() {
                return None;
            }
            state.index = index;
            state.last = NavigationType::Pop;
            state.entries[index].clone()
        };
        debug!(%path, "history pop");
        self.bus.emit(Target::Window, &PopState { path: path.clone() });
        Some(path)
    }
}
