//! Events the router emits or reacts to.

use stage::Event;

/// A navigation finished rendering. Emitted on the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLoaded {
    pub path: String,
}

impl Event for ContentLoaded {
    const NAME: &'static str = "contentLoaded";
}

/// Navigation highlighting settled on a title for `path`. Emitted on the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChangeCompleted {
    pub path: String,
    pub title: String,
}

impl Event for RouteChangeCompleted {
    const NAME: &'static str = "routeChangeCompleted";
}

/// An anchor was clicked. Emitted on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkClick {
    pub href: String,
}

impl Event for LinkClick {
    const NAME: &'static str = "click";
}

/// History moved back or forward to `path`. Emitted on the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopState {
    pub path: String,
}

impl Event for PopState {
    const NAME: &'static str = "popstate";
}

/// The viewport changed size. Emitted on the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub width: u16,
    pub height: u16,
}

impl Event for Resize {
    const NAME: &'static str = "resize";
}
