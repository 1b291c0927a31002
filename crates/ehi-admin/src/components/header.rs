//! Page header: keeps the document title in step with navigation.

use router::RouteChangeCompleted;
use stage::{Document, EventBus, Subscription, Target};

use crate::components::sidebar::DEFAULT_TITLE;

/// Suffix of every document title.
pub const SITE_NAME: &str = "Ehi Centre";

/// Title shown for a page titled `title`.
#[must_use]
pub fn document_title(title: &str) -> String {
    format!("{title} | {SITE_NAME}")
}

/// The mounted header. Dropping it stops title updates.
#[derive(Debug)]
pub struct Header {
    _changed: Subscription,
}

impl Header {
    pub fn install(document: Document, bus: &EventBus) -> Self {
        document.set_title(document_title(DEFAULT_TITLE));
        let changed = bus.subscribe::<RouteChangeCompleted, _>(Target::Window, move |e| {
            document.set_title(document_title(&e.title));
        });
        Self { _changed: changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_follows_route_changes() {
        let document = Document::new();
        let bus = EventBus::new();
        let _header = Header::install(document.clone(), &bus);
        assert_eq!(document.title(), "Ehi Centre | Ehi Centre");

        bus.emit(
            Target::Window,
            &RouteChangeCompleted {
                path: "/ehi/finance/assets".into(),
                title: "Finance > Assets".into(),
            },
        );
        assert_eq!(document.title(), "Finance > Assets | Ehi Centre");
    }
}
