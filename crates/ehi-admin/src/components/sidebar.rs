//! Sidebar navigation.
//!
//! The sidebar lives in its own root element so navigation never clears it.
//! Every menu link is an affordance labelled `nav:{path}` that emits a
//! [`LinkClick`] on the document, exactly like clicking an anchor.
//!
//! After each navigation the sidebar marks the active link, works out the page
//! title and announces it with [`RouteChangeCompleted`].

use std::sync::Arc;

use parking_lot::RwLock;
use router::{ContentLoaded, LinkClick, MountConfig, RouteChangeCompleted};
use stage::{Affordance, Document, ElementRef, EventBus, Subscription, Target};
use tracing::{debug, warn};

/// Id of the sidebar root element.
pub const SIDEBAR_ROOT: &str = "app-sidebar";

/// Title used when no menu link matches.
pub const DEFAULT_TITLE: &str = "Ehi Centre";

/// One sidebar entry.
#[derive(Debug, Clone, Copy)]
pub enum MenuEntry {
    Link {
        label: &'static str,
        href: &'static str,
    },
    Group {
        label: &'static str,
        items: &'static [(&'static str, &'static str)],
    },
}

/// The dashboard menu, with hrefs relative to the mount prefix.
pub const MENU: &[MenuEntry] = &[
    MenuEntry::Link { label: "Dashboard", href: "/dashboard" },
    MenuEntry::Link { label: "User Data", href: "/users" },
    MenuEntry::Link { label: "Donor Data", href: "/donors" },
    MenuEntry::Link { label: "Programme Data", href: "/programmes" },
    MenuEntry::Link { label: "Disbursement", href: "/disbursement" },
    MenuEntry::Group {
        label: "Finance",
        items: &[
            ("Balance Sheet", "/finance/balance-sheet"),
            ("Assets", "/finance/assets"),
            ("Liabilities", "/finance/liabilities"),
            ("Receipt", "/finance/receipt"),
            ("Expenses", "/finance/expenses"),
        ],
    },
    MenuEntry::Group {
        label: "Report",
        items: &[
            ("Segregation", "/reports/segregation"),
            ("Beneficiary Domain", "/reports/beneficiary-domain"),
            ("Donor Domain", "/reports/donor-domain"),
            ("Programme Domain", "/reports/programme-domain"),
            ("Receipt Report", "/reports/receipt-report"),
            ("Expenses Report", "/reports/expenses-report"),
        ],
    },
    MenuEntry::Link { label: "Archive", href: "/archive" },
    MenuEntry::Link { label: "Admin", href: "/admin" },
];

/// Title of the page at `path`: the link label, `Group > Label` inside a
/// group, [`DEFAULT_TITLE`] when the path is not in the menu.
#[must_use]
pub fn title_for(mount: &MountConfig, path: &str) -> String {
    let relative = mount.relative(path);
    for entry in MENU {
        match entry {
            MenuEntry::Link { label, href } if *href == relative => return (*label).to_string(),
            MenuEntry::Group { label, items } => {
                if let Some((item, _)) = items.iter().find(|(_, href)| *href == relative) {
                    return format!("{label} > {item}");
                }
            }
            MenuEntry::Link { .. } => {}
        }
    }
    DEFAULT_TITLE.to_string()
}

struct State {
    mount: MountConfig,
    document: Document,
    bus: EventBus,
    element: ElementRef,
    active: RwLock<Option<String>>,
}

impl State {
    fn render(&self) {
        let active = self.active.read().clone();
        let marker = |href: &str| {
            let full = format!("{}{href}", self.mount.mount_prefix);
            if active.as_deref() == Some(full.as_str()) { "▸" } else { " " }
        };
        let mut lines = Vec::new();
        let mut links = Vec::new();
        let mut link = |href: &str| {
            links.push(Affordance::new(
                format!("nav:{href}"),
                Target::Document,
                LinkClick {
                    href: format!("{}{href}", self.mount.mount_prefix),
                },
            ));
        };
        for entry in MENU {
            match entry {
                MenuEntry::Link { label, href } => {
                    lines.push(format!("{} {label}", marker(*href)));
                    link(*href);
                }
                MenuEntry::Group { label, items } => {
                    lines.push(format!("  {label}"));
                    for (item, href) in *items {
                        lines.push(format!("  {} {item}", marker(*href)));
                        link(*href);
                    }
                }
            }
        }
        if let Err(e) = self
            .document
            .set_text(&self.element, &lines.join("\n"))
            .and_then(|_| self.document.set_affordances(&self.element, links))
        {
            warn!(error = %e, "sidebar could not be drawn");
        }
    }

    fn on_content_loaded(&self, path: &str) {
        *self.active.write() = Some(path.to_string());
        self.render();
        let title = title_for(&self.mount, path);
        debug!(%path, %title, "navigation highlighted");
        self.bus.emit(
            Target::Window,
            &RouteChangeCompleted {
                path: path.to_string(),
                title,
            },
        );
    }
}

/// The mounted sidebar. Dropping it stops the highlighting.
pub struct Sidebar {
    state: Arc<State>,
    _loaded: Subscription,
}

impl std::fmt::Debug for Sidebar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sidebar")
            .field("active", &*self.state.active.read())
            .finish_non_exhaustive()
    }
}

impl Sidebar {
    /// Draws the menu and starts following navigations.
    pub fn install(document: Document, bus: EventBus, mount: MountConfig) -> Self {
        let element = document.root(SIDEBAR_ROOT);
        let state = Arc::new(State {
            mount,
            document,
            bus: bus.clone(),
            element,
            active: RwLock::new(None),
        });
        state.render();

        let handler = Arc::clone(&state);
        let loaded = bus.subscribe::<ContentLoaded, _>(Target::Window, move |e| {
            handler.on_content_loaded(&e.path);
        });
        Self {
            state,
            _loaded: loaded,
        }
    }

    /// Path of the highlighted link.
    #[must_use]
    pub fn active(&self) -> Option<String> {
        self.state.active.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_titles() {
        let mount = MountConfig::default();
        assert_eq!(title_for(&mount, "/ehi/users"), "User Data");
        assert_eq!(title_for(&mount, "/ehi/finance/assets"), "Finance > Assets");
        assert_eq!(
            title_for(&mount, "/ehi/reports/programme-domain"),
            "Report > Programme Domain"
        );
        assert_eq!(title_for(&mount, "/ehi/unknown"), DEFAULT_TITLE);
    }

    #[test]
    fn test_highlights_and_announces() {
        let document = Document::new();
        let bus = EventBus::new();
        let sidebar = Sidebar::install(document.clone(), bus.clone(), MountConfig::default());
        let titles = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let t = Arc::clone(&titles);
        let _sub = bus.subscribe::<RouteChangeCompleted, _>(Target::Window, move |e| {
            t.lock().push(e.title.clone());
        });

        bus.emit(Target::Window, &ContentLoaded { path: "/ehi/finance/receipt".into() });
        assert_eq!(sidebar.active().as_deref(), Some("/ehi/finance/receipt"));
        assert_eq!(*titles.lock(), vec!["Finance > Receipt"]);
        let text = document.content_of(SIDEBAR_ROOT).unwrap();
        assert!(text.contains("▸ Receipt"));
        assert!(!text.contains("▸ Dashboard"));
    }

    #[test]
    fn test_links_emit_clicks() {
        let document = Document::new();
        let bus = EventBus::new();
        let _sidebar = Sidebar::install(document.clone(), bus.clone(), MountConfig::default());
        let clicks = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&clicks);
        let _sub = bus.subscribe::<LinkClick, _>(Target::Document, move |e| {
            assert_eq!(e.href, "/ehi/donors");
            c.fetch_add(1, Ordering::SeqCst);
        });
        document.activate(&bus, "nav:/donors").unwrap();
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }
}
