//! Navigation lifecycle tests: ordering, isolation, fallback and history.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use router::prelude::*;
use router::AssetError;
use stage::{Document, EventBus, Target};
use tokio::sync::Notify;

/// Memory assets where chosen paths block until released.
#[derive(Default)]
struct GatedAssets {
    inner: MemoryAssetSource,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    started: Mutex<Vec<String>>,
}

impl GatedAssets {
    fn gate(&self, path: &str) -> Arc<Notify> {
        Arc::clone(
            self.gates
                .lock()
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    fn template_fetches(&self) -> usize {
        self.started().iter().filter(|p| p.ends_with(".html")).count()
    }
}

#[async_trait]
impl AssetSource for GatedAssets {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let gate = self.gates.lock().get(path).cloned();
        self.started.lock().push(path.to_string());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.inner.fetch_text(path).await
    }
}

#[derive(Default)]
struct Counters {
    inits: Mutex<Vec<String>>,
    resizes: AtomicUsize,
}

struct Fixture {
    router: Arc<Router>,
    document: Document,
    bus: EventBus,
    assets: Arc<GatedAssets>,
    counters: Arc<Counters>,
}

fn fixture() -> Fixture {
    fixture_with(|_| {})
}

fn fixture_with(tweak: impl FnOnce(&MemoryAssetSource)) -> Fixture {
    let document = Document::new();
    let bus = EventBus::new();
    let assets = Arc::new(GatedAssets::default());
    for page in ["dashboard", "users", "donors", "archive"] {
        assets.inner.insert(
            format!("/ehi/app/templates/{page}.html"),
            format!(r#"<h1 id="{page}-title">{page}</h1>"#),
        );
    }
    assets
        .inner
        .insert("/ehi/app/templates/finance/assets.html", r#"<div id="assets-table"></div>"#);
    for sheet in ["dashboard", "users", "assets"] {
        assets
            .inner
            .insert(format!("/ehi/app/styles/layouts/{sheet}.css"), "body { }");
    }
    tweak(&assets.inner);

    let counters = Arc::new(Counters::default());
    let record = |name: &'static str, counters: &Arc<Counters>| {
        let counters = Arc::clone(counters);
        move |ctx: PageContext| {
            let counters = Arc::clone(&counters);
            async move {
                counters.inits.lock().push(name.to_string());
                let c = Arc::clone(&counters);
                ctx.listen_global::<Resize, _>(Target::Window, move |_| {
                    c.resizes.fetch_add(1, Ordering::SeqCst);
                });
                Ok::<(), ModuleError>(())
            }
        }
    };

    let modules = ModuleRegistry::new()
        .register_module(Module::new("dashboard").export("initDashboard", record("dashboard", &counters)))
        .register_module(Module::new("users").export("initUsers", record("users", &counters)))
        .register_module(Module::new("donors").export("initDonors", record("donors", &counters)))
        .register_module(
            Module::new("finance")
                .export("initFinance", record("finance", &counters))
                .export("initBroken", |_ctx: PageContext| async {
                    Err(ModuleError::init("database unavailable"))
                }),
        );

    let routes = RouteTable::new()
        .route(RouteEntry::new("/ehi/dashboard").module("dashboard", "initDashboard"))
        .route(RouteEntry::new("/ehi/users").module("users", "initUsers"))
        .route(RouteEntry::new("/ehi/donors").module("donors", "initDonors"))
        .route(RouteEntry::new("/ehi/archive").without_stylesheet())
        .route(RouteEntry::new("/ehi/finance/assets").module("finance", "initFinance"))
        .route(RouteEntry::new("/ehi/finance/report").module("finance", "initReport"))
        .route(RouteEntry::new("/ehi/finance/broken").module("finance", "initBroken"))
        .route(RouteEntry::new("/ehi/ghost").module("ghost", "initGhost"));

    let router = Router::builder(document.clone(), bus.clone())
        .routes(routes)
        .modules(modules)
        .assets(Arc::clone(&assets))
        .build();

    Fixture {
        router,
        document,
        bus,
        assets,
        counters,
    }
}

fn content(f: &Fixture) -> String {
    f.document.content(&f.document.content_root()).unwrap()
}

async fn wait_for_fetch(f: &Fixture, path: &str) {
    while !f.assets.started().iter().any(|p| p == path) {
        tokio::task::yield_now().await;
    }
}

fn listening_page(ctx: PageContext) -> impl std::future::Future<Output = Result<(), ModuleError>> {
    async move {
        ctx.listen_global::<Resize, _>(Target::Window, |_| {});
        Ok(())
    }
}

#[tokio::test]
async fn test_navigate_renders_template_and_runs_initializer() {
    let f = fixture();
    let loaded = Arc::new(Mutex::new(Vec::new()));
    let l = Arc::clone(&loaded);
    let _sub = f.bus.subscribe::<ContentLoaded, _>(Target::Window, move |e| {
        l.lock().push(e.path.clone());
    });

    let outcome = f.router.navigate("/ehi/users").await;
    assert_eq!(outcome, NavigationOutcome::Rendered { path: "/ehi/users".into() });
    assert!(content(&f).contains("users"));
    assert!(f.document.get_element_by_id("users-title").is_some());
    assert_eq!(*f.counters.inits.lock(), vec!["users"]);
    assert_eq!(f.router.phase(), NavigationPhase::Idle);
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/users"));
    assert_eq!(*loaded.lock(), vec!["/ehi/users"]);
}

#[tokio::test]
async fn test_root_aliases_show_default_route() {
    for alias in ["/", "/ehi", "/ehi/", "/ehi/app", "/ehi/app/"] {
        let f = fixture();
        let outcome = f.router.navigate(alias).await;
        assert_eq!(
            outcome,
            NavigationOutcome::Rendered { path: "/ehi/dashboard".into() },
            "{alias}"
        );
        assert_eq!(f.router.history().current(), "/ehi/dashboard");
        assert_eq!(f.router.history().len(), 1);
    }
}

#[tokio::test]
async fn test_window_listeners_do_not_survive_navigation() {
    let f = fixture();
    f.router.navigate("/ehi/dashboard").await;
    f.bus.emit(Target::Window, &Resize { width: 80, height: 24 });
    assert_eq!(f.counters.resizes.load(Ordering::SeqCst), 1);

    f.router.navigate("/ehi/archive").await;
    assert_eq!(f.bus.listener_count::<Resize>(Target::Window), 0);
    f.bus.emit(Target::Window, &Resize { width: 120, height: 40 });
    assert_eq!(f.counters.resizes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_visits_keep_one_listener() {
    let f = fixture();
    for _ in 0..5 {
        f.router.navigate("/ehi/users").await;
        f.router.navigate("/ehi/donors").await;
    }
    assert_eq!(f.bus.listener_count::<Resize>(Target::Window), 1);
    assert_eq!(f.router.session_listeners(), 1);
}

#[tokio::test]
async fn test_missing_template_falls_back_to_default() {
    let f = fixture();
    f.router.visit("/ehi/nowhere").await;

    assert_eq!(f.router.history().current(), "/ehi/dashboard");
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/dashboard"));
    assert!(f.document.get_element_by_id("dashboard-title").is_some());
    assert_eq!(
        f.assets.template_fetches(),
        2,
        "one failed fetch and one for the default"
    );
}

#[tokio::test]
async fn test_fallback_outcome() {
    let f = fixture();
    let outcome = f.router.navigate("/ehi/nowhere").await;
    assert_eq!(
        outcome,
        NavigationOutcome::FellBack {
            failed: "/ehi/nowhere".into(),
            default: "/ehi/dashboard".into(),
        }
    );
}

#[tokio::test]
async fn test_fallback_stops_when_default_fails() {
    let f = fixture_with(|assets| {
        assets.remove("/ehi/app/templates/dashboard.html");
    });
    let outcome = f.router.navigate("/ehi/nowhere").await;

    let NavigationOutcome::Failed { path, error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(path, "/ehi/dashboard");
    assert_eq!(
        error,
        "Error: Could not load content for \"/ehi/dashboard\". Please try again or check the URL."
    );
    assert_eq!(content(&f), error);
    assert_eq!(f.assets.template_fetches(), 2);
    assert_eq!(f.router.phase(), NavigationPhase::Error);
    assert_eq!(f.router.current_route(), None);
}

#[tokio::test]
async fn test_default_route_failure_does_not_retry() {
    let f = fixture_with(|assets| {
        assets.remove("/ehi/app/templates/dashboard.html");
    });
    let outcome = f.router.navigate("/ehi/dashboard").await;
    assert!(matches!(outcome, NavigationOutcome::Failed { .. }));
    assert_eq!(f.assets.template_fetches(), 1);
}

#[tokio::test]
async fn test_latest_navigation_wins() {
    let f = fixture();
    let gate = f.assets.gate("/ehi/app/templates/users.html");

    let router = Arc::clone(&f.router);
    let slow = tokio::spawn(async move { router.navigate("/ehi/users").await });
    while !f
        .assets
        .started()
        .contains(&"/ehi/app/templates/users.html".to_string())
    {
        tokio::task::yield_now().await;
    }

    let fast = f.router.navigate("/ehi/donors").await;
    assert_eq!(fast, NavigationOutcome::Rendered { path: "/ehi/donors".into() });

    gate.notify_one();
    let slow = slow.await.unwrap();
    assert_eq!(slow, NavigationOutcome::Superseded { path: "/ehi/users".into() });

    assert!(f.document.get_element_by_id("donors-title").is_some());
    assert!(f.document.get_element_by_id("users-title").is_none());
    assert_eq!(*f.counters.inits.lock(), vec!["donors"]);
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/donors"));
}

#[tokio::test]
async fn test_stylesheet_swap() {
    let f = fixture();
    f.router.navigate("/ehi/users").await;
    assert_eq!(f.document.stylesheets(), vec!["/ehi/app/styles/layouts/users.css"]);

    f.router.navigate("/ehi/dashboard").await;
    assert_eq!(
        f.document.stylesheets(),
        vec!["/ehi/app/styles/layouts/dashboard.css"]
    );

    // no stylesheet for donors: the old one still goes
    f.router.navigate("/ehi/donors").await;
    assert!(f.document.stylesheets().is_empty());

    f.router.navigate("/ehi/finance/assets").await;
    assert_eq!(f.document.stylesheets(), vec!["/ehi/app/styles/layouts/assets.css"]);

    f.router.navigate("/ehi/archive").await;
    assert!(f.document.stylesheets().is_empty());
    assert!(
        !f.assets
            .started()
            .contains(&"/ehi/app/styles/layouts/archive.css".to_string())
    );
}

#[tokio::test]
async fn test_navigation_superseded_during_stylesheet_fetch() {
    let f = fixture();
    let gate = f.assets.gate("/ehi/app/styles/layouts/users.css");

    let router = Arc::clone(&f.router);
    let slow = tokio::spawn(async move { router.navigate("/ehi/users").await });
    wait_for_fetch(&f, "/ehi/app/styles/layouts/users.css").await;

    let fast = f.router.navigate("/ehi/dashboard").await;
    assert_eq!(fast, NavigationOutcome::Rendered { path: "/ehi/dashboard".into() });

    gate.notify_one();
    let slow = slow.await.unwrap();
    assert_eq!(slow, NavigationOutcome::Superseded { path: "/ehi/users".into() });

    assert_eq!(
        f.document.stylesheets(),
        vec!["/ehi/app/styles/layouts/dashboard.css"]
    );
    assert!(f.document.get_element_by_id("users-title").is_none());
    assert!(f.document.get_element_by_id("dashboard-title").is_some());
    assert_eq!(*f.counters.inits.lock(), vec!["dashboard"]);
    assert_eq!(f.router.session_listeners(), 1);
    assert_eq!(f.router.phase(), NavigationPhase::Idle);
}

#[tokio::test]
async fn test_navigation_superseded_while_module_loads() {
    let f = fixture();
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let ran = Arc::new(AtomicUsize::new(0));

    let (g, e, r) = (Arc::clone(&gate), Arc::clone(&entered), Arc::clone(&ran));
    let modules = ModuleRegistry::new()
        .register("users", move || {
            let (g, e, r) = (Arc::clone(&g), Arc::clone(&e), Arc::clone(&r));
            async move {
                e.notify_one();
                g.notified().await;
                Ok::<_, ModuleError>(Module::new("users").export("initUsers", move |_ctx: PageContext| {
                    r.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<(), ModuleError>(()) }
                }))
            }
        })
        .register_module(Module::new("donors").export("initDonors", listening_page));
    let router = Router::builder(f.document.clone(), f.bus.clone())
        .routes(
            RouteTable::new()
                .route(RouteEntry::new("/ehi/users").module("users", "initUsers"))
                .route(RouteEntry::new("/ehi/donors").module("donors", "initDonors")),
        )
        .modules(modules)
        .assets(Arc::clone(&f.assets))
        .build();

    let r = Arc::clone(&router);
    let slow = tokio::spawn(async move { r.navigate("/ehi/users").await });
    entered.notified().await;
    assert!(f.document.get_element_by_id("users-title").is_some());

    let fast = router.navigate("/ehi/donors").await;
    assert_eq!(fast, NavigationOutcome::Rendered { path: "/ehi/donors".into() });

    gate.notify_one();
    let slow = slow.await.unwrap();
    assert_eq!(slow, NavigationOutcome::Superseded { path: "/ehi/users".into() });

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(f.document.get_element_by_id("users-title").is_none());
    assert!(f.document.get_element_by_id("donors-title").is_some());
    assert_eq!(router.session_listeners(), 1);
    assert_eq!(f.bus.listener_count::<Resize>(Target::Window), 1);
    assert_eq!(router.current_route().as_deref(), Some("/ehi/donors"));
}

#[tokio::test]
async fn test_stale_initializer_cannot_register_listeners() {
    let f = fixture();
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let accepted = Arc::new(Mutex::new(Vec::new()));

    let (g, e, a) = (Arc::clone(&gate), Arc::clone(&entered), Arc::clone(&accepted));
    let stale = move |ctx: PageContext| {
        let (g, e, a) = (Arc::clone(&g), Arc::clone(&e), Arc::clone(&a));
        async move {
            e.notify_one();
            g.notified().await;
            let added = ctx.listen_global::<Resize, _>(Target::Window, |_| {
                panic!("listener from a page that was left")
            });
            a.lock().push(added);
            Ok::<(), ModuleError>(())
        }
    };
    let modules = ModuleRegistry::new()
        .register_module(Module::new("users").export("initUsers", stale))
        .register_module(Module::new("donors").export("initDonors", listening_page));
    let router = Router::builder(f.document.clone(), f.bus.clone())
        .routes(
            RouteTable::new()
                .route(RouteEntry::new("/ehi/users").module("users", "initUsers"))
                .route(RouteEntry::new("/ehi/donors").module("donors", "initDonors")),
        )
        .modules(modules)
        .assets(Arc::clone(&f.assets))
        .build();

    let r = Arc::clone(&router);
    let slow = tokio::spawn(async move { r.navigate("/ehi/users").await });
    entered.notified().await;

    let fast = router.navigate("/ehi/donors").await;
    assert_eq!(fast, NavigationOutcome::Rendered { path: "/ehi/donors".into() });

    gate.notify_one();
    let slow = slow.await.unwrap();
    assert_eq!(slow, NavigationOutcome::Superseded { path: "/ehi/users".into() });

    assert_eq!(*accepted.lock(), vec![false]);
    assert_eq!(router.session_listeners(), 1);
    assert_eq!(f.bus.listener_count::<Resize>(Target::Window), 1);
    f.bus.emit(Target::Window, &Resize { width: 100, height: 30 });
    assert!(content(&f).contains("donors"));
    assert!(f.document.get_element_by_id("users-title").is_none());
}

#[tokio::test]
async fn test_module_problems_are_not_fatal() {
    let f = fixture();
    for path in ["/ehi/ghost", "/ehi/finance/report", "/ehi/finance/broken", "/ehi/archive"] {
        f.assets.inner.insert(
            f.router.mount().template_path(path),
            r#"<p id="static">static</p>"#,
        );
        let outcome = f.router.navigate(path).await;
        assert_eq!(outcome, NavigationOutcome::Rendered { path: path.into() });
        assert!(f.document.get_element_by_id("static").is_some(), "{path}");
    }
    assert!(f.counters.inits.lock().is_empty());
}

#[tokio::test]
async fn test_shared_module_initializer() {
    let f = fixture();
    f.router.navigate("/ehi/finance/assets").await;
    assert_eq!(*f.counters.inits.lock(), vec!["finance"]);
    assert!(f.document.get_element_by_id("assets-table").is_some());
}

#[tokio::test]
async fn test_modal_is_replaced_and_its_listeners_released() {
    let f = fixture();
    f.router.navigate("/ehi/users").await;
    let modal = f.document.modal();
    f.document
        .set_inner_html(&modal, r#"<button id="confirm">OK</button>"#)
        .unwrap();
    let confirm = f.document.get_element_by_id("confirm").unwrap();
    let _sub = f
        .bus
        .subscribe::<Resize, _>(confirm.target(), |_| panic!("stale modal listener"));

    f.router.navigate("/ehi/donors").await;
    assert!(f.document.get_element_by_id("confirm").is_none());
    assert_eq!(f.bus.listener_count::<Resize>(confirm.target()), 0);
}

#[tokio::test]
async fn test_installed_router_intercepts_app_links() {
    let f = fixture();
    f.router.install();
    f.router.start().await;

    f.bus.emit(Target::Document, &LinkClick { href: "/ehi/users".into() });
    f.router.wait_idle().await;
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/users"));
    assert_eq!(f.router.history().len(), 2);

    f.bus.emit(
        Target::Document,
        &LinkClick { href: "https://example.org/help".into() },
    );
    f.router.wait_idle().await;
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/users"));
    assert_eq!(f.router.history().len(), 2);
}

#[tokio::test]
async fn test_back_and_forward_navigate() {
    let f = fixture();
    f.router.install();
    f.router.start().await;
    f.router.visit("/ehi/users").await;
    f.router.visit("/ehi/donors").await;

    assert_eq!(f.router.history().back().as_deref(), Some("/ehi/users"));
    f.router.wait_idle().await;
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/users"));

    assert_eq!(f.router.history().forward().as_deref(), Some("/ehi/donors"));
    f.router.wait_idle().await;
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/donors"));

    f.router.uninstall();
    f.router.history().back();
    f.router.wait_idle().await;
    assert_eq!(f.router.current_route().as_deref(), Some("/ehi/donors"));
}

#[tokio::test]
async fn test_wait_idle_awaits_tracked_page_work() {
    let f = fixture();
    let release = Arc::new(Notify::new());
    let done = Arc::new(AtomicUsize::new(0));

    f.assets
        .inner
        .insert("/ehi/app/templates/ledger.html", "<p>ledger</p>");
    let r = Arc::clone(&release);
    let d = Arc::clone(&done);
    let modules = ModuleRegistry::new().register_module(Module::new("ledger").export(
        "initLedger",
        move |ctx: PageContext| {
            let r = Arc::clone(&r);
            let d = Arc::clone(&d);
            async move {
                ctx.track_idle(move || {
                    let r = Arc::clone(&r);
                    let d = Arc::clone(&d);
                    Box::pin(async move {
                        r.notified().await;
                        d.fetch_add(1, Ordering::SeqCst);
                    }) as BoxFuture<'static, ()>
                });
                Ok(())
            }
        },
    ));
    let router = Router::builder(f.document.clone(), f.bus.clone())
        .routes(RouteTable::new().route(RouteEntry::new("/ehi/ledger").module("ledger", "initLedger")))
        .modules(modules)
        .assets(Arc::clone(&f.assets))
        .build();

    router.navigate("/ehi/ledger").await;
    let waiter = tokio::spawn(async move { router.wait_idle().await });
    tokio::task::yield_now().await;
    assert_eq!(done.load(Ordering::SeqCst), 0);
    release.notify_one();
    waiter.await.unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 1);
}
