//! The dashboard: record counts of every store.
//!
//! The summary is refreshed when the page opens and then on a timer. Narrow
//! windows get one figure per line.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use paging::render::LOADING_TEXT;
use parking_lot::Mutex;
use router::{ModuleError, PageContext, Resize};
use stage::{ElementRef, Target};
use tracing::{debug, warn};

use super::catalog::DASHBOARD_STATS;
use super::{PageEnv, Pending};

/// Windows narrower than this get the single-column summary.
pub const COMPACT_BELOW: u16 = 60;

/// Width assumed until the first resize.
const INITIAL_WIDTH: u16 = 80;

const LABELS: &[(&str, &str)] = &[
    ("users", "Users"),
    ("donors", "Donors"),
    ("programmes", "Programmes"),
    ("disbursements", "Disbursements"),
    ("donations", "Donations"),
    ("receipts", "Receipts"),
    ("expenses", "Expenses"),
    ("assets", "Assets"),
    ("liabilities", "Liabilities"),
    ("archive", "Archived"),
    ("staff", "Staff"),
];

/// Summary text for `counts` at `width` columns.
#[must_use]
pub fn layout(counts: &BTreeMap<String, usize>, width: u16) -> String {
    let mut cells: Vec<String> = LABELS
        .iter()
        .filter_map(|(store, label)| counts.get(*store).map(|n| format!("{label:<14}{n:>6}")))
        .collect();
    cells.extend(
        counts
            .iter()
            .filter(|(store, _)| !LABELS.iter().any(|(known, _)| known == store))
            .map(|(store, n)| format!("{store:<14}{n:>6}")),
    );
    if width < COMPACT_BELOW {
        cells.join("\n")
    } else {
        cells
            .chunks(2)
            .map(|pair| pair.join("    "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Dashboard {
    ctx: PageContext,
    env: Arc<PageEnv>,
    stats: ElementRef,
    width: AtomicU16,
    counts: Mutex<Option<BTreeMap<String, usize>>>,
    pending: Pending,
}

impl Dashboard {
    fn render(&self) {
        let text = match &*self.counts.lock() {
            Some(counts) => layout(counts, self.width.load(Ordering::Relaxed)),
            None => LOADING_TEXT.to_string(),
        };
        if let Err(err) = self.ctx.document().set_text(&self.stats, &text) {
            warn!(error = %err, "dashboard summary not drawn");
        }
    }

    fn refresh(self: &Arc<Self>) {
        let guard = self.pending.begin();
        let this = Arc::clone(self);
        self.ctx.spawn(async move {
            let _guard = guard;
            let counts = this.env.backend.counts().await;
            debug!(stores = counts.len(), "dashboard counts loaded");
            *this.counts.lock() = Some(counts);
            this.render();
        });
    }
}

/// Draws the summary and keeps it current while the dashboard is shown.
pub async fn init(ctx: PageContext, env: Arc<PageEnv>) -> Result<(), ModuleError> {
    let Some(stats) = ctx.element(DASHBOARD_STATS) else {
        return Err(ModuleError::init(format!(
            "dashboard template has no #{DASHBOARD_STATS}"
        )));
    };
    let period = env.dashboard_refresh;
    let dashboard = Arc::new(Dashboard {
        ctx: ctx.clone(),
        env,
        stats,
        width: AtomicU16::new(INITIAL_WIDTH),
        counts: Mutex::new(None),
        pending: Pending::new(),
    });
    ctx.retain(Arc::clone(&dashboard));
    dashboard.render();

    let pending = dashboard.pending.clone();
    ctx.track_idle(move || {
        let pending = pending.clone();
        Box::pin(async move { pending.wait().await })
    });

    let weak = Arc::downgrade(&dashboard);
    ctx.listen_global::<Resize, _>(Target::Window, move |e| {
        if let Some(dashboard) = weak.upgrade() {
            dashboard.width.store(e.width, Ordering::Relaxed);
            dashboard.render();
        }
    });

    if !period.is_zero() {
        let weak = Arc::downgrade(&dashboard);
        ctx.interval(period, move || {
            if let Some(dashboard) = weak.upgrade() {
                dashboard.refresh();
            }
        });
    }

    dashboard.refresh();
    Ok(())
}
