//! Record pages: paginated tables over record stores.
//!
//! A record page mounts one [`PaginatedTableController`] per table of its
//! catalog entry, then wires the controls around them:
//! - the search box narrows the table to matching records
//! - the add button opens an empty form
//! - row actions (`view`, `edit`, `delete`, `restore`) open the modal and,
//!   once confirmed, change the store and refresh every table on the page
//!
//! All of it is bound through the [`PageContext`], so leaving the route drops
//! the listeners, aborts pending work and frees the controllers.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Weak};

use paging::table::{cell_text, data_key};
use paging::{
    FetchError, PageRequest, PageResult, PaginatedTableController, TableAction, TableConfig,
    fetcher_fn,
};
use parking_lot::RwLock;
use router::{ModuleError, PageContext};
use serde_json::Value;
use stage::{Affordance, Target};
use tracing::{debug, info, warn};

use super::catalog::{self, TableDef};
use super::{PageEnv, Pending};
use crate::components::{ModalHost, ModalKind, ModalOutcome};
use crate::events::SearchInput;
use crate::format::display_record;
use crate::store::{Record, RecordStore, StoreError};

/// Mounts the tables of the page at `ctx.route()`.
pub async fn init(ctx: PageContext, env: Arc<PageEnv>) -> Result<(), ModuleError> {
    let route = ctx.route().to_string();
    let Some(def) = catalog::find(&env.mount, &route) else {
        return Err(ModuleError::init(format!("no page is defined at {route}")));
    };
    let page = RecordPage::mount(ctx, &env, def.heading, def.table_defs());
    if page.tables.is_empty() {
        return Err(ModuleError::init(format!("no table of {route} could be mounted")));
    }
    page.start();
    Ok(())
}

/// One mounted table.
struct Table {
    def: &'static TableDef,
    store: Arc<dyn RecordStore>,
    controller: Arc<PaginatedTableController>,
    /// Lower-cased search text, shared with the fetcher.
    filter: Arc<RwLock<String>>,
}

/// A store change requested through the modal.
#[derive(Debug)]
enum Mutation {
    Insert(Record),
    Update(u64, Record),
    Remove(u64),
    Restore(u64),
}

/// The tables and controls of one displayed record page.
pub struct RecordPage {
    ctx: PageContext,
    env: Arc<PageEnv>,
    heading: &'static str,
    tables: Vec<Table>,
    modal: ModalHost,
    pending: Pending,
}

impl std::fmt::Debug for RecordPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPage")
            .field("route", &self.ctx.route())
            .field(
                "tables",
                &self.tables.iter().map(|t| t.def.key).collect::<Vec<_>>(),
            )
            .field("pending", &self.pending.count())
            .finish_non_exhaustive()
    }
}

fn mount_table(ctx: &PageContext, env: &PageEnv, def: &'static TableDef) -> Option<Table> {
    let store = match env.backend.store(def.store) {
        Ok(store) => store,
        Err(err) => {
            warn!(page_key = def.key, error = %err, "table skipped");
            return None;
        }
    };
    let filter = Arc::new(RwLock::new(String::new()));

    let fetcher = {
        let store = Arc::clone(&store);
        let filter = Arc::clone(&filter);
        fetcher_fn(move |request: PageRequest| {
            let store = Arc::clone(&store);
            let filter = filter.read().clone();
            async move {
                let page = store
                    .page(request.limit, request.offset, &filter)
                    .await
                    .map_err(|e| FetchError::Backend(e.to_string()))?;
                Ok(PageResult {
                    data: page.records.iter().map(display_record).collect(),
                    total_items: page.total,
                })
            }
        })
    };

    let config = TableConfig::new(def.table_id(), def.pager_id())
        .headers(def.headers.iter().copied())
        .dropdown_actions(def.actions.iter().copied())
        .page_key(def.key)
        .start_serial(env.start_serial)
        .items_per_page(env.page_size)
        .select_column(def.select);
    match PaginatedTableController::new(
        ctx.document().clone(),
        ctx.bus().clone(),
        config,
        fetcher,
    ) {
        Ok(controller) => Some(Table {
            def,
            store,
            controller,
            filter,
        }),
        Err(err) => {
            warn!(page_key = def.key, error = %err, "table skipped");
            None
        }
    }
}

/// Raw value of a field as form text.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Form text converted back, keeping numbers numeric.
fn parse_like(original: Option<&Value>, input: &str) -> Value {
    let trimmed = input.trim();
    match original {
        Some(Value::Number(_)) => trimmed
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| trimmed.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(input.to_string())),
        _ => Value::String(input.to_string()),
    }
}

fn form_record(original: Option<&Record>, values: BTreeMap<String, String>) -> Record {
    values
        .into_iter()
        .map(|(key, text)| {
            let value = parse_like(original.and_then(|r| r.get(&key)), &text);
            (key, value)
        })
        .collect()
}

impl RecordPage {
    fn mount(
        ctx: PageContext,
        env: &Arc<PageEnv>,
        heading: &'static str,
        defs: &'static [TableDef],
    ) -> Arc<Self> {
        let tables = defs
            .iter()
            .filter_map(|def| mount_table(&ctx, env, def))
            .collect();
        let modal = ModalHost::new(ctx.document().clone(), ctx.bus().clone());
        Arc::new(Self {
            ctx,
            env: Arc::clone(env),
            heading,
            tables,
            modal,
            pending: Pending::new(),
        })
    }

    /// Binds the controls and loads the first page of every table.
    fn start(self: &Arc<Self>) {
        self.ctx.retain(Arc::clone(self));

        let weak = Arc::downgrade(self);
        self.ctx.track_idle(move || {
            let weak = Weak::clone(&weak);
            Box::pin(async move {
                if let Some(page) = weak.upgrade() {
                    page.settled().await;
                }
            })
        });

        let weak = Arc::downgrade(self);
        self.ctx
            .listen_global::<TableAction, _>(Target::Window, move |action| {
                if let Some(page) = weak.upgrade() {
                    page.on_action(action);
                }
            });

        for (index, table) in self.tables.iter().enumerate() {
            self.bind_search(index, table.def);
            self.bind_add(table.def);
        }

        for table in &self.tables {
            let controller = Arc::clone(&table.controller);
            self.spawn_tracked(async move {
                let outcome = controller.init().await;
                debug!(page_key = %controller.config().page_key, ?outcome, "table loaded");
            });
        }
    }

    fn bind_search(self: &Arc<Self>, index: usize, def: &'static TableDef) {
        if !def.searchable {
            return;
        }
        let Some(input) = self.ctx.element(&def.search_id()) else {
            debug!(page_key = def.key, "no search box");
            return;
        };
        let weak = Arc::downgrade(self);
        self.ctx.listen::<SearchInput, _>(&input, move |e| {
            if let Some(page) = weak.upgrade() {
                page.search(index, &e.value);
            }
        });
    }

    fn bind_add(&self, def: &'static TableDef) {
        if !def.can_add {
            return;
        }
        let Some(button) = self.ctx.element(&def.add_id()) else {
            debug!(page_key = def.key, "no add button");
            return;
        };
        let add = Affordance::new(
            format!("add:{}", def.key),
            Target::Window,
            TableAction {
                action: "add".into(),
                item_id: String::new(),
                page_key: def.key.into(),
            },
        );
        if let Err(err) = self.ctx.document().set_affordances(&button, vec![add]) {
            warn!(page_key = def.key, error = %err, "add button not bound");
        }
    }

    /// Runs `task` as page work that [`Self::settled`] waits for.
    fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.pending.begin();
        self.ctx.spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Resolves once no mutation or table cycle is running.
    async fn settled(&self) {
        loop {
            self.pending.wait().await;
            for table in &self.tables {
                table.controller.wait_idle().await;
            }
            if self.pending.count() == 0 {
                return;
            }
        }
    }

    fn search(self: &Arc<Self>, index: usize, text: &str) {
        let Some(table) = self.tables.get(index) else {
            return;
        };
        let needle = text.trim().to_lowercase();
        if *table.filter.read() == needle {
            return;
        }
        debug!(page_key = table.def.key, filter = %needle, "search changed");
        *table.filter.write() = needle;

        let controller = Arc::clone(&table.controller);
        self.spawn_tracked(async move {
            if controller.state().current_page > 1 {
                controller.go_to_page(1).await;
            } else {
                controller.refresh().await;
            }
        });
    }

    fn on_action(self: &Arc<Self>, action: &TableAction) {
        let Some(index) = self.tables.iter().position(|t| t.def.key == action.page_key) else {
            return;
        };
        if action.action == "add" {
            self.open_add(index);
            return;
        }
        let Ok(id) = action.item_id.parse::<u64>() else {
            warn!(
                page_key = %action.page_key,
                item_id = %action.item_id,
                "row action without a record id"
            );
            return;
        };
        match action.action.as_str() {
            "view" | "edit" => {
                let page = Arc::clone(self);
                let edit = action.action == "edit";
                self.spawn_tracked(async move { page.open_record(index, id, edit).await });
            }
            "delete" => self.confirm(
                index,
                format!("Delete record {id}"),
                format!("Delete record {id}? This cannot be undone."),
                Mutation::Remove(id),
            ),
            "restore" => self.confirm(
                index,
                format!("Restore record {id}"),
                format!("Move record {id} out of the archive?"),
                Mutation::Restore(id),
            ),
            other => debug!(action = other, page_key = %action.page_key, "row action ignored"),
        }
    }

    async fn open_record(self: Arc<Self>, index: usize, id: u64, edit: bool) {
        let table = &self.tables[index];
        let record = match table.store.get(id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(page_key = table.def.key, error = %err, "record not loaded");
                return;
            }
        };
        if !self.ctx.is_active() {
            return;
        }

        if !edit {
            let shown = display_record(&record);
            let fields = table
                .def
                .headers
                .iter()
                .map(|h| ((*h).to_string(), cell_text(shown.get(&data_key(h)))))
                .collect();
            let title = format!("{}: record {id}", self.heading);
            self.modal.open(ModalKind::Details { title, fields }, |_| {});
            return;
        }

        let fields = table
            .def
            .headers
            .iter()
            .map(|h| {
                let key = data_key(h);
                let value = field_text(record.get(&key));
                (key, value)
            })
            .collect();
        let weak = Arc::downgrade(&self);
        self.modal.open(
            ModalKind::Form {
                title: format!("Edit record {id}"),
                fields,
            },
            move |outcome| {
                let (Some(page), ModalOutcome::Confirmed(values)) = (weak.upgrade(), outcome)
                else {
                    return;
                };
                page.mutate(index, Mutation::Update(id, form_record(Some(&record), values)));
            },
        );
    }

    fn open_add(self: &Arc<Self>, index: usize) {
        let Some(table) = self.tables.get(index) else {
            return;
        };
        let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
        let fields = table
            .def
            .headers
            .iter()
            .map(|h| {
                let key = data_key(h);
                let value = if key == "date" { today.clone() } else { String::new() };
                (key, value)
            })
            .collect();
        let weak = Arc::downgrade(self);
        self.modal.open(
            ModalKind::Form {
                title: format!("Add to {}", self.heading),
                fields,
            },
            move |outcome| {
                let (Some(page), ModalOutcome::Confirmed(values)) = (weak.upgrade(), outcome)
                else {
                    return;
                };
                page.mutate(index, Mutation::Insert(form_record(None, values)));
            },
        );
    }

    fn confirm(self: &Arc<Self>, index: usize, title: String, message: String, mutation: Mutation) {
        let weak = Arc::downgrade(self);
        let mutation = parking_lot::Mutex::new(Some(mutation));
        self.modal.open(ModalKind::Confirm { title, message }, move |outcome| {
            if outcome == ModalOutcome::Cancelled {
                return;
            }
            let (Some(page), Some(mutation)) = (weak.upgrade(), mutation.lock().take()) else {
                return;
            };
            page.mutate(index, mutation);
        });
    }

    /// Applies `mutation` to the table's store, then refreshes the page.
    fn mutate(self: &Arc<Self>, index: usize, mutation: Mutation) {
        let page = Arc::clone(self);
        self.spawn_tracked(async move {
            let table = &page.tables[index];
            let key = table.def.key;
            let result = page.apply(table, mutation).await;
            match result {
                Ok(summary) => info!(page_key = key, %summary, "record changed"),
                Err(err) => {
                    warn!(page_key = key, error = %err, "record change failed");
                    return;
                }
            }
            for table in &page.tables {
                table.controller.refresh().await;
            }
        });
    }

    async fn apply(&self, table: &Table, mutation: Mutation) -> Result<String, StoreError> {
        match mutation {
            Mutation::Insert(record) => {
                let id = table.store.insert(record).await?;
                Ok(format!("inserted {id}"))
            }
            Mutation::Update(id, fields) => {
                table.store.update(id, fields).await?;
                Ok(format!("updated {id}"))
            }
            Mutation::Remove(id) => {
                table.store.remove(id).await?;
                Ok(format!("deleted {id}"))
            }
            Mutation::Restore(id) => {
                let Some(target) = table.def.restore_to else {
                    return Err(StoreError::UnknownStore(String::new()));
                };
                let target = self.env.backend.store(target)?;
                let record = table.store.remove(id).await?;
                let restored = target.insert(record).await?;
                Ok(format!("restored {id} to {} as {restored}", target.name()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_values_keep_number_types() {
        let original = json!({"age": 31, "amount": 12.5, "pin": "0042"});
        let original = original.as_object().unwrap();
        let values = BTreeMap::from([
            ("age".to_string(), "32".to_string()),
            ("amount".to_string(), "13.75".to_string()),
            ("pin".to_string(), "0043".to_string()),
            ("note".to_string(), "new".to_string()),
        ]);
        let record = form_record(Some(original), values);
        assert_eq!(record["age"], json!(32));
        assert_eq!(record["amount"], json!(13.75));
        assert_eq!(record["pin"], json!("0043"));
        assert_eq!(record["note"], json!("new"));
    }

    #[test]
    fn test_unparsable_number_falls_back_to_text() {
        assert_eq!(parse_like(Some(&json!(3)), "three"), json!("three"));
        assert_eq!(field_text(Some(&json!(3))), "3");
        assert_eq!(field_text(None), "");
    }
}
