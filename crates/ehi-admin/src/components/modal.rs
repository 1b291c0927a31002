//! The singleton modal overlay.
//!
//! Opening a modal swaps the overlay for a fresh node, so nothing bound to a
//! previous modal survives. Buttons are affordances on the overlay:
//! `confirm`/`cancel` for confirmations and forms, `close` for details.
//! Form fields are the overlay's inputs, edited with `Document::set_input`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use stage::{Affordance, Document, EventBus, Subscription, Target};
use tracing::{debug, warn};

use crate::events::ModalResponse;

/// What to show.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalKind {
    /// A yes/no question.
    Confirm { title: String, message: String },
    /// Read-only fields.
    Details {
        title: String,
        fields: Vec<(String, String)>,
    },
    /// Editable fields with their initial values.
    Form {
        title: String,
        fields: Vec<(String, String)>,
    },
}

impl ModalKind {
    fn title(&self) -> &str {
        match self {
            Self::Confirm { title, .. } | Self::Details { title, .. } | Self::Form { title, .. } => {
                title
            }
        }
    }

    fn body(&self) -> String {
        match self {
            Self::Confirm { message, .. } => message.clone(),
            Self::Details { fields, .. } => {
                let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
                fields
                    .iter()
                    .map(|(k, v)| format!("{k:<width$}  {v}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Self::Form { fields, .. } => fields
                .iter()
                .map(|(k, _)| format!("[{k}]"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// How a modal was closed. A confirmed form carries its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalOutcome {
    Confirmed(BTreeMap<String, String>),
    Cancelled,
}

/// Opens and closes the overlay for one page.
pub struct ModalHost {
    document: Document,
    bus: EventBus,
    binding: Arc<Mutex<Option<Subscription>>>,
}

impl std::fmt::Debug for ModalHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalHost")
            .field("open", &self.binding.lock().is_some())
            .finish_non_exhaustive()
    }
}

fn dismiss(document: &Document, bus: &EventBus) {
    for node in document.replace_modal() {
        bus.release_target(Target::Element(node));
    }
}

impl ModalHost {
    pub fn new(document: Document, bus: EventBus) -> Self {
        Self {
            document,
            bus,
            binding: Arc::new(Mutex::new(None)),
        }
    }

    /// Shows `kind`, replacing any open modal. `on_close` runs once, when a
    /// button is pressed.
    pub fn open<F>(&self, kind: ModalKind, on_close: F)
    where
        F: Fn(ModalOutcome) + Send + Sync + 'static,
    {
        dismiss(&self.document, &self.bus);
        let modal = self.document.modal();
        let markup = format!("{}\n\n{}", kind.title(), kind.body());
        if let Err(e) = self.document.set_text(&modal, &markup) {
            warn!(error = %e, "modal could not be drawn");
            return;
        }

        let mut buttons = Vec::new();
        match &kind {
            ModalKind::Details { .. } => {
                buttons.push(Affordance::new(
                    "close",
                    modal.target(),
                    ModalResponse { confirmed: false },
                ));
            }
            ModalKind::Form { fields, .. } => {
                for (name, value) in fields {
                    let _ = self.document.set_input(&modal, name.clone(), value.clone());
                }
                buttons.push(Affordance::new("confirm", modal.target(), ModalResponse { confirmed: true }));
                buttons.push(Affordance::new("cancel", modal.target(), ModalResponse { confirmed: false }));
            }
            ModalKind::Confirm { .. } => {
                buttons.push(Affordance::new("confirm", modal.target(), ModalResponse { confirmed: true }));
                buttons.push(Affordance::new("cancel", modal.target(), ModalResponse { confirmed: false }));
            }
        }
        let _ = self.document.set_affordances(&modal, buttons);

        let document = self.document.clone();
        let bus = self.bus.clone();
        let element = modal.clone();
        let subscription = self
            .bus
            .subscribe::<ModalResponse, _>(modal.target(), move |response| {
                let outcome = if response.confirmed {
                    ModalOutcome::Confirmed(document.inputs(&element).unwrap_or_default())
                } else {
                    ModalOutcome::Cancelled
                };
                debug!(confirmed = response.confirmed, "modal closed");
                dismiss(&document, &bus);
                on_close(outcome);
            });
        *self.binding.lock() = Some(subscription);
        debug!(title = kind.title(), "modal opened");
    }

    /// Closes the modal without running its callback.
    pub fn close(&self) {
        self.binding.lock().take();
        dismiss(&self.document, &self.bus);
    }

    /// Whether the overlay currently has content.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.document
            .content(&self.document.modal())
            .is_ok_and(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> (ModalHost, Document, EventBus) {
        let document = Document::new();
        let bus = EventBus::new();
        (ModalHost::new(document.clone(), bus.clone()), document, bus)
    }

    #[test]
    fn test_confirm_runs_callback_once() {
        let (host, document, bus) = host();
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&outcomes);
        host.open(
            ModalKind::Confirm {
                title: "Delete donor".into(),
                message: "Delete record 4?".into(),
            },
            move |outcome| o.lock().push(outcome),
        );
        assert!(host.is_open());
        assert!(document.content(&document.modal()).unwrap().contains("Delete record 4?"));

        document.activate(&bus, "confirm").unwrap();
        assert_eq!(*outcomes.lock(), vec![ModalOutcome::Confirmed(BTreeMap::new())]);
        assert!(!host.is_open());
        assert!(document.activate(&bus, "confirm").is_err());
        assert_eq!(outcomes.lock().len(), 1);
    }

    #[test]
    fn test_form_returns_inputs() {
        let (host, document, bus) = host();
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&outcomes);
        host.open(
            ModalKind::Form {
                title: "Edit".into(),
                fields: vec![("first_name".into(), "Ada".into()), ("city".into(), "Lagos".into())],
            },
            move |outcome| o.lock().push(outcome),
        );
        let modal = document.modal();
        document.set_input(&modal, "city", "Abuja").unwrap();
        document.activate(&bus, "confirm").unwrap();

        let ModalOutcome::Confirmed(inputs) = outcomes.lock()[0].clone() else {
            panic!("expected confirmation");
        };
        assert_eq!(inputs["first_name"], "Ada");
        assert_eq!(inputs["city"], "Abuja");
    }

    #[test]
    fn test_reopening_drops_previous_callback() {
        let (host, document, bus) = host();
        let first = Arc::new(Mutex::new(0));
        let f = Arc::clone(&first);
        host.open(
            ModalKind::Details {
                title: "Donor".into(),
                fields: vec![("name".into(), "Ada".into())],
            },
            move |_| *f.lock() += 1,
        );
        host.open(
            ModalKind::Confirm {
                title: "Restore".into(),
                message: "Restore?".into(),
            },
            |_| {},
        );
        assert!(document.activate(&bus, "close").is_err());
        document.activate(&bus, "cancel").unwrap();
        assert_eq!(*first.lock(), 0);
        assert_eq!(bus.total_listeners(), 0);
    }
}
