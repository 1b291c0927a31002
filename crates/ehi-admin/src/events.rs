//! Events raised by the dashboard's own controls.

use stage::Event;

/// Text typed into a search box. Emitted on the input element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchInput {
    pub value: String,
}

impl Event for SearchInput {
    const NAME: &'static str = "input";
}

/// A modal button was pressed. Emitted on the modal element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalResponse {
    pub confirmed: bool,
}

impl Event for ModalResponse {
    const NAME: &'static str = "modal:response";
}
