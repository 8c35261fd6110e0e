use crate::controller::{RequestController, RequestState};
use prodclass_client::ClassificationService;

/// The dismissible error banner. Exists only while the controller is in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorView<'a> {
    message: &'a str,
}

impl<'a> ErrorView<'a> {
    pub fn from_state(state: &'a RequestState) -> Option<Self> {
        state.error().map(|message| Self { message })
    }

    pub fn message(&self) -> &str {
        self.message
    }

    pub fn render(&self) -> String {
        format!("✗ {}", self.message)
    }

    /// Clears the error on the controller this view was taken from.
    pub fn dismiss<S: ClassificationService>(self, controller: &RequestController<S>) -> bool {
        controller.clear_error()
    }
}
