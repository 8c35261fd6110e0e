// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    SessionCommand, describe_state, load_urls_from_file, load_urls_from_source,
    parse_session_command,
};

// Re-export the lifecycle types from prodclass-core
pub use prodclass_core::{AttributePresenter, ErrorView, RequestController, RequestState};
