pub mod controller;
pub mod error_view;
pub mod presenter;
pub mod report;

pub use controller::{RequestController, RequestState, SubmitError, Submission};
pub use error_view::ErrorView;
pub use presenter::{
    AttributeGroup, AttributePresenter, AttributeRow, CATEGORY_SPECIFIC_HEADING, GLOBAL_HEADING,
    RenderedResult,
};
pub use report::ReportFormat;
