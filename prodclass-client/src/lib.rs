pub mod client;
pub mod error;
pub mod result;
pub mod validate;

pub use client::{ClassificationService, ClientConfig, HttpClassifier};
pub use error::{ClassifyError, GENERIC_FAILURE_MESSAGE};
pub use result::{
    AttributeMap, ClassificationRequest, ClassificationResult, ClassifiedAttributes, display_value,
};
pub use validate::validate_url;
