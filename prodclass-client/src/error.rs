use thiserror::Error;

/// Shown for any failure that carries no service-provided detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "An unknown error occurred.";

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Service returned status {status}")]
    ServiceError { status: u16, detail: Option<String> },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ClassifyError {
    /// The single line a user gets to see for this error.
    ///
    /// Service errors surface their `detail` verbatim. A service error without one falls back to a
    /// message naming the status code; transport and parse errors collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ClassifyError::InvalidUrl(reason) => reason.clone(),
            ClassifyError::ServiceError {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            ClassifyError::ServiceError { status, .. } => {
                format!("An unexpected API error occurred. Status: {}", status)
            }
            ClassifyError::HttpError(_) | ClassifyError::ParseError(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
