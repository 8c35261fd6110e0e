use crate::error::{ClassifyError, Result};
use url::Url;

/// Checks that `input` is a usable product URL before anything touches the network.
///
/// Accepts absolute `http`/`https` URLs with a host. Surrounding whitespace is ignored.
pub fn validate_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClassifyError::InvalidUrl("Please enter a product URL.".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| ClassifyError::InvalidUrl(format!("'{}' is not a valid URL: {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ClassifyError::InvalidUrl(format!(
                "Unsupported URL scheme '{}', expected http or https",
                other
            )));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ClassifyError::InvalidUrl(format!(
            "'{}' has no host",
            trimmed
        )));
    }

    Ok(parsed)
}
