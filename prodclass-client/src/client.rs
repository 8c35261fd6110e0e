use crate::error::{ClassifyError, Result};
use crate::result::{ClassificationRequest, ClassificationResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CLASSIFY_PATH: &str = "api/classify";

/// Anything that can turn a product URL into classified attributes.
///
/// The HTTP client is the production implementation; tests script their own.
pub trait ClassificationService {
    fn classify(&self, url: &Url) -> impl Future<Output = Result<ClassificationResult>> + Send;
}

/// Connection settings for the classification service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service; `/api/classify` is resolved against it.
    pub endpoint: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: format!("prodclass/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

pub struct HttpClassifier {
    client: Client,
    classify_url: Url,
}

impl HttpClassifier {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let classify_url = classify_url(&config.endpoint)?;

        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.div_ceil(2)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            classify_url,
        })
    }

    /// Full URL requests are posted to.
    pub fn classify_url(&self) -> &Url {
        &self.classify_url
    }
}

impl ClassificationService for HttpClassifier {
    async fn classify(&self, url: &Url) -> Result<ClassificationResult> {
        let request = ClassificationRequest::new(url.as_str());
        debug!("POST {} for {}", self.classify_url, url);

        let response = self
            .client
            .post(self.classify_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        info!("Classification service answered {} for {}", status, url);

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                warn!("Unreadable classification body: {}", e);
                ClassifyError::ParseError(e.to_string())
            })
        } else {
            Err(ClassifyError::ServiceError {
                status: status.as_u16(),
                detail: extract_detail(&body),
            })
        }
    }
}

/// Resolves the classify route against a base endpoint, keeping any path prefix.
fn classify_url(endpoint: &str) -> Result<Url> {
    let mut base = Url::parse(endpoint.trim())
        .map_err(|e| ClassifyError::InvalidUrl(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(CLASSIFY_PATH)
        .map_err(|e| ClassifyError::InvalidUrl(format!("Invalid endpoint '{}': {}", endpoint, e)))
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// Pulls a string `detail` out of an error body. Structured details (lists of validation errors)
/// are not shown to users.
fn extract_detail(body: &str) -> Option<String> {
    match serde_json::from_str::<ErrorBody>(body).ok()?.detail? {
        Value::String(detail) => Some(detail),
        _ => None,
    }
}
