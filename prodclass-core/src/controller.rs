// Lifecycle of a single classification request

use prodclass_client::{
    ClassificationResult, ClassificationService, ClassifyError, GENERIC_FAILURE_MESSAGE,
    validate_url,
};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// Where the controller is in the lifecycle of the current request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    /// No attempt made yet, or the last error was dismissed.
    Idle,
    /// A request is in flight for this URL.
    Pending(String),
    Succeeded(ClassificationResult),
    /// Message suitable for showing to the user.
    Failed(String),
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending(_))
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            RequestState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Pending(_) => "pending",
            RequestState::Succeeded(_) => "succeeded",
            RequestState::Failed(_) => "failed",
        }
    }
}

/// Why a submission was turned away before reaching the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("A classification is already in progress for {0}")]
    AlreadyPending(String),
}

/// An accepted submission. Hand it back to [`RequestController::complete`] with the outcome.
#[derive(Debug)]
pub struct Submission {
    generation: u64,
    url: Url,
}

impl Submission {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Owns the one [`RequestState`] and publishes every change to subscribers.
///
/// At most one request is pending at a time. Each accepted submission gets a generation number and
/// only the outcome of the newest generation is ever applied; older outcomes are dropped.
pub struct RequestController<S> {
    service: S,
    state: watch::Sender<RequestState>,
    generation: AtomicU64,
}

impl<S: ClassificationService> RequestController<S> {
    pub fn new(service: S) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            service,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    /// Receiver that is woken on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Validates `url`, moves to `Pending`, calls the service once and records the outcome.
    ///
    /// Only validation failures and a request already in flight are returned as errors. Anything
    /// that goes wrong after that ends up in [`RequestState::Failed`], including dropping the
    /// returned future before the service answers.
    pub async fn submit(&self, url: &str) -> Result<(), SubmitError> {
        let submission = self.begin(url)?;
        self.run(submission).await;
        Ok(())
    }

    /// Like [`submit`](Self::submit) but replaces an in-flight request instead of being rejected.
    /// The replaced request's outcome is discarded when it arrives.
    pub async fn submit_superseding(&self, url: &str) -> Result<(), SubmitError> {
        let submission = self.begin_superseding(url)?;
        self.run(submission).await;
        Ok(())
    }

    async fn run(&self, submission: Submission) {
        let url = submission.url.clone();
        let mut in_flight = InFlight {
            controller: self,
            submission: Some(submission),
        };
        let outcome = self.service.classify(&url).await;
        if let Some(submission) = in_flight.submission.take() {
            self.complete(submission, outcome);
        }
    }

    /// First half of a submit: validation, the pending guard and the move to `Pending`.
    pub fn begin(&self, url: &str) -> Result<Submission, SubmitError> {
        self.start(url, false)
    }

    pub fn begin_superseding(&self, url: &str) -> Result<Submission, SubmitError> {
        self.start(url, true)
    }

    fn start(&self, url: &str, supersede: bool) -> Result<Submission, SubmitError> {
        let url = validate_url(url).map_err(|e| SubmitError::InvalidUrl(e.user_message()))?;

        let mut in_flight = None;
        let mut generation = 0;

        // Guard and transition happen under the channel's write lock.
        self.state.send_if_modified(|state| {
            if let RequestState::Pending(pending_url) = state
                && !supersede
            {
                in_flight = Some(pending_url.clone());
                return false;
            }
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = RequestState::Pending(url.to_string());
            true
        });

        if let Some(pending_url) = in_flight {
            warn!("Rejected submit of {} while {} is pending", url, pending_url);
            return Err(SubmitError::AlreadyPending(pending_url));
        }

        info!("Classifying {} (request #{})", url, generation);
        Ok(Submission { generation, url })
    }

    /// Second half of a submit. Returns `false` when the submission was superseded and its outcome
    /// was dropped.
    pub fn complete(
        &self,
        submission: Submission,
        outcome: Result<ClassificationResult, ClassifyError>,
    ) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != submission.generation {
                return false;
            }
            *state = match outcome {
                Ok(result) => RequestState::Succeeded(result),
                Err(e) => {
                    debug!("Request #{} failed: {:?}", submission.generation, e);
                    RequestState::Failed(e.user_message())
                }
            };
            true
        });

        if applied {
            info!(
                "Request #{} for {} finished: {}",
                submission.generation,
                submission.url,
                self.state.borrow().label()
            );
        } else {
            debug!(
                "Discarded stale response for request #{} ({})",
                submission.generation, submission.url
            );
        }
        applied
    }

    /// Dismisses the current error. Returns whether anything changed.
    pub fn clear_error(&self) -> bool {
        let cleared = self.state.send_if_modified(|state| {
            if matches!(state, RequestState::Failed(_)) {
                *state = RequestState::Idle;
                true
            } else {
                false
            }
        });
        if cleared {
            debug!("Error dismissed");
        }
        cleared
    }
}

impl<S> RequestController<S> {
    /// Resolves a submission whose outcome will never arrive. Ignored once superseded.
    fn abandon(&self, submission: Submission) {
        let failed = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != submission.generation
                || !state.is_pending()
            {
                return false;
            }
            *state = RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string());
            true
        });

        if failed {
            warn!(
                "Request #{} for {} was cancelled before the service answered",
                submission.generation, submission.url
            );
        }
    }
}

/// Holds the submission while the service call is awaited. If the call is dropped part way
/// (timeout, losing `select!` branch, aborted task) the request fails instead of staying pending.
struct InFlight<'a, S> {
    controller: &'a RequestController<S>,
    submission: Option<Submission>,
}

impl<S> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if let Some(submission) = self.submission.take() {
            self.controller.abandon(submission);
        }
    }
}
