// Tests for the request lifecycle

use prodclass_client::error::Result;
use prodclass_client::{
    AttributeMap, ClassificationResult, ClassificationService, ClassifiedAttributes, ClassifyError,
    GENERIC_FAILURE_MESSAGE,
};
use prodclass_core::{ErrorView, RequestController, RequestState, SubmitError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

// ============================================================================
// Scripted service
// ============================================================================

#[derive(Clone)]
enum Reply {
    Result(ClassificationResult),
    Status(u16, Option<&'static str>),
    Garbage,
}

struct ScriptedService {
    reply: Reply,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    routes: HashMap<String, (Reply, Arc<Notify>)>,
}

impl ScriptedService {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            gate: None,
            routes: HashMap::new(),
        }
    }

    /// Answers calls for `url` with `reply` once `gate` is notified.
    fn route(mut self, url: &str, reply: Reply, gate: Arc<Notify>) -> Self {
        self.routes.insert(url.to_string(), (reply, gate));
        self
    }

    /// Holds every call until `gate` is notified.
    fn gated(reply: Reply, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(reply)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassificationService for ScriptedService {
    async fn classify(&self, url: &Url) -> Result<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (reply, gate) = match self.routes.get(url.as_str()) {
            Some((reply, gate)) => (reply, Some(gate)),
            None => (&self.reply, self.gate.as_ref()),
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match reply {
            Reply::Result(result) => Ok(result.clone()),
            Reply::Status(status, detail) => Err(ClassifyError::ServiceError {
                status: *status,
                detail: detail.map(str::to_string),
            }),
            Reply::Garbage => Err(ClassifyError::ParseError("expected value".to_string())),
        }
    }
}

fn dress() -> ClassificationResult {
    ClassificationResult {
        product_title: "Dress".to_string(),
        classified_attributes: ClassifiedAttributes {
            global: AttributeMap::new().with("Color", "Green"),
            category_specific: AttributeMap::new(),
        },
    }
}

fn shoes() -> ClassificationResult {
    ClassificationResult {
        product_title: "Sports Shoes".to_string(),
        classified_attributes: ClassifiedAttributes {
            global: AttributeMap::new()
                .with("Type", "Sports Shoes")
                .with("Colour", "White"),
            category_specific: AttributeMap::new().with("Brand", "Nike"),
        },
    }
}

// ============================================================================
// Submit outcomes
// ============================================================================

#[tokio::test]
async fn test_starts_idle() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));
    assert_eq!(controller.state(), RequestState::Idle);
}

#[tokio::test]
async fn test_submit_success() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));

    controller.submit("https://example.com/p/1").await.unwrap();

    assert_eq!(controller.state(), RequestState::Succeeded(dress()));
    assert_eq!(controller.service().calls(), 1);
}

#[tokio::test]
async fn test_submit_service_error_uses_detail() {
    let controller = RequestController::new(ScriptedService::new(Reply::Status(
        422,
        Some("Unsupported marketplace"),
    )));

    controller.submit("https://example.com/p/2").await.unwrap();

    assert_eq!(
        controller.state(),
        RequestState::Failed("Unsupported marketplace".to_string())
    );
}

#[tokio::test]
async fn test_submit_service_error_without_detail() {
    let controller = RequestController::new(ScriptedService::new(Reply::Status(500, None)));

    controller.submit("https://example.com/p/3").await.unwrap();

    let state = controller.state();
    let message = state.error().expect("should be failed");
    assert!(!message.is_empty());
    assert!(message.contains("500"));
}

#[tokio::test]
async fn test_submit_unreadable_body_is_generic_failure() {
    let controller = RequestController::new(ScriptedService::new(Reply::Garbage));

    controller.submit("https://example.com/p/4").await.unwrap();

    assert_eq!(
        controller.state(),
        RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string())
    );
}

#[tokio::test]
async fn test_empty_url_rejected_without_network() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));

    let result = controller.submit("").await;

    assert!(matches!(result, Err(SubmitError::InvalidUrl(_))));
    assert_eq!(controller.state(), RequestState::Idle);
    assert_eq!(controller.service().calls(), 0);
}

#[tokio::test]
async fn test_malformed_url_keeps_previous_state() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));
    controller.submit("https://example.com/p/1").await.unwrap();

    let result = controller.submit("not a url").await;

    assert!(matches!(result, Err(SubmitError::InvalidUrl(_))));
    assert_eq!(controller.state(), RequestState::Succeeded(dress()));
    assert_eq!(controller.service().calls(), 1);
}

#[tokio::test]
async fn test_resubmit_after_failure_replaces_error() {
    let gate = Arc::new(Notify::new());
    let controller = RequestController::new(ScriptedService::gated(
        Reply::Status(422, Some("Unsupported marketplace")),
        gate.clone(),
    ));

    gate.notify_one();
    controller.submit("https://example.com/p/2").await.unwrap();
    assert!(controller.state().error().is_some());

    let mut rx = controller.subscribe();
    let (submitted, pending) = tokio::join!(controller.submit("https://example.com/p/5"), async {
        let pending = rx.wait_for(|s| s.is_pending()).await.unwrap().clone();
        gate.notify_one();
        pending
    });

    submitted.unwrap();
    assert_eq!(
        pending,
        RequestState::Pending("https://example.com/p/5".to_string())
    );
    assert_eq!(pending.error(), None);
    assert_eq!(
        controller.state(),
        RequestState::Failed("Unsupported marketplace".to_string())
    );
    assert_eq!(controller.service().calls(), 2);
}

// ============================================================================
// Pending guard and stale responses
// ============================================================================

#[tokio::test]
async fn test_submit_while_pending_is_rejected() {
    let gate = Arc::new(Notify::new());
    let controller =
        RequestController::new(ScriptedService::gated(Reply::Result(dress()), gate.clone()));
    let mut rx = controller.subscribe();

    let (first, second) = tokio::join!(controller.submit("https://example.com/p/1"), async {
        rx.wait_for(|s| s.is_pending()).await.unwrap();
        let second = controller.submit("https://example.com/p/9").await;
        assert_eq!(
            controller.state(),
            RequestState::Pending("https://example.com/p/1".to_string())
        );
        gate.notify_one();
        second
    });

    assert!(first.is_ok());
    assert_eq!(
        second,
        Err(SubmitError::AlreadyPending(
            "https://example.com/p/1".to_string()
        ))
    );
    assert_eq!(controller.state(), RequestState::Succeeded(dress()));
    assert_eq!(controller.service().calls(), 1);
}

#[tokio::test]
async fn test_begin_while_pending_is_rejected() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));

    let first = controller.begin("https://example.com/p/1").unwrap();
    assert!(controller.begin("https://example.com/p/2").is_err());

    assert!(controller.complete(first, Ok(dress())));
    assert_eq!(controller.state(), RequestState::Succeeded(dress()));
}

#[tokio::test]
async fn test_stale_response_after_newer_result_is_discarded() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));

    let stale = controller.begin("https://example.com/p/1").unwrap();
    let fresh = controller
        .begin_superseding("https://example.com/p/2")
        .unwrap();
    assert!(fresh.generation() > stale.generation());
    assert_eq!(
        controller.state(),
        RequestState::Pending("https://example.com/p/2".to_string())
    );

    assert!(controller.complete(fresh, Ok(shoes())));
    assert!(!controller.complete(stale, Ok(dress())));

    assert_eq!(controller.state(), RequestState::Succeeded(shoes()));
}

#[tokio::test]
async fn test_stale_response_while_newer_pending_is_discarded() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));

    let stale = controller.begin("https://example.com/p/1").unwrap();
    let fresh = controller
        .begin_superseding("https://example.com/p/2")
        .unwrap();

    let stale_error = ClassifyError::ServiceError {
        status: 500,
        detail: Some("late".to_string()),
    };
    assert!(!controller.complete(stale, Err(stale_error)));
    assert_eq!(
        controller.state(),
        RequestState::Pending("https://example.com/p/2".to_string())
    );

    assert!(controller.complete(fresh, Ok(shoes())));
    assert_eq!(controller.state(), RequestState::Succeeded(shoes()));
}

#[tokio::test]
async fn test_superseding_submit_wins() {
    let stale_gate = Arc::new(Notify::new());
    let fresh_gate = Arc::new(Notify::new());
    let controller = RequestController::new(
        ScriptedService::new(Reply::Garbage)
            .route(
                "https://example.com/p/1",
                Reply::Result(dress()),
                stale_gate.clone(),
            )
            .route(
                "https://example.com/p/2",
                Reply::Result(shoes()),
                fresh_gate.clone(),
            ),
    );
    let mut rx = controller.subscribe();

    let (first, second) = tokio::join!(controller.submit("https://example.com/p/1"), async {
        rx.wait_for(|s| s.is_pending()).await.unwrap();
        let (second, _) = tokio::join!(
            controller.submit_superseding("https://example.com/p/2"),
            async {
                // Newer answer first, then the replaced one.
                fresh_gate.notify_one();
                rx.wait_for(|s| s.result().is_some()).await.unwrap();
                stale_gate.notify_one();
            }
        );
        second
    });

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(controller.service().calls(), 2);
    assert_eq!(controller.state(), RequestState::Succeeded(shoes()));
}

// ============================================================================
// Dropped submissions
// ============================================================================

#[tokio::test]
async fn test_dropped_submit_fails_and_accepts_resubmit() {
    let gate = Arc::new(Notify::new());
    let controller =
        RequestController::new(ScriptedService::gated(Reply::Result(dress()), gate.clone()));

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        controller.submit("https://example.com/p/1"),
    )
    .await;

    assert!(timed_out.is_err());
    assert_eq!(
        controller.state(),
        RequestState::Failed(GENERIC_FAILURE_MESSAGE.to_string())
    );

    gate.notify_one();
    controller.submit("https://example.com/p/2").await.unwrap();

    assert_eq!(controller.state(), RequestState::Succeeded(dress()));
    assert_eq!(controller.service().calls(), 2);
}

#[tokio::test]
async fn test_dropped_superseded_submit_leaves_newer_request() {
    let gate = Arc::new(Notify::new());
    let controller =
        RequestController::new(ScriptedService::gated(Reply::Result(dress()), gate.clone()));
    let mut rx = controller.subscribe();

    let fresh = tokio::select! {
        _ = controller.submit("https://example.com/p/1") => panic!("held call finished"),
        fresh = async {
            rx.wait_for(|s| s.is_pending()).await.unwrap();
            controller.begin_superseding("https://example.com/p/2").unwrap()
        } => fresh,
    };

    assert_eq!(
        controller.state(),
        RequestState::Pending("https://example.com/p/2".to_string())
    );
    assert!(controller.complete(fresh, Ok(shoes())));
    assert_eq!(controller.state(), RequestState::Succeeded(shoes()));
}

// ============================================================================
// Observation
// ============================================================================

#[tokio::test]
async fn test_subscribers_see_pending_then_outcome() {
    let gate = Arc::new(Notify::new());
    let controller =
        RequestController::new(ScriptedService::gated(Reply::Result(dress()), gate.clone()));
    let mut rx = controller.subscribe();
    assert_eq!(*rx.borrow_and_update(), RequestState::Idle);

    let (_, seen) = tokio::join!(controller.submit("https://example.com/p/1"), async {
        let mut seen = Vec::new();
        rx.changed().await.unwrap();
        seen.push(rx.borrow_and_update().label());
        gate.notify_one();
        rx.changed().await.unwrap();
        seen.push(rx.borrow_and_update().label());
        seen
    });

    assert_eq!(seen, vec!["pending", "succeeded"]);
}

// ============================================================================
// Error dismissal
// ============================================================================

#[tokio::test]
async fn test_clear_error_is_idempotent() {
    let controller = RequestController::new(ScriptedService::new(Reply::Status(
        422,
        Some("Unsupported marketplace"),
    )));
    controller.submit("https://example.com/p/2").await.unwrap();
    let mut rx = controller.subscribe();
    let _ = rx.borrow_and_update();

    assert!(controller.clear_error());
    assert!(!controller.clear_error());
    assert!(!controller.clear_error());

    assert_eq!(controller.state(), RequestState::Idle);
    assert!(rx.has_changed().unwrap());
    let _ = rx.borrow_and_update();
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_clear_error_ignores_other_states() {
    let controller = RequestController::new(ScriptedService::new(Reply::Result(dress())));

    assert!(!controller.clear_error());
    assert_eq!(controller.state(), RequestState::Idle);

    controller.submit("https://example.com/p/1").await.unwrap();
    assert!(!controller.clear_error());
    assert_eq!(controller.state(), RequestState::Succeeded(dress()));
}

#[tokio::test]
async fn test_error_view_follows_failed_state() {
    let controller = RequestController::new(ScriptedService::new(Reply::Status(
        422,
        Some("Unsupported marketplace"),
    )));
    assert!(ErrorView::from_state(&controller.state()).is_none());

    controller.submit("https://example.com/p/2").await.unwrap();

    let state = controller.state();
    let view = ErrorView::from_state(&state).expect("error view while failed");
    assert_eq!(view.message(), "Unsupported marketplace");
    assert!(view.render().contains("Unsupported marketplace"));

    assert!(view.dismiss(&controller));
    assert!(ErrorView::from_state(&controller.state()).is_none());
}
