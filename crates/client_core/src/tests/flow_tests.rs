use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::protocol::RawReply;

const VERDICT_JSON: &str = r#"{"verified":true,"similarity_percentage":92.3,"distance":0.21,"threshold":0.4,"model":"X"}"#;

struct ScriptedTransport {
    reply: Result<RawReply, SubmissionError>,
    calls: Arc<AtomicUsize>,
    seen: std::sync::Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    fn replying(status: u16, body: &str) -> Self {
        Self::with(Ok(RawReply::new(status, body)))
    }

    fn failing(err: SubmissionError) -> Self {
        Self::with(Err(err))
    }

    fn with(reply: Result<RawReply, SubmissionError>) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompareTransport for ScriptedTransport {
    async fn send_pair(
        &self,
        first: &SelectedImage,
        second: &SelectedImage,
    ) -> Result<RawReply, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("seen lock")
            .push((first.name.clone(), second.name.clone()));
        self.reply.clone()
    }
}

fn image(name: &str) -> SelectedImage {
    SelectedImage::new(format!("/photos/{name}"), name, "image/jpeg")
}

fn verdict() -> ComparisonResult {
    ComparisonResult {
        verified: true,
        similarity_percentage: 92.3,
        distance: 0.21,
        threshold: 0.4,
        model: "X".to_string(),
    }
}

fn ready_flow() -> SubmissionFlow {
    let mut flow = SubmissionFlow::new();
    flow.select_image(ImageSlot::First, image("a.jpg"))
        .expect("select first");
    flow.select_image(ImageSlot::Second, image("b.jpg"))
        .expect("select second");
    flow
}

#[tokio::test]
async fn successful_submission_stores_verdict_and_clears_busy() {
    let transport = ScriptedTransport::replying(200, VERDICT_JSON);
    let mut flow = ready_flow();

    let result = flow.submit(&transport).await.expect("submit");

    assert_eq!(result, verdict());
    assert_eq!(flow.state().result, Some(verdict()));
    assert!(!flow.state().busy);
    assert_eq!(flow.phase(), FlowPhase::Succeeded);
    assert_eq!(transport.calls(), 1);
    assert_eq!(
        transport.seen.lock().expect("seen lock").as_slice(),
        &[("a.jpg".to_string(), "b.jpg".to_string())]
    );
}

#[tokio::test]
async fn missing_slot_rejects_without_network_activity() {
    let transport = ScriptedTransport::replying(200, VERDICT_JSON);
    let mut flow = SubmissionFlow::new();
    flow.select_image(ImageSlot::Second, image("b.jpg"))
        .expect("select second");

    let err = flow.submit(&transport).await.expect_err("validation");

    assert_eq!(err, SubmissionError::missing_images());
    assert_eq!(err.to_string(), "Please select both images.");
    assert_eq!(transport.calls(), 0);
    assert!(!flow.state().busy);
    assert_eq!(flow.phase(), FlowPhase::Idle);
}

#[tokio::test]
async fn second_submission_while_busy_is_rejected() {
    let transport = ScriptedTransport::replying(200, VERDICT_JSON);
    let mut flow = ready_flow();
    flow.submit(&transport).await.expect("first submit");

    let pending = flow.begin_submit().expect("begin");
    let err = flow.begin_submit().expect_err("second begin while busy");
    assert_eq!(err, SubmissionError::already_submitting());
    assert_eq!(flow.finish_submit(pending, Ok(verdict())), Completion::Applied(verdict()));
    assert_eq!(flow.state().result, Some(verdict()));
}

#[tokio::test]
async fn server_error_is_reported_and_result_stays_empty() {
    let transport = ScriptedTransport::replying(400, r#"{"error":"bad image"}"#);
    let mut flow = ready_flow();

    let err = flow.submit(&transport).await.expect_err("server error");

    assert_eq!(err, SubmissionError::ServerError("bad image".to_string()));
    assert_eq!(flow.state().result, None);
    assert!(!flow.state().busy);
    assert_eq!(flow.phase(), FlowPhase::Failed);
    assert_eq!(flow.last_error(), Some(&err));
}

#[tokio::test]
async fn transport_failure_still_clears_busy() {
    let transport =
        ScriptedTransport::failing(SubmissionError::Transport("connection reset".to_string()));
    let mut flow = ready_flow();

    let err = flow.submit(&transport).await.expect_err("transport error");

    assert_eq!(err.code(), shared::error::ErrorCode::Transport);
    assert!(!flow.state().busy);
    assert_eq!(flow.phase(), FlowPhase::Failed);
}

#[tokio::test]
async fn resubmission_after_failure_issues_a_new_request() {
    let failing = ScriptedTransport::replying(200, "<h1>502 Bad Gateway</h1>");
    let working = ScriptedTransport::replying(200, VERDICT_JSON);
    let mut flow = ready_flow();

    assert_eq!(
        flow.submit(&failing).await.expect_err("gateway"),
        SubmissionError::ServerUnavailable
    );
    assert_eq!(flow.submit(&working).await.expect("retry"), verdict());
    assert_eq!(failing.calls() + working.calls(), 2);
}

#[test]
fn busy_is_only_set_between_begin_and_finish() {
    let mut flow = ready_flow();
    assert!(!flow.state().busy);

    let pending = flow.begin_submit().expect("begin");
    assert!(flow.state().busy);
    assert_eq!(flow.phase(), FlowPhase::Submitting);
    assert_eq!(pending.first().name, "a.jpg");
    assert_eq!(pending.second().name, "b.jpg");

    let completion = flow.finish_submit(pending, Err(SubmissionError::EmptyResponse));
    assert_eq!(completion, Completion::Failed(SubmissionError::EmptyResponse));
    assert!(!flow.state().busy);
}

#[tokio::test]
async fn selecting_an_image_clears_result_but_keeps_sibling() {
    let transport = ScriptedTransport::replying(200, VERDICT_JSON);
    let mut flow = ready_flow();
    flow.submit(&transport).await.expect("submit");

    flow.select_image(ImageSlot::First, image("c.jpg"))
        .expect("reselect");

    assert_eq!(flow.state().result, None);
    assert_eq!(flow.state().first, Some(image("c.jpg")));
    assert_eq!(flow.state().second, Some(image("b.jpg")));
    assert_eq!(flow.phase(), FlowPhase::Idle);
}

#[test]
fn blank_uri_is_rejected_and_state_is_untouched() {
    let mut flow = ready_flow();
    let err = flow
        .select_image(ImageSlot::First, SelectedImage::new("", "x.jpg", "image/jpeg"))
        .expect_err("blank uri");
    assert_eq!(err, SubmissionError::missing_uri());
    assert_eq!(flow.state().first, Some(image("a.jpg")));
}

#[test]
fn reset_clears_everything_including_busy() {
    let mut flow = ready_flow();
    let _pending = flow.begin_submit().expect("begin");

    flow.reset();

    assert_eq!(flow.state(), &FlowState::default());
    assert_eq!(flow.phase(), FlowPhase::Idle);
}

#[test]
fn outcome_arriving_after_reset_does_not_touch_newer_submission() {
    let mut flow = ready_flow();
    let old = flow.begin_submit().expect("begin old");
    flow.reset();

    flow.select_image(ImageSlot::First, image("c.jpg"))
        .expect("select first");
    flow.select_image(ImageSlot::Second, image("d.jpg"))
        .expect("select second");
    let current = flow.begin_submit().expect("begin current");

    assert_eq!(flow.finish_submit(old, Ok(verdict())), Completion::Stale);
    assert!(flow.state().busy);
    assert_eq!(flow.state().result, None);

    assert_eq!(
        flow.finish_submit(current, Ok(verdict())),
        Completion::Applied(verdict())
    );
    assert!(!flow.state().busy);
}

#[test]
fn outcome_for_replaced_images_clears_busy_but_is_discarded() {
    let mut flow = ready_flow();
    let pending = flow.begin_submit().expect("begin");

    flow.select_image(ImageSlot::Second, image("e.jpg"))
        .expect("reselect during flight");
    assert!(flow.state().busy);

    assert_eq!(flow.finish_submit(pending, Ok(verdict())), Completion::Stale);
    assert!(!flow.state().busy);
    assert_eq!(flow.state().result, None);
    assert_eq!(flow.phase(), FlowPhase::Idle);
}
