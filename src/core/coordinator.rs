//! Import coordination
//!
//! [`ImportCoordinator`] owns the current CSV snapshot and runs one
//! submission at a time through an explicit state machine:
//!
//! ```text
//! Idle -> Validating -> RejectedLocal ------------------------> Idle
//!                    -> Sending -> Succeeded | RejectedRemote
//!                                  | TransportFailed ---------> Idle
//! ```
//!
//! Local precondition failures never reach the endpoint.

use log::{debug, warn};
use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::core::endpoint::{GradingEndpoint, TransportError};
use crate::core::report::ImportReport;
use crate::core::request::ImportRequest;
use crate::core::session::{read_snapshot, CsvSnapshot, FileToken, ImportSession};

/// Errors of an import attempt
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ImportError {
    #[error("Please select a CSV file first.")]
    #[diagnostic(
        code(csvgrader::import::no_file),
        help("the file must contain at least one `identifier,grade` line")
    )]
    NoFileSelected,

    #[error("Please select a target problem block.")]
    #[diagnostic(
        code(csvgrader::import::no_target),
        help("pass --target, set `default_target`, or list `targets` in the config")
    )]
    NoTargetSelected,

    #[error("An import is already in progress")]
    #[diagnostic(code(csvgrader::import::in_progress))]
    SubmissionInProgress,

    #[error(transparent)]
    #[diagnostic(
        code(csvgrader::import::transport),
        help("nothing was retried; run the import again once the endpoint is reachable")
    )]
    Transport(#[from] TransportError),

    #[error("{message}")]
    #[diagnostic(code(csvgrader::import::rejected))]
    RemoteRejection { message: String },

    #[error("Failed to read {}: {message}", .path.display())]
    #[diagnostic(code(csvgrader::import::read))]
    Read { path: PathBuf, message: String },
}

/// Submission lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Validating,
    RejectedLocal,
    Sending,
    Succeeded,
    RejectedRemote,
    TransportFailed,
}

impl SubmitState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SubmitState::RejectedLocal
                | SubmitState::Succeeded
                | SubmitState::RejectedRemote
                | SubmitState::TransportFailed
        )
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition(self, next: SubmitState) -> bool {
        use SubmitState::*;
        match (self, next) {
            (Idle, Validating) => true,
            (Validating, RejectedLocal | Sending) => true,
            (Sending, Succeeded | RejectedRemote | TransportFailed) => true,
            (from, Idle) => from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SubmitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmitState::Idle => "idle",
            SubmitState::Validating => "validating",
            SubmitState::RejectedLocal => "rejected-local",
            SubmitState::Sending => "sending",
            SubmitState::Succeeded => "succeeded",
            SubmitState::RejectedRemote => "rejected-remote",
            SubmitState::TransportFailed => "transport-failed",
        };
        write!(f, "{}", name)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the session and drives submissions against a grading endpoint
pub struct ImportCoordinator<E> {
    endpoint: E,
    session: Mutex<ImportSession>,
    state: Mutex<SubmitState>,
    last_outcome: Mutex<Option<SubmitState>>,
    last_summary: Mutex<Option<String>>,
}

impl<E: GradingEndpoint> ImportCoordinator<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            session: Mutex::new(ImportSession::new()),
            state: Mutex::new(SubmitState::Idle),
            last_outcome: Mutex::new(None),
            last_summary: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn state(&self) -> SubmitState {
        *lock(&self.state)
    }

    /// Terminal state reached by the most recent submission
    pub fn last_outcome(&self) -> Option<SubmitState> {
        *lock(&self.last_outcome)
    }

    /// Summary of the most recent successful import
    pub fn last_summary(&self) -> Option<String> {
        lock(&self.last_summary).clone()
    }

    pub fn snapshot(&self) -> Option<Arc<CsvSnapshot>> {
        lock(&self.session).snapshot()
    }

    pub fn begin_load(&self) -> FileToken {
        lock(&self.session).begin_load()
    }

    /// Parse `raw` and make it current unless a newer load has started
    pub fn finish_load(&self, token: FileToken, raw: String, source: Option<PathBuf>) -> bool {
        let snapshot = CsvSnapshot::new(raw, source);
        lock(&self.session).finish_load(token, snapshot)
    }

    /// Make an already-read snapshot current, as a load of its own
    pub fn adopt(&self, snapshot: CsvSnapshot) -> bool {
        let mut session = lock(&self.session);
        let token = session.begin_load();
        session.finish_load(token, snapshot)
    }

    /// Read `path` and make it the current snapshot.
    ///
    /// Returns `Ok(false)` when a newer load superseded this one.
    pub async fn load_file(&self, path: &Path) -> Result<bool, ImportError> {
        let token = self.begin_load();
        let snapshot = read_snapshot(path).await?;
        Ok(lock(&self.session).finish_load(token, snapshot))
    }

    /// Submit the current snapshot.
    ///
    /// Local rejections (no file, no target, already sending) come back as
    /// `Err`. Anything that reached the endpoint comes back as a report,
    /// successful or not.
    pub async fn submit(
        &self,
        max_grade: Option<&str>,
        target: Option<&str>,
    ) -> Result<ImportReport, ImportError> {
        self.begin()?;
        let _reset = ResetOnDrop(&self.state);

        let snapshot = self.snapshot();
        let request = match ImportRequest::prepare(snapshot.as_deref(), max_grade, target) {
            Ok(request) => request,
            Err(e) => {
                debug!("import rejected locally: {}", e);
                self.finish(SubmitState::RejectedLocal);
                return Err(e);
            }
        };

        self.advance(SubmitState::Sending);
        let report = match self.endpoint.import_grades(&request).await {
            Ok(response) => ImportReport::from_response(response),
            Err(e) => {
                warn!("import transport failure: {}", e);
                ImportReport::failed(ImportError::Transport(e))
            }
        };

        if report.success {
            *lock(&self.last_summary) = Some(report.summary.clone());
        }
        self.finish(report.terminal_state());

        Ok(report)
    }

    fn begin(&self) -> Result<(), ImportError> {
        let mut state = lock(&self.state);
        if !state.can_transition(SubmitState::Validating) {
            debug!("submit ignored while {}", *state);
            return Err(ImportError::SubmissionInProgress);
        }
        *state = SubmitState::Validating;
        Ok(())
    }

    fn advance(&self, next: SubmitState) {
        let mut state = lock(&self.state);
        if !state.can_transition(next) {
            warn!("unexpected submit transition {} -> {}", *state, next);
        }
        debug!("submit state {} -> {}", *state, next);
        *state = next;
    }

    fn finish(&self, terminal: SubmitState) {
        self.advance(terminal);
        *lock(&self.last_outcome) = Some(terminal);
        self.advance(SubmitState::Idle);
    }
}

/// Puts the coordinator back to idle if a submission future is dropped early
struct ResetOnDrop<'a>(&'a Mutex<SubmitState>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.0);
        if *state != SubmitState::Idle {
            debug!("submit abandoned while {}", *state);
            *state = SubmitState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::ImportResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::Notify;

    type Answer = Result<ImportResponse, TransportError>;

    /// Endpoint double that records requests and plays back scripted answers.
    /// Once the script runs out it keeps returning `answer`.
    struct FakeEndpoint {
        answer: Answer,
        script: Mutex<VecDeque<Answer>>,
        requests: Mutex<Vec<ImportRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeEndpoint {
        fn answering(answer: Answer) -> Self {
            Self {
                answer,
                script: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn scripted(answers: Vec<Answer>, then: Answer) -> Self {
            Self {
                script: Mutex::new(answers.into()),
                ..Self::answering(then)
            }
        }

        fn gated(answer: Answer, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::answering(answer)
            }
        }

        fn requests(&self) -> Vec<ImportRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GradingEndpoint for FakeEndpoint {
        async fn import_grades(
            &self,
            request: &ImportRequest,
        ) -> Result<ImportResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.answer.clone())
        }
    }

    fn success_response() -> ImportResponse {
        serde_json::from_str(
            r#"{"success": true, "summary": "2 imported",
                "results": [{"username": "a", "grade": 1, "action": "created"},
                            {"username": "b", "grade": 0.5, "action": "updated"}],
                "errors": ["bad_user: not found"]}"#,
        )
        .unwrap()
    }

    fn loaded(endpoint: FakeEndpoint, raw: &str) -> ImportCoordinator<FakeEndpoint> {
        let coordinator = ImportCoordinator::new(endpoint);
        let token = coordinator.begin_load();
        assert!(coordinator.finish_load(token, raw.to_string(), None));
        coordinator
    }

    #[tokio::test]
    async fn test_no_file_is_rejected_without_request() {
        let coordinator = ImportCoordinator::new(FakeEndpoint::answering(Ok(success_response())));

        let err = coordinator.submit(Some("1"), Some("block")).await.unwrap_err();

        assert!(matches!(err, ImportError::NoFileSelected));
        assert!(coordinator.endpoint().requests().is_empty());
        assert_eq!(coordinator.state(), SubmitState::Idle);
        assert_eq!(coordinator.last_outcome(), Some(SubmitState::RejectedLocal));
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected_without_request() {
        let coordinator = loaded(FakeEndpoint::answering(Ok(success_response())), "");

        let err = coordinator.submit(None, Some("block")).await.unwrap_err();

        assert!(matches!(err, ImportError::NoFileSelected));
        assert!(coordinator.endpoint().requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_is_rejected_without_request() {
        let coordinator = loaded(FakeEndpoint::answering(Ok(success_response())), "a,1");

        let err = coordinator.submit(None, None).await.unwrap_err();
        assert!(matches!(err, ImportError::NoTargetSelected));

        let err = coordinator.submit(None, Some("")).await.unwrap_err();
        assert!(matches!(err, ImportError::NoTargetSelected));

        assert!(coordinator.endpoint().requests().is_empty());
        assert_eq!(coordinator.state(), SubmitState::Idle);
    }

    #[tokio::test]
    async fn test_success_sends_raw_text_and_reports_partial_success() {
        let raw = "a,1\nb,0.5\nbad_user,1\nnot a row";
        let coordinator = loaded(FakeEndpoint::answering(Ok(success_response())), raw);

        let report = coordinator.submit(Some("2"), Some("block-1")).await.unwrap();

        let requests = coordinator.endpoint().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].csv_content, raw);
        assert_eq!(requests[0].max_grade, 2.0);
        assert_eq!(requests[0].target_block, "block-1");

        assert!(report.success);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.errors, vec!["bad_user: not found"]);
        assert_eq!(coordinator.last_summary().as_deref(), Some("2 imported"));
        assert_eq!(coordinator.last_outcome(), Some(SubmitState::Succeeded));
        assert_eq!(coordinator.state(), SubmitState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_max_grade_defaults_to_one() {
        let coordinator = loaded(FakeEndpoint::answering(Ok(success_response())), "a,1");

        coordinator.submit(Some("lots"), Some("block")).await.unwrap();
        coordinator.submit(None, Some("block")).await.unwrap();

        let sent: Vec<f64> = coordinator
            .endpoint()
            .requests()
            .iter()
            .map(|r| r.max_grade)
            .collect();
        assert_eq!(sent, vec![1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported_and_allows_retry() {
        let coordinator = loaded(
            FakeEndpoint::answering(Err(TransportError::Status(500))),
            "a,1",
        );

        let report = coordinator.submit(None, Some("block")).await.unwrap();
        assert!(!report.success);
        assert!(report.summary.contains("500"));
        assert_eq!(coordinator.last_outcome(), Some(SubmitState::TransportFailed));
        assert_eq!(coordinator.state(), SubmitState::Idle);
        assert!(coordinator.last_summary().is_none());

        // Retry is a fresh submission; nothing was retried automatically
        coordinator.submit(None, Some("block")).await.unwrap();
        assert_eq!(coordinator.endpoint().requests().len(), 2);
    }

    fn rejection(message: &str) -> ImportResponse {
        ImportResponse {
            success: false,
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_last_summary_survives_failures_until_next_success() {
        let mut second = success_response();
        second.summary = Some("1 imported".to_string());
        let endpoint = FakeEndpoint::scripted(
            vec![
                Ok(success_response()),
                Ok(rejection("Invalid block ID: x")),
                Err(TransportError::Status(502)),
            ],
            Ok(second),
        );
        let coordinator = loaded(endpoint, "a,1");

        coordinator.submit(None, Some("block")).await.unwrap();
        assert_eq!(coordinator.last_summary().as_deref(), Some("2 imported"));

        let report = coordinator.submit(None, Some("x")).await.unwrap();
        assert!(matches!(
            report.failure,
            Some(ImportError::RemoteRejection { ref message }) if message == "Invalid block ID: x"
        ));
        assert_eq!(coordinator.last_outcome(), Some(SubmitState::RejectedRemote));
        assert_eq!(coordinator.last_summary().as_deref(), Some("2 imported"));

        let report = coordinator.submit(None, Some("block")).await.unwrap();
        assert!(!report.success);
        assert_eq!(coordinator.last_outcome(), Some(SubmitState::TransportFailed));
        assert_eq!(coordinator.last_summary().as_deref(), Some("2 imported"));

        coordinator.submit(None, Some("block")).await.unwrap();
        assert_eq!(coordinator.last_outcome(), Some(SubmitState::Succeeded));
        assert_eq!(coordinator.last_summary().as_deref(), Some("1 imported"));
        assert_eq!(coordinator.endpoint().requests().len(), 4);
    }

    #[tokio::test]
    async fn test_second_submit_while_sending_is_rejected() {
        let gate = Arc::new(Notify::new());
        let coordinator = loaded(
            FakeEndpoint::gated(Ok(success_response()), gate.clone()),
            "a,1",
        );

        let (first, second) = tokio::join!(coordinator.submit(None, Some("block")), async {
            let second = coordinator.submit(None, Some("block")).await;
            gate.notify_one();
            second
        });

        assert!(first.unwrap().success);
        assert!(matches!(second, Err(ImportError::SubmissionInProgress)));
        assert_eq!(coordinator.endpoint().requests().len(), 1);
        assert_eq!(coordinator.state(), SubmitState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_submission_returns_to_idle() {
        let gate = Arc::new(Notify::new());
        let coordinator = loaded(FakeEndpoint::gated(Ok(success_response()), gate), "a,1");

        {
            let pending = coordinator.submit(None, Some("block"));
            tokio::pin!(pending);
            let polled = poll_once(pending.as_mut()).await;
            assert!(polled.is_none());
            assert_eq!(coordinator.state(), SubmitState::Sending);
        }

        assert_eq!(coordinator.state(), SubmitState::Idle);
    }

    /// Poll a future exactly once
    async fn poll_once<F: std::future::Future + Unpin>(fut: F) -> Option<F::Output> {
        let mut fut = fut;
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(match std::future::Future::poll(std::pin::Pin::new(&mut fut), cx) {
                std::task::Poll::Ready(out) => Some(out),
                std::task::Poll::Pending => None,
            })
        })
        .await
    }

    #[tokio::test]
    async fn test_load_file_replaces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        std::fs::write(&path, "alice,1\nbob,0\n").unwrap();

        let coordinator = ImportCoordinator::new(FakeEndpoint::answering(Ok(success_response())));
        assert!(coordinator.load_file(&path).await.unwrap());

        let snapshot = coordinator.snapshot().unwrap();
        assert_eq!(snapshot.dataset().total(), 2);
        assert_eq!(snapshot.source(), Some(path.as_path()));
    }

    #[test]
    fn test_adopt_supersedes_pending_load() {
        let coordinator = ImportCoordinator::new(FakeEndpoint::answering(Ok(success_response())));
        let pending = coordinator.begin_load();

        assert!(coordinator.adopt(CsvSnapshot::new("adopted,1".to_string(), None)));
        assert!(!coordinator.finish_load(pending, "late,1".to_string(), None));
        assert_eq!(coordinator.snapshot().unwrap().raw(), "adopted,1");
    }

    #[tokio::test]
    async fn test_stale_load_loses_to_newer_file() {
        let coordinator = ImportCoordinator::new(FakeEndpoint::answering(Ok(success_response())));
        let first = coordinator.begin_load();
        let second = coordinator.begin_load();

        assert!(coordinator.finish_load(second, "new,1".to_string(), None));
        assert!(!coordinator.finish_load(first, "old,1".to_string(), None));
        assert_eq!(coordinator.snapshot().unwrap().raw(), "new,1");
    }

    #[test]
    fn test_state_machine_edges() {
        use SubmitState::*;
        assert!(Idle.can_transition(Validating));
        assert!(Validating.can_transition(RejectedLocal));
        assert!(Validating.can_transition(Sending));
        assert!(Sending.can_transition(TransportFailed));
        assert!(Succeeded.can_transition(Idle));

        assert!(!Sending.can_transition(Validating));
        assert!(!Validating.can_transition(Validating));
        assert!(!Idle.can_transition(Sending));
        assert!(!Sending.can_transition(Idle));
    }
}
