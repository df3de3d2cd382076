//! Unit tests for the upload flow state machine.
//!
//! Uses a mock Uploader and a recording view that share one event log, so the
//! tests can check the order of UI changes relative to the upload call.

#[cfg(test)]
mod upload_flow_tests {
    use std::sync::{Arc, Mutex};

    use crate::api::auth::AuthContext;
    use crate::api::client::{ApiClient, UploadFile};
    use crate::api::error::ApiError;
    use crate::api::types::{PrescriptionId, UploadResult};
    use crate::notify::{Alerts, Level, ALERT_TTL};
    use crate::upload::{
        FlowState, SubmitOutcome, SubmitView, UploadFlow, Uploader, NO_FILE_MESSAGE,
        PROCESSING_LABEL, SUBMIT_LABEL, UPLOAD_FAILED_MESSAGE,
    };

    // ── Mocks ────────────────────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Enabled(bool),
        Label(String),
        Progress(bool),
        Navigate(String),
        Upload(String),
    }

    type EventLog = Arc<Mutex<Vec<Event>>>;

    struct RecordingView {
        log: EventLog,
    }

    impl SubmitView for RecordingView {
        fn set_submit_enabled(&self, enabled: bool) {
            self.log.lock().unwrap().push(Event::Enabled(enabled));
        }
        fn set_submit_label(&self, label: &str) {
            self.log.lock().unwrap().push(Event::Label(label.to_string()));
        }
        fn set_progress_visible(&self, visible: bool) {
            self.log.lock().unwrap().push(Event::Progress(visible));
        }
        fn navigate(&self, location: &str) {
            self.log.lock().unwrap().push(Event::Navigate(location.to_string()));
        }
    }

    /// Mock uploader returning a canned response.
    struct MockUploader {
        log: EventLog,
        response: fn() -> Result<UploadResult, ApiError>,
    }

    impl MockUploader {
        fn calls(&self) -> usize {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, Event::Upload(_)))
                .count()
        }
    }

    impl Uploader for MockUploader {
        async fn upload(&self, file: &UploadFile) -> Result<UploadResult, ApiError> {
            self.log.lock().unwrap().push(Event::Upload(file.file_name.clone()));
            (self.response)()
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    struct Harness {
        log: EventLog,
        view: RecordingView,
        uploader: MockUploader,
        alerts: Alerts,
        auth: AuthContext,
    }

    fn harness(token: Option<&str>, response: fn() -> Result<UploadResult, ApiError>) -> Harness {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        Harness {
            view: RecordingView { log: Arc::clone(&log) },
            uploader: MockUploader {
                log: Arc::clone(&log),
                response,
            },
            log,
            alerts: Alerts::silent(ALERT_TTL),
            auth: AuthContext::with_tokens(token.map(String::from), None),
        }
    }

    fn file() -> Option<UploadFile> {
        Some(UploadFile::new("rx.jpg", vec![0xFF, 0xD8]))
    }

    fn ok_with_id() -> Result<UploadResult, ApiError> {
        Ok(UploadResult {
            prescription_id: Some(PrescriptionId::Number(42)),
            ..Default::default()
        })
    }

    fn ok_without_id() -> Result<UploadResult, ApiError> {
        Ok(UploadResult::default())
    }

    fn server_error() -> Result<UploadResult, ApiError> {
        Err(ApiError::Upload {
            status: 500,
            message: "Error processing prescription: OCR engine unavailable".into(),
        })
    }

    fn html_body() -> Result<UploadResult, ApiError> {
        let err = serde_json::from_str::<serde_json::Value>("<html>Bad Gateway</html>").unwrap_err();
        Err(ApiError::Decode(err))
    }

    // ── Tests ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_no_file_blocks_without_network() {
        let h = harness(Some("jwt"), ok_with_id);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        let outcome = flow.submit(None).await;

        assert_eq!(outcome, SubmitOutcome::Blocked);
        assert!(outcome.cancels_native_submission());
        assert_eq!(flow.state(), FlowState::Idle);
        assert_eq!(h.uploader.calls(), 0);
        assert!(h.log.lock().unwrap().is_empty());

        let alerts = h.alerts.visible();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, NO_FILE_MESSAGE);
        assert_eq!(alerts[0].level, Level::Error);
    }

    #[tokio::test]
    async fn test_no_token_falls_back_to_native_submit() {
        let h = harness(None, ok_with_id);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        let outcome = flow.submit(file()).await;

        assert_eq!(outcome, SubmitOutcome::NativeSubmit);
        assert!(!outcome.cancels_native_submission());
        assert_eq!(flow.state(), FlowState::PlainSubmit);
        assert_eq!(h.uploader.calls(), 0);
        assert_eq!(
            *h.log.lock().unwrap(),
            vec![
                Event::Enabled(false),
                Event::Label(PROCESSING_LABEL.into()),
                Event::Progress(true),
            ]
        );
        assert!(h.alerts.visible().is_empty());
    }

    #[tokio::test]
    async fn test_token_uploads_once_and_redirects() {
        let h = harness(Some("jwt"), ok_with_id);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        let outcome = flow.submit(file()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Redirected {
                prescription_id: PrescriptionId::Number(42),
                location: "/results/42/".into(),
                result: ok_with_id().unwrap(),
            }
        );
        assert!(outcome.cancels_native_submission());
        assert_eq!(flow.state(), FlowState::Success);
        assert_eq!(h.uploader.calls(), 1);
        assert_eq!(
            *h.log.lock().unwrap(),
            vec![
                Event::Enabled(false),
                Event::Label(PROCESSING_LABEL.into()),
                Event::Progress(true),
                Event::Upload("rx.jpg".into()),
                Event::Navigate("/results/42/".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_id_fails_and_reenables() {
        let h = harness(Some("jwt"), ok_without_id);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        let outcome = flow.submit(file()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: "No prescription ID returned".into()
            }
        );
        assert_eq!(flow.state(), FlowState::Idle);

        let log = h.log.lock().unwrap();
        assert_eq!(
            log[log.len() - 3..],
            [
                Event::Enabled(true),
                Event::Label(SUBMIT_LABEL.into()),
                Event::Progress(false),
            ]
        );
        assert!(!log.iter().any(|e| matches!(e, Event::Navigate(_))));

        let alerts = h.alerts.visible();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "No prescription ID returned");
    }

    #[tokio::test]
    async fn test_upload_error_surfaces_server_message() {
        let h = harness(Some("jwt"), server_error);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        let outcome = flow.submit(file()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: "Error processing prescription: OCR engine unavailable".into()
            }
        );
        assert_eq!(h.alerts.visible()[0].level, Level::Error);
    }

    #[tokio::test]
    async fn test_control_stays_disabled_during_upload() {
        let h = harness(Some("jwt"), server_error);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);
        flow.submit(file()).await;

        let log = h.log.lock().unwrap();
        let upload_at = log.iter().position(|e| matches!(e, Event::Upload(_))).unwrap();
        let disabled_at = log.iter().position(|e| *e == Event::Enabled(false)).unwrap();
        let enabled_at = log.iter().position(|e| *e == Event::Enabled(true)).unwrap();
        assert!(disabled_at < upload_at);
        assert!(upload_at < enabled_at);
    }

    #[tokio::test]
    async fn test_resubmit_after_failure() {
        let h = harness(Some("jwt"), server_error);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        assert!(matches!(flow.submit(file()).await, SubmitOutcome::Failed { .. }));
        assert!(matches!(flow.submit(file()).await, SubmitOutcome::Failed { .. }));
        assert_eq!(h.uploader.calls(), 2);
    }

    #[tokio::test]
    async fn test_submit_after_success_is_ignored() {
        let h = harness(Some("jwt"), ok_with_id);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        flow.submit(file()).await;
        let outcome = flow.submit(file()).await;

        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert!(!outcome.cancels_native_submission());
        assert_eq!(h.uploader.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_presence_read_at_submit_time() {
        let h = harness(None, ok_with_id);
        h.auth.set_access_token("late".into()).await;
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        assert!(matches!(flow.submit(file()).await, SubmitOutcome::Redirected { .. }));
    }

    #[tokio::test]
    async fn test_malformed_response_shows_generic_message() {
        let h = harness(Some("jwt"), html_body);
        let mut flow = UploadFlow::new(&h.uploader, &h.auth, &h.view, &h.alerts);

        let outcome = flow.submit(file()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: UPLOAD_FAILED_MESSAGE.into()
            }
        );
        assert_eq!(flow.state(), FlowState::Idle);
        let alerts = h.alerts.visible();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, UPLOAD_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_network_failure_shows_generic_message() {
        // Nothing listens on port 1.
        let client = ApiClient::new(
            "http://127.0.0.1:1",
            Arc::new(AuthContext::with_tokens(Some("jwt".into()), None)),
        );
        let auth = AuthContext::with_tokens(Some("jwt".into()), None);
        let view = RecordingView {
            log: Arc::new(Mutex::new(Vec::new())),
        };
        let alerts = Alerts::silent(ALERT_TTL);
        let mut flow = UploadFlow::new(&client, &auth, &view, &alerts);

        let outcome = flow.submit(file()).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                message: UPLOAD_FAILED_MESSAGE.into()
            }
        );
        let alerts = alerts.visible();
        assert_eq!(alerts.len(), 1);
        assert!(!alerts[0].message.contains("127.0.0.1"));
        assert_eq!(*view.log.lock().unwrap().last().unwrap(), Event::Progress(false));
    }
}
