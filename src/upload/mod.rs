//! Prescription upload flow.
//!
//! Drives one form submission through
//! `Idle -> Validating -> Submitting -> (PlainSubmit | ApiSubmit) -> (Success | Failed)`.
//! With no access token the flow hands the submission back to the
//! server-rendered form (session auth); with a token it uploads through the
//! API and redirects to the results page.

pub mod view;
#[cfg(test)]
mod tests;

pub use view::{SubmitView, TerminalView};

use crate::api::auth::AuthContext;
use crate::api::client::{ApiClient, UploadFile};
use crate::api::error::ApiError;
use crate::api::prescriptions::{self, results_path};
use crate::api::types::{PrescriptionId, UploadResult};
use crate::notify::{Level, Notifier};

/// Label shown on the submit control while an upload is in progress.
pub const PROCESSING_LABEL: &str = "Processing...";

/// Label the submit control is restored to after a failure.
pub const SUBMIT_LABEL: &str = "Upload and Process";

/// Validation message when the form is submitted without a file.
pub const NO_FILE_MESSAGE: &str = "Please select a file";

/// Shown for network and malformed-response failures, and when an upload
/// error carries no message.
pub const UPLOAD_FAILED_MESSAGE: &str = "Error uploading prescription";

/// Trait abstracting the upload call for testability.
///
/// `ApiClient` implements this via POST /prescriptions/upload/.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResult, ApiError>;
}

impl Uploader for ApiClient {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResult, ApiError> {
        prescriptions::upload_prescription(self, file).await
    }
}

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Validating,
    Submitting,
    /// Handed to the plain form POST. Terminal.
    PlainSubmit,
    ApiSubmit,
    /// Redirected to the results page. Terminal.
    Success,
    Failed,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::PlainSubmit | FlowState::Success)
    }
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No file selected; nothing was sent.
    Blocked,
    /// No access token; the native form submission proceeds.
    NativeSubmit,
    /// Uploaded via the API and navigated to the results page.
    Redirected {
        prescription_id: PrescriptionId,
        location: String,
        result: UploadResult,
    },
    /// Upload failed; the form is usable again.
    Failed { message: String },
    /// The flow already reached a terminal state.
    Ignored,
}

impl SubmitOutcome {
    /// Whether the native form submission must be cancelled.
    pub fn cancels_native_submission(&self) -> bool {
        !matches!(self, SubmitOutcome::NativeSubmit | SubmitOutcome::Ignored)
    }
}

/// One upload form's submission state machine.
pub struct UploadFlow<'a, U, V> {
    uploader: &'a U,
    auth: &'a AuthContext,
    view: &'a V,
    notifier: &'a dyn Notifier,
    state: FlowState,
}

impl<'a, U: Uploader, V: SubmitView> UploadFlow<'a, U, V> {
    pub fn new(
        uploader: &'a U,
        auth: &'a AuthContext,
        view: &'a V,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            uploader,
            auth,
            view,
            notifier,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Handle a submit event for the selected file (if any).
    pub async fn submit(&mut self, file: Option<UploadFile>) -> SubmitOutcome {
        if self.state.is_terminal() {
            log::warn!("Submit ignored: upload flow already {:?}", self.state);
            return SubmitOutcome::Ignored;
        }

        self.transition(FlowState::Validating);
        let Some(file) = file else {
            self.notifier.notify(NO_FILE_MESSAGE, Level::Error);
            self.transition(FlowState::Idle);
            return SubmitOutcome::Blocked;
        };

        self.transition(FlowState::Submitting);
        self.view.set_submit_enabled(false);
        self.view.set_submit_label(PROCESSING_LABEL);
        self.view.set_progress_visible(true);

        if !self.auth.has_access_token().await {
            self.transition(FlowState::PlainSubmit);
            return SubmitOutcome::NativeSubmit;
        }

        self.transition(FlowState::ApiSubmit);
        match self.upload(&file).await {
            Ok((prescription_id, result)) => {
                let location = results_path(&prescription_id);
                self.view.navigate(&location);
                self.transition(FlowState::Success);
                SubmitOutcome::Redirected {
                    prescription_id,
                    location,
                    result,
                }
            }
            Err(e) => {
                let message = failure_message(&e);
                self.notifier.notify(&message, Level::Error);
                self.view.set_submit_enabled(true);
                self.view.set_submit_label(SUBMIT_LABEL);
                self.view.set_progress_visible(false);
                self.transition(FlowState::Failed);
                self.transition(FlowState::Idle);
                SubmitOutcome::Failed { message }
            }
        }
    }

    async fn upload(&self, file: &UploadFile) -> Result<(PrescriptionId, UploadResult), ApiError> {
        let result = self.uploader.upload(file).await?;
        let id = result
            .prescription_id()
            .cloned()
            .ok_or(ApiError::MissingPrescriptionId)?;
        Ok((id, result))
    }

    fn transition(&mut self, next: FlowState) {
        log::debug!("Upload flow: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// What the user is told about a failed upload.
///
/// Server-supplied messages are shown as-is. Transport and decode details
/// stay in the log.
fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Transport(_) | ApiError::Decode(_) => UPLOAD_FAILED_MESSAGE.to_string(),
        other => {
            let message = other.to_string();
            if message.is_empty() {
                UPLOAD_FAILED_MESSAGE.to_string()
            } else {
                message
            }
        }
    }
}
