//! Processing coordinator.
//!
//! Mediates between the user's "process" action and the OCR client: at most
//! one attempt in flight, a Busy/Idle state the presentation layer mirrors
//! onto the trigger control, and delivery of the outcome to both the UI and
//! the system clipboard. Single-flight is enforced structurally with an
//! owned mutex permit rather than only the disabled button, since the
//! trigger is reachable programmatically (command, global shortcut). The state is
//! restored to Idle on every exit path; even a panicking attempt is observed
//! through its join handle and converted into a user-visible failure.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::capture::{CapturedImage, CurrentImage};
use crate::config::Settings;
use crate::ocr::{OcrClient, OcrOutcome, OcrRequest};
use crate::presenter::Presenter;
use crate::system::TextSink;

/// UI-visible coordinator state. Mutated only by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Idle,
    Busy,
}

pub struct Processor<P: Presenter, S: TextSink> {
    ocr: OcrClient,
    presenter: P,
    clipboard: S,
    current: CurrentImage,
    prompt: String,
    max_retries: u32,
    retry_delay: Duration,
    state: Mutex<ProcessingState>,
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

impl<P: Presenter, S: TextSink> Processor<P, S> {
    pub fn new(
        ocr: OcrClient,
        presenter: P,
        clipboard: S,
        current: CurrentImage,
        settings: &Settings,
    ) -> Self {
        Self {
            ocr,
            presenter,
            clipboard,
            current,
            prompt: settings.prompt.clone(),
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay,
            state: Mutex::new(ProcessingState::Idle),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn state(&self) -> ProcessingState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ProcessingState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        self.presenter.busy_changed(state == ProcessingState::Busy);
    }

    /// Starts processing the current capture. Must be called from within the
    /// async runtime. Returns the attempt's join handle, or `None` when
    /// nothing was dispatched: an attempt is already in flight (silent no-op,
    /// the trigger control is disabled while Busy) or there is no capture yet
    /// (reported to the user, no state change).
    pub fn trigger(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let Ok(permit) = Arc::clone(&self.in_flight).try_lock_owned() else {
            debug!("Processing already in flight, ignoring trigger");
            return None;
        };

        let Some(capture) = self.current.get() else {
            self.presenter.show_error("No image to process.");
            return None;
        };

        self.set_state(ProcessingState::Busy);

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            this.run_attempt(capture).await;
            this.set_state(ProcessingState::Idle);
            drop(permit);
        }))
    }

    async fn run_attempt(&self, capture: Arc<CapturedImage>) {
        let request = OcrRequest {
            image: capture,
            prompt: self.prompt.clone(),
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        };

        // The recognition runs on its own task so that an unexpected panic is
        // observed here as a join error instead of tearing down the
        // coordinator with Busy still set.
        let ocr = self.ocr.clone();
        let outcome =
            match tokio::spawn(async move { ocr.recognize(&request).await }).await {
                Ok(outcome) => outcome,
                Err(e) => OcrOutcome::Failure {
                    reason: format!("Processing failed unexpectedly: {e}"),
                    attempts_exhausted: false,
                },
            };

        match outcome {
            OcrOutcome::Success(text) => {
                self.presenter.show_result(&text);
                if let Err(e) = self.clipboard.write_text(&text) {
                    warn!(error = %e, "Failed to copy recognized text to clipboard");
                    self.presenter
                        .show_error(&format!("Could not copy text to clipboard: {e}"));
                }
            }
            OcrOutcome::Failure { reason, .. } => {
                self.presenter.show_error(&reason);
            }
        }
    }
}
