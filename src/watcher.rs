//! Background clipboard watcher.
//!
//! Samples the clipboard on a fixed interval, fingerprints whatever image is
//! there, and publishes a capture plus a `new-image` notification when the
//! fingerprint changes. Matching fingerprints are an idempotent no-op, so a
//! screenshot sitting on the clipboard for minutes notifies exactly once.
//! Clipboard errors are swallowed by the source (`ImageSource::capture_image`
//! fails soft); the loop itself only ends through its cancellation token at
//! process shutdown.

use std::time::{Duration, SystemTime};

use image::GenericImageView;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::capture::{CapturedImage, CurrentImage};
use crate::fingerprint;
use crate::presenter::Presenter;
use crate::system::ImageSource;

pub struct ClipboardWatcher<S: ImageSource, P: Presenter> {
    source: S,
    presenter: P,
    current: CurrentImage,
    last_seen: Option<String>,
    raise_on_capture: bool,
}

impl<S: ImageSource, P: Presenter> ClipboardWatcher<S, P> {
    pub fn new(source: S, presenter: P, current: CurrentImage, raise_on_capture: bool) -> Self {
        Self {
            source,
            presenter,
            current,
            last_seen: None,
            raise_on_capture,
        }
    }

    /// One poll cycle: sample, compare fingerprints, publish on change.
    pub fn poll_once(&mut self) {
        let Some(image) = self.source.capture_image() else {
            return;
        };

        let digest = fingerprint::digest(&image);
        if self.last_seen.as_deref() == Some(digest.as_str()) {
            return;
        }

        info!(
            digest = &digest[..12],
            width = image.width(),
            height = image.height(),
            "New clipboard image detected"
        );

        let capture = CapturedImage {
            image,
            fingerprint: digest.clone(),
            captured_at: SystemTime::now(),
        };
        let preview = capture.preview();

        self.last_seen = Some(digest);
        self.current.publish(capture);

        match preview {
            Ok(preview) => self.presenter.new_image(&preview),
            Err(e) => warn!(error = %e, "Failed to render preview for new capture"),
        }

        if self.raise_on_capture {
            self.presenter.bring_to_front();
        }
    }

    /// Runs the poll loop until `cancel` fires. Ticks that fall behind are
    /// delayed rather than bursted.
    pub async fn run(mut self, poll_interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_ms = poll_interval.as_millis() as u64,
            "Clipboard watcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Clipboard watcher stopped");
                    return;
                }
                _ = ticker.tick() => self.poll_once(),
            }
        }
    }
}
