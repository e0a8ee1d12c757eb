//! Observer trait for job lifecycle events.
//!
//! Inject an [`Arc<dyn JobObserver>`] via
//! [`crate::config::ClientConfigBuilder::observer`] to hear about a job as it
//! moves through upload, polling and completion. The CLI uses this to drive
//! its spinner; a GUI would use it to scroll the results into view.
//!
//! Callbacks run on the tokio task that applied the transition, after the
//! state lock has been released, so an observer may call back into the
//! [`crate::lifecycle::JobController`] (for example to read a snapshot).
//!
//! # Example
//!
//! ```rust
//! use lecture2notes::{ClientConfig, JobObserver};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl JobObserver for PollCounter {
//!     fn on_poll(&self, _job_id: &str, attempt: u32) {
//!         self.0.store(attempt, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .observer(Arc::new(PollCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::model::Summary;
use std::sync::Arc;

/// Receives lifecycle events. All methods default to no-ops.
pub trait JobObserver: Send + Sync {
    /// A submission started. `source` is a display form of the file or URL.
    fn on_upload_start(&self, source: &str) {
        let _ = source;
    }

    /// The backend accepted the submission and assigned `job_id`.
    fn on_job_accepted(&self, job_id: &str) {
        let _ = job_id;
    }

    /// A status request is about to be sent.
    ///
    /// # Arguments
    /// * `job_id`: the job being polled
    /// * `attempt`: 1-based count of status requests for this job
    fn on_poll(&self, job_id: &str, attempt: u32) {
        let _ = (job_id, attempt);
    }

    /// The job reached `Completed`.
    fn on_completed(&self, summary: &Summary) {
        let _ = summary;
    }

    /// The job reached `Failed` with this user-facing message.
    fn on_failed(&self, message: &str) {
        let _ = message;
    }

    /// The displayed error message was cleared by its timer.
    fn on_error_cleared(&self) {}

    /// Results are ready to be brought into view (fires shortly after
    /// `on_completed`, and only if the job was not superseded meanwhile).
    fn on_results_ready(&self, summary: &Summary) {
        let _ = summary;
    }
}

/// An observer that ignores everything. Used when none is configured.
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type SharedObserver = Arc<dyn JobObserver>;
