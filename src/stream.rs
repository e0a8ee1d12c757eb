//! Streaming API: observe a job as a `Stream` of snapshots.
//!
//! Unlike the one-shot [`crate::summarize::summarize`], which returns only
//! after the job settles, [`job_updates`] yields a [`JobSnapshot`] each time
//! the job changes. The underlying channel is a `watch`, so a slow consumer
//! sees the latest state rather than every intermediate one. The stream ends
//! after the first terminal (`Completed` or `Failed`) snapshot.

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::lifecycle::{JobController, JobSnapshot};
use crate::source;
use crate::summarize::http_transport;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of job snapshots.
pub type JobStream = Pin<Box<dyn Stream<Item = JobSnapshot> + Send>>;

/// Snapshots of `controller`'s job, starting with the current one.
pub fn job_updates(controller: &JobController) -> JobStream {
    let updates = WatchStream::new(controller.subscribe());
    // The state becomes `None` after a terminal snapshot so the channel is
    // not polled again; a settled job may never publish another update.
    let stream = stream::unfold(Some(updates), |updates| async move {
        let mut updates = updates?;
        let snapshot = updates.next().await?;
        let rest = (!snapshot.job.state.is_terminal()).then_some(updates);
        Some((snapshot, rest))
    });
    Box::pin(stream)
}

/// Submit `input` and stream the job's snapshots.
///
/// Returns the controller too, so the caller can toggle flashcards on the
/// completed summary or start over with a new submission.
///
/// # Returns
/// - `Ok((JobController, JobStream))`
/// - `Err(ClientError)`: fatal input error (file not found, empty input)
pub async fn summarize_stream(
    input: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<(JobController, JobStream), ClientError> {
    let source = source::resolve_source(input.as_ref())?;
    info!("Starting streamed summary: {}", source);

    let controller = JobController::new(http_transport(config)?, config);
    controller.submit(source);
    let updates = job_updates(&controller);
    Ok((controller, updates))
}
