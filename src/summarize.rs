//! One-shot entry points: submit, wait for the job to settle, return the
//! summary.
//!
//! Each call builds its own [`JobController`] and drives exactly one job.
//! Callers that want to watch progress or flip flashcards should hold a
//! controller themselves (or use [`crate::stream::summarize_stream`]).

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::export::{self, ExportFormat};
use crate::lifecycle::{JobController, JobSnapshot};
use crate::model::JobState;
use crate::output::{JobStats, SummaryOutput};
use crate::source::{self, Source};
use crate::transport::{HttpTransport, Transport};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Summarize a local media file or a media URL.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - input errors (file missing, unreadable, empty input)
/// - [`ClientError::JobFailed`] when the job ends `Failed`; the message is
///   the same text a user would have been shown
///
/// # Example
/// ```rust,no_run
/// use lecture2notes::{summarize, ClientConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = summarize("lecture.mp4", &ClientConfig::default()).await?;
/// println!("{}", output.summary.summary);
/// # Ok(())
/// # }
/// ```
pub async fn summarize(
    input: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    let source = source::resolve_source(input.as_ref())?;
    summarize_with(http_transport(config)?, source, config).await
}

/// Like [`summarize`], but with a caller-supplied [`Transport`].
pub async fn summarize_with(
    transport: Arc<dyn Transport>,
    source: Source,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    let started = Instant::now();
    info!("Summarizing {}", source);
    let controller = JobController::new(transport, config);
    controller.submit(source);
    finish(&controller, started).await
}

/// Summarize and write the export to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn summarize_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: ExportFormat,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    let output = summarize(input, config).await?;
    export::write_export(&output.summary, output_path, format).await?;
    Ok(output)
}

/// Summarize media held in memory.
///
/// `file_name` is the name the backend sees for the upload (only its last
/// path component is used). The bytes go through a managed temp directory
/// that is removed on return.
pub async fn summarize_from_bytes(
    bytes: &[u8],
    file_name: &str,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    let name = Path::new(file_name)
        .file_name()
        .ok_or_else(|| ClientError::InvalidInput {
            input: file_name.to_string(),
        })?;
    let dir = tempfile::tempdir().map_err(|e| ClientError::Internal(format!("tempdir: {e}")))?;
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path)
        .map_err(|e| ClientError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| ClientError::Internal(format!("tempfile write: {e}")))?;
    drop(file);

    // `dir` is dropped (and the upload deleted) when this returns
    summarize_with(http_transport(config)?, Source::File(path), config).await
}

/// Follow a job the backend already knows about until it settles.
pub async fn track(
    job_id: impl Into<String>,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    track_with(http_transport(config)?, job_id, config).await
}

/// Like [`track`], but with a caller-supplied [`Transport`].
pub async fn track_with(
    transport: Arc<dyn Transport>,
    job_id: impl Into<String>,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    let job_id = job_id.into();
    if job_id.trim().is_empty() {
        return Err(ClientError::InvalidInput { input: job_id });
    }
    let started = Instant::now();
    info!("Tracking job {}", job_id);
    let controller = JobController::new(transport, config);
    controller.resume(job_id);
    finish(&controller, started).await
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<SummaryOutput, ClientError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ClientError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(input, config))
}

pub(crate) fn http_transport(config: &ClientConfig) -> Result<Arc<dyn Transport>, ClientError> {
    let transport = HttpTransport::new(config)
        .map_err(|e| ClientError::Internal(format!("HTTP client: {e}")))?;
    Ok(Arc::new(transport))
}

async fn finish(
    controller: &JobController,
    started: Instant,
) -> Result<SummaryOutput, ClientError> {
    let snapshot = controller.settled().await?;
    let duration_ms = started.elapsed().as_millis() as u64;
    into_output(snapshot, duration_ms)
}

/// Turn a settled snapshot into the caller-facing result.
pub(crate) fn into_output(
    snapshot: JobSnapshot,
    duration_ms: u64,
) -> Result<SummaryOutput, ClientError> {
    let stats = JobStats::from_snapshot(&snapshot, duration_ms);
    let job = snapshot.job;
    match (job.state, job.summary) {
        (JobState::Completed, Some(summary)) => {
            info!(
                "Job complete: {} polls, {}ms",
                stats.polls_issued, stats.duration_ms
            );
            Ok(SummaryOutput {
                job_id: job.id,
                summary,
                stats,
            })
        }
        (JobState::Failed, _) => {
            let message = job
                .failure
                .map(|f| f.to_string())
                .or(job.error_message)
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!("Job failed: {}", message);
            Err(ClientError::JobFailed {
                job_id: job.id,
                message,
            })
        }
        (state, _) => Err(ClientError::Internal(format!(
            "job settled in unexpected state '{state}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobFailure;
    use crate::model::{Job, Summary};

    fn snapshot(job: Job) -> JobSnapshot {
        JobSnapshot {
            job,
            polls_issued: 3,
            poll_timers: 2,
            ..JobSnapshot::default()
        }
    }

    #[test]
    fn completed_snapshot_becomes_output() {
        let summary = Summary {
            title: "T".into(),
            ..Summary::default()
        };
        let job = Job {
            id: Some("abc".into()),
            state: JobState::Completed,
            summary: Some(summary.clone()),
            ..Job::default()
        };
        let out = into_output(snapshot(job), 42).unwrap();
        assert_eq!(out.job_id.as_deref(), Some("abc"));
        assert_eq!(out.summary, summary);
        assert_eq!(
            out.stats,
            JobStats {
                polls_issued: 3,
                poll_timers: 2,
                duration_ms: 42
            }
        );
    }

    #[test]
    fn failed_snapshot_uses_failure_text_even_after_clear() {
        let job = Job {
            id: Some("abc".into()),
            state: JobState::Failed,
            error_message: None,
            failure: Some(JobFailure::BackendReported("disk full".into())),
            ..Job::default()
        };
        match into_output(snapshot(job), 0).unwrap_err() {
            ClientError::JobFailed { job_id, message } => {
                assert_eq!(job_id.as_deref(), Some("abc"));
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn idle_snapshot_is_internal_error() {
        assert!(matches!(
            into_output(snapshot(Job::default()), 0),
            Err(ClientError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn missing_input_fails_before_any_request() {
        let err = summarize("/no/such/lecture.mp3", &ClientConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_job_id_is_rejected() {
        let err = track("  ", &ClientConfig::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn from_bytes_rejects_nameless_upload() {
        let err = summarize_from_bytes(b"x", "..", &ClientConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput { .. }));
    }
}
