//! Result types returned by the `summarize*` entry points.

use crate::lifecycle::JobSnapshot;
use crate::model::Summary;
use serde::Serialize;

/// A finished job: the summary plus bookkeeping about how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryOutput {
    /// Backend job id; `None` when the backend answered inline.
    pub job_id: Option<String>,
    pub summary: Summary,
    pub stats: JobStats,
}

/// Counters for one completed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    /// Status requests sent.
    pub polls_issued: u32,
    /// Delayed polls scheduled after a `processing` status.
    pub poll_timers: u32,
    /// Wall-clock time from submission to completion.
    pub duration_ms: u64,
}

impl JobStats {
    pub(crate) fn from_snapshot(snapshot: &JobSnapshot, duration_ms: u64) -> Self {
        Self {
            polls_issued: snapshot.polls_issued,
            poll_timers: snapshot.poll_timers,
            duration_ms,
        }
    }
}
