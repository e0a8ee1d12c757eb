//! The job state machine, free of I/O and timers.
//!
//! [`JobMachine`] owns the single tracked [`Job`] and a generation counter.
//! Every input (a submission response, a poll response, a timer firing)
//! arrives with the [`Ticket`] that was issued when its work was scheduled.
//! A ticket from an older generation means the user has since started a new
//! job, and the input is dropped without touching state.
//!
//! Transitions return a [`Step`]: an optional [`JobEvent`] for observers and
//! the [`Effect`]s (polls, timers) the driver must schedule next. The driver
//! lives in [`super::controller`]; this split keeps every transition testable
//! without a runtime.

use crate::error::{JobFailure, TransportError};
use crate::model::{Job, JobState, Summary};
use crate::normalize::{normalize, Malformed, NormalizedResult, Origin};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Status text shown while the submission is in flight.
pub const STATUS_UPLOADING: &str = "Uploading...";
/// Status text after a transport failure during submission.
pub const STATUS_UPLOAD_ERROR: &str = "Error uploading file";
/// Status text when the submission response could not be understood.
pub const STATUS_UNEXPECTED: &str = "Received unexpected response from server";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_COMPLETED: &str = "completed";

/// Delays that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay between a `processing` answer and the next poll.
    pub poll_interval: Duration,
    /// How long an auto-clearing error message stays visible.
    pub error_clear_delay: Duration,
    /// Delay before the "results ready" presentation event.
    pub reveal_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            error_clear_delay: Duration::from_millis(5000),
            reveal_delay: Duration::from_millis(100),
        }
    }
}

/// Identifies the job generation a piece of scheduled work belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Work the driver must schedule after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Request the job status, immediately (`delay: None`) or after a timer.
    Poll {
        ticket: Ticket,
        job_id: String,
        delay: Option<Duration>,
    },
    /// Reset the displayed error message after `delay`.
    ClearError { ticket: Ticket, delay: Duration },
    /// Announce that results are ready to be shown, after `delay`.
    RevealResults { ticket: Ticket, delay: Duration },
}

/// Something observers should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Accepted { job_id: String },
    StillProcessing,
    Completed { summary: Summary },
    Failed { message: String },
    ErrorCleared,
}

/// Result of feeding one input to the machine.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Step {
    /// `false` when the input was stale or arrived in the wrong state.
    pub applied: bool,
    pub event: Option<JobEvent>,
    pub effects: Vec<Effect>,
}

impl Step {
    fn ignored() -> Self {
        Self::default()
    }

    fn applied(event: JobEvent, effects: Vec<Effect>) -> Self {
        Self {
            applied: true,
            event: Some(event),
            effects,
        }
    }
}

/// Point-in-time view of the tracked job, published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub job: Job,
    /// Short status line ("Uploading...", "processing", "completed", …).
    pub status_text: Option<String>,
    pub generation: u64,
    /// Status requests issued for the current job.
    pub polls_issued: u32,
    /// Delayed polls scheduled for the current job (immediate polls excluded).
    pub poll_timers: u32,
}

/// Owner of the single tracked job.
#[derive(Debug)]
pub struct JobMachine {
    job: Job,
    generation: u64,
    status_text: Option<String>,
    polls_issued: u32,
    poll_timers: u32,
    timing: Timing,
}

impl Default for JobMachine {
    fn default() -> Self {
        Self::new(Timing::default())
    }
}

impl JobMachine {
    pub fn new(timing: Timing) -> Self {
        Self {
            job: Job::default(),
            generation: 0,
            status_text: None,
            polls_issued: 0,
            poll_timers: 0,
            timing,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn state(&self) -> JobState {
        self.job.state
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job: self.job.clone(),
            status_text: self.status_text.clone(),
            generation: self.generation,
            polls_issued: self.polls_issued,
            poll_timers: self.poll_timers,
        }
    }

    /// Discard whatever job exists and start a new one in `Uploading`.
    ///
    /// Allowed from every state: starting over while a job is still
    /// processing abandons it, and all of its outstanding work goes stale.
    pub fn begin_upload(&mut self) -> Ticket {
        let ticket = self.next_generation(Job::uploading());
        self.status_text = Some(STATUS_UPLOADING.to_string());
        info!("Job generation {}: uploading", ticket.generation);
        ticket
    }

    /// Start tracking a job the backend already knows about.
    pub fn resume(&mut self, job_id: impl Into<String>) -> (Ticket, Step) {
        let job_id = job_id.into();
        let ticket = self.next_generation(Job::processing(job_id.clone()));
        self.status_text = Some(STATUS_PROCESSING.to_string());
        info!("Job generation {}: resuming {}", ticket.generation, job_id);
        let step = Step::applied(
            JobEvent::Accepted {
                job_id: job_id.clone(),
            },
            vec![Effect::Poll {
                ticket,
                job_id,
                delay: None,
            }],
        );
        (ticket, step)
    }

    /// Record that a status request is about to go out.
    ///
    /// Returns the 1-based attempt number, or `None` when the ticket is stale
    /// and the request should not be sent.
    pub fn note_poll_issued(&mut self, ticket: Ticket) -> Option<u32> {
        if !self.is_current(ticket) || self.job.state != JobState::Processing {
            return None;
        }
        self.polls_issued += 1;
        Some(self.polls_issued)
    }

    /// Apply the outcome of `POST /upload` or `POST /transcribe`.
    pub fn apply_submission(
        &mut self,
        ticket: Ticket,
        outcome: Result<Value, TransportError>,
    ) -> Step {
        if !self.accepts(ticket, JobState::Uploading, "submission response") {
            return Step::ignored();
        }

        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Upload failed: {}", err);
                self.status_text = Some(STATUS_UPLOAD_ERROR.to_string());
                return self.fail(ticket, JobFailure::UploadTransport(err));
            }
        };

        match normalize(&raw, Origin::Submission) {
            NormalizedResult::Pending { job_id } => {
                info!("Job accepted by backend: {}", job_id);
                self.job.id = Some(job_id.clone());
                self.job.state = JobState::Processing;
                Step::applied(
                    JobEvent::Accepted {
                        job_id: job_id.clone(),
                    },
                    vec![Effect::Poll {
                        ticket,
                        job_id,
                        delay: None,
                    }],
                )
            }
            NormalizedResult::Direct { summary } => {
                info!("Backend returned the summary inline");
                self.complete(ticket, summary)
            }
            NormalizedResult::Malformed(reason) => {
                warn!("Unusable submission response: {:?}", reason);
                if reason != Malformed::Absent {
                    self.status_text = Some(STATUS_UNEXPECTED.to_string());
                }
                self.fail(ticket, JobFailure::InvalidSubmission)
            }
            other => {
                // Poll-only classifications cannot come from a submission.
                warn!("Unexpected submission classification: {:?}", other);
                self.fail(ticket, JobFailure::InvalidSubmission)
            }
        }
    }

    /// Apply the outcome of `GET /status/{job_id}`.
    pub fn apply_poll(&mut self, ticket: Ticket, outcome: Result<Value, TransportError>) -> Step {
        if !self.accepts(ticket, JobState::Processing, "status response") {
            return Step::ignored();
        }

        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Status check failed: {}", err);
                return self.fail(ticket, JobFailure::poll_transport(&err));
            }
        };

        match normalize(&raw, Origin::Poll) {
            NormalizedResult::InFlight => {
                let job_id = self.job.id.clone().unwrap_or_default();
                let delay = self.timing.poll_interval;
                debug!("Job {} still processing; next poll in {:?}", job_id, delay);
                self.status_text = Some(STATUS_PROCESSING.to_string());
                self.poll_timers += 1;
                Step::applied(
                    JobEvent::StillProcessing,
                    vec![Effect::Poll {
                        ticket,
                        job_id,
                        delay: Some(delay),
                    }],
                )
            }
            NormalizedResult::Done {
                summary: Some(summary),
            } => self.complete(ticket, summary),
            NormalizedResult::Done { summary: None } => {
                self.fail(ticket, JobFailure::IncompleteResult)
            }
            NormalizedResult::ErrorStatus { message } => {
                self.fail(ticket, JobFailure::BackendReported(message))
            }
            NormalizedResult::Malformed(reason) => {
                let failure = match reason {
                    Malformed::UnrecognizedStatus(status) => JobFailure::UnexpectedStatus(status),
                    Malformed::UndecodableSummary(detail) => {
                        warn!("Summary could not be decoded: {}", detail);
                        JobFailure::UndecodableSummary
                    }
                    Malformed::Absent | Malformed::UnexpectedShape => JobFailure::InvalidStatus,
                };
                self.fail(ticket, failure)
            }
            other => {
                // Submission-only classifications cannot come from a poll.
                warn!("Unexpected status classification: {:?}", other);
                self.fail(ticket, JobFailure::InvalidStatus)
            }
        }
    }

    /// Reset the displayed error. The state stays `Failed`; this is not a
    /// retry.
    pub fn clear_error(&mut self, ticket: Ticket) -> Step {
        if !self.is_current(ticket)
            || self.job.state != JobState::Failed
            || self.job.error_message.is_none()
        {
            return Step::ignored();
        }
        debug!("Clearing error message for generation {}", ticket.generation);
        self.job.error_message = None;
        Step::applied(JobEvent::ErrorCleared, Vec::new())
    }

    /// The completed summary, if `ticket` still names the current completed
    /// job.
    pub fn revealable(&self, ticket: Ticket) -> Option<&Summary> {
        if !self.is_current(ticket) || self.job.state != JobState::Completed {
            return None;
        }
        self.job.summary.as_ref()
    }

    /// Flip one flashcard of the completed summary.
    ///
    /// Returns the card's new `flipped` value, or `None` when there is no
    /// summary or no card at `index`.
    pub fn toggle_flashcard(&mut self, index: usize) -> Option<bool> {
        self.job
            .summary
            .as_mut()
            .and_then(|s| s.flashcards.get_mut(index))
            .map(|card| card.toggle())
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn next_generation(&mut self, job: Job) -> Ticket {
        self.generation += 1;
        self.job = job;
        self.polls_issued = 0;
        self.poll_timers = 0;
        Ticket {
            generation: self.generation,
        }
    }

    fn accepts(&self, ticket: Ticket, expected: JobState, what: &str) -> bool {
        if !self.is_current(ticket) {
            warn!(
                "Ignoring stale {} for generation {} (current: {})",
                what, ticket.generation, self.generation
            );
            return false;
        }
        if self.job.state != expected {
            warn!(
                "Ignoring {} while {} (expected {})",
                what, self.job.state, expected
            );
            return false;
        }
        true
    }

    fn complete(&mut self, ticket: Ticket, summary: Summary) -> Step {
        self.job.state = JobState::Completed;
        self.job.summary = Some(summary.clone());
        self.job.error_message = None;
        self.job.failure = None;
        self.status_text = Some(STATUS_COMPLETED.to_string());
        info!(
            "Job {} completed",
            self.job.id.as_deref().unwrap_or("<inline>")
        );
        Step::applied(
            JobEvent::Completed { summary },
            vec![Effect::RevealResults {
                ticket,
                delay: self.timing.reveal_delay,
            }],
        )
    }

    fn fail(&mut self, ticket: Ticket, failure: JobFailure) -> Step {
        let message = failure.to_string();
        warn!(
            "Job {} failed: {}",
            self.job.id.as_deref().unwrap_or("<unassigned>"),
            message
        );
        let mut effects = Vec::new();
        if failure.auto_clears() {
            effects.push(Effect::ClearError {
                ticket,
                delay: self.timing.error_clear_delay,
            });
        }
        self.job.state = JobState::Failed;
        self.job.summary = None;
        self.job.error_message = Some(message.clone());
        self.job.failure = Some(failure);
        Step::applied(JobEvent::Failed { message }, effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Flashcard;
    use serde_json::json;

    fn summary_json() -> Value {
        json!({
            "title": "Graphs",
            "summary": "Vertices and edges.",
            "key_takeaways": ["BFS finds shortest paths"],
            "bulleted_notes": ["Adjacency lists"],
            "flashcards": [
                {"question": "What is a DAG?", "answer": "Directed acyclic graph"},
                {"question": "BFS uses?", "answer": "A queue"}
            ]
        })
    }

    fn processing(machine: &mut JobMachine) -> Ticket {
        let ticket = machine.begin_upload();
        let step = machine.apply_submission(ticket, Ok(json!({"job_id": "job-1"})));
        assert!(step.applied);
        ticket
    }

    #[test]
    fn starts_idle() {
        let m = JobMachine::default();
        assert_eq!(m.state(), JobState::Idle);
        assert_eq!(m.snapshot().generation, 0);
    }

    #[test]
    fn begin_upload_sets_status_text() {
        let mut m = JobMachine::default();
        m.begin_upload();
        let snap = m.snapshot();
        assert_eq!(snap.job.state, JobState::Uploading);
        assert_eq!(snap.status_text.as_deref(), Some("Uploading..."));
        assert!(snap.job.is_consistent());
    }

    #[test]
    fn pending_moves_to_processing_and_polls_immediately() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        let step = m.apply_submission(ticket, Ok(json!({"job_id": "job-1"})));
        assert_eq!(m.state(), JobState::Processing);
        assert_eq!(m.job().id.as_deref(), Some("job-1"));
        assert_eq!(
            step.effects,
            vec![Effect::Poll {
                ticket,
                job_id: "job-1".into(),
                delay: None
            }]
        );
        assert_eq!(m.snapshot().poll_timers, 0);
    }

    #[test]
    fn direct_result_completes_without_polling() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        let step = m.apply_submission(
            ticket,
            Ok(json!({"status": "completed", "summary": summary_json()})),
        );
        assert_eq!(m.state(), JobState::Completed);
        assert_eq!(m.snapshot().status_text.as_deref(), Some("completed"));
        assert!(matches!(step.event, Some(JobEvent::Completed { .. })));
        assert!(matches!(step.effects[..], [Effect::RevealResults { .. }]));
        assert!(m.job().is_consistent());
    }

    #[test]
    fn null_submission_fails_without_auto_clear() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        let step = m.apply_submission(ticket, Ok(Value::Null));
        assert_eq!(m.state(), JobState::Failed);
        assert_eq!(
            m.job().error_message.as_deref(),
            Some("Invalid response from server")
        );
        assert!(step.effects.is_empty());
    }

    #[test]
    fn unexpected_submission_shape_sets_status_text() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        m.apply_submission(ticket, Ok(json!({"hello": "world"})));
        let snap = m.snapshot();
        assert_eq!(snap.job.state, JobState::Failed);
        assert_eq!(
            snap.status_text.as_deref(),
            Some("Received unexpected response from server")
        );
    }

    #[test]
    fn upload_transport_failure() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        let err = TransportError::Http {
            status: 413,
            status_text: "Payload Too Large".into(),
            detail: None,
        };
        let step = m.apply_submission(ticket, Err(err));
        let snap = m.snapshot();
        assert_eq!(snap.job.state, JobState::Failed);
        assert_eq!(
            snap.job.error_message.as_deref(),
            Some("Server returned 413: Payload Too Large")
        );
        assert_eq!(snap.status_text.as_deref(), Some("Error uploading file"));
        assert!(step.effects.is_empty());
    }

    #[test]
    fn in_flight_schedules_exactly_one_timer() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        let step = m.apply_poll(ticket, Ok(json!({"status": "processing"})));
        assert_eq!(m.state(), JobState::Processing);
        assert_eq!(
            step.effects,
            vec![Effect::Poll {
                ticket,
                job_id: "job-1".into(),
                delay: Some(Duration::from_secs(2))
            }]
        );
        assert_eq!(m.snapshot().poll_timers, 1);
    }

    #[test]
    fn two_in_flight_then_done_counts_two_timers() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        m.apply_poll(ticket, Ok(json!({"status": "processing"})));
        m.apply_poll(ticket, Ok(json!({"status": "processing"})));
        let step = m.apply_poll(
            ticket,
            Ok(json!({"status": "completed", "summary": summary_json()})),
        );
        assert!(matches!(step.event, Some(JobEvent::Completed { .. })));
        let snap = m.snapshot();
        assert_eq!(snap.job.state, JobState::Completed);
        assert_eq!(snap.job.summary.as_ref().map(|s| s.title.as_str()), Some("Graphs"));
        assert_eq!(snap.poll_timers, 2);
    }

    #[test]
    fn completed_without_summary_is_incomplete() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        m.apply_poll(ticket, Ok(json!({"status": "completed"})));
        assert_eq!(m.state(), JobState::Failed);
        assert_eq!(
            m.job().error_message.as_deref(),
            Some("No summary data in completed job")
        );
        assert_eq!(m.job().failure, Some(JobFailure::IncompleteResult));
    }

    #[test]
    fn backend_error_fails_and_schedules_clear() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        let step = m.apply_poll(ticket, Ok(json!({"status": "error: disk full"})));
        assert_eq!(m.job().error_message.as_deref(), Some("disk full"));
        assert_eq!(
            step.effects,
            vec![Effect::ClearError {
                ticket,
                delay: Duration::from_secs(5)
            }]
        );

        let cleared = m.clear_error(ticket);
        assert_eq!(cleared.event, Some(JobEvent::ErrorCleared));
        assert_eq!(m.state(), JobState::Failed);
        assert_eq!(m.job().error_message, None);
        assert!(m.job().is_consistent());
    }

    #[test]
    fn unknown_status_message() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        let step = m.apply_poll(ticket, Ok(json!({"status": "queued"})));
        assert_eq!(
            m.job().error_message.as_deref(),
            Some("Unexpected status: queued")
        );
        assert!(step.effects.is_empty());
    }

    #[test]
    fn null_status_response_message() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        m.apply_poll(ticket, Ok(Value::Null));
        assert_eq!(
            m.job().error_message.as_deref(),
            Some("Invalid status response from server")
        );
    }

    #[test]
    fn poll_transport_failure_auto_clears() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        let step = m.apply_poll(
            ticket,
            Err(TransportError::Client("connection reset".into())),
        );
        assert_eq!(
            m.job().error_message.as_deref(),
            Some("Client error: connection reset")
        );
        assert!(matches!(step.effects[..], [Effect::ClearError { .. }]));
    }

    #[test]
    fn stale_poll_is_ignored() {
        let mut m = JobMachine::default();
        let old = processing(&mut m);
        let fresh = m.begin_upload();

        let step = m.apply_poll(
            old,
            Ok(json!({"status": "completed", "summary": summary_json()})),
        );
        assert_eq!(step, Step::default());
        assert_eq!(m.state(), JobState::Uploading);
        assert!(m.job().summary.is_none());
        assert_ne!(old, fresh);
    }

    #[test]
    fn stale_submission_is_ignored() {
        let mut m = JobMachine::default();
        let old = m.begin_upload();
        let fresh = m.begin_upload();
        assert!(!m.apply_submission(old, Ok(json!({"job_id": "old"}))).applied);
        assert!(m.apply_submission(fresh, Ok(json!({"job_id": "new"}))).applied);
        assert_eq!(m.job().id.as_deref(), Some("new"));
    }

    #[test]
    fn stale_error_clear_is_noop() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        m.apply_poll(ticket, Ok(json!({"status": "error: boom"})));
        let fresh = m.begin_upload();
        assert!(!m.clear_error(ticket).applied);
        assert_eq!(m.snapshot().generation, fresh.generation());
        assert_eq!(m.state(), JobState::Uploading);
    }

    #[test]
    fn poll_in_wrong_state_is_ignored() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        assert!(!m.apply_poll(ticket, Ok(json!({"status": "processing"}))).applied);
        assert_eq!(m.state(), JobState::Uploading);
    }

    #[test]
    fn note_poll_issued_counts_only_current() {
        let mut m = JobMachine::default();
        let ticket = processing(&mut m);
        assert_eq!(m.note_poll_issued(ticket), Some(1));
        assert_eq!(m.note_poll_issued(ticket), Some(2));
        m.begin_upload();
        assert_eq!(m.note_poll_issued(ticket), None);
    }

    #[test]
    fn resume_starts_processing() {
        let mut m = JobMachine::default();
        let (ticket, step) = m.resume("existing");
        assert_eq!(m.state(), JobState::Processing);
        assert_eq!(
            step.event,
            Some(JobEvent::Accepted {
                job_id: "existing".into()
            })
        );
        assert_eq!(
            step.effects,
            vec![Effect::Poll {
                ticket,
                job_id: "existing".into(),
                delay: None
            }]
        );
    }

    #[test]
    fn new_upload_replaces_completed_job() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        m.apply_submission(
            ticket,
            Ok(json!({"status": "completed", "summary": summary_json()})),
        );
        m.begin_upload();
        let snap = m.snapshot();
        assert_eq!(snap.job.state, JobState::Uploading);
        assert!(snap.job.summary.is_none());
        assert!(snap.job.id.is_none());
        assert_eq!(snap.polls_issued, 0);
    }

    #[test]
    fn toggle_flashcard_flips_only_target() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        m.apply_submission(
            ticket,
            Ok(json!({"status": "completed", "summary": summary_json()})),
        );
        assert_eq!(m.toggle_flashcard(1), Some(true));
        assert_eq!(m.toggle_flashcard(7), None);
        let cards = &m.job().summary.as_ref().unwrap().flashcards;
        assert!(!cards[0].flipped);
        assert!(cards[1].flipped);
        assert_eq!(
            cards[1],
            Flashcard {
                flipped: true,
                ..Flashcard::new("BFS uses?", "A queue")
            }
        );
    }

    #[test]
    fn toggle_without_summary_is_none() {
        let mut m = JobMachine::default();
        assert_eq!(m.toggle_flashcard(0), None);
    }

    #[test]
    fn revealable_only_for_current_completed_job() {
        let mut m = JobMachine::default();
        let ticket = m.begin_upload();
        assert!(m.revealable(ticket).is_none());
        m.apply_submission(
            ticket,
            Ok(json!({"status": "completed", "summary": summary_json()})),
        );
        assert!(m.revealable(ticket).is_some());
        m.begin_upload();
        assert!(m.revealable(ticket).is_none());
    }
}
