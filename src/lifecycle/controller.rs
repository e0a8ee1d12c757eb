//! Async driver for [`JobMachine`].
//!
//! [`JobController`] is the single writer of job state. It turns machine
//! [`Effect`]s into tokio tasks, feeds transport results back in, tells the
//! [`JobObserver`] what happened and publishes every new [`JobSnapshot`] on a
//! `watch` channel.
//!
//! The machine sits behind a `std::sync::Mutex` that is never held across an
//! `.await`. Staleness is decided by the machine's generation check; the
//! cancel handles on the poll and upload tasks only save work.

use super::machine::{Effect, JobEvent, JobMachine, JobSnapshot, Step, Ticket};
use super::scheduler::ScheduledTask;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::observer::{NoopObserver, SharedObserver};
use crate::source::Source;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Drives one tracked job at a time against a [`Transport`].
///
/// Cheap to clone; clones share the same job.
#[derive(Clone)]
pub struct JobController {
    shared: Arc<Shared>,
}

struct Shared {
    machine: Mutex<JobMachine>,
    transport: Arc<dyn Transport>,
    observer: SharedObserver,
    updates: watch::Sender<JobSnapshot>,
    poll_task: Mutex<Option<ScheduledTask>>,
    upload_task: Mutex<Option<ScheduledTask>>,
}

impl JobController {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        let machine = JobMachine::new(config.timing());
        let (updates, _) = watch::channel(machine.snapshot());
        let observer = config
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(NoopObserver) as SharedObserver);
        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(machine),
                transport,
                observer,
                updates,
                poll_task: Mutex::new(None),
                upload_task: Mutex::new(None),
            }),
        }
    }

    /// Start a new job for `source`, discarding any current one.
    ///
    /// Returns immediately; the upload and all polling run as background
    /// tasks. Must be called from within a tokio runtime.
    pub fn submit(&self, source: Source) -> Ticket {
        let shared = &self.shared;
        let ticket = {
            let mut machine = lock(&shared.machine);
            let ticket = machine.begin_upload();
            shared.publish(&machine);
            ticket
        };
        shared.cancel_outstanding();

        let label = source.to_string();
        info!("Submitting {}", label);
        shared.observer.on_upload_start(&label);

        let task_shared = Arc::clone(shared);
        let mut slot = lock(&shared.upload_task);
        *slot = Some(ScheduledTask::spawn(None, async move {
            task_shared.run_upload(ticket, source).await;
        }));
        ticket
    }

    /// Start tracking an existing backend job, discarding any current one.
    pub fn resume(&self, job_id: impl Into<String>) -> Ticket {
        let shared = &self.shared;
        let (ticket, step) = {
            let mut machine = lock(&shared.machine);
            let (ticket, step) = machine.resume(job_id);
            shared.publish(&machine);
            (ticket, step)
        };
        shared.cancel_outstanding();
        shared.dispatch(step);
        ticket
    }

    /// Current state of the tracked job.
    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.updates.borrow().clone()
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until the job is no longer uploading or processing.
    ///
    /// Returns at once when nothing is in flight (including `Idle`).
    pub async fn settled(&self) -> Result<JobSnapshot, ClientError> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| !s.job.state.is_busy())
            .await
            .map_err(|e| ClientError::Internal(format!("job updates closed: {e}")))?
            .clone();
        Ok(snapshot)
    }

    /// Flip one flashcard of the completed summary.
    ///
    /// Returns the card's new `flipped` value, or `None` when there is no
    /// completed summary or no card at `index`.
    pub fn toggle_flashcard(&self, index: usize) -> Option<bool> {
        let mut machine = lock(&self.shared.machine);
        let flipped = machine.toggle_flashcard(index);
        if flipped.is_some() {
            self.shared.publish(&machine);
        }
        flipped
    }
}

impl Shared {
    async fn run_upload(self: Arc<Self>, ticket: Ticket, source: Source) {
        let outcome = match &source {
            Source::File(path) => self.transport.submit_file(path).await,
            Source::Url(url) => self.transport.submit_url(url).await,
        };
        let step = {
            let mut machine = lock(&self.machine);
            let step = machine.apply_submission(ticket, outcome);
            if step.applied {
                self.publish(&machine);
            }
            step
        };
        self.dispatch(step);
    }

    async fn run_poll(self: Arc<Self>, ticket: Ticket, job_id: String) {
        let attempt = {
            let mut machine = lock(&self.machine);
            let attempt = machine.note_poll_issued(ticket);
            if attempt.is_some() {
                self.publish(&machine);
            }
            attempt
        };
        let Some(attempt) = attempt else {
            debug!("Skipping poll for superseded job {}", job_id);
            return;
        };
        self.observer.on_poll(&job_id, attempt);

        let outcome = self.transport.fetch_status(&job_id).await;
        let step = {
            let mut machine = lock(&self.machine);
            let step = machine.apply_poll(ticket, outcome);
            if step.applied {
                self.publish(&machine);
            }
            step
        };
        self.dispatch(step);
    }

    /// Notify the observer and schedule the step's effects.
    fn dispatch(self: &Arc<Self>, step: Step) {
        if !step.applied {
            return;
        }
        if let Some(event) = step.event {
            self.notify(event);
        }
        for effect in step.effects {
            match effect {
                Effect::Poll {
                    ticket,
                    job_id,
                    delay,
                } => self.schedule_poll(ticket, job_id, delay),
                Effect::ClearError { ticket, delay } => self.schedule_clear(ticket, delay),
                Effect::RevealResults { ticket, delay } => self.schedule_reveal(ticket, delay),
            }
        }
    }

    fn notify(&self, event: JobEvent) {
        match event {
            JobEvent::Accepted { job_id } => self.observer.on_job_accepted(&job_id),
            JobEvent::StillProcessing => {}
            JobEvent::Completed { summary } => self.observer.on_completed(&summary),
            JobEvent::Failed { message } => self.observer.on_failed(&message),
            JobEvent::ErrorCleared => self.observer.on_error_cleared(),
        }
    }

    /// Replace the poll slot with a new poll task.
    ///
    /// The slot lock is held while spawning so a poll that runs immediately
    /// cannot store its successor before its own handle is stored. The
    /// generation is checked under the same lock; `submit` and `resume` bump
    /// it before cancelling.
    fn schedule_poll(self: &Arc<Self>, ticket: Ticket, job_id: String, delay: Option<Duration>) {
        let shared = Arc::clone(self);
        let mut slot = lock(&self.poll_task);
        if !lock(&self.machine).is_current(ticket) {
            debug!("Dropping poll for superseded job {}", job_id);
            return;
        }
        *slot = Some(ScheduledTask::spawn(delay, async move {
            shared.run_poll(ticket, job_id).await;
        }));
    }

    /// Fire-and-forget; a stale ticket makes it a no-op.
    fn schedule_clear(self: &Arc<Self>, ticket: Ticket, delay: Duration) {
        let shared = Arc::clone(self);
        ScheduledTask::spawn(Some(delay), async move {
            let step = {
                let mut machine = lock(&shared.machine);
                let step = machine.clear_error(ticket);
                if step.applied {
                    shared.publish(&machine);
                }
                step
            };
            shared.dispatch(step);
        });
    }

    fn schedule_reveal(self: &Arc<Self>, ticket: Ticket, delay: Duration) {
        let shared = Arc::clone(self);
        ScheduledTask::spawn(Some(delay), async move {
            let summary = lock(&shared.machine).revealable(ticket).cloned();
            if let Some(summary) = summary {
                shared.observer.on_results_ready(&summary);
            }
        });
    }

    /// Cancel the upload and poll tasks of a superseded job.
    fn cancel_outstanding(&self) {
        for slot in [&self.poll_task, &self.upload_task] {
            if let Some(task) = lock(slot).take() {
                if !task.is_finished() {
                    debug!("Cancelling task of superseded job");
                }
                task.cancel();
            }
        }
    }

    fn publish(&self, machine: &JobMachine) {
        self.updates.send_replace(machine.snapshot());
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::path::Path;

    struct AlwaysProcessing;

    #[async_trait]
    impl Transport for AlwaysProcessing {
        async fn submit_file(&self, _path: &Path) -> Result<Value, TransportError> {
            Ok(json!({ "job_id": "upload" }))
        }

        async fn submit_url(&self, _url: &str) -> Result<Value, TransportError> {
            Ok(json!({ "job_id": "url" }))
        }

        async fn fetch_status(&self, job_id: &str) -> Result<Value, TransportError> {
            Ok(json!({ "job_id": job_id, "status": "processing" }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_poll_does_not_store_successor() {
        let controller = JobController::new(Arc::new(AlwaysProcessing), &ClientConfig::default());
        let shared = &controller.shared;
        let old = controller.resume("a");
        let current = controller.resume("b");
        if let Some(task) = lock(&shared.poll_task).take() {
            task.cancel();
        }

        // An old poll task that applied its result just before the supersede.
        shared.schedule_poll(old, "a".into(), Some(Duration::from_secs(2)));
        assert!(lock(&shared.poll_task).is_none());

        shared.schedule_poll(current, "b".into(), Some(Duration::from_secs(2)));
        assert!(lock(&shared.poll_task).is_some());
    }
}
