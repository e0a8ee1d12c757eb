//! Shared fixtures: a scripted in-memory transport and a recording observer.

#![allow(dead_code)]

use async_trait::async_trait;
use lecture2notes::{ClientConfig, JobObserver, Summary, Transport, TransportError};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Scripted {
    delay: Duration,
    outcome: Result<Value, TransportError>,
}

/// Transport that replays canned responses.
///
/// Submissions are answered in order; an empty submission queue is a client
/// error. Status requests are answered per job id; an empty queue answers
/// `processing`.
#[derive(Default)]
pub struct ScriptedTransport {
    submissions: Mutex<VecDeque<Scripted>>,
    statuses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    submit_log: Mutex<Vec<String>>,
    status_log: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, outcome: Result<Value, TransportError>) -> Self {
        self.on_submit_after(Duration::ZERO, outcome)
    }

    pub fn on_submit_after(self, delay: Duration, outcome: Result<Value, TransportError>) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back(Scripted { delay, outcome });
        self
    }

    pub fn on_status(self, job_id: &str, outcome: Result<Value, TransportError>) -> Self {
        self.on_status_after(job_id, Duration::ZERO, outcome)
    }

    pub fn on_status_after(
        self,
        job_id: &str,
        delay: Duration,
        outcome: Result<Value, TransportError>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(Scripted { delay, outcome });
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Job ids of every status request, in order.
    pub fn status_requests(&self) -> Vec<String> {
        self.status_log.lock().unwrap().clone()
    }

    /// Display form of every submission, in order.
    pub fn submissions(&self) -> Vec<String> {
        self.submit_log.lock().unwrap().clone()
    }

    async fn next_submission(&self, label: String) -> Result<Value, TransportError> {
        self.submit_log.lock().unwrap().push(label);
        let next = { self.submissions.lock().unwrap().pop_front() };
        match next {
            Some(s) => {
                if !s.delay.is_zero() {
                    tokio::time::sleep(s.delay).await;
                }
                s.outcome
            }
            None => Err(TransportError::Client("no scripted submission".into())),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn submit_file(&self, path: &Path) -> Result<Value, TransportError> {
        self.next_submission(path.display().to_string()).await
    }

    async fn submit_url(&self, url: &str) -> Result<Value, TransportError> {
        self.next_submission(url.to_string()).await
    }

    async fn fetch_status(&self, job_id: &str) -> Result<Value, TransportError> {
        self.status_log.lock().unwrap().push(job_id.to_string());
        let next = {
            self.statuses
                .lock()
                .unwrap()
                .get_mut(job_id)
                .and_then(|q| q.pop_front())
        };
        match next {
            Some(s) => {
                if !s.delay.is_zero() {
                    tokio::time::sleep(s.delay).await;
                }
                s.outcome
            }
            None => Ok(processing(job_id)),
        }
    }
}

/// Observer that records every event as a short string.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn saw(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl JobObserver for RecordingObserver {
    fn on_upload_start(&self, source: &str) {
        self.push(format!("upload {source}"));
    }

    fn on_job_accepted(&self, job_id: &str) {
        self.push(format!("accepted {job_id}"));
    }

    fn on_poll(&self, job_id: &str, attempt: u32) {
        self.push(format!("poll {job_id} #{attempt}"));
    }

    fn on_completed(&self, summary: &Summary) {
        self.push(format!("completed {}", summary.display_title()));
    }

    fn on_failed(&self, message: &str) {
        self.push(format!("failed {message}"));
    }

    fn on_error_cleared(&self) {
        self.push("cleared".into());
    }

    fn on_results_ready(&self, summary: &Summary) {
        self.push(format!("ready {}", summary.display_title()));
    }
}

pub fn config_with(observer: Arc<RecordingObserver>) -> ClientConfig {
    ClientConfig::builder()
        .observer(observer)
        .build()
        .unwrap()
}

pub fn summary_json() -> Value {
    json!({
        "title": "Cell Biology",
        "summary": "Cells are the basic unit of life.",
        "key_takeaways": ["Membranes separate inside from outside", "Organelles divide labour"],
        "bulleted_notes": ["Mitochondria produce ATP", "Ribosomes build proteins"],
        "flashcards": [
            {"question": "What produces ATP?", "answer": "Mitochondria"},
            {"question": "What builds proteins?", "answer": "Ribosomes"}
        ]
    })
}

pub fn summary() -> Summary {
    serde_json::from_value(summary_json()).unwrap()
}

pub fn accepted(job_id: &str) -> Value {
    json!({ "job_id": job_id, "status": "processing" })
}

pub fn processing(job_id: &str) -> Value {
    json!({ "job_id": job_id, "status": "processing" })
}

pub fn completed(job_id: &str, summary: Value) -> Value {
    json!({ "job_id": job_id, "status": "completed", "summary": summary })
}
