//! Data model: the structured summary and the single tracked job.
//!
//! The backend produces summaries with a language model, so the wire shape is
//! only loosely guaranteed. Every [`Summary`] field therefore decodes leniently:
//! a missing key or an explicit `null` yields the empty value instead of a
//! decode error. The renderers in [`crate::export`] rely on this to stay total.

use crate::error::JobFailure;
use serde::{Deserialize, Deserializer, Serialize};

/// Title used when a summary has none.
pub const DEFAULT_TITLE: &str = "Lecture Summary";

/// Structured lecture summary returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Main summary paragraph.
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub key_takeaways: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub bulleted_notes: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub flashcards: Vec<Flashcard>,
}

impl Summary {
    /// The title, or `None` when the backend sent an empty or blank one.
    pub fn title(&self) -> Option<&str> {
        let t = self.title.trim();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    }

    /// The title for display, falling back to [`DEFAULT_TITLE`].
    pub fn display_title(&self) -> &str {
        self.title().unwrap_or(DEFAULT_TITLE)
    }
}

/// A question/answer study card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,

    /// Display-only: whether the answer side is showing. Never sent to or
    /// read from the backend and never part of an export.
    #[serde(skip)]
    pub flipped: bool,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            flipped: false,
        }
    }

    /// Flip the card and return the new side (`true` = answer showing).
    pub fn toggle(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }
}

/// Lifecycle state of the tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// Upload or URL submission in flight.
    Uploading,
    /// Backend accepted the job; status is being polled.
    Processing,
    Completed,
    Failed,
}

impl JobState {
    /// `Completed` or `Failed`: no further polling happens.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// `Uploading` or `Processing`.
    pub fn is_busy(self) -> bool {
        matches!(self, JobState::Uploading | JobState::Processing)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::Uploading => "uploading",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The one job tracked at a time.
///
/// Only the state machine in [`crate::lifecycle`] mutates a `Job`; starting a
/// new upload replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Backend job id; `None` until the submission response assigns one
    /// (and forever for results returned inline).
    pub id: Option<String>,
    pub state: JobState,
    pub summary: Option<Summary>,
    /// User-facing error text. Cleared by the error-clear timer while the
    /// state stays `Failed`.
    pub error_message: Option<String>,
    /// Typed cause of the failure; survives the error-clear timer.
    pub failure: Option<JobFailure>,
}

impl Job {
    /// A fresh job in the `Uploading` state.
    pub(crate) fn uploading() -> Self {
        Self {
            state: JobState::Uploading,
            ..Self::default()
        }
    }

    /// A job already known to the backend, in the `Processing` state.
    pub(crate) fn processing(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            state: JobState::Processing,
            ..Self::default()
        }
    }

    /// Check the state/payload invariants.
    ///
    /// `Completed` carries a summary, busy states carry neither summary nor
    /// error, and `Failed` always carries a typed failure (its message may
    /// already have been cleared for display).
    pub fn is_consistent(&self) -> bool {
        match self.state {
            JobState::Idle => self.summary.is_none() && self.failure.is_none(),
            JobState::Uploading | JobState::Processing => {
                self.summary.is_none() && self.error_message.is_none() && self.failure.is_none()
            }
            JobState::Completed => self.summary.is_some() && self.error_message.is_none(),
            JobState::Failed => self.summary.is_none() && self.failure.is_some(),
        }
    }
}

/// Treat an explicit JSON `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
