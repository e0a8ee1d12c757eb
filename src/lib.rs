//! # lecture2notes
//!
//! Client for a lecture-summarization backend: upload a recording (or hand
//! over a URL), follow the asynchronous job until it finishes, and export the
//! structured summary as text, printable HTML or JSON.
//!
//! ## Job Lifecycle
//!
//! ```text
//! media file / URL
//!  │
//!  ├─ 1. Source     resolve local file or pass the URL through
//!  ├─ 2. Submit     POST /upload (multipart) or POST /transcribe
//!  ├─ 3. Normalize  classify the response: job id, inline result, malformed
//!  ├─ 4. Poll       GET /status/{id} every 2 s until completed or error
//!  └─ 5. Export     plain text / printable HTML / JSON
//! ```
//!
//! Only one job is tracked at a time. Submitting again discards the previous
//! job; late responses for it are ignored.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lecture2notes::{summarize, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://127.0.0.1:8000")
//!         .build()?;
//!     let output = summarize("lecture.mp4", &config).await?;
//!     println!("{}", lecture2notes::render_plain_text(&output.summary));
//!     eprintln!("{} status requests", output.stats.polls_issued);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lecture2notes` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! lecture2notes = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod model;
pub mod normalize;
pub mod observer;
pub mod output;
pub mod source;
pub mod stream;
pub mod summarize;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, JobFailure, TransportError};
pub use export::{
    export_filename, export_path, render, render_plain_text, render_printable, write_export,
    ExportFormat,
};
pub use lifecycle::{JobController, JobSnapshot};
pub use model::{Flashcard, Job, JobState, Summary};
pub use normalize::{normalize, NormalizedResult, Origin};
pub use observer::{JobObserver, NoopObserver};
pub use output::{JobStats, SummaryOutput};
pub use source::{resolve_source, Source};
pub use stream::{job_updates, summarize_stream, JobStream};
pub use summarize::{
    summarize, summarize_from_bytes, summarize_sync, summarize_to_file, summarize_with, track,
    track_with,
};
pub use transport::{HttpTransport, Transport};
