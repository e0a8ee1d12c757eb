//! Job lifecycle: the state machine and its async driver.
//!
//! ```text
//!   Idle ──submit──▶ Uploading ──job_id──▶ Processing ◀──┐
//!                       │                   │   │        │ "processing"
//!                       │ inline result     │   └─ 2 s ──┘
//!                       ▼                   │ "completed"
//!                   Completed ◀─────────────┘
//!
//!   Uploading | Processing ── malformed / "error: …" / transport ──▶ Failed
//!   any state ── submit ──▶ Uploading   (previous job discarded)
//! ```
//!
//! [`machine`] holds the pure transition logic; [`controller`] runs it on
//! tokio; [`scheduler`] wraps the cancellable timers.

pub mod controller;
pub mod machine;
pub mod scheduler;

pub use controller::JobController;
pub use machine::{Effect, JobEvent, JobMachine, JobSnapshot, Step, Ticket, Timing};
pub use scheduler::ScheduledTask;
