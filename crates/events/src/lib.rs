//! SubHub event bus, background jobs and the post-commit outbox.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the event envelope the pipeline and workflow engine
//!   emit once their transaction commits.
//! - [`JobQueue`] / [`JobRunner`]: named background jobs (notification
//!   fan-out, external pushes) dispatched to handlers registered by name.
//! - [`Outbox`]: buffers events and jobs produced inside a transaction so
//!   they are released only after commit.

pub mod bus;
pub mod jobs;
pub mod outbox;

pub use bus::{DomainEvent, EventBus};
pub use jobs::{Job, JobError, JobHandler, JobQueue, JobRunner};
pub use outbox::Outbox;
