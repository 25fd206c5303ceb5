//! Mutating services over the storage seam.
//!
//! Every write runs inside one [`subhub_db::StoreTx`]; side effects are
//! collected in an [`subhub_events::Outbox`] and released only after the
//! transaction commits. [`Services`] wires the individual services together
//! around one shared [`ServiceContext`].

pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod external_sync;
pub mod language_prefs;
pub mod metadata;
pub mod permissions;
pub mod pipeline;
pub mod services;
pub mod tasks;
pub mod teams;
pub mod videos;
pub mod workflow;
pub mod writelock;

pub use config::PipelineConfig;
pub use context::ServiceContext;
pub use error::{PipelineError, PipelineResult};
pub use services::Services;
