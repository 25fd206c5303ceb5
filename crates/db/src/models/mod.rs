//! Row models and insert DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity matching the
//! table row and, where rows are created from outside, a `New*` struct the
//! store inserts.

pub mod collaborator;
pub mod language;
pub mod note;
pub mod task;
pub mod team;
pub mod user;
pub mod version;
pub mod video;
