//! Postgres repositories, one zero-sized struct per table family.
//!
//! Every method takes `&mut PgConnection` so callers decide whether it runs
//! on a pooled connection or inside a transaction.

pub mod application_repo;
pub mod collaborator_repo;
pub mod language_preference_repo;
pub mod language_repo;
pub mod member_repo;
pub mod note_repo;
pub mod task_repo;
pub mod team_repo;
pub mod user_repo;
pub mod version_repo;
pub mod video_repo;
pub mod workflow_repo;

pub use application_repo::{ApplicationRepo, InvitationRepo};
pub use collaborator_repo::CollaboratorRepo;
pub use language_preference_repo::LanguagePreferenceRepo;
pub use language_repo::SubtitleLanguageRepo;
pub use member_repo::{NarrowingRepo, TeamMemberRepo};
pub use note_repo::NoteRepo;
pub use task_repo::TaskRepo;
pub use team_repo::{ProjectRepo, TeamRepo, TeamVideoRepo};
pub use user_repo::UserRepo;
pub use version_repo::SubtitleVersionRepo;
pub use video_repo::{VideoRepo, VideoUrlRepo};
pub use workflow_repo::WorkflowRepo;
