//! Workflow task model.

use serde::Serialize;
use sqlx::FromRow;
use subhub_core::tasks::{TaskApproval, TaskFacts, TaskType};
use subhub_core::types::{DbId, Timestamp, VideoId};

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub team_id: DbId,
    pub team_video_id: DbId,
    pub video_id: VideoId,
    pub task_type: i16,
    pub language_code: String,
    pub assignee_id: Option<DbId>,
    pub subtitle_version_id: Option<DbId>,
    pub approved: Option<String>,
    pub priority: i32,
    pub body: String,
    pub completed_at: Option<Timestamp>,
    pub expiration_date: Option<Timestamp>,
    pub deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// Rows are constrained to known codes; anything else reads as Subtitle.
    pub fn task_type(&self) -> TaskType {
        TaskType::from_code(self.task_type).unwrap_or(TaskType::Subtitle)
    }

    pub fn approval(&self) -> Option<TaskApproval> {
        self.approved.as_deref().and_then(|a| a.parse().ok())
    }

    pub fn is_open(&self) -> bool {
        !self.deleted && self.completed_at.is_none()
    }

    pub fn facts(&self) -> TaskFacts<'_> {
        TaskFacts {
            task_type: self.task_type(),
            language_code: &self.language_code,
            video_id: &self.video_id,
            assignee_id: self.assignee_id,
            subtitle_version_id: self.subtitle_version_id,
            approved: self.approval(),
            priority: self.priority,
            completed_at: self.completed_at,
            deleted: self.deleted,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub team_id: DbId,
    pub team_video_id: DbId,
    pub video_id: VideoId,
    pub task_type: TaskType,
    pub language_code: String,
    pub assignee_id: Option<DbId>,
    pub subtitle_version_id: Option<DbId>,
    pub priority: i32,
    pub expiration_date: Option<Timestamp>,
}
