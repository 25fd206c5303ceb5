//! Shared query parameter types for API handlers.

use chrono::DateTime;
use serde::Deserialize;
use subhub_core::error::CoreError;
use subhub_core::tasks::{TaskFilter, TaskOrder, TaskType};
use subhub_core::types::{DbId, Timestamp};

use crate::error::AppResult;

/// Query parameters for `GET /teams/{slug}/tasks`.
///
/// `completed-before` and `completed-after` are Unix seconds. `assignee` is
/// a username; the handler resolves it before building the filter.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub assignee: Option<String>,
    pub priority: Option<i32>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub language: Option<String>,
    pub video_id: Option<String>,
    pub completed: Option<bool>,
    #[serde(rename = "completed-before")]
    pub completed_before: Option<i64>,
    #[serde(rename = "completed-after")]
    pub completed_after: Option<i64>,
    pub open: Option<bool>,
    pub order_by: Option<String>,
}

impl TaskQuery {
    pub fn into_filter(self, assignee_id: Option<DbId>) -> AppResult<TaskFilter> {
        Ok(TaskFilter {
            assignee_id,
            priority: self.priority,
            task_type: self
                .task_type
                .as_deref()
                .map(str::parse::<TaskType>)
                .transpose()?,
            language_code: self.language,
            video_id: self.video_id,
            completed: self.completed,
            completed_before: self.completed_before.map(unix_seconds).transpose()?,
            completed_after: self.completed_after.map(unix_seconds).transpose()?,
            open: self.open,
            order_by: self
                .order_by
                .as_deref()
                .map(str::parse::<TaskOrder>)
                .transpose()?,
        })
    }
}

fn unix_seconds(secs: i64) -> Result<Timestamp, CoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| CoreError::Validation(format!("Invalid timestamp: {secs}")))
}

/// `?version=` on subtitle reads.
#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    pub version: Option<i32>,
    /// Output format; defaults to the native JSON items.
    pub sub_format: Option<String>,
}

/// `?from=&to=` on the diff endpoint.
#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub from: i32,
    pub to: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_bounds_are_unix_seconds() {
        let query = TaskQuery {
            completed_after: Some(1_700_000_000),
            order_by: Some("-priority".into()),
            task_type: Some("translate".into()),
            ..TaskQuery::default()
        };
        let filter = query.into_filter(Some(7)).unwrap();
        assert_eq!(filter.completed_after.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(filter.task_type, Some(TaskType::Translate));
        assert_eq!(filter.assignee_id, Some(7));
        assert!(filter.order_by.is_some());
    }

    #[test]
    fn unknown_order_is_rejected() {
        let query = TaskQuery {
            order_by: Some("assignee".into()),
            ..TaskQuery::default()
        };
        assert!(query.into_filter(None).is_err());
    }
}
