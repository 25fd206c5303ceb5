//! Task types, the completion dispatch table, assignment rules and queries.
//!
//! Completing, approving or rejecting a task is looked up in [`TRANSITIONS`],
//! an explicit `(task type, event) -> handler` table. Handlers are pure: they
//! return the [`TaskEffect`]s the engine must apply inside its transaction.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};
use crate::workflow::WorkflowSettings;

// ---------------------------------------------------------------------------
// Task type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Subtitle,
    Translate,
    Review,
    Approve,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::Subtitle,
        TaskType::Translate,
        TaskType::Review,
        TaskType::Approve,
    ];

    /// Stored numeric code. Ordering by type orders by this value.
    pub fn code(self) -> i16 {
        match self {
            TaskType::Subtitle => 10,
            TaskType::Translate => 20,
            TaskType::Review => 30,
            TaskType::Approve => 40,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, CoreError> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| CoreError::Internal(format!("Unknown task type code {code}")))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Subtitle => "Subtitle",
            TaskType::Translate => "Translate",
            TaskType::Review => "Review",
            TaskType::Approve => "Approve",
        }
    }

    /// Subtitle and Translate tasks produce versions; the others judge them.
    pub fn is_authoring(self) -> bool {
        matches!(self, TaskType::Subtitle | TaskType::Translate)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid task type '{s}'. Must be one of: Subtitle, Translate, Review, Approve"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Approval state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskApproval {
    InProgress,
    Approved,
    Rejected,
}

impl TaskApproval {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskApproval::InProgress => "in-progress",
            TaskApproval::Approved => "approved",
            TaskApproval::Rejected => "rejected",
        }
    }
}

impl FromStr for TaskApproval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-progress" | "InProgress" => Ok(TaskApproval::InProgress),
            "approved" | "Approved" => Ok(TaskApproval::Approved),
            "rejected" | "Rejected" => Ok(TaskApproval::Rejected),
            other => Err(CoreError::Validation(format!(
                "Invalid approval '{other}'. Must be one of: in-progress, approved, rejected"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Events and effects
// ---------------------------------------------------------------------------

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskEvent {
    /// Author finished a Subtitle/Translate task.
    Completed,
    /// Reviewer/approver accepted the work.
    Approved,
    /// Reviewer/approver sent the work back.
    Rejected,
}

impl TaskEvent {
    /// The approval value recorded on the task that saw this event.
    pub fn approval(self) -> Option<TaskApproval> {
        match self {
            TaskEvent::Completed => None,
            TaskEvent::Approved => Some(TaskApproval::Approved),
            TaskEvent::Rejected => Some(TaskApproval::Rejected),
        }
    }
}

/// Notifications the engine hands to the outbound sinks after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    ReviewRequested { language_code: String },
    ApprovalRequested { language_code: String },
    SentBack { language_code: String, recipient: Option<DbId> },
    Published { language_code: String },
}

/// A state change the engine applies after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEffect {
    OpenTask {
        task_type: TaskType,
        language_code: String,
        assignee: Option<DbId>,
        version_id: Option<DbId>,
    },
    /// Make the version public and clear its override.
    Publish { version_id: DbId },
    /// Force the version private through its override.
    HideVersion { version_id: DbId },
    MarkLanguageComplete { language_code: String },
    AutocreateTranslations { source_language: String },
    Notify(Notification),
}

/// Inputs every transition handler sees.
#[derive(Debug, Clone)]
pub struct TransitionContext<'a> {
    pub workflow: &'a WorkflowSettings,
    /// Language of the version under work.
    pub language_code: &'a str,
    pub version_id: DbId,
    pub version_author: Option<DbId>,
    /// Which authoring task type produced this work (reopened on send-back).
    pub authoring_type: TaskType,
}

pub type TransitionHandler = fn(&TransitionContext<'_>) -> Vec<TaskEffect>;

/// `(task type, event) -> handler`.
pub const TRANSITIONS: &[(TaskType, TaskEvent, TransitionHandler)] = &[
    (TaskType::Subtitle, TaskEvent::Completed, on_authoring_completed),
    (TaskType::Translate, TaskEvent::Completed, on_authoring_completed),
    (TaskType::Review, TaskEvent::Approved, on_review_approved),
    (TaskType::Review, TaskEvent::Rejected, on_sent_back),
    (TaskType::Approve, TaskEvent::Approved, on_approved),
    (TaskType::Approve, TaskEvent::Rejected, on_sent_back),
];

/// Look up and run the handler for `(task_type, event)`.
pub fn transition(
    task_type: TaskType,
    event: TaskEvent,
    ctx: &TransitionContext<'_>,
) -> Result<Vec<TaskEffect>, CoreError> {
    let handler = TRANSITIONS
        .iter()
        .find(|(t, e, _)| *t == task_type && *e == event)
        .map(|(_, _, h)| *h)
        .ok_or_else(|| {
            CoreError::ActionError(format!("A {task_type} task cannot be {event:?}"))
        })?;
    Ok(handler(ctx))
}

fn publish_effects(ctx: &TransitionContext<'_>) -> Vec<TaskEffect> {
    let mut effects = vec![
        TaskEffect::Publish {
            version_id: ctx.version_id,
        },
        TaskEffect::MarkLanguageComplete {
            language_code: ctx.language_code.to_string(),
        },
    ];
    if ctx.workflow.autocreate_translate {
        effects.push(TaskEffect::AutocreateTranslations {
            source_language: ctx.language_code.to_string(),
        });
    }
    effects.push(TaskEffect::Notify(Notification::Published {
        language_code: ctx.language_code.to_string(),
    }));
    effects
}

fn open_approve(ctx: &TransitionContext<'_>) -> Vec<TaskEffect> {
    vec![
        TaskEffect::OpenTask {
            task_type: TaskType::Approve,
            language_code: ctx.language_code.to_string(),
            assignee: None,
            version_id: Some(ctx.version_id),
        },
        TaskEffect::Notify(Notification::ApprovalRequested {
            language_code: ctx.language_code.to_string(),
        }),
    ]
}

fn on_authoring_completed(ctx: &TransitionContext<'_>) -> Vec<TaskEffect> {
    if ctx.workflow.review_allowed.is_enabled() {
        vec![
            TaskEffect::OpenTask {
                task_type: TaskType::Review,
                language_code: ctx.language_code.to_string(),
                assignee: None,
                version_id: Some(ctx.version_id),
            },
            TaskEffect::Notify(Notification::ReviewRequested {
                language_code: ctx.language_code.to_string(),
            }),
        ]
    } else if ctx.workflow.approve_allowed.is_enabled() {
        open_approve(ctx)
    } else {
        publish_effects(ctx)
    }
}

fn on_review_approved(ctx: &TransitionContext<'_>) -> Vec<TaskEffect> {
    if ctx.workflow.approve_allowed.is_enabled() {
        open_approve(ctx)
    } else {
        publish_effects(ctx)
    }
}

fn on_approved(ctx: &TransitionContext<'_>) -> Vec<TaskEffect> {
    publish_effects(ctx)
}

fn on_sent_back(ctx: &TransitionContext<'_>) -> Vec<TaskEffect> {
    vec![
        TaskEffect::HideVersion {
            version_id: ctx.version_id,
        },
        TaskEffect::OpenTask {
            task_type: ctx.authoring_type,
            language_code: ctx.language_code.to_string(),
            assignee: ctx.version_author,
            version_id: None,
        },
        TaskEffect::Notify(Notification::SentBack {
            language_code: ctx.language_code.to_string(),
            recipient: ctx.version_author,
        }),
    ]
}

/// Tasks opened when a video joins a team.
pub fn initial_tasks(workflow: &WorkflowSettings) -> Vec<TaskEffect> {
    if workflow.autocreate_subtitle {
        vec![TaskEffect::OpenTask {
            task_type: TaskType::Subtitle,
            language_code: String::new(),
            assignee: None,
            version_id: None,
        }]
    } else {
        Vec::new()
    }
}

/// Preferred languages that still need a Translate task on a video.
///
/// Skips the source language, languages that are already complete, and
/// languages with an open Translate task, so repeated calls are idempotent.
pub fn translation_languages_to_create(
    preferred: &BTreeSet<String>,
    source_language: &str,
    complete_languages: &BTreeSet<String>,
    open_translate_languages: &BTreeSet<String>,
) -> Vec<String> {
    preferred
        .iter()
        .filter(|lc| lc.as_str() != source_language)
        .filter(|lc| !complete_languages.contains(*lc))
        .filter(|lc| !open_translate_languages.contains(*lc))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Assignment and lifecycle rules
// ---------------------------------------------------------------------------

/// Expiration stamped on assignment, when the team configures one.
pub fn assignment_expiration(now: Timestamp, task_expiration_days: Option<i32>) -> Option<Timestamp> {
    task_expiration_days
        .filter(|d| *d > 0)
        .map(|d| now + Duration::days(i64::from(d)))
}

/// Refuse an assignment that would exceed the team's per-member cap.
pub fn check_assignment_capacity(
    open_assigned: i64,
    max_tasks_per_member: Option<i32>,
) -> Result<(), CoreError> {
    match max_tasks_per_member {
        Some(max) if max > 0 && open_assigned >= i64::from(max) => Err(CoreError::Validation(
            format!("Member already has {open_assigned} open tasks (limit {max})"),
        )),
        _ => Ok(()),
    }
}

/// An expired task stays open but may be reassigned.
pub fn is_task_expired(expiration_date: Option<Timestamp>, now: Timestamp) -> bool {
    expiration_date.is_some_and(|exp| exp < now)
}

/// Completed tasks are part of the audit trail and never deleted.
pub fn ensure_cancellable(completed: bool) -> Result<(), CoreError> {
    if completed {
        return Err(CoreError::Validation(
            "Completed tasks cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// The task fields queries and derivations look at.
#[derive(Debug, Clone)]
pub struct TaskFacts<'a> {
    pub task_type: TaskType,
    pub language_code: &'a str,
    pub video_id: &'a str,
    pub assignee_id: Option<DbId>,
    pub subtitle_version_id: Option<DbId>,
    pub approved: Option<TaskApproval>,
    pub priority: i32,
    pub completed_at: Option<Timestamp>,
    pub deleted: bool,
    pub created_at: Timestamp,
}

impl TaskFacts<'_> {
    pub fn is_open(&self) -> bool {
        !self.deleted && self.completed_at.is_none()
    }
}

/// Who signed off a version: the assignee of the most recently completed
/// task of `task_type` for it that was approved.
pub fn latest_signoff<'a>(
    tasks: impl IntoIterator<Item = TaskFacts<'a>>,
    version_id: DbId,
    task_type: TaskType,
) -> Option<DbId> {
    tasks
        .into_iter()
        .filter(|t| t.task_type == task_type && t.subtitle_version_id == Some(version_id))
        .filter(|t| t.approved == Some(TaskApproval::Approved))
        .filter_map(|t| t.completed_at.map(|at| (at, t.assignee_id)))
        .max_by_key(|(at, _)| *at)
        .and_then(|(_, assignee)| assignee)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOrder {
    Created,
    CreatedDesc,
    Priority,
    PriorityDesc,
    Type,
    TypeDesc,
}

impl TaskOrder {
    /// `ORDER BY` fragment for the `tasks` table.
    pub fn sql(self) -> &'static str {
        match self {
            TaskOrder::Created => "created_at ASC, id ASC",
            TaskOrder::CreatedDesc => "created_at DESC, id DESC",
            TaskOrder::Priority => "priority ASC, id ASC",
            TaskOrder::PriorityDesc => "priority DESC, id DESC",
            TaskOrder::Type => "task_type ASC, id ASC",
            TaskOrder::TypeDesc => "task_type DESC, id DESC",
        }
    }
}

impl FromStr for TaskOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TaskOrder::Created),
            "-created" => Ok(TaskOrder::CreatedDesc),
            "priority" => Ok(TaskOrder::Priority),
            "-priority" => Ok(TaskOrder::PriorityDesc),
            "type" => Ok(TaskOrder::Type),
            "-type" => Ok(TaskOrder::TypeDesc),
            other => Err(CoreError::Validation(format!(
                "Invalid order_by '{other}'. Must be one of: created, -created, priority, \
                 -priority, type, -type"
            ))),
        }
    }
}

/// Filters accepted by the task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub assignee_id: Option<DbId>,
    pub priority: Option<i32>,
    pub task_type: Option<TaskType>,
    pub language_code: Option<String>,
    pub video_id: Option<String>,
    pub completed: Option<bool>,
    pub completed_before: Option<Timestamp>,
    pub completed_after: Option<Timestamp>,
    pub open: Option<bool>,
    pub order_by: Option<TaskOrder>,
}

impl TaskFilter {
    /// Deleted tasks never match.
    pub fn matches(&self, task: &TaskFacts<'_>) -> bool {
        if task.deleted {
            return false;
        }
        if self.assignee_id.is_some() && task.assignee_id != self.assignee_id {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.task_type.is_some_and(|t| t != task.task_type) {
            return false;
        }
        if self
            .language_code
            .as_deref()
            .is_some_and(|lc| lc != task.language_code)
        {
            return false;
        }
        if self.video_id.as_deref().is_some_and(|v| v != task.video_id) {
            return false;
        }
        if self
            .completed
            .is_some_and(|c| c != task.completed_at.is_some())
        {
            return false;
        }
        if let Some(before) = self.completed_before {
            if !task.completed_at.is_some_and(|at| at < before) {
                return false;
            }
        }
        if let Some(after) = self.completed_after {
            if !task.completed_at.is_some_and(|at| at > after) {
                return false;
            }
        }
        if self.open.is_some_and(|o| o != task.is_open()) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::workflow::{ApproveAllowed, ReviewAllowed};

    fn wf(review: ReviewAllowed, approve: ApproveAllowed, translate: bool) -> WorkflowSettings {
        WorkflowSettings {
            autocreate_subtitle: true,
            autocreate_translate: translate,
            review_allowed: review,
            approve_allowed: approve,
        }
    }

    fn ctx(workflow: &WorkflowSettings) -> TransitionContext<'_> {
        TransitionContext {
            workflow,
            language_code: "en",
            version_id: 11,
            version_author: Some(5),
            authoring_type: TaskType::Translate,
        }
    }

    #[test]
    fn completion_opens_review_when_enabled() {
        let w = wf(ReviewAllowed::Peer, ApproveAllowed::Admin, false);
        let effects = transition(TaskType::Subtitle, TaskEvent::Completed, &ctx(&w)).unwrap();
        assert_matches!(
            &effects[0],
            TaskEffect::OpenTask { task_type: TaskType::Review, version_id: Some(11), .. }
        );
    }

    #[test]
    fn completion_opens_approve_without_review() {
        let w = wf(ReviewAllowed::None, ApproveAllowed::Manager, false);
        let effects = transition(TaskType::Translate, TaskEvent::Completed, &ctx(&w)).unwrap();
        assert_matches!(
            &effects[0],
            TaskEffect::OpenTask { task_type: TaskType::Approve, .. }
        );
    }

    #[test]
    fn completion_publishes_without_moderation() {
        let w = wf(ReviewAllowed::None, ApproveAllowed::None, true);
        let effects = transition(TaskType::Subtitle, TaskEvent::Completed, &ctx(&w)).unwrap();
        assert!(effects.contains(&TaskEffect::Publish { version_id: 11 }));
        assert!(effects.contains(&TaskEffect::AutocreateTranslations {
            source_language: "en".into()
        }));
    }

    #[test]
    fn publish_skips_autocreate_when_disabled() {
        let w = wf(ReviewAllowed::None, ApproveAllowed::None, false);
        let effects = transition(TaskType::Subtitle, TaskEvent::Completed, &ctx(&w)).unwrap();
        assert!(!effects
            .iter()
            .any(|e| matches!(e, TaskEffect::AutocreateTranslations { .. })));
    }

    #[test]
    fn review_approval_chains_to_approve() {
        let w = wf(ReviewAllowed::Peer, ApproveAllowed::Admin, false);
        let effects = transition(TaskType::Review, TaskEvent::Approved, &ctx(&w)).unwrap();
        assert_matches!(
            &effects[0],
            TaskEffect::OpenTask { task_type: TaskType::Approve, .. }
        );
        let w = wf(ReviewAllowed::Peer, ApproveAllowed::None, false);
        let effects = transition(TaskType::Review, TaskEvent::Approved, &ctx(&w)).unwrap();
        assert_eq!(effects[0], TaskEffect::Publish { version_id: 11 });
    }

    #[test]
    fn rejection_hides_and_reopens_for_author() {
        let w = wf(ReviewAllowed::Admin, ApproveAllowed::Admin, false);
        for task_type in [TaskType::Review, TaskType::Approve] {
            let effects = transition(task_type, TaskEvent::Rejected, &ctx(&w)).unwrap();
            assert_eq!(effects[0], TaskEffect::HideVersion { version_id: 11 });
            assert_eq!(
                effects[1],
                TaskEffect::OpenTask {
                    task_type: TaskType::Translate,
                    language_code: "en".into(),
                    assignee: Some(5),
                    version_id: None,
                }
            );
        }
    }

    #[test]
    fn unknown_transition_is_action_error() {
        let w = WorkflowSettings::DISABLED;
        assert_matches!(
            transition(TaskType::Subtitle, TaskEvent::Approved, &ctx(&w)),
            Err(CoreError::ActionError(_))
        );
        assert_matches!(
            transition(TaskType::Review, TaskEvent::Completed, &ctx(&w)),
            Err(CoreError::ActionError(_))
        );
    }

    #[test]
    fn initial_subtitle_task_has_empty_language() {
        let w = wf(ReviewAllowed::None, ApproveAllowed::None, false);
        assert_eq!(
            initial_tasks(&w),
            vec![TaskEffect::OpenTask {
                task_type: TaskType::Subtitle,
                language_code: String::new(),
                assignee: None,
                version_id: None,
            }]
        );
        assert!(initial_tasks(&WorkflowSettings::DISABLED).is_empty());
    }

    #[test]
    fn translation_autocreation_is_idempotent() {
        let preferred: BTreeSet<String> = ["fr", "de", "en"].iter().map(|s| s.to_string()).collect();
        let none = BTreeSet::new();
        let first = translation_languages_to_create(&preferred, "en", &none, &none);
        assert_eq!(first, vec!["de".to_string(), "fr".to_string()]);

        let open: BTreeSet<String> = first.into_iter().collect();
        assert!(translation_languages_to_create(&preferred, "en", &none, &open).is_empty());
    }

    #[test]
    fn complete_languages_are_not_recreated() {
        let preferred: BTreeSet<String> = ["fr"].iter().map(|s| s.to_string()).collect();
        let complete = preferred.clone();
        assert!(
            translation_languages_to_create(&preferred, "en", &complete, &BTreeSet::new())
                .is_empty()
        );
    }

    #[test]
    fn expiration_and_capacity() {
        let now = Utc::now();
        assert_eq!(assignment_expiration(now, Some(3)), Some(now + Duration::days(3)));
        assert_eq!(assignment_expiration(now, None), None);
        assert!(check_assignment_capacity(2, Some(3)).is_ok());
        assert!(check_assignment_capacity(3, Some(3)).is_err());
        assert!(check_assignment_capacity(100, None).is_ok());
        assert!(is_task_expired(Some(now - Duration::seconds(1)), now));
        assert!(!is_task_expired(None, now));
    }

    #[test]
    fn completed_tasks_are_not_cancellable() {
        assert!(ensure_cancellable(true).is_err());
        assert!(ensure_cancellable(false).is_ok());
    }

    fn facts(
        task_type: TaskType,
        assignee: Option<DbId>,
        approved: Option<TaskApproval>,
        completed_at: Option<Timestamp>,
    ) -> TaskFacts<'static> {
        TaskFacts {
            task_type,
            language_code: "en",
            video_id: "abcdefabcdef",
            assignee_id: assignee,
            subtitle_version_id: Some(11),
            approved,
            priority: 0,
            completed_at,
            deleted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn latest_approved_reviewer_wins() {
        let now = Utc::now();
        let tasks = vec![
            facts(TaskType::Review, Some(1), Some(TaskApproval::Approved), Some(now)),
            facts(
                TaskType::Review,
                Some(2),
                Some(TaskApproval::Approved),
                Some(now + Duration::seconds(5)),
            ),
            facts(
                TaskType::Review,
                Some(3),
                Some(TaskApproval::Rejected),
                Some(now + Duration::seconds(9)),
            ),
            facts(TaskType::Approve, Some(4), Some(TaskApproval::Approved), Some(now)),
        ];
        assert_eq!(latest_signoff(tasks.clone(), 11, TaskType::Review), Some(2));
        assert_eq!(latest_signoff(tasks, 11, TaskType::Approve), Some(4));
    }

    #[test]
    fn filter_open_and_completed_windows() {
        let now = Utc::now();
        let open = facts(TaskType::Translate, None, None, None);
        let done = facts(TaskType::Review, Some(1), Some(TaskApproval::Approved), Some(now));

        let only_open = TaskFilter {
            open: Some(true),
            ..Default::default()
        };
        assert!(only_open.matches(&open));
        assert!(!only_open.matches(&done));

        let window = TaskFilter {
            completed_after: Some(now - Duration::seconds(10)),
            completed_before: Some(now + Duration::seconds(10)),
            ..Default::default()
        };
        assert!(window.matches(&done));
        assert!(!window.matches(&open));

        let by_type = TaskFilter {
            task_type: Some(TaskType::Translate),
            language_code: Some("en".into()),
            ..Default::default()
        };
        assert!(by_type.matches(&open));
        assert!(!by_type.matches(&done));
    }

    #[test]
    fn order_by_parses_all_variants() {
        for s in ["created", "-created", "priority", "-priority", "type", "-type"] {
            assert!(s.parse::<TaskOrder>().is_ok());
        }
        assert!("name".parse::<TaskOrder>().is_err());
    }

    #[test]
    fn task_type_codes_round_trip() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::from_code(t.code()).unwrap(), t);
        }
        assert_eq!("review".parse::<TaskType>().unwrap(), TaskType::Review);
    }
}
