//! Append-only audit records tagged to the pipeline position an event occurred in.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, ApplicationId, UserId};
use super::stage::{PipelinePosition, Stage, SubStage};
use super::transition::{TransitionKind, TransitionPlan};

static ACTIVITY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static COMMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_activity_id() -> ActivityId {
    let id = ACTIVITY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ActivityId(format!("act-{id:06}"))
}

fn next_comment_id() -> CommentId {
    let id = COMMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CommentId(format!("cmt-{id:06}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    ApplicationReceived,
    StageChange,
    SubstageChange,
    InterviewScheduled,
    InterviewRescheduled,
    InterviewCompleted,
    TaskAssigned,
    TaskSubmitted,
    TaskReviewed,
    CompensationUpdated,
    OfferSent,
    OfferAccepted,
    Comment,
}

impl ActivityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApplicationReceived => "APPLICATION_RECEIVED",
            Self::StageChange => "STAGE_CHANGE",
            Self::SubstageChange => "SUBSTAGE_CHANGE",
            Self::InterviewScheduled => "INTERVIEW_SCHEDULED",
            Self::InterviewRescheduled => "INTERVIEW_RESCHEDULED",
            Self::InterviewCompleted => "INTERVIEW_COMPLETED",
            Self::TaskAssigned => "TASK_ASSIGNED",
            Self::TaskSubmitted => "TASK_SUBMITTED",
            Self::TaskReviewed => "TASK_REVIEWED",
            Self::CompensationUpdated => "COMPENSATION_UPDATED",
            Self::OfferSent => "OFFER_SENT",
            Self::OfferAccepted => "OFFER_ACCEPTED",
            Self::Comment => "COMMENT",
        }
    }

    /// Types reserved for the pipeline mutator; collaborators may not forge them.
    pub const fn is_transition(self) -> bool {
        matches!(self, Self::StageChange | Self::SubstageChange)
    }
}

/// Immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub application_id: ApplicationId,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    /// Position the event occurred in, not necessarily the destination.
    pub stage: Stage,
    pub sub_stage: Option<SubStage>,
    pub performed_by: UserId,
    pub performed_by_name: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActivityLogEntry {
    pub fn new(
        application_id: ApplicationId,
        draft: ActivityDraft,
        position: PipelinePosition,
        actor: &Actor,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: next_activity_id(),
            application_id,
            kind: draft.kind,
            stage: position.stage,
            sub_stage: position.sub_stage,
            performed_by: actor.user_id.clone(),
            performed_by_name: actor.name.clone(),
            created_at,
            title: draft.title,
            description: draft.description,
        }
    }

    /// Entry describing a validated transition. Stage changes are tagged with the
    /// position left behind; sub-stage moves with the sub-stage entered.
    pub fn for_transition(
        application_id: ApplicationId,
        plan: &TransitionPlan,
        actor: &Actor,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (kind, position) = if plan.is_stage_change() {
            (ActivityType::StageChange, plan.from)
        } else {
            (ActivityType::SubstageChange, plan.to)
        };

        let title = match plan.kind {
            TransitionKind::SubStageMove => format!(
                "Moved to {}",
                plan.to
                    .sub_stage
                    .map(|sub_stage| sub_stage.label())
                    .unwrap_or_else(|| plan.to.stage.label().to_string())
            ),
            TransitionKind::SequentialAdvance | TransitionKind::ForwardJump => {
                format!("Moved to {}", plan.to.stage.label())
            }
            TransitionKind::Rejection => "Application rejected".to_string(),
        };

        let draft = ActivityDraft {
            kind,
            title,
            description: Some(format!("{} ({} -> {})", plan.kind.label(), plan.from, plan.to)),
        };
        Self::new(application_id, draft, position, actor, created_at)
    }

    pub fn position(&self) -> PipelinePosition {
        PipelinePosition::new(self.stage, self.sub_stage)
    }
}

/// Collaborator-supplied content for a new activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDraft {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActivityDraft {
    pub fn new(kind: ActivityType, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Free-text note attached to an application at a pipeline position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub application_id: ApplicationId,
    pub comment: String,
    pub stage: Stage,
    pub sub_stage: Option<SubStage>,
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        application_id: ApplicationId,
        text: impl Into<String>,
        position: PipelinePosition,
        actor: &Actor,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: next_comment_id(),
            application_id,
            comment: text.into(),
            stage: position.stage,
            sub_stage: position.sub_stage,
            author_id: actor.user_id.clone(),
            author_name: actor.name.clone(),
            created_at,
        }
    }

    /// Comment documenting why a jump or rejection happened, tagged to the position left.
    pub fn from_reason(
        application_id: ApplicationId,
        plan: &TransitionPlan,
        actor: &Actor,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !plan.kind.records_reason() {
            return None;
        }
        let reason = plan.reason.as_ref()?;
        Some(Self::new(
            application_id,
            reason.clone(),
            plan.from,
            actor,
            created_at,
        ))
    }
}

/// Entries sharing a UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityDay {
    pub day: NaiveDate,
    pub entries: Vec<ActivityLogEntry>,
}

/// Group entries by UTC day, oldest day first, entries ascending by `created_at`.
/// Entries with equal timestamps keep their append order.
pub fn group_by_day(mut entries: Vec<ActivityLogEntry>) -> Vec<ActivityDay> {
    entries.sort_by_key(|entry| entry.created_at);

    let mut days: Vec<ActivityDay> = Vec::new();
    for entry in entries {
        let day = entry.created_at.date_naive();
        match days.last_mut() {
            Some(current) if current.day == day => current.entries.push(entry),
            _ => days.push(ActivityDay {
                day,
                entries: vec![entry],
            }),
        }
    }
    days
}
