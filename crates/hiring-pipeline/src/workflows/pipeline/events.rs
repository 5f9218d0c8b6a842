use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationId, JobId, UserId};
use super::stage::{Stage, SubStage};

/// Internal events raised by the mutator and vacancy ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HiringEvent {
    ApplicationHired {
        application_id: ApplicationId,
        job_id: JobId,
    },
    JobAutoClosed {
        job_id: JobId,
        hired_application_id: ApplicationId,
        closed_at: DateTime<Utc>,
    },
}

/// Delivery channel a template is sent over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Pushed to the candidate's live session; addressed by user id.
    Realtime,
    /// Mailed; requires an address from the user directory.
    Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum NotificationTemplate {
    StageUpdated {
        stage: Stage,
        sub_stage: Option<SubStage>,
    },
    Hired {
        job_id: JobId,
    },
    Rejected {
        job_id: JobId,
    },
    PositionFilled {
        job_id: JobId,
    },
}

impl NotificationTemplate {
    pub const fn channel(&self) -> Channel {
        match self {
            Self::StageUpdated { .. } => Channel::Realtime,
            Self::Hired { .. } | Self::Rejected { .. } | Self::PositionFilled { .. } => {
                Channel::Email
            }
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::StageUpdated { .. } => "stage_updated",
            Self::Hired { .. } => "candidate_hired",
            Self::Rejected { .. } => "candidate_rejected",
            Self::PositionFilled { .. } => "position_filled",
        }
    }
}

/// Outbound side effect produced by the core and executed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    NotifyCandidate {
        application_id: ApplicationId,
        seeker_id: UserId,
        template: NotificationTemplate,
    },
}

impl Effect {
    pub fn notify(
        application_id: ApplicationId,
        seeker_id: UserId,
        template: NotificationTemplate,
    ) -> Self {
        Effect::NotifyCandidate {
            application_id,
            seeker_id,
            template,
        }
    }
}
