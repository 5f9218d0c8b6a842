use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::{PipelinePosition, Stage, SubStage};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for job applications.
    ApplicationId
);
identifier!(
    /// Identifier wrapper for job postings.
    JobId
);
identifier!(
    /// Identifier for seekers and company users alike.
    UserId
);
identifier!(CompanyId);

/// One candidate's pursuit of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub seeker_id: UserId,
    pub job_id: JobId,
    pub company_id: CompanyId,
    pub stage: Stage,
    pub sub_stage: Option<SubStage>,
    /// Optimistic-lock token; bumped by every committed transition.
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    pub applied_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn position(&self) -> PipelinePosition {
        PipelinePosition::new(self.stage, self.sub_stage)
    }

    /// Copy of `self` moved to `to`, with the lock token advanced.
    pub(crate) fn advanced_to(&self, to: PipelinePosition, at: DateTime<Utc>) -> Self {
        Self {
            stage: to.stage,
            sub_stage: to.sub_stage,
            version: self.version + 1,
            updated_at: at,
            ..self.clone()
        }
    }
}

/// Intake payload for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub seeker_id: UserId,
    pub job_id: JobId,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Unlisted,
    Closed,
    Blocked,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Unlisted => "unlisted",
            JobStatus::Closed => "closed",
            JobStatus::Blocked => "blocked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureType {
    AutoFilled,
    Manual,
}

/// Vacancy-relevant slice of a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub company_id: CompanyId,
    pub title: String,
    pub status: JobStatus,
    pub total_vacancies: u32,
    pub filled_vacancies: u32,
    /// Vacancies reserved by hires whose commit has not landed yet.
    #[serde(default)]
    pub pending_vacancies: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure_type: Option<ClosureType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    pub fn is_closed(&self) -> bool {
        self.status == JobStatus::Closed
    }

    pub fn remaining_vacancies(&self) -> u32 {
        self.total_vacancies
            .saturating_sub(self.filled_vacancies + self.pending_vacancies)
    }

    /// Counts committed hires only.
    pub fn is_filled(&self) -> bool {
        self.filled_vacancies >= self.total_vacancies
    }

    pub fn has_pending_claims(&self) -> bool {
        self.pending_vacancies > 0
    }

    pub fn accepts_applications(&self) -> bool {
        self.status == JobStatus::Active
    }
}

/// Payload for creating a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobPosting {
    pub company_id: CompanyId,
    pub title: String,
    pub total_vacancies: u32,
}

/// Company user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub name: String,
    /// When present, must own the application being touched.
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            name: name.into(),
            company_id: None,
        }
    }

    pub fn for_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn may_act_for(&self, company_id: &CompanyId) -> bool {
        match &self.company_id {
            Some(own) => own == company_id,
            None => true,
        }
    }
}

/// Candidate contact record owned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateContact {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}
