use chrono::{DateTime, Utc};

use super::activity::{ActivityLogEntry, Comment};
use super::domain::{
    ApplicationId, CandidateContact, ClosureType, JobApplication, JobId, JobPosting, JobStatus,
    UserId,
};
use super::stage::PipelinePosition;

/// Write-only audit sink shared with collaborator use cases.
pub trait ActivityLog: Send + Sync {
    fn append(&self, entry: ActivityLogEntry) -> Result<(), RepositoryError>;
    fn entries(&self, application_id: &ApplicationId)
        -> Result<Vec<ActivityLogEntry>, RepositoryError>;
}

pub trait CommentStore: Send + Sync {
    fn create(&self, comment: Comment) -> Result<Comment, RepositoryError>;
    fn comments(&self, application_id: &ApplicationId) -> Result<Vec<Comment>, RepositoryError>;
}

/// Application storage. The activity log and comment store share its backend so a
/// transition and its audit records commit together.
pub trait ApplicationRepository: ActivityLog + CommentStore {
    fn insert(&self, application: JobApplication) -> Result<JobApplication, RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError>;
    fn list_by_job(&self, job_id: &JobId) -> Result<Vec<JobApplication>, RepositoryError>;

    /// Apply `commit` only if the stored record still matches `commit.expected`;
    /// otherwise fail with [`RepositoryError::Conflict`] and write nothing.
    fn commit_transition(&self, commit: TransitionCommit)
        -> Result<JobApplication, RepositoryError>;
}

/// Optimistic-lock snapshot taken when the application was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedState {
    pub position: PipelinePosition,
    pub version: u64,
}

impl ExpectedState {
    pub fn of(application: &JobApplication) -> Self {
        Self {
            position: application.position(),
            version: application.version,
        }
    }

    pub fn matches(&self, application: &JobApplication) -> bool {
        application.version == self.version && application.position() == self.position
    }
}

/// Everything a transition persists, applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub expected: ExpectedState,
    pub application: JobApplication,
    pub activity: ActivityLogEntry,
    pub comment: Option<Comment>,
}

/// Job posting storage with conditional, atomic vacancy updates.
pub trait JobRepository: Send + Sync {
    fn insert(&self, job: JobPosting) -> Result<JobPosting, RepositoryError>;
    fn fetch(&self, id: &JobId) -> Result<Option<JobPosting>, RepositoryError>;

    /// Evaluate `update.precondition` and apply `update` against the same stored
    /// snapshot. Returns `Ok(None)` when the precondition does not hold.
    fn update_if(&self, id: &JobId, update: JobUpdate)
        -> Result<Option<JobPosting>, RepositoryError>;
}

/// Conditional vacancy mutations. Stores must run `precondition` and `apply`
/// without letting another update interleave.
///
/// A hire holds a pending claim while its application commit is in flight, so
/// uncommitted hires never count towards `filled_vacancies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobUpdate {
    /// Reserve one vacancy for a hire.
    ClaimVacancy,
    /// Turn a reserved vacancy into a filled one once the hire committed.
    ConfirmVacancy,
    /// Return a reserved vacancy whose hire did not commit.
    ReleaseVacancy,
    /// Close an active posting whose vacancies are all filled by committed hires.
    AutoClose { closed_at: DateTime<Utc> },
}

impl JobUpdate {
    pub fn precondition(&self, job: &JobPosting) -> bool {
        match self {
            JobUpdate::ClaimVacancy => !job.is_closed() && job.remaining_vacancies() > 0,
            JobUpdate::ConfirmVacancy | JobUpdate::ReleaseVacancy => job.has_pending_claims(),
            JobUpdate::AutoClose { .. } => {
                job.status == JobStatus::Active && job.is_filled() && !job.has_pending_claims()
            }
        }
    }

    pub fn apply(&self, job: &mut JobPosting) {
        match self {
            JobUpdate::ClaimVacancy => job.pending_vacancies += 1,
            JobUpdate::ConfirmVacancy => {
                job.pending_vacancies -= 1;
                job.filled_vacancies += 1;
            }
            JobUpdate::ReleaseVacancy => job.pending_vacancies -= 1,
            JobUpdate::AutoClose { closed_at } => {
                job.status = JobStatus::Closed;
                job.closure_type = Some(ClosureType::AutoFilled);
                job.closed_at = Some(*closed_at);
            }
        }
    }
}

/// Candidate contacts used for notification addressing.
pub trait UserDirectory: Send + Sync {
    fn find(&self, id: &UserId) -> Result<Option<CandidateContact>, RepositoryError>;
    /// Insert or replace the contact stored for `contact.user_id`.
    fn register(&self, contact: CandidateContact) -> Result<CandidateContact, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record was modified concurrently")]
    Conflict,
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
