//! Keeps a job's fill count consistent with hire events and closes it once full.
//!
//! A hire reserves its vacancy before the application commit, so the last slot can be
//! won by exactly one hire. The reservation stays pending until the commit lands and is
//! then confirmed or released. Auto-close is evaluated after confirmation and ignores
//! postings with pending reservations. Every step goes through
//! [`JobRepository::update_if`], which checks and writes against one snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{JobId, JobPosting};
use super::events::HiringEvent;
use super::repository::{JobRepository, JobUpdate, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VacancyError {
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("job {0} is closed")]
    JobClosed(JobId),
    #[error("job {job_id} has no remaining vacancies (total {total})")]
    NoVacancyRemaining { job_id: JobId, total: u32 },
    #[error("job {0} has no pending vacancy claim")]
    ClaimNotHeld(JobId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Vacancy held for a hire that has not committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacancyClaim {
    /// Posting as it stood right after the reservation.
    pub job: JobPosting,
}

/// Result of a hire filling the last vacancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoClosure {
    pub job: JobPosting,
    pub event: HiringEvent,
}

pub struct VacancyLedger<J> {
    jobs: Arc<J>,
}

impl<J> VacancyLedger<J>
where
    J: JobRepository + 'static,
{
    pub fn new(jobs: Arc<J>) -> Self {
        Self { jobs }
    }

    /// Reserve one vacancy. Fails when the job is closed or already full.
    pub fn claim(&self, job_id: &JobId) -> Result<VacancyClaim, VacancyError> {
        let updated = match self.jobs.update_if(job_id, JobUpdate::ClaimVacancy) {
            Ok(updated) => updated,
            Err(RepositoryError::NotFound) => return Err(VacancyError::JobNotFound(job_id.clone())),
            Err(other) => return Err(other.into()),
        };

        if let Some(job) = updated {
            return Ok(VacancyClaim { job });
        }

        let job = self
            .jobs
            .fetch(job_id)?
            .ok_or_else(|| VacancyError::JobNotFound(job_id.clone()))?;
        if job.is_closed() {
            Err(VacancyError::JobClosed(job_id.clone()))
        } else {
            Err(VacancyError::NoVacancyRemaining {
                job_id: job_id.clone(),
                total: job.total_vacancies,
            })
        }
    }

    /// Count a claim as filled once its hire committed.
    pub fn confirm(&self, claim: &VacancyClaim) -> Result<JobPosting, VacancyError> {
        let job_id = &claim.job.id;
        self.jobs
            .update_if(job_id, JobUpdate::ConfirmVacancy)?
            .ok_or_else(|| VacancyError::ClaimNotHeld(job_id.clone()))
    }

    /// Give back a claim whose hire failed to commit.
    pub fn release(&self, claim: &VacancyClaim) -> Result<(), VacancyError> {
        let job_id = &claim.job.id;
        match self.jobs.update_if(job_id, JobUpdate::ReleaseVacancy)? {
            Some(job) => {
                info!(
                    job_id = %job_id,
                    filled = job.filled_vacancies,
                    pending = job.pending_vacancies,
                    "released vacancy claim"
                );
            }
            None => warn!(job_id = %job_id, "vacancy claim already released"),
        }
        Ok(())
    }

    /// Handle a confirmed hire: close the job if every vacancy is filled and no other
    /// hire is still in flight. The last confirmer closes it, and only one caller can
    /// win the close, so `JobAutoClosed` is raised once per job.
    pub fn on_application_hired(
        &self,
        event: &HiringEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<AutoClosure>, VacancyError> {
        let HiringEvent::ApplicationHired {
            application_id,
            job_id,
        } = event
        else {
            return Ok(None);
        };

        let closed = self
            .jobs
            .update_if(job_id, JobUpdate::AutoClose { closed_at: now })?;

        Ok(closed.map(|job| {
            info!(
                job_id = %job_id,
                application_id = %application_id,
                filled = job.filled_vacancies,
                total = job.total_vacancies,
                "job auto-closed after final hire"
            );
            AutoClosure {
                event: HiringEvent::JobAutoClosed {
                    job_id: job_id.clone(),
                    hired_application_id: application_id.clone(),
                    closed_at: now,
                },
                job,
            }
        }))
    }
}
