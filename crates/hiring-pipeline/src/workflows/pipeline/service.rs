use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::activity::{
    group_by_day, ActivityDay, ActivityDraft, ActivityLogEntry, ActivityType, Comment,
};
use super::cascade::RejectionCascade;
use super::domain::{
    Actor, ApplicationId, CompanyId, JobApplication, JobId, JobPosting, JobStatus,
    NewApplication, NewJobPosting,
};
use super::events::{Effect, HiringEvent, NotificationTemplate};
use super::repository::{
    ApplicationRepository, ExpectedState, JobRepository, RepositoryError, TransitionCommit,
};
use super::stage::{PipelinePosition, Stage};
use super::transition::{validate_transition, TransitionError, TransitionPlan, TransitionTarget};
use super::vacancy::{VacancyClaim, VacancyError, VacancyLedger};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

/// A caller's request to move one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub application_id: ApplicationId,
    pub target: TransitionTarget,
    pub actor: Actor,
}

/// Committed transition plus everything it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub application: JobApplication,
    pub plan: TransitionPlan,
    pub activity: ActivityLogEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
    /// Job state after a hire; `None` for every other transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobPosting>,
    pub events: Vec<HiringEvent>,
    /// Outbound notifications for the dispatcher; never executed here.
    pub effects: Vec<Effect>,
}

impl TransitionOutcome {
    pub fn auto_closed(&self) -> bool {
        self.events
            .iter()
            .any(|event| matches!(event, HiringEvent::JobAutoClosed { .. }))
    }
}

/// The only path by which an application's stage or sub-stage changes.
pub struct PipelineService<R, J> {
    applications: Arc<R>,
    jobs: Arc<J>,
    vacancies: VacancyLedger<J>,
    cascade: RejectionCascade<R>,
}

impl<R, J> PipelineService<R, J>
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    pub fn new(applications: Arc<R>, jobs: Arc<J>) -> Self {
        Self {
            vacancies: VacancyLedger::new(jobs.clone()),
            cascade: RejectionCascade::new(applications.clone()),
            applications,
            jobs,
        }
    }

    /// Validate, persist, and audit one transition; on `HIRED`, run the vacancy cascade.
    pub fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, PipelineError> {
        let TransitionRequest {
            application_id,
            target,
            actor,
        } = request;

        let current = self.load(&application_id)?;
        authorize(&actor, &current.company_id)?;

        let plan = validate_transition(current.position(), &target).map_err(|error| {
            match error {
                TransitionError::AlreadyInTargetState(position)
                    if position.stage == Stage::Hired =>
                {
                    ValidationError::AlreadyHired
                }
                other => ValidationError::Transition(other),
            }
        })?;

        let now = Utc::now();
        let claim = if plan.is_hire() {
            Some(self.vacancies.claim(&current.job_id)?)
        } else {
            None
        };

        let commit = TransitionCommit {
            expected: ExpectedState::of(&current),
            application: current.advanced_to(plan.to, now),
            activity: ActivityLogEntry::for_transition(current.id.clone(), &plan, &actor, now),
            comment: Comment::from_reason(current.id.clone(), &plan, &actor, now),
        };
        let activity = commit.activity.clone();
        let comment = commit.comment.clone();

        let application = match self.applications.commit_transition(commit) {
            Ok(application) => application,
            Err(commit_error) => {
                if let Some(claim) = &claim {
                    if let Err(release_error) = self.vacancies.release(claim) {
                        error!(
                            application_id = %application_id,
                            job_id = %claim.job.id,
                            %release_error,
                            "failed to release vacancy after aborted hire"
                        );
                    }
                }
                return Err(match commit_error {
                    RepositoryError::Conflict => PipelineError::Conflict(application_id),
                    other => other.into(),
                });
            }
        };

        info!(
            application_id = %application.id,
            from = %plan.from,
            to = %plan.to,
            kind = plan.kind.label(),
            performed_by = %actor.user_id,
            "application transitioned"
        );

        let mut outcome = TransitionOutcome {
            effects: vec![candidate_notice(&application, &plan)],
            application,
            plan,
            activity,
            comment,
            job: None,
            events: Vec::new(),
        };

        if let Some(claim) = claim {
            self.settle_hire(&mut outcome, claim, now);
        }

        Ok(outcome)
    }

    /// Post-commit half of a hire. Failures here are logged; the hire itself stands.
    fn settle_hire(&self, outcome: &mut TransitionOutcome, claim: VacancyClaim, now: DateTime<Utc>) {
        let hired = HiringEvent::ApplicationHired {
            application_id: outcome.application.id.clone(),
            job_id: claim.job.id.clone(),
        };
        outcome.events.push(hired.clone());

        match self.vacancies.confirm(&claim) {
            Ok(job) => outcome.job = Some(job),
            Err(error) => {
                error!(
                    application_id = %outcome.application.id,
                    job_id = %claim.job.id,
                    %error,
                    "could not confirm vacancy after hire committed"
                );
                outcome.job = Some(claim.job);
                return;
            }
        }

        let closure = match self.vacancies.on_application_hired(&hired, now) {
            Ok(closure) => closure,
            Err(error) => {
                error!(
                    application_id = %outcome.application.id,
                    %error,
                    "auto-close evaluation failed after hire committed"
                );
                return;
            }
        };

        let Some(closure) = closure else {
            return;
        };
        outcome.job = Some(closure.job);

        match self.cascade.on_job_closed(&closure.event) {
            Ok(effects) => outcome.effects.extend(effects),
            Err(error) => warn!(
                job_id = %outcome.application.job_id,
                %error,
                "could not load sibling applications for rejection notices"
            ),
        }
        outcome.events.push(closure.event);
    }

    pub fn create_job(&self, posting: NewJobPosting) -> Result<JobPosting, PipelineError> {
        if posting.total_vacancies == 0 {
            return Err(ValidationError::InvalidVacancyCount.into());
        }
        if posting.title.trim().is_empty() {
            return Err(ValidationError::EmptyJobTitle.into());
        }

        let job = JobPosting {
            id: next_job_id(),
            company_id: posting.company_id,
            title: posting.title.trim().to_string(),
            status: JobStatus::Active,
            total_vacancies: posting.total_vacancies,
            filled_vacancies: 0,
            pending_vacancies: 0,
            closure_type: None,
            closed_at: None,
        };
        let stored = self.jobs.insert(job)?;
        info!(job_id = %stored.id, total = stored.total_vacancies, "job posting created");
        Ok(stored)
    }

    /// Create an application at `IN_REVIEW/PROFILE_REVIEW` for an active job.
    pub fn open_application(
        &self,
        submission: NewApplication,
    ) -> Result<JobApplication, PipelineError> {
        let job = self
            .jobs
            .fetch(&submission.job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(submission.job_id.clone()))?;
        if !job.accepts_applications() {
            return Err(ValidationError::JobNotAcceptingApplications(job.id).into());
        }

        let now = Utc::now();
        let entry = PipelinePosition::entry(Stage::InReview);
        let application = JobApplication {
            id: next_application_id(),
            seeker_id: submission.seeker_id,
            job_id: job.id,
            company_id: job.company_id,
            stage: entry.stage,
            sub_stage: entry.sub_stage,
            version: 0,
            score: submission.score,
            applied_date: now,
            cover_letter: submission.cover_letter,
            resume_url: submission.resume_url,
            updated_at: now,
        };
        let stored = self.applications.insert(application)?;

        let candidate = Actor::new(stored.seeker_id.as_str(), "Candidate");
        let received = ActivityLogEntry::new(
            stored.id.clone(),
            ActivityDraft::new(ActivityType::ApplicationReceived, "Application received"),
            entry,
            &candidate,
            now,
        );
        if let Err(error) = self.applications.append(received) {
            warn!(application_id = %stored.id, %error, "could not record intake activity");
        }

        Ok(stored)
    }

    /// Collaborator hook (interview scheduling, task assignment, offers) for audit entries.
    pub fn record_activity(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        draft: ActivityDraft,
    ) -> Result<ActivityLogEntry, PipelineError> {
        if draft.kind.is_transition() {
            return Err(ValidationError::ReservedActivityType(draft.kind.as_str()).into());
        }
        if draft.title.trim().is_empty() {
            return Err(ValidationError::EmptyActivityTitle.into());
        }

        let application = self.load(application_id)?;
        authorize(actor, &application.company_id)?;

        let entry = ActivityLogEntry::new(
            application.id.clone(),
            draft,
            application.position(),
            actor,
            Utc::now(),
        );
        self.applications.append(entry.clone())?;
        Ok(entry)
    }

    pub fn add_comment(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        text: &str,
    ) -> Result<Comment, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }

        let application = self.load(application_id)?;
        authorize(actor, &application.company_id)?;

        let comment = Comment::new(
            application.id.clone(),
            text,
            application.position(),
            actor,
            Utc::now(),
        );
        Ok(self.applications.create(comment)?)
    }

    pub fn application(&self, id: &ApplicationId) -> Result<JobApplication, PipelineError> {
        self.load(id)
    }

    pub fn job(&self, id: &JobId) -> Result<JobPosting, PipelineError> {
        self.jobs
            .fetch(id)?
            .ok_or_else(|| PipelineError::JobNotFound(id.clone()))
    }

    pub fn activity(&self, id: &ApplicationId) -> Result<Vec<ActivityLogEntry>, PipelineError> {
        self.load(id)?;
        let mut entries = self.applications.entries(id)?;
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    pub fn activity_timeline(&self, id: &ApplicationId) -> Result<Vec<ActivityDay>, PipelineError> {
        self.load(id)?;
        Ok(group_by_day(self.applications.entries(id)?))
    }

    pub fn comments(&self, id: &ApplicationId) -> Result<Vec<Comment>, PipelineError> {
        self.load(id)?;
        Ok(self.applications.comments(id)?)
    }

    fn load(&self, id: &ApplicationId) -> Result<JobApplication, PipelineError> {
        self.applications
            .fetch(id)?
            .ok_or_else(|| PipelineError::ApplicationNotFound(id.clone()))
    }
}

fn authorize(actor: &Actor, company_id: &CompanyId) -> Result<(), PipelineError> {
    if actor.may_act_for(company_id) {
        Ok(())
    } else {
        Err(PipelineError::Authorization(company_id.clone()))
    }
}

fn candidate_notice(application: &JobApplication, plan: &TransitionPlan) -> Effect {
    let template = match plan.to.stage {
        Stage::Hired => NotificationTemplate::Hired {
            job_id: application.job_id.clone(),
        },
        Stage::Rejected => NotificationTemplate::Rejected {
            job_id: application.job_id.clone(),
        },
        stage => NotificationTemplate::StageUpdated {
            stage,
            sub_stage: plan.to.sub_stage,
        },
    };
    Effect::notify(
        application.id.clone(),
        application.seeker_id.clone(),
        template,
    )
}

/// Caller-correctable validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("already hired")]
    AlreadyHired,
    #[error("job {0} is closed")]
    JobClosed(JobId),
    #[error("job {job_id} has no remaining vacancies (total {total})")]
    NoVacancyRemaining { job_id: JobId, total: u32 },
    #[error("job {0} is not accepting applications")]
    JobNotAcceptingApplications(JobId),
    #[error("job must offer at least one vacancy")]
    InvalidVacancyCount,
    #[error("job title must not be empty")]
    EmptyJobTitle,
    #[error("comment text must not be empty")]
    EmptyComment,
    #[error("activity type {0} is reserved for pipeline transitions")]
    ReservedActivityType(&'static str),
    #[error("activity title must not be empty")]
    EmptyActivityTitle,
    #[error("candidate id and name must not be empty")]
    IncompleteCandidateContact,
    #[error("invalid email address {0:?}")]
    InvalidEmail(String),
}

/// Error raised by the pipeline service.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("application {0} was modified concurrently; reload and retry")]
    Conflict(ApplicationId),
    #[error("not permitted to manage applications of company {0}")]
    Authorization(CompanyId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<VacancyError> for PipelineError {
    fn from(value: VacancyError) -> Self {
        match value {
            VacancyError::JobNotFound(job_id) => PipelineError::JobNotFound(job_id),
            VacancyError::JobClosed(job_id) => ValidationError::JobClosed(job_id).into(),
            VacancyError::NoVacancyRemaining { job_id, total } => {
                ValidationError::NoVacancyRemaining { job_id, total }.into()
            }
            VacancyError::ClaimNotHeld(_) => PipelineError::Repository(RepositoryError::Conflict),
            VacancyError::Repository(error) => PipelineError::Repository(error),
        }
    }
}
