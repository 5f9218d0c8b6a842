//! Process-local adapters for the pipeline ports. Used by the API service and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use super::activity::{ActivityLogEntry, Comment};
use super::dispatch::{Notifier, NotifyError, OutboundMessage};
use super::domain::{
    ApplicationId, CandidateContact, JobApplication, JobId, JobPosting, JobStatus, UserId,
};
use super::repository::{
    ActivityLog, ApplicationRepository, CommentStore, JobRepository, JobUpdate, RepositoryError,
    TransitionCommit, UserDirectory,
};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

#[derive(Default)]
struct PipelineTables {
    applications: HashMap<ApplicationId, JobApplication>,
    activities: Vec<ActivityLogEntry>,
    comments: Vec<Comment>,
}

/// Applications, activity log, and comments behind one lock, so a transition commit
/// lands in all three or none.
#[derive(Default, Clone)]
pub struct InMemoryPipelineStore {
    tables: Arc<Mutex<PipelineTables>>,
}

impl ActivityLog for InMemoryPipelineStore {
    fn append(&self, entry: ActivityLogEntry) -> Result<(), RepositoryError> {
        lock(&self.tables)?.activities.push(entry);
        Ok(())
    }

    fn entries(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .activities
            .iter()
            .filter(|entry| &entry.application_id == application_id)
            .cloned()
            .collect())
    }
}

impl CommentStore for InMemoryPipelineStore {
    fn create(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        lock(&self.tables)?.comments.push(comment.clone());
        Ok(comment)
    }

    fn comments(&self, application_id: &ApplicationId) -> Result<Vec<Comment>, RepositoryError> {
        let tables = lock(&self.tables)?;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| &comment.application_id == application_id)
            .cloned()
            .collect())
    }
}

impl ApplicationRepository for InMemoryPipelineStore {
    fn insert(&self, application: JobApplication) -> Result<JobApplication, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Duplicate);
        }
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(lock(&self.tables)?.applications.get(id).cloned())
    }

    fn list_by_job(&self, job_id: &JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut siblings: Vec<JobApplication> = tables
            .applications
            .values()
            .filter(|application| &application.job_id == job_id)
            .cloned()
            .collect();
        siblings.sort_by(|a, b| a.applied_date.cmp(&b.applied_date).then(a.id.cmp(&b.id)));
        Ok(siblings)
    }

    fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<JobApplication, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let stored = tables
            .applications
            .get(&commit.application.id)
            .ok_or(RepositoryError::NotFound)?;
        if !commit.expected.matches(stored) {
            return Err(RepositoryError::Conflict);
        }

        let TransitionCommit {
            application,
            activity,
            comment,
            ..
        } = commit;
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        tables.activities.push(activity);
        if let Some(comment) = comment {
            tables.comments.push(comment);
        }
        Ok(application)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryJobBoard {
    jobs: Arc<Mutex<HashMap<JobId, JobPosting>>>,
}

impl InMemoryJobBoard {
    /// Administrative status change (unlist, block, reopen). Returns false for unknown jobs.
    pub fn set_status(&self, id: &JobId, status: JobStatus) -> bool {
        let Ok(mut jobs) = lock(&self.jobs) else {
            return false;
        };
        match jobs.get_mut(id) {
            Some(job) => {
                job.status = status;
                true
            }
            None => false,
        }
    }
}

impl JobRepository for InMemoryJobBoard {
    fn insert(&self, job: JobPosting) -> Result<JobPosting, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::Duplicate);
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn fetch(&self, id: &JobId) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(lock(&self.jobs)?.get(id).cloned())
    }

    fn update_if(
        &self,
        id: &JobId,
        update: JobUpdate,
    ) -> Result<Option<JobPosting>, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let job = jobs.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if !update.precondition(job) {
            return Ok(None);
        }
        update.apply(job);
        Ok(Some(job.clone()))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<Mutex<HashMap<UserId, CandidateContact>>>,
}

impl UserDirectory for InMemoryUserDirectory {
    fn find(&self, id: &UserId) -> Result<Option<CandidateContact>, RepositoryError> {
        Ok(lock(&self.users)?.get(id).cloned())
    }

    fn register(&self, contact: CandidateContact) -> Result<CandidateContact, RepositoryError> {
        lock(&self.users)?.insert(contact.user_id.clone(), contact.clone());
        Ok(contact)
    }
}

/// Keeps every delivered message for inspection.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("outbox mutex poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}

/// Writes each message to the log instead of a mail or websocket transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        info!(
            channel = ?message.channel,
            application_id = %message.application_id,
            recipient = %message.recipient,
            email = message.email.as_deref().unwrap_or("-"),
            template = message.template.name(),
            "notification sent"
        );
        Ok(())
    }
}
