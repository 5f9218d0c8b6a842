use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::NotificationConfig;
use crate::workflows::pipeline::activity::{ActivityLogEntry, Comment};
use crate::workflows::pipeline::dispatch::{EffectDispatcher, Notifier, NotifyError, OutboundMessage};
use crate::workflows::pipeline::domain::{
    Actor, ApplicationId, CandidateContact, CompanyId, JobApplication, JobId, JobPosting,
    NewApplication, NewJobPosting, UserId,
};
use crate::workflows::pipeline::memory::{
    InMemoryJobBoard, InMemoryPipelineStore, InMemoryUserDirectory, RecordingNotifier,
};
use crate::workflows::pipeline::repository::{
    ActivityLog, ApplicationRepository, CommentStore, RepositoryError, TransitionCommit,
    UserDirectory,
};
use crate::workflows::pipeline::router::{pipeline_router, PipelineState};
use crate::workflows::pipeline::service::{PipelineService, TransitionRequest};
use crate::workflows::pipeline::stage::Stage;
use crate::workflows::pipeline::transition::TransitionTarget;

pub(super) type MemoryService = PipelineService<InMemoryPipelineStore, InMemoryJobBoard>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) store: Arc<InMemoryPipelineStore>,
    pub(super) board: Arc<InMemoryJobBoard>,
    pub(super) users: Arc<InMemoryUserDirectory>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(InMemoryPipelineStore::default());
    let board = Arc::new(InMemoryJobBoard::default());
    let users = Arc::new(InMemoryUserDirectory::default());
    Harness {
        service: Arc::new(PipelineService::new(store.clone(), board.clone())),
        store,
        board,
        users,
    }
}

pub(super) fn company() -> CompanyId {
    CompanyId::new("acme")
}

pub(super) fn recruiter() -> Actor {
    Actor::new("u-recruiter", "Riley Recruiter").for_company(company())
}

pub(super) fn outsider() -> Actor {
    Actor::new("u-outsider", "Olive Outsider").for_company(CompanyId::new("globex"))
}

impl Harness {
    pub(super) fn job(&self, total_vacancies: u32) -> JobPosting {
        self.service
            .create_job(NewJobPosting {
                company_id: company(),
                title: "Backend Engineer".to_string(),
                total_vacancies,
            })
            .expect("job is created")
    }

    /// Opens an application and registers the candidate with an email address.
    pub(super) fn apply(&self, job_id: &JobId, seeker: &str) -> JobApplication {
        self.users
            .register(CandidateContact {
                user_id: UserId::new(seeker),
                name: seeker.to_string(),
                email: Some(format!("{seeker}@example.com")),
            })
            .expect("candidate is registered");
        self.service
            .open_application(NewApplication {
                seeker_id: UserId::new(seeker),
                job_id: job_id.clone(),
                score: Some(80),
                cover_letter: None,
                resume_url: None,
            })
            .expect("application is opened")
    }

    pub(super) fn move_to(
        &self,
        application_id: &ApplicationId,
        target: TransitionTarget,
    ) -> Result<crate::workflows::pipeline::TransitionOutcome, crate::workflows::pipeline::PipelineError>
    {
        self.service.transition(TransitionRequest {
            application_id: application_id.clone(),
            target,
            actor: recruiter(),
        })
    }

    /// Walks an application to `OFFER` through a documented forward jump.
    pub(super) fn ready_to_hire(&self, application_id: &ApplicationId) {
        self.move_to(
            application_id,
            TransitionTarget::stage(Stage::Offer).with_reason("strong referral, panel waived"),
        )
        .expect("jump to offer");
    }

    pub(super) fn dispatcher<N: Notifier + 'static>(
        &self,
        notifier: Arc<N>,
    ) -> EffectDispatcher<InMemoryUserDirectory, N> {
        EffectDispatcher::new(self.users.clone(), notifier, NotificationConfig::default())
    }

    pub(super) fn router(&self, notifier: Arc<RecordingNotifier>) -> axum::Router {
        pipeline_router(PipelineState {
            service: self.service.clone(),
            dispatcher: Arc::new(self.dispatcher(notifier)),
        })
    }
}

type Interleaved = Box<dyn FnOnce() + Send>;

/// Store whose transition commits always lose the optimistic-lock race. A hook set
/// with `before_commit` runs once inside the next commit, before it fails.
#[derive(Default)]
pub(super) struct ConflictingStore {
    pub(super) inner: InMemoryPipelineStore,
    interleaved: Mutex<Option<Interleaved>>,
}

impl ConflictingStore {
    pub(super) fn before_commit(&self, hook: impl FnOnce() + Send + 'static) {
        *self.interleaved.lock().expect("hook lock") = Some(Box::new(hook));
    }
}

impl ActivityLog for ConflictingStore {
    fn append(&self, entry: ActivityLogEntry) -> Result<(), RepositoryError> {
        self.inner.append(entry)
    }

    fn entries(&self, application_id: &ApplicationId) -> Result<Vec<ActivityLogEntry>, RepositoryError> {
        self.inner.entries(application_id)
    }
}

impl CommentStore for ConflictingStore {
    fn create(&self, comment: Comment) -> Result<Comment, RepositoryError> {
        self.inner.create(comment)
    }

    fn comments(&self, application_id: &ApplicationId) -> Result<Vec<Comment>, RepositoryError> {
        self.inner.comments(application_id)
    }
}

impl ApplicationRepository for ConflictingStore {
    fn insert(&self, application: JobApplication) -> Result<JobApplication, RepositoryError> {
        self.inner.insert(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<JobApplication>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list_by_job(&self, job_id: &JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        self.inner.list_by_job(job_id)
    }

    fn commit_transition(&self, _commit: TransitionCommit) -> Result<JobApplication, RepositoryError> {
        let hook = self.interleaved.lock().expect("hook lock").take();
        if let Some(hook) = hook {
            hook();
        }
        Err(RepositoryError::Conflict)
    }
}

/// Transport that refuses mail for the listed recipients and records the rest.
#[derive(Default)]
pub(super) struct FlakyNotifier {
    pub(super) refuse: Vec<UserId>,
    pub(super) delivered: RecordingNotifier,
}

impl Notifier for FlakyNotifier {
    fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        if self.refuse.contains(&message.recipient) {
            return Err(NotifyError::Transport("smtp relay timed out".to_string()));
        }
        self.delivered.send(message)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
