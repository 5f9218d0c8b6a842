//! End-to-end checks of the hiring pipeline through its public service facade.
//!
//! These exercise the mutator, vacancy ledger, and dispatcher together, including the
//! race for a job's final vacancy.

use std::sync::{Arc, Barrier};
use std::thread;

use hiring_pipeline::config::NotificationConfig;
use hiring_pipeline::workflows::pipeline::{
    Actor, ApplicationId, CandidateContact, CompanyId, EffectDispatcher, InMemoryJobBoard,
    InMemoryPipelineStore, InMemoryUserDirectory, JobId, JobPosting, JobRepository, JobStatus,
    NewApplication, NewJobPosting, NotificationTemplate, PipelineError, PipelineService,
    RecordingNotifier, Stage, SubStage, TransitionRequest, TransitionTarget, UserDirectory,
    UserId, ValidationError,
};

type Service = PipelineService<InMemoryPipelineStore, InMemoryJobBoard>;

fn recruiter() -> Actor {
    Actor::new("u-hm", "Harper Manager").for_company(CompanyId::new("initech"))
}

fn setup(total_vacancies: u32) -> (Arc<Service>, Arc<InMemoryJobBoard>, JobPosting) {
    let store = Arc::new(InMemoryPipelineStore::default());
    let board = Arc::new(InMemoryJobBoard::default());
    let service = Arc::new(PipelineService::new(store, board.clone()));
    let job = service
        .create_job(NewJobPosting {
            company_id: CompanyId::new("initech"),
            title: "Staff Engineer".to_string(),
            total_vacancies,
        })
        .expect("job created");
    (service, board, job)
}

fn apply(service: &Service, job_id: &JobId, seeker: &str) -> ApplicationId {
    service
        .open_application(NewApplication {
            seeker_id: UserId::new(seeker),
            job_id: job_id.clone(),
            score: None,
            cover_letter: Some("Hello".to_string()),
            resume_url: None,
        })
        .expect("application opened")
        .id
}

fn request(application_id: &ApplicationId, target: TransitionTarget) -> TransitionRequest {
    TransitionRequest {
        application_id: application_id.clone(),
        target,
        actor: recruiter(),
    }
}

#[test]
fn scenario_from_intake_to_auto_closed_job() {
    let (service, board, job) = setup(1);
    let hired = apply(&service, &job.id, "seeker-1");
    let others = [apply(&service, &job.id, "seeker-2"), apply(&service, &job.id, "seeker-3")];

    service
        .transition(request(
            &hired,
            TransitionTarget::sub_stage(Stage::InReview, SubStage::PendingDecision),
        ))
        .expect("sub-stage move");
    let shortlisted = service
        .transition(request(&hired, TransitionTarget::stage(Stage::Shortlisted)))
        .expect("advance");
    assert_eq!(shortlisted.application.sub_stage, Some(SubStage::ReadyForInterview));

    let jump = service
        .transition(request(
            &hired,
            TransitionTarget::stage(Stage::Offer).with_reason("already completed external round"),
        ))
        .expect("jump");
    let comment = jump.comment.expect("reason comment");
    assert_eq!(
        (comment.stage, comment.sub_stage),
        (Stage::Shortlisted, Some(SubStage::ReadyForInterview))
    );

    let outcome = service
        .transition(request(&hired, TransitionTarget::stage(Stage::Hired)))
        .expect("hire");
    let job_now = board.fetch(&job.id).expect("fetch").expect("job");
    assert_eq!(job_now.filled_vacancies, 1);
    assert_eq!(job_now.status, JobStatus::Closed);

    let users = Arc::new(InMemoryUserDirectory::default());
    for seeker in ["seeker-1", "seeker-2", "seeker-3"] {
        users
            .register(CandidateContact {
                user_id: UserId::new(seeker),
                name: seeker.to_string(),
                email: Some(format!("{seeker}@mail.test")),
            })
            .expect("register");
    }
    let notifier = Arc::new(RecordingNotifier::default());
    let dispatcher = EffectDispatcher::new(users, notifier.clone(), NotificationConfig::default());
    let report = dispatcher.dispatch(&outcome.effects);
    assert_eq!(report.delivered, 3);

    let filled: Vec<_> = notifier
        .messages()
        .into_iter()
        .filter(|message| matches!(message.template, NotificationTemplate::PositionFilled { .. }))
        .map(|message| message.application_id)
        .collect();
    assert_eq!(filled, others.to_vec());
}

#[test]
fn concurrent_hires_race_for_the_last_vacancy() {
    for _ in 0..25 {
        let (service, board, job) = setup(1);
        let contenders: Vec<_> = ["seeker-a", "seeker-b"]
            .into_iter()
            .map(|seeker| {
                let id = apply(&service, &job.id, seeker);
                service
                    .transition(request(
                        &id,
                        TransitionTarget::stage(Stage::Offer).with_reason("fast-tracked by CTO"),
                    ))
                    .expect("offer");
                id
            })
            .collect();

        let barrier = Arc::new(Barrier::new(contenders.len()));
        let handles: Vec<_> = contenders
            .iter()
            .cloned()
            .map(|id| {
                let service = service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.transition(request(&id, TransitionTarget::stage(Stage::Hired)))
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "exactly one hire fills the vacancy");
        assert!(winners[0].auto_closed());

        let loser = results
            .iter()
            .find_map(|result| result.as_ref().err())
            .expect("one hire refused");
        assert!(matches!(
            loser,
            PipelineError::Validation(
                ValidationError::JobClosed(_) | ValidationError::NoVacancyRemaining { .. }
            )
        ));

        let job_now = board.fetch(&job.id).expect("fetch").expect("job");
        assert_eq!(job_now.filled_vacancies, 1);
        assert_eq!(job_now.status, JobStatus::Closed);

        let stages: Vec<Stage> = contenders
            .iter()
            .map(|id| service.application(id).expect("application").stage)
            .collect();
        assert_eq!(stages.iter().filter(|stage| **stage == Stage::Hired).count(), 1);
        assert_eq!(stages.iter().filter(|stage| **stage == Stage::Offer).count(), 1);
    }
}
