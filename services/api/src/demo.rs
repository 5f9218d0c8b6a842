use crate::infra::in_memory_pipeline;
use clap::Args;
use hiring_pipeline::config::NotificationConfig;
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::pipeline::{
    activity_csv_string, Actor, ApplicationId, CandidateContact, CompanyId, NewApplication,
    NewJobPosting, PipelineError, RecordingNotifier, Stage, SubStage, TransitionOutcome,
    TransitionRequest, TransitionTarget, UserId,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of vacancies on the demo job posting
    #[arg(long, default_value_t = 1)]
    pub(crate) vacancies: u32,
    /// Number of candidates applying (the first one is walked to HIRED)
    #[arg(long, default_value_t = 3)]
    pub(crate) candidates: usize,
    /// Print the hired candidate's activity log as CSV
    #[arg(long)]
    pub(crate) export_activity: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        vacancies,
        candidates,
        export_activity,
    } = args;

    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = in_memory_pipeline(notifier.clone(), NotificationConfig::default());
    let service = pipeline.service.clone();

    let company = CompanyId::new("demo-co");
    let recruiter = Actor::new("u-demo-recruiter", "Demo Recruiter").for_company(company.clone());

    let job = service.create_job(NewJobPosting {
        company_id: company,
        title: "Senior Rust Engineer".to_string(),
        total_vacancies: vacancies,
    })?;
    println!("Hiring pipeline demo");
    println!(
        "Job {} '{}' with {} vacanc{}",
        job.id,
        job.title,
        job.total_vacancies,
        if job.total_vacancies == 1 { "y" } else { "ies" }
    );

    let mut applications: Vec<ApplicationId> = Vec::new();
    for index in 1..=candidates.max(1) {
        let seeker = UserId::new(format!("seeker-{index:02}"));
        pipeline.dispatcher.register_contact(CandidateContact {
            user_id: seeker.clone(),
            name: format!("Candidate {index}"),
            email: Some(format!("candidate{index}@example.com")),
        })?;
        let application = service.open_application(NewApplication {
            seeker_id: seeker,
            job_id: job.id.clone(),
            score: None,
            cover_letter: None,
            resume_url: None,
        })?;
        println!("  {} applied as {}", application.seeker_id, application.id);
        applications.push(application.id);
    }

    let Some(lead) = applications.first().cloned() else {
        return Ok(());
    };

    let steps = [
        TransitionTarget::sub_stage(Stage::InReview, SubStage::PendingDecision),
        TransitionTarget::stage(Stage::Shortlisted),
        TransitionTarget::stage(Stage::Offer).with_reason("already completed external round"),
        TransitionTarget::stage(Stage::Hired),
    ];

    println!("\nTransitions for {lead}");
    let mut last: Option<TransitionOutcome> = None;
    for target in steps {
        let request = TransitionRequest {
            application_id: lead.clone(),
            target,
            actor: recruiter.clone(),
        };
        match service.transition(request) {
            Ok(outcome) => {
                println!(
                    "  {} -> {} ({})",
                    outcome.plan.from,
                    outcome.plan.to,
                    outcome.plan.kind.label()
                );
                if let Some(comment) = &outcome.comment {
                    println!(
                        "    comment at {}/{}: {}",
                        comment.stage,
                        comment
                            .sub_stage
                            .map(|sub_stage| sub_stage.as_str())
                            .unwrap_or("-"),
                        comment.comment
                    );
                }
                let report = pipeline.dispatcher.dispatch(&outcome.effects);
                println!(
                    "    notifications: {} delivered, {} skipped, {} failed",
                    report.delivered, report.skipped, report.failed
                );
                last = Some(outcome);
            }
            Err(err) => {
                println!("  transition refused: {err}");
                return Err(err.into());
            }
        }
    }

    if let Some(job) = last.and_then(|outcome| outcome.job) {
        println!(
            "\nJob {} is {} ({} of {} filled)",
            job.id,
            job.status.label(),
            job.filled_vacancies,
            job.total_vacancies
        );
    }

    let second_hire = applications.get(1).map(|second| {
        service.transition(TransitionRequest {
            application_id: second.clone(),
            target: TransitionTarget::stage(Stage::Hired)
                .with_reason("backup candidate, same panel"),
            actor: recruiter.clone(),
        })
    });
    match second_hire {
        Some(Err(PipelineError::Validation(err))) => {
            println!("Second hire on the same job refused: {err}");
        }
        Some(Err(err)) => return Err(err.into()),
        Some(Ok(outcome)) => println!(
            "Second hire accepted for {} (vacancies remain)",
            outcome.application.id
        ),
        None => {}
    }

    println!("\nOutbound messages");
    for message in notifier.messages() {
        println!(
            "  [{}] {} -> {}",
            message.template.name(),
            message.application_id,
            message.email.as_deref().unwrap_or(message.recipient.as_str())
        );
    }

    if export_activity {
        let entries = service.activity(&lead)?;
        println!("\nActivity log for {lead}");
        print!("{}", activity_csv_string(&entries)?);
    }

    Ok(())
}
