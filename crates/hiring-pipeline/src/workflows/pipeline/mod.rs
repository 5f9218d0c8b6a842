//! Staged hiring pipeline: transition rules, the transactional mutator, vacancy
//! accounting with auto-close, and the rejection cascade that follows it.

pub mod activity;
pub mod cascade;
pub mod dispatch;
pub mod domain;
pub mod events;
pub mod export;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod stage;
pub mod transition;
pub mod vacancy;

pub use activity::{
    group_by_day, ActivityDay, ActivityDraft, ActivityId, ActivityLogEntry, ActivityType,
    Comment, CommentId,
};
pub use cascade::RejectionCascade;
pub use dispatch::{DispatchReport, EffectDispatcher, Notifier, NotifyError, OutboundMessage};
pub use domain::{
    Actor, ApplicationId, CandidateContact, ClosureType, CompanyId, JobApplication, JobId,
    JobPosting, JobStatus, NewApplication, NewJobPosting, UserId,
};
pub use events::{Channel, Effect, HiringEvent, NotificationTemplate};
pub use export::{activity_csv_string, write_activity_csv, ExportError};
pub use memory::{
    InMemoryJobBoard, InMemoryPipelineStore, InMemoryUserDirectory, LoggingNotifier,
    RecordingNotifier,
};
pub use repository::{
    ActivityLog, ApplicationRepository, CommentStore, ExpectedState, JobRepository, JobUpdate,
    RepositoryError, TransitionCommit, UserDirectory,
};
pub use router::{pipeline_router, PipelineState, TransitionView};
pub use service::{
    PipelineError, PipelineService, TransitionOutcome, TransitionRequest, ValidationError,
};
pub use stage::{PipelinePosition, Stage, StageDescriptor, SubStage};
pub use transition::{
    validate_transition, TransitionError, TransitionKind, TransitionPlan, TransitionTarget,
    MIN_JUMP_REASON_CHARS,
};
pub use vacancy::{AutoClosure, VacancyClaim, VacancyError, VacancyLedger};

#[cfg(test)]
mod tests;
