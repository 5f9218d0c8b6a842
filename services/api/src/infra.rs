use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use hiring_pipeline::config::NotificationConfig;
use hiring_pipeline::workflows::pipeline::{
    EffectDispatcher, InMemoryJobBoard, InMemoryPipelineStore, InMemoryUserDirectory,
    LoggingNotifier, Notifier, PipelineService, PipelineState,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryPipeline<N> =
    PipelineState<InMemoryPipelineStore, InMemoryJobBoard, InMemoryUserDirectory, N>;

/// Process-local wiring of the pipeline. Candidate contacts are registered through
/// the dispatcher (`POST /api/v1/candidates`).
pub(crate) fn in_memory_pipeline<N: Notifier + 'static>(
    notifier: Arc<N>,
    notifications: NotificationConfig,
) -> MemoryPipeline<N> {
    let store = Arc::new(InMemoryPipelineStore::default());
    let board = Arc::new(InMemoryJobBoard::default());
    let users = Arc::new(InMemoryUserDirectory::default());

    PipelineState {
        service: Arc::new(PipelineService::new(store, board)),
        dispatcher: Arc::new(EffectDispatcher::new(users, notifier, notifications)),
    }
}

pub(crate) fn logging_pipeline(
    notifications: NotificationConfig,
) -> MemoryPipeline<LoggingNotifier> {
    in_memory_pipeline(Arc::new(LoggingNotifier), notifications)
}
