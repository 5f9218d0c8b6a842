use std::sync::Arc;

use tracing::info;

use super::events::{Effect, HiringEvent, NotificationTemplate};
use super::repository::{ApplicationRepository, RepositoryError};
use super::stage::Stage;

/// Notification sweep over a job's remaining candidates once the job auto-closes.
///
/// Sibling applications keep their stage; the sweep only produces rejection notices.
pub struct RejectionCascade<R> {
    applications: Arc<R>,
}

impl<R> RejectionCascade<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(applications: Arc<R>) -> Self {
        Self { applications }
    }

    pub fn on_job_closed(&self, event: &HiringEvent) -> Result<Vec<Effect>, RepositoryError> {
        let HiringEvent::JobAutoClosed {
            job_id,
            hired_application_id,
            ..
        } = event
        else {
            return Ok(Vec::new());
        };

        let effects: Vec<Effect> = self
            .applications
            .list_by_job(job_id)?
            .into_iter()
            .filter(|sibling| &sibling.id != hired_application_id)
            .filter(|sibling| sibling.stage != Stage::Hired)
            .map(|sibling| {
                Effect::notify(
                    sibling.id,
                    sibling.seeker_id,
                    NotificationTemplate::PositionFilled {
                        job_id: job_id.clone(),
                    },
                )
            })
            .collect();

        info!(
            job_id = %job_id,
            recipients = effects.len(),
            "queued position-filled rejection notices"
        );
        Ok(effects)
    }
}
