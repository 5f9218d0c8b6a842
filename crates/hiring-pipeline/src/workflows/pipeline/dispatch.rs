//! Executes outbound effects produced by the pipeline core.
//!
//! Every effect is delivered independently. A failed send is logged and counted; it never
//! aborts the remaining effects and never surfaces as an error to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{ApplicationId, CandidateContact, UserId};
use super::events::{Channel, Effect, NotificationTemplate};
use super::repository::UserDirectory;
use super::service::{PipelineError, ValidationError};
use crate::config::NotificationConfig;

/// Message handed to the notification transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub channel: Channel,
    pub application_id: ApplicationId,
    pub recipient: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub sender: String,
    pub template: NotificationTemplate,
}

/// Mail/websocket transport.
pub trait Notifier: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("recipient rejected: {0}")]
    Recipient(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

enum Delivery {
    Sent,
    Skipped(&'static str),
}

pub struct EffectDispatcher<U, N> {
    users: Arc<U>,
    notifier: Arc<N>,
    config: NotificationConfig,
}

impl<U, N> EffectDispatcher<U, N>
where
    U: UserDirectory + 'static,
    N: Notifier + 'static,
{
    pub fn new(users: Arc<U>, notifier: Arc<N>, config: NotificationConfig) -> Self {
        Self {
            users,
            notifier,
            config,
        }
    }

    /// Store the address book entry later effects for this candidate are sent to.
    pub fn register_contact(
        &self,
        contact: CandidateContact,
    ) -> Result<CandidateContact, PipelineError> {
        let user_id = contact.user_id.0.trim();
        let name = contact.name.trim();
        if user_id.is_empty() || name.is_empty() {
            return Err(ValidationError::IncompleteCandidateContact.into());
        }
        let email = contact
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty());
        if let Some(email) = email {
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                return Err(ValidationError::InvalidEmail(email.to_string()).into());
            }
        }

        let stored = self.users.register(CandidateContact {
            user_id: UserId::new(user_id),
            name: name.to_string(),
            email: email.map(str::to_string),
        })?;
        info!(
            user_id = %stored.user_id,
            has_email = stored.email.is_some(),
            "candidate contact registered"
        );
        Ok(stored)
    }

    pub fn dispatch(&self, effects: &[Effect]) -> DispatchReport {
        let mut report = DispatchReport::default();

        if !self.config.enabled {
            debug!(count = effects.len(), "notifications disabled; skipping effects");
            report.skipped = effects.len();
            return report;
        }

        for effect in effects {
            match self.deliver(effect) {
                Ok(Delivery::Sent) => report.delivered += 1,
                Ok(Delivery::Skipped(reason)) => {
                    debug!(?effect, reason, "skipped notification");
                    report.skipped += 1;
                }
                Err(error) => {
                    warn!(?effect, %error, "notification failed; continuing");
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn deliver(&self, effect: &Effect) -> Result<Delivery, NotifyError> {
        let Effect::NotifyCandidate {
            application_id,
            seeker_id,
            template,
        } = effect;

        let email = match template.channel() {
            Channel::Realtime => None,
            Channel::Email => {
                let contact = self
                    .users
                    .find(seeker_id)
                    .map_err(|error| NotifyError::Transport(error.to_string()))?;
                let Some(contact) = contact else {
                    return Ok(Delivery::Skipped("candidate not found"));
                };
                match contact.email.filter(|email| !email.trim().is_empty()) {
                    Some(email) => Some(email),
                    None => return Ok(Delivery::Skipped("candidate has no email")),
                }
            }
        };

        let message = OutboundMessage {
            channel: template.channel(),
            application_id: application_id.clone(),
            recipient: seeker_id.clone(),
            email,
            sender: self.config.sender.clone(),
            template: template.clone(),
        };
        self.notifier.send(&message)?;
        Ok(Delivery::Sent)
    }
}
