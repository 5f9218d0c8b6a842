use std::fmt;

use serde::{Deserialize, Serialize};

/// Major pipeline stages. Values cross the API boundary as their SCREAMING_SNAKE names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    InReview,
    Shortlisted,
    Interview,
    TechnicalTask,
    Compensation,
    Offer,
    Hired,
    Rejected,
}

/// Fine-grained states within a stage. Membership is checked per stage, so a
/// value such as `COMPLETED` can appear in more than one stage's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubStage {
    ProfileReview,
    PendingDecision,
    ReadyForInterview,
    Contacted,
    AwaitingResponse,
    NotScheduled,
    Scheduled,
    Completed,
    EvaluationPending,
    NotAssigned,
    Assigned,
    Submitted,
    UnderReview,
    Pending,
    Initiated,
    NegotiationOngoing,
    Approved,
    NotSent,
    OfferSent,
    OfferAccepted,
}

/// Static row of the stage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub stage: Stage,
    /// Position in the ordered pipeline; `None` for the out-of-band `REJECTED`.
    pub index: Option<u8>,
    pub label: &'static str,
    pub sub_stages: &'static [SubStage],
    pub terminal: bool,
}

const IN_REVIEW_SUB_STAGES: &[SubStage] = &[SubStage::ProfileReview, SubStage::PendingDecision];
const SHORTLISTED_SUB_STAGES: &[SubStage] = &[
    SubStage::ReadyForInterview,
    SubStage::Contacted,
    SubStage::AwaitingResponse,
];
const INTERVIEW_SUB_STAGES: &[SubStage] = &[
    SubStage::NotScheduled,
    SubStage::Scheduled,
    SubStage::Completed,
    SubStage::EvaluationPending,
];
const TECHNICAL_TASK_SUB_STAGES: &[SubStage] = &[
    SubStage::NotAssigned,
    SubStage::Assigned,
    SubStage::Submitted,
    SubStage::UnderReview,
    SubStage::Completed,
];
const COMPENSATION_SUB_STAGES: &[SubStage] = &[
    SubStage::Pending,
    SubStage::Initiated,
    SubStage::NegotiationOngoing,
    SubStage::Approved,
];
const OFFER_SUB_STAGES: &[SubStage] = &[
    SubStage::NotSent,
    SubStage::OfferSent,
    SubStage::OfferAccepted,
];

/// Sub-stage pairs that advance into a specific sub-stage of the next stage
/// rather than its first one.
const FAST_FORWARDS: &[((Stage, SubStage), (Stage, SubStage))] = &[(
    (Stage::InReview, SubStage::PendingDecision),
    (Stage::Shortlisted, SubStage::ReadyForInterview),
)];

impl Stage {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::InReview,
            Self::Shortlisted,
            Self::Interview,
            Self::TechnicalTask,
            Self::Compensation,
            Self::Offer,
            Self::Hired,
        ]
    }

    pub const fn descriptor(self) -> StageDescriptor {
        match self {
            Self::InReview => StageDescriptor {
                stage: self,
                index: Some(0),
                label: "In Review",
                sub_stages: IN_REVIEW_SUB_STAGES,
                terminal: false,
            },
            Self::Shortlisted => StageDescriptor {
                stage: self,
                index: Some(1),
                label: "Shortlisted",
                sub_stages: SHORTLISTED_SUB_STAGES,
                terminal: false,
            },
            Self::Interview => StageDescriptor {
                stage: self,
                index: Some(2),
                label: "Interview",
                sub_stages: INTERVIEW_SUB_STAGES,
                terminal: false,
            },
            Self::TechnicalTask => StageDescriptor {
                stage: self,
                index: Some(3),
                label: "Technical Task",
                sub_stages: TECHNICAL_TASK_SUB_STAGES,
                terminal: false,
            },
            Self::Compensation => StageDescriptor {
                stage: self,
                index: Some(4),
                label: "Compensation",
                sub_stages: COMPENSATION_SUB_STAGES,
                terminal: false,
            },
            Self::Offer => StageDescriptor {
                stage: self,
                index: Some(5),
                label: "Offer",
                sub_stages: OFFER_SUB_STAGES,
                terminal: false,
            },
            Self::Hired => StageDescriptor {
                stage: self,
                index: Some(6),
                label: "Hired",
                sub_stages: &[],
                terminal: true,
            },
            Self::Rejected => StageDescriptor {
                stage: self,
                index: None,
                label: "Rejected",
                sub_stages: &[],
                terminal: true,
            },
        }
    }

    pub const fn index(self) -> Option<u8> {
        self.descriptor().index
    }

    pub const fn label(self) -> &'static str {
        self.descriptor().label
    }

    pub const fn sub_stages(self) -> &'static [SubStage] {
        self.descriptor().sub_stages
    }

    pub const fn is_terminal(self) -> bool {
        self.descriptor().terminal
    }

    pub fn first_sub_stage(self) -> Option<SubStage> {
        self.sub_stages().first().copied()
    }

    pub fn allows(self, sub_stage: SubStage) -> bool {
        self.sub_stages().contains(&sub_stage)
    }

    /// Next stage in index order. `HIRED` and `REJECTED` have none.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::InReview => Some(Self::Shortlisted),
            Self::Shortlisted => Some(Self::Interview),
            Self::Interview => Some(Self::TechnicalTask),
            Self::TechnicalTask => Some(Self::Compensation),
            Self::Compensation => Some(Self::Offer),
            Self::Offer => Some(Self::Hired),
            Self::Hired | Self::Rejected => None,
        }
    }

    /// Every stage reachable from this one, without regard to reason requirements.
    pub fn allowed_targets(self) -> Vec<Self> {
        if self.is_terminal() {
            return Vec::new();
        }

        let mut targets: Vec<Self> = match self.index() {
            Some(current) => Self::ordered()
                .into_iter()
                .filter(|stage| stage.index().is_some_and(|index| index > current))
                .collect(),
            None => Vec::new(),
        };
        targets.push(Self::Rejected);
        targets
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InReview => "IN_REVIEW",
            Self::Shortlisted => "SHORTLISTED",
            Self::Interview => "INTERVIEW",
            Self::TechnicalTask => "TECHNICAL_TASK",
            Self::Compensation => "COMPENSATION",
            Self::Offer => "OFFER",
            Self::Hired => "HIRED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProfileReview => "PROFILE_REVIEW",
            Self::PendingDecision => "PENDING_DECISION",
            Self::ReadyForInterview => "READY_FOR_INTERVIEW",
            Self::Contacted => "CONTACTED",
            Self::AwaitingResponse => "AWAITING_RESPONSE",
            Self::NotScheduled => "NOT_SCHEDULED",
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::EvaluationPending => "EVALUATION_PENDING",
            Self::NotAssigned => "NOT_ASSIGNED",
            Self::Assigned => "ASSIGNED",
            Self::Submitted => "SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Pending => "PENDING",
            Self::Initiated => "INITIATED",
            Self::NegotiationOngoing => "NEGOTIATION_ONGOING",
            Self::Approved => "APPROVED",
            Self::NotSent => "NOT_SENT",
            Self::OfferSent => "OFFER_SENT",
            Self::OfferAccepted => "OFFER_ACCEPTED",
        }
    }

    pub fn label(self) -> String {
        let raw = self.as_str().to_ascii_lowercase().replace('_', " ");
        let mut chars = raw.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for SubStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pair of stage and optional sub-stage an application occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePosition {
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<SubStage>,
}

impl PipelinePosition {
    pub fn new(stage: Stage, sub_stage: Option<SubStage>) -> Self {
        Self { stage, sub_stage }
    }

    /// Stage entered at its first sub-stage.
    pub fn entry(stage: Stage) -> Self {
        Self::new(stage, stage.first_sub_stage())
    }

    pub fn is_consistent(&self) -> bool {
        match self.sub_stage {
            Some(sub_stage) => self.stage.allows(sub_stage),
            None => self.stage.sub_stages().is_empty(),
        }
    }

    /// Landing position when advancing from `self` into `target` without an explicit sub-stage.
    pub fn default_landing(&self, target: Stage) -> Self {
        let alias = self.sub_stage.and_then(|sub_stage| {
            FAST_FORWARDS
                .iter()
                .find(|((stage, from), (to_stage, _))| {
                    *stage == self.stage && *from == sub_stage && *to_stage == target
                })
                .map(|(_, (_, to))| *to)
        });

        match alias {
            Some(sub_stage) => Self::new(target, Some(sub_stage)),
            None => Self::entry(target),
        }
    }
}

impl fmt::Display for PipelinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_stage {
            Some(sub_stage) => write!(f, "{}/{}", self.stage, sub_stage),
            None => write!(f, "{}", self.stage),
        }
    }
}
