//! Pure legality rules for moving an application between pipeline positions.
//!
//! Nothing here touches storage. Callers hand in the position they last read and the
//! requested target; the validator classifies the move or explains why it is illegal.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::stage::{PipelinePosition, Stage, SubStage};

/// Minimum trimmed length of the reason attached to a non-adjacent forward jump.
pub const MIN_JUMP_REASON_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    SubStageMove,
    SequentialAdvance,
    ForwardJump,
    Rejection,
}

impl TransitionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::SubStageMove => "sub-stage move",
            Self::SequentialAdvance => "sequential advance",
            Self::ForwardJump => "move to another stage",
            Self::Rejection => "rejection",
        }
    }

    /// Whether the validated reason must be persisted as a comment.
    pub const fn records_reason(self) -> bool {
        matches!(self, Self::ForwardJump | Self::Rejection)
    }
}

/// Requested destination as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTarget {
    pub stage: Stage,
    #[serde(default)]
    pub sub_stage: Option<SubStage>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TransitionTarget {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage,
            sub_stage: None,
            reason: None,
        }
    }

    pub fn sub_stage(stage: Stage, sub_stage: SubStage) -> Self {
        Self {
            stage,
            sub_stage: Some(sub_stage),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    pub kind: TransitionKind,
    pub from: PipelinePosition,
    pub to: PipelinePosition,
    /// Trimmed reason; always present for jumps and rejections.
    pub reason: Option<String>,
}

impl TransitionPlan {
    pub fn is_stage_change(&self) -> bool {
        self.from.stage != self.to.stage
    }

    pub fn is_hire(&self) -> bool {
        self.to.stage == Stage::Hired
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: PipelinePosition, to: Stage },
    #[error("application is already at {0}")]
    AlreadyInTargetState(PipelinePosition),
    #[error("{0} is a terminal stage")]
    TerminalStage(Stage),
    #[error("sub-stage {sub_stage} is not valid for stage {stage}")]
    InvalidSubStage { stage: Stage, sub_stage: SubStage },
    #[error("a reason is required to move to {0}")]
    ReasonRequired(Stage),
    #[error("reason must be at least {min} characters (found {actual})")]
    ReasonTooShort { min: usize, actual: usize },
}

/// Classify a requested move from `current` to `target`.
pub fn validate_transition(
    current: PipelinePosition,
    target: &TransitionTarget,
) -> Result<TransitionPlan, TransitionError> {
    if current.stage == target.stage {
        return sub_stage_move(current, target);
    }

    if current.stage.is_terminal() {
        return Err(TransitionError::TerminalStage(current.stage));
    }

    let (from_index, to_index) = match (current.stage.index(), target.stage.index()) {
        (_, None) => return rejection(current, target),
        (None, Some(_)) => return Err(TransitionError::TerminalStage(current.stage)),
        (Some(from), Some(to)) => (from, to),
    };

    match to_index.cmp(&from_index.saturating_add(1)) {
        Ordering::Equal => {
            let to = landing(current, target, |current| {
                current.default_landing(target.stage)
            })?;
            Ok(TransitionPlan {
                kind: TransitionKind::SequentialAdvance,
                from: current,
                to,
                reason: trimmed(target.reason.as_deref()),
            })
        }
        Ordering::Greater => {
            let reason = jump_reason(target.reason.as_deref(), target.stage)?;
            // Skipped stages are never entered mid-way; any requested sub-stage is ignored.
            let to = PipelinePosition::entry(target.stage);
            Ok(TransitionPlan {
                kind: TransitionKind::ForwardJump,
                from: current,
                to,
                reason: Some(reason),
            })
        }
        Ordering::Less => Err(TransitionError::InvalidTransition {
            from: current,
            to: target.stage,
        }),
    }
}

fn sub_stage_move(
    current: PipelinePosition,
    target: &TransitionTarget,
) -> Result<TransitionPlan, TransitionError> {
    let requested = match target.sub_stage {
        Some(sub_stage) if current.sub_stage == Some(sub_stage) => {
            return Err(TransitionError::AlreadyInTargetState(current))
        }
        Some(sub_stage) => sub_stage,
        None => return Err(TransitionError::AlreadyInTargetState(current)),
    };

    if current.stage.is_terminal() {
        return Err(TransitionError::TerminalStage(current.stage));
    }

    if !current.stage.allows(requested) {
        return Err(TransitionError::InvalidSubStage {
            stage: current.stage,
            sub_stage: requested,
        });
    }

    Ok(TransitionPlan {
        kind: TransitionKind::SubStageMove,
        from: current,
        to: PipelinePosition::new(current.stage, Some(requested)),
        reason: trimmed(target.reason.as_deref()),
    })
}

fn rejection(
    current: PipelinePosition,
    target: &TransitionTarget,
) -> Result<TransitionPlan, TransitionError> {
    if let Some(sub_stage) = target.sub_stage {
        return Err(TransitionError::InvalidSubStage {
            stage: Stage::Rejected,
            sub_stage,
        });
    }

    let reason =
        trimmed(target.reason.as_deref()).ok_or(TransitionError::ReasonRequired(Stage::Rejected))?;

    Ok(TransitionPlan {
        kind: TransitionKind::Rejection,
        from: current,
        to: PipelinePosition::new(Stage::Rejected, None),
        reason: Some(reason),
    })
}

fn landing(
    current: PipelinePosition,
    target: &TransitionTarget,
    default: impl FnOnce(PipelinePosition) -> PipelinePosition,
) -> Result<PipelinePosition, TransitionError> {
    match target.sub_stage {
        Some(sub_stage) if target.stage.allows(sub_stage) => {
            Ok(PipelinePosition::new(target.stage, Some(sub_stage)))
        }
        Some(sub_stage) => Err(TransitionError::InvalidSubStage {
            stage: target.stage,
            sub_stage,
        }),
        None => Ok(default(current)),
    }
}

fn jump_reason(reason: Option<&str>, target: Stage) -> Result<String, TransitionError> {
    let reason = trimmed(reason).ok_or(TransitionError::ReasonRequired(target))?;
    let actual = reason.chars().count();
    if actual < MIN_JUMP_REASON_CHARS {
        return Err(TransitionError::ReasonTooShort {
            min: MIN_JUMP_REASON_CHARS,
            actual,
        });
    }
    Ok(reason)
}

fn trimmed(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
