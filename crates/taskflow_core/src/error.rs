//! Error taxonomy for sources and operators.
//!
//! # Responsibility
//! - Give callers one named variant per failure kind so they can branch on
//!   kind instead of message text.
//! - Carry kind and id in every message for diagnostics.
//!
//! # Invariants
//! - Operators never downgrade an error into a value; every failure surfaces
//!   as one of these variants.

use crate::capability::{CapabilitySet, Requirement};
use crate::model::entity::EntityKind;
use crate::model::id::Id;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SourceResult<T> = Result<T, SourceError>;
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Failure reported by a source implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Backend-specific failure (I/O, remote call, driver error).
    Backend(String),
    /// A found-or-error lookup found nothing, e.g. a step in no flow.
    MissingAssociation { kind: EntityKind, id: Id },
    /// Stored state is inconsistent and cannot be answered.
    Corrupted(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(message) => write!(f, "source backend failure: {message}"),
            Self::MissingAssociation { kind, id } => {
                write!(f, "{kind} with id {id} has no associated parent")
            }
            Self::Corrupted(message) => write!(f, "source state is corrupted: {message}"),
        }
    }
}

impl Error for SourceError {}

/// Fieldless failure kind, for callers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotImplemented,
    EntityNotFound,
    SavingRequired,
    BoardTaskWithoutStep,
    InvalidBoardAssociation,
    FlowStepInUse,
    InvalidFlowStep,
    Source,
}

/// Operator-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorError {
    /// The source lacks the capability combination an operation requires.
    NotImplemented {
        required: Requirement,
        current: CapabilitySet,
    },
    EntityNotFound {
        kind: EntityKind,
        id: Id,
    },
    /// An id was requested from an unsaved entity.
    SavingRequired {
        kind: EntityKind,
    },
    /// A board lists the task but maps it to no step.
    BoardTaskWithoutStep {
        board: Option<Id>,
        task: Id,
    },
    /// The task is expected to belong to a board but belongs to none.
    InvalidBoardAssociation {
        task: Id,
    },
    /// Tasks still reference the step.
    FlowStepInUse {
        step: Id,
        tasks: usize,
    },
    /// Reserved for step-validity checks.
    InvalidFlowStep {
        step: Id,
    },
    Source(SourceError),
}

impl OperatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::EntityNotFound { .. } => ErrorKind::EntityNotFound,
            Self::SavingRequired { .. } => ErrorKind::SavingRequired,
            Self::BoardTaskWithoutStep { .. } => ErrorKind::BoardTaskWithoutStep,
            Self::InvalidBoardAssociation { .. } => ErrorKind::InvalidBoardAssociation,
            Self::FlowStepInUse { .. } => ErrorKind::FlowStepInUse,
            Self::InvalidFlowStep { .. } => ErrorKind::InvalidFlowStep,
            Self::Source(_) => ErrorKind::Source,
        }
    }
}

impl Display for OperatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotImplemented { required, current } => write!(
                f,
                "not implemented: required options {required}; current options {current}"
            ),
            Self::EntityNotFound { kind, id } => write!(f, "entity not found: {kind} with id {id}"),
            Self::SavingRequired { kind } => write!(f, "saving required: unsaved {kind} has no id"),
            Self::BoardTaskWithoutStep { board, task } => match board {
                Some(board) => write!(
                    f,
                    "board task without step: board {board} has task {task} with no step"
                ),
                None => write!(
                    f,
                    "board task without step: unsaved board has task {task} with no step"
                ),
            },
            Self::InvalidBoardAssociation { task } => {
                write!(f, "invalid board association: task {task} has no board")
            }
            Self::FlowStepInUse { step, tasks } => {
                write!(f, "flow step in use: step {step} is assigned to {tasks} task(s)")
            }
            Self::InvalidFlowStep { step } => write!(f, "invalid flow step: {step}"),
            Self::Source(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OperatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for OperatorError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}
