//! Backend-agnostic relationship management for tasks, boards, flows and
//! flow steps.
//!
//! Persistence is delegated to a [`Source`]. Optional source operations are
//! negotiated at call time through the [`CapabilityRegistry`], and the
//! operators keep cross-entity relationships consistent under every
//! combination of them.

pub mod capability;
pub mod error;
pub mod logging;
pub mod model;
pub mod operators;
pub mod source;

pub use capability::{
    parse_literal, Capability, CapabilityParseError, CapabilityRegistry, CapabilitySet, Literal,
    Requirement,
};
pub use error::{ErrorKind, OperatorError, OperatorResult, SourceError, SourceResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::board::{Board, BoardProps, BoardUpdate};
pub use model::collection::{EntityCollection, TaskStepMap};
pub use model::entity::{Entity, EntityKind, EntityRef, Identified, Patch, Record};
pub use model::flow::{Flow, FlowProps, FlowUpdate};
pub use model::flow_step::FlowStep;
pub use model::id::Id;
pub use model::task::Task;
pub use operators::{
    BoardOperators, EntityOperators, FlowOperators, FlowStepOperators, Operators, TaskOperators,
};
pub use source::memory::MemorySource;
pub use source::Source;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
