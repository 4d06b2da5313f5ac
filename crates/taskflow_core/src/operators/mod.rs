//! Relationship-consistency operators.
//!
//! # Responsibility
//! - Expose typed and generic operators over one source.
//! - Gate relationship operations on the source's current capabilities.
//!
//! # Invariants
//! - Operators hold no state besides the source; capabilities are probed
//!   on every call.

pub mod board;
pub mod entity;
pub mod flow;
pub mod flow_step;
pub mod task;

use crate::capability::{CapabilityRegistry, CapabilitySet};
use crate::source::Source;
use std::sync::Arc;

pub use board::BoardOperators;
pub use entity::EntityOperators;
pub use flow::FlowOperators;
pub use flow_step::FlowStepOperators;
pub use task::TaskOperators;

/// Operator bundle owning a shared source.
#[derive(Clone)]
pub struct Operators {
    source: Arc<dyn Source>,
}

impl Operators {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    pub fn registry(&self) -> CapabilityRegistry<'_> {
        CapabilityRegistry::new(self.source())
    }

    /// Capabilities the source offers right now.
    pub fn capabilities(&self) -> CapabilitySet {
        self.registry().current()
    }

    pub fn entity(&self) -> EntityOperators<'_> {
        EntityOperators::new(self.source())
    }

    pub fn task(&self) -> TaskOperators<'_> {
        TaskOperators::new(self.source())
    }

    pub fn flow_step(&self) -> FlowStepOperators<'_> {
        FlowStepOperators::new(self.source())
    }

    pub fn flow(&self) -> FlowOperators<'_> {
        FlowOperators::new(self.source())
    }

    pub fn board(&self) -> BoardOperators<'_> {
        BoardOperators::new(self.source())
    }
}
