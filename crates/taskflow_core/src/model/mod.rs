//! Domain model for tasks, boards, flows and flow steps.
//!
//! # Responsibility
//! - Define the four entity kinds and the envelope exchanged with sources.
//! - Keep relationship data (board membership, step assignment, flow
//!   membership) on the owning entity: boards own tasks, flows own steps.
//!
//! # Invariants
//! - An entity is saved iff it carries an `Id`.
//! - Entities are plain values; cloning deep-copies nested collections.

pub mod board;
pub mod collection;
pub mod entity;
pub mod flow;
pub mod flow_step;
pub mod id;
pub mod task;
