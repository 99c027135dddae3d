//! Domain layer: entities and tree algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod cascade;
pub mod entities;
pub mod error;
pub mod rules;

pub use arena::{CategoryForest, ForestNode, Violation};
pub use cascade::{CascadePlan, CascadeStep, Changeset};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use rules::TreeRules;
