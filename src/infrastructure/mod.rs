//! Infrastructure layer: collaborator implementations and DI container
//!
//! This layer implements the collaborator traits and wires up services.

pub mod di;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{InfraError, InfraResult};
