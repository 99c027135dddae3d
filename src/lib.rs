//! Multi-tenant category hierarchy maintenance.
//!
//! Layers, innermost first: `domain` (entities, naming rules, cascade plans,
//! arena forest), `application` (tree and entry services), `infrastructure`
//! (collaborator traits, in-memory adapters, snapshot, wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
