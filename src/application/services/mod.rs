//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on collaborator traits (CategoryStore, EntryAssociations, etc.)
//! but are themselves concrete structs, not traits.

mod category_tree;
mod entry_categories;
mod tenant_lock;

pub use category_tree::{
    CategoryTreeService, DeleteMode, TreeConfig, DEFAULT_CHUNKED_LOAD_THRESHOLD,
    DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_CATEGORIES,
};
pub use entry_categories::EntryCategoryService;
pub use tenant_lock::TenantLocks;
