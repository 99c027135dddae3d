//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{Category, CategoryStatus};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print failure status (red X, indented)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print key/value detail line
pub fn field(key: &str, value: &(impl std::fmt::Display + ?Sized)) {
    println!("  {:<18} {}", format!("{key}:").dimmed(), value);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print every attribute of a category.
pub fn category(category: &Category) {
    let status = match category.status {
        CategoryStatus::Active => "active".green(),
        CategoryStatus::Deleted => "deleted".red(),
    };
    header(&category.full_name);
    field("id", &category.id);
    field("name", &category.name);
    field("depth", &category.depth);
    field(
        "parent",
        &category
            .parent_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    field("entries", &category.entries_count);
    field("status", &status);
    field("membership", &format!("{:?}", category.membership.setting));
    field("updated", &category.updated_at.to_rfc3339());
    if let Some(deleted_at) = category.deleted_at {
        field("deleted", &deleted_at.to_rfc3339());
    }
}
