//! Naming and shape rules of a category tree.

use crate::domain::{DomainError, DomainResult};

/// Default full-name separator.
pub const DEFAULT_SEPARATOR: &str = "/";

/// Categories must stay strictly below this depth.
pub const MAX_CATEGORY_DEPTH: u32 = 8;

/// Longest accepted leaf name, in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 60;

/// Shape rules shared by every operation on a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRules {
    pub separator: String,
    pub max_depth: u32,
    pub max_name_length: usize,
}

impl Default for TreeRules {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: MAX_CATEGORY_DEPTH,
            max_name_length: MAX_CATEGORY_NAME_LENGTH,
        }
    }
}

impl TreeRules {
    /// Normalize a leaf name.
    ///
    /// Trims whitespace, replaces the separator with `_` and truncates to
    /// `max_name_length` characters. Empty results are rejected.
    pub fn parse_name(&self, raw: &str) -> DomainResult<String> {
        let replaced = raw.trim().replace(self.separator.as_str(), "_");
        let parsed: String = replaced.chars().take(self.max_name_length).collect();
        let parsed = parsed.trim_end().to_string();
        if parsed.is_empty() {
            return Err(DomainError::InvalidName(raw.to_string()));
        }
        Ok(parsed)
    }

    /// Full name of a child named `name` under `parent_full_name`.
    pub fn join(&self, parent_full_name: Option<&str>, name: &str) -> String {
        match parent_full_name {
            Some(parent) => format!("{}{}{}", parent, self.separator, name),
            None => name.to_string(),
        }
    }

    /// Split a full path into its segments. Empty segments are rejected.
    pub fn split_path<'a>(&self, full_path: &'a str) -> DomainResult<Vec<&'a str>> {
        let segments: Vec<&str> = full_path.split(self.separator.as_str()).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(DomainError::InvalidName(full_path.to_string()));
        }
        Ok(segments)
    }

    /// Prefix shared by the full names of all descendants.
    pub fn descendant_prefix(&self, full_name: &str) -> String {
        format!("{}{}", full_name, self.separator)
    }

    /// Fail when `depth` breaks the depth bound.
    pub fn check_depth(&self, full_name: &str, depth: u32) -> DomainResult<()> {
        if depth >= self.max_depth {
            return Err(DomainError::DepthExceeded {
                full_name: full_name.to_string(),
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Sports", "Sports")]
    #[case("  Sports  ", "Sports")]
    #[case("News/Sports", "News_Sports")]
    fn given_raw_name_when_parsing_then_normalizes(#[case] raw: &str, #[case] expected: &str) {
        let rules = TreeRules::default();
        assert_eq!(rules.parse_name(raw).unwrap(), expected);
    }

    #[test]
    fn given_long_name_when_parsing_then_truncates() {
        let rules = TreeRules::default();
        let raw = "x".repeat(100);

        let parsed = rules.parse_name(&raw).unwrap();

        assert_eq!(parsed.chars().count(), MAX_CATEGORY_NAME_LENGTH);
    }

    #[test]
    fn given_blank_name_when_parsing_then_fails() {
        let rules = TreeRules::default();
        assert!(matches!(
            rules.parse_name("   "),
            Err(DomainError::InvalidName(_))
        ));
    }

    #[test]
    fn given_custom_separator_when_joining_then_uses_it() {
        let rules = TreeRules {
            separator: ">".into(),
            ..TreeRules::default()
        };
        assert_eq!(rules.join(Some("a>b"), "c"), "a>b>c");
        assert_eq!(rules.join(None, "c"), "c");
    }

    #[rstest]
    #[case("a//b")]
    #[case("/a")]
    #[case("a/")]
    #[case("")]
    fn given_path_with_empty_segment_when_splitting_then_fails(#[case] path: &str) {
        let rules = TreeRules::default();
        assert!(rules.split_path(path).is_err());
    }

    #[test]
    fn given_depth_at_bound_when_checking_then_fails() {
        let rules = TreeRules::default();
        assert!(rules.check_depth("x", 7).is_ok());
        assert!(matches!(
            rules.check_depth("x", 8),
            Err(DomainError::DepthExceeded { depth: 8, max: 8, .. })
        ));
    }
}
