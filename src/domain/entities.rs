//! Domain entities: core data structures

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a category, allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant ("partner") isolation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a content entry owned by the entry store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryRef(pub String);

impl EntryRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category status. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    #[default]
    Active,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    #[default]
    All,
    AuthenticatedUsers,
    MembersOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayInSearch {
    #[default]
    Listed,
    Unlisted,
    System,
}

/// Whether membership settings are managed on the category or copied from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipSetting {
    #[default]
    Manual,
    Inherit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserJoinPolicy {
    AutoJoin,
    RequestToJoin,
    #[default]
    NotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Manager,
    #[default]
    Moderator,
    Contributor,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContributionPolicy {
    All,
    #[default]
    Moderator,
}

/// Membership and permission settings of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MembershipSettings {
    pub setting: MembershipSetting,
    pub user_join_policy: UserJoinPolicy,
    pub default_permission_level: PermissionLevel,
    pub contribution_policy: ContributionPolicy,
    /// User owning the category
    pub owner: Option<String>,
}

impl MembershipSettings {
    /// Copy the inheritable fields from a parent's settings.
    /// The `setting` itself is kept.
    pub fn inherit_from(&mut self, parent: &MembershipSettings) {
        self.user_join_policy = parent.user_join_policy;
        self.default_permission_level = parent.default_permission_level;
        self.contribution_policy = parent.contribution_policy;
        self.owner = parent.owner.clone();
    }

    pub fn inherits(&self) -> bool {
        self.setting == MembershipSetting::Inherit
    }
}

/// A named node in a tenant's category forest.
///
/// Parent and children are relationship queries against the store,
/// never in-memory references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub tenant_id: TenantId,
    /// Leaf segment
    pub name: String,
    /// Path from the root, segments joined by the separator
    pub full_name: String,
    /// 0 for roots
    pub depth: u32,
    /// `None` for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    /// Distinct entries in this category or any descendant
    #[serde(default)]
    pub entries_count: u64,
    #[serde(default)]
    pub status: CategoryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub display_in_search: DisplayInSearch,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub membership: MembershipSettings,
}

impl Category {
    /// New unsaved category with default values.
    pub fn new(id: CategoryId, tenant_id: TenantId) -> Self {
        let now = Utc::now();
        Self {
            id,
            tenant_id,
            name: String::new(),
            full_name: String::new(),
            depth: 0,
            parent_id: None,
            entries_count: 0,
            status: CategoryStatus::Active,
            description: None,
            tags: Vec::new(),
            privacy: Privacy::default(),
            display_in_search: DisplayInSearch::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            membership: MembershipSettings::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CategoryStatus::Active
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Mark deleted. Terminal.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.status = CategoryStatus::Deleted;
        self.deleted_at = Some(at);
        self.updated_at = at;
    }

    /// Apply parent membership values when this category inherits.
    /// Roots keep their own values.
    pub fn apply_inheritance(&mut self, parent: Option<&Category>) {
        if let (true, Some(parent)) = (self.membership.inherits(), parent) {
            self.membership.inherit_from(&parent.membership);
        }
    }

    /// Cache keys to drop when this category changes.
    pub fn cache_invalidation_keys(&self) -> Vec<String> {
        vec![format!("category:tenantId={}", self.tenant_id)]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.full_name, self.id)
    }
}

/// Event raised to the notifier after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryEvent {
    ObjectAdded(Category),
    ObjectDeleted(Category),
}

impl CategoryEvent {
    pub fn category(&self) -> &Category {
        match self {
            CategoryEvent::ObjectAdded(c) | CategoryEvent::ObjectDeleted(c) => c,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CategoryEvent::ObjectAdded(_) => "object_added",
            CategoryEvent::ObjectDeleted(_) => "object_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_new_category_when_created_then_has_default_values() {
        let category = Category::new(CategoryId(1), TenantId(7));

        assert!(category.is_active());
        assert!(category.is_root());
        assert_eq!(category.entries_count, 0);
        assert_eq!(category.display_in_search, DisplayInSearch::Listed);
        assert_eq!(category.privacy, Privacy::All);
        assert_eq!(category.membership.setting, MembershipSetting::Manual);
        assert_eq!(category.membership.user_join_policy, UserJoinPolicy::NotAllowed);
        assert_eq!(
            category.membership.default_permission_level,
            PermissionLevel::Moderator
        );
        assert_eq!(
            category.membership.contribution_policy,
            ContributionPolicy::Moderator
        );
    }

    #[test]
    fn given_inheriting_category_when_applying_inheritance_then_copies_parent_values() {
        let mut parent = Category::new(CategoryId(1), TenantId(1));
        parent.membership.user_join_policy = UserJoinPolicy::AutoJoin;
        parent.membership.default_permission_level = PermissionLevel::Contributor;
        parent.membership.contribution_policy = ContributionPolicy::All;
        parent.membership.owner = Some("alice".into());

        let mut child = Category::new(CategoryId(2), TenantId(1));
        child.membership.setting = MembershipSetting::Inherit;
        child.apply_inheritance(Some(&parent));

        assert_eq!(child.membership.user_join_policy, UserJoinPolicy::AutoJoin);
        assert_eq!(
            child.membership.default_permission_level,
            PermissionLevel::Contributor
        );
        assert_eq!(child.membership.contribution_policy, ContributionPolicy::All);
        assert_eq!(child.membership.owner.as_deref(), Some("alice"));
        assert_eq!(child.membership.setting, MembershipSetting::Inherit);
    }

    #[test]
    fn given_manual_category_when_applying_inheritance_then_keeps_own_values() {
        let mut parent = Category::new(CategoryId(1), TenantId(1));
        parent.membership.owner = Some("alice".into());
        let mut child = Category::new(CategoryId(2), TenantId(1));

        child.apply_inheritance(Some(&parent));

        assert_eq!(child.membership.owner, None);
    }

    #[test]
    fn given_inheriting_root_when_applying_inheritance_then_keeps_own_values() {
        let mut root = Category::new(CategoryId(1), TenantId(1));
        root.membership.setting = MembershipSetting::Inherit;
        root.membership.owner = Some("bob".into());

        root.apply_inheritance(None);

        assert_eq!(root.membership.owner.as_deref(), Some("bob"));
    }

    #[test]
    fn given_category_when_marked_deleted_then_status_and_timestamp_set() {
        let mut category = Category::new(CategoryId(1), TenantId(1));
        let at = Utc::now();

        category.mark_deleted(at);

        assert_eq!(category.status, CategoryStatus::Deleted);
        assert_eq!(category.deleted_at, Some(at));
    }
}
