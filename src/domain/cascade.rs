//! Cascade plans and changesets.
//!
//! A structural change (rename, move) is computed for the whole subtree
//! before anything is written, then handed to the store as one changeset.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::domain::{Category, CategoryId, DomainResult, TenantId, TreeRules};

/// New position of one category within a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeStep {
    /// Category as currently stored
    pub category: Category,
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub full_name: String,
    pub depth: u32,
}

impl CascadeStep {
    pub fn id(&self) -> CategoryId {
        self.category.id
    }

    pub fn old_full_name(&self) -> &str {
        &self.category.full_name
    }

    pub fn is_noop(&self) -> bool {
        self.category.parent_id == self.parent_id
            && self.category.name == self.name
            && self.category.full_name == self.full_name
            && self.category.depth == self.depth
    }

    /// The stored category with this step applied.
    pub fn updated(&self, now: DateTime<Utc>) -> Category {
        let mut category = self.category.clone();
        category.parent_id = self.parent_id;
        category.name = self.name.clone();
        category.full_name = self.full_name.clone();
        category.depth = self.depth;
        category.updated_at = now;
        category
    }
}

/// Every step of a cascade in pre-order: a parent always precedes its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
    steps: Vec<CascadeStep>,
}

impl CascadePlan {
    /// Plan placing `root` under `new_parent` as `new_name`, cascading full names
    /// and depths to every descendant returned by `children_of`.
    #[instrument(level = "trace", skip_all, fields(root = %root.id))]
    pub fn build<F, E>(
        rules: &TreeRules,
        root: &Category,
        new_name: &str,
        new_parent: Option<&Category>,
        mut children_of: F,
    ) -> Result<Self, E>
    where
        F: FnMut(CategoryId) -> Result<Vec<Category>, E>,
    {
        let mut steps = vec![CascadeStep {
            category: root.clone(),
            parent_id: new_parent.map(|p| p.id),
            name: new_name.to_string(),
            full_name: rules.join(new_parent.map(|p| p.full_name.as_str()), new_name),
            depth: new_parent.map(|p| p.depth + 1).unwrap_or(0),
        }];
        let mut seen = BTreeSet::from([root.id]);
        expand(rules, 0, &mut steps, &mut seen, &mut children_of)?;
        Ok(Self { steps })
    }

    pub fn root(&self) -> &CascadeStep {
        &self.steps[0]
    }

    pub fn steps(&self) -> &[CascadeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn ids(&self) -> BTreeSet<CategoryId> {
        self.steps.iter().map(CascadeStep::id).collect()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.steps.iter().any(|s| s.id() == id)
    }

    /// Steps that actually change something.
    pub fn changed(&self) -> impl Iterator<Item = &CascadeStep> {
        self.steps.iter().filter(|s| !s.is_noop())
    }

    /// Every step must respect the depth bound.
    pub fn check_depth(&self, rules: &TreeRules) -> DomainResult<()> {
        self.steps
            .iter()
            .try_for_each(|s| rules.check_depth(&s.full_name, s.depth))
    }
}

fn expand<F, E>(
    rules: &TreeRules,
    parent_idx: usize,
    steps: &mut Vec<CascadeStep>,
    seen: &mut BTreeSet<CategoryId>,
    children_of: &mut F,
) -> Result<(), E>
where
    F: FnMut(CategoryId) -> Result<Vec<Category>, E>,
{
    let (parent_id, parent_full_name, parent_depth) = {
        let parent = &steps[parent_idx];
        (parent.id(), parent.full_name.clone(), parent.depth)
    };
    for child in children_of(parent_id)? {
        if !seen.insert(child.id) {
            continue;
        }
        let name = child.name.clone();
        steps.push(CascadeStep {
            full_name: rules.join(Some(&parent_full_name), &name),
            parent_id: Some(parent_id),
            depth: parent_depth + 1,
            name,
            category: child,
        });
        let child_idx = steps.len() - 1;
        expand(rules, child_idx, steps, seen, children_of)?;
    }
    Ok(())
}

/// Writes handed to the store as one atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub upserts: Vec<Category>,
    pub deletes: Vec<(TenantId, CategoryId)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, category: Category) {
        self.upserts.push(category);
    }

    pub fn delete(&mut self, tenant: TenantId, id: CategoryId) {
        self.deletes.push((tenant, id));
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletes.len()
    }
}
