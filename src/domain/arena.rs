//! Arena-backed snapshot of a tenant's category tree
//!
//! Built from stored rows for traversal, invariant checks and display.

use std::collections::BTreeMap;
use std::fmt;

use generational_arena::{Arena, Index};
use termtree::Tree;
use tracing::instrument;

use crate::domain::{Category, CategoryId, TreeRules};

/// Forest node in the arena.
#[derive(Debug)]
pub struct ForestNode {
    pub category: Category,
    /// Index of parent node in the arena, None for roots and orphans
    pub parent: Option<Index>,
    /// Indices of child nodes, ordered by full name
    pub children: Vec<Index>,
}

/// Read-only, arena-backed snapshot of one tenant's categories.
///
/// Built from a flat list of categories; parent links are resolved by id.
/// Categories whose parent is missing from the list are kept as orphans
/// and reported by [`CategoryForest::verify`].
#[derive(Debug, Default)]
pub struct CategoryForest {
    arena: Arena<ForestNode>,
    roots: Vec<Index>,
    orphans: Vec<Index>,
    by_id: BTreeMap<CategoryId, Index>,
}

/// A broken tree invariant found by [`CategoryForest::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DepthMismatch {
        id: CategoryId,
        expected: u32,
        actual: u32,
    },
    FullNameMismatch {
        id: CategoryId,
        expected: String,
        actual: String,
    },
    DuplicateFullName {
        full_name: String,
        first: CategoryId,
        second: CategoryId,
    },
    DepthExceeded {
        id: CategoryId,
        depth: u32,
    },
    DanglingParent {
        id: CategoryId,
        parent: CategoryId,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DepthMismatch {
                id,
                expected,
                actual,
            } => write!(f, "{id}: depth {actual}, expected {expected}"),
            Violation::FullNameMismatch {
                id,
                expected,
                actual,
            } => write!(f, "{id}: full name {actual:?}, expected {expected:?}"),
            Violation::DuplicateFullName {
                full_name,
                first,
                second,
            } => write!(f, "{first} and {second} share full name {full_name:?}"),
            Violation::DepthExceeded { id, depth } => {
                write!(f, "{id}: depth {depth} exceeds the bound")
            }
            Violation::DanglingParent { id, parent } => {
                write!(f, "{id}: parent {parent} does not exist")
            }
        }
    }
}

impl CategoryForest {
    #[instrument(level = "trace", skip(categories))]
    pub fn from_categories(mut categories: Vec<Category>) -> Self {
        categories.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));

        let mut forest = Self::default();
        let mut ordered = Vec::with_capacity(categories.len());
        for category in categories {
            let id = category.id;
            let idx = forest.arena.insert(ForestNode {
                category,
                parent: None,
                children: Vec::new(),
            });
            forest.by_id.insert(id, idx);
            ordered.push(idx);
        }

        for idx in ordered {
            let parent_id = forest.arena.get(idx).and_then(|n| n.category.parent_id);
            match parent_id {
                None => forest.roots.push(idx),
                Some(pid) => match forest.by_id.get(&pid).copied() {
                    Some(parent_idx) => {
                        if let Some(node) = forest.arena.get_mut(idx) {
                            node.parent = Some(parent_idx);
                        }
                        if let Some(parent) = forest.arena.get_mut(parent_idx) {
                            parent.children.push(idx);
                        }
                    }
                    None => forest.orphans.push(idx),
                },
            }
        }
        forest
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn get_node(&self, idx: Index) -> Option<&ForestNode> {
        self.arena.get(idx)
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.by_id
            .get(&id)
            .and_then(|idx| self.arena.get(*idx))
            .map(|n| &n.category)
    }

    pub fn find_by_full_name(&self, full_name: &str) -> Option<&Category> {
        self.iter()
            .map(|(_, node)| &node.category)
            .find(|c| c.full_name == full_name)
    }

    /// Pre-order over every root, orphans last.
    pub fn iter(&self) -> ForestIterator<'_> {
        ForestIterator::new(self)
    }

    /// Post-order over every root, orphans last.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels of the tallest tree.
    #[instrument(level = "debug", skip(self))]
    pub fn height(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_height(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_height(&self, idx: Index) -> usize {
        match self.get_node(idx) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.calculate_height(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    /// Check every structural invariant; an empty result means the forest is sound.
    #[instrument(level = "debug", skip(self, rules))]
    pub fn verify(&self, rules: &TreeRules) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut names: BTreeMap<&str, CategoryId> = BTreeMap::new();

        for &idx in &self.orphans {
            if let Some(node) = self.get_node(idx) {
                if let Some(parent) = node.category.parent_id {
                    violations.push(Violation::DanglingParent {
                        id: node.category.id,
                        parent,
                    });
                }
            }
        }

        for (_, node) in self.iter() {
            let category = &node.category;
            let parent = node.parent.and_then(|p| self.get_node(p)).map(|p| &p.category);

            let expected_depth = parent.map(|p| p.depth + 1).unwrap_or(0);
            if category.depth != expected_depth {
                violations.push(Violation::DepthMismatch {
                    id: category.id,
                    expected: expected_depth,
                    actual: category.depth,
                });
            }
            if category.depth >= rules.max_depth {
                violations.push(Violation::DepthExceeded {
                    id: category.id,
                    depth: category.depth,
                });
            }

            let expected_name = rules.join(parent.map(|p| p.full_name.as_str()), &category.name);
            if category.full_name != expected_name {
                violations.push(Violation::FullNameMismatch {
                    id: category.id,
                    expected: expected_name,
                    actual: category.full_name.clone(),
                });
            }

            if let Some(first) = names.insert(&category.full_name, category.id) {
                violations.push(Violation::DuplicateFullName {
                    full_name: category.full_name.clone(),
                    first,
                    second: category.id,
                });
            }
        }
        violations
    }

    /// Render as a tree below a synthetic `label` root.
    pub fn to_tree(&self, label: &str) -> Tree<String> {
        let mut tree = Tree::new(label.to_string());
        for &root in self.roots.iter().chain(self.orphans.iter()) {
            tree.push(self.subtree(root));
        }
        tree
    }

    fn subtree(&self, idx: Index) -> Tree<String> {
        match self.get_node(idx) {
            Some(node) => {
                let c = &node.category;
                let label = format!("{} [{}] ({} entries)", c.name, c.id, c.entries_count);
                Tree::new(label).with_leaves(node.children.iter().map(|&i| self.subtree(i)))
            }
            None => Tree::new(String::new()),
        }
    }
}

pub struct ForestIterator<'a> {
    forest: &'a CategoryForest,
    stack: Vec<Index>,
}

impl<'a> ForestIterator<'a> {
    fn new(forest: &'a CategoryForest) -> Self {
        let stack = forest
            .roots
            .iter()
            .chain(forest.orphans.iter())
            .rev()
            .copied()
            .collect();
        Self { forest, stack }
    }
}

impl<'a> Iterator for ForestIterator<'a> {
    type Item = (Index, &'a ForestNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    forest: &'a CategoryForest,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(forest: &'a CategoryForest) -> Self {
        let stack = forest
            .roots
            .iter()
            .chain(forest.orphans.iter())
            .rev()
            .map(|&idx| (idx, false))
            .collect();
        Self { forest, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a ForestNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TenantId;

    fn category(id: u64, name: &str, full_name: &str, depth: u32, parent: Option<u64>) -> Category {
        let mut c = Category::new(CategoryId(id), TenantId(1));
        c.name = name.into();
        c.full_name = full_name.into();
        c.depth = depth;
        c.parent_id = parent.map(CategoryId);
        c
    }

    fn sample() -> CategoryForest {
        CategoryForest::from_categories(vec![
            category(3, "c", "a/b/c", 2, Some(2)),
            category(1, "a", "a", 0, None),
            category(4, "d", "a/d", 1, Some(1)),
            category(2, "b", "a/b", 1, Some(1)),
            category(5, "z", "z", 0, None),
        ])
    }

    fn ids<'a>(it: impl Iterator<Item = (Index, &'a ForestNode)>) -> Vec<u64> {
        it.map(|(_, n)| n.category.id.0).collect()
    }

    #[test]
    fn given_forest_when_iterating_then_visits_preorder_across_roots() {
        let forest = sample();
        assert_eq!(ids(forest.iter()), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn given_forest_when_iterating_postorder_then_children_come_first() {
        let forest = sample();
        assert_eq!(ids(forest.iter_postorder()), vec![3, 2, 4, 1, 5]);
    }

    #[test]
    fn given_forest_when_measuring_then_reports_height_and_lookups() {
        let forest = sample();

        assert_eq!(forest.len(), 5);
        assert_eq!(forest.height(), 3);
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(forest.find_by_full_name("a/b/c").map(|c| c.id), Some(CategoryId(3)));
        assert_eq!(forest.get(CategoryId(4)).map(|c| c.name.as_str()), Some("d"));
    }

    #[test]
    fn given_sound_forest_when_verifying_then_no_violations() {
        assert!(sample().verify(&TreeRules::default()).is_empty());
    }

    #[test]
    fn given_corrupted_forest_when_verifying_then_reports_each_violation() {
        let forest = CategoryForest::from_categories(vec![
            category(1, "a", "a", 0, None),
            category(2, "b", "stale/b", 3, Some(1)),
            category(3, "x", "x", 0, Some(99)),
            category(4, "a", "a", 0, None),
        ]);

        let violations = forest.verify(&TreeRules::default());

        assert!(violations.contains(&Violation::DanglingParent {
            id: CategoryId(3),
            parent: CategoryId(99),
        }));
        assert!(violations.contains(&Violation::DepthMismatch {
            id: CategoryId(2),
            expected: 1,
            actual: 3,
        }));
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::FullNameMismatch { id, .. } if *id == CategoryId(2)
        )));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DuplicateFullName { .. })));
    }

    #[test]
    fn given_forest_when_rendering_then_shows_nested_names() {
        let rendered = sample().to_tree("tenant 1").to_string();

        assert!(rendered.starts_with("tenant 1"));
        assert!(rendered.contains("c [3] (0 entries)"));
    }
}
