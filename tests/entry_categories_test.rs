//! Tests for EntryCategoryService

mod common;

use rstest::rstest;

use cattree::application::ApplicationError;
use cattree::domain::{DomainError, EntryRef};

use common::{full_names, harness, Harness, TENANT};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|n| n.to_string()).collect()
}

fn assign(h: &Harness, entry: &str, list: &[&str]) {
    h.container
        .entry_categories
        .assign_categories(TENANT, &EntryRef::new(entry), &names(list), true)
        .unwrap();
}

/// Every stored count must equal a full recount of its subtree.
fn assert_counts_match_recount(h: &Harness) {
    for category in h.container.tree.list(TENANT).unwrap() {
        let stored = category.entries_count;
        let recounted = h
            .container
            .tree
            .recount_entries(TENANT, category.id)
            .unwrap();
        assert_eq!(
            stored, recounted,
            "count of {} drifted from its subtree",
            category.full_name
        );
    }
}

#[test]
fn given_unknown_name_without_create_missing_when_assigning_then_fails() {
    // Arrange
    let h = harness();
    let entry = EntryRef::new("e1");

    // Act
    let result = h.container.entry_categories.assign_categories(
        TENANT,
        &entry,
        &names(&["Nope"]),
        false,
    );

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UnknownCategory(ref n))) if n == "Nope"
    ));
    assert!(h
        .container
        .entry_categories
        .categories_of(TENANT, &entry)
        .unwrap()
        .is_empty());
}

#[test]
fn given_create_missing_when_assigning_then_path_is_created_and_counted() {
    let h = harness();

    assign(&h, "e1", &["News/Sports"]);

    assert_eq!(full_names(&h, TENANT), vec!["News", "News/Sports"]);
    for category in h.container.tree.list(TENANT).unwrap() {
        assert_eq!(category.entries_count, 1, "{}", category.full_name);
    }
}

#[test]
fn given_parent_and_child_when_assigning_then_parent_counts_entry_once() {
    let h = harness();

    assign(&h, "e1", &["a", "a/b"]);

    let a = h.container.tree.find_by_full_name(TENANT, "a").unwrap().unwrap();
    let b = h.container.tree.find_by_full_name(TENANT, "a/b").unwrap().unwrap();
    assert_eq!(a.entries_count, 1);
    assert_eq!(b.entries_count, 1);
}

#[rstest]
#[case(&[], &["a/b"])]
#[case(&["a/b"], &["a/c"])]
#[case(&["a/b", "a/c"], &["a/b"])]
#[case(&["a", "a/b/c"], &["a/b"])]
#[case(&["a/b/c", "d"], &[])]
#[case(&["a/b", "d/e"], &["d", "a/c", "a/b/c"])]
fn given_membership_change_when_reassigning_then_counts_equal_full_recount(
    #[case] before: &[&str],
    #[case] after: &[&str],
) {
    // Arrange
    let h = harness();
    for path in ["a/b/c", "a/c", "d/e"] {
        h.container.tree.create_by_path(TENANT, path).unwrap();
    }
    assign(&h, "other", &["a/b", "d"]);
    assign(&h, "e1", before);

    // Act
    assign(&h, "e1", after);

    // Assert
    assert_counts_match_recount(&h);
    let mut current: Vec<String> = h
        .container
        .entry_categories
        .categories_of(TENANT, &EntryRef::new("e1"))
        .unwrap()
        .into_iter()
        .map(|c| c.full_name)
        .collect();
    current.sort();
    let mut expected = names(after);
    expected.sort();
    assert_eq!(current, expected);
}

#[test]
fn given_concurrent_assignments_of_one_entry_when_assigning_then_counted_once() {
    // Arrange
    let h = harness();
    let b = h.container.tree.create_by_path(TENANT, "a/b").unwrap();
    let a = h.container.tree.get(TENANT, b.parent_id.unwrap()).unwrap();
    let rounds = 50;

    // Act
    for round in 0..rounds {
        let entry = EntryRef::new(format!("e{round}"));
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    h.container
                        .entry_categories
                        .assign_categories(TENANT, &entry, &names(&["a/b"]), false)
                        .unwrap();
                });
            }
        });
    }

    // Assert
    let count_of = |id| h.container.tree.get(TENANT, id).unwrap().entries_count;
    assert_eq!(count_of(b.id), rounds);
    assert_eq!(count_of(a.id), rounds);
    assert_counts_match_recount(&h);
}

#[test]
fn given_blank_names_when_assigning_then_they_are_ignored() {
    let h = harness();

    let ids = h
        .container
        .entry_categories
        .assign_categories(TENANT, &EntryRef::new("e1"), &names(&["  ", "a"]), true)
        .unwrap();

    assert_eq!(ids.len(), 1);
    assert_eq!(full_names(&h, TENANT), vec!["a"]);
}

#[test]
fn given_same_assignment_twice_when_assigning_then_counts_stay() {
    let h = harness();
    assign(&h, "e1", &["a/b"]);

    assign(&h, "e1", &["a/b"]);

    let a = h.container.tree.find_by_full_name(TENANT, "a").unwrap().unwrap();
    assert_eq!(a.entries_count, 1);
}

#[test]
fn given_deleted_category_when_listing_entry_categories_then_entry_moved_to_parent() {
    let h = harness();
    assign(&h, "e1", &["a/b"]);
    let b = h.container.tree.find_by_full_name(TENANT, "a/b").unwrap().unwrap();

    h.container
        .tree
        .delete(TENANT, b.id, Default::default())
        .unwrap();

    let categories = h
        .container
        .entry_categories
        .categories_of(TENANT, &EntryRef::new("e1"))
        .unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].full_name, "a");
    assert_counts_match_recount(&h);
}
