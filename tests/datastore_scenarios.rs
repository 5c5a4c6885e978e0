//! End-to-end datastore scenarios through the public facade

use treestore::testing;
use treestore::{Node, StoreType};

const CFG: StoreType = StoreType::Configuration;

#[test]
fn test_write_and_read_top_container() {
    let store = testing::store();
    let node = testing::top_with_lists(3, 2);

    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &node).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    assert_eq!(read.read(CFG, &testing::top_path()).unwrap(), Some(node));
}

#[test]
fn test_read_nonexistent_is_none() {
    let store = testing::store();
    let read = store.new_read_transaction().unwrap();
    assert_eq!(read.read(CFG, &testing::top_path()).unwrap(), None);
    assert_eq!(read.read(CFG, &testing::entry_path("test-0")).unwrap(), None);
    assert_eq!(
        read.read(CFG, &testing::nested_entry_path("test-0", "nest-test-0"))
            .unwrap(),
        None
    );
}

#[test]
fn test_read_selects_one_entry() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(3, 2))
        .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let entry = read
        .read(CFG, &testing::entry_path("test-1"))
        .unwrap()
        .unwrap();
    assert_eq!(
        entry.child("name").unwrap().as_leaf().unwrap().as_str(),
        Some("test-1")
    );
    assert_eq!(entry.child("nested-list").unwrap().as_list().unwrap().len(), 2);

    let nested = read
        .read(CFG, &testing::nested_entry_path("test-1", "nest-test-1"))
        .unwrap()
        .unwrap();
    assert_eq!(nested, testing::nested_entry("nest-test-1"));
}

#[test]
fn test_put_entry_into_empty_store_creates_document() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(
        CFG,
        &testing::entry_path("test-0"),
        &testing::list_entry("test-0"),
    )
    .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let entry = read
        .read(CFG, &testing::entry_path("test-0"))
        .unwrap()
        .unwrap();
    assert_eq!(entry, testing::list_entry("test-0"));

    // The surrounding structure was created on the way down.
    let top = read.read(CFG, &testing::top_path()).unwrap().unwrap();
    assert_eq!(top.child("top-level-list").unwrap().as_list().unwrap().len(), 1);
}

#[test]
fn test_put_nested_entry_without_parent_fails_at_commit() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(
        CFG,
        &testing::nested_entry_path("test-0", "nest-test-0"),
        &testing::nested_entry("nest-test-0"),
    )
    .unwrap();

    // The filtered update has no parent list to select into; the commit
    // fails instead of reporting a write that stored nothing.
    let err = tx.commit().unwrap_err();
    assert!(matches!(err, treestore::StoreError::Storage(_)));

    let read = store.new_read_transaction().unwrap();
    assert_eq!(read.read(CFG, &testing::top_path()).unwrap(), None);
}

#[test]
fn test_put_existing_entry_appends_duplicate() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(
        CFG,
        &testing::entry_path("test-0"),
        &testing::list_entry("test-0"),
    )
    .unwrap();
    tx.commit().unwrap();

    let mut tx = store.new_write_transaction().unwrap();
    tx.put(
        CFG,
        &testing::entry_path("test-0"),
        &testing::list_entry("test-0"),
    )
    .unwrap();
    tx.commit().unwrap();

    // Put appends without looking for an entry with the same keys, so the
    // list now holds two entries with identical keys.
    let read = store.new_read_transaction().unwrap();
    let list = read
        .read(CFG, &testing::top_path().node("top-level-list"))
        .unwrap()
        .unwrap();
    assert_eq!(list.as_list().unwrap().len(), 2);
}

#[test]
fn test_delete_entry_is_idempotent() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(2, 0))
        .unwrap();
    tx.commit().unwrap();

    let mut tx = store.new_write_transaction().unwrap();
    tx.delete(CFG, &testing::entry_path("test-0")).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    assert_eq!(read.read(CFG, &testing::entry_path("test-0")).unwrap(), None);
    assert!(read.read(CFG, &testing::entry_path("test-1")).unwrap().is_some());
    drop(read);

    // Deleting again changes nothing and does not fail.
    let mut tx = store.new_write_transaction().unwrap();
    tx.delete(CFG, &testing::entry_path("test-0")).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let list = read
        .read(CFG, &testing::top_path().node("top-level-list"))
        .unwrap()
        .unwrap();
    assert_eq!(list.as_list().unwrap().len(), 1);
}

#[test]
fn test_delete_nested_entry_through_array_filter() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(2, 2))
        .unwrap();
    tx.commit().unwrap();

    let mut tx = store.new_write_transaction().unwrap();
    tx.delete(CFG, &testing::nested_entry_path("test-1", "nest-test-0"))
        .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    assert_eq!(
        read.read(CFG, &testing::nested_entry_path("test-1", "nest-test-0"))
            .unwrap(),
        None
    );
    // Only the addressed entry's nested list shrank.
    assert!(read
        .read(CFG, &testing::nested_entry_path("test-0", "nest-test-0"))
        .unwrap()
        .is_some());
    assert!(read
        .read(CFG, &testing::nested_entry_path("test-1", "nest-test-1"))
        .unwrap()
        .is_some());
}

#[test]
fn test_delete_leaf_under_entry() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(1, 1))
        .unwrap();
    tx.commit().unwrap();

    let path = testing::entry_path("test-0").node("nested-list");
    let mut tx = store.new_write_transaction().unwrap();
    tx.delete(CFG, &path).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let entry = read
        .read(CFG, &testing::entry_path("test-0"))
        .unwrap()
        .unwrap();
    assert!(entry.child("nested-list").is_none());
    assert!(entry.child("name").is_some());
}

#[test]
fn test_merge_adds_list_entry() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(1, 0))
        .unwrap();
    tx.commit().unwrap();

    let incoming = Node::container([(
        "top-level-list",
        Node::list([testing::list_entry("test-9")]),
    )]);
    let mut tx = store.new_write_transaction().unwrap();
    tx.merge(CFG, &testing::top_path(), &incoming).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let top = read.read(CFG, &testing::top_path()).unwrap().unwrap();
    assert_eq!(top.child("top-level-list").unwrap().as_list().unwrap().len(), 2);
    // Fields the merge did not mention survive.
    assert!(top.child("top-level-leaf-list").is_some());
}

#[test]
fn test_merge_into_entry_combines_fields() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(1, 1))
        .unwrap();
    tx.commit().unwrap();

    let incoming = Node::container([
        ("name", Node::leaf("test-0")),
        ("simple", Node::leaf("simple-value")),
    ]);
    let mut tx = store.new_write_transaction().unwrap();
    tx.merge(CFG, &testing::entry_path("test-0"), &incoming)
        .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let entry = read
        .read(CFG, &testing::entry_path("test-0"))
        .unwrap()
        .unwrap();
    assert_eq!(
        entry.child("simple").unwrap().as_leaf().unwrap().as_str(),
        Some("simple-value")
    );
    // The nested list from the earlier put is still there.
    assert_eq!(entry.child("nested-list").unwrap().as_list().unwrap().len(), 1);

    let list = read
        .read(CFG, &testing::top_path().node("top-level-list"))
        .unwrap()
        .unwrap();
    assert_eq!(list.as_list().unwrap().len(), 1);
}

#[test]
fn test_merge_keyed_to_one_entry_leaves_others_alone() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(2, 1))
        .unwrap();
    tx.commit().unwrap();

    let incoming = Node::container([
        ("name", Node::leaf("test-0")),
        ("simple", Node::leaf("merged")),
    ]);
    let mut tx = store.new_write_transaction().unwrap();
    tx.merge(CFG, &testing::entry_path("test-0"), &incoming)
        .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let untouched = read
        .read(CFG, &testing::entry_path("test-1"))
        .unwrap()
        .unwrap();
    assert!(untouched.child("simple").is_none());
    assert_eq!(untouched.child("nested-list").unwrap().as_list().unwrap().len(), 1);
}

#[test]
fn test_merge_of_larger_list_unions_and_appends() {
    let store = testing::store();
    let initial = Node::container([(
        "top-level-list",
        Node::list([
            Node::container([
                ("name", Node::leaf("test-0")),
                ("simple", Node::leaf("old")),
            ]),
            testing::list_entry("test-1"),
        ]),
    )]);
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &initial).unwrap();
    tx.commit().unwrap();

    let incoming = Node::container([(
        "top-level-list",
        Node::list([
            Node::container([
                ("name", Node::leaf("test-0")),
                ("simple", Node::leaf("new")),
            ]),
            Node::container([
                ("name", Node::leaf("test-1")),
                ("nested-list", Node::list([testing::nested_entry("nest-test-0")])),
            ]),
            testing::list_entry("test-2"),
        ]),
    )]);
    let mut tx = store.new_write_transaction().unwrap();
    tx.merge(CFG, &testing::top_path(), &incoming).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let list = read
        .read(CFG, &testing::top_path().node("top-level-list"))
        .unwrap()
        .unwrap();
    let entries = list.as_list().unwrap().to_vec();
    assert_eq!(entries.len(), 3);
    // Conflicting scalar overwritten by the incoming value.
    assert_eq!(
        entries[0].child("simple").unwrap().as_leaf().unwrap().as_str(),
        Some("new")
    );
    // New field unioned into the second entry.
    assert_eq!(
        entries[1].child("nested-list").unwrap().as_list().unwrap().len(),
        1
    );
    // Unknown key appended.
    assert_eq!(
        entries[2].child("name").unwrap().as_leaf().unwrap().as_str(),
        Some("test-2")
    );
}

#[test]
fn test_merge_into_absent_target_is_noop() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.merge(
        CFG,
        &testing::top_path(),
        &testing::top_with_lists(1, 0),
    )
    .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    assert_eq!(read.read(CFG, &testing::top_path()).unwrap(), None);
}

#[test]
fn test_merge_rejected_payload_is_noop() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(1, 0))
        .unwrap();
    tx.commit().unwrap();

    let bogus = Node::container([("no-such-child", Node::leaf(1))]);
    let mut tx = store.new_write_transaction().unwrap();
    tx.merge(CFG, &testing::top_path(), &bogus).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let top = read.read(CFG, &testing::top_path()).unwrap().unwrap();
    assert_eq!(top, testing::top_with_lists(1, 0));
}

#[test]
fn test_choice_case_children_roundtrip() {
    let store = testing::store();
    let path = treestore::Path::top(testing::MODULE_NAME, "choice-container");
    let node = Node::container([
        ("extended-id", Node::leaf(7)),
        ("extended-name", Node::leaf("seven")),
    ]);

    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &path, &node).unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    assert_eq!(read.read(CFG, &path).unwrap(), Some(node));
}

#[test]
fn test_unknown_child_is_rejected() {
    let store = testing::store();
    let node = Node::container([("not-in-schema", Node::leaf(1))]);
    let mut tx = store.new_write_transaction().unwrap();
    let err = tx.put(CFG, &testing::top_path(), &node).unwrap_err();
    assert!(matches!(err, treestore::StoreError::SchemaMismatch(_)));
    tx.cancel().unwrap();
}

#[test]
fn test_multiple_writes_commit_atomically() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(1, 0))
        .unwrap();
    tx.put(
        CFG,
        &testing::entry_path("test-5"),
        &testing::list_entry("test-5"),
    )
    .unwrap();
    tx.delete(CFG, &testing::top_path().node("top-level-leaf-list"))
        .unwrap();

    // Nothing is visible to a concurrent reader before commit.
    let other = store.new_read_transaction().unwrap();
    assert_eq!(other.read(CFG, &testing::top_path()).unwrap(), None);
    drop(other);

    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let top = read.read(CFG, &testing::top_path()).unwrap().unwrap();
    assert_eq!(top.child("top-level-list").unwrap().as_list().unwrap().len(), 2);
    assert!(top.child("top-level-leaf-list").is_none());
}

#[test]
fn test_operational_and_configuration_are_independent() {
    let store = testing::store();
    let mut tx = store.new_write_transaction().unwrap();
    tx.put(CFG, &testing::top_path(), &testing::top_with_lists(1, 0))
        .unwrap();
    tx.put(
        StoreType::Operational,
        &testing::top_path(),
        &testing::top_with_lists(2, 0),
    )
    .unwrap();
    tx.commit().unwrap();

    let read = store.new_read_transaction().unwrap();
    let cfg = read.read(CFG, &testing::top_path()).unwrap().unwrap();
    let oper = read
        .read(StoreType::Operational, &testing::top_path())
        .unwrap()
        .unwrap();
    assert_eq!(cfg.child("top-level-list").unwrap().as_list().unwrap().len(), 1);
    assert_eq!(oper.child("top-level-list").unwrap().as_list().unwrap().len(), 2);
}
