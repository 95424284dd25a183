//! Integration tests for FileRegistry against real files.
//!
//! These tests exercise the registry through the `TagRegistry` trait, the
//! way the session layer uses it, and inspect the resulting file contents.

use badgegate_core::{HolderName, TagId};
use badgegate_storage::{FileRegistry, StorageError, TagRegistry};
use proptest::prelude::*;
use rstest::rstest;
use tempfile::TempDir;

fn tag(s: &str) -> TagId {
    TagId::new(s).unwrap()
}

fn name(s: &str) -> HolderName {
    HolderName::new(s).unwrap()
}

async fn registry_in(dir: &TempDir) -> FileRegistry {
    FileRegistry::open(dir.path().join("tags.db")).await.unwrap()
}

fn contents(registry: &FileRegistry) -> String {
    std::fs::read_to_string(registry.path()).unwrap()
}

#[tokio::test]
async fn test_lookup_after_upsert_returns_latest_name() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let alice = tag("AAAAAAAAAAAA");

    let written = registry.upsert(&alice, &name("Alice")).await.unwrap();
    let found = registry.lookup(&alice).await.unwrap().unwrap();
    assert_eq!(found, written);

    registry.upsert(&alice, &name("Alice Cooper")).await.unwrap();
    let found = registry.lookup(&alice).await.unwrap().unwrap();
    assert_eq!(found.tag_id, alice);
    assert_eq!(found.holder_name.as_str(), "Alice Cooper");
}

#[tokio::test]
async fn test_lookup_normalizes_lowercase_tag() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    registry
        .upsert(&tag("0415ab12cd34"), &name("Carol"))
        .await
        .unwrap();

    let found = registry.lookup(&tag("0415AB12CD34")).await.unwrap();
    assert_eq!(found.unwrap().holder_name.as_str(), "Carol");
}

#[tokio::test]
async fn test_delete_then_lookup_is_none() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let bob = tag("BBBBBBBBBBBB");

    registry.upsert(&bob, &name("Bob")).await.unwrap();
    assert!(registry.delete(&bob).await.unwrap());
    assert_eq!(registry.lookup(&bob).await.unwrap(), None);
}

#[tokio::test]
async fn test_delete_only_record_leaves_empty_file() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;
    let bob = tag("BBBBBBBBBBBB");

    registry.upsert(&bob, &name("Bob")).await.unwrap();
    assert!(registry.delete(&bob).await.unwrap());

    assert!(registry.path().exists());
    assert_eq!(contents(&registry), "");
}

#[tokio::test]
async fn test_delete_missing_key_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    registry
        .upsert(&tag("AAAAAAAAAAAA"), &name("Alice"))
        .await
        .unwrap();
    let before = contents(&registry);
    let modified = std::fs::metadata(registry.path())
        .unwrap()
        .modified()
        .unwrap();

    assert!(!registry.delete(&tag("ZZZZZZZZZZZZ")).await.unwrap());

    assert_eq!(contents(&registry), before);
    let after = std::fs::metadata(registry.path())
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(after, modified);
    assert!(!registry.temp_path().exists());
}

#[tokio::test]
async fn test_delete_compacts_middle_record() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    for (t, n) in [
        ("AAAAAAAAAAAA", "Alice"),
        ("BBBBBBBBBBBB", "Bob"),
        ("CCCCCCCCCCCC", "Carol"),
    ] {
        registry.upsert(&tag(t), &name(n)).await.unwrap();
    }

    assert!(registry.delete(&tag("BBBBBBBBBBBB")).await.unwrap());

    let names: Vec<_> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.holder_name.as_str().to_owned())
        .collect();
    assert_eq!(names, ["Alice", "Carol"]);
    assert_eq!(contents(&registry).lines().count(), 2);
}

#[tokio::test]
async fn test_modified_record_is_rewritten_last() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    registry
        .upsert(&tag("AAAAAAAAAAAA"), &name("Alice"))
        .await
        .unwrap();
    registry
        .upsert(&tag("BBBBBBBBBBBB"), &name("Bob"))
        .await
        .unwrap();
    registry
        .upsert(&tag("AAAAAAAAAAAA"), &name("Alicia"))
        .await
        .unwrap();

    let text = contents(&registry);
    let keys: Vec<_> = text.lines().map(|line| &line[..12]).collect();
    assert_eq!(keys, ["BBBBBBBBBBBB", "AAAAAAAAAAAA"]);
    assert!(text.lines().nth(1).unwrap().starts_with("AAAAAAAAAAAA|Alicia|"));

    let listed: Vec<_> = registry
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.tag_id.as_str().to_owned())
        .collect();
    assert_eq!(listed, ["BBBBBBBBBBBB", "AAAAAAAAAAAA"]);
}

#[tokio::test]
async fn test_file_is_sequence_of_terminated_records() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    registry
        .upsert(&tag("AAAAAAAAAAAA"), &name("Alice"))
        .await
        .unwrap();
    registry
        .upsert(&tag("BBBBBBBBBBBB"), &name("Bob"))
        .await
        .unwrap();

    let text = contents(&registry);
    assert!(text.ends_with('\n'));
    for line in text.lines() {
        let (key, rest) = line.split_at(12);
        assert!(key.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert!(rest.starts_with('|'));
        let timestamp = rest.rsplit('|').next().unwrap();
        assert_eq!(timestamp.len(), 18);
    }
}

#[tokio::test]
async fn test_rewrite_leaves_no_scratch_file() {
    let dir = TempDir::new().unwrap();
    let registry = registry_in(&dir).await;

    registry
        .upsert(&tag("AAAAAAAAAAAA"), &name("Alice"))
        .await
        .unwrap();

    assert!(!registry.temp_path().exists());
}

#[tokio::test]
async fn test_first_write_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let registry = FileRegistry::new(dir.path().join("missing/tags.db"));

    registry
        .upsert(&tag("AAAAAAAAAAAA"), &name("Alice"))
        .await
        .unwrap();
    assert_eq!(registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unwritable_location_is_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let registry = FileRegistry::new(blocker.join("tags.db"));

    let result = registry.upsert(&tag("AAAAAAAAAAAA"), &name("Alice")).await;
    assert!(matches!(result, Err(StorageError::Io { .. })));
}

#[rstest]
#[case::short_line("AAAA\n", 1)]
#[case::bad_timestamp("AAAAAAAAAAAA|Alice|18-Oct-26 09:41:07\nBBBBBBBBBBBB|Bob|not a timestamp!!!\n", 2)]
#[case::missing_separator("AAAAAAAAAAAA Alice 18-Oct-26 09:41:07\n", 1)]
#[tokio::test]
async fn test_list_reports_malformed_line(#[case] text: &str, #[case] expected_line: usize) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tags.db");
    std::fs::write(&path, text).unwrap();

    let registry = FileRegistry::new(&path);
    match registry.list().await {
        Err(StorageError::MalformedRecord { line, .. }) => assert_eq!(line, expected_line),
        other => panic!("expected MalformedRecord, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_file_is_not_rewritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tags.db");
    std::fs::write(&path, "AAAA\n").unwrap();

    let registry = FileRegistry::new(&path);
    assert!(
        registry
            .upsert(&tag("BBBBBBBBBBBB"), &name("Bob"))
            .await
            .is_err()
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "AAAA\n");
}

#[derive(Debug, Clone)]
enum Op {
    Upsert(usize, String),
    Delete(usize),
}

const KEYS: [&str; 4] = ["AAAAAAAAAAAA", "BBBBBBBBBBBB", "CCCCCCCCCCCC", "0415AB12CD34"];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KEYS.len(), "[A-Za-z][A-Za-z ]{0,15}").prop_map(|(k, n)| Op::Upsert(k, n)),
        (0..KEYS.len()).prop_map(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any sequence of mutations keeps one record per key and agrees with
    /// a simple in-memory model.
    #[test]
    fn prop_registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let dir = TempDir::new().unwrap();
            let registry = registry_in(&dir).await;
            let mut model: std::collections::HashMap<usize, String> = Default::default();

            for op in ops {
                match op {
                    Op::Upsert(k, n) => {
                        let holder = name(&n);
                        registry.upsert(&tag(KEYS[k]), &holder).await.unwrap();
                        model.insert(k, holder.as_str().to_owned());
                    }
                    Op::Delete(k) => {
                        let removed = registry.delete(&tag(KEYS[k])).await.unwrap();
                        assert_eq!(removed, model.remove(&k).is_some());
                    }
                }
            }

            let records = registry.list().await.unwrap();
            assert_eq!(records.len(), model.len());

            for (k, key) in KEYS.iter().enumerate() {
                let found = registry.lookup(&tag(key)).await.unwrap();
                assert_eq!(
                    found.map(|r| r.holder_name.as_str().to_owned()),
                    model.get(&k).cloned()
                );
            }
        });
    }
}
