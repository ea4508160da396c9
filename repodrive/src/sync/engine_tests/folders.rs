use super::*;

fn numbered_docs() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("docs/1.txt", &b"one"[..]),
        ("docs/2.txt", &b"two"[..]),
        ("docs/3.txt", &b"three"[..]),
        ("keep.txt", &b"k"[..]),
    ]
}

#[tokio::test]
async fn folder_rename_relocates_all_files() {
    let mut engine = engine_with(numbered_docs(), &[&[]], MoveOrder::CopyFirst).await;

    engine.rename(&Location::root(), "docs", "papers").await.unwrap();

    assert_eq!(
        engine.store().paths(),
        vec![
            "keep.txt",
            "papers/.gitkeep",
            "papers/1.txt",
            "papers/2.txt",
            "papers/3.txt",
        ]
    );
    assert_eq!(engine.store().bytes("papers/3.txt").unwrap(), b"three");
    assert_eq!(names(&engine, &Location::root()), vec!["papers", "keep.txt"]);
    assert_eq!(
        names(&engine, &loc(&["papers"])),
        vec!["1.txt", "2.txt", "3.txt"]
    );
}

#[tokio::test]
async fn interrupted_folder_rename_leaves_processed_files_moved() {
    let mut engine = engine_with(numbered_docs(), &[&[]], MoveOrder::CopyFirst).await;
    engine.store().fail(Op::Put, "papers/2.txt");

    let err = engine
        .rename(&Location::root(), "docs", "papers")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(
        engine.store().paths(),
        vec![
            "docs/2.txt",
            "docs/3.txt",
            "keep.txt",
            "papers/.gitkeep",
            "papers/1.txt",
        ]
    );
    // Cache still shows the folder under its old name until the next listing.
    assert_eq!(names(&engine, &Location::root()), vec!["docs", "keep.txt"]);

    engine.list_directory(&Location::root()).await.unwrap();
    assert_eq!(
        names(&engine, &Location::root()),
        vec!["docs", "papers", "keep.txt"]
    );
}

#[tokio::test]
async fn folder_rename_carries_placeholder() {
    let mut engine = engine_with(
        [("empty/.gitkeep", &b""[..])],
        &[&[]],
        MoveOrder::DeleteFirst,
    )
    .await;

    engine.rename(&Location::root(), "empty", "still-empty").await.unwrap();

    assert_eq!(engine.store().paths(), vec!["still-empty/.gitkeep"]);
}

#[tokio::test]
async fn file_rename_is_copy_then_delete() {
    let mut engine = engine_with([("a.txt", &b"a"[..])], &[&[]], MoveOrder::DeleteFirst).await;

    engine.rename(&Location::root(), "a.txt", "b.txt").await.unwrap();

    assert_eq!(
        mutations(&engine),
        vec![
            (Op::Get, "a.txt".to_string()),
            (Op::Put, "b.txt".to_string()),
            (Op::Delete, "a.txt".to_string()),
        ]
    );
    assert_eq!(names(&engine, &Location::root()), vec!["b.txt"]);
}

#[tokio::test]
async fn rename_onto_existing_name_fails() {
    let mut engine = engine_with(
        [("a.txt", &b"a"[..]), ("b.txt", &b"b"[..])],
        &[&[]],
        MoveOrder::CopyFirst,
    )
    .await;

    let err = engine
        .rename(&Location::root(), "a.txt", "b.txt")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(mutations(&engine).is_empty());
}

#[tokio::test]
async fn rename_to_same_name_is_a_no_op() {
    let mut engine = engine_with([("a.txt", &b"a"[..])], &[&[]], MoveOrder::CopyFirst).await;

    engine.rename(&Location::root(), "a.txt", "a.txt").await.unwrap();

    assert!(mutations(&engine).is_empty());
}

#[tokio::test]
async fn folder_delete_removes_every_object_below_it() {
    let mut engine = engine_with(
        [
            ("docs/.gitkeep", &b""[..]),
            ("docs/a.txt", &b""[..]),
            ("docs/sub/.gitkeep", &b""[..]),
            ("docs/sub/b.txt", &b""[..]),
            ("docsish.txt", &b""[..]),
        ],
        &[&[]],
        MoveOrder::CopyFirst,
    )
    .await;

    engine.delete(&Location::root(), "docs").await.unwrap();

    assert_eq!(engine.store().paths(), vec!["docsish.txt"]);
    assert_eq!(engine.store().count(Op::Delete), 4);
    assert_eq!(names(&engine, &Location::root()), vec!["docsish.txt"]);
}

#[tokio::test]
async fn file_delete_updates_cache() {
    let mut engine = engine_with(
        [("a.txt", &b""[..]), ("b.txt", &b""[..])],
        &[&[]],
        MoveOrder::CopyFirst,
    )
    .await;

    engine.delete(&Location::root(), "a.txt").await.unwrap();

    assert_eq!(engine.store().paths(), vec!["b.txt"]);
    assert_eq!(names(&engine, &Location::root()), vec!["b.txt"]);
}

#[tokio::test]
async fn failed_delete_keeps_cache_entry() {
    let mut engine = engine_with([("a.txt", &b""[..])], &[&[]], MoveOrder::CopyFirst).await;
    engine.store().fail(Op::Delete, "a.txt");

    engine.delete(&Location::root(), "a.txt").await.unwrap_err();

    assert_eq!(names(&engine, &Location::root()), vec!["a.txt"]);
}
