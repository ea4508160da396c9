use super::*;

async fn staged() -> SyncEngine<MemoryStore> {
    engine_with(
        [
            ("a.txt", &b"a"[..]),
            ("docs/b.txt", &b"b"[..]),
            ("out/.gitkeep", &b""[..]),
        ],
        &[&[], &["docs"]],
        MoveOrder::CopyFirst,
    )
    .await
}

#[tokio::test]
async fn mixed_paste_ending_in_move_clears_clipboard() {
    let mut engine = staged().await;
    engine
        .clipboard_add(&Location::root(), "a.txt", TransferMode::Copy)
        .unwrap();
    engine
        .clipboard_add(&loc(&["docs"]), "b.txt", TransferMode::Move)
        .unwrap();

    let report = engine.paste(&loc(&["out"])).await;

    assert_eq!(report.completed.len(), 2);
    assert!(report.failed.is_empty());
    assert!(report.cleared);
    assert!(engine.clipboard().is_empty());
    assert!(engine.store().has("a.txt"));
    assert!(engine.store().has("out/a.txt"));
    assert!(!engine.store().has("docs/b.txt"));
    assert!(engine.store().has("out/b.txt"));
    assert_eq!(names(&engine, &loc(&["out"])), vec!["a.txt", "b.txt"]);
    assert!(names(&engine, &loc(&["docs"])).is_empty());
}

#[tokio::test]
async fn copy_paste_keeps_clipboard_for_reuse() {
    let mut engine = staged().await;
    engine
        .clipboard_add(&Location::root(), "a.txt", TransferMode::Copy)
        .unwrap();

    let report = engine.paste(&loc(&["out"])).await;
    assert!(!report.cleared);
    assert_eq!(engine.clipboard().len(), 1);

    let report = engine.paste(&loc(&["docs"])).await;
    assert_eq!(report.completed.len(), 1);
    assert!(engine.store().has("docs/a.txt"));
}

#[tokio::test]
async fn move_paste_reports_failures_and_still_clears() {
    let mut engine = staged().await;
    engine.store().fail(Op::Put, "out/a.txt");
    engine
        .clipboard_add(&Location::root(), "a.txt", TransferMode::Move)
        .unwrap();
    engine
        .clipboard_add(&loc(&["docs"]), "b.txt", TransferMode::Move)
        .unwrap();

    let report = engine.paste(&loc(&["out"])).await;

    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].name, "b.txt");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.name, "a.txt");
    assert_eq!(report.failed[0].1.kind(), ErrorKind::Remote);
    assert!(report.cleared);
    assert!(engine.clipboard().is_empty());
    assert!(engine.store().has("a.txt"));
}

#[tokio::test]
async fn completed_move_entry_leaves_clipboard_before_paste_ends() {
    let mut engine = staged().await;
    engine
        .clipboard_add(&loc(&["docs"]), "b.txt", TransferMode::Move)
        .unwrap();

    engine
        .transfer(&loc(&["docs"]), "b.txt", &loc(&["out"]), TransferMode::Move)
        .await
        .unwrap();

    assert!(engine.clipboard().is_empty());
}

#[tokio::test]
async fn empty_clipboard_paste_does_nothing() {
    let mut engine = staged().await;

    let report = engine.paste(&loc(&["out"])).await;

    assert!(report.completed.is_empty() && report.failed.is_empty());
    assert!(!report.cleared);
    assert!(mutations(&engine).is_empty());
}

#[tokio::test]
async fn clipboard_only_accepts_cached_entries() {
    let mut engine = staged().await;

    let err = engine
        .clipboard_add(&Location::root(), "ghost.txt", TransferMode::Copy)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(engine.clipboard().is_empty());
}

#[tokio::test]
async fn cut_then_navigate_up_then_paste_moves_entry() {
    let mut engine = engine_with(
        [("docs/b.txt", &b"b"[..]), ("out/.gitkeep", &b""[..])],
        &[&[], &["docs"]],
        MoveOrder::CopyFirst,
    )
    .await;
    engine
        .clipboard_add(&loc(&["docs"]), "b.txt", TransferMode::Move)
        .unwrap();

    engine.list_directory(&Location::root()).await.unwrap();
    engine.list_directory(&loc(&["out"])).await.unwrap();
    let report = engine.paste(&loc(&["out"])).await;

    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(report.completed.len(), 1);
    assert!(!engine.store().has("docs/b.txt"));
    assert!(engine.store().has("out/b.txt"));
    assert_eq!(names(&engine, &loc(&["out"])), vec!["b.txt"]);
    assert!(names(&engine, &loc(&["docs"])).is_empty());
}

#[tokio::test]
async fn failed_move_after_navigation_is_reported_and_cleared() {
    let mut engine = engine_with(
        [("docs/b.txt", &b"b"[..]), ("out/.gitkeep", &b""[..])],
        &[&[], &["docs"]],
        MoveOrder::CopyFirst,
    )
    .await;
    engine
        .clipboard_add(&loc(&["docs"]), "b.txt", TransferMode::Move)
        .unwrap();
    engine.list_directory(&Location::root()).await.unwrap();
    engine.list_directory(&loc(&["out"])).await.unwrap();
    engine.store().fail(Op::Get, "docs/b.txt");

    let report = engine.paste(&loc(&["out"])).await;

    assert!(report.completed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.name, "b.txt");
    assert_eq!(report.failed[0].1.kind(), ErrorKind::Remote);
    assert!(report.cleared);
    assert!(engine.clipboard().is_empty());
    assert!(engine.store().has("docs/b.txt"));
    assert!(!engine.store().has("out/b.txt"));
}

#[tokio::test]
async fn paste_ending_in_copy_keeps_copies_and_drops_done_moves() {
    let mut engine = staged().await;
    engine
        .clipboard_add(&loc(&["docs"]), "b.txt", TransferMode::Move)
        .unwrap();
    engine
        .clipboard_add(&Location::root(), "a.txt", TransferMode::Copy)
        .unwrap();

    let report = engine.paste(&loc(&["out"])).await;

    assert_eq!(report.completed.len(), 2);
    assert!(!report.cleared);
    let queued: Vec<_> = engine
        .clipboard()
        .entries()
        .iter()
        .map(|entry| (entry.name.as_str(), entry.mode))
        .collect();
    assert_eq!(queued, vec![("a.txt", TransferMode::Copy)]);
}
