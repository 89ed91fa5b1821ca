use domains::{Denial, DomainError, PostStore, SearchIndex};
use integration_tests::{anon, board, harness, moderator, text};

#[tokio::test]
async fn closed_threads_reject_replies_until_reopened() {
    let h = harness(vec![board("b", |_| {})]);
    let mod_b = moderator(&h.users, 1, &["b"]);
    let ip = anon("10.0.0.1");
    let t = h.engine.create_thread("b", &ip, text("op")).await.unwrap();

    h.engine.set_thread_opened(&mod_b, "b", t, false).await.unwrap();
    let err = h.engine.create_post("b", t, &ip, text("hi")).await.unwrap_err();
    assert_eq!(err, DomainError::validation("thread is closed"));
    assert_eq!(h.store.last_post_number("b").await.unwrap(), 1);

    h.engine.set_thread_opened(&mod_b, "b", t, true).await.unwrap();
    assert_eq!(h.engine.create_post("b", t, &ip, text("hi")).await.unwrap(), 2);
}

#[tokio::test]
async fn fixed_threads_sort_first() {
    let h = harness(vec![board("b", |_| {})]);
    let mod_b = moderator(&h.users, 1, &["b"]);
    let ip = anon("10.0.0.1");
    let old = h.engine.create_thread("b", &ip, text("rules")).await.unwrap();
    let new = h.engine.create_thread("b", &ip, text("chatter")).await.unwrap();

    h.engine.set_thread_fixed(&mod_b, "b", old, true).await.unwrap();
    let order: Vec<u64> = h.store.threads("b").await.iter().map(|t| t.number).collect();
    assert_eq!(order, vec![old, new]);

    h.engine.set_thread_fixed(&mod_b, "b", old, false).await.unwrap();
    let order: Vec<u64> = h.store.threads("b").await.iter().map(|t| t.number).collect();
    assert_eq!(order, vec![new, old]);
}

#[tokio::test]
async fn moderators_are_scoped_to_their_boards() {
    let h = harness(vec![board("b", |_| {}), board("a", |_| {})]);
    let mod_b = moderator(&h.users, 1, &["b"]);
    let t = h.engine.create_thread("a", &anon("10.0.0.1"), text("op")).await.unwrap();

    let err = h.engine.set_thread_fixed(&mod_b, "a", t, true).await.unwrap_err();
    assert_eq!(err, DomainError::from(Denial::NotModerator("a".into())));
    let err = h.engine.set_thread_opened(&mod_b, "b", 99, false).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { kind: "thread", .. }));
    assert!(!h.store.find_thread("a", t).await.unwrap().unwrap().fixed);
}

#[tokio::test]
async fn rebuild_search_index_covers_every_board() {
    let h = harness(vec![board("b", |_| {}), board("a", |_| {})]);
    let ip = anon("10.0.0.1");
    let t = h.engine.create_thread("b", &ip, text("alpha")).await.unwrap();
    h.engine.create_post("b", t, &ip, text("beta")).await.unwrap();
    h.engine.create_thread("a", &ip, text("gamma")).await.unwrap();

    h.search.rebuild_all(Vec::new()).await.unwrap();
    assert!(h.search.is_empty());
    assert_eq!(h.engine.rebuild_search_index().await.unwrap(), 3);
    assert_eq!(h.search.search("gamma").len(), 1);
    assert_eq!(h.engine.state().admission.in_use(), 0);
}

#[tokio::test]
async fn reloading_boards_drops_removed_ones() {
    let h = harness(vec![board("b", |_| {}), board("a", |_| {})]);
    let ip = anon("10.0.0.1");
    h.engine.create_thread("a", &ip, text("op")).await.unwrap();

    h.engine.reload_boards(vec![board("b", |p| p.max_text_length = 4)]);
    let err = h.engine.create_thread("a", &ip, text("op")).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { kind: "board", .. }));
    let err = h.engine.create_thread("b", &ip, text("too long")).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(h.engine.boards().names(), vec!["b".to_string()]);
}
