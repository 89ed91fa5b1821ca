use anyhow::Result;
use async_trait::async_trait;
use domains::{
    BanInfo, BanLevel, NewPostRecord, Post, PostKey, PostNumber, PostPatch, PostReference, PostStore,
    Thread,
};
use integration_tests::{anon, board, moderator, settings, text, with_password};
use services::{Collaborators, PostingEngine, SharedState, SiteSecrets};
use std::sync::Arc;
use std::time::Duration;
use storage_adapters::{
    InMemoryStore, InMemoryUserDirectory, MemorySearchIndex, NoopRssGenerator, StoreStats,
    UnknownLocation,
};

/// Row rewrites that stall between the caller's read and the write.
struct SlowRowWrites {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl PostStore for SlowRowWrites {
    async fn next_post_number(&self, board: &str) -> Result<PostNumber> {
        self.inner.next_post_number(board).await
    }
    async fn last_post_number(&self, board: &str) -> Result<PostNumber> {
        self.inner.last_post_number(board).await
    }
    async fn insert_thread(&self, thread: Thread, op: NewPostRecord) -> Result<()> {
        self.inner.insert_thread(thread, op).await
    }
    async fn insert_post(&self, thread: Thread, record: NewPostRecord) -> Result<()> {
        self.inner.insert_post(thread, record).await
    }
    async fn find_thread(&self, board: &str, number: PostNumber) -> Result<Option<Thread>> {
        self.inner.find_thread(board, number).await
    }
    async fn update_thread(&self, thread: &Thread) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_thread(thread).await
    }
    async fn count_threads(&self, board: &str, archived: bool) -> Result<usize> {
        self.inner.count_threads(board, archived).await
    }
    async fn oldest_non_fixed_thread(&self, board: &str) -> Result<Option<Thread>> {
        self.inner.oldest_non_fixed_thread(board).await
    }
    async fn find_post(&self, board: &str, number: PostNumber) -> Result<Option<Post>> {
        self.inner.find_post(board, number).await
    }
    async fn update_post(&self, post: &Post, references: Option<Vec<PostReference>>) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.update_post(post, references).await
    }
    async fn count_posts(&self, board: &str, thread: PostNumber) -> Result<usize> {
        self.inner.count_posts(board, thread).await
    }
    async fn delete_thread(&self, board: &str, number: PostNumber) -> Result<Vec<Post>> {
        self.inner.delete_thread(board, number).await
    }
    async fn delete_post(&self, board: &str, number: PostNumber) -> Result<Option<Post>> {
        self.inner.delete_post(board, number).await
    }
    async fn references_from(&self, key: &PostKey) -> Result<Vec<PostReference>> {
        self.inner.references_from(key).await
    }
    async fn references_to(&self, key: &PostKey) -> Result<Vec<PostReference>> {
        self.inner.references_to(key).await
    }
    async fn posts_by_ip(&self, board: &str, ip: &str) -> Result<Vec<PostKey>> {
        self.inner.posts_by_ip(board, ip).await
    }
    async fn list_posts(&self, board: &str) -> Result<Vec<Post>> {
        self.inner.list_posts(board).await
    }
    async fn file_exists(&self, hash: &str) -> Result<bool> {
        self.inner.file_exists(hash).await
    }
}

struct Slow {
    engine: Arc<PostingEngine>,
    store: Arc<InMemoryStore>,
    users: Arc<InMemoryUserDirectory>,
}

fn slow_engine() -> Slow {
    let settings = settings();
    let store = Arc::new(InMemoryStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let collab = Collaborators {
        store: Arc::new(SlowRowWrites { inner: Arc::clone(&store), delay: Duration::from_millis(200) }),
        geo: Arc::new(UnknownLocation),
        search: Arc::new(MemorySearchIndex::new()),
        rss: Arc::new(NoopRssGenerator),
        users: Arc::clone(&users) as _,
    };
    let engine = PostingEngine::new(
        collab,
        SharedState::from_settings(&settings),
        SiteSecrets::from_settings(&settings),
        vec![board("b", |_| {})],
    );
    Slow { engine: Arc::new(engine), store, users }
}

#[tokio::test]
async fn flag_flip_does_not_lose_a_concurrent_reply() {
    let s = slow_engine();
    let mod_b = moderator(&s.users, 1, &["b"]);
    let op = s.engine.create_thread("b", &anon("10.0.0.1"), text("op")).await.unwrap();

    let flip = {
        let engine = Arc::clone(&s.engine);
        tokio::spawn(async move { engine.set_thread_fixed(&mod_b, "b", op, true).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let reply = s.engine.create_post("b", op, &anon("10.0.0.2"), text("reply")).await.unwrap();
    flip.await.unwrap().unwrap();

    let thread = s.store.find_thread("b", op).await.unwrap().unwrap();
    assert!(thread.fixed);
    assert_eq!(thread.posts, vec![op, reply]);

    s.engine.delete_post("b", op).await.unwrap();
    assert_eq!(s.store.stats().await, StoreStats::default());
}

#[tokio::test]
async fn edit_and_ban_poster_do_not_overwrite_each_other() {
    let s = slow_engine();
    let mod_b = moderator(&s.users, 1, &["b"]);
    let author = anon("10.0.0.7");
    let op = s.engine.create_thread("b", &author, with_password("first", "pw")).await.unwrap();

    let edit = {
        let engine = Arc::clone(&s.engine);
        let author = author.clone();
        tokio::spawn(async move {
            let patch = PostPatch {
                text: Some("second".into()),
                password: Some("pw".into()),
                ..PostPatch::default()
            };
            engine.edit_post(&author, "b", op, patch).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    s.engine
        .ban_poster(&mod_b, "b", op, vec![BanInfo::new("b", BanLevel::POSTING, "spam")])
        .await
        .unwrap();
    edit.await.unwrap().unwrap();

    let post = s.store.find_post("b", op).await.unwrap().unwrap();
    assert_eq!(post.text, "second");
    assert!(post.banned_for);
}
