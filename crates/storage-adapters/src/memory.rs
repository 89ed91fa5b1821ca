//! # In-memory PostStore
//!
//! Arena-style tables keyed by `(board, number)` behind one async `RwLock`.
//! Every multi-row write (thread + OP, reply + thread bump, cascades) takes
//! the write lock once, so readers see either all of it or none of it.
//! Post counters live outside the tables and are bumped atomically per board.

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    FileInfo, NewPostRecord, Post, PostKey, PostNumber, PostReference, PostStore, Thread, ALL_BOARDS,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

type RowKey = (String, PostNumber);

fn row(board: &str, number: PostNumber) -> RowKey {
    (board.to_string(), number)
}

fn key_row(key: &PostKey) -> RowKey {
    (key.board.clone(), key.number)
}

#[derive(Default)]
struct Tables {
    threads: BTreeMap<RowKey, Thread>,
    posts: BTreeMap<RowKey, Post>,
    references: BTreeSet<PostReference>,
    /// Content hash → number of files pointing at it
    blobs: HashMap<String, usize>,
}

impl Tables {
    fn add_post(&mut self, record: NewPostRecord) {
        let NewPostRecord { post, references } = record;
        self.retain_blobs(&post.files);
        self.add_references(references);
        self.posts.insert(row(&post.board, post.number), post);
    }

    /// Edges whose target vanished since resolution are dropped.
    fn add_references(&mut self, references: Vec<PostReference>) {
        for reference in references {
            if self.posts.contains_key(&key_row(&reference.target)) {
                self.references.insert(reference);
            }
        }
    }

    fn retain_blobs(&mut self, files: &[FileInfo]) {
        for file in files {
            *self.blobs.entry(file.hash.clone()).or_default() += 1;
        }
    }

    fn release_blobs(&mut self, files: &[FileInfo]) {
        for file in files {
            if let Some(count) = self.blobs.get_mut(&file.hash) {
                *count -= 1;
                if *count == 0 {
                    self.blobs.remove(&file.hash);
                }
            }
        }
    }

    fn remove_post(&mut self, board: &str, number: PostNumber) -> Option<Post> {
        let post = self.posts.remove(&row(board, number))?;
        self.release_blobs(&post.files);
        let key = post.key();
        self.references.retain(|r| r.source != key && r.target != key);
        Some(post)
    }
}

/// Counts of every table, for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub threads: usize,
    pub posts: usize,
    pub references: usize,
    pub blobs: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    counters: DashMap<String, PostNumber>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> StoreStats {
        let t = self.tables.read().await;
        StoreStats {
            threads: t.threads.len(),
            posts: t.posts.len(),
            references: t.references.len(),
            blobs: t.blobs.len(),
        }
    }

    /// Live threads of a board in bump order.
    pub async fn threads(&self, board: &str) -> Vec<Thread> {
        let t = self.tables.read().await;
        let mut threads: Vec<Thread> = t
            .threads
            .values()
            .filter(|th| th.board == board && !th.archived)
            .cloned()
            .collect();
        threads.sort_by(Thread::bump_order);
        threads
    }
}

fn on_board(board: &str, filter: &str) -> bool {
    filter == ALL_BOARDS || board == filter
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn next_post_number(&self, board: &str) -> anyhow::Result<PostNumber> {
        let mut counter = self.counters.entry(board.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn last_post_number(&self, board: &str) -> anyhow::Result<PostNumber> {
        Ok(self.counters.get(board).map_or(0, |n| *n))
    }

    async fn insert_thread(&self, thread: Thread, op: NewPostRecord) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let key = row(&thread.board, thread.number);
        if t.threads.contains_key(&key) || t.posts.contains_key(&key) {
            anyhow::bail!("/{}/{} already exists", thread.board, thread.number);
        }
        if op.post.number != thread.number || op.post.board != thread.board {
            anyhow::bail!("opening post {} does not match thread /{}/{}", op.post.key(), thread.board, thread.number);
        }
        t.threads.insert(key, thread);
        t.add_post(op);
        Ok(())
    }

    async fn insert_post(&self, thread: Thread, record: NewPostRecord) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let thread_key = row(&thread.board, thread.number);
        if !t.threads.contains_key(&thread_key) {
            anyhow::bail!("thread /{}/{} does not exist", thread.board, thread.number);
        }
        if record.post.thread != thread.number || record.post.board != thread.board {
            anyhow::bail!("post {} does not belong to thread /{}/{}", record.post.key(), thread.board, thread.number);
        }
        if t.posts.contains_key(&key_row(&record.post.key())) {
            anyhow::bail!("{} already exists", record.post.key());
        }
        t.threads.insert(thread_key, thread);
        t.add_post(record);
        Ok(())
    }

    async fn find_thread(&self, board: &str, number: PostNumber) -> anyhow::Result<Option<Thread>> {
        Ok(self.tables.read().await.threads.get(&row(board, number)).cloned())
    }

    async fn update_thread(&self, thread: &Thread) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        match t.threads.get_mut(&row(&thread.board, thread.number)) {
            Some(existing) => {
                *existing = thread.clone();
                Ok(())
            }
            None => anyhow::bail!("thread /{}/{} does not exist", thread.board, thread.number),
        }
    }

    async fn count_threads(&self, board: &str, archived: bool) -> anyhow::Result<usize> {
        let t = self.tables.read().await;
        Ok(t.threads
            .values()
            .filter(|th| th.board == board && th.archived == archived)
            .count())
    }

    async fn oldest_non_fixed_thread(&self, board: &str) -> anyhow::Result<Option<Thread>> {
        let t = self.tables.read().await;
        Ok(t.threads
            .values()
            .filter(|th| th.board == board && !th.archived && !th.fixed)
            .min_by(|a, b| a.bumped_at.cmp(&b.bumped_at).then(a.number.cmp(&b.number)))
            .cloned())
    }

    async fn find_post(&self, board: &str, number: PostNumber) -> anyhow::Result<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&row(board, number)).cloned())
    }

    async fn update_post(
        &self,
        post: &Post,
        references: Option<Vec<PostReference>>,
    ) -> anyhow::Result<()> {
        let mut t = self.tables.write().await;
        let key = post.key();
        let Some(existing) = t.posts.get_mut(&key_row(&key)) else {
            anyhow::bail!("{key} does not exist");
        };
        let previous = std::mem::replace(existing, post.clone());
        // files may have been dropped from the post
        t.retain_blobs(&post.files);
        t.release_blobs(&previous.files);
        if let Some(references) = references {
            t.references.retain(|r| r.source != key);
            t.add_references(references);
        }
        Ok(())
    }

    async fn count_posts(&self, board: &str, thread: PostNumber) -> anyhow::Result<usize> {
        let t = self.tables.read().await;
        Ok(t.threads.get(&row(board, thread)).map_or(0, |th| th.posts.len()))
    }

    async fn delete_thread(&self, board: &str, number: PostNumber) -> anyhow::Result<Vec<Post>> {
        let mut t = self.tables.write().await;
        let Some(thread) = t.threads.remove(&row(board, number)) else {
            return Ok(Vec::new());
        };
        let removed: Vec<Post> = thread
            .posts
            .iter()
            .filter_map(|n| t.remove_post(board, *n))
            .collect();
        tracing::debug!(board, thread = number, posts = removed.len(), "thread removed");
        Ok(removed)
    }

    async fn delete_post(&self, board: &str, number: PostNumber) -> anyhow::Result<Option<Post>> {
        let mut t = self.tables.write().await;
        if t.threads.contains_key(&row(board, number)) {
            anyhow::bail!("/{board}/{number} opens a thread; delete the thread instead");
        }
        let Some(post) = t.remove_post(board, number) else {
            return Ok(None);
        };
        if let Some(thread) = t.threads.get_mut(&row(board, post.thread)) {
            thread.posts.retain(|n| *n != number);
        }
        Ok(Some(post))
    }

    async fn references_from(&self, key: &PostKey) -> anyhow::Result<Vec<PostReference>> {
        let t = self.tables.read().await;
        Ok(t.references.iter().filter(|r| &r.source == key).cloned().collect())
    }

    async fn references_to(&self, key: &PostKey) -> anyhow::Result<Vec<PostReference>> {
        let t = self.tables.read().await;
        Ok(t.references.iter().filter(|r| &r.target == key).cloned().collect())
    }

    async fn posts_by_ip(&self, board: &str, ip: &str) -> anyhow::Result<Vec<PostKey>> {
        let t = self.tables.read().await;
        Ok(t.posts
            .values()
            .filter(|p| on_board(&p.board, board) && p.poster_ip == ip)
            .map(Post::key)
            .collect())
    }

    async fn list_posts(&self, board: &str) -> anyhow::Result<Vec<Post>> {
        let t = self.tables.read().await;
        Ok(t.posts
            .values()
            .filter(|p| on_board(&p.board, board))
            .cloned()
            .collect())
    }

    async fn file_exists(&self, hash: &str) -> anyhow::Result<bool> {
        Ok(self.tables.read().await.blobs.contains_key(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{FileInfo, Rating};

    fn post(board: &str, number: PostNumber, thread: PostNumber) -> Post {
        Post {
            board: board.into(),
            number,
            thread,
            created_at: Utc::now(),
            modified_at: None,
            poster_ip: "10.0.0.1".into(),
            geo: Default::default(),
            password: vec![],
            hashpass: None,
            draft: false,
            banned_for: false,
            markup: Default::default(),
            sign_as_op: false,
            show_tripcode: false,
            name: String::new(),
            email: String::new(),
            subject: String::new(),
            text: String::new(),
            raw_text: String::new(),
            files: vec![],
            user_data: serde_json::Value::Null,
        }
    }

    fn file(hash: &str) -> FileInfo {
        FileInfo {
            hash: hash.into(),
            file_name: "a.png".into(),
            mime_type: "image/png".into(),
            size: 3,
            width: None,
            height: None,
            thumbnail: None,
            rating: Rating::Safe,
            metadata: serde_json::Value::Null,
        }
    }

    fn record(post: Post, targets: &[PostNumber]) -> NewPostRecord {
        let source = post.key();
        let references = targets
            .iter()
            .map(|n| PostReference { source: source.clone(), target: PostKey::new(source.board.clone(), *n) })
            .collect();
        NewPostRecord { post, references }
    }

    #[tokio::test]
    async fn counters_are_per_board() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_post_number("b").await.unwrap(), 1);
        assert_eq!(store.next_post_number("b").await.unwrap(), 2);
        assert_eq!(store.next_post_number("vg").await.unwrap(), 1);
        assert_eq!(store.last_post_number("b").await.unwrap(), 2);
        assert_eq!(store.last_post_number("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_thread_is_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .insert_thread(Thread::new("b", 1, now), record(post("b", 1, 1), &[]))
            .await
            .unwrap();
        let again = store
            .insert_thread(Thread::new("b", 1, now), record(post("b", 1, 1), &[]))
            .await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn thread_cascade_removes_files_and_edges() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut op = post("b", 1, 1);
        op.files = vec![file("aaa")];
        store.insert_thread(Thread::new("b", 1, now), record(op, &[])).await.unwrap();

        let mut other = post("b", 10, 10);
        other.files = vec![file("shared")];
        store.insert_thread(Thread::new("b", 10, now), record(other, &[])).await.unwrap();

        let mut thread = store.find_thread("b", 1).await.unwrap().unwrap();
        thread.posts.push(2);
        let mut reply = post("b", 2, 1);
        reply.files = vec![file("shared")];
        store.insert_post(thread, record(reply, &[1, 10, 99])).await.unwrap();

        let before = store.stats().await;
        assert_eq!(before, StoreStats { threads: 2, posts: 3, references: 2, blobs: 2 });
        assert_eq!(store.references_to(&PostKey::new("b", 10)).await.unwrap().len(), 1);

        let removed = store.delete_thread("b", 1).await.unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.stats().await, StoreStats { threads: 1, posts: 1, references: 0, blobs: 1 });
        assert!(store.file_exists("shared").await.unwrap());
        assert!(!store.file_exists("aaa").await.unwrap());
    }

    #[tokio::test]
    async fn updates_adjust_blob_counts() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut op = post("b", 1, 1);
        op.files = vec![file("shared"), file("own")];
        store.insert_thread(Thread::new("b", 1, now), record(op, &[])).await.unwrap();
        let mut other = post("b", 2, 2);
        other.files = vec![file("shared")];
        store.insert_thread(Thread::new("b", 2, now), record(other, &[])).await.unwrap();

        let mut edited = store.find_post("b", 1).await.unwrap().unwrap();
        edited.files.clear();
        store.update_post(&edited, None).await.unwrap();
        assert!(!store.file_exists("own").await.unwrap());
        assert!(store.file_exists("shared").await.unwrap());

        store.delete_thread("b", 2).await.unwrap();
        assert_eq!(store.stats().await.blobs, 0);
        assert!(store.update_post(&post("b", 9, 9), None).await.is_err());
    }

    #[tokio::test]
    async fn reply_deletion_updates_thread_and_edges() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_thread(Thread::new("b", 1, now), record(post("b", 1, 1), &[])).await.unwrap();
        for n in [2, 3] {
            let mut thread = store.find_thread("b", 1).await.unwrap().unwrap();
            thread.posts.push(n);
            store.insert_post(thread, record(post("b", n, 1), &[n - 1])).await.unwrap();
        }
        assert_eq!(store.count_posts("b", 1).await.unwrap(), 3);

        assert!(store.delete_post("b", 1).await.is_err());
        let removed = store.delete_post("b", 2).await.unwrap();
        assert_eq!(removed.map(|p| p.number), Some(2));
        assert_eq!(store.count_posts("b", 1).await.unwrap(), 2);
        assert!(store.references_from(&PostKey::new("b", 3)).await.unwrap().is_empty());
        assert!(store.references_to(&PostKey::new("b", 1)).await.unwrap().is_empty());
        assert_eq!(store.delete_post("b", 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_post_replaces_outgoing_edges_only() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_thread(Thread::new("b", 1, now), record(post("b", 1, 1), &[])).await.unwrap();
        store.insert_thread(Thread::new("b", 2, now), record(post("b", 2, 2), &[1])).await.unwrap();
        store.insert_thread(Thread::new("b", 3, now), record(post("b", 3, 3), &[2])).await.unwrap();

        let mut edited = store.find_post("b", 2).await.unwrap().unwrap();
        edited.text = ">>3".into();
        let refs = vec![PostReference { source: edited.key(), target: PostKey::new("b", 3) }];
        store.update_post(&edited, Some(refs)).await.unwrap();

        let from = store.references_from(&PostKey::new("b", 2)).await.unwrap();
        assert_eq!(from.len(), 1);
        assert_eq!(from[0].target.number, 3);
        assert_eq!(store.references_to(&PostKey::new("b", 2)).await.unwrap().len(), 1);
        assert_eq!(store.find_post("b", 2).await.unwrap().unwrap().text, ">>3");
    }

    #[tokio::test]
    async fn oldest_non_fixed_skips_fixed_and_archived() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut fixed = Thread::new("b", 1, now - chrono::Duration::hours(3));
        fixed.fixed = true;
        let mut archived = Thread::new("b", 2, now - chrono::Duration::hours(2));
        archived.archived = true;
        let live = Thread::new("b", 3, now - chrono::Duration::hours(1));
        for (thread, n) in [(fixed, 1), (archived, 2), (live, 3)] {
            store.insert_thread(thread, record(post("b", n, n), &[])).await.unwrap();
        }
        let oldest = store.oldest_non_fixed_thread("b").await.unwrap().unwrap();
        assert_eq!(oldest.number, 3);
        assert_eq!(store.count_threads("b", false).await.unwrap(), 2);
        assert_eq!(store.count_threads("b", true).await.unwrap(), 1);
        assert_eq!(store.threads("b").await.iter().map(|t| t.number).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn lookups_by_address_and_board() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_thread(Thread::new("b", 1, now), record(post("b", 1, 1), &[])).await.unwrap();
        let mut elsewhere = post("vg", 1, 1);
        elsewhere.poster_ip = "10.0.0.2".into();
        store.insert_thread(Thread::new("vg", 1, now), record(elsewhere, &[])).await.unwrap();

        assert_eq!(store.posts_by_ip(ALL_BOARDS, "10.0.0.1").await.unwrap(), vec![PostKey::new("b", 1)]);
        assert!(store.posts_by_ip("vg", "10.0.0.1").await.unwrap().is_empty());
        assert_eq!(store.list_posts(ALL_BOARDS).await.unwrap().len(), 2);
        assert_eq!(store.list_posts("vg").await.unwrap().len(), 1);
    }
}
