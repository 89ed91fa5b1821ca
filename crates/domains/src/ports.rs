//! # Ports
//!
//! Collaborators the engine consumes. Adapters implement these; the engine
//! never sees SQL, HTTP or index internals.

use crate::hashpass::Hashpass;
use crate::models::{
    GeolocationInfo, NewPostRecord, Post, PostKey, PostNumber, PostReference, RegisteredUser, Thread,
};
use async_trait::async_trait;

/// Relational storage of threads, posts, files and references.
///
/// Methods taking a whole record write it as one unit: a failed call
/// leaves nothing behind.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Atomically increments and returns the board-wide post counter.
    async fn next_post_number(&self, board: &str) -> anyhow::Result<PostNumber>;
    async fn last_post_number(&self, board: &str) -> anyhow::Result<PostNumber>;

    /// Writes a thread together with its opening post.
    async fn insert_thread(&self, thread: Thread, op: NewPostRecord) -> anyhow::Result<()>;
    /// Writes a reply and the updated thread row (post list, bump time).
    async fn insert_post(&self, thread: Thread, record: NewPostRecord) -> anyhow::Result<()>;

    async fn find_thread(&self, board: &str, number: PostNumber) -> anyhow::Result<Option<Thread>>;
    async fn update_thread(&self, thread: &Thread) -> anyhow::Result<()>;
    async fn count_threads(&self, board: &str, archived: bool) -> anyhow::Result<usize>;
    /// Oldest live (non-archived) non-fixed thread by bump time.
    async fn oldest_non_fixed_thread(&self, board: &str) -> anyhow::Result<Option<Thread>>;

    async fn find_post(&self, board: &str, number: PostNumber) -> anyhow::Result<Option<Post>>;
    /// Replaces the post row; `Some(references)` also replaces its outgoing edges.
    async fn update_post(
        &self,
        post: &Post,
        references: Option<Vec<PostReference>>,
    ) -> anyhow::Result<()>;
    async fn count_posts(&self, board: &str, thread: PostNumber) -> anyhow::Result<usize>;

    /// Deletes a thread, its posts, their files and every edge touching them.
    /// Returns the removed posts.
    async fn delete_thread(&self, board: &str, number: PostNumber) -> anyhow::Result<Vec<Post>>;
    /// Deletes one non-OP post, its files and its edges in both directions.
    async fn delete_post(&self, board: &str, number: PostNumber) -> anyhow::Result<Option<Post>>;

    async fn references_from(&self, key: &PostKey) -> anyhow::Result<Vec<PostReference>>;
    async fn references_to(&self, key: &PostKey) -> anyhow::Result<Vec<PostReference>>;

    /// Posts by an address; `board` may be `*` for every board.
    async fn posts_by_ip(&self, board: &str, ip: &str) -> anyhow::Result<Vec<PostKey>>;
    /// `board` may be `*` for every board.
    async fn list_posts(&self, board: &str) -> anyhow::Result<Vec<Post>>;
    /// Whether any stored file has this content hash.
    async fn file_exists(&self, hash: &str) -> anyhow::Result<bool>;
}

/// Black-box IP → location resolver.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, ip: &str) -> GeolocationInfo;
}

/// Full-text index trigger points.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn add(&self, post: &Post) -> anyhow::Result<()>;
    async fn remove(&self, key: &PostKey) -> anyhow::Result<()>;
    /// Drops the index and rebuilds it from `posts`; returns the indexed count.
    async fn rebuild_all(&self, posts: Vec<Post>) -> anyhow::Result<usize>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RssGenerator: Send + Sync {
    async fn regenerate(&self, board: &str) -> anyhow::Result<()>;
}

/// Registration table for hashpass holders (users, moderators, admins).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn registered_user(&self, hashpass: &Hashpass) -> anyhow::Result<Option<RegisteredUser>>;
}
