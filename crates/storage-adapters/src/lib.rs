//! # storage-adapters
//!
//! In-process implementations of the `domains` ports: the reference
//! `PostStore`, a memory-backed search index, a registered-user table and
//! the no-op RSS and GeoIP adapters.

mod memory;
mod noop;
mod search;
mod users;

pub use memory::{InMemoryStore, StoreStats};
pub use noop::{NoopRssGenerator, UnknownLocation};
pub use search::MemorySearchIndex;
pub use users::InMemoryUserDirectory;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        Hashpass, Post, PostKey, RegisteredUser, SearchIndex, UserDirectory, UserLevel,
    };

    fn post(number: u64, subject: &str, text: &str) -> Post {
        Post {
            board: "b".into(),
            number,
            thread: number,
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
            subject: subject.into(),
            text: text.into(),
            raw_text: text.into(),
            files: vec![],
            user_data: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn search_index_tracks_adds_and_removals() {
        let index = MemorySearchIndex::new();
        index.add(&post(1, "Rust", "borrow checker")).await.unwrap();
        index.add(&post(2, "", "garbage collector")).await.unwrap();
        assert_eq!(index.search("rust CHECKER"), vec![PostKey::new("b", 1)]);
        assert!(index.search("").is_empty());

        index.remove(&PostKey::new("b", 1)).await.unwrap();
        assert!(!index.contains(&PostKey::new("b", 1)));

        let count = index
            .rebuild_all(vec![post(3, "", "a"), post(4, "", "b")])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert!(!index.contains(&PostKey::new("b", 2)));
    }

    #[tokio::test]
    async fn user_directory_lookup() {
        let users = InMemoryUserDirectory::new();
        let hp = Hashpass::from_bytes([4; 20]);
        assert!(users.registered_user(&hp).await.unwrap().is_none());

        users.register(RegisteredUser { hashpass: hp, level: UserLevel::MODER, boards: vec!["b".into()] });
        let user = users.registered_user(&hp).await.unwrap().unwrap();
        assert!(user.moderates("b"));

        assert!(users.unregister(&hp).is_some());
        assert!(users.registered_user(&hp).await.unwrap().is_none());
    }
}
