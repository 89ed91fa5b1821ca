use async_trait::async_trait;
use dashmap::DashMap;
use domains::{Post, PostKey, SearchIndex};

/// Keeps the searchable text of every indexed post in memory.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    documents: DashMap<PostKey, String>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &PostKey) -> bool {
        self.documents.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keys of posts whose subject or text contains every word of `query`
    /// (case-insensitive).
    pub fn search(&self, query: &str) -> Vec<PostKey> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<PostKey> = self
            .documents
            .iter()
            .filter(|doc| words.iter().all(|w| doc.value().contains(w.as_str())))
            .map(|doc| doc.key().clone())
            .collect();
        hits.sort();
        hits
    }
}

fn document(post: &Post) -> String {
    format!("{}\n{}", post.subject, post.raw_text).to_lowercase()
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn add(&self, post: &Post) -> anyhow::Result<()> {
        self.documents.insert(post.key(), document(post));
        Ok(())
    }

    async fn remove(&self, key: &PostKey) -> anyhow::Result<()> {
        self.documents.remove(key);
        Ok(())
    }

    async fn rebuild_all(&self, posts: Vec<Post>) -> anyhow::Result<usize> {
        self.documents.clear();
        for post in &posts {
            self.documents.insert(post.key(), document(post));
        }
        Ok(self.documents.len())
    }
}
