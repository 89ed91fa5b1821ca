//! Citation extraction (`>>123`, `>>>/board/123`) and resolution into
//! reference edges.

use domains::{PostKey, PostReference, PostStore};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CITATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r">>(?:>/([A-Za-z0-9_-]+)/)?(\d+)").expect("citation pattern is valid")
});

/// Unique cited keys in first-seen order. Unqualified citations point
/// into `board`.
pub fn extract_citations(board: &str, text: &str) -> Vec<PostKey> {
    let mut seen = HashSet::new();
    CITATION
        .captures_iter(text)
        .filter_map(|caps| {
            let number = caps.get(2)?.as_str().parse().ok()?;
            let target_board = caps.get(1).map_or(board, |m| m.as_str());
            Some(PostKey::new(target_board, number))
        })
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

pub struct ReferenceResolver;

impl ReferenceResolver {
    /// Keeps citations whose target exists now and is not `source` itself.
    pub async fn resolve(
        store: &dyn PostStore,
        source: &PostKey,
        text: &str,
    ) -> anyhow::Result<Vec<PostReference>> {
        let mut references = Vec::new();
        for target in extract_citations(&source.board, text) {
            if &target == source {
                continue;
            }
            if store.find_post(&target.board, target.number).await?.is_some() {
                references.push(PostReference { source: source.clone(), target });
            } else {
                tracing::debug!(%source, %target, "dropping citation of missing post");
            }
        }
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockPostStore, Post};

    fn post(board: &str, number: u64) -> Post {
        Post {
            board: board.into(),
            number,
            thread: number,
            created_at: Utc::now(),
            modified_at: None,
            poster_ip: "127.0.0.1".into(),
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

    #[test]
    fn extracts_unique_citations_in_order() {
        let keys = extract_citations("b", ">>12 text >>7\n>>12 >>>/vg/3 >>>/b/7");
        assert_eq!(
            keys,
            vec![PostKey::new("b", 12), PostKey::new("b", 7), PostKey::new("vg", 3)]
        );
    }

    #[test]
    fn ignores_non_citations() {
        assert!(extract_citations("b", "> quote\n>>\n>>abc 12").is_empty());
    }

    #[tokio::test]
    async fn resolve_keeps_existing_targets_only() {
        let mut store = MockPostStore::new();
        store.expect_find_post().returning(|board, number| {
            Ok((board == "b" && number == 5).then(|| post(board, number)))
        });

        let source = PostKey::new("b", 9);
        let refs = ReferenceResolver::resolve(&store, &source, ">>5 >>6 >>9 >>5")
            .await
            .unwrap();
        assert_eq!(refs, vec![PostReference { source, target: PostKey::new("b", 5) }]);
    }

    #[tokio::test]
    async fn resolve_propagates_store_failures() {
        let mut store = MockPostStore::new();
        store
            .expect_find_post()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));
        let result = ReferenceResolver::resolve(&store, &PostKey::new("b", 1), ">>2").await;
        assert!(result.is_err());
    }
}
