//! Moderator-only operations: thread flags, bans, bulk deletion and index
//! maintenance.

use crate::posting::{internal, PostingEngine};
use chrono::Utc;
use domains::{BanInfo, Denial, DomainError, DomainResult, Identity, PostKey, PostNumber, Requester, Thread, ALL_BOARDS};

impl PostingEngine {
    async fn require_moderator(&self, requester: &Requester, board: &str) -> DomainResult<()> {
        if self.is_moderator(requester, board).await? {
            Ok(())
        } else {
            Err(Denial::NotModerator(board.to_string()).into())
        }
    }

    async fn flip_thread_flag(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        action: &str,
        apply: impl FnOnce(&mut Thread),
    ) -> DomainResult<()> {
        let target = PostKey::new(board, number).to_string();
        self.begin(&requester.ip, action, &target);
        let result = async {
            self.board(board)?;
            self.require_moderator(requester, board).await?;
            let lock = self.board_lock(board);
            let _guard = lock.lock().await;
            let store = &self.collab.store;
            let mut thread = store
                .find_thread(board, number)
                .await
                .map_err(internal("find_thread"))?
                .ok_or_else(|| DomainError::not_found("thread", PostKey::new(board, number)))?;
            apply(&mut thread);
            store.update_thread(&thread).await.map_err(internal("update_thread"))?;
            Ok::<(), DomainError>(())
        }
        .await;
        self.finish(&requester.ip, action, board, &target, &result);
        result
    }

    /// Opens or closes a thread for replies.
    #[tracing::instrument(skip(self, requester))]
    pub async fn set_thread_opened(
        &self,
        requester: &Requester,
        board: &str,
        thread: PostNumber,
        opened: bool,
    ) -> DomainResult<()> {
        self.flip_thread_flag(requester, board, thread, "set_thread_opened", |t| {
            t.posting_enabled = opened
        })
        .await
    }

    /// Pins or unpins a thread. Fixed threads sort first and are never evicted.
    #[tracing::instrument(skip(self, requester))]
    pub async fn set_thread_fixed(
        &self,
        requester: &Requester,
        board: &str,
        thread: PostNumber,
        fixed: bool,
    ) -> DomainResult<()> {
        self.flip_thread_flag(requester, board, thread, "set_thread_fixed", |t| t.fixed = fixed)
            .await
    }

    /// Records a ban set for `identity`. The requester must moderate every
    /// board named in the set; a `*` record needs a global moderator.
    #[tracing::instrument(skip(self, requester, bans), fields(identity = %identity))]
    pub async fn ban_user(
        &self,
        requester: &Requester,
        identity: Identity,
        bans: Vec<BanInfo>,
    ) -> DomainResult<()> {
        for ban in &bans {
            if ban.board != ALL_BOARDS {
                self.board(&ban.board)?;
            }
            self.require_moderator(requester, &ban.board).await?;
        }
        self.state.bans.ban_user(identity, bans);
        Ok(())
    }

    /// Bans the author of a post (address, and hashpass if present) and
    /// marks the post as the reason.
    #[tracing::instrument(skip(self, requester, bans))]
    pub async fn ban_poster(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        bans: Vec<BanInfo>,
    ) -> DomainResult<()> {
        self.board(board)?;
        self.require_moderator(requester, board).await?;
        for ban in &bans {
            if ban.board != board {
                self.require_moderator(requester, &ban.board).await?;
            }
        }

        let lock = self.board_lock(board);
        let _guard = lock.lock().await;
        let store = &self.collab.store;
        let mut post = store
            .find_post(board, number)
            .await
            .map_err(internal("find_post"))?
            .ok_or_else(|| DomainError::not_found("post", PostKey::new(board, number)))?;
        if let Some(hashpass) = post.hashpass {
            self.state.bans.ban_user(Identity::Hashpass(hashpass), bans.clone());
        }
        self.state.bans.ban_user(Identity::Ip(post.poster_ip.clone()), bans);

        post.banned_for = true;
        store.update_post(&post, None).await.map_err(internal("update_post"))?;
        Ok(())
    }

    /// Deletes every post made from `ip` on `board` (or `*`). Returns the
    /// number of posts removed, cascades included.
    #[tracing::instrument(skip(self, requester))]
    pub async fn delete_all_by_ip(&self, requester: &Requester, ip: &str, board: &str) -> DomainResult<usize> {
        if board != ALL_BOARDS {
            self.board(board)?;
        }
        self.require_moderator(requester, board).await?;
        let mut keys = self
            .collab
            .store
            .posts_by_ip(board, ip)
            .await
            .map_err(internal("posts_by_ip"))?;
        // replies first, so a thread cascade does not hide them
        keys.sort_by(|a, b| b.number.cmp(&a.number));

        let mut removed = 0;
        for key in keys {
            match self.delete_post(&key.board, key.number).await {
                Ok(posts) => removed += posts.len(),
                Err(DomainError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        tracing::info!(ip, board, removed, "posts deleted by address");
        Ok(removed)
    }

    /// Drops expired ban rows; returns how many were removed.
    pub fn purge_expired_bans(&self) -> usize {
        let removed = self.state.bans.purge_expired(Utc::now());
        tracing::info!(removed, "expired bans purged");
        removed
    }

    /// Rebuilds the full-text index from every stored post. Runs under a
    /// render permit.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_search_index(&self) -> DomainResult<usize> {
        let _permit = self.state.admission.acquire().await.map_err(|e| {
            tracing::error!(error = %e, "render admission closed");
            DomainError::Internal
        })?;
        let posts = self
            .collab
            .store
            .list_posts(ALL_BOARDS)
            .await
            .map_err(internal("list_posts"))?;
        let indexed = self
            .collab
            .search
            .rebuild_all(posts)
            .await
            .map_err(internal("rebuild_search_index"))?;
        tracing::info!(indexed, "search index rebuilt");
        Ok(indexed)
    }
}
