//! # PostingEngine
//!
//! Creates, edits and deletes threads and posts. Every write goes through
//! the same gauntlet: board lookup, abuse throttle, bans, board policy,
//! then the per-board lock under which eviction, numbering and the single
//! store write happen. Search and RSS hooks run after the lock is released
//! and never undo a committed write.

use crate::action_log::{ActionLog, ActionState};
use crate::admission::RenderAdmission;
use crate::bans::{BanGate, BanRegistry};
use crate::ddos::{DdosConfig, DdosGuard, RequestKind};
use crate::directory::{BoardDirectory, ConfiguredBoard};
use crate::identity;
use crate::metrics::EngineMetrics;
use crate::policy::PostKind;
use crate::references::ReferenceResolver;
use crate::resources::ResourceStore;
use chrono::{DateTime, Utc};
use configs::Settings;
use dashmap::DashMap;
use domains::{
    Board, Denial, DomainError, DomainResult, FileInfo, GeoResolver, NewPost, NewPostRecord, Post, PostKey,
    PostNumber, PostPatch, PostStore, Requester, RssGenerator, SearchIndex, Thread, UploadedFile,
    UserAction, UserDirectory,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Adapters the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn PostStore>,
    pub geo: Arc<dyn GeoResolver>,
    pub search: Arc<dyn SearchIndex>,
    pub rss: Arc<dyn RssGenerator>,
    pub users: Arc<dyn UserDirectory>,
}

/// Process-wide state shared by handle.
#[derive(Clone)]
pub struct SharedState {
    pub bans: Arc<BanRegistry>,
    pub ddos: Arc<DdosGuard>,
    pub resources: Arc<ResourceStore>,
    pub action_log: Arc<ActionLog>,
    pub metrics: EngineMetrics,
    pub admission: RenderAdmission,
}

impl SharedState {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bans: Arc::new(BanRegistry::new()),
            ddos: Arc::new(DdosGuard::new(DdosConfig::from(&settings.ddos))),
            resources: Arc::new(ResourceStore::new(settings.system.resources_dir.clone())),
            action_log: Arc::new(ActionLog::from_settings(&settings.logging_skip_ips())),
            metrics: EngineMetrics::default(),
            admission: RenderAdmission::from_settings(settings.system.max_render_threads),
        }
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

pub struct SiteSecrets {
    pub tripcode_salt: SecretString,
    pub default_post_password: SecretString,
}

impl SiteSecrets {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tripcode_salt: SecretString::from(settings.site.tripcode_salt.expose_secret().to_string()),
            default_post_password: SecretString::from(
                settings.site.default_post_password.expose_secret().to_string(),
            ),
        }
    }
}

impl Default for SiteSecrets {
    fn default() -> Self {
        Self {
            tripcode_salt: SecretString::from(String::new()),
            default_post_password: SecretString::from(String::new()),
        }
    }
}

/// Logs the underlying failure and hides it behind `DomainError::Internal`.
pub(crate) fn internal(op: &'static str) -> impl FnOnce(anyhow::Error) -> DomainError {
    move |e| {
        tracing::error!(op, error = ?e, "store operation failed");
        DomainError::Internal
    }
}

/// What the locked section of a write produced, for the hooks that follow.
struct Committed {
    post: Post,
    evicted: Vec<Post>,
}

pub struct PostingEngine {
    pub(crate) collab: Collaborators,
    pub(crate) state: SharedState,
    pub(crate) secrets: SiteSecrets,
    pub(crate) boards: BoardDirectory,
    board_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PostingEngine {
    pub fn new(collab: Collaborators, state: SharedState, secrets: SiteSecrets, boards: Vec<Board>) -> Self {
        Self {
            collab,
            state,
            secrets,
            boards: BoardDirectory::new(boards),
            board_locks: DashMap::new(),
        }
    }

    pub fn from_settings(collab: Collaborators, settings: &Settings) -> Self {
        Self::new(
            collab,
            SharedState::from_settings(settings),
            SiteSecrets::from_settings(settings),
            settings.boards(),
        )
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn boards(&self) -> &BoardDirectory {
        &self.boards
    }

    pub fn board(&self, name: &str) -> DomainResult<Arc<ConfiguredBoard>> {
        self.boards
            .get(name)
            .ok_or_else(|| DomainError::not_found("board", name))
    }

    /// Replaces the board set. Threads of removed boards stay in the store.
    pub fn reload_boards(&self, boards: Vec<Board>) {
        self.boards.replace(boards);
    }

    /// Re-reads flat resource files (including the IP-range ban table) on
    /// next access.
    pub fn reload_resources(&self) {
        self.state.resources.clear();
    }

    /// Serialises every read-modify-write of a board's rows.
    pub(crate) fn board_lock(&self, board: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.board_locks
                .entry(board.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Display tripcode of a post whose author chose to show it.
    pub fn tripcode_for(&self, post: &Post) -> Option<String> {
        if !cfg!(feature = "auth-tripcode") || !post.show_tripcode {
            return None;
        }
        post.hashpass
            .as_ref()
            .map(|hp| identity::tripcode(&self.secrets.tripcode_salt, hp))
    }

    pub(crate) async fn is_moderator(&self, requester: &Requester, board: &str) -> DomainResult<bool> {
        let Some(hashpass) = requester.hashpass else {
            return Ok(false);
        };
        let user = self
            .collab
            .users
            .registered_user(&hashpass)
            .await
            .map_err(internal("registered_user"))?;
        Ok(user.is_some_and(|u| u.moderates(board)))
    }

    /// Author by hashpass, author by a non-empty matching password, or a
    /// moderator of the board.
    pub(crate) async fn may_modify(
        &self,
        requester: &Requester,
        post: &Post,
        password: Option<&str>,
    ) -> DomainResult<bool> {
        if post.hashpass.is_some() && post.hashpass == requester.hashpass {
            return Ok(true);
        }
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            let hashed = identity::hash_password(password, &self.secrets.default_post_password);
            if hashed == post.password {
                return Ok(true);
            }
        }
        self.is_moderator(requester, &post.board).await
    }

    fn throttle(&self, ip: &str, kind: RequestKind, upload_bytes: u64) -> DomainResult<()> {
        let weight = self.state.ddos.weight_for(kind, upload_bytes);
        if self.state.ddos.test(ip, weight, 0.0) {
            Ok(())
        } else {
            self.state.metrics.ddos_blocks.inc();
            Err(DomainError::RateLimited(ip.to_string()))
        }
    }

    fn ban_gate(&self, requester: &Requester, board: &str, action: UserAction) -> DomainResult<()> {
        let table = self.state.resources.ip_ban_table();
        BanGate::check(&table, &self.state.bans, requester, board, action, Utc::now())?;
        Ok(())
    }

    pub(crate) fn begin(&self, ip: &str, action: &str, target: &str) {
        self.state.action_log.record(ip, action, ActionState::Begin, target);
    }

    pub(crate) fn finish<T>(&self, ip: &str, action: &str, board: &str, target: &str, result: &DomainResult<T>) {
        match result {
            Ok(_) => {
                self.state.action_log.record(ip, action, ActionState::Success, target);
            }
            Err(e) => {
                self.state.metrics.rejected(board, e.kind());
                self.state.action_log.failed(ip, action, target, &e.to_string());
            }
        }
    }

    /// Read gate for the HTTP layer: board exists, throttle, bans.
    pub fn check_access(&self, requester: &Requester, board: &str, action: UserAction) -> DomainResult<()> {
        self.board(board)?;
        let kind = match action {
            UserAction::Reading => RequestKind::Read,
            UserAction::Posting => RequestKind::Post,
        };
        let result = self
            .throttle(&requester.ip, kind, 0)
            .and_then(|()| self.ban_gate(requester, board, action));
        if let Err(e) = &result {
            self.state.metrics.rejected(board, e.kind());
        }
        result
    }

    fn file_info(upload: &UploadedFile) -> FileInfo {
        FileInfo {
            hash: identity::content_hash(&upload.data),
            file_name: upload.file_name.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.size(),
            width: None,
            height: None,
            thumbnail: None,
            rating: upload.rating,
            metadata: serde_json::Value::Null,
        }
    }

    async fn build_post(
        &self,
        configured: &ConfiguredBoard,
        requester: &Requester,
        payload: NewPost,
        key: &PostKey,
        thread: PostNumber,
        now: DateTime<Utc>,
    ) -> DomainResult<Post> {
        let board = &configured.board;
        let mut markup = payload.markup;
        if markup.raw_html && !self.is_moderator(requester, &board.name).await? {
            markup.raw_html = false;
        }
        let name = if payload.name.trim().is_empty() {
            board.default_user_name.clone()
        } else {
            payload.name
        };
        Ok(Post {
            board: key.board.clone(),
            number: key.number,
            thread,
            created_at: now,
            modified_at: None,
            poster_ip: requester.ip.clone(),
            geo: self.collab.geo.resolve(&requester.ip),
            password: identity::hash_password(&payload.password, &self.secrets.default_post_password),
            hashpass: requester.hashpass,
            draft: payload.draft,
            banned_for: false,
            markup,
            sign_as_op: payload.sign_as_op,
            show_tripcode: payload.show_tripcode && requester.hashpass.is_some(),
            name,
            email: payload.email,
            subject: payload.subject,
            raw_text: payload.text.clone(),
            text: payload.text,
            files: payload.files.iter().map(Self::file_info).collect(),
            user_data: payload.user_data,
        })
    }

    /// Makes room for one more live thread. Runs under the board lock.
    async fn evict_for_new_thread(&self, configured: &ConfiguredBoard) -> DomainResult<Vec<Post>> {
        let store = &self.collab.store;
        let board = configured.board.name.as_str();
        let policy = configured.policy.policy();
        let mut removed = Vec::new();
        loop {
            let live = store.count_threads(board, false).await.map_err(internal("count_threads"))?;
            if live < policy.thread_limit as usize {
                return Ok(removed);
            }
            let Some(mut victim) = store
                .oldest_non_fixed_thread(board)
                .await
                .map_err(internal("oldest_non_fixed_thread"))?
            else {
                return Err(DomainError::validation(
                    "thread limit reached and every thread is fixed",
                ));
            };
            let archived = store.count_threads(board, true).await.map_err(internal("count_threads"))?;
            if policy.archive_limit > 0 && archived < policy.archive_limit as usize {
                victim.archived = true;
                store.update_thread(&victim).await.map_err(internal("update_thread"))?;
                tracing::info!(board, thread = victim.number, "thread archived");
                self.state.metrics.evicted(board, true);
            } else {
                let posts = store
                    .delete_thread(board, victim.number)
                    .await
                    .map_err(internal("delete_thread"))?;
                tracing::info!(board, thread = victim.number, posts = posts.len(), "thread evicted");
                self.state.metrics.evicted(board, false);
                self.state.metrics.deleted(board, posts.len());
                removed.extend(posts);
            }
        }
    }

    async fn run_hooks(&self, board: &str, added: Option<&Post>, removed: &[Post]) {
        for post in removed {
            if let Err(e) = self.collab.search.remove(&post.key()).await {
                tracing::warn!(post = %post.key(), error = ?e, "search index removal failed");
            }
        }
        if let Some(post) = added {
            if let Err(e) = self.collab.search.add(post).await {
                tracing::warn!(post = %post.key(), error = ?e, "search indexing failed");
            }
        }
        if let Err(e) = self.collab.rss.regenerate(board).await {
            tracing::warn!(board, error = ?e, "rss regeneration failed");
        }
    }

    #[tracing::instrument(skip_all, fields(board = %board, ip = %requester.ip))]
    pub async fn create_thread(
        &self,
        board: &str,
        requester: &Requester,
        payload: NewPost,
    ) -> DomainResult<PostNumber> {
        self.begin(&requester.ip, "create_thread", board);
        let result = self.create_thread_inner(board, requester, payload).await;
        let target = match &result {
            Ok(number) => PostKey::new(board, *number).to_string(),
            Err(_) => board.to_string(),
        };
        self.finish(&requester.ip, "create_thread", board, &target, &result);
        result
    }

    async fn create_thread_inner(
        &self,
        board: &str,
        requester: &Requester,
        payload: NewPost,
    ) -> DomainResult<PostNumber> {
        let configured = self.board(board)?;
        self.throttle(&requester.ip, RequestKind::Thread, payload.upload_bytes())?;
        self.ban_gate(requester, board, UserAction::Posting)?;
        configured.policy.validate_post(&payload, PostKind::Thread)?;

        let committed = {
            let lock = self.board_lock(board);
            let _guard = lock.lock().await;
            let evicted = self.evict_for_new_thread(&configured).await?;

            let store = &self.collab.store;
            let number = store.next_post_number(board).await.map_err(internal("next_post_number"))?;
            let now = Utc::now();
            let draft = payload.draft;
            let payload = NewPost { sign_as_op: false, ..payload };
            let key = PostKey::new(board, number);
            let post = self
                .build_post(&configured, requester, payload, &key, number, now)
                .await?;
            let references = ReferenceResolver::resolve(store.as_ref(), &post.key(), &post.raw_text)
                .await
                .map_err(internal("resolve_references"))?;

            let mut thread = Thread::new(board, number, now);
            thread.draft = draft;
            store
                .insert_thread(thread, NewPostRecord { post: post.clone(), references })
                .await
                .map_err(internal("insert_thread"))?;
            Committed { post, evicted }
        };

        self.state.metrics.created(board, true);
        tracing::info!(board, number = committed.post.number, "thread created");
        self.run_hooks(board, Some(&committed.post), &committed.evicted).await;
        Ok(committed.post.number)
    }

    #[tracing::instrument(skip_all, fields(board = %board, thread = thread, ip = %requester.ip))]
    pub async fn create_post(
        &self,
        board: &str,
        thread: PostNumber,
        requester: &Requester,
        payload: NewPost,
    ) -> DomainResult<PostNumber> {
        self.begin(&requester.ip, "create_post", &PostKey::new(board, thread).to_string());
        let result = self.create_post_inner(board, thread, requester, payload).await;
        let target = match &result {
            Ok(number) => PostKey::new(board, *number).to_string(),
            Err(_) => PostKey::new(board, thread).to_string(),
        };
        self.finish(&requester.ip, "create_post", board, &target, &result);
        result
    }

    async fn create_post_inner(
        &self,
        board: &str,
        thread_number: PostNumber,
        requester: &Requester,
        payload: NewPost,
    ) -> DomainResult<PostNumber> {
        let configured = self.board(board)?;
        self.throttle(&requester.ip, RequestKind::Post, payload.upload_bytes())?;
        self.ban_gate(requester, board, UserAction::Posting)?;
        configured.policy.validate_post(&payload, PostKind::Reply)?;
        let policy = configured.policy.policy();

        let post = {
            let lock = self.board_lock(board);
            let _guard = lock.lock().await;
            let store = &self.collab.store;

            let mut thread = store
                .find_thread(board, thread_number)
                .await
                .map_err(internal("find_thread"))?
                .ok_or_else(|| DomainError::not_found("thread", PostKey::new(board, thread_number)))?;
            if thread.archived {
                return Err(DomainError::validation("thread is archived"));
            }
            if !thread.posting_enabled {
                return Err(DomainError::validation("thread is closed"));
            }
            let count = store
                .count_posts(board, thread_number)
                .await
                .map_err(internal("count_posts"))?;
            if count >= policy.post_limit as usize {
                return Err(DomainError::validation(format!(
                    "thread has reached its post limit ({})",
                    policy.post_limit
                )));
            }

            let mut payload = payload;
            if payload.sign_as_op {
                let op = store.find_post(board, thread_number).await.map_err(internal("find_post"))?;
                payload.sign_as_op =
                    op.is_some_and(|op| op.hashpass.is_some() && op.hashpass == requester.hashpass);
            }

            let number = store.next_post_number(board).await.map_err(internal("next_post_number"))?;
            let now = Utc::now();
            let key = PostKey::new(board, number);
            let post = self
                .build_post(&configured, requester, payload, &key, thread_number, now)
                .await?;
            let references = ReferenceResolver::resolve(store.as_ref(), &post.key(), &post.raw_text)
                .await
                .map_err(internal("resolve_references"))?;

            // `count` includes the OP, so it equals this reply's ordinal
            let bumps = thread.fixed || count <= policy.bump_limit as usize;
            if bumps {
                thread.bumped_at = now;
            }
            thread.posts.push(number);
            store
                .insert_post(thread, NewPostRecord { post: post.clone(), references })
                .await
                .map_err(internal("insert_post"))?;
            tracing::debug!(board, number, bumped = bumps, "reply stored");
            post
        };

        self.state.metrics.created(board, false);
        self.run_hooks(board, Some(&post), &[]).await;
        Ok(post.number)
    }

    /// Edits a post as its author or a moderator. Returns the stored post.
    #[tracing::instrument(skip_all, fields(board = %board, number = number, ip = %requester.ip))]
    pub async fn edit_post(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        patch: PostPatch,
    ) -> DomainResult<Post> {
        let target = PostKey::new(board, number).to_string();
        self.begin(&requester.ip, "edit_post", &target);
        let result = self.edit_post_inner(requester, board, number, patch).await;
        self.finish(&requester.ip, "edit_post", board, &target, &result);
        result
    }

    async fn edit_post_inner(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        patch: PostPatch,
    ) -> DomainResult<Post> {
        let configured = self.board(board)?;
        self.throttle(&requester.ip, RequestKind::Post, 0)?;
        self.ban_gate(requester, board, UserAction::Posting)?;
        configured.policy.validate_patch(&patch)?;

        let lock = self.board_lock(board);
        let guard = lock.lock().await;
        let store = &self.collab.store;
        let mut post = store
            .find_post(board, number)
            .await
            .map_err(internal("find_post"))?
            .ok_or_else(|| DomainError::not_found("post", PostKey::new(board, number)))?;
        if !self.may_modify(requester, &post, patch.password.as_deref()).await? {
            return Err(Denial::NotOwner.into());
        }

        if let Some(name) = patch.name {
            post.name = if name.trim().is_empty() {
                configured.board.default_user_name.clone()
            } else {
                name
            };
        }
        if let Some(email) = patch.email {
            post.email = email;
        }
        if let Some(subject) = patch.subject {
            post.subject = subject;
        }
        if let Some(draft) = patch.draft {
            post.draft = draft;
        }
        if let Some(markup) = patch.markup {
            post.markup = markup;
        }
        if let Some(user_data) = patch.user_data {
            post.user_data = user_data;
        }
        let references = match patch.text {
            Some(text) => {
                post.raw_text = text.clone();
                post.text = text;
                let refs = ReferenceResolver::resolve(store.as_ref(), &post.key(), &post.raw_text)
                    .await
                    .map_err(internal("resolve_references"))?;
                Some(refs)
            }
            None => None,
        };
        post.modified_at = Some(Utc::now());
        store
            .update_post(&post, references)
            .await
            .map_err(internal("update_post"))?;
        drop(guard);

        self.run_hooks(board, Some(&post), &[]).await;
        Ok(post)
    }

    /// Deletes a post. An OP takes its whole thread with it. Returns the
    /// removed posts.
    #[tracing::instrument(skip(self))]
    pub async fn delete_post(&self, board: &str, number: PostNumber) -> DomainResult<Vec<Post>> {
        self.board(board)?;
        let removed = {
            let lock = self.board_lock(board);
            let _guard = lock.lock().await;
            let store = &self.collab.store;
            let post = store
                .find_post(board, number)
                .await
                .map_err(internal("find_post"))?
                .ok_or_else(|| DomainError::not_found("post", PostKey::new(board, number)))?;
            if post.is_op() {
                store.delete_thread(board, number).await.map_err(internal("delete_thread"))?
            } else {
                store
                    .delete_post(board, number)
                    .await
                    .map_err(internal("delete_post"))?
                    .into_iter()
                    .collect()
            }
        };
        self.state.metrics.deleted(board, removed.len());
        tracing::info!(board, number, removed = removed.len(), "post deleted");
        self.run_hooks(board, None, &removed).await;
        Ok(removed)
    }

    /// Deletion by the post's author (password or hashpass) or a moderator.
    #[tracing::instrument(skip_all, fields(board = %board, number = number, ip = %requester.ip))]
    pub async fn delete_own_post(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        password: &str,
    ) -> DomainResult<Vec<Post>> {
        let target = PostKey::new(board, number).to_string();
        self.begin(&requester.ip, "delete_post", &target);
        let result = self.delete_own_post_inner(requester, board, number, password).await;
        self.finish(&requester.ip, "delete_post", board, &target, &result);
        result
    }

    async fn delete_own_post_inner(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        password: &str,
    ) -> DomainResult<Vec<Post>> {
        self.board(board)?;
        self.ban_gate(requester, board, UserAction::Posting)?;
        let post = self
            .collab
            .store
            .find_post(board, number)
            .await
            .map_err(internal("find_post"))?
            .ok_or_else(|| DomainError::not_found("post", PostKey::new(board, number)))?;
        if !self.may_modify(requester, &post, Some(password)).await? {
            return Err(Denial::NotOwner.into());
        }
        self.delete_post(board, number).await
    }

    /// Detaches one file (by content hash) from a post, as its author or a
    /// moderator. The blob goes once no other post references it.
    #[tracing::instrument(skip_all, fields(board = %board, number = number, ip = %requester.ip))]
    pub async fn delete_file(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        file_hash: &str,
        password: &str,
    ) -> DomainResult<Post> {
        let target = PostKey::new(board, number).to_string();
        self.begin(&requester.ip, "delete_file", &target);
        let result = self.delete_file_inner(requester, board, number, file_hash, password).await;
        self.finish(&requester.ip, "delete_file", board, &target, &result);
        result
    }

    async fn delete_file_inner(
        &self,
        requester: &Requester,
        board: &str,
        number: PostNumber,
        file_hash: &str,
        password: &str,
    ) -> DomainResult<Post> {
        self.board(board)?;
        self.ban_gate(requester, board, UserAction::Posting)?;
        let lock = self.board_lock(board);
        let _guard = lock.lock().await;
        let store = &self.collab.store;
        let mut post = store
            .find_post(board, number)
            .await
            .map_err(internal("find_post"))?
            .ok_or_else(|| DomainError::not_found("post", PostKey::new(board, number)))?;
        if !self.may_modify(requester, &post, Some(password)).await? {
            return Err(Denial::NotOwner.into());
        }
        let Some(index) = post.files.iter().position(|f| f.hash == file_hash) else {
            return Err(DomainError::not_found("file", file_hash));
        };
        let removed = post.files.remove(index);
        post.modified_at = Some(Utc::now());
        store.update_post(&post, None).await.map_err(internal("update_post"))?;
        tracing::info!(board, number, file = %removed.file_name, "file removed from post");
        Ok(post)
    }

    /// Posts of a thread numbered after `after`, in thread order.
    pub async fn new_posts(
        &self,
        board: &str,
        thread: PostNumber,
        after: PostNumber,
    ) -> DomainResult<Vec<Post>> {
        self.board(board)?;
        let lock = self.board_lock(board);
        let _guard = lock.lock().await;
        let store = &self.collab.store;
        let numbers = self.numbers_after(board, thread, after).await?;
        let mut posts = Vec::with_capacity(numbers.len());
        for n in numbers {
            if let Some(post) = store.find_post(board, n).await.map_err(internal("find_post"))? {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    pub async fn new_post_count(&self, board: &str, thread: PostNumber, after: PostNumber) -> DomainResult<usize> {
        self.board(board)?;
        let lock = self.board_lock(board);
        let _guard = lock.lock().await;
        Ok(self.numbers_after(board, thread, after).await?.len())
    }

    async fn numbers_after(&self, board: &str, thread: PostNumber, after: PostNumber) -> DomainResult<Vec<PostNumber>> {
        let thread = self
            .collab
            .store
            .find_thread(board, thread)
            .await
            .map_err(internal("find_thread"))?
            .ok_or_else(|| DomainError::not_found("thread", PostKey::new(board, thread)))?;
        Ok(thread.posts.into_iter().filter(|n| *n > after).collect())
    }

    /// Thread row plus its posts in order, for readers that passed
    /// [`PostingEngine::check_access`].
    pub async fn thread_with_posts(&self, board: &str, number: PostNumber) -> DomainResult<(Thread, Vec<Post>)> {
        let store = &self.collab.store;
        let thread = store
            .find_thread(board, number)
            .await
            .map_err(internal("find_thread"))?
            .ok_or_else(|| DomainError::not_found("thread", PostKey::new(board, number)))?;
        let mut posts = Vec::with_capacity(thread.posts.len());
        for n in &thread.posts {
            if let Some(post) = store.find_post(board, *n).await.map_err(internal("find_post"))? {
                posts.push(post);
            }
        }
        Ok((thread, posts))
    }
}
