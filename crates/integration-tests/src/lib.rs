//! Shared fixtures for the end-to-end tests: an engine wired to the
//! in-memory adapters, plus payload and requester helpers.

use bytes::Bytes;
use configs::Settings;
use domains::{
    Board, BoardPolicy, Hashpass, NewPost, Rating, RegisteredUser, Requester, RssGenerator,
    SearchIndex, UploadedFile, UserLevel,
};
use services::{Collaborators, PostingEngine, SharedState, SiteSecrets};
use std::path::PathBuf;
use std::sync::Arc;
use storage_adapters::{
    InMemoryStore, InMemoryUserDirectory, MemorySearchIndex, NoopRssGenerator, UnknownLocation,
};

pub struct Harness {
    pub engine: Arc<PostingEngine>,
    pub store: Arc<InMemoryStore>,
    pub search: Arc<MemorySearchIndex>,
    pub users: Arc<InMemoryUserDirectory>,
}

/// Settings with a throttle loose enough that tests never trip it.
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.ddos.limit = 1e12;
    settings.system.resources_dir = PathBuf::from("no-such-resources-dir");
    settings
}

pub fn board(name: &str, tweak: impl FnOnce(&mut BoardPolicy)) -> Board {
    let mut board = Board::new(name, name.to_uppercase());
    tweak(&mut board.policy);
    board
}

pub fn harness(boards: Vec<Board>) -> Harness {
    harness_with(boards, &settings())
}

pub fn harness_with(boards: Vec<Board>, settings: &Settings) -> Harness {
    let search = Arc::new(MemorySearchIndex::new());
    let (engine, store, users) = engine_with_hooks(
        boards,
        settings,
        Arc::clone(&search) as Arc<dyn SearchIndex>,
        Arc::new(NoopRssGenerator),
    );
    Harness { engine, store, search, users }
}

/// Engine over the in-memory store with caller-supplied search and RSS
/// adapters (e.g. mocks).
pub fn engine_with_hooks(
    boards: Vec<Board>,
    settings: &Settings,
    search: Arc<dyn SearchIndex>,
    rss: Arc<dyn RssGenerator>,
) -> (Arc<PostingEngine>, Arc<InMemoryStore>, Arc<InMemoryUserDirectory>) {
    let store = Arc::new(InMemoryStore::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let collab = Collaborators {
        store: Arc::clone(&store) as _,
        geo: Arc::new(UnknownLocation),
        search,
        rss,
        users: Arc::clone(&users) as _,
    };
    let engine = PostingEngine::new(
        collab,
        SharedState::from_settings(settings),
        SiteSecrets::from_settings(settings),
        boards,
    );
    (Arc::new(engine), store, users)
}

pub fn text(s: &str) -> NewPost {
    NewPost { text: s.to_string(), ..NewPost::default() }
}

pub fn with_password(s: &str, password: &str) -> NewPost {
    NewPost { password: password.to_string(), ..text(s) }
}

pub fn with_file(s: &str, contents: &'static [u8]) -> NewPost {
    NewPost {
        files: vec![UploadedFile {
            file_name: "pic.png".into(),
            mime_type: "image/png".into(),
            data: Bytes::from_static(contents),
            rating: Rating::Safe,
        }],
        ..text(s)
    }
}

pub fn anon(ip: &str) -> Requester {
    Requester::anonymous(ip)
}

pub fn hashpass(seed: u8) -> Hashpass {
    Hashpass::from_bytes([seed; 20])
}

/// Registers a moderator of `boards` and returns them as a requester.
pub fn moderator(harness_users: &InMemoryUserDirectory, seed: u8, boards: &[&str]) -> Requester {
    let hp = hashpass(seed);
    harness_users.register(RegisteredUser {
        hashpass: hp,
        level: UserLevel::MODER,
        boards: boards.iter().map(|b| b.to_string()).collect(),
    });
    Requester::with_hashpass("127.0.0.1", hp)
}
