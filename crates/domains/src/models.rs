//! # Domain Models
//!
//! Boards, threads, posts, files, references and bans.
//!
//! Threads and posts are addressed by `(board, number)`. A thread keeps the
//! ordered numbers of its posts and a post keeps the number of its thread;
//! both are lookups through the store, never ownership.

use crate::hashpass::Hashpass;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PostNumber = u64;

/// Board name meaning "every board" in ban records and moderator scopes.
pub const ALL_BOARDS: &str = "*";

/// Board-qualified post address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostKey {
    pub board: String,
    pub number: PostNumber,
}

impl PostKey {
    pub fn new(board: impl Into<String>, number: PostNumber) -> Self {
        Self { board: board.into(), number }
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.board, self.number)
    }
}

/// Numeric limits for a board, read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardPolicy {
    /// Replies (OP excluded) after which a non-fixed thread stops bumping
    pub bump_limit: u32,
    /// Maximum posts per thread, OP included
    pub post_limit: u32,
    /// Maximum live (non-archived) threads per board
    pub thread_limit: u32,
    /// Maximum archived threads; 0 disables archiving
    pub archive_limit: u32,
    /// Bytes
    pub max_file_size: u64,
    pub max_file_count: u32,
    pub max_email_length: usize,
    pub max_name_length: usize,
    pub max_subject_length: usize,
    pub max_text_length: usize,
    pub max_password_length: usize,
    /// MIME globs, e.g. `image/*`
    pub supported_file_types: Vec<String>,
    pub posting_enabled: bool,
}

impl Default for BoardPolicy {
    fn default() -> Self {
        Self {
            bump_limit: 500,
            post_limit: 1000,
            thread_limit: 200,
            archive_limit: 0,
            max_file_size: 10 * 1024 * 1024,
            max_file_count: 1,
            max_email_length: 150,
            max_name_length: 50,
            max_subject_length: 150,
            max_text_length: 15000,
            max_password_length: 150,
            supported_file_types: [
                "audio/mpeg",
                "audio/ogg",
                "audio/wav",
                "image/gif",
                "image/jpeg",
                "image/png",
                "video/mp4",
                "video/ogg",
                "video/webm",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            posting_enabled: true,
        }
    }
}

/// Per-board feature switches. Boards differ by data, not by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardCapabilities {
    pub custom_markup: bool,
    pub show_whois: bool,
    pub drafts_enabled: bool,
}

impl Default for BoardCapabilities {
    fn default() -> Self {
        Self { custom_markup: false, show_whois: false, drafts_enabled: true }
    }
}

/// Represents a single board (e.g., /b/, /vg/)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// The URL slug (e.g., "b" for /b/)
    pub name: String,
    pub title: String,
    pub default_user_name: String,
    pub policy: BoardPolicy,
    pub capabilities: BoardCapabilities,
}

impl Board {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            default_user_name: "Anonymous".to_string(),
            policy: BoardPolicy::default(),
            capabilities: BoardCapabilities::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub board: String,
    /// Same as the number of its opening post
    pub number: PostNumber,
    pub created_at: DateTime<Utc>,
    /// The timestamp used for sorting threads by activity
    pub bumped_at: DateTime<Utc>,
    pub archived: bool,
    /// Pinned: sorted first, never demoted or evicted
    pub fixed: bool,
    pub posting_enabled: bool,
    pub draft: bool,
    /// Post numbers in insertion order; the first one is the OP
    pub posts: Vec<PostNumber>,
}

impl Thread {
    pub fn new(board: impl Into<String>, number: PostNumber, now: DateTime<Utc>) -> Self {
        Self {
            board: board.into(),
            number,
            created_at: now,
            bumped_at: now,
            archived: false,
            fixed: false,
            posting_enabled: true,
            draft: false,
            posts: vec![number],
        }
    }

    pub fn key(&self) -> PostKey {
        PostKey::new(self.board.clone(), self.number)
    }

    /// Bump-order comparison: fixed threads first, then most recently bumped.
    pub fn bump_order(a: &Thread, b: &Thread) -> std::cmp::Ordering {
        b.fixed
            .cmp(&a.fixed)
            .then_with(|| b.bumped_at.cmp(&a.bumped_at))
            .then_with(|| b.number.cmp(&a.number))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationInfo {
    pub country_code: String,
    pub country_name: String,
    pub city_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupFlags {
    pub raw_html: bool,
    pub extended_wakaba_mark: bool,
    pub bb_code: bool,
}

/// Content rating of an attached file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Rating {
    #[default]
    Safe,
    R15,
    R18,
    R18G,
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        match r {
            Rating::Safe => 0,
            Rating::R15 => 15,
            Rating::R18 => 18,
            Rating::R18G => 180,
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Rating::Safe),
            15 => Ok(Rating::R15),
            18 => Ok(Rating::R18),
            180 => Ok(Rating::R18G),
            other => Err(format!("unknown rating {other}")),
        }
    }
}

impl Rating {
    /// Parses the form labels `SFW`, `R-15`, `R-18`, `R-18G`; unknown labels are safe.
    pub fn from_label(label: &str) -> Self {
        match label {
            "R-15" => Rating::R15,
            "R-18" => Rating::R18,
            "R-18G" => Rating::R18G,
            _ => Rating::Safe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A stored file. Content-addressed: `hash` is the hex SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub hash: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub thumbnail: Option<Thumbnail>,
    pub rating: Rating,
    pub metadata: serde_json::Value,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub board: String,
    pub number: PostNumber,
    /// Number of the owning thread
    pub thread: PostNumber,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub poster_ip: String,
    pub geo: GeolocationInfo,
    /// SHA-256 of the poster's password, used for anonymous ownership
    pub password: Vec<u8>,
    pub hashpass: Option<Hashpass>,
    pub draft: bool,
    pub banned_for: bool,
    pub markup: MarkupFlags,
    pub sign_as_op: bool,
    pub show_tripcode: bool,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub text: String,
    pub raw_text: String,
    pub files: Vec<FileInfo>,
    /// Opaque bucket for board extensions
    pub user_data: serde_json::Value,
}

impl Post {
    pub fn key(&self) -> PostKey {
        PostKey::new(self.board.clone(), self.number)
    }

    pub fn is_op(&self) -> bool {
        self.number == self.thread
    }
}

/// Directed citation edge `source → target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostReference {
    pub source: PostKey,
    pub target: PostKey,
}

/// Everything the store must write for one new post, as a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPostRecord {
    pub post: Post,
    pub references: Vec<PostReference>,
}

/// Ordinal restriction level. Compare with `>=`, never `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BanLevel(pub u8);

impl BanLevel {
    pub const NONE: BanLevel = BanLevel(0);
    pub const POSTING: BanLevel = BanLevel(1);
    pub const READING: BanLevel = BanLevel(10);

    pub fn blocks(self, action: UserAction) -> bool {
        self >= action.level()
    }
}

/// An action gated by bans; its level matches `BanLevel` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAction {
    Posting,
    Reading,
}

impl UserAction {
    pub fn level(self) -> BanLevel {
        match self {
            UserAction::Posting => BanLevel::POSTING,
            UserAction::Reading => BanLevel::READING,
        }
    }
}

/// Who a ban record applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    Ip(String),
    Hashpass(Hashpass),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Ip(ip) => f.write_str(ip),
            Identity::Hashpass(_) => f.write_str("hashpass"),
        }
    }
}

/// Represents a moderation action against an identity on one board (or `*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanInfo {
    pub board: String,
    pub level: BanLevel,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// `None` means permanent
    pub expires: Option<DateTime<Utc>>,
}

impl BanInfo {
    pub fn new(board: impl Into<String>, level: BanLevel, reason: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            level,
            reason: reason.into(),
            created_at: Utc::now(),
            expires: None,
        }
    }

    pub fn expiring(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| now > at)
    }
}

/// Registered-user level thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserLevel(pub u32);

impl UserLevel {
    pub const USER: UserLevel = UserLevel(1);
    pub const MODER: UserLevel = UserLevel(10);
    pub const ADMIN: UserLevel = UserLevel(100);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub hashpass: Hashpass,
    pub level: UserLevel,
    /// Board names, or `*` for all
    pub boards: Vec<String>,
}

impl RegisteredUser {
    pub fn moderates(&self, board: &str) -> bool {
        self.level >= UserLevel::MODER
            && self.boards.iter().any(|b| b == ALL_BOARDS || b == board)
    }
}

/// The client performing an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub ip: String,
    pub hashpass: Option<Hashpass>,
}

impl Requester {
    pub fn anonymous(ip: impl Into<String>) -> Self {
        Self { ip: ip.into(), hashpass: None }
    }

    pub fn with_hashpass(ip: impl Into<String>, hashpass: Hashpass) -> Self {
        Self { ip: ip.into(), hashpass: Some(hashpass) }
    }
}

/// A file as uploaded, before it becomes a `FileInfo`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
    pub rating: Rating,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Payload of a new thread or reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub text: String,
    /// Plain password; empty falls back to the configured default
    pub password: String,
    pub draft: bool,
    pub markup: MarkupFlags,
    pub sign_as_op: bool,
    pub show_tripcode: bool,
    pub files: Vec<UploadedFile>,
    pub user_data: serde_json::Value,
}

impl NewPost {
    pub fn upload_bytes(&self) -> u64 {
        self.files.iter().map(UploadedFile::size).sum()
    }
}

/// Edited fields of an existing post; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    /// Password proving anonymous ownership
    pub password: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub draft: Option<bool>,
    pub markup: Option<MarkupFlags>,
    pub user_data: Option<serde_json::Value>,
}
