//! # DomainError
//!
//! Every rejection carries a distinguishable reason. Expected rejections
//! (bans, limits, ownership) are values, not panics.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why an authorised action was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("posting is restricted on {}: {reason}", board_label(.board))]
    PostingBanned {
        board: String,
        reason: String,
        expires: Option<DateTime<Utc>>,
    },

    #[error("reading and posting are restricted on {}: {reason}", board_label(.board))]
    ReadingBanned {
        board: String,
        reason: String,
        expires: Option<DateTime<Utc>>,
    },

    /// Coarse address-range ban; carries no reason
    #[error("address range is banned (level {level})")]
    IpBanned { level: u8 },

    #[error("not the author of this post")]
    NotOwner,

    #[error("insufficient moderator level on /{0}/")]
    NotModerator(String),
}

fn board_label(board: &str) -> String {
    if board == crate::models::ALL_BOARDS {
        "all boards".to_string()
    } else {
        format!("/{board}/")
    }
}

/// The primary error type for all engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Policy violation (field length, file size/type/count, closed thread)
    #[error("validation error: {0}")]
    Validation(String),

    /// Ban, ownership or moderator-level failure
    #[error("denied: {0}")]
    Denied(#[from] Denial),

    /// Abuse throttle tripped for this address
    #[error("too many requests from {0}")]
    RateLimited(String),

    /// Resource not found (board, thread, post)
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Infrastructure failure; details are logged where it happened
    #[error("internal error")]
    Internal,
}

impl DomainError {
    pub fn validation(reason: impl Into<String>) -> Self {
        DomainError::Validation(reason.into())
    }

    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        DomainError::NotFound { kind, key: key.to_string() }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation",
            DomainError::Denied(Denial::PostingBanned { .. }) => "posting_banned",
            DomainError::Denied(Denial::ReadingBanned { .. }) => "reading_banned",
            DomainError::Denied(Denial::IpBanned { .. }) => "ip_banned",
            DomainError::Denied(Denial::NotOwner) => "not_owner",
            DomainError::Denied(Denial::NotModerator(_)) => "not_moderator",
            DomainError::RateLimited(_) => "rate_limited",
            DomainError::NotFound { .. } => "not_found",
            DomainError::Internal => "internal",
        }
    }
}

/// A specialized Result type for engine logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
