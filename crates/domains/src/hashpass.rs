//! # Hashpass
//!
//! A 20-byte credential derived from a user-chosen secret. Its textual form
//! is five dash-separated groups of eight hex digits
//! (`0123abcd-4567ef01-...`, 44 characters).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const HASHPASS_LEN: usize = 20;
const GROUP_BYTES: usize = 4;
const TEXT_LEN: usize = 44;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hashpass([u8; HASHPASS_LEN]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashpassParseError {
    #[error("hashpass must be {TEXT_LEN} characters long, got {0}")]
    Length(usize),
    #[error("hashpass must consist of 5 groups separated by '-'")]
    Groups,
    #[error("hashpass group {0} is not 8 hex digits")]
    InvalidGroup(usize),
}

impl Hashpass {
    pub const fn from_bytes(bytes: [u8; HASHPASS_LEN]) -> Self {
        Self(bytes)
    }

    /// Accepts exactly 20 bytes; anything else is not a hashpass.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; HASHPASS_LEN]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; HASHPASS_LEN] {
        &self.0
    }
}

impl fmt::Display for Hashpass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.0.chunks(GROUP_BYTES).enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            f.write_str(&hex::encode(chunk))?;
        }
        Ok(())
    }
}

// The raw bytes are a credential; keep them out of debug output.
impl fmt::Debug for Hashpass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hashpass(..)")
    }
}

impl FromStr for Hashpass {
    type Err = HashpassParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != TEXT_LEN {
            return Err(HashpassParseError::Length(s.len()));
        }
        let groups: Vec<&str> = s.split('-').collect();
        if groups.len() != HASHPASS_LEN / GROUP_BYTES {
            return Err(HashpassParseError::Groups);
        }
        let mut bytes = [0u8; HASHPASS_LEN];
        for (i, (group, out)) in groups.iter().zip(bytes.chunks_mut(GROUP_BYTES)).enumerate() {
            hex::decode_to_slice(group, out).map_err(|_| HashpassParseError::InvalidGroup(i))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Hashpass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hashpass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
