//! Hashing helpers: hashpass derivation, post passwords, tripcodes and
//! content addresses for uploaded files.

use domains::Hashpass;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Derives the 20-byte hashpass from a user's secret phrase.
pub fn hashpass_from_secret(secret: &str) -> Hashpass {
    let digest = Sha256::digest(secret.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[..20]);
    Hashpass::from_bytes(bytes)
}

/// SHA-256 of the post password. An empty password falls back to the
/// site-wide default.
pub fn hash_password(password: &str, default: &SecretString) -> Vec<u8> {
    let effective = if password.is_empty() {
        default.expose_secret()
    } else {
        password
    };
    Sha256::digest(effective.as_bytes()).to_vec()
}

/// Stable public tag for a hashpass: `!` + 10 hex characters of
/// HMAC-SHA256(salt, hashpass).
pub fn tripcode(salt: &SecretString, hashpass: &Hashpass) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(salt.expose_secret().as_bytes()) else {
        return String::new();
    };
    mac.update(hashpass.as_bytes());
    let code = hex::encode(mac.finalize().into_bytes());
    format!("!{}", &code[..10])
}

/// Hex SHA-256 of a file's bytes; identical uploads share this address.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
