//! # domains
//!
//! Entities, value types, the error taxonomy and the port traits of the
//! posting & moderation engine. Nothing in here performs I/O.

pub mod errors;
pub mod hashpass;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use hashpass::*;
pub use models::*;
pub use ports::*;
