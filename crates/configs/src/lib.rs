//! # configs
//!
//! Layered settings for the engine: an optional TOML file, then `BOARD__*`
//! environment variables (a `.env` file is honoured). Per-board limits
//! inherit from `board_defaults` and may be overridden board by board.

mod error;
mod settings;

pub use error::ConfigsError;
pub use settings::*;
