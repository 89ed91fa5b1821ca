use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}
