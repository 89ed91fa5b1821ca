use crate::error::ConfigsError;
use config::{Config, Environment, File, FileFormat};
use domains::{Board, BoardCapabilities, BoardPolicy, ALL_BOARDS};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Default location of the settings file, without extension.
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub site: SiteSettings,
    pub system: SystemSettings,
    pub ddos: DdosSettings,
    /// Limits every board inherits
    pub board_defaults: BoardPolicy,
    pub boards: Vec<BoardSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Salt mixed into tripcodes derived from hashpasses
    pub tripcode_salt: SecretString,
    /// Used when a poster leaves the password field empty
    pub default_post_password: SecretString,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            tripcode_salt: SecretString::from(String::new()),
            default_post_password: SecretString::from(String::new()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Concurrent heavy operations; defaults to the available parallelism
    pub max_render_threads: Option<usize>,
    /// Comma separated IP ranges never written to the action log,
    /// e.g. `127.0.0.1,192.168.0.1-192.168.0.255`
    pub logging_skip_ip: String,
    /// Root of the flat resource files (`res/`, `news/`, `custom/`, ...)
    pub resources_dir: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            max_render_threads: None,
            logging_skip_ip: String::new(),
            resources_dir: PathBuf::from("resources"),
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DdosSettings {
    /// Accumulated weight per window that triggers a block
    pub limit: f64,
    pub period_secs: u64,
    pub ban_period_secs: u64,
    pub clear_period_secs: u64,
    pub read_weight: f64,
    pub post_weight: f64,
    pub thread_weight: f64,
    pub upload_weight_per_mib: f64,
}

impl Default for DdosSettings {
    fn default() -> Self {
        Self {
            limit: 10_000.0,
            period_secs: 10,
            ban_period_secs: 60,
            clear_period_secs: 60 * 60,
            read_weight: 12.0,
            post_weight: 200.0,
            thread_weight: 500.0,
            upload_weight_per_mib: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSettings {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub default_user_name: Option<String>,
    #[serde(default)]
    pub capabilities: BoardCapabilities,
    #[serde(default)]
    pub limits: PolicyOverrides,
}

/// Per-board overrides; unset fields fall back to `board_defaults`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub bump_limit: Option<u32>,
    pub post_limit: Option<u32>,
    pub thread_limit: Option<u32>,
    pub archive_limit: Option<u32>,
    pub max_file_size: Option<u64>,
    pub max_file_count: Option<u32>,
    pub max_email_length: Option<usize>,
    pub max_name_length: Option<usize>,
    pub max_subject_length: Option<usize>,
    pub max_text_length: Option<usize>,
    pub max_password_length: Option<usize>,
    pub supported_file_types: Option<Vec<String>>,
    pub posting_enabled: Option<bool>,
}

impl PolicyOverrides {
    pub fn apply(&self, base: &BoardPolicy) -> BoardPolicy {
        BoardPolicy {
            bump_limit: self.bump_limit.unwrap_or(base.bump_limit),
            post_limit: self.post_limit.unwrap_or(base.post_limit),
            thread_limit: self.thread_limit.unwrap_or(base.thread_limit),
            archive_limit: self.archive_limit.unwrap_or(base.archive_limit),
            max_file_size: self.max_file_size.unwrap_or(base.max_file_size),
            max_file_count: self.max_file_count.unwrap_or(base.max_file_count),
            max_email_length: self.max_email_length.unwrap_or(base.max_email_length),
            max_name_length: self.max_name_length.unwrap_or(base.max_name_length),
            max_subject_length: self.max_subject_length.unwrap_or(base.max_subject_length),
            max_text_length: self.max_text_length.unwrap_or(base.max_text_length),
            max_password_length: self.max_password_length.unwrap_or(base.max_password_length),
            supported_file_types: self
                .supported_file_types
                .clone()
                .unwrap_or_else(|| base.supported_file_types.clone()),
            posting_enabled: self.posting_enabled.unwrap_or(base.posting_enabled),
        }
    }
}

impl Settings {
    /// Loads `.env`, then the settings file named by `BOARD_CONFIG`
    /// (default `config/default`, optional), then `BOARD_*` variables
    /// with `__` as the section separator (`BOARD__DDOS__LIMIT=500`).
    pub fn load() -> Result<Self, ConfigsError> {
        dotenvy::dotenv().ok();
        let path = std::env::var("BOARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let cfg = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("BOARD").separator("__"))
            .build()?;
        Self::from_config(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigsError> {
        let cfg = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Self::from_config(cfg)
    }

    fn from_config(cfg: Config) -> Result<Self, ConfigsError> {
        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(boards = settings.boards.len(), "settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigsError> {
        if self.system.max_render_threads == Some(0) {
            return Err(ConfigsError::Invalid("system.max_render_threads must be positive".into()));
        }
        if self.ddos.limit <= 0.0 {
            return Err(ConfigsError::Invalid("ddos.limit must be positive".into()));
        }
        let mut seen = HashSet::new();
        for board in &self.boards {
            let name = board.name.trim();
            if name.is_empty() || name == ALL_BOARDS || name.contains('/') {
                return Err(ConfigsError::Invalid(format!("invalid board name {:?}", board.name)));
            }
            if !seen.insert(name) {
                return Err(ConfigsError::Invalid(format!("duplicate board /{name}/")));
            }
            let policy = board.limits.apply(&self.board_defaults);
            if policy.thread_limit == 0 || policy.post_limit == 0 {
                return Err(ConfigsError::Invalid(format!(
                    "/{name}/: thread_limit and post_limit must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Builds the board set; a reload replaces the whole set.
    pub fn boards(&self) -> Vec<Board> {
        self.boards
            .iter()
            .map(|b| Board {
                name: b.name.trim().to_string(),
                title: b.title.clone(),
                default_user_name: b
                    .default_user_name
                    .clone()
                    .unwrap_or_else(|| "Anonymous".to_string()),
                policy: b.limits.apply(&self.board_defaults),
                capabilities: b.capabilities.clone(),
            })
            .collect()
    }

    /// `logging_skip_ip` split into its comma separated entries.
    pub fn logging_skip_ips(&self) -> Vec<String> {
        self.system
            .logging_skip_ip
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
        [site]
        tripcode_salt = "pepper"

        [system]
        logging_skip_ip = "127.0.0.1, 192.168.0.1-192.168.0.255"
        max_render_threads = 4

        [ddos]
        limit = 500

        [board_defaults]
        bump_limit = 300
        thread_limit = 100

        [[boards]]
        name = "b"
        title = "Random"

        [[boards]]
        name = "vg"
        title = "Video games"
        default_user_name = "Player"
        capabilities = { show_whois = true }
        limits = { bump_limit = 3, archive_limit = 10 }
    "#;

    #[test]
    fn boards_inherit_defaults_and_apply_overrides() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        let boards = settings.boards();
        assert_eq!(boards.len(), 2);

        let b = &boards[0];
        assert_eq!(b.policy.bump_limit, 300);
        assert_eq!(b.policy.thread_limit, 100);
        assert_eq!(b.policy.post_limit, 1000);
        assert_eq!(b.default_user_name, "Anonymous");

        let vg = &boards[1];
        assert_eq!(vg.policy.bump_limit, 3);
        assert_eq!(vg.policy.archive_limit, 10);
        assert_eq!(vg.policy.thread_limit, 100);
        assert_eq!(vg.default_user_name, "Player");
        assert!(vg.capabilities.show_whois);
        assert!(vg.capabilities.drafts_enabled);
    }

    #[test]
    fn sections_fall_back_to_defaults() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.ddos.limit, 500.0);
        assert_eq!(settings.ddos.period_secs, 10);
        assert_eq!(settings.ddos.ban_period_secs, 60);
        assert_eq!(settings.system.max_render_threads, Some(4));
        assert_eq!(settings.site.tripcode_salt.expose_secret(), "pepper");
        assert_eq!(settings.site.default_post_password.expose_secret(), "");
        assert_eq!(
            settings.logging_skip_ips(),
            vec!["127.0.0.1".to_string(), "192.168.0.1-192.168.0.255".to_string()]
        );
    }

    #[test]
    fn duplicate_boards_are_rejected() {
        let text = r#"
            [[boards]]
            name = "b"
            title = "one"
            [[boards]]
            name = "b"
            title = "two"
        "#;
        assert!(matches!(Settings::from_toml(text), Err(ConfigsError::Invalid(_))));
    }

    #[test]
    fn wildcard_board_name_is_reserved() {
        let text = r#"
            [[boards]]
            name = "*"
            title = "all"
        "#;
        assert!(matches!(Settings::from_toml(text), Err(ConfigsError::Invalid(_))));
    }

    #[test]
    fn zero_thread_limit_is_rejected() {
        let text = r#"
            [[boards]]
            name = "b"
            title = "Random"
            limits = { thread_limit = 0 }
        "#;
        assert!(matches!(Settings::from_toml(text), Err(ConfigsError::Invalid(_))));
    }
}
