//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILCLOUD_CONFIG` (environment variable)
//! 2. `~/.config/mailcloud/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailcloud\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The IMAP password should come from `$MAILCLOUD_PASSWORD` rather than the file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MailcloudError, Result};

/// Environment variable holding the app password.
pub const PASSWORD_ENV: &str = "MAILCLOUD_PASSWORD";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MAILCLOUD_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mailbox connection.
    pub imap: ImapConfig,
    /// Snapshot files.
    pub export: ExportConfig,
    /// Date enrichment.
    pub enrich: EnrichConfig,
    /// Word-cloud rendering.
    pub cloud: CloudConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory receiving the CSV snapshots and the word-cloud image.
    pub output_dir: PathBuf,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Mailbox connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    /// Server host name.
    pub host: String,
    /// TLS port (993 for implicit TLS).
    pub port: u16,
    /// Account identifier, usually the full email address.
    pub username: String,
    /// App password. Prefer `$MAILCLOUD_PASSWORD`.
    pub password: Option<String>,
    /// Folder to read.
    pub folder: String,
    /// Walk message identifiers from the highest (newest) down.
    pub newest_first: bool,
}

/// Snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Stage-1 file name.
    pub raw_file: String,
    /// Stage-2 file name.
    pub cleaned_file: String,
    /// Stage-3 file name.
    pub final_file: String,
    /// Field separator of the stage-3 file.
    pub final_separator: char,
    /// Prefix files with a UTF-8 BOM.
    pub utf8_bom: bool,
}

/// Which clock the date-derived columns are read on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// The sender's wall clock, as written in the `Date:` header.
    #[default]
    Sender,
    /// Converted to UTC.
    Utc,
}

/// Date enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub clock: ClockMode,
}

/// Word-cloud rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Background color.
    pub background: [u8; 3],
    /// Color of the least frequent words.
    pub gradient_start: [u8; 3],
    /// Color of the most frequent words.
    pub gradient_end: [u8; 3],
    /// Maximum number of words drawn.
    pub max_words: usize,
    /// Font size of the most frequent word.
    pub max_font_size: f32,
    /// Words that do not fit at this size are dropped.
    pub min_font_size: f32,
    /// Size decrement when a word does not fit.
    pub font_step: f32,
    /// Free pixels around each word.
    pub margin: u32,
    /// TrueType/OpenType font; common system fonts are tried when unset.
    pub font: Option<PathBuf>,
    /// Additional words to ignore.
    pub extra_stopwords: Vec<String>,
    /// Image file name, relative to the output directory.
    pub output: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            username: String::new(),
            password: None,
            folder: "INBOX".to_string(),
            newest_first: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            raw_file: "emails.csv".to_string(),
            cleaned_file: "emails_cleaned.csv".to_string(),
            final_file: "emails_final.csv".to_string(),
            final_separator: '|',
            utf8_bom: false,
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            background: [255, 255, 255],
            gradient_start: [0x11, 0x8D, 0xFF],
            gradient_end: [0xF2, 0xC8, 0x11],
            max_words: 200,
            max_font_size: 96.0,
            min_font_size: 10.0,
            font_step: 2.0,
            margin: 2,
            font: None,
            extra_stopwords: Vec::new(),
            output: "wordcloud.png".to_string(),
        }
    }
}

impl ImapConfig {
    /// Resolve the app password: `$MAILCLOUD_PASSWORD` first, then the file.
    pub fn resolve_password(&self) -> Result<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.password.clone().filter(|p| !p.is_empty()))
            .ok_or_else(|| {
                MailcloudError::MissingCredentials(format!(
                    "set {PASSWORD_ENV} or imap.password"
                ))
            })
    }

    /// Check that an account identifier is configured.
    pub fn require_username(&self) -> Result<&str> {
        if self.username.trim().is_empty() {
            return Err(MailcloudError::MissingCredentials(
                "imap.username (or --user)".to_string(),
            ));
        }
        Ok(&self.username)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Write a template configuration to the standard location.
///
/// The password is never written; an existing file is left untouched.
pub fn write_template() -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if path.exists() {
        anyhow::bail!("Config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut template = Config::default();
    template.imap.username = "you@example.com".to_string();
    let contents = toml::to_string_pretty(&template)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Wrote config template");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailcloud").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailcloud")
}
