//! Centralized error types for mailcloud.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailcloud library.
///
/// Every variant is fatal for the run: per-field decode problems and
/// unparseable dates are tolerated inside the pipeline and never surface here.
#[derive(Error, Debug)]
pub enum MailcloudError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The TLS or TCP connection to the mail server could not be established.
    #[error("Could not connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// The server rejected the credentials.
    #[error("Authentication failed for '{user}': {reason}")]
    Auth { user: String, reason: String },

    /// The requested folder does not exist on the server.
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// Any other IMAP protocol or transport failure during the session.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// A required credential was not configured.
    #[error("Missing credential: {0}")]
    MissingCredentials(String),

    /// A delimited snapshot could not be read back.
    #[error("Malformed table '{path}' at line {line}: {reason}")]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// No usable font file was found for rendering.
    #[error("No font found (searched: {0})")]
    FontNotFound(String),

    /// The font file exists but could not be parsed.
    #[error("Invalid font file: {0}")]
    InvalidFont(PathBuf),
}

/// Convenience alias for `Result<T, MailcloudError>`.
pub type Result<T> = std::result::Result<T, MailcloudError>;

impl MailcloudError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short name of the pipeline stage this error interrupts.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Connect { .. } | Self::Auth { .. } | Self::MissingCredentials(_) => "connect",
            Self::FolderNotFound(_) | Self::Imap(_) => "fetch",
            Self::Io { .. } | Self::MalformedTable { .. } => "export",
            Self::FontNotFound(_) | Self::InvalidFont(_) => "render",
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `MailcloudError`
/// when no path context is available (rare, prefer `MailcloudError::io`).
impl From<std::io::Error> for MailcloudError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

impl From<imap::error::Error> for MailcloudError {
    fn from(e: imap::error::Error) -> Self {
        Self::Imap(e.to_string())
    }
}
