//! Error types for mailbox-access

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Folder {folder} unavailable: {reason}")]
    FolderUnavailable { folder: String, reason: String },

    #[error("Move failed at {step}: {reason}")]
    Move { step: MoveStep, reason: String },

    #[error("Message UID {uid} not found in {folder}")]
    MessageNotFound { folder: String, uid: u32 },

    #[error("Email parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Session already closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, Error>;

/// The ordered steps of a cross-folder move.
///
/// `EnsureTarget` and `Expunge` are best-effort and only ever show up in
/// warnings; the others abort the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStep {
    EnsureTarget,
    OpenSource,
    Copy,
    MarkDeleted,
    Expunge,
}

impl MoveStep {
    /// Whether a failure at this step aborts the move.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::OpenSource | Self::Copy | Self::MarkDeleted)
    }
}

impl fmt::Display for MoveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnsureTarget => "ensure-target",
            Self::OpenSource => "open-source",
            Self::Copy => "copy",
            Self::MarkDeleted => "mark-deleted",
            Self::Expunge => "expunge",
        })
    }
}
