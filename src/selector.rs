//! Opening folders and reading their metadata

use crate::connection::Session;
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// How a folder is opened. Flag changes and expunge need `ReadWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// `EXAMINE`
    ReadOnly,
    /// `SELECT`
    ReadWrite,
}

/// Folder metadata as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderStatus {
    pub name: String,
    pub exists: u32,
    /// Number of unseen messages. Only `STATUS` reports this; the
    /// `[UNSEEN n]` code of `SELECT` is a sequence number, not a count.
    pub unseen: Option<u32>,
    pub uid_validity: Option<u32>,
}

impl Session {
    /// Open `folder`, starting a new sequence-number generation.
    ///
    /// # Errors
    ///
    /// [`Error::FolderUnavailable`] if the server refuses the folder.
    /// A lost connection is [`Error::Io`] or [`Error::Imap`], never
    /// `FolderUnavailable`.
    pub async fn open_folder(&mut self, folder: &str, mode: AccessMode) -> Result<FolderStatus> {
        let imap = self.imap()?;
        let mailbox = match mode {
            AccessMode::ReadOnly => imap.examine(folder).await,
            AccessMode::ReadWrite => imap.select(folder).await,
        }
        .map_err(|e| open_failure(folder, e))?;

        debug!("Opened {} {:?}: {} messages", folder, mode, mailbox.exists);
        Ok(FolderStatus {
            name: folder.to_string(),
            exists: mailbox.exists,
            unseen: None,
            uid_validity: mailbox.uid_validity,
        })
    }

    /// Message and unseen counts via `STATUS`, without opening the folder.
    ///
    /// # Errors
    ///
    /// [`Error::FolderUnavailable`] if the server refuses the folder.
    pub async fn status(&mut self, folder: &str) -> Result<FolderStatus> {
        let mailbox = self
            .imap()?
            .status(folder, "(MESSAGES UNSEEN UIDVALIDITY)")
            .await
            .map_err(|e| open_failure(folder, e))?;

        Ok(FolderStatus {
            name: folder.to_string(),
            exists: mailbox.exists,
            unseen: mailbox.unseen,
            uid_validity: mailbox.uid_validity,
        })
    }
}

/// Only a tagged NO or BAD means the server refused this folder; any
/// other failure is the connection's and must not be mistaken for it.
fn open_failure(folder: &str, e: async_imap::error::Error) -> Error {
    use async_imap::error::Error as ImapError;

    match e {
        ImapError::No(reason) | ImapError::Bad(reason) => Error::FolderUnavailable {
            folder: folder.to_string(),
            reason,
        },
        ImapError::Io(e) => Error::Io(e),
        other => Error::Imap(format!("Opening {folder} failed: {other}")),
    }
}
