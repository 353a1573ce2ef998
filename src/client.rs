//! Mailbox operations, one connection per call

use crate::config::Account;
use crate::connection::Session;
use crate::error::{Error, Result};
use crate::fetch::SequenceRange;
use crate::folder::FolderEntry;
use crate::message::EmailMessage;
use crate::mover::{self, MoveOutcome};
use crate::search::{self, SearchAccumulator};
use crate::selector::AccessMode;
use std::future::Future;
use tracing::{debug, info};

/// Mail access for one account.
///
/// Every method connects, does its work and logs out before returning,
/// on success and on error alike. Nothing is shared between calls, so a
/// `MailboxClient` can be used from several tasks at once.
#[derive(Debug, Clone)]
pub struct MailboxClient {
    account: Account,
}

impl MailboxClient {
    #[must_use]
    pub const fn new(account: Account) -> Self {
        Self { account }
    }

    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// The newest `limit` messages of `folder`, newest first.
    ///
    /// # Errors
    ///
    /// Connection failures and a folder that cannot be opened are fatal.
    /// Messages that fail to parse are left out.
    pub async fn list_messages(&self, folder: &str, limit: u32) -> Result<Vec<EmailMessage>> {
        self.with_session(async |session| {
            let status = session.open_folder(folder, AccessMode::ReadOnly).await?;
            let Some(range) = SequenceRange::most_recent(status.exists, limit) else {
                return Ok(Vec::new());
            };

            info!("Fetching {} most recent messages from {}", range.len(), folder);
            let batch = session.fetch_range(range).await?;
            let mut listed = SearchAccumulator::for_listing();
            listed.extend(batch.messages);
            Ok(listed.into_sorted())
        })
        .await
    }

    /// One message by unique id, or `None` if the folder has no such id.
    ///
    /// # Errors
    ///
    /// Connection failures and a folder that cannot be opened are fatal.
    pub async fn get_message(&self, folder: &str, uid: u32) -> Result<Option<EmailMessage>> {
        self.with_session(async |session| {
            session.open_folder(folder, AccessMode::ReadOnly).await?;
            let batch = session.fetch_uids(&[uid]).await?;
            if batch.dropped > 0 {
                debug!("UID {} in {} could not be parsed", uid, folder);
            }
            Ok(batch.messages.into_iter().next())
        })
        .await
    }

    /// Every folder of the account, flattened with full paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or LIST command fails.
    pub async fn list_folders(&self) -> Result<Vec<FolderEntry>> {
        self.with_session(async |session| Ok(session.folder_tree().await?.flatten()))
            .await
    }

    /// Unseen messages in `folder` as reported by the server.
    ///
    /// # Errors
    ///
    /// Connection failures and an unknown folder are fatal.
    pub async fn get_unread_count(&self, folder: &str) -> Result<u32> {
        self.with_session(async |session| {
            Ok(session.status(folder).await?.unseen.unwrap_or(0))
        })
        .await
    }

    /// Move one message to `target`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`Error::Move`] if opening the source, copying or flagging fails,
    /// [`Error::MessageNotFound`] if `uid` is not in `source`. A failed
    /// create or expunge only adds to [`MoveOutcome::warnings`].
    pub async fn move_message(&self, source: &str, uid: u32, target: &str) -> Result<MoveOutcome> {
        self.with_session(async |session| {
            mover::move_message(session, source, uid, target).await
        })
        .await
    }

    /// Messages sent from or to `address` across `folders`, searched in
    /// order. Folders that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Connection failures and protocol errors after a folder was opened
    /// are fatal.
    pub async fn search_by_address<S: AsRef<str>>(
        &self,
        address: &str,
        folders: &[S],
    ) -> Result<Vec<EmailMessage>> {
        self.with_session(async |session| {
            search::search_folders(session, address, folders).await
        })
        .await
    }

    /// Open a session, run `op`, close the session, all within the
    /// account timeout. When the timeout fires the session is dropped,
    /// which closes its socket.
    async fn with_session<T>(&self, op: impl AsyncFnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let timeout = self.account.timeout;
        let run = async {
            let mut session = Session::open(&self.account).await?;
            let result = op(&mut session).await;
            session.close().await;
            result
        };
        bounded(timeout, run).await
    }
}

async fn bounded<T>(
    timeout: std::time::Duration,
    run: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, run)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(timeout)))
}
