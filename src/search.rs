//! Cross-folder search by address and result deduplication

use crate::connection::Session;
use crate::error::{Error, Result};
use crate::message::EmailMessage;
use crate::selector::AccessMode;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Only the newest this-many matches of each folder are fetched.
pub const SEARCH_LIMIT_PER_FOLDER: usize = 50;

/// Decides when two fetched records are the same underlying message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Within one folder listing: id, date and subject.
    Listing {
        id: String,
        date: Option<DateTime<Utc>>,
        subject: String,
    },
    /// Across folders, where ids are not comparable: date, subject and
    /// sender address (case-insensitive).
    CrossFolder {
        date: Option<DateTime<Utc>>,
        subject: String,
        from: String,
    },
}

impl DedupKey {
    #[must_use]
    pub fn listing(message: &EmailMessage) -> Self {
        Self::Listing {
            id: message.id.clone(),
            date: message.date,
            subject: message.subject.clone(),
        }
    }

    #[must_use]
    pub fn cross_folder(message: &EmailMessage) -> Self {
        Self::CrossFolder {
            date: message.date,
            subject: message.subject.clone(),
            from: message.from.address.to_ascii_lowercase(),
        }
    }
}

/// Ordered messages where no two entries share a dedup key.
#[derive(Debug)]
pub struct SearchAccumulator {
    messages: Vec<EmailMessage>,
    seen: HashSet<DedupKey>,
    key: fn(&EmailMessage) -> DedupKey,
    duplicates: usize,
}

impl SearchAccumulator {
    #[must_use]
    pub fn new(key: fn(&EmailMessage) -> DedupKey) -> Self {
        Self {
            messages: Vec::new(),
            seen: HashSet::new(),
            key,
            duplicates: 0,
        }
    }

    #[must_use]
    pub fn for_listing() -> Self {
        Self::new(DedupKey::listing)
    }

    #[must_use]
    pub fn for_search() -> Self {
        Self::new(DedupKey::cross_folder)
    }

    /// Keep `message` unless an earlier entry has the same key. Returns
    /// whether it was kept.
    pub fn push(&mut self, message: EmailMessage) -> bool {
        if self.seen.insert((self.key)(&message)) {
            self.messages.push(message);
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub const fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Newest first. Messages with equal dates keep their insertion
    /// order; undated messages go last.
    #[must_use]
    pub fn into_sorted(mut self) -> Vec<EmailMessage> {
        self.messages.sort_by(|a, b| b.date.cmp(&a.date));
        self.messages
    }
}

impl Extend<EmailMessage> for SearchAccumulator {
    fn extend<I: IntoIterator<Item = EmailMessage>>(&mut self, iter: I) {
        for message in iter {
            self.push(message);
        }
    }
}

/// `OR FROM "<addr>" TO "<addr>"` with the address quoted.
#[must_use]
pub fn address_query(address: &str) -> String {
    let quoted = address.replace('\\', "\\\\").replace('"', "\\\"");
    format!("OR FROM \"{quoted}\" TO \"{quoted}\"")
}

/// The newest `limit` uids, ascending. Older matches are cut first.
#[must_use]
pub fn most_recent_uids(uids: impl IntoIterator<Item = u32>, limit: usize) -> Vec<u32> {
    let mut uids: Vec<u32> = uids.into_iter().collect();
    uids.sort_unstable();
    let start = uids.len().saturating_sub(limit);
    uids.split_off(start)
}

/// Search `folders` one after another on a single session.
///
/// Folders that cannot be opened are skipped; any other failure aborts.
pub(crate) async fn search_folders<S: AsRef<str>>(
    session: &mut Session,
    address: &str,
    folders: &[S],
) -> Result<Vec<EmailMessage>> {
    let query = address_query(address);
    let mut found = SearchAccumulator::for_search();

    for folder in folders {
        let folder = folder.as_ref();
        match session.open_folder(folder, AccessMode::ReadOnly).await {
            Ok(_) => {}
            Err(e @ Error::FolderUnavailable { .. }) => {
                warn!("Skipping folder in search: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        }

        let matches = session
            .imap()?
            .uid_search(&query)
            .await
            .map_err(|e| Error::Imap(format!("Search in {folder} failed: {e}")))?;
        let uids = most_recent_uids(matches, SEARCH_LIMIT_PER_FOLDER);
        debug!("{} matches in {}", uids.len(), folder);

        let batch = session.fetch_uids(&uids).await?;
        found.extend(batch.messages);
    }

    info!(
        "Found {} messages for {} ({} duplicates removed)",
        found.len(),
        address,
        found.duplicates()
    );
    Ok(found.into_sorted())
}
