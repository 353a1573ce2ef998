//! Batch fetch with a completion barrier
//!
//! Every fetch response spawns one parse task. The batch is complete once
//! the response stream has ended *and* the [`JoinSet`] holding those tasks
//! is drained, so a slow parse can never be lost and a fast batch never
//! waits on a timer.

use crate::connection::Session;
use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::message::{EmailMessage, MessageIdentity, parse_message};
use async_imap::types::Fetch;
use futures::{Stream, StreamExt, pin_mut};
use std::fmt;
use tokio::task::JoinSet;
use tracing::{debug, warn};

const FETCH_QUERY: &str = "(UID FLAGS BODY.PEEK[])";

/// An inclusive range of sequence numbers within the open folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    pub start: u32,
    pub end: u32,
}

impl SequenceRange {
    /// The newest `limit` messages of a folder holding `total`, i.e.
    /// `[max(1, total - limit + 1), total]`. `None` when there is
    /// nothing to fetch.
    #[must_use]
    pub const fn most_recent(total: u32, limit: u32) -> Option<Self> {
        if total == 0 || limit == 0 {
            return None;
        }
        Some(Self {
            start: total.saturating_sub(limit) + 1,
            end: total,
        })
    }

    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Parsed messages in the order the server sent them, plus how many
/// responses were dropped because they could not be parsed.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub messages: Vec<EmailMessage>,
    pub dropped: usize,
}

impl Session {
    /// Fetch a sequence range of the open folder.
    ///
    /// # Errors
    ///
    /// Protocol failures are fatal; unparseable messages are only counted.
    pub async fn fetch_range(&mut self, range: SequenceRange) -> Result<FetchBatch> {
        debug!("FETCH {}", range);
        let stream = self
            .imap()?
            .fetch(range.to_string(), FETCH_QUERY)
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;
        collect_batch(stream).await
    }

    /// Fetch an explicit set of unique ids from the open folder. Ids the
    /// server does not know are silently absent from the batch.
    ///
    /// # Errors
    ///
    /// Protocol failures are fatal; unparseable messages are only counted.
    pub async fn fetch_uids(&mut self, uids: &[u32]) -> Result<FetchBatch> {
        if uids.is_empty() {
            return Ok(FetchBatch::default());
        }
        let uid_set = uid_set(uids);
        debug!("UID FETCH {}", uid_set);
        let stream = self
            .imap()?
            .uid_fetch(&uid_set, FETCH_QUERY)
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;
        collect_batch(stream).await
    }
}

/// Comma-separated uid set, e.g. `3,7,12`.
pub(crate) fn uid_set(uids: &[u32]) -> String {
    uids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

async fn collect_batch<S>(stream: S) -> Result<FetchBatch>
where
    S: Stream<Item = std::result::Result<Fetch, async_imap::error::Error>>,
{
    pin_mut!(stream);
    let mut parses = JoinSet::new();
    let mut dropped = 0;
    let mut order = 0_usize;

    while let Some(item) = stream.next().await {
        let fetch = item.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
        let identity = MessageIdentity {
            sequence_number: fetch.message,
            unique_id: fetch.uid,
            flags: fetch.flags().map(Flag::from).collect(),
        };
        let Some(body) = fetch.body().map(<[u8]>::to_vec) else {
            warn!("No body in fetch response for message {}", identity.id());
            dropped += 1;
            continue;
        };

        let position = order;
        order += 1;
        parses.spawn_blocking(move || (position, parse_message(&identity, &body)));
    }

    let mut parsed = Vec::with_capacity(parses.len());
    while let Some(joined) = parses.join_next().await {
        match joined {
            Ok((position, Ok(message))) => parsed.push((position, message)),
            Ok((_, Err(e))) => {
                warn!("Dropping message: {}", e);
                dropped += 1;
            }
            Err(e) => {
                warn!("Parse task failed: {}", e);
                dropped += 1;
            }
        }
    }
    parsed.sort_unstable_by_key(|(position, _)| *position);

    if dropped > 0 {
        warn!("{} message(s) dropped from batch", dropped);
    }
    Ok(FetchBatch {
        messages: parsed.into_iter().map(|(_, message)| message).collect(),
        dropped,
    })
}
