//! IMAP mailbox access library
//!
//! Turns a stateful IMAP connection into a handful of self-contained
//! operations on [`MailboxClient`]: list recent messages, fetch one
//! message, enumerate folders, count unread, move a message between
//! folders and search several folders by address.
//!
//! Each operation opens its own [`Session`] (implicit TLS or STARTTLS),
//! does its work and logs out before returning. Messages come back as
//! parsed [`EmailMessage`] records built with `mail-parser`.

mod client;
mod config;
mod connection;
mod error;
mod fetch;
mod flag;
mod folder;
mod message;
mod mover;
mod search;
mod selector;

pub use client::MailboxClient;
pub use config::{Account, Security};
pub use connection::{Session, SessionState};
pub use error::{Error, MoveStep, Result};
pub use fetch::{FetchBatch, SequenceRange};
pub use flag::Flag;
pub use folder::{FolderEntry, FolderNode, FolderTree};
pub use message::{
    AttachmentSummary, EmailAddress, EmailMessage, MessageIdentity, PREVIEW_LEN, make_preview,
    parse_message,
};
pub use mover::MoveOutcome;
pub use search::{
    DedupKey, SEARCH_LIMIT_PER_FOLDER, SearchAccumulator, address_query, most_recent_uids,
};
pub use selector::{AccessMode, FolderStatus};
