//! Canonical message records and the MIME parser that builds them

use crate::error::{Error, Result};
use crate::flag::Flag;
use chrono::{DateTime, Utc};
use mail_parser::{Address, MessageParser, MimeHeaders};
use serde::Serialize;
use std::collections::HashSet;

/// Maximum preview length in characters.
pub const PREVIEW_LEN: usize = 200;

/// What the server says about a message before its body arrives.
///
/// The sequence number is only meaningful for the folder open it came
/// from; the unique id survives re-opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdentity {
    pub sequence_number: u32,
    pub unique_id: Option<u32>,
    pub flags: HashSet<Flag>,
}

impl MessageIdentity {
    /// The record id: the unique id, or the sequence number if the server
    /// did not send one.
    #[must_use]
    pub fn id(&self) -> String {
        self.unique_id
            .unwrap_or(self.sequence_number)
            .to_string()
    }

    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.flags.contains(&Flag::Seen)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSummary {
    pub filename: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub id: String,
    pub unique_id: Option<u32>,
    pub subject: String,
    pub from: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub date: Option<DateTime<Utc>>,
    pub body_preview: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub is_read: bool,
    pub has_attachments: bool,
    pub attachments: Vec<AttachmentSummary>,
}

/// Decode raw RFC 5322 bytes plus server flags into an [`EmailMessage`].
///
/// # Errors
///
/// [`Error::Parse`] if the bytes are not a message at all.
pub fn parse_message(identity: &MessageIdentity, raw: &[u8]) -> Result<EmailMessage> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::Parse(format!("message {} is not valid MIME", identity.id())))?;

    let body_text = message.body_text(0).map(|s| s.into_owned());
    let body_html = message.body_html(0).map(|s| s.into_owned());
    let body_preview = body_text.as_deref().map(make_preview).unwrap_or_default();

    let attachments: Vec<AttachmentSummary> = message
        .attachments()
        .map(|part| AttachmentSummary {
            filename: part.attachment_name().unwrap_or("attachment").to_string(),
            size: part.len(),
            content_type: part.content_type().map_or_else(
                || "application/octet-stream".to_string(),
                |ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                },
            ),
        })
        .collect();

    Ok(EmailMessage {
        id: identity.id(),
        unique_id: identity.unique_id,
        subject: message.subject().unwrap_or_default().to_string(),
        from: message
            .from()
            .and_then(|from| addresses(from).into_iter().next())
            .unwrap_or_default(),
        to: message.to().map(addresses).unwrap_or_default(),
        date: message
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
        body_preview,
        body_text,
        body_html,
        is_read: identity.is_seen(),
        has_attachments: !attachments.is_empty(),
        attachments,
    })
}

/// Collapse whitespace runs to a single space and cut to
/// [`PREVIEW_LEN`] characters.
#[must_use]
pub fn make_preview(text: &str) -> String {
    let mut preview = String::new();
    for (count, word) in text.split_whitespace().enumerate() {
        if count > 0 {
            preview.push(' ');
        }
        preview.push_str(word);
        if preview.len() >= PREVIEW_LEN * 4 {
            break;
        }
    }
    preview.chars().take(PREVIEW_LEN).collect()
}

fn addresses(field: &Address<'_>) -> Vec<EmailAddress> {
    field
        .iter()
        .map(|addr| EmailAddress {
            name: addr.name.as_deref().unwrap_or_default().to_string(),
            address: addr.address.as_deref().unwrap_or_default().to_string(),
        })
        .collect()
}
