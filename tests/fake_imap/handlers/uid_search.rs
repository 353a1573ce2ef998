//! UID SEARCH command handler.
//!
//! Matches emails against parsed `SearchKey` criteria from imap-types.
//! Supported keys:
//!
//! - `ALL`, `SEEN`, `UNSEEN`, `DELETED`
//! - `SINCE` / `BEFORE` on the `Date:` header
//! - `FROM` / `TO`: case-insensitive substring of that header
//! - `UID <set>`
//! - `AND` (implicit), `OR`, `NOT`
//!
//! Unknown keys match nothing, so a test never passes by accident.
//! The response lists UIDs in folder order (RFC 3501 Section 7.2.5):
//!
//! ```text
//! * SEARCH 1 2 3
//! A0003 OK SEARCH completed
//! ```

use super::sequence::expand;
use crate::fake_imap::io::{tagged, write_line};
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use chrono::NaiveDate;
use imap_codec::imap_types::core::AString;
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder_name) = selected_folder else {
        tagged(stream, tag, "BAD No folder selected").await;
        return;
    };
    let Some(folder) = mailbox.get_folder(folder_name) else {
        tagged(stream, tag, "NO Folder not found").await;
        return;
    };

    let max_uid = folder.max_uid();
    let uids: Vec<String> = folder
        .emails
        .iter()
        .filter(|e| criteria.iter().all(|key| matches_key(e, key, max_uid)))
        .map(|e| e.uid.to_string())
        .collect();

    let search_line = if uids.is_empty() {
        "* SEARCH\r\n".to_string()
    } else {
        format!("* SEARCH {}\r\n", uids.join(" "))
    };
    if write_line(stream, &search_line).await.is_err() {
        return;
    }
    tagged(stream, tag, "OK SEARCH completed").await;
}

fn matches_key(email: &TestEmail, key: &SearchKey<'_>, max_uid: u32) -> bool {
    match key {
        SearchKey::All => true,
        SearchKey::Unseen => !email.seen,
        SearchKey::Seen => email.seen,
        SearchKey::Deleted => email.deleted,
        SearchKey::Since(date) => email_date(&email.raw).is_some_and(|d| d >= *date.as_ref()),
        SearchKey::Before(date) => email_date(&email.raw).is_some_and(|d| d < *date.as_ref()),
        SearchKey::From(needle) => header_contains(&email.raw, "From", needle),
        SearchKey::To(needle) => header_contains(&email.raw, "To", needle),
        SearchKey::Uid(set) => expand(set, max_uid).contains(&email.uid),
        SearchKey::And(keys) => keys.as_ref().iter().all(|k| matches_key(email, k, max_uid)),
        SearchKey::Or(a, b) => matches_key(email, a, max_uid) || matches_key(email, b, max_uid),
        SearchKey::Not(k) => !matches_key(email, k, max_uid),
        _ => false,
    }
}

/// Value of the first header called `name`, without folding support.
fn header<'a>(raw: &'a [u8], name: &str) -> Option<&'a str> {
    let text = std::str::from_utf8(raw).ok()?;
    text.lines()
        .take_while(|line| !line.is_empty())
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
}

fn header_contains(raw: &[u8], name: &str, needle: &AString<'_>) -> bool {
    let needle = String::from_utf8_lossy(needle.as_ref()).to_lowercase();
    header(raw, name).is_some_and(|value| value.to_lowercase().contains(&needle))
}

fn email_date(raw: &[u8]) -> Option<NaiveDate> {
    let value = header(raw, "Date")?;
    chrono::DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::capture;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::imap_types::datetime::NaiveDate as ImapDate;

    fn email(from: &str, to: &str, date: &str) -> Vec<u8> {
        format!("From: {from}\r\nTo: {to}\r\nDate: {date}\r\nSubject: Test\r\n\r\nBody")
            .into_bytes()
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(
                1,
                true,
                &email("alice@example.com", "me@example.com", "Mon, 01 Jan 2024 10:00:00 +0000"),
            )
            .email(
                2,
                false,
                &email(
                    "Bob <bob@example.com>",
                    "me@example.com",
                    "Mon, 15 Jan 2024 10:00:00 +0000",
                ),
            )
            .email(
                3,
                false,
                &email("me@example.com", "Alice@Example.com", "Sat, 20 Jan 2024 10:00:00 +0000"),
            )
            .build()
    }

    async fn run(criteria: Vec<SearchKey<'static>>, selected: Option<&str>) -> String {
        let mailbox = mailbox();
        capture(|mut s| async move {
            handle_uid_search("A1", &criteria, &mailbox, selected, &mut s).await;
        })
        .await
    }

    fn astring(s: &'static str) -> AString<'static> {
        AString::try_from(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> ImapDate {
        ImapDate::unvalidated(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[tokio::test]
    async fn all_returns_every_uid() {
        let output = run(vec![SearchKey::All], Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 1 2 3\r\n"));
        assert!(output.ends_with("A1 OK SEARCH completed\r\n"));
    }

    #[tokio::test]
    async fn unseen_filters_seen() {
        let output = run(vec![SearchKey::Unseen], Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 2 3\r\n"));
    }

    #[tokio::test]
    async fn from_or_to_matches_either_header_case_insensitively() {
        let key = SearchKey::Or(
            Box::new(SearchKey::From(astring("alice@example.com"))),
            Box::new(SearchKey::To(astring("alice@example.com"))),
        );
        let output = run(vec![key], Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 1 3\r\n"));
    }

    #[tokio::test]
    async fn from_matches_inside_display_name_form() {
        let output = run(vec![SearchKey::From(astring("bob@example.com"))], Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 2\r\n"));
    }

    #[tokio::test]
    async fn uid_key_selects_single_message() {
        let set = super::super::sequence::set("2");
        let output = run(vec![SearchKey::Uid(set)], Some("INBOX")).await;
        assert!(output.starts_with("* SEARCH 2\r\n"));
    }

    #[tokio::test]
    async fn since_and_before_bound_dates() {
        let output = run(
            vec![
                SearchKey::Since(date(2024, 1, 10)),
                SearchKey::Before(date(2024, 1, 20)),
            ],
            Some("INBOX"),
        )
        .await;
        assert!(output.starts_with("* SEARCH 2\r\n"));
    }

    #[tokio::test]
    async fn no_match_sends_bare_search() {
        let output = run(vec![SearchKey::From(astring("nobody@example.com"))], Some("INBOX")).await;
        assert_eq!(output, "* SEARCH\r\nA1 OK SEARCH completed\r\n");
    }

    #[tokio::test]
    async fn no_folder_selected_returns_bad() {
        let output = run(vec![SearchKey::All], None).await;
        assert_eq!(output, "A1 BAD No folder selected\r\n");
    }

    #[test]
    fn header_lookup_stops_at_body() {
        let raw = b"Subject: hi\r\n\r\nFrom: body@example.com".to_vec();
        assert!(header(&raw, "From").is_none());
        assert_eq!(header(&raw, "subject"), Some("hi"));
    }
}
