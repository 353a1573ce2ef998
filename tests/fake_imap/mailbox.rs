//! Test data model for the fake IMAP server
//!
//! Provides a builder-style API for constructing mailbox state:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .delimiter(".")
//!     .folder("INBOX")
//!         .email(1, false, raw_rfc2822_bytes)
//!         .email(2, true, raw_rfc2822_bytes)
//!     .folder("INBOX.Sent")
//!         .email(10, true, raw_rfc2822_bytes)
//!     .build();
//! ```
//!
//! The server keeps the `Mailbox` behind a `Mutex` and mutates it for
//! CREATE, STORE, COPY and EXPUNGE, so tests can inspect the state
//! after an operation with `FakeImapServer::snapshot`.

/// A complete account: named folders sharing one hierarchy delimiter.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    pub delimiter: String,
    /// Answer every LOGIN with NO.
    pub reject_logins: bool,
    /// Folder names whose SELECT/EXAMINE closes the connection unanswered.
    pub hang_up_on: Vec<String>,
}

impl Mailbox {
    /// Look up a folder by name (case-sensitive, matching real IMAP).
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    /// Whether some other folder lives below `name`.
    pub fn has_children(&self, name: &str) -> bool {
        let prefix = format!("{name}{}", self.delimiter);
        self.folders.iter().any(|f| f.name.starts_with(&prefix))
    }

    pub fn hangs_up_on(&self, name: &str) -> bool {
        self.hang_up_on.iter().any(|n| n == name)
    }
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
    /// Answer EXPUNGE in this folder with NO.
    pub fail_expunge: bool,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            emails: Vec::new(),
            fail_expunge: false,
        }
    }

    pub fn get_email(&self, uid: u32) -> Option<&TestEmail> {
        self.emails.iter().find(|e| e.uid == uid)
    }

    pub fn max_uid(&self) -> u32 {
        self.emails.iter().map(|e| e.uid).max().unwrap_or(0)
    }

    pub fn unseen(&self) -> usize {
        self.emails.iter().filter(|e| !e.seen).count()
    }
}

/// A test email stored in a folder.
///
/// - `uid`: unique within its folder and never reused.
/// - `seen` / `deleted`: the `\Seen` and `\Deleted` flags.
/// - `raw`: the complete RFC 5322 message returned for `BODY[]`.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    pub seen: bool,
    pub deleted: bool,
    pub raw: Vec<u8>,
}

impl TestEmail {
    /// The FLAGS list as sent on the wire, e.g. `\Seen \Deleted`.
    pub fn flag_list(&self) -> String {
        let mut flags = Vec::new();
        if self.seen {
            flags.push("\\Seen");
        }
        if self.deleted {
            flags.push("\\Deleted");
        }
        flags.join(" ")
    }
}

/// Builder for constructing a `Mailbox` step by step.
///
/// Call `.folder(name)` to start a new folder, then chain
/// `.email(uid, seen, raw)` calls to add messages to it.
/// Finish with `.build()` to get the final `Mailbox`.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
    delimiter: String,
    reject_logins: bool,
    hang_up_on: Vec<String>,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
            delimiter: "/".to_string(),
            reject_logins: false,
            hang_up_on: Vec::new(),
        }
    }

    /// Hierarchy delimiter reported by LIST. Defaults to `/`.
    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    /// Add a new folder. Subsequent `.email()` calls add to this folder.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder::new(name));
        self
    }

    /// Add an email to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn email(mut self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.current().emails.push(TestEmail {
            uid,
            seen,
            deleted: false,
            raw: raw.to_vec(),
        });
        self
    }

    /// Make EXPUNGE fail in the most recently added folder.
    pub fn failing_expunge(mut self) -> Self {
        self.current().fail_expunge = true;
        self
    }

    pub fn reject_logins(mut self) -> Self {
        self.reject_logins = true;
        self
    }

    /// Drop the connection when a client opens `name`, which need not
    /// exist.
    pub fn hang_up_on(mut self, name: &str) -> Self {
        self.hang_up_on.push(name.to_string());
        self
    }

    /// Consume the builder and return the finished `Mailbox`.
    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
            delimiter: self.delimiter,
            reject_logins: self.reject_logins,
            hang_up_on: self.hang_up_on,
        }
    }

    fn current(&mut self) -> &mut Folder {
        self.folders
            .last_mut()
            .expect("call .folder() before adding to it")
    }
}
