//! Message flags as reported by the server

use async_imap::types::Flag as WireFlag;
use serde::{Serialize, Serializer};
use std::fmt;

/// A message flag.
///
/// System flags (`\Seen`, `\Deleted`, ...) have their own variants;
/// everything else is kept verbatim as a [`Flag::Keyword`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    /// Session-only flag; cannot be stored by clients.
    Recent,
    Keyword(String),
}

impl Flag {
    /// Parse the wire form. System flags match case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let Some(system) = raw.strip_prefix('\\') else {
            return Self::Keyword(raw.to_string());
        };
        match system.to_ascii_lowercase().as_str() {
            "seen" => Self::Seen,
            "answered" => Self::Answered,
            "flagged" => Self::Flagged,
            "deleted" => Self::Deleted,
            "draft" => Self::Draft,
            "recent" => Self::Recent,
            _ => Self::Keyword(raw.to_string()),
        }
    }

    #[must_use]
    pub fn as_imap_str(&self) -> &str {
        match self {
            Self::Seen => "\\Seen",
            Self::Answered => "\\Answered",
            Self::Flagged => "\\Flagged",
            Self::Deleted => "\\Deleted",
            Self::Draft => "\\Draft",
            Self::Recent => "\\Recent",
            Self::Keyword(kw) => kw,
        }
    }
}

impl From<WireFlag<'_>> for Flag {
    fn from(flag: WireFlag<'_>) -> Self {
        match flag {
            WireFlag::Seen => Self::Seen,
            WireFlag::Answered => Self::Answered,
            WireFlag::Flagged => Self::Flagged,
            WireFlag::Deleted => Self::Deleted,
            WireFlag::Draft => Self::Draft,
            WireFlag::Recent => Self::Recent,
            WireFlag::MayCreate => Self::Keyword("\\*".to_string()),
            WireFlag::Custom(kw) => Self::parse(&kw),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_imap_str())
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_imap_str())
    }
}
