//! Folder hierarchy
//!
//! The server answers `LIST` with flat names such as `INBOX.Trash.2024`
//! plus the delimiter for each name. [`FolderTree`] rebuilds the nesting
//! and [`FolderTree::flatten`] walks it back into `{name, path}` entries,
//! parents first, siblings in server order.

use crate::connection::Session;
use crate::error::{Error, Result};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, warn};

/// Used to join paths when the server reports a NIL delimiter.
const FALLBACK_DELIMITER: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    /// Separator between this node's parent path and its name.
    pub delimiter: Option<String>,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    #[must_use]
    pub fn new(name: impl Into<String>, delimiter: Option<&str>) -> Self {
        Self {
            name: name.into(),
            delimiter: delimiter.map(str::to_string),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    roots: Vec<FolderNode>,
}

impl FolderTree {
    #[must_use]
    pub const fn from_roots(roots: Vec<FolderNode>) -> Self {
        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[FolderNode] {
        &self.roots
    }

    /// Add a full folder name as reported by `LIST`. Intermediate levels
    /// the server did not list are created on the way down.
    pub fn insert(&mut self, full_name: &str, delimiter: Option<&str>) {
        // An empty level (`A..B`, `/A`) cannot be rebuilt by joining
        // names, so such folders stay whole.
        let segments: Vec<&str> = match delimiter {
            Some(d) if !d.is_empty() => full_name.split(d).collect(),
            _ => Vec::new(),
        };
        let segments = if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            vec![full_name]
        } else {
            segments
        };

        let mut level = &mut self.roots;
        for segment in segments {
            let index = if let Some(i) = level.iter().position(|n| n.name == segment) {
                i
            } else {
                level.push(FolderNode::new(segment, delimiter));
                level.len() - 1
            };
            level = &mut level[index].children;
        }
    }

    /// Depth-first, parent before children, siblings in insertion order.
    #[must_use]
    pub fn flatten(&self) -> Vec<FolderEntry> {
        let mut entries = Vec::new();
        let mut pending: Vec<(&FolderNode, String)> = self
            .roots
            .iter()
            .rev()
            .map(|node| (node, String::new()))
            .collect();

        while let Some((node, parent_path)) = pending.pop() {
            let path = if parent_path.is_empty() {
                node.name.clone()
            } else {
                let delimiter = node.delimiter.as_deref().unwrap_or(FALLBACK_DELIMITER);
                format!("{parent_path}{delimiter}{}", node.name)
            };
            pending.extend(node.children.iter().rev().map(|child| (child, path.clone())));
            entries.push(FolderEntry {
                name: node.name.clone(),
                path,
            });
        }
        entries
    }
}

impl Session {
    /// Request the full hierarchy with `LIST "" "*"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the LIST command fails.
    pub async fn folder_tree(&mut self) -> Result<FolderTree> {
        let mut listing = self
            .imap()?
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| Error::Imap(format!("List folders failed: {e}")))?;

        let mut tree = FolderTree::default();
        let mut count = 0_usize;
        while let Some(item) = listing.next().await {
            match item {
                Ok(name) => {
                    tree.insert(name.name(), name.delimiter());
                    count += 1;
                }
                Err(e) => warn!("Skipping unreadable LIST entry: {}", e),
            }
        }
        debug!("LIST returned {} folders", count);
        Ok(tree)
    }
}
