//! Cross-folder move as create, copy, flag, expunge
//!
//! Creating the target and expunging the source are best-effort: their
//! failures end up in [`MoveOutcome::warnings`]. Opening the source,
//! copying and flagging must succeed or the whole move fails. A failed
//! expunge therefore leaves the message in both folders, flagged
//! `\Deleted` in the source, until some later expunge removes it.

use crate::connection::Session;
use crate::error::{Error, MoveStep, Result};
use crate::fetch::uid_set;
use crate::flag::Flag;
use crate::selector::AccessMode;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub success: bool,
    pub message: String,
    /// Non-fatal step failures the caller may want to reconcile.
    pub warnings: Vec<String>,
}

pub(crate) async fn move_message(
    session: &mut Session,
    source: &str,
    uid: u32,
    target: &str,
) -> Result<MoveOutcome> {
    let mut warnings = Vec::new();

    let created = ensure_folder(session, target).await;
    settle(MoveStep::EnsureTarget, created, &mut warnings)?;

    let opened = session.open_folder(source, AccessMode::ReadWrite).await.map(drop);
    settle(MoveStep::OpenSource, opened, &mut warnings)?;
    if !contains_uid(session, uid).await? {
        return Err(Error::MessageNotFound {
            folder: source.to_string(),
            uid,
        });
    }

    let uids = uid_set(&[uid]);
    let copied = copy(session, &uids, target).await;
    settle(MoveStep::Copy, copied, &mut warnings)?;
    debug!("Copied UID {} from {} to {}", uid, source, target);

    let flagged = mark_deleted(session, &uids).await;
    settle(MoveStep::MarkDeleted, flagged, &mut warnings)?;

    let expunged = expunge(session).await;
    settle(MoveStep::Expunge, expunged, &mut warnings)?;

    info!("Moved UID {} from {} to {}", uid, source, target);
    Ok(MoveOutcome {
        success: true,
        message: format!("Message moved from {source} to {target}"),
        warnings,
    })
}

/// Apply the failure policy of `step`: fatal steps abort the move, the
/// rest become warnings. I/O errors always propagate unchanged.
fn settle(step: MoveStep, outcome: Result<()>, warnings: &mut Vec<String>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(e @ Error::Io(_)) => Err(e),
        Err(e) if step.is_fatal() => Err(step_failed(step, &e)),
        Err(e) => {
            warn!("Move step {} failed, continuing: {}", step, e);
            warnings.push(format!("{step}: {e}"));
            Ok(())
        }
    }
}

/// `CREATE`, treating "already exists" as success.
async fn ensure_folder(session: &mut Session, folder: &str) -> Result<()> {
    match session.imap()?.create(folder).await {
        Ok(()) => {
            info!("Created folder {}", folder);
            Ok(())
        }
        Err(e) if already_exists(&e.to_string()) => {
            debug!("Folder {} already exists", folder);
            Ok(())
        }
        Err(e) => Err(Error::Imap(e.to_string())),
    }
}

async fn copy(session: &mut Session, uids: &str, target: &str) -> Result<()> {
    session
        .imap()?
        .uid_copy(uids, target)
        .await
        .map_err(|e| Error::Imap(e.to_string()))
}

fn already_exists(response: &str) -> bool {
    let lowered = response.to_ascii_lowercase();
    lowered.contains("alreadyexists") || lowered.contains("already exists")
}

async fn contains_uid(session: &mut Session, uid: u32) -> Result<bool> {
    let found = session
        .imap()?
        .uid_search(format!("UID {uid}"))
        .await
        .map_err(|e| step_failed(MoveStep::OpenSource, &e))?;
    Ok(found.contains(&uid))
}

// STORE and EXPUNGE go through `run_command_and_check_ok`: the response
// streams of `uid_store`/`expunge` end quietly on a tagged NO.

async fn mark_deleted(session: &mut Session, uids: &str) -> Result<()> {
    session
        .imap()?
        .run_command_and_check_ok(format!("UID STORE {uids} +FLAGS.SILENT ({})", Flag::Deleted))
        .await
        .map_err(|e| Error::Imap(e.to_string()))
}

async fn expunge(session: &mut Session) -> Result<()> {
    session
        .imap()?
        .run_command_and_check_ok("EXPUNGE")
        .await
        .map_err(|e| Error::Imap(e.to_string()))
}

fn step_failed(step: MoveStep, e: &impl std::fmt::Display) -> Error {
    Error::Move {
        step,
        reason: e.to_string(),
    }
}
