//! Reflog expiry as a standalone maintenance step.
//!
//! Unlike C git's `gc`, which folds reflog expiry into the same pass as
//! pruning, expiry here is a separate entry point: pruning decides what
//! loose objects are safe to delete, while reflog expiry only trims
//! history entries and never affects object reachability (an expired
//! reflog entry's target may still be reachable through the ref's current
//! value or another ref). Keeping them independent lets a caller run one
//! without the other — e.g. a `gc --auto` that prunes objects nightly but
//! only expires reflogs on an explicit `gc` invocation.

use git_ref::RefStore;
use git_repository::Repository;

use crate::GcError;

/// Expire reflog entries older than `expire_timestamp` (Unix seconds) for
/// every ref that has one. Returns the total number of entries removed.
pub fn expire_reflogs(repo: &Repository, expire_timestamp: i64) -> Result<usize, GcError> {
    let git_dir = repo.common_dir();
    let mut total_removed = 0;

    for reference in repo.refs().iter(None)? {
        let reference = reference?;
        total_removed += git_ref::reflog::expire_reflog(git_dir, reference.name(), expire_timestamp)?;
    }

    Ok(total_removed)
}
