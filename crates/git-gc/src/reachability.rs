//! Reachability: find every object a repository still needs.
//!
//! "Reachable" means reachable from a ref tip, `HEAD`, every reflog
//! entry's `new` id, or a caller-supplied extra root (e.g. `MERGE_HEAD`, a
//! stash, a worktree's detached HEAD). Everything else is a candidate for
//! pruning once it has aged past the grace period in [`crate::prune`].
//! Including reflog history in the root set is what lets `git reflog
//! expire --expire=never` (or simply never expiring) keep old commits
//! alive across a `reset --hard` or a rebase even after the ref itself has
//! moved on.

use std::collections::HashSet;

use git_hash::ObjectId;
use git_ref::RefStore;
use git_repository::Repository;

use crate::GcError;

/// Collect every ref tip, `HEAD`, every reflog entry's `new` id, and any
/// extra roots into a flat list of OIDs suitable for a reachability walk.
///
/// Symbolic refs and tags are peeled to the object they ultimately point
/// at. A ref, reflog, or root that fails to resolve (e.g. a dangling
/// symref) is skipped rather than treated as an error — maintenance must
/// be able to run on a repository with minor existing corruption.
pub fn collect_roots(
    repo: &Repository,
    extra_roots: &[ObjectId],
) -> Result<Vec<ObjectId>, GcError> {
    let mut roots = Vec::new();

    for reference in repo.refs().iter(None)? {
        let reference = match reference {
            Ok(r) => r,
            Err(_) => continue,
        };
        if let Ok(oid) = reference.peel_to_oid(repo.refs()) {
            roots.push(oid);
        }

        if let Ok(entries) = git_ref::reflog::read_reflog(repo.common_dir(), reference.name()) {
            roots.extend(entries.into_iter().map(|e| e.new_oid));
        }
    }

    if let Ok(Some(head)) = repo.head_oid() {
        roots.push(head);
    }
    if let Ok(head_name) = git_ref::RefName::new("HEAD") {
        if let Ok(entries) = git_ref::reflog::read_reflog(repo.common_dir(), &head_name) {
            roots.extend(entries.into_iter().map(|e| e.new_oid));
        }
    }

    roots.extend_from_slice(extra_roots);
    roots.retain(|oid| !oid.is_null());
    Ok(roots)
}

/// Walk every root and return the full set of reachable object IDs
/// (commits, trees, blobs, and any tags in the chain).
pub fn reachable_objects(
    repo: &Repository,
    roots: &[ObjectId],
) -> Result<HashSet<ObjectId>, GcError> {
    let objects = git_revwalk::list_objects(repo, roots, &[], None)?;
    Ok(objects.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_roots_on_fresh_repo_is_empty_or_head_only() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        // A freshly initialized repo has no commits yet, so HEAD does not
        // resolve to an object and there are no refs with targets.
        let roots = collect_roots(&repo, &[]).unwrap();
        assert!(roots.is_empty());
    }
}
