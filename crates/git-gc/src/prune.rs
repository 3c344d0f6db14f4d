//! Pruning: remove loose objects that are both unreachable and older than
//! an expiry grace period.
//!
//! The grace period exists so that an object written moments ago by a
//! concurrent `git add` or an in-progress commit — reachable only once its
//! commit lands, but not yet referenced by anything — doesn't get swept up
//! by a `gc` that started just before it.

use std::collections::HashSet;
use std::path::Path;
use std::time::SystemTime;

use git_hash::ObjectId;
use git_repository::Repository;

use crate::GcError;

/// A loose object found to be unreachable, with its path for removal.
#[derive(Debug, Clone)]
pub struct PruneCandidate {
    pub oid: ObjectId,
    pub path: std::path::PathBuf,
}

/// Find unreachable loose objects older than `expire_before`.
///
/// `reachable` is the result of [`crate::reachability::reachable_objects`].
/// Does not delete anything; see [`prune_objects`].
pub fn find_prune_candidates(
    repo: &Repository,
    reachable: &HashSet<ObjectId>,
    expire_before: SystemTime,
) -> Result<Vec<PruneCandidate>, GcError> {
    let objects_dir = repo.odb().objects_dir();
    let mut candidates = Vec::new();

    for fanout in 0u8..=255 {
        let hex = format!("{fanout:02x}");
        let fanout_dir = objects_dir.join(&hex);
        if !fanout_dir.is_dir() {
            continue;
        }

        let entries = match std::fs::read_dir(&fanout_dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.filter_map(Result::ok) {
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();
            if !filename.chars().all(|c| c.is_ascii_hexdigit()) {
                continue;
            }

            let full_hex = format!("{hex}{filename}");
            let Ok(oid) = ObjectId::from_hex(&full_hex) else {
                continue;
            };
            if reachable.contains(&oid) {
                continue;
            }

            if let Ok(meta) = entry.metadata() {
                if let Ok(mtime) = meta.modified() {
                    if mtime > expire_before {
                        continue;
                    }
                }
            }

            candidates.push(PruneCandidate {
                oid,
                path: entry.path(),
            });
        }
    }

    Ok(candidates)
}

/// Delete the given candidates from disk, removing the loose object file
/// and its fanout directory if it becomes empty.
pub fn prune_objects(candidates: &[PruneCandidate]) -> Result<usize, GcError> {
    let mut removed = 0;
    for candidate in candidates {
        std::fs::remove_file(&candidate.path)?;
        removed += 1;
        if let Some(parent) = candidate.path.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }
    Ok(removed)
}

/// Remove stale `tmp_*`/`*.tmp` scratch files left behind by an
/// interrupted pack write or fetch under `<objects>/pack`.
pub fn prune_stale_pack_temp_files(objects_dir: &Path) -> Result<usize, GcError> {
    let pack_dir = objects_dir.join("pack");
    if !pack_dir.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    if let Ok(entries) = std::fs::read_dir(&pack_dir) {
        for entry in entries.filter_map(Result::ok) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("tmp_") || name.ends_with(".tmp") {
                if std::fs::remove_file(entry.path()).is_ok() {
                    removed += 1;
                }
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn finds_unreachable_old_loose_object() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let oid = repo
            .odb()
            .write(&git_object::Object::Blob(git_object::Blob::new(b"x".to_vec())))
            .unwrap();

        let reachable = HashSet::new();
        let future = SystemTime::now() + Duration::from_secs(60);
        let candidates = find_prune_candidates(&repo, &reachable, future).unwrap();
        assert!(candidates.iter().any(|c| c.oid == oid));
    }

    #[test]
    fn reachable_object_is_not_a_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let oid = repo
            .odb()
            .write(&git_object::Object::Blob(git_object::Blob::new(b"y".to_vec())))
            .unwrap();

        let mut reachable = HashSet::new();
        reachable.insert(oid);
        let future = SystemTime::now() + Duration::from_secs(60);
        let candidates = find_prune_candidates(&repo, &reachable, future).unwrap();
        assert!(!candidates.iter().any(|c| c.oid == oid));
    }
}
