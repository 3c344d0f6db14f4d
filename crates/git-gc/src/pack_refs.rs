//! Pack-refs consolidation: fold loose refs under `refs/` into a single
//! `packed-refs` file.
//!
//! `HEAD` and other top-level symbolic refs are never packed — only direct
//! refs under `refs/` are eligible. This mirrors `git pack-refs --all`.

use std::path::Path;

use git_ref::RefStore;
use git_repository::Repository;

use crate::GcError;

/// Write every direct ref under `refs/` into `packed-refs`, then remove the
/// now-redundant loose ref files.
///
/// Returns the number of refs packed.
pub fn pack_refs(repo: &Repository) -> Result<usize, GcError> {
    let common_dir = repo.common_dir().to_path_buf();
    let packed_refs_path = common_dir.join("packed-refs");

    let mut lines = vec!["# pack-refs with: peeled fully-peeled sorted".to_string()];

    for reference in repo.refs().iter(Some("refs/"))? {
        let reference = reference?;
        let oid = reference.peel_to_oid(repo.refs())?;
        lines.push(format!("{} {}", oid.to_hex(), reference.name().as_str()));
    }

    let packed_count = lines.len() - 1;
    if packed_count > 0 {
        let content = lines.join("\n") + "\n";
        std::fs::write(&packed_refs_path, content)?;
        remove_packed_loose_refs(&common_dir.join("refs"))?;
    }

    Ok(packed_count)
}

/// Remove loose ref files now represented in `packed-refs`, leaving
/// symbolic refs (which start with `ref: `) untouched.
fn remove_packed_loose_refs(dir: &Path) -> Result<(), GcError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(Result::ok).collect::<Vec<_>>(),
        Err(_) => return Ok(()),
    };

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            remove_packed_loose_refs(&path)?;
            let _ = std::fs::remove_dir(&path);
        } else if path.is_file() {
            let content = std::fs::read_to_string(&path).unwrap_or_default();
            if !content.starts_with("ref: ") {
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    Ok(())
}
