//! Repacking: consolidate reachable objects into a single, delta-compressed
//! pack and retire the packs (and loose objects) it supersedes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_object::Object;
use git_pack::delta::engine::{DeltaEngine, DeltaObjectSource};
use git_pack::order::{order_for_pack, OrderingEntry};
use git_pack::write::{build_pack_index, PackWriter};
use git_pack::PackError;
use git_repository::Repository;
use git_utils::cancel::CancellationToken;

use crate::GcError;

/// Loads object content for the delta engine by asking the repository's
/// object database, which transparently checks packs, loose storage, and
/// alternates.
struct RepoObjectSource<'a> {
    repo: &'a Repository,
}

impl DeltaObjectSource for RepoObjectSource<'_> {
    fn load(&self, oid: &ObjectId) -> Result<Option<Vec<u8>>, PackError> {
        match self.repo.odb().read(oid) {
            Ok(Some(obj)) => Ok(Some(obj.serialize_content())),
            Ok(None) => Ok(None),
            Err(e) => Err(PackError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))),
        }
    }
}

/// Write every object in `reachable` into a new pack at `dest_dir`, using
/// `engine` to decide which objects get delta-compressed against which.
///
/// Checked against `token` once per object — the coarse-grained boundary a
/// repack of a large reachable set can take a while to cross. A temp pack
/// left behind by a cancelled repack is never renamed into `<objects>/pack`
/// by [`finalize_repack`], so cancelling mid-write cannot corrupt the store.
///
/// Returns the new pack's path, index path, and checksum.
pub fn repack_reachable(
    repo: &Repository,
    reachable: &[ObjectId],
    dest_dir: &Path,
    name: &str,
    engine: &DeltaEngine,
    token: &CancellationToken,
) -> Result<(PathBuf, PathBuf, ObjectId), GcError> {
    let source = RepoObjectSource { repo };

    let mut ordering_entries = Vec::with_capacity(reachable.len());
    for oid in reachable {
        let Some(info) = repo.odb().read_header(oid)? else {
            continue;
        };
        ordering_entries.push(OrderingEntry {
            obj_type: info.obj_type,
            size: info.size as u64,
            path_hint: None,
            payload: *oid,
        });
    }
    let ordered = order_for_pack(ordering_entries);

    let pack_path = dest_dir.join(format!("{name}.pack"));
    let idx_path = dest_dir.join(format!("{name}.idx"));
    let mut writer = PackWriter::new(&pack_path)?;

    let mut offsets: HashMap<ObjectId, u64> = HashMap::new();
    let mut depths: HashMap<ObjectId, usize> = HashMap::new();
    let mut pool = Vec::new();

    for entry in &ordered {
        token.check()?;
        let oid = entry.payload;
        let Some(obj) = repo.odb().read(&oid)? else {
            continue;
        };
        let data = obj.serialize_content();

        let candidate = git_pack::delta::candidates::Candidate {
            oid,
            obj_type: entry.obj_type,
            size: entry.size,
            path_hint: entry.path_hint.clone(),
        };

        let decision = engine.select_delta(
            &candidate,
            &data,
            &pool,
            |base_oid| depths.get(base_oid).copied().unwrap_or(0),
            &source,
        )?;

        let offset_before = offsets.len() as u64;
        let _ = offset_before;

        match decision {
            Some(decision) => {
                let base_offset = *offsets.get(&decision.base_oid).expect(
                    "engine selected a base not yet written to this pack",
                );
                writer.add_delta_ofs(base_offset, oid, &decision.delta)?;
                let depth = depths.get(&decision.base_oid).copied().unwrap_or(0) + 1;
                depths.insert(oid, depth);
            }
            None => {
                writer.add_object(entry.obj_type, &data)?;
                depths.insert(oid, 0);
            }
        }

        // The offset of the entry just written is the last recorded one.
        let written_offset = writer
            .entries()
            .last()
            .map(|(_, off, _)| off)
            .expect("writer just received an entry");
        offsets.insert(oid, written_offset);
        pool.push(candidate);
    }

    let mut entries: Vec<(ObjectId, u64, u32)> = writer
        .entries()
        .map(|(oid, off, crc)| (*oid, off, crc))
        .collect();
    let (pack_path, checksum) = writer.finish()?;
    build_pack_index(&idx_path, &mut entries, &checksum)?;

    Ok((pack_path, idx_path, checksum))
}

/// Remove every existing `.pack`/`.idx` pair under `<objects>/pack` other
/// than the one just written, and delete loose objects that are now
/// represented in the new pack.
///
/// Mirrors `git repack -a -d`: afterwards the repository has exactly one
/// pack covering everything reachable at the time of the repack.
pub fn finalize_repack(
    repo: &Repository,
    keep_pack: &Path,
    newly_packed: &[ObjectId],
) -> Result<(), GcError> {
    let objects_dir = repo.odb().objects_dir();
    let pack_dir = objects_dir.join("pack");
    if let Ok(entries) = std::fs::read_dir(&pack_dir) {
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path == *keep_pack {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str());
            if matches!(ext, Some("pack") | Some("idx")) && path.with_extension("pack") != *keep_pack
            {
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    for oid in newly_packed {
        let loose_path = git_loose::LooseObjectStore::open(objects_dir, repo.hash_algo())
            .object_path(oid);
        let _ = std::fs::remove_file(&loose_path);
    }

    repo.odb().refresh()?;
    Ok(())
}
