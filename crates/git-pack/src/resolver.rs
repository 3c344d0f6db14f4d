//! Random-access delta resolution with an intermediate-result cache.
//!
//! [`crate::pack::PackFile::read_object`] walks a delta chain from scratch
//! on every call. That is fine for a one-shot read, but a revision walk or
//! a `cat-file --batch` session tends to re-visit nearby offsets in the
//! same pack repeatedly (a tree and its parent's tree, a blob and its
//! previous version). [`DeltaResolver`] wraps a pack with a small cache of
//! already-resolved bytes keyed by pack offset, checked at every step of
//! the chain walk so a hit anywhere in the chain — not just at the final
//! offset — short-circuits the remaining base lookups.

use std::num::NonZeroUsize;

use flate2::bufread::ZlibDecoder;
use git_hash::ObjectId;
use git_object::ObjectType;
use lru::LruCache;
use std::io::Read;

use crate::entry::{parse_entry_header, PackEntry};
use crate::pack::PackFile;
use crate::{PackEntryType, PackError, PackedObject, MAX_DELTA_CHAIN_DEPTH};

/// Record a checkpoint every `N`th step of a chain walk so long chains
/// don't force a full cache miss down to the base every time.
const DEFAULT_CHECKPOINT_INTERVAL: usize = 8;

/// Wraps a [`PackFile`] with a bounded cache of resolved intermediate
/// chain results, keyed by the entry's offset in the pack.
pub struct DeltaResolver<'pack> {
    pack: &'pack PackFile,
    cache: LruCache<u64, (ObjectType, Vec<u8>)>,
    checkpoint_interval: usize,
}

impl<'pack> DeltaResolver<'pack> {
    /// Create a resolver over `pack` with the given cache capacity (number
    /// of resolved intermediate objects to retain).
    pub fn new(pack: &'pack PackFile, cache_capacity: usize) -> Self {
        Self {
            pack,
            cache: LruCache::new(
                NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            ),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }

    /// Resolve the object at `offset`, consulting and updating the cache.
    ///
    /// `external` resolves a REF_DELTA base OID not found in this pack
    /// (typically by looking in other packs or loose storage).
    pub fn resolve(
        &mut self,
        offset: u64,
        external: impl Fn(&ObjectId) -> Option<(ObjectType, Vec<u8>)>,
    ) -> Result<PackedObject, PackError> {
        if let Some((obj_type, data)) = self.cache.get(&offset) {
            return Ok(PackedObject {
                obj_type: *obj_type,
                data: data.clone(),
            });
        }

        let data = self.pack.data();
        let mut chain: Vec<(u64, PackEntry, Vec<u8>)> = Vec::new();
        let mut current_offset = offset;

        let (base_type, base_data) = 'walk: loop {
            if let Some((obj_type, cached)) = self.cache.get(&current_offset) {
                break 'walk (*obj_type, cached.clone());
            }

            if chain.len() >= MAX_DELTA_CHAIN_DEPTH {
                return Err(PackError::DeltaChainTooDeep {
                    offset,
                    max_depth: MAX_DELTA_CHAIN_DEPTH,
                });
            }

            let entry = parse_entry_header(&data[current_offset as usize..], current_offset)?;
            let compressed = &data[entry.data_offset as usize..];
            let decompressed = decompress(compressed, entry.uncompressed_size, current_offset)?;

            match entry.entry_type {
                PackEntryType::Commit | PackEntryType::Tree | PackEntryType::Blob | PackEntryType::Tag => {
                    let obj_type = entry.entry_type.to_object_type().expect("non-delta type");
                    break 'walk (obj_type, decompressed);
                }
                PackEntryType::OfsDelta { base_offset } => {
                    chain.push((current_offset, entry, decompressed));
                    current_offset = base_offset;
                }
                PackEntryType::RefDelta { base_oid } => {
                    if let Some(base_offset) = self.pack.index().lookup(&base_oid) {
                        chain.push((current_offset, entry, decompressed));
                        current_offset = base_offset;
                    } else if let Some((obj_type, base_data)) = external(&base_oid) {
                        chain.push((current_offset, entry, decompressed));
                        break 'walk (obj_type, base_data);
                    } else {
                        return Err(PackError::MissingBase(base_oid));
                    }
                }
            }
        };

        // Apply the chain from the base outward, checkpointing along the
        // way so the next nearby lookup doesn't re-walk this far.
        let mut obj_type = base_type;
        let mut result = base_data;
        for (step, (entry_offset, _entry, delta_data)) in chain.iter().rev().enumerate() {
            result = crate::delta::apply::apply_delta(&result, delta_data)?;
            if (step + 1) % self.checkpoint_interval == 0 {
                self.cache.put(*entry_offset, (obj_type, result.clone()));
            }
        }
        self.cache.put(offset, (obj_type, result.clone()));

        Ok(PackedObject {
            obj_type,
            data: result,
        })
    }

    /// Current number of cached intermediate results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn decompress(compressed: &[u8], expected_size: usize, offset: u64) -> Result<Vec<u8>, PackError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut buf = Vec::with_capacity(expected_size);
    decoder
        .read_to_end(&mut buf)
        .map_err(|_| PackError::CorruptEntry(offset))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::{build_pack_index, PackWriter};
    use git_hash::{HashAlgorithm, ObjectId};
    use git_object::ObjectType;

    #[test]
    fn resolves_and_caches_ofs_delta_chain() {
        let dir = tempfile::tempdir().unwrap();
        let pack_path = dir.path().join("resolver.pack");
        let idx_path = dir.path().join("resolver.idx");

        let v1 = b"Version one of a growing file that keeps getting appended to.".to_vec();
        let mut v2 = v1.clone();
        v2.extend_from_slice(b" Second revision appends this tail.");
        let mut v3 = v2.clone();
        v3.extend_from_slice(b" Third revision appends more still.");

        let mut writer = PackWriter::new(&pack_path).unwrap();
        let off_v1 = crate::PACK_HEADER_SIZE as u64;
        writer.add_object(ObjectType::Blob, &v1).unwrap();

        let delta_v2 = crate::delta::compute::compute_delta(&v1, &v2)
            .expect("an appended tail should produce a useful delta");
        let oid_v2 = ObjectId::from_bytes(&[0u8; 20], HashAlgorithm::Sha1).unwrap();
        writer.add_delta_ofs(off_v1, oid_v2, &delta_v2.delta).unwrap();
        let entries_after_v2: Vec<_> = writer.entries().map(|(oid, off, crc)| (*oid, off, crc)).collect();
        let off_v2 = entries_after_v2[1].1;

        let delta_v3 = crate::delta::compute::compute_delta(&v2, &v3)
            .expect("an appended tail should produce a useful delta");
        let oid_v3 = ObjectId::from_bytes(&[1u8; 20], HashAlgorithm::Sha1).unwrap();
        writer.add_delta_ofs(off_v2, oid_v3, &delta_v3.delta).unwrap();

        let mut all_entries: Vec<(ObjectId, u64, u32)> = writer
            .entries()
            .map(|(oid, off, crc)| (*oid, off, crc))
            .collect();
        let (_, checksum) = writer.finish().unwrap();
        build_pack_index(&idx_path, &mut all_entries, &checksum).unwrap();

        let pack = PackFile::open(&pack_path).unwrap();
        let mut resolver = DeltaResolver::new(&pack, 16);

        let resolved = resolver.resolve(off_v2, |_| None).unwrap();
        assert_eq!(resolved.data, v2);

        // A second resolve of the same offset should come back identical,
        // whether served from cache or recomputed.
        let resolved_again = resolver.resolve(off_v2, |_| None).unwrap();
        assert_eq!(resolved_again.data, v2);
    }
}
