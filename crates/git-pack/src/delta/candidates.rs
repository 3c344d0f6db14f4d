//! Delta base candidate finders.
//!
//! Picking a good delta base is most of what makes a pack small: the
//! compressor itself (`compute::compute_delta`) just turns a chosen
//! `(base, target)` pair into bytes. These finders propose which objects
//! are worth trying as a base for a given target, in priority order, so
//! the engine can stop once a sufficiently small delta is found.

use git_hash::ObjectId;
use git_object::ObjectType;

/// A candidate base object to try a delta against.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub oid: ObjectId,
    pub obj_type: ObjectType,
    pub size: u64,
    pub path_hint: Option<Vec<u8>>,
}

/// Proposes delta base candidates for a target object.
///
/// Implementations never read object content; they only rank and filter
/// from cheap metadata (`Candidate`). The engine fetches content lazily
/// for whichever candidates the finder actually returns.
pub trait CandidateFinder {
    /// Return candidate bases for `target`, ordered best-first.
    ///
    /// `pool` is every object eligible to serve as a base (already
    /// written or about to be written in the same pack), excluding the
    /// target itself.
    fn candidates(&self, target: &Candidate, pool: &[Candidate]) -> Vec<ObjectId>;
}

/// Only consider objects within a size ratio window of the target.
///
/// Git's own heuristic: deltas against a wildly different sized object
/// are rarely worthwhile since the instruction stream overhead dominates.
pub struct SizeSimilarityFinder {
    /// Maximum size ratio (larger / smaller) to consider, e.g. `4.0`.
    pub max_ratio: f64,
    /// Cap on how many candidates to return.
    pub limit: usize,
}

impl Default for SizeSimilarityFinder {
    fn default() -> Self {
        Self {
            max_ratio: 4.0,
            limit: 32,
        }
    }
}

impl CandidateFinder for SizeSimilarityFinder {
    fn candidates(&self, target: &Candidate, pool: &[Candidate]) -> Vec<ObjectId> {
        let mut ranked: Vec<(f64, &Candidate)> = pool
            .iter()
            .filter(|c| c.obj_type == target.obj_type && c.oid != target.oid)
            .filter_map(|c| {
                let (small, big) = if c.size < target.size {
                    (c.size, target.size)
                } else {
                    (target.size, c.size)
                };
                if small == 0 {
                    return None;
                }
                let ratio = big as f64 / small as f64;
                (ratio <= self.max_ratio).then_some((ratio, c))
            })
            .collect();
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        ranked
            .into_iter()
            .take(self.limit)
            .map(|(_, c)| c.oid)
            .collect()
    }
}

/// Only consider objects that were last seen under the same path.
///
/// This is how git finds that `src/lib.rs@v1` and `src/lib.rs@v2` are
/// related even when they are far apart in the object graph: both blobs
/// carry the path they were found at while walking trees.
pub struct PathGroupedFinder {
    pub limit: usize,
}

impl Default for PathGroupedFinder {
    fn default() -> Self {
        Self { limit: 16 }
    }
}

impl CandidateFinder for PathGroupedFinder {
    fn candidates(&self, target: &Candidate, pool: &[Candidate]) -> Vec<ObjectId> {
        let Some(path) = &target.path_hint else {
            return Vec::new();
        };
        pool.iter()
            .filter(|c| c.oid != target.oid && c.path_hint.as_ref() == Some(path))
            .take(self.limit)
            .map(|c| c.oid)
            .collect()
    }
}

/// Consider the `window` objects immediately preceding the target in
/// write order, regardless of path or size.
///
/// This mirrors git's default sliding-window packer: after sorting
/// objects into a good base order, objects close together in that order
/// are usually related even without explicit path metadata (e.g. blobs
/// with no path hint, or cross-commit tree reuse).
pub struct CommitWindowFinder {
    pub window: usize,
}

impl Default for CommitWindowFinder {
    fn default() -> Self {
        Self { window: 10 }
    }
}

impl CandidateFinder for CommitWindowFinder {
    fn candidates(&self, target: &Candidate, pool: &[Candidate]) -> Vec<ObjectId> {
        let Some(pos) = pool.iter().position(|c| c.oid == target.oid) else {
            return pool
                .iter()
                .rev()
                .take(self.window)
                .map(|c| c.oid)
                .collect();
        };
        let start = pos.saturating_sub(self.window);
        pool[start..pos].iter().map(|c| c.oid).collect()
    }
}

/// Combine several finders, deduplicating and preserving first-seen order.
///
/// Finders run in the order given, so put the cheapest/most-likely-to-win
/// finder first — the engine tries candidates in the order returned and
/// may stop early once it has a good-enough delta.
pub struct CompositeFinder {
    finders: Vec<Box<dyn CandidateFinder>>,
}

impl CompositeFinder {
    pub fn new(finders: Vec<Box<dyn CandidateFinder>>) -> Self {
        Self { finders }
    }

    /// The finder git-native packing uses: path grouping first (cheap and
    /// highly precise), then size similarity, then a window fallback.
    pub fn git_native() -> Self {
        Self::new(vec![
            Box::new(PathGroupedFinder::default()),
            Box::new(SizeSimilarityFinder::default()),
            Box::new(CommitWindowFinder::default()),
        ])
    }
}

impl CandidateFinder for CompositeFinder {
    fn candidates(&self, target: &Candidate, pool: &[Candidate]) -> Vec<ObjectId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for finder in &self.finders {
            for oid in finder.candidates(target, pool) {
                if seen.insert(oid) {
                    out.push(oid);
                }
            }
        }
        out
    }
}
