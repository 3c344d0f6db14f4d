//! Ties candidate finding, delta computation, and acceptance strategy
//! together into a single "pick the best delta for this object" call.

use git_hash::ObjectId;

use super::candidates::{Candidate, CandidateFinder, CompositeFinder};
use super::compute::{compute_delta, estimate_delta_quality};
use super::strategy::DeltaStrategy;
use crate::PackError;

/// Source of object content, used to fetch candidate base bytes on demand.
///
/// The engine never materializes every object in the pool up front — it
/// only asks for bytes of the candidates a finder actually proposes.
pub trait DeltaObjectSource {
    fn load(&self, oid: &ObjectId) -> Result<Option<Vec<u8>>, PackError>;
}

/// A chosen delta: which base it was computed against, the encoded
/// instruction stream, and the figures that made it win over the other
/// candidates tried.
#[derive(Debug, Clone)]
pub struct DeltaDecision {
    pub base_oid: ObjectId,
    pub delta: Vec<u8>,
    pub ratio: f64,
    pub savings: i64,
    /// Chain depth of `base_oid` itself (not the depth this delta adds).
    pub base_depth: usize,
}

/// Ties a [`CandidateFinder`] and a [`DeltaStrategy`] together.
pub struct DeltaEngine {
    finder: Box<dyn CandidateFinder>,
    strategy: DeltaStrategy,
}

impl DeltaEngine {
    pub fn new(finder: Box<dyn CandidateFinder>, strategy: DeltaStrategy) -> Self {
        Self { finder, strategy }
    }

    /// The acceptance strategy this engine was built with.
    pub fn strategy(&self) -> &DeltaStrategy {
        &self.strategy
    }

    /// The engine C git's `gc`/`repack` use by default.
    pub fn git_native() -> Self {
        Self::new(Box::new(CompositeFinder::git_native()), DeltaStrategy::git_native())
    }

    /// Lower latency, shallower chains; suited to generating a pack to
    /// stream over the network during fetch/push negotiation.
    pub fn network_streaming() -> Self {
        Self::new(
            Box::new(CompositeFinder::git_native()),
            DeltaStrategy::network_streaming(),
        )
    }

    /// Spend more CPU for a smaller on-disk pack.
    pub fn pack_aggressive() -> Self {
        Self::new(
            Box::new(CompositeFinder::git_native()),
            DeltaStrategy::pack_aggressive(),
        )
    }

    /// Only ever delta blobs against other blobs.
    pub fn blob_only() -> Self {
        Self::new(Box::new(CompositeFinder::git_native()), DeltaStrategy::blob_only())
    }

    /// Try to find and accept a delta for `target`.
    ///
    /// `target_data` is the target's full serialized content. `pool` is
    /// the candidate base pool (see [`CandidateFinder::candidates`]).
    /// `chain_depth_of` reports the current chain depth of a base
    /// candidate (0 if it is stored whole); a base is skipped once using
    /// it would exceed the strategy's configured chain depth.
    ///
    /// Returns `None` if no candidate produced an acceptable delta —
    /// callers should store the object whole in that case.
    pub fn select_delta(
        &self,
        target: &Candidate,
        target_data: &[u8],
        pool: &[Candidate],
        chain_depth_of: impl Fn(&ObjectId) -> usize,
        source: &dyn DeltaObjectSource,
    ) -> Result<Option<DeltaDecision>, PackError> {
        if !self.strategy.allowed_types.contains(target.obj_type) {
            return Ok(None);
        }

        let target_size = target_data.len() as u64;
        let mut best: Option<DeltaDecision> = None;

        for base_oid in self
            .finder
            .candidates(target, pool)
            .into_iter()
            .take(self.strategy.candidates_to_try)
        {
            let depth = chain_depth_of(&base_oid);
            if !self.strategy.chain_depth_ok(depth + 1) {
                continue;
            }

            // Prune on size alone before paying for content load + delta
            // computation; a candidate the estimate rules out could never
            // pass `accepts` anyway.
            let base_size = pool
                .iter()
                .find(|c| c.oid == base_oid)
                .map(|c| c.size)
                .unwrap_or(target_size);
            if !estimate_delta_quality(base_size, target_size).worth_trying {
                continue;
            }

            let Some(base_data) = source.load(&base_oid)? else {
                continue;
            };
            let Some(computed) = compute_delta(&base_data, target_data) else {
                continue;
            };
            if !self
                .strategy
                .accepts(computed.delta.len(), computed.savings, target_size, target.obj_type)
            {
                continue;
            }

            // Smallest delta wins (equivalently, highest ratio, since the
            // target size is fixed across every candidate here); ties go
            // to the base with the shallower existing chain.
            let better = match &best {
                None => true,
                Some(current) => match computed.delta.len().cmp(&current.delta.len()) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    std::cmp::Ordering::Equal => depth < current.base_depth,
                },
            };
            if better {
                best = Some(DeltaDecision {
                    base_oid,
                    delta: computed.delta,
                    ratio: computed.ratio,
                    savings: computed.savings,
                    base_depth: depth,
                });
            }
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_hash::HashAlgorithm;
    use git_object::ObjectType;
    use std::collections::HashMap;

    struct MapSource(HashMap<ObjectId, Vec<u8>>);

    impl DeltaObjectSource for MapSource {
        fn load(&self, oid: &ObjectId) -> Result<Option<Vec<u8>>, PackError> {
            Ok(self.0.get(oid).cloned())
        }
    }

    fn oid(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        ObjectId::from_bytes(&bytes, HashAlgorithm::Sha1).unwrap()
    }

    #[test]
    fn picks_smaller_delta_among_candidates() {
        let base_small_diff = oid(2);
        let base_large_diff = oid(3);

        let target_data: Vec<u8> = (0..200).map(|i| (i % 7) as u8).collect();
        let mut close = target_data.clone();
        close[100] = 0xFF;
        let mut far: Vec<u8> = (0..200).map(|i| (i % 3) as u8).collect();
        far[0] = 0xAB;

        let mut map = HashMap::new();
        map.insert(base_small_diff, close);
        map.insert(base_large_diff, far);
        let source = MapSource(map);

        let target = Candidate {
            oid: oid(1),
            obj_type: ObjectType::Blob,
            size: target_data.len() as u64,
            path_hint: None,
        };
        let pool = vec![
            Candidate {
                oid: base_small_diff,
                obj_type: ObjectType::Blob,
                size: target_data.len() as u64,
                path_hint: None,
            },
            Candidate {
                oid: base_large_diff,
                obj_type: ObjectType::Blob,
                size: target_data.len() as u64,
                path_hint: None,
            },
        ];

        let engine = DeltaEngine::new(
            Box::new(crate::delta::candidates::SizeSimilarityFinder {
                max_ratio: 100.0,
                limit: 10,
            }),
            DeltaStrategy::pack_aggressive(),
        );

        let decision = engine
            .select_delta(&target, &target_data, &pool, |_| 0, &source)
            .unwrap()
            .expect("expected a delta to be chosen");
        assert_eq!(decision.base_oid, base_small_diff);
    }

    #[test]
    fn skips_candidates_that_would_exceed_chain_depth() {
        let target_data = vec![1u8; 100];
        let base = oid(2);
        let mut map = HashMap::new();
        map.insert(base, vec![1u8; 100]);
        let source = MapSource(map);

        let target = Candidate {
            oid: oid(1),
            obj_type: ObjectType::Blob,
            size: 100,
            path_hint: None,
        };
        let pool = vec![Candidate {
            oid: base,
            obj_type: ObjectType::Blob,
            size: 100,
            path_hint: None,
        }];

        let strategy = DeltaStrategy {
            max_delta_ratio: 0.9,
            max_chain_depth: 2,
            candidates_to_try: 5,
            min_savings: 0,
            size_min: 0,
            size_max: u64::MAX,
            allowed_types: crate::delta::strategy::ObjectTypeSet::all(),
        };
        let engine = DeltaEngine::new(
            Box::new(crate::delta::candidates::SizeSimilarityFinder::default()),
            strategy,
        );

        let decision = engine
            .select_delta(&target, &target_data, &pool, |_| 2, &source)
            .unwrap();
        assert!(decision.is_none());
    }

    #[test]
    fn no_acceptable_candidate_returns_none() {
        let target_data: Vec<u8> = (0..50).map(|i| i as u8).collect();
        let unrelated = oid(2);
        let mut map = HashMap::new();
        map.insert(unrelated, vec![0xFFu8; 50]);
        let source = MapSource(map);

        let target = Candidate {
            oid: oid(1),
            obj_type: ObjectType::Blob,
            size: 50,
            path_hint: None,
        };
        let pool = vec![Candidate {
            oid: unrelated,
            obj_type: ObjectType::Blob,
            size: 50,
            path_hint: None,
        }];

        let engine = DeltaEngine::new(
            Box::new(crate::delta::candidates::SizeSimilarityFinder::default()),
            DeltaStrategy::network_streaming(),
        );
        let decision = engine
            .select_delta(&target, &target_data, &pool, |_| 0, &source)
            .unwrap();
        assert!(decision.is_none());
    }
}
