//! Top-level `run_gc`: the full maintenance pass C git's `gc` command
//! drives, composed from the building blocks in [`crate::reachability`],
//! [`crate::prune`], [`crate::pack_refs`], [`crate::reflog_expiry`], and
//! [`crate::repack`]. Per-object failures (an unreadable loose file, a race
//! with a concurrent writer) are collected into a [`GcReport`] rather than
//! aborting the whole pass — one corrupt object shouldn't block pruning or
//! repacking the rest of the repository.

use std::time::{Duration, SystemTime};

use git_utils::cancel::CancellationToken;

use crate::backend::{GcBackend, GcStats};
use crate::reachability::{collect_roots, reachable_objects};
use crate::GcError;
use git_pack::delta::engine::DeltaEngine;
use git_repository::Repository;

/// Tunables for a single [`run_gc`] pass. Defaults match
/// `git_repository::config::GcConfig`'s defaults; callers that already
/// loaded a [`git_repository::RuntimeConfig`] should build this from it
/// rather than hand-rolling the numbers.
#[derive(Debug, Clone)]
pub struct GcOptions {
    pub prune_expire: Duration,
    pub reflog_expire: Duration,
    pub extra_roots: Vec<git_hash::ObjectId>,
}

impl Default for GcOptions {
    fn default() -> Self {
        GcOptions {
            prune_expire: Duration::from_secs(14 * 24 * 3600),
            reflog_expire: Duration::from_secs(90 * 24 * 3600),
            extra_roots: Vec::new(),
        }
    }
}

/// Aggregated outcome of a [`run_gc`] pass: what each step accomplished and
/// any per-object errors encountered along the way. A non-empty `errors`
/// list means the pass was a partial success, not a failure — the caller
/// decides whether that warrants a retry or just a warning.
#[derive(Debug, Default)]
pub struct GcReport {
    pub stats_before: Option<GcStats>,
    pub stats_after: Option<GcStats>,
    pub objects_pruned: usize,
    pub refs_packed: usize,
    pub reflog_entries_expired: usize,
    pub repacked: bool,
    pub cancelled: bool,
    pub errors: Vec<String>,
}

impl GcReport {
    /// Whether every requested step completed without error or cancellation.
    pub fn is_full_success(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }
}

/// Run a full maintenance pass: collect roots, walk reachability, prune
/// unreachable loose objects, pack loose refs, expire stale reflog
/// entries, and repack the reachable set into a single pack.
///
/// Checked at each step boundary against `token`; if cancelled partway
/// through, steps not yet started are skipped and `report.cancelled` is
/// set. Objects already pruned or repacked stay gone/packed — pruning only
/// ever removes objects already proven unreachable, and a partial repack's
/// temporary pack is never finalized (see [`crate::repack::finalize_repack`]),
/// so a cancelled pass cannot corrupt the object store.
pub fn run_gc(
    repo: &Repository,
    backend: &dyn GcBackend,
    engine: &DeltaEngine,
    options: &GcOptions,
    token: &CancellationToken,
) -> Result<GcReport, GcError> {
    let mut report = GcReport::default();
    report.stats_before = backend.get_stats().ok();

    if token.check().is_err() {
        report.cancelled = true;
        return Ok(report);
    }

    let roots = match collect_roots(repo, &options.extra_roots) {
        Ok(r) => r,
        Err(e) => {
            report.errors.push(format!("collect_roots: {e}"));
            return Ok(report);
        }
    };
    let reachable = match reachable_objects(repo, &roots) {
        Ok(r) => r,
        Err(e) => {
            report.errors.push(format!("reachable_objects: {e}"));
            return Ok(report);
        }
    };

    if token.check().is_err() {
        report.cancelled = true;
        return Ok(report);
    }

    let expire_before = SystemTime::now() - options.prune_expire;
    match backend.prune(&reachable, expire_before) {
        Ok(n) => report.objects_pruned = n,
        Err(e) => report.errors.push(format!("prune: {e}")),
    }

    if token.check().is_err() {
        report.cancelled = true;
        return Ok(report);
    }

    match crate::pack_refs::pack_refs(repo) {
        Ok(n) => report.refs_packed = n,
        Err(e) => report.errors.push(format!("pack_refs: {e}")),
    }

    if token.check().is_err() {
        report.cancelled = true;
        return Ok(report);
    }

    let reflog_cutoff = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
        - options.reflog_expire.as_secs() as i64;
    match crate::reflog_expiry::expire_reflogs(repo, reflog_cutoff) {
        Ok(n) => report.reflog_entries_expired = n,
        Err(e) => report.errors.push(format!("reflog_expiry: {e}")),
    }

    if token.check().is_err() {
        report.cancelled = true;
        return Ok(report);
    }

    let reachable_vec: Vec<_> = reachable.into_iter().collect();
    match backend.compact(&reachable_vec, engine, token) {
        Ok(()) => report.repacked = true,
        Err(e) => report.errors.push(format!("compact: {e}")),
    }

    report.stats_after = backend.get_stats().ok();
    Ok(report)
}
