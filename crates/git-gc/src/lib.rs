//! Repository maintenance: reachability analysis, pruning of unreachable
//! loose objects, packed-refs consolidation, reflog expiry, and repacking.
//!
//! This crate implements the operations behind `git gc`, `git repack`, and
//! `git prune` as a library rather than command bodies. Callers can drive a
//! `git_repository::Repository` through [`reachability`], [`prune`],
//! [`pack_refs`], [`reflog_expiry`], and [`repack`] directly for fine
//! control, or call [`orchestrate::run_gc`] for the full pass `gc`
//! runs, aggregated into a [`orchestrate::GcReport`]. A `gc.pid`
//! lock around a `run_gc` call, and the `gc.auto` threshold check that
//! decides whether to call it at all, are left to the caller.

pub mod backend;
pub mod orchestrate;
pub mod pack_refs;
pub mod prune;
pub mod reachability;
pub mod reflog_expiry;
pub mod repack;

pub use orchestrate::{run_gc, GcOptions, GcReport};

use std::path::PathBuf;

/// Errors produced by maintenance operations.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Loose(#[from] git_loose::LooseError),

    #[error(transparent)]
    Pack(#[from] git_pack::PackError),

    #[error(transparent)]
    RevWalk(#[from] git_revwalk::RevWalkError),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error("stale lock held by pid {pid} at {path}")]
    AlreadyRunning { pid: String, path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cancelled(#[from] git_utils::cancel::Cancelled),
}
