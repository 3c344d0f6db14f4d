//! Typed accessors over `delta.*`, `gc.*`, and `transport.*` config, with
//! defaults filled in when a key is absent. Mirrors the shape of
//! `git_config::ConfigSet::get_push_config`: one `RuntimeConfig::load` call
//! per scope, so callers don't re-derive the same defaults at each site.

use git_config::ConfigSet;

use crate::RepoError;

/// Delta compression tuning, read from `[delta]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaConfig {
    /// `delta.maxChainDepth`. Matches C git's `pack.depth` default of 50.
    pub max_chain_depth: u32,
    /// `delta.window`. Candidates considered per target object.
    pub window: usize,
    /// `delta.compression`: "native", "aggressive", "network", or "blobOnly",
    /// selecting one of `git_pack::delta::engine::DeltaEngine`'s presets.
    pub compression: DeltaCompressionProfile,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        DeltaConfig {
            max_chain_depth: 50,
            window: 10,
            compression: DeltaCompressionProfile::Native,
        }
    }
}

/// Which [`git_pack::delta::engine::DeltaEngine`] preset to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaCompressionProfile {
    Native,
    Aggressive,
    NetworkStreaming,
    BlobOnly,
}

/// Maintenance tuning, read from `[gc]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GcConfig {
    /// `gc.pruneExpire`. Grace period in seconds before an unreachable loose
    /// object is eligible for pruning; C git defaults to two weeks.
    pub prune_expire_seconds: u64,
    /// `gc.reflogExpire`. Grace period in seconds for non-`HEAD` reflog
    /// entries; C git defaults to 90 days.
    pub reflog_expire_seconds: u64,
    /// `gc.reflogExpireUnreachable`. Grace period in seconds for reflog
    /// entries that point at an otherwise-unreachable object; C git
    /// defaults to 30 days.
    pub reflog_expire_unreachable_seconds: u64,
    /// `gc.auto`. Loose object count that triggers `gc --auto`; 0 disables
    /// the automatic threshold.
    pub auto_threshold: u64,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            prune_expire_seconds: 14 * 24 * 3600,
            reflog_expire_seconds: 90 * 24 * 3600,
            reflog_expire_unreachable_seconds: 30 * 24 * 3600,
            auto_threshold: 6700,
        }
    }
}

/// Sync/transport tuning, read from `[transport]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// `transport.perMessageTimeout`, in seconds. How long a single
    /// pkt-line read/write may block before the connection is treated as
    /// stalled.
    pub per_message_timeout_seconds: u64,
    /// `transport.callTimeout`, in seconds. Upper bound on an entire
    /// fetch/push negotiation, 0 disables it.
    pub call_timeout_seconds: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            per_message_timeout_seconds: 30,
            call_timeout_seconds: 0,
        }
    }
}

/// Merged, typed view over the `delta`/`gc`/`transport` sections of a
/// repository's [`ConfigSet`]. Built once per read; cheap to construct
/// since it only touches a handful of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub delta: DeltaConfig,
    pub gc: GcConfig,
    pub transport: TransportConfig,
}

impl RuntimeConfig {
    /// Read `delta.*`, `gc.*`, and `transport.*` out of `config`, falling
    /// back to the documented default for any key that is absent.
    pub fn load(config: &ConfigSet) -> Result<Self, RepoError> {
        let defaults = DeltaConfig::default();
        let delta = DeltaConfig {
            max_chain_depth: config
                .get_usize("delta.maxchaindepth")?
                .map(|v| v as u32)
                .unwrap_or(defaults.max_chain_depth),
            window: config
                .get_usize("delta.window")?
                .unwrap_or(defaults.window),
            compression: match config.get_string("delta.compression")? {
                Some(v) => parse_compression_profile(&v),
                None => defaults.compression,
            },
        };

        let gc_defaults = GcConfig::default();
        let gc = GcConfig {
            prune_expire_seconds: config
                .get_usize("gc.pruneexpire")?
                .map(|v| v as u64)
                .unwrap_or(gc_defaults.prune_expire_seconds),
            reflog_expire_seconds: config
                .get_usize("gc.reflogexpire")?
                .map(|v| v as u64)
                .unwrap_or(gc_defaults.reflog_expire_seconds),
            reflog_expire_unreachable_seconds: config
                .get_usize("gc.reflogexpireunreachable")?
                .map(|v| v as u64)
                .unwrap_or(gc_defaults.reflog_expire_unreachable_seconds),
            auto_threshold: config
                .get_usize("gc.auto")?
                .map(|v| v as u64)
                .unwrap_or(gc_defaults.auto_threshold),
        };

        let transport_defaults = TransportConfig::default();
        let transport = TransportConfig {
            per_message_timeout_seconds: config
                .get_usize("transport.permessagetimeout")?
                .map(|v| v as u64)
                .unwrap_or(transport_defaults.per_message_timeout_seconds),
            call_timeout_seconds: config
                .get_usize("transport.calltimeout")?
                .map(|v| v as u64)
                .unwrap_or(transport_defaults.call_timeout_seconds),
        };

        Ok(RuntimeConfig { delta, gc, transport })
    }
}

fn parse_compression_profile(value: &str) -> DeltaCompressionProfile {
    match value.to_ascii_lowercase().as_str() {
        "aggressive" => DeltaCompressionProfile::Aggressive,
        "network" | "networkstreaming" => DeltaCompressionProfile::NetworkStreaming,
        "blobonly" => DeltaCompressionProfile::BlobOnly,
        _ => DeltaCompressionProfile::Native,
    }
}
