//! Ambient configuration, modeled on `govctl::config::Config`: a plain
//! `serde`-deserializable struct with sane defaults, no global state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Library-wide configuration for the remote-facing operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskLinkConfig {
    /// Timeout applied to every individual HTTP call.
    #[serde(with = "duration_millis", default = "default_http_timeout")]
    pub http_timeout: Duration,

    /// Maximum depth the mask walker / reconstructor will descend before
    /// giving up on a branch (§9: implementation-defined, >= 128).
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,

    /// Whether `maskRemoteResourceAsNewResource` should re-GET the nonce
    /// after losing a write-once race (§5: "implementations SHOULD
    /// re-fetch after a PUT-loss").
    #[serde(default = "default_retry_on_nonce_conflict")]
    pub retry_on_nonce_conflict: bool,
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_tree_depth() -> usize {
    128
}

fn default_retry_on_nonce_conflict() -> bool {
    true
}

impl Default for MaskLinkConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_http_timeout(),
            max_tree_depth: default_max_tree_depth(),
            retry_on_nonce_conflict: default_retry_on_nonce_conflict(),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_minimums() {
        let cfg = MaskLinkConfig::default();
        assert!(cfg.max_tree_depth >= 128);
        assert!(cfg.retry_on_nonce_conflict);
    }
}
