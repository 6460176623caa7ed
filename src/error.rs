//! Configuration errors
//!
//! Gameplay code never fails a tick; these surface from setup paths and from
//! payloads that do not match the live arena. Per-tick callers log and skip.

use thiserror::Error;

use crate::sim::zone::TeamSide;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("{side:?} zone count {zones} does not match color payload length {colors}")]
    ZoneCountMismatch {
        side: TeamSide,
        zones: usize,
        colors: usize,
    },

    #[error("no spawn points configured")]
    NoSpawnPoints,

    #[error("prefab {0:?} could not be created")]
    MissingPrefab(crate::sim::entity::Prefab),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
