//! Session-level configuration, loadable from JSON.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rp_protocol::Frequency;
use rp_replicant::ReplicantConfig;

use crate::error::{SessionError, SessionResult};

/// ```json
/// {
///   "max_ticks": 2000,
///   "replicants": [{"id": 0, "position": {"x": 0.0, "y": 0.0, "z": 0.0}}],
///   "rigidbodies": "always"
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Safety cap on any run loop.
    pub max_ticks:   u64,
    pub replicants:  Vec<ReplicantConfig>,
    /// Ask the backend for contact events.
    pub collisions:  bool,
    pub rigidbodies: Frequency,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_ticks:   10_000,
            replicants:  Vec::new(),
            collisions:  true,
            rigidbodies: Frequency::Always,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> SessionResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn with_replicant(mut self, replicant: ReplicantConfig) -> Self {
        self.replicants.push(replicant);
        self
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.max_ticks == 0 {
            return Err(SessionError::Config("max_ticks must be positive".into()));
        }
        let mut seen = BTreeSet::new();
        for r in &self.replicants {
            if !seen.insert(r.id) {
                return Err(SessionError::DuplicateReplicant(r.id));
            }
        }
        Ok(())
    }
}
