//! Shared model and animation metadata.
//!
//! A `ModelLibrary` is loaded once by the embedding application and handed
//! to every controller as an `Arc<ModelLibrary>`.  Controllers only read it.
//!
//! # File format
//!
//! ```json
//! {
//!   "replicants": [{"name": "replicant_0", "url": "file:///models/replicant_0"}],
//!   "animations": [{"name": "wave", "url": "file:///anims/wave", "framerate": 30, "num_frames": 90}]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReplicantResult;

/// A spawnable replicant model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicantModel {
    pub name: String,
    pub url:  String,
}

/// A scripted humanoid animation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationRecord {
    pub name:       String,
    pub url:        String,
    /// Frames per second the animation was authored at.
    pub framerate:  u32,
    pub num_frames: u32,
}

impl AnimationRecord {
    /// Extra ticks allowed past the nominal length before an animation is
    /// considered stuck.
    pub const SLACK_TICKS: u64 = 10;

    /// Ticks one playback takes at `target_framerate`, plus slack.
    pub fn tick_budget(&self, target_framerate: u32) -> u64 {
        let fps = self.framerate.max(1) as f64;
        let ticks = (self.num_frames as f64 * target_framerate as f64 / fps).ceil() as u64;
        ticks + Self::SLACK_TICKS
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelLibrary {
    #[serde(default)]
    pub replicants: Vec<ReplicantModel>,
    #[serde(default)]
    pub animations: Vec<AnimationRecord>,
}

impl ModelLibrary {
    pub fn from_json_str(json: &str) -> ReplicantResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> ReplicantResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn replicant(&self, name: &str) -> Option<&ReplicantModel> {
        self.replicants.iter().find(|r| r.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<&AnimationRecord> {
        self.animations.iter().find(|a| a.name == name)
    }

    pub fn with_replicant(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.replicants.push(ReplicantModel { name: name.into(), url: url.into() });
        self
    }

    pub fn with_animation(
        mut self,
        name:       impl Into<String>,
        url:        impl Into<String>,
        framerate:  u32,
        num_frames: u32,
    ) -> Self {
        self.animations.push(AnimationRecord {
            name: name.into(),
            url: url.into(),
            framerate,
            num_frames,
        });
        self
    }
}
