//! Per-replicant configuration.

use serde::{Deserialize, Serialize};

use rp_core::{CaptureMode, ReplicantId, Vec3};

use crate::collision::CollisionDetection;

fn default_model() -> String {
    "replicant_0".to_owned()
}

fn default_framerate() -> u32 {
    100
}

/// Everything needed to spawn and drive one replicant.
///
/// Only `id` is required when loading from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicantConfig {
    pub id: ReplicantId,

    /// Model name, looked up in the shared [`ModelLibrary`](crate::ModelLibrary).
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub position: Vec3,

    /// Euler angles in degrees.
    #[serde(default)]
    pub rotation: Vec3,

    #[serde(default)]
    pub capture: CaptureMode,

    /// Physics frames per second requested from the backend.
    #[serde(default = "default_framerate")]
    pub target_framerate: u32,

    /// Rules in force when the replicant spawns and after every reset.
    #[serde(default)]
    pub collision_detection: CollisionDetection,
}

impl ReplicantConfig {
    pub fn new(id: ReplicantId) -> Self {
        Self {
            id,
            model:               default_model(),
            position:            Vec3::ZERO,
            rotation:            Vec3::ZERO,
            capture:             CaptureMode::default(),
            target_framerate:    default_framerate(),
            collision_detection: CollisionDetection::default(),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_collision_detection(mut self, rules: CollisionDetection) -> Self {
        self.collision_detection = rules;
        self
    }
}
