//! Collision-detection configuration and the abort policy built on it.
//!
//! The policy is a pair of pure functions.  The controller calls
//! [`aborts_on_start`] before a motion action's first hook and
//! [`evaluate`] before every continuation; either one returning a reason
//! ends the action that tick.

use serde::{Deserialize, Serialize};

use rp_core::{ObjectId, Vec3};
use rp_protocol::OverlapRecord;

use crate::action::{ActionRecord, ActionStatus, FailureReason, MotionCategory};
use crate::snapshot::{ContactTarget, DynamicSnapshot, StaticSnapshot};

/// Per-replicant collision rules.  Mutable between actions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionDetection {
    /// Stop on contact with walls and other static geometry (never the floor).
    pub walls:             bool,
    /// Stop on contact with other objects.
    pub objects:           bool,
    /// Contacts with these objects are ignored.
    pub exclude_objects:   Vec<ObjectId>,
    /// If the previous action had the same motion category and ended in a
    /// collision, fail the next one immediately.
    pub previous_was_same: bool,
    /// Query the space in front of the replicant while its arms move and stop
    /// if anything is there.
    pub avoid:             bool,
}

impl Default for CollisionDetection {
    fn default() -> Self {
        Self {
            walls:             true,
            objects:           true,
            exclude_objects:   Vec::new(),
            previous_was_same: true,
            avoid:             false,
        }
    }
}

impl CollisionDetection {
    /// A configuration that never aborts anything.
    pub fn none() -> Self {
        Self { walls: false, objects: false, previous_was_same: false, ..Self::default() }
    }
}

/// Why the policy stopped an action.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Abort {
    pub reason:   FailureReason,
    /// Number of contacts that triggered the abort.
    pub contacts: usize,
}

/// Obstacle query geometry, in the replicant's local frame.
pub const OVERLAP_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 0.5, 0.3);
pub const OVERLAP_LOCAL_CENTER: Vec3 = Vec3::new(0.0, 1.0, 0.5);

/// Consecutive-same-category rule.
pub fn aborts_on_start(
    category: Option<MotionCategory>,
    previous: Option<&ActionRecord>,
    config:   &CollisionDetection,
) -> bool {
    let (Some(category), Some(previous)) = (category, previous) else {
        return false;
    };
    config.previous_was_same
        && previous.category == Some(category)
        && previous.status == ActionStatus::Failure(FailureReason::Collision)
}

/// Decide whether an ongoing motion must stop this tick.
///
/// `exempt` is an object the action itself is allowed to touch, such as a
/// reach target.  Objects the replicant holds, and its own body, are always
/// ignored.
pub fn evaluate(
    static_data: &StaticSnapshot,
    dynamic:     &DynamicSnapshot,
    config:      &CollisionDetection,
    overlap:     Option<&OverlapRecord>,
    exempt:      Option<ObjectId>,
) -> Option<Abort> {
    let ignored = |id: ObjectId| {
        Some(id) == exempt
            || static_data.owns(id)
            || dynamic.is_holding(id)
            || config.exclude_objects.contains(&id)
    };

    let contacts = dynamic
        .active_contacts()
        .filter(|c| match c.target {
            ContactTarget::Environment { floor } => config.walls && !floor,
            ContactTarget::Object(id) => config.objects && !ignored(id),
        })
        .count();
    if contacts > 0 {
        return Some(Abort { reason: FailureReason::Collision, contacts });
    }

    if config.avoid {
        if let Some(overlap) = overlap {
            let blocking = overlap.object_ids.iter().filter(|&&id| !ignored(id)).count();
            if blocking > 0 || (config.walls && overlap.env) {
                return Some(Abort { reason: FailureReason::Obstacle, contacts: blocking });
            }
        }
    }
    None
}
