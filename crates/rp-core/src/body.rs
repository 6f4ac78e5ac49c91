//! Body-part vocabulary shared by snapshots, actions, and instructions.

use std::fmt;

/// One of the replicant's two arms.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Arm {
    Left,
    Right,
}

impl Arm {
    pub const ALL: [Arm; 2] = [Arm::Left, Arm::Right];

    /// Local id of the empty (anchor) object attached to this arm at spawn.
    #[inline]
    pub fn anchor_index(self) -> u32 {
        match self {
            Arm::Left => 0,
            Arm::Right => 1,
        }
    }

    /// The hand body part at the end of this arm.
    #[inline]
    pub fn hand(self) -> BodyPart {
        match self {
            Arm::Left => BodyPart::HandL,
            Arm::Right => BodyPart::HandR,
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Arm::Left => "left",
            Arm::Right => "right",
        })
    }
}

/// Rotation axis used by head and held-object instructions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    Pitch,
    Yaw,
    Roll,
}

/// Tracked body parts, in the order the backend lists them after the
/// replicant's own id in a `Replicants` record.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BodyPart {
    Pelvis,
    Spine,
    Neck,
    Head,
    UpperArmL,
    LowerArmL,
    HandL,
    UpperArmR,
    LowerArmR,
    HandR,
    ThighL,
    CalfL,
    FootL,
    ThighR,
    CalfR,
    FootR,
}

impl BodyPart {
    pub const COUNT: usize = 16;

    /// Record order.  `Replicants` lists `[replicant, BODY_PARTS[0], BODY_PARTS[1], …]`.
    pub const ALL: [BodyPart; BodyPart::COUNT] = [
        BodyPart::Pelvis,
        BodyPart::Spine,
        BodyPart::Neck,
        BodyPart::Head,
        BodyPart::UpperArmL,
        BodyPart::LowerArmL,
        BodyPart::HandL,
        BodyPart::UpperArmR,
        BodyPart::LowerArmR,
        BodyPart::HandR,
        BodyPart::ThighL,
        BodyPart::CalfL,
        BodyPart::FootL,
        BodyPart::ThighR,
        BodyPart::CalfR,
        BodyPart::FootR,
    ];

    /// The arm this part belongs to, if any.
    pub fn arm(self) -> Option<Arm> {
        match self {
            BodyPart::UpperArmL | BodyPart::LowerArmL | BodyPart::HandL => Some(Arm::Left),
            BodyPart::UpperArmR | BodyPart::LowerArmR | BodyPart::HandR => Some(Arm::Right),
            _ => None,
        }
    }
}

/// How often the agent's camera captures images while actions run.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CaptureMode {
    /// Capture once, on the tick an action ends.
    #[default]
    Once,
    /// Capture every tick while an action runs.
    Always,
    /// Never touch the image sensor.
    Never,
}
