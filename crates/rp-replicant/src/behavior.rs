//! Behavior requests: the caller-facing description of what a replicant
//! should do next.
//!
//! A [`Behavior`] is plain data.  [`Behavior::validate`] rejects structurally
//! invalid parameters up front; [`Behavior::into_action`] builds the action
//! that carries it out.  Problems that can only be seen in the scene, like an
//! unknown target object, are left to the action and surface as a failure
//! status on its first tick.

use rp_core::{Arm, Axis, ObjectId, Vec3};
use rp_protocol::DropOffset;

use crate::action::Action;
use crate::animate::Animate;
use crate::arm::{ReachFor, ReachTarget, ResetArm};
use crate::error::{ReplicantResult, invalid};
use crate::head::{HeadMotion, LookTarget};
use crate::hold::{DropObject, Grasp};
use crate::library::ModelLibrary;
use crate::sequence::Sequence;
use crate::simple::{DoNothing, TurnBy};

#[derive(Clone, Debug, PartialEq)]
pub enum Behavior {
    DoNothing,
    /// Turn by `angle` degrees (positive is clockwise seen from above).
    TurnBy { angle: f32 },
    ReachFor {
        target:         ReachTarget,
        arms:           Vec<Arm>,
        arrived_at:     f32,
        max_distance:   f32,
        duration:       f32,
        scale_duration: bool,
    },
    ResetArm {
        arms:           Vec<Arm>,
        duration:       f32,
        scale_duration: bool,
    },
    Grasp {
        target:           ObjectId,
        arm:              Arm,
        angle:            Option<f32>,
        axis:             Option<Axis>,
        relative_to_hand: bool,
        offset:           f32,
    },
    Drop {
        arm:            Arm,
        max_num_frames: u32,
        offset:         DropOffset,
    },
    LookAt {
        target:         LookTarget,
        duration:       f32,
        scale_duration: bool,
    },
    RotateHead {
        axis:           Axis,
        angle:          f32,
        duration:       f32,
        scale_duration: bool,
    },
    ResetHead {
        duration:       f32,
        scale_duration: bool,
    },
    Animate {
        name:    String,
        forward: bool,
        looping: bool,
    },
    Sequence(Vec<Behavior>),
}

// ── Constructors with the usual defaults ──────────────────────────────────────

impl Behavior {
    pub const DEFAULT_ARRIVED_AT: f32 = 0.09;
    pub const DEFAULT_MAX_DISTANCE: f32 = 1.5;
    pub const DEFAULT_ARM_DURATION: f32 = 0.25;
    pub const DEFAULT_HEAD_DURATION: f32 = 0.1;
    pub const DEFAULT_DROP_FRAMES: u32 = 100;

    pub fn turn_by(angle: f32) -> Self {
        Behavior::TurnBy { angle }
    }

    pub fn reach_for(target: ReachTarget, arm: Arm) -> Self {
        Behavior::ReachFor {
            target,
            arms:           vec![arm],
            arrived_at:     Self::DEFAULT_ARRIVED_AT,
            max_distance:   Self::DEFAULT_MAX_DISTANCE,
            duration:       Self::DEFAULT_ARM_DURATION,
            scale_duration: true,
        }
    }

    pub fn reset_arm(arm: Arm) -> Self {
        Behavior::ResetArm {
            arms:           vec![arm],
            duration:       Self::DEFAULT_ARM_DURATION,
            scale_duration: true,
        }
    }

    pub fn grasp(target: ObjectId, arm: Arm) -> Self {
        Behavior::Grasp {
            target,
            arm,
            angle:            Some(90.0),
            axis:             Some(Axis::Pitch),
            relative_to_hand: true,
            offset:           0.0,
        }
    }

    pub fn drop(arm: Arm) -> Self {
        Behavior::Drop {
            arm,
            max_num_frames: Self::DEFAULT_DROP_FRAMES,
            offset:         DropOffset::default(),
        }
    }

    pub fn look_at(target: LookTarget) -> Self {
        Behavior::LookAt { target, duration: Self::DEFAULT_HEAD_DURATION, scale_duration: true }
    }

    pub fn rotate_head(axis: Axis, angle: f32) -> Self {
        Behavior::RotateHead {
            axis,
            angle,
            duration: Self::DEFAULT_HEAD_DURATION,
            scale_duration: true,
        }
    }

    pub fn reset_head() -> Self {
        Behavior::ResetHead { duration: Self::DEFAULT_HEAD_DURATION, scale_duration: true }
    }

    pub fn animate(name: impl Into<String>) -> Self {
        Behavior::Animate { name: name.into(), forward: true, looping: false }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::DoNothing => "do_nothing",
            Behavior::TurnBy { .. } => "turn_by",
            Behavior::ReachFor { .. } => "reach_for",
            Behavior::ResetArm { .. } => "reset_arm",
            Behavior::Grasp { .. } => "grasp",
            Behavior::Drop { .. } => "drop",
            Behavior::LookAt { .. } => "look_at",
            Behavior::RotateHead { .. } => "rotate_head",
            Behavior::ResetHead { .. } => "reset_head",
            Behavior::Animate { .. } => "animate",
            Behavior::Sequence(_) => "sequence",
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

fn finite(value: f32, what: &str) -> ReplicantResult<()> {
    if value.is_finite() { Ok(()) } else { Err(invalid(format!("{what} must be finite"))) }
}

fn finite_vec(v: Vec3, what: &str) -> ReplicantResult<()> {
    if v.is_finite() { Ok(()) } else { Err(invalid(format!("{what} must be finite"))) }
}

fn non_negative(value: f32, what: &str) -> ReplicantResult<()> {
    finite(value, what)?;
    if value < 0.0 {
        return Err(invalid(format!("{what} must not be negative, got {value}")));
    }
    Ok(())
}

fn arm_list(arms: &[Arm]) -> ReplicantResult<()> {
    if arms.is_empty() {
        return Err(invalid("arm list is empty"));
    }
    if arms.len() > 2 || (arms.len() == 2 && arms[0] == arms[1]) {
        return Err(invalid("arm list repeats an arm"));
    }
    Ok(())
}

impl Behavior {
    /// Reject parameters no action could run with.
    pub fn validate(&self) -> ReplicantResult<()> {
        match self {
            Behavior::DoNothing => Ok(()),
            Behavior::TurnBy { angle } => finite(*angle, "turn angle"),
            Behavior::ReachFor { target, arms, arrived_at, max_distance, duration, .. } => {
                match target {
                    ReachTarget::Object(id) if !id.is_valid() => {
                        return Err(invalid("reach target id is invalid"));
                    }
                    ReachTarget::Position(p) | ReachTarget::Relative(p) => {
                        finite_vec(*p, "reach target")?
                    }
                    ReachTarget::Object(_) => {}
                }
                arm_list(arms)?;
                non_negative(*arrived_at, "arrived_at")?;
                non_negative(*max_distance, "max_distance")?;
                non_negative(*duration, "duration")
            }
            Behavior::ResetArm { arms, duration, .. } => {
                arm_list(arms)?;
                non_negative(*duration, "duration")
            }
            Behavior::Grasp { target, angle, offset, .. } => {
                if !target.is_valid() {
                    return Err(invalid("grasp target id is invalid"));
                }
                if let Some(angle) = angle {
                    finite(*angle, "grasp angle")?;
                }
                finite(*offset, "grasp offset")
            }
            Behavior::Drop { max_num_frames, offset, .. } => {
                if *max_num_frames == 0 {
                    return Err(invalid("max_num_frames must be at least 1"));
                }
                match offset {
                    DropOffset::Distance(d) => finite(*d, "drop offset"),
                    DropOffset::Position(p) => finite_vec(*p, "drop position"),
                }
            }
            Behavior::LookAt { target, duration, .. } => {
                if let LookTarget::Position(p) = target {
                    finite_vec(*p, "look target")?;
                }
                non_negative(*duration, "duration")
            }
            Behavior::RotateHead { angle, duration, .. } => {
                finite(*angle, "head angle")?;
                non_negative(*duration, "duration")
            }
            Behavior::ResetHead { duration, .. } => non_negative(*duration, "duration"),
            Behavior::Animate { name, .. } => {
                if name.is_empty() {
                    return Err(invalid("animation name is empty"));
                }
                Ok(())
            }
            Behavior::Sequence(steps) => {
                if steps.is_empty() {
                    return Err(invalid("sequence is empty"));
                }
                steps.iter().try_for_each(Behavior::validate)
            }
        }
    }

    /// Build the action for this behavior.  Call [`validate`][Self::validate]
    /// first.
    pub fn into_action(self, library: &ModelLibrary) -> Box<dyn Action> {
        match self {
            Behavior::DoNothing => Box::new(DoNothing::new()),
            Behavior::TurnBy { angle } => Box::new(TurnBy::new(angle)),
            Behavior::ReachFor { target, arms, arrived_at, max_distance, duration, scale_duration } => {
                Box::new(ReachFor::new(target, arms, arrived_at, max_distance, duration, scale_duration))
            }
            Behavior::ResetArm { arms, duration, scale_duration } => {
                Box::new(ResetArm::new(arms, duration, scale_duration))
            }
            Behavior::Grasp { target, arm, angle, axis, relative_to_hand, offset } => {
                Box::new(Grasp::new(target, arm, angle, axis, relative_to_hand, offset))
            }
            Behavior::Drop { arm, max_num_frames, offset } => {
                Box::new(DropObject::new(arm, max_num_frames, offset))
            }
            Behavior::LookAt { target, duration, scale_duration } => {
                Box::new(HeadMotion::look_at(target, duration, scale_duration))
            }
            Behavior::RotateHead { axis, angle, duration, scale_duration } => {
                Box::new(HeadMotion::rotate_by(axis, angle, duration, scale_duration))
            }
            Behavior::ResetHead { duration, scale_duration } => {
                Box::new(HeadMotion::reset(duration, scale_duration))
            }
            Behavior::Animate { name, forward, looping } => {
                let record = library.animation(&name).cloned();
                Box::new(Animate::new(name, record, forward, looping))
            }
            Behavior::Sequence(steps) => Box::new(Sequence::new(
                steps.into_iter().map(|b| b.into_action(library)).collect(),
            )),
        }
    }
}
