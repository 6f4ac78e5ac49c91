//! Head motions: look at a target, rotate by an angle, return to neutral.
//!
//! All three are continuous motions the backend runs over several ticks.
//! They are not collision-checked.

use rp_core::{Axis, ObjectId, Tick, Vec3};
use rp_protocol::{Instruction, MotionStatus};

use crate::action::{
    Action, ActionState, ActionStatus, FailureReason, HookContext, capture_on_start,
    motion_failure, motion_tick_cap,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LookTarget {
    Object(ObjectId),
    Position(Vec3),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum HeadMotionKind {
    LookAt(LookTarget),
    /// Rotate by `angle` degrees around `axis`.
    RotateBy { axis: Axis, angle: f32 },
    Reset,
}

#[derive(Debug)]
pub struct HeadMotion {
    state:          ActionState,
    kind:           HeadMotionKind,
    duration:       f32,
    scale_duration: bool,
    started:        Tick,
    tick_cap:       u64,
}

impl HeadMotion {
    pub fn new(kind: HeadMotionKind, duration: f32, scale_duration: bool) -> Self {
        Self {
            state: ActionState::default(),
            kind,
            duration,
            scale_duration,
            started: Tick::ZERO,
            tick_cap: 0,
        }
    }

    pub fn look_at(target: LookTarget, duration: f32, scale_duration: bool) -> Self {
        Self::new(HeadMotionKind::LookAt(target), duration, scale_duration)
    }

    pub fn rotate_by(axis: Axis, angle: f32, duration: f32, scale_duration: bool) -> Self {
        Self::new(HeadMotionKind::RotateBy { axis, angle }, duration, scale_duration)
    }

    pub fn reset(duration: f32, scale_duration: bool) -> Self {
        Self::new(HeadMotionKind::Reset, duration, scale_duration)
    }

    pub fn kind(&self) -> HeadMotionKind {
        self.kind
    }
}

impl Action for HeadMotion {
    fn name(&self) -> &'static str {
        match self.kind {
            HeadMotionKind::LookAt(_) => "look_at",
            HeadMotionKind::RotateBy { .. } => "rotate_head",
            HeadMotionKind::Reset => "reset_head",
        }
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        if let HeadMotionKind::LookAt(LookTarget::Object(object)) = self.kind {
            if ctx.records.object_pose(object).is_none() {
                self.state.status = ActionStatus::Failure(FailureReason::InvalidTarget);
                return Vec::new();
            }
        }

        let duration = ctx.clock.scaled_duration(self.duration, self.scale_duration);
        self.started = ctx.tick();
        self.tick_cap = motion_tick_cap(ctx, duration);

        let id = ctx.static_data.replicant_id;
        let mut out = capture_on_start(ctx);
        out.push(match self.kind {
            HeadMotionKind::LookAt(LookTarget::Object(object_id)) => {
                Instruction::ReplicantLookAtObject { id, object_id, duration, use_centroid: true }
            }
            HeadMotionKind::LookAt(LookTarget::Position(position)) => {
                Instruction::ReplicantLookAtPosition { id, position, duration }
            }
            HeadMotionKind::RotateBy { axis, angle } => {
                Instruction::ReplicantRotateHeadBy { id, axis, angle, duration }
            }
            HeadMotionKind::Reset => Instruction::ReplicantResetHead { id, duration },
        });
        out
    }

    fn proceed(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let status = ctx.dynamic.motion_status;
        if status == MotionStatus::Success {
            self.state.status = ActionStatus::Success;
        } else if let Some(reason) = motion_failure(status) {
            self.state.status = ActionStatus::Failure(reason);
        } else if ctx.tick().since(self.started) > self.tick_cap {
            self.state.status = ActionStatus::Failure(FailureReason::Timeout);
        }
        Vec::new()
    }
}
