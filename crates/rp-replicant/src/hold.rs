//! Picking objects up and letting them go.
//!
//! A held object is made kinematic and everything it contains is parented
//! to it, so a carried basket keeps its contents.  Dropping reverses both.

use rp_core::{Arm, Axis, ObjectId};
use rp_protocol::{DropOffset, Instruction};

use crate::action::{
    Action, ActionState, ActionStatus, FailureReason, HookContext, capture_on_end,
    capture_on_start,
};

// ── Grasp ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Grasp {
    state:            ActionState,
    target:           ObjectId,
    arm:              Arm,
    angle:            Option<f32>,
    axis:             Option<Axis>,
    relative_to_hand: bool,
    offset:           f32,
}

impl Grasp {
    pub fn new(
        target:           ObjectId,
        arm:              Arm,
        angle:            Option<f32>,
        axis:             Option<Axis>,
        relative_to_hand: bool,
        offset:           f32,
    ) -> Self {
        Self {
            state: ActionState::default(),
            target,
            arm,
            angle,
            axis,
            relative_to_hand,
            offset,
        }
    }
}

impl Action for Grasp {
    fn name(&self) -> &'static str {
        "grasp"
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        if ctx.dynamic.held(self.arm).is_some() {
            self.state.status = ActionStatus::Failure(FailureReason::PreconditionViolated);
            return Vec::new();
        }
        if ctx.static_data.owns(self.target) || ctx.records.object_pose(self.target).is_none() {
            self.state.status = ActionStatus::Failure(FailureReason::InvalidTarget);
            return Vec::new();
        }

        let mut out = capture_on_start(ctx);
        out.push(Instruction::ReplicantGraspObject {
            id:               ctx.static_data.replicant_id,
            object_id:        self.target,
            arm:              self.arm,
            angle:            self.angle,
            axis:             self.axis,
            relative_to_hand: self.relative_to_hand,
            offset:           self.offset,
        });
        out
    }

    fn proceed(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
        self.state.status = ActionStatus::Success;
        Vec::new()
    }

    fn terminate(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let mut out = Vec::new();
        if self.state.status == ActionStatus::Success {
            out.push(Instruction::SetKinematicState {
                id:           self.target,
                is_kinematic: true,
                use_gravity:  false,
            });
            for contained in ctx.records.contained_by(self.target) {
                out.push(Instruction::ParentObjectToObject { parent_id: self.target, id: contained });
                out.push(Instruction::SetKinematicState {
                    id:           contained,
                    is_kinematic: true,
                    use_gravity:  false,
                });
            }
        }
        out.extend(capture_on_end(ctx));
        out
    }
}

// ── Drop ──────────────────────────────────────────────────────────────────────

/// Release whatever `arm` holds and wait for it to come to rest.
#[derive(Debug)]
pub struct DropObject {
    state:          ActionState,
    arm:            Arm,
    max_num_frames: u32,
    offset:         DropOffset,
    object:         ObjectId,
    frames:         u32,
}

impl DropObject {
    pub fn new(arm: Arm, max_num_frames: u32, offset: DropOffset) -> Self {
        Self {
            state: ActionState::default(),
            arm,
            max_num_frames,
            offset,
            object: ObjectId::INVALID,
            frames: 0,
        }
    }

    /// The object released at initialization.
    pub fn object(&self) -> ObjectId {
        self.object
    }
}

impl Action for DropObject {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let Some(object) = ctx.dynamic.held(self.arm) else {
            self.state.status = ActionStatus::Failure(FailureReason::PreconditionViolated);
            return Vec::new();
        };
        self.object = object;

        let mut out = capture_on_start(ctx);
        out.push(Instruction::ReplicantDropObject {
            id:     ctx.static_data.replicant_id,
            arm:    self.arm,
            offset: self.offset,
        });
        out.push(Instruction::SetKinematicState { id: object, is_kinematic: false, use_gravity: true });
        for contained in ctx.records.contained_by(object) {
            out.push(Instruction::UnparentObject { id: contained });
            out.push(Instruction::SetKinematicState {
                id:           contained,
                is_kinematic: false,
                use_gravity:  true,
            });
        }
        out
    }

    fn proceed(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        self.frames += 1;
        let at_rest = ctx.records.rigidbody(self.object).is_some_and(|rb| !rb.is_moving());
        if at_rest {
            self.state.status = ActionStatus::Success;
        } else if self.frames >= self.max_num_frames {
            self.state.status = ActionStatus::Failure(FailureReason::Timeout);
        }
        Vec::new()
    }
}
