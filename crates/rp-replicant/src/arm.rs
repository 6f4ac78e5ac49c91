//! Arm motions: reaching and returning the arm to rest.
//!
//! Both report progress through the backend's motion status and share the
//! `Arm` collision category.

use rp_core::{Arm, ObjectId, Pose, Tick, Vec3};
use rp_protocol::{Instruction, MotionStatus};

use crate::action::{
    Action, ActionState, ActionStatus, FailureReason, HookContext, MotionCategory,
    capture_on_start, motion_failure, motion_tick_cap,
};

/// What a reach is aimed at.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ReachTarget {
    Object(ObjectId),
    /// World-space point.
    Position(Vec3),
    /// Offset from the hand anchor, in the replicant's local frame
    /// (x = right, y = up, z = forward).
    Relative(Vec3),
}

// ── ReachFor ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ReachFor {
    state:          ActionState,
    target:         ReachTarget,
    arms:           Vec<Arm>,
    arrived_at:     f32,
    max_distance:   f32,
    duration:       f32,
    scale_duration: bool,
    started:        Tick,
    tick_cap:       u64,
}

impl ReachFor {
    pub fn new(
        target:         ReachTarget,
        arms:           Vec<Arm>,
        arrived_at:     f32,
        max_distance:   f32,
        duration:       f32,
        scale_duration: bool,
    ) -> Self {
        Self {
            state: ActionState::default(),
            target,
            arms,
            arrived_at,
            max_distance,
            duration,
            scale_duration,
            started: Tick::ZERO,
            tick_cap: 0,
        }
    }

    /// World-space target point for one arm this tick.
    fn resolve(&self, arm: Arm, ctx: &HookContext<'_>) -> Option<Vec3> {
        match self.target {
            ReachTarget::Object(id) => ctx.records.object_pose(id).map(|p| p.position),
            ReachTarget::Position(p) => Some(p),
            ReachTarget::Relative(offset) => {
                let origin = ctx
                    .dynamic
                    .anchor_positions
                    .get(&arm)
                    .copied()
                    .unwrap_or(ctx.dynamic.pose.position);
                Some(Pose::new(origin, ctx.dynamic.pose.forward).local_to_world(offset))
            }
        }
    }

    /// Distance from `arm`'s hand to the target, if both are known.
    fn hand_distance(&self, arm: Arm, ctx: &HookContext<'_>) -> Option<f32> {
        let target = self.resolve(arm, ctx)?;
        let hand = ctx.dynamic.hand_position(arm).unwrap_or(ctx.dynamic.pose.position);
        Some(hand.distance(target))
    }

    fn instruction(&self, arm: Arm, duration: f32, ctx: &HookContext<'_>) -> Instruction {
        let id = ctx.static_data.replicant_id;
        let (max_distance, arrived_at) = (self.max_distance, self.arrived_at);
        match self.target {
            ReachTarget::Object(object_id) => Instruction::ReplicantReachForObject {
                id, object_id, duration, arm, max_distance, arrived_at,
            },
            ReachTarget::Position(position) => Instruction::ReplicantReachForPosition {
                id, position, duration, arm, max_distance, arrived_at,
            },
            ReachTarget::Relative(position) => Instruction::ReplicantReachForRelativePosition {
                id, position, duration, arm, max_distance, arrived_at,
            },
        }
    }
}

impl Action for ReachFor {
    fn name(&self) -> &'static str {
        "reach_for"
    }

    fn motion_category(&self) -> Option<MotionCategory> {
        Some(MotionCategory::Arm)
    }

    fn exempt_object(&self) -> Option<ObjectId> {
        match self.target {
            ReachTarget::Object(id) => Some(id),
            _ => None,
        }
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        for &arm in &self.arms {
            match self.hand_distance(arm, ctx) {
                None => {
                    self.state.status = ActionStatus::Failure(FailureReason::InvalidTarget);
                    return Vec::new();
                }
                Some(d) if d > self.max_distance => {
                    self.state.status = ActionStatus::Failure(FailureReason::TargetUnreachable);
                    return Vec::new();
                }
                Some(_) => {}
            }
        }

        let duration = ctx.clock.scaled_duration(self.duration, self.scale_duration);
        self.started = ctx.tick();
        self.tick_cap = motion_tick_cap(ctx, duration);

        let mut out = capture_on_start(ctx);
        out.extend(self.arms.iter().map(|&arm| self.instruction(arm, duration, ctx)));
        out
    }

    fn proceed(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let status = ctx.dynamic.motion_status;
        if status == MotionStatus::Success {
            let arrived = self
                .arms
                .iter()
                .all(|&arm| self.hand_distance(arm, ctx).is_some_and(|d| d <= self.arrived_at));
            self.state.status = if arrived {
                ActionStatus::Success
            } else {
                ActionStatus::Failure(FailureReason::FailedToReach)
            };
        } else if let Some(reason) = motion_failure(status) {
            self.state.status = ActionStatus::Failure(reason);
        } else if ctx.tick().since(self.started) > self.tick_cap {
            self.state.status = ActionStatus::Failure(FailureReason::Timeout);
        }
        Vec::new()
    }
}

// ── ResetArm ──────────────────────────────────────────────────────────────────

/// Return one or both arms to their rest pose.
#[derive(Debug)]
pub struct ResetArm {
    state:          ActionState,
    arms:           Vec<Arm>,
    duration:       f32,
    scale_duration: bool,
    started:        Tick,
    tick_cap:       u64,
}

impl ResetArm {
    pub fn new(arms: Vec<Arm>, duration: f32, scale_duration: bool) -> Self {
        Self {
            state: ActionState::default(),
            arms,
            duration,
            scale_duration,
            started: Tick::ZERO,
            tick_cap: 0,
        }
    }
}

impl Action for ResetArm {
    fn name(&self) -> &'static str {
        "reset_arm"
    }

    fn motion_category(&self) -> Option<MotionCategory> {
        Some(MotionCategory::Arm)
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let duration = ctx.clock.scaled_duration(self.duration, self.scale_duration);
        self.started = ctx.tick();
        self.tick_cap = motion_tick_cap(ctx, duration);

        let id = ctx.static_data.replicant_id;
        let mut out = capture_on_start(ctx);
        out.extend(
            self.arms
                .iter()
                .map(|&arm| Instruction::ReplicantResetArm { id, duration, arm }),
        );
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
