//! Scripted whole-body animation.

use rp_core::Tick;
use rp_protocol::{Instruction, MotionStatus};

use crate::action::{
    Action, ActionState, ActionStatus, FailureReason, HookContext, MotionCategory,
    capture_on_end, capture_on_start,
};
use crate::library::AnimationRecord;

/// Play one animation from the model library.
///
/// Ends when the backend reports the clip finished.  A clip that runs past
/// its frame count plus slack ends anyway: looping clips count that as
/// success, one-shot clips as a timeout.
#[derive(Debug)]
pub struct Animate {
    state:    ActionState,
    name:     String,
    record:   Option<AnimationRecord>,
    forward:  bool,
    looping:  bool,
    playing:  bool,
    started:  Tick,
    tick_cap: u64,
}

impl Animate {
    /// `record` is `None` when the library has no clip called `name`; the
    /// action then fails on its first tick.
    pub fn new(name: String, record: Option<AnimationRecord>, forward: bool, looping: bool) -> Self {
        Self {
            state: ActionState::default(),
            name,
            record,
            forward,
            looping,
            playing: false,
            started: Tick::ZERO,
            tick_cap: 0,
        }
    }

    pub fn animation(&self) -> &str {
        &self.name
    }
}

impl Action for Animate {
    fn name(&self) -> &'static str {
        "animate"
    }

    fn motion_category(&self) -> Option<MotionCategory> {
        Some(MotionCategory::Animation)
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let Some(record) = &self.record else {
            self.state.status = ActionStatus::Failure(FailureReason::InvalidTarget);
            return Vec::new();
        };
        self.started = ctx.tick();
        self.tick_cap = record.tick_budget(ctx.target_framerate());
        self.playing = true;

        let mut out = capture_on_start(ctx);
        out.push(Instruction::AddHumanoidAnimation {
            name: record.name.clone(),
            url:  record.url.clone(),
        });
        out.push(Instruction::PlayReplicantAnimation {
            name:      record.name.clone(),
            id:        ctx.static_data.replicant_id,
            framerate: record.framerate,
            forward:   self.forward,
            looping:   self.looping,
        });
        out
    }

    fn proceed(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        match ctx.dynamic.motion_status {
            MotionStatus::Success => self.state.status = ActionStatus::Success,
            MotionStatus::Obstructed => {
                self.state.status = ActionStatus::Failure(FailureReason::Collision)
            }
            _ if ctx.tick().since(self.started) > self.tick_cap => {
                self.state.status = if self.looping {
                    ActionStatus::Success
                } else {
                    ActionStatus::Failure(FailureReason::Timeout)
                };
            }
            _ => {}
        }
        Vec::new()
    }

    fn terminate(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let mut out = Vec::new();
        // A clip stopped early, or one that loops, keeps playing unless told otherwise.
        if self.playing && (self.looping || self.state.status != ActionStatus::Success) {
            out.push(Instruction::StopReplicantAnimation { id: ctx.static_data.replicant_id });
        }
        out.extend(capture_on_end(ctx));
        out
    }
}
