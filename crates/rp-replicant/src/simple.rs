//! Single-tick and idle actions.

use rp_core::Axis;
use rp_protocol::Instruction;

use crate::action::{Action, ActionState, ActionStatus, HookContext, capture_on_end};

/// The idle action installed when a replicant first appears.  Never ends and
/// never emits anything.
#[derive(Debug, Default)]
pub struct DoNothing {
    state: ActionState,
}

impl DoNothing {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Action for DoNothing {
    fn name(&self) -> &'static str {
        "do_nothing"
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
        Vec::new()
    }

    fn terminate(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
        Vec::new()
    }
}

/// Turn in place by a yaw angle (degrees).
///
/// The rotation is applied by the backend in one step, so the action
/// succeeds on the tick it starts and the rotation goes out with the
/// termination batch.
#[derive(Debug)]
pub struct TurnBy {
    state: ActionState,
    angle: f32,
}

impl TurnBy {
    pub fn new(angle: f32) -> Self {
        Self { state: ActionState::default(), angle }
    }
}

impl Action for TurnBy {
    fn name(&self) -> &'static str {
        "turn_by"
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
        self.state.status = ActionStatus::Success;
        Vec::new()
    }

    fn terminate(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let mut out = Vec::with_capacity(2);
        if self.state.status == ActionStatus::Success {
            out.push(Instruction::RotateObjectBy {
                angle:        self.angle,
                id:           ctx.static_data.replicant_id.as_object(),
                axis:         Axis::Yaw,
                is_world:     true,
                use_centroid: false,
            });
        }
        out.extend(capture_on_end(ctx));
        out
    }
}
