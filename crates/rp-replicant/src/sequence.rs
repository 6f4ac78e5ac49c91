//! Run a list of actions one after another as a single action.

use std::mem;

use tracing::debug;

use rp_core::ObjectId;
use rp_protocol::Instruction;

use crate::action::{
    Action, ActionRecord, ActionState, ActionStatus, FailureReason, HookContext, MotionCategory,
};
use crate::collision;

/// An ordered list of child actions.
///
/// Children run with the same one-hook-per-tick discipline as top-level
/// actions.  The next child starts on the tick after the previous one ends.
/// The first failing child fails the whole sequence and later children are
/// never touched.
///
/// The termination batch of the child that ended the sequence is held back
/// and released by the sequence's own termination hook.
///
/// A child only reports its motion category once it has initialized, so the
/// collision policy never reaches a child before its first hook.  Each child
/// with a category is held to the consecutive-collision rule against the
/// last motion child of this sequence, or the action before the sequence if
/// none has finished yet.
#[derive(Debug)]
pub struct Sequence {
    state:       ActionState,
    children:    Vec<Box<dyn Action>>,
    current:     usize,
    pending:     Vec<Instruction>,
    last_motion: Option<ActionRecord>,
}

impl Sequence {
    pub fn new(children: Vec<Box<dyn Action>>) -> Self {
        Self {
            state:       ActionState::default(),
            children,
            current:     0,
            pending:     Vec::new(),
            last_motion: None,
        }
    }

    /// Index of the running child.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Status of each child, in order.
    pub fn child_statuses(&self) -> Vec<ActionStatus> {
        self.children.iter().map(|c| c.status()).collect()
    }

    /// Drive the current child by one hook.
    fn step(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let Some(child) = self.children.get_mut(self.current) else {
            self.state.status = ActionStatus::Success;
            return Vec::new();
        };
        let ctx = HookContext {
            records:             ctx.records,
            static_data:         ctx.static_data,
            dynamic:             ctx.dynamic,
            capture:             ctx.capture,
            clock:               ctx.clock,
            previous:            self.last_motion.as_ref().or(ctx.previous),
            collision_detection: ctx.collision_detection,
        };

        let mut out = if child.state().initialized {
            child.proceed(&ctx)
        } else if collision::aborts_on_start(child.motion_category(), ctx.previous, ctx.collision_detection) {
            debug!(child = child.name(), "previous motion ended in a collision");
            child.abort(FailureReason::Collision);
            child.state_mut().initialized = true;
            Vec::new()
        } else {
            let out = child.initialize(&ctx);
            child.state_mut().initialized = true;
            out
        };

        let status = child.status();
        if status.is_ongoing() {
            return out;
        }

        out = child.terminate(&ctx);
        child.state_mut().done = true;
        if child.motion_category().is_some() {
            self.last_motion = Some(ActionRecord::of(&**child));
        }
        match status {
            ActionStatus::Failure(reason) => {
                self.state.status = ActionStatus::Failure(reason);
                self.pending = out;
                Vec::new()
            }
            _ => {
                self.current += 1;
                if self.current == self.children.len() {
                    self.state.status = ActionStatus::Success;
                    self.pending = out;
                    Vec::new()
                } else {
                    out
                }
            }
        }
    }

    /// The current child, once it has run its first hook.
    fn running(&self) -> Option<&dyn Action> {
        self.children
            .get(self.current)
            .map(|c| c.as_ref())
            .filter(|c| c.state().initialized)
    }
}

impl Action for Sequence {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn motion_category(&self) -> Option<MotionCategory> {
        self.running().and_then(|c| c.motion_category())
    }

    fn exempt_object(&self) -> Option<ObjectId> {
        self.running().and_then(|c| c.exempt_object())
    }

    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        self.step(ctx)
    }

    fn proceed(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        self.step(ctx)
    }

    fn terminate(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        let mut out = mem::take(&mut self.pending);
        // An external abort leaves the running child mid-motion.
        if let Some(child) = self.children.get_mut(self.current) {
            let st = *child.state();
            if st.initialized && !st.done {
                out.extend(child.terminate(ctx));
                child.state_mut().done = true;
            }
        }
        out
    }

    fn abort(&mut self, reason: FailureReason) {
        // The aborted child counts as started so that terminate reaches it.
        if let Some(child) = self.children.get_mut(self.current) {
            if !child.state().done {
                child.abort(reason);
                child.state_mut().initialized = true;
            }
        }
        self.state.status = ActionStatus::Failure(reason);
    }
}
