//! The `Action` trait and the lifecycle types every action shares.
//!
//! # Lifecycle
//!
//! An action is driven by its controller, one hook per tick:
//!
//! 1. [`initialize`][Action::initialize] exactly once, on the first tick the
//!    action is live.  If it leaves the status terminal, its instructions are
//!    discarded and the termination hook runs the same tick instead.
//! 2. [`proceed`][Action::proceed] on every following tick while the status
//!    is `Ongoing`.
//! 3. [`terminate`][Action::terminate] exactly once, on the tick the status
//!    first becomes terminal.  It never changes the status.
//!
//! Actions never emit instructions outside these hooks.

use std::fmt;

use rp_core::{CaptureMode, ObjectId, Tick, TickClock};
use rp_protocol::{Instruction, MotionStatus, RecordSet};

use crate::collision::CollisionDetection;
use crate::snapshot::{DynamicSnapshot, StaticSnapshot};

// ── Status ────────────────────────────────────────────────────────────────────

/// Why an action failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The target was beyond reach when the action started.
    TargetUnreachable,
    /// The collision policy stopped the motion.
    Collision,
    /// The action's tick budget ran out.
    Timeout,
    /// The replicant was not in a state that allows the action, e.g. the
    /// hand is already holding something.
    PreconditionViolated,
    /// The target does not exist or cannot be resolved.
    InvalidTarget,
    /// The motion finished but the hand stopped short of the target.
    FailedToReach,
    /// Obstacle avoidance saw something in the motion path.
    Obstacle,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::TargetUnreachable => "target_unreachable",
            FailureReason::Collision => "collision",
            FailureReason::Timeout => "timeout",
            FailureReason::PreconditionViolated => "precondition_violated",
            FailureReason::InvalidTarget => "invalid_target",
            FailureReason::FailedToReach => "failed_to_reach",
            FailureReason::Obstacle => "obstacle",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ActionStatus {
    #[default]
    Ongoing,
    Success,
    Failure(FailureReason),
}

impl ActionStatus {
    #[inline]
    pub fn is_ongoing(self) -> bool {
        self == ActionStatus::Ongoing
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_ongoing()
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Ongoing => f.write_str("ongoing"),
            ActionStatus::Success => f.write_str("success"),
            ActionStatus::Failure(reason) => write!(f, "failure:{}", reason.as_str()),
        }
    }
}

/// Lifecycle bookkeeping embedded in every action.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionState {
    pub status:      ActionStatus,
    pub initialized: bool,
    pub done:        bool,
}

/// Motion families that share collision handling.  Two actions are "the
/// same" for the consecutive-collision rule when their categories match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MotionCategory {
    Arm,
    Animation,
}

impl MotionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            MotionCategory::Arm => "arm",
            MotionCategory::Animation => "animation",
        }
    }
}

/// Value snapshot of a finished action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRecord {
    pub name:     &'static str,
    pub category: Option<MotionCategory>,
    pub status:   ActionStatus,
}

impl ActionRecord {
    pub fn of(action: &dyn Action) -> Self {
        Self {
            name:     action.name(),
            category: action.motion_category(),
            status:   action.status(),
        }
    }
}

// ── Hook context ──────────────────────────────────────────────────────────────

/// Read-only state handed to every hook.
///
/// Built by the controller after the dynamic snapshot has been refreshed for
/// the current tick.  `previous` and `collision_detection` let composite
/// actions apply the consecutive-collision rule to the actions they start.
pub struct HookContext<'a> {
    pub records:             &'a RecordSet,
    pub static_data:         &'a StaticSnapshot,
    pub dynamic:             &'a DynamicSnapshot,
    pub capture:             CaptureMode,
    pub clock:               &'a TickClock,
    pub previous:            Option<&'a ActionRecord>,
    pub collision_detection: &'a CollisionDetection,
}

impl HookContext<'_> {
    #[inline]
    pub fn tick(&self) -> Tick {
        self.clock.current_tick
    }

    #[inline]
    pub fn target_framerate(&self) -> u32 {
        self.clock.target_framerate
    }
}

// ── Action ────────────────────────────────────────────────────────────────────

/// One in-flight behavior.
///
/// Only [`initialize`][Self::initialize] and the state accessors are
/// required.  The default [`proceed`][Self::proceed] emits nothing and the
/// default [`terminate`][Self::terminate] only handles image capture.
pub trait Action: fmt::Debug + Send {
    /// Short stable name used in logs and output.
    fn name(&self) -> &'static str;

    /// `Some` for motions the collision policy watches.
    fn motion_category(&self) -> Option<MotionCategory> {
        None
    }

    /// An object this action may touch without tripping the collision policy.
    fn exempt_object(&self) -> Option<ObjectId> {
        None
    }

    fn state(&self) -> &ActionState;
    fn state_mut(&mut self) -> &mut ActionState;

    fn status(&self) -> ActionStatus {
        self.state().status
    }

    fn initialize(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction>;

    fn proceed(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
        Vec::new()
    }

    fn terminate(&mut self, ctx: &HookContext<'_>) -> Vec<Instruction> {
        capture_on_end(ctx)
    }

    /// Force a terminal failure from outside the action.
    fn abort(&mut self, reason: FailureReason) {
        self.state_mut().status = ActionStatus::Failure(reason);
    }
}

// ── Image capture ─────────────────────────────────────────────────────────────

/// Image-sensor instructions for the start of an action.
pub fn capture_on_start(ctx: &HookContext<'_>) -> Vec<Instruction> {
    let enable = match ctx.capture {
        CaptureMode::Always => true,
        CaptureMode::Once => false,
        CaptureMode::Never => return Vec::new(),
    };
    vec![Instruction::EnableImageSensor {
        enable,
        avatar_id: ctx.static_data.replicant_id.avatar_id(),
    }]
}

/// Image-sensor instructions for the end of an action.
pub fn capture_on_end(ctx: &HookContext<'_>) -> Vec<Instruction> {
    match ctx.capture {
        CaptureMode::Once => vec![Instruction::EnableImageSensor {
            enable:    true,
            avatar_id: ctx.static_data.replicant_id.avatar_id(),
        }],
        CaptureMode::Always | CaptureMode::Never => Vec::new(),
    }
}

/// Tick-count cap for a timed motion: its duration at the backend's rate
/// plus a fixed allowance.
pub(crate) fn motion_tick_cap(ctx: &HookContext<'_>, duration_secs: f32) -> u64 {
    const SLACK_TICKS: u64 = 30;
    ctx.clock.ticks_for_secs(duration_secs) + SLACK_TICKS
}

/// Map a finished, non-successful motion report onto a failure.
pub(crate) fn motion_failure(status: MotionStatus) -> Option<FailureReason> {
    match status {
        MotionStatus::CannotReach => Some(FailureReason::TargetUnreachable),
        MotionStatus::FailedToReach => Some(FailureReason::FailedToReach),
        MotionStatus::Obstructed => Some(FailureReason::Collision),
        MotionStatus::Idle | MotionStatus::Ongoing | MotionStatus::Success => None,
    }
}
