//! `rp-replicant`: the action-execution framework for one replicant.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`action`]      | `Action` trait, `ActionStatus`, `FailureReason`, `HookContext` |
//! | [`simple`]      | `DoNothing`, `TurnBy`                                       |
//! | [`arm`]         | `ReachFor`, `ResetArm`                                      |
//! | [`hold`]        | `Grasp`, `DropObject`                                       |
//! | [`head`]        | `HeadMotion` (look at, rotate, reset)                       |
//! | [`animate`]     | `Animate`                                                   |
//! | [`sequence`]    | `Sequence`                                                  |
//! | [`behavior`]    | `Behavior` requests and their validation                    |
//! | [`snapshot`]    | `StaticSnapshot`, `DynamicSnapshot`, `Contact`              |
//! | [`collision`]   | `CollisionDetection` rules and the abort policy             |
//! | [`library`]     | `ModelLibrary` shared model/animation metadata              |
//! | [`config`]      | `ReplicantConfig`                                           |
//! | [`controller`]  | `ReplicantController`                                       |
//! | [`error`]       | `ReplicantError`, `ReplicantResult<T>`                      |
//!
//! # Design notes
//!
//! A controller owns at most one live action and drives exactly one of its
//! hooks per tick.  Action failures are status values, never `Err`s: the
//! only errors this crate returns come from building a controller or from
//! structurally invalid requests.

pub mod action;
pub mod animate;
pub mod arm;
pub mod behavior;
pub mod collision;
pub mod config;
pub mod controller;
pub mod error;
pub mod head;
pub mod hold;
pub mod library;
pub mod sequence;
pub mod simple;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use action::{
    Action, ActionRecord, ActionState, ActionStatus, FailureReason, HookContext, MotionCategory,
};
pub use animate::Animate;
pub use arm::{ReachFor, ReachTarget, ResetArm};
pub use behavior::Behavior;
pub use collision::{Abort, CollisionDetection};
pub use config::ReplicantConfig;
pub use controller::ReplicantController;
pub use error::{ReplicantError, ReplicantResult};
pub use head::{HeadMotion, HeadMotionKind, LookTarget};
pub use hold::{DropObject, Grasp};
pub use library::{AnimationRecord, ModelLibrary, ReplicantModel};
pub use sequence::Sequence;
pub use simple::{DoNothing, TurnBy};
pub use snapshot::{Contact, ContactTarget, DynamicSnapshot, StaticSnapshot};
