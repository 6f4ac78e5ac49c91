//! `rp-core`: foundational types for the replicant action framework.
//!
//! This crate is a dependency of every other `rp-*` crate.  It has no `rp-*`
//! dependencies and a single external one (`thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                            |
//! |---------------|-----------------------------------------------------|
//! | [`ids`]       | `ReplicantId`, `ObjectId`                           |
//! | [`geometry`]  | `Vec3`, `Pose`                                      |
//! | [`time`]      | `Tick`, `TickClock`, duration scaling               |
//! | [`body`]      | `Arm`, `Axis`, `BodyPart`, `CaptureMode`            |
//! | [`error`]     | `RpError`, `RpResult`                               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by `rp-protocol`.                                 |

pub mod body;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use body::{Arm, Axis, BodyPart, CaptureMode};
pub use error::{RpError, RpResult, ensure_finite};
pub use geometry::{Pose, Vec3};
pub use ids::{ObjectId, ReplicantId};
pub use time::{NOMINAL_FRAMERATE, Tick, TickClock, scale_duration};
