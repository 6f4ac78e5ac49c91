//! `rp-sim`: session tick loop for the replicant framework.
//!
//! # Tick loop
//!
//! ```text
//! start:   batch₀ = subsystems' + replicants' spawn instructions
//!          records = backend.communicate(batch₀)
//! step:    batch = queued ++ subsystems.advance(records) ++ replicants.advance(records)
//!          records = backend.communicate(batch)
//! ```
//!
//! Subsystems always run before replicants: a replicant's action may depend
//! on data a subsystem asked for in the same batch.
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`subsystem`]   | `Subsystem` trait, `DataRequests`                     |
//! | [`manager`]     | `AgentManager`: fixed-order aggregation               |
//! | [`backend`]     | `Backend` trait, `ScriptedBackend`, `StdioBackend`    |
//! | [`session`]     | `Session`: start / step / run loops                   |
//! | [`builder`]     | `SessionBuilder`                                      |
//! | [`observer`]    | `SessionObserver`, `NoopObserver`, `TickSummary`      |
//! | [`config`]      | `SessionConfig`                                       |
//! | [`error`]       | `SessionError`, `SessionResult`                       |

pub mod backend;
pub mod builder;
pub mod config;
pub mod error;
pub mod manager;
pub mod observer;
pub mod session;
pub mod subsystem;


pub use backend::{Backend, ScriptedBackend, StdioBackend};
pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use manager::AgentManager;
pub use observer::{NoopObserver, SessionObserver, TickSummary};
pub use session::Session;
pub use subsystem::{DataRequests, Subsystem};
