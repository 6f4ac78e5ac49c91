//! `rp-protocol`: what crosses the backend boundary.
//!
//! Each tick the controller side sends one ordered batch of [`Instruction`]s
//! and receives one ordered batch of output records.  This crate defines
//! both directions and the reader that turns raw response bytes into a
//! [`RecordSet`].
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`instruction`] | `Instruction` (serde-tagged by `"$type"`), `Frequency` |
//! | [`record`]      | `Record`, `RecordKind`, typed record payloads          |
//! | [`record_set`]  | `RecordSet`: records grouped by kind                   |
//! | [`reader`]      | `RecordReader` trait, `JsonRecordReader`               |
//! | [`error`]       | `ProtocolError`, `ProtocolResult`                      |

pub mod error;
pub mod instruction;
pub mod reader;
pub mod record;
pub mod record_set;


pub use error::{ProtocolError, ProtocolResult};
pub use instruction::{DropOffset, Frequency, Instruction, encode_batch};
pub use reader::{JsonRecordReader, RecordReader, encode_records};
pub use record::{
    CollisionRecord, CollisionState, ContainmentRecord, EmptyObjectEntry, EmptyObjectsRecord,
    EnvironmentCollisionRecord, FramerateRecord, MotionStatus, OverlapRecord, Record, RecordKind,
    ReplicantObject, ReplicantState, ReplicantsRecord, RigidbodiesRecord, RigidbodyEntry,
    StaticEmptyObject, StaticEmptyObjectsRecord, TransformEntry, TransformsRecord,
};
pub use record_set::RecordSet;
