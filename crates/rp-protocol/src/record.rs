//! Typed output records returned by the backend each tick.
//!
//! The backend's raw bytes are decoded elsewhere (see [`crate::reader`]); this
//! module only defines the record shapes and their named field accessors.

use serde::{Deserialize, Serialize};

use rp_core::{ObjectId, Pose, ReplicantId, Vec3};

// ── Record kinds ──────────────────────────────────────────────────────────────

/// The type tag of a record, used to group a tick's records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Replicants,
    Transforms,
    Collision,
    EnvironmentCollision,
    StaticEmptyObjects,
    EmptyObjects,
    Rigidbodies,
    Containment,
    Framerate,
    Overlap,
}

impl RecordKind {
    pub const ALL: [RecordKind; 10] = [
        RecordKind::Replicants,
        RecordKind::Transforms,
        RecordKind::Collision,
        RecordKind::EnvironmentCollision,
        RecordKind::StaticEmptyObjects,
        RecordKind::EmptyObjects,
        RecordKind::Rigidbodies,
        RecordKind::Containment,
        RecordKind::Framerate,
        RecordKind::Overlap,
    ];

    /// The `"$type"` tag used on the wire.
    pub fn type_name(self) -> &'static str {
        match self {
            RecordKind::Replicants => "replicants",
            RecordKind::Transforms => "transforms",
            RecordKind::Collision => "collision",
            RecordKind::EnvironmentCollision => "environment_collision",
            RecordKind::StaticEmptyObjects => "static_empty_objects",
            RecordKind::EmptyObjects => "empty_objects",
            RecordKind::Rigidbodies => "rigidbodies",
            RecordKind::Containment => "containment",
            RecordKind::Framerate => "framerate",
            RecordKind::Overlap => "overlap",
        }
    }

    pub fn from_type_name(name: &str) -> Option<RecordKind> {
        RecordKind::ALL.into_iter().find(|k| k.type_name() == name)
    }
}

// ── Record payloads ───────────────────────────────────────────────────────────

/// Motion progress the backend reports for a replicant's current body motion.
///
/// This is the raw "action outcome signal"; actions map it onto their own
/// status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionStatus {
    /// No motion is running.
    #[default]
    Idle,
    Ongoing,
    Success,
    /// The target was outside the reachable envelope when the motion began.
    CannotReach,
    /// The motion finished but the effector ended outside the arrival tolerance.
    FailedToReach,
    /// The backend's own solver stopped the motion against an obstacle.
    Obstructed,
}

impl MotionStatus {
    /// `true` once the backend considers the motion finished, either way.
    pub fn is_finished(self) -> bool {
        !matches!(self, MotionStatus::Idle | MotionStatus::Ongoing)
    }
}

/// One object belonging to a replicant: the root or a body part.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicantObject {
    pub id:       ObjectId,
    pub position: Vec3,
    pub forward:  Vec3,
}

/// Per-replicant state carried alongside its objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicantState {
    pub id:         ReplicantId,
    #[serde(default)]
    pub held_left:  Option<ObjectId>,
    #[serde(default)]
    pub held_right: Option<ObjectId>,
    #[serde(default)]
    pub status:     MotionStatus,
}

/// Identity and body-part poses of every replicant in the scene.
///
/// `objects` is ordered `[replicant_0, parts of 0…, replicant_1, parts of 1…]`
/// where the part order follows [`rp_core::BodyPart::ALL`].
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplicantsRecord {
    pub objects:    Vec<ReplicantObject>,
    pub replicants: Vec<ReplicantState>,
}

impl ReplicantsRecord {
    /// Index of `id` in `objects`, if present.
    pub fn position_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn state(&self, id: ReplicantId) -> Option<&ReplicantState> {
        self.replicants.iter().find(|s| s.id == id)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformEntry {
    pub id:       ObjectId,
    pub position: Vec3,
    pub forward:  Vec3,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformsRecord {
    pub entries: Vec<TransformEntry>,
}

impl TransformsRecord {
    pub fn pose(&self, id: ObjectId) -> Option<Pose> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| Pose::new(e.position, e.forward))
    }
}

/// Phase of a contact between two bodies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionState {
    Enter,
    Stay,
    Exit,
}

/// Contact between two objects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionRecord {
    pub collider_id:    ObjectId,
    pub collidee_id:    ObjectId,
    pub state:          CollisionState,
    #[serde(default)]
    pub contact_points: Vec<Vec3>,
}

/// Contact between an object and static scene geometry (walls, floor).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCollisionRecord {
    pub object_id: ObjectId,
    pub state:     CollisionState,
    /// `true` if the contact is with the floor rather than a wall or fixture.
    #[serde(default)]
    pub floor:     bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEmptyObject {
    /// The object the empty is attached to.
    pub object_id:       ObjectId,
    /// The local id supplied when the empty was attached.
    pub empty_object_id: u32,
}

/// Identity of attached empty (anchor) objects.  Sent once.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct StaticEmptyObjectsRecord {
    pub entries: Vec<StaticEmptyObject>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmptyObjectEntry {
    pub object_id:       ObjectId,
    pub empty_object_id: u32,
    pub position:        Vec3,
}

/// Per-tick positions of attached empty objects.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct EmptyObjectsRecord {
    pub entries: Vec<EmptyObjectEntry>,
}

impl EmptyObjectsRecord {
    pub fn position(&self, object_id: ObjectId, empty_object_id: u32) -> Option<Vec3> {
        self.entries
            .iter()
            .find(|e| e.object_id == object_id && e.empty_object_id == empty_object_id)
            .map(|e| e.position)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidbodyEntry {
    pub id:               ObjectId,
    pub velocity:         Vec3,
    pub angular_velocity: Vec3,
    pub sleeping:         bool,
}

impl RigidbodyEntry {
    /// Threshold below which an awake body is treated as at rest.
    pub const REST_SPEED: f32 = 1e-3;

    pub fn is_moving(&self) -> bool {
        !self.sleeping
            && (self.velocity.length() > Self::REST_SPEED
                || self.angular_velocity.length() > Self::REST_SPEED)
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RigidbodiesRecord {
    pub entries: Vec<RigidbodyEntry>,
}

/// Objects currently inside a container object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainmentRecord {
    pub container_id: ObjectId,
    pub contained:    Vec<ObjectId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FramerateRecord {
    pub target_framerate:  u32,
    pub frame_dt:          f32,
    pub physics_time_step: f32,
}

/// Result of a `send_overlap_box` query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlapRecord {
    pub id:         u32,
    pub object_ids: Vec<ObjectId>,
    /// `true` if the box overlaps static scene geometry.
    #[serde(default)]
    pub env:        bool,
}

// ── Record ────────────────────────────────────────────────────────────────────

/// One decoded output record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum Record {
    Replicants(ReplicantsRecord),
    Transforms(TransformsRecord),
    Collision(CollisionRecord),
    EnvironmentCollision(EnvironmentCollisionRecord),
    StaticEmptyObjects(StaticEmptyObjectsRecord),
    EmptyObjects(EmptyObjectsRecord),
    Rigidbodies(RigidbodiesRecord),
    Containment(ContainmentRecord),
    Framerate(FramerateRecord),
    Overlap(OverlapRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Replicants(_) => RecordKind::Replicants,
            Record::Transforms(_) => RecordKind::Transforms,
            Record::Collision(_) => RecordKind::Collision,
            Record::EnvironmentCollision(_) => RecordKind::EnvironmentCollision,
            Record::StaticEmptyObjects(_) => RecordKind::StaticEmptyObjects,
            Record::EmptyObjects(_) => RecordKind::EmptyObjects,
            Record::Rigidbodies(_) => RecordKind::Rigidbodies,
            Record::Containment(_) => RecordKind::Containment,
            Record::Framerate(_) => RecordKind::Framerate,
            Record::Overlap(_) => RecordKind::Overlap,
        }
    }
}
