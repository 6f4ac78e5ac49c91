//! Outgoing instructions.
//!
//! Every instruction is a self-describing record: on the wire it is a JSON
//! object whose `"$type"` field names the command and whose other fields are
//! its named parameters.
//!
//! ```json
//! {"$type": "rotate_object_by", "angle": 30.0, "id": 1, "axis": "yaw", "is_world": true, "use_centroid": false}
//! ```

use serde::{Deserialize, Serialize};

use rp_core::{Arm, Axis, ObjectId, ReplicantId, Vec3};

/// How often the backend should emit a requested output record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    #[default]
    Always,
    Never,
}

/// Where a dropped object is released relative to the hand.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropOffset {
    /// Distance along the held object's forward vector.
    Distance(f32),
    /// Absolute world-space release point.
    Position(Vec3),
}

impl Default for DropOffset {
    fn default() -> Self {
        DropOffset::Distance(0.1)
    }
}

/// One backend command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum Instruction {
    // ── Spawning and scene plumbing ───────────────────────────────────────
    AddReplicant {
        name:     String,
        url:      String,
        position: Vec3,
        rotation: Vec3,
        id:       ReplicantId,
    },
    AttachEmptyObject {
        id:              ReplicantId,
        empty_object_id: u32,
        position:        Vec3,
    },
    SetTargetFramerate {
        framerate: u32,
    },
    CreateAvatar {
        #[serde(rename = "type")]
        avatar_type: String,
        id:          String,
    },
    SetPassMasks {
        pass_masks: Vec<String>,
        avatar_id:  String,
    },
    ParentAvatarToReplicant {
        position:  Vec3,
        avatar_id: String,
        id:        ReplicantId,
    },
    EnableImageSensor {
        enable:    bool,
        avatar_id: String,
    },
    SetImgPassEncoding {
        value: bool,
    },

    // ── Output-data requests ──────────────────────────────────────────────
    SendReplicants {
        frequency: Frequency,
    },
    SendTransforms {
        frequency: Frequency,
    },
    SendCollisions {
        enter: bool,
        stay:  bool,
        exit:  bool,
    },
    SendRigidbodies {
        frequency: Frequency,
    },
    SendContainment {
        frequency: Frequency,
    },
    SendFramerate {
        frequency: Frequency,
    },
    SendStaticEmptyObjects {},
    SendEmptyObjects {
        frequency: Frequency,
    },
    /// Query objects overlapping a box in front of the replicant.  The reply
    /// is an `Overlap` record carrying the same `id`.
    SendOverlapBox {
        id:           u32,
        half_extents: Vec3,
        position:     Vec3,
    },

    // ── Body motion ───────────────────────────────────────────────────────
    RotateObjectBy {
        angle:        f32,
        id:           ObjectId,
        axis:         Axis,
        is_world:     bool,
        use_centroid: bool,
    },
    ReplicantReachForPosition {
        id:           ReplicantId,
        position:     Vec3,
        duration:     f32,
        arm:          Arm,
        max_distance: f32,
        arrived_at:   f32,
    },
    ReplicantReachForRelativePosition {
        id:           ReplicantId,
        position:     Vec3,
        duration:     f32,
        arm:          Arm,
        max_distance: f32,
        arrived_at:   f32,
    },
    ReplicantReachForObject {
        id:           ReplicantId,
        object_id:    ObjectId,
        duration:     f32,
        arm:          Arm,
        max_distance: f32,
        arrived_at:   f32,
    },
    ReplicantResetArm {
        id:       ReplicantId,
        duration: f32,
        arm:      Arm,
    },
    ReplicantLookAtObject {
        id:           ReplicantId,
        object_id:    ObjectId,
        duration:     f32,
        use_centroid: bool,
    },
    ReplicantLookAtPosition {
        id:       ReplicantId,
        position: Vec3,
        duration: f32,
    },
    ReplicantRotateHeadBy {
        id:       ReplicantId,
        axis:     Axis,
        angle:    f32,
        duration: f32,
    },
    ReplicantResetHead {
        id:       ReplicantId,
        duration: f32,
    },

    // ── Held objects ──────────────────────────────────────────────────────
    ReplicantGraspObject {
        id:               ReplicantId,
        object_id:        ObjectId,
        arm:              Arm,
        angle:            Option<f32>,
        axis:             Option<Axis>,
        relative_to_hand: bool,
        offset:           f32,
    },
    ReplicantDropObject {
        id:     ReplicantId,
        arm:    Arm,
        offset: DropOffset,
    },
    SetKinematicState {
        id:           ObjectId,
        is_kinematic: bool,
        use_gravity:  bool,
    },
    ParentObjectToObject {
        parent_id: ObjectId,
        id:        ObjectId,
    },
    UnparentObject {
        id: ObjectId,
    },

    // ── Scripted motion ───────────────────────────────────────────────────
    AddHumanoidAnimation {
        name: String,
        url:  String,
    },
    PlayReplicantAnimation {
        name:      String,
        id:        ReplicantId,
        framerate: u32,
        forward:   bool,
        #[serde(rename = "loop")]
        looping:   bool,
    },
    StopReplicantAnimation {
        id: ReplicantId,
    },
}

impl Instruction {
    /// The `"$type"` tag this instruction serializes under.
    pub fn type_name(&self) -> &'static str {
        match self {
            Instruction::AddReplicant { .. } => "add_replicant",
            Instruction::AttachEmptyObject { .. } => "attach_empty_object",
            Instruction::SetTargetFramerate { .. } => "set_target_framerate",
            Instruction::CreateAvatar { .. } => "create_avatar",
            Instruction::SetPassMasks { .. } => "set_pass_masks",
            Instruction::ParentAvatarToReplicant { .. } => "parent_avatar_to_replicant",
            Instruction::EnableImageSensor { .. } => "enable_image_sensor",
            Instruction::SetImgPassEncoding { .. } => "set_img_pass_encoding",
            Instruction::SendReplicants { .. } => "send_replicants",
            Instruction::SendTransforms { .. } => "send_transforms",
            Instruction::SendCollisions { .. } => "send_collisions",
            Instruction::SendRigidbodies { .. } => "send_rigidbodies",
            Instruction::SendContainment { .. } => "send_containment",
            Instruction::SendFramerate { .. } => "send_framerate",
            Instruction::SendStaticEmptyObjects { .. } => "send_static_empty_objects",
            Instruction::SendEmptyObjects { .. } => "send_empty_objects",
            Instruction::SendOverlapBox { .. } => "send_overlap_box",
            Instruction::RotateObjectBy { .. } => "rotate_object_by",
            Instruction::ReplicantReachForPosition { .. } => "replicant_reach_for_position",
            Instruction::ReplicantReachForRelativePosition { .. } => {
                "replicant_reach_for_relative_position"
            }
            Instruction::ReplicantReachForObject { .. } => "replicant_reach_for_object",
            Instruction::ReplicantResetArm { .. } => "replicant_reset_arm",
            Instruction::ReplicantLookAtObject { .. } => "replicant_look_at_object",
            Instruction::ReplicantLookAtPosition { .. } => "replicant_look_at_position",
            Instruction::ReplicantRotateHeadBy { .. } => "replicant_rotate_head_by",
            Instruction::ReplicantResetHead { .. } => "replicant_reset_head",
            Instruction::ReplicantGraspObject { .. } => "replicant_grasp_object",
            Instruction::ReplicantDropObject { .. } => "replicant_drop_object",
            Instruction::SetKinematicState { .. } => "set_kinematic_state",
            Instruction::ParentObjectToObject { .. } => "parent_object_to_object",
            Instruction::UnparentObject { .. } => "unparent_object",
            Instruction::AddHumanoidAnimation { .. } => "add_humanoid_animation",
            Instruction::PlayReplicantAnimation { .. } => "play_replicant_animation",
            Instruction::StopReplicantAnimation { .. } => "stop_replicant_animation",
        }
    }

    /// `true` for instructions that move a body part or the whole agent.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Instruction::RotateObjectBy { .. }
                | Instruction::ReplicantReachForPosition { .. }
                | Instruction::ReplicantReachForRelativePosition { .. }
                | Instruction::ReplicantReachForObject { .. }
                | Instruction::ReplicantResetArm { .. }
                | Instruction::ReplicantLookAtObject { .. }
                | Instruction::ReplicantLookAtPosition { .. }
                | Instruction::ReplicantRotateHeadBy { .. }
                | Instruction::ReplicantResetHead { .. }
                | Instruction::PlayReplicantAnimation { .. }
        )
    }
}

/// Serialize one tick's batch as a JSON array.
pub fn encode_batch(batch: &[Instruction]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(batch)
}
