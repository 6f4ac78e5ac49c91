//! Static and dynamic replicant snapshots.
//!
//! The static snapshot is identity data: which object id is which body
//! part, and which attached empty object anchors each hand.  It is built
//! once, from the first response that lists the replicant.
//!
//! The dynamic snapshot is rebuilt wholesale from every response and holds
//! nothing from earlier ticks.

use std::collections::BTreeMap;

use rp_core::{Arm, BodyPart, ObjectId, Pose, ReplicantId, Vec3};
use rp_protocol::{CollisionState, MotionStatus, RecordSet};

// ── StaticSnapshot ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct StaticSnapshot {
    pub replicant_id: ReplicantId,
    /// Object ids indexed by `BodyPart as usize`.
    parts:   [ObjectId; BodyPart::COUNT],
    /// Local empty-object id of each hand's anchor.
    anchors: BTreeMap<Arm, u32>,
}

impl StaticSnapshot {
    /// Build from a response, or `None` if the replicant's identity records
    /// are not there yet.
    pub fn from_records(id: ReplicantId, records: &RecordSet) -> Option<Self> {
        let root = id.as_object();
        let replicants = records.replicants().find(|r| r.position_of(root).is_some())?;
        let start = replicants.position_of(root)? + 1;
        let listed = replicants.objects.get(start..start + BodyPart::COUNT)?;

        let mut parts = [ObjectId::INVALID; BodyPart::COUNT];
        for (slot, object) in parts.iter_mut().zip(listed) {
            *slot = object.id;
        }

        let mut anchors: BTreeMap<Arm, u32> = BTreeMap::new();
        for entry in records.static_empty_objects().flat_map(|r| r.entries.iter()) {
            if entry.object_id != root {
                continue;
            }
            if let Some(arm) = Arm::ALL.into_iter().find(|a| a.anchor_index() == entry.empty_object_id) {
                anchors.insert(arm, entry.empty_object_id);
            }
        }
        // Anchors are attached at spawn; their ids are known even if the
        // backend has not echoed them back.
        for arm in Arm::ALL {
            anchors.entry(arm).or_insert(arm.anchor_index());
        }

        Some(Self { replicant_id: id, parts, anchors })
    }

    #[inline]
    pub fn body_part(&self, part: BodyPart) -> ObjectId {
        self.parts[part as usize]
    }

    #[inline]
    pub fn hand(&self, arm: Arm) -> ObjectId {
        self.body_part(arm.hand())
    }

    /// The local empty-object id anchoring `arm`'s relative targets.
    pub fn anchor(&self, arm: Arm) -> u32 {
        self.anchors.get(&arm).copied().unwrap_or(arm.anchor_index())
    }

    /// Which body part `object` is, if it is one of ours.
    pub fn part_of(&self, object: ObjectId) -> Option<BodyPart> {
        BodyPart::ALL.into_iter().find(|&p| self.body_part(p) == object)
    }

    /// `true` for the replicant root and all of its body parts.
    pub fn owns(&self, object: ObjectId) -> bool {
        object == self.replicant_id.as_object() || self.part_of(object).is_some()
    }

    pub fn body_parts(&self) -> impl Iterator<Item = (BodyPart, ObjectId)> + '_ {
        BodyPart::ALL.into_iter().map(|p| (p, self.body_part(p)))
    }
}

// ── DynamicSnapshot ───────────────────────────────────────────────────────────

/// What one of our bodies touched.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ContactTarget {
    Object(ObjectId),
    /// Static scene geometry.
    Environment { floor: bool },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    /// `None` for the replicant root collider.
    pub body_part: Option<BodyPart>,
    pub target:    ContactTarget,
    pub state:     CollisionState,
}

impl Contact {
    /// Exit events report a contact that already ended.
    pub fn is_active(&self) -> bool {
        matches!(self.state, CollisionState::Enter | CollisionState::Stay)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicSnapshot {
    pub pose:             Pose,
    pub body_parts:       BTreeMap<BodyPart, Pose>,
    pub held:             BTreeMap<Arm, ObjectId>,
    pub contacts:         Vec<Contact>,
    /// The backend's report on the current body motion.
    pub motion_status:    MotionStatus,
    /// World positions of the hand anchor objects.
    pub anchor_positions: BTreeMap<Arm, Vec3>,
}

impl DynamicSnapshot {
    pub fn from_records(static_data: &StaticSnapshot, records: &RecordSet) -> Self {
        let id = static_data.replicant_id;
        let root = id.as_object();
        let mut snap = DynamicSnapshot::default();

        for replicants in records.replicants() {
            for object in &replicants.objects {
                let pose = Pose::new(object.position, object.forward);
                if object.id == root {
                    snap.pose = pose;
                } else if let Some(part) = static_data.part_of(object.id) {
                    snap.body_parts.insert(part, pose);
                }
            }
            if let Some(state) = replicants.state(id) {
                if let Some(obj) = state.held_left {
                    snap.held.insert(Arm::Left, obj);
                }
                if let Some(obj) = state.held_right {
                    snap.held.insert(Arm::Right, obj);
                }
                snap.motion_status = state.status;
            }
        }

        for c in records.collisions() {
            let (ours, other) = match (static_data.owns(c.collider_id), static_data.owns(c.collidee_id)) {
                (true, false) => (c.collider_id, c.collidee_id),
                (false, true) => (c.collidee_id, c.collider_id),
                _ => continue,
            };
            snap.contacts.push(Contact {
                body_part: static_data.part_of(ours),
                target:    ContactTarget::Object(other),
                state:     c.state,
            });
        }
        for c in records.environment_collisions() {
            if static_data.owns(c.object_id) {
                snap.contacts.push(Contact {
                    body_part: static_data.part_of(c.object_id),
                    target:    ContactTarget::Environment { floor: c.floor },
                    state:     c.state,
                });
            }
        }

        for entry in records.empty_objects().flat_map(|r| r.entries.iter()) {
            if entry.object_id != root {
                continue;
            }
            for arm in Arm::ALL {
                if static_data.anchor(arm) == entry.empty_object_id {
                    snap.anchor_positions.insert(arm, entry.position);
                }
            }
        }

        snap
    }

    pub fn held(&self, arm: Arm) -> Option<ObjectId> {
        self.held.get(&arm).copied()
    }

    pub fn is_holding(&self, object: ObjectId) -> bool {
        self.held.values().any(|&h| h == object)
    }

    pub fn hand_position(&self, arm: Arm) -> Option<Vec3> {
        self.body_parts.get(&arm.hand()).map(|p| p.position)
    }

    pub fn active_contacts(&self) -> impl Iterator<Item = &Contact> + '_ {
        self.contacts.iter().filter(|c| c.is_active())
    }
}
