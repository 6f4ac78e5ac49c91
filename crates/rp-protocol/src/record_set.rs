//! `RecordSet`: one tick's decoded response, grouped by record kind.

use std::collections::BTreeMap;

use rp_core::{ObjectId, Pose};

use crate::record::{
    CollisionRecord, ContainmentRecord, EmptyObjectsRecord, EnvironmentCollisionRecord,
    FramerateRecord, OverlapRecord, Record, RecordKind, ReplicantsRecord, RigidbodiesRecord,
    RigidbodyEntry, StaticEmptyObjectsRecord, TransformsRecord,
};

/// All records received in one tick, keyed by [`RecordKind`].
///
/// Within a kind, records keep the order the backend sent them in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    by_kind: BTreeMap<RecordKind, Vec<Record>>,
}

/// Generate a typed iterator accessor per record kind.
macro_rules! typed_records {
    ($($(#[$attr:meta])* $fn_name:ident => $variant:ident($ty:ty);)*) => {
        impl RecordSet {
            $(
                $(#[$attr])*
                pub fn $fn_name(&self) -> impl Iterator<Item = &$ty> + '_ {
                    self.of_kind(RecordKind::$variant).iter().filter_map(|r| match r {
                        Record::$variant(inner) => Some(inner),
                        _ => None,
                    })
                }
            )*
        }
    };
}

typed_records! {
    replicants => Replicants(ReplicantsRecord);
    transforms => Transforms(TransformsRecord);
    collisions => Collision(CollisionRecord);
    environment_collisions => EnvironmentCollision(EnvironmentCollisionRecord);
    static_empty_objects => StaticEmptyObjects(StaticEmptyObjectsRecord);
    empty_objects => EmptyObjects(EmptyObjectsRecord);
    rigidbodies => Rigidbodies(RigidbodiesRecord);
    containment => Containment(ContainmentRecord);
    framerates => Framerate(FramerateRecord);
    overlaps => Overlap(OverlapRecord);
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.by_kind.entry(record.kind()).or_default().push(record);
    }

    /// Builder-style [`push`][Self::push].
    pub fn with(mut self, record: Record) -> Self {
        self.push(record);
        self
    }

    /// All records of one kind, in arrival order.
    pub fn of_kind(&self, kind: RecordKind) -> &[Record] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: RecordKind) -> bool {
        !self.of_kind(kind).is_empty()
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.by_kind.values().flatten()
    }

    // ── Cross-record lookups ──────────────────────────────────────────────

    /// World pose of any object, looked up in `Transforms` first and then in
    /// the replicant body-part lists.
    pub fn object_pose(&self, id: ObjectId) -> Option<Pose> {
        self.transforms()
            .find_map(|t| t.pose(id))
            .or_else(|| {
                self.replicants().find_map(|r| {
                    r.objects
                        .iter()
                        .find(|o| o.id == id)
                        .map(|o| Pose::new(o.position, o.forward))
                })
            })
    }

    pub fn rigidbody(&self, id: ObjectId) -> Option<&RigidbodyEntry> {
        self.rigidbodies()
            .flat_map(|r| r.entries.iter())
            .find(|e| e.id == id)
    }

    /// Objects directly contained by `container`, or empty.
    pub fn contained_by(&self, container: ObjectId) -> Vec<ObjectId> {
        self.containment()
            .filter(|c| c.container_id == container)
            .flat_map(|c| c.contained.iter().copied())
            .filter(|&id| id != container)
            .collect()
    }

    pub fn overlap(&self, query_id: u32) -> Option<&OverlapRecord> {
        self.overlaps().find(|o| o.id == query_id)
    }

    pub fn target_framerate(&self) -> Option<u32> {
        self.framerates().last().map(|f| f.target_framerate)
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for record in iter {
            set.push(record);
        }
        set
    }
}

impl Extend<Record> for RecordSet {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}
