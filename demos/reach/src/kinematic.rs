//! In-process kinematic backend.
//!
//! Replicants are rigid stick figures.  Hands travel in straight lines and
//! stop at the end of the arm; props are spheres that only move while held.
//! That is enough to drive arm actions to every outcome the framework
//! distinguishes: success, unreachable, short of target, and collision.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use rp_core::{Arm, Axis, BodyPart, ObjectId, Pose, ReplicantId, Vec3};
use rp_protocol::{
    CollisionRecord, CollisionState, DropOffset, EmptyObjectEntry, EmptyObjectsRecord,
    FramerateRecord, Frequency, Instruction, MotionStatus, OverlapRecord, Record, RecordSet,
    ReplicantObject, ReplicantState, ReplicantsRecord, RigidbodiesRecord, RigidbodyEntry,
    StaticEmptyObject, StaticEmptyObjectsRecord, TransformEntry, TransformsRecord,
};
use rp_sim::{Backend, SessionResult};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Furthest a hand gets from its shoulder.
pub const ARM_LENGTH: f32 = 0.65;
pub const HAND_RADIUS: f32 = 0.02;

/// Body-part object ids are `PART_ID_BASE + 100 * replicant + part`.
pub const PART_ID_BASE: u32 = 1_000;

const PHYSICS_TIME_STEP: f32 = 0.02;
const DEFAULT_FRAMERATE: u32 = 60;

/// Gap left between a hand and the surface of the object it reaches for.
const SURFACE_GAP: f32 = 0.005;

pub fn part_id(replicant: ReplicantId, part: BodyPart) -> ObjectId {
    ObjectId(PART_ID_BASE + 100 * replicant.0 + part as u32)
}

/// Rotate `v` about the vertical axis.  Positive angles turn right.
pub fn yaw(v: Vec3, degrees: f32) -> Vec3 {
    let (s, c) = degrees.to_radians().sin_cos();
    Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
}

/// Rest position of every part, in the body frame (x right, y up, z forward).
fn rest_offset(part: BodyPart) -> Vec3 {
    match part {
        BodyPart::Pelvis => Vec3::new(0.0, 1.0, 0.0),
        BodyPart::Spine => Vec3::new(0.0, 1.2, 0.0),
        BodyPart::Neck => Vec3::new(0.0, 1.5, 0.0),
        BodyPart::Head => Vec3::new(0.0, 1.65, 0.0),
        BodyPart::UpperArmL => Vec3::new(-0.2, 1.45, 0.0),
        BodyPart::LowerArmL => Vec3::new(-0.25, 1.2, 0.0),
        BodyPart::HandL => Vec3::new(-0.25, 0.95, 0.0),
        BodyPart::UpperArmR => Vec3::new(0.2, 1.45, 0.0),
        BodyPart::LowerArmR => Vec3::new(0.25, 1.2, 0.0),
        BodyPart::HandR => Vec3::new(0.25, 0.95, 0.0),
        BodyPart::ThighL => Vec3::new(-0.1, 0.9, 0.0),
        BodyPart::CalfL => Vec3::new(-0.1, 0.5, 0.0),
        BodyPart::FootL => Vec3::new(-0.1, 0.05, 0.05),
        BodyPart::ThighR => Vec3::new(0.1, 0.9, 0.0),
        BodyPart::CalfR => Vec3::new(0.1, 0.5, 0.0),
        BodyPart::FootR => Vec3::new(0.1, 0.05, 0.05),
    }
}

fn shoulder(arm: Arm) -> BodyPart {
    match arm {
        Arm::Left => BodyPart::UpperArmL,
        Arm::Right => BodyPart::UpperArmR,
    }
}

fn elbow(arm: Arm) -> BodyPart {
    match arm {
        Arm::Left => BodyPart::LowerArmL,
        Arm::Right => BodyPart::LowerArmR,
    }
}

#[inline]
fn slot(arm: Arm) -> usize {
    arm as usize
}

/// Emit-now check for a standing output request.
fn due(frequency: &mut Frequency) -> bool {
    match *frequency {
        Frequency::Always => true,
        Frequency::Once => {
            *frequency = Frequency::Never;
            true
        }
        Frequency::Never => false,
    }
}

// ── Scene objects ─────────────────────────────────────────────────────────────

/// A spherical prop.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Prop {
    pub id:       ObjectId,
    pub position: Vec3,
    pub radius:   f32,
}

impl Prop {
    pub fn new(id: ObjectId, position: Vec3, radius: f32) -> Self {
        Self { id, position, radius }
    }

    fn touches(&self, hand: Vec3) -> bool {
        hand.distance(self.position) < self.radius + HAND_RADIUS
    }
}

// ── Bodies ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct HandMotion {
    start:      Vec3,
    goal:       Vec3,
    /// Where the motion was aimed, for the arrival check.  `None` for resets.
    target:     Option<Vec3>,
    arrived_at: f32,
    frames:     u32,
    elapsed:    u32,
}

#[derive(Debug)]
struct Body {
    id:       ReplicantId,
    pose:     Pose,
    hands:    [Vec3; 2],
    motions:  [Option<HandMotion>; 2],
    /// Frames left on a head motion.
    head:     u32,
    /// Local offsets of attached empty objects.
    anchors:  BTreeMap<u32, Vec3>,
    held:     [Option<ObjectId>; 2],
    status:   MotionStatus,
    /// How the motions started in the current batch will end.
    outcome:  Option<MotionStatus>,
}

impl Body {
    fn new(id: ReplicantId, position: Vec3, rotation: Vec3) -> Self {
        let pose = Pose::new(position, yaw(Vec3::FORWARD, rotation.y));
        let hands = Arm::ALL.map(|arm| pose.local_to_world(rest_offset(arm.hand())));
        Self {
            id,
            pose,
            hands,
            motions:  [None, None],
            head:     0,
            anchors:  BTreeMap::new(),
            held:     [None, None],
            status:   MotionStatus::Idle,
            outcome:  None,
        }
    }

    fn part_position(&self, part: BodyPart) -> Vec3 {
        match part {
            BodyPart::HandL => self.hands[slot(Arm::Left)],
            BodyPart::HandR => self.hands[slot(Arm::Right)],
            BodyPart::LowerArmL | BodyPart::LowerArmR => {
                let arm = if part == BodyPart::LowerArmL { Arm::Left } else { Arm::Right };
                let s = self.part_position(shoulder(arm));
                (s + self.hands[slot(arm)]) * 0.5
            }
            _ => self.pose.local_to_world(rest_offset(part)),
        }
    }

    fn anchor_position(&self, empty_object_id: u32) -> Vec3 {
        self.anchors
            .get(&empty_object_id)
            .map_or(self.pose.position, |&offset| self.pose.local_to_world(offset))
    }

    fn moving(&self) -> bool {
        self.head > 0 || self.motions.iter().any(Option::is_some)
    }

    /// A motion instruction arrived.  The first one in a batch starts a new
    /// outcome.
    fn begin(&mut self, fresh: &mut BTreeSet<ReplicantId>) {
        if fresh.insert(self.id) {
            self.outcome = Some(MotionStatus::Success);
        }
    }

    fn fail(&mut self, status: MotionStatus) {
        if self.outcome.is_none_or(|o| o == MotionStatus::Success) {
            self.outcome = Some(status);
        }
    }

    fn start_hand(&mut self, arm: Arm, goal: Vec3, target: Option<Vec3>, arrived_at: f32, frames: u32) {
        let start = self.hands[slot(arm)];
        let shoulder = self.part_position(shoulder(arm));
        let reach = goal - shoulder;
        let goal = if reach.length() > ARM_LENGTH {
            shoulder + reach.normalized() * ARM_LENGTH
        } else {
            goal
        };
        self.motions[slot(arm)] = Some(HandMotion {
            start,
            goal,
            target,
            arrived_at,
            frames: frames.max(1),
            elapsed: 0,
        });
    }

    fn turn(&mut self, angle: f32) {
        let origin = self.pose.position;
        self.pose.forward = yaw(self.pose.forward, angle);
        for hand in &mut self.hands {
            *hand = origin + yaw(*hand - origin, angle);
        }
        for motion in self.motions.iter_mut().flatten() {
            motion.goal = origin + yaw(motion.goal - origin, angle);
        }
    }

    /// Advance one physics frame.
    fn step(&mut self) {
        for arm in Arm::ALL {
            let i = slot(arm);
            let Some(m) = self.motions[i].as_mut() else { continue };
            m.elapsed += 1;
            let t = m.elapsed as f32 / m.frames as f32;
            self.hands[i] = m.start + (m.goal - m.start) * t.min(1.0);
            if m.elapsed < m.frames {
                continue;
            }
            let missed = m.target.is_some_and(|target| self.hands[i].distance(target) > m.arrived_at);
            self.motions[i] = None;
            if missed {
                self.fail(MotionStatus::FailedToReach);
            }
        }
        self.head = self.head.saturating_sub(1);

        self.status = if self.moving() {
            MotionStatus::Ongoing
        } else {
            self.outcome.unwrap_or(MotionStatus::Idle)
        };
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Requests {
    replicants:   Frequency,
    transforms:   Frequency,
    rigidbodies:  Frequency,
    empty:        Frequency,
    framerate:    Frequency,
    static_empty: bool,
    enter:        bool,
    stay:         bool,
    exit:         bool,
}

impl Default for Requests {
    fn default() -> Self {
        Self {
            replicants:   Frequency::Never,
            transforms:   Frequency::Never,
            rigidbodies:  Frequency::Never,
            empty:        Frequency::Never,
            framerate:    Frequency::Never,
            static_empty: false,
            enter:        false,
            stay:         false,
            exit:         false,
        }
    }
}

// ── KinematicBackend ──────────────────────────────────────────────────────────

/// A [`Backend`] that simulates replicants and props in-process.
///
/// Each exchange applies the batch in order and then advances one frame.
#[derive(Debug)]
pub struct KinematicBackend {
    bodies:    Vec<Body>,
    props:     Vec<Prop>,
    requests:  Requests,
    framerate: u32,
    frame:     u64,
    /// Hand/prop pairs in contact after the last frame.
    contacts:  BTreeSet<(ObjectId, ObjectId)>,
    overlaps:  Vec<OverlapRecord>,
}

impl KinematicBackend {
    pub fn new(props: Vec<Prop>) -> Self {
        Self {
            bodies:    Vec::new(),
            props,
            requests:  Requests::default(),
            framerate: DEFAULT_FRAMERATE,
            frame:     0,
            contacts:  BTreeSet::new(),
            overlaps:  Vec::new(),
        }
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[cfg(test)]
    pub fn hand_position(&self, replicant: ReplicantId, arm: Arm) -> Option<Vec3> {
        self.body(replicant).map(|b| b.hands[slot(arm)])
    }

    fn body(&self, id: ReplicantId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    fn body_index(&self, id: ReplicantId) -> Option<usize> {
        self.bodies.iter().position(|b| b.id == id)
    }

    fn prop_position(&self, id: ObjectId) -> Option<Vec3> {
        self.props.iter().find(|p| p.id == id).map(|p| p.position)
    }

    fn frames_for(&self, duration: f32) -> u32 {
        (duration.max(0.0) * self.framerate as f32).ceil() as u32
    }

    // ── Instructions ──────────────────────────────────────────────────────

    fn apply(&mut self, instruction: &Instruction, fresh: &mut BTreeSet<ReplicantId>) {
        match instruction {
            Instruction::AddReplicant { id, position, rotation, .. } => {
                if self.body_index(*id).is_none() {
                    debug!(replicant = id.0, position = %position, "spawned");
                    self.bodies.push(Body::new(*id, *position, *rotation));
                }
            }
            Instruction::AttachEmptyObject { id, empty_object_id, position } => {
                if let Some(i) = self.body_index(*id) {
                    self.bodies[i].anchors.insert(*empty_object_id, *position);
                }
            }
            Instruction::SetTargetFramerate { framerate } => self.framerate = (*framerate).max(1),

            Instruction::SendReplicants { frequency } => self.requests.replicants = *frequency,
            Instruction::SendTransforms { frequency } => self.requests.transforms = *frequency,
            Instruction::SendRigidbodies { frequency } => self.requests.rigidbodies = *frequency,
            Instruction::SendEmptyObjects { frequency } => self.requests.empty = *frequency,
            Instruction::SendFramerate { frequency } => self.requests.framerate = *frequency,
            Instruction::SendStaticEmptyObjects {} => self.requests.static_empty = true,
            Instruction::SendCollisions { enter, stay, exit } => {
                self.requests.enter = *enter;
                self.requests.stay = *stay;
                self.requests.exit = *exit;
            }
            Instruction::SendOverlapBox { id, half_extents, position } => {
                let inside = |p: Vec3| {
                    let d = p - *position;
                    d.x.abs() <= half_extents.x && d.y.abs() <= half_extents.y && d.z.abs() <= half_extents.z
                };
                let object_ids = self.props.iter().filter(|p| inside(p.position)).map(|p| p.id).collect();
                self.overlaps.push(OverlapRecord { id: *id, object_ids, env: false });
            }

            Instruction::RotateObjectBy { angle, id, axis: Axis::Yaw, .. } => {
                if let Some(body) = self.bodies.iter_mut().find(|b| b.id.as_object() == *id) {
                    body.turn(*angle);
                }
            }
            Instruction::ReplicantReachForPosition { id, position, duration, arm, max_distance, arrived_at } => {
                self.reach(*id, Some(*position), *duration, *arm, *max_distance, *arrived_at, 0.0, fresh);
            }
            Instruction::ReplicantReachForRelativePosition { id, position, duration, arm, max_distance, arrived_at } => {
                let target = self.body(*id).map(|b| {
                    let origin = b.anchor_position(arm.anchor_index());
                    Pose::new(origin, b.pose.forward).local_to_world(*position)
                });
                self.reach(*id, target, *duration, *arm, *max_distance, *arrived_at, 0.0, fresh);
            }
            Instruction::ReplicantReachForObject { id, object_id, duration, arm, max_distance, arrived_at } => {
                let prop = self.props.iter().find(|p| p.id == *object_id).copied();
                let stop = prop.map_or(0.0, |p| p.radius + HAND_RADIUS + SURFACE_GAP);
                self.reach(*id, prop.map(|p| p.position), *duration, *arm, *max_distance, *arrived_at, stop, fresh);
            }
            Instruction::ReplicantResetArm { id, duration, arm } => {
                let frames = self.frames_for(*duration);
                if let Some(i) = self.body_index(*id) {
                    let body = &mut self.bodies[i];
                    body.begin(fresh);
                    let rest = body.pose.local_to_world(rest_offset(arm.hand()));
                    body.start_hand(*arm, rest, None, 0.0, frames);
                }
            }
            Instruction::ReplicantLookAtObject { id, duration, .. }
            | Instruction::ReplicantLookAtPosition { id, duration, .. }
            | Instruction::ReplicantRotateHeadBy { id, duration, .. }
            | Instruction::ReplicantResetHead { id, duration } => {
                let frames = self.frames_for(*duration).max(1);
                if let Some(i) = self.body_index(*id) {
                    self.bodies[i].begin(fresh);
                    self.bodies[i].head = frames;
                }
            }

            Instruction::ReplicantGraspObject { id, object_id, arm, .. } => {
                if self.prop_position(*object_id).is_some() {
                    if let Some(i) = self.body_index(*id) {
                        self.bodies[i].held[slot(*arm)] = Some(*object_id);
                    }
                }
            }
            Instruction::ReplicantDropObject { id, arm, offset } => {
                let Some(i) = self.body_index(*id) else { return };
                let body = &mut self.bodies[i];
                let Some(object) = body.held[slot(*arm)].take() else { return };
                let release = match *offset {
                    DropOffset::Distance(d) => body.hands[slot(*arm)] + body.pose.forward * d,
                    DropOffset::Position(p) => p,
                };
                if let Some(prop) = self.props.iter_mut().find(|p| p.id == object) {
                    prop.position = Vec3::new(release.x, prop.radius, release.z);
                }
            }
            other => trace!(instruction = other.type_name(), "ignored"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn reach(
        &mut self,
        id:           ReplicantId,
        target:       Option<Vec3>,
        duration:     f32,
        arm:          Arm,
        max_distance: f32,
        arrived_at:   f32,
        stop_short:   f32,
        fresh:        &mut BTreeSet<ReplicantId>,
    ) {
        let frames = self.frames_for(duration);
        let Some(i) = self.body_index(id) else { return };
        let body = &mut self.bodies[i];
        body.begin(fresh);

        let Some(target) = target else {
            body.fail(MotionStatus::CannotReach);
            return;
        };
        let hand = body.hands[slot(arm)];
        if hand.distance(target) > max_distance {
            body.fail(MotionStatus::CannotReach);
            return;
        }
        let goal = if stop_short > 0.0 {
            target - (target - hand).normalized() * stop_short
        } else {
            target
        };
        body.start_hand(arm, goal, Some(target), arrived_at, frames);
    }

    // ── Frame ─────────────────────────────────────────────────────────────

    fn step(&mut self) {
        self.frame += 1;
        for body in &mut self.bodies {
            body.step();
        }
        for body in &self.bodies {
            for arm in Arm::ALL {
                if let Some(object) = body.held[slot(arm)] {
                    if let Some(prop) = self.props.iter_mut().find(|p| p.id == object) {
                        prop.position = body.hands[slot(arm)];
                    }
                }
            }
        }
    }

    fn collisions(&mut self, out: &mut RecordSet) {
        let mut now = BTreeSet::new();
        for body in &self.bodies {
            for arm in Arm::ALL {
                let hand = body.hands[slot(arm)];
                let hand_id = part_id(body.id, arm.hand());
                for prop in &self.props {
                    if body.held.contains(&Some(prop.id)) || !prop.touches(hand) {
                        continue;
                    }
                    now.insert((hand_id, prop.id));
                }
            }
        }

        let record = |(collider_id, collidee_id): (ObjectId, ObjectId), state| {
            Record::Collision(CollisionRecord { collider_id, collidee_id, state, contact_points: Vec::new() })
        };
        for &pair in &now {
            let state = if self.contacts.contains(&pair) { CollisionState::Stay } else { CollisionState::Enter };
            let wanted = match state {
                CollisionState::Enter => self.requests.enter,
                _ => self.requests.stay,
            };
            if wanted {
                out.push(record(pair, state));
            }
        }
        if self.requests.exit {
            for &pair in self.contacts.difference(&now) {
                out.push(record(pair, CollisionState::Exit));
            }
        }
        self.contacts = now;
    }

    fn records(&mut self) -> RecordSet {
        let mut out = RecordSet::new();

        if due(&mut self.requests.replicants) && !self.bodies.is_empty() {
            let mut objects = Vec::with_capacity(self.bodies.len() * (BodyPart::COUNT + 1));
            let mut replicants = Vec::with_capacity(self.bodies.len());
            for body in &self.bodies {
                objects.push(ReplicantObject {
                    id:       body.id.as_object(),
                    position: body.pose.position,
                    forward:  body.pose.forward,
                });
                objects.extend(BodyPart::ALL.into_iter().map(|part| ReplicantObject {
                    id:       part_id(body.id, part),
                    position: body.part_position(part),
                    forward:  body.pose.forward,
                }));
                replicants.push(ReplicantState {
                    id:         body.id,
                    held_left:  body.held[slot(Arm::Left)],
                    held_right: body.held[slot(Arm::Right)],
                    status:     body.status,
                });
            }
            out.push(Record::Replicants(ReplicantsRecord { objects, replicants }));
        }

        if due(&mut self.requests.transforms) {
            let entries = self
                .props
                .iter()
                .map(|p| TransformEntry { id: p.id, position: p.position, forward: Vec3::FORWARD })
                .collect();
            out.push(Record::Transforms(TransformsRecord { entries }));
        }

        if self.requests.enter || self.requests.stay || self.requests.exit {
            self.collisions(&mut out);
        }

        if std::mem::take(&mut self.requests.static_empty) {
            let entries = self
                .bodies
                .iter()
                .flat_map(|b| {
                    b.anchors.keys().map(|&empty_object_id| StaticEmptyObject {
                        object_id: b.id.as_object(),
                        empty_object_id,
                    })
                })
                .collect();
            out.push(Record::StaticEmptyObjects(StaticEmptyObjectsRecord { entries }));
        }

        if due(&mut self.requests.empty) {
            let entries = self
                .bodies
                .iter()
                .flat_map(|b| {
                    b.anchors.keys().map(|&empty_object_id| EmptyObjectEntry {
                        object_id: b.id.as_object(),
                        empty_object_id,
                        position: b.anchor_position(empty_object_id),
                    })
                })
                .collect();
            out.push(Record::EmptyObjects(EmptyObjectsRecord { entries }));
        }

        if due(&mut self.requests.rigidbodies) {
            let entries = self
                .props
                .iter()
                .map(|p| RigidbodyEntry {
                    id:               p.id,
                    velocity:         Vec3::ZERO,
                    angular_velocity: Vec3::ZERO,
                    sleeping:         true,
                })
                .collect();
            out.push(Record::Rigidbodies(RigidbodiesRecord { entries }));
        }

        if due(&mut self.requests.framerate) {
            out.push(Record::Framerate(FramerateRecord {
                target_framerate:  self.framerate,
                frame_dt:          1.0 / self.framerate as f32,
                physics_time_step: PHYSICS_TIME_STEP,
            }));
        }

        out.extend(self.overlaps.drain(..).map(Record::Overlap));
        out
    }
}

impl Backend for KinematicBackend {
    fn communicate(&mut self, batch: &[Instruction]) -> SessionResult<RecordSet> {
        let mut fresh = BTreeSet::new();
        for instruction in batch {
            self.apply(instruction, &mut fresh);
        }
        self.step();
        let records = self.records();
        trace!(frame = self.frame, instructions = batch.len(), records = records.len(), "exchanged");
        Ok(records)
    }
}
