//! Unit tests for rp-replicant.

// ── Shared fixtures ───────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::{Arc, Mutex};

    use rp_core::{Arm, BodyPart, CaptureMode, ObjectId, ReplicantId, Vec3};
    use rp_protocol::*;

    use crate::action::{Action, ActionState, ActionStatus, FailureReason, HookContext, MotionCategory};
    use crate::config::ReplicantConfig;
    use crate::controller::ReplicantController;
    use crate::library::ModelLibrary;

    pub const RID: ReplicantId = ReplicantId(0);

    pub fn part_id(part: BodyPart) -> ObjectId {
        ObjectId(1000 + part as u32)
    }

    pub fn library() -> Arc<ModelLibrary> {
        Arc::new(
            ModelLibrary::default()
                .with_replicant("replicant_0", "file:///models/replicant_0")
                .with_animation("wave", "file:///anims/wave", 60, 60),
        )
    }

    /// A hand-built response for one replicant plus whatever else a test needs.
    #[derive(Clone, Debug)]
    pub struct Scene {
        pub root:    Vec3,
        pub hands:   [Vec3; 2],
        pub status:  MotionStatus,
        pub held:    [Option<ObjectId>; 2],
        pub objects: Vec<(ObjectId, Vec3)>,
        pub extra:   Vec<Record>,
    }

    impl Scene {
        pub fn new() -> Self {
            Self {
                root:    Vec3::ZERO,
                hands:   [Vec3::new(-0.3, 1.0, 0.2), Vec3::new(0.3, 1.0, 0.2)],
                status:  MotionStatus::Idle,
                held:    [None, None],
                objects: Vec::new(),
                extra:   Vec::new(),
            }
        }

        pub fn hand(&mut self, arm: Arm, pos: Vec3) -> &mut Self {
            self.hands[arm.anchor_index() as usize] = pos;
            self
        }

        pub fn object(&mut self, id: u32, pos: Vec3) -> &mut Self {
            self.objects.push((ObjectId(id), pos));
            self
        }

        pub fn records(&self) -> RecordSet {
            let mut objects = vec![ReplicantObject {
                id:       RID.as_object(),
                position: self.root,
                forward:  Vec3::FORWARD,
            }];
            for part in BodyPart::ALL {
                let position = match part {
                    BodyPart::HandL => self.hands[0],
                    BodyPart::HandR => self.hands[1],
                    _ => self.root,
                };
                objects.push(ReplicantObject { id: part_id(part), position, forward: Vec3::FORWARD });
            }
            let mut set = RecordSet::new().with(Record::Replicants(ReplicantsRecord {
                objects,
                replicants: vec![ReplicantState {
                    id:         RID,
                    held_left:  self.held[0],
                    held_right: self.held[1],
                    status:     self.status,
                }],
            }));
            if !self.objects.is_empty() {
                set.push(Record::Transforms(TransformsRecord {
                    entries: self
                        .objects
                        .iter()
                        .map(|&(id, position)| TransformEntry { id, position, forward: Vec3::FORWARD })
                        .collect(),
                }));
            }
            set.extend(self.extra.iter().cloned());
            set
        }
    }

    pub fn wall_contact(part: BodyPart, state: CollisionState) -> Record {
        Record::EnvironmentCollision(EnvironmentCollisionRecord {
            object_id: part_id(part),
            state,
            floor: false,
        })
    }

    pub fn object_contact(part: BodyPart, other: u32, state: CollisionState) -> Record {
        Record::Collision(CollisionRecord {
            collider_id:    part_id(part),
            collidee_id:    ObjectId(other),
            state,
            contact_points: Vec::new(),
        })
    }

    pub fn rigidbody(id: u32, moving: bool) -> Record {
        Record::Rigidbodies(RigidbodiesRecord {
            entries: vec![RigidbodyEntry {
                id:               ObjectId(id),
                velocity:         if moving { Vec3::new(0.0, -1.0, 0.0) } else { Vec3::ZERO },
                angular_velocity: Vec3::ZERO,
                sleeping:         !moving,
            }],
        })
    }

    pub fn controller(capture: CaptureMode) -> ReplicantController {
        ReplicantController::new(ReplicantConfig::new(RID).with_capture(capture), library()).unwrap()
    }

    /// A controller whose replicant has spawned and been identified.
    pub fn spawned(capture: CaptureMode, scene: &Scene) -> ReplicantController {
        let mut c = controller(capture);
        c.initialization_instructions();
        c.advance(&scene.records());
        c
    }

    // ── Probe action ──────────────────────────────────────────────────────

    pub type Log = Arc<Mutex<Vec<String>>>;

    pub fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Hook codes carried by probe marker instructions.
    pub const INIT: u32 = 1;
    pub const PROCEED: u32 = 2;
    pub const TERMINATE: u32 = 3;

    pub fn marker(code: u32) -> Instruction {
        Instruction::UnparentObject { id: ObjectId(code) }
    }

    /// Records every hook call and ends when told to.
    #[derive(Debug)]
    pub struct Probe {
        label:        &'static str,
        state:        ActionState,
        log:          Log,
        category:     Option<MotionCategory>,
        on_init:      ActionStatus,
        finish_after: Option<(u32, ActionStatus)>,
        proceeds:     u32,
    }

    impl Probe {
        pub fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                state: ActionState::default(),
                log: Arc::clone(log),
                category: None,
                on_init: ActionStatus::Ongoing,
                finish_after: None,
                proceeds: 0,
            }
        }

        pub fn category(mut self, category: MotionCategory) -> Self {
            self.category = Some(category);
            self
        }

        pub fn fails_on_init(mut self, reason: FailureReason) -> Self {
            self.on_init = ActionStatus::Failure(reason);
            self
        }

        pub fn finishes_after(mut self, proceeds: u32, status: ActionStatus) -> Self {
            self.finish_after = Some((proceeds, status));
            self
        }

        pub fn boxed(self) -> Box<dyn Action> {
            Box::new(self)
        }

        fn note(&self, hook: &str) {
            self.log.lock().unwrap().push(format!("{}:{hook}", self.label));
        }
    }

    impl Action for Probe {
        fn name(&self) -> &'static str {
            self.label
        }

        fn motion_category(&self) -> Option<MotionCategory> {
            self.category
        }

        fn state(&self) -> &ActionState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ActionState {
            &mut self.state
        }

        fn initialize(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
            self.note("init");
            self.state.status = self.on_init;
            vec![marker(INIT)]
        }

        fn proceed(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
            self.note("proceed");
            self.proceeds += 1;
            if let Some((n, status)) = self.finish_after {
                if self.proceeds >= n {
                    self.state.status = status;
                }
            }
            vec![marker(PROCEED)]
        }

        fn terminate(&mut self, _ctx: &HookContext<'_>) -> Vec<Instruction> {
            self.note("terminate");
            vec![marker(TERMINATE)]
        }
    }
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot_tests {
    use rp_core::{Arm, BodyPart, ObjectId, Vec3};
    use rp_protocol::*;

    use super::fixtures::*;
    use crate::snapshot::{ContactTarget, DynamicSnapshot, StaticSnapshot};

    #[test]
    fn static_maps_parts_in_record_order() {
        let s = StaticSnapshot::from_records(RID, &Scene::new().records()).unwrap();
        assert_eq!(s.replicant_id, RID);
        assert_eq!(s.hand(Arm::Left), part_id(BodyPart::HandL));
        assert_eq!(s.body_part(BodyPart::FootR), part_id(BodyPart::FootR));
        assert_eq!(s.part_of(part_id(BodyPart::Head)), Some(BodyPart::Head));
        assert!(s.owns(RID.as_object()));
        assert!(!s.owns(ObjectId(5)));
        assert_eq!(s.body_parts().count(), BodyPart::COUNT);
    }

    #[test]
    fn static_absent_without_identity() {
        assert!(StaticSnapshot::from_records(RID, &RecordSet::new()).is_none());

        // Truncated part list.
        let mut set = Scene::new().records();
        let mut truncated = set.replicants().next().unwrap().clone();
        truncated.objects.truncate(5);
        set = RecordSet::new().with(Record::Replicants(truncated));
        assert!(StaticSnapshot::from_records(RID, &set).is_none());
    }

    #[test]
    fn anchors_come_from_static_empty_objects() {
        let mut scene = Scene::new();
        scene.extra.push(Record::StaticEmptyObjects(StaticEmptyObjectsRecord {
            entries: vec![
                StaticEmptyObject { object_id: RID.as_object(), empty_object_id: 1 },
                StaticEmptyObject { object_id: ObjectId(77), empty_object_id: 0 },
            ],
        }));
        let s = StaticSnapshot::from_records(RID, &scene.records()).unwrap();
        assert_eq!(s.anchor(Arm::Right), 1);
        assert_eq!(s.anchor(Arm::Left), 0);
    }

    #[test]
    fn dynamic_reads_pose_held_and_status() {
        let mut scene = Scene::new();
        scene.root = Vec3::new(1.0, 0.0, 2.0);
        scene.held = [None, Some(ObjectId(42))];
        scene.status = MotionStatus::Ongoing;
        let records = scene.records();
        let s = StaticSnapshot::from_records(RID, &records).unwrap();
        let d = DynamicSnapshot::from_records(&s, &records);

        assert_eq!(d.pose.position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(d.held(Arm::Right), Some(ObjectId(42)));
        assert_eq!(d.held(Arm::Left), None);
        assert!(d.is_holding(ObjectId(42)));
        assert_eq!(d.motion_status, MotionStatus::Ongoing);
        assert_eq!(d.hand_position(Arm::Right), Some(scene.hands[1]));
    }

    #[test]
    fn dynamic_classifies_contacts() {
        let mut scene = Scene::new();
        scene.extra = vec![
            wall_contact(BodyPart::HandR, CollisionState::Enter),
            object_contact(BodyPart::HandL, 9, CollisionState::Stay),
            // Collidee side is ours.
            Record::Collision(CollisionRecord {
                collider_id:    ObjectId(8),
                collidee_id:    RID.as_object(),
                state:          CollisionState::Exit,
                contact_points: Vec::new(),
            }),
            // Self-contact and unrelated contacts are dropped.
            object_contact(BodyPart::HandL, part_id(BodyPart::Spine).0, CollisionState::Enter),
            Record::Collision(CollisionRecord {
                collider_id:    ObjectId(8),
                collidee_id:    ObjectId(9),
                state:          CollisionState::Enter,
                contact_points: Vec::new(),
            }),
        ];
        let records = scene.records();
        let s = StaticSnapshot::from_records(RID, &records).unwrap();
        let d = DynamicSnapshot::from_records(&s, &records);

        assert_eq!(d.contacts.len(), 3);
        let wall = d.contacts.iter().find(|c| c.body_part == Some(BodyPart::HandR)).unwrap();
        assert_eq!(wall.target, ContactTarget::Environment { floor: false });
        let root = d.contacts.iter().find(|c| c.body_part.is_none()).unwrap();
        assert_eq!(root.target, ContactTarget::Object(ObjectId(8)));
        assert_eq!(d.active_contacts().count(), 2);
    }

    #[test]
    fn dynamic_anchor_positions() {
        let mut scene = Scene::new();
        scene.extra.push(Record::EmptyObjects(EmptyObjectsRecord {
            entries: vec![EmptyObjectEntry {
                object_id:       RID.as_object(),
                empty_object_id: 1,
                position:        Vec3::new(0.0, 1.0, 0.0),
            }],
        }));
        let records = scene.records();
        let s = StaticSnapshot::from_records(RID, &records).unwrap();
        let d = DynamicSnapshot::from_records(&s, &records);
        assert_eq!(d.anchor_positions.get(&Arm::Right), Some(&Vec3::new(0.0, 1.0, 0.0)));
        assert!(d.anchor_positions.get(&Arm::Left).is_none());
    }
}

// ── Collision policy ──────────────────────────────────────────────────────────

#[cfg(test)]
mod collision_tests {
    use rp_core::{BodyPart, ObjectId};
    use rp_protocol::*;

    use super::fixtures::*;
    use crate::action::{ActionRecord, ActionStatus, FailureReason, MotionCategory};
    use crate::collision::{CollisionDetection, aborts_on_start, evaluate};
    use crate::snapshot::{DynamicSnapshot, StaticSnapshot};

    fn judge(scene: &Scene, rules: &CollisionDetection, exempt: Option<ObjectId>) -> Option<FailureReason> {
        let records = scene.records();
        let s = StaticSnapshot::from_records(RID, &records).unwrap();
        let d = DynamicSnapshot::from_records(&s, &records);
        evaluate(&s, &d, rules, records.overlap(RID.0), exempt).map(|a| a.reason)
    }

    fn with(records: Vec<Record>) -> Scene {
        let mut scene = Scene::new();
        scene.extra = records;
        scene
    }

    #[test]
    fn wall_contact_respects_flag() {
        let scene = with(vec![wall_contact(BodyPart::HandR, CollisionState::Enter)]);
        assert_eq!(judge(&scene, &CollisionDetection::default(), None), Some(FailureReason::Collision));
        let rules = CollisionDetection { walls: false, ..CollisionDetection::default() };
        assert_eq!(judge(&scene, &rules, None), None);
    }

    #[test]
    fn floor_and_exit_contacts_never_count() {
        let floor = Record::EnvironmentCollision(EnvironmentCollisionRecord {
            object_id: part_id(BodyPart::FootL),
            state:     CollisionState::Stay,
            floor:     true,
        });
        let exit = wall_contact(BodyPart::HandR, CollisionState::Exit);
        assert_eq!(judge(&with(vec![floor, exit]), &CollisionDetection::default(), None), None);
    }

    #[test]
    fn object_contact_respects_flag_exclusions_and_held() {
        let scene = with(vec![object_contact(BodyPart::HandL, 9, CollisionState::Enter)]);
        let rules = CollisionDetection::default();
        assert_eq!(judge(&scene, &rules, None), Some(FailureReason::Collision));

        let off = CollisionDetection { objects: false, ..rules.clone() };
        assert_eq!(judge(&scene, &off, None), None);

        let excluded = CollisionDetection { exclude_objects: vec![ObjectId(9)], ..rules.clone() };
        assert_eq!(judge(&scene, &excluded, None), None);

        assert_eq!(judge(&scene, &rules, Some(ObjectId(9))), None);

        let mut holding = scene.clone();
        holding.held = [Some(ObjectId(9)), None];
        assert_eq!(judge(&holding, &rules, None), None);
    }

    #[test]
    fn overlap_only_matters_when_avoiding() {
        let overlap = Record::Overlap(OverlapRecord {
            id:         RID.0,
            object_ids: vec![ObjectId(31), part_id(BodyPart::HandR)],
            env:        false,
        });
        let scene = with(vec![overlap]);
        assert_eq!(judge(&scene, &CollisionDetection::default(), None), None);

        let avoid = CollisionDetection { avoid: true, ..CollisionDetection::default() };
        assert_eq!(judge(&scene, &avoid, None), Some(FailureReason::Obstacle));

        let own_body_only = with(vec![Record::Overlap(OverlapRecord {
            id:         RID.0,
            object_ids: vec![part_id(BodyPart::HandR)],
            env:        false,
        })]);
        assert_eq!(judge(&own_body_only, &avoid, None), None);
    }

    #[test]
    fn consecutive_rule_matches_category_and_reason() {
        let rules = CollisionDetection::default();
        let collided = ActionRecord {
            name:     "reach_for",
            category: Some(MotionCategory::Arm),
            status:   ActionStatus::Failure(FailureReason::Collision),
        };
        assert!(aborts_on_start(Some(MotionCategory::Arm), Some(&collided), &rules));
        assert!(!aborts_on_start(Some(MotionCategory::Animation), Some(&collided), &rules));
        assert!(!aborts_on_start(None, Some(&collided), &rules));
        assert!(!aborts_on_start(Some(MotionCategory::Arm), None, &rules));

        let timed_out = ActionRecord { status: ActionStatus::Failure(FailureReason::Timeout), ..collided.clone() };
        assert!(!aborts_on_start(Some(MotionCategory::Arm), Some(&timed_out), &rules));

        let off = CollisionDetection { previous_was_same: false, ..rules };
        assert!(!aborts_on_start(Some(MotionCategory::Arm), Some(&collided), &off));
    }

    #[test]
    fn none_disables_everything() {
        let scene = with(vec![
            wall_contact(BodyPart::HandR, CollisionState::Enter),
            object_contact(BodyPart::HandL, 9, CollisionState::Enter),
        ]);
        assert_eq!(judge(&scene, &CollisionDetection::none(), None), None);
    }
}

// ── Controller lifecycle ──────────────────────────────────────────────────────

#[cfg(test)]
mod controller_tests {
    use std::sync::Arc;

    use rp_core::{Arm, BodyPart, CaptureMode, ReplicantId, Vec3};
    use rp_protocol::*;

    use super::fixtures::*;
    use crate::action::{ActionStatus, FailureReason, MotionCategory};
    use crate::behavior::Behavior;
    use crate::config::ReplicantConfig;
    use crate::controller::ReplicantController;
    use crate::error::ReplicantError;
    use crate::library::ModelLibrary;

    fn markers(batch: &[Instruction]) -> Vec<u32> {
        batch
            .iter()
            .filter_map(|i| match i {
                Instruction::UnparentObject { id } => Some(id.0),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn unknown_model_and_zero_framerate_rejected() {
        let err = ReplicantController::new(
            ReplicantConfig::new(RID).with_model("robot"),
            library(),
        )
        .unwrap_err();
        assert!(matches!(err, ReplicantError::UnknownModel(m) if m == "robot"));

        let mut cfg = ReplicantConfig::new(RID);
        cfg.target_framerate = 0;
        assert!(matches!(ReplicantController::new(cfg, library()), Err(ReplicantError::Core(_))));
    }

    #[test]
    fn initialization_spawns_and_requests_data() {
        let mut c = controller(CaptureMode::Once);
        assert!(!c.is_spawned());
        let batch = c.initialization_instructions();
        assert!(c.is_spawned());

        let names: Vec<_> = batch.iter().map(Instruction::type_name).collect();
        assert_eq!(
            names,
            [
                "add_replicant",
                "set_target_framerate",
                "send_replicants",
                "send_transforms",
                "send_containment",
                "send_framerate",
                "attach_empty_object",
                "attach_empty_object",
                "send_static_empty_objects",
                "send_empty_objects",
            ]
        );
        assert!(matches!(
            &batch[0],
            Instruction::AddReplicant { url, id, .. } if url == "file:///models/replicant_0" && *id == RID
        ));
        assert!(matches!(batch[7], Instruction::AttachEmptyObject { empty_object_id: 1, .. }));
    }

    #[test]
    fn static_cached_once_then_do_nothing() {
        let mut c = controller(CaptureMode::Once);
        c.initialization_instructions();
        assert!(c.advance(&RecordSet::new()).is_empty());
        assert!(c.static_data().is_none());
        assert!(c.action().is_none());

        let batch = c.advance(&Scene::new().records());
        let names: Vec<_> = batch.iter().map(Instruction::type_name).collect();
        assert_eq!(
            names,
            ["create_avatar", "set_pass_masks", "parent_avatar_to_replicant", "enable_image_sensor", "set_img_pass_encoding"]
        );
        let cached = c.static_data().unwrap().clone();
        assert_eq!(c.action().unwrap().name(), "do_nothing");
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));

        // A later, different identity listing does not replace the cache.
        let mut moved = Scene::new();
        moved.root = Vec3::new(4.0, 0.0, 0.0);
        assert!(c.advance(&moved.records()).is_empty());
        assert_eq!(c.static_data().unwrap(), &cached);
        assert_eq!(c.dynamic().unwrap().pose.position, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn never_capture_skips_camera_setup() {
        let mut c = controller(CaptureMode::Never);
        c.initialization_instructions();
        assert!(c.advance(&Scene::new().records()).is_empty());
        assert!(c.static_data().is_some());
    }

    #[test]
    fn request_before_spawn_is_deferred() {
        let mut c = controller(CaptureMode::Never);
        c.request(Behavior::turn_by(45.0)).unwrap();
        c.initialization_instructions();
        assert!(c.advance(&RecordSet::new()).is_empty());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));

        let batch = c.advance(&Scene::new().records());
        assert_eq!(c.action().unwrap().name(), "turn_by");
        assert_eq!(batch.len(), 1);
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }

    #[test]
    fn init_runs_once_before_any_continuation() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).boxed());

        let batches: Vec<_> = (0..4).map(|_| c.advance(&scene.records())).collect();
        assert_eq!(entries(&log), ["a:init", "a:proceed", "a:proceed", "a:proceed"]);
        assert_eq!(markers(&batches[0]), [INIT]);
        assert_eq!(markers(&batches[1]), [PROCEED]);
    }

    #[test]
    fn termination_runs_once_on_the_terminal_tick() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).finishes_after(2, ActionStatus::Success).boxed());

        let batches: Vec<_> = (0..5).map(|_| c.advance(&scene.records())).collect();
        assert_eq!(entries(&log), ["a:init", "a:proceed", "a:proceed", "a:terminate"]);
        // The continuation output of the terminal tick is replaced.
        assert_eq!(markers(&batches[2]), [TERMINATE]);
        assert!(batches[3].is_empty() && batches[4].is_empty());
        assert!(c.is_done());
        assert_eq!(c.previous_action().unwrap().status, ActionStatus::Success);
    }

    #[test]
    fn failing_init_discards_its_instructions() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).fails_on_init(FailureReason::InvalidTarget).boxed());

        let batch = c.advance(&scene.records());
        assert_eq!(markers(&batch), [TERMINATE]);
        assert_eq!(entries(&log), ["a:init", "a:terminate"]);
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::InvalidTarget)));
    }

    #[test]
    fn supersession_skips_old_termination() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).boxed());
        c.advance(&scene.records());
        c.advance(&scene.records());

        c.request_action(Probe::new("b", &log).fails_on_init(FailureReason::PreconditionViolated).boxed());
        assert!(!c.is_done());
        c.advance(&scene.records());

        let log = entries(&log);
        assert!(!log.iter().any(|e| e == "a:terminate"));
        assert_eq!(log.last().unwrap(), "b:terminate");
        let prev = c.previous_action().unwrap();
        assert_eq!(prev.name, "b");
        assert_eq!(prev.status, ActionStatus::Failure(FailureReason::PreconditionViolated));
    }

    #[test]
    fn wall_contact_aborts_motion_without_continuation() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).category(MotionCategory::Arm).boxed());
        c.advance(&scene.records());

        scene.extra.push(wall_contact(BodyPart::HandR, CollisionState::Enter));
        let batch = c.advance(&scene.records());
        assert_eq!(markers(&batch), [TERMINATE]);
        assert_eq!(entries(&log), ["a:init", "a:terminate"]);
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
    }

    #[test]
    fn contacts_ignored_for_non_motion_actions() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).boxed());
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::HandR, CollisionState::Enter));
        c.advance(&scene.records());
        assert_eq!(entries(&log), ["a:init", "a:proceed"]);
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
    }

    #[test]
    fn consecutive_collision_ends_next_motion_immediately() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).category(MotionCategory::Arm).boxed());
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::HandR, CollisionState::Enter));
        c.advance(&scene.records());

        // No fresh contact.
        scene.extra.clear();
        c.request_action(Probe::new("b", &log).category(MotionCategory::Arm).boxed());
        let batch = c.advance(&scene.records());
        assert_eq!(markers(&batch), [TERMINATE]);
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
        assert!(!entries(&log).iter().any(|e| e == "b:init"));

        // A different category is not "the same" action.
        c.request_action(Probe::new("c", &log).category(MotionCategory::Animation).boxed());
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        assert!(entries(&log).iter().any(|e| e == "c:init"));
    }

    #[test]
    fn consecutive_rule_can_be_disabled() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).category(MotionCategory::Arm).boxed());
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::HandR, CollisionState::Enter));
        c.advance(&scene.records());

        scene.extra.clear();
        c.collision_detection_mut().previous_was_same = false;
        c.request_action(Probe::new("b", &log).category(MotionCategory::Arm).boxed());
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
    }

    #[test]
    fn take_finished_reports_each_ending_once() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::turn_by(10.0)).unwrap();
        c.advance(&scene.records());
        let rec = c.take_finished().unwrap();
        assert_eq!(rec.name, "turn_by");
        assert_eq!(rec.status, ActionStatus::Success);
        assert!(c.take_finished().is_none());
    }

    #[test]
    fn invalid_request_keeps_current_action() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::reset_arm(Arm::Left)).unwrap();
        let bad = Behavior::ResetArm { arms: Vec::new(), duration: 0.25, scale_duration: true };
        assert!(matches!(c.request(bad), Err(ReplicantError::InvalidRequest(_))));
        assert_eq!(c.action().unwrap().name(), "reset_arm");
    }

    #[test]
    fn reset_returns_to_pre_spawn_state() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::turn_by(10.0)).unwrap();
        c.advance(&scene.records());
        c.collision_detection_mut().walls = false;

        c.reset(Some(Vec3::new(1.0, 0.0, 1.0)), None);
        assert!(c.static_data().is_none());
        assert!(c.dynamic().is_none());
        assert!(c.action().is_none());
        assert!(c.previous_action().is_none());
        assert!(!c.is_spawned());
        assert!(c.collision_detection().walls);

        let batch = c.initialization_instructions();
        assert!(matches!(
            batch[0],
            Instruction::AddReplicant { position, .. } if position == Vec3::new(1.0, 0.0, 1.0)
        ));
    }

    #[test]
    fn other_replicants_records_do_not_identify_us() {
        let lib = Arc::new(ModelLibrary::default().with_replicant("replicant_0", "u"));
        let mut c = ReplicantController::new(ReplicantConfig::new(ReplicantId(7)), lib).unwrap();
        c.initialization_instructions();
        c.advance(&Scene::new().records());
        assert!(c.static_data().is_none());
    }

    #[test]
    fn framerate_record_updates_clock() {
        let mut scene = Scene::new();
        scene.extra.push(Record::Framerate(FramerateRecord {
            target_framerate:  30,
            frame_dt:          0.033,
            physics_time_step: 0.01,
        }));
        let c = spawned(CaptureMode::Never, &scene);
        assert_eq!(c.clock().target_framerate, 30);
    }
}

// ── Concrete actions ──────────────────────────────────────────────────────────

#[cfg(test)]
mod action_tests {
    use rp_core::{Arm, Axis, BodyPart, CaptureMode, ObjectId, Vec3};
    use rp_protocol::*;

    use super::fixtures::*;
    use crate::action::{ActionStatus, FailureReason};
    use crate::arm::ReachTarget;
    use crate::behavior::Behavior;
    use crate::head::LookTarget;

    fn reach(target: ReachTarget, arrived_at: f32, max_distance: f32) -> Behavior {
        Behavior::ReachFor {
            target,
            arms: vec![Arm::Right],
            arrived_at,
            max_distance,
            duration: 0.25,
            scale_duration: false,
        }
    }

    // ── TurnBy ────────────────────────────────────────────────────────────

    #[test]
    fn turn_by_is_one_batch_of_one() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::turn_by(30.0)).unwrap();

        let batch = c.advance(&scene.records());
        assert_eq!(batch.len(), 1);
        assert!(matches!(
            batch[0],
            Instruction::RotateObjectBy { angle, axis: Axis::Yaw, is_world: true, use_centroid: false, id }
                if angle == 30.0 && id == RID.as_object()
        ));
        assert_eq!(c.status(), Some(ActionStatus::Success));
        assert!(c.is_done());
        assert!(c.advance(&scene.records()).is_empty());
    }

    // ── ReachFor ──────────────────────────────────────────────────────────

    #[test]
    fn reach_succeeds_within_arrival_tolerance() {
        let mut scene = Scene::new();
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.3)).object(50, Vec3::new(0.3, 1.0, 0.8));
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(reach(ReachTarget::Object(ObjectId(50)), 0.1, 1.5)).unwrap();

        let batch = c.advance(&scene.records());
        assert!(matches!(
            batch.as_slice(),
            [Instruction::ReplicantReachForObject { object_id, arm: Arm::Right, arrived_at, .. }]
                if *object_id == ObjectId(50) && *arrived_at == 0.1
        ));

        scene.status = MotionStatus::Ongoing;
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.5));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));

        scene.status = MotionStatus::Success;
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.72));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }

    #[test]
    fn reach_out_of_range_fails_on_init_without_motion() {
        let mut scene = Scene::new();
        scene.hand(Arm::Right, Vec3::new(0.0, 1.0, 0.0)).object(50, Vec3::new(0.0, 1.0, 5.0));
        let mut c = spawned(CaptureMode::Once, &scene);
        c.request(reach(ReachTarget::Object(ObjectId(50)), 0.1, 1.0)).unwrap();

        let batch = c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::TargetUnreachable)));
        assert!(!batch.iter().any(Instruction::is_motion));
        // Only the end-of-action capture goes out.
        assert!(matches!(batch.as_slice(), [Instruction::EnableImageSensor { enable: true, .. }]));
    }

    #[test]
    fn reach_for_unknown_object_is_invalid_target() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(reach(ReachTarget::Object(ObjectId(404)), 0.1, 1.5)).unwrap();
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::InvalidTarget)));
    }

    #[test]
    fn reach_stopping_short_fails_to_reach() {
        let mut scene = Scene::new();
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.3));
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(reach(ReachTarget::Position(Vec3::new(0.3, 1.0, 0.9)), 0.1, 1.5)).unwrap();
        c.advance(&scene.records());

        scene.status = MotionStatus::Success;
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::FailedToReach)));
    }

    #[test]
    fn reach_maps_backend_failures() {
        for (reported, expected) in [
            (MotionStatus::CannotReach, FailureReason::TargetUnreachable),
            (MotionStatus::FailedToReach, FailureReason::FailedToReach),
            (MotionStatus::Obstructed, FailureReason::Collision),
        ] {
            let mut scene = Scene::new();
            let mut c = spawned(CaptureMode::Never, &scene);
            c.request(reach(ReachTarget::Position(Vec3::new(0.3, 1.0, 0.5)), 0.1, 1.5)).unwrap();
            c.advance(&scene.records());
            scene.status = reported;
            c.advance(&scene.records());
            assert_eq!(c.status(), Some(ActionStatus::Failure(expected)), "{reported:?}");
        }
    }

    #[test]
    fn reach_times_out_when_motion_never_finishes() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(reach(ReachTarget::Position(Vec3::new(0.3, 1.0, 0.5)), 0.1, 1.5)).unwrap();
        c.advance(&scene.records());
        scene.status = MotionStatus::Ongoing;
        let mut ticks = 0;
        while c.status() == Some(ActionStatus::Ongoing) && ticks < 1_000 {
            c.advance(&scene.records());
            ticks += 1;
        }
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Timeout)));
        assert!(ticks < 1_000);
    }

    #[test]
    fn reach_target_contact_is_not_a_collision() {
        let mut scene = Scene::new();
        scene.object(50, Vec3::new(0.3, 1.0, 0.5));
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(reach(ReachTarget::Object(ObjectId(50)), 0.1, 1.5)).unwrap();
        c.advance(&scene.records());

        scene.status = MotionStatus::Ongoing;
        scene.extra.push(object_contact(BodyPart::HandR, 50, CollisionState::Enter));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));

        scene.extra.push(object_contact(BodyPart::HandR, 51, CollisionState::Enter));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
    }

    #[test]
    fn relative_reach_resolves_through_anchor() {
        let mut scene = Scene::new();
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.2));
        scene.extra.push(Record::EmptyObjects(EmptyObjectsRecord {
            entries: vec![EmptyObjectEntry {
                object_id:       RID.as_object(),
                empty_object_id: Arm::Right.anchor_index(),
                position:        Vec3::new(0.3, 1.0, 0.0),
            }],
        }));
        let mut c = spawned(CaptureMode::Never, &scene);
        // 0.5 ahead of the anchor; the hand is 0.3 short of that.
        c.request(reach(ReachTarget::Relative(Vec3::new(0.0, 0.0, 0.5)), 0.1, 1.5)).unwrap();
        let batch = c.advance(&scene.records());
        assert!(matches!(batch[0], Instruction::ReplicantReachForRelativePosition { .. }));

        scene.status = MotionStatus::Success;
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.45));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }

    #[test]
    fn avoidance_queries_overlap_and_stops_on_obstacle() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.collision_detection_mut().avoid = true;
        c.request(reach(ReachTarget::Position(Vec3::new(0.3, 1.0, 0.5)), 0.1, 1.5)).unwrap();
        let batch = c.advance(&scene.records());
        assert!(matches!(batch.last(), Some(Instruction::SendOverlapBox { id, .. }) if *id == RID.0));

        scene.status = MotionStatus::Ongoing;
        scene.extra.push(Record::Overlap(OverlapRecord {
            id:         RID.0,
            object_ids: vec![ObjectId(88)],
            env:        false,
        }));
        let batch = c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Obstacle)));
        assert!(batch.is_empty());
    }

    // ── ResetArm ──────────────────────────────────────────────────────────

    #[test]
    fn reset_arm_emits_per_arm_and_follows_backend() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::ResetArm { arms: vec![Arm::Left, Arm::Right], duration: 0.5, scale_duration: false })
            .unwrap();
        let batch = c.advance(&scene.records());
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch[1], Instruction::ReplicantResetArm { arm: Arm::Right, duration, .. } if duration == 0.5));

        scene.status = MotionStatus::Success;
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }

    // ── Grasp ─────────────────────────────────────────────────────────────

    #[test]
    fn grasp_with_occupied_hand_violates_precondition() {
        let mut scene = Scene::new();
        scene.object(20, Vec3::new(0.3, 1.0, 0.5));
        scene.held = [None, Some(ObjectId(21))];
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::grasp(ObjectId(20), Arm::Right)).unwrap();
        let batch = c.advance(&scene.records());
        assert!(batch.is_empty());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::PreconditionViolated)));
    }

    #[test]
    fn grasp_makes_object_and_contents_kinematic() {
        let mut scene = Scene::new();
        scene.object(20, Vec3::new(0.3, 1.0, 0.5));
        scene.extra.push(Record::Containment(ContainmentRecord {
            container_id: ObjectId(20),
            contained:    vec![ObjectId(22)],
        }));
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::grasp(ObjectId(20), Arm::Left)).unwrap();

        let batch = c.advance(&scene.records());
        assert!(matches!(
            batch.as_slice(),
            [Instruction::ReplicantGraspObject { object_id, arm: Arm::Left, angle: Some(a), axis: Some(Axis::Pitch), .. }]
                if *object_id == ObjectId(20) && *a == 90.0
        ));

        let batch = c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
        assert_eq!(
            batch,
            [
                Instruction::SetKinematicState { id: ObjectId(20), is_kinematic: true, use_gravity: false },
                Instruction::ParentObjectToObject { parent_id: ObjectId(20), id: ObjectId(22) },
                Instruction::SetKinematicState { id: ObjectId(22), is_kinematic: true, use_gravity: false },
            ]
        );
    }

    #[test]
    fn grasp_own_body_is_invalid() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::grasp(part_id(BodyPart::Head), Arm::Left)).unwrap();
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::InvalidTarget)));
    }

    // ── Drop ──────────────────────────────────────────────────────────────

    #[test]
    fn drop_times_out_exactly_at_frame_budget() {
        let mut scene = Scene::new();
        scene.held = [None, Some(ObjectId(60))];
        scene.extra.push(rigidbody(60, true));
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::Drop { arm: Arm::Right, max_num_frames: 100, offset: DropOffset::Distance(0.1) })
            .unwrap();

        // Tick 0: release.
        let batch = c.advance(&scene.records());
        assert!(matches!(batch[0], Instruction::ReplicantDropObject { arm: Arm::Right, .. }));
        assert!(matches!(
            batch[1],
            Instruction::SetKinematicState { id, is_kinematic: false, use_gravity: true } if id == ObjectId(60)
        ));
        scene.held = [None, None];

        for tick in 1..100 {
            c.advance(&scene.records());
            assert_eq!(c.status(), Some(ActionStatus::Ongoing), "tick {tick}");
        }
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Timeout)));
    }

    #[test]
    fn drop_succeeds_once_object_rests() {
        let mut scene = Scene::new();
        scene.held = [Some(ObjectId(60)), None];
        scene.extra = vec![
            rigidbody(60, true),
            Record::Containment(ContainmentRecord { container_id: ObjectId(60), contained: vec![ObjectId(61)] }),
        ];
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::drop(Arm::Left)).unwrap();
        let batch = c.advance(&scene.records());
        assert!(batch.contains(&Instruction::UnparentObject { id: ObjectId(61) }));

        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        scene.extra = vec![rigidbody(60, false)];
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }

    #[test]
    fn drop_with_empty_hand_violates_precondition() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::drop(Arm::Left)).unwrap();
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::PreconditionViolated)));
    }

    // ── Head motion ───────────────────────────────────────────────────────

    #[test]
    fn rotate_head_scales_duration_by_framerate() {
        let mut scene = Scene::new();
        scene.extra.push(Record::Framerate(FramerateRecord {
            target_framerate:  120,
            frame_dt:          1.0 / 120.0,
            physics_time_step: 0.01,
        }));
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::rotate_head(Axis::Yaw, 20.0)).unwrap();
        let batch = c.advance(&scene.records());
        match batch.as_slice() {
            [Instruction::ReplicantRotateHeadBy { duration, angle, .. }] => {
                assert!((duration - 0.2).abs() < 1e-6);
                assert_eq!(*angle, 20.0);
            }
            other => panic!("unexpected batch {other:?}"),
        }

        scene.status = MotionStatus::Ongoing;
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        scene.status = MotionStatus::Success;
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }

    #[test]
    fn look_at_missing_object_is_invalid_target() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::look_at(LookTarget::Object(ObjectId(99)))).unwrap();
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::InvalidTarget)));
    }

    #[test]
    fn reset_head_names_itself() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::reset_head()).unwrap();
        let batch = c.advance(&scene.records());
        assert_eq!(c.action().unwrap().name(), "reset_head");
        assert!(matches!(batch[0], Instruction::ReplicantResetHead { .. }));
    }

    #[test]
    fn head_motion_failure_statuses_are_not_success() {
        let cases = [
            (MotionStatus::Obstructed, FailureReason::Collision),
            (MotionStatus::CannotReach, FailureReason::TargetUnreachable),
            (MotionStatus::FailedToReach, FailureReason::FailedToReach),
        ];
        for (status, reason) in cases {
            let mut scene = Scene::new();
            let mut c = spawned(CaptureMode::Never, &scene);
            c.request(Behavior::rotate_head(Axis::Pitch, 15.0)).unwrap();
            c.advance(&scene.records());
            scene.status = status;
            c.advance(&scene.records());
            assert_eq!(c.status(), Some(ActionStatus::Failure(reason)), "{status:?}");
        }
    }

    // ── Animate ───────────────────────────────────────────────────────────

    #[test]
    fn unknown_animation_fails_first_tick() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::animate("moonwalk")).unwrap();
        let batch = c.advance(&scene.records());
        assert!(batch.is_empty());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::InvalidTarget)));
    }

    #[test]
    fn animation_plays_until_backend_reports_done() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::animate("wave")).unwrap();
        let batch = c.advance(&scene.records());
        let names: Vec<_> = batch.iter().map(Instruction::type_name).collect();
        assert_eq!(names, ["add_humanoid_animation", "play_replicant_animation"]);

        scene.status = MotionStatus::Ongoing;
        c.advance(&scene.records());
        scene.status = MotionStatus::Success;
        let batch = c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
        assert!(batch.is_empty());
    }

    #[test]
    fn animation_collision_stops_playback() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::animate("wave")).unwrap();
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::FootL, CollisionState::Enter));
        let batch = c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
        assert_eq!(batch, [Instruction::StopReplicantAnimation { id: RID }]);
    }

    // ── Capture ───────────────────────────────────────────────────────────

    #[test]
    fn capture_modes_bracket_actions() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Always, &scene);
        c.request(Behavior::reset_arm(Arm::Left)).unwrap();
        let batch = c.advance(&scene.records());
        assert!(matches!(batch[0], Instruction::EnableImageSensor { enable: true, .. }));
        scene.status = MotionStatus::Success;
        let batch = c.advance(&scene.records());
        assert!(batch.is_empty());

        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Once, &scene);
        c.request(Behavior::reset_arm(Arm::Left)).unwrap();
        let batch = c.advance(&scene.records());
        assert!(matches!(batch[0], Instruction::EnableImageSensor { enable: false, .. }));
        scene.status = MotionStatus::Success;
        let batch = c.advance(&scene.records());
        assert!(matches!(batch.as_slice(), [Instruction::EnableImageSensor { enable: true, .. }]));
    }
}

// ── Sequences ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod sequence_tests {
    use rp_core::{Arm, BodyPart, CaptureMode, Vec3};
    use rp_protocol::*;

    use super::fixtures::*;
    use crate::action::{ActionStatus, FailureReason, MotionCategory};
    use crate::behavior::Behavior;
    use crate::sequence::Sequence;

    #[test]
    fn both_children_succeed_in_order() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Box::new(Sequence::new(vec![
            Probe::new("a", &log).finishes_after(1, ActionStatus::Success).boxed(),
            Probe::new("b", &log).finishes_after(1, ActionStatus::Success).boxed(),
        ])));

        c.advance(&scene.records()); // a:init
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        let batch = c.advance(&scene.records()); // a:proceed → a:terminate
        assert_eq!(batch, [marker(TERMINATE)]);
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        c.advance(&scene.records()); // b:init
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        let batch = c.advance(&scene.records()); // b:proceed → b:terminate
        assert_eq!(batch, [marker(TERMINATE)]);
        assert_eq!(c.status(), Some(ActionStatus::Success));

        assert_eq!(
            entries(&log),
            ["a:init", "a:proceed", "a:terminate", "b:init", "b:proceed", "b:terminate"]
        );
        assert_eq!(c.previous_action().unwrap().name, "sequence");
    }

    #[test]
    fn first_failure_ends_sequence_and_skips_rest() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Box::new(Sequence::new(vec![
            Probe::new("a", &log).finishes_after(1, ActionStatus::Failure(FailureReason::Timeout)).boxed(),
            Probe::new("b", &log).boxed(),
        ])));

        c.advance(&scene.records());
        c.advance(&scene.records());
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Timeout)));
        assert!(entries(&log).iter().all(|e| !e.starts_with("b:")));
    }

    #[test]
    fn child_failing_at_init_fails_sequence_same_tick() {
        let scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Box::new(Sequence::new(vec![
            Probe::new("a", &log).fails_on_init(FailureReason::InvalidTarget).boxed(),
            Probe::new("b", &log).boxed(),
        ])));
        let batch = c.advance(&scene.records());
        assert_eq!(batch, [marker(TERMINATE)]);
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::InvalidTarget)));
        assert_eq!(entries(&log), ["a:init", "a:terminate"]);
    }

    #[test]
    fn collision_abort_reaches_running_child() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Box::new(Sequence::new(vec![
            Probe::new("a", &log).category(MotionCategory::Arm).boxed(),
            Probe::new("b", &log).boxed(),
        ])));
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::HandL, CollisionState::Enter));
        let batch = c.advance(&scene.records());
        assert_eq!(batch, [marker(TERMINATE)]);
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
        assert_eq!(entries(&log), ["a:init", "a:terminate"]);
    }

    #[test]
    fn next_child_initializes_before_collision_check() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Box::new(Sequence::new(vec![
            Probe::new("a", &log).category(MotionCategory::Arm).finishes_after(1, ActionStatus::Success).boxed(),
            Probe::new("b", &log).category(MotionCategory::Arm).boxed(),
        ])));
        c.advance(&scene.records()); // a:init
        c.advance(&scene.records()); // a:proceed → a:terminate

        scene.extra.push(wall_contact(BodyPart::HandL, CollisionState::Stay));
        let batch = c.advance(&scene.records());
        assert_eq!(batch, [marker(INIT)]);
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));

        let batch = c.advance(&scene.records());
        assert_eq!(batch, [marker(TERMINATE)]);
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
        assert_eq!(
            entries(&log),
            ["a:init", "a:proceed", "a:terminate", "b:init", "b:terminate"]
        );
        assert_eq!(c.previous_action().unwrap().category, Some(MotionCategory::Arm));
    }

    #[test]
    fn child_after_collision_of_same_category_aborts_on_start() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        let log = new_log();
        c.request_action(Probe::new("a", &log).category(MotionCategory::Arm).boxed());
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::HandR, CollisionState::Enter));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
        scene.extra.clear();

        c.request(Behavior::Sequence(vec![
            Behavior::turn_by(10.0),
            Behavior::reach_for(crate::arm::ReachTarget::Position(Vec3::new(0.3, 1.0, 0.5)), Arm::Right),
        ]))
        .unwrap();
        let batch = c.advance(&scene.records());
        assert!(matches!(batch.as_slice(), [Instruction::RotateObjectBy { .. }]));
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));

        let batch = c.advance(&scene.records());
        assert!(batch.iter().all(|i| !matches!(i, Instruction::ReplicantReachForPosition { .. })));
        assert_eq!(c.status(), Some(ActionStatus::Failure(FailureReason::Collision)));
        assert_eq!(c.previous_action().unwrap().category, Some(MotionCategory::Arm));
    }

    #[test]
    fn consecutive_rule_off_lets_child_start() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.collision_detection_mut().previous_was_same = false;
        let log = new_log();
        c.request_action(Probe::new("a", &log).category(MotionCategory::Arm).boxed());
        c.advance(&scene.records());
        scene.extra.push(wall_contact(BodyPart::HandR, CollisionState::Enter));
        c.advance(&scene.records());
        scene.extra.clear();

        c.request_action(Box::new(Sequence::new(vec![
            Probe::new("b", &log).finishes_after(1, ActionStatus::Success).boxed(),
            Probe::new("c", &log).category(MotionCategory::Arm).boxed(),
        ])));
        c.advance(&scene.records()); // b:init
        c.advance(&scene.records()); // b:proceed → b:terminate
        let batch = c.advance(&scene.records());
        assert_eq!(batch, [marker(INIT)]);
        assert_eq!(c.status(), Some(ActionStatus::Ongoing));
        assert_eq!(
            entries(&log),
            ["a:init", "a:terminate", "b:init", "b:proceed", "b:terminate", "c:init"]
        );
    }

    #[test]
    fn behavior_sequence_turns_then_reaches() {
        let mut scene = Scene::new();
        let mut c = spawned(CaptureMode::Never, &scene);
        c.request(Behavior::Sequence(vec![
            Behavior::turn_by(90.0),
            Behavior::reach_for(crate::arm::ReachTarget::Position(Vec3::new(0.3, 1.0, 0.5)), Arm::Right),
        ]))
        .unwrap();

        let batch = c.advance(&scene.records());
        assert!(matches!(batch.as_slice(), [Instruction::RotateObjectBy { .. }]));
        let batch = c.advance(&scene.records());
        assert!(matches!(batch.as_slice(), [Instruction::ReplicantReachForPosition { .. }]));
        scene.status = MotionStatus::Success;
        scene.hand(Arm::Right, Vec3::new(0.3, 1.0, 0.48));
        c.advance(&scene.records());
        assert_eq!(c.status(), Some(ActionStatus::Success));
    }
}

// ── Behavior validation ───────────────────────────────────────────────────────

#[cfg(test)]
mod behavior_tests {
    use rp_core::{Arm, Axis, ObjectId, Vec3};
    use rp_protocol::DropOffset;

    use crate::arm::ReachTarget;
    use crate::behavior::Behavior;
    use crate::error::ReplicantError;
    use crate::head::LookTarget;
    use crate::library::ModelLibrary;

    fn rejected(b: Behavior) -> bool {
        matches!(b.validate(), Err(ReplicantError::InvalidRequest(_)))
    }

    #[test]
    fn defaults_validate() {
        let ok = [
            Behavior::DoNothing,
            Behavior::turn_by(-45.0),
            Behavior::reach_for(ReachTarget::Object(ObjectId(3)), Arm::Left),
            Behavior::reset_arm(Arm::Right),
            Behavior::grasp(ObjectId(3), Arm::Left),
            Behavior::drop(Arm::Left),
            Behavior::look_at(LookTarget::Position(Vec3::ZERO)),
            Behavior::rotate_head(Axis::Pitch, 15.0),
            Behavior::reset_head(),
            Behavior::animate("wave"),
            Behavior::Sequence(vec![Behavior::turn_by(10.0)]),
        ];
        for b in ok {
            assert!(b.validate().is_ok(), "{b:?}");
        }
    }

    #[test]
    fn structural_errors_are_rejected() {
        assert!(rejected(Behavior::turn_by(f32::NAN)));
        assert!(rejected(Behavior::reach_for(ReachTarget::Position(Vec3::new(f32::INFINITY, 0.0, 0.0)), Arm::Left)));
        assert!(rejected(Behavior::reach_for(ReachTarget::Object(ObjectId::INVALID), Arm::Left)));
        assert!(rejected(Behavior::ReachFor {
            target:         ReachTarget::Position(Vec3::ZERO),
            arms:           vec![Arm::Left, Arm::Left],
            arrived_at:     0.1,
            max_distance:   1.0,
            duration:       0.25,
            scale_duration: true,
        }));
        assert!(rejected(Behavior::ResetArm { arms: vec![], duration: 0.25, scale_duration: true }));
        assert!(rejected(Behavior::ResetHead { duration: -1.0, scale_duration: true }));
        assert!(rejected(Behavior::Drop { arm: Arm::Left, max_num_frames: 0, offset: DropOffset::default() }));
        assert!(rejected(Behavior::Drop {
            arm:            Arm::Left,
            max_num_frames: 10,
            offset:         DropOffset::Position(Vec3::new(0.0, f32::NAN, 0.0)),
        }));
        assert!(rejected(Behavior::RotateHead { axis: Axis::Yaw, angle: f32::NAN, duration: 0.1, scale_duration: true }));
        assert!(rejected(Behavior::Sequence(vec![])));
        assert!(rejected(Behavior::Sequence(vec![Behavior::turn_by(f32::NAN)])));
        assert!(rejected(Behavior::animate("")));
    }

    #[test]
    fn into_action_names_match() {
        let lib = ModelLibrary::default();
        for b in [
            Behavior::turn_by(1.0),
            Behavior::drop(Arm::Right),
            Behavior::look_at(LookTarget::Object(ObjectId(1))),
            Behavior::Sequence(vec![Behavior::DoNothing]),
        ] {
            let expected = b.name();
            assert_eq!(b.into_action(&lib).name(), expected);
        }
    }
}

// ── Library ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod library_tests {
    use std::io::Write;

    use crate::error::ReplicantError;
    use crate::library::ModelLibrary;

    const JSON: &str = r#"{
        "replicants": [{"name": "replicant_0", "url": "file:///r0"}],
        "animations": [{"name": "wave", "url": "file:///wave", "framerate": 30, "num_frames": 90}]
    }"#;

    #[test]
    fn parses_and_looks_up() {
        let lib = ModelLibrary::from_json_str(JSON).unwrap();
        assert_eq!(lib.replicant("replicant_0").unwrap().url, "file:///r0");
        assert!(lib.replicant("replicant_1").is_none());
        let wave = lib.animation("wave").unwrap();
        // 90 frames at 30 fps played back at 60 ticks/s = 180 ticks, plus slack.
        assert_eq!(wave.tick_budget(60), 180 + 10);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JSON.as_bytes()).unwrap();
        let lib = ModelLibrary::from_json_path(file.path()).unwrap();
        assert_eq!(lib.replicants.len(), 1);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let lib = ModelLibrary::from_json_str("{}").unwrap();
        assert!(lib.replicants.is_empty() && lib.animations.is_empty());
        assert!(matches!(ModelLibrary::from_json_str("[").unwrap_err(), ReplicantError::Library(_)));
    }
}
