//! `ReplicantController`: drives one replicant's action, one tick at a time.
//!
//! # Per-tick algorithm
//!
//! `advance(records)`:
//!
//! 1. Cache the static snapshot the first time the replicant's identity
//!    records appear, and install `DoNothing` unless something was already
//!    requested.  Until then nothing else happens.
//! 2. Rebuild the dynamic snapshot from `records`.
//! 3. With no action, or a finished one, emit nothing more.
//! 4. A fresh action runs its initialization hook (or is stopped by the
//!    consecutive-collision rule before it gets the chance).
//! 5. A running action is first checked against the collision policy, then
//!    runs its continuation hook.
//! 6. Whatever makes the status terminal also yields the termination batch
//!    instead of the hook's own output; the action is marked done and a
//!    value copy is kept as the previous action.

use std::fmt;
use std::mem;
use std::sync::Arc;

use tracing::{debug, info, warn};

use rp_core::{Arm, CaptureMode, ReplicantId, RpError, TickClock, Vec3};
use rp_protocol::{Frequency, Instruction, RecordSet};

use crate::action::{Action, ActionRecord, ActionStatus, FailureReason, HookContext, MotionCategory};
use crate::behavior::Behavior;
use crate::collision::{self, CollisionDetection, OVERLAP_HALF_EXTENTS, OVERLAP_LOCAL_CENTER};
use crate::config::ReplicantConfig;
use crate::error::{ReplicantError, ReplicantResult};
use crate::library::ModelLibrary;
use crate::simple::DoNothing;
use crate::snapshot::{DynamicSnapshot, StaticSnapshot};

/// Advances without identity records, after spawning, before we complain.
const IDENTITY_GRACE_TICKS: u32 = 2;

pub struct ReplicantController {
    config:    ReplicantConfig,
    library:   Arc<ModelLibrary>,
    model_url: String,

    collision_detection: CollisionDetection,
    clock:               TickClock,

    static_data: Option<StaticSnapshot>,
    dynamic:     Option<DynamicSnapshot>,
    action:      Option<Box<dyn Action>>,
    previous:    Option<ActionRecord>,
    finished:    Option<ActionRecord>,

    /// Instructions queued for the next outgoing batch.
    commands:         Vec<Instruction>,
    spawned:          bool,
    missing_identity: u32,
}

impl ReplicantController {
    /// Fails if the configured model is not in `library` or the framerate
    /// is zero.
    pub fn new(config: ReplicantConfig, library: Arc<ModelLibrary>) -> ReplicantResult<Self> {
        if config.target_framerate == 0 {
            return Err(RpError::Config("target_framerate must be positive".into()).into());
        }
        let model_url = library
            .replicant(&config.model)
            .map(|m| m.url.clone())
            .ok_or_else(|| ReplicantError::UnknownModel(config.model.clone()))?;

        Ok(Self {
            collision_detection: config.collision_detection.clone(),
            clock:               TickClock::new(config.target_framerate),
            config,
            library,
            model_url,
            static_data:         None,
            dynamic:             None,
            action:              None,
            previous:            None,
            finished:            None,
            commands:            Vec::new(),
            spawned:             false,
            missing_identity:    0,
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn id(&self) -> ReplicantId {
        self.config.id
    }

    pub fn config(&self) -> &ReplicantConfig {
        &self.config
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn static_data(&self) -> Option<&StaticSnapshot> {
        self.static_data.as_ref()
    }

    pub fn dynamic(&self) -> Option<&DynamicSnapshot> {
        self.dynamic.as_ref()
    }

    pub fn action(&self) -> Option<&dyn Action> {
        self.action.as_deref()
    }

    /// The last action that reached a terminal status.
    pub fn previous_action(&self) -> Option<&ActionRecord> {
        self.previous.as_ref()
    }

    /// Status of the current action, if there is one.
    pub fn status(&self) -> Option<ActionStatus> {
        self.action.as_ref().map(|a| a.status())
    }

    /// `true` when there is nothing left to wait for: no action, or the
    /// current one has finished.
    pub fn is_done(&self) -> bool {
        self.action.as_ref().is_none_or(|a| a.state().done)
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn collision_detection(&self) -> &CollisionDetection {
        &self.collision_detection
    }

    pub fn collision_detection_mut(&mut self) -> &mut CollisionDetection {
        &mut self.collision_detection
    }

    pub fn set_collision_detection(&mut self, rules: CollisionDetection) {
        self.collision_detection = rules;
    }

    /// The action that finished on the most recent tick, once.
    pub fn take_finished(&mut self) -> Option<ActionRecord> {
        self.finished.take()
    }

    // ── Requests ──────────────────────────────────────────────────────────

    /// Replace the current action with one built from `behavior`.
    ///
    /// Structurally invalid parameters are rejected here and the current
    /// action keeps running.  An ongoing action that gets replaced is
    /// dropped without its termination hook.
    pub fn request(&mut self, behavior: Behavior) -> ReplicantResult<()> {
        behavior.validate()?;
        let action = behavior.into_action(&self.library);
        self.request_action(action);
        Ok(())
    }

    /// Install an already-built action.
    pub fn request_action(&mut self, action: Box<dyn Action>) {
        if let Some(old) = &self.action {
            if !old.state().done {
                debug!(replicant = self.config.id.0, old = old.name(), new = action.name(), "action superseded");
            }
        }
        if self.static_data.is_none() {
            debug!(replicant = self.config.id.0, action = action.name(), "action deferred until spawn");
        } else {
            debug!(replicant = self.config.id.0, action = action.name(), "action installed");
        }
        self.action = Some(action);
    }

    /// Return to the pre-spawn state.  The next batch re-spawns the replicant.
    pub fn reset(&mut self, position: Option<Vec3>, rotation: Option<Vec3>) {
        if let Some(p) = position {
            self.config.position = p;
        }
        if let Some(r) = rotation {
            self.config.rotation = r;
        }
        self.collision_detection = self.config.collision_detection.clone();
        self.clock = TickClock::new(self.config.target_framerate);
        self.static_data = None;
        self.dynamic = None;
        self.action = None;
        self.previous = None;
        self.finished = None;
        self.commands.clear();
        self.spawned = false;
        self.missing_identity = 0;
    }

    // ── Instruction sources ───────────────────────────────────────────────

    /// One-time instructions that add the replicant to the scene and ask for
    /// the data it needs every tick.
    pub fn initialization_instructions(&mut self) -> Vec<Instruction> {
        let id = self.config.id;
        self.spawned = true;

        let mut out = vec![
            Instruction::AddReplicant {
                name:     self.config.model.clone(),
                url:      self.model_url.clone(),
                position: self.config.position,
                rotation: self.config.rotation,
                id,
            },
            Instruction::SetTargetFramerate { framerate: self.config.target_framerate },
            Instruction::SendReplicants { frequency: Frequency::Always },
            Instruction::SendTransforms { frequency: Frequency::Always },
            Instruction::SendContainment { frequency: Frequency::Always },
            Instruction::SendFramerate { frequency: Frequency::Always },
        ];
        out.extend(Arm::ALL.into_iter().map(|arm| Instruction::AttachEmptyObject {
            id,
            empty_object_id: arm.anchor_index(),
            position:        Vec3::ZERO,
        }));
        out.push(Instruction::SendStaticEmptyObjects {});
        out.push(Instruction::SendEmptyObjects { frequency: Frequency::Always });
        out
    }

    /// Camera setup, sent once the replicant exists.
    fn camera_instructions(&self) -> Vec<Instruction> {
        let avatar_id = self.config.id.avatar_id();
        vec![
            Instruction::CreateAvatar {
                avatar_type: "A_Img_Caps_Kinematic".to_owned(),
                id:          avatar_id.clone(),
            },
            Instruction::SetPassMasks {
                pass_masks: vec!["_img".into(), "_id".into(), "_depth".into()],
                avatar_id:  avatar_id.clone(),
            },
            Instruction::ParentAvatarToReplicant {
                position:  Vec3::new(-0.1, -0.1, 0.0),
                avatar_id: avatar_id.clone(),
                id:        self.config.id,
            },
            Instruction::EnableImageSensor { enable: false, avatar_id },
            Instruction::SetImgPassEncoding { value: false },
        ]
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Consume one tick's records and return the instructions for the next
    /// batch.
    pub fn advance(&mut self, records: &RecordSet) -> Vec<Instruction> {
        let id = self.config.id;
        self.clock.advance();
        if let Some(fps) = records.target_framerate() {
            self.clock.target_framerate = fps;
        }

        if self.static_data.is_none() {
            match StaticSnapshot::from_records(id, records) {
                Some(snapshot) => {
                    info!(replicant = id.0, tick = %self.clock.current_tick, "cached static replicant data");
                    if self.config.capture != CaptureMode::Never {
                        let camera = self.camera_instructions();
                        self.commands.extend(camera);
                    }
                    self.static_data = Some(snapshot);
                    if self.action.is_none() {
                        self.action = Some(Box::new(DoNothing::new()));
                    }
                }
                None => {
                    if self.spawned {
                        self.missing_identity += 1;
                        if self.missing_identity == IDENTITY_GRACE_TICKS {
                            warn!(replicant = id.0, "no identity records since spawning");
                        }
                    }
                    return mem::take(&mut self.commands);
                }
            }
        }
        let Some(static_data) = self.static_data.as_ref() else {
            return mem::take(&mut self.commands);
        };
        let dynamic: &DynamicSnapshot =
            self.dynamic.insert(DynamicSnapshot::from_records(static_data, records));

        let Some(action) = self.action.as_mut() else {
            return mem::take(&mut self.commands);
        };
        if action.state().done {
            return mem::take(&mut self.commands);
        }

        let ctx = HookContext {
            records,
            static_data,
            dynamic,
            capture: self.config.capture,
            clock: &self.clock,
            previous: self.previous.as_ref(),
            collision_detection: &self.collision_detection,
        };

        let out = if !action.state().initialized {
            let blocked = collision::aborts_on_start(
                action.motion_category(),
                self.previous.as_ref(),
                &self.collision_detection,
            );
            if blocked {
                debug!(replicant = id.0, action = action.name(), "previous motion ended in a collision");
                action.abort(FailureReason::Collision);
                action.state_mut().initialized = true;
                action.terminate(&ctx)
            } else {
                let out = action.initialize(&ctx);
                action.state_mut().initialized = true;
                debug!(replicant = id.0, action = action.name(), status = %action.status(), "action initialized");
                if action.status().is_ongoing() { out } else { action.terminate(&ctx) }
            }
        } else {
            let abort = action.motion_category().and_then(|_| {
                collision::evaluate(
                    static_data,
                    dynamic,
                    &self.collision_detection,
                    records.overlap(id.0),
                    action.exempt_object(),
                )
            });
            match abort {
                Some(abort) => {
                    debug!(
                        replicant = id.0,
                        action = action.name(),
                        reason = abort.reason.as_str(),
                        contacts = abort.contacts,
                        "collision abort"
                    );
                    action.abort(abort.reason);
                    action.terminate(&ctx)
                }
                None => {
                    let out = action.proceed(&ctx);
                    if action.status().is_ongoing() { out } else { action.terminate(&ctx) }
                }
            }
        };
        self.commands.extend(out);

        let status = action.status();
        if status.is_ongoing() {
            if self.collision_detection.avoid && action.motion_category() == Some(MotionCategory::Arm) {
                self.commands.push(Instruction::SendOverlapBox {
                    id:           id.0,
                    half_extents: OVERLAP_HALF_EXTENTS,
                    position:     dynamic.pose.local_to_world(OVERLAP_LOCAL_CENTER),
                });
            }
        } else {
            action.state_mut().done = true;
            let record = ActionRecord::of(&**action);
            debug!(replicant = id.0, action = record.name, status = %status, "action ended");
            self.previous = Some(record.clone());
            self.finished = Some(record);
        }

        mem::take(&mut self.commands)
    }
}

impl fmt::Debug for ReplicantController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicantController")
            .field("id", &self.config.id)
            .field("spawned", &self.spawned)
            .field("cached", &self.static_data.is_some())
            .field("action", &self.action.as_ref().map(|a| a.name()))
            .field("status", &self.status())
            .field("previous", &self.previous)
            .finish()
    }
}
