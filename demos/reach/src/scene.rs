//! Random props and reach targets.

use rand::Rng;
use rand::rngs::SmallRng;

use rp_core::{Arm, ObjectId, Pose, Vec3};
use rp_replicant::{ReachTarget, ReplicantConfig};

use crate::kinematic::{Prop, yaw};

pub const PROP_ID_BASE: u32 = 10_000;

/// Where a replicant stands and faces, from its spawn config.
pub fn spawn_pose(config: &ReplicantConfig) -> Pose {
    Pose::new(config.position, yaw(Vec3::FORWARD, config.rotation.y))
}

/// A random point in the space in front of `pose`, in the body frame.
fn random_local(rng: &mut SmallRng) -> Vec3 {
    Vec3::new(rng.gen_range(-0.6..0.6), rng.gen_range(0.6..1.5), rng.gen_range(0.25..1.0))
}

/// Scatter `per_replicant` props in front of each replicant.
pub fn scatter_props(rng: &mut SmallRng, replicants: &[ReplicantConfig], per_replicant: usize) -> Vec<Prop> {
    let mut props = Vec::with_capacity(replicants.len() * per_replicant);
    for config in replicants {
        let pose = spawn_pose(config);
        for _ in 0..per_replicant {
            let id = ObjectId(PROP_ID_BASE + props.len() as u32);
            props.push(Prop::new(id, pose.local_to_world(random_local(rng)), rng.gen_range(0.03..0.06)));
        }
    }
    props
}

/// The arm on the target's side of the body.
pub fn arm_toward(pose: &Pose, target: Vec3) -> Arm {
    let right = Vec3::UP.cross(Vec3::new(pose.forward.x, 0.0, pose.forward.z).normalized());
    if (target - pose.position).dot(right) >= 0.0 { Arm::Right } else { Arm::Left }
}

/// Pick a reach target: one of `nearby` props, a world position, or an
/// offset from the hand anchor.
pub fn pick_target(rng: &mut SmallRng, pose: &Pose, nearby: &[Prop]) -> (ReachTarget, Arm) {
    let kind = rng.gen_range(0..3);
    if kind == 0 && !nearby.is_empty() {
        let prop = nearby[rng.gen_range(0..nearby.len())];
        return (ReachTarget::Object(prop.id), arm_toward(pose, prop.position));
    }
    let local = random_local(rng);
    let world = pose.local_to_world(local);
    let arm = arm_toward(pose, world);
    if kind == 1 {
        (ReachTarget::Position(world), arm)
    } else {
        // Anchors sit at the replicant root, so the local offset is unchanged.
        (ReachTarget::Relative(local), arm)
    }
}

/// Props within arm's reach of `pose`.
pub fn props_near(pose: &Pose, props: &[Prop]) -> Vec<Prop> {
    props
        .iter()
        .filter(|p| p.position.distance(pose.position + Vec3::new(0.0, 1.0, 0.0)) < 1.5)
        .copied()
        .collect()
}
