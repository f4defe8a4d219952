//! Cyclic coordinate descent.
//!
//! Chain layout is effector first: `bones[0]` is the end effector and
//! `bones[n - 1]` the chain root. Each step rotates one bone about its own
//! position so the effector swings toward the goal, carrying every bone
//! between it and the effector.

use glam::{Quat, Vec3};

use super::IkJoint;
use crate::math::safe_rotation_arc;

/// World rotation that swings `effector` toward `goal` about `bone`.
///
/// Identity when either direction is degenerate.
#[inline]
pub fn effector_rotation_toward_goal(bone: Vec3, effector: Vec3, goal: Vec3) -> Quat {
    safe_rotation_arc(effector - bone, goal - bone)
}

/// Rotate `bones[j]` toward the goal and carry `bones[..j]` with it.
/// The effector's own rotation is left alone; only its position follows.
fn rotate_toward_goal(bones: &mut [IkJoint], j: usize, goal: Vec3) {
    let pivot = bones[j].position;
    let delta = effector_rotation_toward_goal(pivot, bones[0].position, goal);
    if delta == Quat::IDENTITY {
        return;
    }

    bones[j].rotation = (delta * bones[j].rotation).normalize();
    for (k, bone) in bones[..j].iter_mut().enumerate() {
        bone.position = pivot + delta * (bone.position - pivot);
        if k > 0 {
            bone.rotation = (delta * bone.rotation).normalize();
        }
    }
}

/// Solve with CCD.
///
/// `tolerance` is a squared distance. Returns `true` as soon as the effector
/// is within it, `false` once `max_iterations` sweeps are spent. Chains of
/// fewer than three joints have no bone to sweep and only report whether
/// the effector already sits on the target.
pub fn solve_ccd(bones: &mut [IkJoint], target: Vec3, tolerance: f32, max_iterations: usize) -> bool {
    let n = bones.len();
    if n == 0 {
        return false;
    }
    let reached = |bones: &[IkJoint]| bones[0].position.distance_squared(target) <= tolerance;
    if reached(bones) {
        return true;
    }

    for _ in 0..max_iterations {
        for i in 2..n {
            for j in 1..=i {
                rotate_toward_goal(bones, j, target);
                if reached(bones) {
                    return true;
                }
            }
        }
    }
    false
}
