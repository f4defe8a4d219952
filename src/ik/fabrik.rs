//! Forward And Backward Reaching Inverse Kinematics.
//!
//! Chain layout is root first: `joints[0]` is the chain root and
//! `joints[n - 1]` the end effector. `distances[i]` is the length of the
//! bone between joint `i` and `i + 1`.

use glam::{Quat, Vec3};

use super::IkJoint;
use crate::math::safe_rotation_arc;
use crate::EPSILON;

/// Pre-solve transforms kept for the rotation pass, reused between calls.
#[derive(Debug, Clone, Default)]
pub struct FabrikScratch {
    positions: Vec<Vec3>,
    rotations: Vec<Quat>,
}

impl FabrikScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(joints: usize) -> Self {
        Self {
            positions: Vec::with_capacity(joints),
            rotations: Vec::with_capacity(joints),
        }
    }

    fn capture(&mut self, joints: &[IkJoint]) {
        self.positions.clear();
        self.rotations.clear();
        self.positions.extend(joints.iter().map(|j| j.position));
        self.rotations.extend(joints.iter().map(|j| j.rotation));
    }
}

/// Place a joint `distance` from `anchor` on the line toward `toward`.
#[inline]
fn place(anchor: Vec3, toward: Vec3, distance: f32) -> Vec3 {
    let r = anchor.distance(toward);
    if r < EPSILON {
        return anchor;
    }
    anchor.lerp(toward, distance / r)
}

/// Solve with FABRIK.
///
/// An unreachable target (farther from the root than the summed bone
/// lengths) straightens the chain toward it in a single pass and returns
/// `false`. Otherwise backward and forward passes alternate until the
/// effector is within `tolerance` or `max_iterations` runs out.
///
/// With `solve_rotations`, each non-tip joint's rotation is re-derived as
/// the arc from its original bone direction to the solved one, applied on
/// top of its original rotation. The tip keeps its rotation.
///
/// # Panics
/// If the chain has fewer than 3 joints or `distances` does not have one
/// entry per bone.
pub fn solve_fabrik(
    joints: &mut [IkJoint],
    distances: &[f32],
    target: Vec3,
    tolerance: f32,
    max_iterations: usize,
    solve_rotations: bool,
    scratch: &mut FabrikScratch,
) -> bool {
    let n = joints.len();
    assert!(n >= 3, "FABRIK needs at least 3 joints, got {}", n);
    assert_eq!(
        distances.len(),
        n - 1,
        "FABRIK needs one distance per bone"
    );

    if solve_rotations {
        scratch.capture(joints);
    }

    let root = joints[0].position;
    let reach: f32 = distances.iter().sum();

    let reached = if root.distance(target) > reach {
        // Unreachable - stretch straight towards target
        for i in 0..n - 1 {
            joints[i + 1].position = place(joints[i].position, target, distances[i]);
        }
        false
    } else {
        let tolerance_sq = tolerance * tolerance;
        let mut reached = joints[n - 1].position.distance_squared(target) <= tolerance_sq;
        let mut iteration = 0;
        while !reached && iteration < max_iterations {
            // Backward pass (end -> start)
            joints[n - 1].position = target;
            for i in (0..n - 1).rev() {
                joints[i].position = place(joints[i + 1].position, joints[i].position, distances[i]);
            }

            // Forward pass (start -> end)
            joints[0].position = root;
            for i in 0..n - 1 {
                joints[i + 1].position = place(joints[i].position, joints[i + 1].position, distances[i]);
            }

            reached = joints[n - 1].position.distance_squared(target) <= tolerance_sq;
            iteration += 1;
        }
        reached
    };

    if solve_rotations {
        for i in 0..n - 1 {
            let before = scratch.positions[i + 1] - scratch.positions[i];
            let after = joints[i + 1].position - joints[i].position;
            joints[i].rotation = (safe_rotation_arc(before, after) * scratch.rotations[i]).normalize();
        }
    }

    reached
}
