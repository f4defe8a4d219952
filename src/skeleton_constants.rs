//! Shared skeleton constants used by both build.rs and runtime code.
//!
//! This module is included by both the build script and the joint module
//! so rig presets are validated against the same hierarchy the pipeline binds.

// Some constants are only used by build.rs for validation
#![allow(dead_code)]

use glam::Vec3;

/// Shortest rest distance a parent/child bone may have in a rig preset (meters).
pub const MIN_BONE_LENGTH: f32 = 0.005;

/// Joint names paired with their parent, in topological order.
/// Must stay in sync with `JointId::ALL`.
pub const JOINT_PARENTS: [(&str, Option<&str>); 22] = [
    ("hips", None),
    ("spine", Some("hips")),
    ("chest", Some("spine")),
    ("upper_chest", Some("chest")),
    ("neck", Some("upper_chest")),
    ("head", Some("neck")),
    ("left_shoulder", Some("upper_chest")),
    ("left_upper_arm", Some("left_shoulder")),
    ("left_lower_arm", Some("left_upper_arm")),
    ("left_hand", Some("left_lower_arm")),
    ("right_shoulder", Some("upper_chest")),
    ("right_upper_arm", Some("right_shoulder")),
    ("right_lower_arm", Some("right_upper_arm")),
    ("right_hand", Some("right_lower_arm")),
    ("left_upper_leg", Some("hips")),
    ("left_lower_leg", Some("left_upper_leg")),
    ("left_foot", Some("left_lower_leg")),
    ("left_toes", Some("left_foot")),
    ("right_upper_leg", Some("hips")),
    ("right_lower_leg", Some("right_upper_leg")),
    ("right_foot", Some("right_lower_leg")),
    ("right_toes", Some("right_foot")),
];

/// Joints that every bindable rig must provide.
pub const REQUIRED_JOINTS: [&str; 15] = [
    "hips",
    "spine",
    "head",
    "left_upper_arm",
    "left_lower_arm",
    "left_hand",
    "right_upper_arm",
    "right_lower_arm",
    "right_hand",
    "left_upper_leg",
    "left_lower_leg",
    "left_foot",
    "right_upper_leg",
    "right_lower_leg",
    "right_foot",
];

/// Default humanoid T-pose, facing +Z with the avatar's left on -X.
/// Same order as `JOINT_PARENTS`.
pub const DEFAULT_REST_POSITIONS: [Vec3; 22] = [
    Vec3::new(0.0, 1.0, 0.0),      // hips
    Vec3::new(0.0, 1.10, 0.0),     // spine
    Vec3::new(0.0, 1.22, 0.0),     // chest
    Vec3::new(0.0, 1.34, 0.0),     // upper_chest
    Vec3::new(0.0, 1.48, 0.0),     // neck
    Vec3::new(0.0, 1.60, 0.0),     // head
    Vec3::new(-0.04, 1.42, 0.0),   // left_shoulder
    Vec3::new(-0.18, 1.42, 0.0),   // left_upper_arm
    Vec3::new(-0.46, 1.42, 0.0),   // left_lower_arm
    Vec3::new(-0.72, 1.42, 0.0),   // left_hand
    Vec3::new(0.04, 1.42, 0.0),    // right_shoulder
    Vec3::new(0.18, 1.42, 0.0),    // right_upper_arm
    Vec3::new(0.46, 1.42, 0.0),    // right_lower_arm
    Vec3::new(0.72, 1.42, 0.0),    // right_hand
    Vec3::new(-0.09, 0.94, 0.0),   // left_upper_leg
    Vec3::new(-0.09, 0.52, 0.0),   // left_lower_leg
    Vec3::new(-0.09, 0.08, 0.0),   // left_foot
    Vec3::new(-0.09, 0.02, 0.14),  // left_toes
    Vec3::new(0.09, 0.94, 0.0),    // right_upper_leg
    Vec3::new(0.09, 0.52, 0.0),    // right_lower_leg
    Vec3::new(0.09, 0.08, 0.0),    // right_foot
    Vec3::new(0.09, 0.02, 0.14),   // right_toes
];

/// Index of a joint name in `JOINT_PARENTS`.
pub fn joint_index(name: &str) -> Option<usize> {
    JOINT_PARENTS.iter().position(|(joint, _)| *joint == name)
}
