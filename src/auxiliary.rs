//! Smaller corrections applied after the main chain stages: shoulder
//! normalization, foot yaw alignment, and hand reach with optional IK.

use glam::{Quat, Vec3};

use crate::chain::RigDefinition;
use crate::ik::{IkJoint, IkScratch, IkSettings};
use crate::joint::{JointId, JointMask, Side, SkeletonPose};
use crate::math::{signed_angle_about, VecExt};
use crate::pipeline::StageOutcome;
use crate::EPSILON;

/// Pull a shoulder onto its parent's height along `spine_up`, then onto the
/// lateral line through the parent.
///
/// `spine_up` and `lateral` must be unit length. Each step blends by its
/// own weight.
pub fn normalize_shoulder(
    shoulder: Vec3,
    parent: Vec3,
    spine_up: Vec3,
    lateral: Vec3,
    height_weight: f32,
    width_weight: f32,
) -> Vec3 {
    let level = shoulder + spine_up * (parent - shoulder).dot(spine_up);
    let p1 = shoulder.lerp(level, height_weight);

    let on_line = parent + lateral * (p1 - parent).dot(lateral);
    p1.lerp(on_line, width_weight)
}

/// Yaw rotation about `up` that turns `corrected` (foot to toes after
/// correction) back onto `original` (foot to toes before correction).
///
/// Identity if `original` is effectively zero length.
pub fn foot_alignment_rotation(original: Vec3, corrected: Vec3, up: Vec3) -> Quat {
    if original.length_squared() < EPSILON {
        return Quat::IDENTITY;
    }
    let axis = up.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let angle = signed_angle_about(original, corrected, axis);
    Quat::from_axis_angle(axis, -angle)
}

/// Step `current` toward `target` by at most the squash or stretch limit.
///
/// The move counts as stretching when `target` is farther from `reference`
/// than `current` is.
pub fn clamp_squash_stretch(
    current: Vec3,
    target: Vec3,
    reference: Vec3,
    squash_limit: f32,
    stretch_limit: f32,
) -> Vec3 {
    let stretching = target.distance(reference) > current.distance(reference);
    let limit = if stretching { stretch_limit } else { squash_limit };
    current.move_towards(target, limit.max(0.0))
}

/// Shoulder stage: level each present shoulder with its attachment joint.
pub fn apply_shoulders(
    pose: &mut SkeletonPose,
    rig: &RigDefinition,
    height_weight: f32,
    width_weight: f32,
    weight: f32,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    let height_weight = (height_weight * weight).min(1.0);
    let width_weight = (width_weight * weight).min(1.0);
    if height_weight <= 0.0 && width_weight <= 0.0 {
        return outcome;
    }

    let (Some(left_arm), Some(right_arm)) = (
        pose.get(JointId::LeftUpperArm),
        pose.get(JointId::RightUpperArm),
    ) else {
        log::warn!("Skipping shoulder normalization: upper arm missing");
        outcome.skipped += 1;
        return outcome;
    };

    for side in Side::BOTH {
        let chain = rig.arm(side);
        let shoulder_joint = chain.joints[1];
        if !matches!(shoulder_joint, JointId::LeftShoulder | JointId::RightShoulder) {
            continue;
        }
        let attachment = chain.root();
        let (Some(shoulder), Some(parent)) = (pose.get(shoulder_joint), pose.get(attachment)) else {
            outcome.skipped += 1;
            continue;
        };

        let below = rig
            .topology
            .present
            .nearest_ancestor(attachment)
            .and_then(|joint| pose.get(joint));
        let spine_up = match below {
            Some(below) => (parent - below).normalize_or_zero(),
            None => Vec3::Y,
        };
        if spine_up == Vec3::ZERO {
            outcome.skipped += 1;
            continue;
        }

        let lateral = (right_arm - left_arm).project_on_plane(spine_up).normalize_or_zero();
        let width = if lateral == Vec3::ZERO { 0.0 } else { width_weight };

        let corrected = normalize_shoulder(shoulder, parent, spine_up, lateral, height_weight, width);
        let carry: JointMask = chain.joints[1..].iter().copied().collect();
        pose.translate_subtree(shoulder_joint, corrected - shoulder, carry);
        outcome.applied += 1;
    }

    outcome
}

/// Foot stage: undo the yaw the earlier stages introduced on each foot.
///
/// `original` is the pose as it came in from the host, before any stage ran.
pub fn align_feet(
    pose: &mut SkeletonPose,
    original: &SkeletonPose,
    align_weight: f32,
    weight: f32,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    let blend = (align_weight * weight).min(1.0);
    if blend <= 0.0 {
        return outcome;
    }

    for side in Side::BOTH {
        let [_, _, foot, toes] = JointId::leg(side);
        let (Some(foot_pos), Some(toes_pos), Some(original_foot), Some(original_toes)) = (
            pose.get(foot),
            pose.get(toes),
            original.get(foot),
            original.get(toes),
        ) else {
            continue;
        };

        let up = pose.rotations[foot.index()] * Vec3::Y;
        let rotation =
            foot_alignment_rotation(original_toes - original_foot, toes_pos - foot_pos, up);
        pose.rotate_subtree(foot, Quat::IDENTITY.slerp(rotation, blend));
        outcome.applied += 1;
    }

    outcome
}

/// Hand reach limits and IK.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSettings {
    pub weight: f32,
    pub squash_limit: f32,
    pub stretch_limit: f32,
    pub ik: Option<IkSettings>,
}

/// Hand stage: move each hand toward its tracked target, clamped by the
/// squash/stretch limits relative to the upper arm, then solve the arm with
/// IK if configured.
///
/// Returns the stage outcome plus, per side, whether IK converged (`None`
/// when IK did not run for that side).
pub fn correct_hands(
    pose: &mut SkeletonPose,
    targets: [Vec3; 2],
    settings: &HandSettings,
    scratch: &mut IkScratch,
    weight: f32,
) -> (StageOutcome, [Option<bool>; 2]) {
    let mut outcome = StageOutcome::default();
    let mut reached = [None; 2];
    let blend = (settings.weight * weight).min(1.0);
    if blend <= 0.0 {
        return (outcome, reached);
    }

    for (side, target) in Side::BOTH.into_iter().zip(targets) {
        let [_, upper_arm, lower_arm, hand] = JointId::arm(side);
        let (Some(upper), Some(lower), Some(current)) =
            (pose.get(upper_arm), pose.get(lower_arm), pose.get(hand))
        else {
            log::warn!("Skipping hand correction: {:?} arm incomplete", side);
            outcome.skipped += 1;
            continue;
        };

        let clamped = clamp_squash_stretch(
            current,
            target,
            upper,
            settings.squash_limit,
            settings.stretch_limit,
        );
        let desired = current.lerp(clamped, blend);

        match &settings.ik {
            Some(ik) => {
                scratch.joints.clear();
                scratch.joints.extend([upper_arm, lower_arm, hand].into_iter().zip([upper, lower, current]).map(
                    |(joint, position)| IkJoint::new(position, pose.rotations[joint.index()]),
                ));
                let converged = scratch.solve(desired, ik);

                for (joint, solved) in [upper_arm, lower_arm, hand].into_iter().zip(&scratch.joints) {
                    pose.positions[joint.index()] = solved.position;
                    pose.rotations[joint.index()] = solved.rotation;
                }
                reached[crate::joint::side_index(side)] = Some(converged);
            }
            None => {
                pose.positions[hand.index()] = desired;
            }
        }
        outcome.applied += 1;
    }

    (outcome, reached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::IkSolverKind;
    use crate::joint::{JointHandle, RestPose};
    use std::f32::consts::FRAC_PI_2;
    use wasm_bindgen_test::*;

    fn rig_and_pose() -> (RigDefinition, SkeletonPose) {
        let rest = RestPose::default_humanoid();
        let rig = RigDefinition::bind(&rest).unwrap();
        (rig, rest.pose)
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_normalize_shoulder_levels_and_centers() {
        let parent = Vec3::new(0.0, 1.4, 0.0);
        let shrugged = Vec3::new(-0.05, 1.48, 0.02);

        let leveled = normalize_shoulder(shrugged, parent, Vec3::Y, Vec3::X, 1.0, 0.0);
        assert!(leveled.distance(Vec3::new(-0.05, 1.4, 0.02)) < 1e-6);

        let both = normalize_shoulder(shrugged, parent, Vec3::Y, Vec3::X, 1.0, 1.0);
        assert!(both.distance(Vec3::new(-0.05, 1.4, 0.0)) < 1e-6);

        let untouched = normalize_shoulder(shrugged, parent, Vec3::Y, Vec3::X, 0.0, 0.0);
        assert_eq!(untouched, shrugged);
    }

    #[test]
    fn test_foot_alignment_undoes_yaw() {
        let original = Vec3::Z;
        let corrected = Vec3::X;

        let rotation = foot_alignment_rotation(original, corrected, Vec3::Y);

        assert!((rotation * corrected).distance(original) < 1e-5);
        let angle = signed_angle_about(original, corrected, Vec3::Y);
        assert!((angle - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_foot_alignment_zero_original_is_identity() {
        assert_eq!(
            foot_alignment_rotation(Vec3::ZERO, Vec3::X, Vec3::Y),
            Quat::IDENTITY
        );
    }

    #[test]
    fn test_squash_stretch_uses_matching_limit() {
        let reference = Vec3::ZERO;
        let current = Vec3::new(0.5, 0.0, 0.0);

        // farther from reference: stretch limit
        let stretched = clamp_squash_stretch(current, Vec3::new(1.0, 0.0, 0.0), reference, 0.3, 0.1);
        assert!(stretched.distance(Vec3::new(0.6, 0.0, 0.0)) < 1e-6);

        // closer to reference: squash limit
        let squashed = clamp_squash_stretch(current, Vec3::new(0.1, 0.0, 0.0), reference, 0.3, 0.1);
        assert!(squashed.distance(Vec3::new(0.2, 0.0, 0.0)) < 1e-6);

        // within limit: lands on target
        let near = clamp_squash_stretch(current, Vec3::new(0.55, 0.0, 0.0), reference, 0.3, 0.1);
        assert_eq!(near, Vec3::new(0.55, 0.0, 0.0));
    }

    #[test]
    fn test_apply_shoulders_carries_arm() {
        let (rig, mut pose) = rig_and_pose();
        pose.translate_subtree(
            JointId::LeftShoulder,
            Vec3::new(0.0, 0.05, 0.0),
            JointMask::subtree(JointId::LeftShoulder),
        );
        let before = pose.clone();

        let outcome = apply_shoulders(&mut pose, &rig, 1.0, 0.0, 1.0);

        assert_eq!(outcome.applied, 2);
        let attachment = pose.position(JointId::UpperChest);
        let shoulder = pose.position(JointId::LeftShoulder);
        assert!((shoulder.y - attachment.y).abs() < 1e-5, "shoulder {} attach {}", shoulder, attachment);

        let shoulder_delta = shoulder - before.position(JointId::LeftShoulder);
        let hand_delta = pose.position(JointId::LeftHand) - before.position(JointId::LeftHand);
        assert!(hand_delta.distance(shoulder_delta) < 1e-5);
        assert_eq!(pose.position(JointId::LeftFoot), before.position(JointId::LeftFoot));
    }

    #[test]
    fn test_align_feet_restores_toe_heading() {
        let (_, original) = rig_and_pose();
        let mut pose = original.clone();
        // a previous stage swung the left foot outward
        pose.rotate_subtree(JointId::LeftFoot, Quat::from_rotation_y(0.4));

        let outcome = align_feet(&mut pose, &original, 1.0, 1.0);

        assert_eq!(outcome.applied, 2);
        let heading = pose.position(JointId::LeftToes) - pose.position(JointId::LeftFoot);
        let expected = original.position(JointId::LeftToes) - original.position(JointId::LeftFoot);
        assert!(
            heading.normalize().distance(expected.normalize()) < 1e-4,
            "heading {} expected {}",
            heading,
            expected
        );
    }

    #[test]
    fn test_correct_hands_clamps_without_ik() {
        let (_, mut pose) = rig_and_pose();
        let hand = pose.position(JointId::LeftHand);
        let settings = HandSettings {
            weight: 1.0,
            squash_limit: 0.05,
            stretch_limit: 0.02,
            ik: None,
        };
        let targets = [hand + Vec3::new(-0.5, 0.0, 0.0), pose.position(JointId::RightHand)];

        let (outcome, reached) =
            correct_hands(&mut pose, targets, &settings, &mut IkScratch::default(), 1.0);

        assert_eq!(outcome.applied, 2);
        assert_eq!(reached, [None, None]);
        assert!(pose.position(JointId::LeftHand).distance(hand + Vec3::new(-0.02, 0.0, 0.0)) < 1e-6);
    }

    #[test]
    fn test_correct_hands_with_ik_keeps_arm_lengths() {
        let (_, mut pose) = rig_and_pose();
        let upper = pose.position(JointId::RightUpperArm);
        let target = upper + Vec3::new(0.3, -0.3, 0.2);
        let settings = HandSettings {
            weight: 1.0,
            squash_limit: 10.0,
            stretch_limit: 10.0,
            ik: Some(IkSettings {
                solver: IkSolverKind::Fabrik,
                tolerance: 1e-3,
                max_iterations: 30,
                solve_rotations: true,
            }),
        };
        let targets = [pose.position(JointId::LeftHand), target];

        let (_, reached) =
            correct_hands(&mut pose, targets, &settings, &mut IkScratch::with_capacity(3), 1.0);

        assert_eq!(reached[1], Some(true));
        assert!(pose.position(JointId::RightHand).distance(target) <= 1e-3);
        assert_eq!(pose.position(JointId::RightUpperArm), upper);
        let forearm = pose.position(JointId::RightLowerArm).distance(pose.position(JointId::RightHand));
        assert!((forearm - 0.26).abs() < 1e-4, "forearm {}", forearm);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_zero_rig_weight_leaves_pose_alone() {
        let (rig, original) = rig_and_pose();
        let mut pose = original.clone();
        pose.translate_subtree(
            JointId::RightShoulder,
            Vec3::new(0.0, 0.04, -0.02),
            JointMask::subtree(JointId::RightShoulder),
        );
        pose.rotate_subtree(JointId::LeftFoot, Quat::from_rotation_y(0.3));
        let perturbed = pose.clone();
        let settings = HandSettings {
            weight: 1.0,
            squash_limit: 1.0,
            stretch_limit: 1.0,
            ik: Some(IkSettings::default()),
        };
        let targets = [
            pose.position(JointId::LeftHand) + Vec3::new(-0.1, 0.1, 0.0),
            pose.position(JointId::RightHand) + Vec3::new(0.0, -0.2, 0.1),
        ];

        let shoulders = apply_shoulders(&mut pose, &rig, 1.0, 1.0, 0.0);
        let feet = align_feet(&mut pose, &original, 1.0, 0.0);
        let (hands, reached) =
            correct_hands(&mut pose, targets, &settings, &mut IkScratch::with_capacity(3), 0.0);

        assert_eq!(pose, perturbed);
        assert_eq!(shoulders, StageOutcome::default());
        assert_eq!(feet, StageOutcome::default());
        assert_eq!(hands, StageOutcome::default());
        assert_eq!(reached, [None, None]);
    }
}
