//! Spine correction: reconciling the hips/head endpoints of the corrected
//! spine with their tracked positions, and straightening the spine between.
//!
//! Two variants exist. The deformation variant blends every spine joint by
//! an interpolation of the hips and head offsets. The full-body variant
//! translates the hips and/or head onto their tracked positions and spreads
//! the remaining drift over the chain and legs.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::chain::RigDefinition;
use crate::joint::{JointId, JointMask, Side, SkeletonPose};
use crate::pipeline::StageOutcome;

/// Which spine endpoints the deformation variant leaves untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpineCorrection {
    /// Every spine joint, endpoints included, is blended
    #[default]
    None,
    SkipHead,
    SkipHips,
    SkipHipsAndHead,
}

impl SpineCorrection {
    #[inline]
    pub const fn skips_hips(self) -> bool {
        matches!(self, SpineCorrection::SkipHips | SpineCorrection::SkipHipsAndHead)
    }

    #[inline]
    pub const fn skips_head(self) -> bool {
        matches!(self, SpineCorrection::SkipHead | SpineCorrection::SkipHipsAndHead)
    }
}

/// Which spine endpoints the full-body variant pins to their tracked positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpineTranslation {
    /// Pass-through
    #[default]
    None,
    AccurateHead,
    AccurateHips,
    AccurateHipsAndHead,
}

impl SpineTranslation {
    #[inline]
    pub const fn pins_hips(self) -> bool {
        matches!(
            self,
            SpineTranslation::AccurateHips | SpineTranslation::AccurateHipsAndHead
        )
    }

    #[inline]
    pub const fn pins_head(self) -> bool {
        matches!(
            self,
            SpineTranslation::AccurateHead | SpineTranslation::AccurateHipsAndHead
        )
    }
}

/// Spine correction variant selected for a rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpineCorrectionMode {
    Deformation(SpineCorrection),
    FullBody(SpineTranslation),
}

impl Default for SpineCorrectionMode {
    fn default() -> Self {
        SpineCorrectionMode::Deformation(SpineCorrection::None)
    }
}

impl SpineCorrectionMode {
    /// Whether this mode can ever move a joint
    pub fn is_active(self) -> bool {
        !matches!(self, SpineCorrectionMode::FullBody(SpineTranslation::None))
    }
}

/// Tracked positions the spine endpoints are reconciled against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpineTargets {
    pub hips: Vec3,
    pub head: Vec3,
}

fn spine_present(pose: &SkeletonPose, rig: &RigDefinition, outcome: &mut StageOutcome) -> bool {
    let missing = rig
        .spine
        .joints
        .iter()
        .filter(|joint| !pose.present.contains(**joint))
        .count();
    if missing > 0 {
        log::warn!("Skipping spine correction: {} spine joints missing", missing);
        outcome.skipped += missing as u32;
        return false;
    }
    true
}

/// Move the limbs hanging off the spine by the delta their spine joint received.
fn carry_limbs(
    pose: &mut SkeletonPose,
    rig: &RigDefinition,
    deltas: &[Vec3; JointId::COUNT],
    include_legs: bool,
) {
    for side in Side::BOTH {
        let arm = rig.arm(side);
        let delta = deltas[arm.root().index()];
        if delta != Vec3::ZERO {
            let mask: JointMask = arm.joints[1..].iter().copied().collect();
            for joint in mask.intersect(pose.present).iter() {
                pose.positions[joint.index()] += delta;
            }
        }

        if include_legs {
            let delta = deltas[JointId::Hips.index()];
            if delta != Vec3::ZERO {
                for &joint in rig.topology.leg(side) {
                    if pose.present.contains(joint) {
                        pose.positions[joint.index()] += delta;
                    }
                }
            }
        }
    }
}

/// Deformation variant.
///
/// Each spine joint `i` with cumulative proportion `c` is offset by
/// `hips_offset * (1 - c) + head_offset * c`, scaled by `weight`. Skipped
/// endpoints keep their position. Arms follow the joint they attach to and
/// legs follow the hips.
pub fn correct_spine(
    pose: &mut SkeletonPose,
    rig: &RigDefinition,
    targets: SpineTargets,
    mode: SpineCorrection,
    weight: f32,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    if weight <= 0.0 || !spine_present(pose, rig, &mut outcome) {
        return outcome;
    }

    let chain = &rig.spine;
    let hips_offset = targets.hips - pose.positions[chain.root().index()];
    let head_offset = targets.head - pose.positions[chain.tip().index()];
    let last = chain.joints.len() - 1;

    let mut deltas = [Vec3::ZERO; JointId::COUNT];
    for (i, (&joint, &c)) in chain.joints.iter().zip(&chain.cumulative).enumerate() {
        if (i == 0 && mode.skips_hips()) || (i == last && mode.skips_head()) {
            continue;
        }
        let offset = hips_offset * (1.0 - c) + head_offset * c;
        let delta = offset * weight;
        pose.positions[joint.index()] += delta;
        deltas[joint.index()] = delta;
        outcome.applied += 1;
    }

    carry_limbs(pose, rig, &deltas, true);
    outcome
}

/// Full-body variant.
///
/// - hips pinned: the hips and upper body translate rigidly onto the tracked
///   hips; each leg joint takes `offset * (1 - c)` so feet stay planted
/// - head pinned: each spine joint above the hips accumulates
///   `head_offset * limb_proportion` up the chain so the head lands on target
/// - both pinned: hips first, then head, then the arms are pulled back by
///   `upper_arm_compensation` of the drift their attachment received
pub fn correct_spine_translation(
    pose: &mut SkeletonPose,
    rig: &RigDefinition,
    targets: SpineTargets,
    mode: SpineTranslation,
    weight: f32,
    upper_arm_compensation: f32,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    if mode == SpineTranslation::None || weight <= 0.0 {
        return outcome;
    }
    if !spine_present(pose, rig, &mut outcome) {
        return outcome;
    }

    if mode.pins_hips() {
        let offset = (targets.hips - pose.positions[JointId::Hips.index()]) * weight;
        if offset != Vec3::ZERO {
            let upper_body = JointMask::all().difference(rig.topology.leg_mask());
            pose.translate_subtree(JointId::Hips, offset, upper_body);

            for side in Side::BOTH {
                let leg = rig.leg(side);
                // the foot (c = 1) stays where it is
                let feet = leg.joints.len() - 1;
                for (&joint, &c) in leg.joints[..feet].iter().zip(&leg.cumulative).skip(1) {
                    pose.positions[joint.index()] += offset * (1.0 - c);
                }
            }
        }
        outcome.applied += 1;
    }

    if mode.pins_head() {
        let chain = &rig.spine;
        let offset = targets.head - pose.positions[chain.tip().index()];
        let mut deltas = [Vec3::ZERO; JointId::COUNT];
        let mut accumulated = Vec3::ZERO;

        for (pair, &joint) in chain.pairs.iter().zip(&chain.joints[1..]) {
            accumulated += offset * pair.limb_proportion;
            let delta = accumulated * weight;
            pose.positions[joint.index()] += delta;
            deltas[joint.index()] = delta;
            outcome.applied += 1;
        }
        carry_limbs(pose, rig, &deltas, false);

        if mode == SpineTranslation::AccurateHipsAndHead && upper_arm_compensation > 0.0 {
            for side in Side::BOTH {
                let arm = rig.arm(side);
                let compensation = -deltas[arm.root().index()] * upper_arm_compensation;
                for &joint in &arm.joints[1..] {
                    if pose.present.contains(joint) {
                        pose.positions[joint.index()] += compensation;
                    }
                }
            }
        }
    }

    outcome
}

/// Pull intermediate spine joints toward the straight hips-to-head line.
///
/// A joint at cumulative proportion `c` targets `lerp(hips, head, c)`; joints
/// in the lower half use `lower_weight`, the upper half `upper_weight`.
/// Endpoints never move; arms follow their attachment.
pub fn align_spine(
    pose: &mut SkeletonPose,
    rig: &RigDefinition,
    lower_weight: f32,
    upper_weight: f32,
    weight: f32,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    if weight <= 0.0 || (lower_weight <= 0.0 && upper_weight <= 0.0) {
        return outcome;
    }
    if !spine_present(pose, rig, &mut outcome) {
        return outcome;
    }

    let chain = &rig.spine;
    let hips = pose.positions[chain.root().index()];
    let head = pose.positions[chain.tip().index()];
    let last = chain.joints.len() - 1;

    let mut deltas = [Vec3::ZERO; JointId::COUNT];
    for i in 1..last {
        let joint = chain.joints[i];
        let c = chain.cumulative[i];
        let joint_weight = if c <= 0.5 { lower_weight } else { upper_weight } * weight;
        if joint_weight <= 0.0 {
            continue;
        }
        let current = pose.positions[joint.index()];
        let delta = (hips.lerp(head, c) - current) * joint_weight.min(1.0);
        pose.positions[joint.index()] = current + delta;
        deltas[joint.index()] = delta;
        outcome.applied += 1;
    }

    carry_limbs(pose, rig, &deltas, false);
    outcome
}
