//! Bone-chain proportion enforcement.
//!
//! Each bone pair's end joint is pulled back to `rest_distance * scale` from
//! its start joint, along the direction the pair had in the incoming pose.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::chain::{BodySection, BonePair};
use crate::joint::SkeletonPose;
use crate::pipeline::StageOutcome;

/// Per-section multiplier on the proportion stage weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionWeights {
    pub spine: f32,
    pub left_arm: f32,
    pub right_arm: f32,
    pub left_leg: f32,
    pub right_leg: f32,
}

impl Default for SectionWeights {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

impl SectionWeights {
    pub const fn uniform(weight: f32) -> Self {
        Self {
            spine: weight,
            left_arm: weight,
            right_arm: weight,
            left_leg: weight,
            right_leg: weight,
        }
    }

    #[inline]
    pub fn get(&self, section: BodySection) -> f32 {
        match section {
            BodySection::Spine => self.spine,
            BodySection::LeftArm => self.left_arm,
            BodySection::RightArm => self.right_arm,
            BodySection::LeftLeg => self.left_leg,
            BodySection::RightLeg => self.right_leg,
        }
    }
}

/// Restore rest distances for `pairs`, processed root to tip.
///
/// Directions are captured for every pair before any joint moves, so a pair
/// further down the chain keeps the shape it had in the incoming pose even
/// though its start joint has already been corrected. `directions` is
/// caller-owned scratch and is overwritten.
///
/// A pair whose joints are missing from `pose` is skipped with a warning.
/// `weight <= 0` leaves the pose untouched.
pub fn enforce_proportions(
    pose: &mut SkeletonPose,
    pairs: &[BonePair],
    scale: Vec3,
    weight: f32,
    sections: &SectionWeights,
    directions: &mut Vec<Vec3>,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    if weight <= 0.0 {
        return outcome;
    }

    directions.clear();
    directions.extend(pairs.iter().map(|pair| match (pose.get(pair.start), pose.get(pair.end)) {
        (Some(start), Some(end)) => (end - start).normalize_or_zero(),
        _ => Vec3::ZERO,
    }));

    for (pair, &direction) in pairs.iter().zip(directions.iter()) {
        let (Some(start), Some(end)) = (pose.get(pair.start), pose.get(pair.end)) else {
            log::warn!(
                "Skipping bone pair {} -> {}: joint missing",
                pair.start.name(),
                pair.end.name()
            );
            outcome.skipped += 1;
            continue;
        };

        let pair_weight = (weight * sections.get(pair.section)).min(1.0);
        if pair_weight <= 0.0 {
            continue;
        }

        let target = start + (direction * pair.rest_distance) * scale;
        pose.positions[pair.end.index()] = end.lerp(target, pair_weight);
        outcome.applied += 1;
    }

    outcome
}
