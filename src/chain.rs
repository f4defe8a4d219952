//! Bone pairs and chains measured once from the rest pose.
//!
//! ## Key Concepts
//!
//! - **BonePair**: a parent/child joint pair with its immutable rest distance
//! - **BoneChain**: consecutive pairs from a chain root (hips) to its tip (head, hand, foot)
//! - **RigDefinition**: every chain of a bound skeleton plus the body-height totals

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{DeformError, Result};
use crate::joint::{JointId, RestPose, Side, SkeletonTopology};
use crate::EPSILON;

/// Body region a bone pair belongs to; each region has its own proportion weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySection {
    Spine,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BodySection {
    pub const fn arm(side: Side) -> Self {
        match side {
            Side::Left => BodySection::LeftArm,
            Side::Right => BodySection::RightArm,
        }
    }

    pub const fn leg(side: Side) -> Self {
        match side {
            Side::Left => BodySection::LeftLeg,
            Side::Right => BodySection::RightLeg,
        }
    }
}

/// Two joints whose distance is held at its rest value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePair {
    pub start: JointId,
    pub end: JointId,
    /// Distance between start and end in the rest pose (never negative)
    pub rest_distance: f32,
    /// Share of hips-to-head plus hips-to-foot
    pub height_proportion: f32,
    /// Share of the owning chain's total rest length
    pub limb_proportion: f32,
    pub section: BodySection,
}

impl BonePair {
    /// Pair with no proportions attached; chains fill those in
    pub fn new(start: JointId, end: JointId, rest_distance: f32, section: BodySection) -> Self {
        Self {
            start,
            end,
            rest_distance,
            height_proportion: 0.0,
            limb_proportion: 0.0,
            section,
        }
    }
}

/// Joints from root (index 0) to tip, with one pair per consecutive joint.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneChain {
    pub joints: Vec<JointId>,
    pub pairs: Vec<BonePair>,
    /// Cumulative limb proportion at each joint; 0 at the root, 1 at the tip
    pub cumulative: Vec<f32>,
    pub total_length: f32,
}

impl BoneChain {
    /// Build a chain from explicit rest distances.
    ///
    /// `body_height` is the hips-to-head plus hips-to-foot rest length used for
    /// height proportions; pass 0 to leave them at 0.
    pub fn from_rest_distances(
        joints: Vec<JointId>,
        distances: &[f32],
        section: BodySection,
        body_height: f32,
    ) -> Result<Self> {
        if joints.len() < 2 {
            return Err(DeformError::ChainTooShort {
                len: joints.len(),
                min: 2,
            });
        }
        if distances.len() != joints.len() - 1 {
            return Err(DeformError::LengthMismatch {
                joints: joints.len(),
                distances: distances.len(),
            });
        }
        if let Some(bad) = distances.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(DeformError::InvalidRestPose(format!(
                "rest distance {} in {:?} chain",
                bad, section
            )));
        }

        let total_length: f32 = distances.iter().sum();
        let mut pairs = Vec::with_capacity(distances.len());
        let mut cumulative = Vec::with_capacity(joints.len());
        cumulative.push(0.0);

        let mut running = 0.0;
        for (window, &rest) in joints.windows(2).zip(distances) {
            let mut pair = BonePair::new(window[0], window[1], rest, section);
            if total_length > EPSILON {
                pair.limb_proportion = rest / total_length;
            }
            if body_height > EPSILON {
                pair.height_proportion = rest / body_height;
            }
            running += pair.limb_proportion;
            cumulative.push(running);
            pairs.push(pair);
        }

        Ok(Self {
            joints,
            pairs,
            cumulative,
            total_length,
        })
    }

    /// Build a chain by measuring joint distances in the rest pose
    pub fn from_rest_pose(
        joints: Vec<JointId>,
        rest: &RestPose,
        section: BodySection,
        body_height: f32,
    ) -> Result<Self> {
        let distances = measure(&joints, rest)?;
        Self::from_rest_distances(joints, &distances, section, body_height)
    }

    #[inline]
    pub fn root(&self) -> JointId {
        self.joints[0]
    }

    #[inline]
    pub fn tip(&self) -> JointId {
        self.joints[self.joints.len() - 1]
    }

    /// Cumulative limb proportion at a joint, if it is on this chain
    pub fn cumulative_at(&self, joint: JointId) -> Option<f32> {
        self.joints
            .iter()
            .position(|j| *j == joint)
            .map(|i| self.cumulative[i])
    }
}

fn measure(joints: &[JointId], rest: &RestPose) -> Result<Vec<f32>> {
    let positions = joints
        .iter()
        .map(|&joint| rest.position(joint).ok_or(DeformError::MissingJoint(joint)))
        .collect::<Result<Vec<Vec3>>>()?;
    Ok(positions.windows(2).map(|w| w[0].distance(w[1])).collect())
}

/// Every chain of a bound skeleton, measured from its rest pose.
#[derive(Debug, Clone)]
pub struct RigDefinition {
    pub topology: SkeletonTopology,
    pub spine: BoneChain,
    /// Attachment spine joint to hand, indexed like `SkeletonTopology::arms`
    pub arms: [BoneChain; 2],
    /// Hips to foot
    pub legs: [BoneChain; 2],
    /// Foot to toes, when the rig has toes
    pub toes: [Option<BoneChain>; 2],
    pub hips_to_head: f32,
    pub hips_to_foot: f32,
    pub bind_scale: Vec3,
    /// All pairs, spine first then limbs, each chain root to tip
    pairs: Vec<BonePair>,
}

impl RigDefinition {
    /// Measure rest distances and proportions for every chain.
    pub fn bind(rest: &RestPose) -> Result<Self> {
        let topology = SkeletonTopology::from_mask(rest.present())?;

        let hips_to_head = measure(&topology.spine, rest)?.iter().sum::<f32>();
        let leg_joints = |side: Side| -> Vec<JointId> {
            std::iter::once(JointId::Hips)
                .chain(
                    topology
                        .leg(side)
                        .iter()
                        .copied()
                        .filter(|j| !matches!(j, JointId::LeftToes | JointId::RightToes)),
                )
                .collect()
        };
        let hips_to_foot = measure(&leg_joints(Side::Left), rest)?.iter().sum::<f32>();
        let body_height = hips_to_head + hips_to_foot;
        if !body_height.is_finite() || body_height <= EPSILON {
            return Err(DeformError::InvalidRestPose(format!(
                "body height {} is degenerate",
                body_height
            )));
        }

        let spine = BoneChain::from_rest_pose(
            topology.spine.clone(),
            rest,
            BodySection::Spine,
            body_height,
        )?;

        let arm_chain = |side: Side| -> Result<BoneChain> {
            let joints = std::iter::once(topology.arm_attachment(side))
                .chain(topology.arm(side).iter().copied())
                .collect();
            BoneChain::from_rest_pose(joints, rest, BodySection::arm(side), body_height)
        };
        let leg_chain = |side: Side| -> Result<BoneChain> {
            BoneChain::from_rest_pose(leg_joints(side), rest, BodySection::leg(side), body_height)
        };
        let toe_chain = |side: Side| -> Result<Option<BoneChain>> {
            let [_, _, foot, toes] = JointId::leg(side);
            if !topology.present.contains(toes) {
                return Ok(None);
            }
            BoneChain::from_rest_pose(vec![foot, toes], rest, BodySection::leg(side), body_height)
                .map(Some)
        };

        let arms = [arm_chain(Side::Left)?, arm_chain(Side::Right)?];
        let legs = [leg_chain(Side::Left)?, leg_chain(Side::Right)?];
        let toes = [toe_chain(Side::Left)?, toe_chain(Side::Right)?];

        let pairs = spine
            .pairs
            .iter()
            .chain(arms.iter().flat_map(|c| c.pairs.iter()))
            .chain(
                legs.iter()
                    .zip(toes.iter())
                    .flat_map(|(leg, toe)| leg.pairs.iter().chain(toe.iter().flat_map(|t| t.pairs.iter()))),
            )
            .copied()
            .collect();

        log::info!(
            "Bound rig: {} joints, {} bone pairs, hips-to-head {:.3}m, hips-to-foot {:.3}m",
            topology.present.len(),
            spine.pairs.len()
                + arms.iter().map(|c| c.pairs.len()).sum::<usize>()
                + legs.iter().map(|c| c.pairs.len()).sum::<usize>(),
            hips_to_head,
            hips_to_foot
        );

        Ok(Self {
            topology,
            spine,
            arms,
            legs,
            toes,
            hips_to_head,
            hips_to_foot,
            bind_scale: rest.lossy_scale(),
            pairs,
        })
    }

    /// Bone pairs in proportion-enforcement order
    #[inline]
    pub fn pairs(&self) -> &[BonePair] {
        &self.pairs
    }

    #[inline]
    pub fn arm(&self, side: Side) -> &BoneChain {
        &self.arms[crate::joint::side_index(side)]
    }

    #[inline]
    pub fn leg(&self, side: Side) -> &BoneChain {
        &self.legs[crate::joint::side_index(side)]
    }

    #[inline]
    pub fn body_height(&self) -> f32 {
        self.hips_to_head + self.hips_to_foot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limb_proportions_sum_to_one() {
        let rig = RigDefinition::bind(&RestPose::default_humanoid()).unwrap();
        for chain in [&rig.spine, rig.arm(Side::Left), rig.leg(Side::Right)] {
            let sum: f32 = chain.pairs.iter().map(|p| p.limb_proportion).sum();
            assert!((sum - 1.0).abs() < 1e-5, "{:?} sums to {}", chain.joints, sum);
            assert!((chain.cumulative.last().unwrap() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_height_proportions_cover_spine_and_one_leg() {
        let rig = RigDefinition::bind(&RestPose::default_humanoid()).unwrap();
        let sum: f32 = rig
            .spine
            .pairs
            .iter()
            .chain(rig.leg(Side::Left).pairs.iter())
            .map(|p| p.height_proportion)
            .sum();
        assert!((sum - 1.0).abs() < 1e-5, "height proportions sum to {}", sum);
        assert!((rig.hips_to_head - 0.6).abs() < 1e-5);
        let pelvis = Vec3::new(0.0, 1.0, 0.0).distance(Vec3::new(-0.09, 0.94, 0.0));
        assert!((rig.hips_to_foot - (pelvis + 0.42 + 0.44)).abs() < 1e-4);
    }

    #[test]
    fn test_pairs_are_root_to_tip() {
        let rig = RigDefinition::bind(&RestPose::default_humanoid()).unwrap();
        let pairs = rig.pairs();
        assert_eq!(pairs[0].start, JointId::Hips);
        assert_eq!(pairs[0].end, JointId::Spine);
        // every pair's start was already an end earlier (or is a chain root)
        for (i, pair) in pairs.iter().enumerate() {
            let start_is_root = matches!(pair.start, JointId::Hips);
            let seen = pairs[..i].iter().any(|p| p.end == pair.start);
            assert!(start_is_root || seen, "{:?} processed before its start", pair);
        }
        assert_eq!(pairs.last().unwrap().end, JointId::RightToes);
    }

    #[test]
    fn test_arm_chain_starts_at_attachment_when_shoulder_missing() {
        let rest = RestPose::default_humanoid()
            .without_joint(JointId::LeftShoulder)
            .without_joint(JointId::UpperChest);
        let rig = RigDefinition::bind(&rest).unwrap();
        assert_eq!(
            rig.arm(Side::Left).joints,
            vec![
                JointId::Chest,
                JointId::LeftUpperArm,
                JointId::LeftLowerArm,
                JointId::LeftHand
            ]
        );
    }

    #[test]
    fn test_chain_validation() {
        let err = BoneChain::from_rest_distances(vec![JointId::Hips], &[], BodySection::Spine, 1.0)
            .unwrap_err();
        assert!(matches!(err, DeformError::ChainTooShort { len: 1, min: 2 }));

        let err = BoneChain::from_rest_distances(
            vec![JointId::Hips, JointId::Spine],
            &[0.1, 0.2],
            BodySection::Spine,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, DeformError::LengthMismatch { .. }));

        let err = BoneChain::from_rest_distances(
            vec![JointId::Hips, JointId::Spine],
            &[-0.1],
            BodySection::Spine,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, DeformError::InvalidRestPose(_)));
    }

    #[test]
    fn test_degenerate_rest_pose_is_rejected() {
        let mut rest = RestPose::default_humanoid();
        for p in rest.pose.positions.iter_mut() {
            *p = Vec3::ZERO;
        }
        assert!(matches!(
            RigDefinition::bind(&rest),
            Err(DeformError::InvalidRestPose(_))
        ));
    }
}
