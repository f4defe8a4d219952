use super::id::{JointId, Side};
use super::mask::JointMask;
use crate::error::{DeformError, Result};

/// Which joints a bound skeleton actually has, resolved once at bind time.
///
/// Chains here only list present joints, so per-frame code never has to
/// re-check whether an optional bone (chest, shoulders, toes) exists.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonTopology {
    pub present: JointMask,
    /// Hips to head
    pub spine: Vec<JointId>,
    /// Shoulder (if present) to hand, indexed by `side_index`
    pub arms: [Vec<JointId>; 2],
    /// Spine joint each arm hangs from
    pub arm_attachments: [JointId; 2],
    /// Upper leg to toes (if present)
    pub legs: [Vec<JointId>; 2],
}

#[inline]
pub const fn side_index(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

impl SkeletonTopology {
    /// Resolve chains from the set of joints a rig provides.
    ///
    /// Fails with `MissingJoint` if a required joint is absent.
    pub fn from_mask(present: JointMask) -> Result<Self> {
        if let Some(missing) = JointId::ALL
            .into_iter()
            .find(|joint| !joint.is_optional() && !present.contains(*joint))
        {
            return Err(DeformError::MissingJoint(missing));
        }

        for joint in JointId::ALL.into_iter().filter(|j| j.is_optional()) {
            if !present.contains(joint) {
                log::debug!("Optional joint {} not present on rig", joint.name());
            }
        }

        let spine: Vec<JointId> = JointId::SPINE
            .into_iter()
            .filter(|joint| present.contains(*joint))
            .collect();

        let chain = |joints: [JointId; 4]| -> Vec<JointId> {
            joints
                .into_iter()
                .filter(|joint| present.contains(*joint))
                .collect()
        };

        let arms = [chain(JointId::arm(Side::Left)), chain(JointId::arm(Side::Right))];
        let legs = [chain(JointId::leg(Side::Left)), chain(JointId::leg(Side::Right))];

        let attachment = |arm: &[JointId]| -> Result<JointId> {
            let root = arm[0];
            present
                .nearest_ancestor(root)
                .ok_or(DeformError::MissingJoint(root))
        };
        let arm_attachments = [attachment(&arms[0])?, attachment(&arms[1])?];

        Ok(Self {
            present,
            spine,
            arms,
            arm_attachments,
            legs,
        })
    }

    #[inline]
    pub fn arm(&self, side: Side) -> &[JointId] {
        &self.arms[side_index(side)]
    }

    #[inline]
    pub fn leg(&self, side: Side) -> &[JointId] {
        &self.legs[side_index(side)]
    }

    #[inline]
    pub fn arm_attachment(&self, side: Side) -> JointId {
        self.arm_attachments[side_index(side)]
    }

    /// Both legs as a mask
    pub fn leg_mask(&self) -> JointMask {
        self.legs.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_rig_topology() {
        let topology = SkeletonTopology::from_mask(JointMask::all()).unwrap();
        assert_eq!(topology.spine.len(), 6);
        assert_eq!(topology.arm(Side::Left)[0], JointId::LeftShoulder);
        assert_eq!(topology.arm_attachment(Side::Right), JointId::UpperChest);
        assert_eq!(topology.leg(Side::Left).last(), Some(&JointId::LeftToes));
    }

    #[test]
    fn test_optional_joints_are_dropped_from_chains() {
        let present = JointMask::all()
            .without(JointId::Chest)
            .without(JointId::UpperChest)
            .without(JointId::LeftShoulder)
            .without(JointId::RightToes);
        let topology = SkeletonTopology::from_mask(present).unwrap();

        assert_eq!(
            topology.spine,
            vec![JointId::Hips, JointId::Spine, JointId::Neck, JointId::Head]
        );
        assert_eq!(topology.arm(Side::Left)[0], JointId::LeftUpperArm);
        assert_eq!(topology.arm_attachment(Side::Left), JointId::Spine);
        assert_eq!(topology.arm(Side::Right)[0], JointId::RightShoulder);
        assert_eq!(topology.leg(Side::Right).len(), 3);
    }

    #[test]
    fn test_missing_required_joint_fails() {
        let present = JointMask::all().without(JointId::LeftLowerArm);
        let err = SkeletonTopology::from_mask(present).unwrap_err();
        assert!(matches!(err, DeformError::MissingJoint(JointId::LeftLowerArm)));
    }
}
