use super::id::JointId;
use super::mask::JointMask;
use glam::{Quat, Vec3};

/// Read/write access to the joints of an external skeleton.
///
/// The correction pipeline only ever talks to the host through this trait:
/// it reads the current pose before a frame and writes corrected values back
/// after it. `SkeletonPose` implements it for in-memory snapshots, and the
/// host adapter implements it over whatever storage the host owns.
pub trait JointHandle {
    /// Whether the host skeleton provides this joint
    fn has_joint(&self, joint: JointId) -> bool;

    /// World position of a joint
    fn position(&self, joint: JointId) -> Vec3;

    /// World rotation of a joint
    fn rotation(&self, joint: JointId) -> Quat;

    fn set_position(&mut self, joint: JointId, position: Vec3);

    fn set_rotation(&mut self, joint: JointId, rotation: Quat);

    /// Current lossy scale of the skeleton root
    fn lossy_scale(&self) -> Vec3 {
        Vec3::ONE
    }
}

/// In-memory snapshot of a skeleton's world transforms.
///
/// Joints not in `present` keep their slot but are never read or written by
/// the correction stages.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonPose {
    pub positions: [Vec3; JointId::COUNT],
    pub rotations: [Quat; JointId::COUNT],
    pub present: JointMask,
    pub lossy_scale: Vec3,
}

impl Default for SkeletonPose {
    fn default() -> Self {
        Self::empty()
    }
}

impl SkeletonPose {
    /// Pose with no joints present
    pub fn empty() -> Self {
        Self {
            positions: [Vec3::ZERO; JointId::COUNT],
            rotations: [Quat::IDENTITY; JointId::COUNT],
            present: JointMask::empty(),
            lossy_scale: Vec3::ONE,
        }
    }

    /// Pose with the given positions, identity rotations, and every joint present
    pub fn from_positions(positions: [Vec3; JointId::COUNT]) -> Self {
        Self {
            positions,
            present: JointMask::all(),
            ..Self::empty()
        }
    }

    /// Return a new pose with a joint placed and marked present
    pub fn with_joint(mut self, joint: JointId, position: Vec3) -> Self {
        self.positions[joint.index()] = position;
        self.present = self.present.with(joint);
        self
    }

    /// Return a new pose with a joint removed
    pub fn without_joint(mut self, joint: JointId) -> Self {
        self.present = self.present.without(joint);
        self
    }

    #[inline]
    pub fn get(&self, joint: JointId) -> Option<Vec3> {
        self.present
            .contains(joint)
            .then(|| self.positions[joint.index()])
    }

    /// Overwrite this snapshot with the host's current pose.
    ///
    /// Reuses the existing arrays so per-frame capture does not allocate.
    pub fn capture_from<H: JointHandle + ?Sized>(&mut self, host: &H) {
        let mut present = JointMask::empty();
        for joint in JointId::ALL {
            if host.has_joint(joint) {
                self.positions[joint.index()] = host.position(joint);
                self.rotations[joint.index()] = host.rotation(joint);
                present = present.with(joint);
            }
        }
        self.present = present;
        self.lossy_scale = host.lossy_scale();
    }

    /// Write transforms of the joints in `mask` (and present here) back to the host
    pub fn write_to<H: JointHandle + ?Sized>(&self, host: &mut H, mask: JointMask) {
        for joint in self.present.intersect(mask).iter() {
            if host.has_joint(joint) {
                host.set_position(joint, self.positions[joint.index()]);
                host.set_rotation(joint, self.rotations[joint.index()]);
            }
        }
    }

    /// Translate a joint and every present descendant in `carry` by `delta`.
    pub fn translate_subtree(&mut self, joint: JointId, delta: Vec3, carry: JointMask) {
        if delta == Vec3::ZERO {
            return;
        }
        let moved = JointMask::subtree(joint)
            .intersect(carry.with(joint))
            .intersect(self.present);
        for j in moved.iter() {
            self.positions[j.index()] += delta;
        }
    }

    /// Rotate a joint in world space and carry its present descendants rigidly
    /// around the joint's position.
    pub fn rotate_subtree(&mut self, joint: JointId, delta: Quat) {
        if delta == Quat::IDENTITY {
            return;
        }
        let pivot = self.positions[joint.index()];
        let moved = JointMask::subtree(joint).intersect(self.present);
        for j in moved.iter() {
            let i = j.index();
            if j != joint {
                self.positions[i] = pivot + delta * (self.positions[i] - pivot);
            }
            self.rotations[i] = (delta * self.rotations[i]).normalize();
        }
    }
}

impl JointHandle for SkeletonPose {
    fn has_joint(&self, joint: JointId) -> bool {
        self.present.contains(joint)
    }

    fn position(&self, joint: JointId) -> Vec3 {
        self.positions[joint.index()]
    }

    fn rotation(&self, joint: JointId) -> Quat {
        self.rotations[joint.index()]
    }

    fn set_position(&mut self, joint: JointId, position: Vec3) {
        self.positions[joint.index()] = position;
    }

    fn set_rotation(&mut self, joint: JointId, rotation: Quat) {
        self.rotations[joint.index()] = rotation;
    }

    fn lossy_scale(&self) -> Vec3 {
        self.lossy_scale
    }
}
