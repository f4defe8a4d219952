//! Packed joint buffer shared with the host.
//!
//! The host hands over one flat `f32` buffer per frame: for every `JointId`
//! in index order, position xyz followed by rotation xyzw. The buffer is
//! reinterpreted in place as `JointSample`s, so reading and writing back
//! costs no copies.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use static_assertions::const_assert_eq;

use crate::error::{DeformError, Result};
use crate::joint::{JointHandle, JointId, JointMask};
use crate::EPSILON;

/// One joint's world transform as the host lays it out.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct JointSample {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

const_assert_eq!(
    std::mem::size_of::<JointSample>(),
    JointSample::FLOATS * std::mem::size_of::<f32>()
);

impl JointSample {
    pub const FLOATS: usize = 7;

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position: position.to_array(),
            rotation: rotation.to_array(),
        }
    }
}

/// `JointHandle` over a host-owned packed buffer.
pub struct PackedFrame<'a> {
    samples: &'a mut [JointSample],
    present: JointMask,
    lossy_scale: Vec3,
}

impl<'a> PackedFrame<'a> {
    /// Floats in a full frame
    pub const FLOATS: usize = JointId::COUNT * JointSample::FLOATS;

    /// Wrap a host buffer. Fails with `FrameSize` unless it holds exactly one
    /// sample per joint.
    pub fn new(buffer: &'a mut [f32], present: JointMask, lossy_scale: Vec3) -> Result<Self> {
        let size_error = DeformError::FrameSize {
            expected: Self::FLOATS,
            actual: buffer.len(),
        };
        if buffer.len() != Self::FLOATS {
            return Err(size_error);
        }
        let samples = bytemuck::try_cast_slice_mut(buffer).map_err(|_| size_error)?;
        Ok(Self {
            samples,
            present,
            lossy_scale,
        })
    }

    #[inline]
    pub fn sample(&self, joint: JointId) -> &JointSample {
        &self.samples[joint.index()]
    }
}

impl JointHandle for PackedFrame<'_> {
    fn has_joint(&self, joint: JointId) -> bool {
        self.present.contains(joint)
    }

    fn position(&self, joint: JointId) -> Vec3 {
        Vec3::from_array(self.samples[joint.index()].position)
    }

    /// A zero or near-zero host quaternion reads as identity
    fn rotation(&self, joint: JointId) -> Quat {
        let q = Quat::from_array(self.samples[joint.index()].rotation);
        if q.length_squared() < EPSILON {
            Quat::IDENTITY
        } else {
            q.normalize()
        }
    }

    fn set_position(&mut self, joint: JointId, position: Vec3) {
        self.samples[joint.index()].position = position.to_array();
    }

    fn set_rotation(&mut self, joint: JointId, rotation: Quat) {
        self.samples[joint.index()].rotation = rotation.to_array();
    }

    fn lossy_scale(&self) -> Vec3 {
        self.lossy_scale
    }
}

/// Pack a pose into a fresh host-layout buffer
pub fn pack_pose<H: JointHandle + ?Sized>(pose: &H) -> Vec<f32> {
    let samples: Vec<JointSample> = JointId::ALL
        .into_iter()
        .map(|joint| {
            if pose.has_joint(joint) {
                JointSample::new(pose.position(joint), pose.rotation(joint))
            } else {
                JointSample::new(Vec3::ZERO, Quat::IDENTITY)
            }
        })
        .collect();
    bytemuck::cast_slice::<JointSample, f32>(&samples).to_vec()
}
