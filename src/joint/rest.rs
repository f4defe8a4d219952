use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::id::JointId;
use super::mask::JointMask;
use super::pose::{JointHandle, SkeletonPose};
use crate::error::Result;
use crate::skeleton_constants::DEFAULT_REST_POSITIONS;

/// Bind-time sample of the skeleton (T-pose).
///
/// Only positions, presence, and scale matter at bind: rest distances and
/// proportions are derived from them once and never re-measured.
#[derive(Debug, Clone, PartialEq)]
pub struct RestPose {
    pub pose: SkeletonPose,
}

impl Default for RestPose {
    fn default() -> Self {
        Self::default_humanoid()
    }
}

impl RestPose {
    /// Built-in humanoid T-pose with every joint present
    pub fn default_humanoid() -> Self {
        Self {
            pose: SkeletonPose::from_positions(DEFAULT_REST_POSITIONS),
        }
    }

    /// Sample the rest pose from a host skeleton that is currently in T-pose
    pub fn sample<H: JointHandle + ?Sized>(host: &H) -> Self {
        let mut pose = SkeletonPose::empty();
        pose.capture_from(host);
        Self { pose }
    }

    /// Return a new rest pose without an optional joint
    pub fn without_joint(self, joint: JointId) -> Self {
        Self {
            pose: self.pose.without_joint(joint),
        }
    }

    /// Return a copy uniformly scaled about the origin, recording the new lossy scale
    pub fn scaled(&self, factor: f32) -> Self {
        let mut pose = self.pose.clone();
        for p in pose.positions.iter_mut() {
            *p *= factor;
        }
        pose.lossy_scale *= factor;
        Self { pose }
    }

    #[inline]
    pub fn present(&self) -> JointMask {
        self.pose.present
    }

    #[inline]
    pub fn position(&self, joint: JointId) -> Option<Vec3> {
        self.pose.get(joint)
    }

    #[inline]
    pub fn lossy_scale(&self) -> Vec3 {
        self.pose.lossy_scale
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let rest_json: RestPoseJson = serde_json::from_str(json)?;
        Ok(rest_json.to_rest_pose())
    }

    /// Convert to JSON string
    pub fn to_json_string(&self) -> Result<String> {
        let joints = self
            .pose
            .present
            .iter()
            .map(|joint| (joint, self.pose.positions[joint.index()].to_array()))
            .collect();

        let json = RestPoseJson {
            name: None,
            lossy_scale: self.pose.lossy_scale.to_array(),
            joints,
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// JSON format for a rest pose / rig preset
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestPoseJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_scale")]
    pub lossy_scale: [f32; 3],

    /// World position per joint; absent keys are missing joints
    pub joints: BTreeMap<JointId, [f32; 3]>,
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl RestPoseJson {
    pub fn to_rest_pose(&self) -> RestPose {
        let mut pose = SkeletonPose::empty();
        for (&joint, &[x, y, z]) in &self.joints {
            pose = pose.with_joint(joint, Vec3::new(x, y, z));
        }
        pose.lossy_scale = Vec3::from_array(self.lossy_scale);
        RestPose { pose }
    }
}
