use serde::{Deserialize, Serialize};

/// Unique identifier for each joint in the humanoid skeleton.
/// Ordered for topological traversal (parents before children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum JointId {
    // Root
    Hips = 0,

    // Spine chain
    Spine = 1,
    Chest = 2,      // optional
    UpperChest = 3, // optional
    Neck = 4,       // optional
    Head = 5,

    // Left arm chain
    LeftShoulder = 6, // optional
    LeftUpperArm = 7,
    LeftLowerArm = 8,
    LeftHand = 9,

    // Right arm chain
    RightShoulder = 10, // optional
    RightUpperArm = 11,
    RightLowerArm = 12,
    RightHand = 13,

    // Left leg chain
    LeftUpperLeg = 14,
    LeftLowerLeg = 15,
    LeftFoot = 16,
    LeftToes = 17, // optional

    // Right leg chain
    RightUpperLeg = 18,
    RightLowerLeg = 19,
    RightFoot = 20,
    RightToes = 21, // optional
}

/// Left or right half of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

impl JointId {
    /// Total number of joints in the skeleton
    pub const COUNT: usize = 22;

    /// All joint IDs in topological order (parents before children)
    pub const ALL: [JointId; Self::COUNT] = [
        JointId::Hips,
        JointId::Spine,
        JointId::Chest,
        JointId::UpperChest,
        JointId::Neck,
        JointId::Head,
        JointId::LeftShoulder,
        JointId::LeftUpperArm,
        JointId::LeftLowerArm,
        JointId::LeftHand,
        JointId::RightShoulder,
        JointId::RightUpperArm,
        JointId::RightLowerArm,
        JointId::RightHand,
        JointId::LeftUpperLeg,
        JointId::LeftLowerLeg,
        JointId::LeftFoot,
        JointId::LeftToes,
        JointId::RightUpperLeg,
        JointId::RightLowerLeg,
        JointId::RightFoot,
        JointId::RightToes,
    ];

    /// Spine joints from root to tip, including optional ones
    pub const SPINE: [JointId; 6] = [
        JointId::Hips,
        JointId::Spine,
        JointId::Chest,
        JointId::UpperChest,
        JointId::Neck,
        JointId::Head,
    ];

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parent joint in the full hierarchy (None for hips)
    #[inline]
    pub const fn parent(self) -> Option<JointId> {
        JOINT_HIERARCHY[self.index()]
    }

    /// Snake-case name, matching the rig preset JSON keys
    pub const fn name(self) -> &'static str {
        crate::skeleton_constants::JOINT_PARENTS[self.index()].0
    }

    /// Whether a rig may omit this joint
    pub const fn is_optional(self) -> bool {
        matches!(
            self,
            JointId::Chest
                | JointId::UpperChest
                | JointId::Neck
                | JointId::LeftShoulder
                | JointId::RightShoulder
                | JointId::LeftToes
                | JointId::RightToes
        )
    }

    /// Shoulder, upper arm, lower arm, hand for one side
    pub const fn arm(side: Side) -> [JointId; 4] {
        match side {
            Side::Left => [
                JointId::LeftShoulder,
                JointId::LeftUpperArm,
                JointId::LeftLowerArm,
                JointId::LeftHand,
            ],
            Side::Right => [
                JointId::RightShoulder,
                JointId::RightUpperArm,
                JointId::RightLowerArm,
                JointId::RightHand,
            ],
        }
    }

    /// Upper leg, lower leg, foot, toes for one side
    pub const fn leg(side: Side) -> [JointId; 4] {
        match side {
            Side::Left => [
                JointId::LeftUpperLeg,
                JointId::LeftLowerLeg,
                JointId::LeftFoot,
                JointId::LeftToes,
            ],
            Side::Right => [
                JointId::RightUpperLeg,
                JointId::RightLowerLeg,
                JointId::RightFoot,
                JointId::RightToes,
            ],
        }
    }
}

/// Parent of each joint, indexed by `JointId::index()`.
pub const JOINT_HIERARCHY: [Option<JointId>; JointId::COUNT] = [
    None,
    Some(JointId::Hips),
    Some(JointId::Spine),
    Some(JointId::Chest),
    Some(JointId::UpperChest),
    Some(JointId::Neck),
    Some(JointId::UpperChest),
    Some(JointId::LeftShoulder),
    Some(JointId::LeftUpperArm),
    Some(JointId::LeftLowerArm),
    Some(JointId::UpperChest),
    Some(JointId::RightShoulder),
    Some(JointId::RightUpperArm),
    Some(JointId::RightLowerArm),
    Some(JointId::Hips),
    Some(JointId::LeftUpperLeg),
    Some(JointId::LeftLowerLeg),
    Some(JointId::LeftFoot),
    Some(JointId::Hips),
    Some(JointId::RightUpperLeg),
    Some(JointId::RightLowerLeg),
    Some(JointId::RightFoot),
];
