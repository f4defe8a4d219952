use super::id::{JointId, JOINT_HIERARCHY};

/// Set of joints, one bit per `JointId` index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JointMask(u32);

const fn compute_descendant_masks() -> [u32; JointId::COUNT] {
    let mut masks = [0u32; JointId::COUNT];
    let mut i = 0;
    while i < JointId::COUNT {
        // Mask for joint 'i' (the ancestor): walk every other joint 'j' up
        // to the root and record it when 'i' shows up on the way.
        let mut mask: u32 = 0;
        let mut j = 0;

        while j < JointId::COUNT {
            if j == i {
                mask |= 1 << j;
            } else {
                let mut curr = j;
                let mut depth = 0;

                // Depth bounded by hierarchy size
                while depth < JointId::COUNT {
                    match JOINT_HIERARCHY[curr] {
                        Some(parent) => {
                            if parent.index() == i {
                                mask |= 1 << j;
                                break;
                            }
                            curr = parent.index();
                        }
                        None => break,
                    }
                    depth += 1;
                }
            }
            j += 1;
        }
        masks[i] = mask;
        i += 1;
    }
    masks
}

const DESCENDANT_MASKS: [u32; JointId::COUNT] = compute_descendant_masks();

impl JointMask {
    /// Mask with every joint set
    pub const fn all() -> Self {
        Self((1 << JointId::COUNT) - 1)
    }

    /// Empty mask
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask from raw bits as sent by a host; bits past the last joint are dropped
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Joint and everything below it in the hierarchy
    #[inline]
    pub const fn subtree(joint: JointId) -> Self {
        Self(DESCENDANT_MASKS[joint.index()])
    }

    #[inline]
    pub fn contains(&self, joint: JointId) -> bool {
        (self.0 & (1 << joint.index())) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Return new mask with a joint added
    #[inline]
    pub fn with(self, joint: JointId) -> Self {
        Self(self.0 | (1 << joint.index()))
    }

    /// Return new mask with a joint removed
    #[inline]
    pub fn without(self, joint: JointId) -> Self {
        Self(self.0 & !(1 << joint.index()))
    }

    #[inline]
    pub fn intersect(self, other: JointMask) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub fn difference(self, other: JointMask) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Joints in the mask, in topological order
    pub fn iter(self) -> impl Iterator<Item = JointId> {
        JointId::ALL.into_iter().filter(move |joint| self.contains(*joint))
    }

    /// Nearest ancestor of `joint` contained in this mask
    pub fn nearest_ancestor(&self, joint: JointId) -> Option<JointId> {
        let mut current = joint.parent();
        while let Some(parent) = current {
            if self.contains(parent) {
                return Some(parent);
            }
            current = parent.parent();
        }
        None
    }
}

impl FromIterator<JointId> for JointMask {
    fn from_iter<I: IntoIterator<Item = JointId>>(iter: I) -> Self {
        iter.into_iter().fold(JointMask::empty(), JointMask::with)
    }
}
