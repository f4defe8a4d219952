//! Vector and quaternion helpers shared by the correction stages.
//!
//! Degenerate inputs (zero-length vectors) resolve to identity rotations or
//! zero offsets instead of producing NaN.

pub use glam::{Quat, Vec3};

use crate::EPSILON;

/// Extension trait for the few vector operations glam does not provide.
pub trait VecExt {
    /// Component of `self` perpendicular to a unit `normal`
    fn project_on_plane(self, normal: Vec3) -> Vec3;

    /// Component-wise division falling back to `Vec3::ONE` when any divisor is zero
    fn safe_div(self, divisor: Vec3) -> Vec3;

    /// Step toward `target` by at most `max_delta`
    fn move_towards(self, target: Vec3, max_delta: f32) -> Vec3;
}

impl VecExt for Vec3 {
    #[inline]
    fn project_on_plane(self, normal: Vec3) -> Vec3 {
        self - normal * self.dot(normal)
    }

    #[inline]
    fn safe_div(self, divisor: Vec3) -> Vec3 {
        if divisor.x == 0.0 || divisor.y == 0.0 || divisor.z == 0.0 {
            Vec3::ONE
        } else {
            self / divisor
        }
    }

    fn move_towards(self, target: Vec3, max_delta: f32) -> Vec3 {
        let to_target = target - self;
        let distance = to_target.length();
        if distance <= max_delta || distance < EPSILON {
            target
        } else {
            self + to_target / distance * max_delta
        }
    }
}

/// Per-axis ratio of the current lossy scale to the bind-time lossy scale.
#[inline]
pub fn scale_factor(current: Vec3, bind: Vec3) -> Vec3 {
    current.safe_div(bind)
}

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// Either vector may be unnormalized; a near-zero input yields identity.
pub fn safe_rotation_arc(from: Vec3, to: Vec3) -> Quat {
    let from = from.normalize_or_zero();
    let to = to.normalize_or_zero();
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(from, to)
}

/// Signed angle in radians from `from` to `to`, measured about `axis`.
///
/// Both vectors are flattened onto the plane perpendicular to `axis` first.
/// Returns 0 if either flattened vector is degenerate.
pub fn signed_angle_about(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return 0.0;
    }
    let a = from.project_on_plane(axis);
    let b = to.project_on_plane(axis);
    if a.length_squared() < EPSILON || b.length_squared() < EPSILON {
        return 0.0;
    }
    let sin = a.cross(b).dot(axis);
    let cos = a.dot(b);
    sin.atan2(cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_scale_factor_zero_divisor_defaults_to_one() {
        assert_eq!(
            scale_factor(Vec3::splat(2.0), Vec3::new(1.0, 0.0, 1.0)),
            Vec3::ONE
        );
        assert_eq!(
            scale_factor(Vec3::new(2.0, 3.0, 4.0), Vec3::splat(2.0)),
            Vec3::new(1.0, 1.5, 2.0)
        );
    }

    #[test]
    fn test_move_towards_clamps_step() {
        let p = Vec3::ZERO.move_towards(Vec3::new(10.0, 0.0, 0.0), 0.5);
        assert_eq!(p, Vec3::new(0.5, 0.0, 0.0));

        let q = Vec3::ZERO.move_towards(Vec3::new(0.2, 0.0, 0.0), 0.5);
        assert_eq!(q, Vec3::new(0.2, 0.0, 0.0));
    }

    #[test]
    fn test_safe_rotation_arc_degenerate_is_identity() {
        assert_eq!(safe_rotation_arc(Vec3::ZERO, Vec3::X), Quat::IDENTITY);
        assert_eq!(safe_rotation_arc(Vec3::X, Vec3::ZERO), Quat::IDENTITY);

        let q = safe_rotation_arc(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0));
        assert!((q * Vec3::X).distance(Vec3::Y) < 1e-5);
    }

    #[test]
    fn test_signed_angle_about_up() {
        let angle = signed_angle_about(Vec3::Z, Vec3::X, Vec3::Y);
        assert!((angle - FRAC_PI_2).abs() < 1e-5, "got {}", angle);

        let back = signed_angle_about(Vec3::X, Vec3::Z, Vec3::Y);
        assert!((back + FRAC_PI_2).abs() < 1e-5, "got {}", back);

        assert_eq!(signed_angle_about(Vec3::Y, Vec3::X, Vec3::Y), 0.0);
    }
}
