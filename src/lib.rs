//! Skeletal Deform - proportion-preserving correction for retargeted humanoids
//!
//! Takes a humanoid pose produced by body tracking or retargeting and pulls
//! it back toward the rest proportions of the avatar it drives: bone lengths,
//! spine shape, shoulders, feet and hands, with CCD or FABRIK for the arms.

pub mod auxiliary;
#[cfg(target_arch = "wasm32")]
mod bench;
#[cfg(target_arch = "wasm32")]
pub mod bindings;
pub mod chain;
pub mod error;
pub mod frame;
pub mod ik;
pub mod joint;
pub mod math;
pub mod pipeline;
pub mod proportion;
pub mod settings;
pub mod skeleton_constants;
pub mod spine;
pub mod state;

#[cfg(target_arch = "wasm32")]
pub use bench::run_benchmarks;

// Re-exports for WASM API
#[cfg(target_arch = "wasm32")]
pub use bindings::{create_rig, destroy_rig, evaluate_rig, frame_len, init};

pub use chain::{BodySection, BoneChain, BonePair, RigDefinition};
pub use error::{DeformError, Result};
pub use frame::{JointSample, PackedFrame};
pub use glam::{Quat, Vec3};
pub use ik::{solve_ccd, solve_fabrik, FabrikScratch, IkJoint, IkSettings, IkSolverKind};
pub use joint::{JointHandle, JointId, JointMask, RestPose, Side, SkeletonPose};
pub use pipeline::{CorrectionStage, DeformationRig, FrameReport, StageOutcome, TrackedTargets};
pub use settings::DeformationSettings;
pub use spine::{SpineCorrection, SpineCorrectionMode, SpineTranslation};

/// Lengths and squared lengths below this are treated as zero
pub const EPSILON: f32 = 1e-6;

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;
    wasm_bindgen_test_configure!(run_in_browser);

    const COMPACT: &str = include_str!("../rigs/compact_humanoid.json");

    #[test]
    #[wasm_bindgen_test]
    fn test_compact_preset_binds_without_optional_joints() {
        let rest = RestPose::from_json(COMPACT).unwrap();
        let mut rig = DeformationRig::bind(&rest, DeformationSettings::default()).unwrap();

        let topology = &rig.definition().topology;
        assert_eq!(topology.spine, vec![JointId::Hips, JointId::Spine, JointId::Neck, JointId::Head]);
        assert_eq!(topology.arm_attachment(Side::Left), JointId::Spine);
        assert!(rig.definition().toes.iter().all(Option::is_none));

        // host at the same 0.8 scale the preset was sampled at: rest pose is a fixed point
        let mut host = rest.pose.clone();
        let report = rig.evaluate(&mut host, 1.0);
        assert_eq!(report.total_skipped(), 0);
        for joint in rest.present().iter() {
            assert!(
                host.position(joint).distance(rest.pose.position(joint)) < 1e-5,
                "{:?} moved",
                joint
            );
        }
    }
}
