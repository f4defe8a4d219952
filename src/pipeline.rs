//! Per-frame orchestration of the correction stages.
//!
//! ## Frame flow
//!
//! 1. Snapshot the host skeleton into a reusable `SkeletonPose`. The snapshot
//!    doubles as the tracked pose: hips/head/hand targets fall back to it.
//! 2. Recompute the scale factor from the host's lossy scale.
//! 3. Run the stages chosen at bind, in `CorrectionStage` order.
//! 4. Write positions and rotations back for the joints the rig was bound with.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::auxiliary::{align_feet, apply_shoulders, correct_hands};
use crate::chain::RigDefinition;
use crate::error::Result;
use crate::ik::IkScratch;
use crate::joint::{JointHandle, JointId, RestPose, SkeletonPose};
use crate::math::scale_factor;
use crate::proportion::enforce_proportions;
use crate::settings::DeformationSettings;
use crate::spine::{align_spine, correct_spine, correct_spine_translation, SpineCorrectionMode, SpineTargets};

/// Correction stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStage {
    SpineAlignment = 0,
    Proportions = 1,
    SpineTranslation = 2,
    Shoulders = 3,
    Feet = 4,
    Hands = 5,
}

impl CorrectionStage {
    pub const COUNT: usize = 6;

    pub const ALL: [CorrectionStage; Self::COUNT] = [
        CorrectionStage::SpineAlignment,
        CorrectionStage::Proportions,
        CorrectionStage::SpineTranslation,
        CorrectionStage::Shoulders,
        CorrectionStage::Feet,
        CorrectionStage::Hands,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether these settings give the stage anything to do
    pub fn is_enabled(self, settings: &DeformationSettings) -> bool {
        match self {
            CorrectionStage::SpineAlignment => {
                settings.spine_lower_alignment_weight > 0.0
                    || settings.spine_upper_alignment_weight > 0.0
            }
            CorrectionStage::Proportions => {
                let w = settings.section_weights();
                [w.spine, w.left_arm, w.right_arm, w.left_leg, w.right_leg]
                    .iter()
                    .any(|w| *w > 0.0)
            }
            CorrectionStage::SpineTranslation => {
                settings.spine_correction_weight > 0.0 && settings.spine_mode.is_active()
            }
            CorrectionStage::Shoulders => {
                settings.shoulder_height_weight > 0.0 || settings.shoulder_width_weight > 0.0
            }
            CorrectionStage::Feet => settings.align_feet_weight > 0.0,
            CorrectionStage::Hands => settings.hands_weight > 0.0,
        }
    }
}

/// Joints a stage moved and joints it had to skip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub applied: u32,
    pub skipped: u32,
}

/// What one `evaluate` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub weight: f32,
    pub outcomes: [StageOutcome; CorrectionStage::COUNT],
    /// Per hand (left, right): whether IK converged, `None` if it did not run
    pub hands_reached: [Option<bool>; 2],
}

impl FrameReport {
    #[inline]
    pub fn outcome(&self, stage: CorrectionStage) -> StageOutcome {
        self.outcomes[stage.index()]
    }

    pub fn total_skipped(&self) -> u32 {
        self.outcomes.iter().map(|o| o.skipped).sum()
    }
}

/// Tracked positions supplied by the caller for this frame.
///
/// A `None` target falls back to where the host's incoming pose has it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackedTargets {
    pub hips: Option<Vec3>,
    pub head: Option<Vec3>,
    pub left_hand: Option<Vec3>,
    pub right_hand: Option<Vec3>,
}

/// A bound rig: rest measurements, settings, and the per-frame buffers.
#[derive(Debug, Clone)]
pub struct DeformationRig {
    definition: RigDefinition,
    settings: DeformationSettings,
    stages: Vec<CorrectionStage>,
    /// Incoming host pose, read-only once captured
    tracked: SkeletonPose,
    /// Pose the stages write into
    working: SkeletonPose,
    directions: Vec<Vec3>,
    ik: IkScratch,
    /// Set once the host has been seen with joints outside the bound topology
    unbound_warned: bool,
}

impl DeformationRig {
    /// Measure the rest pose and pick the stages these settings enable.
    pub fn bind(rest: &RestPose, settings: DeformationSettings) -> Result<Self> {
        settings.validate()?;
        let definition = RigDefinition::bind(rest)?;

        let stages: Vec<CorrectionStage> = CorrectionStage::ALL
            .into_iter()
            .filter(|stage| stage.is_enabled(&settings))
            .collect();
        log::info!("Deformation stages: {:?}", stages);

        let directions = Vec::with_capacity(definition.pairs().len());
        Ok(Self {
            definition,
            settings,
            stages,
            tracked: SkeletonPose::empty(),
            working: SkeletonPose::empty(),
            directions,
            ik: IkScratch::with_capacity(3),
            unbound_warned: false,
        })
    }

    #[inline]
    pub fn definition(&self) -> &RigDefinition {
        &self.definition
    }

    #[inline]
    pub fn settings(&self) -> &DeformationSettings {
        &self.settings
    }

    #[inline]
    pub fn stages(&self) -> &[CorrectionStage] {
        &self.stages
    }

    /// Correct the host pose in place, using the incoming pose as the tracked pose
    pub fn evaluate<H: JointHandle + ?Sized>(&mut self, host: &mut H, weight: f32) -> FrameReport {
        self.evaluate_with_targets(host, weight, &TrackedTargets::default())
    }

    /// Correct the host pose in place.
    ///
    /// `weight` is clamped to `[0, 1]`; at 0 (or NaN) the host is not touched.
    ///
    /// Only joints the rig was bound with are corrected and written back. A
    /// joint the host has but the rest pose lacked is left where the host put
    /// it, even when its children move; this is logged once per rig.
    pub fn evaluate_with_targets<H: JointHandle + ?Sized>(
        &mut self,
        host: &mut H,
        weight: f32,
        targets: &TrackedTargets,
    ) -> FrameReport {
        let weight = if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) };
        let mut report = FrameReport {
            weight,
            ..FrameReport::default()
        };
        if weight <= 0.0 {
            return report;
        }

        let Self {
            definition,
            settings,
            stages,
            tracked,
            working,
            directions,
            ik,
            unbound_warned,
        } = self;

        tracked.capture_from(&*host);
        let unbound = tracked.present.difference(definition.topology.present);
        if !unbound.is_empty() && !*unbound_warned {
            log::warn!(
                "Host joints {:?} were not in the rest pose and will not be corrected",
                unbound.iter().collect::<Vec<_>>()
            );
            *unbound_warned = true;
        }
        working.clone_from(tracked);

        let scale = scale_factor(tracked.lossy_scale, definition.bind_scale);
        let fallback = |target: Option<Vec3>, joint: JointId| {
            target.unwrap_or(tracked.positions[joint.index()])
        };
        let spine_targets = SpineTargets {
            hips: fallback(targets.hips, JointId::Hips),
            head: fallback(targets.head, JointId::Head),
        };
        let hand_targets = [
            fallback(targets.left_hand, JointId::LeftHand),
            fallback(targets.right_hand, JointId::RightHand),
        ];

        for &stage in stages.iter() {
            let outcome = match stage {
                CorrectionStage::SpineAlignment => align_spine(
                    working,
                    definition,
                    settings.spine_lower_alignment_weight,
                    settings.spine_upper_alignment_weight,
                    weight,
                ),
                CorrectionStage::Proportions => enforce_proportions(
                    working,
                    definition.pairs(),
                    scale,
                    weight,
                    &settings.section_weights(),
                    directions,
                ),
                CorrectionStage::SpineTranslation => {
                    let stage_weight = settings.spine_correction_weight * weight;
                    match settings.spine_mode {
                        SpineCorrectionMode::Deformation(mode) => {
                            correct_spine(working, definition, spine_targets, mode, stage_weight)
                        }
                        SpineCorrectionMode::FullBody(mode) => correct_spine_translation(
                            working,
                            definition,
                            spine_targets,
                            mode,
                            stage_weight,
                            settings.upper_arm_compensation_weight,
                        ),
                    }
                }
                CorrectionStage::Shoulders => apply_shoulders(
                    working,
                    definition,
                    settings.shoulder_height_weight,
                    settings.shoulder_width_weight,
                    weight,
                ),
                CorrectionStage::Feet => {
                    align_feet(working, tracked, settings.align_feet_weight, weight)
                }
                CorrectionStage::Hands => {
                    let (outcome, reached) = correct_hands(
                        working,
                        hand_targets,
                        &settings.hand_settings(),
                        ik,
                        weight,
                    );
                    if reached.contains(&Some(false)) {
                        log::debug!("Hand IK did not converge: {:?}", reached);
                    }
                    report.hands_reached = reached;
                    outcome
                }
            };
            log::trace!("{:?}: {:?}", stage, outcome);
            report.outcomes[stage.index()] = outcome;
        }

        working.write_to(host, definition.topology.present);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::{IkSettings, IkSolverKind};
    use crate::spine::{SpineCorrection, SpineTranslation};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use wasm_bindgen_test::*;

    fn perturbed(rng: &mut StdRng, pose: &SkeletonPose, amount: f32) -> SkeletonPose {
        let mut pose = pose.clone();
        for p in pose.positions.iter_mut() {
            *p += Vec3::new(
                rng.random_range(-amount..amount),
                rng.random_range(-amount..amount),
                rng.random_range(-amount..amount),
            );
        }
        pose
    }

    fn proportions_only() -> DeformationSettings {
        DeformationSettings {
            spine_correction_weight: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_settings_stage_list() {
        let rig = DeformationRig::bind(&RestPose::default_humanoid(), DeformationSettings::default()).unwrap();
        assert_eq!(
            rig.stages(),
            &[CorrectionStage::Proportions, CorrectionStage::SpineTranslation]
        );

        let settings = DeformationSettings {
            spine_mode: SpineCorrectionMode::FullBody(SpineTranslation::None),
            align_feet_weight: 1.0,
            hands_weight: 0.5,
            ..Default::default()
        };
        let rig = DeformationRig::bind(&RestPose::default_humanoid(), settings).unwrap();
        assert_eq!(
            rig.stages(),
            &[CorrectionStage::Proportions, CorrectionStage::Feet, CorrectionStage::Hands]
        );
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_zero_weight_writes_nothing() {
        let rest = RestPose::default_humanoid();
        let mut rig = DeformationRig::bind(&rest, DeformationSettings::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let original = perturbed(&mut rng, &rest.pose, 0.1);
        let mut host = original.clone();

        let report = rig.evaluate(&mut host, 0.0);

        assert_eq!(host, original);
        assert_eq!(report.outcomes, [StageOutcome::default(); CorrectionStage::COUNT]);

        rig.evaluate(&mut host, f32::NAN);
        assert_eq!(host, original);
    }

    #[test]
    fn test_evaluate_restores_rest_lengths() {
        let rest = RestPose::default_humanoid();
        let mut rig = DeformationRig::bind(&rest, proportions_only()).unwrap();
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..10 {
            let mut host = perturbed(&mut rng, &rest.pose, 0.04);
            let report = rig.evaluate(&mut host, 1.0);

            assert_eq!(report.total_skipped(), 0);
            for pair in rig.definition().pairs() {
                let length = host.position(pair.start).distance(host.position(pair.end));
                assert!(
                    (length - pair.rest_distance).abs() < 1e-4,
                    "{:?} -> {:?}: {} vs {}",
                    pair.start,
                    pair.end,
                    length,
                    pair.rest_distance
                );
            }
        }
    }

    #[test]
    fn test_scaled_host_gets_scaled_lengths() {
        let rest = RestPose::default_humanoid();
        let mut rig = DeformationRig::bind(&rest, proportions_only()).unwrap();
        let mut host = rest.scaled(2.0).pose;
        host.positions[JointId::LeftHand.index()] += Vec3::new(-0.3, 0.0, 0.0);

        rig.evaluate(&mut host, 1.0);

        let forearm = host
            .position(JointId::LeftLowerArm)
            .distance(host.position(JointId::LeftHand));
        assert!((forearm - 0.52).abs() < 1e-4, "forearm {}", forearm);
    }

    #[test]
    fn test_skip_hips_and_head_leaves_endpoints_to_tracking() {
        let rest = RestPose::default_humanoid();
        let settings = DeformationSettings {
            spine_mode: SpineCorrectionMode::Deformation(SpineCorrection::SkipHipsAndHead),
            ..Default::default()
        };
        let mut rig = DeformationRig::bind(&rest, settings).unwrap();
        let mut host = rest.pose.clone();
        host.positions[JointId::Head.index()] += Vec3::new(0.0, 0.05, 0.02);
        let tracked_hips = host.position(JointId::Hips);

        let targets = TrackedTargets {
            head: Some(Vec3::new(0.0, 1.7, 0.0)),
            ..Default::default()
        };
        rig.evaluate_with_targets(&mut host, 1.0, &targets);

        assert_eq!(host.position(JointId::Hips), tracked_hips);
        // proportions pulled the head back to rest length; the spine stage left it there
        let neck_rest = Vec3::new(0.0, 1.48, 0.0);
        let head = neck_rest + Vec3::new(0.0, 0.17, 0.02).normalize() * 0.12;
        assert!(host.position(JointId::Head).distance(head) < 1e-5, "head at {}", host.position(JointId::Head));
        // intermediate joints still moved toward the tracked head
        assert_ne!(host.position(JointId::Neck), neck_rest);
    }

    #[test]
    fn test_accurate_head_lands_on_target() {
        let rest = RestPose::default_humanoid();
        let settings = DeformationSettings {
            spine_mode: SpineCorrectionMode::FullBody(SpineTranslation::AccurateHead),
            ..Default::default()
        };
        let mut rig = DeformationRig::bind(&rest, settings).unwrap();
        let mut host = rest.pose.clone();
        let headset = Vec3::new(0.0, 1.66, 0.03);

        rig.evaluate_with_targets(
            &mut host,
            1.0,
            &TrackedTargets {
                head: Some(headset),
                ..Default::default()
            },
        );

        assert!(host.position(JointId::Head).distance(headset) < 1e-5);
    }

    #[test]
    fn test_hand_ik_reports_convergence() {
        let rest = RestPose::default_humanoid();
        let settings = DeformationSettings {
            spine_correction_weight: 0.0,
            hands_weight: 1.0,
            hand_stretch_limit: 1.0,
            hand_squash_limit: 1.0,
            hand_ik: Some(IkSettings {
                solver: IkSolverKind::Ccd,
                tolerance: 1e-3,
                max_iterations: 50,
                solve_rotations: false,
            }),
            ..Default::default()
        };
        let mut rig = DeformationRig::bind(&rest, settings).unwrap();
        let mut host = rest.pose.clone();
        let target = host.position(JointId::LeftUpperArm) + Vec3::new(-0.2, -0.3, 0.15);

        let report = rig.evaluate_with_targets(
            &mut host,
            1.0,
            &TrackedTargets {
                left_hand: Some(target),
                ..Default::default()
            },
        );

        assert_eq!(report.hands_reached[0], Some(true));
        assert!(host.position(JointId::LeftHand).distance(target) <= 1e-3);
        assert_eq!(report.outcome(CorrectionStage::Hands).applied, 2);
    }

    #[test]
    fn test_host_missing_bound_joint_is_skipped_not_written() {
        let rest = RestPose::default_humanoid();
        let mut rig = DeformationRig::bind(&rest, proportions_only()).unwrap();
        let mut host = rest.pose.clone().without_joint(JointId::LeftLowerArm);
        host.positions[JointId::LeftHand.index()] += Vec3::X;

        let report = rig.evaluate(&mut host, 1.0);

        assert_eq!(report.outcome(CorrectionStage::Proportions).skipped, 2);
        assert!(!host.present.contains(JointId::LeftLowerArm));
        let displaced = rest.pose.position(JointId::LeftHand) + Vec3::X;
        assert_eq!(host.position(JointId::LeftHand), displaced);
    }

    #[test]
    fn test_joint_missing_from_rest_pose_is_left_to_host() {
        let rest = RestPose::default_humanoid().without_joint(JointId::LeftShoulder);
        let settings = DeformationSettings {
            spine_mode: SpineCorrectionMode::FullBody(SpineTranslation::AccurateHead),
            ..Default::default()
        };
        let mut rig = DeformationRig::bind(&rest, settings).unwrap();
        let mut host = RestPose::default_humanoid().pose;
        let shoulder = host.position(JointId::LeftShoulder);
        let upper_arm = host.position(JointId::LeftUpperArm);
        let head = host.position(JointId::Head) + Vec3::new(0.0, 0.0, 0.2);

        rig.evaluate_with_targets(
            &mut host,
            1.0,
            &TrackedTargets {
                head: Some(head),
                ..Default::default()
            },
        );

        assert!(rig.unbound_warned);
        assert_eq!(host.position(JointId::LeftShoulder), shoulder);
        assert!(host.position(JointId::LeftUpperArm).z > upper_arm.z + 0.05);
    }
}
