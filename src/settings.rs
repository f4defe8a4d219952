//! Rig configuration, loaded from JSON with defaults for every field.

use serde::{Deserialize, Serialize};

use crate::auxiliary::HandSettings;
use crate::error::{DeformError, Result};
use crate::ik::IkSettings;
use crate::proportion::SectionWeights;
use crate::spine::SpineCorrectionMode;

/// Weights and limits for every correction stage.
///
/// Weights are in `[0, 1]`; a stage whose weights are all zero is left out of
/// the pipeline when the rig is bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformationSettings {
    pub spine_mode: SpineCorrectionMode,
    pub spine_correction_weight: f32,

    pub spine_lower_alignment_weight: f32,
    pub spine_upper_alignment_weight: f32,

    // Proportion weights per body section
    pub spine_weight: f32,
    pub left_arm_weight: f32,
    pub right_arm_weight: f32,
    pub left_leg_weight: f32,
    pub right_leg_weight: f32,

    /// Share of spine stretch removed from the arms in `accurate_hips_and_head`
    pub upper_arm_compensation_weight: f32,

    pub shoulder_height_weight: f32,
    pub shoulder_width_weight: f32,

    pub align_feet_weight: f32,

    pub hands_weight: f32,
    /// Max distance (m) a hand may move toward the shoulder per frame
    pub hand_squash_limit: f32,
    /// Max distance (m) a hand may move away from the shoulder per frame
    pub hand_stretch_limit: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_ik: Option<IkSettings>,
}

impl Default for DeformationSettings {
    fn default() -> Self {
        Self {
            spine_mode: SpineCorrectionMode::default(),
            spine_correction_weight: 1.0,
            spine_lower_alignment_weight: 0.0,
            spine_upper_alignment_weight: 0.0,
            spine_weight: 1.0,
            left_arm_weight: 1.0,
            right_arm_weight: 1.0,
            left_leg_weight: 1.0,
            right_leg_weight: 1.0,
            upper_arm_compensation_weight: 0.0,
            shoulder_height_weight: 0.0,
            shoulder_width_weight: 0.0,
            align_feet_weight: 0.0,
            hands_weight: 0.0,
            hand_squash_limit: 0.1,
            hand_stretch_limit: 0.1,
            hand_ik: None,
        }
    }
}

impl DeformationSettings {
    /// Parse and validate settings JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check weights are in `[0, 1]` and limits/tolerances are non-negative
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("spine_correction_weight", self.spine_correction_weight),
            ("spine_lower_alignment_weight", self.spine_lower_alignment_weight),
            ("spine_upper_alignment_weight", self.spine_upper_alignment_weight),
            ("spine_weight", self.spine_weight),
            ("left_arm_weight", self.left_arm_weight),
            ("right_arm_weight", self.right_arm_weight),
            ("left_leg_weight", self.left_leg_weight),
            ("right_leg_weight", self.right_leg_weight),
            ("upper_arm_compensation_weight", self.upper_arm_compensation_weight),
            ("shoulder_height_weight", self.shoulder_height_weight),
            ("shoulder_width_weight", self.shoulder_width_weight),
            ("align_feet_weight", self.align_feet_weight),
            ("hands_weight", self.hands_weight),
        ];
        if let Some((name, value)) = weights
            .into_iter()
            .find(|(_, w)| !(0.0..=1.0).contains(w))
        {
            return Err(DeformError::InvalidSetting { name, value });
        }

        let mut limits = vec![
            ("hand_squash_limit", self.hand_squash_limit),
            ("hand_stretch_limit", self.hand_stretch_limit),
        ];
        if let Some(ik) = &self.hand_ik {
            limits.push(("hand_ik.tolerance", ik.tolerance));
        }
        if let Some((name, value)) = limits
            .into_iter()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
        {
            return Err(DeformError::InvalidSetting { name, value });
        }

        Ok(())
    }

    pub fn section_weights(&self) -> SectionWeights {
        SectionWeights {
            spine: self.spine_weight,
            left_arm: self.left_arm_weight,
            right_arm: self.right_arm_weight,
            left_leg: self.left_leg_weight,
            right_leg: self.right_leg_weight,
        }
    }

    pub fn hand_settings(&self) -> HandSettings {
        HandSettings {
            weight: self.hands_weight,
            squash_limit: self.hand_squash_limit,
            stretch_limit: self.hand_stretch_limit,
            ik: self.hand_ik,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::IkSolverKind;
    use crate::spine::{SpineCorrection, SpineTranslation};

    #[test]
    fn test_empty_json_gives_defaults() {
        let settings = DeformationSettings::from_json("{}").unwrap();
        assert_eq!(settings, DeformationSettings::default());
    }

    #[test]
    fn test_partial_json_overrides_fields() {
        let json = r#"{
            "spine_mode": { "full_body": "accurate_hips" },
            "left_arm_weight": 0.5,
            "hands_weight": 1.0,
            "hand_ik": { "solver": "ccd", "max_iterations": 4 }
        }"#;
        let settings = DeformationSettings::from_json(json).unwrap();

        assert_eq!(
            settings.spine_mode,
            SpineCorrectionMode::FullBody(SpineTranslation::AccurateHips)
        );
        assert_eq!(settings.section_weights().left_arm, 0.5);
        assert_eq!(settings.section_weights().right_arm, 1.0);
        let ik = settings.hand_ik.unwrap();
        assert_eq!(ik.solver, IkSolverKind::Ccd);
        assert_eq!(ik.max_iterations, 4);
    }

    #[test]
    fn test_out_of_range_weight_is_rejected() {
        let err = DeformationSettings::from_json(r#"{ "align_feet_weight": 1.5 }"#).unwrap_err();
        assert!(matches!(
            err,
            DeformError::InvalidSetting {
                name: "align_feet_weight",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_limit_is_rejected() {
        let settings = DeformationSettings {
            hand_stretch_limit: -0.1,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = DeformationSettings {
            hand_ik: Some(IkSettings {
                tolerance: -1.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(DeformError::InvalidSetting {
                name: "hand_ik.tolerance",
                ..
            })
        ));
    }

    #[test]
    fn test_bad_json_is_a_json_error() {
        let err = DeformationSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, DeformError::Json(_)));
    }

    #[test]
    fn test_round_trip_through_json() {
        let settings = DeformationSettings {
            spine_mode: SpineCorrectionMode::Deformation(SpineCorrection::SkipHipsAndHead),
            shoulder_width_weight: 0.25,
            ..Default::default()
        };
        let json = settings.to_json_string().unwrap();
        assert_eq!(DeformationSettings::from_json(&json).unwrap(), settings);
    }
}
