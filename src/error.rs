//! Error types for rig binding, settings, and host interop.

use thiserror::Error;

use crate::joint::JointId;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, DeformError>;

/// Errors raised while binding a rig or talking to the host.
///
/// Per-frame stages never return these; they skip the affected joints,
/// log, and report the count in their `StageOutcome`.
#[derive(Debug, Error)]
pub enum DeformError {
    /// A bone pair or chain references a joint the skeleton does not provide
    #[error("joint `{}` is missing from the skeleton", .0.name())]
    MissingJoint(JointId),

    /// A chain needs more joints than it was given
    #[error("chain has {len} joints, at least {min} required")]
    ChainTooShort { len: usize, min: usize },

    /// Distance table does not line up with the joints it describes
    #[error("chain has {joints} joints but {distances} rest distances")]
    LengthMismatch { joints: usize, distances: usize },

    /// A weight, limit, or tolerance is out of range
    #[error("setting `{name}` has invalid value {value}")]
    InvalidSetting { name: &'static str, value: f32 },

    /// Rest pose cannot produce usable proportions
    #[error("invalid rest pose: {0}")]
    InvalidRestPose(String),

    /// Host buffer is not the size of a packed frame
    #[error("frame buffer holds {actual} floats, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    /// No rig is registered under this handle
    #[error("no rig registered for handle {0}")]
    UnknownRig(u32),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}
