//! Iterative inverse kinematics over a chain of world-space joints.
//!
//! Both solvers work on plain `IkJoint` slices so they can be driven from a
//! rig chain, a test fixture, or the benchmark without any skeleton types.

pub mod ccd;
pub mod fabrik;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use ccd::{effector_rotation_toward_goal, solve_ccd};
pub use fabrik::{solve_fabrik, FabrikScratch};

/// World position and rotation of one joint in an IK chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkJoint {
    pub position: Vec3,
    pub rotation: Quat,
}

impl IkJoint {
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub const fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IkSolverKind {
    Ccd,
    #[default]
    Fabrik,
}

/// Hand IK configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IkSettings {
    pub solver: IkSolverKind,
    /// Convergence distance in meters
    pub tolerance: f32,
    pub max_iterations: u32,
    /// FABRIK only: re-derive joint rotations from the solved positions
    pub solve_rotations: bool,
}

impl Default for IkSettings {
    fn default() -> Self {
        Self {
            solver: IkSolverKind::Fabrik,
            tolerance: 1e-3,
            max_iterations: 10,
            solve_rotations: true,
        }
    }
}

/// Reusable buffers for solving one chain at a time.
#[derive(Debug, Clone, Default)]
pub struct IkScratch {
    pub joints: Vec<IkJoint>,
    pub distances: Vec<f32>,
    pub fabrik: FabrikScratch,
}

impl IkScratch {
    pub fn with_capacity(joints: usize) -> Self {
        Self {
            joints: Vec::with_capacity(joints),
            distances: Vec::with_capacity(joints),
            fabrik: FabrikScratch::with_capacity(joints),
        }
    }

    /// Solve the chain currently held in `joints`, ordered root to tip.
    ///
    /// CCD wants the effector first, so the buffer is reversed around the
    /// call and restored to root-to-tip order afterwards.
    pub fn solve(&mut self, target: Vec3, settings: &IkSettings) -> bool {
        let iterations = settings.max_iterations as usize;
        match settings.solver {
            IkSolverKind::Ccd => {
                self.joints.reverse();
                let tolerance_sq = settings.tolerance * settings.tolerance;
                let reached = solve_ccd(&mut self.joints, target, tolerance_sq, iterations);
                self.joints.reverse();
                reached
            }
            IkSolverKind::Fabrik => {
                self.distances.clear();
                self.distances.extend(
                    self.joints
                        .windows(2)
                        .map(|w| w[0].position.distance(w[1].position)),
                );
                solve_fabrik(
                    &mut self.joints,
                    &self.distances,
                    target,
                    settings.tolerance,
                    iterations,
                    settings.solve_rotations,
                    &mut self.fabrik,
                )
            }
        }
    }
}
