use glam::Vec3;
use wasm_bindgen::prelude::*;

use crate::ik::{solve_ccd, solve_fabrik, FabrikScratch, IkJoint};
use crate::joint::RestPose;
use crate::pipeline::DeformationRig;
use crate::settings::DeformationSettings;

#[derive(serde::Serialize)]
pub struct BenchmarkResults {
    pub iterations: i32,
    pub ccd_ms: f64,
    pub ccd_converged: bool,
    pub fabrik_ms: f64,
    pub fabrik_converged: bool,
    /// Full pipeline on a perturbed humanoid
    pub evaluate_ms: f64,
}

/// Four joint unit chain along +Y, root first
fn chain() -> [IkJoint; 4] {
    [0.0, 1.0, 2.0, 3.0].map(|y| IkJoint::at(Vec3::new(0.0, y, 0.0)))
}

/// Run performance comparison between CCD, FABRIK and a full frame evaluation
#[wasm_bindgen]
pub fn run_benchmarks(iterations: i32) -> Result<JsValue, JsValue> {
    use std::hint::black_box;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let perf = window
        .performance()
        .ok_or_else(|| JsValue::from_str("no performance"))?;

    let target = black_box(Vec3::new(1.5, 1.5, 0.0));
    let distances = [1.0; 3];
    let mut scratch = FabrikScratch::with_capacity(4);

    let rest = RestPose::default_humanoid();
    let mut rig = DeformationRig::bind(&rest, DeformationSettings::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let mut host = rest.pose.clone();
    host.positions[crate::joint::JointId::LeftHand.index()] += Vec3::new(-0.05, 0.02, 0.0);

    // Warm-up to trigger JIT
    for _ in 0..1_000 {
        let mut bones = chain();
        bones.reverse();
        black_box(solve_ccd(&mut bones, target, 1e-6, 10));
        let mut joints = chain();
        black_box(solve_fabrik(&mut joints, &distances, target, 1e-3, 10, true, &mut scratch));
    }

    // 1. CCD (effector first)
    let mut ccd_converged = false;
    let start = perf.now();
    for _ in 0..iterations {
        let mut bones = chain();
        bones.reverse();
        ccd_converged = black_box(solve_ccd(&mut bones, target, 1e-6, 10));
    }
    let ccd_time = perf.now() - start;

    // 2. FABRIK (root first, with rotations)
    let mut fabrik_converged = false;
    let start = perf.now();
    for _ in 0..iterations {
        let mut joints = chain();
        fabrik_converged = black_box(solve_fabrik(
            &mut joints,
            &distances,
            target,
            1e-3,
            10,
            true,
            &mut scratch,
        ));
    }
    let fabrik_time = perf.now() - start;

    // 3. Whole frame
    let start = perf.now();
    for _ in 0..iterations {
        let mut frame = host.clone();
        black_box(rig.evaluate(&mut frame, 1.0));
    }
    let evaluate_time = perf.now() - start;

    let result = BenchmarkResults {
        iterations,
        ccd_ms: ccd_time,
        ccd_converged,
        fabrik_ms: fabrik_time,
        fabrik_converged,
        evaluate_ms: evaluate_time,
    };

    Ok(serde_wasm_bindgen::to_value(&result)?)
}
