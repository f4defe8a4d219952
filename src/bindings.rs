//! wasm-bindgen surface: thin wrappers that resolve a handle, convert
//! arguments, and call into the pipeline.

use glam::Vec3;
use wasm_bindgen::prelude::*;

use crate::error::DeformError;
use crate::frame::PackedFrame;
use crate::joint::{JointMask, RestPose};
use crate::pipeline::{DeformationRig, TrackedTargets};
use crate::settings::DeformationSettings;
use crate::state::{register_rig, release_rig, with_rig_mut};

fn to_js(err: DeformError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Install the panic hook and console logger
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

/// Bind a rig from rest-pose JSON and settings JSON (empty string for defaults).
/// Returns a handle for `evaluate_rig`.
#[wasm_bindgen]
pub fn create_rig(rest_json: &str, settings_json: &str) -> Result<u32, JsValue> {
    let rest = RestPose::from_json(rest_json).map_err(to_js)?;
    let settings = if settings_json.trim().is_empty() {
        DeformationSettings::default()
    } else {
        DeformationSettings::from_json(settings_json).map_err(to_js)?
    };
    let rig = DeformationRig::bind(&rest, settings).map_err(to_js)?;
    let handle = register_rig(rig);
    log::info!("Created rig {}", handle);
    Ok(handle)
}

#[wasm_bindgen]
pub fn destroy_rig(handle: u32) -> bool {
    let released = release_rig(handle);
    if !released {
        log::warn!("destroy_rig: unknown handle {}", handle);
    }
    released
}

/// Correct one packed frame in place.
///
/// `frame` holds position xyz + rotation xyzw per joint; `present_bits` marks
/// which joints the host skeleton has. `targets` is an optional object with
/// `hips`, `head`, `left_hand`, `right_hand` as `[x, y, z]`.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn evaluate_rig(
    handle: u32,
    frame: &mut [f32],
    present_bits: u32,
    scale_x: f32,
    scale_y: f32,
    scale_z: f32,
    weight: f32,
    targets: JsValue,
) -> Result<JsValue, JsValue> {
    let targets: TrackedTargets = if targets.is_undefined() || targets.is_null() {
        TrackedTargets::default()
    } else {
        serde_wasm_bindgen::from_value(targets)?
    };

    let mut packed = PackedFrame::new(
        frame,
        JointMask::from_bits(present_bits),
        Vec3::new(scale_x, scale_y, scale_z),
    )
    .map_err(to_js)?;

    let report = with_rig_mut(handle, |rig| rig.evaluate_with_targets(&mut packed, weight, &targets))
        .map_err(to_js)?;

    Ok(serde_wasm_bindgen::to_value(&report)?)
}

/// Floats a frame buffer must hold
#[wasm_bindgen]
pub fn frame_len() -> usize {
    PackedFrame::FLOATS
}
