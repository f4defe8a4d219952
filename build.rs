//! Build script for rig preset validation
//!
//! This script runs at compile time and validates every rig preset under
//! `rigs/` so a broken preset never ships: required joints must be present
//! and every bone must have a usable rest length.

// Include the shared skeleton constants
#[path = "src/skeleton_constants.rs"]
mod skeleton_constants;

use glam::Vec3;
use serde::Deserialize;
use skeleton_constants::{joint_index, JOINT_PARENTS, MIN_BONE_LENGTH, REQUIRED_JOINTS};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Rig preset from JSON
#[derive(Debug, Deserialize)]
struct RigPreset {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    lossy_scale: Option<[f32; 3]>,
    joints: BTreeMap<String, Vec3>,
}

/// Nearest ancestor of `name` that the preset provides
fn nearest_present_parent<'a>(name: &str, joints: &'a BTreeMap<String, Vec3>) -> Option<(&'a str, Vec3)> {
    let mut current = joint_index(name).and_then(|i| JOINT_PARENTS[i].1);
    while let Some(parent) = current {
        if let Some((key, position)) = joints.get_key_value(parent) {
            return Some((key.as_str(), *position));
        }
        current = joint_index(parent).and_then(|i| JOINT_PARENTS[i].1);
    }
    None
}

/// Validate a single preset
fn validate_preset(preset: &RigPreset) -> Vec<String> {
    let mut errors = Vec::new();

    for name in preset.joints.keys() {
        if joint_index(name).is_none() {
            errors.push(format!("  unknown joint `{}`", name));
        }
    }

    for required in REQUIRED_JOINTS {
        if !preset.joints.contains_key(required) {
            errors.push(format!("  missing required joint `{}`", required));
        }
    }

    for (name, position) in &preset.joints {
        if let Some((parent, parent_position)) = nearest_present_parent(name, &preset.joints) {
            let length = position.distance(parent_position);
            if length < MIN_BONE_LENGTH {
                errors.push(format!(
                    "  {} -> {} length {:.4}m is below {:.4}m",
                    parent, name, length, MIN_BONE_LENGTH
                ));
            }
        }
    }

    errors
}

/// Validate a rig preset file
fn validate_preset_file(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let preset: RigPreset = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    let name = preset
        .name
        .clone()
        .unwrap_or_else(|| path.display().to_string());
    let errors = validate_preset(&preset);

    if errors.is_empty() {
        println!(
            "cargo:warning=✓ {} validated ({} joints)",
            name,
            preset.joints.len()
        );
        Ok(())
    } else {
        Err(format!("Rig '{}' is invalid:\n{}", name, errors.join("\n")))
    }
}

fn main() {
    let rig_dir = Path::new("rigs");

    // Rerun if shared constants change
    println!("cargo:rerun-if-changed=src/skeleton_constants.rs");

    if !rig_dir.exists() {
        println!("cargo:warning=Rig directory not found, skipping validation");
        return;
    }

    let mut has_errors = false;

    if let Ok(entries) = fs::read_dir(rig_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                println!("cargo:rerun-if-changed={}", path.display());

                if let Err(e) = validate_preset_file(&path) {
                    println!("cargo:warning=VALIDATION ERROR: {}", e);
                    has_errors = true;
                }
            }
        }
    }

    if has_errors {
        panic!("Rig validation failed! Fix the joint positions in the preset files.");
    }

    println!("cargo:rerun-if-changed={}", rig_dir.display());
}
