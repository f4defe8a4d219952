//! Handle-based registry of bound rigs.
//!
//! Core code takes explicit `&mut DeformationRig` references; only the wasm
//! bindings reach rigs through the thread-local registry, by `u32` handle.
//! Handles are never 0, so a host can use 0 as "no rig".

use std::cell::RefCell;

use crate::error::{DeformError, Result};
use crate::pipeline::DeformationRig;

pub type RigHandle = u32;

/// Slot storage for bound rigs. A freed slot is reused by the next insert.
#[derive(Debug, Default)]
pub struct RigRegistry {
    slots: Vec<Option<DeformationRig>>,
}

impl RigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rig: DeformationRig) -> RigHandle {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(rig);
                free
            }
            None => {
                self.slots.push(Some(rig));
                self.slots.len() - 1
            }
        };
        (index + 1) as RigHandle
    }

    pub fn remove(&mut self, handle: RigHandle) -> Option<DeformationRig> {
        let index = (handle as usize).checked_sub(1)?;
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn get_mut(&mut self, handle: RigHandle) -> Result<&mut DeformationRig> {
        (handle as usize)
            .checked_sub(1)
            .and_then(|index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
            .ok_or(DeformError::UnknownRig(handle))
    }

    /// Number of live rigs
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Global registry, thin wrapper for WASM bindings only
thread_local! {
    static RIGS: RefCell<RigRegistry> = RefCell::new(RigRegistry::new());
}

/// Register a bound rig and return its handle
pub fn register_rig(rig: DeformationRig) -> RigHandle {
    RIGS.with(|rigs| rigs.borrow_mut().insert(rig))
}

/// Drop a rig. Returns false if the handle was unknown.
pub fn release_rig(handle: RigHandle) -> bool {
    RIGS.with(|rigs| rigs.borrow_mut().remove(handle).is_some())
}

/// Execute a closure with mutable access to a registered rig
pub fn with_rig_mut<F, R>(handle: RigHandle, f: F) -> Result<R>
where
    F: FnOnce(&mut DeformationRig) -> R,
{
    RIGS.with(|rigs| {
        let mut registry = rigs.borrow_mut();
        registry.get_mut(handle).map(f)
    })
}
