//! Thermal ensemble of equal disks in a 2D box.
//!
//! Each step injects Gaussian velocity noise scaled by a temperature setting,
//! moves particles with explicit Euler, reflects them off the walls and
//! resolves elastic pair collisions. A reduced mode (`collisions = false`)
//! runs a clamped random walk instead.
//!
//! Enable the `python` feature to build the `brownsim` extension module.

pub mod core;
pub mod error;

#[cfg(feature = "python")]
mod python;

pub use crate::core::{ControlHandle, SimParams, Simulation, StepReport};
pub use crate::error::{Error, Result};
