//! Control inputs written by a front end while the simulation runs.
//!
//! A [`ControlHandle`] is shared between the UI (slider, reset button) and the
//! simulation. The simulation reads the temperature once at the start of each
//! step and consumes a pending reset before stepping, so a write is seen by the
//! next step at the latest.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Shared {
    temperature_bits: AtomicU64,
    max_temperature: f64,
    reset_requested: AtomicBool,
}

/// Cloneable handle to the temperature setting and reset trigger.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    shared: Arc<Shared>,
}

impl ControlHandle {
    /// Create a handle with an initial temperature in `[0, max_temperature]`.
    pub fn new(temperature: f64, max_temperature: f64) -> Result<Self> {
        if !max_temperature.is_finite() || max_temperature <= 0.0 {
            return Err(Error::InvalidParam(
                "max_temperature must be finite and > 0".into(),
            ));
        }
        let handle = Self {
            shared: Arc::new(Shared {
                temperature_bits: AtomicU64::new(0.0_f64.to_bits()),
                max_temperature,
                reset_requested: AtomicBool::new(false),
            }),
        };
        handle.set_temperature(temperature)?;
        Ok(handle)
    }

    /// Current temperature setting.
    pub fn temperature(&self) -> f64 {
        f64::from_bits(self.shared.temperature_bits.load(Ordering::Relaxed))
    }

    pub fn max_temperature(&self) -> f64 {
        self.shared.max_temperature
    }

    /// Store a new temperature, clamped to `max_temperature`.
    ///
    /// Errors: `Error::InvalidParam` for negative or non-finite input; the
    /// previous value is kept.
    pub fn set_temperature(&self, temperature: f64) -> Result<f64> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(Error::InvalidParam(format!(
                "temperature must be finite and >= 0, got {temperature}"
            )));
        }
        let t = temperature.min(self.shared.max_temperature);
        self.shared
            .temperature_bits
            .store(t.to_bits(), Ordering::Relaxed);
        Ok(t)
    }

    /// Ask for a fresh ensemble before the next step.
    pub fn request_reset(&self) {
        self.shared.reset_requested.store(true, Ordering::Release);
    }

    /// Returns true once per request, clearing it.
    pub fn take_reset_request(&self) -> bool {
        self.shared.reset_requested.swap(false, Ordering::AcqRel)
    }
}
