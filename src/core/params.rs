//! Run configuration for an ensemble simulation.

use crate::core::particle::DIM;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_NUM_PARTICLES: usize = 100;
const DEFAULT_BOX_SIZE: f64 = 10.0;
const DEFAULT_RADIUS: f64 = 0.1;
const DEFAULT_DT: f64 = 0.01;
const DEFAULT_MAX_TEMPERATURE: f64 = 10.0;
const DEFAULT_TEMPERATURE: f64 = 1.0;
/// Default number of tracked positions kept for path display.
pub const DEFAULT_TRAIL_CAPACITY: usize = 1000;

/// Axis-aligned rectangular domain `[min.x, max.x] × [min.y, max.y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: [f64; DIM],
    pub max: [f64; DIM],
}

impl Domain {
    /// Square domain `[0, size]²`.
    pub fn square(size: f64) -> Self {
        Self {
            min: [0.0; DIM],
            max: [size; DIM],
        }
    }

    /// Edge length along axis `k`.
    #[inline]
    pub fn extent(&self, k: usize) -> f64 {
        self.max[k] - self.min[k]
    }

    /// Range of valid particle centers on axis `k` for particles of `radius`.
    #[inline]
    pub fn interior(&self, k: usize, radius: f64) -> (f64, f64) {
        (self.min[k] + radius, self.max[k] - radius)
    }

    /// True if a center at `r` lies inside the radius-shrunk interior.
    pub fn contains(&self, r: &[f64; DIM], radius: f64) -> bool {
        (0..DIM).all(|k| {
            let (lo, hi) = self.interior(k, radius);
            r[k] >= lo && r[k] <= hi
        })
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::square(DEFAULT_BOX_SIZE)
    }
}

/// How candidate collision pairs are generated in the collision phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BroadPhase {
    /// Test every unordered pair `i < j`.
    #[default]
    AllPairs,
    /// Sweep-and-prune on the x axis, then resolve survivors in `(i, j)` order.
    SweepAndPrune,
}

/// Configuration fixed for the lifetime of a run.
///
/// `collisions == false` selects the reduced Brownian mode: positions
/// random-walk and are clamped, no velocity state, no pair physics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub num_particles: usize,
    pub domain: Domain,
    pub radius: f64,
    pub mass: f64,
    pub dt: f64,
    pub collisions: bool,
    pub max_temperature: f64,
    pub initial_temperature: f64,
    pub trail_capacity: usize,
    pub tracked_particle: Option<usize>,
    pub broad_phase: BroadPhase,
    pub seed: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            num_particles: DEFAULT_NUM_PARTICLES,
            domain: Domain::default(),
            radius: DEFAULT_RADIUS,
            mass: 1.0,
            dt: DEFAULT_DT,
            collisions: true,
            max_temperature: DEFAULT_MAX_TEMPERATURE,
            initial_temperature: DEFAULT_TEMPERATURE,
            trail_capacity: DEFAULT_TRAIL_CAPACITY,
            tracked_particle: Some(0),
            broad_phase: BroadPhase::AllPairs,
            seed: None,
        }
    }
}

impl SimParams {
    /// Check every field before a run starts.
    ///
    /// Errors:
    /// - `Error::InvalidParam` for non-finite or non-positive values, negative
    ///   temperature or a tracked index outside the ensemble.
    /// - `Error::OutOfRange` if the domain cannot hold a particle of `radius`.
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(Error::InvalidParam("num_particles must be > 0".into()));
        }
        if u32::try_from(self.num_particles).is_err() {
            return Err(Error::InvalidParam(format!(
                "num_particles must fit in u32, got {}",
                self.num_particles
            )));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidParam("radius must be finite and > 0".into()));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be finite and > 0".into()));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(Error::InvalidParam("dt must be finite and > 0".into()));
        }
        if !self.max_temperature.is_finite() || self.max_temperature <= 0.0 {
            return Err(Error::InvalidParam(
                "max_temperature must be finite and > 0".into(),
            ));
        }
        if !self.initial_temperature.is_finite() || self.initial_temperature < 0.0 {
            return Err(Error::InvalidParam(
                "initial_temperature must be finite and >= 0".into(),
            ));
        }
        if self.initial_temperature > self.max_temperature {
            return Err(Error::InvalidParam(format!(
                "initial_temperature {} exceeds max_temperature {}",
                self.initial_temperature, self.max_temperature
            )));
        }
        if let Some(i) = self.tracked_particle {
            if i >= self.num_particles {
                return Err(Error::InvalidParam(format!(
                    "tracked_particle {} out of range for {} particles",
                    i, self.num_particles
                )));
            }
        }
        for k in 0..DIM {
            let (lo, hi) = (self.domain.min[k], self.domain.max[k]);
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(Error::InvalidParam(format!(
                    "domain axis {k} must be finite with min < max"
                )));
            }
            if 2.0 * self.radius >= self.domain.extent(k) {
                return Err(Error::OutOfRange(format!(
                    "radius {} must be less than half the domain extent {} on axis {k}",
                    self.radius,
                    self.domain.extent(k)
                )));
            }
        }
        Ok(())
    }
}
