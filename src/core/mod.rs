//! Simulation core: particle state, run configuration, the per-step
//! integrator and the simulation object that owns them.

pub mod broad_phase;
pub mod control;
pub mod integrator;
pub mod params;
pub mod particle;
pub mod sim;
pub mod trail;

pub use control::ControlHandle;
pub use integrator::{Container, PairOutcome, StepReport};
pub use params::{BroadPhase, Domain, SimParams};
pub use particle::Particle;
pub use sim::Simulation;
pub use trail::PathTrail;
