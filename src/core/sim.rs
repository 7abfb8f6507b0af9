use crate::core::control::ControlHandle;
use crate::core::integrator::{self, Container, StepReport};
use crate::core::params::SimParams;
use crate::core::particle::{Particle, DIM};
use crate::core::trail::PathTrail;
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

/// A fixed-size ensemble of equal disks in a rectangular box, driven by a
/// temperature setting.
///
/// The simulation exclusively owns particle state; a front end reaches it
/// between steps through accessors, and writes temperature or requests a
/// reset through the [`ControlHandle`] returned by [`Simulation::control`].
#[derive(Debug)]
pub struct Simulation {
    time_now: f64,
    steps: u64,
    params: SimParams,
    container: Container,
    particles: Vec<Particle>,
    rng: StdRng,
    control: ControlHandle,
    trail: PathTrail,
}

impl Simulation {
    /// Create a simulation with a random initial ensemble.
    ///
    /// Positions are uniform over the radius-shrunk domain (overlaps allowed),
    /// velocity components are standard normal. In the reduced Brownian mode
    /// velocities start at zero.
    pub fn new(params: SimParams) -> Result<Self> {
        params.validate()?;
        let container = Container::new(&params.domain, params.radius)?;
        let control = ControlHandle::new(params.initial_temperature, params.max_temperature)?;

        let mut rng: StdRng = match params.seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };
        let particles = sample_ensemble(&params, &container, &mut rng)?;

        log::info!(
            "new ensemble: {} particles, radius {}, collisions {}",
            params.num_particles,
            params.radius,
            params.collisions
        );

        let sim = Self {
            time_now: 0.0,
            steps: 0,
            trail: PathTrail::new(params.trail_capacity),
            params,
            container,
            particles,
            rng,
            control,
        };
        Ok(sim)
    }

    /// Create a simulation from explicit, index-aligned positions and velocities.
    ///
    /// `params.num_particles` is taken from the input length. Positions inside
    /// the domain but within one radius of a wall are moved onto the valid
    /// boundary.
    ///
    /// Errors:
    /// - `Error::LengthMismatch` if the sequences differ in length.
    /// - `Error::OutOfRange` if a position lies outside the domain.
    /// - `Error::InvalidParam` for non-finite values or invalid params.
    pub fn from_state(
        mut params: SimParams,
        positions: Vec<[f64; DIM]>,
        velocities: Vec<[f64; DIM]>,
    ) -> Result<Self> {
        if positions.len() != velocities.len() {
            return Err(Error::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        params.num_particles = positions.len();
        if let Some(i) = params.tracked_particle {
            if i >= params.num_particles {
                params.tracked_particle = None;
            }
        }
        let mut sim = Self::new(params)?;
        sim.set_positions(&positions)?;
        sim.set_velocities(&velocities)?;
        Ok(sim)
    }

    /// Advance one timestep.
    ///
    /// A pending reset request is honoured first. The temperature is read
    /// once from the control handle and used for the whole step.
    pub fn step(&mut self) -> Result<StepReport> {
        if self.control.take_reset_request() {
            self.reset()?;
        }
        let temperature = self.control.temperature();
        let dt = self.params.dt;

        let report = if self.params.collisions {
            integrator::step(
                &mut self.particles,
                temperature,
                dt,
                &self.container,
                self.params.broad_phase,
                &mut self.rng,
            )?
        } else {
            integrator::brownian_step(
                &mut self.particles,
                temperature,
                dt,
                &self.container,
                &mut self.rng,
            )?
        };

        self.time_now += dt;
        self.steps += 1;
        self.record_trail();
        Ok(report)
    }

    /// Advance `n` steps, returning the summed counters.
    pub fn advance(&mut self, n: usize) -> Result<StepReport> {
        let mut total = StepReport::default();
        for _ in 0..n {
            let r = self.step()?;
            total.wall_bounces += r.wall_bounces;
            total.collisions += r.collisions;
            total.degenerate_pairs += r.degenerate_pairs;
        }
        Ok(total)
    }

    /// Replace the ensemble with a fresh random draw of the same size.
    ///
    /// Time and step count start over and the trail is emptied; the random
    /// source carries on.
    pub fn reset(&mut self) -> Result<()> {
        self.particles = sample_ensemble(&self.params, &self.container, &mut self.rng)?;
        self.time_now = 0.0;
        self.steps = 0;
        self.trail.clear();
        log::debug!("ensemble reset ({} particles)", self.particles.len());
        Ok(())
    }

    /// Handle for writing temperature and requesting resets from a front end.
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Current temperature setting.
    pub fn temperature(&self) -> f64 {
        self.control.temperature()
    }

    /// Shorthand for `control().set_temperature(t)`; returns the stored value.
    pub fn set_temperature(&self, t: f64) -> Result<f64> {
        self.control.set_temperature(t)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Elapsed simulated time since start or last reset.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Read-only view of the ensemble. The size and masses are fixed for the
    /// run; write state through [`Simulation::set_positions`] and
    /// [`Simulation::set_velocities`].
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Positions as a Vec of fixed-size arrays.
    pub fn positions(&self) -> Vec<[f64; DIM]> {
        self.particles.iter().map(|p| p.r).collect()
    }

    /// Velocities as a Vec of fixed-size arrays.
    pub fn velocities(&self) -> Vec<[f64; DIM]> {
        self.particles.iter().map(|p| p.v).collect()
    }

    /// Positions of the tracked particle after each step, oldest first.
    pub fn trail(&self) -> &PathTrail {
        &self.trail
    }

    /// Total kinetic energy (diagnostic).
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    /// Equipartition temperature `2 KE / (N * DIM)` with unit Boltzmann constant.
    pub fn kinetic_temperature(&self) -> f64 {
        let dof = (self.particles.len() * DIM) as f64;
        2.0 * self.kinetic_energy() / dof
    }

    /// Overwrite all positions.
    ///
    /// Errors: `InvalidParam` on wrong length or non-finite values, `OutOfRange`
    /// for points outside the domain. Nothing is written unless every position
    /// is accepted.
    pub fn set_positions(&mut self, positions: &[[f64; DIM]]) -> Result<()> {
        if positions.len() != self.particles.len() {
            return Err(Error::InvalidParam(format!(
                "expected {} positions, got {}",
                self.particles.len(),
                positions.len()
            )));
        }
        let domain = &self.params.domain;
        let mut accepted = Vec::with_capacity(positions.len());
        for (i, r) in positions.iter().enumerate() {
            if !r.iter().all(|x| x.is_finite()) {
                return Err(Error::InvalidParam(format!(
                    "position {i} must be finite"
                )));
            }
            if !domain.contains(r, 0.0) {
                return Err(Error::OutOfRange(format!(
                    "position {i} {r:?} lies outside the domain"
                )));
            }
            let mut clamped = *r;
            for (k, c) in clamped.iter_mut().enumerate() {
                *c = c.clamp(self.container.lo[k], self.container.hi[k]);
            }
            if clamped != *r {
                log::debug!("position {i} moved off the wall margin to {clamped:?}");
            }
            accepted.push(clamped);
        }
        for (p, r) in self.particles.iter_mut().zip(accepted) {
            p.r = r;
        }
        Ok(())
    }

    /// Overwrite all velocities.
    ///
    /// Errors: `InvalidParam` on wrong length or non-finite values. Nothing is
    /// written unless every velocity is accepted.
    pub fn set_velocities(&mut self, velocities: &[[f64; DIM]]) -> Result<()> {
        if velocities.len() != self.particles.len() {
            return Err(Error::InvalidParam(format!(
                "expected {} velocities, got {}",
                self.particles.len(),
                velocities.len()
            )));
        }
        if let Some(i) = velocities
            .iter()
            .position(|v| !v.iter().all(|x| x.is_finite()))
        {
            return Err(Error::InvalidParam(format!(
                "velocity {i} must be finite"
            )));
        }
        for (p, v) in self.particles.iter_mut().zip(velocities) {
            p.v = *v;
        }
        Ok(())
    }

    fn record_trail(&mut self) {
        if let Some(i) = self.params.tracked_particle {
            if let Some(p) = self.particles.get(i) {
                self.trail.push(p.r);
            }
        }
    }
}

fn sample_ensemble(
    params: &SimParams,
    container: &Container,
    rng: &mut StdRng,
) -> Result<Vec<Particle>> {
    let mut particles = Vec::with_capacity(params.num_particles);
    for id in 0..params.num_particles {
        let mut r = [0.0_f64; DIM];
        for (k, r_k) in r.iter_mut().enumerate() {
            *r_k = rng.random_range(container.lo[k]..=container.hi[k]);
        }
        let mut v = [0.0_f64; DIM];
        if params.collisions {
            v.iter_mut().for_each(|x| *x = rng.sample(StandardNormal));
        }
        let id = u32::try_from(id)
            .map_err(|_| Error::InvalidParam("num_particles must fit in u32".into()))?;
        particles.push(Particle::new(id, r, v, params.mass)?);
    }
    Ok(particles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::BroadPhase;

    fn small(seed: u64) -> SimParams {
        SimParams {
            num_particles: 20,
            seed: Some(seed),
            ..SimParams::default()
        }
    }

    #[test]
    fn make_small_sim_ok() -> Result<()> {
        let mut sim = Simulation::new(small(1234))?;
        assert_eq!(sim.num_particles(), 20);
        assert!(sim.kinetic_energy().is_finite());
        sim.advance(10)?;
        assert_eq!(sim.steps(), 10);
        assert!((sim.time() - 0.1).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn initial_positions_respect_radius_margin() -> Result<()> {
        let sim = Simulation::new(SimParams {
            num_particles: 500,
            radius: 0.5,
            seed: Some(9),
            ..SimParams::default()
        })?;
        for p in sim.particles() {
            assert!(sim.params().domain.contains(&p.r, 0.5));
        }
        Ok(())
    }

    #[test]
    fn ids_are_indices() -> Result<()> {
        let sim = Simulation::new(small(2))?;
        for (i, p) in sim.particles().iter().enumerate() {
            assert_eq!(p.id as usize, i);
        }
        Ok(())
    }

    #[test]
    fn reset_request_is_applied_on_next_step() -> Result<()> {
        let mut sim = Simulation::new(small(5))?;
        sim.advance(5)?;
        assert_eq!(sim.trail().len(), 5);
        let ctl = sim.control();
        ctl.request_reset();
        sim.step()?;
        assert_eq!(sim.steps(), 1);
        assert_eq!(sim.num_particles(), 20);
        // only the step taken after the reset
        assert_eq!(sim.trail().len(), 1);
        Ok(())
    }

    #[test]
    fn reset_empties_trail() -> Result<()> {
        let mut sim = Simulation::new(small(1))?;
        sim.advance(10)?;
        assert_eq!(sim.trail().len(), 10);
        sim.reset()?;
        assert!(sim.trail().is_empty());
        assert_eq!(sim.particles().len(), 20);
        Ok(())
    }

    #[test]
    fn ensemble_size_and_mass_fixed_across_steps_and_reset() -> Result<()> {
        let mut sim = Simulation::new(SimParams {
            mass: 2.5,
            ..small(4)
        })?;
        sim.advance(3)?;
        sim.reset()?;
        sim.step()?;
        assert_eq!(sim.particles().len(), 20);
        assert!(sim.particles().iter().all(|p| p.mass == 2.5));
        Ok(())
    }

    #[test]
    fn from_state_trail_starts_empty() -> Result<()> {
        let sim = Simulation::from_state(
            SimParams::default(),
            vec![[2.0, 2.0]],
            vec![[0.0, 0.0]],
        )?;
        assert!(sim.trail().is_empty());
        Ok(())
    }

    #[test]
    fn temperature_written_through_handle_is_used() -> Result<()> {
        let mut sim = Simulation::new(small(6))?;
        sim.control().set_temperature(0.0)?;
        sim.step()?;
        assert!(sim.velocities().iter().all(|v| *v == [0.0, 0.0]));
        Ok(())
    }

    #[test]
    fn from_state_rejects_mismatched_lengths() {
        let err = Simulation::from_state(
            SimParams::default(),
            vec![[1.0, 1.0], [2.0, 2.0]],
            vec![[0.0, 0.0]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::LengthMismatch {
                positions: 2,
                velocities: 1
            }
        ));
    }

    #[test]
    fn from_state_recovers_margin_positions() -> Result<()> {
        let sim = Simulation::from_state(
            SimParams::default(),
            vec![[0.05, 5.0], [10.0, 9.95]],
            vec![[0.0, 0.0], [1.0, 0.0]],
        )?;
        assert_eq!(sim.positions(), vec![[0.1, 5.0], [9.9, 9.9]]);
        assert_eq!(sim.velocities()[1], [1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn kinetic_temperature_is_energy_per_degree_of_freedom() -> Result<()> {
        let sim = Simulation::from_state(
            SimParams::default(),
            vec![[2.0, 2.0], [6.0, 6.0]],
            vec![[1.0, 0.0], [0.0, 1.0]],
        )?;
        assert!((sim.kinetic_energy() - 1.0).abs() < 1e-12);
        assert!((sim.kinetic_temperature() - 0.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn setters_reject_non_finite_without_writing() -> Result<()> {
        let mut sim = Simulation::new(small(11))?;
        let (r0, v0) = (sim.positions(), sim.velocities());
        let mut bad_r = r0.clone();
        bad_r[3] = [f64::NAN, 1.0];
        let mut bad_v = v0.clone();
        bad_v[19] = [0.0, f64::INFINITY];
        assert!(matches!(sim.set_positions(&bad_r), Err(Error::InvalidParam(_))));
        assert!(matches!(sim.set_velocities(&bad_v), Err(Error::InvalidParam(_))));
        assert_eq!(sim.positions(), r0);
        assert_eq!(sim.velocities(), v0);
        Ok(())
    }

    #[test]
    fn setters_reject_wrong_length() -> Result<()> {
        let mut sim = Simulation::new(small(10))?;
        assert!(sim.set_positions(&[[1.0, 1.0]]).is_err());
        assert!(sim.set_velocities(&[[0.0, 0.0]; 3]).is_err());
        assert_eq!(sim.num_particles(), 20);
        Ok(())
    }

    #[test]
    fn from_state_rejects_points_outside_domain() {
        let err = Simulation::from_state(
            SimParams::default(),
            vec![[-3.0, 5.0]],
            vec![[0.0, 0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }

    #[test]
    fn sweep_and_prune_run_matches_all_pairs() -> Result<()> {
        let base = SimParams {
            num_particles: 150,
            radius: 0.2,
            seed: Some(77),
            ..SimParams::default()
        };
        let mut a = Simulation::new(base.clone())?;
        let mut b = Simulation::new(SimParams {
            broad_phase: BroadPhase::SweepAndPrune,
            ..base
        })?;
        let ra = a.advance(50)?;
        let rb = b.advance(50)?;
        assert_eq!(ra, rb);
        assert_eq!(a.particles(), b.particles());
        Ok(())
    }

    #[test]
    fn brownian_mode_starts_at_rest() -> Result<()> {
        let sim = Simulation::new(SimParams {
            collisions: false,
            ..small(8)
        })?;
        assert_eq!(sim.kinetic_energy(), 0.0);
        Ok(())
    }
}
