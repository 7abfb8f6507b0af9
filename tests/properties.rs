use approx::assert_relative_eq;
use brownsim::core::integrator::{self, Container};
use brownsim::core::{BroadPhase, Domain, Particle, SimParams, Simulation};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn dense(seed: u64) -> SimParams {
    SimParams {
        num_particles: 200,
        domain: Domain::square(5.0),
        radius: 0.1,
        dt: 0.01,
        initial_temperature: 4.0,
        seed: Some(seed),
        ..SimParams::default()
    }
}

/// Every center stays inside [r, L - r] on both axes for many steps.
#[test]
fn containment_holds_every_step() -> brownsim::Result<()> {
    let mut sim = Simulation::new(dense(11))?;
    let c = *sim.container();
    for _ in 0..300 {
        sim.step()?;
        for p in sim.particles() {
            for k in 0..2 {
                assert!(
                    p.r[k] >= c.lo[k] && p.r[k] <= c.hi[k],
                    "particle {} escaped: {:?}",
                    p.id,
                    p.r
                );
            }
        }
    }
    Ok(())
}

/// T = 0 zeroes every velocity and leaves positions where they were.
#[test]
fn zero_temperature_freezes_ensemble() -> brownsim::Result<()> {
    let mut sim = Simulation::new(dense(12))?;
    sim.advance(20)?;
    let before = sim.positions();
    sim.set_temperature(0.0)?;
    sim.step()?;
    assert!(sim.velocities().iter().all(|v| *v == [0.0, 0.0]));
    assert_eq!(sim.positions(), before);
    Ok(())
}

/// Same seed, same inputs: bit-identical trajectories.
#[test]
fn seeded_runs_are_bit_identical() -> brownsim::Result<()> {
    let mut a = Simulation::new(dense(2024))?;
    let mut b = Simulation::new(dense(2024))?;
    for _ in 0..100 {
        let ra = a.step()?;
        let rb = b.step()?;
        assert_eq!(ra, rb);
    }
    assert_eq!(a.positions(), b.positions());
    assert_eq!(a.velocities(), b.velocities());
    assert_eq!(a.trail().to_vec(), b.trail().to_vec());
    Ok(())
}

/// Different seeds diverge.
#[test]
fn different_seeds_differ() -> brownsim::Result<()> {
    let a = Simulation::new(dense(1))?;
    let b = Simulation::new(dense(2))?;
    assert_ne!(a.positions(), b.positions());
    Ok(())
}

/// Reset keeps the ensemble size, stays in bounds and empties the path history.
#[test]
fn reset_draws_fresh_contained_state() -> brownsim::Result<()> {
    let mut sim = Simulation::new(dense(3))?;
    sim.advance(50)?;
    let old = sim.positions();
    sim.reset()?;
    assert_eq!(sim.num_particles(), 200);
    assert_ne!(sim.positions(), old);
    assert_eq!(sim.steps(), 0);
    assert!(sim.trail().is_empty());
    let c = *sim.container();
    for p in sim.particles() {
        assert!(p.r[0] >= c.lo[0] && p.r[0] <= c.hi[0]);
        assert!(p.r[1] >= c.lo[1] && p.r[1] <= c.hi[1]);
    }
    Ok(())
}

/// The trail only records positions produced by a step.
#[test]
fn trail_starts_empty_and_refills_after_reset() -> brownsim::Result<()> {
    let mut sim = Simulation::new(SimParams {
        num_particles: 5,
        ..dense(1)
    })?;
    assert!(sim.trail().is_empty());
    sim.advance(10)?;
    assert_eq!(sim.trail().len(), 10);
    sim.reset()?;
    assert!(sim.trail().is_empty());
    sim.step()?;
    assert_eq!(sim.trail().to_vec(), vec![sim.particles()[0].r]);
    Ok(())
}

/// Trail is bounded by its capacity and tracks the designated particle.
#[test]
fn trail_is_bounded_and_follows_tracked_particle() -> brownsim::Result<()> {
    let mut sim = Simulation::new(SimParams {
        trail_capacity: 25,
        tracked_particle: Some(7),
        ..dense(4)
    })?;
    sim.advance(100)?;
    assert_eq!(sim.trail().len(), 25);
    assert_eq!(sim.trail().last(), Some(&sim.particles()[7].r));
    Ok(())
}

/// N = 2, L = 10, r = 0.1: particles at (4.9, 5) and (5.1, 5) approaching at
/// unit speed swap x-velocities and keep y untouched.
#[test]
fn two_particle_head_on_scenario() -> brownsim::Result<()> {
    let mut ps = vec![
        Particle::new(0, [4.9, 5.0], [1.0, 0.0], 1.0)?,
        Particle::new(1, [5.1, 5.0], [-1.0, 0.0], 1.0)?,
    ];
    let e0: f64 = ps.iter().map(Particle::kinetic_energy).sum();
    let report = integrator::resolve_collisions(&mut ps, 0.1);
    assert_eq!(report.collisions, 1);
    assert_eq!(ps[0].v, [-1.0, 0.0]);
    assert_eq!(ps[1].v, [1.0, 0.0]);
    assert_eq!(ps[0].r[1], 5.0);
    assert_eq!(ps[1].r[1], 5.0);
    let e1: f64 = ps.iter().map(Particle::kinetic_energy).sum();
    assert_relative_eq!(e0, e1, epsilon = 1e-12);
    Ok(())
}

/// The same pair pushed through a full step at T = 0 freezes instead:
/// velocity freezing happens before collision response.
#[test]
fn two_particle_scenario_at_zero_temperature_freezes() -> brownsim::Result<()> {
    let params = SimParams {
        initial_temperature: 0.0,
        seed: Some(1),
        ..SimParams::default()
    };
    let mut sim = Simulation::from_state(
        params,
        vec![[4.9, 5.0], [5.1, 5.0]],
        vec![[1.0, 0.0], [-1.0, 0.0]],
    )?;
    let report = sim.step()?;
    assert_eq!(report.collisions, 0);
    assert_eq!(sim.velocities(), vec![[0.0, 0.0], [0.0, 0.0]]);
    assert_eq!(sim.positions(), vec![[4.9, 5.0], [5.1, 5.0]]);
    Ok(())
}

/// A particle on the wall moving outward leaves with the sign flipped.
#[test]
fn wall_reflection_flips_sign() -> brownsim::Result<()> {
    let c = Container::new(&Domain::square(10.0), 0.1)?;
    let mut ps = vec![Particle::new(0, [0.1, 5.0], [-3.0, 0.0], 1.0)?];
    let mut rng = StdRng::seed_from_u64(0);
    integrator::step(&mut ps, 1e-8, 0.01, &c, BroadPhase::AllPairs, &mut rng)?;
    assert_eq!(ps[0].r[0], 0.1);
    assert_relative_eq!(ps[0].v[0], 3.0, epsilon = 1e-5);
    Ok(())
}

/// Without noise, wall bounces and pair collisions only redistribute energy.
#[test]
fn collisions_and_walls_conserve_energy_without_noise() -> brownsim::Result<()> {
    let sim = Simulation::new(dense(21))?;
    let mut ps = sim.particles().to_vec();
    let c = *sim.container();
    let e0: f64 = ps.iter().map(Particle::kinetic_energy).sum();
    let mut collided = 0;
    for _ in 0..200 {
        integrator::integrate_positions(&mut ps, 0.01);
        integrator::contain(&mut ps, &c);
        collided += integrator::resolve_collisions(&mut ps, c.radius).collisions;
    }
    let e1: f64 = ps.iter().map(Particle::kinetic_energy).sum();
    assert!(collided > 0);
    assert_relative_eq!(e0, e1, max_relative = 1e-9);
    Ok(())
}

/// Sweep-and-prune pairing reproduces the all-pairs trajectory exactly.
#[test]
fn broad_phase_does_not_change_results() -> brownsim::Result<()> {
    let mut a = Simulation::new(dense(31))?;
    let mut b = Simulation::new(SimParams {
        broad_phase: BroadPhase::SweepAndPrune,
        ..dense(31)
    })?;
    a.advance(100)?;
    b.advance(100)?;
    assert_eq!(a.particles(), b.particles());
    Ok(())
}
