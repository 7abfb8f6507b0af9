//! Per-frame state update for the particle ensemble.
//!
//! One [`step`] runs, in order:
//! 1. thermal noise injection into velocities (or an exact freeze at `T == 0`),
//! 2. explicit Euler position update,
//! 3. per-axis wall containment with specular reflection,
//! 4. pairwise elastic collision response.
//!
//! Collision detection in phase 4 reads the positions produced by phase 3;
//! positions are not touched while pairs are resolved, so every pair is tested
//! against the same snapshot. Velocities, however, change as pairs are
//! resolved in ascending `(i, j)` order, so a particle in several contacts
//! receives the impulses one after another. This is deterministic but order
//! dependent, not a simultaneous multi-body solve. Overlapping particles are
//! only separated through their velocities; there is no positional correction.
//!
//! [`brownian_step`] is the reduced mode: a clamped random walk on positions.

use crate::core::broad_phase;
use crate::core::params::{BroadPhase, Domain};
use crate::core::particle::{Particle, DIM};
use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::StandardNormal;

/// Center distance below which a pair has no usable contact normal.
pub const MIN_CONTACT_DIST: f64 = 1e-12;

/// Valid region for particle centers: the domain shrunk by the radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub lo: [f64; DIM],
    pub hi: [f64; DIM],
    pub radius: f64,
}

impl Container {
    /// Build from a domain and the shared particle radius.
    ///
    /// Errors: `Error::OutOfRange` if the shrunk region is empty.
    pub fn new(domain: &Domain, radius: f64) -> Result<Self> {
        let mut lo = [0.0; DIM];
        let mut hi = [0.0; DIM];
        for k in 0..DIM {
            (lo[k], hi[k]) = domain.interior(k, radius);
            if !(lo[k] < hi[k]) {
                return Err(Error::OutOfRange(format!(
                    "no room for radius {radius} on axis {k}"
                )));
            }
        }
        Ok(Self { lo, hi, radius })
    }
}

/// Counters gathered during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Axis reflections at the walls (a corner hit counts twice).
    pub wall_bounces: usize,
    /// Pairs that received an impulse.
    pub collisions: usize,
    /// Overlapping pairs skipped because their centers coincide.
    pub degenerate_pairs: usize,
}

/// Outcome of testing a single pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Centers at least one diameter apart.
    NoContact,
    /// In contact but not approaching.
    Separating,
    /// Coincident centers, no normal direction.
    Degenerate,
    /// Impulse applied.
    Resolved,
}

/// Advance the ensemble by one timestep with collisions enabled.
///
/// Errors: `Error::InvalidParam` if `temperature` is negative or non-finite,
/// or if `dt` is not a positive finite number. Nothing is modified in that case.
pub fn step<R: Rng + ?Sized>(
    particles: &mut [Particle],
    temperature: f64,
    dt: f64,
    container: &Container,
    pairing: BroadPhase,
    rng: &mut R,
) -> Result<StepReport> {
    check_inputs(temperature, dt)?;

    inject_noise(particles, temperature, dt, rng);
    integrate_positions(particles, dt);

    let wall_bounces = contain(particles, container);

    let mut report = match pairing {
        BroadPhase::AllPairs => resolve_collisions(particles, container.radius),
        BroadPhase::SweepAndPrune => {
            let mut report = StepReport::default();
            for (i, j) in broad_phase::candidate_pairs(particles, container.radius) {
                tally(&mut report, resolve_pair(particles, i, j, container.radius));
            }
            report
        }
    };
    report.wall_bounces = wall_bounces;

    if report.degenerate_pairs > 0 {
        log::warn!(
            "skipped {} pair(s) with coincident centers",
            report.degenerate_pairs
        );
    }
    log::trace!(
        "step: {} wall bounces, {} collisions",
        report.wall_bounces,
        report.collisions
    );
    Ok(report)
}

/// Reduced mode: unconstrained random walk, clamped to the container.
///
/// Each coordinate moves by `sqrt(temperature * dt) * N(0, 1)`; velocities are
/// held at zero and nothing is reflected. A random walk whose per-frame step
/// has standard deviation `s` is `dt = 1`, `temperature = s * s`.
pub fn brownian_step<R: Rng + ?Sized>(
    particles: &mut [Particle],
    temperature: f64,
    dt: f64,
    container: &Container,
    rng: &mut R,
) -> Result<StepReport> {
    check_inputs(temperature, dt)?;

    let scale = (temperature * dt).sqrt();
    for p in particles.iter_mut() {
        p.v = [0.0; DIM];
        if temperature == 0.0 {
            continue;
        }
        for k in 0..DIM {
            let xi: f64 = rng.sample(StandardNormal);
            p.r[k] = (p.r[k] + scale * xi).clamp(container.lo[k], container.hi[k]);
        }
    }
    Ok(StepReport::default())
}

/// Phase 1. `v += sqrt(T) * N(0, 1) * dt` per component, or `v = 0` when `T == 0`.
///
/// Samples are drawn per particle in index order, x before y.
pub fn inject_noise<R: Rng + ?Sized>(
    particles: &mut [Particle],
    temperature: f64,
    dt: f64,
    rng: &mut R,
) {
    if temperature == 0.0 {
        for p in particles.iter_mut() {
            p.v = [0.0; DIM];
        }
        return;
    }
    let sigma = temperature.sqrt();
    for p in particles.iter_mut() {
        for vk in p.v.iter_mut() {
            let xi: f64 = rng.sample(StandardNormal);
            *vk += sigma * xi * dt;
        }
    }
}

/// Phase 2. Explicit Euler: `r += v * dt`.
pub fn integrate_positions(particles: &mut [Particle], dt: f64) {
    for p in particles.iter_mut() {
        for k in 0..DIM {
            p.r[k] += p.v[k] * dt;
        }
    }
}

/// Phase 3. Clamp each axis into the container, flipping that velocity
/// component on contact. Returns the number of reflections.
pub fn contain(particles: &mut [Particle], container: &Container) -> usize {
    let mut bounces = 0;
    for p in particles.iter_mut() {
        for k in 0..DIM {
            if p.r[k] < container.lo[k] {
                p.r[k] = container.lo[k];
                p.v[k] = -p.v[k];
                bounces += 1;
            } else if p.r[k] > container.hi[k] {
                p.r[k] = container.hi[k];
                p.v[k] = -p.v[k];
                bounces += 1;
            }
        }
    }
    bounces
}

/// Phase 4 over all pairs `i < j`, in ascending order.
pub fn resolve_collisions(particles: &mut [Particle], radius: f64) -> StepReport {
    let mut report = StepReport::default();
    let n = particles.len();
    for i in 0..n {
        for j in (i + 1)..n {
            tally(&mut report, resolve_pair(particles, i, j, radius));
        }
    }
    report
}

/// Elastic response for the pair `(i, j)`, `i < j`.
///
/// With `n = (r_i - r_j) / |r_i - r_j|` and `u = (v_i - v_j) · n`, an
/// approaching pair (`u < 0`) exchanges momentum along `n` only:
/// `v_i -= 2 m_j / (m_i + m_j) * u * n`, `v_j += 2 m_i / (m_i + m_j) * u * n`.
/// For equal masses both factors are exactly 1.
pub fn resolve_pair(particles: &mut [Particle], i: usize, j: usize, radius: f64) -> PairOutcome {
    debug_assert!(i < j, "pairs must be ordered");
    let (head, tail) = particles.split_at_mut(j);
    let (pi, pj) = (&mut head[i], &mut tail[0]);

    let mut delta = [0.0_f64; DIM];
    for (k, d) in delta.iter_mut().enumerate() {
        *d = pi.r[k] - pj.r[k];
    }
    let dist = dot(&delta, &delta).sqrt();
    if dist >= 2.0 * radius {
        return PairOutcome::NoContact;
    }
    if dist < MIN_CONTACT_DIST {
        return PairOutcome::Degenerate;
    }

    let mut n = delta;
    for nk in &mut n {
        *nk /= dist;
    }
    let mut u = [0.0_f64; DIM];
    for (k, uk) in u.iter_mut().enumerate() {
        *uk = pi.v[k] - pj.v[k];
    }
    let u_n = dot(&u, &n);
    if u_n >= 0.0 {
        return PairOutcome::Separating;
    }

    let total = pi.mass + pj.mass;
    let fi = (2.0 * pj.mass / total) * u_n;
    let fj = (2.0 * pi.mass / total) * u_n;
    for (k, &nk) in n.iter().enumerate() {
        pi.v[k] -= fi * nk;
        pj.v[k] += fj * nk;
    }
    pi.bump_collision_count();
    pj.bump_collision_count();
    PairOutcome::Resolved
}

fn check_inputs(temperature: f64, dt: f64) -> Result<()> {
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(Error::InvalidParam(format!(
            "temperature must be finite and >= 0, got {temperature}"
        )));
    }
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::InvalidParam(format!(
            "dt must be finite and > 0, got {dt}"
        )));
    }
    Ok(())
}

#[inline]
fn tally(report: &mut StepReport, outcome: PairOutcome) {
    match outcome {
        PairOutcome::Resolved => report.collisions += 1,
        PairOutcome::Degenerate => report.degenerate_pairs += 1,
        PairOutcome::NoContact | PairOutcome::Separating => {}
    }
}

#[inline]
fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
