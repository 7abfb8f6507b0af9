//! Broad-phase candidate pairs using sweep-and-prune on the x axis.
//!
//! Candidates are returned sorted ascending by `(i, j)`, the same order the
//! all-pairs loop visits them, so resolving them gives bit-identical results.

use crate::core::particle::Particle;

/// Candidate pair of particle indices, `i < j`.
pub type CandidatePair = (usize, usize);

#[derive(Clone, Copy)]
struct Endpoint {
    value: f64,
    idx: usize,
    is_min: bool,
}

/// Pairs whose `radius`-sized boxes overlap on both axes.
///
/// Every pair closer than one diameter is included; the narrow phase decides
/// the rest.
pub fn candidate_pairs(particles: &[Particle], radius: f64) -> Vec<CandidatePair> {
    if particles.len() < 2 {
        return Vec::new();
    }

    let mut endpoints: Vec<Endpoint> = Vec::with_capacity(2 * particles.len());
    for (idx, p) in particles.iter().enumerate() {
        endpoints.push(Endpoint {
            value: p.r[0] - radius,
            idx,
            is_min: true,
        });
        endpoints.push(Endpoint {
            value: p.r[0] + radius,
            idx,
            is_min: false,
        });
    }
    // Opening endpoints sort before closing ones at equal value.
    endpoints.sort_by(|a, b| {
        a.value
            .total_cmp(&b.value)
            .then_with(|| b.is_min.cmp(&a.is_min))
    });

    let diameter = 2.0 * radius;
    let mut pairs = Vec::new();
    let mut active: Vec<usize> = Vec::new();
    for ep in endpoints {
        if ep.is_min {
            let y = particles[ep.idx].r[1];
            for &other in &active {
                if (particles[other].r[1] - y).abs() <= diameter {
                    pairs.push(if ep.idx < other {
                        (ep.idx, other)
                    } else {
                        (other, ep.idx)
                    });
                }
            }
            active.push(ep.idx);
        } else {
            active.retain(|&x| x != ep.idx);
        }
    }

    pairs.sort_unstable();
    pairs
}
