use crate::core::particle::DIM;
use std::collections::VecDeque;

/// Bounded history of one particle's positions, oldest first.
///
/// Once `capacity` positions are stored, each push drops the oldest.
/// A capacity of 0 stores nothing.
#[derive(Debug, Clone)]
pub struct PathTrail {
    points: VecDeque<[f64; DIM]>,
    capacity: usize,
}

impl PathTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, r: [f64; DIM]) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(r);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent position, if any.
    pub fn last(&self) -> Option<&[f64; DIM]> {
        self.points.back()
    }

    pub fn to_vec(&self) -> Vec<[f64; DIM]> {
        self.points.iter().copied().collect()
    }
}
