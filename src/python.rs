use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::core::particle::DIM;
use crate::core::{Domain, SimParams, Simulation};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn to_array(rows: &[[f64; DIM]]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), DIM), |(i, k)| rows[i][k])
}

fn from_array(arr: &PyReadonlyArray2<'_, f64>, n: usize, what: &str) -> PyResult<Vec<[f64; DIM]>> {
    let arr = arr.as_array();
    if arr.shape() != [n, DIM] {
        return Err(py_err(format!(
            "{what} must have shape ({n}, {DIM}), got {:?}",
            arr.shape()
        )));
    }
    Ok(arr
        .rows()
        .into_iter()
        .map(|row| [row[0], row[1]])
        .collect())
}

/// Python-facing wrapper around the ensemble simulation.
///
/// A plotting front end owns the frame loop: it calls `step()` once per frame,
/// feeds `get_positions()` to a scatter plot and `get_trail()` to a line, and
/// wires its slider to `set_temperature` and its button to `reset`.
#[pyclass(name = "BrownianSim")]
pub struct BrownianSim {
    sim: Simulation,
}

#[pymethods]
impl BrownianSim {
    /// Parameters
    /// - num_particles: ensemble size (int, > 0)
    /// - box_size: edge length L of the square domain [0, L]^2
    /// - radius: shared particle radius (0 < radius < L/2)
    /// - mass: shared particle mass (> 0)
    /// - dt: fixed timestep (> 0)
    /// - collisions: False selects the clamped random-walk mode
    /// - temperature: initial temperature in [0, max_temperature]
    /// - max_temperature: upper bound for set_temperature
    /// - trail_capacity: positions of particle 0 kept by get_trail
    /// - seed: RNG seed (int) for reproducibility; None for nondeterministic
    ///
    /// Errors: raises ValueError on invalid parameters.
    #[new]
    #[pyo3(signature = (
        num_particles,
        box_size=10.0,
        radius=0.1,
        mass=1.0,
        dt=0.01,
        collisions=true,
        temperature=1.0,
        max_temperature=10.0,
        trail_capacity=1000,
        seed=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        num_particles: usize,
        box_size: f64,
        radius: f64,
        mass: f64,
        dt: f64,
        collisions: bool,
        temperature: f64,
        max_temperature: f64,
        trail_capacity: usize,
        seed: Option<u64>,
    ) -> PyResult<Self> {
        let params = SimParams {
            num_particles,
            domain: Domain::square(box_size),
            radius,
            mass,
            dt,
            collisions,
            max_temperature,
            initial_temperature: temperature,
            trail_capacity,
            seed,
            ..SimParams::default()
        };
        let sim = Simulation::new(params).map_err(py_err)?;
        Ok(Self { sim })
    }

    /// Advance `n` steps (releases the GIL during computation).
    ///
    /// Returns (wall_bounces, collisions, degenerate_pairs) summed over the steps.
    #[pyo3(signature = (n=1))]
    fn step(&mut self, py: Python<'_>, n: usize) -> PyResult<(usize, usize, usize)> {
        let report = py.detach(|| self.sim.advance(n)).map_err(py_err)?;
        Ok((report.wall_bounces, report.collisions, report.degenerate_pairs))
    }

    /// Replace the ensemble with a fresh random draw and clear the trail.
    fn reset(&mut self) -> PyResult<()> {
        self.sim.reset().map_err(py_err)
    }

    /// Set the temperature; values above max_temperature are clamped.
    /// Returns the stored value.
    fn set_temperature(&self, t: f64) -> PyResult<f64> {
        self.sim.set_temperature(t).map_err(py_err)
    }

    #[getter]
    fn temperature(&self) -> f64 {
        self.sim.temperature()
    }

    #[getter]
    fn time(&self) -> f64 {
        self.sim.time()
    }

    /// Return positions as a NumPy array of shape (N, 2), dtype=float64.
    fn get_positions(&self, py: Python<'_>) -> Py<PyArray2<f64>> {
        to_array(&self.sim.positions()).into_pyarray(py).unbind()
    }

    /// Return velocities as a NumPy array of shape (N, 2), dtype=float64.
    fn get_velocities(&self, py: Python<'_>) -> Py<PyArray2<f64>> {
        to_array(&self.sim.velocities()).into_pyarray(py).unbind()
    }

    /// Return the tracked particle's recent positions, oldest first, shape (M, 2).
    fn get_trail(&self, py: Python<'_>) -> Py<PyArray2<f64>> {
        to_array(&self.sim.trail().to_vec()).into_pyarray(py).unbind()
    }

    /// Set all particle positions from an array of shape (N, 2).
    /// Points within one radius of a wall are moved onto the valid boundary.
    fn set_positions(&mut self, positions: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let rows = from_array(&positions, self.sim.num_particles(), "positions")?;
        self.sim.set_positions(&rows).map_err(py_err)
    }

    /// Set all particle velocities from an array of shape (N, 2).
    fn set_velocities(&mut self, velocities: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let rows = from_array(&velocities, self.sim.num_particles(), "velocities")?;
        self.sim.set_velocities(&rows).map_err(py_err)
    }

    fn kinetic_energy(&self) -> f64 {
        self.sim.kinetic_energy()
    }
}

/// The brownsim Python module entry point.
#[pymodule]
fn brownsim(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<BrownianSim>()?;
    Ok(())
}
