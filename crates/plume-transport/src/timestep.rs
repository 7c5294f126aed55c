//! Stable explicit time step from the outflux bound.

use plume_core::CommError;
use plume_field::Communicator;
use plume_mesh::{Mesh, Parallel};

use crate::config::{SpatialOrder, TransportConfig};
use crate::upwind::UpwindMap;

/// Result of a stable-step estimate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StableStep {
    /// The step to use: the global bound after the ceiling and CFL factor.
    pub dt: f64,
    /// Global bound before the ceiling and CFL factor.
    pub bound: f64,
    /// Local owned cell attaining the global bound, if on this rank.
    pub limiting_cell: Option<usize>,
}

impl StableStep {
    /// `true` when no cell anywhere has outflow.
    pub fn is_stagnant(&self, config: &TransportConfig) -> bool {
        self.bound >= config.large_time_step
    }
}

/// Computes the donor-cell positivity bound.
///
/// Holds the per-cell outflux buffer between calls.
#[derive(Clone, Debug, Default)]
pub struct StableStepEstimator {
    outflux: Vec<f64>,
}

impl StableStepEstimator {
    /// Create an estimator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate the largest step keeping donor-cell masses non-negative.
    ///
    /// For each owned cell with outflow the admissible step is
    /// `volume * porosity * min(ws_start, ws_end) / outflux`. The local
    /// minimum is halved for second-order space, reduced to a global
    /// minimum, clamped by `config.max_time_step` and scaled by
    /// `config.cfl`. When no cell has outflow the bound is
    /// `config.large_time_step`, unhalved.
    ///
    /// Collective: one global minimum.
    #[allow(clippy::too_many_arguments)]
    pub fn estimate(
        &mut self,
        mesh: &dyn Mesh,
        upwind: &UpwindMap,
        flux: &[f64],
        porosity: &[f64],
        saturation: (&[f64], &[f64]),
        config: &TransportConfig,
        comm: &dyn Communicator,
    ) -> Result<StableStep, CommError> {
        let (ws_start, ws_end) = saturation;
        self.outflux.clear();
        self.outflux.resize(mesh.num_cells(Parallel::All), 0.0);
        for f in 0..mesh.num_faces(Parallel::All) {
            if let Some(c) = upwind.upwind(f) {
                self.outflux[c] += flux[f].abs();
            }
        }

        let mut local = config.large_time_step;
        let mut cell = None;
        for c in 0..mesh.num_cells(Parallel::Owned) {
            let outflux = self.outflux[c];
            if outflux > 0.0 {
                let storage = mesh.cell_volume(c) * porosity[c] * ws_start[c].min(ws_end[c]);
                let dt = storage / outflux;
                if dt < local {
                    local = dt;
                    cell = Some(c);
                }
            }
        }
        if cell.is_some() && config.spatial_order == SpatialOrder::Second {
            local /= 2.0;
        }

        let bound = comm.reduce_min(local)?;
        let limiting_cell = cell.filter(|_| local == bound);
        if let Some(c) = limiting_cell {
            log::debug!(
                "stable step {bound:e} limited by cell {c} on rank {}",
                comm.rank()
            );
        }

        let dt = bound.min(config.max_time_step) * config.cfl;
        Ok(StableStep {
            dt,
            bound,
            limiting_cell,
        })
    }
}
