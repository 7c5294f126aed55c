//! Volumetric source and sink terms.

use std::fmt;

use plume_core::{ComponentId, ConfigError, TransportError};
use plume_field::{Communicator, ReduceOp};
use plume_mesh::{Mesh, Parallel};

use crate::function::TimeFunction;

/// How a source's strength is spread over its cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distribution {
    /// The function gives a rate per unit volume in every cell.
    None,
    /// The function gives the total rate, spread in proportion to cell
    /// volume over the whole region (all ranks).
    Volume,
    /// The function gives the total rate, spread in proportion to
    /// volume times permeability.
    Permeability,
}

/// A source (positive) or sink (negative) of one component on a set of
/// owned cells.
///
/// Every rank must register the same sources in the same order; the cells
/// may differ, and may be empty.
pub struct SourceTerm {
    component: ComponentId,
    cells: Vec<usize>,
    function: Box<dyn TimeFunction>,
    distribution: Distribution,
    weights: Vec<f64>,
}

impl fmt::Debug for SourceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTerm")
            .field("component", &self.component)
            .field("cells", &self.cells)
            .field("distribution", &self.distribution)
            .finish_non_exhaustive()
    }
}

impl SourceTerm {
    /// Create a source on local owned `cells`.
    pub fn new(
        component: ComponentId,
        cells: Vec<usize>,
        function: impl TimeFunction + 'static,
        distribution: Distribution,
    ) -> Self {
        Self {
            component,
            cells,
            function: Box::new(function),
            distribution,
            weights: Vec::new(),
        }
    }

    /// The component this source feeds.
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Local cell indices.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Per-cell weights computed by [`prepare`](Self::prepare).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Validate the cells and compute the distribution weights.
    ///
    /// Collective for [`Distribution::Volume`] and
    /// [`Distribution::Permeability`].
    pub fn prepare(
        &mut self,
        mesh: &dyn Mesh,
        permeability: Option<&[f64]>,
        comm: &dyn Communicator,
    ) -> Result<(), TransportError> {
        // Agree on validity first so that no rank leaves before a collective.
        let owned = mesh.num_cells(Parallel::Owned);
        let foreign = self.cells.iter().filter(|&&c| c >= owned).count();
        let unweighted = self.distribution == Distribution::Permeability && permeability.is_none();
        let mut failed = [foreign as f64, if unweighted { 1.0 } else { 0.0 }];
        comm.all_reduce(ReduceOp::Sum, &mut failed)?;
        if failed[0] > 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "source terms",
                reason: format!("{} source cell(s) are not owned by their rank", failed[0]),
            }
            .into());
        }
        if failed[1] > 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "source terms",
                reason: format!(
                    "permeability-weighted source requires a permeability field, missing on {} rank(s)",
                    failed[1]
                ),
            }
            .into());
        }

        let volumes: Vec<f64> = self.cells.iter().map(|&c| mesh.cell_volume(c)).collect();
        self.weights = match self.distribution {
            Distribution::None => volumes,
            Distribution::Volume => {
                let total = comm.reduce_sum(volumes.iter().sum())?;
                normalized(volumes, total)?
            }
            Distribution::Permeability => {
                let k = permeability.unwrap_or_default();
                let weighted: Vec<f64> = self
                    .cells
                    .iter()
                    .zip(&volumes)
                    .map(|(&c, v)| v * k[c])
                    .collect();
                let total = comm.reduce_sum(weighted.iter().sum())?;
                normalized(weighted, total)?
            }
        };
        Ok(())
    }

    /// Add `scale × rate(time)` per cell into `target` and return the total
    /// added.
    pub fn accumulate(&self, time: f64, scale: f64, target: &mut [f64]) -> f64 {
        let rate = self.function.value(time) * scale;
        let mut total = 0.0;
        for (&c, &w) in self.cells.iter().zip(&self.weights) {
            target[c] += rate * w;
            total += rate * w;
        }
        total
    }
}

fn normalized(mut weights: Vec<f64>, total: f64) -> Result<Vec<f64>, ConfigError> {
    if !(total > 0.0) {
        return Err(ConfigError::InvalidValue {
            key: "source terms",
            reason: format!("distribution total must be > 0, got {total}"),
        });
    }
    for w in &mut weights {
        *w /= total;
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Constant;
    use plume_field::SerialComm;
    use plume_mesh::Line1D;

    fn mesh() -> plume_mesh::UnstructuredMesh {
        Line1D::new(4, 2.0).unwrap().build().unwrap()
    }

    #[test]
    fn per_volume_rate() {
        let mut s = SourceTerm::new(ComponentId(0), vec![1, 2], Constant(3.0), Distribution::None);
        s.prepare(&mesh(), None, &SerialComm).unwrap();
        assert_eq!(s.weights(), &[2.0, 2.0]);
        let mut rate = [0.0; 4];
        let total = s.accumulate(0.0, 1.0, &mut rate);
        assert_eq!(rate, [0.0, 6.0, 6.0, 0.0]);
        assert_eq!(total, 12.0);
    }

    #[test]
    fn volume_distribution_splits_total() {
        let mut s = SourceTerm::new(ComponentId(0), vec![0, 1, 2, 3], Constant(8.0), Distribution::Volume);
        s.prepare(&mesh(), None, &SerialComm).unwrap();
        let mut rate = [0.0; 4];
        let total = s.accumulate(0.0, 0.5, &mut rate);
        assert_eq!(rate, [1.0; 4]);
        assert_eq!(total, 4.0);
    }

    #[test]
    fn permeability_distribution() {
        let mut s = SourceTerm::new(ComponentId(0), vec![0, 1], Constant(1.0), Distribution::Permeability);
        assert!(s.prepare(&mesh(), None, &SerialComm).is_err());
        let k = [1.0, 3.0, 0.0, 0.0];
        s.prepare(&mesh(), Some(&k), &SerialComm).unwrap();
        assert_eq!(s.weights(), &[0.25, 0.75]);
    }

    #[test]
    fn ghost_or_missing_cells_are_rejected() {
        let mut s = SourceTerm::new(ComponentId(0), vec![7], Constant(1.0), Distribution::None);
        assert!(s.prepare(&mesh(), None, &SerialComm).is_err());
    }
}
