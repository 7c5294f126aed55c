//! Upwind/downwind cell identification.

use plume_mesh::{Mesh, Parallel};

/// For every local face, the cell the flux leaves (upwind) and the cell it
/// enters (downwind). `None` marks the side outside the domain.
///
/// A cell is upwind of face `f` when `flux[f] * dir > 0`, with `dir` the
/// face's orientation sign for that cell. Zero flux is assigned to the
/// upwind side: on an interior face the cell the reference normal points
/// out of (`dir > 0`) is upwind, and on a boundary face the single cell is
/// upwind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpwindMap {
    upwind: Vec<Option<usize>>,
    downwind: Vec<Option<usize>>,
}

impl UpwindMap {
    /// Allocate maps for `n_faces` faces.
    pub fn new(n_faces: usize) -> Self {
        Self {
            upwind: vec![None; n_faces],
            downwind: vec![None; n_faces],
        }
    }

    /// Recompute both maps in place from `flux`.
    ///
    /// Allocates only if the mesh has more faces than the maps.
    pub fn identify(&mut self, mesh: &dyn Mesh, flux: &[f64]) {
        let n_faces = mesh.num_faces(Parallel::All);
        self.upwind.clear();
        self.upwind.resize(n_faces, None);
        self.downwind.clear();
        self.downwind.resize(n_faces, None);

        for c in 0..mesh.num_cells(Parallel::All) {
            for &(f, dir) in mesh.cell_faces(c) {
                let q = flux[f] * dir;
                let leaves = if q != 0.0 {
                    q > 0.0
                } else {
                    dir > 0.0 || mesh.is_boundary_face(f)
                };
                if leaves {
                    self.upwind[f] = Some(c);
                } else {
                    self.downwind[f] = Some(c);
                }
            }
        }
    }

    /// Upwind cell of face `f`.
    pub fn upwind(&self, f: usize) -> Option<usize> {
        self.upwind[f]
    }

    /// Downwind cell of face `f`.
    pub fn downwind(&self, f: usize) -> Option<usize> {
        self.downwind[f]
    }

    /// Number of faces covered.
    pub fn len(&self) -> usize {
        self.upwind.len()
    }

    /// `true` when no faces are covered.
    pub fn is_empty(&self) -> bool {
        self.upwind.is_empty()
    }
}
