//! Chain of equal cells along the `x` axis.

use crate::error::MeshError;
use crate::unstructured::{MeshBuilder, UnstructuredMesh};

/// A one-dimensional chain of `len` cells of width `dx`.
///
/// Cell `i` spans `[i*dx, (i+1)*dx]`. Face `i` sits at `x = i*dx` with the
/// reference normal `+x`, so it points out of cell `i - 1` and into cell
/// `i`. Faces `0` and `len` are the inlet and outlet boundaries.
///
/// ```
/// use plume_mesh::{Line1D, Mesh, Parallel};
///
/// let mesh = Line1D::new(4, 1.0).unwrap().build().unwrap();
/// assert_eq!(mesh.num_cells(Parallel::All), 4);
/// assert_eq!(mesh.num_faces(Parallel::All), 5);
/// assert!(mesh.is_boundary_face(0));
/// assert_eq!(mesh.face_dir(0, 0), Some(-1.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line1D {
    len: usize,
    dx: f64,
}

impl Line1D {
    /// Create a chain of `len` cells of width `dx`.
    ///
    /// Returns `Err(MeshError::EmptyMesh)` if `len == 0` and
    /// `Err(MeshError::InvalidVolume)` if `dx` is not finite and > 0.
    pub fn new(len: usize, dx: f64) -> Result<Self, MeshError> {
        if len == 0 {
            return Err(MeshError::EmptyMesh);
        }
        if !dx.is_finite() || dx <= 0.0 {
            return Err(MeshError::InvalidVolume { cell: 0, volume: dx });
        }
        Ok(Self { len, dx })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always returns `false`; construction rejects `len == 0`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Cell width.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Materialize the chain as an [`UnstructuredMesh`].
    pub fn build(&self) -> Result<UnstructuredMesh, MeshError> {
        let mut b = MeshBuilder::new(1);
        for i in 0..self.len {
            b.add_cell(self.dx, [(i as f64 + 0.5) * self.dx, 0.0, 0.0]);
        }
        let normal = [1.0, 0.0, 0.0];
        for i in 0..=self.len {
            let x = [i as f64 * self.dx, 0.0, 0.0];
            if i == 0 {
                b.add_face(&[(0, -1.0)], x, normal, 1.0);
            } else if i == self.len {
                b.add_face(&[(i - 1, 1.0)], x, normal, 1.0);
            } else {
                b.add_face(&[(i - 1, 1.0), (i, -1.0)], x, normal, 1.0);
            }
        }
        b.build()
    }
}
