//! Structured quadrilateral grid.

use crate::error::MeshError;
use crate::unstructured::{MeshBuilder, UnstructuredMesh};

/// An `nx × ny` grid of `dx × dy` rectangles with the origin at the lower
/// left corner.
///
/// Cell `(i, j)` has index `i + nx * j`. Faces normal to `x` come first,
/// `(nx + 1) * ny` of them ordered row by row, followed by the faces normal
/// to `y`. All reference normals point along `+x` or `+y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid2D {
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
}

impl Grid2D {
    /// Create an `nx × ny` grid with cell size `dx × dy`.
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64) -> Result<Self, MeshError> {
        if nx == 0 || ny == 0 {
            return Err(MeshError::EmptyMesh);
        }
        let area = dx * dy;
        if !area.is_finite() || dx <= 0.0 || dy <= 0.0 {
            return Err(MeshError::InvalidVolume {
                cell: 0,
                volume: area,
            });
        }
        Ok(Self { nx, ny, dx, dy })
    }

    /// Cells along `x`.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Cells along `y`.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Index of cell `(i, j)`.
    pub fn cell(&self, i: usize, j: usize) -> usize {
        i + self.nx * j
    }

    /// Index of the `x`-normal face at `x = i*dx` in row `j`.
    pub fn x_face(&self, i: usize, j: usize) -> usize {
        i + (self.nx + 1) * j
    }

    /// Index of the `y`-normal face at `y = j*dy` in column `i`.
    pub fn y_face(&self, i: usize, j: usize) -> usize {
        (self.nx + 1) * self.ny + i + self.nx * j
    }

    /// Total number of faces.
    pub fn face_count(&self) -> usize {
        (self.nx + 1) * self.ny + self.nx * (self.ny + 1)
    }

    /// Materialize the grid as an [`UnstructuredMesh`].
    pub fn build(&self) -> Result<UnstructuredMesh, MeshError> {
        let (nx, ny, dx, dy) = (self.nx, self.ny, self.dx, self.dy);
        let mut b = MeshBuilder::new(2);
        for j in 0..ny {
            for i in 0..nx {
                b.add_cell(dx * dy, [(i as f64 + 0.5) * dx, (j as f64 + 0.5) * dy, 0.0]);
            }
        }
        for j in 0..ny {
            for i in 0..=nx {
                let centroid = [i as f64 * dx, (j as f64 + 0.5) * dy, 0.0];
                let mut cells = Vec::with_capacity(2);
                if i > 0 {
                    cells.push((self.cell(i - 1, j), 1.0));
                }
                if i < nx {
                    cells.push((self.cell(i, j), -1.0));
                }
                b.add_face(&cells, centroid, [1.0, 0.0, 0.0], dy);
            }
        }
        for j in 0..=ny {
            for i in 0..nx {
                let centroid = [(i as f64 + 0.5) * dx, j as f64 * dy, 0.0];
                let mut cells = Vec::with_capacity(2);
                if j > 0 {
                    cells.push((self.cell(i, j - 1), 1.0));
                }
                if j < ny {
                    cells.push((self.cell(i, j), -1.0));
                }
                b.add_face(&cells, centroid, [0.0, 1.0, 0.0], dx);
            }
        }
        b.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, Parallel};

    #[test]
    fn face_indexing_matches_build_order() {
        let g = Grid2D::new(3, 2, 1.0, 0.5).unwrap();
        let m = g.build().unwrap();
        assert_eq!(m.num_faces(Parallel::All), g.face_count());
        assert_eq!(m.face_cells(g.x_face(1, 1)), &[g.cell(0, 1), g.cell(1, 1)]);
        assert_eq!(m.face_cells(g.y_face(2, 1)), &[g.cell(2, 0), g.cell(2, 1)]);
        assert!(m.is_boundary_face(g.y_face(0, 2)));
        assert_eq!(m.face_area(g.x_face(0, 0)), 0.5);
        assert_eq!(m.face_area(g.y_face(0, 0)), 1.0);
    }

    #[test]
    fn every_cell_has_four_faces_and_closes() {
        let g = Grid2D::new(4, 3, 0.5, 2.0).unwrap();
        let m = g.build().unwrap();
        for c in 0..m.num_cells(Parallel::All) {
            let faces = m.cell_faces(c);
            assert_eq!(faces.len(), 4);
            // Closed cell: Σ dir · area · normal = 0.
            let mut sum = [0.0; 2];
            for &(f, dir) in faces {
                let n = m.face_normal(f);
                sum[0] += dir * m.face_area(f) * n[0];
                sum[1] += dir * m.face_area(f) * n[1];
            }
            assert!(sum[0].abs() < 1e-12 && sum[1].abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_empty_grid() {
        assert_eq!(Grid2D::new(0, 3, 1.0, 1.0).unwrap_err(), MeshError::EmptyMesh);
        assert!(Grid2D::new(2, 2, 1.0, 0.0).is_err());
    }
}
