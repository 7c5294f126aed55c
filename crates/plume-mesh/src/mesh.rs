//! The [`Mesh`] trait: read-only topology and geometry of a local mesh.

/// A point or vector in physical space.
///
/// Coordinates beyond [`Mesh::dim`] are zero.
pub type Point = [f64; 3];

/// Selects which entities an entity count covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallel {
    /// Entities owned by this rank. They occupy local indices `0..n_owned`.
    Owned,
    /// Owned entities followed by ghosts.
    All,
}

/// Per-process view of an unstructured polyhedral mesh.
///
/// Local indices place owned entities first and ghosts after, so
/// `c < num_cells(Parallel::Owned)` is the ownership test for cells and
/// likewise for faces. A face has one adjacent cell on the domain boundary
/// and two in the interior. The orientation sign of a face with respect to
/// an adjacent cell is `+1.0` when the face normal points out of that cell
/// and `-1.0` otherwise.
///
/// The trait is object-safe; the transport crate consumes meshes as
/// `&dyn Mesh`.
pub trait Mesh: Send + Sync {
    /// Number of meaningful coordinates (1, 2 or 3).
    fn dim(&self) -> usize;

    /// Number of cells in the requested set.
    fn num_cells(&self, which: Parallel) -> usize;

    /// Number of faces in the requested set.
    fn num_faces(&self, which: Parallel) -> usize;

    /// Volume of cell `c`.
    fn cell_volume(&self, c: usize) -> f64;

    /// Centroid of cell `c`.
    fn cell_centroid(&self, c: usize) -> Point;

    /// Faces bounding cell `c`, each paired with its orientation sign.
    fn cell_faces(&self, c: usize) -> &[(usize, f64)];

    /// Cells adjacent to face `f`: one on the boundary, two in the interior.
    fn face_cells(&self, f: usize) -> &[usize];

    /// Centroid of face `f`.
    fn face_centroid(&self, f: usize) -> Point;

    /// Unit reference normal of face `f`.
    fn face_normal(&self, f: usize) -> Point;

    /// Area (length in 2-D) of face `f`.
    fn face_area(&self, f: usize) -> f64;

    /// Whether `f` lies on the boundary of the global domain.
    fn is_boundary_face(&self, f: usize) -> bool {
        self.face_cells(f).len() == 1
    }

    /// Orientation sign of face `f` with respect to cell `c`, or `None` if
    /// `c` is not adjacent to `f`.
    fn face_dir(&self, f: usize, c: usize) -> Option<f64> {
        self.cell_faces(c)
            .iter()
            .find(|&&(face, _)| face == f)
            .map(|&(_, dir)| dir)
    }

    /// Whether cell `c` is owned by this rank.
    fn is_owned_cell(&self, c: usize) -> bool {
        c < self.num_cells(Parallel::Owned)
    }
}

/// `b - a` restricted to the first `dim` coordinates.
pub fn displacement(a: &Point, b: &Point, dim: usize) -> Point {
    let mut d = [0.0; 3];
    for k in 0..dim {
        d[k] = b[k] - a[k];
    }
    d
}

/// Dot product over the first `dim` coordinates.
pub fn dot(a: &[f64], b: &[f64], dim: usize) -> f64 {
    (0..dim).map(|k| a[k] * b[k]).sum()
}
