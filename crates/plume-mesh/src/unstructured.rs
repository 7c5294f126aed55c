//! A general unstructured mesh and its builder.

use smallvec::{smallvec, SmallVec};

use crate::error::MeshError;
use crate::mesh::{Mesh, Parallel, Point};

/// An unstructured polyhedral mesh stored as flat adjacency arrays.
///
/// Built with [`MeshBuilder`]. The owned/ghost split is fixed at build time:
/// the first `owned_cells` cells and `owned_faces` faces are owned.
#[derive(Clone, Debug)]
pub struct UnstructuredMesh {
    dim: usize,
    owned_cells: usize,
    owned_faces: usize,
    cell_volume: Vec<f64>,
    cell_centroid: Vec<Point>,
    cell_faces: Vec<SmallVec<[(usize, f64); 6]>>,
    face_cells: Vec<SmallVec<[usize; 2]>>,
    face_centroid: Vec<Point>,
    face_normal: Vec<Point>,
    face_area: Vec<f64>,
}

impl Mesh for UnstructuredMesh {
    fn dim(&self) -> usize {
        self.dim
    }

    fn num_cells(&self, which: Parallel) -> usize {
        match which {
            Parallel::Owned => self.owned_cells,
            Parallel::All => self.cell_volume.len(),
        }
    }

    fn num_faces(&self, which: Parallel) -> usize {
        match which {
            Parallel::Owned => self.owned_faces,
            Parallel::All => self.face_area.len(),
        }
    }

    fn cell_volume(&self, c: usize) -> f64 {
        self.cell_volume[c]
    }

    fn cell_centroid(&self, c: usize) -> Point {
        self.cell_centroid[c]
    }

    fn cell_faces(&self, c: usize) -> &[(usize, f64)] {
        &self.cell_faces[c]
    }

    fn face_cells(&self, f: usize) -> &[usize] {
        &self.face_cells[f]
    }

    fn face_centroid(&self, f: usize) -> Point {
        self.face_centroid[f]
    }

    fn face_normal(&self, f: usize) -> Point {
        self.face_normal[f]
    }

    fn face_area(&self, f: usize) -> f64 {
        self.face_area[f]
    }
}

struct PendingFace {
    cells: SmallVec<[(usize, f64); 2]>,
    centroid: Point,
    normal: Point,
    area: f64,
}

/// Incremental constructor for [`UnstructuredMesh`].
///
/// Cells are added first, then faces referencing them. Each face lists its
/// adjacent cells with their orientation signs; the cell-to-face adjacency
/// is derived in [`build`](Self::build).
///
/// ```
/// use plume_mesh::{Mesh, MeshBuilder, Parallel};
///
/// let mut b = MeshBuilder::new(1);
/// let left = b.add_cell(1.0, [0.5, 0.0, 0.0]);
/// let right = b.add_cell(1.0, [1.5, 0.0, 0.0]);
/// b.add_face(&[(left, 1.0), (right, -1.0)], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0);
/// let mesh = b.build().unwrap();
/// assert_eq!(mesh.num_cells(Parallel::All), 2);
/// assert!(!mesh.is_boundary_face(0));
/// ```
pub struct MeshBuilder {
    dim: usize,
    owned: Option<(usize, usize)>,
    cells: Vec<(f64, Point)>,
    faces: Vec<PendingFace>,
}

impl MeshBuilder {
    /// Start an empty mesh of spatial dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            owned: None,
            cells: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Add a cell and return its index.
    pub fn add_cell(&mut self, volume: f64, centroid: Point) -> usize {
        self.cells.push((volume, centroid));
        self.cells.len() - 1
    }

    /// Add a face adjacent to `cells` (cell index, orientation sign) and
    /// return its index. The normal is normalized at build time.
    pub fn add_face(
        &mut self,
        cells: &[(usize, f64)],
        centroid: Point,
        normal: Point,
        area: f64,
    ) -> usize {
        self.faces.push(PendingFace {
            cells: cells.iter().copied().collect(),
            centroid,
            normal,
            area,
        });
        self.faces.len() - 1
    }

    /// Mark the first `cells` cells and `faces` faces as owned. Without this
    /// call every entity is owned.
    pub fn owned(&mut self, cells: usize, faces: usize) -> &mut Self {
        self.owned = Some((cells, faces));
        self
    }

    /// Validate and build the mesh.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - the dimension is not 1, 2 or 3, or there are no cells
    /// - a cell volume or face area is not finite and > 0
    /// - a face has other than 1 or 2 distinct, in-range cells
    /// - an orientation sign is not ±1, or the two signs of a face agree
    /// - a normal has zero length
    /// - owned counts exceed the entity counts
    pub fn build(self) -> Result<UnstructuredMesh, MeshError> {
        if !(1..=3).contains(&self.dim) {
            return Err(MeshError::InvalidDimension { dim: self.dim });
        }
        if self.cells.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        let n_cells = self.cells.len();
        for (c, &(volume, _)) in self.cells.iter().enumerate() {
            if !volume.is_finite() || volume <= 0.0 {
                return Err(MeshError::InvalidVolume { cell: c, volume });
            }
        }

        let mut cell_faces: Vec<SmallVec<[(usize, f64); 6]>> = vec![SmallVec::new(); n_cells];
        let mut face_cells = Vec::with_capacity(self.faces.len());
        let mut face_centroid = Vec::with_capacity(self.faces.len());
        let mut face_normal = Vec::with_capacity(self.faces.len());
        let mut face_area = Vec::with_capacity(self.faces.len());

        for (f, face) in self.faces.into_iter().enumerate() {
            let invalid = |reason: String| MeshError::InvalidFace { face: f, reason };
            if face.cells.is_empty() || face.cells.len() > 2 {
                return Err(invalid(format!(
                    "must have 1 or 2 cells, got {}",
                    face.cells.len()
                )));
            }
            for &(c, dir) in &face.cells {
                if c >= n_cells {
                    return Err(invalid(format!("cell {c} out of range")));
                }
                if dir != 1.0 && dir != -1.0 {
                    return Err(invalid(format!("orientation must be +1 or -1, got {dir}")));
                }
            }
            if face.cells.len() == 2 {
                let (a, da) = face.cells[0];
                let (b, db) = face.cells[1];
                if a == b {
                    return Err(invalid(format!("cell {a} listed twice")));
                }
                if da == db {
                    return Err(invalid("both cells have the same orientation".to_string()));
                }
            }
            if !face.area.is_finite() || face.area <= 0.0 {
                return Err(invalid(format!(
                    "area must be finite and > 0, got {}",
                    face.area
                )));
            }
            let norm = face.normal.iter().map(|x| x * x).sum::<f64>().sqrt();
            if !norm.is_finite() || norm == 0.0 {
                return Err(invalid("normal has zero length".to_string()));
            }

            let mut adjacent: SmallVec<[usize; 2]> = smallvec![];
            for &(c, dir) in &face.cells {
                cell_faces[c].push((f, dir));
                adjacent.push(c);
            }
            face_cells.push(adjacent);
            face_centroid.push(face.centroid);
            face_normal.push(face.normal.map(|x| x / norm));
            face_area.push(face.area);
        }

        let (owned_cells, owned_faces) = self.owned.unwrap_or((n_cells, face_area.len()));
        if owned_cells > n_cells || owned_faces > face_area.len() {
            return Err(MeshError::InvalidOwnership {
                reason: format!(
                    "owned ({owned_cells} cells, {owned_faces} faces) exceeds mesh ({n_cells} cells, {} faces)",
                    face_area.len()
                ),
            });
        }

        let (cell_volume, cell_centroid) = self.cells.into_iter().unzip();
        Ok(UnstructuredMesh {
            dim: self.dim,
            owned_cells,
            owned_faces,
            cell_volume,
            cell_centroid,
            cell_faces,
            face_cells,
            face_centroid,
            face_normal,
            face_area,
        })
    }
}
