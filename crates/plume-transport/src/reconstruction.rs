//! Least-squares gradient reconstruction.

use plume_core::CommError;
use plume_field::GhostExchange;
use plume_mesh::mesh::{displacement, dot};
use plume_mesh::{Mesh, Parallel, Point};

/// Determinant threshold, relative to `‖A‖∞^dim`, below which the normal
/// matrix is regularized.
const SINGULARITY_RATIO: f64 = 1e-8;

/// Diagonal shift, relative to `‖A‖∞`, added to a near-singular matrix.
const REGULARIZATION: f64 = 1e-8;

/// Per-cell linear reconstruction of one component.
///
/// The gradient of each owned cell minimizes
/// `Σ_n (u_n − u_c − g·(x_n − x_c))²` over its face neighbours, ghosts
/// included. Near-singular normal matrices (boundary cells with neighbours
/// in fewer directions than `dim`) are regularized; a cell whose matrix
/// still cannot be factored gets a zero gradient.
#[derive(Clone, Debug, Default)]
pub struct Reconstruction {
    dim: usize,
    gradient: Vec<f64>,
}

impl Reconstruction {
    /// Create an empty reconstruction; buffers are sized on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit gradients of `field` for all owned cells, then refresh ghost
    /// gradients through `exchange`.
    ///
    /// Collective: one ghost exchange.
    pub fn compute_gradient(
        &mut self,
        mesh: &dyn Mesh,
        field: &[f64],
        exchange: &GhostExchange<'_>,
    ) -> Result<(), CommError> {
        let dim = mesh.dim();
        self.dim = dim;
        self.gradient.clear();
        self.gradient.resize(mesh.num_cells(Parallel::All) * dim, 0.0);

        for c in 0..mesh.num_cells(Parallel::Owned) {
            let xc = mesh.cell_centroid(c);
            let mut a = [[0.0; 3]; 3];
            let mut b = [0.0; 3];
            let mut neighbours = 0;
            for &(f, _) in mesh.cell_faces(c) {
                for &n in mesh.face_cells(f).iter().filter(|&&n| n != c) {
                    let d = displacement(&xc, &mesh.cell_centroid(n), dim);
                    let du = field[n] - field[c];
                    for i in 0..dim {
                        for j in 0..dim {
                            a[i][j] += d[i] * d[j];
                        }
                        b[i] += d[i] * du;
                    }
                    neighbours += 1;
                }
            }
            if neighbours == 0 {
                continue;
            }

            let norm = (0..dim)
                .map(|i| (0..dim).map(|j| a[i][j].abs()).sum::<f64>())
                .fold(0.0, f64::max);
            if determinant(&a, dim) < norm.powi(dim as i32) * SINGULARITY_RATIO {
                for (i, row) in a.iter_mut().enumerate().take(dim) {
                    row[i] += norm * REGULARIZATION;
                }
            }
            if let Some(g) = cholesky_solve(&a, &b, dim) {
                self.gradient[c * dim..(c + 1) * dim].copy_from_slice(&g[..dim]);
            }
        }

        exchange.sync(&mut self.gradient, dim)
    }

    /// Spatial dimension of the gradients.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Gradient of cell `c`.
    pub fn gradient(&self, c: usize) -> &[f64] {
        &self.gradient[c * self.dim..(c + 1) * self.dim]
    }

    /// All gradients, `dim` values per cell.
    pub fn gradients(&self) -> &[f64] {
        &self.gradient
    }

    /// Mutable gradients, for limiting.
    pub fn gradients_mut(&mut self) -> &mut [f64] {
        &mut self.gradient
    }

    /// Reconstructed value of cell `c` at `point`.
    pub fn value_at(&self, mesh: &dyn Mesh, field: &[f64], c: usize, point: &Point) -> f64 {
        let d = displacement(&mesh.cell_centroid(c), point, self.dim);
        field[c] + dot(self.gradient(c), &d, self.dim)
    }
}

fn determinant(a: &[[f64; 3]; 3], n: usize) -> f64 {
    match n {
        1 => a[0][0],
        2 => a[0][0] * a[1][1] - a[0][1] * a[1][0],
        _ => {
            a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
                - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
                + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
        }
    }
}

/// Solve `A x = b` for symmetric positive definite `A` of order `n ≤ 3`.
/// Returns `None` when a pivot is not positive.
fn cholesky_solve(a: &[[f64; 3]; 3], b: &[f64; 3], n: usize) -> Option<[f64; 3]> {
    let mut l = [[0.0; 3]; 3];
    for i in 0..n {
        for j in 0..=i {
            let s = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if !(s > 0.0) {
                    return None;
                }
                l[i][i] = s.sqrt();
            } else {
                l[i][j] = s / l[j][j];
            }
        }
    }
    let mut y = [0.0; 3];
    for i in 0..n {
        y[i] = (b[i] - (0..i).map(|k| l[i][k] * y[k]).sum::<f64>()) / l[i][i];
    }
    let mut x = [0.0; 3];
    for i in (0..n).rev() {
        x[i] = (y[i] - (i + 1..n).map(|k| l[k][i] * x[k]).sum::<f64>()) / l[i][i];
    }
    Some(x)
}
