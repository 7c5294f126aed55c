//! Monotonicity limiters for reconstructed gradients.

use plume_core::CommError;
use plume_field::GhostExchange;
use plume_mesh::mesh::displacement;
use plume_mesh::{Mesh, Parallel};

use crate::config::LimiterKind;
use crate::reconstruction::Reconstruction;

/// Scales reconstructed gradients so that the linear profile of every
/// owned cell, evaluated at each of its face centroids, stays within the
/// minimum and maximum of the cell's own and face-neighbour averages and
/// of the Dirichlet values on its boundary faces.
#[derive(Clone, Debug)]
pub struct Limiter {
    kind: LimiterKind,
    coefficient: Vec<f64>,
}

impl Limiter {
    /// Create a limiter of the given kind.
    pub fn new(kind: LimiterKind) -> Self {
        Self {
            kind,
            coefficient: Vec::new(),
        }
    }

    /// The limiter kind.
    pub fn kind(&self) -> LimiterKind {
        self.kind
    }

    /// Coefficients from the last [`apply`](Self::apply): `dim` values per
    /// cell in `[0, 1]`, identical across directions for Barth-Jespersen.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficient
    }

    /// Limit the gradients of `field` held by `reconstruction`, then
    /// refresh ghost gradients.
    ///
    /// `boundary` is face-indexed and holds the Dirichlet value of each
    /// boundary face that has one; it may be empty.
    ///
    /// Collective: one ghost exchange.
    pub fn apply(
        &mut self,
        mesh: &dyn Mesh,
        field: &[f64],
        boundary: &[Option<f64>],
        reconstruction: &mut Reconstruction,
        exchange: &GhostExchange<'_>,
    ) -> Result<(), CommError> {
        let dim = reconstruction.dim();
        self.coefficient.clear();
        self.coefficient.resize(mesh.num_cells(Parallel::All) * dim, 1.0);
        let gradients = reconstruction.gradients_mut();

        for c in 0..mesh.num_cells(Parallel::Owned) {
            let (u_min, u_max) = local_bounds(mesh, field, boundary, c);
            let u_c = field[c];
            let xc = mesh.cell_centroid(c);
            let g = &mut gradients[c * dim..(c + 1) * dim];
            let alpha = &mut self.coefficient[c * dim..(c + 1) * dim];

            if self.kind == LimiterKind::Tensorial {
                for k in 0..dim {
                    let mut a = 1.0_f64;
                    for &(f, _) in mesh.cell_faces(c) {
                        let d = mesh.face_centroid(f)[k] - xc[k];
                        a = a.min(ratio(g[k] * d, u_c, u_min, u_max));
                    }
                    g[k] *= a;
                    alpha[k] = a;
                }
            }

            // Scalar pass; for the tensorial kind it enforces the bound on
            // the combined directional profile.
            let mut a = 1.0_f64;
            for &(f, _) in mesh.cell_faces(c) {
                let d = displacement(&xc, &mesh.face_centroid(f), dim);
                let delta: f64 = (0..dim).map(|k| g[k] * d[k]).sum();
                a = a.min(ratio(delta, u_c, u_min, u_max));
            }
            for k in 0..dim {
                g[k] *= a;
                alpha[k] *= a;
            }
        }

        exchange.sync(gradients, dim)
    }
}

/// Min and max of the cell's own value, its face neighbours' values and
/// the `boundary` values on its faces.
pub fn local_bounds(mesh: &dyn Mesh, field: &[f64], boundary: &[Option<f64>], c: usize) -> (f64, f64) {
    let mut lo = field[c];
    let mut hi = field[c];
    for &(f, _) in mesh.cell_faces(c) {
        for &n in mesh.face_cells(f) {
            lo = lo.min(field[n]);
            hi = hi.max(field[n]);
        }
        if let Some(v) = boundary.get(f).copied().flatten() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    (lo, hi)
}

/// Largest fraction in `[0, 1]` of the increment `delta` keeping
/// `u_c + fraction * delta` within `[u_min, u_max]`.
fn ratio(delta: f64, u_c: f64, u_min: f64, u_max: f64) -> f64 {
    if delta > 0.0 {
        ((u_max - u_c) / delta).min(1.0)
    } else if delta < 0.0 {
        ((u_min - u_c) / delta).min(1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_field::SerialComm;
    use plume_mesh::{ExchangePlan, Grid2D, Line1D};
    use proptest::prelude::*;

    fn limited(mesh: &dyn Mesh, field: &[f64], kind: LimiterKind) -> (Reconstruction, Limiter) {
        let plan = ExchangePlan::default();
        let exchange = GhostExchange::new(&SerialComm, &plan);
        let mut r = Reconstruction::new();
        r.compute_gradient(mesh, field, &exchange).unwrap();
        let mut l = Limiter::new(kind);
        l.apply(mesh, field, &[], &mut r, &exchange).unwrap();
        (r, l)
    }

    #[test]
    fn extremum_is_flattened() {
        let mesh = Line1D::new(3, 1.0).unwrap().build().unwrap();
        let field = [0.0, 1.0, 0.5];
        let (r, l) = limited(&mesh, &field, LimiterKind::BarthJespersen);
        // Cell 1 is a local maximum: the raw slope 0.25 overshoots on the
        // right face.
        assert_eq!(r.gradient(1)[0], 0.0);
        assert_eq!(l.coefficients()[1], 0.0);
    }

    #[test]
    fn plateau_edge_is_flattened_and_ramp_kept() {
        let mesh = Line1D::new(4, 1.0).unwrap().build().unwrap();
        let (r, l) = limited(&mesh, &[0.0, 0.0, 1.0, 1.0], LimiterKind::BarthJespersen);
        assert_eq!(r.gradient(1)[0], 0.0);
        assert_eq!(r.gradient(2)[0], 0.0);
        assert!(l.coefficients().iter().all(|&a| (0.0..=1.0).contains(&a)));

        let (r, _) = limited(&mesh, &[0.0, 0.5, 1.5, 2.0], LimiterKind::BarthJespersen);
        assert!((r.gradient(1)[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn dirichlet_value_widens_the_bound() {
        let mesh = Line1D::new(3, 1.0).unwrap().build().unwrap();
        let field = [0.5, 1.0, 1.5];
        let mut inlet = vec![None; mesh.num_faces(Parallel::All)];
        inlet[0] = Some(0.0);
        assert_eq!(local_bounds(&mesh, &field, &[], 0), (0.5, 1.0));
        assert_eq!(local_bounds(&mesh, &field, &inlet, 0), (0.0, 1.0));

        // Without the inlet value cell 0 is a local minimum and loses its
        // slope; with it the ramp continues to the boundary.
        let (r, _) = limited(&mesh, &field, LimiterKind::BarthJespersen);
        assert_eq!(r.gradient(0)[0], 0.0);

        let plan = ExchangePlan::default();
        let exchange = GhostExchange::new(&SerialComm, &plan);
        let mut r = Reconstruction::new();
        r.compute_gradient(&mesh, &field, &exchange).unwrap();
        Limiter::new(LimiterKind::BarthJespersen)
            .apply(&mesh, &field, &inlet, &mut r, &exchange)
            .unwrap();
        assert_eq!(r.gradient(0)[0], 0.5);
    }

    #[test]
    fn smooth_linear_field_is_untouched() {
        let mesh = Grid2D::new(4, 4, 1.0, 1.0).unwrap().build().unwrap();
        let field: Vec<f64> = (0..16).map(|c| mesh.cell_centroid(c)[0]).collect();
        for kind in [LimiterKind::BarthJespersen, LimiterKind::Tensorial] {
            let (r, _) = limited(&mesh, &field, kind);
            // Interior cells keep their exact slope.
            for c in [5, 6, 9, 10] {
                assert!((r.gradient(c)[0] - 1.0).abs() < 1e-6);
            }
        }
    }

    proptest! {
        #[test]
        fn face_values_stay_within_neighbour_bounds(
            field in prop::collection::vec(-10.0f64..10.0, 20),
            tensorial in any::<bool>(),
        ) {
            let mesh = Grid2D::new(5, 4, 1.0, 0.7).unwrap().build().unwrap();
            let kind = if tensorial { LimiterKind::Tensorial } else { LimiterKind::BarthJespersen };
            let (r, _) = limited(&mesh, &field, kind);
            for c in 0..20 {
                let (lo, hi) = local_bounds(&mesh, &field, &[], c);
                for &(f, _) in mesh.cell_faces(c) {
                    let v = r.value_at(&mesh, &field, c, &mesh.face_centroid(f));
                    prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9,
                        "cell {} face {}: {} not in [{}, {}]", c, f, v, lo, hi);
                }
            }
        }
    }
}
