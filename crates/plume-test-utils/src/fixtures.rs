//! Meshes, flux fields and initial states.

use std::f64::consts::PI;
use std::sync::Arc;

use plume_field::FieldStore;
use plume_mesh::{Grid2D, Line1D, Mesh, UnstructuredMesh};

/// A chain of `n` unit cells along `x`.
pub fn chain(n: usize) -> UnstructuredMesh {
    Line1D::new(n, 1.0)
        .and_then(|l| l.build())
        .expect("chain fixture")
}

/// An `nx × ny` grid of unit squares, with its index helper.
pub fn grid(nx: usize, ny: usize) -> (Grid2D, UnstructuredMesh) {
    let g = Grid2D::new(nx, ny, 1.0, 1.0).expect("grid fixture");
    let mesh = g.build().expect("grid fixture");
    (g, mesh)
}

/// The same flux `q` on all `n_faces` faces.
pub fn uniform_flux(n_faces: usize, q: f64) -> Vec<f64> {
    vec![q; n_faces]
}

/// A closed recirculating flow on `grid`, derived from the stream function
/// `ψ(i, j) = sin(π i / nx) sin(π j / ny)` at grid nodes.
///
/// Every cell's net outflow cancels up to rounding and every boundary face
/// carries exactly zero flux.
pub fn stream_flux(grid: &Grid2D) -> Vec<f64> {
    let (nx, ny) = (grid.nx(), grid.ny());
    let psi = |i: usize, j: usize| {
        if i == 0 || j == 0 || i == nx || j == ny {
            0.0
        } else {
            (PI * i as f64 / nx as f64).sin() * (PI * j as f64 / ny as f64).sin()
        }
    };
    let mut flux = vec![0.0; grid.face_count()];
    for j in 0..ny {
        for i in 0..=nx {
            flux[grid.x_face(i, j)] = psi(i, j + 1) - psi(i, j);
        }
    }
    for j in 0..=ny {
        for i in 0..nx {
            flux[grid.y_face(i, j)] = psi(i, j) - psi(i + 1, j);
        }
    }
    flux
}

/// A smooth non-negative bump of height 1 centred in `mesh`'s bounding
/// box of `[0, nx] × [0, ny]`.
pub fn blob(mesh: &dyn Mesh, nx: usize, ny: usize) -> Vec<f64> {
    let (cx, cy) = (nx as f64 / 2.0, ny as f64 / 2.0);
    let r = 0.3 * nx.min(ny) as f64;
    (0..mesh.num_cells(plume_mesh::Parallel::All))
        .map(|c| {
            let p = mesh.cell_centroid(c);
            let d = ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt() / r;
            if d < 1.0 {
                0.5 * (1.0 + (PI * d).cos())
            } else {
                0.0
            }
        })
        .collect()
}

/// A single-rank store over `mesh`.
pub fn serial_store(mesh: UnstructuredMesh, components: &[&str]) -> FieldStore {
    FieldStore::serial(Arc::new(mesh), components).expect("serial store fixture")
}
