//! Benchmark profiles for the Plume transport solver.
//!
//! - [`reference_profile`]: 100x100 grid (10K cells), recirculating flow
//!   with a uniform drift, a blob of tracer and a constant inlet
//! - [`stress_profile`]: 316x316 grid (~100K cells), same setup

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use plume_core::ComponentId;
use plume_field::FieldStore;
use plume_mesh::{Grid2D, UnstructuredMesh};
use plume_test_utils::{blob, stream_flux};
use plume_transport::{BoundaryCondition, Constant, TransportConfig, TransportSolver};

/// The benchmarked component.
pub const TRACER: ComponentId = ComponentId(0);

/// Drift added to every x-face on top of the recirculation.
pub const DRIFT: f64 = 0.2;

/// Build a solver over an `n x n` grid of unit squares.
///
/// The flux is [`open_flux`]; the tracer starts as a centred blob and
/// enters at concentration 1 through the left boundary.
pub fn profile(n: usize, config: TransportConfig) -> TransportSolver {
    let (grid, mesh) = square(n);
    let mut store =
        FieldStore::serial(Arc::new(mesh), &["tracer"]).expect("benchmark store");
    store
        .set_flux(&open_flux(&grid))
        .expect("benchmark flux");
    let initial = blob(store.mesh(), n, n);
    store
        .set_component(TRACER, &initial)
        .expect("benchmark initial state");
    let inlet = (0..n).map(|j| grid.x_face(0, j)).collect();
    TransportSolver::builder(config, store)
        .boundary(BoundaryCondition::new(TRACER, inlet, Constant(1.0)))
        .build()
        .expect("benchmark solver")
}

/// Reference profile: 100x100 grid (10K cells).
pub fn reference_profile(config: TransportConfig) -> TransportSolver {
    profile(100, config)
}

/// Stress profile: 316x316 grid (~100K cells).
pub fn stress_profile(config: TransportConfig) -> TransportSolver {
    profile(316, config)
}

/// An `n x n` grid of unit squares with its index helper.
pub fn square(n: usize) -> (Grid2D, UnstructuredMesh) {
    let grid = Grid2D::new(n, n, 1.0, 1.0).expect("benchmark grid");
    let mesh = grid.build().expect("benchmark mesh");
    (grid, mesh)
}

/// [`stream_flux`] plus [`DRIFT`] on every x-face.
pub fn open_flux(grid: &Grid2D) -> Vec<f64> {
    let mut flux = stream_flux(grid);
    for j in 0..grid.ny() {
        for i in 0..=grid.nx() {
            flux[grid.x_face(i, j)] += DRIFT;
        }
    }
    flux
}
