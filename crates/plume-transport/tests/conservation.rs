//! Mass conservation and positivity.

use plume_core::ComponentId;
use plume_field::{Communicator, FieldStore};
use plume_mesh::partition_contiguous;
use plume_test_utils::{
    blob, chain, grid, local_store, run_cluster, serial_store, stream_flux, uniform_flux,
};
use plume_transport::{
    BoundaryCondition, Constant, SpatialOrder, TemporalOrder, TransportConfig, TransportSolver,
};
use proptest::prelude::*;

const TRACER: ComponentId = ComponentId(0);
const DYE: ComponentId = ComponentId(1);
const NX: usize = 8;
const NY: usize = 6;

fn configs() -> Vec<TransportConfig> {
    [
        (SpatialOrder::First, TemporalOrder::First),
        (SpatialOrder::Second, TemporalOrder::First),
        (SpatialOrder::Second, TemporalOrder::Second),
    ]
    .into_iter()
    .map(|(spatial, temporal)| {
        TransportConfig::builder()
            .spatial_order(spatial)
            .temporal_order(temporal)
            // Donor-cell keeps the tight checks fatal; second-order
            // schemes may undershoot slightly.
            .internal_checks(spatial == SpatialOrder::First)
            .check_tolerance(1e-10)
            .build()
            .unwrap()
    })
    .collect()
}

/// Closed stream-function flow with a blob of tracer and a uniform dye.
fn load_closed_flow(store: &mut FieldStore, flux: &[f64], initial: &[f64]) {
    store.set_flux(flux).unwrap();
    store.set_porosity(&vec![0.4; initial.len()]).unwrap();
    store.set_component(TRACER, initial).unwrap();
    store.set_component(DYE, &vec![1.0; initial.len()]).unwrap();
}

/// Run `steps` coupling steps, returning the mass per component after each.
fn run(solver: &mut TransportSolver, steps: usize, dt: f64) -> Vec<[f64; 2]> {
    (0..steps)
        .map(|_| {
            let report = solver.advance(dt).unwrap();
            assert!(report.sub_cycles > 1);
            for s in &report.components {
                assert_eq!(s.ledger.inflow, 0.0);
                assert_eq!(s.ledger.outflow, 0.0);
                let scale = s.expected_mass.abs().max(1.0);
                assert!((s.mass - s.expected_mass).abs() <= 1e-10 * scale, "{s:?}");
            }
            solver.commit_state().unwrap();
            [report.components[0].mass, report.components[1].mass]
        })
        .collect()
}

#[test]
fn closed_flow_conserves_mass_serially() {
    for config in configs() {
        let (g, mesh) = grid(NX, NY);
        let flux = stream_flux(&g);
        let initial = blob(&mesh, NX, NY);
        let initial_mass: f64 = initial.iter().map(|c| c * 0.4).sum();

        let mut store = serial_store(mesh, &["tracer", "dye"]);
        load_closed_flow(&mut store, &flux, &initial);
        let mut solver = TransportSolver::builder(config, store).build().unwrap();

        let masses = run(&mut solver, 4, 2.5);
        for [tracer, dye] in masses {
            assert!((tracer - initial_mass).abs() < 1e-10 * initial_mass);
            assert!((dye - 0.4 * (NX * NY) as f64).abs() < 1e-10 * dye);
        }
        // Uniform dye in a divergence-free flow stays uniform.
        for &v in solver.store().component(DYE) {
            assert!((v - 1.0).abs() < 1e-10, "{}: {v}", solver.scheme_name());
        }
    }
}

#[test]
fn closed_flow_conserves_mass_on_three_ranks() {
    let (g, mesh) = grid(NX, NY);
    let flux = stream_flux(&g);
    let initial = blob(&mesh, NX, NY);
    let initial_mass: f64 = initial.iter().map(|c| c * 0.4).sum();
    let locals = partition_contiguous(&mesh, 3).unwrap();

    for config in configs() {
        let masses = run_cluster(3, |comm| {
            let local = &locals[comm.rank()];
            let mut store = local_store(local, comm, &["tracer", "dye"]);
            load_closed_flow(
                &mut store,
                &local.gather_faces(&flux),
                &local.gather_cells(&initial),
            );
            let mut solver = TransportSolver::builder(config.clone(), store)
                .build()
                .unwrap();
            run(&mut solver, 3, 2.5)
        });
        // Reduced values agree on every rank.
        assert_eq!(masses[0], masses[1]);
        assert_eq!(masses[1], masses[2]);
        for [tracer, _] in &masses[0] {
            assert!((tracer - initial_mass).abs() < 1e-10 * initial_mass);
        }
    }
}

#[test]
fn open_flow_books_outflow() {
    // Five cells of tracer flushed by clean water: after five stable steps
    // everything has left through the outlet.
    let mut store = serial_store(chain(5), &["tracer"]);
    store.set_flux(&uniform_flux(6, 2.0)).unwrap();
    store.set_component(TRACER, &[1.0; 5]).unwrap();
    let config = TransportConfig::builder()
        .internal_checks(true)
        .build()
        .unwrap();
    let mut solver = TransportSolver::builder(config, store)
        .boundary(BoundaryCondition::new(TRACER, vec![0], Constant(0.0)))
        .build()
        .unwrap();

    let report = solver.advance(2.5).unwrap();
    assert_eq!(report.stable_step, 0.5);
    assert_eq!(report.sub_cycles, 5);
    let s = &report.components[0];
    assert_eq!(s.mass, 0.0);
    assert_eq!(s.mass_left_domain(), 5.0);
    assert_eq!(s.ledger.inflow, 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn donor_cell_is_positive_and_bounded(
        initial in prop::collection::vec(0.0f64..1.0, 3..16),
        q in -2.0f64..2.0,
        inflow in 0.0f64..1.0,
        cfl in 0.1f64..=1.0,
        dt in 0.1f64..10.0,
    ) {
        let n = initial.len();
        let inlet = if q >= 0.0 { 0 } else { n };
        let mut store = serial_store(chain(n), &["tracer"]);
        store.set_flux(&uniform_flux(n + 1, q)).unwrap();
        store.set_component(TRACER, &initial).unwrap();
        let config = TransportConfig::builder().cfl(cfl).build().unwrap();
        let mut solver = TransportSolver::builder(config, store)
            .boundary(BoundaryCondition::new(TRACER, vec![inlet], Constant(inflow)))
            .build()
            .unwrap();

        let upper = initial.iter().copied().fold(inflow, f64::max);
        for _ in 0..3 {
            let report = solver.advance(dt).unwrap();
            let s = &report.components[0];
            prop_assert!(s.min >= 0.0, "min {}", s.min);
            prop_assert!(s.max <= upper + 1e-12, "max {} > {upper}", s.max);
            prop_assert!((s.mass - s.expected_mass).abs() <= 1e-9 * s.expected_mass.max(1.0));
            solver.commit_state().unwrap();
        }
    }
}
