//! End-to-end coupling steps on small meshes.

use plume_core::ComponentId;
use plume_field::CouplingWindow;
use plume_test_utils::{chain, serial_store, uniform_flux};
use plume_transport::{
    BoundaryCondition, Constant, Distribution, FlowMode, SourceTerm, SpatialOrder,
    TemporalOrder, TransportConfig, TransportSolver,
};

const TRACER: ComponentId = ComponentId(0);

fn chain_solver(n: usize, flux: f64, config: TransportConfig, inflow: Option<f64>) -> TransportSolver {
    let mut store = serial_store(chain(n), &["tracer"]);
    store.set_flux(&uniform_flux(n + 1, flux)).unwrap();
    let mut b = TransportSolver::builder(config, store);
    if let Some(v) = inflow {
        b = b.boundary(BoundaryCondition::new(TRACER, vec![0], Constant(v)));
    }
    b.build().unwrap()
}

fn mass(solver: &TransportSolver) -> f64 {
    solver.store().component(TRACER).iter().sum()
}

#[test]
fn front_advances_one_cell_per_stable_step() {
    let n = 10;
    let mut solver = chain_solver(n, 1.0, TransportConfig::default(), Some(1.0));
    assert_eq!(solver.estimate_stable_step().unwrap(), 1.0);

    let mut last_mass = 0.0;
    for step in 1..=n + 3 {
        let report = solver.advance(1.0).unwrap();
        assert_eq!(report.sub_cycles, 1);
        solver.commit_state().unwrap();

        let c = solver.store().component(TRACER);
        let front = step.min(n);
        for (i, &v) in c.iter().enumerate() {
            let expected = if i < front { 1.0 } else { 0.0 };
            assert_eq!(v, expected, "step {step}, cell {i}");
        }
        let m = mass(&solver);
        assert!(m >= last_mass);
        last_mass = m;
    }
    assert_eq!(last_mass, n as f64);
}

#[test]
fn sub_cycles_cover_the_coupling_step() {
    let mut solver = chain_solver(8, 1.0, TransportConfig::default(), Some(1.0));
    let report = solver.advance(3.0).unwrap();
    assert_eq!(report.sub_cycles, 3);
    assert_eq!(report.stable_step, 1.0);
    assert_eq!(report.time, 3.0);
    assert_eq!(&solver.store().next().component(TRACER)[..4], &[1.0, 1.0, 1.0, 0.0]);

    let s = &report.components[0];
    assert_eq!(s.ledger.inflow, 3.0);
    assert_eq!(s.mass, 3.0);
    assert_eq!(s.expected_mass, 3.0);
    assert!(report.violations.is_empty());
}

#[test]
fn boundary_values_follow_sub_step_time() {
    let mut store = serial_store(chain(4), &["tracer"]);
    store.set_flux(&uniform_flux(5, 1.0)).unwrap();
    let mut solver = TransportSolver::builder(TransportConfig::default(), store)
        .boundary(BoundaryCondition::new(TRACER, vec![0], |t: f64| {
            if t < 1.0 {
                1.0
            } else {
                2.0
            }
        }))
        .build()
        .unwrap();
    solver.advance(2.0).unwrap();
    assert_eq!(solver.store().next().component(TRACER), &[2.0, 1.0, 0.0, 0.0]);
}

#[test]
fn zero_flow_is_idempotent() {
    for (spatial, temporal) in [
        (SpatialOrder::First, TemporalOrder::First),
        (SpatialOrder::Second, TemporalOrder::First),
        (SpatialOrder::Second, TemporalOrder::Second),
    ] {
        let config = TransportConfig::builder()
            .spatial_order(spatial)
            .temporal_order(temporal)
            .build()
            .unwrap();
        let mut solver = chain_solver(5, 0.0, config.clone(), Some(3.0));
        let initial = [0.2, 0.0, 1.5, 0.7, 0.1];
        solver.store_mut().set_component(TRACER, &initial).unwrap();

        assert_eq!(solver.estimate_stable_step().unwrap(), config.large_time_step);
        for dt in [1e-3, 1.0, 1e6] {
            let report = solver.advance(dt).unwrap();
            assert_eq!(report.sub_cycles, 1);
            solver.commit_state().unwrap();
        }
        for (a, b) in solver.store().component(TRACER).iter().zip(initial) {
            assert!((a - b).abs() < 1e-15);
        }
    }
}

#[test]
fn stagnant_saturation_change_rescales_concentration() {
    let mut solver = chain_solver(3, 0.0, TransportConfig::default(), None);
    let store = solver.store_mut();
    store.set_component(TRACER, &[1.0, 2.0, 4.0]).unwrap();
    store.set_saturation(&[0.5; 3], &[1.0; 3]).unwrap();
    let report = solver.advance(1.0).unwrap();
    assert!(!report.interpolated_saturation);
    assert_eq!(solver.store().next().component(TRACER), &[0.5, 1.0, 2.0]);
    assert!((report.components[0].mass - 3.5).abs() < 1e-15);
}

#[test]
fn saturation_is_interpolated_across_sub_steps() {
    let mut solver = chain_solver(6, 1.0, TransportConfig::default(), Some(1.0));
    let store = solver.store_mut();
    store.set_component(TRACER, &[1.0; 6]).unwrap();
    store.set_saturation(&[0.5; 6], &[1.0; 6]).unwrap();
    store.set_coupling_window(Some(CouplingWindow::new(0.0, None, 2.0).unwrap()));

    // Stable step 0.5 < window span 2.
    let report = solver.advance(2.0).unwrap();
    assert!(report.interpolated_saturation);
    assert_eq!(report.sub_cycles, 4);
    assert_eq!(report.stable_step, 0.5);
    assert!(report.violations.is_empty(), "{:?}", report.violations);

    // Water volume doubles while unit concentration enters: dilution
    // keeps every cell in (0, 1].
    let c = solver.store().next().component(TRACER);
    assert!(c.iter().all(|&v| v > 0.0 && v <= 1.0 + 1e-12), "{c:?}");
    let s = &report.components[0];
    assert!((s.mass - s.expected_mass).abs() < 1e-12);
}

#[test]
fn intermediate_time_starts_part_way_through_the_window() {
    let mut solver = chain_solver(4, 0.0, TransportConfig::default(), None);
    let store = solver.store_mut();
    store.set_component(TRACER, &[1.0; 4]).unwrap();
    store.set_saturation(&[0.5; 4], &[1.0; 4]).unwrap();
    store.set_coupling_window(Some(CouplingWindow::new(10.0, Some(11.0), 12.0).unwrap()));

    let report = solver.advance(1.0).unwrap();
    assert_eq!(report.time, 12.0);
    assert!(!report.interpolated_saturation);
    // Without interpolation the whole window's saturation change applies.
    for &v in solver.store().next().component(TRACER) {
        assert!((v - 0.5).abs() < 1e-15);
    }
}

#[test]
fn report_is_kept_after_advance() {
    let mut solver = chain_solver(3, 1.0, TransportConfig::default(), Some(1.0));
    assert!(solver.last_report().is_none());
    let report = solver.advance(0.5).unwrap();
    assert_eq!(solver.last_report(), Some(&report));
    assert_eq!(report.by_name("tracer").map(|s| s.max), Some(0.5));
}

#[test]
fn steady_flow_keeps_the_first_upwind_map() {
    for (mode, expected, outflow) in [
        (FlowMode::Transient, [0.0, 0.0, 0.0], 1.0),
        (FlowMode::Steady, [1.0, 1.0, 0.0], 0.0),
    ] {
        let config = TransportConfig::builder().flow_mode(mode).build().unwrap();
        let mut solver = chain_solver(3, 1.0, config, Some(1.0));
        solver.advance(1.0).unwrap();
        solver.commit_state().unwrap();
        assert_eq!(solver.store().component(TRACER), &[1.0, 0.0, 0.0]);

        // Reverse the flow.
        solver.store_mut().set_flux(&uniform_flux(4, -1.0)).unwrap();
        let report = solver.advance(1.0).unwrap();
        assert_eq!(solver.store().next().component(TRACER), &expected, "{mode:?}");
        assert_eq!(report.components[0].ledger.outflow, outflow);
        let face0_upwind = if mode == FlowMode::Steady { None } else { Some(0) };
        assert_eq!(solver.upwind().upwind(0), face0_upwind);
    }
}

#[test]
fn sources_are_evaluated_at_the_end_of_the_sub_step() {
    // Switches on half-way through the only sub-step.
    let late = |t: f64| if t > 0.5 { 1.0 } else { 0.0 };
    let store = serial_store(chain(2), &["tracer"]);
    let mut solver = TransportSolver::builder(TransportConfig::default(), store)
        .source(SourceTerm::new(TRACER, vec![0], late, Distribution::None))
        .build()
        .unwrap();
    let report = solver.advance(1.0).unwrap();
    assert_eq!(report.sub_cycles, 1);
    assert_eq!(report.components[0].ledger.source, 1.0);
    assert_eq!(solver.store().next().component(TRACER), &[1.0, 0.0]);
}
