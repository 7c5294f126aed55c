//! The sub-cycling transport solver.
//!
//! [`TransportSolver`] owns the [`FieldStore`] and drives one coupling step
//! at a time:
//!
//! 1. refresh concentration ghosts, and flux ghosts plus the upwind map
//!    when the flow is transient (or on the first call);
//! 2. estimate the stable step (one global minimum);
//! 3. split the coupling step with a [`SubcyclePlan`], interpolating
//!    saturation between sub-steps when the stable step is finer than the
//!    coupling window;
//! 4. per sub-step: evaluate boundary conditions, run the [`Scheme`] on
//!    every component, advance time, and rotate `next` into `current`
//!    unless it is the final sub-step;
//! 5. reduce diagnostics and run the internal checks.
//!
//! The result of the final sub-step stays in the store's `next` buffer
//! until [`commit_state`](TransportSolver::commit_state).
//!
//! # Collectives
//!
//! Every rank must call the same solver methods in the same order with the
//! same coupling step. Local validation failures are agreed through a
//! reduction before any rank returns, so an error never leaves peers
//! blocked in a collective.

use std::collections::HashSet;

use plume_core::{CommError, ComponentId, ConfigError, TransportError};
use plume_field::{interpolate_in_time, DoubleBuffer, FieldStore, ReduceOp};
use plume_mesh::{Mesh, Parallel};

use crate::boundary::BoundaryCondition;
use crate::config::{FlowMode, TransportConfig};
use crate::diagnostics::{AdvanceReport, ComponentSummary};
use crate::scheme::{AdvanceSubstep, MassLedger, SchedulerState, Scheme, StepContext};
use crate::source::SourceTerm;
use crate::subcycle::SubcyclePlan;
use crate::timestep::{StableStep, StableStepEstimator};
use crate::upwind::UpwindMap;

const BOUNDARY_KEY: &str = "boundary conditions";
const SOURCE_KEY: &str = "source terms";

// ── TransportSolverBuilder ─────────────────────────────────────────

/// Collects boundary conditions and sources before validation.
pub struct TransportSolverBuilder {
    config: TransportConfig,
    store: FieldStore,
    boundaries: Vec<BoundaryCondition>,
    sources: Vec<SourceTerm>,
    time: f64,
}

impl TransportSolverBuilder {
    /// Add a Dirichlet inflow condition on local faces.
    pub fn boundary(mut self, bc: BoundaryCondition) -> Self {
        self.boundaries.push(bc);
        self
    }

    /// Add a source term on local owned cells.
    pub fn source(mut self, source: SourceTerm) -> Self {
        self.sources.push(source);
        self
    }

    /// Physical time at the start of the first advance. Default: 0.
    pub fn initial_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Validate the setup and create the solver.
    ///
    /// Returns `Err` if any rank registered a condition or source for an
    /// unknown component, a condition on a face that is not a boundary
    /// face, the same face twice for one component, or a source on a
    /// foreign cell. Collective.
    pub fn build(self) -> Result<TransportSolver, TransportError> {
        let Self {
            config,
            mut store,
            boundaries,
            mut sources,
            time,
        } = self;

        let local = validate_local(&store, &boundaries, &sources);
        let failed = store.reduce_sum(if local.is_err() { 1.0 } else { 0.0 })?;
        if failed > 0.0 {
            return Err(local
                .err()
                .unwrap_or_else(|| ConfigError::InvalidValue {
                    key: BOUNDARY_KEY,
                    reason: format!("rejected on {failed} other rank(s)"),
                })
                .into());
        }

        {
            let view = store.view();
            for source in &mut sources {
                source.prepare(view.mesh, view.permeability, view.exchange.comm())?;
            }
        }

        let mesh = store.mesh();
        let mut coverage = vec![vec![false; mesh.num_faces(Parallel::All)]; store.n_components()];
        for bc in &boundaries {
            for &f in bc.faces() {
                coverage[bc.component().index()][f] = true;
            }
        }

        let n_cells = mesh.num_cells(Parallel::All);
        let n_faces = mesh.num_faces(Parallel::All);
        let scheme = Scheme::from_config(&config);
        log::debug!(
            "transport solver: {} scheme, {} component(s), {} boundary condition(s), {} source(s)",
            scheme.name(),
            store.n_components(),
            boundaries.len(),
            sources.len()
        );

        Ok(TransportSolver {
            scheme,
            state: SchedulerState::default(),
            upwind: UpwindMap::new(n_faces),
            estimator: StableStepEstimator::new(),
            stable: None,
            flow_ready: false,
            saturation: DoubleBuffer::filled(vec![1.0; n_cells]),
            ledgers: vec![MassLedger::default(); store.n_components()],
            last_report: None,
            config,
            store,
            boundaries,
            sources,
            coverage,
            time,
        })
    }
}

fn validate_local(
    store: &FieldStore,
    boundaries: &[BoundaryCondition],
    sources: &[SourceTerm],
) -> Result<(), ConfigError> {
    let n_components = store.n_components();
    let mut seen = HashSet::new();
    for bc in boundaries {
        if bc.component().index() >= n_components {
            return Err(ConfigError::UnknownComponent {
                key: BOUNDARY_KEY,
                name: bc.component().to_string(),
            });
        }
        bc.validate(store.mesh())?;
        for &f in bc.faces() {
            if !seen.insert((bc.component(), f)) {
                return Err(ConfigError::InvalidValue {
                    key: BOUNDARY_KEY,
                    reason: format!(
                        "face {f} has more than one condition for component {}",
                        bc.component()
                    ),
                });
            }
        }
    }
    for source in sources {
        if source.component().index() >= n_components {
            return Err(ConfigError::UnknownComponent {
                key: SOURCE_KEY,
                name: source.component().to_string(),
            });
        }
    }
    Ok(())
}

// ── TransportSolver ────────────────────────────────────────────────

/// Explicit advection solver for one rank.
pub struct TransportSolver {
    config: TransportConfig,
    store: FieldStore,
    boundaries: Vec<BoundaryCondition>,
    sources: Vec<SourceTerm>,
    /// Per component, which local faces carry a boundary condition.
    coverage: Vec<Vec<bool>>,
    scheme: Scheme,
    state: SchedulerState,
    upwind: UpwindMap,
    estimator: StableStepEstimator,
    stable: Option<StableStep>,
    flow_ready: bool,
    /// Saturation at the start (current) and end (next) of a sub-step.
    saturation: DoubleBuffer<Vec<f64>>,
    ledgers: Vec<MassLedger>,
    last_report: Option<AdvanceReport>,
    time: f64,
}

impl TransportSolver {
    /// Start building a solver over `store`.
    pub fn builder(config: TransportConfig, store: FieldStore) -> TransportSolverBuilder {
        TransportSolverBuilder {
            config,
            store,
            boundaries: Vec::new(),
            sources: Vec::new(),
            time: 0.0,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The field store.
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Mutable field store. Invalidates the cached stable step.
    ///
    /// In [`FlowMode::Steady`] flux changes made after the first advance
    /// are not picked up.
    pub fn store_mut(&mut self) -> &mut FieldStore {
        self.stable = None;
        &mut self.store
    }

    /// Consume the solver, returning the store.
    pub fn into_store(self) -> FieldStore {
        self.store
    }

    /// Current physical time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Short name of the selected scheme.
    pub fn scheme_name(&self) -> &'static str {
        self.scheme.name()
    }

    /// The upwind map from the last flow refresh.
    pub fn upwind(&self) -> &UpwindMap {
        &self.upwind
    }

    /// Report of the last successful [`advance`](Self::advance).
    pub fn last_report(&self) -> Option<&AdvanceReport> {
        self.last_report.as_ref()
    }

    /// The stable step from the last estimate, if any.
    pub fn stable_step(&self) -> Option<StableStep> {
        self.stable
    }

    /// The last stable step, estimating it when none is cached.
    ///
    /// Collective when an estimate is needed.
    pub fn estimate_stable_step(&mut self) -> Result<f64, TransportError> {
        if let Some(s) = self.stable {
            return Ok(s.dt);
        }
        self.refresh_flow()?;
        Ok(self.compute_stable_step()?.dt)
    }

    /// Make the result of the last advance current, refreshing ghosts.
    ///
    /// Collective.
    pub fn commit_state(&mut self) -> Result<(), TransportError> {
        self.store.commit()?;
        Ok(())
    }

    /// Advance every component over one coupling step of length
    /// `dt_coupling`.
    ///
    /// On success the new concentrations are in the store's `next` buffer
    /// and the returned report is also kept as
    /// [`last_report`](Self::last_report). Check violations are always
    /// logged; they are returned as `Err(TransportError::CheckFailed)` only
    /// when internal checks are enabled. Collective.
    pub fn advance(&mut self, dt_coupling: f64) -> Result<AdvanceReport, TransportError> {
        if !(dt_coupling > 0.0 && dt_coupling.is_finite()) {
            return Err(TransportError::InvalidTimeStep { dt: dt_coupling });
        }

        self.store.sync_current()?;
        self.refresh_flow()?;
        let stable = self.compute_stable_step()?;
        if !(stable.dt > 0.0) {
            return Err(TransportError::InvalidTimeStep { dt: stable.dt });
        }

        let window = self.store.coupling_window();
        if let Some(t) = window.and_then(|w| w.intermediate()) {
            self.time = t;
        }
        let (shift, dt_global) = window.map_or((0.0, dt_coupling), |w| (w.shift(), w.span()));
        let interpolate = stable.dt < dt_global;
        self.seed_saturation(interpolate, shift / dt_global);

        let mass_start = self.owned_mass(false);
        for ledger in &mut self.ledgers {
            *ledger = MassLedger::default();
        }

        let mut plan = SubcyclePlan::new(dt_coupling, stable.dt);
        let mut sub_cycles = 0;
        while let Some(step) = plan.next() {
            if interpolate {
                let fraction = (shift + plan.elapsed()) / dt_global;
                let (start, end) = (self.store.saturation_start(), self.store.saturation_end());
                interpolate_in_time(start, end, fraction, self.saturation.next_mut());
            }
            for bc in &mut self.boundaries {
                bc.compute(self.time);
            }
            log::debug!(
                "sub-step {sub_cycles}: t = {:e}, dt = {:e}",
                self.time,
                step.dt
            );
            self.run_substep(step.dt)?;
            self.time += step.dt;
            sub_cycles += 1;

            if !step.is_final {
                self.store.commit()?;
                if interpolate {
                    self.saturation.swap();
                }
            }
        }

        let report = self.summarize(stable.dt, dt_coupling, interpolate, sub_cycles, &mass_start)?;
        self.last_report = Some(report.clone());
        if self.config.internal_checks && !report.violations.is_empty() {
            return Err(TransportError::CheckFailed(report.violations));
        }
        Ok(report)
    }

    // ── internals ──────────────────────────────────────────────

    fn compute_stable_step(&mut self) -> Result<StableStep, TransportError> {
        let s = self.estimator.estimate(
            self.store.mesh(),
            &self.upwind,
            self.store.flux(),
            self.store.porosity(),
            (self.store.saturation_start(), self.store.saturation_end()),
            &self.config,
            self.store.comm(),
        )?;
        self.stable = Some(s);
        Ok(s)
    }

    /// Sync flux ghosts and rebuild the upwind map when the flow may have
    /// changed, then run the inflow and divergence checks.
    fn refresh_flow(&mut self) -> Result<(), TransportError> {
        if self.flow_ready && self.config.flow_mode == FlowMode::Steady {
            return Ok(());
        }
        self.store.sync_flux()?;
        self.upwind.identify(self.store.mesh(), self.store.flux());
        self.flow_ready = true;
        self.check_influx()?;
        if self.config.internal_checks {
            self.check_divergence()?;
        }
        Ok(())
    }

    /// Count inflow faces lacking boundary data, per component.
    fn check_influx(&self) -> Result<(), TransportError> {
        let owned = self.store.mesh().num_cells(Parallel::Owned);
        let mut missing = 0usize;
        for f in 0..self.upwind.len() {
            if self.upwind.upwind(f).is_some() {
                continue;
            }
            if self.upwind.downwind(f).is_some_and(|d| d < owned) {
                missing += self.coverage.iter().filter(|c| !c[f]).count();
            }
        }
        let missing = self.store.reduce_sum(missing as f64)? as usize;
        if missing == 0 {
            return Ok(());
        }
        if self.config.internal_checks {
            return Err(ConfigError::MissingBoundaryData {
                key: BOUNDARY_KEY,
                faces: missing,
            }
            .into());
        }
        if self.store.comm().rank() == 0 {
            log::warn!("{missing} inflow face/component pair(s) have no boundary data");
        }
        Ok(())
    }

    /// Warn when the flux is not divergence-free relative to the cells'
    /// throughput.
    fn check_divergence(&self) -> Result<(), CommError> {
        let mesh = self.store.mesh();
        let flux = self.store.flux();
        let mut worst = 0.0_f64;
        for c in 0..mesh.num_cells(Parallel::Owned) {
            let (net, total) = mesh
                .cell_faces(c)
                .iter()
                .fold((0.0, 0.0), |(n, t), &(f, dir)| (n + flux[f] * dir, t + flux[f].abs()));
            if total > 0.0 {
                worst = worst.max(net.abs() / total);
            }
        }
        let worst = self.store.reduce_max(worst)?;
        if worst > self.config.check_tolerance && self.store.comm().rank() == 0 {
            log::warn!("flux divergence up to {worst:e} of cell throughput");
        }
        Ok(())
    }

    fn seed_saturation(&mut self, interpolate: bool, fraction: f64) {
        let (start, end) = (self.store.saturation_start(), self.store.saturation_end());
        if interpolate {
            interpolate_in_time(start, end, fraction, self.saturation.current_mut());
        } else {
            self.saturation.current_mut().copy_from_slice(start);
            self.saturation.next_mut().copy_from_slice(end);
        }
    }

    /// Local owned mass of every component, from `current` with the
    /// sub-step start saturation, or from `next` with the end saturation.
    fn owned_mass(&self, next: bool) -> Vec<f64> {
        let mesh = self.store.mesh();
        let porosity = self.store.porosity();
        let (field, ws) = if next {
            (self.store.next(), self.saturation.next())
        } else {
            (self.store.current(), self.saturation.current())
        };
        field
            .ids()
            .map(|id| {
                let values = field.component(id);
                (0..mesh.num_cells(Parallel::Owned))
                    .map(|c| values[c] * mesh.cell_volume(c) * porosity[c] * ws[c])
                    .sum()
            })
            .collect()
    }

    fn run_substep(&mut self, dt: f64) -> Result<(), TransportError> {
        let view = self.store.view();
        let ctx = StepContext {
            mesh: view.mesh,
            upwind: &self.upwind,
            flux: view.flux,
            porosity: view.porosity,
            saturation_start: self.saturation.current(),
            saturation_end: self.saturation.next(),
            boundaries: &self.boundaries,
            sources: &self.sources,
            exchange: view.exchange,
            time: self.time,
            end_time: self.time + dt,
        };
        let (current, next) = view.concentration.split_mut();
        for k in 0..current.n_components() {
            let id = ComponentId(k as u32);
            self.state.begin(dt, id)?;
            let result = self.scheme.advance_substep(
                &ctx,
                &self.state,
                current.component(id),
                next.component_mut(id),
                &mut self.ledgers[k],
            );
            if let Err(e) = result {
                self.state.reset();
                return Err(e);
            }
            self.state.complete();
        }
        Ok(())
    }

    fn summarize(
        &self,
        stable_step: f64,
        coupling_step: f64,
        interpolated_saturation: bool,
        sub_cycles: usize,
        mass_start: &[f64],
    ) -> Result<AdvanceReport, TransportError> {
        let n = self.store.n_components();
        let owned = self.store.mesh().num_cells(Parallel::Owned);
        let next = self.store.next();
        let comm = self.store.comm();

        let mut mins: Vec<f64> = next
            .ids()
            .map(|id| next.component(id)[..owned].iter().copied().fold(f64::INFINITY, f64::min))
            .collect();
        let mut maxs: Vec<f64> = next
            .ids()
            .map(|id| {
                next.component(id)[..owned]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();
        let mass_end = self.owned_mass(true);
        let mut sums = Vec::with_capacity(5 * n);
        for k in 0..n {
            let l = &self.ledgers[k];
            sums.extend_from_slice(&[mass_start[k], mass_end[k], l.inflow, l.outflow, l.source]);
        }
        comm.all_reduce(ReduceOp::Min, &mut mins)?;
        comm.all_reduce(ReduceOp::Max, &mut maxs)?;
        comm.all_reduce(ReduceOp::Sum, &mut sums)?;

        let mut components = Vec::with_capacity(n);
        let mut violations = Vec::new();
        for (k, s) in sums.chunks_exact(5).enumerate() {
            let id = ComponentId(k as u32);
            let ledger = MassLedger {
                inflow: s[2],
                outflow: s[3],
                source: s[4],
            };
            let summary = ComponentSummary {
                component: id,
                name: self.store.component_name(id).unwrap_or_default().to_string(),
                min: mins[k],
                max: maxs[k],
                mass: s[1],
                expected_mass: s[0] + ledger.net(),
                ledger,
            };
            for v in summary.violations(self.config.check_tolerance) {
                log::warn!("internal check on rank {}: {v}", comm.rank());
                violations.push(v);
            }
            components.push(summary);
        }

        if comm.rank() == 0 {
            log::info!(
                "{sub_cycles} sub-cycle(s), dt_stable {stable_step:.5e}, dt_coupling {coupling_step:.5e}"
            );
            for s in &components {
                log::info!(
                    "{}: {:.6e} to {:.6e} at t = {:.7e}, mass {:.5e}, mass left domain {:.5e}",
                    s.name,
                    s.min,
                    s.max,
                    self.time,
                    s.mass,
                    s.mass_left_domain()
                );
            }
        }

        Ok(AdvanceReport {
            sub_cycles,
            stable_step,
            coupling_step,
            interpolated_saturation,
            time: self.time,
            components,
            violations,
        })
    }
}
