//! Second-order upwind with limited linear reconstruction.

use plume_core::{ComponentId, TransportError};
use plume_mesh::Parallel;

use super::{AdvanceSubstep, MassLedger, SchedulerState, StepContext};
use crate::config::LimiterKind;
use crate::limiter::Limiter;
use crate::reconstruction::Reconstruction;

// ── FluxRate ───────────────────────────────────────────────────────

/// Evaluates `dC/dt` for one component from limited face values.
///
/// Each face carries `|flux| * u_face`, where `u_face` is the upwind
/// cell's limited linear profile at the face centroid, additionally
/// clamped between the two adjacent cell averages on interior faces.
#[derive(Clone, Debug)]
pub struct FluxRate {
    reconstruction: Reconstruction,
    limiter: Limiter,
    boundary: Vec<Option<f64>>,
    rate: Vec<f64>,
}

impl FluxRate {
    /// Create an evaluator using the given limiter.
    pub fn new(kind: LimiterKind) -> Self {
        Self {
            reconstruction: Reconstruction::new(),
            limiter: Limiter::new(kind),
            boundary: Vec::new(),
            rate: Vec::new(),
        }
    }

    /// Rates of the owned cells from the last [`evaluate`](Self::evaluate).
    pub fn rates(&self) -> &[f64] {
        &self.rate
    }

    /// Compute the rate of every owned cell of `field` (ghosts valid).
    ///
    /// Returns the boundary and source mass rates. Collective: two ghost
    /// exchanges of gradients.
    pub fn evaluate(
        &mut self,
        ctx: &StepContext<'_>,
        component: ComponentId,
        field: &[f64],
    ) -> Result<MassLedger, TransportError> {
        let mesh = ctx.mesh;
        let owned = ctx.owned_cells();
        self.reconstruction
            .compute_gradient(mesh, field, &ctx.exchange)?;
        ctx.boundary_values(component, &mut self.boundary);
        self.limiter.apply(
            mesh,
            field,
            &self.boundary,
            &mut self.reconstruction,
            &ctx.exchange,
        )?;

        self.rate.clear();
        self.rate.resize(owned, 0.0);
        let mut ledger = MassLedger::default();

        for f in 0..mesh.num_faces(Parallel::All) {
            let Some(u) = ctx.upwind.upwind(f) else {
                continue;
            };
            let down = ctx.upwind.downwind(f);
            let mut value =
                self.reconstruction
                    .value_at(mesh, field, u, &mesh.face_centroid(f));
            if let Some(d) = down {
                value = value.max(field[u].min(field[d])).min(field[u].max(field[d]));
            }
            let moved = ctx.flux[f].abs() * value;
            if u < owned {
                self.rate[u] -= moved;
            }
            match down {
                Some(d) if d < owned => self.rate[d] += moved,
                None if u < owned => ledger.outflow += moved,
                _ => {}
            }
        }

        ledger.inflow += ctx.add_inflow(component, 1.0, &mut self.rate);
        ledger.source += ctx.add_sources(component, 1.0, &mut self.rate);

        for (c, r) in self.rate.iter_mut().enumerate() {
            *r /= ctx.pore_volume(c) * ctx.saturation_start[c];
        }
        Ok(ledger)
    }
}

// ── UpwindRk1 ──────────────────────────────────────────────────────

/// Second-order space, forward Euler time:
/// `C_next = (C + dt * f(C)) * ws_start / ws_end`.
#[derive(Clone, Debug)]
pub struct UpwindRk1 {
    rate: FluxRate,
}

impl UpwindRk1 {
    /// Create the scheme with the given limiter.
    pub fn new(kind: LimiterKind) -> Self {
        Self {
            rate: FluxRate::new(kind),
        }
    }
}

impl AdvanceSubstep for UpwindRk1 {
    fn advance_substep(
        &mut self,
        ctx: &StepContext<'_>,
        state: &SchedulerState,
        current: &[f64],
        next: &mut [f64],
        ledger: &mut MassLedger,
    ) -> Result<(), TransportError> {
        let dt = state.dt();
        *ledger += self.rate.evaluate(ctx, state.component(), current)?.scaled(dt);
        for (c, &f) in self.rate.rates().iter().enumerate() {
            let r = ctx.saturation_start[c] / ctx.saturation_end[c];
            next[c] = (current[c] + dt * f) * r;
        }
        Ok(())
    }
}

// ── UpwindRk2 ──────────────────────────────────────────────────────

/// Second-order space, two-stage predictor-corrector time:
///
/// ```text
/// C*     = (C + dt f(C)) r
/// C_next = (C* + (C + dt f(C*)) r) / 2        r = ws_start / ws_end
/// ```
///
/// The predictor's ghosts are refreshed before the corrector.
#[derive(Clone, Debug)]
pub struct UpwindRk2 {
    rate: FluxRate,
    predicted: Vec<f64>,
}

impl UpwindRk2 {
    /// Create the scheme with the given limiter.
    pub fn new(kind: LimiterKind) -> Self {
        Self {
            rate: FluxRate::new(kind),
            predicted: Vec::new(),
        }
    }
}

impl AdvanceSubstep for UpwindRk2 {
    fn advance_substep(
        &mut self,
        ctx: &StepContext<'_>,
        state: &SchedulerState,
        current: &[f64],
        next: &mut [f64],
        ledger: &mut MassLedger,
    ) -> Result<(), TransportError> {
        let dt = state.dt();
        let component = state.component();

        let first = self.rate.evaluate(ctx, component, current)?;
        self.predicted.clear();
        self.predicted.extend_from_slice(current);
        for (c, &f) in self.rate.rates().iter().enumerate() {
            let r = ctx.saturation_start[c] / ctx.saturation_end[c];
            self.predicted[c] = (current[c] + dt * f) * r;
        }
        ctx.exchange.sync(&mut self.predicted, 1)?;

        let second = self.rate.evaluate(ctx, component, &self.predicted)?;
        for (c, &f) in self.rate.rates().iter().enumerate() {
            let r = ctx.saturation_start[c] / ctx.saturation_end[c];
            next[c] = 0.5 * (self.predicted[c] + (current[c] + dt * f) * r);
        }

        *ledger += first.scaled(0.5 * dt);
        *ledger += second.scaled(0.5 * dt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_field::{GhostExchange, SerialComm};
    use plume_mesh::{ExchangePlan, Line1D, Mesh, UnstructuredMesh};

    use crate::boundary::BoundaryCondition;
    use crate::function::Constant;
    use crate::upwind::UpwindMap;

    struct Fixture {
        mesh: UnstructuredMesh,
        upwind: UpwindMap,
        flux: Vec<f64>,
        ones: Vec<f64>,
        bcs: Vec<BoundaryCondition>,
        plan: ExchangePlan,
    }

    impl Fixture {
        fn chain(n: usize, inflow: f64) -> Self {
            let mesh = Line1D::new(n, 1.0).unwrap().build().unwrap();
            let flux = vec![1.0; n + 1];
            let mut upwind = UpwindMap::new(0);
            upwind.identify(&mesh, &flux);
            let mut bc = BoundaryCondition::new(ComponentId(0), vec![0], Constant(inflow));
            bc.compute(0.0);
            Self {
                mesh,
                upwind,
                flux,
                ones: vec![1.0; n],
                bcs: vec![bc],
                plan: ExchangePlan::default(),
            }
        }

        fn ctx(&self) -> StepContext<'_> {
            StepContext {
                mesh: &self.mesh,
                upwind: &self.upwind,
                flux: &self.flux,
                porosity: &self.ones,
                saturation_start: &self.ones,
                saturation_end: &self.ones,
                boundaries: &self.bcs,
                sources: &[],
                exchange: GhostExchange::new(&SerialComm, &self.plan),
                time: 0.0,
                end_time: 0.0,
            }
        }

        fn advance(&self, scheme: &mut dyn AdvanceSubstep, current: &[f64], dt: f64) -> (Vec<f64>, MassLedger) {
            let mut state = SchedulerState::default();
            state.begin(dt, ComponentId(0)).unwrap();
            let mut next = vec![0.0; self.mesh.num_cells(Parallel::All)];
            let mut ledger = MassLedger::default();
            scheme
                .advance_substep(&self.ctx(), &state, current, &mut next, &mut ledger)
                .unwrap();
            (next, ledger)
        }
    }

    fn total(v: &[f64]) -> f64 {
        v.iter().sum()
    }

    #[test]
    fn uniform_field_is_steady() {
        let fx = Fixture::chain(6, 2.0);
        let current = vec![2.0; 6];
        for scheme in [
            &mut UpwindRk1::new(LimiterKind::BarthJespersen) as &mut dyn AdvanceSubstep,
            &mut UpwindRk2::new(LimiterKind::Tensorial),
        ] {
            let (next, ledger) = fx.advance(scheme, &current, 0.4);
            for v in next {
                assert!((v - 2.0).abs() < 1e-12);
            }
            assert!((ledger.inflow - 0.8).abs() < 1e-12);
            assert!((ledger.outflow - 0.8).abs() < 1e-12);
        }
    }

    #[test]
    fn mass_changes_only_through_boundary() {
        let fx = Fixture::chain(8, 1.0);
        let current = [1.0, 1.0, 0.8, 0.3, 0.0, 0.0, 0.2, 0.0];
        for scheme in [
            &mut UpwindRk1::new(LimiterKind::BarthJespersen) as &mut dyn AdvanceSubstep,
            &mut UpwindRk2::new(LimiterKind::BarthJespersen),
        ] {
            let (next, ledger) = fx.advance(scheme, &current, 0.25);
            let change = total(&next) - total(&current);
            assert!((change - ledger.net()).abs() < 1e-12, "{change} vs {ledger:?}");
        }
    }

    #[test]
    fn half_courant_stays_bounded() {
        let fx = Fixture::chain(8, 1.0);
        let mut current = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut scheme = UpwindRk2::new(LimiterKind::Tensorial);
        for _ in 0..6 {
            let (next, _) = fx.advance(&mut scheme, &current, 0.5);
            for &v in &next {
                assert!((-1e-12..=1.0 + 1e-12).contains(&v), "{next:?}");
            }
            current = next;
        }
        assert!(current[3] > 0.5);
    }
}
