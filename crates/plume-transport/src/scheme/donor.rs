//! First-order donor-cell update.

use plume_core::TransportError;
use plume_mesh::Parallel;

use super::{AdvanceSubstep, MassLedger, SchedulerState, StepContext};

/// Donor-cell upwind: each face carries `dt * |flux| * C_upwind` from its
/// upwind to its downwind cell.
///
/// The update is done on cell masses, so interior exchanges cancel
/// exactly and the total changes only by boundary flow and sources.
#[derive(Clone, Debug, Default)]
pub struct DonorCell {
    mass: Vec<f64>,
}

impl DonorCell {
    /// Create the scheme; the mass buffer is sized on first use.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdvanceSubstep for DonorCell {
    fn advance_substep(
        &mut self,
        ctx: &StepContext<'_>,
        state: &SchedulerState,
        current: &[f64],
        next: &mut [f64],
        ledger: &mut MassLedger,
    ) -> Result<(), TransportError> {
        let mesh = ctx.mesh;
        let dt = state.dt();
        let component = state.component();
        let owned = ctx.owned_cells();

        self.mass.clear();
        self.mass.extend(
            (0..owned).map(|c| current[c] * ctx.pore_volume(c) * ctx.saturation_start[c]),
        );

        for f in 0..mesh.num_faces(Parallel::All) {
            let Some(u) = ctx.upwind.upwind(f) else {
                continue;
            };
            let moved = dt * ctx.flux[f].abs() * current[u];
            if u < owned {
                self.mass[u] -= moved;
            }
            match ctx.upwind.downwind(f) {
                Some(d) if d < owned => self.mass[d] += moved,
                None if u < owned => ledger.outflow += moved,
                _ => {}
            }
        }

        ledger.inflow += ctx.add_inflow(component, dt, &mut self.mass);
        ledger.source += ctx.add_sources(component, dt, &mut self.mass);

        for (c, &m) in self.mass.iter().enumerate() {
            next[c] = m / (ctx.pore_volume(c) * ctx.saturation_end[c]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::ComponentId;
    use plume_field::{GhostExchange, SerialComm};
    use plume_mesh::{ExchangePlan, Line1D, Mesh};

    use crate::boundary::BoundaryCondition;
    use crate::function::Constant;
    use crate::upwind::UpwindMap;

    fn step(current: &[f64], flux: f64, dt: f64, inflow: Option<f64>) -> (Vec<f64>, MassLedger) {
        let n = current.len();
        let mesh = Line1D::new(n, 1.0).unwrap().build().unwrap();
        let flux = vec![flux; n + 1];
        let mut upwind = UpwindMap::new(0);
        upwind.identify(&mesh, &flux);
        let ones = vec![1.0; n];
        let mut bcs: Vec<BoundaryCondition> = inflow
            .map(|v| BoundaryCondition::new(ComponentId(0), vec![0], Constant(v)))
            .into_iter()
            .collect();
        for bc in &mut bcs {
            bc.compute(0.0);
        }
        let plan = ExchangePlan::default();
        let ctx = StepContext {
            mesh: &mesh,
            upwind: &upwind,
            flux: &flux,
            porosity: &ones,
            saturation_start: &ones,
            saturation_end: &ones,
            boundaries: &bcs,
            sources: &[],
            exchange: GhostExchange::new(&SerialComm, &plan),
            time: 0.0,
            end_time: 0.0,
        };
        let mut state = SchedulerState::default();
        state.begin(dt, ComponentId(0)).unwrap();
        let mut next = vec![0.0; mesh.num_cells(Parallel::All)];
        let mut ledger = MassLedger::default();
        DonorCell::new()
            .advance_substep(&ctx, &state, current, &mut next, &mut ledger)
            .unwrap();
        (next, ledger)
    }

    #[test]
    fn unit_courant_shifts_one_cell() {
        let (next, ledger) = step(&[1.0, 0.0, 0.0, 0.0], 1.0, 1.0, Some(1.0));
        assert_eq!(next, vec![1.0, 1.0, 0.0, 0.0]);
        assert_eq!(ledger.inflow, 1.0);
        assert_eq!(ledger.outflow, 0.0);
    }

    #[test]
    fn outflow_is_booked() {
        let (next, ledger) = step(&[0.0, 0.0, 2.0], 1.0, 0.5, None);
        assert_eq!(next, vec![0.0, 0.0, 1.0]);
        assert_eq!(ledger.outflow, 1.0);
        assert_eq!(ledger.inflow, 0.0);
    }

    #[test]
    fn inflow_on_outflow_face_is_ignored() {
        // Flux runs right to left, so face 0 is an outflow face.
        let (_, ledger) = step(&[0.0, 0.0], -1.0, 0.5, Some(3.0));
        assert_eq!(ledger.inflow, 0.0);
    }

    #[test]
    fn partial_step_mixes() {
        let (next, _) = step(&[1.0, 0.0], 1.0, 0.25, Some(1.0));
        assert!((next[0] - 1.0).abs() < 1e-15);
        assert!((next[1] - 0.25).abs() < 1e-15);
    }
}
