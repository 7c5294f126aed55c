//! Flux-update schemes.
//!
//! A [`Scheme`] advances one component over one sub-step. It reads the
//! current concentrations (ghosts valid), writes the next concentrations
//! of owned cells, and books the mass crossing the domain boundary or
//! injected by sources into a [`MassLedger`]. Each scheme touches only
//! cells owned by the calling rank.
//!
//! Sub-step bookkeeping (length, status, component) lives in an explicit
//! [`SchedulerState`] passed alongside the read-only [`StepContext`].

mod donor;
mod second_order;

pub use donor::DonorCell;
pub use second_order::{FluxRate, UpwindRk1, UpwindRk2};

use std::ops::AddAssign;

use plume_core::{ComponentId, TransportError};
use plume_field::GhostExchange;
use plume_mesh::{Mesh, Parallel};

use crate::boundary::BoundaryCondition;
use crate::config::{SpatialOrder, TemporalOrder, TransportConfig};
use crate::source::SourceTerm;
use crate::upwind::UpwindMap;

// ── StepContext ────────────────────────────────────────────────────

/// Read-only inputs shared by every component of one sub-step.
pub struct StepContext<'a> {
    /// Local mesh.
    pub mesh: &'a dyn Mesh,
    /// Upwind/downwind cells of every face.
    pub upwind: &'a UpwindMap,
    /// Face flux.
    pub flux: &'a [f64],
    /// Cell porosity.
    pub porosity: &'a [f64],
    /// Saturation at the start of the sub-step.
    pub saturation_start: &'a [f64],
    /// Saturation at the end of the sub-step.
    pub saturation_end: &'a [f64],
    /// Boundary conditions, already evaluated at `time`.
    pub boundaries: &'a [BoundaryCondition],
    /// Source terms.
    pub sources: &'a [SourceTerm],
    /// Ghost exchange for cell arrays.
    pub exchange: GhostExchange<'a>,
    /// Physical time at the start of the sub-step.
    pub time: f64,
    /// Physical time at the end of the sub-step, at which sources are
    /// evaluated.
    pub end_time: f64,
}

impl StepContext<'_> {
    /// Number of owned cells.
    pub fn owned_cells(&self) -> usize {
        self.mesh.num_cells(Parallel::Owned)
    }

    /// `volume * porosity` of cell `c`.
    pub fn pore_volume(&self, c: usize) -> f64 {
        self.mesh.cell_volume(c) * self.porosity[c]
    }

    /// Add the Dirichlet inflow of `component` into `target` (owned cells),
    /// scaled by `scale`. Returns the total added.
    pub fn add_inflow(&self, component: ComponentId, scale: f64, target: &mut [f64]) -> f64 {
        let owned = self.owned_cells();
        let mut total = 0.0;
        for bc in self.boundaries.iter().filter(|bc| bc.component() == component) {
            for &f in bc.faces() {
                if self.upwind.upwind(f).is_some() {
                    continue;
                }
                if let Some(d) = self.upwind.downwind(f).filter(|&d| d < owned) {
                    let m = scale * self.flux[f].abs() * bc.value();
                    target[d] += m;
                    total += m;
                }
            }
        }
        total
    }

    /// Face-indexed Dirichlet values of `component`, `None` off its
    /// boundary conditions.
    pub fn boundary_values(&self, component: ComponentId, out: &mut Vec<Option<f64>>) {
        out.clear();
        out.resize(self.mesh.num_faces(Parallel::All), None);
        for bc in self.boundaries.iter().filter(|bc| bc.component() == component) {
            for &f in bc.faces() {
                out[f] = Some(bc.value());
            }
        }
    }

    /// Add the sources of `component` into `target`, scaled by `scale`.
    /// Returns the total added.
    pub fn add_sources(&self, component: ComponentId, scale: f64, target: &mut [f64]) -> f64 {
        self.sources
            .iter()
            .filter(|s| s.component() == component)
            .map(|s| s.accumulate(self.end_time, scale, target))
            .sum()
    }
}

// ── SchedulerState ─────────────────────────────────────────────────

/// Progress of one component's sub-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeStatus {
    /// No sub-step has started.
    Idle,
    /// A sub-step is in progress.
    Begin,
    /// The last sub-step finished.
    Complete,
}

/// Per-sub-step scheduling state: step length, status and component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerState {
    dt: f64,
    status: SchemeStatus,
    component: ComponentId,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            dt: 0.0,
            status: SchemeStatus::Idle,
            component: ComponentId(0),
        }
    }
}

impl SchedulerState {
    /// Start a sub-step of length `dt` for `component`.
    ///
    /// Returns `Err(TransportError::SchemeReentered)` if the previous
    /// sub-step never completed.
    pub fn begin(&mut self, dt: f64, component: ComponentId) -> Result<(), TransportError> {
        if self.status == SchemeStatus::Begin {
            return Err(TransportError::SchemeReentered {
                component: self.component,
            });
        }
        self.dt = dt;
        self.component = component;
        self.status = SchemeStatus::Begin;
        Ok(())
    }

    /// Mark the current sub-step finished.
    pub fn complete(&mut self) {
        self.status = SchemeStatus::Complete;
    }

    /// Abandon a failed sub-step so the next one may begin.
    pub fn reset(&mut self) {
        self.status = SchemeStatus::Idle;
    }

    /// Sub-step length.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Current status.
    pub fn status(&self) -> SchemeStatus {
        self.status
    }

    /// Component being advanced.
    pub fn component(&self) -> ComponentId {
        self.component
    }
}

// ── MassLedger ─────────────────────────────────────────────────────

/// Mass crossing the domain boundary or injected by sources.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassLedger {
    /// Mass entering through inflow boundary faces.
    pub inflow: f64,
    /// Mass leaving through outflow boundary faces.
    pub outflow: f64,
    /// Mass added by sources (negative for sinks).
    pub source: f64,
}

impl MassLedger {
    /// Net mass change.
    pub fn net(&self) -> f64 {
        self.inflow - self.outflow + self.source
    }

    /// `self` with every entry multiplied by `s`.
    pub fn scaled(self, s: f64) -> Self {
        Self {
            inflow: self.inflow * s,
            outflow: self.outflow * s,
            source: self.source * s,
        }
    }
}

impl AddAssign for MassLedger {
    fn add_assign(&mut self, rhs: Self) {
        self.inflow += rhs.inflow;
        self.outflow += rhs.outflow;
        self.source += rhs.source;
    }
}

// ── Scheme ─────────────────────────────────────────────────────────

/// One explicit sub-step of one component.
pub trait AdvanceSubstep {
    /// Advance `current` (all local cells, ghosts valid) by `state.dt()`
    /// into the owned cells of `next`, booking boundary and source mass
    /// into `ledger`.
    fn advance_substep(
        &mut self,
        ctx: &StepContext<'_>,
        state: &SchedulerState,
        current: &[f64],
        next: &mut [f64],
        ledger: &mut MassLedger,
    ) -> Result<(), TransportError>;
}

/// The flux-update scheme, resolved once from the configuration.
#[derive(Clone, Debug)]
pub enum Scheme {
    /// First order in space and time.
    DonorCell(DonorCell),
    /// Second order in space, forward Euler in time.
    UpwindRk1(UpwindRk1),
    /// Second order in space, predictor-corrector in time.
    UpwindRk2(UpwindRk2),
}

impl Scheme {
    /// Select the scheme for a validated configuration.
    pub fn from_config(config: &TransportConfig) -> Self {
        match (config.spatial_order, config.temporal_order) {
            (SpatialOrder::First, _) => Self::DonorCell(DonorCell::new()),
            (SpatialOrder::Second, TemporalOrder::First) => {
                Self::UpwindRk1(UpwindRk1::new(config.limiter))
            }
            (SpatialOrder::Second, TemporalOrder::Second) => {
                Self::UpwindRk2(UpwindRk2::new(config.limiter))
            }
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DonorCell(_) => "donor-cell",
            Self::UpwindRk1(_) => "upwind-rk1",
            Self::UpwindRk2(_) => "upwind-rk2",
        }
    }
}

impl AdvanceSubstep for Scheme {
    fn advance_substep(
        &mut self,
        ctx: &StepContext<'_>,
        state: &SchedulerState,
        current: &[f64],
        next: &mut [f64],
        ledger: &mut MassLedger,
    ) -> Result<(), TransportError> {
        match self {
            Self::DonorCell(s) => s.advance_substep(ctx, state, current, next, ledger),
            Self::UpwindRk1(s) => s.advance_substep(ctx, state, current, next, ledger),
            Self::UpwindRk2(s) => s.advance_substep(ctx, state, current, next, ledger),
        }
    }
}
