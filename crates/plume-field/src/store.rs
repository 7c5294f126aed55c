//! The distributed field store.

use std::sync::Arc;

use indexmap::IndexMap;
use plume_core::{CommError, ComponentId, ConfigError, TransportError};
use plume_mesh::{ExchangePlan, LocalMesh, Mesh, Parallel};

use crate::buffer::DoubleBuffer;
use crate::comm::{Communicator, GhostExchange, SerialComm};
use crate::multi::MultiField;

// ── CouplingWindow ─────────────────────────────────────────────────

/// Time bracket of the saturation snapshots supplied by the flow solver.
///
/// Saturation at the start of the window is the store's start snapshot and
/// saturation at `end` is its end snapshot. `intermediate`, when set, is
/// the physical time at which the next transport advance begins, so that
/// sub-cycle interpolation starts part-way through the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CouplingWindow {
    start: f64,
    intermediate: Option<f64>,
    end: f64,
}

impl CouplingWindow {
    /// Create a window.
    ///
    /// Returns `Err` unless `start < end` and `intermediate` (if any) lies
    /// in `[start, end]`.
    pub fn new(start: f64, intermediate: Option<f64>, end: f64) -> Result<Self, ConfigError> {
        if !(start.is_finite() && end.is_finite() && start < end) {
            return Err(ConfigError::InvalidValue {
                key: "coupling window",
                reason: format!("start {start} must precede end {end}"),
            });
        }
        if let Some(t) = intermediate {
            if !(start..=end).contains(&t) {
                return Err(ConfigError::InvalidValue {
                    key: "coupling window",
                    reason: format!("intermediate time {t} outside [{start}, {end}]"),
                });
            }
        }
        Ok(Self {
            start,
            intermediate,
            end,
        })
    }

    /// Time of the start snapshot.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Time at which the next advance begins, if inside the window.
    pub fn intermediate(&self) -> Option<f64> {
        self.intermediate
    }

    /// Time of the end snapshot.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the window.
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Offset of the intermediate time from the start; zero when unset.
    pub fn shift(&self) -> f64 {
        self.intermediate.map_or(0.0, |t| t - self.start)
    }
}

/// `out = start + fraction * (end - start)`, element-wise.
pub fn interpolate_in_time(start: &[f64], end: &[f64], fraction: f64, out: &mut [f64]) {
    for ((o, &a), &b) in out.iter_mut().zip(start).zip(end) {
        *o = a + fraction * (b - a);
    }
}

// ── FieldView ──────────────────────────────────────────────────────

/// Disjoint borrows of the store for one sub-step: read-only geometry and
/// flow fields alongside mutable concentrations.
pub struct FieldView<'a> {
    /// Local mesh.
    pub mesh: &'a dyn Mesh,
    /// Face flux.
    pub flux: &'a [f64],
    /// Cell porosity.
    pub porosity: &'a [f64],
    /// Saturation at the start of the coupling step.
    pub saturation_start: &'a [f64],
    /// Saturation at the end of the coupling step.
    pub saturation_end: &'a [f64],
    /// Permeability, when registered.
    pub permeability: Option<&'a [f64]>,
    /// Cell-field ghost exchange.
    pub exchange: GhostExchange<'a>,
    /// Current and next concentrations.
    pub concentration: &'a mut DoubleBuffer<MultiField>,
}

// ── FieldStore ─────────────────────────────────────────────────────

/// Per-rank storage of every field the transport solver touches.
///
/// All cell arrays span owned cells followed by ghosts and all face arrays
/// owned faces followed by ghosts, matching the local mesh. Setters accept
/// either owned-only or full-length input and refresh ghosts themselves,
/// so they are collectives.
pub struct FieldStore {
    mesh: Arc<dyn Mesh>,
    comm: Box<dyn Communicator>,
    cell_plan: ExchangePlan,
    face_plan: ExchangePlan,
    names: IndexMap<String, ComponentId>,
    concentration: DoubleBuffer<MultiField>,
    flux: Vec<f64>,
    porosity: Vec<f64>,
    saturation_start: Vec<f64>,
    saturation_end: Vec<f64>,
    permeability: Option<Vec<f64>>,
    window: Option<CouplingWindow>,
}

impl FieldStore {
    /// Create a store with unit porosity and saturation, zero flux and zero
    /// concentrations.
    ///
    /// Returns `Err` if `components` is empty or contains duplicates.
    pub fn new(
        mesh: Arc<dyn Mesh>,
        comm: Box<dyn Communicator>,
        cell_plan: ExchangePlan,
        face_plan: ExchangePlan,
        components: &[&str],
    ) -> Result<Self, ConfigError> {
        if components.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "component names",
                reason: "at least one component is required".to_string(),
            });
        }
        let mut names = IndexMap::with_capacity(components.len());
        for (k, &name) in components.iter().enumerate() {
            if names.insert(name.to_string(), ComponentId(k as u32)).is_some() {
                return Err(ConfigError::InvalidValue {
                    key: "component names",
                    reason: format!("duplicate component '{name}'"),
                });
            }
        }
        let n_cells = mesh.num_cells(Parallel::All);
        let n_faces = mesh.num_faces(Parallel::All);
        Ok(Self {
            concentration: DoubleBuffer::filled(MultiField::zeros(components.len(), n_cells)),
            flux: vec![0.0; n_faces],
            porosity: vec![1.0; n_cells],
            saturation_start: vec![1.0; n_cells],
            saturation_end: vec![1.0; n_cells],
            permeability: None,
            window: None,
            names,
            mesh,
            comm,
            cell_plan,
            face_plan,
        })
    }

    /// Single-rank store over `mesh`.
    pub fn serial(mesh: Arc<dyn Mesh>, components: &[&str]) -> Result<Self, ConfigError> {
        Self::new(
            mesh,
            Box::new(SerialComm),
            ExchangePlan::default(),
            ExchangePlan::default(),
            components,
        )
    }

    /// Store over one rank's share of a partitioned mesh.
    pub fn from_local(
        local: LocalMesh,
        comm: Box<dyn Communicator>,
        components: &[&str],
    ) -> Result<Self, ConfigError> {
        let (mesh, cell_plan, face_plan) = local.into_parts();
        Self::new(Arc::new(mesh), comm, cell_plan, face_plan, components)
    }

    // ── accessors ──────────────────────────────────────────────

    /// The local mesh.
    pub fn mesh(&self) -> &dyn Mesh {
        &*self.mesh
    }

    /// The communicator.
    pub fn comm(&self) -> &dyn Communicator {
        &*self.comm
    }

    /// Ghost exchange for cell-indexed arrays.
    pub fn cell_exchange(&self) -> GhostExchange<'_> {
        GhostExchange::new(&*self.comm, &self.cell_plan)
    }

    /// Number of transported components.
    pub fn n_components(&self) -> usize {
        self.names.len()
    }

    /// Resolve a component name.
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    /// Name of a component.
    pub fn component_name(&self, id: ComponentId) -> Option<&str> {
        self.names.get_index(id.index()).map(|(name, _)| name.as_str())
    }

    /// Current concentrations.
    pub fn current(&self) -> &MultiField {
        self.concentration.current()
    }

    /// Next concentrations, as left by the last advance.
    pub fn next(&self) -> &MultiField {
        self.concentration.next()
    }

    /// Current values of one component, ghosts included.
    pub fn component(&self, id: ComponentId) -> &[f64] {
        self.concentration.current().component(id)
    }

    /// Face flux.
    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    /// Cell porosity.
    pub fn porosity(&self) -> &[f64] {
        &self.porosity
    }

    /// Saturation at the start of the coupling step.
    pub fn saturation_start(&self) -> &[f64] {
        &self.saturation_start
    }

    /// Saturation at the end of the coupling step.
    pub fn saturation_end(&self) -> &[f64] {
        &self.saturation_end
    }

    /// Cell permeability, if registered.
    pub fn permeability(&self) -> Option<&[f64]> {
        self.permeability.as_deref()
    }

    /// The saturation coupling window, if set.
    pub fn coupling_window(&self) -> Option<CouplingWindow> {
        self.window
    }

    /// Borrow everything a sub-step needs at once.
    pub fn view(&mut self) -> FieldView<'_> {
        FieldView {
            mesh: &*self.mesh,
            flux: &self.flux,
            porosity: &self.porosity,
            saturation_start: &self.saturation_start,
            saturation_end: &self.saturation_end,
            permeability: self.permeability.as_deref(),
            exchange: GhostExchange::new(&*self.comm, &self.cell_plan),
            concentration: &mut self.concentration,
        }
    }

    // ── setters (collective) ───────────────────────────────────

    /// Overwrite one component of the current concentrations.
    ///
    /// Input is validated on every rank before any value is stored; if any
    /// rank rejects its input, every rank returns `Err` and nothing changes.
    pub fn set_component(&mut self, id: ComponentId, values: &[f64]) -> Result<(), TransportError> {
        let owned = self.mesh.num_cells(Parallel::Owned);
        let total = self.mesh.num_cells(Parallel::All);
        let local = if id.index() >= self.n_components() {
            Err(ConfigError::UnknownComponent {
                key: "component names",
                name: id.to_string(),
            })
        } else {
            check("concentration", total, owned, values, |_| true)
        };
        self.agree("concentration", local)?;
        let target = self.concentration.current_mut().component_mut(id);
        target[..values.len()].copy_from_slice(values);
        self.comm.exchange(&self.cell_plan, target, 1)?;
        Ok(())
    }

    /// Overwrite the face flux.
    pub fn set_flux(&mut self, values: &[f64]) -> Result<(), TransportError> {
        let owned = self.mesh.num_faces(Parallel::Owned);
        let local = check("darcy flux", self.flux.len(), owned, values, f64::is_finite);
        self.agree("darcy flux", local)?;
        self.flux[..values.len()].copy_from_slice(values);
        self.sync_flux()?;
        Ok(())
    }

    /// Overwrite the porosity; values must lie in `(0, 1]`.
    pub fn set_porosity(&mut self, values: &[f64]) -> Result<(), TransportError> {
        let owned = self.mesh.num_cells(Parallel::Owned);
        let local = check("porosity", self.porosity.len(), owned, values, in_unit_interval);
        self.agree("porosity", local)?;
        self.porosity[..values.len()].copy_from_slice(values);
        self.comm.exchange(&self.cell_plan, &mut self.porosity, 1)?;
        Ok(())
    }

    /// Overwrite both saturation snapshots; values must lie in `(0, 1]`.
    pub fn set_saturation(&mut self, start: &[f64], end: &[f64]) -> Result<(), TransportError> {
        let owned = self.mesh.num_cells(Parallel::Owned);
        let total = self.mesh.num_cells(Parallel::All);
        let local = check("prev_saturation_liquid", total, owned, start, in_unit_interval)
            .and_then(|()| check("saturation_liquid", total, owned, end, in_unit_interval));
        self.agree("saturation_liquid", local)?;
        self.saturation_start[..start.len()].copy_from_slice(start);
        self.saturation_end[..end.len()].copy_from_slice(end);
        self.comm
            .exchange(&self.cell_plan, &mut self.saturation_start, 1)?;
        self.comm.exchange(&self.cell_plan, &mut self.saturation_end, 1)?;
        Ok(())
    }

    /// Register a permeability field for source weighting; values must be
    /// finite and >= 0.
    pub fn set_permeability(&mut self, values: &[f64]) -> Result<(), TransportError> {
        let n = self.mesh.num_cells(Parallel::All);
        let owned = self.mesh.num_cells(Parallel::Owned);
        let local = check("permeability", n, owned, values, |k| k.is_finite() && k >= 0.0);
        self.agree("permeability", local)?;
        let mut k = vec![0.0; n];
        k[..values.len()].copy_from_slice(values);
        self.comm.exchange(&self.cell_plan, &mut k, 1)?;
        self.permeability = Some(k);
        Ok(())
    }

    /// Turn each rank's validation outcome into the same verdict on every
    /// rank. Ranks that passed report how many others failed.
    fn agree(&self, key: &'static str, local: Result<(), ConfigError>) -> Result<(), TransportError> {
        let failed = self.comm.reduce_sum(if local.is_err() { 1.0 } else { 0.0 })?;
        if failed > 0.0 {
            return Err(local
                .err()
                .unwrap_or_else(|| ConfigError::InvalidValue {
                    key,
                    reason: format!("rejected on {failed} other rank(s)"),
                })
                .into());
        }
        Ok(())
    }

    /// Set or clear the saturation coupling window.
    pub fn set_coupling_window(&mut self, window: Option<CouplingWindow>) {
        self.window = window;
    }

    // ── synchronization (collective) ───────────────────────────

    /// Refresh the ghosts of every current component.
    pub fn sync_current(&mut self) -> Result<(), CommError> {
        let field = self.concentration.current_mut();
        for id in field.ids().collect::<Vec<_>>() {
            self.comm
                .exchange(&self.cell_plan, field.component_mut(id), 1)?;
        }
        Ok(())
    }

    /// Refresh the ghosts of every next component.
    pub fn sync_next(&mut self) -> Result<(), CommError> {
        let field = self.concentration.next_mut();
        for id in field.ids().collect::<Vec<_>>() {
            self.comm
                .exchange(&self.cell_plan, field.component_mut(id), 1)?;
        }
        Ok(())
    }

    /// Refresh the ghost faces of the flux.
    pub fn sync_flux(&mut self) -> Result<(), CommError> {
        self.comm.exchange(&self.face_plan, &mut self.flux, 1)
    }

    /// Synchronize the next concentrations and make them current.
    pub fn commit(&mut self) -> Result<(), CommError> {
        self.sync_next()?;
        self.concentration.swap();
        Ok(())
    }

    // ── reductions ─────────────────────────────────────────────

    /// Minimum of a component over owned cells of the current buffer;
    /// `+∞` on a rank without cells.
    pub fn min_owned(&self, id: ComponentId) -> f64 {
        let owned = self.mesh.num_cells(Parallel::Owned);
        self.component(id)[..owned]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Maximum of a component over owned cells of the current buffer.
    pub fn max_owned(&self, id: ComponentId) -> f64 {
        let owned = self.mesh.num_cells(Parallel::Owned);
        self.component(id)[..owned]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Global minimum of a scalar.
    pub fn reduce_min(&self, value: f64) -> Result<f64, CommError> {
        self.comm.reduce_min(value)
    }

    /// Global maximum of a scalar.
    pub fn reduce_max(&self, value: f64) -> Result<f64, CommError> {
        self.comm.reduce_max(value)
    }

    /// Global sum of a scalar.
    pub fn reduce_sum(&self, value: f64) -> Result<f64, CommError> {
        self.comm.reduce_sum(value)
    }
}

/// Check that `values` holds either the `owned` entries or all `total`
/// entries of an array, and that every owned value passes `valid`.
fn check(
    key: &'static str,
    total: usize,
    owned: usize,
    values: &[f64],
    valid: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if values.len() != owned && values.len() != total {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!(
                "expected {owned} owned or {total} total values, got {}",
                values.len()
            ),
        });
    }
    if let Some((i, &v)) = values[..owned].iter().enumerate().find(|&(_, &v)| !valid(v)) {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("value {v} at cell or face {i} is out of range"),
        });
    }
    Ok(())
}

fn in_unit_interval(v: f64) -> bool {
    v > 0.0 && v <= 1.0
}
