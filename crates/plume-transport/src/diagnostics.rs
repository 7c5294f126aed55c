//! Per-coupling-step diagnostics and internal checks.
//!
//! An [`AdvanceReport`] is produced at the end of every
//! [`TransportSolver::advance`](crate::TransportSolver::advance). Its values
//! are global (reduced over all ranks) and identical on every rank.

use plume_core::{CheckViolation, ComponentId};

use crate::scheme::MassLedger;

/// Global state of one component after a coupling step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentSummary {
    /// Component id.
    pub component: ComponentId,
    /// Component name.
    pub name: String,
    /// Global minimum concentration over owned cells.
    pub min: f64,
    /// Global maximum concentration over owned cells.
    pub max: f64,
    /// Global mass `Σ C * vol * φ * ws` at the end of the step.
    pub mass: f64,
    /// Start mass plus boundary inflow, minus outflow, plus sources.
    pub expected_mass: f64,
    /// Boundary and source mass over the step.
    pub ledger: MassLedger,
}

impl ComponentSummary {
    /// Mass that left the domain through outflow boundaries.
    pub fn mass_left_domain(&self) -> f64 {
        self.ledger.outflow
    }

    /// Violations of positivity and mass balance beyond `tolerance`.
    ///
    /// The mass-balance tolerance is relative to `max(1, |expected|)`.
    pub fn violations(&self, tolerance: f64) -> Vec<CheckViolation> {
        let mut found = Vec::new();
        if self.min < -tolerance {
            found.push(CheckViolation::NegativeConcentration {
                component: self.component,
                value: self.min,
            });
        }
        let scale = self.expected_mass.abs().max(1.0);
        if (self.mass - self.expected_mass).abs() > tolerance * scale {
            found.push(CheckViolation::MassBalance {
                component: self.component,
                computed: self.mass,
                expected: self.expected_mass,
            });
        }
        found
    }
}

/// Outcome of one coupling step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdvanceReport {
    /// Number of sub-steps taken.
    pub sub_cycles: usize,
    /// Stable step used for sub-cycling.
    pub stable_step: f64,
    /// Requested coupling step.
    pub coupling_step: f64,
    /// `true` when saturation was interpolated between sub-steps.
    pub interpolated_saturation: bool,
    /// Physical time at the end of the step.
    pub time: f64,
    /// One summary per component, in registration order.
    pub components: Vec<ComponentSummary>,
    /// Check violations found, whether or not checks are fatal.
    pub violations: Vec<CheckViolation>,
}

impl AdvanceReport {
    /// Summary of a component by id.
    pub fn component(&self, id: ComponentId) -> Option<&ComponentSummary> {
        self.components.get(id.index())
    }

    /// Summary of a component by name.
    pub fn by_name(&self, name: &str) -> Option<&ComponentSummary> {
        self.components.iter().find(|s| s.name == name)
    }
}
