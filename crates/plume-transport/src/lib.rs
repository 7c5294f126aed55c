//! Explicit advection transport for Plume.
//!
//! Advances component concentrations through a partitioned unstructured
//! mesh under a prescribed face flux. One coupling step is sub-cycled with
//! the largest stable explicit step:
//!
//! ```text
//! TransportSolver::advance(ΔT)
//! ├── sync ghosts, refresh flux and UpwindMap (per FlowMode)
//! ├── StableStepEstimator        outflux bound, global min
//! ├── SubcyclePlan               ΔT split into stable sub-steps
//! │   └── per sub-step
//! │       ├── BoundaryCondition::compute(t)
//! │       ├── saturation interpolation
//! │       └── Scheme::advance_substep   donor-cell | RK1 | RK2
//! │           └── Reconstruction + Limiter (second order)
//! └── Diagnostics                min/max, mass balance, internal checks
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod config;
pub mod diagnostics;
pub mod function;
pub mod limiter;
pub mod reconstruction;
pub mod scheme;
pub mod solver;
pub mod source;
pub mod subcycle;
pub mod timestep;
pub mod upwind;

pub use boundary::BoundaryCondition;
pub use config::{
    FlowMode, LimiterKind, ParamValue, ParameterList, SpatialOrder, TemporalOrder,
    TransportConfig, TransportConfigBuilder,
};
pub use diagnostics::{AdvanceReport, ComponentSummary};
pub use function::{Constant, Tabular, TabularForm, TimeFunction};
pub use limiter::Limiter;
pub use reconstruction::Reconstruction;
pub use scheme::{AdvanceSubstep, MassLedger, SchedulerState, Scheme, SchemeStatus, StepContext};
pub use solver::{TransportSolver, TransportSolverBuilder};
pub use source::{Distribution, SourceTerm};
pub use subcycle::{SubStep, SubcyclePlan};
pub use timestep::{StableStep, StableStepEstimator};
pub use upwind::UpwindMap;
