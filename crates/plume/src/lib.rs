//! Plume: explicit advection transport of dissolved components through
//! porous media.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Plume sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use plume::prelude::*;
//!
//! // Four unit cells, unit flux left to right, unit tracer entering at
//! // the left face.
//! let mesh = Line1D::new(4, 1.0).unwrap().build().unwrap();
//! let mut store = FieldStore::serial(Arc::new(mesh), &["tracer"]).unwrap();
//! store.set_flux(&[1.0; 5]).unwrap();
//! let tracer = store.component_id("tracer").unwrap();
//!
//! let mut solver = TransportSolver::builder(TransportConfig::default(), store)
//!     .boundary(BoundaryCondition::new(tracer, vec![0], Constant(1.0)))
//!     .build()
//!     .unwrap();
//! let report = solver.advance(2.0).unwrap();
//! assert_eq!(report.sub_cycles, 2);
//!
//! solver.commit_state().unwrap();
//! assert_eq!(solver.store().component(tracer), &[1.0, 1.0, 0.0, 0.0]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `plume-core` | Component ids and error types |
//! | [`mesh`] | `plume-mesh` | Mesh trait, generators, partitioning |
//! | [`field`] | `plume-field` | Field store, communicators, ghost exchange |
//! | [`transport`] | `plume-transport` | Schemes, sub-cycling, the solver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Component ids and error types (`plume-core`).
pub use plume_core as types;

/// Mesh abstraction, generators and partitioning (`plume-mesh`).
///
/// [`mesh::Mesh`] is the read-only connectivity and geometry interface;
/// [`mesh::partition_contiguous`] splits a mesh into per-rank
/// [`mesh::LocalMesh`]es with owned cells first.
pub use plume_mesh as mesh;

/// Field storage and communication (`plume-field`).
///
/// [`field::FieldStore`] holds concentrations and flow state for one rank;
/// [`field::Communicator`] is implemented by [`field::SerialComm`] and the
/// in-process [`field::ThreadComm`].
pub use plume_field as field;

/// Advection schemes and the sub-cycling solver (`plume-transport`).
pub use plume_transport as transport;

/// Common imports for typical Plume usage.
pub mod prelude {
    // Core types
    pub use plume_core::{CheckViolation, ComponentId, ConfigError, TransportError};

    // Mesh
    pub use plume_mesh::{partition_contiguous, Grid2D, Line1D, Mesh, Parallel};

    // Fields
    pub use plume_field::{Communicator, CouplingWindow, FieldStore, SerialComm, ThreadComm};

    // Transport
    pub use plume_transport::{
        AdvanceReport, BoundaryCondition, Constant, Distribution, FlowMode, LimiterKind,
        ParameterList, SourceTerm, SpatialOrder, Tabular, TemporalOrder, TransportConfig,
        TransportSolver,
    };
}
