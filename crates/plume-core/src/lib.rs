//! Core types for the Plume transport solver.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers and the error taxonomy shared by the mesh, field-store and
//! transport crates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;

pub use error::{CheckViolation, CommError, ConfigError, TransportError};
pub use id::ComponentId;
