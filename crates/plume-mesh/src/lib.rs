//! Mesh topology for Plume.
//!
//! This crate defines the [`Mesh`] trait, the read-only view of owned and
//! ghost cells and faces through which every transport operation reads
//! geometry, along with a concrete [`UnstructuredMesh`] and the partitioner
//! that splits a global mesh into per-rank local meshes.
//!
//! # Constructors
//!
//! - [`MeshBuilder`]: arbitrary polyhedral cells and faces
//! - [`Line1D`]: chain of equal cells along `x`
//! - [`Grid2D`]: structured quadrilateral grid
//!
//! # Partitioning
//!
//! [`partition_contiguous`] assigns contiguous blocks of cells to ranks and
//! returns one [`LocalMesh`] per rank, each carrying the [`ExchangePlan`]s
//! needed for ghost synchronization.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod grid2d;
pub mod line1d;
pub mod mesh;
pub mod partition;
pub mod unstructured;

pub use error::MeshError;
pub use grid2d::Grid2D;
pub use line1d::Line1D;
pub use mesh::{Mesh, Parallel, Point};
pub use partition::{partition_contiguous, ExchangePlan, LocalMesh};
pub use unstructured::{MeshBuilder, UnstructuredMesh};
