//! Error types for mesh construction and partitioning.

use std::fmt;

/// Errors arising from mesh construction or partitioning.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Attempted to construct a mesh with zero cells.
    EmptyMesh,
    /// The spatial dimension is not 1, 2 or 3.
    InvalidDimension {
        /// The rejected dimension.
        dim: usize,
    },
    /// A cell has a non-positive or non-finite volume.
    InvalidVolume {
        /// Index of the offending cell.
        cell: usize,
        /// The rejected volume.
        volume: f64,
    },
    /// A face is malformed.
    InvalidFace {
        /// Index of the offending face.
        face: usize,
        /// What went wrong.
        reason: String,
    },
    /// Owned-entity counts exceed the number of entities.
    InvalidOwnership {
        /// What went wrong.
        reason: String,
    },
    /// The mesh cannot be split over the requested number of ranks.
    InvalidPartition {
        /// Number of cells in the global mesh.
        cells: usize,
        /// Requested number of ranks.
        ranks: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMesh => write!(f, "mesh must have at least one cell"),
            Self::InvalidDimension { dim } => {
                write!(f, "dimension must be 1, 2 or 3, got {dim}")
            }
            Self::InvalidVolume { cell, volume } => {
                write!(f, "cell {cell}: volume must be finite and > 0, got {volume}")
            }
            Self::InvalidFace { face, reason } => write!(f, "face {face}: {reason}"),
            Self::InvalidOwnership { reason } => write!(f, "invalid ownership: {reason}"),
            Self::InvalidPartition { cells, ranks } => {
                write!(f, "cannot split {cells} cell(s) over {ranks} rank(s)")
            }
        }
    }
}

impl std::error::Error for MeshError {}
