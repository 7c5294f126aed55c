//! Distributed field storage for Plume.
//!
//! The [`FieldStore`] owns every per-cell and per-face array the transport
//! solver reads or writes, partitioned into owned entities followed by
//! ghosts. Ghost values are refreshed only through a [`Communicator`],
//! never written in place:
//!
//! ```text
//! FieldStore
//! ├── DoubleBuffer<MultiField>   current / next concentrations, swapped by index
//! ├── flux                       per face, signed along the reference normal
//! ├── porosity, saturation × 2   per cell, start and end of the coupling step
//! └── Box<dyn Communicator>      SerialComm or ThreadComm
//! ```
//!
//! Every collective (ghost exchange, reduction) must be issued by every
//! rank in the same order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod comm;
pub mod multi;
pub mod store;
pub mod thread_comm;

pub use buffer::DoubleBuffer;
pub use comm::{Communicator, GhostExchange, ReduceOp, SerialComm};
pub use multi::MultiField;
pub use store::{interpolate_in_time, CouplingWindow, FieldStore, FieldView};
pub use thread_comm::ThreadComm;
