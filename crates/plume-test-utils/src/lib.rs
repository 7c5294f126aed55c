//! Test fixtures and communicator harnesses for Plume development.
//!
//! - [`fixtures`]: meshes, divergence-free flux fields and initial states.
//! - [`cluster`]: runs one closure per rank on scoped threads, builds
//!   per-rank stores and reassembles global results.
//! - [`RecordingComm`]: a communicator wrapper logging every collective,
//!   to check that all ranks issue the same sequence.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cluster;
pub mod fixtures;

use std::sync::{Arc, Mutex, PoisonError};

use plume_core::CommError;
use plume_field::{Communicator, ReduceOp};
use plume_mesh::ExchangePlan;

pub use cluster::{assemble, local_store, owned_values, run_cluster};
pub use fixtures::{blob, chain, grid, serial_store, stream_flux, uniform_flux};

/// One collective call as seen by a rank.
///
/// Exchanges record only the stride: the amount of ghost data legitimately
/// differs between ranks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collective {
    AllReduce { op: ReduceOp, len: usize },
    Exchange { stride: usize },
}

/// Shared handle to the log of a [`RecordingComm`].
#[derive(Clone, Debug, Default)]
pub struct CollectiveLog(Arc<Mutex<Vec<Collective>>>);

impl CollectiveLog {
    /// Snapshot of the calls recorded so far.
    pub fn entries(&self) -> Vec<Collective> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, c: Collective) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(c);
    }
}

/// Wraps a communicator and records every collective it performs.
pub struct RecordingComm<C> {
    inner: C,
    log: CollectiveLog,
}

impl<C: Communicator> RecordingComm<C> {
    /// Wrap `inner`; the returned log stays readable after the
    /// communicator is moved into a store.
    pub fn new(inner: C) -> (Self, CollectiveLog) {
        let log = CollectiveLog::default();
        (
            Self {
                inner,
                log: log.clone(),
            },
            log,
        )
    }
}

impl<C: Communicator> Communicator for RecordingComm<C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn all_reduce(&self, op: ReduceOp, values: &mut [f64]) -> Result<(), CommError> {
        self.log.push(Collective::AllReduce {
            op,
            len: values.len(),
        });
        self.inner.all_reduce(op, values)
    }

    fn exchange(
        &self,
        plan: &ExchangePlan,
        data: &mut [f64],
        stride: usize,
    ) -> Result<(), CommError> {
        self.log.push(Collective::Exchange { stride });
        self.inner.exchange(plan, data, stride)
    }
}
