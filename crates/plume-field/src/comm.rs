//! Rank communication: reductions and ghost exchange.

use plume_core::CommError;
use plume_mesh::ExchangePlan;

/// Element-wise combination used by [`Communicator::all_reduce`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    /// Global minimum.
    Min,
    /// Global maximum.
    Max,
    /// Global sum.
    Sum,
}

impl ReduceOp {
    /// Combine two contributions.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            Self::Sum => a + b,
        }
    }
}

/// Blocking collective communication between the ranks of one run.
///
/// Every method is a collective: all ranks must call the same methods in
/// the same order, whatever their local state.
pub trait Communicator: Send {
    /// This process's rank, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks.
    fn size(&self) -> usize;

    /// Combine `values` element-wise across all ranks and leave the result
    /// on every rank. All ranks obtain bit-identical results.
    fn all_reduce(&self, op: ReduceOp, values: &mut [f64]) -> Result<(), CommError>;

    /// Copy owned values to the peers holding them as ghosts, and overwrite
    /// local ghosts with their owners' values. Each entity spans `stride`
    /// consecutive values of `data`.
    fn exchange(&self, plan: &ExchangePlan, data: &mut [f64], stride: usize)
        -> Result<(), CommError>;

    /// Global minimum of a scalar.
    fn reduce_min(&self, value: f64) -> Result<f64, CommError> {
        let mut v = [value];
        self.all_reduce(ReduceOp::Min, &mut v)?;
        Ok(v[0])
    }

    /// Global maximum of a scalar.
    fn reduce_max(&self, value: f64) -> Result<f64, CommError> {
        let mut v = [value];
        self.all_reduce(ReduceOp::Max, &mut v)?;
        Ok(v[0])
    }

    /// Global sum of a scalar.
    fn reduce_sum(&self, value: f64) -> Result<f64, CommError> {
        let mut v = [value];
        self.all_reduce(ReduceOp::Sum, &mut v)?;
        Ok(v[0])
    }
}

/// The single-rank communicator. Reductions are identities and there are
/// no ghosts to exchange.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce(&self, _op: ReduceOp, _values: &mut [f64]) -> Result<(), CommError> {
        Ok(())
    }

    fn exchange(
        &self,
        _plan: &ExchangePlan,
        _data: &mut [f64],
        _stride: usize,
    ) -> Result<(), CommError> {
        Ok(())
    }
}

/// A communicator bound to one exchange plan.
///
/// Handed to schemes and reconstruction so they can synchronize scratch
/// arrays laid out like the cell fields of the store.
#[derive(Clone, Copy)]
pub struct GhostExchange<'a> {
    comm: &'a dyn Communicator,
    plan: &'a ExchangePlan,
}

impl<'a> GhostExchange<'a> {
    /// Bind `comm` to `plan`.
    pub fn new(comm: &'a dyn Communicator, plan: &'a ExchangePlan) -> Self {
        Self { comm, plan }
    }

    /// Refresh the ghost entries of `data`.
    pub fn sync(&self, data: &mut [f64], stride: usize) -> Result<(), CommError> {
        self.comm.exchange(self.plan, data, stride)
    }

    /// The underlying communicator, for reductions.
    pub fn comm(&self) -> &'a dyn Communicator {
        self.comm
    }
}
