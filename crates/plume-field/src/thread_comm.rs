//! In-process multi-rank communicator over crossbeam channels.

use crossbeam_channel::{unbounded, Receiver, Sender};
use plume_core::CommError;
use plume_mesh::ExchangePlan;

use crate::comm::{Communicator, ReduceOp};

/// One rank of a cluster of threads standing in for processes.
///
/// Created in groups by [`ThreadComm::cluster`]; move each member onto its
/// own thread. Every ordered pair of ranks has a dedicated unbounded
/// channel, so messages between two ranks arrive in the order they were
/// sent and consecutive collectives never interleave. Reductions fold the
/// contributions in rank order, which makes the result identical on every
/// rank.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank; `None` for self.
    senders: Vec<Option<Sender<Vec<f64>>>>,
    /// Indexed by source rank; `None` for self.
    receivers: Vec<Option<Receiver<Vec<f64>>>>,
}

impl ThreadComm {
    /// Create `size` connected communicators, indexed by rank.
    pub fn cluster(size: usize) -> Vec<ThreadComm> {
        let mut senders: Vec<Vec<Option<Sender<Vec<f64>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Vec<f64>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for from in 0..size {
            for to in 0..size {
                if from != to {
                    let (tx, rx) = unbounded();
                    senders[from][to] = Some(tx);
                    receivers[to][from] = Some(rx);
                }
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (senders, receivers))| ThreadComm {
                rank,
                size,
                senders,
                receivers,
            })
            .collect()
    }

    fn send(&self, to: usize, data: Vec<f64>) -> Result<(), CommError> {
        self.senders
            .get(to)
            .and_then(Option::as_ref)
            .ok_or(CommError::Disconnected { peer: to })?
            .send(data)
            .map_err(|_| CommError::Disconnected { peer: to })
    }

    fn recv(&self, from: usize, expected: usize) -> Result<Vec<f64>, CommError> {
        let data = self
            .receivers
            .get(from)
            .and_then(Option::as_ref)
            .ok_or(CommError::Disconnected { peer: from })?
            .recv()
            .map_err(|_| CommError::Disconnected { peer: from })?;
        if data.len() != expected {
            return Err(CommError::SizeMismatch {
                peer: from,
                expected,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce(&self, op: ReduceOp, values: &mut [f64]) -> Result<(), CommError> {
        if self.size == 1 {
            return Ok(());
        }
        for to in (0..self.size).filter(|&r| r != self.rank) {
            self.send(to, values.to_vec())?;
        }
        let mine = values.to_vec();
        for from in 0..self.size {
            let contrib = if from == self.rank {
                mine.clone()
            } else {
                self.recv(from, values.len())?
            };
            if from == 0 {
                values.copy_from_slice(&contrib);
            } else {
                for (acc, x) in values.iter_mut().zip(&contrib) {
                    *acc = op.apply(*acc, *x);
                }
            }
        }
        Ok(())
    }

    fn exchange(
        &self,
        plan: &ExchangePlan,
        data: &mut [f64],
        stride: usize,
    ) -> Result<(), CommError> {
        for (peer, entities) in plan.sends() {
            let mut buf = Vec::with_capacity(entities.len() * stride);
            for &e in entities {
                buf.extend_from_slice(&data[e * stride..(e + 1) * stride]);
            }
            self.send(*peer, buf)?;
        }
        for (peer, entities) in plan.recvs() {
            let buf = self.recv(*peer, entities.len() * stride)?;
            for (chunk, &e) in buf.chunks_exact(stride.max(1)).zip(entities) {
                data[e * stride..(e + 1) * stride].copy_from_slice(chunk);
            }
        }
        Ok(())
    }
}
