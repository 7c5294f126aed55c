//! Multi-rank harness over scoped threads.

use std::sync::Arc;
use std::thread;

use plume_field::{Communicator, FieldStore, ThreadComm};
use plume_mesh::{LocalMesh, Mesh, Parallel};

/// Run `f` once per rank of a `size`-rank [`ThreadComm`] cluster, each on
/// its own scoped thread. Results are indexed by rank.
///
/// Panics propagate from any rank.
pub fn run_cluster<T: Send>(size: usize, f: impl Fn(ThreadComm) -> T + Sync) -> Vec<T> {
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::cluster(size)
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

/// A store over `local` using `comm`.
pub fn local_store(
    local: &LocalMesh,
    comm: impl Communicator + 'static,
    components: &[&str],
) -> FieldStore {
    FieldStore::new(
        Arc::new(local.mesh().clone()),
        Box::new(comm),
        local.cell_plan().clone(),
        local.face_plan().clone(),
        components,
    )
    .expect("local store fixture")
}

/// Global ids and values of `local`'s owned cells.
pub fn owned_values(local: &LocalMesh, values: &[f64]) -> (Vec<usize>, Vec<f64>) {
    let owned = local.mesh().num_cells(Parallel::Owned);
    (
        local.cell_global()[..owned].to_vec(),
        values[..owned].to_vec(),
    )
}

/// Reassemble a global cell array from every rank's owned values.
pub fn assemble(n_global: usize, parts: &[(Vec<usize>, Vec<f64>)]) -> Vec<f64> {
    let mut out = vec![f64::NAN; n_global];
    for (ids, values) in parts {
        for (&g, &v) in ids.iter().zip(values) {
            out[g] = v;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::chain;
    use plume_mesh::partition_contiguous;

    #[test]
    fn owned_values_reassemble() {
        let global = chain(7);
        let locals = partition_contiguous(&global, 3).unwrap();
        let field: Vec<f64> = (0..7).map(|c| c as f64).collect();
        let parts: Vec<_> = locals
            .iter()
            .map(|l| owned_values(l, &l.gather_cells(&field)))
            .collect();
        assert_eq!(assemble(7, &parts), field);
    }

    #[test]
    fn cluster_ranks_are_ordered() {
        let ranks = run_cluster(3, |comm| comm.rank());
        assert_eq!(ranks, vec![0, 1, 2]);
    }
}
