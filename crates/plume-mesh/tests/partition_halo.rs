//! Structural properties of contiguous partitions of 2-D grids.

use plume_mesh::{partition_contiguous, Grid2D, LocalMesh, Mesh, Parallel};
use proptest::prelude::*;

fn parts(nx: usize, ny: usize, ranks: usize) -> (Grid2D, Vec<LocalMesh>) {
    let grid = Grid2D::new(nx, ny, 1.0, 1.0).unwrap();
    let global = grid.build().unwrap();
    let parts = partition_contiguous(&global, ranks).unwrap();
    (grid, parts)
}

proptest! {
    #[test]
    fn every_cell_and_face_owned_once(nx in 1usize..7, ny in 1usize..7, ranks in 1usize..5) {
        prop_assume!(ranks <= nx * ny);
        let (grid, parts) = parts(nx, ny, ranks);
        let mut cell_owners = vec![0usize; nx * ny];
        let mut face_owners = vec![0usize; grid.face_count()];
        for p in &parts {
            let m = p.mesh();
            for &g in &p.cell_global()[..m.num_cells(Parallel::Owned)] {
                cell_owners[g] += 1;
            }
            for &g in &p.face_global()[..m.num_faces(Parallel::Owned)] {
                face_owners[g] += 1;
            }
        }
        prop_assert!(cell_owners.iter().all(|&n| n == 1));
        prop_assert!(face_owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn owned_cells_see_all_their_faces(nx in 1usize..7, ny in 1usize..7, ranks in 1usize..5) {
        prop_assume!(ranks <= nx * ny);
        let (_, parts) = parts(nx, ny, ranks);
        for p in &parts {
            let m = p.mesh();
            for c in 0..m.num_cells(Parallel::Owned) {
                prop_assert_eq!(m.cell_faces(c).len(), 4);
            }
            for f in 0..m.num_faces(Parallel::All) {
                let owned_neighbour = m.face_cells(f).iter().any(|&c| m.is_owned_cell(c));
                prop_assert!(owned_neighbour);
            }
        }
    }

    #[test]
    fn sends_match_receives(nx in 1usize..7, ny in 1usize..7, ranks in 1usize..5) {
        prop_assume!(ranks <= nx * ny);
        let (_, parts) = parts(nx, ny, ranks);
        for p in &parts {
            for (peer, sends) in p.cell_plan().sends() {
                let q = &parts[*peer];
                let recv = q
                    .cell_plan()
                    .recvs()
                    .iter()
                    .find(|(from, _)| *from == p.rank())
                    .map(|(_, r)| r.clone())
                    .unwrap_or_default();
                let sent: Vec<usize> = sends.iter().map(|&l| p.cell_global()[l]).collect();
                let received: Vec<usize> = recv.iter().map(|&l| q.cell_global()[l]).collect();
                prop_assert_eq!(sent, received);
            }
            for (peer, sends) in p.face_plan().sends() {
                let q = &parts[*peer];
                let recv = q
                    .face_plan()
                    .recvs()
                    .iter()
                    .find(|(from, _)| *from == p.rank())
                    .map(|(_, r)| r.clone())
                    .unwrap_or_default();
                let sent: Vec<usize> = sends.iter().map(|&l| p.face_global()[l]).collect();
                let received: Vec<usize> = recv.iter().map(|&l| q.face_global()[l]).collect();
                prop_assert_eq!(sent, received);
            }
        }
    }
}

#[test]
fn shared_face_belongs_to_lower_rank() {
    let (grid, parts) = parts(2, 2, 2);
    // Rank 0 owns row 0, rank 1 owns row 1; the y-faces between them are
    // owned by rank 0.
    let shared = grid.y_face(0, 1);
    let p0 = &parts[0];
    let local = p0.face_global().iter().position(|&g| g == shared).unwrap();
    assert!(local < p0.mesh().num_faces(Parallel::Owned));
    let p1 = &parts[1];
    let local = p1.face_global().iter().position(|&g| g == shared).unwrap();
    assert!(local >= p1.mesh().num_faces(Parallel::Owned));
}
