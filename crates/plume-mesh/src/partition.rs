//! Contiguous partitioning with a one-layer ghost halo.
//!
//! [`partition_contiguous`] splits the cells of a global mesh into
//! contiguous blocks, one per rank. Each rank's [`LocalMesh`] contains:
//!
//! - its owned cells, in global order, at local indices `0..n_owned`;
//! - every face incident to an owned cell;
//! - the far cell of each such face, when owned elsewhere, as a ghost.
//!
//! A face is owned by the lowest-numbered rank among the owners of its
//! adjacent cells. Faces and ghost cells are each ordered owned-first, then
//! by global id.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::MeshError;
use crate::mesh::{Mesh, Parallel};
use crate::unstructured::{MeshBuilder, UnstructuredMesh};

// ── ExchangePlan ───────────────────────────────────────────────────

/// Point-to-point ghost synchronization schedule for one entity kind.
///
/// `sends` lists, per peer rank, the local indices of owned entities the
/// peer holds as ghosts. `recvs` lists, per peer rank, the local indices of
/// ghosts owned by that peer. Both are sorted by peer, and each index list
/// by global id, so a send on one rank lines up element-for-element with
/// the matching receive on the other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangePlan {
    sends: Vec<(usize, Vec<usize>)>,
    recvs: Vec<(usize, Vec<usize>)>,
}

impl ExchangePlan {
    /// Plan from explicit per-peer lists.
    pub fn new(sends: Vec<(usize, Vec<usize>)>, recvs: Vec<(usize, Vec<usize>)>) -> Self {
        Self { sends, recvs }
    }

    /// Owned entities to send, grouped by destination rank.
    pub fn sends(&self) -> &[(usize, Vec<usize>)] {
        &self.sends
    }

    /// Ghost entities to receive, grouped by source rank.
    pub fn recvs(&self) -> &[(usize, Vec<usize>)] {
        &self.recvs
    }

    /// `true` when there is nothing to exchange.
    pub fn is_empty(&self) -> bool {
        self.sends.is_empty() && self.recvs.is_empty()
    }
}

// ── LocalMesh ──────────────────────────────────────────────────────

/// One rank's share of a partitioned mesh.
#[derive(Clone, Debug)]
pub struct LocalMesh {
    rank: usize,
    mesh: UnstructuredMesh,
    cell_global: Vec<usize>,
    face_global: Vec<usize>,
    cell_plan: ExchangePlan,
    face_plan: ExchangePlan,
}

impl LocalMesh {
    /// Rank this share belongs to.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The local mesh.
    pub fn mesh(&self) -> &UnstructuredMesh {
        &self.mesh
    }

    /// Global id of every local cell.
    pub fn cell_global(&self) -> &[usize] {
        &self.cell_global
    }

    /// Global id of every local face.
    pub fn face_global(&self) -> &[usize] {
        &self.face_global
    }

    /// Ghost-cell exchange schedule.
    pub fn cell_plan(&self) -> &ExchangePlan {
        &self.cell_plan
    }

    /// Ghost-face exchange schedule.
    pub fn face_plan(&self) -> &ExchangePlan {
        &self.face_plan
    }

    /// Pick the local cells' values out of a globally indexed array.
    pub fn gather_cells(&self, global: &[f64]) -> Vec<f64> {
        self.cell_global.iter().map(|&g| global[g]).collect()
    }

    /// Pick the local faces' values out of a globally indexed array.
    pub fn gather_faces(&self, global: &[f64]) -> Vec<f64> {
        self.face_global.iter().map(|&g| global[g]).collect()
    }

    /// Split into the mesh and its cell and face exchange plans.
    pub fn into_parts(self) -> (UnstructuredMesh, ExchangePlan, ExchangePlan) {
        (self.mesh, self.cell_plan, self.face_plan)
    }
}

// ── Partitioner ────────────────────────────────────────────────────

struct RankLayout {
    cells: Vec<usize>,
    owned_cells: usize,
    faces: Vec<usize>,
    owned_faces: usize,
}

/// Split `global` into `ranks` contiguous blocks of cells.
///
/// The first `len % ranks` ranks receive one extra cell. Returns one
/// [`LocalMesh`] per rank, indexed by rank.
///
/// # Errors
///
/// Returns `Err(MeshError::InvalidPartition)` if `ranks` is zero or exceeds
/// the number of cells, and `Err(MeshError::InvalidFace)` if a face lists a
/// cell that does not list the face back.
pub fn partition_contiguous(global: &dyn Mesh, ranks: usize) -> Result<Vec<LocalMesh>, MeshError> {
    let n_cells = global.num_cells(Parallel::All);
    if ranks == 0 || ranks > n_cells {
        return Err(MeshError::InvalidPartition {
            cells: n_cells,
            ranks,
        });
    }

    let base = n_cells / ranks;
    let extra = n_cells % ranks;
    let starts: Vec<usize> = (0..=ranks).map(|r| r * base + r.min(extra)).collect();
    let cell_owner = |c: usize| starts.partition_point(|&s| s <= c) - 1;
    let face_owner = |f: usize| {
        global
            .face_cells(f)
            .iter()
            .map(|&c| cell_owner(c))
            .min()
            .unwrap_or(0)
    };

    let layouts: Vec<RankLayout> = (0..ranks)
        .map(|r| {
            let owned = starts[r]..starts[r + 1];
            let local_faces: BTreeSet<usize> = owned
                .clone()
                .flat_map(|c| global.cell_faces(c).iter().map(|&(f, _)| f))
                .collect();
            let ghost_cells: BTreeSet<usize> = local_faces
                .iter()
                .flat_map(|&f| global.face_cells(f).iter().copied())
                .filter(|c| !owned.contains(c))
                .collect();
            let (mut faces, ghost_faces): (Vec<usize>, Vec<usize>) =
                local_faces.into_iter().partition(|&f| face_owner(f) == r);
            let owned_faces = faces.len();
            faces.extend(ghost_faces);
            let mut cells: Vec<usize> = owned.collect();
            let owned_cells = cells.len();
            cells.extend(ghost_cells);
            RankLayout {
                cells,
                owned_cells,
                faces,
                owned_faces,
            }
        })
        .collect();

    let local_index = |ids: &[usize]| -> HashMap<usize, usize> {
        ids.iter().enumerate().map(|(l, &g)| (g, l)).collect()
    };
    let cell_maps: Vec<HashMap<usize, usize>> =
        layouts.iter().map(|l| local_index(&l.cells)).collect();
    let face_maps: Vec<HashMap<usize, usize>> =
        layouts.iter().map(|l| local_index(&l.faces)).collect();

    let mut out = Vec::with_capacity(ranks);
    for (r, layout) in layouts.iter().enumerate() {
        let mut b = MeshBuilder::new(global.dim());
        for &g in &layout.cells {
            b.add_cell(global.cell_volume(g), global.cell_centroid(g));
        }
        for &f in &layout.faces {
            let mut adjacent = Vec::with_capacity(2);
            for &c in global.face_cells(f) {
                let dir = global.face_dir(f, c).ok_or_else(|| MeshError::InvalidFace {
                    face: f,
                    reason: format!("cell {c} does not list this face"),
                })?;
                adjacent.push((cell_maps[r][&c], dir));
            }
            b.add_face(
                &adjacent,
                global.face_centroid(f),
                global.face_normal(f),
                global.face_area(f),
            );
        }
        b.owned(layout.owned_cells, layout.owned_faces);
        let mesh = b.build()?;

        let cell_plan = exchange_plan(r, &layouts, &cell_maps, |l| {
            (&l.cells[..], l.owned_cells)
        }, &cell_owner);
        let face_plan = exchange_plan(r, &layouts, &face_maps, |l| {
            (&l.faces[..], l.owned_faces)
        }, &face_owner);

        out.push(LocalMesh {
            rank: r,
            mesh,
            cell_global: layout.cells.clone(),
            face_global: layout.faces.clone(),
            cell_plan,
            face_plan,
        });
    }
    Ok(out)
}

/// Build rank `r`'s plan for one entity kind. `entities` returns a rank's
/// local-to-global list and its owned count; `owner` maps a global id to
/// its owning rank.
fn exchange_plan(
    r: usize,
    layouts: &[RankLayout],
    maps: &[HashMap<usize, usize>],
    entities: impl Fn(&RankLayout) -> (&[usize], usize),
    owner: &dyn Fn(usize) -> usize,
) -> ExchangePlan {
    let mut recvs: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let (ids, owned) = entities(&layouts[r]);
    for (local, &g) in ids.iter().enumerate().skip(owned) {
        recvs.entry(owner(g)).or_default().push(local);
    }

    let mut sends: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (q, layout) in layouts.iter().enumerate() {
        if q == r {
            continue;
        }
        let (ids, owned) = entities(layout);
        for &g in &ids[owned..] {
            if owner(g) == r {
                sends.entry(q).or_default().push(maps[r][&g]);
            }
        }
    }

    ExchangePlan::new(sends.into_iter().collect(), recvs.into_iter().collect())
}
