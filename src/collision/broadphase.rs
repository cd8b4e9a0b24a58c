use std::collections::{HashMap, HashSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::{rigidbody::BodyHandle, shape::Aabb};

/// Strategy used to prune candidate pairs before exact tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhaseKind {
    /// Tests every pair. Never misses anything, quadratic cost.
    Naive,
    /// Sorts bounds along X and sweeps. Fast, but pairs are only found from
    /// current bounds, so very fast bodies can tunnel between steps.
    #[default]
    SweepAndPrune,
    /// Buckets bounds into a uniform grid.
    UniformGrid,
}

/// Per-body input to the broad phase.
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseProxy {
    pub handle: BodyHandle,
    /// `None` marks an unbounded shape (plane) that may touch anything.
    pub aabb: Option<Aabb>,
}

/// Uniform grid spatial partitioning used by the grid broad-phase.
pub struct SpatialGrid {
    cell_size: f32,
    grid: HashMap<(i32, i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            grid: HashMap::new(),
        }
    }

    fn world_to_grid(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    pub fn insert(&mut self, slot: usize, aabb: &Aabb) {
        let min_cell = self.world_to_grid(aabb.min);
        let max_cell = self.world_to_grid(aabb.max);

        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                for z in min_cell.2..=max_cell.2 {
                    self.grid.entry((x, y, z)).or_default().push(slot);
                }
            }
        }
    }

    /// Every pair of slots sharing at least one cell, each reported once.
    pub fn shared_cell_pairs(&self) -> HashSet<(usize, usize)> {
        let mut pairs = HashSet::new();
        for slots in self.grid.values() {
            for (i, &a) in slots.iter().enumerate() {
                for &b in &slots[i + 1..] {
                    pairs.insert(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
        pairs
    }
}

/// Broad phase driver returning potential body pairs.
pub struct BroadPhase {
    kind: BroadPhaseKind,
    grid: SpatialGrid,
}

impl BroadPhase {
    pub fn new(kind: BroadPhaseKind, cell_size: f32) -> Self {
        Self {
            kind,
            grid: SpatialGrid::new(cell_size),
        }
    }

    pub fn kind(&self) -> BroadPhaseKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BroadPhaseKind) {
        self.kind = kind;
    }

    /// Candidate pairs, each ordered `(lower, higher)` and sorted for determinism.
    pub fn candidate_pairs(&mut self, proxies: &[BroadPhaseProxy]) -> Vec<(BodyHandle, BodyHandle)> {
        let mut slots = match self.kind {
            BroadPhaseKind::Naive => Self::naive(proxies),
            BroadPhaseKind::SweepAndPrune => Self::sweep_and_prune(proxies),
            BroadPhaseKind::UniformGrid => self.uniform_grid(proxies),
        };
        slots.extend(Self::unbounded_pairs(proxies));

        let mut pairs: Vec<(BodyHandle, BodyHandle)> = slots
            .into_iter()
            .map(|(i, j)| {
                let (a, b) = (proxies[i].handle, proxies[j].handle);
                if a < b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }

    fn naive(proxies: &[BroadPhaseProxy]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in proxies.iter().enumerate() {
            let Some(aabb_a) = a.aabb else { continue };
            for (j, b) in proxies.iter().enumerate().skip(i + 1) {
                if let Some(aabb_b) = b.aabb {
                    if aabb_a.overlaps(&aabb_b) {
                        pairs.push((i, j));
                    }
                }
            }
        }
        pairs
    }

    fn sweep_and_prune(proxies: &[BroadPhaseProxy]) -> Vec<(usize, usize)> {
        let mut order: Vec<(usize, Aabb)> = proxies
            .iter()
            .enumerate()
            .filter_map(|(i, proxy)| proxy.aabb.map(|aabb| (i, aabb)))
            .collect();
        order.sort_by(|a, b| a.1.min.x.total_cmp(&b.1.min.x));

        let mut pairs = Vec::new();
        for (k, (i, aabb_i)) in order.iter().enumerate() {
            for (j, aabb_j) in &order[k + 1..] {
                if aabb_j.min.x > aabb_i.max.x {
                    break;
                }
                if aabb_i.overlaps(aabb_j) {
                    pairs.push((*i, *j));
                }
            }
        }
        pairs
    }

    fn uniform_grid(&mut self, proxies: &[BroadPhaseProxy]) -> Vec<(usize, usize)> {
        self.grid.clear();
        for (i, proxy) in proxies.iter().enumerate() {
            if let Some(aabb) = &proxy.aabb {
                self.grid.insert(i, aabb);
            }
        }
        self.grid
            .shared_cell_pairs()
            .into_iter()
            .filter(|&(i, j)| match (proxies[i].aabb, proxies[j].aabb) {
                (Some(a), Some(b)) => a.overlaps(&b),
                _ => false,
            })
            .collect()
    }

    /// Unbounded shapes pair with every bounded one; two unbounded shapes never pair.
    fn unbounded_pairs(proxies: &[BroadPhaseProxy]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, proxy) in proxies.iter().enumerate() {
            if proxy.aabb.is_some() {
                continue;
            }
            for (j, other) in proxies.iter().enumerate() {
                if other.aabb.is_some() {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}
