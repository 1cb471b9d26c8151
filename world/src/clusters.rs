//! Bomb explosion maps and the cluster arena backing them.
//!
//! Each cell lists the bombs whose blast reaches it. Every bomb belongs to
//! exactly one cluster; clusters live in an append-only arena and are
//! addressed by [`ClusterId`]. Merging two clusters appends a fresh record,
//! relabels every member bomb eagerly and empties both sources, so a lookup
//! never has to chase parent links.

use bomberland_core::{Bomb, CostGrid, Direction, Grid, Position};
use tracing::warn;

/// Stable handle of a cluster inside one [`ExplosionMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(u32);

impl ClusterId {
    /// Creates a cluster handle from its arena slot.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Arena slot of the cluster.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Aggregated state of bombs whose explosions chain together.
#[derive(Clone, Debug, PartialEq)]
pub struct BombCluster {
    /// Cell of the bomb that seeded the cluster.
    pub origin: Position,
    /// Highest danger among members.
    pub danger: f64,
    /// Whether any member is armed.
    pub armed: bool,
    /// Whether any member is ours.
    pub mine: bool,
    /// Whether any member belongs to an enemy.
    pub enemy: bool,
    /// Ticks until the first member explodes.
    pub ticks_till_explode: i64,
    /// Index of one of our armed bombs able to set the cluster off.
    pub trigger: Option<usize>,
}

impl BombCluster {
    /// Union of two clusters. The receiver keeps its origin and trigger.
    #[must_use]
    pub fn merged_with(&self, other: &BombCluster) -> BombCluster {
        BombCluster {
            origin: self.origin,
            danger: self.danger.max(other.danger),
            armed: self.armed || other.armed,
            mine: self.mine || other.mine,
            enemy: self.enemy || other.enemy,
            ticks_till_explode: self.ticks_till_explode.min(other.ticks_till_explode),
            trigger: self.trigger.or(other.trigger),
        }
    }
}

#[derive(Clone, Debug)]
struct ClusterRecord {
    cluster: BombCluster,
    members: Vec<usize>,
}

/// Per-cell explosion coverage for one side's bombs.
#[derive(Clone, Debug)]
pub struct ExplosionMap {
    cells: Grid<Vec<usize>>,
    membership: Vec<Option<ClusterId>>,
    clusters: Vec<ClusterRecord>,
}

impl ExplosionMap {
    /// Creates an empty map for a `width` x `height` board.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            cells: Grid::filled(width, height, Vec::new()),
            membership: Vec::new(),
            clusters: Vec::new(),
        }
    }

    /// Registers bomb `bomb` at its own cell inside a fresh singleton cluster.
    pub fn seed(&mut self, bomb: usize, position: Position, cluster: BombCluster) {
        let Some(entries) = self.cells.get_mut(position) else {
            return;
        };
        entries.clear();
        entries.push(bomb);

        let id = self.push_cluster(cluster, vec![bomb]);
        if self.membership.len() <= bomb {
            self.membership.resize(bomb + 1, None);
        }
        self.membership[bomb] = Some(id);
    }

    /// Casts the blast rays of `sources`, merging clusters whose rays reach
    /// another bomb.
    ///
    /// Rays pass through bombs and dead units and stop at the first wall.
    pub fn spread(
        &mut self,
        bombs: &[Bomb],
        sources: &[usize],
        walls: &CostGrid,
        dead_units: &Grid<bool>,
        has_bomb: &Grid<bool>,
    ) {
        let (width, height) = (self.cells.width(), self.cells.height());
        for &source in sources {
            let Some(bomb) = bombs.get(source) else {
                continue;
            };
            let radius = i64::from(bomb.blast_radius());
            for direction in [
                Direction::Right,
                Direction::Left,
                Direction::Up,
                Direction::Down,
            ] {
                let (dx, dy) = direction.delta();
                for distance in 1..radius {
                    let Some(cell) =
                        bomb.position
                            .offset(dx * distance, dy * distance, width, height)
                    else {
                        break;
                    };
                    if self.reach(source, cell, walls, dead_units, has_bomb) {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `true` when the ray has to stop at `cell`.
    fn reach(
        &mut self,
        source: usize,
        cell: Position,
        walls: &CostGrid,
        dead_units: &Grid<bool>,
        has_bomb: &Grid<bool>,
    ) -> bool {
        let occupant = self.cells[cell].first().copied();
        if let (Some(other), true) = (occupant, has_bomb[cell]) {
            self.merge(source, other);
            return false;
        }
        if walls[cell] != 0.0 && !dead_units[cell] {
            return true;
        }
        self.cells[cell].push(source);
        false
    }

    /// Unions the clusters holding bombs `left` and `right`.
    pub fn merge(&mut self, left: usize, right: usize) {
        let (Some(left_id), Some(right_id)) = (self.cluster_of(left), self.cluster_of(right))
        else {
            warn!(left, right, "merge requested for an unseeded bomb");
            return;
        };
        if left_id == right_id {
            return;
        }

        let left_record = &self.clusters[left_id.0 as usize];
        let right_record = &self.clusters[right_id.0 as usize];
        if left_record.members.is_empty() || right_record.members.is_empty() {
            warn!(
                left = left_id.0,
                right = right_id.0,
                "merge references a cluster without members"
            );
            return;
        }

        let merged = left_record.cluster.merged_with(&right_record.cluster);
        let mut members = std::mem::take(&mut self.clusters[right_id.0 as usize].members);
        members.append(&mut self.clusters[left_id.0 as usize].members);

        let id = self.push_cluster(merged, Vec::new());
        for &member in &members {
            if let Some(slot) = self.membership.get_mut(member) {
                *slot = Some(id);
            }
        }
        self.clusters[id.0 as usize].members = members;
    }

    fn push_cluster(&mut self, cluster: BombCluster, members: Vec<usize>) -> ClusterId {
        let id = ClusterId(u32::try_from(self.clusters.len()).unwrap_or(u32::MAX));
        self.clusters.push(ClusterRecord { cluster, members });
        id
    }

    /// Cluster currently holding bomb `bomb`.
    #[must_use]
    pub fn cluster_of(&self, bomb: usize) -> Option<ClusterId> {
        self.membership.get(bomb).copied().flatten()
    }

    /// Aggregated state of cluster `id`.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&BombCluster> {
        self.clusters.get(id.0 as usize).map(|record| &record.cluster)
    }

    /// Bomb indices belonging to cluster `id`. Emptied clusters have none.
    #[must_use]
    pub fn members(&self, id: ClusterId) -> &[usize] {
        self.clusters
            .get(id.0 as usize)
            .map(|record| record.members.as_slice())
            .unwrap_or(&[])
    }

    /// Clusters that still own bombs.
    pub fn live_clusters(&self) -> impl Iterator<Item = (ClusterId, &BombCluster)> + '_ {
        self.clusters
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.members.is_empty())
            .filter_map(|(slot, record)| {
                u32::try_from(slot)
                    .ok()
                    .map(|slot| (ClusterId(slot), &record.cluster))
            })
    }

    /// Bombs whose blast covers `position`.
    #[must_use]
    pub fn bombs_at(&self, position: Position) -> &[usize] {
        self.cells
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Clusters covering `position`, in entry order. May repeat.
    pub fn clusters_at(&self, position: Position) -> impl Iterator<Item = ClusterId> + '_ {
        self.bombs_at(position)
            .iter()
            .filter_map(|&bomb| self.cluster_of(bomb))
    }

    /// Reports whether cluster `id` covers `position`.
    #[must_use]
    pub fn covers(&self, position: Position, id: ClusterId) -> bool {
        self.clusters_at(position).any(|covering| covering == id)
    }

    /// Highest cluster danger covering `position`, or `0.0`.
    #[must_use]
    pub fn max_danger_at(&self, position: Position) -> f64 {
        self.clusters_at(position)
            .filter_map(|id| self.cluster(id))
            .fold(0.0, |max, cluster| max.max(cluster.danger))
    }

    /// Every cell covered by cluster `id`.
    #[must_use]
    pub fn cells_of(&self, id: ClusterId) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|(_, entries)| {
                entries
                    .iter()
                    .any(|&bomb| self.cluster_of(bomb) == Some(id))
            })
            .map(|(position, _)| position)
            .collect()
    }
}
