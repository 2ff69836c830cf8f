//! Grouping matched pairs into duplicate clusters.
//!
//! Matches are treated as edges between rows; clusters are the connected
//! components, found with a disjoint-set forest using path compression and
//! union-by-rank.

use crate::rank::IdPair;
use linkage_core::{RecordId, RecordTable};
use std::collections::BTreeMap;

/// Union-Find (Disjoint Set Union) over row indices.
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Create `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Root of the set containing `x`, compressing the path on the way.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `x` and `y`. Returns false if already merged.
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return false;
        }

        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] = self.rank[rx].saturating_add(1);
            }
        }
        true
    }

    /// Check if `x` and `y` are in the same set.
    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }

    /// Sets with more than one member, each sorted, ordered by smallest member.
    #[must_use]
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            by_root.entry(root).or_default().push(i);
        }
        let mut groups: Vec<Vec<usize>> = by_root
            .into_values()
            .filter(|members| members.len() > 1)
            .collect();
        groups.sort_by_key(|members| members[0]);
        groups
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Connected clusters of matched ids.
///
/// Ids unknown to `table` are ignored. Each cluster is sorted by id and
/// clusters are ordered by their smallest id.
#[must_use]
pub fn cluster_matches(table: &RecordTable, pairs: &[IdPair]) -> Vec<Vec<RecordId>> {
    let mut uf = UnionFind::new(table.len());
    for pair in pairs {
        if let (Some(l), Some(r)) = (table.row_of(&pair.lid), table.row_of(&pair.rid)) {
            uf.union(l, r);
        }
    }

    let records = table.records();
    let mut clusters: Vec<Vec<RecordId>> = uf
        .groups()
        .into_iter()
        .map(|rows| {
            let mut ids: Vec<RecordId> = rows.into_iter().map(|r| records[r].id().clone()).collect();
            ids.sort();
            ids
        })
        .collect();
    clusters.sort();
    clusters
}
