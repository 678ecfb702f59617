//! Lock-free disjoint set struct
//!
//! One paged `u64` parent array, mutated only through compare-and-swap.
//! Every link points from a larger id to a smaller one (`parent[i] <= i`),
//! so trees can never form cycles and each root is the minimum id of its set.
//! That makes the reported set id independent of the order of unions.

use crate::concurrency::range_partitions;
use crate::graph::NodeId;
use crate::paged::PageStore;
use crate::Result;
use rayon::prelude::*;

/// Concurrent union-find over `[0, size)`
#[derive(Debug)]
pub struct DisjointSetStruct {
    parent: PageStore<u64>,
}

impl DisjointSetStruct {
    /// Create `size` singleton sets.
    ///
    /// Initialisation runs on the current rayon pool.
    pub fn new(size: u64) -> Result<Self> {
        let parent = PageStore::<u64>::new(size)?;
        range_partitions(size, rayon::current_num_threads())
            .into_par_iter()
            .try_for_each(|range| {
                let start = range.start;
                let ids: Vec<u64> = range.collect();
                parent.set_range(start, &ids)
            })?;
        Ok(Self { parent })
    }

    /// Number of elements
    pub fn size(&self) -> u64 {
        self.parent.capacity()
    }

    /// Representative of `node`'s set.
    ///
    /// Halves the path while walking: each visited node is pointed at its
    /// grandparent. A lost CAS only means another thread already moved the
    /// node closer to the root.
    pub fn find(&self, node: NodeId) -> Result<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent.get(current)?;
            if parent == current {
                return Ok(current);
            }
            let grandparent = self.parent.get(parent)?;
            if grandparent != parent {
                let _ = self.parent.compare_and_swap(current, parent, grandparent)?;
            }
            current = grandparent;
        }
    }

    /// Merge the sets of `a` and `b`; returns `false` if they were already
    /// joined
    pub fn union(&self, a: NodeId, b: NodeId) -> Result<bool> {
        let mut a = a;
        let mut b = b;
        loop {
            let root_a = self.find(a)?;
            let root_b = self.find(b)?;
            if root_a == root_b {
                return Ok(false);
            }
            let (low, high) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            match self.parent.compare_and_swap(high, high, low)? {
                Ok(_) => return Ok(true),
                // `high` got linked elsewhere meanwhile
                Err(_) => {
                    a = root_a;
                    b = root_b;
                }
            }
        }
    }

    /// Component id of `node`: the minimum id of its set
    pub fn set_id_of(&self, node: NodeId) -> Result<NodeId> {
        self.find(node)
    }

    /// True if `a` and `b` are in the same set
    pub fn same_set(&self, a: NodeId, b: NodeId) -> Result<bool> {
        Ok(self.find(a)? == self.find(b)?)
    }

    /// Bytes held by the parent pages
    pub fn memory_usage(&self) -> usize {
        self.parent.memory_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_singletons() {
        let dss = DisjointSetStruct::new(5).unwrap();
        assert_eq!(dss.size(), 5);
        for node in 0..5 {
            assert_eq!(dss.find(node).unwrap(), node);
        }
        assert!(!dss.same_set(0, 1).unwrap());
    }

    #[test]
    fn test_union_links_to_minimum() {
        let dss = DisjointSetStruct::new(6).unwrap();
        assert!(dss.union(5, 3).unwrap());
        assert!(dss.union(3, 4).unwrap());
        assert!(!dss.union(4, 5).unwrap());
        assert!(dss.union(4, 1).unwrap());

        for node in [1, 3, 4, 5] {
            assert_eq!(dss.set_id_of(node).unwrap(), 1);
        }
        assert_eq!(dss.set_id_of(0).unwrap(), 0);
        assert_eq!(dss.set_id_of(2).unwrap(), 2);
        assert!(dss.same_set(5, 1).unwrap());
    }

    #[test]
    fn test_find_is_idempotent() {
        let dss = DisjointSetStruct::new(8).unwrap();
        for node in 1..8 {
            dss.union(node, node - 1).unwrap();
        }
        let first: Vec<_> = (0..8).map(|n| dss.find(n).unwrap()).collect();
        let second: Vec<_> = (0..8).map(|n| dss.find(n).unwrap()).collect();
        assert_eq!(first, vec![0; 8]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_range() {
        let dss = DisjointSetStruct::new(3).unwrap();
        assert!(matches!(dss.find(3), Err(Error::Index { index: 3, len: 3 })));
        assert!(dss.union(0, 7).is_err());
        assert!(dss.same_set(9, 0).is_err());
    }

    #[test]
    fn test_concurrent_unions() {
        let size = 10_000u64;
        let dss = DisjointSetStruct::new(size).unwrap();

        // two interleaved chains: evens and odds, unioned from many threads
        (2..size).into_par_iter().for_each(|node| {
            dss.union(node, node - 2).unwrap();
        });

        for node in 0..size {
            assert_eq!(dss.set_id_of(node).unwrap(), node % 2);
            assert!(dss.parent.get(node).unwrap() <= node);
        }
    }
}
