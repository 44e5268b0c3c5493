//! Fixed-size leaf splitting and bounded fan-out grouping.
//!
//! Boundaries depend only on offsets, never on content, so identical byte
//! sequences always produce identical leaves and an isomorphic tree.

use crate::error::{DagError, DagResult};

/// Splits data into bounded leaves and groups links into bounded parents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunker {
    leaf_size: usize,
    fan_out: usize,
}

/// Shape of the tree a file of a given length builds into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Number of Blob leaves (at least 1, even for empty input).
    pub leaves: u64,
    /// Number of List objects at each level, bottom-up. Empty when the file
    /// fits a single leaf; the last entry is always 1 otherwise.
    pub lists: Vec<u64>,
}

impl ChunkPlan {
    /// Number of List levels above the leaves.
    pub fn height(&self) -> usize {
        self.lists.len()
    }

    /// Total objects the file stores (leaves plus lists).
    pub fn objects(&self) -> u64 {
        self.leaves + self.lists.iter().sum::<u64>()
    }
}

impl Chunker {
    /// A chunker with leaf bound `leaf_size` bytes and at most `fan_out`
    /// links per parent.
    ///
    /// `leaf_size` must be at least 1 and `fan_out` at least 2; a fan-out of
    /// one could never reduce a level to a single root.
    pub fn new(leaf_size: usize, fan_out: usize) -> DagResult<Self> {
        if leaf_size == 0 {
            return Err(DagError::Config("leaf_size must be at least 1".into()));
        }
        if fan_out < 2 {
            return Err(DagError::Config(format!(
                "fan_out must be at least 2, got {fan_out}"
            )));
        }
        Ok(Self { leaf_size, fan_out })
    }

    /// Maximum payload bytes per leaf.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Maximum links per parent object.
    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Split `data` into leaves of `leaf_size` bytes; the last holds the
    /// remainder. Empty input yields exactly one empty leaf.
    pub fn split<'a>(&self, data: &'a [u8]) -> Vec<&'a [u8]> {
        if data.is_empty() {
            return vec![data];
        }
        data.chunks(self.leaf_size).collect()
    }

    /// Partition `items` into consecutive groups of at most `fan_out`.
    pub fn group<T>(&self, items: Vec<T>) -> Vec<Vec<T>> {
        let mut groups = Vec::with_capacity(items.len().div_ceil(self.fan_out));
        let mut iter = items.into_iter().peekable();
        while iter.peek().is_some() {
            groups.push(iter.by_ref().take(self.fan_out).collect());
        }
        groups
    }

    /// The tree shape for a file of `len` bytes, without touching any data.
    pub fn plan(&self, len: u64) -> ChunkPlan {
        let leaf = self.leaf_size as u64;
        let leaves = len.div_ceil(leaf).max(1);
        let mut lists = Vec::new();
        if leaves > 1 {
            let mut n = leaves;
            loop {
                n = n.div_ceil(self.fan_out as u64);
                lists.push(n);
                if n == 1 {
                    break;
                }
            }
        }
        ChunkPlan { leaves, lists }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB: usize = 1024;

    #[test]
    fn rejects_degenerate_bounds() {
        assert!(matches!(Chunker::new(0, 4), Err(DagError::Config(_))));
        assert!(matches!(Chunker::new(4, 1), Err(DagError::Config(_))));
        assert!(Chunker::new(1, 2).is_ok());
    }

    #[test]
    fn empty_input_is_one_empty_leaf() {
        let c = Chunker::new(16, 4).unwrap();
        let leaves = c.split(b"");
        assert_eq!(leaves.len(), 1);
        assert!(leaves[0].is_empty());
        assert_eq!(c.plan(0), ChunkPlan { leaves: 1, lists: vec![] });
    }

    #[test]
    fn input_up_to_leaf_size_is_one_leaf() {
        let c = Chunker::new(16, 4).unwrap();
        assert_eq!(c.split(&[7u8; 5]).len(), 1);
        let exact = [7u8; 16];
        let leaves = c.split(&exact);
        assert_eq!(leaves, vec![&exact[..]]);
        assert_eq!(c.plan(16).height(), 0);
    }

    #[test]
    fn leaf_size_plus_one_splits_in_two() {
        let c = Chunker::new(16, 4).unwrap();
        let data = [1u8; 17];
        let leaves = c.split(&data);
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].len(), 16);
        assert_eq!(leaves[1].len(), 1);
        assert_eq!(c.plan(17), ChunkPlan { leaves: 2, lists: vec![1] });
    }

    #[test]
    fn exact_multiple_has_full_final_leaf() {
        let c = Chunker::new(8, 4).unwrap();
        let data = [0u8; 24];
        let leaves = c.split(&data);
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().all(|l| l.len() == 8));
    }

    #[test]
    fn concrete_300k_file_shape() {
        let c = Chunker::new(256 * KIB, 1024).unwrap();
        let data = vec![0u8; 300 * KIB];
        let leaves = c.split(&data);
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].len(), 256 * KIB);
        assert_eq!(leaves[1].len(), 44 * KIB);
        let plan = c.plan(data.len() as u64);
        assert_eq!(plan, ChunkPlan { leaves: 2, lists: vec![1] });
        assert_eq!(plan.objects(), 3);
    }

    #[test]
    fn grouping_is_consecutive_and_bounded() {
        let c = Chunker::new(1, 3).unwrap();
        let groups = c.group((0..8).collect::<Vec<_>>());
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7]]);
        assert!(c.group(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn plan_height_is_ceil_log_fan_out() {
        let c = Chunker::new(1, 4).unwrap();
        // leaves -> expected list counts per level
        let cases: [(u64, &[u64]); 6] = [
            (2, &[1]),
            (4, &[1]),
            (5, &[2, 1]),
            (16, &[4, 1]),
            (17, &[5, 2, 1]),
            (64, &[16, 4, 1]),
        ];
        for (leaves, lists) in cases {
            let plan = c.plan(leaves);
            assert_eq!(plan.leaves, leaves);
            assert_eq!(plan.lists, lists, "leaves = {leaves}");
        }
    }

    #[test]
    fn split_is_deterministic() {
        let c = Chunker::new(5, 2).unwrap();
        let data: Vec<u8> = (0..23).collect();
        assert_eq!(c.split(&data), c.split(&data.clone()));
        let joined: Vec<u8> = c.split(&data).concat();
        assert_eq!(joined, data);
    }
}
