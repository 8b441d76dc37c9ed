use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// Append-only exact-search index over fixed-width vectors.
///
/// Rows are stored in one contiguous buffer and addressed by insertion
/// ordinal, so ordinal `i` is always the `i`-th vector ever added. Search is
/// a brute-force scan; with squared L2 the ranking matches true L2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors stored, which is also the next insertion ordinal.
    pub fn ntotal(&self) -> u64 {
        (self.vectors.len() / self.dimension) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn add(&mut self, rows: &[Vec<f32>]) -> Result<(), StoreError> {
        for row in rows {
            if row.len() != self.dimension {
                return Err(StoreError::Dimension {
                    expected: self.dimension,
                    actual: row.len(),
                });
            }
        }

        for row in rows {
            self.vectors.extend_from_slice(row);
        }

        Ok(())
    }

    /// Returns up to `k` `(ordinal, squared L2 distance)` pairs, nearest
    /// first. An empty index yields an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>, StoreError> {
        if query.len() != self.dimension {
            return Err(StoreError::Dimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<(u64, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, row)| {
                let distance = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                (ordinal as u64, distance)
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::FlatIndex;
    use crate::error::StoreError;

    #[test]
    fn search_ranks_nearest_first() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![0.0, 0.0], vec![10.0, 10.0], vec![1.0, 1.0]])
            .unwrap();

        let hits = index.search(&[0.9, 0.9], 2).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 2);
        assert_eq!(hits[1].0, 0);
        assert!(hits[0].1 <= hits[1].1);
    }

    #[test]
    fn oversized_k_returns_every_vector() {
        let mut index = FlatIndex::new(2);
        index.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        let hits = index.search(&[0.0, 0.0], 50).unwrap();

        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = FlatIndex::new(4);
        let hits = index.search(&[0.0; 4], 5).unwrap();
        assert!(hits.is_empty());
        assert_eq!(index.ntotal(), 0);
    }

    #[test]
    fn mismatched_row_width_is_rejected() {
        let mut index = FlatIndex::new(3);
        let result = index.add(&[vec![1.0, 2.0]]);

        assert!(matches!(
            result,
            Err(StoreError::Dimension {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(index.ntotal(), 0);
    }

    #[test]
    fn rejected_batch_leaves_index_unchanged() {
        let mut index = FlatIndex::new(2);
        index.add(&[vec![1.0, 1.0]]).unwrap();

        let result = index.add(&[vec![2.0, 2.0], vec![3.0]]);

        assert!(result.is_err());
        assert_eq!(index.ntotal(), 1);
    }

    #[test]
    fn ordinals_count_up_from_zero() {
        let mut index = FlatIndex::new(1);
        index.add(&[vec![1.0]]).unwrap();
        assert_eq!(index.ntotal(), 1);

        index.add(&[vec![2.0], vec![3.0]]).unwrap();
        assert_eq!(index.ntotal(), 3);

        let hits = index.search(&[3.0], 1).unwrap();
        assert_eq!(hits[0].0, 2);
    }
}
