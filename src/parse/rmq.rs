//! Sparse-table range-minimum queries
//!
//! O(n log n) preprocessing, O(1) queries. Used for the sampled LCP of the
//! parse, which only has one entry per phrase occurrence.

/// Range-minimum structure answering minimum values over inclusive ranges
pub struct SparseTableRmq {
    /// `levels[k][i]` is the minimum of `values[i..i + 2^k]`
    levels: Vec<Vec<usize>>,
}

impl SparseTableRmq {
    pub fn new(values: &[usize]) -> Self {
        let mut levels = vec![values.to_vec()];
        let mut span = 1;
        while span * 2 <= values.len() {
            let prev = &levels[levels.len() - 1];
            let next: Vec<usize> = (0..=values.len() - span * 2)
                .map(|i| prev[i].min(prev[i + span]))
                .collect();
            levels.push(next);
            span *= 2;
        }
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Minimum of `values[left..=right]`
    #[inline]
    pub fn min(&self, left: usize, right: usize) -> usize {
        debug_assert!(left <= right && right < self.len());
        let k = (usize::BITS - 1 - (right - left + 1).leading_zeros()) as usize;
        let level = &self.levels[k];
        level[left].min(level[right + 1 - (1 << k)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_linear_scan() {
        let values = vec![5, 3, 8, 1, 9, 2, 7, 4, 6, 0, 3];
        let rmq = SparseTableRmq::new(&values);
        for left in 0..values.len() {
            for right in left..values.len() {
                let expected = *values[left..=right].iter().min().unwrap();
                assert_eq!(rmq.min(left, right), expected, "range [{left}, {right}]");
            }
        }
    }

    #[test]
    fn test_single_value() {
        let rmq = SparseTableRmq::new(&[42]);
        assert_eq!(rmq.min(0, 0), 42);
        assert_eq!(rmq.len(), 1);
    }
}
