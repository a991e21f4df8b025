//! SMOTE oversampling

use crate::error::{DropoutError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique).
///
/// Every class smaller than the majority is topped up with points
/// interpolated between a random member and one of its `k` nearest
/// same-class neighbours. Original rows are kept first, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Target size of each minority class relative to the majority
    sampling_strategy: f64,
    /// Random seed
    seed: Option<u64>,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            sampling_strategy: 1.0,
            seed: None,
            target_counts: None,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set sampling strategy (ratio of minority target to majority count)
    pub fn with_sampling_strategy(mut self, ratio: f64) -> Self {
        self.sampling_strategy = ratio.clamp(0.1, 1.0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Fresh copy with the same configuration and no fitted targets
    pub fn unfitted(&self) -> Self {
        Self {
            target_counts: None,
            ..self.clone()
        }
    }

    fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
    }

    /// k nearest neighbours of `rows[pos]` among `rows`, excluding itself
    fn find_neighbors(x: &Array2<f64>, rows: &[usize], pos: usize, k: usize) -> Vec<usize> {
        let point = x.row(rows[pos]);
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (j, &row) in rows.iter().enumerate() {
            if j == pos {
                continue;
            }
            let dist = Self::squared_distance(point, x.row(row));
            if heap.len() < k {
                heap.push(DistIdx(dist, j));
            } else if let Some(&top) = heap.peek() {
                let candidate = DistIdx(dist, j);
                if candidate < top {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistIdx(_, j)| j).collect()
    }

    /// Interpolate between two points
    fn generate_sample(point: ArrayView1<f64>, neighbor: ArrayView1<f64>, rng: &mut ChaCha8Rng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point.iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(DropoutError::ValidationError(
                "Need at least 2 classes for SMOTE".to_string()
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        let targets = counts
            .iter()
            .map(|(&class, &count)| {
                let target = (max_count as f64 * self.sampling_strategy) as usize;
                (class, target.max(count))
            })
            .collect();

        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self.target_counts.as_ref().ok_or_else(|| {
            DropoutError::ValidationError("SMOTE not fitted".to_string())
        })?;
        if x.nrows() != y.len() {
            return Err(DropoutError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let indices = class_indices(y);
        let n_features = x.ncols();

        // Collect only synthetic samples; original rows are copied from x
        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let class_rows = match indices.get(&class) {
                Some(rows) if !rows.is_empty() => rows,
                _ => continue,
            };
            let n_to_generate = target_count.saturating_sub(class_rows.len());
            n_synthetic.insert(class, n_to_generate);
            if n_to_generate == 0 {
                continue;
            }

            let k = self.k_neighbors.min(class_rows.len().saturating_sub(1));
            let neighbors: Vec<Vec<usize>> = (0..class_rows.len())
                .map(|pos| Self::find_neighbors(x, class_rows, pos, k))
                .collect();

            for _ in 0..n_to_generate {
                let pos = rng.gen_range(0..class_rows.len());
                let sample = x.row(class_rows[pos]);
                // A lone class member can only be duplicated
                let neighbor = match neighbors[pos].choose(&mut rng) {
                    Some(&j) => x.row(class_rows[j]),
                    None => sample,
                };
                synthetic_x.extend(Self::generate_sample(sample, neighbor, &mut rng));
                synthetic_y.push(class);
            }
        }

        let synthetic = Array2::from_shape_vec((synthetic_y.len(), n_features), synthetic_x)?;
        let result_x = ndarray::concatenate(ndarray::Axis(0), &[x.view(), synthetic.view()])?;

        let mut all_y: Vec<i64> = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_imbalanced_data() -> (Array2<f64>, Array1<i64>) {
        // 20 majority around (0, 0), 5 minority around (10, 10)
        let mut data = Vec::new();
        let mut labels = Vec::new();

        for i in 0..20 {
            data.push((i % 5) as f64);
            data.push((i / 5) as f64);
            labels.push(0i64);
        }

        for i in 0..5 {
            data.push(10.0 + (i % 3) as f64);
            data.push(10.0 + (i / 3) as f64);
            labels.push(1i64);
        }

        let x = Array2::from_shape_vec((25, 2), data).unwrap();
        let y = Array1::from_vec(labels);

        (x, y)
    }

    #[test]
    fn test_smote_balances_classes() {
        let (x, y) = create_imbalanced_data();

        let mut smote = SMOTE::new().with_k_neighbors(3).with_seed(42);
        let result = smote.fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts[&0], 20);
        assert_eq!(counts[&1], 20);
        assert_eq!(result.n_synthetic[&1], 15);
        assert_eq!(result.n_synthetic[&0], 0);
        assert_eq!(result.x.nrows(), 40);
    }

    #[test]
    fn test_smote_preserves_original() {
        let (x, y) = create_imbalanced_data();
        let mut smote = SMOTE::new().with_seed(42);
        let result = smote.fit_resample(&x, &y).unwrap();

        for i in 0..x.nrows() {
            assert_eq!(result.x.row(i), x.row(i));
            assert_eq!(result.y[i], y[i]);
        }
    }

    #[test]
    fn test_synthetic_points_stay_in_minority_hull() {
        let (x, y) = create_imbalanced_data();
        let mut smote = SMOTE::new().with_k_neighbors(3).with_seed(7);
        let result = smote.fit_resample(&x, &y).unwrap();

        for i in x.nrows()..result.x.nrows() {
            assert_eq!(result.y[i], 1);
            for j in 0..2 {
                let v = result.x[[i, j]];
                assert!((10.0..=12.0).contains(&v), "synthetic value {} out of range", v);
            }
        }
    }

    #[test]
    fn test_smote_is_reproducible() {
        let (x, y) = create_imbalanced_data();
        let a = SMOTE::new().with_seed(42).fit_resample(&x, &y).unwrap();
        let b = SMOTE::new().with_seed(42).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_single_minority_sample_is_duplicated() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 9.0]).unwrap();
        let y = Array1::from_vec(vec![0, 0, 0, 1]);
        let result = SMOTE::new().with_seed(1).fit_resample(&x, &y).unwrap();
        assert_eq!(result.x.nrows(), 6);
        assert_eq!(result.x[[4, 0]], 9.0);
        assert_eq!(result.x[[5, 0]], 9.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::zeros((3, 1));
        let y = Array1::from_vec(vec![1, 1, 1]);
        assert!(SMOTE::new().fit_resample(&x, &y).is_err());
    }
}
