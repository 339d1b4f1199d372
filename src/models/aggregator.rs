//! Equal-weight averaging over a decision tree ensemble.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::models::tree::DecisionTree;
use crate::types::InferenceResult;

/// Non-empty ensemble of trees sharing one feature schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl Ensemble {
    /// Build an ensemble.
    ///
    /// Returns `None` if `trees` is empty or any split reads a feature
    /// index outside `n_features`. The artifact loader turns that into a
    /// load error, so an empty ensemble never reaches inference.
    pub fn new(trees: Vec<DecisionTree>, n_features: usize) -> Option<Self> {
        if trees.is_empty() {
            return None;
        }
        let in_schema = trees
            .iter()
            .all(|t| t.max_feature().map_or(true, |f| f < n_features));
        in_schema.then_some(Self { trees, n_features })
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Average the class-1 leaf probabilities of every tree.
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`Ensemble::n_features`].
    /// [`InferenceEngine`](crate::models::InferenceEngine) checks the length
    /// before calling in.
    pub fn predict(&self, features: &[f64]) -> InferenceResult {
        let positives = self.trees.iter().map(|tree| tree.evaluate(features).positive());
        InferenceResult::from_probability(mean(positives, self.trees.len()))
    }

    /// Same as [`Ensemble::predict`], with trees evaluated on the rayon pool.
    ///
    /// Per-tree probabilities are summed in tree order after the fan-in, so
    /// the result is bit-identical to the sequential path.
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`Ensemble::n_features`].
    pub fn predict_parallel(&self, features: &[f64]) -> InferenceResult {
        let positives: Vec<f64> = self
            .trees
            .par_iter()
            .map(|tree| tree.evaluate(features).positive())
            .collect();
        InferenceResult::from_probability(mean(positives.into_iter(), self.trees.len()))
    }
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    values.sum::<f64>() / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tree::TreeNode;

    fn stump(threshold: f64, left: f64, right: f64) -> DecisionTree {
        DecisionTree::new(TreeNode::split(
            0,
            threshold,
            TreeNode::leaf(1.0 - left, left),
            TreeNode::leaf(1.0 - right, right),
        ))
    }

    #[test]
    fn test_uniform_trees_average_to_same_probability() {
        for p in [0.0, 0.1, 0.37, 0.5, 0.9, 1.0] {
            let trees = (0..200)
                .map(|_| DecisionTree::new(TreeNode::leaf(1.0 - p, p)))
                .collect();
            let ensemble = Ensemble::new(trees, 8).unwrap();

            let result = ensemble.predict(&[0.0; 8]);
            assert!((result.probability - p).abs() < 1e-12, "p = {p}");
        }
    }

    #[test]
    fn test_equal_weight_average() {
        let ensemble = Ensemble::new(
            vec![stump(50.0, 0.1, 0.7), stump(40.0, 0.2, 0.6), stump(60.0, 0.0, 1.0)],
            8,
        )
        .unwrap();

        let mut features = [0.0; 8];
        features[0] = 45.0;
        // 0.1, 0.6, 0.0
        let result = ensemble.predict(&features);
        assert!((result.probability - 0.7 / 3.0).abs() < 1e-12);
        assert_eq!(result.label, 0);

        features[0] = 70.0;
        // 0.7, 0.6, 1.0
        let result = ensemble.predict(&features);
        assert!((result.probability - 2.3 / 3.0).abs() < 1e-12);
        assert_eq!(result.label, 1);
    }

    #[test]
    fn test_exact_half_is_negative() {
        let ensemble = Ensemble::new(
            vec![
                DecisionTree::new(TreeNode::leaf(0.0, 1.0)),
                DecisionTree::new(TreeNode::leaf(1.0, 0.0)),
            ],
            8,
        )
        .unwrap();

        let result = ensemble.predict(&[0.0; 8]);
        assert_eq!(result.probability, 0.5);
        assert_eq!(result.label, 0);
    }

    #[test]
    fn test_parallel_matches_sequential_bitwise() {
        let trees = (0..257)
            .map(|i| stump(i as f64 * 0.37, (i % 10) as f64 / 10.0, ((i * 7) % 10) as f64 / 9.0 * 0.9))
            .collect();
        let ensemble = Ensemble::new(trees, 8).unwrap();

        for x in [0.0, 13.3, 47.0, 95.1, 200.0] {
            let mut features = [0.0; 8];
            features[0] = x;
            let sequential = ensemble.predict(&features);
            let parallel = ensemble.predict_parallel(&features);
            assert_eq!(sequential.probability.to_bits(), parallel.probability.to_bits());
            assert_eq!(sequential.label, parallel.label);
        }
    }

    #[test]
    fn test_empty_or_out_of_schema_rejected() {
        assert!(Ensemble::new(Vec::new(), 8).is_none());
        assert!(Ensemble::new(vec![stump(1.0, 0.0, 1.0)], 0).is_none());
    }

    #[test]
    #[should_panic]
    fn test_short_vector_panics() {
        let ensemble = Ensemble::new(vec![stump(50.0, 0.1, 0.7)], 8).unwrap();
        let _ = ensemble.predict(&[]);
    }
}
