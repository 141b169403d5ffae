//! CART regression trees and the ensembles built from them

use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::linear::check_shapes;
use super::Regressor;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

/// Squared-error regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub max_depth: usize,
    pub min_samples_split: usize,
    root: Option<Node>,
}

impl RegressionTree {
    pub fn new(max_depth: usize) -> Self {
        RegressionTree {
            max_depth,
            min_samples_split: 2,
            root: None,
        }
    }

    /// Fit on a subset of rows (indices may repeat for bootstrap samples)
    pub fn fit_indices(&mut self, x: &[Vec<f64>], y: &[f64], indices: &[usize]) {
        self.root = Some(self.build(x, y, indices, 0));
    }

    fn build(&self, x: &[Vec<f64>], y: &[f64], indices: &[usize], depth: usize) -> Node {
        let leaf = Node::Leaf(mean_of(y, indices));
        if depth >= self.max_depth || indices.len() < self.min_samples_split {
            return leaf;
        }

        match best_split(x, y, indices) {
            Some((feature, threshold)) => {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.iter().partition(|&&i| x[i][feature] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(x, y, &left, depth + 1)),
                    right: Box::new(self.build(x, y, &right, depth + 1)),
                }
            }
            None => leaf,
        }
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_shapes(x, y)?;
        let indices: Vec<usize> = (0..x.len()).collect();
        self.fit_indices(x, y, &indices);
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.root.as_ref().map(|r| r.predict(row)).unwrap_or(0.0)
    }

    fn name(&self) -> &'static str {
        "regression_tree"
    }
}

fn mean_of(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

/// Split with the largest reduction in squared error, if any improves on the parent
fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n = indices.len() as f64;
    let total: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total * total / n;

    let dim = x[indices[0]].len();
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..dim {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for pos in 0..order.len() - 1 {
            let i = order[pos];
            left_sum += y[i];
            left_sq += y[i] * y[i];

            let here = x[i][feature];
            let next = x[order[pos + 1]][feature];
            if here == next {
                continue;
            }

            let n_left = (pos + 1) as f64;
            let n_right = n - n_left;
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left)
                + (right_sq - right_sum * right_sum / n_right);

            if best.map_or(true, |(_, _, b)| sse < b) {
                best = Some((feature, (here + next) / 2.0, sse));
            }
        }
    }

    best.filter(|(_, _, sse)| *sse < parent_sse - 1e-12)
        .map(|(feature, threshold, _)| (feature, threshold))
}

/// Bagged regression trees over bootstrap samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_trees: usize,
    pub max_depth: usize,
    pub seed: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(n_trees: usize, max_depth: usize, seed: u64) -> Self {
        RandomForest {
            n_trees: n_trees.max(1),
            max_depth,
            seed,
            trees: Vec::new(),
        }
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_shapes(x, y)?;
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        let n = x.len();

        self.trees = (0..self.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree = RegressionTree::new(self.max_depth);
                tree.fit_indices(x, y, &sample);
                tree
            })
            .collect();
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}

/// Least-squares gradient boosting of shallow trees, starting from the mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    init: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(rounds: usize, learning_rate: f64, max_depth: usize) -> Self {
        GradientBoosting {
            rounds,
            learning_rate,
            max_depth,
            init: 0.0,
            trees: Vec::new(),
        }
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        check_shapes(x, y)?;
        let indices: Vec<usize> = (0..x.len()).collect();
        self.init = mean_of(y, &indices);
        self.trees.clear();

        let mut predictions = vec![self.init; y.len()];
        for _ in 0..self.rounds {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();
            let mut tree = RegressionTree::new(self.max_depth);
            tree.fit_indices(x, &residuals, &indices);

            for (p, row) in predictions.iter_mut().zip(x) {
                *p += self.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.init
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>()
    }

    fn name(&self) -> &'static str {
        "gradient_boosting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 5.0 } else { 15.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_tree_learns_step() {
        let (x, y) = step_data();
        let mut tree = RegressionTree::new(3);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&[2.0, 0.0]), 5.0);
        assert_eq!(tree.predict(&[17.0, 1.0]), 15.0);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let y = vec![7.0; 5];
        let mut tree = RegressionTree::new(4);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.root, Some(Node::Leaf(7.0)));
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let (x, y) = step_data();
        let mut a = RandomForest::new(20, 4, 42);
        let mut b = RandomForest::new(20, 4, 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let row = [12.5, 2.0];
        assert_eq!(a.predict(&row), b.predict(&row));
        assert!(a.predict(&[1.0, 1.0]) < a.predict(&[18.0, 1.0]));
    }

    #[test]
    fn test_boosting_fits_training_data() {
        let (x, y) = step_data();
        let mut model = GradientBoosting::new(100, 0.1, 3);
        model.fit(&x, &y).unwrap();
        assert!((model.predict(&x[0]) - 5.0).abs() < 0.1);
        assert!((model.predict(&x[19]) - 15.0).abs() < 0.1);
    }
}
