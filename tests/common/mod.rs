//! Common test utilities for classification reporter integration tests.
#![allow(dead_code)]

use classification_reporter::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use std::collections::BTreeMap;

/// Label catalogue `label_0 .. label_{n-1}`
pub fn create_label_names(num_labels: usize) -> Vec<String> {
    (0..num_labels).map(|i| format!("label_{}", i)).collect()
}

/// Label catalogue from string literals
pub fn names(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

/// Row-normalized random scores
pub fn create_test_scores(num_samples: usize, num_labels: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut scores = Array2::zeros((num_samples, num_labels));
    for i in 0..num_samples {
        let mut total = 0.0;
        for j in 0..num_labels {
            let value: f32 = rng.gen_range(0.01..1.0);
            scores[[i, j]] = value;
            total += value;
        }
        for j in 0..num_labels {
            scores[[i, j]] /= total;
        }
    }

    scores
}

/// Index of the highest score per row, lower index on ties
pub fn argmax_predictions(scores: &Array2<f32>) -> Array1<i64> {
    scores
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (j, &value) in row.iter().enumerate() {
                if value > row[best] {
                    best = j;
                }
            }
            best as i64
        })
        .collect()
}

/// Random targets in `0..num_labels`
pub fn create_test_targets(num_samples: usize, num_labels: usize, seed: u64) -> Array1<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_samples).map(|_| rng.gen_range(0..num_labels as i64)).collect()
}

/// Single-label batch: argmax predictions, random targets and their scores
pub fn create_single_label_batch(
    num_samples: usize,
    num_labels: usize,
    seed: u64,
) -> (Array1<i64>, Array1<i64>, Array2<f32>) {
    let scores = create_test_scores(num_samples, num_labels, seed);
    let predictions = argmax_predictions(&scores);
    let targets = create_test_targets(num_samples, num_labels, seed.wrapping_add(1));
    (predictions, targets, scores)
}

/// Model input whose first tensor has `num_samples` rows
pub fn create_model_input(num_samples: usize) -> Vec<Array2<f32>> {
    vec![Array2::zeros((num_samples, 4))]
}

/// Empty batch context
pub fn no_context() -> BTreeMap<String, ContextValue> {
    BTreeMap::new()
}

/// Feed one batch into a reporter
pub fn feed<'a, K: classification_reporter::reporter::ReporterKind>(
    reporter: &mut MetricReporter<K>,
    batch_index: usize,
    predictions: ndarray::ArrayViewD<'a, i64>,
    targets: ndarray::ArrayViewD<'a, i64>,
    scores: Option<ndarray::ArrayView2<'a, f32>>,
    loss: Option<f64>,
) -> Result<()> {
    let num_samples = predictions.shape().first().copied().unwrap_or(0);
    let output = BatchOutput {
        predictions,
        targets,
        scores,
        loss,
    };
    reporter.add_batch_stats(batch_index, output, &mut create_model_input(num_samples), &no_context())
}

/// Test fixture holding a single-label pass split into batches
pub struct SingleLabelFixture {
    pub label_names: Vec<String>,
    pub predictions: Array1<i64>,
    pub targets: Array1<i64>,
    pub scores: Array2<f32>,
}

impl SingleLabelFixture {
    pub fn new(num_samples: usize, num_labels: usize, seed: u64) -> Self {
        let (predictions, targets, scores) = create_single_label_batch(num_samples, num_labels, seed);
        SingleLabelFixture {
            label_names: create_label_names(num_labels),
            predictions,
            targets,
            scores,
        }
    }

    /// Feed the fixture in batches of `batch_size`
    pub fn feed_batches<K: classification_reporter::reporter::ReporterKind>(
        &self,
        reporter: &mut MetricReporter<K>,
        batch_size: usize,
    ) -> Result<()> {
        let n = self.predictions.len();
        for (batch_index, start) in (0..n).step_by(batch_size).enumerate() {
            let end = (start + batch_size).min(n);
            feed(
                reporter,
                batch_index,
                self.predictions.slice(ndarray::s![start..end]).into_dyn(),
                self.targets.slice(ndarray::s![start..end]).into_dyn(),
                Some(self.scores.slice(ndarray::s![start..end, ..])),
                Some(0.1 * (batch_index + 1) as f64),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_scores() {
        let scores = create_test_scores(20, 4, 7);
        assert_eq!(scores.dim(), (20, 4));
        for row in scores.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_argmax_predictions() {
        let scores = ndarray::arr2(&[[0.1f32, 0.7, 0.2], [0.5, 0.5, 0.0]]);
        assert_eq!(argmax_predictions(&scores).to_vec(), vec![1, 0]);
    }
}
