//! Property-based tests for the metric calculator.

use approx::assert_abs_diff_eq;
use classification_reporter::*;
use proptest::prelude::*;

mod common;
use common::*;

fn examples(max_labels: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1..=max_labels).prop_flat_map(|num_labels| {
        (
            Just(num_labels),
            prop::collection::vec((0..num_labels, 0..num_labels), 0..60),
        )
    })
}

fn hard_options() -> MetricOptions {
    MetricOptions {
        soft_scores: false,
        ..MetricOptions::default()
    }
}

fn predictions(pairs: &[(usize, usize)]) -> Vec<LabelPrediction> {
    pairs
        .iter()
        .map(|&(predicted, expected)| LabelPrediction::new(ScoreVector::Withheld, predicted, expected))
        .collect()
}

proptest! {
    #[test]
    fn prop_per_label_scores_are_bounded((num_labels, pairs) in examples(6)) {
        let report = compute_classification_metrics(
            &predictions(&pairs),
            &create_label_names(num_labels),
            None,
            &hard_options(),
        ).unwrap();

        prop_assert!((0.0..=1.0).contains(&report.accuracy));
        for scores in report.macro_prf1_metrics.per_label_scores.values() {
            prop_assert!((0.0..=1.0).contains(&scores.precision));
            prop_assert!((0.0..=1.0).contains(&scores.recall));
            prop_assert!((0.0..=1.0).contains(&scores.f1));
        }
    }

    #[test]
    fn prop_macro_is_mean_of_per_label((num_labels, pairs) in examples(6)) {
        let report = compute_classification_metrics(
            &predictions(&pairs),
            &create_label_names(num_labels),
            None,
            &hard_options(),
        ).unwrap();

        let per_label = &report.macro_prf1_metrics.per_label_scores;
        let macro_scores = report.macro_prf1_metrics.macro_scores;
        prop_assert_eq!(macro_scores.num_labels, per_label.len());
        if !per_label.is_empty() {
            let n = per_label.len() as f64;
            let f1 = per_label.values().map(|s| s.f1).sum::<f64>() / n;
            let precision = per_label.values().map(|s| s.precision).sum::<f64>() / n;
            prop_assert!((macro_scores.f1 - f1).abs() < 1e-9);
            prop_assert!((macro_scores.precision - precision).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_metrics_are_order_independent((num_labels, pairs) in examples(5)) {
        let labels = create_label_names(num_labels);
        let forward = compute_classification_metrics(&predictions(&pairs), &labels, None, &hard_options()).unwrap();

        let mut reversed_pairs = pairs.clone();
        reversed_pairs.reverse();
        let reversed = compute_classification_metrics(&predictions(&reversed_pairs), &labels, None, &hard_options()).unwrap();

        prop_assert_eq!(forward.accuracy, reversed.accuracy);
        prop_assert_eq!(forward.macro_prf1_metrics, reversed.macro_prf1_metrics);
    }

    #[test]
    fn prop_all_correct_is_perfect((num_labels, pairs) in examples(6)) {
        prop_assume!(!pairs.is_empty());
        let correct: Vec<(usize, usize)> = pairs.iter().map(|&(p, _)| (p, p)).collect();
        let report = compute_classification_metrics(
            &predictions(&correct),
            &create_label_names(num_labels),
            None,
            &hard_options(),
        ).unwrap();

        prop_assert_eq!(report.accuracy, 1.0);
        for scores in report.macro_prf1_metrics.per_label_scores.values() {
            prop_assert_eq!(scores.f1, 1.0);
        }
    }

    #[test]
    fn prop_soft_scores_are_bounded(seed in 0u64..1000, num_labels in 2usize..5) {
        let fixture = SingleLabelFixture::new(50, num_labels, seed);
        let mut reporter = ClassificationMetricReporter::from_config(
            fixture.label_names.clone(),
            ReporterConfig::default(),
        ).unwrap();
        fixture.feed_batches(&mut reporter, 16).unwrap();

        let report = reporter.calculate_metric().unwrap();
        let soft = report.per_label_soft_scores.unwrap();
        for metrics in soft.values() {
            prop_assert!((0.0..=1.0).contains(&metrics.average_precision));
            if let Some(roc_auc) = metrics.roc_auc {
                prop_assert!((0.0..=1.0).contains(&roc_auc));
            }
            for entry in &metrics.recall_at_precision {
                prop_assert!((0.0..=1.0).contains(&entry.recall));
            }
        }
    }
}

#[test]
fn test_recall_at_precision_is_monotone_in_threshold() {
    let fixture = SingleLabelFixture::new(120, 3, 17);
    let mut reporter =
        ClassificationMetricReporter::from_config(fixture.label_names.clone(), ReporterConfig::default()).unwrap();
    fixture.feed_batches(&mut reporter, 40).unwrap();

    let report = reporter.calculate_metric().unwrap();
    for metrics in report.per_label_soft_scores.unwrap().values() {
        let recalls: Vec<f64> = metrics.recall_at_precision.iter().map(|entry| entry.recall).collect();
        assert_eq!(recalls.len(), RECALL_AT_PRECISION_THRESHOLDS.len());
        // a stricter precision floor can only lower the reachable recall
        for pair in recalls.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert_abs_diff_eq!(metrics.recall_at(0.2).unwrap_or(0.0), recalls[0]);
    }
}
