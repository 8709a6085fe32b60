//! Top-k reporter integration tests.

use approx::assert_abs_diff_eq;
use classification_reporter::*;
use ndarray::{arr1, arr2};

mod common;
use common::*;

fn five_labels() -> Vec<String> {
    names(&["l0", "l1", "l2", "l3", "l4"])
}

#[test]
fn test_third_ranked_hit_and_single_attribution_miss() {
    let mut reporter = TopKClassificationMetricReporter::from_config(five_labels(), ReporterConfig::default()).unwrap();

    // row 0 ranks l1, l2, l3 on top and expects l3
    // row 1 ranks l0, l1, l2 on top and expects l4
    let scores = arr2(&[[0.1f32, 0.4, 0.3, 0.15, 0.05], [0.5, 0.2, 0.15, 0.1, 0.05]]);
    let predictions = arr1(&[1i64, 0]);
    let targets = arr1(&[3i64, 4]);
    feed(
        &mut reporter,
        0,
        predictions.view().into_dyn(),
        targets.view().into_dyn(),
        Some(scores.view()),
        Some(0.7),
    )
    .unwrap();

    let metrics = reporter.calculate_metric().unwrap();
    assert_abs_diff_eq!(metrics.accuracy, 0.5);

    let per_label = &metrics.macro_prf1_metrics.per_label_scores;
    assert_eq!(per_label["l3"].true_positives, 1);
    assert_eq!(per_label["l4"].false_negatives, 1);
    assert_eq!(per_label["l0"].false_positives, 1);

    // the other wrong guesses of the miss contribute nothing
    assert!(!per_label.contains_key("l1"));
    assert!(!per_label.contains_key("l2"));
    let total_fp: usize = per_label.values().map(|s| s.false_positives).sum();
    let total_fn: usize = per_label.values().map(|s| s.false_negatives).sum();
    assert_eq!((total_fp, total_fn), (1, 1));
}

#[test]
fn test_soft_metrics_are_never_computed() {
    let mut reporter =
        TopKClassificationMetricReporter::from_config(names(&["neg", "pos"]), ReporterConfig::default()).unwrap();
    let scores = arr2(&[[0.8f32, 0.2], [0.3, 0.7]]);
    let predictions = arr1(&[0i64, 1]);
    feed(
        &mut reporter,
        0,
        predictions.view().into_dyn(),
        predictions.view().into_dyn(),
        Some(scores.view()),
        None,
    )
    .unwrap();

    let metrics = reporter.calculate_metric().unwrap();
    assert!(metrics.per_label_soft_scores.is_none());
    assert!(metrics.mcc.is_none());
    assert!(metrics.roc_auc.is_none());
}

#[test]
fn test_projections_use_model_prediction() {
    let config = ReporterConfigBuilder::new().topk(2).build().unwrap();
    let mut reporter = TopKClassificationMetricReporter::from_config(five_labels(), config).unwrap();

    // the model's own prediction need not be the top-scoring label
    let scores = arr2(&[[0.1f32, 0.2, 0.3, 0.25, 0.15]]);
    let predictions = arr1(&[4i64]);
    let targets = arr1(&[3i64]);
    feed(
        &mut reporter,
        0,
        predictions.view().into_dyn(),
        targets.view().into_dyn(),
        Some(scores.view()),
        None,
    )
    .unwrap();

    assert_eq!(reporter.predictions_to_report().unwrap(), vec![ReportedLabel::Single("l4".into())]);
    assert_eq!(reporter.targets_to_report().unwrap(), vec![ReportedLabel::Single("l3".into())]);
    // top-2 is {l2, l3}
    assert_eq!(reporter.calculate_metric().unwrap().accuracy, 1.0);
}

#[test]
fn test_ties_prefer_lower_label() {
    let config = ReporterConfigBuilder::new().topk(1).build().unwrap();
    let mut reporter = TopKClassificationMetricReporter::from_config(names(&["a", "b", "c"]), config).unwrap();

    let scores = arr2(&[[0.2f32, 0.4, 0.4]]);
    let predictions = arr1(&[1i64]);
    let targets = arr1(&[2i64]);
    feed(
        &mut reporter,
        0,
        predictions.view().into_dyn(),
        targets.view().into_dyn(),
        Some(scores.view()),
        None,
    )
    .unwrap();

    let metrics = reporter.calculate_metric().unwrap();
    assert_eq!(metrics.accuracy, 0.0);
    assert_eq!(metrics.macro_prf1_metrics.per_label_scores["b"].false_positives, 1);
}

#[test]
fn test_memory_efficient_still_needs_scores() {
    let config = ReporterConfigBuilder::new().memory_efficient(true).build().unwrap();
    let mut reporter = TopKClassificationMetricReporter::from_config(five_labels(), config).unwrap();
    let predictions = arr1(&[0i64]);

    let result = feed(&mut reporter, 0, predictions.view().into_dyn(), predictions.view().into_dyn(), None, None);
    assert!(matches!(result, Err(ReporterError::DataContract { .. })));

    let scores = arr2(&[[0.5f32, 0.2, 0.1, 0.1, 0.1]]);
    feed(
        &mut reporter,
        1,
        predictions.view().into_dyn(),
        predictions.view().into_dyn(),
        Some(scores.view()),
        None,
    )
    .unwrap();
    assert!(reporter.aggregator().scores().is_empty());
    assert_eq!(reporter.calculate_metric().unwrap().accuracy, 1.0);
}
