//! Output channel and report dispatch integration tests.

use approx::assert_abs_diff_eq;
use classification_reporter::*;
use ndarray::{arr1, arr2, Array2};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

mod common;
use common::*;

/// What a recording channel saw of one report
#[derive(Debug, Clone)]
struct Seen {
    stage: Stage,
    epoch: usize,
    model_select_metric: f64,
    predictions: Vec<ReportedLabel>,
    meta: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
struct RecordingChannel {
    stages: Vec<Stage>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Channel for RecordingChannel {
    fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn report(&mut self, report: &StageReport<'_>) -> Result<()> {
        self.seen.lock().unwrap().push(Seen {
            stage: report.stage,
            epoch: report.epoch,
            model_select_metric: report.model_select_metric,
            predictions: report.predictions.to_vec(),
            meta: report.meta.clone(),
        });
        Ok(())
    }
}

fn raw_rows(rows: Vec<Value>) -> Vec<Map<String, Value>> {
    rows.into_iter().filter_map(|row| row.as_object().cloned()).collect()
}

#[test]
fn test_file_channel_fires_for_configured_stages() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test_predictions.tsv");
    let config = ReporterConfigBuilder::new()
        .additional_column_names(["doc_id"])
        .output_path(&path)
        .build()
        .unwrap();
    let mut reporter = ClassificationMetricReporter::from_config(names(&["neg", "pos"]), config).unwrap();

    let rows = raw_rows(vec![
        json!({"text": "great movie", "doc_id": "d1"}),
        json!({"text": "dull", "doc_id": "d2"}),
    ]);
    let context = reporter.batch_context(&rows).unwrap();
    let predictions = arr1(&[1i64, 1]);
    let targets = arr1(&[1i64, 0]);
    let scores = arr2(&[[0.25f32, 0.75], [0.5, 0.5]]);
    let output = BatchOutput::new(predictions.view(), targets.view()).with_scores(scores.view());
    let mut model_input = vec![Array2::<f32>::zeros((2, 3))];
    reporter.add_batch_stats(0, output, &mut model_input, &context).unwrap();

    reporter.report_metric(Stage::Eval, 1, false).unwrap();
    assert!(!path.exists());

    reporter.report_metric(Stage::Test, 1, true).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "prediction\ttarget\tscores\ttext\tdoc_id");
    assert_eq!(lines[1], "pos\tpos\t[0.25,0.75]\tgreat movie\td1");
    assert_eq!(lines[2], "pos\tneg\t[0.5,0.5]\tdull\td2");
    assert_eq!(reporter.aggregator().num_examples(), 0);
}

#[test]
fn test_memory_efficient_file_has_empty_scores() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("preds.tsv");
    let config = ReporterConfigBuilder::new()
        .memory_efficient(true)
        .output_path(&path)
        .file_channel_stages(vec![Stage::Eval])
        .build()
        .unwrap();
    let mut reporter =
        MultiLabelClassificationMetricReporter::from_config(names(&["x", "y", "z"]), config).unwrap();

    let context = reporter.batch_context(&raw_rows(vec![json!({"text": "hello"})])).unwrap();
    let indicator = arr2(&[[1i64, 0, 1]]);
    let targets = arr2(&[[0i64, NO_LABEL]]);
    let output = BatchOutput::new(indicator.view(), targets.view());
    reporter.add_batch_stats(0, output, &mut create_model_input(1), &context).unwrap();

    reporter.report_metric(Stage::Eval, 0, false).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().nth(1), Some("x,z\tx\t\thello"));
}

#[test]
fn test_custom_channel_receives_report() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let channel = RecordingChannel {
        stages: vec![Stage::Train, Stage::Eval],
        seen: Arc::clone(&seen),
    };
    let config = ReporterConfigBuilder::new()
        .model_select_metric(ComparableClassificationMetric::MacroF1)
        .build()
        .unwrap();
    let mut reporter = ClassificationMetricReporter::from_config(names(&["a", "b"]), config)
        .unwrap()
        .with_channel(Box::new(channel));

    let predictions = arr1(&[0i64, 1]);
    let scores = arr2(&[[0.9f32, 0.1], [0.2, 0.8]]);
    let output = BatchOutput::new(predictions.view(), predictions.view()).with_scores(scores.view());
    reporter.add_batch_stats(0, output, &mut create_model_input(2), &no_context()).unwrap();

    reporter.report_metric(Stage::Train, 3, false).unwrap();
    reporter.report_metric(Stage::Test, 3, false).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].stage, Stage::Train);
    assert_eq!(seen[0].epoch, 3);
    assert_eq!(seen[0].model_select_metric, 1.0);
    assert_eq!(seen[0].predictions, vec![ReportedLabel::Single("a".into()), ReportedLabel::Single("b".into())]);
    assert_eq!(seen[0].meta["label_names"], names(&["a", "b"]));
}

#[test]
fn test_metrics_report_serializes_to_json() {
    let fixture = SingleLabelFixture::new(20, 2, 3);
    let mut reporter =
        ClassificationMetricReporter::from_config(fixture.label_names.clone(), ReporterConfig::default()).unwrap();
    fixture.feed_batches(&mut reporter, 5).unwrap();

    let metrics = reporter.calculate_metric().unwrap();
    let json = metrics.to_json().unwrap();
    let restored: ClassificationMetrics = serde_json::from_str(&json).unwrap();
    assert_abs_diff_eq!(restored.accuracy, metrics.accuracy, epsilon = 1e-12);
    assert_abs_diff_eq!(
        restored.macro_prf1_metrics.macro_scores.f1,
        metrics.macro_prf1_metrics.macro_scores.f1,
        epsilon = 1e-12
    );
    assert_eq!(
        restored.macro_prf1_metrics.per_label_scores.keys().collect::<Vec<_>>(),
        metrics.macro_prf1_metrics.per_label_scores.keys().collect::<Vec<_>>()
    );
    assert_eq!(restored.mcc.is_some(), metrics.mcc.is_some());
}
