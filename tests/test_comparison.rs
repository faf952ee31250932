/// Integration tests for the variance filter and the comparison of both strategies
///
/// Run with: cargo test --test test_comparison -- --nocapture
use gafs::api;
use gafs::data::Data;
use gafs::experiment::ComparisonReport;
use gafs::param::Param;
use gafs::{run_comparison, run_variance_threshold};
use serde_json::json;

const CSV: &str = "id,f1,f2,f3,label\n\
    1,0.10,2.0,10.5,neg\n\
    2,0.20,2.2,11.0,neg\n\
    3,0.15,1.9,10.0,neg\n\
    4,0.12,2.1,10.8,neg\n\
    5,0.90,4.0,10.2,pos\n\
    6,0.80,4.2,11.1,pos\n\
    7,0.85,3.9,10.4,pos\n\
    8,0.95,4.1,10.9,pos\n\
    9,0.18,2.05,10.6,neg\n\
    10,0.88,4.05,10.3,pos\n";

fn test_params() -> Param {
    let mut param = Param::default();
    param.general.seed = 42;
    param.general.display_colorful = false;
    param.ga.population_size = 6;
    param.ga.max_generations = 4;
    param
}

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("gafs_it_{}_{}", std::process::id(), name))
        .to_string_lossy()
        .to_string()
}

#[test]
fn test_variance_zero_threshold_keeps_every_feature() {
    let mut param = test_params();
    param.variance.threshold = 0.0;
    let data = Data::from_csv_str(CSV, 4, Some(0), &param).unwrap();

    let result = run_variance_threshold(&data, &param).unwrap();
    assert_eq!(result.selected_features, vec!["f1", "f2", "f3"]);
    assert!(result.removed_features.is_empty(), "no column is constant");
    assert!((0.0..=1.0).contains(&result.accuracy));
}

#[test]
fn test_variance_threshold_above_every_variance_removes_everything() {
    let mut param = test_params();
    param.variance.threshold = 1e6;
    let data = Data::from_csv_str(CSV, 4, Some(0), &param).unwrap();

    let result = run_variance_threshold(&data, &param).unwrap();
    assert_eq!(result.accuracy, 0.0);
    assert!(result.selected_features.is_empty());
    assert_eq!(result.removed_features, vec!["f1", "f2", "f3"]);
}

#[test]
fn test_variance_threshold_request() {
    let request = json!({"csvData": CSV, "targetColumn": 4, "idColumn": 0, "threshold": 0.01});
    let response = api::handle_run_variance_threshold(&request, &test_params());

    assert!(response.get("error").is_none(), "unexpected error: {}", response);
    assert_eq!(response["thresholdUsed"], json!(0.01));
    assert_eq!(response["numFeaturesTotal"], json!(3));
    assert_eq!(response["rows"], json!(10));
    assert_eq!(response["idColumn"], json!("id"));
    let selected = response["numFeaturesSelected"].as_u64().unwrap();
    let removed = response["removedFeatures"].as_array().unwrap().len() as u64;
    assert_eq!(selected + removed, 3);
}

#[test]
fn test_comparison_runs_both_strategies() {
    let mut param = test_params();
    param.variance.threshold = 0.0;
    let data = Data::from_csv_str(CSV, 4, Some(0), &param).unwrap();

    let report = run_comparison(&data, &param).unwrap();
    assert_eq!(report.dataset.rows, 10);
    assert_eq!(report.dataset.num_features_total, 3);
    assert_eq!(report.dataset.target, "label");
    assert_eq!(report.dataset.id_column.as_deref(), Some("id"));
    assert_eq!(report.ga.best_mask.len(), 3);
    assert!(report.ga.history.len() <= param.ga.max_generations);
    assert_eq!(report.variance.selected_features.len(), 3);
    assert!(report.version.contains('#'));
}

#[test]
fn test_comparison_report_is_saved_when_requested() {
    let mut param = test_params();
    param.general.save_exp = temp_path("comparison.bin");
    let data = Data::from_csv_str(CSV, 4, Some(0), &param).unwrap();

    let report = run_comparison(&data, &param).unwrap();
    let loaded = ComparisonReport::load_auto(&param.general.save_exp).unwrap();
    assert_eq!(loaded, report, "the saved report should be loaded back unchanged");
    std::fs::remove_file(&param.general.save_exp).unwrap();
}

#[test]
fn test_comparison_request_shape() {
    let request = json!({
        "csvData": CSV,
        "targetColumn": 4,
        "popSize": 4,
        "maxGen": 2,
        "vtThreshold": "0.05"
    });
    let response = api::handle_run_comparison(&request, &test_params());

    assert!(response.get("error").is_none(), "unexpected error: {}", response);
    assert_eq!(response["dataset"]["numFeaturesTotal"], json!(4), "without id column, id is a feature");
    assert!(response["dataset"].get("idColumn").is_none());
    assert_eq!(response["ga"]["bestFitness"], response["ga"]["accuracy"]);
    assert!(response["ga"]["generations"].as_u64().unwrap() <= 2);
    assert_eq!(response["varianceThreshold"]["thresholdUsed"], json!(0.05));
    assert!(response["varianceThreshold"]["execTimeSeconds"].as_f64().unwrap() >= 0.0);
}

#[test]
fn test_error_responses() {
    let param = test_params();

    let response = api::handle_run_comparison(&json!({"csvData": CSV}), &param);
    assert_eq!(response, json!({"error": "Target column must be specified"}));

    let response = api::handle_run_comparison(&json!({"csvData": "a,b,label\n1,2,x\n", "targetColumn": 2}), &param);
    assert_eq!(response, json!({"error": "Not enough valid data rows after cleaning"}));

    let response = api::handle_run_comparison(&json!({"csvData": CSV, "targetColumn": 4, "crossRate": 2.0}), &param);
    assert!(response["error"].as_str().unwrap().contains("crossover rate"));

    let response = api::handle_run_comparison(&json!({"csvData": CSV, "targetColumn": 4, "vtThreshold": "high"}), &param);
    assert!(response["error"].as_str().unwrap().contains("vtThreshold"));
}
