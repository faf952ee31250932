//! JSON request handlers for the three request kinds.
//!
//! Each handler takes the request object and a base `Param`, applies the
//! request options on top of it and always answers with a JSON object:
//! either the results or `{"error": message}`.

use crate::data::Data;
use crate::error::{GafsError, Result};
use crate::param::{self, Param};
use crate::utils::round_to;
use log::{debug, error};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

const DECIMALS: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Ga,
    VarianceThreshold,
    Comparison,
}

impl FromStr for RequestKind {
    type Err = GafsError;

    fn from_str(s: &str) -> Result<RequestKind> {
        match s.to_ascii_lowercase().as_str() {
            "ga" | "run_ga" => Ok(RequestKind::Ga),
            "variance" | "vt" | "run_variance_threshold" => Ok(RequestKind::VarianceThreshold),
            "compare" | "comparison" | "run_comparison" => Ok(RequestKind::Comparison),
            other => Err(GafsError::Configuration(format!(
                "Unknown request '{}'. Expected one of: ga, variance, compare",
                other
            ))),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Ga => "run_ga",
            RequestKind::VarianceThreshold => "run_variance_threshold",
            RequestKind::Comparison => "run_comparison",
        };
        write!(f, "{}", name)
    }
}

/// Dispatch a request by kind
pub fn handle(kind: RequestKind, request: &Value, base: &Param) -> Value {
    debug!("Handling {} request", kind);
    match kind {
        RequestKind::Ga => handle_run_ga(request, base),
        RequestKind::VarianceThreshold => handle_run_variance_threshold(request, base),
        RequestKind::Comparison => handle_run_comparison(request, base),
    }
}

pub fn handle_run_ga(request: &Value, base: &Param) -> Value {
    respond(run_ga(request, base))
}

pub fn handle_run_variance_threshold(request: &Value, base: &Param) -> Value {
    respond(run_variance_threshold(request, base))
}

pub fn handle_run_comparison(request: &Value, base: &Param) -> Value {
    respond(run_comparison(request, base))
}

fn respond(result: Result<Value>) -> Value {
    result.unwrap_or_else(|e| {
        error!("{}", e);
        json!({ "error": e.to_string() })
    })
}

/// Options shared by every request kind
struct DatasetOptions {
    csv_data: String,
    target_column: Option<usize>,
    id_column: Option<usize>,
}

impl DatasetOptions {
    fn parse(request: &Value) -> Result<DatasetOptions> {
        let csv_data = match request.get("csvData") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(GafsError::Configuration(format!(
                    "Invalid value for 'csvData': expected a string, got {}",
                    other
                )))
            }
        };
        Ok(DatasetOptions {
            csv_data,
            target_column: get_usize(request, "targetColumn")?,
            id_column: get_usize(request, "idColumn")?,
        })
    }

    /// Prepare the dataset; a request without target column is rejected first
    fn load(&self, param: &Param) -> Result<Data> {
        let target_column = self.target_column.ok_or_else(|| {
            GafsError::Configuration("Target column must be specified".to_string())
        })?;
        Data::from_csv_str(&self.csv_data, target_column, self.id_column, param)
    }
}

/// Overrides the `ga` section with `popSize`, `crossRate`, `mutRate`, `maxGen`
/// and `convergenceThreshold` when present
fn apply_ga_options(request: &Value, param: &mut Param) -> Result<()> {
    if let Some(pop_size) = get_usize(request, "popSize")? {
        param.ga.population_size = pop_size;
    }
    if let Some(rate) = get_f64(request, "crossRate")? {
        param.ga.crossover_rate = rate;
    }
    if let Some(rate) = get_f64(request, "mutRate")? {
        param.ga.mutation_rate = rate;
    }
    if let Some(max_gen) = get_usize(request, "maxGen")? {
        param.ga.max_generations = max_gen;
    }
    if let Some(threshold) = get_f64(request, "convergenceThreshold")? {
        param.ga.convergence_threshold = Some(threshold);
    }
    Ok(())
}

fn finalize(mut param: Param) -> Result<Param> {
    param::validate(&mut param).map_err(GafsError::Configuration)?;
    Ok(param)
}

fn run_ga(request: &Value, base: &Param) -> Result<Value> {
    let mut param = base.clone();
    apply_ga_options(request, &mut param)?;
    let dataset = DatasetOptions::parse(request)?;
    let param = finalize(param)?;
    let data = dataset.load(&param)?;

    let result = crate::run_ga(&data, &param)?;

    let mut response = Map::new();
    response.insert("bestFitness".into(), json!(round_to(result.best_score, DECIMALS)));
    response.insert("bestChromosome".into(), json!(result.best_mask.to_bits()));
    response.insert("selectedFeatures".into(), json!(result.selected_features));
    response.insert("history".into(), json!(result.history));
    response.insert("featuresCount".into(), json!(data.feature_len));
    response.insert("rows".into(), json!(data.sample_len));
    response.insert("target".into(), json!(data.target));
    response.insert("generations".into(), json!(result.generations()));
    response.insert("converged".into(), json!(result.converged));
    if let Some(id) = &data.id_column {
        response.insert("idColumn".into(), json!(id));
    }
    Ok(Value::Object(response))
}

fn run_variance_threshold(request: &Value, base: &Param) -> Result<Value> {
    let mut param = base.clone();
    if let Some(threshold) = get_f64(request, "threshold")? {
        param.variance.threshold = threshold;
    }
    let dataset = DatasetOptions::parse(request)?;
    let param = finalize(param)?;
    let data = dataset.load(&param)?;

    let start = Instant::now();
    let result = crate::run_variance_threshold(&data, &param)?;
    let exec_time = start.elapsed().as_secs_f64();

    let mut response = Map::new();
    response.insert("thresholdUsed".into(), json!(result.threshold));
    response.insert("accuracy".into(), json!(round_to(result.accuracy, DECIMALS)));
    response.insert("selectedFeatures".into(), json!(result.selected_features));
    response.insert("removedFeatures".into(), json!(result.removed_features));
    response.insert("numFeaturesSelected".into(), json!(result.selected_features.len()));
    response.insert("numFeaturesTotal".into(), json!(data.feature_len));
    response.insert("rows".into(), json!(data.sample_len));
    response.insert("target".into(), json!(data.target));
    response.insert("execTimeSeconds".into(), json!(round_to(exec_time, DECIMALS)));
    if let Some(id) = &data.id_column {
        response.insert("idColumn".into(), json!(id));
    }
    Ok(Value::Object(response))
}

fn run_comparison(request: &Value, base: &Param) -> Result<Value> {
    let mut param = base.clone();
    apply_ga_options(request, &mut param)?;
    if let Some(threshold) = get_f64(request, "vtThreshold")? {
        param.variance.threshold = threshold;
    }
    let dataset = DatasetOptions::parse(request)?;
    let param = finalize(param)?;
    let data = dataset.load(&param)?;

    let report = crate::run_comparison(&data, &param)?;
    Ok(comparison_response(&report))
}

/// JSON shape of a comparison report
pub fn comparison_response(report: &crate::experiment::ComparisonReport) -> Value {
    let mut dataset = Map::new();
    dataset.insert("target".into(), json!(report.dataset.target));
    dataset.insert("numFeaturesTotal".into(), json!(report.dataset.num_features_total));
    dataset.insert("rows".into(), json!(report.dataset.rows));
    if let Some(id) = &report.dataset.id_column {
        dataset.insert("idColumn".into(), json!(id));
    }

    let ga_accuracy = round_to(report.ga.best_score, DECIMALS);
    json!({
        "dataset": dataset,
        "ga": {
            "bestFitness": ga_accuracy,
            "history": report.ga.history,
            "selectedFeatures": report.ga.selected_features,
            "numFeaturesSelected": report.ga.selected_features.len(),
            "generations": report.ga.generations(),
            "converged": report.ga.converged,
            "accuracy": ga_accuracy,
            "execTimeSeconds": round_to(report.ga_execution_time, DECIMALS),
        },
        "varianceThreshold": {
            "thresholdUsed": report.variance.threshold,
            "accuracy": round_to(report.variance.accuracy, DECIMALS),
            "selectedFeatures": report.variance.selected_features,
            "removedFeatures": report.variance.removed_features,
            "numFeaturesSelected": report.variance.selected_features.len(),
            "execTimeSeconds": round_to(report.variance_execution_time, DECIMALS),
        },
    })
}

/// A float option given as a number or a numeric string; null means absent
fn get_f64(request: &Value, key: &str) -> Result<Option<f64>> {
    match request.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(key, &n.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(key, s)),
        Some(other) => Err(invalid(key, &other.to_string())),
    }
}

/// A non-negative integer option given as a number or a numeric string.
/// Whole floats such as `2.0` are accepted, fractional ones are rejected.
fn get_usize(request: &Value, key: &str) -> Result<Option<usize>> {
    match request.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                return Ok(Some(u as usize));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as usize)),
                _ => Err(invalid(key, &n.to_string())),
            }
        }
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| invalid(key, s)),
        Some(other) => Err(invalid(key, &other.to_string())),
    }
}

fn invalid(key: &str, value: &str) -> GafsError {
    GafsError::Configuration(format!("Invalid value for '{}': {}", key, value))
}
