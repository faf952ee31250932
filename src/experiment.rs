use crate::classifier::Classifier;
use crate::data::Data;
use crate::error::{GafsError, Result};
use crate::ga::{ga, SearchResult};
use crate::param::{self, Param};
use crate::variance::{variance_threshold, VarianceFilterResult};
use crate::cinfo;
use chrono::Local;
use log::{info, warn};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// What both strategies were run on
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DatasetSummary {
    pub target: String,
    pub num_features_total: usize,
    /// Rows left once fully empty rows are dropped
    pub rows: usize,
    pub id_column: Option<String>,
}

impl DatasetSummary {
    pub fn of(data: &Data) -> DatasetSummary {
        DatasetSummary {
            target: data.target.clone(),
            num_features_total: data.feature_len,
            rows: data.sample_len,
            id_column: data.id_column.clone(),
        }
    }
}

/// Side by side results of the genetic search and the variance filter on one split
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ComparisonReport {
    /// Timestamp of the comparison
    pub timestamp: String,
    /// Crate version and git hash used
    pub version: String,
    /// Parameters used, request overrides included
    pub parameters: Param,

    pub dataset: DatasetSummary,

    pub ga: SearchResult,
    /// GA wall clock time in seconds
    pub ga_execution_time: f64,

    pub variance: VarianceFilterResult,
    /// Variance filter wall clock time in seconds
    pub variance_execution_time: f64,
}

/// `"{version}#{short git sha}"`, the sha being exported by the build script
pub fn version() -> String {
    format!(
        "{}#{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("GAFS_GIT_SHA").unwrap_or("unknown")
    )
}

/// Runs the genetic search then the variance filter on the same dataset, timing each.
///
/// Every parameter is checked before either strategy starts, so a bad
/// variance threshold does not cost a full GA run. Once started, a strategy
/// that degrades (accuracy 0.0) does not prevent the other from running.
pub fn compare<C: Classifier>(
    data: &Data,
    classifier: &C,
    param: &Param,
    rng: &mut ChaCha8Rng,
) -> Result<ComparisonReport> {
    param::validate_ga(&param.ga).map_err(GafsError::Configuration)?;
    param::validate_variance(&param.variance).map_err(GafsError::Configuration)?;
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    cinfo!(param.general.display_colorful, "\x1b[1;93mRunning genetic algorithm...\x1b[0m");
    let start = Instant::now();
    let ga_result = ga(data, classifier, param, rng)?;
    let ga_execution_time = start.elapsed().as_secs_f64();

    cinfo!(
        param.general.display_colorful,
        "\x1b[1;93mRunning variance threshold (threshold={})...\x1b[0m",
        param.variance.threshold
    );
    let start = Instant::now();
    let variance_result = variance_threshold(data, param.variance.threshold, classifier)?;
    let variance_execution_time = start.elapsed().as_secs_f64();

    let report = ComparisonReport {
        timestamp,
        version: version(),
        parameters: param.clone(),
        dataset: DatasetSummary::of(data),
        ga: ga_result,
        ga_execution_time,
        variance: variance_result,
        variance_execution_time,
    };
    cinfo!(param.general.display_colorful, "{}", report.display_results());
    info!("{}", report.summary());

    Ok(report)
}

impl ComparisonReport {
    pub fn display_results(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("gafs version: v{}\n", self.version));
        text.push_str(&format!("Timestamp: {}\n", self.timestamp));
        text.push_str(&format!(
            "Dataset: target '{}', {} features, {} rows\n",
            self.dataset.target, self.dataset.num_features_total, self.dataset.rows
        ));
        text.push_str(&format!(
            "\x1b[1;96mGA\x1b[0m                 accuracy {:.4} | {} features | {} generations{} | {:.4}s\n",
            self.ga.best_score,
            self.ga.selected_features.len(),
            self.ga.generations(),
            if self.ga.converged { " (converged)" } else { "" },
            self.ga_execution_time
        ));
        text.push_str(&format!(
            "\x1b[1;96mVariance threshold\x1b[0m accuracy {:.4} | {} features | threshold {} | {:.4}s",
            self.variance.accuracy,
            self.variance.selected_features.len(),
            self.variance.threshold,
            self.variance_execution_time
        ));
        text
    }

    /// Saves the report in a format chosen by file extension: `json`, or
    /// `bin`/`bincode`. Any other extension is saved as JSON next to it.
    pub fn save_auto<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path).as_str() {
            "json" => self.save_json(path),
            "bin" | "bincode" => self.save_bincode(path),
            _ => {
                warn!("Unknown format. Saving comparison report in json.");
                self.save_json(path.with_extension("json"))
            }
        }
    }

    fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = bincode::serialize(self)?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Loads a report saved by `save_auto`; unknown extensions try bincode then JSON.
    pub fn load_auto<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match extension(path).as_str() {
            "json" => Self::load_json(path),
            "bin" | "bincode" => Self::load_bincode(path),
            _ => Self::load_bincode(path).or_else(|_| Self::load_json(path)),
        }
    }

    fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// One-line summary for log files
    pub fn summary(&self) -> String {
        format!(
            "GA {:.4} ({} features) vs variance threshold {:.4} ({} features)",
            self.ga.best_score,
            self.ga.selected_features.len(),
            self.variance.accuracy,
            self.variance.selected_features.len()
        )
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
