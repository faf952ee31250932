use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

// Field definitions and associated default values

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Param {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub ga: GA,
    #[serde(default)]
    pub variance: Variance,
    #[serde(default)]
    pub classifier: Classifier,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct General {
    #[serde(default = "seed_default")]
    pub seed: u64,
    #[serde(default = "log_base_default")]
    pub log_base: String,
    #[serde(default = "log_suffix_default")]
    pub log_suffix: String,
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "true_default")]
    pub display_colorful: bool,
    #[serde(default = "empty_string")]
    pub save_exp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Data {
    #[serde(default = "test_ratio_default")]
    pub test_ratio: f64,
    #[serde(default = "split_seed_default")]
    pub split_seed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GA {
    #[serde(default = "pop_size_default")]
    pub population_size: usize,
    #[serde(default = "crossover_rate_default")]
    pub crossover_rate: f64,
    #[serde(default = "mutation_rate_default")]
    pub mutation_rate: f64,
    #[serde(default = "max_generations_default")]
    pub max_generations: usize,
    #[serde(default)]
    pub convergence_threshold: Option<f64>,
    /// On-ratio of a single randomly generated chromosome
    #[serde(default = "chromosome_true_ratio_default")]
    pub chromosome_true_ratio: f64,
    /// On-ratio used when seeding the initial population (denser on purpose)
    #[serde(default = "population_true_ratio_default")]
    pub population_true_ratio: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Variance {
    #[serde(default = "zero_default")]
    pub threshold: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Classifier {
    #[serde(default = "max_iter_default")]
    pub max_iter: usize,
    #[serde(default = "tol_default")]
    pub tol: f64,
    #[serde(default = "alpha_default")]
    pub alpha: f64,
    #[serde(default = "n_iter_no_change_default")]
    pub n_iter_no_change: usize,
    #[serde(default = "classifier_seed_default")]
    pub seed: u64,
}

// Default section definitions

impl Default for General {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Data {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for GA {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Variance {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Default for Param {
    fn default() -> Self {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn get(param_file: String) -> Result<Param, Box<dyn Error>> {
    let param_file_reader = File::open(param_file)?;
    let param_reader = BufReader::new(param_file_reader);

    let mut config: Param = serde_yaml::from_reader(param_reader)?;

    validate(&mut config)?;

    Ok(config)
}

pub fn validate(param: &mut Param) -> Result<(), String> {
    if !param.general.log_base.is_empty() {
        param.general.display_colorful = false;
    }

    validate_ga(&param.ga)?;
    validate_variance(&param.variance)?;
    validate_data(&param.data)?;
    validate_classifier(&param.classifier)?;

    if let Some(threshold) = param.ga.convergence_threshold {
        if threshold == 0.0 {
            warn!("convergence_threshold=0 can never be met: the GA will always run max_generations.");
        }
    }

    Ok(())
}

/// Checks the GA section. Parent sampling draws two distinct parents, hence
/// the population floor of 2.
pub fn validate_ga(ga: &GA) -> Result<(), String> {
    if ga.population_size < 2 {
        return Err(format!(
            "Invalid population size={}. Parent sampling needs at least 2 individuals.",
            ga.population_size
        ));
    }

    if ga.max_generations == 0 {
        return Err("Invalid max generations=0. Must be >= 1.".to_string());
    }

    check_unit_interval("crossover rate", ga.crossover_rate)?;
    check_unit_interval("mutation rate", ga.mutation_rate)?;
    check_unit_interval("chromosome true ratio", ga.chromosome_true_ratio)?;
    check_unit_interval("population true ratio", ga.population_true_ratio)?;

    if let Some(threshold) = ga.convergence_threshold {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(format!(
                "Invalid convergence threshold={}. Must be a finite value >= 0.",
                threshold
            ));
        }
    }

    Ok(())
}

pub fn validate_variance(variance: &Variance) -> Result<(), String> {
    if variance.threshold.is_nan() {
        return Err(format!(
            "Invalid variance threshold={}. Must be a number.",
            variance.threshold
        ));
    }
    Ok(())
}

fn validate_data(data: &Data) -> Result<(), String> {
    if !(data.test_ratio > 0.0 && data.test_ratio < 1.0) {
        return Err(format!(
            "Invalid test_ratio={:.3}. Must be in range (0, 1).",
            data.test_ratio
        ));
    }
    Ok(())
}

fn validate_classifier(classifier: &Classifier) -> Result<(), String> {
    if classifier.max_iter == 0 {
        return Err("Invalid classifier max_iter=0. Must be >= 1.".to_string());
    }
    if !(classifier.alpha > 0.0) || !classifier.alpha.is_finite() {
        return Err(format!(
            "Invalid classifier alpha={}. Must be > 0.",
            classifier.alpha
        ));
    }
    if !(classifier.tol >= 0.0) {
        return Err(format!(
            "Invalid classifier tol={}. Must be >= 0.",
            classifier.tol
        ));
    }
    Ok(())
}

fn check_unit_interval(name: &str, value: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Invalid {}={}. Must be in range [0, 1].", name, value));
    }
    Ok(())
}

// Default value definitions

fn seed_default() -> u64 {
    4815162342
}
fn empty_string() -> String {
    "".to_string()
}
fn log_base_default() -> String {
    "".to_string()
}
fn log_suffix_default() -> String {
    "log".to_string()
}
fn log_level_default() -> String {
    "info".to_string()
}
fn true_default() -> bool {
    true
}
fn zero_default() -> f64 {
    0.0
}
fn test_ratio_default() -> f64 {
    0.3
}
fn split_seed_default() -> u64 {
    42
}
fn pop_size_default() -> usize {
    30
}
fn crossover_rate_default() -> f64 {
    0.7
}
fn mutation_rate_default() -> f64 {
    0.1
}
fn max_generations_default() -> usize {
    20
}
fn chromosome_true_ratio_default() -> f64 {
    0.3
}
fn population_true_ratio_default() -> f64 {
    0.7
}
fn max_iter_default() -> usize {
    200
}
fn tol_default() -> f64 {
    1e-3
}
fn alpha_default() -> f64 {
    1e-4
}
fn n_iter_no_change_default() -> usize {
    5
}
fn classifier_seed_default() -> u64 {
    42
}
