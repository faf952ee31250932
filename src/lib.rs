#![allow(non_snake_case)]

pub mod utils;
pub mod error;
pub mod param;
pub mod data;
pub mod chromosome;
pub mod classifier;
pub mod fitness;
pub mod population;
pub mod ga;
pub mod variance;
pub mod experiment;
pub mod api;

use classifier::SgdClassifier;
use data::Data;
use error::Result;
use experiment::ComparisonReport;
use ga::SearchResult;
use param::Param;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use variance::VarianceFilterResult;

use log::debug;

/// Run the genetic search on a prepared dataset with the default classifier
pub fn run_ga(data: &Data, param: &Param) -> Result<SearchResult> {
    cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", data);
    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);
    let classifier = SgdClassifier::new(&param.classifier);
    ga::ga(data, &classifier, param, &mut rng)
}

/// Run the variance filter with the threshold of `param.variance`
pub fn run_variance_threshold(data: &Data, param: &Param) -> Result<VarianceFilterResult> {
    cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", data);
    let classifier = SgdClassifier::new(&param.classifier);
    variance::variance_threshold(data, param.variance.threshold, &classifier)
}

pub fn run_comparison(data: &Data, param: &Param) -> Result<ComparisonReport> {
    cinfo!(param.general.display_colorful, "\x1b[2;97m{:?}\x1b[0m", data);
    let mut rng = ChaCha8Rng::seed_from_u64(param.general.seed);
    let classifier = SgdClassifier::new(&param.classifier);
    let report = experiment::compare(data, &classifier, param, &mut rng)?;

    if !param.general.save_exp.is_empty() {
        debug!("Saving comparison report to {}", param.general.save_exp);
        report.save_auto(&param.general.save_exp)?;
    }

    Ok(report)
}

/// Read a CSV file and prepare it as the request surface does
pub fn load_csv(path: &str, target_column: usize, id_column: Option<usize>, param: &Param) -> Result<Data> {
    let content = std::fs::read_to_string(path)?;
    Data::from_csv_str(&content, target_column, id_column, param)
}
