use crate::classifier::Classifier;
use crate::data::Data;
use crate::error::{GafsError, Result};
use crate::fitness;
use crate::utils::column_variances;
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VarianceFilterResult {
    pub threshold: f64,
    pub accuracy: f64,
    pub selected_features: Vec<String>,
    pub removed_features: Vec<String>,
}

impl VarianceFilterResult {
    /// No feature kept and nothing evaluated
    fn nothing_kept(threshold: f64, data: &Data) -> VarianceFilterResult {
        VarianceFilterResult {
            threshold,
            accuracy: 0.0,
            selected_features: Vec::new(),
            removed_features: data.features.clone(),
        }
    }
}

/// Keeps the training columns whose population variance reaches `threshold`
/// (inclusive) and reports the held-out accuracy of a classifier trained on them.
///
/// Features are never modified, only kept or dropped. When no column survives
/// or the classifier cannot be trained, the accuracy is 0.0 and every feature
/// is reported as removed.
pub fn variance_threshold<C: Classifier>(
    data: &Data,
    threshold: f64,
    classifier: &C,
) -> Result<VarianceFilterResult> {
    if threshold.is_nan() {
        return Err(GafsError::Configuration(format!(
            "Invalid variance threshold {}. Must be a number.",
            threshold
        )));
    }

    let variances = column_variances(&data.X_train, data.feature_len);
    let kept: Vec<usize> = variances
        .iter()
        .enumerate()
        .filter(|(_, &v)| v >= threshold)
        .map(|(j, _)| j)
        .collect();
    debug!("Feature variances: {:?}", variances);

    if kept.is_empty() {
        info!("No feature reaches a variance of {}", threshold);
        return Ok(VarianceFilterResult::nothing_kept(threshold, data));
    }

    let (X_train, X_test) = data.select_columns(&kept);
    let accuracy = match fitness::fit_and_score(classifier, &X_train, &data.y_train, &X_test, &data.y_test)
    {
        Ok(accuracy) => accuracy,
        Err(e) => {
            debug!("Variance threshold evaluation failed, accuracy set to 0: {}", e);
            return Ok(VarianceFilterResult::nothing_kept(threshold, data));
        }
    };

    let removed: Vec<usize> = (0..data.feature_len).filter(|j| !kept.contains(j)).collect();
    info!(
        "Variance threshold {} kept {}/{} features, accuracy {:.4}",
        threshold,
        kept.len(),
        data.feature_len,
        accuracy
    );

    Ok(VarianceFilterResult {
        threshold,
        accuracy,
        selected_features: data.feature_names(&kept),
        removed_features: data.feature_names(&removed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SgdClassifier;
    use crate::param;

    #[derive(Clone)]
    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn fit(&mut self, _X: &[Vec<f64>], _y: &[usize]) -> std::result::Result<(), String> {
            Err("cannot fit".to_string())
        }
        fn score(&self, _X: &[Vec<f64>], _y: &[usize]) -> std::result::Result<f64, String> {
            unreachable!()
        }
    }

    fn classifier() -> SgdClassifier {
        SgdClassifier::new(&param::Classifier::default())
    }

    #[test]
    fn test_zero_threshold_keeps_every_feature_including_constant_ones() {
        let data = Data::test();
        let result = variance_threshold(&data, 0.0, &classifier()).unwrap();
        assert_eq!(result.selected_features, vec!["f0", "f1", "constant"]);
        assert!(result.removed_features.is_empty());
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert_eq!(result.threshold, 0.0);
    }

    #[test]
    fn test_small_threshold_drops_constant_feature() {
        let data = Data::test();
        let result = variance_threshold(&data, 1e-6, &classifier()).unwrap();
        assert_eq!(result.selected_features, vec!["f0", "f1"]);
        assert_eq!(result.removed_features, vec!["constant"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut data = Data::test();
        // f0 variance on these rows is exactly 1.0, f1 stays just below
        data.X_train = vec![
            vec![0.0, 1.0, 5.0],
            vec![2.0, 1.2, 5.0],
            vec![0.0, 0.9, 5.0],
            vec![2.0, 3.0, 5.0],
            vec![0.0, 3.1, 5.0],
            vec![2.0, 2.9, 5.0],
        ];
        let result = variance_threshold(&data, 1.0, &classifier()).unwrap();
        assert_eq!(result.selected_features, vec!["f0"]);
        assert_eq!(result.removed_features, vec!["f1", "constant"]);
    }

    #[test]
    fn test_threshold_above_every_variance_removes_everything() {
        let data = Data::test();
        let result = variance_threshold(&data, 1e9, &classifier()).unwrap();
        assert_eq!(result.accuracy, 0.0);
        assert!(result.selected_features.is_empty());
        assert_eq!(result.removed_features, data.features);
    }

    #[test]
    fn test_classifier_failure_reports_all_features_removed() {
        let data = Data::test();
        let result = variance_threshold(&data, 0.0, &FailingClassifier).unwrap();
        assert_eq!(result.accuracy, 0.0);
        assert!(result.selected_features.is_empty(), "a failed evaluation selects nothing");
        assert_eq!(result.removed_features.len(), data.feature_len);
    }

    #[test]
    fn test_nan_threshold_is_a_configuration_error() {
        let data = Data::test();
        assert!(variance_threshold(&data, f64::NAN, &classifier()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_infinite_thresholds_go_through_the_comparison() {
        let data = Data::test();
        let none = variance_threshold(&data, f64::INFINITY, &classifier()).unwrap();
        assert_eq!(none.accuracy, 0.0);
        assert!(none.selected_features.is_empty());
        assert_eq!(none.removed_features, data.features);

        let all = variance_threshold(&data, f64::NEG_INFINITY, &classifier()).unwrap();
        assert_eq!(all.selected_features, data.features);
        assert!(all.removed_features.is_empty());
    }

    #[test]
    fn test_variance_filter_is_deterministic() {
        let data = Data::test();
        let r1 = variance_threshold(&data, 0.01, &classifier()).unwrap();
        let r2 = variance_threshold(&data, 0.01, &classifier()).unwrap();
        assert_eq!(r1, r2);
    }
}
