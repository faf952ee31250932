use crate::chromosome::Chromosome;
use crate::classifier::Classifier;
use crate::data::Data;
use log::debug;

/// Held-out accuracy of a fresh classifier trained on the columns a chromosome selects.
///
/// An empty selection scores 0.0 without touching the classifier, and so does
/// any training or scoring failure: a candidate that cannot be evaluated is
/// simply a bad candidate.
pub fn evaluate<C: Classifier>(chromosome: &Chromosome, data: &Data, classifier: &C) -> f64 {
    let columns = chromosome.features_index();
    if columns.is_empty() {
        return 0.0;
    }

    let (X_train, X_test) = data.select_columns(&columns);
    match fit_and_score(classifier, &X_train, &data.y_train, &X_test, &data.y_test) {
        Ok(accuracy) => accuracy,
        Err(e) => {
            debug!("Evaluation of {} failed, fitness set to 0: {}", chromosome, e);
            0.0
        }
    }
}

/// Fit a clone of `prototype` on the training split and score it on the test split
pub fn fit_and_score<C: Classifier>(
    prototype: &C,
    X_train: &[Vec<f64>],
    y_train: &[usize],
    X_test: &[Vec<f64>],
    y_test: &[usize],
) -> Result<f64, String> {
    let mut model = prototype.clone();
    model.fit(X_train, y_train)?;
    let accuracy = model.score(X_test, y_test)?;
    if !(0.0..=1.0).contains(&accuracy) {
        return Err(format!("Accuracy {} outside [0, 1]", accuracy));
    }
    Ok(accuracy)
}
