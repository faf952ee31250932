use crate::param;
use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The only capability the searches need from a model: learn from a training
/// split, then report accuracy in [0, 1] on another split.
///
/// Implementations are cloned from an unfitted prototype for every candidate,
/// so `Clone` must yield an independent instance.
pub trait Classifier: Clone {
    fn fit(&mut self, X: &[Vec<f64>], y: &[usize]) -> Result<(), String>;
    fn score(&self, X: &[Vec<f64>], y: &[usize]) -> Result<f64, String>;
}

/// Linear classifier with logistic loss trained by stochastic gradient descent.
///
/// Two classes are handled by a single binary model, more classes one-vs-rest.
/// The learning rate follows the "optimal" schedule `1 / (alpha * (t0 + t))`
/// and samples are visited in a seeded random order, so a given seed always
/// yields the same model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SgdClassifier {
    pub max_iter: usize,
    pub tol: f64,
    pub alpha: f64,
    pub n_iter_no_change: usize,
    pub seed: u64,
    classes: Vec<usize>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl SgdClassifier {
    pub fn new(param: &param::Classifier) -> SgdClassifier {
        SgdClassifier {
            max_iter: param.max_iter,
            tol: param.tol,
            alpha: param.alpha,
            n_iter_no_change: param.n_iter_no_change.max(1),
            seed: param.seed,
            classes: Vec::new(),
            coef: Vec::new(),
            intercept: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.coef.is_empty()
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    /// One score per binary sub-problem
    pub fn decision_function(&self, row: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| dot(w, row) + b)
            .collect()
    }

    pub fn predict(&self, X: &[Vec<f64>]) -> Result<Vec<usize>, String> {
        if !self.is_fitted() {
            return Err("This classifier is not fitted yet".to_string());
        }
        let n_features = self.coef[0].len();
        X.iter()
            .map(|row| {
                if row.len() != n_features {
                    return Err(format!(
                        "X has {} features, but the classifier expects {}",
                        row.len(),
                        n_features
                    ));
                }
                let scores = self.decision_function(row);
                let class = if self.classes.len() == 2 {
                    if scores[0] > 0.0 { self.classes[1] } else { self.classes[0] }
                } else {
                    let mut best = 0;
                    for (i, s) in scores.iter().enumerate() {
                        if *s > scores[best] {
                            best = i;
                        }
                    }
                    self.classes[best]
                };
                Ok(class)
            })
            .collect()
    }

    /// Fits one binary problem whose targets are +1 / -1
    fn fit_binary(&self, X: &[Vec<f64>], targets: &[f64]) -> Result<(Vec<f64>, f64), String> {
        let n_samples = X.len();
        let n_features = X[0].len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut w = vec![0.0; n_features];
        let mut b = 0.0;

        // "optimal" schedule: eta = 1 / (alpha * (t0 + t - 1))
        let typw = (1.0 / self.alpha.sqrt()).sqrt();
        let t0 = 1.0 / (typw * self.alpha);
        let mut t = 1.0;

        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut order: Vec<usize> = (0..n_samples).collect();

        for epoch in 0..self.max_iter {
            order.shuffle(&mut rng);
            let mut sum_loss = 0.0;

            for &i in &order {
                let eta = 1.0 / (self.alpha * (t0 + t - 1.0));
                let p = dot(&w, &X[i]) + b;
                let y = targets[i];
                sum_loss += log_loss(p, y);
                let update = -eta * dlog_loss(p, y);

                let decay = 1.0 - eta * self.alpha;
                for (wj, xj) in w.iter_mut().zip(&X[i]) {
                    *wj = *wj * decay + update * xj;
                }
                b += update;
                t += 1.0;
            }

            if !b.is_finite() || w.iter().any(|v| !v.is_finite()) {
                return Err(format!(
                    "Floating-point under-/overflow occurred at epoch #{}",
                    epoch + 1
                ));
            }

            if sum_loss > best_loss - self.tol * n_samples as f64 {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if sum_loss < best_loss {
                best_loss = sum_loss;
            }
            if no_improvement >= self.n_iter_no_change {
                debug!("SGD converged after {} epochs", epoch + 1);
                break;
            }
        }

        Ok((w, b))
    }
}

impl Classifier for SgdClassifier {
    fn fit(&mut self, X: &[Vec<f64>], y: &[usize]) -> Result<(), String> {
        if X.is_empty() {
            return Err("Found array with 0 sample(s) while a minimum of 1 is required".to_string());
        }
        if X.len() != y.len() {
            return Err(format!(
                "Found input variables with inconsistent numbers of samples: [{}, {}]",
                X.len(),
                y.len()
            ));
        }
        let n_features = X[0].len();
        if n_features == 0 {
            return Err("Found array with 0 feature(s) while a minimum of 1 is required".to_string());
        }
        if X.iter().any(|row| row.len() != n_features) {
            return Err("All samples must have the same number of features".to_string());
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(format!(
                "The number of classes has to be greater than one; got {} class",
                classes.len()
            ));
        }

        // a single problem for two classes, one per class otherwise
        let positives: Vec<usize> = if classes.len() == 2 {
            vec![classes[1]]
        } else {
            classes.clone()
        };

        let mut coef = Vec::with_capacity(positives.len());
        let mut intercept = Vec::with_capacity(positives.len());
        for positive in positives {
            let targets: Vec<f64> = y
                .iter()
                .map(|&c| if c == positive { 1.0 } else { -1.0 })
                .collect();
            let (w, b) = self.fit_binary(X, &targets)?;
            coef.push(w);
            intercept.push(b);
        }

        self.classes = classes;
        self.coef = coef;
        self.intercept = intercept;
        Ok(())
    }

    fn score(&self, X: &[Vec<f64>], y: &[usize]) -> Result<f64, String> {
        if X.is_empty() {
            return Err("Cannot score on 0 sample(s)".to_string());
        }
        if X.len() != y.len() {
            return Err(format!(
                "Found input variables with inconsistent numbers of samples: [{}, {}]",
                X.len(),
                y.len()
            ));
        }
        let predictions = self.predict(X)?;
        let correct = predictions.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / y.len() as f64)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// log(1 + exp(-p * y)), computed without overflow
fn log_loss(p: f64, y: f64) -> f64 {
    let z = p * y;
    if z > 18.0 {
        (-z).exp()
    } else if z < -18.0 {
        -z
    } else {
        (-z).exp().ln_1p()
    }
}

/// Derivative of the logistic loss with respect to p
fn dlog_loss(p: f64, y: f64) -> f64 {
    let z = p * y;
    if z > 18.0 {
        -y * (-z).exp()
    } else if z < -18.0 {
        -y
    } else {
        -y / (z.exp() + 1.0)
    }
}
