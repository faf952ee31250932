use crate::error::{GafsError, Result};
use crate::param;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary feature mask: gene `i` is set when feature column `i` is used.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chromosome {
    pub genes: Vec<bool>,
}

impl Chromosome {
    pub fn new(genes: Vec<bool>) -> Chromosome {
        Chromosome { genes }
    }

    /// A mask of `feature_count` genes, none of them set
    pub fn empty(feature_count: usize) -> Chromosome {
        Chromosome { genes: vec![false; feature_count] }
    }

    /// Build a chromosome from 0/1 integers (any non-zero value counts as set)
    pub fn from_bits(bits: &[u8]) -> Chromosome {
        Chromosome { genes: bits.iter().map(|&b| b != 0).collect() }
    }

    /// Generates a random chromosome with exactly `floor(feature_count * true_ratio)` genes set,
    /// positions drawn uniformly.
    ///
    /// # Arguments
    ///
    /// * `feature_count` - Number of genes, at least 1
    /// * `true_ratio` - Share of genes to set, in [0, 1]
    /// * `rng` - Random number generator
    ///
    /// # Errors
    ///
    /// Returns a configuration error when either constraint is violated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gafs::chromosome::Chromosome;
    /// # use rand_chacha::ChaCha8Rng;
    /// # use rand::SeedableRng;
    /// let mut rng = ChaCha8Rng::seed_from_u64(42);
    /// let chromosome = Chromosome::random(10, 0.3, &mut rng).unwrap();
    /// assert_eq!(chromosome.k(), 3);
    /// ```
    pub fn random(feature_count: usize, true_ratio: f64, rng: &mut ChaCha8Rng) -> Result<Chromosome> {
        if feature_count == 0 {
            return Err(GafsError::Configuration(
                "A chromosome needs at least one feature".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&true_ratio) {
            return Err(GafsError::Configuration(format!(
                "Invalid true ratio={}. Must be in range [0, 1].",
                true_ratio
            )));
        }

        let n_true = (feature_count as f64 * true_ratio).floor() as usize;
        let mut genes = vec![true; n_true];
        genes.resize(feature_count, false);
        genes.shuffle(rng);

        Ok(Chromosome { genes })
    }

    /// Random chromosome at the sparse single-chromosome on-ratio of `ga`
    /// (the initial population is seeded denser, see `population_true_ratio`)
    pub fn random_sparse(feature_count: usize, ga: &param::GA, rng: &mut ChaCha8Rng) -> Result<Chromosome> {
        Chromosome::random(feature_count, ga.chromosome_true_ratio, rng)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Number of selected features
    pub fn k(&self) -> usize {
        self.genes.iter().filter(|&&g| g).count()
    }

    /// Indices of the selected features, ascending
    pub fn features_index(&self) -> Vec<usize> {
        self.genes
            .iter()
            .enumerate()
            .filter(|(_, &g)| g)
            .map(|(i, _)| i)
            .collect()
    }

    /// Names of the selected features, in column order
    pub fn selected_features(&self, feature_names: &[String]) -> Vec<String> {
        self.features_index()
            .into_iter()
            .filter_map(|i| feature_names.get(i).cloned())
            .collect()
    }

    pub fn to_bits(&self) -> Vec<u8> {
        self.genes.iter().map(|&g| g as u8).collect()
    }

    /// Bitwise complement
    pub fn complement(&self) -> Chromosome {
        Chromosome { genes: self.genes.iter().map(|g| !g).collect() }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = self.genes.iter().map(|&g| if g { '1' } else { '0' }).collect();
        write!(f, "{}", bits)
    }
}

impl fmt::Debug for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chromosome[{}] k={}", self, self.k())
    }
}
