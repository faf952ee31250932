use crate::chromosome::Chromosome;
use crate::classifier::Classifier;
use crate::data::Data;
use crate::error::{GafsError, Result};
use crate::fitness;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
pub struct Population {
    pub chromosomes: Vec<Chromosome>,
}

impl Population {
    pub fn new() -> Population {
        Population { chromosomes: Vec::new() }
    }

    /// Generates `pop_size` independent random chromosomes (no deduplication)
    ///
    /// # Arguments
    ///
    /// * `pop_size` - Number of chromosomes, at least 1
    /// * `feature_count` - Genes per chromosome
    /// * `true_ratio` - Share of set genes in every chromosome
    /// * `rng` - Random number generator
    pub fn generate(
        pop_size: usize,
        feature_count: usize,
        true_ratio: f64,
        rng: &mut ChaCha8Rng,
    ) -> Result<Population> {
        if pop_size == 0 {
            return Err(GafsError::Configuration(
                "A population needs at least one chromosome".to_string(),
            ));
        }
        let chromosomes = (0..pop_size)
            .map(|_| Chromosome::random(feature_count, true_ratio, rng))
            .collect::<Result<Vec<Chromosome>>>()?;
        Ok(Population { chromosomes })
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn add(&mut self, chromosome: Chromosome) {
        self.chromosomes.push(chromosome);
    }

    /// Evaluates every chromosome; `fits[i]` belongs to `chromosomes[i]`.
    /// Nothing is cached: a chromosome present twice is trained twice.
    pub fn fit<C: Classifier>(&self, data: &Data, classifier: &C) -> Vec<f64> {
        self.chromosomes
            .iter()
            .map(|c| fitness::evaluate(c, data, classifier))
            .collect()
    }

    /// Index and value of the first chromosome reaching the highest fitness
    pub fn best(fits: &[f64]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &fit) in fits.iter().enumerate() {
            match best {
                Some((_, best_fit)) if fit <= best_fit => {}
                _ => best = Some((i, fit)),
            }
        }
        best
    }

    /// Mean fitness of a generation, used for progress display
    pub fn mean_fit(fits: &[f64]) -> f64 {
        if fits.is_empty() {
            0.0
        } else {
            fits.iter().sum::<f64>() / fits.len() as f64
        }
    }
}

impl Default for Population {
    fn default() -> Self {
        Population::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SgdClassifier;
    use crate::param;
    use rand::SeedableRng;

    impl Population {
        pub fn test_with_these_masks(masks: &[&[u8]]) -> Population {
            Population {
                chromosomes: masks.iter().map(|m| Chromosome::from_bits(m)).collect(),
            }
        }
    }

    #[test]
    fn test_generate_population_size_and_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pop = Population::generate(20, 10, 0.5, &mut rng).unwrap();
        assert_eq!(pop.len(), 20);
        for chromosome in &pop.chromosomes {
            assert_eq!(chromosome.len(), 10);
            assert_eq!(chromosome.k(), 5);
        }
    }

    #[test]
    fn test_generate_rejects_empty_population() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = Population::generate(0, 10, 0.5, &mut rng).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_generate_allows_single_chromosome() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(Population::generate(1, 3, 0.7, &mut rng).unwrap().len(), 1);
    }

    #[test]
    fn test_best_keeps_first_on_ties() {
        assert_eq!(Population::best(&[0.5, 0.8, 0.8, 0.1]), Some((1, 0.8)));
        assert_eq!(Population::best(&[0.0, 0.0]), Some((0, 0.0)));
        assert_eq!(Population::best(&[]), None);
    }

    #[test]
    fn test_fit_returns_one_value_per_chromosome() {
        let data = Data::test();
        let classifier = SgdClassifier::new(&param::Classifier::default());
        let pop = Population::test_with_these_masks(&[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        let fits = pop.fit(&data, &classifier);
        assert_eq!(fits.len(), 3);
        assert_eq!(fits[0], 0.0);
        assert_eq!(fits[2], 0.0);
        assert!(fits.iter().all(|f| (0.0..=1.0).contains(f)));
    }

    #[test]
    fn test_mean_fit() {
        assert_eq!(Population::mean_fit(&[0.5, 1.0]), 0.75);
        assert_eq!(Population::mean_fit(&[]), 0.0);
    }
}
