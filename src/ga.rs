use crate::chromosome::Chromosome;
use crate::cinfo;
use crate::classifier::Classifier;
use crate::data::Data;
use crate::error::{GafsError, Result};
use crate::param::{self, Param};
use crate::population::Population;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Where a search stands. `Evaluating` loops once per generation until the
/// run either converges or exhausts its generation budget.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SearchState {
    Init,
    Evaluating,
    Converged,
    Exhausted,
}

/// Outcome of one genetic search
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub best_score: f64,
    pub best_mask: Chromosome,
    /// Best fitness seen so far, one entry per evaluated generation
    pub history: Vec<f64>,
    pub converged: bool,
    pub selected_features: Vec<String>,
}

impl SearchResult {
    pub fn generations(&self) -> usize {
        self.history.len()
    }

    pub fn state(&self) -> SearchState {
        if self.converged {
            SearchState::Converged
        } else {
            SearchState::Exhausted
        }
    }
}

//-----------------------------------------------------------------------------
// Genetic Algorithm core functions
//-----------------------------------------------------------------------------

/// Main function to run the genetic algorithm
///
/// # Arguments
///
/// * `data` - The prepared dataset, read only.
/// * `classifier` - Unfitted classifier cloned for every evaluation.
/// * `param` - Parameters; only the `ga` section is used here.
/// * `rng` - Random number generator driving every random choice of the run.
///
/// # Returns
///
/// The best chromosome found with its fitness history.
///
/// # Errors
///
/// A configuration error, before any evaluation, when the `ga` section is
/// invalid (notably a population smaller than 2) or the dataset has no feature.
pub fn ga<C: Classifier>(
    data: &Data,
    classifier: &C,
    param: &Param,
    rng: &mut ChaCha8Rng,
) -> Result<SearchResult> {
    let time = Instant::now();

    param::validate_ga(&param.ga).map_err(GafsError::Configuration)?;
    if data.feature_len == 0 {
        return Err(GafsError::Configuration(
            "Cannot select features from a dataset without features".to_string(),
        ));
    }

    let base_pop = generate_pop(data, param, rng)?;
    info!(
        "Population size: {}, features: {}, max generations: {}",
        base_pop.len(),
        data.feature_len,
        param.ga.max_generations
    );

    let result = iterative_evolution(base_pop, data, classifier, param, rng);

    info!(
        "Genetic algorithm computed {:?} generations in {:.2?} ({:?})",
        result.generations(),
        time.elapsed(),
        result.state()
    );

    Ok(result)
}

/// Generate the initial population, denser than a lone random chromosome
pub fn generate_pop(data: &Data, param: &Param, rng: &mut ChaCha8Rng) -> Result<Population> {
    debug!("generating...");
    Population::generate(
        param.ga.population_size,
        data.feature_len,
        param.ga.population_true_ratio,
        rng,
    )
}

/// Run the generational loop: evaluate, keep the champion, check convergence, breed.
///
/// The champion only changes on a strictly better fitness, so ties keep the
/// earlier one and `history` never decreases. Convergence is checked from the
/// second generation on, when a threshold is set and the previous best is
/// non-zero; the converging generation is still recorded.
pub fn iterative_evolution<C: Classifier>(
    base_pop: Population,
    data: &Data,
    classifier: &C,
    param: &Param,
    rng: &mut ChaCha8Rng,
) -> SearchResult {
    let mut pop = base_pop;
    let mut best_fitness: f64 = 0.0;
    let mut best_chromosome = Chromosome::empty(data.feature_len);
    let mut history: Vec<f64> = Vec::with_capacity(param.ga.max_generations);
    let mut prev_best: f64 = 0.0;
    let mut state = SearchState::Init;

    for generation in 0..param.ga.max_generations {
        state = SearchState::Evaluating;
        let fits = pop.fit(data, classifier);
        debug!("Generation {} fits: {:?}", generation + 1, fits);

        if let Some((best_idx, generation_best)) = Population::best(&fits) {
            if generation_best > best_fitness {
                best_fitness = generation_best;
                best_chromosome = pop.chromosomes[best_idx].clone();
            }
        }
        history.push(best_fitness);

        cinfo!(
            param.general.display_colorful,
            "{}",
            display_generation(generation + 1, best_fitness, &fits, &best_chromosome)
        );

        if generation > 0 && prev_best > 0.0 {
            if let Some(threshold) = param.ga.convergence_threshold {
                let improvement = (best_fitness - prev_best).abs();
                if improvement < threshold {
                    info!(
                        "Converged at generation {}: improvement {:.6} < {}",
                        generation + 1,
                        improvement,
                        threshold
                    );
                    state = SearchState::Converged;
                    break;
                }
            }
        }
        prev_best = best_fitness;

        if generation + 1 < param.ga.max_generations {
            pop = evolve(&pop, param, rng);
        }
    }

    if state != SearchState::Converged {
        info!("Reach max generation");
        state = SearchState::Exhausted;
    }

    SearchResult {
        best_score: best_fitness,
        selected_features: best_chromosome.selected_features(&data.features),
        best_mask: best_chromosome,
        history,
        converged: state == SearchState::Converged,
    }
}

/// Breed the next generation: two distinct parents drawn uniformly without
/// replacement, crossover, then independent mutation of each child, until the
/// population size is met exactly.
pub fn evolve(pop: &Population, param: &Param, rng: &mut ChaCha8Rng) -> Population {
    let pop_size = param.ga.population_size;
    let mut children = Population::new();

    while children.len() < pop_size {
        let parents: Vec<&Chromosome> = pop.chromosomes.choose_multiple(rng, 2).collect();
        let (c1, c2) = crossover(parents[0], parents[1], param.ga.crossover_rate, rng);

        children.add(mutate(&c1, param.ga.mutation_rate, rng));
        if children.len() < pop_size {
            children.add(mutate(&c2, param.ga.mutation_rate, rng));
        }
    }

    children
}

/// Single-point crossover applied with probability `rate`
///
/// # Arguments
///
/// * `p1`, `p2` - Parents of equal length.
/// * `rate` - Crossover probability in [0, 1].
/// * `rng` - Random number generator.
///
/// # Returns
///
/// `(p1[..cut] + p2[cut..], p2[..cut] + p1[cut..])` for a cut drawn in
/// `1..len`, or copies of the parents when no crossover happens. A rate of 0
/// never recombines, a rate of 1 always does (chromosomes of a single gene
/// have no inner cut point and are copied).
pub fn crossover(
    p1: &Chromosome,
    p2: &Chromosome,
    rate: f64,
    rng: &mut ChaCha8Rng,
) -> (Chromosome, Chromosome) {
    let len = p1.len().min(p2.len());
    if len < 2 || !rng.gen_bool(rate) {
        return (p1.clone(), p2.clone());
    }

    let cut = rng.gen_range(1..len);
    let mut g1 = p1.genes[..cut].to_vec();
    g1.extend_from_slice(&p2.genes[cut..]);
    let mut g2 = p2.genes[..cut].to_vec();
    g2.extend_from_slice(&p1.genes[cut..]);

    (Chromosome::new(g1), Chromosome::new(g2))
}

/// Flip every gene independently with probability `rate`; the input is left untouched
pub fn mutate(chromosome: &Chromosome, rate: f64, rng: &mut ChaCha8Rng) -> Chromosome {
    let genes = chromosome
        .genes
        .iter()
        .map(|&g| if rng.gen_bool(rate) { !g } else { g })
        .collect();
    Chromosome::new(genes)
}

fn display_generation(generation: usize, best: f64, fits: &[f64], champion: &Chromosome) -> String {
    let generation_best = Population::best(fits).map(|(_, f)| f).unwrap_or(0.0);
    format!(
        "#{:<4} best \x1b[1;92m{:.4}\x1b[0m | generation best {:.4} | mean {:.4} | k={}",
        generation,
        best,
        generation_best,
        Population::mean_fit(fits),
        champion.k()
    )
}
