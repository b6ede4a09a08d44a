//! Generation-level driver: evaluate, record, normalize, select and breed.

use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::compute::{Fern, FernError, Region};
use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionStats, GenerationStats,
};

use super::fitness::Evaluator;
use super::genome::FernRng;

/// Errors raised while running a population.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid population: {0}")]
    InvalidPopulation(String),
    #[error("Degenerate fitness in generation {generation}: {reason}")]
    DegenerateFitness { generation: usize, reason: String },
    #[error("Evaluator returned {found} scores for {expected} individuals")]
    ScoreCountMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Fern(#[from] FernError),
    #[error(transparent)]
    Config(#[from] EvolutionConfigError),
}

/// Final state of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Last evaluated population.
    pub population: Vec<Fern>,
    /// Raw scores of `population`, index aligned.
    pub fitness: Vec<f64>,
    /// Index of the first best individual in `population`.
    pub elite_index: usize,
    pub history: EvolutionHistory,
    pub stats: EvolutionStats,
}

impl EvolutionResult {
    /// Best individual of the final population.
    pub fn best(&self) -> Option<&Fern> {
        self.population.get(self.elite_index)
    }
}

/// Fitness-proportionate pick: the first index whose share exceeds what is
/// left of `draw`, falling back to the last index.
pub fn select(normalized: &[f64], draw: f64) -> usize {
    let mut remaining = draw;
    for (i, &share) in normalized.iter().enumerate() {
        if share > remaining {
            return i;
        }
        remaining -= share;
    }
    normalized.len().saturating_sub(1)
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<E> {
    config: EvolutionConfig,
    domain: Region,
    rng: FernRng,
    evaluator: E,
    population: Vec<Fern>,
    history: EvolutionHistory,
    generation: usize,
}

impl<E: Evaluator> EvolutionEngine<E> {
    /// Create a new evolution engine.
    pub fn new(config: EvolutionConfig, evaluator: E) -> Result<Self, EvolutionError> {
        config.validate()?;
        let domain = config
            .fern
            .region()
            .map_err(EvolutionConfigError::from)?;
        let seed = config.random_seed.unwrap_or_else(rand::random);
        info!(
            "Evolution engine: {} individuals, {} generations, seed {}",
            config.population.size, config.population.generations, seed
        );

        Ok(Self {
            config,
            domain,
            rng: FernRng::new(seed),
            evaluator,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
        })
    }

    /// Start from the given individuals instead of a generated population.
    /// The population size becomes `population.len()`.
    pub fn with_population(mut self, mut population: Vec<Fern>) -> Result<Self, EvolutionError> {
        let Some(first) = population.first() else {
            return Err(EvolutionError::InvalidPopulation(
                "population is empty".to_string(),
            ));
        };
        let (dimensions, num_bins) = (first.dimensions(), first.num_bins());

        for (i, fern) in population.iter_mut().enumerate() {
            fern.validate()?;
            if fern.dimensions() != dimensions || fern.num_bins() != num_bins {
                return Err(EvolutionError::InvalidPopulation(format!(
                    "individual {} has {} dimensions and {} bins, expected {} and {}",
                    i,
                    fern.dimensions(),
                    fern.num_bins(),
                    dimensions,
                    num_bins
                )));
            }
            fern.set_config(self.config.fern.mutation.clone());
        }

        self.config.population.size = population.len();
        self.population = population;
        Ok(self)
    }

    /// Grow a fresh population from the fern configuration.
    pub fn initialize(&mut self) -> Result<(), EvolutionError> {
        self.population.clear();
        self.history = EvolutionHistory::default();
        self.generation = 0;

        for _ in 0..self.config.population.size {
            let fern = self.rng.random_fern(&self.domain, &self.config.fern)?;
            self.population.push(fern);
        }
        debug!("Initialized {} individuals", self.population.len());
        Ok(())
    }

    pub fn population(&self) -> &[Fern] {
        &self.population
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Index of the generation evaluated most recently.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    fn evaluate(&self) -> Result<Vec<f64>, EvolutionError> {
        let scores = self.evaluator.evaluate(&self.population);
        if scores.len() != self.population.len() {
            return Err(EvolutionError::ScoreCountMismatch {
                expected: self.population.len(),
                found: scores.len(),
            });
        }
        Ok(scores)
    }

    fn record(&mut self, scores: &[f64]) -> Result<GenerationStats, EvolutionError> {
        if let Some((index, score)) = scores
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && **s >= 0.0))
        {
            return Err(EvolutionError::DegenerateFitness {
                generation: self.generation,
                reason: format!("individual {} scored {}", index, score),
            });
        }

        let stats = GenerationStats::from_scores(self.generation, scores);
        self.history.push(&stats);
        info!(
            "Generation {}: max {:.4}, median {:.4}, min {:.4}, mean {:.4}",
            stats.generation,
            stats.max_fitness,
            stats.median_fitness,
            stats.min_fitness,
            stats.mean_fitness
        );
        Ok(stats)
    }

    fn normalize(&self, scores: &[f64]) -> Result<Vec<f64>, EvolutionError> {
        let total: f64 = scores.iter().sum();
        if total == 0.0 || !total.is_finite() {
            return Err(EvolutionError::DegenerateFitness {
                generation: self.generation,
                reason: format!("scores sum to {}", total),
            });
        }
        Ok(scores.iter().map(|s| s / total).collect())
    }

    /// Next population: the elite in slot 0, then offspring of
    /// fitness-proportionate parents.
    fn breed(&mut self, normalized: &[f64], elite_index: usize) -> Result<Vec<Fern>, FernError> {
        let size = self.population.len();
        let mut next = Vec::with_capacity(size);
        next.push(self.population[elite_index].clone());

        while next.len() < size {
            let parent = select(normalized, self.rng.unit());
            let mut child = self.population[parent].clone();

            if self.rng.chance(child.config().crossover_rate) {
                let mate = select(normalized, self.rng.unit());
                self.rng.crossover(&mut child, &self.population[mate])?;
            }
            if self.rng.chance(child.config().mutation_rate) {
                self.rng.mutate(&mut child)?;
            }
            next.push(child);
        }
        Ok(next)
    }

    /// Run every generation, reporting each one's statistics to `callback`.
    ///
    /// Continues from the current population, growing one first if there is
    /// none.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: FnMut(&GenerationStats),
    {
        let start_time = Instant::now();
        if self.population.is_empty() {
            self.initialize()?;
        }
        self.history = EvolutionHistory::default();

        let generations = self.config.population.generations;
        let mut best_fitness = 0.0f64;
        let mut generation = 0;
        loop {
            self.generation = generation;
            let scores = self.evaluate()?;
            let stats = self.record(&scores)?;
            best_fitness = best_fitness.max(stats.max_fitness);
            callback(&stats);

            let normalized = self.normalize(&scores)?;
            if generation + 1 >= generations {
                return Ok(self.finish(scores, &stats, best_fitness, start_time));
            }

            self.population = self.breed(&normalized, stats.elite_index)?;
            generation += 1;
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }

    fn finish(
        &self,
        scores: Vec<f64>,
        last: &GenerationStats,
        best_fitness: f64,
        start_time: Instant,
    ) -> EvolutionResult {
        let elapsed = start_time.elapsed().as_secs_f64();
        let generations = self.history.len();
        let total_evaluations = (generations * self.population.len()) as u64;

        EvolutionResult {
            population: self.population.clone(),
            fitness: scores,
            elite_index: last.elite_index,
            history: self.history.clone(),
            stats: EvolutionStats {
                generations,
                total_evaluations,
                best_fitness,
                final_mean_fitness: last.mean_fitness,
                elapsed_seconds: elapsed,
                evaluations_per_second: total_evaluations as f64 / elapsed.max(f64::EPSILON),
            },
        }
    }
}
