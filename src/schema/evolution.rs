//! Evolution configuration and reporting types.
//!
//! Configuration is plain serde data with `validate()` methods; statistics and
//! history are recorded by the engine and serialized with the run result.

use serde::{Deserialize, Serialize};

use super::{ConfigError, FernConfig};

/// Top-level configuration for a population run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// How individuals are built and mutated.
    #[serde(default)]
    pub fern: FernConfig,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Evaluate individuals on the rayon thread pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            fern: FernConfig::default(),
            population: PopulationConfig::default(),
            parallel: default_parallel(),
            random_seed: None,
        }
    }
}

fn default_parallel() -> bool {
    true
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of evaluation rounds.
    #[serde(default = "default_generations")]
    pub generations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            generations: default_generations(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_generations() -> usize {
    100
}

/// One labelled cluster of synthetic samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster centre, one coordinate per dimension.
    pub center: Vec<f64>,
    /// Label every sample of this cluster carries.
    pub label: u32,
}

/// Synthetic labelled data drawn from Gaussian clusters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    pub clusters: Vec<ClusterConfig>,
    /// Standard deviation along every axis.
    #[serde(default = "default_spread")]
    pub spread: f64,
    #[serde(default = "default_samples_per_cluster")]
    pub samples_per_cluster: usize,
    /// Seed for the sample generator, independent of the evolution seed.
    #[serde(default)]
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            clusters: vec![
                ClusterConfig {
                    center: vec![0.25, 0.25],
                    label: 0,
                },
                ClusterConfig {
                    center: vec![0.75, 0.7],
                    label: 1,
                },
            ],
            spread: default_spread(),
            samples_per_cluster: default_samples_per_cluster(),
            seed: 0,
        }
    }
}

fn default_spread() -> f64 {
    0.1
}
fn default_samples_per_cluster() -> usize {
    100
}

/// Everything the CLI needs for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub samples: SampleConfig,
}

/// Statistics of one evaluated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub max_fitness: f64,
    pub median_fitness: f64,
    pub min_fitness: f64,
    pub mean_fitness: f64,
    /// Index of the first individual with the maximum score.
    pub elite_index: usize,
}

impl GenerationStats {
    /// Summarize raw scores. The median of an even count is the mean of the
    /// middle pair.
    pub fn from_scores(generation: usize, scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self {
                generation,
                max_fitness: 0.0,
                median_fitness: 0.0,
                min_fitness: 0.0,
                mean_fitness: 0.0,
                elite_index: 0,
            };
        }

        let mut elite_index = 0;
        for (i, &score) in scores.iter().enumerate() {
            if score > scores[elite_index] {
                elite_index = i;
            }
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median_fitness = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Self {
            generation,
            max_fitness: scores[elite_index],
            median_fitness,
            min_fitness: sorted[0],
            mean_fitness: scores.iter().sum::<f64>() / scores.len() as f64,
            elite_index,
        }
    }
}

/// Per-generation fitness history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionHistory {
    pub max_fitness: Vec<f64>,
    pub median_fitness: Vec<f64>,
    pub min_fitness: Vec<f64>,
    pub mean_fitness: Vec<f64>,
}

impl EvolutionHistory {
    pub fn push(&mut self, stats: &GenerationStats) {
        self.max_fitness.push(stats.max_fitness);
        self.median_fitness.push(stats.median_fitness);
        self.min_fitness.push(stats.min_fitness);
        self.mean_fitness.push(stats.mean_fitness);
    }

    /// Number of recorded generations.
    pub fn len(&self) -> usize {
        self.max_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_fitness.is_empty()
    }
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Evaluation rounds run.
    pub generations: usize,
    /// Total individual evaluations performed.
    pub total_evaluations: u64,
    /// Best score seen in any generation.
    pub best_fitness: f64,
    /// Mean score of the final population.
    pub final_mean_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("At least one generation is required")]
    NoGenerations,
    #[error("At least one sample cluster is required")]
    NoClusters,
    #[error("Cluster spread must be positive and finite, got {0}")]
    InvalidSpread(f64),
    #[error("Cluster {index} has {found} coordinates but {expected} dimensions are configured")]
    ClusterMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("Cluster label {label} is out of range for {num_bins} bins")]
    LabelOutOfRange { label: u32, num_bins: u32 },
    #[error("Fern config validation failed: {0}")]
    Fern(#[from] ConfigError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.fern.validate()?;
        if self.population.size == 0 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.population.generations == 0 {
            return Err(EvolutionConfigError::NoGenerations);
        }
        Ok(())
    }
}

impl SampleConfig {
    /// Validate sample clusters against the fern they will be scored with.
    pub fn validate(&self, fern: &FernConfig) -> Result<(), EvolutionConfigError> {
        if self.clusters.is_empty() {
            return Err(EvolutionConfigError::NoClusters);
        }
        if !(self.spread.is_finite() && self.spread > 0.0) {
            return Err(EvolutionConfigError::InvalidSpread(self.spread));
        }
        for (index, cluster) in self.clusters.iter().enumerate() {
            if cluster.center.len() != fern.dimensions {
                return Err(EvolutionConfigError::ClusterMismatch {
                    index,
                    expected: fern.dimensions,
                    found: cluster.center.len(),
                });
            }
            if cluster.label >= fern.num_bins {
                return Err(EvolutionConfigError::LabelOutOfRange {
                    label: cluster.label,
                    num_bins: fern.num_bins,
                });
            }
        }
        Ok(())
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.evolution.validate()?;
        self.samples.validate(&self.evolution.fern)
    }
}
