//! Configuration types for fern construction and mutation.

use serde::{Deserialize, Serialize};

use crate::compute::{Interval, MAX_UNIFORM_DEPTH, Region};

/// Per-tree genetic operator probabilities.
///
/// Every fern carries its own copy, so populations evolved side by side never
/// share rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability that a mutation is structural rather than parametric.
    #[serde(default = "default_node_type_chance")]
    pub node_type_chance: f64,
    /// Probability that a structural mutation of a fork collapses it to a leaf
    /// (otherwise its split dimension changes).
    #[serde(default = "default_mutation_type_chance_fork")]
    pub mutation_type_chance_fork: f64,
    /// Probability that a structural mutation of a leaf splits it into a fork
    /// (otherwise its bin changes).
    #[serde(default = "default_mutation_type_chance_leaf")]
    pub mutation_type_chance_leaf: f64,
    /// Probability that an offspring receives one mutation.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Probability that an offspring is crossed with a second parent.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Swap subtrees at the same position in both parents instead of at two
    /// independent positions.
    #[serde(default)]
    pub analogous_crossover: bool,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            node_type_chance: default_node_type_chance(),
            mutation_type_chance_fork: default_mutation_type_chance_fork(),
            mutation_type_chance_leaf: default_mutation_type_chance_leaf(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            analogous_crossover: false,
        }
    }
}

fn default_node_type_chance() -> f64 {
    0.85
}
fn default_mutation_type_chance_fork() -> f64 {
    0.1
}
fn default_mutation_type_chance_leaf() -> f64 {
    0.25
}
fn default_mutation_rate() -> f64 {
    0.4
}
fn default_crossover_rate() -> f64 {
    0.05
}

impl MutationConfig {
    /// Validate that every probability lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("node_type_chance", self.node_type_chance),
            ("mutation_type_chance_fork", self.mutation_type_chance_fork),
            ("mutation_type_chance_leaf", self.mutation_type_chance_leaf),
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }
}

/// Full input domain of a fern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Same interval along every dimension.
    Uniform(Interval),
    /// One interval per dimension.
    PerDimension(Vec<Interval>),
}

impl Default for Domain {
    fn default() -> Self {
        Self::Uniform(Interval::new(0.0, 1.0))
    }
}

/// How the initial population is grown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Initialization {
    /// Balanced tree with `depth` fork levels.
    Uniform { depth: usize },
    /// Minimal tree grown by `rounds` structural mutations.
    Randomized { rounds: usize },
}

impl Default for Initialization {
    fn default() -> Self {
        Self::Randomized { rounds: 20 }
    }
}

/// Construction parameters shared by every fern in a population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FernConfig {
    /// Number of input dimensions.
    pub dimensions: usize,
    /// Number of output labels.
    pub num_bins: u32,
    /// Input domain.
    #[serde(default)]
    pub domain: Domain,
    /// Initial tree shape.
    #[serde(default)]
    pub initialization: Initialization,
    /// Genetic operator probabilities applied to every individual.
    #[serde(default)]
    pub mutation: MutationConfig,
}

impl Default for FernConfig {
    fn default() -> Self {
        Self {
            dimensions: 2,
            num_bins: 2,
            domain: Domain::default(),
            initialization: Initialization::default(),
            mutation: MutationConfig::default(),
        }
    }
}

impl FernConfig {
    /// Build the full-domain region described by this configuration.
    pub fn region(&self) -> Result<Region, ConfigError> {
        let region = match &self.domain {
            Domain::Uniform(interval) => Region::uniform(*interval, self.dimensions),
            Domain::PerDimension(intervals) => {
                if intervals.len() != self.dimensions {
                    return Err(ConfigError::DomainMismatch {
                        expected: self.dimensions,
                        found: intervals.len(),
                    });
                }
                Region::new(intervals.clone())
            }
        };

        for (index, interval) in region.iter().enumerate() {
            if interval.is_degenerate() {
                return Err(ConfigError::DegenerateDomain {
                    index,
                    lower: interval.lower,
                    upper: interval.upper,
                });
            }
        }
        Ok(region)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.num_bins == 0 {
            return Err(ConfigError::InvalidBinCount);
        }
        if let Initialization::Uniform { depth } = self.initialization
            && depth > MAX_UNIFORM_DEPTH
        {
            return Err(ConfigError::DepthTooLarge {
                depth,
                max: MAX_UNIFORM_DEPTH,
            });
        }
        self.region()?;
        self.mutation.validate()
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Dimension count must be non-zero")]
    InvalidDimensions,
    #[error("Bin count must be non-zero")]
    InvalidBinCount,
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Domain has {found} intervals but {expected} dimensions are configured")]
    DomainMismatch { expected: usize, found: usize },
    #[error("Domain interval {index} [{lower}, {upper}] is degenerate")]
    DegenerateDomain { index: usize, lower: f64, upper: f64 },
    #[error("Uniform depth {depth} exceeds the limit of {max}")]
    DepthTooLarge { depth: usize, max: usize },
}
