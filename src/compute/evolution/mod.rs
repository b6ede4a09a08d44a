//! Evolutionary search over populations of ferns.
//!
//! # Overview
//!
//! - **Genetic operators** (`genome`): seeded mutation, crossover and growth
//! - **Fitness** (`fitness`): pluggable scoring and serial/parallel evaluation
//! - **Search** (`search`): the generation loop with elitism and
//!   fitness-proportionate selection
//! - **Archive** (`archive`): JSON population snapshots
//!
//! # Example
//!
//! ```rust,no_run
//! use ferns::compute::evolution::{
//!     ClassificationFitness, EvolutionEngine, ParallelEvaluator, gaussian_clusters,
//! };
//! use ferns::schema::{EvolutionConfig, SampleConfig};
//!
//! let samples = gaussian_clusters(&SampleConfig::default()).unwrap();
//! let evaluator = ParallelEvaluator::new(ClassificationFitness::new(samples));
//!
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default(), evaluator).unwrap();
//! let result = engine
//!     .run_with_callback(|stats| {
//!         println!("Generation {}: best fitness = {:.3}", stats.generation, stats.max_fitness);
//!     })
//!     .unwrap();
//!
//! println!("Best fern:\n{}", result.best().unwrap());
//! ```

mod archive;
mod fitness;
mod genome;
mod search;

pub use archive::PopulationSnapshot;
pub use fitness::{
    ClassificationFitness, Evaluator, Fitness, LabeledPoint, ParallelEvaluator, SerialEvaluator,
    gaussian_clusters,
};
pub use genome::FernRng;
pub use search::{EvolutionEngine, EvolutionError, EvolutionResult, select};
