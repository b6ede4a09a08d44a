//! Quick evolution performance test

use ferns::{
    EvolutionConfig, EvolutionEngine,
    compute::evolution::{
        ClassificationFitness, ParallelEvaluator, SerialEvaluator, gaussian_clusters,
    },
    schema::{ClusterConfig, FernConfig, PopulationConfig, SampleConfig},
};
use std::time::Instant;

fn samples(dimensions: usize) -> SampleConfig {
    let corner = |offset: f64| vec![offset; dimensions];
    SampleConfig {
        clusters: vec![
            ClusterConfig {
                center: corner(0.25),
                label: 0,
            },
            ClusterConfig {
                center: corner(0.75),
                label: 1,
            },
        ],
        samples_per_cluster: 500,
        ..Default::default()
    }
}

fn main() {
    println!("=== Evolution Performance Test ===\n");

    // Test different input dimensions
    for dimensions in [2, 4, 8] {
        println!("Dimensions: {}", dimensions);

        let config = EvolutionConfig {
            fern: FernConfig {
                dimensions,
                ..Default::default()
            },
            population: PopulationConfig {
                size: 40,
                generations: 20,
            },
            random_seed: Some(42),
            ..Default::default()
        };
        let fitness = ClassificationFitness::new(gaussian_clusters(&samples(dimensions)).unwrap());

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(config, ParallelEvaluator::new(fitness)).unwrap();
        let result = engine.run().unwrap();
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.stats.generations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Best fitness:   {:.4}", result.stats.best_fitness);
        println!();
    }

    println!("=== Scalability Test (2 dimensions, serial vs parallel) ===\n");

    let fitness = ClassificationFitness::new(gaussian_clusters(&samples(2)).unwrap());

    // Test different population sizes
    for pop_size in [10, 20, 40, 80] {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size: pop_size,
                generations: 10,
            },
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let mut serial =
            EvolutionEngine::new(config.clone(), SerialEvaluator::new(fitness.clone())).unwrap();
        let serial_result = serial.run().unwrap();
        let serial_elapsed = start.elapsed();

        let start = Instant::now();
        let mut parallel =
            EvolutionEngine::new(config, ParallelEvaluator::new(fitness.clone())).unwrap();
        let parallel_result = parallel.run().unwrap();
        let parallel_elapsed = start.elapsed();

        assert_eq!(serial_result.population, parallel_result.population);
        println!(
            "Population {}: {} evals, serial {:.3}s, parallel {:.3}s",
            pop_size,
            serial_result.stats.total_evaluations,
            serial_elapsed.as_secs_f64(),
            parallel_elapsed.as_secs_f64()
        );
    }
}
