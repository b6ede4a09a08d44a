//! Ferns CLI - Evolve fern classifiers from JSON configuration.

use std::fs;
use std::path::PathBuf;

use ferns::{
    compute::evolution::{
        ClassificationFitness, EvolutionEngine, Evaluator, ParallelEvaluator, PopulationSnapshot,
        SerialEvaluator, gaussian_clusters,
    },
    schema::RunConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [output.json]", args[0]);
        eprintln!();
        eprintln!("Evolve a population of ferns against synthetic labelled clusters.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!("  output.json  Where to save the final population");
        eprintln!("               (default: <config>.population.json)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let output_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| config_path.with_extension("population.json"));

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    let samples = gaussian_clusters(&config.samples).unwrap_or_else(|e| {
        eprintln!("Error generating samples: {}", e);
        std::process::exit(1);
    });
    let fitness = ClassificationFitness::new(samples);

    let evolution = &config.evolution;
    println!("Fern Evolution");
    println!("==============");
    println!(
        "Ferns: {} dimensions, {} bins",
        evolution.fern.dimensions, evolution.fern.num_bins
    );
    println!(
        "Population: {} individuals, {} generations",
        evolution.population.size, evolution.population.generations
    );
    println!(
        "Samples: {} clusters x {}",
        config.samples.clusters.len(),
        config.samples.samples_per_cluster
    );
    println!(
        "Evaluation: {}",
        if evolution.parallel { "parallel" } else { "serial" }
    );
    println!();

    let evaluator: Box<dyn Evaluator> = if evolution.parallel {
        Box::new(ParallelEvaluator::new(fitness))
    } else {
        Box::new(SerialEvaluator::new(fitness))
    };

    let mut engine = EvolutionEngine::new(evolution.clone(), evaluator).unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    // Print progress every 10%
    let generations = evolution.population.generations;
    let interval = (generations / 10).max(1);
    let result = engine
        .run_with_callback(|stats| {
            if (stats.generation + 1) % interval == 0 || stats.generation + 1 == generations {
                println!(
                    "  Generation {}/{}: max={:.4}, median={:.4}, min={:.4}",
                    stats.generation + 1,
                    generations,
                    stats.max_fitness,
                    stats.median_fitness,
                    stats.min_fitness
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Evolution failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Results:");
    println!("  Best fitness: {:.4}", result.stats.best_fitness);
    println!("  Final mean fitness: {:.4}", result.stats.final_mean_fitness);
    println!(
        "  Time: {:.2}s ({:.1} evaluations/s)",
        result.stats.elapsed_seconds, result.stats.evaluations_per_second
    );

    if let Some(best) = result.best() {
        println!(
            "  Best fern: {} nodes, {} leaves, depth {}",
            best.node_count(),
            best.leaf_count(),
            best.depth()
        );
        println!();
        print!("{}", best);
    }

    let snapshot = PopulationSnapshot::from(&result);
    if let Err(e) = snapshot.save(&output_path) {
        eprintln!("Error saving population: {}", e);
        std::process::exit(1);
    }
    println!();
    println!("Population saved to {}", output_path.display());
}

fn print_example_config() {
    let config = RunConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example config: {}", e);
            std::process::exit(1);
        }
    }
}
