//! Fitness functions and population evaluation.
//!
//! A [`Fitness`] scores one fern; an [`Evaluator`] scores a whole population
//! and returns the scores in population order.

use log::warn;
use rand::prelude::*;
use rand_distr::{Normal, NormalError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compute::{Controller, Fern};
use crate::schema::SampleConfig;

/// Scores one individual. Higher is better; scores must be finite and
/// non-negative.
pub trait Fitness: Sync {
    fn fitness(&self, individual: &Fern) -> f64;
}

impl<F> Fitness for F
where
    F: Fn(&Fern) -> f64 + Sync,
{
    fn fitness(&self, individual: &Fern) -> f64 {
        self(individual)
    }
}

/// Scores a population, one score per individual in the same order.
pub trait Evaluator {
    fn evaluate(&self, population: &[Fern]) -> Vec<f64>;
}

/// Evaluates individuals one after another on the calling thread.
pub struct SerialEvaluator<F> {
    fitness: F,
}

impl<F: Fitness> SerialEvaluator<F> {
    pub fn new(fitness: F) -> Self {
        Self { fitness }
    }
}

impl<F: Fitness> Evaluator for SerialEvaluator<F> {
    fn evaluate(&self, population: &[Fern]) -> Vec<f64> {
        population
            .iter()
            .map(|fern| self.fitness.fitness(fern))
            .collect()
    }
}

/// Evaluates individuals on the rayon thread pool.
pub struct ParallelEvaluator<F> {
    fitness: F,
}

impl<F: Fitness> ParallelEvaluator<F> {
    pub fn new(fitness: F) -> Self {
        Self { fitness }
    }
}

impl<F: Fitness> Evaluator for ParallelEvaluator<F> {
    fn evaluate(&self, population: &[Fern]) -> Vec<f64> {
        population
            .par_iter()
            .map(|fern| self.fitness.fitness(fern))
            .collect()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, population: &[Fern]) -> Vec<f64> {
        (**self).evaluate(population)
    }
}

/// A point with its expected label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub point: Vec<f64>,
    pub label: u32,
}

/// Fraction of samples a controller labels correctly.
#[derive(Debug, Clone)]
pub struct ClassificationFitness {
    samples: Vec<LabeledPoint>,
}

impl ClassificationFitness {
    pub fn new(samples: Vec<LabeledPoint>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[LabeledPoint] {
        &self.samples
    }

    /// Accuracy in `[0, 1]`. Queries that fail count as misses.
    pub fn accuracy<C: Controller + ?Sized>(&self, controller: &C) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let mut correct = 0usize;
        for sample in &self.samples {
            match controller.query(&sample.point) {
                Ok(label) if label == sample.label => correct += 1,
                Ok(_) => {}
                Err(e) => warn!("Query failed for {:?}: {}", sample.point, e),
            }
        }
        correct as f64 / self.samples.len() as f64
    }
}

impl Fitness for ClassificationFitness {
    fn fitness(&self, individual: &Fern) -> f64 {
        self.accuracy(individual)
    }
}

/// Draw labelled points around each configured cluster centre, with
/// independent Gaussian noise of standard deviation `spread` on every axis.
pub fn gaussian_clusters(config: &SampleConfig) -> Result<Vec<LabeledPoint>, NormalError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.spread)?;

    let mut samples = Vec::with_capacity(config.clusters.len() * config.samples_per_cluster);
    for cluster in &config.clusters {
        for _ in 0..config.samples_per_cluster {
            let point = cluster
                .center
                .iter()
                .map(|&c| c + noise.sample(&mut rng))
                .collect();
            samples.push(LabeledPoint {
                point,
                label: cluster.label,
            });
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{FernError, Interval, Node, Region};
    use crate::schema::ClusterConfig;

    /// Labels points by which side of x = 0.5 they fall on.
    struct Threshold;

    impl Controller for Threshold {
        fn dimensions(&self) -> usize {
            2
        }

        fn query(&self, point: &[f64]) -> Result<u32, FernError> {
            if point.len() != 2 {
                return Err(FernError::DimensionMismatch {
                    expected: 2,
                    found: point.len(),
                });
            }
            Ok(u32::from(point[0] > 0.5))
        }
    }

    fn samples() -> Vec<LabeledPoint> {
        vec![
            LabeledPoint {
                point: vec![0.1, 0.9],
                label: 0,
            },
            LabeledPoint {
                point: vec![0.9, 0.1],
                label: 1,
            },
            LabeledPoint {
                point: vec![0.8, 0.8],
                label: 0,
            },
            LabeledPoint {
                point: vec![0.2],
                label: 0,
            },
        ]
    }

    fn split_fern() -> Fern {
        Fern::from_root(
            Node::fork(0, Node::leaf(0), Node::leaf(1)),
            Region::uniform(Interval::new(0.0, 1.0), 2),
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_accuracy_with_baseline() {
        let fitness = ClassificationFitness::new(samples());
        // Malformed sample counts as a miss.
        assert_eq!(fitness.accuracy(&Threshold), 0.5);
        assert_eq!(fitness.accuracy(&split_fern()), 0.5);
        assert_eq!(ClassificationFitness::new(Vec::new()).accuracy(&Threshold), 0.0);
    }

    #[test]
    fn test_evaluators_agree() {
        let fitness = ClassificationFitness::new(samples());
        let population = vec![
            split_fern(),
            Fern::new(Region::uniform(Interval::new(0.0, 1.0), 2), 2).unwrap(),
        ];

        let serial = SerialEvaluator::new(fitness.clone()).evaluate(&population);
        let parallel = ParallelEvaluator::new(fitness).evaluate(&population);
        assert_eq!(serial, parallel);
        assert_eq!(serial, vec![0.5, 0.5]);
    }

    #[test]
    fn test_closure_fitness() {
        let evaluator = SerialEvaluator::new(|fern: &Fern| fern.leaf_count() as f64);
        let population = vec![split_fern()];
        assert_eq!(evaluator.evaluate(&population), vec![2.0]);

        let boxed: Box<dyn Evaluator> = Box::new(evaluator);
        assert_eq!(boxed.evaluate(&population), vec![2.0]);
    }

    #[test]
    fn test_gaussian_clusters() {
        let config = SampleConfig {
            clusters: vec![
                ClusterConfig {
                    center: vec![0.0, 0.0],
                    label: 0,
                },
                ClusterConfig {
                    center: vec![10.0, 10.0],
                    label: 1,
                },
            ],
            spread: 0.5,
            samples_per_cluster: 50,
            seed: 7,
        };
        let points = gaussian_clusters(&config).unwrap();
        assert_eq!(points.len(), 100);
        assert!(points[..50].iter().all(|p| p.label == 0 && p.point[0] < 5.0));
        assert!(points[50..].iter().all(|p| p.label == 1 && p.point[0] > 5.0));
        assert_eq!(points, gaussian_clusters(&config).unwrap());

        let bad = SampleConfig {
            spread: f64::NAN,
            ..config
        };
        assert!(gaussian_clusters(&bad).is_err());
    }
}
