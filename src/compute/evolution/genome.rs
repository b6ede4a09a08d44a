//! Genetic operators on ferns: mutation, crossover and randomized growth.
//!
//! Every random decision goes through one [`FernRng`], so a run seeded once is
//! reproducible end to end.

use log::debug;
use rand::prelude::*;

use crate::compute::{Fern, FernError, Node, Path, Region};
use crate::schema::{FernConfig, Initialization};

/// What a chosen node looked like before it was edited.
enum Target {
    Leaf { bin: u32 },
    Fork { dimension: usize, leftmost_bin: u32 },
}

/// Random number generator wrapper for genetic operators.
pub struct FernRng {
    rng: StdRng,
}

impl FernRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.r#gen::<f64>() < p
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen()
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    fn below(&mut self, n: usize) -> usize {
        if n <= 1 { 0 } else { self.rng.gen_range(0..n) }
    }

    /// Uniform value in `0..n` other than `current`, when there is one.
    fn other(&mut self, current: usize, n: usize) -> usize {
        if n <= 1 {
            return current;
        }
        let pick = self.below(n - 1);
        if pick >= current { pick + 1 } else { pick }
    }

    fn random_bin(&mut self, num_bins: u32) -> u32 {
        self.below(num_bins as usize) as u32
    }

    /// Uniformly chosen node position.
    fn random_path(&mut self, root: &Node) -> Path {
        let mut paths = root.paths();
        let index = self.below(paths.len());
        paths.swap_remove(index)
    }

    /// Build one individual as described by `config`.
    pub fn random_fern(&mut self, domain: &Region, config: &FernConfig) -> Result<Fern, FernError> {
        let mut fern = match config.initialization {
            Initialization::Uniform { depth } => {
                Fern::new_uniform(domain.clone(), depth, config.num_bins)?
            }
            Initialization::Randomized { rounds } => {
                let mut fern = Fern::new(domain.clone(), config.num_bins)?;
                self.randomize(&mut fern, rounds)?;
                fern
            }
        };
        fern.set_config(config.mutation.clone());
        Ok(fern)
    }

    /// Reset `fern` to the minimal tree and grow it with `rounds` structural
    /// mutations.
    pub fn randomize(&mut self, fern: &mut Fern, rounds: usize) -> Result<(), FernError> {
        *fern.root_mut() = Node::fork(0, Node::leaf(0), Node::leaf(0));
        for _ in 0..rounds {
            self.mutate_structure(fern)?;
        }
        Ok(())
    }

    /// Apply exactly one mutation, structural or parametric, using the rates
    /// carried by `fern`.
    pub fn mutate(&mut self, fern: &mut Fern) -> Result<(), FernError> {
        if self.chance(fern.config().node_type_chance) {
            self.mutate_structure(fern)
        } else {
            self.relabel_leaf(fern)
        }
    }

    fn mutate_structure(&mut self, fern: &mut Fern) -> Result<(), FernError> {
        let dimensions = fern.dimensions();
        let num_bins = fern.num_bins();
        let leaf_chance = fern.config().mutation_type_chance_leaf;
        let fork_chance = fern.config().mutation_type_chance_fork;

        let path = self.random_path(fern.root());
        let target = match fern.root().at(&path) {
            Some(Node::Leaf { bin }) => Target::Leaf { bin: *bin },
            Some(node @ Node::Fork { dimension, .. }) => Target::Fork {
                dimension: *dimension,
                leftmost_bin: node.leftmost_bin(),
            },
            None => return Ok(()),
        };
        let Some(mut handle) = fern.handle_mut_at(&path) else {
            return Ok(());
        };

        match target {
            Target::Leaf { bin } => {
                if self.chance(leaf_chance) {
                    let dimension = self.below(dimensions);
                    let left = self.random_bin(num_bins);
                    let right = self.random_bin(num_bins);
                    debug!("Splitting leaf at {:?} on dimension {}", path, dimension);
                    handle.split_leaf(dimension, left, right)
                } else {
                    let bin = self.other(bin as usize, num_bins as usize) as u32;
                    debug!("Relabelling leaf at {:?} to bin {}", path, bin);
                    handle.set_bin(bin)
                }
            }
            Target::Fork {
                dimension,
                leftmost_bin,
            } => {
                if self.chance(fork_chance) {
                    debug!("Collapsing fork at {:?} to bin {}", path, leftmost_bin);
                    handle.collapse(leftmost_bin)
                } else {
                    let dimension = self.other(dimension, dimensions);
                    debug!("Moving fork at {:?} to dimension {}", path, dimension);
                    handle.set_dimension(dimension)
                }
            }
        }
    }

    fn relabel_leaf(&mut self, fern: &mut Fern) -> Result<(), FernError> {
        let num_bins = fern.num_bins() as usize;
        let root = fern.root();
        let mut leaves: Vec<(Path, u32)> = root
            .paths()
            .into_iter()
            .filter_map(|path| match root.at(&path) {
                Some(Node::Leaf { bin }) => Some((path, *bin)),
                _ => None,
            })
            .collect();
        if leaves.is_empty() {
            return Ok(());
        }

        let index = self.below(leaves.len());
        let (path, bin) = leaves.swap_remove(index);
        let bin = self.other(bin as usize, num_bins) as u32;
        debug!("Relabelling leaf at {:?} to bin {}", path, bin);
        match fern.handle_mut_at(&path) {
            Some(mut handle) => handle.set_bin(bin),
            None => Ok(()),
        }
    }

    /// Replace a subtree of `fern` with a copy of a subtree of `other`.
    ///
    /// With `analogous_crossover` set the two subtrees sit at the same
    /// position in both trees; otherwise both positions are drawn
    /// independently.
    pub fn crossover(&mut self, fern: &mut Fern, other: &Fern) -> Result<(), FernError> {
        if other.dimensions() != fern.dimensions() {
            return Err(FernError::DimensionMismatch {
                expected: fern.dimensions(),
                found: other.dimensions(),
            });
        }
        if other.num_bins() != fern.num_bins() {
            return Err(FernError::BinCountMismatch {
                expected: fern.num_bins(),
                found: other.num_bins(),
            });
        }

        let (target, source) = if fern.config().analogous_crossover {
            let path = self.common_path(fern.root(), other.root());
            (path.clone(), path)
        } else {
            (self.random_path(fern.root()), self.random_path(other.root()))
        };

        let Some(subtree) = other.root().at(&source).cloned() else {
            return Ok(());
        };
        debug!("Crossing subtree {:?} into {:?}", source, target);
        match fern.handle_mut_at(&target) {
            Some(mut handle) => handle.splice(subtree),
            None => Ok(()),
        }
    }

    /// Uniformly chosen non-root position present in both trees, or the root
    /// when they share no other position.
    fn common_path(&mut self, a: &Node, b: &Node) -> Path {
        let mut common: Vec<Path> = a
            .paths()
            .into_iter()
            .filter(|path| !path.is_empty() && b.at(path).is_some())
            .collect();
        if common.is_empty() {
            return Vec::new();
        }
        let index = self.below(common.len());
        common.swap_remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Interval;
    use crate::schema::MutationConfig;
    use proptest::prelude::*;

    fn square() -> Region {
        Region::uniform(Interval::new(0.0, 1.0), 2)
    }

    fn shape(node: &Node) -> Vec<Path> {
        node.paths()
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = FernRng::new(1);
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
            let u = rng.unit();
            assert!((0.0..1.0).contains(&u));
        }
        assert!((0.0..1.0).contains(&FernRng::random().unit()));
        assert_eq!(FernRng::new(3).next_seed(), FernRng::new(3).next_seed());
    }

    #[test]
    fn test_same_seed_same_fern() {
        let config = FernConfig::default();
        let a = FernRng::new(42).random_fern(&square(), &config).unwrap();
        let b = FernRng::new(42).random_fern(&square(), &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.config(), &config.mutation);
    }

    #[test]
    fn test_uniform_initialization() {
        let config = FernConfig {
            initialization: Initialization::Uniform { depth: 3 },
            ..Default::default()
        };
        let fern = FernRng::new(0).random_fern(&square(), &config).unwrap();
        assert_eq!(fern.leaf_count(), 8);
        assert_eq!(fern.depth(), 3);
    }

    #[test]
    fn test_randomize_resets() {
        let mut rng = FernRng::new(5);
        let mut fern = Fern::new_uniform(square(), 4, 3).unwrap();
        rng.randomize(&mut fern, 0).unwrap();
        assert_eq!(fern.root(), &Node::fork(0, Node::leaf(0), Node::leaf(0)));

        rng.randomize(&mut fern, 30).unwrap();
        assert!(fern.validate().is_ok());
    }

    #[test]
    fn test_parametric_mutation_relabels_one_leaf() {
        let config = MutationConfig {
            node_type_chance: 0.0,
            ..Default::default()
        };
        let mut rng = FernRng::new(9);
        for _ in 0..20 {
            let mut fern = Fern::new_uniform(square(), 3, 2)
                .unwrap()
                .with_config(config.clone());
            rng.mutate(&mut fern).unwrap();

            assert_eq!(fern.leaf_count(), 8);
            let relabelled = fern
                .leaves()
                .filter(|leaf| matches!(leaf, Ok((_, 1))))
                .count();
            assert_eq!(relabelled, 1);
        }
    }

    #[test]
    fn test_structural_mutation_splits_leaf() {
        let config = MutationConfig {
            node_type_chance: 1.0,
            mutation_type_chance_leaf: 1.0,
            ..Default::default()
        };
        let mut fern = Fern::new_uniform(square(), 0, 2)
            .unwrap()
            .with_config(config);
        FernRng::new(3).mutate(&mut fern).unwrap();
        assert_eq!(fern.leaf_count(), 2);
        assert_eq!(fern.depth(), 1);
    }

    #[test]
    fn test_redimension_picks_new_dimension() {
        let config = MutationConfig {
            node_type_chance: 1.0,
            mutation_type_chance_fork: 0.0,
            mutation_type_chance_leaf: 0.0,
            ..Default::default()
        };
        let mut rng = FernRng::new(11);
        // Single-bin leaves cannot be relabelled, so only fork changes show.
        let mut fern = Fern::new(square(), 1).unwrap().with_config(config);
        let mut moved = false;
        for _ in 0..50 {
            rng.mutate(&mut fern).unwrap();
            moved |= matches!(fern.root(), Node::Fork { dimension: 1, .. });
        }
        assert!(moved);
    }

    #[test]
    fn test_collapse_keeps_leftmost_bin() {
        let config = MutationConfig {
            node_type_chance: 1.0,
            mutation_type_chance_fork: 1.0,
            mutation_type_chance_leaf: 0.0,
            ..Default::default()
        };
        let mut collapsed = 0;
        for seed in 0..60 {
            let root = Node::fork(0, Node::leaf(1), Node::leaf(0));
            let mut fern = Fern::from_root(root, square(), 2)
                .unwrap()
                .with_config(config.clone());
            FernRng::new(seed).mutate(&mut fern).unwrap();
            if let Node::Leaf { bin } = fern.root() {
                assert_eq!(*bin, 1);
                collapsed += 1;
            }
        }
        assert!(collapsed > 0);
    }

    #[test]
    fn test_crossover_mismatch() {
        let mut rng = FernRng::new(0);
        let mut fern = Fern::new(square(), 2).unwrap();
        let flat = Fern::new(Region::uniform(Interval::new(0.0, 1.0), 3), 2).unwrap();
        assert_eq!(
            rng.crossover(&mut fern, &flat),
            Err(FernError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );

        let wide = Fern::new(square(), 4).unwrap();
        assert_eq!(
            rng.crossover(&mut fern, &wide),
            Err(FernError::BinCountMismatch {
                expected: 2,
                found: 4
            })
        );
    }

    #[test]
    fn test_analogous_crossover_keeps_shape() {
        let config = MutationConfig {
            analogous_crossover: true,
            ..Default::default()
        };
        let mut rng = FernRng::new(21);
        let donor = {
            let mut fern = Fern::new_uniform(square(), 3, 4).unwrap();
            let paths = fern.root().paths();
            for (i, path) in paths.iter().enumerate() {
                if let Some(mut handle) = fern.handle_mut_at(path)
                    && handle.is_leaf()
                {
                    handle.set_bin((i % 3 + 1) as u32).unwrap();
                }
            }
            fern
        };

        for _ in 0..20 {
            let mut fern = Fern::new_uniform(square(), 3, 4)
                .unwrap()
                .with_config(config.clone());
            let before = shape(fern.root());
            rng.crossover(&mut fern, &donor).unwrap();
            assert_eq!(shape(fern.root()), before);
            assert!(fern.leaves().any(|leaf| matches!(leaf, Ok((_, bin)) if bin > 0)));
        }
    }

    #[test]
    fn test_analogous_crossover_falls_back_to_root() {
        let config = MutationConfig {
            analogous_crossover: true,
            ..Default::default()
        };
        let mut fern = Fern::new_uniform(square(), 0, 2)
            .unwrap()
            .with_config(config);
        let donor = Fern::from_root(
            Node::fork(1, Node::leaf(1), Node::leaf(0)),
            square(),
            2,
        )
        .unwrap();
        FernRng::new(0).crossover(&mut fern, &donor).unwrap();
        assert_eq!(fern.root(), donor.root());
    }

    proptest! {
        #[test]
        fn prop_mutation_keeps_fern_valid(seed in any::<u64>(), steps in 1usize..60) {
            let mut rng = FernRng::new(seed);
            let config = FernConfig {
                dimensions: 3,
                num_bins: 4,
                ..Default::default()
            };
            let domain = config.region().unwrap();
            let mut fern = rng.random_fern(&domain, &config).unwrap();
            for _ in 0..steps {
                rng.mutate(&mut fern).unwrap();
                prop_assert!(fern.validate().is_ok());
            }
        }

        #[test]
        fn prop_crossover_keeps_fern_valid(seed in any::<u64>(), analogous in any::<bool>()) {
            let mut rng = FernRng::new(seed);
            let config = FernConfig {
                dimensions: 2,
                num_bins: 3,
                mutation: MutationConfig {
                    analogous_crossover: analogous,
                    ..Default::default()
                },
                ..Default::default()
            };
            let domain = config.region().unwrap();
            let mut fern = rng.random_fern(&domain, &config).unwrap();
            let other = rng.random_fern(&domain, &config).unwrap();

            rng.crossover(&mut fern, &other).unwrap();
            prop_assert!(fern.validate().is_ok());
            prop_assert_eq!(fern.dimensions(), 2);
            prop_assert_eq!(fern.num_bins(), 3);
        }
    }
}
