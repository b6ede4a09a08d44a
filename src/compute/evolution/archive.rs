//! Population snapshots stored as JSON.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::compute::Fern;

use super::search::EvolutionResult;

/// A population with its scores at one point of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    /// Number of generations evaluated when the snapshot was taken.
    pub generation: usize,
    pub population: Vec<Fern>,
    /// Raw scores, index aligned with `population`.
    pub fitness: Vec<f64>,
}

impl PopulationSnapshot {
    pub fn new(generation: usize, population: Vec<Fern>, fitness: Vec<f64>) -> Self {
        Self {
            generation,
            population,
            fitness,
        }
    }

    /// Best scoring individual and its score, first one on ties.
    pub fn best(&self) -> Option<(&Fern, f64)> {
        let mut best: Option<(&Fern, f64)> = None;
        for (fern, &score) in self.population.iter().zip(&self.fitness) {
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((fern, score));
            }
        }
        best
    }

    /// Check that every tree is well formed, all trees agree on dimensions
    /// and bin count, and there is one score per tree.
    pub fn validate(&self) -> io::Result<()> {
        let Some(first) = self.population.first() else {
            return Err(invalid_data("snapshot has no individuals"));
        };
        if self.fitness.len() != self.population.len() {
            return Err(invalid_data(format!(
                "{} scores for {} individuals",
                self.fitness.len(),
                self.population.len()
            )));
        }

        for (i, fern) in self.population.iter().enumerate() {
            fern.validate()
                .map_err(|e| invalid_data(format!("individual {}: {}", i, e)))?;
            if fern.dimensions() != first.dimensions() || fern.num_bins() != first.num_bins() {
                return Err(invalid_data(format!(
                    "individual {} disagrees with individual 0 on dimensions or bins",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Write pretty-printed JSON to `writer`.
    pub fn to_writer<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read and validate a snapshot from `reader`.
    pub fn from_reader<R: Read>(reader: R) -> io::Result<Self> {
        let snapshot: Self = serde_json::from_reader(reader).map_err(invalid_data)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Save to a file, replacing it if it exists.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()
    }

    /// Load and validate a snapshot file.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl From<&EvolutionResult> for PopulationSnapshot {
    fn from(result: &EvolutionResult) -> Self {
        Self::new(
            result.stats.generations,
            result.population.clone(),
            result.fitness.clone(),
        )
    }
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}
