//! Interval and region arithmetic.
//!
//! A [`Region`] is the hyper-rectangle reachable from the root of a fern down to
//! a cursor position. Ferns never store coordinates on their nodes; regions are
//! narrowed with [`Region::split`] on the way down. [`Region::expand`] is the
//! arithmetic inverse of a split; cursors restore exact parent bounds instead.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::error::FernError;

/// Fraction at which every fork divides its interval.
pub const SPLIT_FRACTION: f64 = 0.5;

/// Closed interval `[lower, upper]` on the real line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Create an interval from its bounds.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Width of the interval.
    #[inline]
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    /// Point where a fork divides this interval.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        self.lower + SPLIT_FRACTION * self.span()
    }

    /// Check whether `x` lies in the closed interval.
    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    /// True for non-finite bounds or zero/negative span.
    pub fn is_degenerate(&self) -> bool {
        !(self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper)
    }

    /// Sub-interval below (`take_upper == false`) or above the point at
    /// `fraction` of the span.
    pub fn split(&self, fraction: f64, take_upper: bool) -> Result<Interval, FernError> {
        self.check()?;
        let cut = self.lower + fraction * self.span();
        Ok(if take_upper {
            Interval::new(cut, self.upper)
        } else {
            Interval::new(self.lower, cut)
        })
    }

    /// Inverse of a midpoint split: the interval this one was split from.
    pub fn expand(&self, was_upper: bool) -> Result<Interval, FernError> {
        self.check()?;
        let doubled = self.span() / SPLIT_FRACTION;
        Ok(if was_upper {
            Interval::new(self.upper - doubled, self.upper)
        } else {
            Interval::new(self.lower, self.lower + doubled)
        })
    }

    fn check(&self) -> Result<(), FernError> {
        if self.is_degenerate() {
            return Err(FernError::DegenerateRegion {
                lower: self.lower,
                upper: self.upper,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Axis-aligned box, one interval per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region {
    intervals: Vec<Interval>,
}

impl Region {
    /// Create a region from per-dimension intervals.
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }

    /// Region with the same interval along each of `dimensions` axes.
    pub fn uniform(interval: Interval, dimensions: usize) -> Self {
        Self {
            intervals: vec![interval; dimensions],
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.intervals.len()
    }

    /// Per-dimension intervals.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate over the per-dimension intervals.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter()
    }

    /// Set every dimension to the same interval.
    pub fn set_uniform(&mut self, interval: Interval) -> &mut Self {
        for slot in &mut self.intervals {
            *slot = interval;
        }
        self
    }

    /// Narrow `dim` to the half below (or above) its midpoint.
    pub fn split(&mut self, dim: usize, take_upper: bool) -> Result<(), FernError> {
        let interval = self.interval_mut(dim)?;
        *interval = interval.split(SPLIT_FRACTION, take_upper)?;
        Ok(())
    }

    /// Undo a [`Region::split`] of `dim` taken on the given side.
    pub fn expand(&mut self, dim: usize, was_upper: bool) -> Result<(), FernError> {
        let interval = self.interval_mut(dim)?;
        *interval = interval.expand(was_upper)?;
        Ok(())
    }

    /// Check whether a point lies inside the closed region.
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dimensions()
            && self
                .intervals
                .iter()
                .zip(point)
                .all(|(interval, &x)| interval.contains(x))
    }

    /// Product of the spans.
    pub fn volume(&self) -> f64 {
        self.intervals.iter().map(Interval::span).product()
    }

    /// Centre point of the region.
    pub fn center(&self) -> Vec<f64> {
        self.intervals.iter().map(Interval::midpoint).collect()
    }

    /// Ensure the region has at least one dimension and no degenerate interval.
    pub fn validate(&self) -> Result<(), FernError> {
        if self.intervals.is_empty() {
            return Err(FernError::EmptyRegion);
        }
        for interval in &self.intervals {
            interval.check()?;
        }
        Ok(())
    }

    fn interval_mut(&mut self, dim: usize) -> Result<&mut Interval, FernError> {
        let dimensions = self.intervals.len();
        self.intervals
            .get_mut(dim)
            .ok_or(FernError::DimensionMismatch {
                expected: dimensions,
                found: dim + 1,
            })
    }
}

impl Index<usize> for Region {
    type Output = Interval;

    fn index(&self, dim: usize) -> &Interval {
        &self.intervals[dim]
    }
}

impl IndexMut<usize> for Region {
    fn index_mut(&mut self, dim: usize) -> &mut Interval {
        &mut self.intervals[dim]
    }
}

impl From<Vec<Interval>> for Region {
    fn from(intervals: Vec<Interval>) -> Self {
        Self::new(intervals)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{}", interval)?;
        }
        Ok(())
    }
}
