//! Core type definitions for the queueing network simulator.
//!
//! This module defines the fundamental types shared by stations, routing,
//! the scheduler and the reporting layer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TopologyError;

/// Simulation time.
///
/// Time is continuous. `SimTime::INFINITY` marks a timer that is not armed.
pub type SimTime = f64;

/// Index of a station in the network.
///
/// Stations are numbered `0..n` in configuration order and the index is
/// stable for the whole run.
pub type StationId = usize;

/// A closed `[min, max]` range from which uniform intervals are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound (inclusive)
    pub min: SimTime,
    /// Upper bound
    pub max: SimTime,
}

impl Interval {
    /// Creates an interval without validating it.
    pub const fn new(min: SimTime, max: SimTime) -> Self {
        Self { min, max }
    }

    /// Creates a degenerate interval that always yields `value`.
    pub const fn fixed(value: SimTime) -> Self {
        Self::new(value, value)
    }

    /// Checks that both bounds are finite, non-negative and ordered.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(TopologyError::InvalidInterval {
                min: self.min,
                max: self.max,
                reason: "bounds must be finite",
            });
        }
        if self.min < 0.0 || self.max < 0.0 {
            return Err(TopologyError::InvalidInterval {
                min: self.min,
                max: self.max,
                reason: "bounds must be non-negative",
            });
        }
        if self.min > self.max {
            return Err(TopologyError::InvalidInterval {
                min: self.min,
                max: self.max,
                reason: "min must not exceed max",
            });
        }
        Ok(())
    }

    /// Maps a variate `u` in `[0, 1)` onto the interval.
    #[inline]
    pub fn sample(&self, u: f64) -> SimTime {
        self.min + (self.max - self.min) * u
    }

    /// Width of the interval.
    #[inline]
    pub fn width(&self) -> SimTime {
        self.max - self.min
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2}]", self.min, self.max)
    }
}

/// How many clients a station may hold, waiting and in service together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capacity {
    /// At most this many clients
    Bounded(usize),
    /// No limit
    #[default]
    Unbounded,
}

impl Capacity {
    /// Returns `true` if a station holding `occupancy` clients is full.
    #[inline]
    pub fn is_full(&self, occupancy: usize) -> bool {
        match self {
            Capacity::Bounded(limit) => occupancy >= *limit,
            Capacity::Unbounded => false,
        }
    }

    /// Returns the bound, if any.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Bounded(limit) => Some(*limit),
            Capacity::Unbounded => None,
        }
    }
}

impl From<Option<usize>> for Capacity {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Capacity::Unbounded, Capacity::Bounded)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Bounded(limit) => write!(f, "{}", limit),
            Capacity::Unbounded => write!(f, "inf"),
        }
    }
}
