//! Training duration values
//!
//! Durations are counted in half-hours so that sums and equality checks are
//! exact.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Duration of a single training session.
///
/// Always a multiple of 0.5 hours in the range `[0.5, 5]`. The only way to
/// obtain a `Period` is through validation, so an invalid duration can never
/// reach a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Period(u8);

impl Period {
    /// Shortest allowed session, in half-hours
    pub const MIN_HALVES: u8 = 1;
    /// Longest allowed session, in half-hours
    pub const MAX_HALVES: u8 = 10;
    /// One standard session (1.5 hours)
    pub const DEFAULT: Self = Self(3);

    /// Validate a duration given in hours.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_hours(hours: f64) -> Result<Self> {
        let halves = hours * 2.0;
        if !halves.is_finite()
            || halves.fract() != 0.0
            || halves < f64::from(Self::MIN_HALVES)
            || halves > f64::from(Self::MAX_HALVES)
        {
            return Err(Error::InvalidPeriod(hours));
        }
        Ok(Self(halves as u8))
    }

    /// Build a period from a half-hour count.
    pub const fn from_halves(halves: u8) -> Option<Self> {
        if halves >= Self::MIN_HALVES && halves <= Self::MAX_HALVES {
            Some(Self(halves))
        } else {
            None
        }
    }

    /// Number of half-hours in this period
    pub const fn halves(self) -> u8 {
        self.0
    }

    /// Duration in hours
    pub fn hours(self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for Period {
    type Error = Error;

    fn try_from(hours: f64) -> Result<Self> {
        Self::from_hours(hours)
    }
}

impl From<Period> for f64 {
    fn from(period: Period) -> Self {
        period.hours()
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hours: f64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("'{s}' is not a number of hours")))?;
        Self::from_hours(hours)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.hours())
    }
}

/// An exact sum of periods.
///
/// Unlike [`Period`] this is unbounded: a day total or a merged row can hold
/// more than a single session's maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "f64")]
pub struct Hours(u32);

impl Hours {
    /// No time at all
    pub const ZERO: Self = Self(0);

    /// Number of half-hours
    pub const fn halves(self) -> u32 {
        self.0
    }

    /// Whether the sum is empty
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Total in hours
    pub fn hours(self) -> f64 {
        f64::from(self.0) / 2.0
    }
}

impl From<Period> for Hours {
    fn from(period: Period) -> Self {
        Self(u32::from(period.0))
    }
}

impl From<Hours> for f64 {
    fn from(hours: Hours) -> Self {
        hours.hours()
    }
}

impl Add for Hours {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Add<Period> for Hours {
    type Output = Self;

    fn add(self, rhs: Period) -> Self {
        self + Self::from(rhs)
    }
}

impl AddAssign<Period> for Hours {
    fn add_assign(&mut self, rhs: Period) {
        *self = *self + rhs;
    }
}

impl Sum<Period> for Hours {
    fn sum<I: Iterator<Item = Period>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |total, period| total + period)
    }
}

impl Sum for Hours {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |total, hours| total + hours)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.hours())
    }
}
