use crate::enums::EventCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single daily observation of the price series.
///
/// Dates are calendar days; non-trading days are simply absent from a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// A dated occurrence from the reference catalog (e.g. a war, an OPEC decision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub date: NaiveDate,
    pub description: String,
    pub category: EventCategory,
}

/// A date at which the local mean of the series shifts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    pub date: NaiveDate,
    /// In `[0, 1]`; higher means the shift is less likely to be noise.
    pub confidence: f64,
    pub mean_before: f64,
    pub mean_after: f64,
    /// `(mean_after - mean_before) / mean_before * 100`.
    pub pct_change: f64,
}

impl ChangePoint {
    /// Builds a change point, deriving `pct_change` from the two segment means.
    pub fn new(date: NaiveDate, confidence: f64, mean_before: f64, mean_after: f64) -> Self {
        Self {
            date,
            confidence,
            mean_before,
            mean_after,
            pct_change: (mean_after - mean_before) / mean_before * 100.0,
        }
    }
}

/// Summary statistics of the series over an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// The requested start of the range (not necessarily an observation date).
    pub start_date: NaiveDate,
    /// The requested end of the range (not necessarily an observation date).
    pub end_date: NaiveDate,
    /// Price of the first observation inside the range.
    pub start_price: f64,
    /// Price of the last observation inside the range.
    pub end_price: f64,
    pub price_change: f64,
    pub pct_change: f64,
    /// Annualized standard deviation of periodic returns. Never negative.
    pub volatility: f64,
    /// Number of observations that fell inside the range.
    pub observations: usize,
}

/// Identifies one immutable snapshot of the canonical series and catalog.
///
/// Revision `0` is the empty snapshot a store starts with; every successful load
/// produces the next revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    pub const INITIAL: Revision = Revision(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the revision that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A derived value tagged with the revision it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revisioned<T> {
    pub revision: Revision,
    pub value: T,
}

impl<T> Revisioned<T> {
    pub fn new(revision: Revision, value: T) -> Self {
        Self { revision, value }
    }

    /// Returns `true` if this value was computed against `current`.
    pub fn is_current(&self, current: Revision) -> bool {
        self.revision == current
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Revisioned<U> {
        Revisioned {
            revision: self.revision,
            value: f(self.value),
        }
    }
}
