//! # Breakpoint Event Correlator
//!
//! Connects the event catalog to the analytics layer.
//!
//! - `EventCorrelator::correlate` turns an event into a calendar window around its
//!   date and computes the period statistics of that window.
//! - `EventCorrelator::match_change_point` attributes a detected change point to the
//!   nearest catalog event within a day tolerance.
//!
//! The correlator owns no data. Every call takes a `SeriesSnapshot`, so the event
//! lookup and the statistics are computed against the same revision.

pub mod correlator;
pub mod error;

pub use correlator::{nearest_event, EventCorrelator, EventMatch};
pub use error::CorrelatorError;
