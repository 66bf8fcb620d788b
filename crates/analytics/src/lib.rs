//! # Breakpoint Analytics
//!
//! The quantitative core: change-point detection over a price series and summary
//! statistics over a date range.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of storage,
//!   HTTP or files. It depends only on `core-types` and `configuration`.
//! - **Stateless Calculation:** `AnalyticsEngine` and every `Detector` are stateless
//!   calculators. They take a borrowed series and return owned results, so the same
//!   instance can serve concurrent requests.
//! - **Pluggable detection:** callers program against the `Detector` trait and obtain
//!   an implementation through `create_detector`.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: period statistics (price change, percent change, volatility).
//! - `Detector`, `DetectionParams`, `create_detector`: change-point detection.
//! - `BinarySegmentation`: the default detection strategy.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

pub mod detector;
pub mod engine;
pub mod error;

pub use detector::{create_detector, BinarySegmentation, DetectionParams, Detector};
pub use engine::{slice_range, AnalyticsEngine};
pub use error::AnalyticsError;
