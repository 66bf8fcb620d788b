//! Change-point detection.
//!
//! Callers depend on the `Detector` trait only; concrete strategies are built by
//! [`create_detector`] from configuration, so a different algorithm can be plugged
//! in without touching the query layer.

mod binary_segmentation;

pub use binary_segmentation::BinarySegmentation;

use crate::error::AnalyticsError;
use configuration::{DetectionSettings, DetectorKind};
use core_types::{ChangePoint, PricePoint};
use serde::{Deserialize, Serialize};

/// The capability every change-point strategy implements.
///
/// The `Send + Sync` bounds allow one detector instance to serve concurrent
/// requests from the web server.
pub trait Detector: Send + Sync {
    /// A short, stable identifier of the strategy (used in logs).
    fn name(&self) -> &'static str;

    /// Scans `series` for shifts in its local mean.
    ///
    /// # Arguments
    ///
    /// * `series` - Observations ascending by date.
    /// * `params` - Bounds on the search and a confidence floor.
    ///
    /// # Returns
    ///
    /// The detected change points ascending by date. A series too short to hold
    /// two minimum-length segments yields an empty list, not an error.
    fn detect(
        &self,
        series: &[PricePoint],
        params: &DetectionParams,
    ) -> Result<Vec<ChangePoint>, AnalyticsError>;
}

/// Per-request knobs of a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Upper bound on the number of change points. `None` means unbounded.
    pub max_points: Option<usize>,
    /// Candidates with a lower confidence are discarded.
    pub min_confidence: f64,
    /// Minimum number of observations on each side of a break.
    pub min_segment_length: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            max_points: None,
            min_confidence: 0.0,
            min_segment_length: 5,
        }
    }
}

impl DetectionParams {
    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self {
            max_points: settings.max_points,
            min_confidence: settings.min_confidence,
            min_segment_length: settings.min_segment_length,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.max_points == Some(0) {
            return Err(AnalyticsError::InvalidParameters(
                "max_points must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(AnalyticsError::InvalidParameters(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.min_segment_length < 2 {
            return Err(AnalyticsError::InvalidParameters(format!(
                "min_segment_length must be at least 2, got {}",
                self.min_segment_length
            )));
        }
        Ok(())
    }
}

/// Creates the detector selected in the configuration.
pub fn create_detector(settings: &DetectionSettings) -> Result<Box<dyn Detector>, AnalyticsError> {
    match settings.detector {
        DetectorKind::BinarySegmentation => {
            Ok(Box::new(BinarySegmentation::new(settings.significance)?))
        }
    }
}
