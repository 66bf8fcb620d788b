use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of real-world occurrence an `Event` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Geopolitical,
    Economic,
    Policy,
    NaturalDisaster,
    Other,
}

impl EventCategory {
    /// Returns the canonical name used on the wire and in CSV files.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Geopolitical => "Geopolitical",
            EventCategory::Economic => "Economic",
            EventCategory::Policy => "Policy",
            EventCategory::NaturalDisaster => "NaturalDisaster",
            EventCategory::Other => "Other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = CoreError;

    /// Parses a category leniently: case, spaces, dashes and underscores are ignored,
    /// so "Natural Disaster", "natural_disaster" and "NaturalDisaster" all match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "geopolitical" => Ok(EventCategory::Geopolitical),
            "economic" => Ok(EventCategory::Economic),
            "policy" => Ok(EventCategory::Policy),
            "naturaldisaster" => Ok(EventCategory::NaturalDisaster),
            "other" => Ok(EventCategory::Other),
            _ => Err(CoreError::InvalidInput(
                "event category".to_string(),
                s.to_string(),
            )),
        }
    }
}
