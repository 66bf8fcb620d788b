use crate::error::QueryError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Page size used when a page number is given without a limit.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Parameters of a change-point listing.
///
/// Without `page` and `limit` the whole list is returned. `max_points` and
/// `min_confidence` override the configured detection parameters for this call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangePointQuery {
    /// 1-based page number.
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub max_points: Option<usize>,
    pub min_confidence: Option<f64>,
}

impl ChangePointQuery {
    /// Whether the detection itself runs with the configured defaults.
    pub fn uses_default_detection(&self) -> bool {
        self.max_points.is_none() && self.min_confidence.is_none()
    }

    /// The index range of a list of `len` items this query selects.
    pub fn page_range(&self, len: usize) -> Result<Range<usize>, QueryError> {
        if self.page.is_none() && self.limit.is_none() {
            return Ok(0..len);
        }

        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(QueryError::Validation("page must be at least 1".to_string()));
        }
        if limit == 0 {
            return Err(QueryError::Validation("limit must be at least 1".to_string()));
        }

        let start = (page - 1).saturating_mul(limit).min(len);
        let end = start.saturating_add(limit).min(len);
        Ok(start..end)
    }
}

/// A period-statistics request: either an explicit range or an event name.
///
/// Dates arrive as raw strings so that malformed values surface as a validation
/// error of this request rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub event: Option<String>,
}

impl AnalyzeRequest {
    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_date: Some(start.into()),
            end_date: Some(end.into()),
            event: None,
        }
    }

    pub fn for_event(name: impl Into<String>) -> Self {
        Self {
            event: Some(name.into()),
            ..Default::default()
        }
    }

    /// The event name, if one was given and is not blank.
    pub fn event_name(&self) -> Option<&str> {
        self.event
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Parses both dates, which must be present.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), QueryError> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(start), Some(end)) => {
                Ok((parse_iso_date("start_date", start)?, parse_iso_date("end_date", end)?))
            }
            _ => Err(QueryError::Validation(
                "start_date and end_date are required unless an event is given".to_string(),
            )),
        }
    }
}

/// Parses a strict `YYYY-MM-DD` date.
///
/// Unpadded months or days, other separators and trailing text are rejected, as
/// are impossible calendar dates such as `2021-02-30`.
pub fn parse_iso_date(field: &str, value: &str) -> Result<NaiveDate, QueryError> {
    let invalid = || {
        QueryError::Validation(format!(
            "{field} must be a date formatted as YYYY-MM-DD, got '{value}'"
        ))
    };

    let well_formed = value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}
