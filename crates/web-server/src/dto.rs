//! The JSON shapes the dashboard consumes.
//!
//! Field names are part of the contract (`Date`/`Price` for prices,
//! `Event`/`Date`/`Description`/`Category` for events), so the wire types are kept
//! separate from the core types they are built from.

use chrono::NaiveDate;
use core_types::{ChangePoint, Event, EventCategory, PeriodStats, PricePoint, Revision};
use correlator::EventMatch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDto {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Price")]
    pub price: f64,
}

impl From<&PricePoint> for PriceDto {
    fn from(point: &PricePoint) -> Self {
        Self {
            date: point.date,
            price: point.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDto {
    #[serde(rename = "Event")]
    pub name: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Category")]
    pub category: EventCategory,
}

impl From<&Event> for EventDto {
    fn from(event: &Event) -> Self {
        Self {
            name: event.name.clone(),
            date: event.date,
            description: event.description.clone(),
            category: event.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePointDto {
    pub date: NaiveDate,
    pub mean_before: f64,
    pub mean_after: f64,
    pub pct_change: f64,
    pub confidence: f64,
}

impl From<ChangePoint> for ChangePointDto {
    fn from(cp: ChangePoint) -> Self {
        Self {
            date: cp.date,
            mean_before: cp.mean_before,
            mean_after: cp.mean_after,
            pct_change: cp.pct_change,
            confidence: cp.confidence,
        }
    }
}

/// Description reported for a change point with no event nearby.
pub const NO_EVENT_DESCRIPTION: &str = "No event found within window";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePointEventDto {
    pub date: NaiveDate,
    pub confidence: f64,
    pub matched_event: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub description: String,
}

impl From<EventMatch> for ChangePointEventDto {
    fn from(matched: EventMatch) -> Self {
        let EventMatch {
            change_point,
            event,
        } = matched;
        match event {
            Some(event) => Self {
                date: change_point.date,
                confidence: change_point.confidence,
                matched_event: Some(event.name),
                event_date: Some(event.date),
                description: event.description,
            },
            None => Self {
                date: change_point.date,
                confidence: change_point.confidence,
                matched_event: None,
                event_date: None,
                description: NO_EVENT_DESCRIPTION.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub price_change: f64,
    pub pct_change: f64,
    pub volatility: f64,
    pub start_price: f64,
    pub end_price: f64,
}

impl From<PeriodStats> for AnalyzeResponse {
    fn from(stats: PeriodStats) -> Self {
        Self {
            price_change: stats.price_change,
            pct_change: stats.pct_change,
            volatility: stats.volatility,
            start_price: stats.start_price,
            end_price: stats.end_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub revision: Revision,
    pub points: usize,
}

/// Optional month offsets for `GET /api/events/:name/impact`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ImpactQuery {
    pub before_months: Option<u32>,
    pub after_months: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_uses_capitalized_keys() {
        let point = PricePoint::new(NaiveDate::from_ymd_opt(1987, 5, 20).unwrap(), 18.63);
        let value = serde_json::to_value(PriceDto::from(&point)).unwrap();
        assert_eq!(value, json!({ "Date": "1987-05-20", "Price": 18.63 }));
    }

    #[test]
    fn unmatched_change_point_has_null_event() {
        let cp = ChangePoint::new(NaiveDate::from_ymd_opt(2020, 3, 9).unwrap(), 1.0, 50.0, 30.0);
        let dto = ChangePointEventDto::from(EventMatch {
            change_point: cp,
            event: None,
        });
        let value = serde_json::to_value(dto).unwrap();
        assert_eq!(value["matched_event"], serde_json::Value::Null);
        assert_eq!(value["description"], NO_EVENT_DESCRIPTION);
    }
}
