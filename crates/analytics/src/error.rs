use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid range: start date {start} is after end date {end}")]
    Range { start: NaiveDate, end: NaiveDate },

    #[error("No data for selected period {start} to {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid detection parameters: {0}")]
    InvalidParameters(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
