use analytics::AnalyticsError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrelatorError {
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    #[error("Window around event '{name}' on {date} is outside the supported calendar")]
    WindowOutOfRange { name: String, date: NaiveDate },

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}
