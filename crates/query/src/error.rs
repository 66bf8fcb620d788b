use analytics::AnalyticsError;
use correlator::CorrelatorError;
use series_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Correlator(#[from] CorrelatorError),
}
