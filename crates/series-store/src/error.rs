use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
