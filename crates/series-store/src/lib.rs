//! # Breakpoint Series Store
//!
//! The single owner of the canonical price series and event catalog.
//!
//! ## Architectural Principles
//!
//! - **Immutable snapshots:** every successful load publishes a complete new
//!   `SeriesSnapshot` tagged with the next `Revision`. Nothing is mutated in place.
//! - **Single writer, many readers:** readers take an `Arc` snapshot through
//!   `arc-swap` without locking; writers swap atomically after full validation.
//! - **Explicit handle:** the store is created by the application and passed by
//!   reference into every query. There is no global instance.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{SeriesSnapshot, SeriesStore};
