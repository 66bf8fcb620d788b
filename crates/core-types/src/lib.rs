//! # Breakpoint Core Types
//!
//! The shared vocabulary of the workspace: observations, catalog events and the
//! derived results (change points, period statistics) the analytics layer produces.
//! This is a Layer 0 crate; it depends on nothing else in the workspace.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::EventCategory;
pub use error::CoreError;
pub use structs::{ChangePoint, Event, PeriodStats, PricePoint, Revision, Revisioned};
