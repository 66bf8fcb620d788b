//! # Breakpoint Query Façade
//!
//! The single entry point the outer surfaces (HTTP server, CLI) talk to.
//!
//! ## Architectural Principles
//!
//! - **Validate at the edge:** raw request values (ISO date strings, paging
//!   parameters) are checked here and rejected with `QueryError::Validation` before
//!   any analytics run.
//! - **One revision per answer:** every query reads exactly one `SeriesSnapshot`
//!   and tags its result with that snapshot's `Revision`.
//! - **Memoize the common case:** change points for the default parameters are
//!   computed once per revision and reused until the next load.

pub mod error;
pub mod facade;
pub mod requests;

pub use error::QueryError;
pub use facade::QueryFacade;
pub use requests::{AnalyzeRequest, ChangePointQuery, DEFAULT_PAGE_SIZE, parse_iso_date};
