//! # Breakpoint Data Loader
//!
//! Reads the price series and the event catalog from CSV.
//!
//! The loader is an adapter: it only turns rows into `PricePoint`s and `Event`s.
//! Validation of the resulting series (positive prices, ascending unique dates) is
//! the series store's job; the loader can optionally normalize the input first so
//! that unsorted or duplicated files still load.
//!
//! Accepted headers are those of the public Brent dataset (`Date,Price`) and of
//! the event catalog (`Event,Date,Description,Category`, or the older
//! `Event_name,Event_date,...` layout). Dates may be ISO (`2020-04-20`),
//! `20-Apr-20` or `Apr 20, 2020`.

pub mod error;
pub mod loader;

pub use error::LoaderError;
pub use loader::{
    Dataset, LoaderOptions, load_dataset, load_events, load_prices, normalize_events,
    normalize_prices, parse_date, read_events, read_prices,
};
