use crate::error::LoaderError;
use chrono::NaiveDate;
use configuration::DataSettings;
use core_types::{Event, EventCategory, PricePoint};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Formats tried, in order, when no explicit date format is configured.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d-%b-%y", "%b %d, %Y", "%d-%b-%Y", "%Y/%m/%d"];

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: String,
    #[serde(alias = "Price", alias = "PRICE", alias = "Close", alias = "close")]
    price: String,
}

#[derive(Debug, Deserialize)]
struct EventRow {
    #[serde(alias = "Event", alias = "event", alias = "Event_name", alias = "Name")]
    name: String,
    #[serde(alias = "Date", alias = "Event_date", alias = "event_date")]
    date: String,
    #[serde(alias = "Description", default)]
    description: String,
    #[serde(alias = "Category", default)]
    category: Option<String>,
}

/// How rows are interpreted.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// An explicit `chrono` format, tried before the built-in ones.
    pub date_format: Option<String>,
    /// Sort by date and drop duplicates instead of leaving them for the store to reject.
    pub normalize: bool,
}

impl LoaderOptions {
    pub fn from_settings(settings: &DataSettings) -> Self {
        Self {
            date_format: settings.date_format.clone(),
            normalize: settings.normalize,
        }
    }
}

/// A price series and event catalog read together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub prices: Vec<PricePoint>,
    pub events: Vec<Event>,
}

/// Loads the price file and, if configured, the event file named in `settings`.
pub fn load_dataset(settings: &DataSettings) -> Result<Dataset, LoaderError> {
    let options = LoaderOptions::from_settings(settings);
    let prices = load_prices(&settings.prices_path, &options)?;
    let events = match &settings.events_path {
        Some(path) => load_events(path, &options)?,
        None => Vec::new(),
    };
    Ok(Dataset { prices, events })
}

pub fn load_prices(path: &Path, options: &LoaderOptions) -> Result<Vec<PricePoint>, LoaderError> {
    info!("Loading prices from: {}", path.display());
    read_prices(open(path)?, options)
}

pub fn load_events(path: &Path, options: &LoaderOptions) -> Result<Vec<Event>, LoaderError> {
    info!("Loading events from: {}", path.display());
    read_events(open(path)?, options)
}

/// Reads `Date,Price` rows. Any malformed row fails the whole read.
pub fn read_prices<R: Read>(
    reader: R,
    options: &LoaderOptions,
) -> Result<Vec<PricePoint>, LoaderError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    // Rejects a non-UTF-8 header even when no rows follow it.
    reader.headers()?;

    let mut points = Vec::new();
    for (index, result) in reader.deserialize::<PriceRow>().enumerate() {
        let line = index as u64 + 2;
        let row = result?;
        let date = parse_date(&row.date, options.date_format.as_deref())
            .ok_or_else(|| parse_error(line, format!("unrecognized date '{}'", row.date)))?;
        let price = row
            .price
            .parse::<f64>()
            .map_err(|_| parse_error(line, format!("invalid price '{}'", row.price)))?;
        points.push(PricePoint::new(date, price));
    }

    if options.normalize {
        points = normalize_prices(points);
    }
    info!(points = points.len(), "Read price series.");
    Ok(points)
}

/// Reads event rows. A missing or unknown category becomes `Other`.
pub fn read_events<R: Read>(reader: R, options: &LoaderOptions) -> Result<Vec<Event>, LoaderError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let mut events = Vec::new();
    for (index, result) in reader.deserialize::<EventRow>().enumerate() {
        let line = index as u64 + 2;
        let row = result?;
        if row.name.is_empty() {
            return Err(parse_error(line, "event name is empty".to_string()));
        }
        let date = parse_date(&row.date, options.date_format.as_deref())
            .ok_or_else(|| parse_error(line, format!("unrecognized date '{}'", row.date)))?;
        let category = match row.category.as_deref().filter(|c| !c.is_empty()) {
            None => EventCategory::Other,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(line, category = raw, "Unknown event category, using Other.");
                EventCategory::Other
            }),
        };
        events.push(Event {
            name: row.name,
            date,
            description: row.description,
            category,
        });
    }

    if options.normalize {
        events = normalize_events(events);
    }
    info!(events = events.len(), "Read event catalog.");
    Ok(events)
}

/// Parses `value` with `format` first, then with each built-in format.
pub fn parse_date(value: &str, format: Option<&str>) -> Option<NaiveDate> {
    format
        .into_iter()
        .chain(DATE_FORMATS)
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// Sorts by date and keeps the first observation of each date.
pub fn normalize_prices(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    let before = points.len();
    points.sort_by_key(|p| p.date);
    points.dedup_by_key(|p| p.date);
    if points.len() < before {
        warn!(dropped = before - points.len(), "Dropped duplicate price dates.");
    }
    points
}

/// Keeps the first event of each name and sorts the catalog by date.
pub fn normalize_events(events: Vec<Event>) -> Vec<Event> {
    let before = events.len();
    let mut seen = HashSet::new();
    let mut unique: Vec<Event> = events
        .into_iter()
        .filter(|event| seen.insert(event.name.clone()))
        .collect();
    if unique.len() < before {
        warn!(dropped = before - unique.len(), "Dropped duplicate event names.");
    }
    unique.sort_by_key(|event| event.date);
    unique
}

fn open(path: &Path) -> Result<File, LoaderError> {
    File::open(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_error(line: u64, message: String) -> LoaderError {
    LoaderError::Parse { line, message }
}
