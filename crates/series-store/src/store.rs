use crate::error::StoreError;
use arc_swap::ArcSwap;
use chrono::NaiveDate;
use core_types::{Event, PricePoint, Revision};
use std::collections::HashSet;
use std::sync::Arc;

/// One immutable revision of the canonical data.
///
/// Queries hold an `Arc<SeriesSnapshot>` for their whole duration, so a concurrent
/// reload can never expose a half-updated series to them.
#[derive(Debug, Clone)]
pub struct SeriesSnapshot {
    revision: Revision,
    prices: Arc<[PricePoint]>,
    events: Arc<[Event]>,
}

impl SeriesSnapshot {
    fn empty() -> Self {
        Self {
            revision: Revision::INITIAL,
            prices: Arc::from(Vec::<PricePoint>::new()),
            events: Arc::from(Vec::<Event>::new()),
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The price series, ascending by date with unique dates.
    pub fn prices(&self) -> &Arc<[PricePoint]> {
        &self.prices
    }

    /// The event catalog, ascending by date.
    pub fn events(&self) -> &Arc<[Event]> {
        &self.events
    }

    pub fn find_event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.name == name)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.prices.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.prices.last().map(|p| p.date)
    }
}

/// The process-wide owner of the price series and event catalog.
///
/// Reads are a single atomic load. Writes validate a complete batch first and then
/// publish a new snapshot with one atomic swap; a rejected batch leaves the current
/// revision untouched.
#[derive(Debug)]
pub struct SeriesStore {
    current: ArcSwap<SeriesSnapshot>,
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesStore {
    /// Creates a store holding the empty revision `0`.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(SeriesSnapshot::empty()),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<SeriesSnapshot> {
        self.current.load_full()
    }

    pub fn revision(&self) -> Revision {
        self.current.load().revision
    }

    /// Returns the current price series together with its revision.
    pub fn current_series(&self) -> (Revision, Arc<[PricePoint]>) {
        let snapshot = self.current.load();
        (snapshot.revision, Arc::clone(&snapshot.prices))
    }

    /// Returns the event catalog of the current revision.
    pub fn events(&self) -> Arc<[Event]> {
        Arc::clone(&self.current.load().events)
    }

    /// Replaces the price series, keeping the event catalog.
    pub fn load(&self, points: Vec<PricePoint>) -> Result<Revision, StoreError> {
        validate_points(&points)?;
        let count = points.len();
        let revision = self.commit(Some(Arc::from(points)), None);
        let snapshot = self.current.load();
        tracing::info!(
            %revision,
            points = count,
            first = ?snapshot.first_date(),
            last = ?snapshot.last_date(),
            "Loaded price series."
        );
        Ok(revision)
    }

    /// Replaces the event catalog, keeping the price series.
    pub fn load_events(&self, events: Vec<Event>) -> Result<Revision, StoreError> {
        let events = prepare_events(events)?;
        let count = events.len();
        let revision = self.commit(None, Some(Arc::from(events)));
        tracing::info!(%revision, events = count, "Loaded event catalog.");
        Ok(revision)
    }

    /// Replaces both the price series and the event catalog in one revision.
    pub fn replace(
        &self,
        points: Vec<PricePoint>,
        events: Vec<Event>,
    ) -> Result<Revision, StoreError> {
        validate_points(&points)?;
        let events = prepare_events(events)?;
        let (point_count, event_count) = (points.len(), events.len());
        let revision = self.commit(Some(Arc::from(points)), Some(Arc::from(events)));
        tracing::info!(
            %revision,
            points = point_count,
            events = event_count,
            "Replaced dataset."
        );
        Ok(revision)
    }

    /// Publishes a new snapshot built on top of whatever is current at swap time.
    ///
    /// `rcu` retries the closure if another writer swapped in between, so concurrent
    /// loads still receive distinct, consecutive revisions.
    fn commit(
        &self,
        prices: Option<Arc<[PricePoint]>>,
        events: Option<Arc<[Event]>>,
    ) -> Revision {
        let previous = self.current.rcu(|current| SeriesSnapshot {
            revision: current.revision.next(),
            prices: prices.clone().unwrap_or_else(|| Arc::clone(&current.prices)),
            events: events.clone().unwrap_or_else(|| Arc::clone(&current.events)),
        });
        previous.revision.next()
    }
}

fn validate_points(points: &[PricePoint]) -> Result<(), StoreError> {
    if let Some(bad) = points
        .iter()
        .find(|p| !p.price.is_finite() || p.price <= 0.0)
    {
        return Err(StoreError::InvalidData(format!(
            "price on {} must be positive and finite, got {}",
            bad.date, bad.price
        )));
    }

    if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(StoreError::InvalidData(format!(
            "dates must be strictly ascending: {} follows {}",
            pair[1].date, pair[0].date
        )));
    }

    Ok(())
}

fn prepare_events(mut events: Vec<Event>) -> Result<Vec<Event>, StoreError> {
    {
        let mut seen = HashSet::with_capacity(events.len());
        for event in &events {
            if event.name.trim().is_empty() {
                return Err(StoreError::InvalidData(format!(
                    "event on {} has an empty name",
                    event.date
                )));
            }
            if !seen.insert(event.name.as_str()) {
                return Err(StoreError::InvalidData(format!(
                    "duplicate event name '{}'",
                    event.name
                )));
            }
        }
    }

    events.sort_by_key(|event| event.date);
    Ok(events)
}
