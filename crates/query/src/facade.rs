use crate::error::QueryError;
use crate::requests::{AnalyzeRequest, ChangePointQuery};
use analytics::{AnalyticsEngine, DetectionParams, Detector, create_detector};
use arc_swap::ArcSwapOption;
use configuration::Config;
use core_types::{ChangePoint, Event, PeriodStats, PricePoint, Revision, Revisioned};
use correlator::{EventCorrelator, EventMatch};
use series_store::{SeriesSnapshot, SeriesStore};
use std::sync::Arc;

type CachedChangePoints = Revisioned<Vec<ChangePoint>>;

/// Validates requests, dispatches them to the analytics components and tags every
/// answer with the revision it was computed against.
pub struct QueryFacade {
    store: Arc<SeriesStore>,
    detector: Box<dyn Detector>,
    correlator: EventCorrelator,
    default_params: DetectionParams,
    cache: ArcSwapOption<CachedChangePoints>,
}

impl QueryFacade {
    pub fn new(store: Arc<SeriesStore>, detector: Box<dyn Detector>, config: &Config) -> Self {
        let engine = AnalyticsEngine::new(&config.analysis);
        Self {
            store,
            detector,
            correlator: EventCorrelator::new(engine, &config.correlation),
            default_params: DetectionParams::from_settings(&config.detection),
            cache: ArcSwapOption::empty(),
        }
    }

    /// Builds a façade with the detector selected in `config`.
    pub fn from_config(store: Arc<SeriesStore>, config: &Config) -> Result<Self, QueryError> {
        let detector = create_detector(&config.detection)?;
        tracing::info!(detector = detector.name(), "Created change-point detector.");
        Ok(Self::new(store, detector, config))
    }

    pub fn store(&self) -> &Arc<SeriesStore> {
        &self.store
    }

    pub fn prices(&self) -> Revisioned<Arc<[PricePoint]>> {
        let (revision, prices) = self.store.current_series();
        Revisioned::new(revision, prices)
    }

    pub fn events(&self) -> Revisioned<Arc<[Event]>> {
        let snapshot = self.store.snapshot();
        Revisioned::new(snapshot.revision(), Arc::clone(snapshot.events()))
    }

    /// Change points of the current series, optionally paged or re-detected with
    /// custom parameters.
    pub fn change_points(
        &self,
        query: &ChangePointQuery,
    ) -> Result<Revisioned<Vec<ChangePoint>>, QueryError> {
        let snapshot = self.store.snapshot();
        let points = self.detect_page(&snapshot, query)?;
        Ok(Revisioned::new(snapshot.revision(), points))
    }

    /// Change points paired with the nearest catalog event of the same revision.
    pub fn change_point_matches(
        &self,
        query: &ChangePointQuery,
    ) -> Result<Revisioned<Vec<EventMatch>>, QueryError> {
        let snapshot = self.store.snapshot();
        let matches = self
            .detect_page(&snapshot, query)?
            .into_iter()
            .map(|cp| self.correlator.match_change_point(snapshot.events(), cp))
            .collect();
        Ok(Revisioned::new(snapshot.revision(), matches))
    }

    /// Period statistics for an explicit range or for the window around an event.
    ///
    /// When `request.event` names an event the dates are ignored.
    pub fn analyze(&self, request: &AnalyzeRequest) -> Result<Revisioned<PeriodStats>, QueryError> {
        let snapshot = self.store.snapshot();

        let stats = match request.event_name() {
            Some(name) => self.correlator.correlate(&snapshot, name)?,
            None => {
                let (start, end) = request.date_range()?;
                self.correlator
                    .engine()
                    .period_stats(snapshot.prices(), start, end)?
            }
        };

        Ok(Revisioned::new(snapshot.revision(), stats))
    }

    /// Period statistics of the window around `name`, with optional custom offsets.
    pub fn event_impact(
        &self,
        name: &str,
        before_months: Option<u32>,
        after_months: Option<u32>,
    ) -> Result<Revisioned<PeriodStats>, QueryError> {
        let snapshot = self.store.snapshot();
        let stats = match (before_months, after_months) {
            (None, None) => self.correlator.correlate(&snapshot, name)?,
            (before, after) => {
                let defaults = self.correlator.default_window();
                self.correlator.correlate_with(
                    &snapshot,
                    name,
                    before.unwrap_or(defaults.0),
                    after.unwrap_or(defaults.1),
                )?
            }
        };
        Ok(Revisioned::new(snapshot.revision(), stats))
    }

    /// Replaces the price series. Memoized change points are dropped.
    pub fn load_prices(&self, points: Vec<PricePoint>) -> Result<Revision, QueryError> {
        let revision = self.store.load(points)?;
        self.cache.store(None);
        Ok(revision)
    }

    /// Replaces the price series and the event catalog in one revision.
    pub fn load_dataset(
        &self,
        points: Vec<PricePoint>,
        events: Vec<Event>,
    ) -> Result<Revision, QueryError> {
        let revision = self.store.replace(points, events)?;
        self.cache.store(None);
        Ok(revision)
    }

    fn detect_page(
        &self,
        snapshot: &SeriesSnapshot,
        query: &ChangePointQuery,
    ) -> Result<Vec<ChangePoint>, QueryError> {
        let all = if query.uses_default_detection() {
            self.memoized_change_points(snapshot)?
        } else {
            let params = DetectionParams {
                max_points: query.max_points.or(self.default_params.max_points),
                min_confidence: query
                    .min_confidence
                    .unwrap_or(self.default_params.min_confidence),
                ..self.default_params
            };
            params.validate()?;
            Arc::new(Revisioned::new(
                snapshot.revision(),
                self.detector.detect(snapshot.prices(), &params)?,
            ))
        };

        let range = query.page_range(all.value.len())?;
        Ok(all.value[range].to_vec())
    }

    /// Default-parameter change points for `snapshot`, computed at most once per
    /// revision unless two requests race on a fresh revision.
    fn memoized_change_points(
        &self,
        snapshot: &SeriesSnapshot,
    ) -> Result<Arc<CachedChangePoints>, QueryError> {
        let revision = snapshot.revision();
        if let Some(cached) = self.cache.load_full().filter(|c| c.is_current(revision)) {
            return Ok(cached);
        }

        let points = self.detector.detect(snapshot.prices(), &self.default_params)?;
        tracing::info!(
            %revision,
            detector = self.detector.name(),
            change_points = points.len(),
            "Detected change points."
        );
        let computed = Arc::new(Revisioned::new(revision, points));

        // Never replace a newer revision's result with an older one.
        self.cache.rcu(|current| match current {
            Some(existing) if existing.revision > revision => Some(Arc::clone(existing)),
            _ => Some(Arc::clone(&computed)),
        });

        Ok(computed)
    }
}
