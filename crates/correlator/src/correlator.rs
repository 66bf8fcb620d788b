use crate::error::CorrelatorError;
use analytics::AnalyticsEngine;
use chrono::{Months, NaiveDate};
use configuration::CorrelationSettings;
use core_types::{ChangePoint, Event, PeriodStats};
use serde::Serialize;
use series_store::SeriesSnapshot;

/// A change point paired with the catalog event it is attributed to, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventMatch {
    pub change_point: ChangePoint,
    pub event: Option<Event>,
}

/// Maps events to date windows and delegates their statistics to the engine.
#[derive(Debug, Clone)]
pub struct EventCorrelator {
    engine: AnalyticsEngine,
    before_months: u32,
    after_months: u32,
    match_window_days: u32,
}

impl EventCorrelator {
    pub fn new(engine: AnalyticsEngine, settings: &CorrelationSettings) -> Self {
        Self {
            engine,
            before_months: settings.window_before_months,
            after_months: settings.window_after_months,
            match_window_days: settings.match_window_days,
        }
    }

    pub fn engine(&self) -> &AnalyticsEngine {
        &self.engine
    }

    /// The configured `(before, after)` window in months.
    pub fn default_window(&self) -> (u32, u32) {
        (self.before_months, self.after_months)
    }

    /// The inclusive window `[date - before, date + after]` in calendar months.
    ///
    /// Month arithmetic clamps to the last day of the target month, so an event on
    /// 2020-05-31 with a three-month lead starts on 2020-02-29.
    pub fn window_for(
        &self,
        event: &Event,
        before_months: u32,
        after_months: u32,
    ) -> Result<(NaiveDate, NaiveDate), CorrelatorError> {
        let out_of_range = || CorrelatorError::WindowOutOfRange {
            name: event.name.clone(),
            date: event.date,
        };
        let start = event
            .date
            .checked_sub_months(Months::new(before_months))
            .ok_or_else(out_of_range)?;
        let end = event
            .date
            .checked_add_months(Months::new(after_months))
            .ok_or_else(out_of_range)?;
        Ok((start, end))
    }

    /// Period statistics of the default window around the named event.
    pub fn correlate(
        &self,
        snapshot: &SeriesSnapshot,
        name: &str,
    ) -> Result<PeriodStats, CorrelatorError> {
        self.correlate_with(snapshot, name, self.before_months, self.after_months)
    }

    /// Period statistics of a custom window around the named event.
    ///
    /// # Returns
    ///
    /// `CorrelatorError::UnknownEvent` when the snapshot's catalog has no event with
    /// that name, otherwise whatever the engine returns for the window.
    pub fn correlate_with(
        &self,
        snapshot: &SeriesSnapshot,
        name: &str,
        before_months: u32,
        after_months: u32,
    ) -> Result<PeriodStats, CorrelatorError> {
        let event = snapshot
            .find_event(name)
            .ok_or_else(|| CorrelatorError::UnknownEvent(name.to_string()))?;
        let (start, end) = self.window_for(event, before_months, after_months)?;

        tracing::debug!(
            event = %event.name,
            %start,
            %end,
            revision = %snapshot.revision(),
            "Correlating event window."
        );

        Ok(self.engine.period_stats(snapshot.prices(), start, end)?)
    }

    /// Attributes `change_point` to the nearest event within the configured window.
    pub fn match_change_point(&self, events: &[Event], change_point: ChangePoint) -> EventMatch {
        EventMatch {
            change_point,
            event: nearest_event(events, change_point.date, self.match_window_days).cloned(),
        }
    }
}

/// The event closest to `date` that is at most `window_days` away.
///
/// When two events are equally close the earlier one wins.
pub fn nearest_event(events: &[Event], date: NaiveDate, window_days: u32) -> Option<&Event> {
    events
        .iter()
        .map(|event| ((event.date - date).num_days().unsigned_abs(), event))
        .filter(|(distance, _)| *distance <= u64::from(window_days))
        .min_by_key(|(distance, event)| (*distance, event.date))
        .map(|(_, event)| event)
}
