use crate::error::AnalyticsError;
use chrono::NaiveDate;
use configuration::{AnalysisSettings, AnnualizationBasis, ReturnKind};
use core_types::{PeriodStats, PricePoint};

/// A stateless calculator for period statistics over a price series.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEngine {
    annualization: AnnualizationBasis,
    returns: ReturnKind,
}

impl AnalyticsEngine {
    pub fn new(settings: &AnalysisSettings) -> Self {
        Self {
            annualization: settings.annualization,
            returns: settings.returns,
        }
    }

    /// Computes the change and annualized volatility of `series` over `[start, end]`.
    ///
    /// # Arguments
    ///
    /// * `series` - Observations ascending by date. Gaps are allowed.
    /// * `start`, `end` - Inclusive bounds. They need not coincide with observation
    ///   dates; the first and last observations inside the range are used.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PeriodStats`, `AnalyticsError::Range` when
    /// `start > end`, or `AnalyticsError::EmptyRange` when no observation falls
    /// inside the range.
    pub fn period_stats(
        &self,
        series: &[PricePoint],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodStats, AnalyticsError> {
        if start > end {
            return Err(AnalyticsError::Range { start, end });
        }

        let window = slice_range(series, start, end);
        let (first, last) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(AnalyticsError::EmptyRange { start, end }),
        };

        let price_change = last.price - first.price;
        let pct_change = price_change / first.price * 100.0;
        let volatility = self.annualized_volatility(window);

        tracing::debug!(
            %start,
            %end,
            observations = window.len(),
            price_change,
            volatility,
            "Computed period statistics."
        );

        Ok(PeriodStats {
            start_date: start,
            end_date: end,
            start_price: first.price,
            end_price: last.price,
            price_change,
            pct_change,
            volatility,
            observations: window.len(),
        })
    }

    /// Sample standard deviation of periodic returns, scaled by the square root of
    /// the number of periods per year. Fewer than two returns yield `0.0`.
    fn annualized_volatility(&self, window: &[PricePoint]) -> f64 {
        let returns = self.periodic_returns(window);
        match sample_std_dev(&returns) {
            Some(std_dev) => std_dev * self.annualization.periods_per_year().sqrt(),
            None => 0.0,
        }
    }

    fn periodic_returns(&self, window: &[PricePoint]) -> Vec<f64> {
        window
            .windows(2)
            .map(|w| match self.returns {
                ReturnKind::Simple => (w[1].price - w[0].price) / w[0].price,
                ReturnKind::Log => (w[1].price / w[0].price).ln(),
            })
            .collect()
    }
}

/// Returns the sub-slice of `series` whose dates fall inside `[start, end]`.
///
/// `series` must be ascending by date.
pub fn slice_range(series: &[PricePoint], start: NaiveDate, end: NaiveDate) -> &[PricePoint] {
    let lo = series.partition_point(|p| p.date < start);
    let hi = series.partition_point(|p| p.date <= end);
    if hi <= lo {
        return &[];
    }
    &series[lo..hi]
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_2022() -> Vec<PricePoint> {
        let prices = [
            78.50, 82.30, 85.10, 83.75, 87.20, 89.50, 86.30, 84.90, 82.10, 85.40, 88.20, 86.75,
        ];
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(date(2022, i as u32 + 1, 1), p))
            .collect()
    }

    #[test]
    fn monthly_sample_range() {
        let engine = AnalyticsEngine::default();
        let stats = engine
            .period_stats(&monthly_2022(), date(2022, 3, 1), date(2022, 7, 1))
            .unwrap();

        assert!((stats.price_change - 1.20).abs() < 1e-9);
        assert!((stats.pct_change - 1.41).abs() < 0.005);
        assert_eq!(stats.start_price, 85.10);
        assert_eq!(stats.end_price, 86.30);
        assert_eq!(stats.observations, 5);
        assert!(stats.volatility > 0.0);
    }

    #[test]
    fn range_bounds_need_not_be_observation_dates() {
        let engine = AnalyticsEngine::default();
        let stats = engine
            .period_stats(&monthly_2022(), date(2022, 2, 15), date(2022, 6, 20))
            .unwrap();

        // First in-range observation is 2022-03-01, last is 2022-06-01.
        assert_eq!(stats.start_price, 85.10);
        assert_eq!(stats.end_price, 89.50);
        assert_eq!(stats.start_date, date(2022, 2, 15));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let engine = AnalyticsEngine::default();
        let err = engine
            .period_stats(&monthly_2022(), date(2022, 7, 1), date(2022, 3, 1))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Range { .. }));
    }

    #[test]
    fn range_without_observations_is_empty() {
        let engine = AnalyticsEngine::default();
        let err = engine
            .period_stats(&monthly_2022(), date(2022, 3, 2), date(2022, 3, 31))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptyRange { .. }));

        let err = engine
            .period_stats(&[], date(2022, 1, 1), date(2022, 12, 31))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptyRange { .. }));
    }

    #[test]
    fn too_few_returns_give_zero_volatility() {
        let engine = AnalyticsEngine::default();
        let series = monthly_2022();

        let single = engine
            .period_stats(&series, date(2022, 5, 1), date(2022, 5, 1))
            .unwrap();
        assert_eq!(single.volatility, 0.0);
        assert_eq!(single.price_change, 0.0);

        let pair = engine
            .period_stats(&series, date(2022, 5, 1), date(2022, 6, 1))
            .unwrap();
        assert_eq!(pair.volatility, 0.0);
    }

    #[test]
    fn volatility_annualizes_sample_std_dev() {
        let series = vec![
            PricePoint::new(date(2022, 1, 3), 100.0),
            PricePoint::new(date(2022, 1, 4), 110.0),
            PricePoint::new(date(2022, 1, 5), 99.0),
        ];

        // Simple returns are +0.1 and -0.1: mean 0, sample variance 0.02.
        let trading = AnalyticsEngine::default()
            .period_stats(&series, date(2022, 1, 1), date(2022, 1, 31))
            .unwrap();
        assert!((trading.volatility - 0.02f64.sqrt() * 252f64.sqrt()).abs() < 1e-12);

        let calendar = AnalyticsEngine::new(&AnalysisSettings {
            annualization: AnnualizationBasis::CalendarDays,
            returns: ReturnKind::Simple,
        })
        .period_stats(&series, date(2022, 1, 1), date(2022, 1, 31))
        .unwrap();
        assert!((calendar.volatility - 0.02f64.sqrt() * 365f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn log_returns_are_supported() {
        let series = vec![
            PricePoint::new(date(2022, 1, 3), 100.0),
            PricePoint::new(date(2022, 1, 4), 110.0),
            PricePoint::new(date(2022, 1, 5), 99.0),
        ];
        let engine = AnalyticsEngine::new(&AnalysisSettings {
            annualization: AnnualizationBasis::TradingDays,
            returns: ReturnKind::Log,
        });
        let stats = engine
            .period_stats(&series, date(2022, 1, 3), date(2022, 1, 5))
            .unwrap();

        let r1 = 1.1f64.ln();
        let r2 = 0.9f64.ln();
        let mean = (r1 + r2) / 2.0;
        let expected = ((r1 - mean).powi(2) + (r2 - mean).powi(2)).sqrt() * 252f64.sqrt();
        assert!((stats.volatility - expected).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn pct_change_is_price_change_over_first_price(
            prices in prop::collection::vec(1.0f64..500.0, 2..60),
            a in 0usize..60,
            b in 0usize..60,
        ) {
            let series: Vec<PricePoint> = prices
                .iter()
                .enumerate()
                .map(|(i, &p)| PricePoint::new(date(2000, 1, 1) + chrono::Days::new(2 * i as u64), p))
                .collect();
            let (lo, hi) = (a.min(b) % series.len(), a.max(b) % series.len());
            let (lo, hi) = (lo.min(hi), lo.max(hi));
            prop_assume!(hi > lo);

            let stats = AnalyticsEngine::default()
                .period_stats(&series, series[lo].date, series[hi].date)
                .unwrap();

            prop_assert!((stats.price_change - (series[hi].price - series[lo].price)).abs() < 1e-9);
            prop_assert!((stats.pct_change - stats.price_change / series[lo].price * 100.0).abs() < 1e-9);
            prop_assert!(stats.volatility >= 0.0);
            prop_assert_eq!(stats.observations, hi - lo + 1);
        }
    }
}
