use super::{DetectionParams, Detector};
use crate::error::AnalyticsError;
use core_types::{ChangePoint, PricePoint};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::cmp::Ordering;

/// Variances below this fraction of the squared price level are treated as zero.
const ZERO_VARIANCE: f64 = 1e-18;

/// Candidate counts above this are not penalized further by the Šidák correction.
const MAX_ADJUSTED_CANDIDATES: usize = 1000;

/// Greedy binary segmentation on a two-sample mean-shift t-test.
///
/// Each segment is scanned for the split that maximizes the pooled-variance t
/// statistic between its two sides. The split is committed if its confidence
/// reaches `significance`, the segment is cut in two, and both halves are
/// rescanned until no segment holds an eligible split. This finds multiple breaks
/// without a global optimization, but it is an approximation: a
/// penalized-likelihood optimum over all segmentations is not guaranteed.
///
/// Confidence is the Šidák-adjusted two-sided p-value of the best split,
/// `(1 - p)^K` for `K` candidate positions in the segment (at most
/// `MAX_ADJUSTED_CANDIDATES`). A t statistic of 5 therefore clears the default
/// significance at any series length.
///
/// `max_points` keeps the most confident breaks; equal confidence goes to the
/// earlier date.
#[derive(Debug, Clone, Copy)]
pub struct BinarySegmentation {
    significance: f64,
}

impl Default for BinarySegmentation {
    fn default() -> Self {
        Self {
            significance: Self::DEFAULT_SIGNIFICANCE,
        }
    }
}

impl BinarySegmentation {
    pub const DEFAULT_SIGNIFICANCE: f64 = 0.99;

    /// Creates a detector that only splits at candidates whose confidence reaches
    /// `significance`, which must lie in `(0, 1]`.
    pub fn new(significance: f64) -> Result<Self, AnalyticsError> {
        if !(significance > 0.0 && significance <= 1.0) {
            return Err(AnalyticsError::InvalidParameters(format!(
                "significance must be in (0, 1], got {significance}"
            )));
        }
        Ok(Self { significance })
    }

    pub fn significance(&self) -> f64 {
        self.significance
    }
}

impl Detector for BinarySegmentation {
    fn name(&self) -> &'static str {
        "binary_segmentation"
    }

    fn detect(
        &self,
        series: &[PricePoint],
        params: &DetectionParams,
    ) -> Result<Vec<ChangePoint>, AnalyticsError> {
        params.validate()?;

        let min_len = params.min_segment_length;
        if series.len() < 2 * min_len {
            return Ok(Vec::new());
        }

        let prices: Vec<f64> = series.iter().map(|p| p.price).collect();
        let floor = self.significance.max(params.min_confidence);

        let mut pending = vec![(0, prices.len())];
        let mut committed: Vec<Candidate> = Vec::new();

        while let Some((start, end)) = pending.pop() {
            let Some(candidate) = scan(&prices, start, end, min_len)? else {
                continue;
            };
            if candidate.confidence < floor {
                continue;
            }

            tracing::debug!(
                detector = self.name(),
                date = %series[candidate.index].date,
                confidence = candidate.confidence,
                statistic = candidate.statistic,
                "Committed change point."
            );

            pending.push((start, candidate.index));
            pending.push((candidate.index, end));
            committed.push(candidate);
        }

        if let Some(limit) = params.max_points {
            committed.sort_by(Candidate::rank);
            committed.truncate(limit);
        }

        committed.sort_by_key(|c| c.index);
        Ok(committed
            .into_iter()
            .map(|c| {
                ChangePoint::new(
                    series[c.index].date,
                    c.confidence,
                    c.mean_before,
                    c.mean_after,
                )
            })
            .collect())
    }
}

/// A potential break at `index`: the first observation of the "after" side.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    statistic: f64,
    confidence: f64,
    mean_before: f64,
    mean_after: f64,
}

impl Candidate {
    /// Most confident first; equal confidence goes to the earlier date.
    fn rank(a: &Candidate, b: &Candidate) -> Ordering {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.index.cmp(&b.index))
    }
}

/// Finds the split of `[start, end)` with the largest t statistic, keeping at
/// least `min_len` observations on each side.
fn scan(
    prices: &[f64],
    start: usize,
    end: usize,
    min_len: usize,
) -> Result<Option<Candidate>, AnalyticsError> {
    let len = end - start;
    if len < 2 * min_len {
        return Ok(None);
    }

    let values = &prices[start..end];
    // Sums are taken over deviations from the first value to limit cancellation.
    let origin = values[0];
    let scale = origin.abs().max(1.0);
    let (total, total_sq) = values.iter().fold((0.0, 0.0), |(sum, sq), &x| {
        let d = x - origin;
        (sum + d, sq + d * d)
    });

    let mut left = 0.0;
    let mut left_sq = 0.0;
    // (split offset, statistic, mean_before, mean_after), means relative to origin.
    let mut best: Option<(usize, f64, f64, f64)> = None;

    for split in 1..=(len - min_len) {
        let d = values[split - 1] - origin;
        left += d;
        left_sq += d * d;
        if split < min_len {
            continue;
        }

        let n_before = split as f64;
        let n_after = (len - split) as f64;
        let right = total - left;
        let right_sq = total_sq - left_sq;

        let mean_before = left / n_before;
        let mean_after = right / n_after;
        let ss_before = (left_sq - left * left / n_before).max(0.0);
        let ss_after = (right_sq - right * right / n_after).max(0.0);
        let pooled = (ss_before + ss_after) / (n_before + n_after - 2.0);

        let statistic = t_statistic(mean_after - mean_before, pooled, n_before, n_after, scale);
        let improves = match best {
            Some((_, current, _, _)) => statistic > current,
            None => true,
        };
        if improves {
            best = Some((split, statistic, mean_before, mean_after));
        }
    }

    let Some((split, statistic, mean_before, mean_after)) = best else {
        return Ok(None);
    };

    let candidates = len - 2 * min_len + 1;
    let confidence = confidence(statistic, (len - 2) as f64, candidates)?;

    Ok(Some(Candidate {
        index: start + split,
        statistic,
        confidence,
        mean_before: origin + mean_before,
        mean_after: origin + mean_after,
    }))
}

/// Pooled two-sample t statistic `|Δmean| / (s_p · sqrt(1/n_a + 1/n_b))`.
///
/// With zero pooled variance the statistic is `0` for equal means (a flat series
/// has no break) and `+∞` for different means (a noise-free step).
fn t_statistic(diff: f64, pooled: f64, n_before: f64, n_after: f64, scale: f64) -> f64 {
    let diff = diff.abs();
    if pooled <= ZERO_VARIANCE * scale * scale {
        return if diff <= ZERO_VARIANCE.sqrt() * scale {
            0.0
        } else {
            f64::INFINITY
        };
    }
    diff / (pooled * (1.0 / n_before + 1.0 / n_after)).sqrt()
}

/// Maps a statistic to `[0, 1]`: `(1 - p)^K` with `p` the two-sided Student-t
/// tail probability at `freedom` degrees of freedom and `K` the candidate count,
/// capped at `MAX_ADJUSTED_CANDIDATES`.
fn confidence(statistic: f64, freedom: f64, candidates: usize) -> Result<f64, AnalyticsError> {
    if statistic <= 0.0 || statistic.is_nan() {
        return Ok(0.0);
    }
    if statistic.is_infinite() {
        return Ok(1.0);
    }

    let dist = StudentsT::new(0.0, 1.0, freedom)
        .map_err(|e| AnalyticsError::Calculation(e.to_string()))?;
    let p = (2.0 * dist.sf(statistic)).clamp(0.0, 1.0);
    let penalty = candidates.min(MAX_ADJUSTED_CANDIDATES) as f64;
    let adjusted = (penalty * (-p).ln_1p()).exp();
    Ok(adjusted.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Deterministic uniform noise in `[-0.5, 0.5)` from a 64-bit LCG.
    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
            })
            .collect()
    }

    fn daily(prices: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(start + chrono::Days::new(i as u64), p))
            .collect()
    }

    fn detect(prices: &[f64], params: DetectionParams) -> Vec<ChangePoint> {
        BinarySegmentation::default()
            .detect(&daily(prices), &params)
            .unwrap()
    }

    #[test]
    fn single_shift_is_found_at_its_date() {
        let prices: Vec<f64> = noise(42, 100)
            .iter()
            .enumerate()
            .map(|(i, x)| 50.0 + x + if i >= 40 { 2.0 } else { 0.0 })
            .collect();
        let series = daily(&prices);

        let found = BinarySegmentation::default()
            .detect(&series, &DetectionParams::default())
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, series[40].date);
        assert!(found[0].confidence > 0.9);
        assert!(found[0].mean_after > found[0].mean_before);
        let expected_pct =
            (found[0].mean_after - found[0].mean_before) / found[0].mean_before * 100.0;
        assert!((found[0].pct_change - expected_pct).abs() < 1e-9);
    }

    #[test]
    fn shifts_at_various_positions_are_located() {
        for seed in 1..=20u64 {
            let at = 10 + 2 * seed as usize;
            let prices: Vec<f64> = noise(seed, 80)
                .iter()
                .enumerate()
                .map(|(i, x)| 40.0 + x + if i >= at { 1.5 } else { 0.0 })
                .collect();
            let series = daily(&prices);

            let found = BinarySegmentation::default()
                .detect(&series, &DetectionParams::default())
                .unwrap();

            assert_eq!(found.len(), 1, "seed {seed}");
            assert_eq!(found[0].date, series[at].date, "seed {seed}");
            assert!(found[0].confidence > 0.9, "seed {seed}");
        }
    }

    #[test]
    fn pure_noise_has_no_breaks() {
        let prices: Vec<f64> = noise(42, 100).iter().map(|x| 50.0 + x).collect();
        assert!(detect(&prices, DetectionParams::default()).is_empty());
    }

    #[test]
    fn flat_series_has_no_breaks() {
        assert!(detect(&[100.0; 30], DetectionParams::default()).is_empty());
    }

    #[test]
    fn short_series_yields_empty_result() {
        let mut prices = vec![10.0; 4];
        prices.extend([90.0; 5]);
        assert!(detect(&prices, DetectionParams::default()).is_empty());
        assert!(detect(&[], DetectionParams::default()).is_empty());
    }

    #[test]
    fn noise_free_step_has_full_confidence() {
        let mut prices = vec![10.0; 6];
        prices.extend([20.0; 6]);
        let series = daily(&prices);

        let found = BinarySegmentation::default()
            .detect(&series, &DetectionParams::default())
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, series[6].date);
        assert_eq!(found[0].confidence, 1.0);
        assert_eq!(found[0].mean_before, 10.0);
        assert_eq!(found[0].mean_after, 20.0);
        assert!((found[0].pct_change - 100.0).abs() < 1e-12);
    }

    fn two_shifts() -> Vec<f64> {
        noise(7, 120)
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let level = match i {
                    0..30 => 0.0,
                    30..80 => 3.0,
                    _ => 6.0,
                };
                60.0 + x + level
            })
            .collect()
    }

    #[test]
    fn multiple_shifts_are_returned_in_date_order() {
        let prices = two_shifts();
        let series = daily(&prices);

        let found = BinarySegmentation::default()
            .detect(&series, &DetectionParams::default())
            .unwrap();

        let dates: Vec<_> = found.iter().map(|cp| cp.date).collect();
        assert_eq!(dates, vec![series[30].date, series[80].date]);
        // Change points are strictly inside the series.
        assert!(found.iter().all(|cp| cp.date > series[0].date));
        assert!(found.iter().all(|cp| cp.date < series[119].date));
    }

    #[test]
    fn max_points_prefers_the_earlier_of_equally_confident_breaks() {
        let prices = two_shifts();
        let series = daily(&prices);
        let detector = BinarySegmentation::default();

        let all = detector.detect(&series, &DetectionParams::default()).unwrap();
        assert!(all.iter().all(|cp| cp.confidence == 1.0));

        let params = DetectionParams {
            max_points: Some(1),
            ..Default::default()
        };
        let found = detector.detect(&series, &params).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0], all[0]);
        assert_eq!(found[0].date, series[30].date);
    }

    #[test]
    fn max_points_ties_ignore_the_size_of_the_jump() {
        // The second jump is twice the first, but both saturate at full confidence.
        let prices: Vec<f64> = noise(3, 120)
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let level = match i {
                    0..40 => 0.0,
                    40..80 => 20.0,
                    _ => 60.0,
                };
                50.0 + x + level
            })
            .collect();
        let series = daily(&prices);

        let params = DetectionParams {
            max_points: Some(1),
            ..Default::default()
        };
        let found = BinarySegmentation::default().detect(&series, &params).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, series[40].date);
    }

    #[test]
    fn max_points_keeps_the_most_confident_break() {
        let prices: Vec<f64> = noise(6, 120)
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let level = match i {
                    0..30 => 0.0,
                    30..80 => 0.3,
                    _ => 3.3,
                };
                60.0 + x + level
            })
            .collect();
        let series = daily(&prices);

        let params = DetectionParams {
            max_points: Some(1),
            ..Default::default()
        };
        let found = BinarySegmentation::default().detect(&series, &params).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, series[80].date);
    }

    /// Alternating ±1 noise with a shift at the midpoint sized to a t statistic of 5.
    fn five_standard_errors(n: usize) -> Vec<f64> {
        let shift = 10.0 / ((n - 2) as f64).sqrt();
        (0..n)
            .map(|i| {
                let noise = if i % 2 == 0 { 1.0 } else { -1.0 };
                100.0 + noise + if i >= n / 2 { shift } else { 0.0 }
            })
            .collect()
    }

    #[test]
    fn five_standard_error_shift_is_found_in_a_short_series() {
        let prices = five_standard_errors(200);
        let series = daily(&prices);

        let found = BinarySegmentation::default()
            .detect(&series, &DetectionParams::default())
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, series[100].date);
        assert!(found[0].confidence > 0.9);
    }

    #[test]
    fn five_standard_error_shift_is_found_in_a_long_series() {
        let prices = five_standard_errors(30_000);
        let series = daily(&prices);

        let found = BinarySegmentation::default()
            .detect(&series, &DetectionParams::default())
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date, series[15_000].date);
        assert!(found[0].confidence > 0.99);
    }

    #[test]
    fn min_confidence_drops_weak_breaks() {
        let prices: Vec<f64> = noise(6, 120)
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let level = match i {
                    0..30 => 0.0,
                    30..80 => 0.3,
                    _ => 3.3,
                };
                60.0 + x + level
            })
            .collect();
        let series = daily(&prices);
        let detector = BinarySegmentation::default();

        let all = detector.detect(&series, &DetectionParams::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].confidence > 0.99 && all[0].confidence < 0.9999);
        assert_eq!(all[1].date, series[80].date);

        let strict = DetectionParams {
            min_confidence: 0.9999,
            ..Default::default()
        };
        let strong = detector.detect(&series, &strict).unwrap();
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].date, series[80].date);
    }

    #[test]
    fn detection_is_idempotent() {
        let prices = two_shifts();
        let series = daily(&prices);
        let detector = BinarySegmentation::default();

        let first = detector.detect(&series, &DetectionParams::default()).unwrap();
        let second = detector.detect(&series, &DetectionParams::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn larger_minimum_segment_suppresses_short_regimes() {
        let mut prices = vec![50.0; 20];
        prices.extend([80.0; 4]);
        prices.extend([50.0; 20]);

        let params = DetectionParams {
            min_segment_length: 5,
            ..Default::default()
        };
        let found = detect(&prices, params);
        // A four-day spike cannot be isolated with five-day segments; any break
        // reported must leave at least five observations on either side.
        let series = daily(&prices);
        assert!(found.iter().all(|cp| cp.date >= series[5].date && cp.date <= series[39].date));
    }

    #[test]
    fn significance_must_be_a_probability() {
        assert!(BinarySegmentation::new(0.0).is_err());
        assert!(BinarySegmentation::new(1.2).is_err());
        assert_eq!(BinarySegmentation::new(0.95).unwrap().significance(), 0.95);
    }

    #[test]
    fn confidence_is_monotone_in_statistic() {
        let low = confidence(2.0, 50.0, 10).unwrap();
        let mid = confidence(4.0, 50.0, 10).unwrap();
        let high = confidence(8.0, 50.0, 10).unwrap();
        assert!(low < mid && mid < high);
        assert!((0.0..=1.0).contains(&low));
        assert_eq!(confidence(0.0, 50.0, 10).unwrap(), 0.0);
        assert_eq!(confidence(f64::INFINITY, 50.0, 10).unwrap(), 1.0);
    }

    #[test]
    fn candidate_penalty_is_capped() {
        let capped = confidence(5.0, 40_000.0, MAX_ADJUSTED_CANDIDATES).unwrap();
        assert_eq!(confidence(5.0, 40_000.0, 40_000).unwrap(), capped);
        assert!(capped > 0.99);
        assert!(confidence(5.0, 40_000.0, 10).unwrap() > capped);
    }
}
