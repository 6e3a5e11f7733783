//! Next-period and fertile-window prediction.
//!
//! The baseline rule adds a fixed cycle length to the most recent start.
//! `PredictionMethod::RollingAverage` swaps in the mean gap between recent
//! starts once at least two cycles exist. Prediction never looks at the
//! clock: identical histories always give identical results.

use crate::config::{EngineConfig, PredictionMethod};
use crate::interval::{self, DateInterval};
use crate::types::{most_recent, sorted_by_start};
use crate::{CycleHistory, CycleRecord, CycleStats, Error, Predictions, Result};

/// Predict the next period start and fertile window.
///
/// Returns [`Error::NoHistory`] for an empty history.
pub fn predict(cycles: &[CycleRecord], config: &EngineConfig) -> Result<Predictions> {
    let last = most_recent(cycles).ok_or(Error::NoHistory)?;

    let cycle_length = match config.prediction_method {
        PredictionMethod::Fixed => config.cycle_length_fallback_days,
        PredictionMethod::RollingAverage => {
            match average_cycle_length(cycles, config.average_window_cycles) {
                Some(avg) => {
                    let rounded = avg.round() as i64;
                    tracing::debug!("Using rolling average cycle length {:.1} -> {}", avg, rounded);
                    rounded
                }
                None => {
                    tracing::debug!(
                        "Fewer than two cycles, falling back to {} days",
                        config.cycle_length_fallback_days
                    );
                    config.cycle_length_fallback_days
                }
            }
        }
    };

    let next_period_start = interval::add_days(last.start_date, cycle_length);
    let offset = config.ovulation_offset_days;
    let fertile_window = DateInterval::new(
        interval::add_days(next_period_start, -offset.start),
        interval::add_days(next_period_start, -offset.end),
    )
    .ok_or_else(|| {
        Error::Config(format!(
            "ovulation offsets {}/{} produce an inverted fertile window",
            offset.start, offset.end
        ))
    })?;

    Ok(Predictions {
        next_period_start,
        fertile_window,
    })
}

/// Like [`predict`] but empty histories yield `None` instead of an error.
pub fn predict_opt(cycles: &[CycleRecord], config: &EngineConfig) -> Result<Option<Predictions>> {
    match predict(cycles, config) {
        Ok(predictions) => Ok(Some(predictions)),
        Err(Error::NoHistory) => Ok(None),
        Err(e) => Err(e),
    }
}

impl CycleHistory {
    /// Build a history whose predictions match `cycles`.
    pub fn from_cycles(cycles: Vec<CycleRecord>, config: &EngineConfig) -> Result<Self> {
        let predictions = predict_opt(&cycles, config)?;
        Ok(Self {
            cycles,
            predictions,
        })
    }
}

/// Gaps in days between consecutive starts, oldest first.
fn start_gaps(sorted: &[&CycleRecord]) -> Vec<i64> {
    sorted
        .windows(2)
        .map(|w| interval::days_between(w[0].start_date, w[1].start_date))
        .filter(|gap| *gap > 0)
        .collect()
}

/// Mean gap over the most recent `window` cycles, if at least two exist.
pub fn average_cycle_length(cycles: &[CycleRecord], window: usize) -> Option<f64> {
    let sorted = sorted_by_start(cycles);
    let recent = &sorted[sorted.len().saturating_sub(window.max(2))..];
    mean(&start_gaps(recent))
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}

/// Summary figures for the statistics view.
///
/// Averages fall back to the configured lengths when the history is too
/// short to measure them.
pub fn cycle_stats(cycles: &[CycleRecord], config: &EngineConfig) -> CycleStats {
    let sorted = sorted_by_start(cycles);
    let gaps = start_gaps(&sorted);
    let period_lengths: Vec<i64> = sorted.iter().map(|c| c.period_days()).collect();
    let last = sorted.last();

    CycleStats {
        total_cycles: sorted.len(),
        average_cycle_length: mean(&gaps)
            .unwrap_or(config.cycle_length_fallback_days as f64),
        average_period_length: mean(&period_lengths)
            .unwrap_or(config.period_length_fallback_days as f64),
        shortest_cycle: gaps.iter().copied().min(),
        longest_cycle: gaps.iter().copied().max(),
        last_period_start: last.map(|c| c.start_date),
        last_period_end: last.map(|c| c.end_date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OvulationOffset;
    use crate::Flow;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cycle(start: NaiveDate, days: i64) -> CycleRecord {
        CycleRecord::new(start, interval::add_days(start, days - 1), Flow::Medium)
    }

    #[test]
    fn test_single_cycle_fixed_prediction() {
        let cycles = vec![cycle(date(2024, 1, 1), 5)];
        let predictions = predict(&cycles, &EngineConfig::default()).unwrap();

        assert_eq!(predictions.next_period_start, date(2024, 1, 29));
        assert_eq!(predictions.fertile_window.start, date(2024, 1, 13));
        assert_eq!(predictions.fertile_window.end, date(2024, 1, 18));
    }

    #[test]
    fn test_predict_is_deterministic() {
        let cycles = vec![
            cycle(date(2024, 1, 1), 5),
            cycle(date(2024, 1, 30), 4),
            cycle(date(2024, 2, 27), 6),
        ];
        let mut config = EngineConfig::default();
        for method in [PredictionMethod::Fixed, PredictionMethod::RollingAverage] {
            config.prediction_method = method;
            let first = predict(&cycles, &config).unwrap();
            let second = predict(&cycles, &config).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_empty_history_is_no_history() {
        assert!(matches!(
            predict(&[], &EngineConfig::default()),
            Err(Error::NoHistory)
        ));
        assert_eq!(predict_opt(&[], &EngineConfig::default()).unwrap(), None);
    }

    #[test]
    fn test_fixed_method_ignores_history_length() {
        let cycles = vec![cycle(date(2024, 1, 1), 5), cycle(date(2024, 2, 3), 5)];
        let predictions = predict(&cycles, &EngineConfig::default()).unwrap();
        assert_eq!(predictions.next_period_start, date(2024, 3, 2));
    }

    #[test]
    fn test_rolling_average_uses_gaps() {
        let config = EngineConfig {
            prediction_method: PredictionMethod::RollingAverage,
            ..EngineConfig::default()
        };
        // Gaps of 30 and 32 days -> average 31.
        let cycles = vec![
            cycle(date(2024, 3, 3), 5),
            cycle(date(2024, 1, 1), 5),
            cycle(date(2024, 1, 31), 5),
        ];
        let predictions = predict(&cycles, &config).unwrap();
        assert_eq!(predictions.next_period_start, date(2024, 4, 3));
    }

    #[test]
    fn test_rolling_average_falls_back_with_one_cycle() {
        let config = EngineConfig {
            prediction_method: PredictionMethod::RollingAverage,
            ..EngineConfig::default()
        };
        let cycles = vec![cycle(date(2024, 1, 1), 5)];
        let predictions = predict(&cycles, &config).unwrap();
        assert_eq!(predictions.next_period_start, date(2024, 1, 29));
    }

    #[test]
    fn test_rolling_average_respects_window() {
        // Old gap of 40 days falls outside a 3-cycle window.
        let cycles = vec![
            cycle(date(2023, 11, 22), 5),
            cycle(date(2024, 1, 1), 5),
            cycle(date(2024, 1, 29), 5),
            cycle(date(2024, 2, 26), 5),
        ];
        assert_eq!(average_cycle_length(&cycles, 3), Some(28.0));
        assert_eq!(average_cycle_length(&cycles, 6), Some(32.0));
    }

    #[test]
    fn test_offsets_move_window() {
        let config = EngineConfig {
            ovulation_offset_days: OvulationOffset::default().shifted(-2),
            ..EngineConfig::default()
        };
        let cycles = vec![cycle(date(2024, 1, 1), 5)];
        let predictions = predict(&cycles, &config).unwrap();
        assert_eq!(predictions.fertile_window.start, date(2024, 1, 15));
        assert_eq!(predictions.fertile_window.end, date(2024, 1, 20));
    }

    #[test]
    fn test_inverted_offsets_are_config_error() {
        let config = EngineConfig {
            ovulation_offset_days: OvulationOffset { start: 11, end: 16 },
            ..EngineConfig::default()
        };
        let cycles = vec![cycle(date(2024, 1, 1), 5)];
        assert!(matches!(predict(&cycles, &config), Err(Error::Config(_))));
    }

    #[test]
    fn test_history_from_cycles() {
        let config = EngineConfig::default();
        let history = CycleHistory::from_cycles(vec![], &config).unwrap();
        assert!(history.predictions.is_none());

        let history =
            CycleHistory::from_cycles(vec![cycle(date(2024, 1, 1), 5)], &config).unwrap();
        assert_eq!(
            history.predictions.unwrap().next_period_start,
            date(2024, 1, 29)
        );
    }

    #[test]
    fn test_cycle_stats() {
        let config = EngineConfig::default();
        let cycles = vec![
            cycle(date(2024, 1, 29), 5),
            cycle(date(2024, 1, 1), 5),
            cycle(date(2024, 2, 28), 3),
        ];
        let stats = cycle_stats(&cycles, &config);

        assert_eq!(stats.total_cycles, 3);
        assert_eq!(stats.average_cycle_length, 29.0);
        assert!((stats.average_period_length - 13.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.shortest_cycle, Some(28));
        assert_eq!(stats.longest_cycle, Some(30));
        assert_eq!(stats.last_period_start, Some(date(2024, 2, 28)));
        assert_eq!(stats.last_period_end, Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_cycle_stats_fallbacks() {
        let stats = cycle_stats(&[], &EngineConfig::default());
        assert_eq!(stats.total_cycles, 0);
        assert_eq!(stats.average_cycle_length, 28.0);
        assert_eq!(stats.average_period_length, 5.0);
        assert_eq!(stats.shortest_cycle, None);
        assert_eq!(stats.last_period_start, None);
    }
}
