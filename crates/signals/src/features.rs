//! Feature engine: derives the per-cycle indicator snapshot from raw bars.
//!
//! Deterministic and side-effect-free. Degenerate inputs (flat prices, zero
//! volume) degrade to neutral feature values instead of producing NaN.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use odte_core::{decimal_to_f64, EngineError, OhlcvBar};

/// Configuration for feature computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Minimum bars required; fewer is `InsufficientData`.
    pub min_bars: usize,
    pub fast_ma_period: usize,
    pub slow_ma_period: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub momentum_period: usize,
    pub zscore_period: usize,
    pub vwap_period: usize,
    pub volume_period: usize,
    /// MA spread (percent) that maps to full trend strength of 1.0.
    pub trend_norm_pct: f64,
    /// Volatility percent used when ATR degenerates to zero.
    pub neutral_vol_pct: f64,
    /// Minimum open gap (percent) to flag.
    pub min_gap_pct: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_bars: 30,
            fast_ma_period: 9,
            slow_ma_period: 21,
            rsi_period: 14,
            atr_period: 14,
            momentum_period: 10,
            zscore_period: 20,
            vwap_period: 20,
            volume_period: 20,
            trend_norm_pct: 1.0,
            neutral_vol_pct: 1.5,
            min_gap_pct: 0.5,
        }
    }
}

/// Immutable indicator snapshot for one symbol at one timestamp.
///
/// Created fresh each cycle and owned by that cycle; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub last_close: Decimal,
    /// Signed trend strength in [-1.0, 1.0]; positive is up.
    pub trend_strength: f64,
    /// Rate of change over the momentum period, in percent (signed).
    pub momentum: f64,
    /// RSI in [0, 100]; 50 on a flat series.
    pub rsi: f64,
    /// ATR as a percentage of price.
    pub volatility_pct: f64,
    /// Close z-score against the rolling mean; 0 when stddev degenerates.
    pub zscore: f64,
    /// Close deviation from rolling VWAP, in percent (signed).
    pub vwap_deviation_pct: f64,
    /// Last volume over average volume; 1.0 when volume history is empty.
    pub volume_ratio: f64,
    /// Last bar's open gap versus the prior close, in percent (signed).
    pub gap_pct: f64,
    /// True when a significant open gap has not yet been traded back through.
    pub has_unfilled_gap: bool,
}

/// Computes a [`FeatureVector`] from an ordered bar series (oldest first).
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    #[must_use]
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Computes the feature snapshot for `symbol`.
    ///
    /// # Errors
    /// Returns [`EngineError::InsufficientData`] when fewer than
    /// `min_bars` bars are supplied.
    pub fn compute(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<FeatureVector, EngineError> {
        if bars.len() < self.config.min_bars {
            return Err(EngineError::InsufficientData {
                symbol: symbol.to_string(),
                got: bars.len(),
                need: self.config.min_bars,
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| decimal_to_f64(b.close)).collect();
        let Some(last) = bars.last() else {
            return Err(EngineError::InsufficientData {
                symbol: symbol.to_string(),
                got: 0,
                need: self.config.min_bars,
            });
        };
        let last_close = closes.last().copied().unwrap_or(0.0);

        let ma_fast = sma(&closes, self.config.fast_ma_period);
        let ma_slow = sma(&closes, self.config.slow_ma_period);
        let trend_strength = if ma_slow > f64::EPSILON {
            let spread_pct = (ma_fast - ma_slow) / ma_slow * 100.0;
            (spread_pct / self.config.trend_norm_pct).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let momentum = rate_of_change(&closes, self.config.momentum_period);
        let rsi = rsi(&closes, self.config.rsi_period);

        let atr = average_true_range(bars, self.config.atr_period);
        let volatility_pct = if atr > f64::EPSILON && last_close > f64::EPSILON {
            atr / last_close * 100.0
        } else {
            self.config.neutral_vol_pct
        };

        let zscore = zscore(&closes, self.config.zscore_period);
        let vwap_deviation_pct = vwap_deviation(bars, self.config.vwap_period, last_close);
        let volume_ratio = volume_ratio(bars, self.config.volume_period);
        let (gap_pct, has_unfilled_gap) = gap_state(bars, self.config.min_gap_pct);

        Ok(FeatureVector {
            symbol: symbol.to_string(),
            timestamp: last.timestamp,
            last_close: last.close,
            trend_strength,
            momentum,
            rsi,
            volatility_pct,
            zscore,
            vwap_deviation_pct,
            volume_ratio,
            gap_pct,
            has_unfilled_gap,
        })
    }
}

fn sma(values: &[f64], period: usize) -> f64 {
    let period = period.max(1).min(values.len());
    let window = &values[values.len() - period..];
    window.iter().sum::<f64>() / window.len() as f64
}

fn rate_of_change(closes: &[f64], period: usize) -> f64 {
    if closes.len() <= period {
        return 0.0;
    }
    let past = closes[closes.len() - 1 - period];
    let current = closes[closes.len() - 1];
    if past > f64::EPSILON {
        (current - past) / past * 100.0
    } else {
        0.0
    }
}

/// Simple-average RSI. A flat series (no gains, no losses) reads 50.
fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < period + 1 {
        return 50.0;
    }
    let window = &closes[closes.len() - period - 1..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let total = gains + losses;
    if total < f64::EPSILON {
        return 50.0;
    }
    100.0 * gains / total
}

fn average_true_range(bars: &[OhlcvBar], period: usize) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }
    let start = bars.len().saturating_sub(period).max(1);
    let mut sum = 0.0;
    let mut count = 0.0;
    for i in start..bars.len() {
        let high = decimal_to_f64(bars[i].high);
        let low = decimal_to_f64(bars[i].low);
        let prev_close = decimal_to_f64(bars[i - 1].close);
        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        sum += tr;
        count += 1.0;
    }
    if count > 0.0 {
        sum / count
    } else {
        0.0
    }
}

fn zscore(closes: &[f64], period: usize) -> f64 {
    let period = period.min(closes.len());
    if period < 2 {
        return 0.0;
    }
    let window = &closes[closes.len() - period..];
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    if stddev > f64::EPSILON {
        (closes[closes.len() - 1] - mean) / stddev
    } else {
        0.0
    }
}

fn vwap_deviation(bars: &[OhlcvBar], period: usize, last_close: f64) -> f64 {
    let period = period.min(bars.len());
    let window = &bars[bars.len() - period..];
    let total_volume: Decimal = window.iter().map(|b| b.volume).sum();
    if total_volume.is_zero() {
        return 0.0;
    }
    let weighted: Decimal = window.iter().map(|b| b.typical_price() * b.volume).sum();
    let vwap = decimal_to_f64(weighted / total_volume);
    if vwap > f64::EPSILON {
        (last_close - vwap) / vwap * 100.0
    } else {
        0.0
    }
}

fn volume_ratio(bars: &[OhlcvBar], period: usize) -> f64 {
    let period = period.min(bars.len());
    if period == 0 {
        return 1.0;
    }
    let window = &bars[bars.len() - period..];
    let avg = decimal_to_f64(window.iter().map(|b| b.volume).sum::<Decimal>()) / window.len() as f64;
    if avg > f64::EPSILON {
        decimal_to_f64(bars[bars.len() - 1].volume) / avg
    } else {
        1.0
    }
}

fn gap_state(bars: &[OhlcvBar], min_gap_pct: f64) -> (f64, bool) {
    if bars.len() < 2 {
        return (0.0, false);
    }
    let last = &bars[bars.len() - 1];
    let prev_close = decimal_to_f64(bars[bars.len() - 2].close);
    if prev_close < f64::EPSILON {
        return (0.0, false);
    }
    let gap_pct = (decimal_to_f64(last.open) - prev_close) / prev_close * 100.0;
    if gap_pct.abs() < min_gap_pct {
        return (gap_pct, false);
    }
    // Gap up stays unfilled while the bar's low holds above the prior close;
    // gap down while the high holds below it.
    let unfilled = if gap_pct > 0.0 {
        decimal_to_f64(last.low) > prev_close
    } else {
        decimal_to_f64(last.high) < prev_close
    };
    (gap_pct, unfilled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: Utc::now(),
            open: Decimal::try_from(open).unwrap(),
            high: Decimal::try_from(high).unwrap(),
            low: Decimal::try_from(low).unwrap(),
            close: Decimal::try_from(close).unwrap(),
            volume: Decimal::try_from(volume).unwrap(),
        }
    }

    fn flat_series(n: usize) -> Vec<OhlcvBar> {
        (0..n).map(|_| bar(100.0, 100.0, 100.0, 100.0, 1000.0)).collect()
    }

    fn rising_series(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                bar(base, base + 1.5, base - 0.5, base + 1.0, 1000.0)
            })
            .collect()
    }

    fn falling_series(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 200.0 - 2.0 * i as f64;
                bar(base, base + 0.5, base - 2.5, base - 2.0, 1000.0)
            })
            .collect()
    }

    #[test]
    fn rejects_insufficient_bars() {
        let engine = FeatureEngine::default();
        let result = engine.compute("SPY", &flat_series(10));

        match result {
            Err(EngineError::InsufficientData { got, need, .. }) => {
                assert_eq!(got, 10);
                assert_eq!(need, 30);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn flat_series_degrades_to_neutral() {
        let engine = FeatureEngine::default();
        let features = engine.compute("SPY", &flat_series(40)).unwrap();

        assert!(features.trend_strength.abs() < f64::EPSILON);
        assert!(features.momentum.abs() < f64::EPSILON);
        assert!((features.rsi - 50.0).abs() < f64::EPSILON);
        assert!(features.zscore.abs() < f64::EPSILON);
        // Flat ATR falls back to the neutral volatility level, not zero/NaN.
        assert!((features.volatility_pct - 1.5).abs() < f64::EPSILON);
        assert!(features.volatility_pct.is_finite());
    }

    #[test]
    fn zero_volume_does_not_produce_nan() {
        let engine = FeatureEngine::default();
        let bars: Vec<OhlcvBar> = (0..40)
            .map(|i| bar(100.0 + i as f64, 101.0 + i as f64, 99.0 + i as f64, 100.5 + i as f64, 0.0))
            .collect();

        let features = engine.compute("SPY", &bars).unwrap();

        assert!(features.vwap_deviation_pct.is_finite());
        assert!((features.volume_ratio - 1.0).abs() < f64::EPSILON);
        assert!(features.vwap_deviation_pct.abs() < f64::EPSILON);
    }

    #[test]
    fn uptrend_has_positive_trend_and_momentum() {
        let engine = FeatureEngine::default();
        let features = engine.compute("SPY", &rising_series(60)).unwrap();

        assert!(features.trend_strength > 0.3, "trend {}", features.trend_strength);
        assert!(features.momentum > 0.0);
        assert!(features.rsi > 60.0);
    }

    #[test]
    fn downtrend_drives_rsi_to_oversold() {
        let engine = FeatureEngine::default();
        let features = engine.compute("SPY", &falling_series(40)).unwrap();

        assert!(features.trend_strength < -0.3);
        assert!(features.momentum < 0.0);
        assert!(features.rsi < 30.0, "rsi {}", features.rsi);
        assert!(features.zscore < -1.0);
    }

    #[test]
    fn gap_up_is_flagged_while_unfilled() {
        let engine = FeatureEngine::default();
        let mut bars = flat_series(39);
        // Open 2% above the prior close without trading back down to it.
        bars.push(bar(102.0, 103.0, 101.5, 102.5, 1000.0));

        let features = engine.compute("SPY", &bars).unwrap();

        assert!(features.gap_pct > 1.9);
        assert!(features.has_unfilled_gap);
    }

    #[test]
    fn filled_gap_is_not_flagged() {
        let engine = FeatureEngine::default();
        let mut bars = flat_series(39);
        // Gap up but the low trades back through the prior close.
        bars.push(bar(102.0, 103.0, 99.5, 100.5, 1000.0));

        let features = engine.compute("SPY", &bars).unwrap();

        assert!(!features.has_unfilled_gap);
    }

    #[test]
    fn deterministic_for_same_input() {
        let engine = FeatureEngine::default();
        let bars = rising_series(45);

        let a = engine.compute("SPY", &bars).unwrap();
        let b = engine.compute("SPY", &bars).unwrap();

        assert!((a.trend_strength - b.trend_strength).abs() < f64::EPSILON);
        assert!((a.rsi - b.rsi).abs() < f64::EPSILON);
        assert!((a.vwap_deviation_pct - b.vwap_deviation_pct).abs() < f64::EPSILON);
        assert_eq!(a.last_close, dec!(145));
        assert_eq!(a.last_close, b.last_close);
    }
}
