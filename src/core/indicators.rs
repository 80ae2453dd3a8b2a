//! EMA, Wilder RSI, Wilder ATR, MACD and Stochastic as full series aligned
//! with the candle window. Pure functions of their input.

use crate::error::AnalysisError;
use crate::models::{Candle, CandleSeries, EmaPair, IndicatorSet};

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const VOLUME_EMA_PERIOD: usize = 20;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const STOCH_PERIOD: usize = 14;
pub const STOCH_SMOOTH: usize = 3;

/// EMA seeded with the simple average of the first `period` values,
/// smoothed with `2 / (period + 1)` afterwards.
pub fn ema_series(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
    if period == 0 || values.len() < period {
        return Err(AnalysisError::DataInsufficient {
            required: period.max(1),
            available: values.len(),
        });
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = vec![None; values.len()];
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, value) in values.iter().enumerate().skip(period) {
        prev += k * (value - prev);
        out[i] = Some(prev);
    }
    Ok(out)
}

/// Wilder RSI over closing prices. First value sits at index `period`.
pub fn rsi_series(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
    if period == 0 || closes.len() < period + 1 {
        return Err(AnalysisError::DataInsufficient {
            required: period + 1,
            available: closes.len(),
        });
    }

    let mut out = vec![None; closes.len()];
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    let p = period as f64;
    for (i, change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    Ok(out)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return 50.0;
        }
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Wilder ATR. First value sits at index `period`.
pub fn atr_series(candles: &[Candle], period: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
    if period == 0 || candles.len() < period + 1 {
        return Err(AnalysisError::DataInsufficient {
            required: period + 1,
            available: candles.len(),
        });
    }

    let mut out = vec![None; candles.len()];
    let tr: Vec<f64> = candles
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(atr);

    let p = period as f64;
    for (i, range) in tr.iter().enumerate().skip(period) {
        atr = (atr * (p - 1.0) + range) / p;
        out[i + 1] = Some(atr);
    }
    Ok(out)
}

/// MACD line (fast EMA minus slow EMA) and its signal EMA. Both stay `None`
/// until enough history exists; a short window yields all-`None` series.
pub fn macd_series(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut line = vec![None; closes.len()];
    let mut sig = vec![None; closes.len()];
    let (Ok(fast_ema), Ok(slow_ema)) = (ema_series(closes, fast), ema_series(closes, slow)) else {
        return (line, sig);
    };

    for (i, (f, s)) in fast_ema.iter().zip(&slow_ema).enumerate() {
        if let (Some(f), Some(s)) = (f, s) {
            line[i] = Some(f - s);
        }
    }

    let Some(start) = line.iter().position(Option::is_some) else {
        return (line, sig);
    };
    let defined: Vec<f64> = line[start..].iter().flatten().copied().collect();
    if let Ok(smoothed) = ema_series(&defined, signal) {
        for (offset, value) in smoothed.into_iter().enumerate() {
            sig[start + offset] = value;
        }
    }
    (line, sig)
}

/// Fast stochastic %K over `period` bars and %D as its `smooth`-bar simple
/// average. A bar range of zero reads 50.
pub fn stochastic_series(
    candles: &[Candle],
    period: usize,
    smooth: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut k = vec![None; candles.len()];
    let mut d = vec![None; candles.len()];
    if period == 0 || smooth == 0 || candles.len() < period {
        return (k, d);
    }

    for (i, window) in candles.windows(period).enumerate() {
        let hh = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let ll = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let close = window[period - 1].close;
        let value = if hh > ll { (close - ll) / (hh - ll) * 100.0 } else { 50.0 };
        k[i + period - 1] = Some(value);
    }

    for i in (period + smooth - 2)..candles.len() {
        let sum: f64 = k[i + 1 - smooth..=i].iter().flatten().sum();
        d[i] = Some(sum / smooth as f64);
    }
    (k, d)
}

/// Last volume over the EMA(20) of volume. `None` when history is too short
/// or volume is not reported.
pub fn volume_ratio(candles: &CandleSeries) -> Option<f64> {
    let volumes = candles.volumes();
    let ema = ema_series(&volumes, VOLUME_EMA_PERIOD).ok()?;
    let avg = ema.last().copied().flatten()?;
    let last = *volumes.last()?;
    if avg > 0.0 {
        Some(last / avg)
    } else {
        None
    }
}

fn validate(candles: &CandleSeries) -> Result<(), AnalysisError> {
    for (i, c) in candles.iter().enumerate() {
        let prices = [c.open, c.high, c.low, c.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(AnalysisError::InvalidCandles(format!(
                "non-positive or non-finite price at bar {i}"
            )));
        }
        if c.high < c.low {
            return Err(AnalysisError::InvalidCandles(format!("high below low at bar {i}")));
        }
    }
    Ok(())
}

/// Computes every indicator the synthesizer needs. Fails with
/// `DataInsufficient` instead of returning partial series.
pub fn compute(candles: &CandleSeries, ema: EmaPair) -> Result<IndicatorSet, AnalysisError> {
    let required = ema.required_candles();
    if candles.len() < required {
        return Err(AnalysisError::DataInsufficient {
            required,
            available: candles.len(),
        });
    }
    validate(candles)?;

    let closes = candles.closes();
    let (macd_line_series, macd_signal_series) = macd_series(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let (stoch_k_series, stoch_d_series) = stochastic_series(candles.as_slice(), STOCH_PERIOD, STOCH_SMOOTH);
    Ok(IndicatorSet {
        ema,
        ema_short_series: ema_series(&closes, ema.short as usize)?,
        ema_long_series: ema_series(&closes, ema.long as usize)?,
        rsi_series: rsi_series(&closes, RSI_PERIOD)?,
        atr_series: atr_series(candles.as_slice(), ATR_PERIOD)?,
        macd_line_series,
        macd_signal_series,
        stoch_k_series,
        stoch_d_series,
        volume_ratio: volume_ratio(candles),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend, make_candles, make_flat};

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|v| (v - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn ema_seeded_with_sma() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ema = ema_series(&values, 3).unwrap();
        assert_eq!(ema.len(), 5);
        assert_eq!(ema[0], None);
        assert_eq!(ema[1], None);
        assert!(approx(ema[2], 2.0));
        // k = 0.5
        assert!(approx(ema[3], 3.0));
        assert!(approx(ema[4], 4.0));
    }

    #[test]
    fn ema_requires_period_values() {
        let err = ema_series(&[1.0, 2.0], 3).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DataInsufficient {
                required: 3,
                available: 2
            }
        );
    }

    #[test]
    fn rsi_extremes() {
        let up: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rsi = rsi_series(&up, 14).unwrap();
        assert_eq!(rsi[13], None);
        assert!(approx(rsi[14], 100.0));
        assert!(approx(rsi[19], 100.0));

        let down: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let rsi = rsi_series(&down, 14).unwrap();
        assert!(approx(rsi[19], 0.0));

        let flat = vec![100.0; 20];
        assert!(approx(rsi_series(&flat, 14).unwrap()[19], 50.0));
    }

    #[test]
    fn rsi_balanced_moves_sit_at_fifty() {
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let rsi = rsi_series(&closes, 14).unwrap();
        assert!(approx(rsi[14], 50.0));
    }

    #[test]
    fn rsi_needs_fifteen_closes() {
        let closes = vec![100.0; 14];
        assert!(rsi_series(&closes, 14).is_err());
        let closes = vec![100.0; 15];
        assert!(rsi_series(&closes, 14).is_ok());
    }

    #[test]
    fn atr_constant_range() {
        // every candle spans 4.0 and closes mid-range
        let data: Vec<(f64, f64, f64, f64)> = (0..20).map(|_| (100.0, 102.0, 98.0, 100.0)).collect();
        let s = make_candles(&data);
        let atr = atr_series(s.as_slice(), 14).unwrap();
        assert_eq!(atr[13], None);
        assert!(approx(atr[14], 4.0));
        assert!(approx(atr[19], 4.0));
    }

    #[test]
    fn macd_of_steady_ramp_is_constant() {
        // a linear series lags each EMA by (n - 1) / 2, so the line is 12.5 - 5.5
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (line, signal) = macd_series(&closes, 12, 26, 9);
        assert_eq!(line.len(), 60);
        assert_eq!(line[24], None);
        assert!(line[25].map(|v| (v - 7.0).abs() < 1e-6).unwrap_or(false));
        assert_eq!(signal[32], None);
        assert!(signal[33].map(|v| (v - 7.0).abs() < 1e-6).unwrap_or(false));
        assert!(signal[59].map(|v| (v - 7.0).abs() < 1e-6).unwrap_or(false));
    }

    #[test]
    fn macd_line_leads_signal_on_breakout() {
        let closes: Vec<f64> = (0..50)
            .map(|i| if i < 40 { 100.0 } else { 100.0 + (i - 39) as f64 * 2.0 })
            .collect();
        let (line, signal) = macd_series(&closes, 12, 26, 9);
        let (l, s) = (line[49].unwrap(), signal[49].unwrap());
        assert!(l > 0.0);
        assert!(l > s);
    }

    #[test]
    fn macd_short_window_is_undefined() {
        let closes = vec![100.0; 20];
        let (line, signal) = macd_series(&closes, 12, 26, 9);
        assert!(line.iter().all(Option::is_none));
        assert!(signal.iter().all(Option::is_none));
    }

    #[test]
    fn stochastic_k_and_d() {
        let s = make_candles(&[
            (9.0, 10.0, 8.0, 9.0),
            (9.0, 12.0, 9.0, 11.0),
            (11.0, 14.0, 10.0, 14.0),
            (14.0, 14.0, 12.0, 12.0),
        ]);
        let (k, d) = stochastic_series(s.as_slice(), 3, 2);
        assert_eq!(k[1], None);
        assert!(approx(k[2], 100.0));
        assert!(approx(k[3], 60.0));
        assert_eq!(d[2], None);
        assert!(approx(d[3], 80.0));
    }

    #[test]
    fn stochastic_flat_range_reads_fifty() {
        let data: Vec<(f64, f64, f64, f64)> = (0..20).map(|_| (5.0, 5.0, 5.0, 5.0)).collect();
        let s = make_candles(&data);
        let (k, d) = stochastic_series(s.as_slice(), STOCH_PERIOD, STOCH_SMOOTH);
        assert!(approx(k[19], 50.0));
        assert!(approx(d[19], 50.0));
        assert_eq!(d[14], None);
        assert!(approx(d[15], 50.0));
    }

    #[test]
    fn compute_aligns_series_with_window() {
        let s = make_bullish_trend(60, 100.0);
        let set = compute(&s, EmaPair::new(13, 21)).unwrap();
        assert_eq!(set.ema_short_series.len(), 60);
        assert_eq!(set.ema_long_series.len(), 60);
        assert_eq!(set.rsi_series.len(), 60);
        assert_eq!(set.atr_series.len(), 60);
        assert_eq!(set.macd_line_series.len(), 60);
        assert_eq!(set.stoch_d_series.len(), 60);
        assert!(set.last_macd().is_some());
        assert!(set.last_stochastic().is_some());
        assert!(set.last_ema_short().unwrap() > set.last_ema_long().unwrap());
        assert!(set.last_rsi().unwrap() > 70.0);
        assert_eq!(set.volume_ratio, Some(1.0));
    }

    #[test]
    fn compute_leaves_macd_undefined_on_short_history() {
        let s = make_bullish_trend(30, 100.0);
        let set = compute(&s, EmaPair::DEFAULT).unwrap();
        assert!(set.last_macd().is_none());
        assert!(set.last_stochastic().is_some());
    }

    #[test]
    fn compute_bearish_trend() {
        let s = make_bearish_trend(60, 2000.0);
        let set = compute(&s, EmaPair::new(9, 21)).unwrap();
        assert!(set.last_ema_short().unwrap() < set.last_ema_long().unwrap());
        assert!(set.last_rsi().unwrap() < 30.0);
    }

    #[test]
    fn compute_rejects_short_window() {
        let s = make_flat(49, 100.0);
        let err = compute(&s, EmaPair::new(20, 50)).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DataInsufficient {
                required: 50,
                available: 49
            }
        );
        // rsi needs 15 even when both EMAs are shorter
        let s = make_flat(14, 100.0);
        let err = compute(&s, EmaPair::new(5, 10)).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DataInsufficient {
                required: 15,
                available: 14
            }
        );
    }

    #[test]
    fn compute_rejects_bad_prices() {
        let mut data: Vec<(f64, f64, f64, f64)> = (0..30).map(|_| (100.0, 101.0, 99.0, 100.0)).collect();
        data[10] = (100.0, 101.0, 99.0, f64::NAN);
        let s = make_candles(&data);
        assert!(matches!(
            compute(&s, EmaPair::DEFAULT),
            Err(AnalysisError::InvalidCandles(_))
        ));
    }

    #[test]
    fn compute_is_deterministic() {
        let s = make_bullish_trend(80, 500.0);
        let a = compute(&s, EmaPair::DEFAULT).unwrap();
        let b = compute(&s, EmaPair::DEFAULT).unwrap();
        assert_eq!(a, b);
    }
}
