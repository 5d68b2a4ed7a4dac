use crate::error::IndicatorError;
use ta::{Next, Period, Reset};

/// Relative Strength Index with Wilder smoothing.
///
/// Gains and losses are averaged with an exponential filter of
/// `alpha = 1 / period`, seeded with the first observation (which counts as
/// neither a gain nor a loss). The first `period - 1` outputs are `None`.
/// When the average loss is zero the RSI is 100, so the output always lies
/// in `[0, 100]`.
///
/// `ta::indicators::RelativeStrengthIndex` uses a `2 / (period + 1)` EMA
/// with a non-zero seed, which gives different levels on short histories.
#[derive(Debug, Clone)]
pub struct WilderRsi {
    period: usize,
    alpha: f64,
    avg_gain: f64,
    avg_loss: f64,
    prev: Option<f64>,
    count: usize,
}

impl WilderRsi {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period < 2 {
            return Err(IndicatorError::InvalidParameters(format!(
                "RSI period must be at least 2, got {}",
                period
            )));
        }
        Ok(Self {
            period,
            alpha: 1.0 / period as f64,
            avg_gain: 0.0,
            avg_loss: 0.0,
            prev: None,
            count: 0,
        })
    }
}

impl Next<f64> for WilderRsi {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        let (gain, loss) = match self.prev {
            Some(prev) => {
                let delta = input - prev;
                (delta.max(0.0), (-delta).max(0.0))
            }
            None => (0.0, 0.0),
        };
        self.prev = Some(input);

        if self.count == 0 {
            self.avg_gain = gain;
            self.avg_loss = loss;
        } else {
            self.avg_gain += self.alpha * (gain - self.avg_gain);
            self.avg_loss += self.alpha * (loss - self.avg_loss);
        }
        self.count += 1;

        if self.count < self.period {
            return None;
        }
        if self.avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = self.avg_gain / self.avg_loss;
        Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
    }
}

impl Reset for WilderRsi {
    fn reset(&mut self) {
        self.avg_gain = 0.0;
        self.avg_loss = 0.0;
        self.prev = None;
        self.count = 0;
    }
}

impl Period for WilderRsi {
    fn period(&self) -> usize {
        self.period
    }
}

/// Runs [`WilderRsi`] over a whole series.
pub fn rsi(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    let mut indicator = WilderRsi::new(period)?;
    Ok(values.iter().map(|v| indicator.next(*v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_period() {
        assert!(WilderRsi::new(1).is_err());
        assert!(WilderRsi::new(0).is_err());
    }

    #[test]
    fn warm_up_is_period_minus_one() {
        let out = rsi(&[1.0, 2.0, 3.0, 2.0, 4.0, 5.0], 3).unwrap();
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert!(out[2..].iter().all(|v| v.is_some()));
    }

    #[test]
    fn matches_hand_computed_values() {
        // period 2 => alpha 0.5, deltas: -, +2, -1, +3
        // smoothed gains : 0, 1, 0.5, 1.75
        // smoothed losses: 0, 0, 0.5, 0.25
        let out = rsi(&[10.0, 12.0, 11.0, 14.0], 2).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], Some(100.0));
        let expected_2 = 100.0 - 100.0 / (1.0 + 0.5 / 0.5);
        assert!((out[2].unwrap() - expected_2).abs() < 1e-12);
        let expected_3 = 100.0 - 100.0 / (1.0 + 1.75 / 0.25);
        assert!((out[3].unwrap() - expected_3).abs() < 1e-12);
    }

    #[test]
    fn bounded_for_noisy_series() {
        let values: Vec<f64> = (0..500)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + (i as f64 * 0.13).cos() * 3.0)
            .collect();
        for v in rsi(&values, 14).unwrap().into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "rsi {} out of bounds", v);
        }
    }

    #[test]
    fn monotonic_extremes() {
        let rising: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert_eq!(rsi(&rising, 14).unwrap().last().copied().flatten(), Some(100.0));
        assert_eq!(rsi(&falling, 14).unwrap().last().copied().flatten(), Some(0.0));
    }

    #[test]
    fn reset_restarts_warm_up() {
        let mut indicator = WilderRsi::new(2).unwrap();
        indicator.next(1.0);
        assert!(indicator.next(2.0).is_some());
        indicator.reset();
        assert!(indicator.next(3.0).is_none());
        assert_eq!(indicator.period(), 2);
    }
}
