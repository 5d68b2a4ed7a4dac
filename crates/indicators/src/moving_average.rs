use crate::error::IndicatorError;
use ta::indicators::SimpleMovingAverage as Sma;
use ta::{Next, Period, Reset};

/// A simple moving average that stays silent until its window is full.
///
/// `ta`'s SMA averages whatever it has seen so far during warm-up; chart
/// overlays should not start before a full window exists.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    inner: Sma,
    seen: usize,
}

impl MovingAverage {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let inner = Sma::new(period).map_err(|e| {
            IndicatorError::InvalidParameters(format!("Failed to initialize SMA({}): {:?}", period, e))
        })?;
        Ok(Self { inner, seen: 0 })
    }
}

impl Next<f64> for MovingAverage {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        let value = self.inner.next(input);
        self.seen += 1;
        (self.seen >= self.inner.period()).then_some(value)
    }
}

impl Reset for MovingAverage {
    fn reset(&mut self) {
        self.inner.reset();
        self.seen = 0;
    }
}

impl Period for MovingAverage {
    fn period(&self) -> usize {
        self.inner.period()
    }
}

/// Runs [`MovingAverage`] over a whole series.
pub fn sma(values: &[f64], period: usize) -> Result<Vec<Option<f64>>, IndicatorError> {
    let mut indicator = MovingAverage::new(period)?;
    Ok(values.iter().map(|v| indicator.next(*v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_until_window_is_full() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 2.0).abs() < 1e-12);
        assert!((out[4].unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(MovingAverage::new(0).is_err());
    }
}
