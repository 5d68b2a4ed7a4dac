use crate::{CorrelationError, basis_columns};
use chrono::{DateTime, Utc};
use configuration::CorrelationParams;
use core_types::{CorrelationBasis, PricePanel};
use indicators::stats::pearson;
use serde::Serialize;

/// Pairwise Pearson correlations of every symbol in a panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Row and column labels, in request order.
    pub symbols: Vec<String>,
    /// Requested symbols that had no data and were left out.
    pub dropped: Vec<String>,
    pub basis: CorrelationBasis,
    /// Number of paired observations behind each coefficient.
    pub observations: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// `matrix[i][j]` is the correlation of `symbols[i]` with `symbols[j]`.
    /// `None` where either column has zero variance.
    pub matrix: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.symbols.iter().position(|s| s == a)?;
        let j = self.symbols.iter().position(|s| s == b)?;
        self.matrix[i][j]
    }
}

/// Correlates every pair of columns of `panel`.
///
/// At least two symbols must have been requested, at least two must survive
/// the removal of symbols without data, and there must be at least two
/// aligned observations on the chosen basis.
pub fn correlation_matrix(
    panel: &PricePanel,
    params: &CorrelationParams,
) -> Result<CorrelationMatrix, CorrelationError> {
    let requested = panel.symbols.len() + panel.dropped.len();
    if requested < 2 {
        return Err(CorrelationError::TooFewSymbols {
            required: 2,
            got: requested,
        });
    }
    if panel.symbols.len() < 2 {
        return Err(CorrelationError::NotEnoughData(format!(
            "only {} of {} symbols have data ({}); at least two are required",
            panel.symbols.len(),
            requested,
            panel.symbols.join(", ")
        )));
    }

    let columns = basis_columns(panel, params.basis)?;
    let observations = columns.first().map_or(0, Vec::len);
    if observations < 2 {
        return Err(CorrelationError::NotEnoughData(format!(
            "{} overlapping observations on a {} basis; at least two are required",
            observations, params.basis
        )));
    }

    let n = columns.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        matrix[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    if !panel.dropped.is_empty() {
        tracing::warn!(dropped = ?panel.dropped, "Symbols without data were excluded from the matrix");
    }

    Ok(CorrelationMatrix {
        symbols: panel.symbols.clone(),
        dropped: panel.dropped.clone(),
        basis: params.basis,
        observations,
        start: panel.timestamps.first().copied(),
        end: panel.timestamps.last().copied(),
        matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{Interval, PricePoint, PriceSeries};

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(base + Duration::days(i as i64), *c))
            .collect();
        PriceSeries::new(symbol, Interval::Daily, points).unwrap()
    }

    fn panel(series: &[PriceSeries]) -> PricePanel {
        PricePanel::align(series).unwrap()
    }

    #[test]
    fn symmetric_with_unit_diagonal() {
        let p = panel(&[
            series("A", &[1.0, 2.0, 3.0, 4.0, 5.0, 4.5]),
            series("B", &[2.0, 4.1, 5.9, 8.2, 9.8, 9.0]),
            series("C", &[9.0, 7.0, 8.0, 3.0, 2.0, 2.5]),
        ]);
        let m = correlation_matrix(&p, &CorrelationParams::default()).unwrap();

        assert_eq!(m.symbols, vec!["A", "B", "C"]);
        assert_eq!(m.observations, 6);
        for i in 0..3 {
            assert_eq!(m.matrix[i][i], Some(1.0));
            for j in 0..3 {
                assert_eq!(m.matrix[i][j], m.matrix[j][i]);
                let r = m.matrix[i][j].unwrap();
                assert!((-1.0..=1.0).contains(&r));
            }
        }
        assert!(m.get("A", "B").unwrap() > 0.9);
        assert!(m.get("A", "C").unwrap() < -0.8);
    }

    #[test]
    fn constant_column_has_undefined_correlation() {
        let p = panel(&[
            series("A", &[1.0, 2.0, 3.0]),
            series("FLAT", &[5.0, 5.0, 5.0]),
        ]);
        let m = correlation_matrix(&p, &CorrelationParams::default()).unwrap();
        assert_eq!(m.get("A", "FLAT"), None);
        assert_eq!(m.get("FLAT", "FLAT"), Some(1.0));
    }

    #[test]
    fn requires_two_requested_symbols() {
        let p = panel(&[series("A", &[1.0, 2.0, 3.0])]);
        let err = correlation_matrix(&p, &CorrelationParams::default()).unwrap_err();
        assert!(matches!(err, CorrelationError::TooFewSymbols { required: 2, got: 1 }));
    }

    #[test]
    fn requires_two_symbols_with_data() {
        let p = panel(&[series("A", &[1.0, 2.0, 3.0]), series("EMPTY", &[])]);
        let err = correlation_matrix(&p, &CorrelationParams::default()).unwrap_err();
        assert!(matches!(err, CorrelationError::NotEnoughData(_)));
    }

    #[test]
    fn returns_basis_needs_an_extra_row() {
        let p = panel(&[series("A", &[1.0, 2.0]), series("B", &[3.0, 1.0])]);
        let params = CorrelationParams {
            basis: CorrelationBasis::Returns,
        };
        assert!(correlation_matrix(&p, &params).is_err());
        assert!(correlation_matrix(&p, &CorrelationParams::default()).is_ok());
    }

    #[test]
    fn zero_close_rejects_returns_basis() {
        let p = panel(&[series("A", &[1.0, 2.0, 3.0, 4.0]), series("Z", &[3.0, 0.0, 2.0, 1.0])]);
        let params = CorrelationParams {
            basis: CorrelationBasis::Returns,
        };
        let err = correlation_matrix(&p, &params).unwrap_err();
        assert!(matches!(err, CorrelationError::InvalidData(ref msg) if msg.contains('Z')));
        assert!(correlation_matrix(&p, &CorrelationParams::default()).is_ok());
    }

    #[test]
    fn dropped_symbols_are_reported() {
        let p = panel(&[
            series("A", &[1.0, 2.0, 3.0]),
            series("EMPTY", &[]),
            series("B", &[3.0, 1.0, 2.0]),
        ]);
        let m = correlation_matrix(&p, &CorrelationParams::default()).unwrap();
        assert_eq!(m.symbols, vec!["A", "B"]);
        assert_eq!(m.dropped, vec!["EMPTY"]);
        assert_eq!(m.matrix.len(), 2);
    }
}
