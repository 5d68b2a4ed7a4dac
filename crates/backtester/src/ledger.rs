use chrono::{DateTime, Utc};
use core_types::{Trade, TradeDirection, TradeStatus};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct OpenPosition {
    direction: TradeDirection,
    entry_time: DateTime<Utc>,
    entry_price: Decimal,
    entry_signal: Option<f64>,
}

/// Matches entries with exits into one-unit `Trade`s.
#[derive(Debug)]
pub(crate) struct TradeLedger {
    symbols: Vec<String>,
    open: Option<OpenPosition>,
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub(crate) fn new(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            open: None,
            trades: Vec::new(),
        }
    }

    /// Opens a position. An already open position is closed first at the same price.
    pub(crate) fn open(
        &mut self,
        direction: TradeDirection,
        time: DateTime<Utc>,
        price: Decimal,
        signal: Option<f64>,
    ) {
        if self.open.is_some() {
            self.close(time, price, signal, TradeStatus::Closed);
        }
        self.open = Some(OpenPosition {
            direction,
            entry_time: time,
            entry_price: price,
            entry_signal: signal,
        });
    }

    /// Closes the open position, if any.
    pub(crate) fn close(
        &mut self,
        time: DateTime<Utc>,
        price: Decimal,
        signal: Option<f64>,
        status: TradeStatus,
    ) {
        let Some(position) = self.open.take() else {
            return;
        };
        let pnl = (price - position.entry_price) * Decimal::from(position.direction.sign());
        tracing::trace!(direction = ?position.direction, %pnl, "Trade closed");
        self.trades.push(Trade {
            trade_id: Uuid::new_v4(),
            symbols: self.symbols.clone(),
            direction: position.direction,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            entry_signal: position.entry_signal,
            exit_time: time,
            exit_price: price,
            exit_signal: signal,
            pnl,
            status,
        });
    }

    /// Force-closes a still open position at the last bar and returns every trade.
    pub(crate) fn finish(
        mut self,
        time: DateTime<Utc>,
        price: Decimal,
        signal: Option<f64>,
    ) -> Vec<Trade> {
        self.close(time, price, signal, TradeStatus::OpenAtEnd);
        self.trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn short_trade_profits_from_a_fall() {
        let mut ledger = TradeLedger::new(vec!["X".to_string(), "Y".to_string()]);
        ledger.open(TradeDirection::Short, day(1), dec!(2.5), Some(1.8));
        ledger.close(day(3), dec!(1.0), Some(0.1), TradeStatus::Closed);
        let trades = ledger.finish(day(4), dec!(9), None);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].pnl, dec!(1.5));
        assert_eq!(trades[0].symbols, vec!["X", "Y"]);
    }

    #[test]
    fn reopening_flips_and_finish_marks_open_at_end() {
        let mut ledger = TradeLedger::new(vec!["X".to_string()]);
        ledger.open(TradeDirection::Long, day(1), dec!(10), None);
        ledger.open(TradeDirection::Short, day(2), dec!(12), None);
        let trades = ledger.finish(day(3), dec!(11), None);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].pnl, dec!(2));
        assert_eq!(trades[0].status, TradeStatus::Closed);
        assert_eq!(trades[1].direction, TradeDirection::Short);
        assert_eq!(trades[1].pnl, dec!(1));
        assert_eq!(trades[1].status, TradeStatus::OpenAtEnd);
    }
}
