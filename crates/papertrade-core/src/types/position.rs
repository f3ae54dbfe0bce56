//! Position types and cost-basis arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Size below which a position counts as closed.
///
/// Fractional sells can leave dust; comparisons against zero always go
/// through this epsilon, never exact equality.
pub fn close_epsilon() -> Decimal {
    Decimal::new(1, 4) // 0.0001
}

/// An open or closed holding of one asset within one portfolio.
///
/// At most one open position exists per (portfolio, symbol) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Unique position ID
    pub id: Uuid,
    /// Owning portfolio
    pub portfolio_id: Uuid,
    /// Asset symbol
    pub symbol: String,
    /// Weighted-average entry price
    pub entry_price: Decimal,
    /// Current mark price
    pub current_price: Decimal,
    /// Quantity held (>= 0, fractional allowed)
    pub size: Decimal,
    /// When the position was opened
    pub opened_at: DateTime<Utc>,
    /// Set when the position closes
    pub closed_at: Option<DateTime<Utc>>,
    /// Unrealized P&L at the current mark
    pub unrealized_pnl: Decimal,
    /// Unrealized P&L as a percentage of cost
    pub unrealized_pnl_percent: Decimal,
    /// Strategy that opened the position, if any
    pub strategy_id: Option<Uuid>,
}

impl Position {
    /// Open a new position from a first buy.
    pub fn open(
        portfolio_id: Uuid,
        symbol: impl Into<String>,
        size: Decimal,
        price: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            portfolio_id,
            symbol: symbol.into(),
            entry_price: price,
            current_price: price,
            size,
            opened_at,
            closed_at: None,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_percent: Decimal::ZERO,
            strategy_id: None,
        }
    }

    /// Attach the originating strategy.
    pub fn with_strategy(mut self, strategy_id: Uuid) -> Self {
        self.strategy_id = Some(strategy_id);
        self
    }

    /// Whether the position still holds anything.
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none() && self.size > close_epsilon()
    }

    /// Market value at the current mark.
    pub fn market_value(&self) -> Decimal {
        self.size * self.current_price
    }

    /// Cost basis at the weighted-average entry.
    pub fn cost_basis(&self) -> Decimal {
        self.size * self.entry_price
    }

    /// Update the mark price and recompute unrealized P&L.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl = (price - self.entry_price) * self.size;
        let basis = self.cost_basis();
        if basis != Decimal::ZERO {
            self.unrealized_pnl_percent = self.unrealized_pnl / basis * Decimal::ONE_HUNDRED;
        } else {
            self.unrealized_pnl_percent = Decimal::ZERO;
        }
    }

    /// Fold an additional buy into the position, blending the
    /// weighted-average entry price:
    /// `new_avg = (old_size * old_avg + qty * price) / (old_size + qty)`.
    pub fn blend_buy(&mut self, quantity: Decimal, price: Decimal) {
        let new_size = self.size + quantity;
        if new_size != Decimal::ZERO {
            self.entry_price = (self.size * self.entry_price + quantity * price) / new_size;
        }
        self.size = new_size;
        self.mark(price);
    }

    /// Reduce the position by a sell, returning the realized P&L
    /// `(price - entry) * quantity`. Closes the position when the
    /// remaining size falls within the epsilon of zero.
    ///
    /// The caller must have verified `quantity <= self.size`.
    pub fn reduce_sell(
        &mut self,
        quantity: Decimal,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Decimal {
        let realized = (price - self.entry_price) * quantity;
        self.size -= quantity;

        if self.size <= close_epsilon() {
            self.size = Decimal::ZERO;
            self.closed_at = Some(at);
            self.unrealized_pnl = Decimal::ZERO;
            self.unrealized_pnl_percent = Decimal::ZERO;
            self.current_price = price;
        } else {
            // Entry price is unchanged on a partial sell.
            self.mark(price);
        }

        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(size: Decimal, price: Decimal) -> Position {
        Position::open(Uuid::new_v4(), "AAPL", size, price, Utc::now())
    }

    #[test]
    fn test_open_position() {
        let pos = position(dec!(10), dec!(150.00));
        assert!(pos.is_open());
        assert_eq!(pos.entry_price, dec!(150.00));
        assert_eq!(pos.market_value(), dec!(1500.00));
        assert_eq!(pos.unrealized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_blend_buy_averages_entry() {
        let mut pos = position(dec!(10), dec!(50));
        pos.blend_buy(dec!(10), dec!(60));
        assert_eq!(pos.size, dec!(20));
        assert_eq!(pos.entry_price, dec!(55));
    }

    #[test]
    fn test_blend_buy_weighted() {
        let mut pos = position(dec!(100), dec!(150.00));
        pos.blend_buy(dec!(50), dec!(165.00));
        assert_eq!(pos.size, dec!(150));
        assert_eq!(pos.entry_price, dec!(155.00));
    }

    #[test]
    fn test_partial_sell_keeps_entry() {
        let mut pos = position(dec!(20), dec!(55));
        let realized = pos.reduce_sell(dec!(5), dec!(70), Utc::now());
        assert_eq!(realized, dec!(75)); // (70 - 55) * 5
        assert_eq!(pos.size, dec!(15));
        assert_eq!(pos.entry_price, dec!(55));
        assert!(pos.is_open());
        assert_eq!(pos.unrealized_pnl, dec!(225)); // (70 - 55) * 15
    }

    #[test]
    fn test_full_sell_closes() {
        let mut pos = position(dec!(20), dec!(55));
        let at = Utc::now();
        let realized = pos.reduce_sell(dec!(20), dec!(70), at);
        assert_eq!(realized, dec!(300));
        assert_eq!(pos.size, Decimal::ZERO);
        assert_eq!(pos.closed_at, Some(at));
        assert!(!pos.is_open());
    }

    #[test]
    fn test_dust_remainder_closes() {
        let mut pos = position(dec!(10), dec!(100));
        pos.reduce_sell(dec!(9.99995), dec!(100), Utc::now());
        assert_eq!(pos.size, Decimal::ZERO);
        assert!(pos.closed_at.is_some());
    }

    #[test]
    fn test_mark_updates_unrealized() {
        let mut pos = position(dec!(100), dec!(150.00));
        pos.mark(dec!(160.00));
        assert_eq!(pos.unrealized_pnl, dec!(1000.00));
        assert!((pos.unrealized_pnl_percent - dec!(6.6666)).abs() < dec!(0.001));
    }
}
