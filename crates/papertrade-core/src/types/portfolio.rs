//! Portfolio account type and roll-up fields.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// One virtual brokerage account.
///
/// Cash and the roll-up fields are mutated only by the trade executor and
/// the replay engine; everything else reads a consistent snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    /// Unique portfolio ID
    pub id: Uuid,
    /// Owning user
    pub owner_id: String,
    /// Display name
    pub name: String,
    /// Available cash; never negative
    pub cash: Decimal,
    /// Immutable baseline for P&L
    pub initial_balance: Decimal,
    /// cash + market value of open positions
    pub total_equity: Decimal,
    /// Market value of open positions
    pub stocks_value: Decimal,
    /// total_equity - initial_balance
    pub total_pnl: Decimal,
    /// total_pnl / initial_balance * 100
    pub total_pnl_percent: Decimal,
    /// Equity change since the day anchor
    pub daily_pnl: Decimal,
    /// daily_pnl / day_anchor_equity * 100
    pub daily_pnl_percent: Decimal,
    /// Count of open positions
    pub open_positions: u32,
    /// Whether the auto-trading evaluator may act on this portfolio
    pub auto_trading_enabled: bool,
    /// Ceiling on auto-trades per effective-clock day
    pub auto_max_trades_per_day: u32,
    /// Per-order equity fraction cap applied to strategy sizing
    pub auto_risk_limit: Decimal,
    /// Whether the portfolio clock is pinned to a simulated instant
    pub time_travel_enabled: bool,
    /// Simulated instant; only meaningful when time travel is enabled
    pub sim_instant: Option<DateTime<Utc>>,
    /// Effective-clock day the daily anchor was taken on
    pub day_anchor_date: Option<NaiveDate>,
    /// Equity at the first roll-up of the anchor day
    pub day_anchor_equity: Decimal,
    /// Record creation instant
    pub created_at: DateTime<Utc>,
    /// Last mutation instant
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    /// Create a portfolio with cash equal to the initial balance.
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>, initial_balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            cash: initial_balance,
            initial_balance,
            total_equity: initial_balance,
            stocks_value: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            total_pnl_percent: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            daily_pnl_percent: Decimal::ZERO,
            open_positions: 0,
            auto_trading_enabled: false,
            auto_max_trades_per_day: 10,
            auto_risk_limit: Decimal::new(10, 2), // 0.10 of equity
            time_travel_enabled: false,
            sim_instant: None,
            day_anchor_date: None,
            day_anchor_equity: initial_balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Enable auto-trading with the given daily ceiling and risk cap.
    pub fn with_auto_trading(mut self, max_trades_per_day: u32, risk_limit: Decimal) -> Self {
        self.auto_trading_enabled = true;
        self.auto_max_trades_per_day = max_trades_per_day;
        self.auto_risk_limit = risk_limit;
        self
    }

    /// The portfolio's current instant: the simulated clock when time
    /// travel is active, the wall clock otherwise.
    pub fn effective_now(&self) -> DateTime<Utc> {
        if self.time_travel_enabled {
            self.sim_instant.unwrap_or_else(Utc::now)
        } else {
            Utc::now()
        }
    }

    /// Midnight (UTC) of the effective-clock day, the lower bound of the
    /// daily auto-trade window.
    pub fn effective_midnight(&self) -> DateTime<Utc> {
        let now = self.effective_now();
        now.date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc()
    }

    /// Verify the caller owns this portfolio.
    pub fn ensure_owned_by(&self, owner_id: &str) -> EngineResult<()> {
        if self.owner_id == owner_id {
            Ok(())
        } else {
            Err(EngineError::Unauthorized(format!(
                "portfolio {} is not owned by {owner_id}",
                self.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_portfolio_starts_flat() {
        let p = Portfolio::new("user-1", "Main", dec!(100000));
        assert_eq!(p.cash, dec!(100000));
        assert_eq!(p.total_equity, dec!(100000));
        assert_eq!(p.total_pnl, Decimal::ZERO);
        assert_eq!(p.open_positions, 0);
        assert!(!p.auto_trading_enabled);
        assert!(!p.time_travel_enabled);
    }

    #[test]
    fn test_with_auto_trading() {
        let p = Portfolio::new("user-1", "Bot", dec!(50000)).with_auto_trading(5, dec!(0.25));
        assert!(p.auto_trading_enabled);
        assert_eq!(p.auto_max_trades_per_day, 5);
        assert_eq!(p.auto_risk_limit, dec!(0.25));
    }

    #[test]
    fn test_effective_now_follows_sim_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();
        let mut p = Portfolio::new("user-1", "Main", dec!(1000));
        p.time_travel_enabled = true;
        p.sim_instant = Some(instant);

        assert_eq!(p.effective_now(), instant);
        assert_eq!(
            p.effective_midnight(),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_effective_now_wall_clock_when_disabled() {
        let mut p = Portfolio::new("user-1", "Main", dec!(1000));
        p.sim_instant = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        // Time travel off: the stale sim instant is ignored.
        assert!(p.effective_now() > Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_ownership_check() {
        let p = Portfolio::new("user-1", "Main", dec!(1000));
        assert!(p.ensure_owned_by("user-1").is_ok());
        let err = p.ensure_owned_by("intruder").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }
}
