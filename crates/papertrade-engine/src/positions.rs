//! Position read surface.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use papertrade_core::error::{EngineError, EngineResult};
use papertrade_core::traits::{LedgerStore, PriceSource};
use papertrade_core::types::Position;

/// Read access to a portfolio's positions.
///
/// Cost-basis arithmetic lives on [`Position`] itself and runs inside the
/// executor's atomic unit; this type serves the display and valuation
/// reads around it.
pub struct PositionManager {
    ledger: Arc<dyn LedgerStore>,
}

impl PositionManager {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// All positions for a portfolio, open and closed.
    pub fn all_positions(&self, portfolio_id: Uuid) -> EngineResult<Vec<Position>> {
        Ok(self.ledger.positions(portfolio_id)?)
    }

    /// Open positions only.
    pub fn open_positions(&self, portfolio_id: Uuid) -> EngineResult<Vec<Position>> {
        let positions = self.ledger.positions(portfolio_id)?;
        Ok(positions.into_iter().filter(|p| p.is_open()).collect())
    }

    /// The open position for a symbol, if any.
    pub fn find_open(&self, portfolio_id: Uuid, symbol: &str) -> EngineResult<Option<Position>> {
        Ok(self
            .ledger
            .open_position(portfolio_id, &symbol.to_ascii_uppercase())?)
    }

    /// The open position for a symbol, or `NoPosition`.
    pub fn require_open(&self, portfolio_id: Uuid, symbol: &str) -> EngineResult<Position> {
        self.find_open(portfolio_id, symbol)?
            .ok_or_else(|| EngineError::NoPosition(symbol.to_ascii_uppercase()))
    }

    /// Open positions re-marked at fresh quotes.
    ///
    /// A symbol whose quote fails keeps its stored mark; the marks are not
    /// persisted here.
    pub async fn marked_open_positions(
        &self,
        portfolio_id: Uuid,
        prices: &dyn PriceSource,
    ) -> EngineResult<Vec<Position>> {
        let mut positions = self.open_positions(portfolio_id)?;
        for position in &mut positions {
            match prices.price(&position.symbol).await {
                Ok(price) => position.mark(price),
                Err(err) => {
                    warn!(symbol = %position.symbol, error = %err, "quote failed, keeping last mark");
                }
            }
        }
        Ok(positions)
    }
}
