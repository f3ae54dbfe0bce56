//! Auto-trading run reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TradeAction;

/// Why a symbol was skipped during an auto-trading run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DailyLimit,
    NoSignal,
    BelowThreshold,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::DailyLimit => write!(f, "daily limit"),
            SkipReason::NoSignal => write!(f, "no signal"),
            SkipReason::BelowThreshold => write!(f, "below threshold"),
        }
    }
}

/// One trade the evaluator executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedItem {
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: Decimal,
    pub price: Decimal,
    pub score: Decimal,
    pub trade_id: Uuid,
    pub strategy: String,
}

/// One symbol the evaluator skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub symbol: String,
    pub reason: SkipReason,
    pub strategy: String,
}

/// One symbol that failed during the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErroredItem {
    pub symbol: String,
    pub kind: String,
    pub message: String,
    pub strategy: String,
}

/// Item counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub executed_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
}

/// Structured tally of one auto-trading run.
///
/// Per-item failures are recorded here rather than propagated; the run
/// as a whole succeeds even when every item failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub portfolio_id: Uuid,
    pub executed: Vec<ExecutedItem>,
    pub skipped: Vec<SkippedItem>,
    pub errors: Vec<ErroredItem>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(portfolio_id: Uuid) -> Self {
        Self {
            portfolio_id,
            executed: Vec::new(),
            skipped: Vec::new(),
            errors: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    pub fn record_execution(&mut self, item: ExecutedItem) {
        self.executed.push(item);
        self.summary.executed_count += 1;
    }

    pub fn record_skip(&mut self, symbol: &str, strategy: &str, reason: SkipReason) {
        self.skipped.push(SkippedItem {
            symbol: symbol.to_string(),
            reason,
            strategy: strategy.to_string(),
        });
        self.summary.skipped_count += 1;
    }

    pub fn record_error(&mut self, symbol: &str, strategy: &str, kind: &str, message: String) {
        self.errors.push(ErroredItem {
            symbol: symbol.to_string(),
            kind: kind.to_string(),
            message,
            strategy: strategy.to_string(),
        });
        self.summary.error_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_counts() {
        let mut report = RunReport::new(Uuid::new_v4());
        report.record_execution(ExecutedItem {
            symbol: "AAPL".into(),
            action: TradeAction::Buy,
            quantity: dec!(10),
            price: dec!(150),
            score: dec!(0.8),
            trade_id: Uuid::new_v4(),
            strategy: "momentum".into(),
        });
        report.record_skip("MSFT", "momentum", SkipReason::BelowThreshold);
        report.record_skip("NVDA", "momentum", SkipReason::NoSignal);
        report.record_error("TSLA", "momentum", "insufficient_funds", "broke".into());

        assert_eq!(report.summary.executed_count, 1);
        assert_eq!(report.summary.skipped_count, 2);
        assert_eq!(report.summary.error_count, 1);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = RunReport::new(Uuid::new_v4());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"portfolioId\""));
        assert!(json.contains("\"executed\":[]"));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"executedCount\":0"));
    }
}
