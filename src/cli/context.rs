//! Shared command wiring.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use papertrade_config::{load_config, AppConfig, DataSourceKind};
use papertrade_core::error::{DataError, EngineError};
use papertrade_core::traits::{LedgerStore, PriceSource, SignalSource, SignalStore};
use papertrade_core::types::{Portfolio, Signal};
use papertrade_data::{
    AgentSignalSource, CachingPriceSource, CsvPriceSource, HttpPriceSource, PriceCache,
    StoredSignalSource,
};
use papertrade_engine::{PortfolioAggregator, PortfolioLocks, ReplayEngine, TradeExecutor};
use papertrade_ledger::{MemoryLedger, SqliteLedger};
use papertrade_strategies::{AutoTradingEvaluator, SignalRouter};

/// Everything a command needs: loaded configuration plus the shared
/// ledger, price source, and lock registry the engines hang off.
pub struct AppContext {
    pub config: AppConfig,
    pub ledger: Arc<dyn LedgerStore>,
    pub signals: Arc<dyn SignalStore>,
    pub prices: Arc<dyn PriceSource>,
    pub locks: Arc<PortfolioLocks>,
}

impl AppContext {
    /// Load configuration and build the service stack.
    pub fn init(config_path: &Path) -> Result<Self> {
        let config = load_config(config_path).context("failed to load configuration")?;
        config.validate().context("invalid configuration")?;

        let (ledger, signals): (Arc<dyn LedgerStore>, Arc<dyn SignalStore>) =
            if config.ledger.in_memory {
                let store = Arc::new(MemoryLedger::new());
                (store.clone(), store)
            } else {
                let store = Arc::new(SqliteLedger::open(&config.ledger.path).with_context(
                    || format!("failed to open ledger at {}", config.ledger.path),
                )?);
                (store.clone(), store)
            };

        let prices = build_price_source(&config)?;

        Ok(Self {
            config,
            ledger,
            signals,
            prices,
            locks: Arc::new(PortfolioLocks::new()),
        })
    }

    pub fn executor(&self) -> Arc<TradeExecutor> {
        Arc::new(TradeExecutor::new(
            self.ledger.clone(),
            self.prices.clone(),
            self.locks.clone(),
        ))
    }

    pub fn aggregator(&self) -> PortfolioAggregator {
        PortfolioAggregator::new(self.ledger.clone(), self.prices.clone(), self.locks.clone())
    }

    pub fn replay_engine(&self) -> ReplayEngine {
        ReplayEngine::new(self.ledger.clone(), self.locks.clone())
    }

    pub fn evaluator(&self) -> Result<AutoTradingEvaluator> {
        let stored: Arc<dyn SignalSource> =
            Arc::new(StoredSignalSource::new(self.signals.clone()));
        let agent: Arc<dyn SignalSource> = if self.config.data.agent_url.trim().is_empty() {
            Arc::new(AgentDisabled)
        } else {
            Arc::new(AgentSignalSource::with_timeout(
                self.config.data.agent_url.clone(),
                Duration::from_secs(self.config.data.timeout_secs),
            )?)
        };
        let router = Arc::new(SignalRouter::new(agent, stored));

        Ok(AutoTradingEvaluator::new(
            self.ledger.clone(),
            self.executor(),
            router,
            self.prices.clone(),
        ))
    }

    /// Fetch a portfolio and verify the acting user owns it.
    pub fn require_owned(&self, id: Uuid, owner: &str) -> Result<Portfolio> {
        let portfolio = self
            .ledger
            .portfolio(id)?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {id}")))?;
        portfolio.ensure_owned_by(owner)?;
        Ok(portfolio)
    }
}

fn build_price_source(config: &AppConfig) -> Result<Arc<dyn PriceSource>> {
    let source: Arc<dyn PriceSource> = match config.data.source {
        DataSourceKind::Csv => {
            let path = config
                .data
                .csv_path
                .as_deref()
                .context("data.csv_path is not set")?;
            Arc::new(
                CsvPriceSource::load(path)
                    .with_context(|| format!("failed to load price table {path}"))?,
            )
        }
        DataSourceKind::Http => {
            let http: Arc<dyn PriceSource> = Arc::new(HttpPriceSource::with_timeout(
                config.data.quote_url.clone(),
                Duration::from_secs(config.data.timeout_secs),
            )?);
            if config.data.cache_ttl_secs > 0 {
                let cache = Arc::new(PriceCache::new(config.data.cache_ttl_secs));
                Arc::new(CachingPriceSource::new(http, cache))
            } else {
                http
            }
        }
    };
    Ok(source)
}

/// Stands in for the analysis agent when no URL is configured, so
/// agent-based strategies skip with "no signal" instead of erroring.
struct AgentDisabled;

#[async_trait]
impl SignalSource for AgentDisabled {
    async fn signal(&self, _symbol: &str) -> Result<Option<Signal>, DataError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "agent-disabled"
    }
}
