//! HTTP quote and analysis clients.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use papertrade_core::error::DataError;
use papertrade_core::traits::{PriceSource, SignalSource};
use papertrade_core::types::Signal;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn classify(err: reqwest::Error) -> DataError {
    if err.is_timeout() {
        DataError::Timeout(err.to_string())
    } else {
        DataError::Unavailable(err.to_string())
    }
}

/// Quote endpoint response.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[allow(dead_code)]
    symbol: String,
    price: Decimal,
}

/// Market data client fetching live quotes over HTTP.
pub struct HttpPriceSource {
    client: Client,
    base_url: String,
}

impl HttpPriceSource {
    /// Create a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn price(&self, symbol: &str) -> Result<Decimal, DataError> {
        let url = format!("{}/v1/quote", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(classify)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DataError::Unavailable(format!("{status}: {text}")));
        }

        let quote: QuoteResponse = resp.json().await.map_err(|e| DataError::Parse(e.to_string()))?;
        if quote.price <= Decimal::ZERO {
            return Err(DataError::Parse(format!(
                "non-positive price for {symbol}: {}",
                quote.price
            )));
        }

        debug!(symbol, price = %quote.price, "fetched quote");
        Ok(quote.price)
    }

    fn name(&self) -> &str {
        "market-data"
    }
}

/// Analysis endpoint response.
#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    symbol: String,
    score: Decimal,
    #[serde(default)]
    source: Option<String>,
}

/// Client for the analysis agent, producing fresh signal scores.
pub struct AgentSignalSource {
    client: Client,
    base_url: String,
}

impl AgentSignalSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DataError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SignalSource for AgentSignalSource {
    async fn signal(&self, symbol: &str) -> Result<Option<Signal>, DataError> {
        let url = format!("{}/v1/analyze", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(classify)?;

        // The agent has no opinion on unknown symbols.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DataError::Unavailable(format!("{status}: {text}")));
        }

        let analysis: AnalysisResponse =
            resp.json().await.map_err(|e| DataError::Parse(e.to_string()))?;

        let signal = Signal::new(
            analysis.symbol,
            analysis.score,
            analysis.source.unwrap_or_else(|| "agent".to_string()),
        );
        signal
            .validate()
            .map_err(|e| DataError::Parse(e.to_string()))?;

        debug!(symbol, score = %signal.score, "fetched signal");
        Ok(Some(signal))
    }

    fn name(&self) -> &str {
        "analysis-agent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let source = HttpPriceSource::new("http://localhost:9000/").unwrap();
        assert_eq!(source.base_url, "http://localhost:9000");
        assert_eq!(source.name(), "market-data");
    }

    #[test]
    fn test_quote_parses_string_and_number_prices() {
        let quote: QuoteResponse =
            serde_json::from_str(r#"{"symbol":"AAPL","price":"150.25"}"#).unwrap();
        assert_eq!(quote.price, dec!(150.25));

        let quote: QuoteResponse =
            serde_json::from_str(r#"{"symbol":"AAPL","price":150.25}"#).unwrap();
        assert_eq!(quote.price, dec!(150.25));
    }

    #[test]
    fn test_analysis_source_defaults() {
        let analysis: AnalysisResponse =
            serde_json::from_str(r#"{"symbol":"AAPL","score":"-0.4"}"#).unwrap();
        assert_eq!(analysis.score, dec!(-0.4));
        assert!(analysis.source.is_none());
    }
}
