//! CSV-backed price source.
//!
//! Loads a flat price table once at startup. Useful for offline runs
//! and deterministic tests; quotes never change between lookups.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use papertrade_core::error::DataError;
use papertrade_core::traits::PriceSource;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Symbol", alias = "ticker", alias = "Ticker")]
    symbol: String,
    #[serde(alias = "Price", alias = "close", alias = "Close")]
    price: String,
}

/// Fixed price table loaded from a CSV file.
pub struct CsvPriceSource {
    prices: HashMap<String, Decimal>,
}

impl CsvPriceSource {
    /// Load a price table from a CSV file with `symbol,price` columns.
    ///
    /// Symbols are normalized to uppercase; a repeated symbol keeps the
    /// last row.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())
            .map_err(|e| DataError::Unavailable(e.to_string()))?;

        let mut prices = HashMap::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::Parse(e.to_string()))?;
            let price = Decimal::from_str(record.price.trim()).map_err(|e| {
                DataError::Parse(format!("bad price for {}: {e}", record.symbol))
            })?;
            if price <= Decimal::ZERO {
                return Err(DataError::Parse(format!(
                    "non-positive price for {}: {price}",
                    record.symbol
                )));
            }
            prices.insert(record.symbol.trim().to_ascii_uppercase(), price);
        }

        info!(symbols = prices.len(), "loaded csv price table");
        Ok(Self { prices })
    }

    /// Number of symbols in the table.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[async_trait]
impl PriceSource for CsvPriceSource {
    async fn price(&self, symbol: &str) -> Result<Decimal, DataError> {
        self.prices
            .get(&symbol.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_and_lookup() {
        let file = write_csv("symbol,price\nAAPL,150.25\nmsft,310\n");
        let source = CsvPriceSource::load(file.path()).unwrap();

        assert_eq!(source.len(), 2);
        assert_eq!(source.price("AAPL").await.unwrap(), dec!(150.25));
        // Lookups and the table are both case-insensitive.
        assert_eq!(source.price("msft").await.unwrap(), dec!(310));
        assert!(matches!(
            source.price("TSLA").await,
            Err(DataError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_bad_price() {
        let file = write_csv("symbol,price\nAAPL,abc\n");
        assert!(matches!(
            CsvPriceSource::load(file.path()),
            Err(DataError::Parse(_))
        ));

        let file = write_csv("symbol,price\nAAPL,0\n");
        assert!(matches!(
            CsvPriceSource::load(file.path()),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvPriceSource::load("/nonexistent/prices.csv"),
            Err(DataError::Unavailable(_))
        ));
    }

    #[test]
    fn test_duplicate_symbol_keeps_last() {
        let file = write_csv("symbol,price\nAAPL,100\nAAPL,101\n");
        let source = CsvPriceSource::load(file.path()).unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.prices["AAPL"], dec!(101));
    }
}
