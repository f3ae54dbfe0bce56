//! Quote and signal sources.

mod csv_prices;
mod http;
mod price_cache;
mod stored_signals;

pub use csv_prices::CsvPriceSource;
pub use http::{AgentSignalSource, HttpPriceSource};
pub use price_cache::{CachingPriceSource, PriceCache};
pub use stored_signals::StoredSignalSource;
