pub mod connectors;
pub mod market;

pub use connectors::{CsvConnector, DataValidator, DatasetMetadata, RequiredColumn};
pub use market::{Bar, MarketData};
