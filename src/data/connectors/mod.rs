mod csv;
mod types;
mod validator;

pub use csv::CsvConnector;
pub use types::{DatasetMetadata, RequiredColumn, TIMESTAMP_ALIASES};
pub use validator::DataValidator;
