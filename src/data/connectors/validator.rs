use crate::error::{AqnheError, Result};
use polars::prelude::*;
use super::types::{RequiredColumn, TIMESTAMP_ALIASES};
use std::collections::HashMap;

/// Schema checks on a raw OHLCV frame before it is turned into bars.
pub struct DataValidator;

impl DataValidator {
    /// Resolve every OHLCV column (through its aliases) and check it is numeric
    /// and null-free. Returns the actual column name for each required column.
    pub fn validate_ohlcv(df: &DataFrame) -> Result<HashMap<RequiredColumn, String>> {
        let mut column_map = HashMap::new();

        for required in RequiredColumn::all() {
            let actual = Self::find_column(df, &required).ok_or_else(|| {
                AqnheError::DataLoading(format!(
                    "Missing required column: {} (tried aliases: {:?})",
                    required.as_str(),
                    required.aliases()
                ))
            })?;
            column_map.insert(required, actual.to_string());
        }

        for (required, actual) in &column_map {
            let column = df.column(actual)?;
            if !Self::is_numeric(column.dtype()) {
                return Err(AqnheError::DataLoading(format!(
                    "Column '{}' ({}) must be numeric, found {:?}",
                    actual,
                    required.as_str(),
                    column.dtype()
                )));
            }
            if column.null_count() > 0 {
                return Err(AqnheError::DataLoading(format!(
                    "Column '{}' has {} null values",
                    actual,
                    column.null_count()
                )));
            }
        }

        Ok(column_map)
    }

    /// First column named like a timestamp, whatever its type.
    pub fn find_timestamp_column(df: &DataFrame) -> Option<String> {
        let columns = df.get_column_names();
        TIMESTAMP_ALIASES
            .into_iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
            .map(|alias| alias.to_string())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(AqnheError::InsufficientHistory {
                required: min_rows,
                available: df.height(),
            });
        }
        Ok(())
    }

    fn is_numeric(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32
        )
    }

    fn find_column(df: &DataFrame, required: &RequiredColumn) -> Option<&'static str> {
        let columns = df.get_column_names();
        required
            .aliases()
            .into_iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
    }
}
