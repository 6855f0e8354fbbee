use crate::data::market::{Bar, MarketData};
use crate::error::{AqnheError, Result};
use crate::types::Timeframe;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use std::path::Path;
use super::{
    types::{DatasetMetadata, RequiredColumn},
    validator::DataValidator,
};
use std::collections::HashMap;

/// Timestamps below this are taken to be epoch seconds rather than milliseconds.
const SECONDS_CUTOFF: i64 = 100_000_000_000;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| AqnheError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load, validate and convert a CSV file into market data.
    pub fn load_market_data<P: AsRef<Path>>(
        path: P,
        symbol: &str,
        timeframe: Timeframe,
        min_rows: Option<usize>,
    ) -> Result<(MarketData, DatasetMetadata)> {
        let df = Self::load(&path)?;
        if let Some(min_rows) = min_rows {
            DataValidator::validate_minimum_rows(&df, min_rows)?;
        }

        let data = Self::to_market_data(&df, symbol, timeframe)?;
        let metadata = Self::create_metadata(&path, &df, &data);
        log::info!(
            "Loaded {} bars of {} {} from {}",
            metadata.num_rows, symbol, timeframe, metadata.file_path
        );

        Ok((data, metadata))
    }

    /// Convert a validated OHLCV frame into bars.
    pub fn to_market_data(df: &DataFrame, symbol: &str, timeframe: Timeframe) -> Result<MarketData> {
        let column_map = DataValidator::validate_ohlcv(df)?;

        let open = Self::float_column(df, &column_map, RequiredColumn::Open)?;
        let high = Self::float_column(df, &column_map, RequiredColumn::High)?;
        let low = Self::float_column(df, &column_map, RequiredColumn::Low)?;
        let close = Self::float_column(df, &column_map, RequiredColumn::Close)?;
        let volume = Self::float_column(df, &column_map, RequiredColumn::Volume)?;

        let timestamps = match DataValidator::find_timestamp_column(df) {
            Some(name) => Some(Self::timestamp_column(df, &name)?),
            None => None,
        };

        let bars = (0..df.height())
            .map(|i| Bar {
                timestamp: timestamps.as_ref().and_then(|ts| ts[i]),
                open: open[i],
                high: high[i],
                low: low[i],
                close: close[i],
                volume: volume[i],
            })
            .collect();

        MarketData::new(symbol, timeframe, bars)
    }

    fn float_column(
        df: &DataFrame,
        column_map: &HashMap<RequiredColumn, String>,
        required: RequiredColumn,
    ) -> Result<Vec<f64>> {
        let name = column_map.get(&required).ok_or_else(|| {
            AqnheError::DataLoading(format!("Missing required column: {}", required.as_str()))
        })?;
        let column = df.column(name)?.cast(&DataType::Float64)?;
        column
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| {
                    AqnheError::DataLoading(format!("Null {} at row {}", required.as_str(), i))
                })
            })
            .collect()
    }

    /// Timestamps in epoch milliseconds, from epoch integers or date strings.
    fn timestamp_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
        let column = df.column(name)?;
        match column.dtype() {
            DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32 => {
                log::debug!("Reading '{}' as epoch timestamps", name);
                let column = column.cast(&DataType::Int64)?;
                Ok(column
                    .i64()?
                    .into_iter()
                    .map(|v| v.map(|t| if t.abs() < SECONDS_CUTOFF { t * 1000 } else { t }))
                    .collect())
            }
            DataType::String => {
                log::debug!("Parsing '{}' as date strings", name);
                column
                    .str()?
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| match v {
                        Some(text) => Self::parse_datetime(text).map(Some).ok_or_else(|| {
                            AqnheError::DataLoading(format!(
                                "Unparseable timestamp '{}' in '{}' at row {}",
                                text, name, i
                            ))
                        }),
                        None => Ok(None),
                    })
                    .collect()
            }
            other => Err(AqnheError::DataLoading(format!(
                "Timestamp column '{}' has unsupported type {}",
                name, other
            ))),
        }
    }

    /// Epoch milliseconds of an RFC 3339 or `YYYY-MM-DD[ HH:MM[:SS]]` string, read as UTC.
    fn parse_datetime(text: &str) -> Option<i64> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.timestamp_millis());
        }
        DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|dt| dt.and_utc().timestamp_millis())
    }

    fn create_metadata<P: AsRef<Path>>(path: P, df: &DataFrame, data: &MarketData) -> DatasetMetadata {
        let closes = data.closes();
        let price_range = closes.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
            (lo.min(c), hi.max(c))
        });
        let price_range = if closes.is_empty() { (0.0, 0.0) } else { price_range };

        let first = data.bars().first().and_then(|b| b.timestamp);
        let last = data.bars().last().and_then(|b| b.timestamp);
        let date_range = match (first, last) {
            (Some(a), Some(b)) => DateTime::<Utc>::from_timestamp_millis(a)
                .zip(DateTime::<Utc>::from_timestamp_millis(b)),
            _ => None,
        };

        DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: df.height(),
            columns: df.get_column_names().iter().map(|s| s.to_string()).collect(),
            timestamp_column: DataValidator::find_timestamp_column(df),
            date_range,
            price_range,
        }
    }
}
