use crate::data::bar::{parse_instant, PriceBar, PriceSeries, RangeBound};
use crate::error::{BacktestError, Result};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

//a read-only provider of historical closing prices
pub trait PriceSource: Send + Sync {
    //identifies the data source, used as part of cache keys
    fn source_id(&self) -> &str;

    //fetches raw bars for symbol covering at least [start, end]
    //bars may be unordered or contain duplicates; load normalizes them
    fn fetch(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<Vec<PriceBar>>;

    //loads a normalized series for symbol over [start, end]
    fn load(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<PriceSeries> {
        if start >= end {
            return Err(BacktestError::invalid(format!(
                "start {} must be before end {}",
                start, end
            )));
        }

        let raw = self.fetch(symbol, start, end)?;
        let series = PriceSeries::normalize(symbol, raw).within(start, end);

        if series.is_empty() {
            return Err(BacktestError::unavailable(
                symbol,
                format!("no bars between {} and {}", start, end),
            ));
        }

        debug!(
            symbol,
            source = self.source_id(),
            bars = series.len(),
            "loaded price series"
        );
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    #[serde(default)]
    close: Option<f64>,
    symbol: String,
}

//price source backed by a single csv file with timestamp, close and symbol columns
//any other columns (open, high, low, volume) are ignored
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
    source_id: String,
}

impl CsvPriceSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let source_id = format!("csv:{}", path.display());
        CsvPriceSource { path, source_id }
    }
}

impl PriceSource for CsvPriceSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch(
        &self,
        symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        let bars = load_csv(&self.path)?;
        Ok(filter_by_symbol(bars, symbol))
    }
}

//loads every (symbol, bar) row from a csv file
//rows with an empty close are kept as NaN so normalization can drop them
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<(String, PriceBar)>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            BacktestError::unavailable("*", format!("failed to open {:?}: {}", path, e))
        })?;

    let mut rows = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: CsvRecord = result.map_err(|e| {
            BacktestError::unavailable(
                "*",
                format!("failed to parse record at line {}: {}", index + 2, e),
            )
        })?;

        //daily files often carry bare dates; those stamp the bar at midnight utc
        let timestamp = parse_instant(&record.timestamp, RangeBound::Start).map_err(|e| {
            BacktestError::unavailable(
                &record.symbol,
                format!(
                    "failed to parse timestamp '{}' at line {}: {}",
                    record.timestamp,
                    index + 2,
                    e
                ),
            )
        })?;

        let bar = PriceBar::new(timestamp, record.close.unwrap_or(f64::NAN));
        rows.push((record.symbol, bar));
    }

    Ok(rows)
}

//keeps the bars that belong to symbol
pub fn filter_by_symbol(rows: Vec<(String, PriceBar)>, symbol: &str) -> Vec<PriceBar> {
    rows.into_iter()
        .filter(|(s, _)| s == symbol)
        .map(|(_, bar)| bar)
        .collect()
}

//price source holding bars in memory, for embedding callers and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    source_id: String,
    series: HashMap<String, Vec<PriceBar>>,
}

impl InMemoryPriceSource {
    pub fn new(source_id: impl Into<String>) -> Self {
        InMemoryPriceSource {
            source_id: source_id.into(),
            series: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.series.insert(symbol.to_string(), bars);
        self
    }
}

impl PriceSource for InMemoryPriceSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn fetch(
        &self,
        symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| BacktestError::unavailable(symbol, "unknown symbol"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_source_filters_symbol_and_normalizes() {
        let file = write_csv(
            "timestamp,open,high,low,close,volume,symbol\n\
             2024-03-02T00:00:00Z,1,1,1,102.0,10,SPY\n\
             2024-03-01T00:00:00Z,1,1,1,101.0,10,SPY\n\
             2024-03-01T00:00:00Z,1,1,1,55.0,10,QQQ\n\
             2024-03-03T00:00:00Z,1,1,1,,10,SPY\n\
             2024-03-04T00:00:00Z,1,1,1,104.0,10,SPY\n",
        );
        let source = CsvPriceSource::new(file.path());
        let series = source.load("SPY", day(1), day(4)).unwrap();

        assert_eq!(series.closes(), vec![101.0, 102.0, 104.0]);
        assert_eq!(series.symbol, "SPY");
    }

    #[test]
    fn csv_source_reads_date_only_timestamps() {
        let file = write_csv(
            "timestamp,close,symbol\n\
             2024-03-01,100.0,SPY\n\
             2024-03-04,101.0,SPY\n\
             2024-03-04 16:00:00,55.0,QQQ\n",
        );
        let source = CsvPriceSource::new(file.path());
        let series = source.load("SPY", day(1), day(5)).unwrap();

        assert_eq!(series.closes(), vec![100.0, 101.0]);
        assert_eq!(series.timestamps(), vec![day(1), day(4)]);

        let other = source.load("QQQ", day(1), day(5)).unwrap();
        assert_eq!(
            other.timestamps(),
            vec![Utc.with_ymd_and_hms(2024, 3, 4, 16, 0, 0).unwrap()]
        );
    }

    #[test]
    fn csv_source_reports_unknown_symbol_as_unavailable() {
        let file = write_csv("timestamp,close,symbol\n2024-03-01T00:00:00Z,1.0,SPY\n");
        let source = CsvPriceSource::new(file.path());
        let err = source.load("TSLA", day(1), day(2)).unwrap_err();
        assert!(matches!(err, BacktestError::DataUnavailable { .. }));
    }

    #[test]
    fn csv_source_reports_bad_timestamps() {
        let file = write_csv("timestamp,close,symbol\nyesterday,1.0,SPY\n");
        let source = CsvPriceSource::new(file.path());
        let err = source.load("SPY", day(1), day(2)).unwrap_err();
        assert!(matches!(err, BacktestError::DataUnavailable { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let source = CsvPriceSource::new("/definitely/not/here.csv");
        let err = source.load("SPY", day(1), day(2)).unwrap_err();
        assert!(matches!(err, BacktestError::DataUnavailable { .. }));
    }

    #[test]
    fn empty_range_is_unavailable() {
        let source = InMemoryPriceSource::new("mem")
            .with_bars("SPY", vec![PriceBar::new(day(1), 100.0)]);
        let err = source.load("SPY", day(10), day(20)).unwrap_err();
        assert!(matches!(err, BacktestError::DataUnavailable { .. }));
    }

    #[test]
    fn inverted_range_is_invalid() {
        let source = InMemoryPriceSource::new("mem")
            .with_bars("SPY", vec![PriceBar::new(day(1), 100.0)]);
        let err = source.load("SPY", day(5), day(1)).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidParameters { .. }));
    }
}
