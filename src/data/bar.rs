use crate::error::{BacktestError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

//display format for result dates
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

//a single closing price observation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PriceBar {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        PriceBar { timestamp, close }
    }
}

//ordered closing prices for one symbol over a closed date range
//timestamps are strictly increasing once built through normalize
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    //builds a series from raw bars: drops missing closes, sorts, and keeps the
    //last bar for any duplicated timestamp
    pub fn normalize(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        let symbol = symbol.into();
        let raw_len = bars.len();

        bars.retain(|bar| bar.close.is_finite());
        let missing = raw_len - bars.len();

        //stable sort keeps file order among equal timestamps
        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }
        let duplicates = raw_len - missing - deduped.len();

        if missing > 0 || duplicates > 0 {
            debug!(
                symbol = %symbol,
                missing,
                duplicates,
                kept = deduped.len(),
                "normalized price series"
            );
        }

        PriceSeries {
            symbol,
            bars: deduped,
        }
    }

    //restricts the series to bars within [start, end]
    pub fn within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> PriceSeries {
        PriceSeries {
            symbol: self.symbol.clone(),
            bars: self
                .bars
                .iter()
                .filter(|bar| bar.timestamp >= start && bar.timestamp <= end)
                .copied()
                .collect(),
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }
}

//which side of a date range a string describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

//parses an ISO-8601 instant
//a bare date as an end bound covers the whole day
pub fn parse_instant(value: &str, bound: RangeBound) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| BacktestError::invalid(format!("invalid date '{}'", value)))?;
        let start = Utc.from_utc_datetime(&midnight);
        return Ok(match bound {
            RangeBound::Start => start,
            RangeBound::End => start + Duration::days(1) - Duration::nanoseconds(1),
        });
    }

    Err(BacktestError::invalid(format!(
        "'{}' is not an ISO-8601 date or date-time",
        value
    )))
}

//formats an instant the way result dates are displayed
pub fn format_instant(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DISPLAY_FORMAT).to_string()
}
