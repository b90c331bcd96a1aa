//! CSV directory provider.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with a header row:
//!
//! ```text
//! timestamp,open,high,low,close,volume[,bid,ask]
//! 2024-01-02,100.0,101.5,99.2,101.0,1200000
//! 2024-01-03T00:00:00Z,101.0,102.0,100.1,101.7,980000
//! ```
//!
//! Timestamps may be RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::provider::{slice_range, DataError, DataProvider, DataSource};
use crate::domain::{Bar, Interval, PriceSeries};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    #[serde(default)]
    bid: Option<f64>,
    #[serde(default)]
    ask: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
    interval: Interval,
}

impl CsvProvider {
    /// Daily bars from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            interval: Interval::Day1,
        }
    }

    /// Declare the interval the files in this directory are sampled at.
    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Parse a whole file into a series. Rows may appear in any order;
    /// duplicate timestamps are rejected.
    pub fn load_file(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::symbol_not_found(symbol));
        }
        let source_name = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| csv_error(&source_name, 0, e))?;

        let mut bars = Vec::new();
        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let line = i + 2;
            let row = row.map_err(|e| csv_error(&source_name, line, e))?;
            let timestamp =
                parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Parse {
                    source_name: source_name.clone(),
                    row: line,
                    detail: format!("unrecognized timestamp '{}'", row.timestamp),
                })?;
            let mut bar = Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume);
            if let (Some(bid), Some(ask)) = (row.bid, row.ask) {
                bar = bar.with_quote(bid, ask);
            }
            bars.push(bar);
        }
        bars.sort_by_key(|b| b.timestamp);
        debug!(symbol, rows = bars.len(), path = %source_name, "loaded csv");

        PriceSeries::new(symbol, self.interval, bars)
            .map_err(|e| DataError::Validation(e.to_string()))
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::Csv
    }

    fn get_price_series(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<PriceSeries, DataError> {
        if interval != self.interval {
            return Err(DataError::IntervalUnavailable {
                symbol: symbol.to_string(),
                requested: interval,
                available: self.interval,
            });
        }
        let series = self.load_file(symbol)?;
        slice_range(&series, start, end)
    }
}

/// Write a series in the format `CsvProvider` reads.
pub fn write_series(path: impl AsRef<Path>, series: &PriceSeries) -> Result<(), DataError> {
    let source_name = path.as_ref().display().to_string();
    let mut writer =
        csv::Writer::from_path(path.as_ref()).map_err(|e| csv_error(&source_name, 0, e))?;
    let quoted = series
        .bars()
        .iter()
        .all(|b| b.bid.is_some() && b.ask.is_some());

    let mut header = vec!["timestamp", "open", "high", "low", "close", "volume"];
    if quoted {
        header.extend(["bid", "ask"]);
    }
    writer
        .write_record(&header)
        .map_err(|e| csv_error(&source_name, 1, e))?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut record = vec![
            bar.timestamp.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ];
        if quoted {
            record.push(bar.bid.map(|v| v.to_string()).unwrap_or_default());
            record.push(bar.ask.map(|v| v.to_string()).unwrap_or_default());
        }
        writer
            .write_record(&record)
            .map_err(|e| csv_error(&source_name, i + 2, e))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_error(source_name: &str, row: usize, e: csv::Error) -> DataError {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return DataError::Io(io);
        }
        return DataError::Validation(format!("{source_name}: unreadable"));
    }
    DataError::Parse {
        source_name: source_name.to_string(),
        row,
        detail: e.to_string(),
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> (DateTime<Utc>, DateTime<Utc>) {
        (DateTime::<Utc>::UNIX_EPOCH, Utc::now() + chrono::Duration::days(3650))
    }

    #[test]
    fn reads_mixed_timestamp_formats_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("SPY.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-03T00:00:00Z,101,102,100,101.5,900\n\
             2024-01-02,100,101,99,101,1000\n\
             2024-01-04 00:00:00,101.5,103,101,102,1100\n",
        )
        .unwrap();
        let p = CsvProvider::new(dir.path());
        let (start, end) = wide();
        let s = p.get_price_series("SPY", start, end, Interval::Day1).unwrap();
        assert_eq!(s.closes(), vec![101.0, 101.5, 102.0]);
        assert!(s.bars().iter().all(|b| b.bid.is_none()));
    }

    #[test]
    fn reads_optional_quotes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("BTC.csv"),
            "timestamp,open,high,low,close,volume,bid,ask\n\
             2024-01-02,100,101,99,100.5,10,100.4,100.6\n",
        )
        .unwrap();
        let s = CsvProvider::new(dir.path()).load_file("BTC").unwrap();
        assert_eq!(s.bars()[0].bid, Some(100.4));
        assert_eq!(s.bars()[0].ask, Some(100.6));
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvProvider::new(dir.path()).load_file("NOPE").unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn bad_row_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("X.csv"),
            "timestamp,open,high,low,close,volume\n2024-01-02,1,1,1,abc,1\n",
        )
        .unwrap();
        let err = CsvProvider::new(dir.path()).load_file("X").unwrap_err();
        assert!(matches!(err, DataError::Parse { row: 2, .. }), "{err}");
    }

    #[test]
    fn duplicate_timestamps_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("X.csv"),
            "timestamp,open,high,low,close,volume\n\
             2024-01-02,1,1,1,1,1\n\
             2024-01-02,1,1,1,1,1\n",
        )
        .unwrap();
        let err = CsvProvider::new(dir.path()).load_file("X").unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[test]
    fn write_then_read_preserves_bars() {
        let dir = tempfile::tempdir().unwrap();
        let s = PriceSeries::from_closes("QQQ", &[10.0, 11.0, 10.5]);
        write_series(dir.path().join("QQQ.csv"), &s).unwrap();
        let back = CsvProvider::new(dir.path()).load_file("QQQ").unwrap();
        assert_eq!(back, s);
    }
}
