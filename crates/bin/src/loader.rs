//! CSV inputs: asset returns, events and factor returns.

use crate::error::CliError;
use chrono::NaiveDate;
use hobart_data::{Asset, FactorSeries, MarketDataProvider, Panel};
use hobart_events::{EventSet, GroupLabel};
use std::io::Read;
use std::path::Path;

const RETURN_HEADERS: [&str; 5] = ["date", "sid", "symbol", "open_return", "close_return"];

fn parse_date(file: &str, line: u64, raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::input(file, format!("line {line}: invalid date {raw:?}: {e}")))
}

fn parse_value(file: &str, line: u64, raw: &str) -> Result<f64, CliError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse()
        .map_err(|e| CliError::input(file, format!("line {line}: invalid number {raw:?}: {e}")))
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

/// Read a returns file with columns `date,sid,symbol,open_return,close_return`.
///
/// Empty return cells become NaN.
pub(crate) fn load_returns(path: &Path) -> Result<Panel, CliError> {
    read_returns(&path.display().to_string(), std::fs::File::open(path)?)
}

pub(crate) fn read_returns(file: &str, reader: impl Read) -> Result<Panel, CliError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let indices = RETURN_HEADERS
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|h| h.trim() == *name)
                .ok_or_else(|| CliError::input(file, format!("missing column {name:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut panel = Panel::new(RETURN_HEADERS[3..].iter().copied());
    for record in rdr.records() {
        let record = record?;
        let line = line_of(&record);
        let field = |i: usize| record.get(indices[i]).unwrap_or_default();

        let date = parse_date(file, line, field(0))?;
        let sid: u64 = field(1)
            .trim()
            .parse()
            .map_err(|e| CliError::input(file, format!("line {line}: invalid sid: {e}")))?;
        let asset = Asset::new(sid, field(2).trim());
        let values = vec![
            parse_value(file, line, field(3))?,
            parse_value(file, line, field(4))?,
        ];
        panel.insert(date, asset, values)?;
    }
    Ok(panel)
}

/// Read an events file with columns `date,symbol,<group columns...>`.
///
/// Symbols are resolved through `market`; labels that parse as integers become integer
/// labels.
pub(crate) fn load_events(
    path: &Path,
    market: &dyn MarketDataProvider,
) -> Result<EventSet, CliError> {
    read_events(&path.display().to_string(), std::fs::File::open(path)?, market)
}

pub(crate) fn read_events(
    file: &str,
    reader: impl Read,
    market: &dyn MarketDataProvider,
) -> Result<EventSet, CliError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |i: usize| headers.get(i).map(str::trim);
    if column(0) != Some("date") || column(1) != Some("symbol") {
        return Err(CliError::input(file, "expected columns date,symbol,<groups...>"));
    }

    let mut events = EventSet::new(headers.iter().skip(2).map(str::trim))?;
    for record in rdr.records() {
        let record = record?;
        let line = line_of(&record);
        let date = parse_date(file, line, record.get(0).unwrap_or_default())?;
        let asset = market.get_asset(record.get(1).unwrap_or_default().trim())?;
        let groups = record.iter().skip(2).map(GroupLabel::parse).collect();
        events.push(date, asset, groups)?;
    }
    Ok(events)
}

/// Read a factor file with columns `date,<factor columns...>`.
pub(crate) fn load_factors(path: &Path) -> Result<FactorSeries, CliError> {
    read_factors(&path.display().to_string(), std::fs::File::open(path)?)
}

pub(crate) fn read_factors(file: &str, reader: impl Read) -> Result<FactorSeries, CliError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 || headers.get(0).map(str::trim) != Some("date") {
        return Err(CliError::input(file, "expected columns date,<factors...>"));
    }

    let mut series = FactorSeries::new(headers.iter().skip(1).map(str::trim));
    for record in rdr.records() {
        let record = record?;
        let line = line_of(&record);
        let date = parse_date(file, line, record.get(0).unwrap_or_default())?;
        let values = record
            .iter()
            .skip(1)
            .map(|raw| parse_value(file, line, raw))
            .collect::<Result<Vec<_>, _>>()?;
        series.insert(date, values)?;
    }
    Ok(series)
}
