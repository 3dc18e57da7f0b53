//! Rendering of panels and event-study results.

use crate::error::CliError;
use clap::ValueEnum;
use hobart_data::Panel;
use hobart_events::EventStudyResult;
use serde_json::{Value, json};
use std::io::Write;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum Format {
    /// Aligned table
    #[default]
    Text,
    /// JSON array of records
    Json,
    /// CSV with a header row
    Csv,
}

/// Write a panel, one row per (date, asset).
pub(crate) fn write_panel(panel: &Panel, format: Format, out: impl Write) -> Result<(), CliError> {
    match format {
        Format::Text => write_panel_text(panel, out),
        Format::Json => write_json(&panel_json(panel), out),
        Format::Csv => write_panel_csv(panel, out),
    }
}

fn write_panel_text(panel: &Panel, mut out: impl Write) -> Result<(), CliError> {
    write!(out, "{:<12}{:>10} {:<8}", "date", "sid", "symbol")?;
    for column in panel.columns() {
        write!(out, "{column:>18}")?;
    }
    writeln!(out)?;

    for (key, values) in panel.iter() {
        write!(
            out,
            "{:<12}{:>10} {:<8}",
            key.date.to_string(),
            key.asset.sid.0,
            key.asset.symbol
        )?;
        for value in values {
            write!(out, "{value:>18.8}")?;
        }
        writeln!(out)?;
    }
    writeln!(out, "\n{} rows, {} assets", panel.len(), panel.assets().len())?;
    Ok(())
}

fn write_panel_csv(panel: &Panel, out: impl Write) -> Result<(), CliError> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header = vec!["date".to_string(), "sid".to_string(), "symbol".to_string()];
    header.extend(panel.columns().iter().cloned());
    wtr.write_record(&header)?;

    for (key, values) in panel.iter() {
        let mut record = vec![
            key.date.to_string(),
            key.asset.sid.0.to_string(),
            key.asset.symbol.clone(),
        ];
        record.extend(values.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn panel_json(panel: &Panel) -> Value {
    let records = panel
        .iter()
        .map(|(key, values)| {
            let mut record = json!({
                "date": key.date.to_string(),
                "sid": key.asset.sid.0,
                "symbol": key.asset.symbol,
            });
            for (column, value) in panel.columns().iter().zip(values) {
                record[column.as_str()] = json!(value);
            }
            record
        })
        .collect();
    Value::Array(records)
}

/// Write an event-study result, one row per (group, event time).
pub(crate) fn write_event_study(
    result: &EventStudyResult,
    format: Format,
    out: impl Write,
) -> Result<(), CliError> {
    match format {
        Format::Text => write_event_study_text(result, out),
        Format::Json => write_json(&event_study_json(result), out),
        Format::Csv => write_event_study_csv(result, out),
    }
}

const EVENT_COLUMNS: [&str; 4] = [
    "event_time",
    "residual_return",
    "count",
    "cumulative_residual_return",
];

fn write_event_study_text(result: &EventStudyResult, mut out: impl Write) -> Result<(), CliError> {
    for column in result.group_columns() {
        write!(out, "{column:<12}")?;
    }
    writeln!(
        out,
        "{:>10}{:>18}{:>8}{:>28}",
        EVENT_COLUMNS[0], EVENT_COLUMNS[1], EVENT_COLUMNS[2], EVENT_COLUMNS[3]
    )?;

    for row in result.rows() {
        for label in &row.groups {
            write!(out, "{:<12}", label.to_string())?;
        }
        writeln!(
            out,
            "{:>10}{:>18.8}{:>8}{:>28.8}",
            row.event_time, row.residual_return, row.count, row.cumulative_residual_return
        )?;
    }
    Ok(())
}

fn write_event_study_csv(result: &EventStudyResult, out: impl Write) -> Result<(), CliError> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header = result.group_columns().to_vec();
    header.extend(EVENT_COLUMNS.iter().map(|c| (*c).to_string()));
    wtr.write_record(&header)?;

    for row in result.rows() {
        let mut record: Vec<String> = row.groups.iter().map(ToString::to_string).collect();
        record.push(row.event_time.to_string());
        record.push(row.residual_return.to_string());
        record.push(row.count.to_string());
        record.push(row.cumulative_residual_return.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn event_study_json(result: &EventStudyResult) -> Value {
    let rows = result
        .rows()
        .iter()
        .map(|row| {
            let mut record = json!({
                "event_time": row.event_time,
                "residual_return": row.residual_return,
                "count": row.count,
                "cumulative_residual_return": row.cumulative_residual_return,
            });
            for (column, label) in result.group_columns().iter().zip(&row.groups) {
                record[column.as_str()] = json!(label);
            }
            record
        })
        .collect();
    json!({
        "group_columns": result.group_columns(),
        "rows": Value::Array(rows),
    })
}

fn write_json(value: &Value, mut out: impl Write) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hobart_data::Asset;

    fn panel() -> Panel {
        let mut panel = Panel::new(["alpha", "beta"]);
        let date = NaiveDate::from_ymd_opt(2017, 1, 3).unwrap();
        panel.insert(date, Asset::new(24, "AAPL"), vec![0.001, 1.2]).unwrap();
        panel.insert(date, Asset::new(5061, "MSFT"), vec![0.0, f64::NAN]).unwrap();
        panel
    }

    fn render(panel: &Panel, format: Format) -> String {
        let mut buf = Vec::new();
        write_panel(panel, format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_panel_csv() {
        let csv = render(&panel(), Format::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,sid,symbol,alpha,beta");
        assert_eq!(lines[1], "2017-01-03,24,AAPL,0.001,1.2");
        assert_eq!(lines[2], "2017-01-03,5061,MSFT,0,");
    }

    #[test]
    fn test_panel_json() {
        let value: Value = serde_json::from_str(&render(&panel(), Format::Json)).unwrap();
        assert_eq!(value[0]["symbol"], "AAPL");
        assert_eq!(value[0]["beta"], 1.2);
        assert!(value[1]["beta"].is_null());
    }

    #[test]
    fn test_panel_text() {
        let text = render(&panel(), Format::Text);
        assert!(text.contains("AAPL"));
        assert!(text.contains("2 rows, 2 assets"));
    }
}
