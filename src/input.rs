//! Action-log CSV reader
//!
//! Normalizes a header-keyed CSV export of the dispatch action log into
//! `Event`s. Columns are looked up by header name only:
//!
//! | Column               | Use                                   |
//! |----------------------|---------------------------------------|
//! | `Fecha`              | event date                            |
//! | `Instante`           | event clock time                      |
//! | `Parámetros`         | raw parameter blob                    |
//! | `RUTA`               | route                                 |
//! | `ZONA`               | zone (optional, empty when absent)    |
//! | `Nombre Usuario`     | operator name                         |
//! | `Descripción Acción` | optional action filter (`Desvio`)     |
//!
//! Rows with an unparseable date/time keep `timestamp = None` rather than
//! being dropped; the reconciliation core knows how to order them.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::Event;

pub mod columns {
    pub const DATE: &str = "Fecha";
    pub const TIME: &str = "Instante";
    pub const PARAMS: &str = "Parámetros";
    pub const ROUTE: &str = "RUTA";
    pub const ZONE: &str = "ZONA";
    pub const OPERATOR: &str = "Nombre Usuario";
    pub const ACTION: &str = "Descripción Acción";
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Events I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Events file {} is empty", .0.display())]
    Empty(PathBuf),

    #[error("Events file {} is missing required column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
}

/// How the reader filters and splits the action log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    /// Keep only rows whose action description matches (case-insensitive).
    /// Empty disables the filter.
    pub action_filter: String,
    pub delimiter: char,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            action_filter: "Desvio".to_string(),
            delimiter: ',',
        }
    }
}

// ============================================================================
// CSV Quote-Aware Parsing
// ============================================================================

/// Split a delimited line respecting quoted fields, unquoting `"..."` and
/// `""` escapes.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == delimiter && !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Physical lines joined into logical CSV records.
///
/// A quoted field may span line breaks; lines are appended (with the `\n`
/// restored) while a quote is still open. Yields the 1-based physical line
/// each record starts on.
struct Records<B> {
    lines: io::Lines<B>,
    line_no: usize,
}

impl<B: BufRead> Records<B> {
    fn new(reader: B) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<B: BufRead> Iterator for Records<B> {
    type Item = io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e)),
        };
        self.line_no += 1;
        let start = self.line_no;

        // `""` escapes keep the count even, so odd means a quote is open
        while record.matches('"').count() % 2 == 1 {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.line_no += 1;
                    record.push('\n');
                    record.push_str(&line);
                }
                Some(Err(e)) => return Some(Err(e)),
                // Unterminated quote at EOF; split_fields keeps the tail
                None => break,
            }
        }
        Some(Ok((start, record)))
    }
}

// ============================================================================
// Column Map
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    time: usize,
    params: usize,
    route: usize,
    operator: usize,
    zone: Option<usize>,
    action: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[String], path: &Path) -> Result<Self, InputError> {
        let index: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().trim_start_matches('\u{feff}'), i))
            .collect();

        let required = |column: &'static str| {
            index.get(column).copied().ok_or_else(|| InputError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };

        Ok(Self {
            date: required(columns::DATE)?,
            time: required(columns::TIME)?,
            params: required(columns::PARAMS)?,
            route: required(columns::ROUTE)?,
            operator: required(columns::OPERATOR)?,
            zone: index.get(columns::ZONE).copied(),
            action: index.get(columns::ACTION).copied(),
        })
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Read and normalize an action-log CSV.
pub fn read_events(path: impl AsRef<Path>, options: &InputOptions) -> Result<Vec<Event>, InputError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| InputError::Io(path.to_path_buf(), e))?;
    let mut records = Records::new(BufReader::new(file));

    let header_line = match records.next() {
        Some(record) => record.map_err(|e| InputError::Io(path.to_path_buf(), e))?.1,
        None => return Err(InputError::Empty(path.to_path_buf())),
    };
    let header = split_fields(&header_line, options.delimiter);
    let map = ColumnMap::from_header(&header, path)?;
    debug!(?map, "Resolved action-log columns");

    let filter = options.action_filter.trim().to_lowercase();
    let mut events = Vec::new();
    let mut filtered_out = 0usize;
    let mut bad_timestamps = 0usize;

    for record in records {
        let (line_no, line) = record.map_err(|e| InputError::Io(path.to_path_buf(), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(&line, options.delimiter);
        let field = |idx: usize| fields.get(idx).map_or("", String::as_str);

        if let Some(action_idx) = map.action {
            if !filter.is_empty() && field(action_idx).trim().to_lowercase() != filter {
                filtered_out += 1;
                continue;
            }
        }

        let timestamp = parse_event_instant(field(map.date), field(map.time));
        if timestamp.is_none() {
            bad_timestamps += 1;
            debug!(line = line_no, "Unparseable event timestamp");
        }

        events.push(Event::from_raw(
            timestamp,
            field(map.params),
            field(map.route).trim(),
            map.zone.map_or("", field).trim(),
            field(map.operator).trim(),
        ));
    }

    if bad_timestamps > 0 {
        warn!(path = %path.display(), rows = bad_timestamps, "Rows with unparseable timestamps kept without instant");
    }
    info!(
        path = %path.display(),
        events = events.len(),
        filtered_out,
        "Loaded action log"
    );
    Ok(events)
}

// ============================================================================
// Timestamp Helpers
// ============================================================================

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Combine the `Fecha` and `Instante` cells into one civil instant.
///
/// Spreadsheet exports sometimes carry a midnight time on the date cell
/// (`2025-03-10 00:00:00`) or a full datetime in the time cell; both are
/// accepted. Returns `None` when nothing parses.
pub fn parse_event_instant(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = date.trim().trim_matches('"');
    let time = time.trim().trim_matches('"');

    if let Some(full) = parse_datetime(time) {
        return Some(full);
    }

    let day = date.split_whitespace().next().and_then(parse_date)?;
    let clock = parse_time(time)?;
    Some(day.and_time(clock))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MarkerSet;
    use crate::types::EventStatus;
    use std::io::Write;

    const HEADER: &str = "Fecha,Instante,Línea,Descripción Acción,Nombre Usuario,Parámetros,RUTA,ZONA";

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn test_split_fields_quoted() {
        let fields = split_fields(r#"a,"Desvio=""100"" Activar=""SI""",c"#, ',');
        assert_eq!(fields, vec!["a", r#"Desvio="100" Activar="SI""#, "c"]);
    }

    #[test]
    fn test_split_fields_semicolon() {
        let fields = split_fields("a;\"b;c\";d", ';');
        assert_eq!(fields, vec!["a", "b;c", "d"]);
    }

    #[test]
    fn test_records_join_quoted_line_breaks() {
        let text = "a,\"x\ny\",b\nc,\"d\"\"\"\"\",e\n";
        let records: Vec<_> = Records::new(text.as_bytes()).map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], (1, "a,\"x\ny\",b".to_string()));
        assert_eq!(records[1].0, 3);
        assert_eq!(split_fields(&records[0].1, ','), vec!["a", "x\ny", "b"]);
    }

    #[test]
    fn test_parse_event_instant_variants() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 10).and_then(|d| d.and_hms_opt(9, 30, 0));
        assert_eq!(parse_event_instant("2025-03-10", "09:30:00"), expected);
        assert_eq!(parse_event_instant("2025-03-10 00:00:00", "09:30:00"), expected);
        assert_eq!(parse_event_instant("10/03/2025", "09:30"), expected);
        assert_eq!(parse_event_instant("", "2025-03-10 09:30:00"), expected);
        assert_eq!(parse_event_instant("nan", "09:30:00"), None);
        assert_eq!(parse_event_instant("2025-03-10", "xx"), None);
    }

    #[test]
    fn test_read_events_filters_actions() {
        let body = format!(
            "{HEADER}\n\
             2025-03-10,09:00:00,12,Desvio,Ana Ruiz,\"Desvio=\"\"100\"\" Activar=\"\"SI\"\"\", R10 ,Norte\n\
             2025-03-10,09:05:00,12,Mensaje,Ana Ruiz,texto,R10,Norte\n\
             2025-03-10,09:30:00,12, desvio ,Luis Gil,\"Desvio=\"\"100\"\" Activar=\"\"NO\"\"\",R10,Norte\n"
        );
        let file = write_csv(&body);
        let events = read_events(file.path(), &InputOptions::default()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].detour_code.as_deref(), Some("100"));
        assert_eq!(events[0].route, "R10");
        assert_eq!(events[1].operator_name, "Luis Gil");
    }

    #[test]
    fn test_read_events_multiline_params() {
        let body = format!(
            "{HEADER}\n\
             2025-03-10,09:00:00,12,Desvio,Ana,\"Desvio=\"\"100\"\"\nActivar=\"\"SI\"\"\",R10,Norte\n\
             2025-03-10,09:30:00,12,Desvio,Ana,\"Desvio=\"\"100\"\" Activar=\"\"NO\"\"\",R10,Norte\n"
        );
        let file = write_csv(&body);
        let events = read_events(file.path(), &InputOptions::default()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].raw_params, "Desvio=\"100\"\nActivar=\"SI\"");
        assert_eq!(events[0].route, "R10");
        assert_eq!(events[0].zone, "Norte");
        assert_eq!(events[0].status(MarkerSet::Exact), EventStatus::Active);
        assert_eq!(events[1].detour_code.as_deref(), Some("100"));
    }

    #[test]
    fn test_read_events_empty_filter_keeps_everything() {
        let body = format!("{HEADER}\n2025-03-10,09:05:00,12,Mensaje,Ana,texto,R10,Norte\n");
        let file = write_csv(&body);
        let options = InputOptions {
            action_filter: String::new(),
            ..Default::default()
        };
        let events = read_events(file.path(), &options).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].detour_code, None);
    }

    #[test]
    fn test_read_events_without_zone_column() {
        let body = "Fecha,Instante,Nombre Usuario,Parámetros,RUTA\n2025-03-10,bad,Ana,\"Desvio=\"\"7\"\"\",R1\n";
        let file = write_csv(body);
        let events = read_events(file.path(), &InputOptions::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].zone, "");
        assert_eq!(events[0].timestamp, None);
    }

    #[test]
    fn test_read_events_missing_column() {
        let file = write_csv("Fecha,Instante,RUTA\n");
        let err = read_events(file.path(), &InputOptions::default()).unwrap_err();
        assert!(matches!(err, InputError::MissingColumn { column: "Parámetros", .. }));
    }

    #[test]
    fn test_read_events_empty_file() {
        let file = write_csv("");
        let err = read_events(file.path(), &InputOptions::default()).unwrap_err();
        assert!(matches!(err, InputError::Empty(_)));
    }
}
