//! Reconciled table output and per-code summary
//!
//! Serializes `OutputRow`s as JSON or CSV in the operational report's column
//! order, and condenses a table into `ReviewSummary` counts per distinct code.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::duration::ReferenceInstant;
use crate::types::{FinalStatus, OutputRow, RegistryMembership, ReviewFlag, OUTPUT_COLUMNS};

/// Serialization format of the reconciled table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Default report file name: `"{prefix} {YYYY-MM-DD}.{ext}"` on the reference date.
pub fn default_file_name(prefix: &str, now: ReferenceInstant, format: OutputFormat) -> String {
    format!("{} {}.{}", prefix, now.date().format("%Y-%m-%d"), format.extension())
}

/// Write the table in the requested format.
pub fn write_rows<W: Write>(writer: W, rows: &[OutputRow], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => write_json(writer, rows),
        OutputFormat::Csv => write_csv(writer, rows),
    }
}

pub fn write_json<W: Write>(mut writer: W, rows: &[OutputRow]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writeln!(writer)?;
    Ok(())
}

pub fn write_csv<W: Write>(mut writer: W, rows: &[OutputRow]) -> anyhow::Result<()> {
    writeln!(writer, "{}", join_record(OUTPUT_COLUMNS.iter().copied()))?;
    for row in rows {
        let record = csv_record(row);
        writeln!(writer, "{}", join_record(record.iter().map(String::as_str)))?;
    }
    Ok(())
}

fn csv_record(row: &OutputRow) -> [String; 13] {
    fn opt<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    [
        opt(row.date),
        row.time.clone(),
        row.operator_name.clone(),
        opt(row.detour_code.as_deref()),
        row.event_status.to_string(),
        opt(row.final_status),
        opt(row.occurrence_count),
        row.route.clone(),
        row.zone.clone(),
        row.registry_membership.to_string(),
        opt(row.most_recent_status),
        opt(row.review),
        row.duration_active.clone(),
    ]
}

fn join_record<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    fields.map(escape_field).collect::<Vec<_>>().join(",")
}

/// Quote a field when it holds a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Counts per distinct detour code, plus row totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total_rows: usize,
    pub uncoded_rows: usize,
    pub distinct_codes: usize,
    /// Codes per final status (`Activo`, `Inactivo`, `Modificado`)
    pub by_final_status: BTreeMap<String, usize>,
    /// Codes per review flag (`Revisar`, `No Revisar`)
    pub by_review: BTreeMap<String, usize>,
    /// Codes per registry membership (`PMT`, `Desvío Nuevo`)
    pub by_registry: BTreeMap<String, usize>,
}

impl ReviewSummary {
    pub fn from_rows(rows: &[OutputRow]) -> Self {
        let mut summary = Self {
            total_rows: rows.len(),
            ..Default::default()
        };
        let mut seen: HashSet<&str> = HashSet::new();

        for row in rows {
            let Some(code) = row.detour_code.as_deref() else {
                summary.uncoded_rows += 1;
                continue;
            };
            if !seen.insert(code) {
                continue;
            }
            if let Some(status) = row.final_status {
                *summary.by_final_status.entry(status.to_string()).or_default() += 1;
            }
            if let Some(review) = row.review {
                *summary.by_review.entry(review.to_string()).or_default() += 1;
            }
            *summary
                .by_registry
                .entry(row.registry_membership.to_string())
                .or_default() += 1;
        }

        summary.distinct_codes = seen.len();
        summary
    }

    pub fn final_status_count(&self, status: FinalStatus) -> usize {
        self.by_final_status.get(status.as_str()).copied().unwrap_or(0)
    }

    pub fn review_count(&self, review: ReviewFlag) -> usize {
        self.by_review.get(review.as_str()).copied().unwrap_or(0)
    }

    pub fn registry_count(&self, membership: RegistryMembership) -> usize {
        self.by_registry.get(membership.as_str()).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for ReviewSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Filas: {} | Códigos: {} | Sin código: {}",
            self.total_rows, self.distinct_codes, self.uncoded_rows
        )?;
        for (label, counts) in [
            ("Estado Final", &self.by_final_status),
            ("Revisión", &self.by_review),
            ("Pmt o Desvíos Nuevos", &self.by_registry),
        ] {
            let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
            writeln!(f, "  {label}: {}", parts.join(", "))?;
        }
        Ok(())
    }
}
