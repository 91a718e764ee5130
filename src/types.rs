//! Shared data structures for detour event reconciliation
//!
//! This module defines the core types that flow through a review pass:
//! - Input: `Event` (one normalized action-log row)
//! - Per-event: `EventStatus` (Activo / Inactivo)
//! - Per-code: `DetourAggregate` (final status, recency, count, review flag)
//! - Output: `OutputRow` (event fields + joined aggregate + duration + registry)
//!
//! The literal vocabularies (`Activo`, `Modificado`, `No Revisar`, `Desvío Nuevo`, ...)
//! are consumed verbatim by downstream filtering and display, so `Display` and
//! serde use exactly the same strings.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::classifier::{self, MarkerSet};

// ============================================================================
// Input
// ============================================================================

/// One action-log row after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Detour code extracted from `raw_params`; `None` when unparseable
    pub detour_code: Option<String>,
    /// Event instant (civil time, no zone); `None` when unparseable
    pub timestamp: Option<NaiveDateTime>,
    /// Raw parameter blob, e.g. `Desvio="100" Activar="SI"`
    pub raw_params: String,
    pub route: String,
    pub zone: String,
    pub operator_name: String,
}

impl Event {
    /// Build an event from its raw fields, deriving the detour code from the
    /// parameter blob.
    pub fn from_raw(
        timestamp: Option<NaiveDateTime>,
        raw_params: impl Into<String>,
        route: impl Into<String>,
        zone: impl Into<String>,
        operator_name: impl Into<String>,
    ) -> Self {
        let raw_params = raw_params.into();
        Self {
            detour_code: classifier::extract_code(&raw_params),
            timestamp,
            raw_params,
            route: route.into(),
            zone: zone.into(),
            operator_name: operator_name.into(),
        }
    }

    /// Activation status of this single event.
    pub fn status(&self, markers: MarkerSet) -> EventStatus {
        classifier::classify(&self.raw_params, markers)
    }
}

// ============================================================================
// Per-event status
// ============================================================================

/// Binary activation label of a single event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EventStatus {
    #[serde(rename = "Activo")]
    Active,
    #[serde(rename = "Inactivo")]
    #[default]
    Inactive,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "Activo",
            EventStatus::Inactive => "Inactivo",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Per-code aggregate
// ============================================================================

/// Reconciled status of a detour code across all of its events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FinalStatus {
    #[serde(rename = "Activo")]
    Active,
    #[serde(rename = "Inactivo")]
    Inactive,
    /// Three or more events with both polarities present
    #[serde(rename = "Modificado")]
    Modified,
}

impl FinalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalStatus::Active => "Activo",
            FinalStatus::Inactive => "Inactivo",
            FinalStatus::Modified => "Modificado",
        }
    }
}

impl From<EventStatus> for FinalStatus {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Active => FinalStatus::Active,
            EventStatus::Inactive => FinalStatus::Inactive,
        }
    }
}

impl std::fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review priority, driven solely by the most recent event status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReviewFlag {
    #[serde(rename = "Revisar")]
    Review,
    #[serde(rename = "No Revisar")]
    NoReview,
}

impl ReviewFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewFlag::Review => "Revisar",
            ReviewFlag::NoReview => "No Revisar",
        }
    }
}

impl From<EventStatus> for ReviewFlag {
    fn from(most_recent: EventStatus) -> Self {
        match most_recent {
            EventStatus::Active => ReviewFlag::Review,
            EventStatus::Inactive => ReviewFlag::NoReview,
        }
    }
}

impl std::fmt::Display for ReviewFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consolidated record for one detour code.
///
/// Computed once per pass and then fanned out onto every row sharing the code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetourAggregate {
    pub final_status: FinalStatus,
    pub most_recent_status: EventStatus,
    /// Number of events for the code (always >= 1)
    pub occurrence_count: usize,
    pub review: ReviewFlag,
}

// ============================================================================
// Registry membership
// ============================================================================

/// Whether a detour code is already known to the PMT registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RegistryMembership {
    #[serde(rename = "PMT")]
    Known,
    #[serde(rename = "Desvío Nuevo")]
    New,
}

impl RegistryMembership {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryMembership::Known => "PMT",
            RegistryMembership::New => "Desvío Nuevo",
        }
    }
}

impl std::fmt::Display for RegistryMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Output
// ============================================================================

/// One row of the reconciled table. Every surviving input event yields one.
///
/// Field renames follow the column headers of the operational report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "Fecha Instante")]
    pub date: Option<NaiveDate>,
    /// `HH:MM:SS`, empty when the timestamp is unknown
    #[serde(rename = "Hora Instante")]
    pub time: String,
    #[serde(rename = "Nombre Usuario")]
    pub operator_name: String,
    #[serde(rename = "Código Desvío")]
    pub detour_code: Option<String>,
    #[serde(rename = "Estado Desvío")]
    pub event_status: EventStatus,
    #[serde(rename = "Estado Final")]
    pub final_status: Option<FinalStatus>,
    #[serde(rename = "Cantidad")]
    pub occurrence_count: Option<usize>,
    #[serde(rename = "Ruta")]
    pub route: String,
    #[serde(rename = "Zona")]
    pub zone: String,
    #[serde(rename = "Pmt o Desvíos Nuevos")]
    pub registry_membership: RegistryMembership,
    #[serde(rename = "Estados")]
    pub most_recent_status: Option<EventStatus>,
    #[serde(rename = "Revisión")]
    pub review: Option<ReviewFlag>,
    #[serde(rename = "Duración Activo")]
    pub duration_active: String,
    /// Full instant, kept for consumers that need ordering; not a report column
    #[serde(skip)]
    pub timestamp: Option<NaiveDateTime>,
}

/// Column headers of the operational report, in display order.
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "Fecha Instante",
    "Hora Instante",
    "Nombre Usuario",
    "Código Desvío",
    "Estado Desvío",
    "Estado Final",
    "Cantidad",
    "Ruta",
    "Zona",
    "Pmt o Desvíos Nuevos",
    "Estados",
    "Revisión",
    "Duración Activo",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_literals() {
        assert_eq!(EventStatus::Active.to_string(), "Activo");
        assert_eq!(EventStatus::Inactive.to_string(), "Inactivo");
        assert_eq!(FinalStatus::Modified.to_string(), "Modificado");
        assert_eq!(ReviewFlag::Review.to_string(), "Revisar");
        assert_eq!(ReviewFlag::NoReview.to_string(), "No Revisar");
        assert_eq!(RegistryMembership::Known.to_string(), "PMT");
        assert_eq!(RegistryMembership::New.to_string(), "Desvío Nuevo");
    }

    #[test]
    fn test_serde_uses_report_literals() {
        let json = serde_json::to_string(&FinalStatus::Modified).unwrap();
        assert_eq!(json, "\"Modificado\"");
        let json = serde_json::to_string(&ReviewFlag::NoReview).unwrap();
        assert_eq!(json, "\"No Revisar\"");
        let back: RegistryMembership = serde_json::from_str("\"Desvío Nuevo\"").unwrap();
        assert_eq!(back, RegistryMembership::New);
    }

    #[test]
    fn test_review_flag_follows_status() {
        assert_eq!(ReviewFlag::from(EventStatus::Active), ReviewFlag::Review);
        assert_eq!(ReviewFlag::from(EventStatus::Inactive), ReviewFlag::NoReview);
    }

    #[test]
    fn test_event_from_raw_extracts_code() {
        let event = Event::from_raw(None, r#"Desvio="4521" Activar="SI""#, "R10", "Norte", "jperez");
        assert_eq!(event.detour_code.as_deref(), Some("4521"));
        assert_eq!(event.status(MarkerSet::Exact), EventStatus::Active);

        let event = Event::from_raw(None, "sin parametros", "R10", "Norte", "jperez");
        assert_eq!(event.detour_code, None);
        assert_eq!(event.status(MarkerSet::WithUppercase), EventStatus::Inactive);
    }
}
