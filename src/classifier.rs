//! Per-event classification of the raw parameter blob
//!
//! Two pure, total functions run on every normalized row:
//! - `classify`: Activo / Inactivo from the activation markers
//! - `extract_code`: the detour code from `Desvio="<digits>"`
//!
//! Neither ever fails; malformed blobs degrade to `Inactive` / `None`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::EventStatus;

/// Markers written by the dispatch console when a detour is switched on.
static BASE_MARKERS: [&str; 2] = [r#"Activar="SI""#, r#"Activo="SI""#];

/// Upper-case forms emitted by newer console exports.
static UPPERCASE_MARKERS: [&str; 2] = [r#"ACTIVAR="SI""#, r#"ACTIVO="SI""#];

/// Which activation marker variants count as "active".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSet {
    /// Only `Activar="SI"` / `Activo="SI"` as written
    Exact,
    /// Base markers plus their upper-case forms
    #[default]
    WithUppercase,
}

impl MarkerSet {
    fn markers(self) -> impl Iterator<Item = &'static str> {
        let extra: &'static [&'static str] = match self {
            MarkerSet::Exact => &[],
            MarkerSet::WithUppercase => UPPERCASE_MARKERS.as_slice(),
        };
        BASE_MARKERS.iter().chain(extra.iter()).copied()
    }
}

/// Classify one event from its parameter blob.
pub fn classify(raw_params: &str, markers: MarkerSet) -> EventStatus {
    if markers.markers().any(|m| raw_params.contains(m)) {
        EventStatus::Active
    } else {
        EventStatus::Inactive
    }
}

#[allow(clippy::expect_used)]
fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"Desvio="(\d+)""#).expect("detour code pattern is valid"))
}

/// Extract the detour code (first `Desvio="<digits>"` match only).
pub fn extract_code(raw_params: &str) -> Option<String> {
    code_pattern()
        .captures(raw_params)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
