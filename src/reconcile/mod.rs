//! Reconciliation Engine
//!
//! Turns an unordered multiset of activation/deactivation events into one
//! `DetourAggregate` per detour code, then fans each aggregate back out onto
//! every event row sharing that code.
//!
//! ## Pass structure
//!
//! 1. **Group-by + reduce**: one sweep over the events builds
//!    `code -> Accumulator` (count, polarities seen, latest status).
//! 2. **Finish**: each accumulator becomes an immutable `DetourAggregate`.
//! 3. **Fan-out join**: every row looks its code up in the index once and is
//!    annotated with the aggregate, its duration and its registry membership.
//!
//! The pass is synchronous, allocates a fresh output table and never fails.
//! Rows without a detour code are not grouped; they keep null aggregate fields.

mod accumulator;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::classifier::MarkerSet;
use crate::duration::{duration_active, ReferenceInstant};
use crate::registry::Registry;
use crate::types::{DetourAggregate, Event, OutputRow};

use accumulator::Accumulator;

/// Knobs for a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Activation marker variants used by the status classifier
    pub markers: MarkerSet,
    /// Keep rows without a detour code in the output (with null aggregate fields)
    pub retain_uncoded_rows: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            markers: MarkerSet::default(),
            retain_uncoded_rows: true,
        }
    }
}

/// Compute one aggregate per distinct detour code.
pub fn aggregate(events: &[Event], markers: MarkerSet) -> HashMap<String, DetourAggregate> {
    let mut groups: HashMap<&str, Accumulator> = HashMap::new();

    for event in events {
        let Some(code) = event.detour_code.as_deref() else {
            continue;
        };
        let status = event.status(markers);
        groups
            .entry(code)
            .and_modify(|acc| acc.push(event.timestamp, status))
            .or_insert_with(|| Accumulator::new(event.timestamp, status));
    }

    groups
        .into_iter()
        .map(|(code, acc)| (code.to_string(), acc.finish()))
        .collect()
}

/// Run a full reconciliation pass.
///
/// `now` is captured once by the caller and shared by every row, so all
/// durations in the output are mutually comparable.
pub fn reconcile(
    events: &[Event],
    registry: &Registry,
    now: ReferenceInstant,
    options: ReconcileOptions,
) -> Vec<OutputRow> {
    let index = aggregate(events, options.markers);
    debug!(codes = index.len(), events = events.len(), "Detour groups reduced");

    let rows: Vec<OutputRow> = events
        .iter()
        .filter(|e| options.retain_uncoded_rows || e.detour_code.is_some())
        .map(|event| {
            let aggregate = event.detour_code.as_deref().and_then(|c| index.get(c));
            build_row(event, aggregate, registry, now, options.markers)
        })
        .collect();

    info!(
        rows = rows.len(),
        codes = index.len(),
        uncoded = events.iter().filter(|e| e.detour_code.is_none()).count(),
        now = %now.naive(),
        "Reconciliation pass complete"
    );

    rows
}

fn build_row(
    event: &Event,
    aggregate: Option<&DetourAggregate>,
    registry: &Registry,
    now: ReferenceInstant,
    markers: MarkerSet,
) -> OutputRow {
    OutputRow {
        date: event.timestamp.map(|ts| ts.date()),
        time: event
            .timestamp
            .map(|ts| ts.format("%H:%M:%S").to_string())
            .unwrap_or_default(),
        operator_name: event.operator_name.clone(),
        detour_code: event.detour_code.clone(),
        event_status: event.status(markers),
        final_status: aggregate.map(|a| a.final_status),
        occurrence_count: aggregate.map(|a| a.occurrence_count),
        route: event.route.clone(),
        zone: event.zone.clone(),
        registry_membership: registry.membership(event.detour_code.as_deref()),
        most_recent_status: aggregate.map(|a| a.most_recent_status),
        review: aggregate.map(|a| a.review),
        duration_active: duration_active(event.timestamp, now),
        timestamp: event.timestamp,
    }
}
