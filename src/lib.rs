//! Desvío Review: Detour Event Reconciliation
//!
//! Reduces a log of detour (desvío) activation/deactivation events for bus
//! routes to one consolidated status per detour code, annotated with review
//! priority, elapsed-active duration and PMT registry membership.
//!
//! ## Architecture
//!
//! - **Classifier**: Activo / Inactivo and detour code from the parameter blob
//! - **Reconciliation Engine**: per-code final status, recency, count, review flag
//! - **Duration Calculator**: elapsed time against one captured Bogota "now"
//! - **Registry**: PMT cross-reference of known codes
//! - **Input / Report**: action-log CSV reader and reconciled table writers

pub mod classifier;
pub mod config;
pub mod duration;
pub mod input;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, ReviewConfig};

// Re-export commonly used types
pub use types::{
    DetourAggregate, Event, EventStatus, FinalStatus, OutputRow, RegistryMembership, ReviewFlag,
};

// Re-export the core pass
pub use classifier::MarkerSet;
pub use duration::ReferenceInstant;
pub use reconcile::{aggregate, reconcile, ReconcileOptions};
pub use registry::{Registry, RegistryError};
pub use report::{OutputFormat, ReviewSummary};
