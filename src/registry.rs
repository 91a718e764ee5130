//! PMT registry of known detour codes
//!
//! Membership is a plain set lookup on trimmed codes. Loading the registry
//! file is the collaborator's job: `Registry::load` surfaces failures, while
//! `Registry::load_or_empty` logs them and substitutes an empty registry so
//! every code reads as `Desvío Nuevo`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::split_fields;
use crate::types::RegistryMembership;

/// Header of the registry column holding detour codes.
const ID_COLUMN: &str = "ID";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
}

/// Read-only set of detour codes already known to the PMT registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    codes: HashSet<String>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load codes from a text or CSV file split on `delimiter`.
    ///
    /// When the first row names an `ID` column, that column is read;
    /// otherwise the first field of every line is a code and a non-numeric
    /// first line is skipped as a header.
    pub fn load(path: &Path, delimiter: char) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
        let registry = Self::parse(&contents, delimiter);
        info!(path = %path.display(), codes = registry.len(), "Loaded PMT registry");
        Ok(registry)
    }

    /// Load codes, degrading to an empty registry on any failure.
    pub fn load_or_empty(path: &Path, delimiter: char) -> Self {
        match Self::load(path, delimiter) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "PMT registry unavailable, every code will be reported as new");
                Self::empty()
            }
        }
    }

    /// Parse registry contents already read into memory.
    pub fn parse(contents: &str, delimiter: char) -> Self {
        let mut lines = contents.lines().filter(|l| !l.trim().is_empty()).peekable();

        let column = match lines.peek() {
            Some(first) => {
                let header = split_fields(first, delimiter);
                if let Some(idx) = header.iter().position(|h| h.trim().eq_ignore_ascii_case(ID_COLUMN)) {
                    lines.next();
                    idx
                } else {
                    if header.first().is_some_and(|h| !is_code(h)) {
                        debug!(header = %first, "Skipping registry header without an ID column");
                        lines.next();
                    }
                    0
                }
            }
            None => 0,
        };
        debug!(column, "Registry code column");

        lines
            .filter_map(|line| split_fields(line, delimiter).into_iter().nth(column))
            .collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }

    /// Classify a detour code against the registry.
    ///
    /// Rows without a code can never be known and read as new.
    pub fn membership(&self, code: Option<&str>) -> RegistryMembership {
        match code {
            Some(c) if self.contains(c) => RegistryMembership::Known,
            _ => RegistryMembership::New,
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Detour codes are plain digit runs.
fn is_code(field: &str) -> bool {
    let field = field.trim();
    !field.is_empty() && field.chars().all(|c| c.is_ascii_digit())
}

impl<S: AsRef<str>> FromIterator<S> for Registry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let codes = iter
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Self { codes }
    }
}
