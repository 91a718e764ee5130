//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Unknown keys are parsed from the raw `toml::Value` tree before serde
//! deserialization and only produce warnings, so a stray key never blocks
//! a review run. Range checks run on the typed config and are fatal.

use std::collections::HashSet;

use super::ReviewConfig;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `ReviewConfig`.
///
/// Maintained by hand to match the structs in review_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [classifier]
        "classifier",
        "classifier.markers",
        // [clock]
        "clock",
        "clock.utc_offset_hours",
        // [input]
        "input",
        "input.action_filter",
        "input.retain_uncoded_rows",
        "input.delimiter",
        // [output]
        "output",
        "output.format",
        "output.file_prefix",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails; TOML syntax errors are reported later by serde.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed config. Returns one message per problem.
pub fn validate_ranges(config: &ReviewConfig) -> Vec<String> {
    let mut errors = Vec::new();

    // Real-world civil offsets span UTC-12 to UTC+14
    let offset = config.clock.utc_offset_hours;
    if !(-12..=14).contains(&offset) {
        errors.push(format!(
            "clock.utc_offset_hours = {offset} is outside the valid range (-12..=14)"
        ));
    }

    let delimiter = config.input.delimiter;
    if delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
        errors.push(format!(
            "input.delimiter = {delimiter:?} cannot be a quote or line break"
        ));
    }

    if config.output.file_prefix.trim().is_empty() {
        errors.push("output.file_prefix must not be empty".to_string());
    }
    if config.output.file_prefix.contains(['/', '\\']) {
        errors.push(format!(
            "output.file_prefix = '{}' must not contain path separators",
            config.output.file_prefix
        ));
    }

    errors
}
