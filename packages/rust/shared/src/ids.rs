//! Experiment identity and derived table names.
//!
//! An experiment is uniquely keyed by `name@version` (case-sensitive). Table
//! names are derived by kebab-casing the identity under a reserved prefix, so
//! `stroop@pilot` maps to `_experiment-stroop-pilot`.

/// Reserved prefix for per-experiment record tables.
pub const EXPERIMENT_TABLE_PREFIX: &str = "_experiment";

/// Reserved prefix for per-stimuli seed tables.
pub const STIMULI_TABLE_PREFIX: &str = "_stimuli";

/// Build the canonical `name@version` identity string.
pub fn mkid(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// Derive the record-table name for an experiment identity.
pub fn experiment_table_name(id: &str) -> String {
    format!("{EXPERIMENT_TABLE_PREFIX}-{}", kebab_case(id))
}

/// Derive the seed-table name for a stimuli set.
pub fn stimuli_table_name(name: &str) -> String {
    format!("{STIMULI_TABLE_PREFIX}-{}", kebab_case(name))
}

/// Convert a string to kebab-case.
///
/// Splits on non-alphanumeric characters and lowercase→uppercase boundaries,
/// lowercases every word, and joins with dashes (`stroop@pilot` →
/// `stroop-pilot`, `goNoGo` → `go-no-go`).
pub fn kebab_case(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in input.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }

        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }

        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    words.join("-")
}
