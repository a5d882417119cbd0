//! Shared types and error model for Trialforge.
//!
//! This crate is the foundation depended on by all other Trialforge crates.
//! It provides:
//! - [`TrialforgeError`] — the unified error type
//! - Experiment identity and derived table names ([`ids`])
//! - The record-schema vocabulary ([`RecordSchema`], [`FieldSpec`])
//! - Recruitment-service descriptors ([`ExperimentService`])
//! - Randomizer definitions and resolution ([`randomizer`])

pub mod error;
pub mod fields;
pub mod ids;
pub mod randomizer;
pub mod services;

// Re-export public API at crate root for ergonomic imports.
pub use error::{Result, TrialforgeError};
pub use fields::{FieldRole, FieldSpec, FieldType, Record, RecordSchema, StimuliParameters};
pub use ids::{
    EXPERIMENT_TABLE_PREFIX, STIMULI_TABLE_PREFIX, experiment_table_name, kebab_case, mkid,
    stimuli_table_name,
};
pub use randomizer::{
    DefinedRandomizer, NULL_RANDOMIZER, ResolvedRandomizer, SHUFFLE_RANDOMIZER, resolve_randomizer,
};
pub use services::ExperimentService;
