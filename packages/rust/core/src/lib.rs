//! Build orchestration for Trialforge.
//!
//! Wires the pipeline together: configuration resolution
//! ([`trialforge_config`]), timeline scanning and materialization
//! ([`trialforge_timeline`]), stimuli loading ([`trialforge_stimuli`]), and
//! table compilation ([`trialforge_schema`]), then emits the `registry.json`,
//! `tables.sql`, and `seeds.json` artifacts.

mod emit;
mod pipeline;
mod registry;

pub use emit::{REGISTRY_FILE, SEEDS_FILE, TABLES_FILE, write_artifacts};
pub use pipeline::{
    BuildConfig, BuildOutput, BuildResult, DEFAULT_OUT_DIR, build, check, compile, resolve,
};
pub use registry::{BuildMeta, ExperimentEntry, Registry};
