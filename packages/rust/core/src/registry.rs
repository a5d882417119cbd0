//! The experiment registry artifact.
//!
//! The registry is the single machine-readable description of a build: which
//! experiment is active, every resolved experiment with its scanned and
//! materialized timeline, and build provenance.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use trialforge_config::ResolvedExperiment;
use trialforge_timeline::{DefinedTimeline, MaterializedStep, ResolvedTrial};

/// Provenance of one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildMeta {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
}

impl Default for BuildMeta {
    fn default() -> Self {
        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One experiment's slice of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentEntry {
    pub experiment: ResolvedExperiment,

    /// Scanned timeline: static steps plus unexpanded dynamic steps.
    pub timeline: DefinedTimeline,

    /// Trials in resolved presentation order.
    pub trials: Vec<ResolvedTrial>,

    /// Fully materialized steps, ready for routing.
    pub steps: Vec<MaterializedStep>,
}

/// The complete registry, serialized to `registry.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub meta: BuildMeta,
    pub active_experiment: String,
    pub experiments: IndexMap<String, ExperimentEntry>,
}

impl Registry {
    /// The active experiment's entry. Present by construction.
    pub fn active(&self) -> Option<&ExperimentEntry> {
        self.experiments.get(&self.active_experiment)
    }
}
