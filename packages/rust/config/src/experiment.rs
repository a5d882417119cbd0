//! Raw experiment definitions and their resolution.
//!
//! A raw definition comes straight out of a layer's `trialforge.toml`.
//! Resolution assigns the canonical `name@version` identity, finds the
//! on-disk content directory with fallback logic, derives the record-table
//! name, and resolves the owned stimuli set and randomizer.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use trialforge_shared::{
    DefinedRandomizer, ExperimentService, RecordSchema, ResolvedRandomizer, Result,
    TrialforgeError, experiment_table_name, mkid, resolve_randomizer,
};
use trialforge_stimuli::{DefinedStimuli, ResolvedStimuli, resolve_stimuli};

/// Directory-safe shape for experiment content directories.
static DIRECTORY_SAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9@-]+$").expect("valid regex"));

/// An experiment definition as written in a config layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    /// Experiment name — determines the content directory
    /// (e.g. "stroop" → `experiments/stroop/`).
    #[serde(default)]
    pub name: String,

    /// Experiment version — determines the variant (e.g. "pilot", "full").
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub duration: String,

    #[serde(default)]
    pub compensation: String,

    #[serde(default)]
    pub services: Vec<ExperimentService>,

    #[serde(default)]
    pub allow_repeats: Option<bool>,

    #[serde(default)]
    pub auto_save: Option<bool>,

    #[serde(default)]
    pub randomizer: Option<DefinedRandomizer>,

    pub stimuli: Option<DefinedStimuli>,

    #[serde(default)]
    pub schema: RecordSchema,
}

/// A definition bound to the layer it came from.
#[derive(Debug, Clone)]
pub struct DefinedExperiment {
    pub definition: ExperimentDefinition,

    /// `<layer-root>/experiments`, attached during layer concatenation.
    pub search_path: PathBuf,
}

impl DefinedExperiment {
    /// The canonical `name@version` identity of this definition.
    pub fn id(&self) -> String {
        mkid(&self.definition.name, &self.definition.version)
    }
}

/// A fully resolved experiment, immutable for the rest of the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedExperiment {
    pub name: String,
    pub version: String,
    /// Unique identifier: `name@version`.
    pub id: String,
    /// Resolved experiment content directory.
    pub path: PathBuf,
    /// Directory basename that was actually found.
    pub basename: String,

    pub duration: String,
    pub compensation: String,
    pub services: Vec<ExperimentService>,

    pub allow_repeats: bool,
    pub auto_save: bool,

    pub randomizer: ResolvedRandomizer,
    pub stimuli: ResolvedStimuli,
    pub schema: RecordSchema,

    pub table_name: String,
}

/// Resolve one experiment definition.
///
/// Missing `name` or `version` is fatal. Directory-resolution and
/// basename-shape failures warn and fall back deterministically.
pub fn resolve_experiment(experiment: &DefinedExperiment) -> Result<ResolvedExperiment> {
    let definition = &experiment.definition;

    if definition.name.is_empty() || definition.version.is_empty() {
        return Err(TrialforgeError::config(
            "experiments must have explicit `name` and `version` properties",
        ));
    }

    let id = experiment.id();

    let (path, basename) = resolve_experiment_directory(experiment);

    if !DIRECTORY_SAFE.is_match(&basename) {
        warn!(
            basename,
            "experiment directory should be directory-safe; \
             use lowercase letters, numbers, hyphens, and @ only"
        );
    }

    // Stimuli resolve relative to the layer root (parent of the search path).
    let layer_root = experiment
        .search_path
        .parent()
        .unwrap_or(&experiment.search_path);
    let stimuli_definition = definition.stimuli.as_ref().ok_or_else(|| {
        TrialforgeError::config(format!("experiment `{id}` has no `stimuli` definition"))
    })?;
    let stimuli = resolve_stimuli(layer_root, stimuli_definition)?;

    let randomizer = resolve_randomizer(
        definition
            .randomizer
            .as_ref()
            .unwrap_or(&DefinedRandomizer::default()),
    );

    Ok(ResolvedExperiment {
        name: definition.name.clone(),
        version: definition.version.clone(),
        table_name: experiment_table_name(&id),
        id,
        path,
        basename,
        duration: definition.duration.clone(),
        compensation: definition.compensation.clone(),
        services: definition.services.clone(),
        allow_repeats: definition.allow_repeats.unwrap_or(false),
        auto_save: definition.auto_save.unwrap_or(true),
        randomizer,
        stimuli,
        schema: definition.schema.clone(),
    })
}

/// Resolve the experiment content directory with fallback logic:
/// 1. first try `<search>/<name>@<version>/`
/// 2. fallback `<search>/<name>/`
///
/// If neither exists the fallback path is used anyway, with a warning.
fn resolve_experiment_directory(experiment: &DefinedExperiment) -> (PathBuf, String) {
    let definition = &experiment.definition;
    let subpaths = [
        format!("{}@{}", definition.name, definition.version),
        definition.name.clone(),
    ];

    for subpath in &subpaths {
        let path = experiment.search_path.join(subpath);
        if path.exists() {
            return (path, subpath.clone());
        }
    }

    let fallback = subpaths.last().expect("non-empty").clone();
    warn!(
        tried = %subpaths.join(", "),
        search_path = %experiment.search_path.display(),
        fallback = %fallback,
        "no experiment directory found, falling back"
    );
    (experiment.search_path.join(&fallback), fallback)
}
