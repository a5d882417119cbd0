//! Configuration resolver: layered config → resolved experiment registry.
//!
//! Layers arrive outermost-first. Experiment definitions concatenate across
//! layers in order (colliding ids overwrite earlier entries at registry
//! insertion); the active experiment is taken from the innermost layer that
//! declares one. When no layer declares any experiment, a built-in default
//! is substituted so the registry is never empty.

mod experiment;
mod layer;

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use trialforge_shared::{
    DefinedRandomizer, ExperimentService, FieldRole, FieldSpec, FieldType, RecordSchema, Result,
};
use trialforge_stimuli::{DefinedStimuli, SourceSpec};

pub use experiment::{
    DefinedExperiment, ExperimentDefinition, ResolvedExperiment, resolve_experiment,
};
pub use layer::{CONFIG_FILE_NAME, ConfigLayer, LayerConfig, load_layer, load_layers};

/// The resolved configuration: registry of experiments plus the active id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub active_experiment: String,
    pub experiments: IndexMap<String, ResolvedExperiment>,
}

impl ResolvedConfig {
    /// The active experiment entry. Present by construction — the registry
    /// is never empty and the active id always resolves to a key.
    pub fn active(&self) -> Option<&ResolvedExperiment> {
        self.experiments.get(&self.active_experiment)
    }
}

/// Resolve the full configuration from loaded layers.
///
/// `project_root` anchors the built-in default experiment when no layer
/// defines any.
pub fn resolve_config(layers: &[ConfigLayer], project_root: &Path) -> Result<ResolvedConfig> {
    // Innermost (most specific) layer wins for the active experiment.
    let declared_active = layers
        .iter()
        .rev()
        .find_map(|layer| layer.config.active_experiment.clone().filter(|s| !s.is_empty()));

    let mut defined: Vec<DefinedExperiment> = layers
        .iter()
        .flat_map(|layer| {
            layer
                .config
                .experiments
                .iter()
                .map(move |definition| DefinedExperiment {
                    definition: definition.clone(),
                    search_path: layer.search_path(),
                })
        })
        .collect();

    if defined.is_empty() {
        warn!(
            "no experiment configurations found, falling back to the default experiment; \
             define `{CONFIG_FILE_NAME}` in your project root to take control"
        );
        defined.push(DefinedExperiment {
            definition: default_experiment(),
            search_path: project_root.join("experiments"),
        });
    }

    let mut experiments: IndexMap<String, ResolvedExperiment> = IndexMap::new();
    for experiment in &defined {
        let resolved = resolve_experiment(experiment)?;
        if experiments.contains_key(&resolved.id) {
            debug!(id = %resolved.id, "experiment id redefined by a later layer, overwriting");
        }
        experiments.insert(resolved.id.clone(), resolved);
    }

    let active_experiment = declared_active.unwrap_or_else(|| {
        experiments
            .keys()
            .next()
            .expect("registry is never empty")
            .clone()
    });

    debug!(
        experiments = experiments.len(),
        active = %active_experiment,
        "configuration resolved"
    );

    Ok(ResolvedConfig {
        active_experiment,
        experiments,
    })
}

/// The built-in default experiment, substituted when no layer defines any.
fn default_experiment() -> ExperimentDefinition {
    let mut schema = RecordSchema::default();
    let mut id = FieldSpec::new(FieldType::Text);
    id.role = Some(FieldRole::TrialId);
    schema.fields.insert("id".into(), id);

    ExperimentDefinition {
        name: "default".into(),
        version: "experiment".into(),
        duration: "10 minutes".into(),
        compensation: "$100.00".into(),
        services: vec![ExperimentService::Prolific {
            code: "C7W0RVYD".into(),
        }],
        randomizer: Some(DefinedRandomizer::Name("shuffle".into())),
        stimuli: Some(DefinedStimuli {
            name: "default".into(),
            source: SourceSpec::One("default.csv".into()),
            schema: schema.clone(),
        }),
        schema,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn layer_with(experiments: Vec<ExperimentDefinition>, active: Option<&str>) -> ConfigLayer {
        ConfigLayer {
            root: PathBuf::from("/proj"),
            config: LayerConfig {
                active_experiment: active.map(str::to_string),
                experiments,
            },
        }
    }

    fn definition(name: &str, version: &str) -> ExperimentDefinition {
        let mut base = default_experiment();
        base.name = name.into();
        base.version = version.into();
        base
    }

    #[test]
    fn registry_keys_are_name_at_version() {
        let layers = vec![layer_with(
            vec![definition("stroop", "pilot"), definition("stroop", "full")],
            None,
        )];
        let resolved = resolve_config(&layers, Path::new("/proj")).expect("resolves");
        let keys: Vec<_> = resolved.experiments.keys().cloned().collect();
        assert_eq!(keys, vec!["stroop@pilot", "stroop@full"]);
    }

    #[test]
    fn no_experiments_substitutes_the_default() {
        let layers = vec![layer_with(vec![], None)];
        let resolved = resolve_config(&layers, Path::new("/proj")).expect("resolves");
        assert_eq!(resolved.experiments.len(), 1);
        assert!(resolved.experiments.contains_key("default@experiment"));
        assert_eq!(resolved.active_experiment, "default@experiment");
    }

    #[test]
    fn innermost_layer_chooses_active_experiment() {
        let layers = vec![
            layer_with(vec![definition("stroop", "pilot")], Some("stroop@pilot")),
            layer_with(vec![definition("flanker", "full")], Some("flanker@full")),
        ];
        let resolved = resolve_config(&layers, Path::new("/proj")).expect("resolves");
        assert_eq!(resolved.active_experiment, "flanker@full");
    }

    #[test]
    fn active_defaults_to_first_registry_key() {
        let layers = vec![layer_with(
            vec![definition("stroop", "pilot"), definition("flanker", "full")],
            None,
        )];
        let resolved = resolve_config(&layers, Path::new("/proj")).expect("resolves");
        assert_eq!(resolved.active_experiment, "stroop@pilot");
    }

    #[test]
    fn colliding_ids_overwrite_earlier_layers() {
        let mut inner = definition("stroop", "pilot");
        inner.duration = "99 minutes".into();
        let layers = vec![
            layer_with(vec![definition("stroop", "pilot")], None),
            layer_with(vec![inner], None),
        ];
        let resolved = resolve_config(&layers, Path::new("/proj")).expect("resolves");
        assert_eq!(resolved.experiments.len(), 1);
        assert_eq!(resolved.experiments["stroop@pilot"].duration, "99 minutes");
    }

    #[test]
    fn invalid_definition_aborts_resolution() {
        let mut broken = definition("", "pilot");
        broken.name = String::new();
        let layers = vec![layer_with(vec![broken], None)];
        assert!(resolve_config(&layers, Path::new("/proj")).is_err());
    }
}
