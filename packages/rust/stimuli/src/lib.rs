//! Stimuli resolver: named, schema-validated datasets backing experiments.
//!
//! A stimuli definition names one or more data sources (file paths or glob
//! patterns) and a record schema. Resolution expands the sources to concrete
//! files, derives the seed-table name, and extracts the trial/block/condition
//! parameter mapping from the schema's role markers. Loading happens
//! separately (see [`load_records`]) and degrades per source.

mod load;
mod sources;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use trialforge_shared::{
    FieldRole, RecordSchema, Result, StimuliParameters, TrialforgeError, stimuli_table_name,
};

pub use load::{load_records, load_source};
pub use sources::{ResolvedSource, SourceFormat, expand_source};

/// One or many source patterns, as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    One(String),
    Many(Vec<String>),
}

impl SourceSpec {
    /// Patterns in declaration order.
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::One(pattern) => std::slice::from_ref(pattern),
            Self::Many(patterns) => patterns,
        }
    }
}

/// A stimuli set as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinedStimuli {
    pub name: String,
    pub source: SourceSpec,
    pub schema: RecordSchema,
}

/// A fully resolved stimuli set, owned by exactly one experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedStimuli {
    pub name: String,
    pub sources: Vec<ResolvedSource>,
    pub schema: RecordSchema,
    pub table_name: String,
    pub parameters: StimuliParameters,
}

/// Resolve a stimuli definition anchored at a layer root directory.
///
/// Sources expand in declaration order; the parameter mapping takes the
/// first schema field per role. A schema with no trial-id role is an error —
/// dynamic timeline steps cannot be materialized without one.
pub fn resolve_stimuli(layer_root: &Path, stimuli: &DefinedStimuli) -> Result<ResolvedStimuli> {
    let sources: Vec<ResolvedSource> = stimuli
        .source
        .patterns()
        .iter()
        .flat_map(|pattern| expand_source(layer_root, pattern))
        .collect();

    let parameters = extract_parameters(&stimuli.name, &stimuli.schema)?;

    debug!(
        stimuli = %stimuli.name,
        sources = sources.len(),
        trial_id = %parameters.trial_id,
        "stimuli resolved"
    );

    Ok(ResolvedStimuli {
        name: stimuli.name.clone(),
        sources,
        schema: stimuli.schema.clone(),
        table_name: stimuli_table_name(&stimuli.name),
        parameters,
    })
}

/// Extract the role → field-name mapping from a schema. First match wins per
/// role; block/condition are left absent when no field carries them.
fn extract_parameters(name: &str, schema: &RecordSchema) -> Result<StimuliParameters> {
    let trial_id = schema
        .first_with_role(FieldRole::TrialId)
        .ok_or_else(|| {
            TrialforgeError::Stimuli(format!(
                "stimuli `{name}` has no field marked as the trial identifier"
            ))
        })?
        .to_string();

    Ok(StimuliParameters {
        trial_id,
        block_id: schema
            .first_with_role(FieldRole::BlockId)
            .map(str::to_string),
        condition_id: schema
            .first_with_role(FieldRole::ConditionId)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialforge_shared::{FieldSpec, FieldType};

    fn gonogo_schema() -> RecordSchema {
        let mut schema = RecordSchema::default();
        let mut index = FieldSpec::new(FieldType::Number);
        index.role = Some(FieldRole::TrialId);
        let mut block = FieldSpec::new(FieldType::Text);
        block.role = Some(FieldRole::BlockId);
        schema.fields.insert("index".into(), index);
        schema.fields.insert("block".into(), block);
        schema
            .fields
            .insert("stimulus".into(), FieldSpec::new(FieldType::Text));
        schema
    }

    #[test]
    fn resolves_table_name_and_parameters() {
        let stimuli = DefinedStimuli {
            name: "gonogo".into(),
            source: SourceSpec::One("gonogo.csv".into()),
            schema: gonogo_schema(),
        };

        let resolved = resolve_stimuli(Path::new("/proj"), &stimuli).expect("resolves");
        assert_eq!(resolved.table_name, "_stimuli-gonogo");
        assert_eq!(resolved.parameters.trial_id, "index");
        assert_eq!(resolved.parameters.block_id.as_deref(), Some("block"));
        assert_eq!(resolved.parameters.condition_id, None);
    }

    #[test]
    fn missing_trial_role_is_an_error() {
        let mut schema = RecordSchema::default();
        schema
            .fields
            .insert("word".into(), FieldSpec::new(FieldType::Text));
        let stimuli = DefinedStimuli {
            name: "broken".into(),
            source: SourceSpec::One("broken.csv".into()),
            schema,
        };

        let err = resolve_stimuli(Path::new("/proj"), &stimuli).unwrap_err();
        assert!(err.to_string().contains("trial identifier"));
    }

    #[test]
    fn multiple_patterns_keep_declaration_order() {
        let stimuli = DefinedStimuli {
            name: "mixed".into(),
            source: SourceSpec::Many(vec!["b.csv".into(), "a.csv".into()]),
            schema: gonogo_schema(),
        };

        let resolved = resolve_stimuli(Path::new("/proj"), &stimuli).expect("resolves");
        let names: Vec<_> = resolved.sources.iter().map(|s| s.basename.as_str()).collect();
        assert_eq!(names, vec!["b.csv", "a.csv"]);
    }

    #[test]
    fn role_of_maps_fields_back_to_roles() {
        let stimuli = DefinedStimuli {
            name: "gonogo".into(),
            source: SourceSpec::One("gonogo.csv".into()),
            schema: gonogo_schema(),
        };
        let resolved = resolve_stimuli(Path::new("/proj"), &stimuli).expect("resolves");
        assert_eq!(resolved.parameters.role_of("index"), Some("trialID"));
        assert_eq!(resolved.parameters.role_of("block"), Some("blockID"));
        assert_eq!(resolved.parameters.role_of("stimulus"), None);
    }
}
