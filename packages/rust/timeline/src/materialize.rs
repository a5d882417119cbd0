//! Timeline materialization.
//!
//! Expands dynamic steps into one concrete step per stimuli trial. Trial
//! presentation order comes from the experiment's randomizer; ordering
//! survives as an `S`-prefixed zero-padded token so materialized ids sort
//! the same way scanned ids do.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use trialforge_shared::{
    NULL_RANDOMIZER, Record, ResolvedRandomizer, Result, SHUFFLE_RANDOMIZER, StimuliParameters,
    TrialforgeError,
};

use crate::{DefinedTimeline, StepFiletype, StepKind, TimelineStep};

/// Identifier values of one trial, extracted from its stimuli record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialValues {
    pub trial_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
}

/// One trial in its resolved presentation position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedTrial {
    /// 1-based presentation position.
    pub order: usize,
    pub values: TrialValues,
}

/// A fully materialized timeline step: no placeholders remain.
///
/// Dynamic steps keep the trial they were expanded for, so registry
/// consumers can map a route back to its stimuli record without parsing
/// the route string. Static steps carry neither order nor values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedStep {
    pub id: String,
    pub filetype: StepFiletype,
    pub filepath: String,
    pub route: String,
    pub kind: StepKind,

    /// 1-based presentation position of the expanded trial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,

    /// Identifier values of the expanded trial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<TrialValues>,
}

/// Resolve the presentation order of stimuli records.
///
/// The `null` randomizer keeps declaration order; `shuffle` permutes it
/// deterministically from `seed`. Unknown randomizers warn and keep
/// declaration order.
pub fn resolve_trial_order(
    records: &[Record],
    parameters: &StimuliParameters,
    randomizer: &ResolvedRandomizer,
    seed: &str,
) -> Result<Vec<ResolvedTrial>> {
    let mut values: Vec<TrialValues> = records
        .iter()
        .map(|record| extract_values(record, parameters))
        .collect::<Result<_>>()?;

    match randomizer.name.as_str() {
        NULL_RANDOMIZER => {}
        SHUFFLE_RANDOMIZER => {
            let mut rng = StdRng::seed_from_u64(hash_seed(seed));
            values.shuffle(&mut rng);
        }
        other => {
            warn!(
                randomizer = other,
                "unknown randomizer, keeping declaration order"
            );
        }
    }

    debug!(trials = values.len(), randomizer = %randomizer.name, "trial order resolved");

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(position, values)| ResolvedTrial {
            order: position + 1,
            values,
        })
        .collect())
}

/// Materialize one dynamic step for one trial.
///
/// The `[trialID]` id token becomes `S` plus the zero-padded presentation
/// order; block and condition tokens drop out of the id. Any placeholder
/// left over afterwards is fatal.
pub fn materialize_step(step: &TimelineStep, trial: &ResolvedTrial) -> Result<MaterializedStep> {
    let tokens: Vec<String> = step
        .id
        .split('.')
        .map(|token| match token {
            "[trialID]" => format!("S{:05}", trial.order),
            "[blockID]" | "[conditionID]" => String::new(),
            other => other.to_string(),
        })
        .filter(|token| !token.is_empty())
        .collect();

    let id = tokens.join(".");

    if id.contains('[') {
        return Err(TrialforgeError::timeline(format!(
            "step `{}` keeps a placeholder that no stimuli field resolves",
            step.id
        )));
    }

    Ok(MaterializedStep {
        id,
        filetype: step.filetype,
        filepath: step.filepath.clone(),
        route: step.template.substitute(&trial.values)?,
        kind: StepKind::Dynamic,
        order: Some(trial.order),
        values: Some(trial.values.clone()),
    })
}

/// Materialize a whole timeline: static steps pass through in place,
/// dynamic steps expand into one step per trial.
pub fn materialize_timeline(
    timeline: &DefinedTimeline,
    trials: &[ResolvedTrial],
) -> Result<Vec<MaterializedStep>> {
    let mut out = Vec::new();

    for step in &timeline.steps {
        match step.kind {
            StepKind::Static => out.push(MaterializedStep {
                id: step.id.clone(),
                filetype: step.filetype,
                filepath: step.filepath.clone(),
                route: step.route.clone(),
                kind: StepKind::Static,
                order: None,
                values: None,
            }),
            StepKind::Dynamic => {
                for trial in trials {
                    out.push(materialize_step(step, trial)?);
                }
            }
        }
    }

    Ok(out)
}

/// Pull the identifier values a record contributes to routing.
fn extract_values(record: &Record, parameters: &StimuliParameters) -> Result<TrialValues> {
    let trial_id = record
        .get(&parameters.trial_id)
        .map(stringify)
        .ok_or_else(|| {
            TrialforgeError::timeline(format!(
                "stimuli record is missing its trial identifier `{}`",
                parameters.trial_id
            ))
        })?;

    let block_id = parameters
        .block_id
        .as_ref()
        .and_then(|field| record.get(field))
        .map(stringify);
    let condition_id = parameters
        .condition_id
        .as_ref()
        .and_then(|field| record.get(field))
        .map(stringify);

    Ok(TrialValues {
        trial_id,
        block_id,
        condition_id,
    })
}

/// Render an identifier value as path text. Strings stay bare; everything
/// else uses its JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn hash_seed(seed: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RouteTemplate;
    use serde_json::json;

    fn parameters() -> StimuliParameters {
        StimuliParameters {
            trial_id: "index".into(),
            block_id: Some("block".into()),
            condition_id: None,
        }
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                json!({ "index": i, "block": format!("b{}", i % 2) })
                    .as_object()
                    .unwrap()
                    .clone()
            })
            .collect()
    }

    fn randomizer(name: &str) -> ResolvedRandomizer {
        ResolvedRandomizer {
            name: name.into(),
            options: serde_json::Map::new(),
        }
    }

    fn dynamic_step(id: &str, parts: &[&str]) -> TimelineStep {
        let template = RouteTemplate::from_parts(parts.iter().copied());
        TimelineStep {
            id: id.into(),
            filetype: StepFiletype::Vue,
            filepath: format!("experiments/stroop@pilot/{id}.vue"),
            route: template.render(),
            template,
            kind: StepKind::Dynamic,
        }
    }

    #[test]
    fn null_randomizer_keeps_declaration_order() {
        let trials =
            resolve_trial_order(&records(3), &parameters(), &randomizer("null"), "stroop@pilot")
                .expect("resolves");
        let ids: Vec<&str> = trials.iter().map(|t| t.values.trial_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(trials[2].order, 3);
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let once =
            resolve_trial_order(&records(8), &parameters(), &randomizer("shuffle"), "seed-a")
                .expect("resolves");
        let again =
            resolve_trial_order(&records(8), &parameters(), &randomizer("shuffle"), "seed-a")
                .expect("resolves");
        let first: Vec<&str> = once.iter().map(|t| t.values.trial_id.as_str()).collect();
        let second: Vec<&str> = again.iter().map(|t| t.values.trial_id.as_str()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_randomizer_degrades_to_declaration_order() {
        let trials =
            resolve_trial_order(&records(3), &parameters(), &randomizer("latin-square"), "s")
                .expect("resolves");
        let ids: Vec<&str> = trials.iter().map(|t| t.values.trial_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn trial_token_becomes_padded_order() {
        let step = dynamic_step("02.[trialID]", &["trials", "[trialID]"]);
        let trial = ResolvedTrial {
            order: 7,
            values: TrialValues {
                trial_id: "42".into(),
                block_id: None,
                condition_id: None,
            },
        };

        let resolved = materialize_step(&step, &trial).expect("materializes");
        assert_eq!(resolved.id, "02.S00007");
        assert_eq!(resolved.route, "/trials/42/");
        assert_eq!(resolved.kind, StepKind::Dynamic);
        assert_eq!(resolved.order, Some(7));
        assert_eq!(
            resolved.values.as_ref().map(|v| v.trial_id.as_str()),
            Some("42")
        );
    }

    #[test]
    fn block_tokens_drop_out_of_the_id() {
        let step = dynamic_step(
            "02.[blockID].[trialID]",
            &["trials", "[blockID]", "[trialID]"],
        );
        let trial = ResolvedTrial {
            order: 1,
            values: TrialValues {
                trial_id: "3".into(),
                block_id: Some("b1".into()),
                condition_id: None,
            },
        };

        let resolved = materialize_step(&step, &trial).expect("materializes");
        assert_eq!(resolved.id, "02.S00001");
        assert_eq!(resolved.route, "/trials/b1/3/");
    }

    #[test]
    fn leftover_placeholders_are_fatal() {
        let step = dynamic_step("02.[mystery]", &["trials", "[mystery]"]);
        let trial = ResolvedTrial {
            order: 1,
            values: TrialValues {
                trial_id: "3".into(),
                block_id: None,
                condition_id: None,
            },
        };

        let err = materialize_step(&step, &trial).unwrap_err();
        assert!(err.to_string().contains("02.[mystery]"));
    }

    #[test]
    fn materialize_timeline_expands_dynamic_steps_in_place() {
        let static_step = TimelineStep {
            id: "01".into(),
            filetype: StepFiletype::Vue,
            filepath: "experiments/stroop@pilot/01.welcome.vue".into(),
            route: "/welcome/".into(),
            template: RouteTemplate::from_parts(["welcome"]),
            kind: StepKind::Static,
        };
        let timeline = DefinedTimeline {
            experiment: "stroop@pilot".into(),
            steps: vec![static_step, dynamic_step("02.[trialID]", &["trials", "[trialID]"])],
        };
        let trials =
            resolve_trial_order(&records(2), &parameters(), &randomizer("null"), "stroop@pilot")
                .expect("resolves");

        let steps = materialize_timeline(&timeline, &trials).expect("materializes");
        let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["01", "02.S00001", "02.S00002"]);

        // Static steps carry no trial; expanded steps carry theirs.
        assert_eq!(steps[0].kind, StepKind::Static);
        assert_eq!(steps[0].order, None);
        assert!(steps[0].values.is_none());
        assert_eq!(steps[2].order, Some(2));
        assert_eq!(
            steps[2].values.as_ref().map(|v| v.trial_id.as_str()),
            Some("1")
        );
    }
}
