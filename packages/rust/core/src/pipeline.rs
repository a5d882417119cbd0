//! End-to-end build pipeline: config layers → resolution → timeline scan →
//! stimuli loading → table compilation → artifact emission.

use std::path::PathBuf;
use std::time::Instant;

use indexmap::IndexMap;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use trialforge_config::{ResolvedConfig, load_layers, resolve_config};
use trialforge_schema::{Table, TableKind, meta_tables};
use trialforge_shared::{Record, Result, TrialforgeError};
use trialforge_stimuli::load_records;
use trialforge_timeline::{
    DefinedTimeline, materialize_timeline, resolve_trial_order, scan_experiment_directory,
};

use crate::registry::{BuildMeta, ExperimentEntry, Registry};

/// Default output directory, relative to the project root.
pub const DEFAULT_OUT_DIR: &str = ".trialforge";

/// Configuration for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root: anchors the default layer, the default experiment, and
    /// the default output directory.
    pub project_root: PathBuf,

    /// Extra config layers, outermost-first. The project root itself is
    /// always the innermost layer.
    pub layer_roots: Vec<PathBuf>,

    /// Output directory override.
    pub out_dir: Option<PathBuf>,
}

impl BuildConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            layer_roots: Vec::new(),
            out_dir: None,
        }
    }

    /// All layer roots in load order, ending with the project root.
    pub fn layer_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.layer_roots.clone();
        roots.push(self.project_root.clone());
        roots
    }

    /// The effective output directory.
    pub fn out_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| self.project_root.join(DEFAULT_OUT_DIR))
    }
}

/// Everything a build computes, before any file is written.
#[derive(Debug)]
pub struct BuildOutput {
    pub registry: Registry,
    pub tables: Vec<Table>,

    /// Stimuli seed records, keyed by stimuli table name.
    pub seeds: IndexMap<String, Vec<Record>>,
}

/// Summary of one completed build.
#[derive(Debug)]
pub struct BuildResult {
    pub out_dir: PathBuf,
    pub experiments: usize,
    pub steps: usize,
    pub tables: usize,
    pub records: usize,
    pub elapsed: std::time::Duration,
}

/// Load and resolve the configuration only, without compiling anything.
pub async fn resolve(config: &BuildConfig) -> Result<ResolvedConfig> {
    let layers = load_layers(&config.layer_roots()).await?;
    resolve_config(&layers, &config.project_root)
}

/// Run the full pipeline in memory.
#[instrument(skip_all, fields(project = %config.project_root.display()))]
pub async fn compile(config: &BuildConfig) -> Result<BuildOutput> {
    // --- Phase 1: Configuration ---
    let resolved = resolve(config).await?;

    // --- Phase 2: Timeline scans ---
    // One blocking directory walk per experiment, fanned out and collected
    // back in registry order.
    let mut set = JoinSet::new();
    for (position, experiment) in resolved.experiments.values().cloned().enumerate() {
        set.spawn_blocking(move || {
            let timeline = scan_experiment_directory(
                &experiment.id,
                &experiment.path,
                &experiment.stimuli.parameters,
            );
            (position, timeline)
        });
    }

    let mut timelines: Vec<Option<DefinedTimeline>> = vec![None; resolved.experiments.len()];
    while let Some(joined) = set.join_next().await {
        let (position, timeline) = joined
            .map_err(|e| TrialforgeError::timeline(format!("timeline scan task failed: {e}")))?;
        timelines[position] = Some(timeline?);
    }

    // --- Phase 3: Stimuli records and materialization ---
    let mut entries: IndexMap<String, ExperimentEntry> = IndexMap::new();
    let mut seeds: IndexMap<String, Vec<Record>> = IndexMap::new();

    for (experiment, timeline) in resolved.experiments.values().zip(timelines) {
        let timeline = timeline.expect("every scan position is filled");
        let records = load_records(&experiment.stimuli).await;

        let trials = resolve_trial_order(
            &records,
            &experiment.stimuli.parameters,
            &experiment.randomizer,
            &experiment.id,
        )?;
        let steps = materialize_timeline(&timeline, &trials)?;

        debug!(
            experiment = %experiment.id,
            scanned = timeline.steps.len(),
            materialized = steps.len(),
            trials = trials.len(),
            "experiment compiled"
        );

        // Experiments may share a stimuli set; its seed batch is keyed by
        // table name, so the last load wins instead of accumulating.
        seeds.insert(experiment.stimuli.table_name.clone(), records);
        entries.insert(
            experiment.id.clone(),
            ExperimentEntry {
                experiment: experiment.clone(),
                timeline,
                trials,
                steps,
            },
        );
    }

    // --- Phase 4: Table compilation ---
    let mut tables = meta_tables()?;
    for experiment in resolved.experiments.values() {
        tables.push(Table::from_schema(
            &experiment.table_name,
            TableKind::Base,
            &experiment.schema,
        )?);
        let stimuli_table = Table::from_schema(
            &experiment.stimuli.table_name,
            TableKind::Stimuli,
            &experiment.stimuli.schema,
        )?;
        // Experiments may share a stimuli set; emit its table once.
        if !tables.iter().any(|t| t.name == stimuli_table.name) {
            tables.push(stimuli_table);
        }
    }

    Ok(BuildOutput {
        registry: Registry {
            meta: BuildMeta::default(),
            active_experiment: resolved.active_experiment,
            experiments: entries,
        },
        tables,
        seeds,
    })
}

/// Run the pipeline and validate everything, writing nothing.
pub async fn check(config: &BuildConfig) -> Result<BuildOutput> {
    compile(config).await
}

/// Run the pipeline and write the artifacts.
pub async fn build(config: &BuildConfig) -> Result<BuildResult> {
    let start = Instant::now();
    let output = compile(config).await?;

    let out_dir = config.out_dir();
    crate::emit::write_artifacts(&out_dir, &output.registry, &output.tables, &output.seeds)?;

    let result = BuildResult {
        out_dir,
        experiments: output.registry.experiments.len(),
        steps: output
            .registry
            .experiments
            .values()
            .map(|e| e.steps.len())
            .sum(),
        tables: output.tables.len(),
        records: output.seeds.values().map(Vec::len).sum(),
        elapsed: start.elapsed(),
    };

    info!(
        out_dir = %result.out_dir.display(),
        experiments = result.experiments,
        steps = result.steps,
        tables = result.tables,
        records = result.records,
        elapsed_ms = result.elapsed.as_millis(),
        "build complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use trialforge_schema::ddl_script;

    fn write_project(root: &Path) {
        fs::write(
            root.join("trialforge.toml"),
            r#"
active_experiment = "stroop@pilot"

[[experiments]]
name = "stroop"
version = "pilot"
duration = "2 minutes"
compensation = "$0.50"
randomizer = "null"

[experiments.stimuli]
name = "stroop"
source = "stimuli/stroop.csv"

[experiments.stimuli.schema.index]
type = "number"
role = "trial-id"

[experiments.stimuli.schema.word]
type = "text"

[experiments.schema.index]
type = "number"
role = "trial-id"

[experiments.schema.response]
type = "text"
optional = true
"#,
        )
        .unwrap();

        fs::create_dir_all(root.join("stimuli")).unwrap();
        fs::write(
            root.join("stimuli/stroop.csv"),
            "index,word\n1,red\n2,blue\n3,green\n",
        )
        .unwrap();

        let pages = root.join("experiments/stroop@pilot");
        fs::create_dir_all(pages.join("02.trials")).unwrap();
        fs::write(pages.join("01.welcome.vue"), "").unwrap();
        fs::write(pages.join("02.trials/[index].vue"), "").unwrap();
        fs::write(pages.join("03.debrief.mdx"), "").unwrap();
    }

    #[tokio::test]
    async fn compile_produces_registry_tables_and_seeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(dir.path());

        let output = compile(&BuildConfig::new(dir.path())).await.expect("compiles");
        assert_eq!(output.registry.active_experiment, "stroop@pilot");

        let entry = output.registry.active().expect("active entry");
        assert_eq!(entry.timeline.steps.len(), 3);
        // One static + three trials + one static.
        assert_eq!(entry.steps.len(), 5);
        assert_eq!(entry.steps[1].id, "02.S00001");
        assert_eq!(
            entry.steps[1].route,
            "/experiments/stroop@pilot/trials/1/"
        );
        assert_eq!(entry.steps[1].order, Some(1));

        let names: Vec<&str> = output.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "participants",
                "sessions",
                "blocks",
                "trials",
                "_experiment-stroop-pilot",
                "_stimuli-stroop",
            ]
        );
        assert_eq!(output.seeds["_stimuli-stroop"].len(), 3);
    }

    #[tokio::test]
    async fn build_writes_all_three_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(dir.path());

        let result = build(&BuildConfig::new(dir.path())).await.expect("builds");
        assert_eq!(result.out_dir, dir.path().join(DEFAULT_OUT_DIR));
        assert!(result.out_dir.join("registry.json").exists());
        assert!(result.out_dir.join("tables.sql").exists());
        assert!(result.out_dir.join("seeds.json").exists());

        let sql = fs::read_to_string(result.out_dir.join("tables.sql")).unwrap();
        assert!(sql.contains("DROP TABLE IF EXISTS \"_experiment-stroop-pilot\";"));
        assert!(sql.contains("CREATE TABLE \"_stimuli-stroop\""));
    }

    #[tokio::test]
    async fn compilation_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(dir.path());

        let config = BuildConfig::new(dir.path());
        let once = compile(&config).await.expect("compiles");
        let again = compile(&config).await.expect("compiles");

        assert_eq!(ddl_script(&once.tables), ddl_script(&again.tables));
        assert_eq!(
            serde_json::to_string(&once.registry.experiments).unwrap(),
            serde_json::to_string(&again.registry.experiments).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&once.seeds).unwrap(),
            serde_json::to_string(&again.seeds).unwrap()
        );
    }

    #[tokio::test]
    async fn empty_project_builds_the_default_experiment() {
        let dir = tempfile::tempdir().expect("tempdir");

        let output = compile(&BuildConfig::new(dir.path())).await.expect("compiles");
        assert_eq!(output.registry.active_experiment, "default@experiment");
        // No page files exist yet, so the default timeline is empty but the
        // tables are still compiled.
        let entry = output.registry.active().expect("active entry");
        assert!(entry.steps.is_empty());
        assert!(output.tables.iter().any(|t| t.name == "_experiment-default-experiment"));
    }

    #[tokio::test]
    async fn shared_stimuli_seed_only_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("trialforge.toml"),
            r#"
[[experiments]]
name = "stroop"
version = "pilot"

[experiments.stimuli]
name = "stroop"
source = "stimuli/stroop.csv"

[experiments.stimuli.schema.index]
type = "number"
role = "trial-id"

[experiments.schema.index]
type = "number"
role = "trial-id"

[[experiments]]
name = "stroop"
version = "full"

[experiments.stimuli]
name = "stroop"
source = "stimuli/stroop.csv"

[experiments.stimuli.schema.index]
type = "number"
role = "trial-id"

[experiments.schema.index]
type = "number"
role = "trial-id"
"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("stimuli")).unwrap();
        fs::write(
            dir.path().join("stimuli/stroop.csv"),
            "index\n1\n2\n3\n",
        )
        .unwrap();

        let output = compile(&BuildConfig::new(dir.path())).await.expect("compiles");
        assert_eq!(output.registry.experiments.len(), 2);
        assert_eq!(output.seeds["_stimuli-stroop"].len(), 3);
        assert_eq!(
            output
                .tables
                .iter()
                .filter(|t| t.name == "_stimuli-stroop")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn outer_layers_contribute_experiments() {
        let outer = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write_project(project.path());
        fs::write(
            outer.path().join("trialforge.toml"),
            r#"
[[experiments]]
name = "flanker"
version = "full"

[experiments.stimuli]
name = "flanker"
source = "flanker.csv"

[experiments.stimuli.schema.index]
type = "number"
role = "trial-id"

[experiments.schema.index]
type = "number"
role = "trial-id"
"#,
        )
        .unwrap();

        let mut config = BuildConfig::new(project.path());
        config.layer_roots = vec![outer.path().to_path_buf()];

        let output = compile(&config).await.expect("compiles");
        let ids: Vec<&str> = output.registry.experiments.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["flanker@full", "stroop@pilot"]);
        assert_eq!(output.registry.active_experiment, "stroop@pilot");
    }
}
