//! Configuration layers.
//!
//! Each layer is a project directory optionally containing a
//! `trialforge.toml`. Layers are ordered outermost-first; the innermost
//! (most specific) layer wins when choosing the active experiment. A missing
//! config file contributes an empty layer rather than an error.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::debug;

use trialforge_shared::{Result, TrialforgeError};

use crate::experiment::ExperimentDefinition;

/// Per-layer configuration file name.
pub const CONFIG_FILE_NAME: &str = "trialforge.toml";

/// Contents of one `trialforge.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerConfig {
    /// Identity of the experiment to serve, `name@version`.
    #[serde(default)]
    pub active_experiment: Option<String>,

    /// Raw experiment definitions declared by this layer.
    #[serde(default)]
    pub experiments: Vec<ExperimentDefinition>,
}

/// One loaded configuration layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer root directory (parent of its `experiments/` tree).
    pub root: PathBuf,
    pub config: LayerConfig,
}

impl ConfigLayer {
    /// An empty layer rooted at `root`, used when no config file exists.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: LayerConfig::default(),
        }
    }

    /// Where this layer's experiment content directories live.
    pub fn search_path(&self) -> PathBuf {
        self.root.join("experiments")
    }
}

/// Load one layer from its root directory.
pub fn load_layer(root: &Path) -> Result<ConfigLayer> {
    let path = root.join(CONFIG_FILE_NAME);

    if !path.exists() {
        debug!(?path, "no layer config file, contributing empty layer");
        return Ok(ConfigLayer::empty(root));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| TrialforgeError::io(&path, e))?;
    let config: LayerConfig = toml::from_str(&content).map_err(|e| {
        TrialforgeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    Ok(ConfigLayer {
        root: root.to_path_buf(),
        config,
    })
}

/// Load all layers concurrently, preserving the outermost-first input order.
///
/// Any parse failure fails the whole load; a missing file does not.
pub async fn load_layers(roots: &[PathBuf]) -> Result<Vec<ConfigLayer>> {
    let mut set = JoinSet::new();
    for (position, root) in roots.iter().cloned().enumerate() {
        set.spawn_blocking(move || (position, load_layer(&root)));
    }

    let mut layers: Vec<Option<ConfigLayer>> = vec![None; roots.len()];
    while let Some(joined) = set.join_next().await {
        let (position, layer) = joined
            .map_err(|e| TrialforgeError::config(format!("layer load task failed: {e}")))?;
        layers[position] = Some(layer?);
    }

    Ok(layers.into_iter().flatten().collect())
}
