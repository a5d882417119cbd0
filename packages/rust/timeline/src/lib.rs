//! Timeline scanning and materialization.
//!
//! Scanning walks an experiment's content directory and turns every page
//! file into a timeline step with a stable ordering id and a routable path.
//! Materialization expands dynamic (parameterized) steps into one concrete
//! step per stimuli trial.

mod materialize;
mod route;
mod scan;

use serde::{Deserialize, Serialize};

pub use materialize::{
    MaterializedStep, ResolvedTrial, TrialValues, materialize_step, materialize_timeline,
    resolve_trial_order,
};
pub use route::{RouteSegment, RouteTemplate};
pub use scan::scan_experiment_directory;

/// Source filetype of a timeline page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepFiletype {
    Vue,
    Mdx,
}

/// Whether a step is concrete or parameterized over trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Static,
    Dynamic,
}

/// One scanned timeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineStep {
    /// Ordering id: dot-joined numeric and placeholder tokens,
    /// e.g. `01.02` or `02.[trialID]`.
    pub id: String,

    pub filetype: StepFiletype,

    /// Virtual file path, rooted at `experiments/<experiment-id>/`.
    pub filepath: String,

    /// Rendered route with parameter markers, rooted at the virtual
    /// experiment directory, e.g. `/experiments/stroop@pilot/trials/:trialID/`.
    pub route: String,

    #[serde(skip)]
    pub template: RouteTemplate,

    pub kind: StepKind,
}

/// A scanned timeline: all steps of one experiment, sorted by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinedTimeline {
    /// Owning experiment id, `name@version`.
    pub experiment: String,
    pub steps: Vec<TimelineStep>,
}
