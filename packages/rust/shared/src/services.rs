//! Recruitment-service descriptors carried on experiment definitions.
//!
//! The build pipeline treats these as opaque: they are validated for shape,
//! stored on the resolved experiment, and passed through to the emitted
//! registry for the runtime layer to act on.

use serde::{Deserialize, Serialize};

/// Completion URL template for Prolific submissions.
const PROLIFIC_URL: &str = "https://app.prolific.com/submissions/complete?cc=";

/// Submission endpoint for Mechanical Turk.
const MTURK_URL: &str = "https://www.mturk.com/mturk/externalSubmit";

/// A participant recruitment service attached to an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExperimentService {
    /// Prolific, keyed by a completion code.
    Prolific { code: String },

    /// Amazon Mechanical Turk.
    #[serde(alias = "mturk")]
    MechanicalTurk { code: String },

    /// SONA Systems, with a lab-specific completion URL template.
    Sona { code: String, url_template: String },

    /// Citizen-science portals (no completion handshake).
    CitizenScience,

    /// Anonymous self-serve participation.
    AnonymousSubmission,
}

impl ExperimentService {
    /// The completion URL participants are sent to, if the service has one.
    pub fn completion_url(&self) -> Option<String> {
        match self {
            Self::Prolific { code } => Some(format!("{PROLIFIC_URL}{code}")),
            Self::MechanicalTurk { .. } => Some(MTURK_URL.to_string()),
            Self::Sona { code, url_template } => {
                Some(url_template.replace("{code}", code))
            }
            Self::CitizenScience | Self::AnonymousSubmission => None,
        }
    }
}
