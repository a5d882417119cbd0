//! Structured route templates.
//!
//! A route is a sequence of literal and parameter segments built once during
//! scanning. Substitution is a single explicit pass, which makes "a
//! placeholder was left over" a structurally checkable postcondition instead
//! of a regex scan over strings.

use serde::{Deserialize, Serialize};

use trialforge_shared::{Result, TrialforgeError};

use crate::TrialValues;

/// One segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "segment")]
pub enum RouteSegment {
    /// Fixed path text.
    Literal { text: String },

    /// A parameter slot, addressed by role name (`trialID`, `blockID`,
    /// `conditionID`) or a verbatim unknown name caught at substitution.
    Param { name: String, catch_all: bool },
}

/// A parsed route: ordered literal/parameter segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTemplate {
    pub segments: Vec<RouteSegment>,
}

impl RouteTemplate {
    /// Parse refined path parts into a template. Empty parts (stripped
    /// `index` segments and the like) are dropped.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = parts
            .into_iter()
            .filter(|part| !part.as_ref().is_empty())
            .map(|part| parse_segment(part.as_ref()))
            .collect();
        Self { segments }
    }

    /// Whether any parameter slot remains in the template.
    pub fn has_params(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, RouteSegment::Param { .. }))
    }

    /// Render the routable path with parameter markers
    /// (`:name`, `**:name`), slash-normalized.
    pub fn render(&self) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                RouteSegment::Literal { text } => text.clone(),
                RouteSegment::Param { name, catch_all } => {
                    if *catch_all {
                        format!("**:{name}")
                    } else {
                        format!(":{name}")
                    }
                }
            })
            .collect();
        join_path(&parts)
    }

    /// Substitute every parameter with its concrete trial value.
    ///
    /// Block/condition default to the empty string (the segment collapses);
    /// any parameter that is not a known role is an error.
    pub fn substitute(&self, values: &TrialValues) -> Result<String> {
        let mut parts: Vec<String> = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                RouteSegment::Literal { text } => parts.push(text.clone()),
                RouteSegment::Param { name, .. } => {
                    let value = match name.as_str() {
                        "trialID" => values.trial_id.clone(),
                        "blockID" => values.block_id.clone().unwrap_or_default(),
                        "conditionID" => values.condition_id.clone().unwrap_or_default(),
                        other => {
                            return Err(TrialforgeError::timeline(format!(
                                "unresolved route parameter `{other}`"
                            )));
                        }
                    };
                    parts.push(value);
                }
            }
        }

        Ok(join_path(&parts))
    }
}

fn parse_segment(part: &str) -> RouteSegment {
    let Some(inner) = part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) else {
        return RouteSegment::Literal {
            text: part.to_string(),
        };
    };

    if let Some(name) = inner.strip_prefix("...") {
        RouteSegment::Param {
            name: name.to_string(),
            catch_all: true,
        }
    } else {
        RouteSegment::Param {
            name: inner.to_string(),
            catch_all: false,
        }
    }
}

/// Join parts into a `/`-separated path with leading and trailing slashes,
/// collapsing empty parts.
fn join_path(parts: &[String]) -> String {
    let body = parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("/");

    if body.is_empty() {
        "/".to_string()
    } else {
        format!("/{body}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_literals_and_params() {
        let template = RouteTemplate::from_parts(["trials", "[trialID]"]);
        assert_eq!(template.render(), "/trials/:trialID/");
        assert!(template.has_params());
    }

    #[test]
    fn catch_all_params_use_double_star() {
        let template = RouteTemplate::from_parts(["docs", "[...slug]"]);
        assert_eq!(template.render(), "/docs/**:slug/");
    }

    #[test]
    fn empty_parts_collapse() {
        let template = RouteTemplate::from_parts(["instructions", "", "overview"]);
        assert_eq!(template.render(), "/instructions/overview/");
    }

    #[test]
    fn substitute_fills_known_roles() {
        let template = RouteTemplate::from_parts(["trials", "[blockID]", "[trialID]"]);
        let values = TrialValues {
            trial_id: "7".into(),
            block_id: Some("b1".into()),
            condition_id: None,
        };
        assert_eq!(template.substitute(&values).expect("ok"), "/trials/b1/7/");
    }

    #[test]
    fn absent_block_collapses_its_segment() {
        let template = RouteTemplate::from_parts(["trials", "[blockID]", "[trialID]"]);
        let values = TrialValues {
            trial_id: "7".into(),
            block_id: None,
            condition_id: None,
        };
        assert_eq!(template.substitute(&values).expect("ok"), "/trials/7/");
    }

    #[test]
    fn unknown_param_is_an_error() {
        let template = RouteTemplate::from_parts(["trials", "[mystery]"]);
        let values = TrialValues {
            trial_id: "7".into(),
            block_id: None,
            condition_id: None,
        };
        let err = template.substitute(&values).unwrap_err();
        assert!(err.to_string().contains("`mystery`"));
    }
}
