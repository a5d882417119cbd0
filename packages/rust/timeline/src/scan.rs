//! Timeline scanner.
//!
//! Walks an experiment's content directory and derives, for every page
//! file, an ordering id (numeric and placeholder tokens from the path) and
//! a routable path template. Steps are sorted by id; sibling numeric tokens
//! must share a padding width so lexicographic order is presentation order.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use trialforge_shared::{Result, StimuliParameters, TrialforgeError};

use crate::route::RouteTemplate;
use crate::{DefinedTimeline, StepFiletype, StepKind, TimelineStep};

/// Scan one experiment's content directory into a timeline.
///
/// `pages_dir` is the resolved experiment directory; recorded file paths and
/// routes are virtual, rooted at `experiments/<experiment_id>/`. Files whose
/// extension is not `.vue` or `.mdx` are ignored.
pub fn scan_experiment_directory(
    experiment_id: &str,
    pages_dir: &Path,
    parameters: &StimuliParameters,
) -> Result<DefinedTimeline> {
    let mut steps: Vec<TimelineStep> = Vec::new();

    for entry in WalkDir::new(pages_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Some(filetype) = filetype_of(entry.path()) else {
            trace!(path = %entry.path().display(), "skipping non-page file");
            continue;
        };

        let relative = entry
            .path()
            .strip_prefix(pages_dir)
            .map_err(|_| TrialforgeError::timeline("page outside its experiment directory"))?;
        let relative = path_to_slashes(relative);

        let step = scan_step(experiment_id, &relative, filetype, parameters)?;
        trace!(id = %step.id, route = %step.route, "scanned timeline step");
        steps.push(step);
    }

    steps.sort_by(|a, b| a.id.cmp(&b.id));
    validate_padding(&steps)?;

    if steps.is_empty() {
        warn!(
            experiment = experiment_id,
            path = %pages_dir.display(),
            "no timeline pages found"
        );
    } else {
        debug!(
            experiment = experiment_id,
            steps = steps.len(),
            "timeline scanned"
        );
    }

    Ok(DefinedTimeline {
        experiment: experiment_id.to_string(),
        steps,
    })
}

/// Build one step from a slash-separated relative page path.
fn scan_step(
    experiment_id: &str,
    relative: &str,
    filetype: StepFiletype,
    parameters: &StimuliParameters,
) -> Result<TimelineStep> {
    let stem = strip_extension(relative);

    // Ordering id: split on '/' and '.', keep numeric-prefix tokens verbatim
    // and bracket tokens with schema fields rewritten to their role names.
    let mut id_tokens: Vec<String> = Vec::new();
    for token in stem.split(['/', '.']) {
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            id_tokens.push(token.to_string());
        } else if let Some(rewritten) = rewrite_placeholder(token, parameters) {
            id_tokens.push(rewritten);
        }
    }
    let id = id_tokens.join(".");

    if id.is_empty() {
        return Err(TrialforgeError::timeline(format!(
            "page `{relative}` has no ordering tokens; \
             prefix its path segments with numbers (e.g. `01.welcome.vue`)"
        )));
    }

    // Routes are rooted at the virtual experiment directory, so steps of
    // different experiments never collide in one registry.
    let mut route_parts: Vec<String> = vec!["experiments".into(), experiment_id.into()];
    route_parts.extend(stem.split('/').map(|part| {
        let refined = refine_url_part(part);
        rewrite_placeholder(&refined, parameters).unwrap_or(refined)
    }));
    let template = RouteTemplate::from_parts(route_parts);

    let kind = if id.contains('[') {
        StepKind::Dynamic
    } else {
        StepKind::Static
    };

    Ok(TimelineStep {
        id,
        filetype,
        filepath: format!("experiments/{experiment_id}/{relative}"),
        route: template.render(),
        template,
        kind,
    })
}

fn filetype_of(path: &Path) -> Option<StepFiletype> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("vue") => Some(StepFiletype::Vue),
        Some("mdx") => Some(StepFiletype::Mdx),
        _ => None,
    }
}

fn path_to_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_extension(relative: &str) -> &str {
    relative
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(relative)
}

/// Rewrite a `[field]` placeholder whose field plays an identifier role to
/// `[role]`. Unknown placeholders stay verbatim so materialization can
/// reject them with the original name; non-placeholders return `None`.
fn rewrite_placeholder(token: &str, parameters: &StimuliParameters) -> Option<String> {
    let inner = token.strip_prefix('[')?.strip_suffix(']')?;
    match parameters.role_of(inner) {
        Some(role) => Some(format!("[{role}]")),
        None => Some(token.to_string()),
    }
}

/// Refine one path segment into its routable form: drop the ordering
/// prefix (`03.trials` → `trials`), drop `index` segments entirely, and
/// strip a `.draft` marker.
fn refine_url_part(part: &str) -> String {
    let mut out = part;

    if let Some((prefix, rest)) = out.split_once('.') {
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
            out = rest;
        }
    }

    let out = out.strip_suffix(".draft").unwrap_or(out);

    if out == "index" {
        String::new()
    } else {
        out.to_string()
    }
}

/// Reject inconsistent zero-padding among sibling numeric tokens.
///
/// Tokens are siblings when the id tokens before them are equal; differing
/// digit widths there would break lexicographic ordering (`10` < `9`).
fn validate_padding(steps: &[TimelineStep]) -> Result<()> {
    let mut widths: HashMap<(String, usize), (usize, String)> = HashMap::new();

    for step in steps {
        let tokens: Vec<&str> = step.id.split('.').collect();
        for (position, token) in tokens.iter().enumerate() {
            let digits: usize = token.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                continue;
            }

            let prefix = tokens[..position].join(".");
            match widths.entry((prefix, position)) {
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert((digits, step.id.clone()));
                }
                std::collections::hash_map::Entry::Occupied(slot) => {
                    let (width, ref first) = *slot.get();
                    if width != digits {
                        return Err(TrialforgeError::timeline(format!(
                            "inconsistent numeric padding between steps `{first}` and `{}`; \
                             pad sibling ordering numbers to the same width",
                            step.id
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}
