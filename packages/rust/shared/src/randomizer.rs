//! Randomizer definitions and resolution.
//!
//! Experiments name a strategy for ordering trials. Config files may use a
//! bare string (`"shuffle"`) or a full `{ name, options }` object. Bare names
//! matching a built-in resolve to that built-in's option set; any other bare
//! string becomes a custom randomizer with empty options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Built-in randomizer names.
pub const NULL_RANDOMIZER: &str = "null";
pub const SHUFFLE_RANDOMIZER: &str = "shuffle";

/// A randomizer as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefinedRandomizer {
    /// Shorthand: a built-in or custom strategy name.
    Name(String),

    /// Full form with an explicit options bag.
    Full {
        name: String,
        #[serde(default)]
        options: Map<String, Value>,
    },
}

impl Default for DefinedRandomizer {
    fn default() -> Self {
        Self::Name(NULL_RANDOMIZER.to_string())
    }
}

/// A fully resolved randomizer: concrete name plus options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRandomizer {
    pub name: String,
    pub options: Map<String, Value>,
}

impl ResolvedRandomizer {
    fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            options: Map::new(),
        }
    }
}

/// Resolve a defined randomizer to its concrete form.
pub fn resolve_randomizer(randomizer: &DefinedRandomizer) -> ResolvedRandomizer {
    match randomizer {
        DefinedRandomizer::Name(name) => match name.as_str() {
            NULL_RANDOMIZER => ResolvedRandomizer::builtin(NULL_RANDOMIZER),
            SHUFFLE_RANDOMIZER => ResolvedRandomizer::builtin(SHUFFLE_RANDOMIZER),
            custom => ResolvedRandomizer {
                name: custom.to_string(),
                options: Map::new(),
            },
        },
        DefinedRandomizer::Full { name, options } => ResolvedRandomizer {
            name: name.clone(),
            options: options.clone(),
        },
    }
}
