//! Record-schema vocabulary shared by the config, stimuli, and schema crates.
//!
//! Every experiment and stimuli set describes its records as a named map of
//! [`FieldSpec`]s: a storage type plus an explicit tagged constraint set.
//! Role markers (trial/block/condition identifiers) are part of the constraint
//! set rather than ad hoc metadata, so downstream passes can validate their
//! cardinality structurally.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrialforgeError};

/// Storage type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Json,
}

/// Identifier role a field can play in a stimuli schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldRole {
    TrialId,
    BlockId,
    ConditionId,
}

/// One field of a record schema: a type plus its constraint set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Storage type.
    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Column is the table's primary key.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,

    /// Column values must be unique.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,

    /// Column gets an implicit single-column index.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub index: bool,

    /// Field may be absent or null.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Identifier role, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<FieldRole>,
}

impl FieldSpec {
    /// A plain required field of the given type with no constraints.
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            primary_key: false,
            unique: false,
            index: false,
            optional: false,
            role: None,
        }
    }
}

/// A validated record: schema field name → JSON value.
///
/// `serde_json::Map` keeps keys sorted, so serialized records are
/// byte-stable across builds.
pub type Record = serde_json::Map<String, Value>;

/// An ordered, named map of field specs describing one record shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSchema {
    pub fields: IndexMap<String, FieldSpec>,
}

impl RecordSchema {
    /// Number of fields carrying the given role.
    pub fn role_count(&self, role: FieldRole) -> usize {
        self.fields
            .values()
            .filter(|f| f.role == Some(role))
            .count()
    }

    /// Name of the first field carrying the given role, in declaration order.
    pub fn first_with_role(&self, role: FieldRole) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, f)| f.role == Some(role))
            .map(|(name, _)| name.as_str())
    }

    /// Validate a raw record against this schema.
    ///
    /// Unknown keys are dropped; missing or null values for non-optional
    /// fields and type mismatches are errors. Returns the validated record
    /// containing only schema fields.
    pub fn validate_record(&self, raw: &Record) -> Result<Record> {
        let mut out = Record::new();

        for (name, spec) in &self.fields {
            match raw.get(name) {
                None | Some(Value::Null) => {
                    if !spec.optional {
                        return Err(TrialforgeError::validation(format!(
                            "missing required field `{name}`"
                        )));
                    }
                    if raw.contains_key(name) {
                        out.insert(name.clone(), Value::Null);
                    }
                }
                Some(value) => {
                    check_type(name, spec.ty, value)?;
                    out.insert(name.clone(), value.clone());
                }
            }
        }

        Ok(out)
    }

    /// Coerce a raw text cell (e.g. from a CSV column) into the JSON value
    /// shape this schema expects for `field`.
    ///
    /// Empty cells become null. Unknown field names pass through as text so
    /// that [`Self::validate_record`] can drop them.
    pub fn coerce_cell(&self, field: &str, cell: &str) -> Value {
        let Some(spec) = self.fields.get(field) else {
            return Value::String(cell.to_string());
        };

        if cell.is_empty() {
            return Value::Null;
        }

        match spec.ty {
            FieldType::Text | FieldType::Date => Value::String(cell.to_string()),
            FieldType::Number => {
                if let Ok(n) = cell.parse::<i64>() {
                    Value::Number(n.into())
                } else if let Ok(f) = cell.parse::<f64>() {
                    serde_json::Number::from_f64(f)
                        .map(Value::Number)
                        .unwrap_or(Value::String(cell.to_string()))
                } else {
                    Value::String(cell.to_string())
                }
            }
            FieldType::Boolean => match cell {
                "true" | "TRUE" | "True" | "1" => Value::Bool(true),
                "false" | "FALSE" | "False" | "0" => Value::Bool(false),
                _ => Value::String(cell.to_string()),
            },
            FieldType::Json => {
                serde_json::from_str(cell).unwrap_or(Value::String(cell.to_string()))
            }
        }
    }
}

/// Schema field names playing each identifier role for a stimuli set.
///
/// Extracted from a [`RecordSchema`] by the stimuli resolver (first matching
/// field wins per role) and consumed by the timeline scanner to rewrite
/// bracket placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimuliParameters {
    /// Field naming the trial identifier. Required.
    pub trial_id: String,

    /// Field naming the block identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    /// Field naming the condition identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
}

impl StimuliParameters {
    /// Map a schema field name back to its role name
    /// (`"index"` → `"trialID"`), if the field plays a role.
    pub fn role_of(&self, field: &str) -> Option<&'static str> {
        if field == self.trial_id {
            Some("trialID")
        } else if self.block_id.as_deref() == Some(field) {
            Some("blockID")
        } else if self.condition_id.as_deref() == Some(field) {
            Some("conditionID")
        } else {
            None
        }
    }
}

/// Check that `value` matches the storage type of field `name`.
fn check_type(name: &str, ty: FieldType, value: &Value) -> Result<()> {
    let ok = match ty {
        FieldType::Text => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Date => match value.as_str() {
            Some(s) => parse_date(s),
            None => false,
        },
        FieldType::Json => true,
    };

    if ok {
        Ok(())
    } else {
        Err(TrialforgeError::validation(format!(
            "field `{name}` does not match type {ty:?}: {value}"
        )))
    }
}

/// Accept RFC 3339 timestamps or plain `YYYY-MM-DD` dates.
fn parse_date(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
