//! The compiled table model: columns, constraints, and index definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use trialforge_shared::{FieldRole, FieldSpec, FieldType, RecordSchema, Result};

/// Whether a table backs experiment records or stimuli seed data.
///
/// Stimuli tables carry the extra trial/block/condition cardinality rules
/// checked by [`crate::validate_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableKind {
    Base,
    Stimuli,
}

/// Constraint set for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConstraints {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub index: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<FieldRole>,
}

/// One column of a compiled table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub constraints: ColumnConstraints,
}

impl From<&FieldSpec> for Column {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            ty: spec.ty,
            constraints: ColumnConstraints {
                primary_key: spec.primary_key,
                unique: spec.unique,
                index: spec.index,
                optional: spec.optional,
                role: spec.role,
            },
        }
    }
}

/// A named index over one or more existing columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
}

/// A compiled table: name, ordered columns, optional composite key, indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: IndexMap<String, Column>,

    /// Composite primary key column list, if the key spans multiple columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_primary: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
}

impl Table {
    /// Build a table of the given kind directly from a record schema,
    /// validating it before returning.
    ///
    /// Columns carrying the `index` constraint get implicit single-column
    /// indexes during DDL emission; named indexes can be attached afterwards
    /// via [`Table::with_index`] (re-validate after mutating).
    pub fn from_schema(name: &str, kind: TableKind, schema: &RecordSchema) -> Result<Self> {
        let columns = schema
            .fields
            .iter()
            .map(|(field, spec)| (field.clone(), Column::from(spec)))
            .collect();

        let table = Self {
            name: name.to_string(),
            kind,
            columns,
            composite_primary: None,
            indexes: Vec::new(),
        };

        crate::validate_table(&table)?;
        Ok(table)
    }

    /// Attach a named index definition.
    pub fn with_index(mut self, name: &str, columns: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexDef {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        });
        self
    }

    /// Count columns whose constraint set carries the given role.
    pub fn role_count(&self, role: FieldRole) -> usize {
        self.columns
            .values()
            .filter(|c| c.constraints.role == Some(role))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialforge_shared::{FieldSpec, FieldType};

    #[test]
    fn from_schema_preserves_field_order_and_constraints() {
        let mut schema = RecordSchema::default();
        let mut id = FieldSpec::new(FieldType::Text);
        id.primary_key = true;
        schema.fields.insert("id".into(), id);
        schema
            .fields
            .insert("score".into(), FieldSpec::new(FieldType::Number));

        let table = Table::from_schema("results", TableKind::Base, &schema).expect("valid");
        let names: Vec<_> = table.columns.keys().cloned().collect();
        assert_eq!(names, vec!["id", "score"]);
        assert!(table.columns["id"].constraints.primary_key);
    }

    #[test]
    fn from_schema_rejects_empty() {
        let schema = RecordSchema::default();
        assert!(Table::from_schema("empty", TableKind::Base, &schema).is_err());
    }
}
