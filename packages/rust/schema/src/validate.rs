//! Structural validation of compiled tables.
//!
//! Every invariant here is checked before any DDL is emitted; violations are
//! fatal to the build.

use std::collections::HashSet;

use trialforge_shared::{FieldRole, Result, TrialforgeError};

use crate::ddl::implicit_index_name;
use crate::table::{Table, TableKind};

/// Validate a table against the structural invariants of the table model.
///
/// - at least one column;
/// - index names unique within the table (implicit column-level indexes
///   included, since they share the CREATE INDEX namespace);
/// - every index column references an existing table column;
/// - every composite-key column references an existing table column;
/// - stimuli tables: exactly one trial-id column, at most one block-id and
///   one condition-id column.
pub fn validate_table(table: &Table) -> Result<()> {
    if table.columns.is_empty() {
        return Err(TrialforgeError::Schema(format!(
            "table `{}` must have at least one column",
            table.name
        )));
    }

    let mut seen: HashSet<String> = table
        .columns
        .iter()
        .filter(|(_, column)| column.constraints.index)
        .map(|(name, _)| implicit_index_name(&table.name, name))
        .collect();

    for index in &table.indexes {
        if index.columns.is_empty() {
            return Err(TrialforgeError::Schema(format!(
                "index `{}` on table `{}` must name at least one column",
                index.name, table.name
            )));
        }

        if !seen.insert(index.name.clone()) {
            return Err(TrialforgeError::Schema(format!(
                "duplicate index name `{}` on table `{}`",
                index.name, table.name
            )));
        }

        for column in &index.columns {
            if !table.columns.contains_key(column) {
                return Err(TrialforgeError::Schema(format!(
                    "index `{}` on table `{}` references unknown column `{column}`",
                    index.name, table.name
                )));
            }
        }
    }

    if let Some(key) = &table.composite_primary {
        for column in key {
            if !table.columns.contains_key(column) {
                return Err(TrialforgeError::Schema(format!(
                    "composite key on table `{}` references unknown column `{column}`",
                    table.name
                )));
            }
        }
    }

    if table.kind == TableKind::Stimuli {
        validate_stimuli_roles(table)?;
    }

    Ok(())
}

/// Trial/block/condition cardinality rules for stimuli tables.
fn validate_stimuli_roles(table: &Table) -> Result<()> {
    let trials = table.role_count(FieldRole::TrialId);
    if trials != 1 {
        return Err(TrialforgeError::Schema(format!(
            "stimuli table `{}` must have exactly one trial-id column, found {trials}",
            table.name
        )));
    }

    for (role, label) in [
        (FieldRole::BlockId, "block-id"),
        (FieldRole::ConditionId, "condition-id"),
    ] {
        let count = table.role_count(role);
        if count > 1 {
            return Err(TrialforgeError::Schema(format!(
                "stimuli table `{}` may have at most one {label} column, found {count}",
                table.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use trialforge_shared::{FieldType, RecordSchema};

    use crate::table::{Column, ColumnConstraints, Table};

    fn column(ty: FieldType) -> Column {
        Column {
            ty,
            constraints: ColumnConstraints::default(),
        }
    }

    fn base_table(name: &str) -> Table {
        let mut columns = IndexMap::new();
        columns.insert("a".to_string(), column(FieldType::Text));
        columns.insert("b".to_string(), column(FieldType::Number));
        Table {
            name: name.to_string(),
            kind: TableKind::Base,
            columns,
            composite_primary: None,
            indexes: Vec::new(),
        }
    }

    #[test]
    fn accepts_plain_table() {
        assert!(validate_table(&base_table("t")).is_ok());
    }

    #[test]
    fn rejects_duplicate_index_names() {
        let table = base_table("t")
            .with_index("idx", &["a"], false)
            .with_index("idx", &["b"], false);
        let err = validate_table(&table).unwrap_err();
        assert!(err.to_string().contains("duplicate index name"));
    }

    #[test]
    fn rejects_index_over_unknown_column() {
        let table = base_table("t").with_index("idx", &["missing"], false);
        let err = validate_table(&table).unwrap_err();
        assert!(err.to_string().contains("unknown column `missing`"));
    }

    #[test]
    fn rejects_named_index_colliding_with_implicit() {
        let mut table = base_table("t");
        table.columns.get_mut("a").unwrap().constraints.index = true;
        let implicit = implicit_index_name("t", "a");
        let table = table.with_index(&implicit, &["b"], false);
        assert!(validate_table(&table).is_err());
    }

    #[test]
    fn stimuli_requires_exactly_one_trial_id() {
        let mut schema = RecordSchema::default();
        let mut first = trialforge_shared::FieldSpec::new(FieldType::Number);
        first.role = Some(FieldRole::TrialId);
        let mut second = trialforge_shared::FieldSpec::new(FieldType::Number);
        second.role = Some(FieldRole::TrialId);
        schema.fields.insert("one".into(), first);
        schema.fields.insert("two".into(), second);

        let err = Table::from_schema("_stimuli-x", TableKind::Stimuli, &schema).unwrap_err();
        assert!(err.to_string().contains("exactly one trial-id"));
    }

    #[test]
    fn stimuli_block_id_is_optional() {
        let mut schema = RecordSchema::default();
        let mut trial = trialforge_shared::FieldSpec::new(FieldType::Number);
        trial.role = Some(FieldRole::TrialId);
        schema.fields.insert("index".into(), trial);

        assert!(Table::from_schema("_stimuli-x", TableKind::Stimuli, &schema).is_ok());
    }
}
