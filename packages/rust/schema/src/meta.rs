//! Built-in "meta" tables shared by every deployment.
//!
//! These exist regardless of which experiments are configured: participants,
//! their sessions, and the per-block / per-trial progress rows the runtime
//! records into. Experiment- and stimuli-specific tables are added on top by
//! the pipeline.

use trialforge_shared::{FieldSpec, FieldType, RecordSchema, Result};

use crate::table::{Table, TableKind};

fn field(ty: FieldType) -> FieldSpec {
    FieldSpec::new(ty)
}

fn primary(ty: FieldType) -> FieldSpec {
    let mut f = FieldSpec::new(ty);
    f.primary_key = true;
    f
}

fn indexed(ty: FieldType) -> FieldSpec {
    let mut f = FieldSpec::new(ty);
    f.index = true;
    f
}

fn optional(ty: FieldType) -> FieldSpec {
    let mut f = FieldSpec::new(ty);
    f.optional = true;
    f
}

/// The four built-in meta tables, in emission order.
pub fn meta_tables() -> Result<Vec<Table>> {
    Ok(vec![
        participants_table()?,
        sessions_table()?,
        blocks_table()?,
        trials_table()?,
    ])
}

fn participants_table() -> Result<Table> {
    let mut schema = RecordSchema::default();
    schema.fields.insert("id".into(), primary(FieldType::Text));
    schema
        .fields
        .insert("service".into(), optional(FieldType::Json));
    schema
        .fields
        .insert("created_at".into(), field(FieldType::Date));
    schema
        .fields
        .insert("meta".into(), optional(FieldType::Json));
    Table::from_schema("participants", TableKind::Base, &schema)
}

fn sessions_table() -> Result<Table> {
    let mut schema = RecordSchema::default();
    schema.fields.insert("id".into(), primary(FieldType::Text));
    schema
        .fields
        .insert("participant_id".into(), indexed(FieldType::Text));
    schema
        .fields
        .insert("experiment_id".into(), indexed(FieldType::Text));
    schema
        .fields
        .insert("random_seed".into(), optional(FieldType::Text));
    schema
        .fields
        .insert("started_at".into(), field(FieldType::Date));
    schema
        .fields
        .insert("completed_at".into(), optional(FieldType::Date));
    Table::from_schema("sessions", TableKind::Base, &schema)
}

fn blocks_table() -> Result<Table> {
    let mut schema = RecordSchema::default();
    schema.fields.insert("id".into(), primary(FieldType::Text));
    schema
        .fields
        .insert("session_id".into(), indexed(FieldType::Text));
    schema
        .fields
        .insert("block_id".into(), field(FieldType::Text));
    schema
        .fields
        .insert("position".into(), field(FieldType::Number));
    schema
        .fields
        .insert("started_at".into(), optional(FieldType::Date));
    Table::from_schema("blocks", TableKind::Base, &schema)
}

fn trials_table() -> Result<Table> {
    let mut schema = RecordSchema::default();
    schema.fields.insert("id".into(), primary(FieldType::Text));
    schema
        .fields
        .insert("session_id".into(), indexed(FieldType::Text));
    schema
        .fields
        .insert("step_id".into(), field(FieldType::Text));
    schema
        .fields
        .insert("position".into(), field(FieldType::Number));
    schema
        .fields
        .insert("response".into(), optional(FieldType::Json));
    schema
        .fields
        .insert("recorded_at".into(), field(FieldType::Date));
    Table::from_schema("trials", TableKind::Base, &schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_tables_validate_and_keep_order() {
        let tables = meta_tables().expect("meta tables are valid");
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["participants", "sessions", "blocks", "trials"]);
    }

    #[test]
    fn sessions_table_indexes_lookup_columns() {
        let tables = meta_tables().expect("valid");
        let sessions = &tables[1];
        assert!(sessions.columns["participant_id"].constraints.index);
        assert!(sessions.columns["experiment_id"].constraints.index);
    }
}
