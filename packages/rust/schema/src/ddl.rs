//! DDL emission for the compiled table model.
//!
//! Statements target SQLite. Per table, the sequence is always
//! drop-if-exists, create-table, then create-index statements; the full
//! script iterates tables in registry order, so identical input yields a
//! byte-identical script.

use trialforge_shared::FieldType;

use crate::table::{Column, Table};

/// Name for the implicit index generated by a column-level `index` flag.
pub fn implicit_index_name(table: &str, column: &str) -> String {
    format!("idx-{table}-{column}")
}

/// `DROP TABLE IF EXISTS` statement for a table.
pub fn drop_table_query(table: &Table) -> String {
    format!("DROP TABLE IF EXISTS \"{}\";", table.name)
}

/// `CREATE TABLE` statement for a table.
///
/// A `primary_key` column gets `PRIMARY KEY` and no separate `UNIQUE`
/// modifier; a `unique` non-key column gets `UNIQUE`; non-`optional` columns
/// get `NOT NULL`. A composite key is emitted as a trailing table constraint
/// instead of column-level `PRIMARY KEY`.
pub fn create_table_query(table: &Table) -> String {
    let composite = table.composite_primary.as_deref().unwrap_or_default();

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|(name, column)| {
            let inline_pk = column.constraints.primary_key && composite.is_empty();
            column_definition(name, column, inline_pk)
        })
        .collect();

    if !composite.is_empty() {
        let cols = composite
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("    PRIMARY KEY ({cols})"));
    }

    format!(
        "CREATE TABLE \"{}\" (\n{}\n);",
        table.name,
        lines.join(",\n")
    )
}

/// `CREATE INDEX` statements: implicit column-level indexes first (in column
/// order), then named index definitions (in declaration order).
pub fn create_index_queries(table: &Table) -> Vec<String> {
    let mut queries = Vec::new();

    for (name, column) in &table.columns {
        if column.constraints.index {
            queries.push(format!(
                "CREATE INDEX IF NOT EXISTS \"{}\" ON \"{}\" (\"{name}\");",
                implicit_index_name(&table.name, name),
                table.name
            ));
        }
    }

    for index in &table.indexes {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let cols = index
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        queries.push(format!(
            "CREATE {unique}INDEX IF NOT EXISTS \"{}\" ON \"{}\" ({cols});",
            index.name, table.name
        ));
    }

    queries
}

/// All statements for one table, in emission order.
pub fn table_statements(table: &Table) -> Vec<String> {
    let mut statements = vec![drop_table_query(table), create_table_query(table)];
    statements.extend(create_index_queries(table));
    statements
}

/// Full DDL script over a sequence of tables, with per-table comment headers.
pub fn ddl_script<'a>(tables: impl IntoIterator<Item = &'a Table>) -> String {
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!("-- Table \"{}\"\n", table.name));
        for statement in table_statements(table) {
            out.push_str(&statement);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn column_definition(name: &str, column: &Column, inline_pk: bool) -> String {
    let mut def = format!("    \"{name}\" {}", sql_type(column.ty));

    if inline_pk {
        def.push_str(" PRIMARY KEY");
    }
    if column.constraints.unique && !column.constraints.primary_key {
        def.push_str(" UNIQUE");
    }
    if !column.constraints.optional {
        def.push_str(" NOT NULL");
    }

    def
}

/// SQLite storage class for each column type. Booleans are stored as
/// integers; dates and JSON payloads as text.
fn sql_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Text | FieldType::Date | FieldType::Json => "TEXT",
        FieldType::Number | FieldType::Boolean => "INTEGER",
    }
}
