//! Schema compiler: record schemas → validated table model → DDL.
//!
//! Converts a [`trialforge_shared::RecordSchema`] into a [`Table`] (columns,
//! constraints, indexes), checks the structural invariants of the table
//! model, and emits SQLite DDL. This crate has no dependency on the rest of
//! the pipeline; the core crate assembles the full table registry from
//! resolved experiments.

mod ddl;
mod meta;
mod table;
mod validate;

pub use ddl::{
    create_index_queries, create_table_query, ddl_script, drop_table_query, implicit_index_name,
    table_statements,
};
pub use meta::meta_tables;
pub use table::{Column, ColumnConstraints, IndexDef, Table, TableKind};
pub use validate::validate_table;
