//! DB IR: sibling database projects referenced by `foreign(..)` fields and
//! by `db:project.table.column` constraints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::CoupletEntry;
use crate::types::TypeKind;

/// A sibling project exposing persistent tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbProject {
    pub name: String,

    /// Rust module path of the generated table types (e.g. `crate::billing`).
    pub module: String,

    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
}

/// A table of a database project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,

    /// Name of the record type generated for this table.
    pub struct_name: String,

    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeKind,

    /// Enumerated value set, empty when the column is unconstrained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<CoupletEntry>,
}

/// A parsed `project.table.column` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef<'a> {
    pub project: &'a str,
    pub table: &'a str,
    pub column: &'a str,
}

impl<'a> ColumnRef<'a> {
    /// Parses `project.table.column`; `None` unless there are exactly three
    /// non-empty segments.
    pub fn parse(token: &'a str) -> Option<Self> {
        let mut parts = token.split('.');
        let project = parts.next().filter(|s| !s.is_empty())?;
        let table = parts.next().filter(|s| !s.is_empty())?;
        let column = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            project,
            table,
            column,
        })
    }
}
