//! Project IR: the root handed to the generator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::db::{Column, ColumnRef, DbProject, Table};
use crate::model::{Call, Couplet, Struct};

/// Everything one generation run consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project name, used for the RPC artifact names.
    pub name: String,

    /// Emission order of `structs`; dependencies come first.
    #[serde(default)]
    pub struct_order: Vec<String>,

    #[serde(default)]
    pub structs: BTreeMap<String, Struct>,

    #[serde(default)]
    pub couplets: BTreeMap<String, Couplet>,

    #[serde(default)]
    pub calls: Vec<Call>,

    /// Sibling database projects, by name.
    #[serde(default)]
    pub db_projs: BTreeMap<String, DbProject>,
}

impl Project {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn struct_def(&self, name: &str) -> Option<&Struct> {
        self.structs.get(name)
    }

    pub fn couplet(&self, name: &str) -> Option<&Couplet> {
        self.couplets.get(name)
    }

    /// Resolves a `project.table` reference of a `foreign(..)` field.
    pub fn table(&self, reference: &str) -> Option<(&DbProject, &Table)> {
        let (proj, table) = reference.split_once('.')?;
        let db = self.db_projs.get(proj)?;
        Some((db, db.tables.get(table)?))
    }

    /// Resolves a `project.table.column` token.
    pub fn column(&self, r: &ColumnRef<'_>) -> Option<&Column> {
        self.db_projs
            .get(r.project)?
            .tables
            .get(r.table)?
            .column(r.column)
    }
}
