//! Type catalog: IR kinds to target types, defaults and wire methods.

use std::collections::BTreeMap;

use stubgen_ir::TypeKind;

use crate::error::{GenError, Result};

/// Selects the emission branch taken for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Scalar,
    Text,
    Temporal,
    Binary,
    NestedRecord,
    ForeignRecord,
}

impl Category {
    /// Record kinds delegate to the referenced type instead of a typed
    /// reader/writer call.
    pub fn is_record(&self) -> bool {
        matches!(self, Category::NestedRecord | Category::ForeignRecord)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Owned target type. Empty for record kinds, whose type is the
    /// referenced record's name.
    pub target_type: String,
    /// Borrowed form used for input parameters.
    pub param_type: String,
    pub default_literal: String,
    pub category: Category,
    /// Suffix of the runtime `write_*` / `read_*` methods.
    pub wire: String,
    /// Values are passed by reference (not `Copy`).
    pub by_ref: bool,
}

impl TypeMapping {
    pub fn new(target_type: &str, default_literal: &str, category: Category, wire: &str) -> Self {
        Self {
            target_type: target_type.to_string(),
            param_type: target_type.to_string(),
            default_literal: default_literal.to_string(),
            category,
            wire: wire.to_string(),
            by_ref: false,
        }
    }

    /// Marks the type as non-`Copy`, passed to inputs as `param_type`.
    pub fn borrowed(mut self, param_type: &str) -> Self {
        self.param_type = param_type.to_string();
        self.by_ref = true;
        self
    }

    fn record(category: Category) -> Self {
        Self {
            target_type: String::new(),
            param_type: String::new(),
            default_literal: String::new(),
            category,
            wire: String::new(),
            by_ref: true,
        }
    }
}

/// Closed registry of type mappings for one target.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    entries: BTreeMap<TypeKind, TypeMapping>,
}

impl TypeCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The Rust target: std integers, chrono temporals and `uuid::Uuid`.
    pub fn rust() -> Self {
        use Category::*;

        let mut c = Self::empty();
        c.register(TypeKind::Bool, TypeMapping::new("bool", "false", Scalar, "bool"));
        c.register(TypeKind::Char, TypeMapping::new("char", "'\\0'", Scalar, "char"));
        c.register(TypeKind::Int8, TypeMapping::new("i8", "0", Scalar, "i8"));
        c.register(TypeKind::Int16, TypeMapping::new("i16", "0", Scalar, "i16"));
        c.register(TypeKind::Int32, TypeMapping::new("i32", "0", Scalar, "i32"));
        c.register(TypeKind::Int64, TypeMapping::new("i64", "0", Scalar, "i64"));
        c.register(TypeKind::UInt8, TypeMapping::new("u8", "0", Scalar, "u8"));
        c.register(TypeKind::UInt16, TypeMapping::new("u16", "0", Scalar, "u16"));
        c.register(TypeKind::UInt32, TypeMapping::new("u32", "0", Scalar, "u32"));
        c.register(TypeKind::UInt64, TypeMapping::new("u64", "0", Scalar, "u64"));
        c.register(TypeKind::Double, TypeMapping::new("f64", "0.0", Scalar, "f64"));
        c.register(
            TypeKind::String,
            TypeMapping::new("String", "String::new()", Text, "string").borrowed("&str"),
        );
        c.register(
            TypeKind::Json,
            TypeMapping::new("String", "String::new()", Text, "json").borrowed("&str"),
        );
        c.register(TypeKind::Date, TypeMapping::new("NaiveDate", "NaiveDate::MIN", Temporal, "date"));
        c.register(TypeKind::Time, TypeMapping::new("NaiveTime", "NaiveTime::MIN", Temporal, "time"));
        c.register(
            TypeKind::DateTime,
            TypeMapping::new("NaiveDateTime", "NaiveDateTime::MIN", Temporal, "datetime"),
        );
        c.register(
            TypeKind::Memblock,
            TypeMapping::new("Vec<u8>", "Vec::new()", Binary, "bytes").borrowed("&[u8]"),
        );
        c.register(TypeKind::Uuid, TypeMapping::new("Uuid", "Uuid::nil()", Scalar, "uuid"));
        c.register(TypeKind::Record, TypeMapping::record(NestedRecord));
        c.register(TypeKind::Foreign, TypeMapping::record(ForeignRecord));
        c
    }

    pub fn register(&mut self, kind: TypeKind, mapping: TypeMapping) {
        self.entries.insert(kind, mapping);
    }

    pub fn contains(&self, kind: TypeKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn lookup(&self, kind: TypeKind) -> Result<&TypeMapping> {
        self.lookup_in(kind, "type catalog")
    }

    /// Like [`lookup`](Self::lookup), with the owner named in the error.
    pub fn lookup_in(&self, kind: TypeKind, context: &str) -> Result<&TypeMapping> {
        self.entries.get(&kind).ok_or_else(|| GenError::UnknownType {
            kind: kind.to_string(),
            context: context.to_string(),
        })
    }
}
