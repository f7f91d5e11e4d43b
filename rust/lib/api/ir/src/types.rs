//! Field kinds and call-parameter direction shared by every IR layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The declared type of a field.
///
/// Primitive kinds serialize as bare strings (`"int32"`); references to
/// other records serialize as single-key objects (`{"record": "Address"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Double,
    String,
    /// JSON document carried as text.
    Json,
    Date,
    Time,
    DateTime,
    /// Opaque binary blob.
    Memblock,
    Uuid,
    /// Another struct of the same project, by name.
    Record(String),
    /// A table of a sibling database project, as `project.table`.
    Foreign(String),
}

impl FieldType {
    /// The payload-free kind used as the type catalog key.
    pub fn kind(&self) -> TypeKind {
        match self {
            FieldType::Bool => TypeKind::Bool,
            FieldType::Char => TypeKind::Char,
            FieldType::Int8 => TypeKind::Int8,
            FieldType::Int16 => TypeKind::Int16,
            FieldType::Int32 => TypeKind::Int32,
            FieldType::Int64 => TypeKind::Int64,
            FieldType::UInt8 => TypeKind::UInt8,
            FieldType::UInt16 => TypeKind::UInt16,
            FieldType::UInt32 => TypeKind::UInt32,
            FieldType::UInt64 => TypeKind::UInt64,
            FieldType::Double => TypeKind::Double,
            FieldType::String => TypeKind::String,
            FieldType::Json => TypeKind::Json,
            FieldType::Date => TypeKind::Date,
            FieldType::Time => TypeKind::Time,
            FieldType::DateTime => TypeKind::DateTime,
            FieldType::Memblock => TypeKind::Memblock,
            FieldType::Uuid => TypeKind::Uuid,
            FieldType::Record(_) => TypeKind::Record,
            FieldType::Foreign(_) => TypeKind::Foreign,
        }
    }

    /// Returns the referenced struct or table for record kinds.
    pub fn reference(&self) -> Option<&str> {
        match self {
            FieldType::Record(name) | FieldType::Foreign(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true for `record(..)` and `foreign(..)`.
    pub fn is_record(&self) -> bool {
        self.reference().is_some()
    }
}

/// Payload-free projection of [`FieldType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Double,
    String,
    Json,
    Date,
    Time,
    DateTime,
    Memblock,
    Uuid,
    Record,
    Foreign,
}

impl TypeKind {
    pub const ALL: [TypeKind; 20] = [
        TypeKind::Bool,
        TypeKind::Char,
        TypeKind::Int8,
        TypeKind::Int16,
        TypeKind::Int32,
        TypeKind::Int64,
        TypeKind::UInt8,
        TypeKind::UInt16,
        TypeKind::UInt32,
        TypeKind::UInt64,
        TypeKind::Double,
        TypeKind::String,
        TypeKind::Json,
        TypeKind::Date,
        TypeKind::Time,
        TypeKind::DateTime,
        TypeKind::Memblock,
        TypeKind::Uuid,
        TypeKind::Record,
        TypeKind::Foreign,
    ];

    /// IR spelling of the kind (`int32`, `datetime`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::Char => "char",
            TypeKind::Int8 => "int8",
            TypeKind::Int16 => "int16",
            TypeKind::Int32 => "int32",
            TypeKind::Int64 => "int64",
            TypeKind::UInt8 => "uint8",
            TypeKind::UInt16 => "uint16",
            TypeKind::UInt32 => "uint32",
            TypeKind::UInt64 => "uint64",
            TypeKind::Double => "double",
            TypeKind::String => "string",
            TypeKind::Json => "json",
            TypeKind::Date => "date",
            TypeKind::Time => "time",
            TypeKind::DateTime => "datetime",
            TypeKind::Memblock => "memblock",
            TypeKind::Uuid => "uuid",
            TypeKind::Record => "record",
            TypeKind::Foreign => "foreign",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeKind::Int8
                | TypeKind::Int16
                | TypeKind::Int32
                | TypeKind::Int64
                | TypeKind::UInt8
                | TypeKind::UInt16
                | TypeKind::UInt32
                | TypeKind::UInt64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            TypeKind::UInt8 | TypeKind::UInt16 | TypeKind::UInt32 | TypeKind::UInt64
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a call parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoKind {
    /// Sent by the client only.
    In,
    /// Returned by the server only.
    Out,
    /// Sent, then bound back from the response.
    InOut,
}

impl IoKind {
    pub fn is_input(&self) -> bool {
        matches!(self, IoKind::In | IoKind::InOut)
    }

    pub fn is_output(&self) -> bool {
        matches!(self, IoKind::Out | IoKind::InOut)
    }
}
