//! Model IR: structs, enumerations (couplets) and remote calls.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dav::{DavTarget, ResolvedDav};
use crate::types::{FieldType, IoKind};

/// A field of a struct, or a parameter of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as declared; also the wire tag.
    pub name: String,

    #[serde(rename = "type")]
    pub ty: FieldType,

    /// Ordered collection of `ty`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_array: bool,

    /// Parameter direction. Required on call fields, ignored on struct fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io: Option<IoKind>,

    /// Raw constraint declarations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dav: BTreeMap<DavTarget, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// Resolution memo, filled once by the DAV resolver.
    #[serde(skip)]
    pub resolved: OnceCell<ResolvedDav>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_array: false,
            io: None,
            dav: BTreeMap::new(),
            descr: None,
            resolved: OnceCell::new(),
        }
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn io(mut self, io: IoKind) -> Self {
        self.io = Some(io);
        self
    }

    pub fn dav(mut self, key: impl Into<DavTarget>, value: serde_json::Value) -> Self {
        self.dav.insert(key.into(), value);
        self
    }

    pub fn is_input(&self) -> bool {
        self.io.is_some_and(|io| io.is_input())
    }

    pub fn is_output(&self) -> bool {
        self.io.is_some_and(|io| io.is_output())
    }
}

/// A record definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Struct {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// Declared field order, preserved on the wire.
    pub fields: Vec<Field>,
}

/// The value returned by a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDef {
    #[serde(rename = "type")]
    pub ty: FieldType,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_array: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
}

/// A remote procedure call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,

    /// Unique dispatch token.
    pub signature: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnDef>,

    /// Authorization requirement passed to the server's auth hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl Call {
    /// Any field travelling client to server.
    pub fn has_input(&self) -> bool {
        self.fields.iter().any(Field::is_input)
    }

    /// Any field travelling server to client, or a return value.
    pub fn has_output(&self) -> bool {
        self.returns.is_some() || self.fields.iter().any(Field::is_output)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_output())
    }
}

/// One `key -> value` pair of a couplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupletEntry {
    pub key: String,
    pub value: String,
}

impl CoupletEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A named enumeration of key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Couplet {
    pub name: String,

    /// Primitive type of the keys.
    #[serde(rename = "type")]
    pub ty: FieldType,

    pub entries: Vec<CoupletEntry>,
}

impl Couplet {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::DavKey;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn get_order() -> Call {
        Call {
            name: "GetOrder".into(),
            signature: "GO1".into(),
            descr: None,
            fields: vec![Field::new("id", FieldType::Int32).io(IoKind::In)],
            returns: Some(ReturnDef {
                ty: FieldType::String,
                is_array: false,
                descr: None,
            }),
            auth: None,
        }
    }

    #[test]
    fn call_direction() {
        let call = get_order();
        assert!(call.has_input());
        assert!(call.has_output());
        assert_eq!(call.inputs().count(), 1);
        assert_eq!(call.outputs().count(), 0);

        let notify = Call {
            returns: None,
            ..get_order()
        };
        assert!(!notify.has_output());
    }

    #[test]
    fn field_json_shape() {
        let field: Field = serde_json::from_value(json!({
            "name": "status",
            "type": "string",
            "io": "inout",
            "dav": {"in": "OrderStatus"}
        }))
        .unwrap();

        assert_eq!(field.ty, FieldType::String);
        assert!(field.is_input() && field.is_output());
        assert_eq!(field.dav.get(&DavTarget::from(DavKey::In)), Some(&json!("OrderStatus")));
        assert!(field.resolved.get().is_none());

        let back = serde_json::to_value(&field).unwrap();
        assert_eq!(
            back,
            json!({"name": "status", "type": "string", "io": "inout", "dav": {"in": "OrderStatus"}})
        );
    }

    #[test]
    fn couplet_lookup() {
        let couplet = Couplet {
            name: "OrderStatus".into(),
            ty: FieldType::String,
            entries: vec![CoupletEntry::new("O", "Open"), CoupletEntry::new("C", "Closed")],
        };
        assert_eq!(couplet.keys().collect::<Vec<_>>(), vec!["O", "C"]);
        assert_eq!(couplet.get_value("C"), Some("Closed"));
        assert_eq!(couplet.get_value("X"), None);
    }
}
