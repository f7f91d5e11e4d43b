//! Couplet artifact: a unit struct carrying key/value constants.

use std::collections::BTreeSet;

use stubgen_ir::{Couplet, TypeKind};

use crate::code_writer::CodeWriter;
use crate::context::{GenContext, Owner};
use crate::error::{GenError, Result};
use crate::ident::{Casing, IdentClass};
use crate::{Codegen, GeneratedCode};

pub struct CoupletGenerator<'c> {
    couplet: &'c Couplet,
}

impl<'c> CoupletGenerator<'c> {
    pub fn new(couplet: &'c Couplet) -> Self {
        Self { couplet }
    }
}

impl Codegen for CoupletGenerator<'_> {
    fn generate(&self, ctx: &GenContext<'_>) -> Result<GeneratedCode> {
        let c = self.couplet;
        let owner = Owner::Couplet(&c.name);
        if c.entries.is_empty() {
            return Err(GenError::InvalidModel {
                context: owner.to_string(),
                reason: "couplet has no entries".to_string(),
            });
        }

        let key = KeyType::of(c)?;
        let name = ctx.ident(IdentClass::Couplet, &c.name);

        let mut consts = Vec::with_capacity(c.entries.len());
        let mut seen = BTreeSet::new();
        for entry in &c.entries {
            let stem = const_stem(&entry.value);
            let key_const = Casing::Constant.apply(&format!("key_{stem}"));
            if !seen.insert(key_const.clone()) {
                return Err(GenError::InvalidModel {
                    context: owner.to_string(),
                    reason: format!("value '{}' repeats constant {key_const}", entry.value),
                });
            }
            let literal = key.literal(&entry.key).ok_or_else(|| GenError::TypeMismatch {
                reference: entry.key.clone(),
                context: owner.to_string(),
                expected: c.ty.kind().to_string(),
                found: "unparseable key".to_string(),
            })?;
            consts.push(Constant {
                key: key_const,
                value: Casing::Constant.apply(&format!("value_{stem}")),
                literal,
                text: &entry.value,
            });
        }

        let mut w = CodeWriter::new();
        w.doc(&format!("Couplet `{}`.", c.name))?;
        w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]")?;
        writeln!(w, "pub struct {name};")?;
        w.blank_line()?;
        w.block(&format!("impl {name}"), |w| {
            for k in &consts {
                writeln!(w, "pub const {}: {} = {};", k.key, key.const_type, k.literal)?;
                writeln!(w, "pub const {}: &'static str = {:?};", k.value, k.text)?;
            }
            w.blank_line()?;

            let keys: Vec<String> = consts.iter().map(|k| format!("Self::{}", k.key)).collect();
            writeln!(
                w,
                "pub const KEYS: [{}; {}] = [{}];",
                key.const_type,
                keys.len(),
                keys.join(", ")
            )?;
            w.blank_line()?;

            w.doc("Value of `key`, or `\"\"` when the key is unknown.")?;
            w.block(
                &format!("pub fn get_value(key: {}) -> &'static str", key.param_type),
                |w| {
                    w.block("match key", |w| {
                        for k in &consts {
                            writeln!(w, "{} => Self::{},", k.literal, k.value)?;
                        }
                        w.line("_ => \"\",")?;
                        Ok(())
                    })
                },
            )
        })?;

        tracing::debug!("couplet {} -> {}", c.name, name);
        Ok(GeneratedCode::single(ctx.unit(&c.name, &w.finish())))
    }

    fn name(&self) -> &str {
        "couplet"
    }
}

struct Constant<'e> {
    key: String,
    value: String,
    literal: String,
    text: &'e str,
}

/// Constant name stem of a couplet value.
fn const_stem(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

struct KeyType {
    kind: TypeKind,
    const_type: &'static str,
    param_type: &'static str,
}

impl KeyType {
    fn of(c: &Couplet) -> Result<Self> {
        let kind = c.ty.kind();
        let (const_type, param_type) = match kind {
            TypeKind::String | TypeKind::Json => ("&'static str", "&str"),
            TypeKind::Char => ("char", "char"),
            TypeKind::Bool => ("bool", "bool"),
            TypeKind::Int8 => ("i8", "i8"),
            TypeKind::Int16 => ("i16", "i16"),
            TypeKind::Int32 => ("i32", "i32"),
            TypeKind::Int64 => ("i64", "i64"),
            TypeKind::UInt8 => ("u8", "u8"),
            TypeKind::UInt16 => ("u16", "u16"),
            TypeKind::UInt32 => ("u32", "u32"),
            TypeKind::UInt64 => ("u64", "u64"),
            other => {
                return Err(GenError::TypeMismatch {
                    reference: c.name.clone(),
                    context: Owner::Couplet(&c.name).to_string(),
                    expected: "integer, bool, char or string".to_string(),
                    found: other.to_string(),
                })
            }
        };
        Ok(Self {
            kind,
            const_type,
            param_type,
        })
    }

    /// Rust literal of `key`, if it parses as the backing type.
    fn literal(&self, key: &str) -> Option<String> {
        match self.kind {
            TypeKind::String | TypeKind::Json => Some(format!("{key:?}")),
            TypeKind::Char => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(format!("{c:?}")),
                    _ => None,
                }
            }
            TypeKind::Bool => key.parse::<bool>().ok().map(|b| b.to_string()),
            TypeKind::Int8 => key.parse::<i8>().ok().map(|v| v.to_string()),
            TypeKind::Int16 => key.parse::<i16>().ok().map(|v| v.to_string()),
            TypeKind::Int32 => key.parse::<i32>().ok().map(|v| v.to_string()),
            TypeKind::Int64 => key.parse::<i64>().ok().map(|v| v.to_string()),
            TypeKind::UInt8 => key.parse::<u8>().ok().map(|v| v.to_string()),
            TypeKind::UInt16 => key.parse::<u16>().ok().map(|v| v.to_string()),
            TypeKind::UInt32 => key.parse::<u32>().ok().map(|v| v.to_string()),
            TypeKind::UInt64 => key.parse::<u64>().ok().map(|v| v.to_string()),
            _ => None,
        }
    }
}
