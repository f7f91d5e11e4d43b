//! Record artifact: one struct per IR struct, plus its `List` companion.

use stubgen_ir::Struct;

use crate::catalog::Category;
use crate::code_writer::CodeWriter;
use crate::context::{GenContext, Owner, Slot, StreamVar, Wire};
use crate::dav::emit_rule_cache;
use crate::error::Result;
use crate::{Codegen, GeneratedCode};

const W: StreamVar<'static> = StreamVar {
    call: "w",
    pass: "w",
};
const R: StreamVar<'static> = StreamVar {
    call: "r",
    pass: "r",
};

/// Text members are cut to this many characters in `Debug` output.
const DEBUG_TEXT_WIDTH: usize = 32;

pub struct RecordGenerator<'s> {
    def: &'s Struct,
}

/// Everything the emitters need to know about one member.
struct Member<'s> {
    ident: String,
    tag: &'s str,
    wire: Wire<'s>,
    context: String,
    ty: String,
    default: String,
    category: Category,
    delegates: bool,
    by_ref: bool,
    descr: Option<&'s str>,
}

impl<'s> RecordGenerator<'s> {
    pub fn new(def: &'s Struct) -> Self {
        Self { def }
    }

    fn members(&self, ctx: &GenContext<'_>) -> Result<Vec<Member<'s>>> {
        let owner = Owner::Struct(&self.def.name);
        self.def
            .fields
            .iter()
            .map(|field| -> Result<Member<'s>> {
                let context = owner.field(&field.name);
                let wire = Wire::of(field);
                let mapping = ctx.mapping(&field.ty, &context)?;
                Ok(Member {
                    ident: ctx.member(&field.name),
                    tag: &field.name,
                    wire,
                    ty: ctx.rust_type(wire, &context)?,
                    default: ctx.default_expr(wire, &context)?,
                    category: mapping.category,
                    delegates: ctx.delegates(wire, &context)?,
                    by_ref: mapping.by_ref,
                    descr: field.descr.as_deref(),
                    context,
                })
            })
            .collect()
    }

    fn emit_struct(&self, w: &mut CodeWriter, name: &str, members: &[Member<'_>]) -> Result<()> {
        if let Some(descr) = &self.def.descr {
            w.doc(descr)?;
        }
        w.line("#[derive(Clone, PartialEq)]")?;
        w.block(&format!("pub struct {name}"), |w| {
            for m in members {
                if let Some(descr) = m.descr {
                    w.doc(descr)?;
                }
                writeln!(w, "pub {}: {},", m.ident, m.ty)?;
            }
            Ok(())
        })?;
        w.blank_line()?;

        w.block(&format!("impl {name}"), |w| {
            w.block("pub fn new() -> Self", |w| {
                w.block("Self", |w| {
                    for m in members {
                        writeln!(w, "{}: {},", m.ident, m.default)?;
                    }
                    Ok(())
                })
            })?;
            w.blank_line()?;
            w.doc("Resets every member to its default.")?;
            w.block("pub fn clear(&mut self)", |w| {
                for m in members {
                    if m.delegates || m.by_ref {
                        writeln!(w, "self.{}.clear();", m.ident)?;
                    } else {
                        writeln!(w, "self.{} = {};", m.ident, m.default)?;
                    }
                }
                Ok(())
            })
        })?;
        w.blank_line()?;

        w.block(&format!("impl Default for {name}"), |w| {
            w.block("fn default() -> Self", |w| {
                w.line("Self::new()")?;
                Ok(())
            })
        })?;
        Ok(())
    }

    fn emit_serializable(
        &self,
        ctx: &GenContext<'_>,
        w: &mut CodeWriter,
        name: &str,
        members: &[Member<'_>],
    ) -> Result<()> {
        w.block(&format!("impl Serializable for {name}"), |w| {
            w.block(
                "fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError>",
                |w| {
                    writeln!(w, "let name = name.unwrap_or(\"{name}\");")?;
                    w.line("w.write_start(name)?;")?;
                    for m in members {
                        let stmt = ctx.write_stmt(W, m.tag, Slot::Member(&m.ident), m.wire, &m.context)?;
                        w.line(&stmt)?;
                    }
                    w.line("w.write_end(name)")?;
                    Ok(())
                },
            )?;
            w.blank_line()?;
            w.block(
                "fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError>",
                |w| {
                    writeln!(w, "let name = name.unwrap_or(\"{name}\");")?;
                    w.line("r.read_start(name)?;")?;
                    for m in members {
                        for stmt in ctx.read_stmts(R, m.tag, Slot::Member(&m.ident), m.wire, &m.context)? {
                            w.line(&stmt)?;
                        }
                    }
                    w.line("r.read_end(name)")?;
                    Ok(())
                },
            )
        })
    }

    fn emit_debug(&self, w: &mut CodeWriter, name: &str, members: &[Member<'_>]) -> Result<()> {
        w.block(&format!("impl fmt::Debug for {name}"), |w| {
            w.block("fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result", |w| {
                writeln!(w, "write!(f, \"<{name} [\")?;")?;
                for (i, m) in members.iter().enumerate() {
                    let sep = if i == 0 { "" } else { ", " };
                    let (spec, arg) = debug_field(m);
                    writeln!(w, "write!(f, \"{sep}{}:{spec}\", {arg})?;", m.tag)?;
                }
                w.line("write!(f, \"]>\")")?;
                Ok(())
            })
        })
    }

    fn emit_list(&self, w: &mut CodeWriter, name: &str) -> Result<()> {
        let list = format!("{name}List");
        w.doc(&format!("Ordered collection of [`{name}`]."))?;
        w.line("#[derive(Clone, Debug, Default, PartialEq)]")?;
        writeln!(w, "pub struct {list}(pub Vec<{name}>);")?;
        w.blank_line()?;

        w.block(&format!("impl {list}"), |w| {
            w.block("pub fn new() -> Self", |w| {
                w.line("Self(Vec::new())")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("pub fn clear(&mut self)", |w| {
                w.line("self.0.clear();")?;
                Ok(())
            })
        })?;
        w.blank_line()?;

        w.block(&format!("impl std::ops::Deref for {list}"), |w| {
            writeln!(w, "type Target = Vec<{name}>;")?;
            w.blank_line()?;
            w.block("fn deref(&self) -> &Self::Target", |w| {
                w.line("&self.0")?;
                Ok(())
            })
        })?;
        w.blank_line()?;

        w.block(&format!("impl std::ops::DerefMut for {list}"), |w| {
            w.block("fn deref_mut(&mut self) -> &mut Self::Target", |w| {
                w.line("&mut self.0")?;
                Ok(())
            })
        })?;
        w.blank_line()?;

        w.block(&format!("impl Serializable for {list}"), |w| {
            w.block(
                "fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError>",
                |w| {
                    writeln!(w, "let name = name.unwrap_or(\"{list}\");")?;
                    w.line("w.write_start_list(name, self.0.len())?;")?;
                    w.block("for item in &self.0", |w| {
                        w.line("item.serialize(w, None)?;")?;
                        Ok(())
                    })?;
                    w.line("w.write_end(name)")?;
                    Ok(())
                },
            )?;
            w.blank_line()?;
            w.block(
                "fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError>",
                |w| {
                    writeln!(w, "let name = name.unwrap_or(\"{list}\");")?;
                    w.line("let count = r.read_start_list(name)?;")?;
                    w.line("self.0.clear();")?;
                    w.block("for _ in 0..count", |w| {
                        writeln!(w, "let mut item = {name}::new();")?;
                        w.line("item.deserialize(r, None)?;")?;
                        w.line("self.0.push(item);")?;
                        Ok(())
                    })?;
                    w.line("r.read_end(name)")?;
                    Ok(())
                },
            )
        })?;
        w.blank_line()?;

        w.block(&format!("impl Validate for {list}"), |w| {
            w.block("fn cache_davs(dvc: &mut DavCache)", |w| {
                writeln!(w, "{name}::cache_davs(dvc);")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block("fn cache_davs_for(dvc: &mut DavCache, mode: DavMode)", |w| {
                writeln!(w, "{name}::cache_davs_for(dvc, mode);")?;
                Ok(())
            })?;
            w.blank_line()?;
            w.block(
                "fn validate_davs(&self, dvc: &DavCache) -> Result<(), DavError>",
                |w| {
                    w.block("for item in &self.0", |w| {
                        w.line("item.validate_davs(dvc)?;")?;
                        Ok(())
                    })?;
                    w.line("Ok(())")?;
                    Ok(())
                },
            )
        })
    }
}

/// Format spec and argument of one member in `Debug` output.
fn debug_field(m: &Member<'_>) -> (String, String) {
    let access = format!("self.{}", m.ident);
    if m.wire.is_array || m.category.is_record() {
        return ("{:?}".to_string(), access);
    }
    match m.category {
        Category::Text => (format!("{{:.{DEBUG_TEXT_WIDTH}}}"), access),
        Category::Binary => ("<{} bytes>".to_string(), format!("{access}.len()")),
        _ => ("{}".to_string(), access),
    }
}

impl Codegen for RecordGenerator<'_> {
    fn generate(&self, ctx: &GenContext<'_>) -> Result<GeneratedCode> {
        let owner = Owner::Struct(&self.def.name);
        let name = ctx.record_name(&self.def.name, &owner.to_string())?;
        let members = self.members(ctx)?;

        let mut w = CodeWriter::new();
        self.emit_struct(&mut w, &name, &members)?;
        w.blank_line()?;
        self.emit_serializable(ctx, &mut w, &name, &members)?;
        w.blank_line()?;
        w.write_str(&emit_rule_cache(ctx, self.def)?);
        w.blank_line()?;
        self.emit_debug(&mut w, &name, &members)?;
        w.blank_line()?;
        self.emit_list(&mut w, &name)?;

        tracing::debug!("record {} -> {} ({} fields)", self.def.name, name, members.len());
        Ok(GeneratedCode::single(ctx.unit(&self.def.name, &w.finish())))
    }

    fn name(&self) -> &str {
        "record"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenError, GenInfo, Options, TypeCatalog};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use stubgen_ir::{DavKey, Field, FieldType, Project};

    fn project() -> Project {
        let mut project = Project {
            name: "Orders".into(),
            struct_order: vec!["Address".into(), "Order".into()],
            ..Default::default()
        };
        project.structs.insert(
            "Address".into(),
            Struct {
                name: "Address".into(),
                descr: None,
                fields: vec![Field::new("city", FieldType::String)],
            },
        );
        project.structs.insert(
            "Order".into(),
            Struct {
                name: "Order".into(),
                descr: Some("A customer order.".into()),
                fields: vec![
                    Field::new("id", FieldType::Int32).dav(DavKey::Min, json!(1)),
                    Field::new("label", FieldType::String),
                    Field::new("amount", FieldType::Double),
                    Field::new("shipTo", FieldType::Record("Address".into())),
                    Field::new("tags", FieldType::String).array(),
                    Field::new("scan", FieldType::Memblock),
                ],
            },
        );
        project
    }

    fn generate(project: &Project, name: &str) -> Result<String> {
        let catalog = TypeCatalog::rust();
        let options = Options::default();
        let info = GenInfo::fixed("2026-01-01 00:00:00 UTC");
        let ctx = GenContext::new(project, &catalog, &options, &info)?;
        let def = &project.structs[name];
        let code = RecordGenerator::new(def).generate(&ctx)?;
        Ok(code.files[0].content.clone())
    }

    fn section<'a>(content: &'a str, start: &str) -> &'a str {
        let from = content.find(start).unwrap();
        let rest = &content[from..];
        let end = rest.find("\n}\n").unwrap();
        &rest[..end + 3]
    }

    #[test]
    fn struct_and_defaults() {
        let project = project();
        let content = generate(&project, "Order").unwrap();
        assert_eq!(
            section(&content, "/// A customer order."),
            r#"/// A customer order.
#[derive(Clone, PartialEq)]
pub struct Order {
    pub id: i32,
    pub label: String,
    pub amount: f64,
    pub ship_to: Address,
    pub tags: Vec<String>,
    pub scan: Vec<u8>,
}
"#
        );
        assert!(content.contains(
            "        Self {
            id: 0,
            label: String::new(),
            amount: 0.0,
            ship_to: Address::new(),
            tags: Vec::<String>::new(),
            scan: Vec::new(),
        }"
        ));
        assert!(content.contains("        self.id = 0;\n        self.label.clear();\n"));
        assert!(content.contains("        self.ship_to.clear();\n        self.tags.clear();\n"));
    }

    #[test]
    fn serializable_keeps_field_order() {
        let project = project();
        let content = generate(&project, "Order").unwrap();
        assert_eq!(
            section(&content, "impl Serializable for Order "),
            r#"impl Serializable for Order {
    fn serialize(&self, w: &mut dyn Writer, name: Option<&str>) -> Result<(), StreamError> {
        let name = name.unwrap_or("Order");
        w.write_start(name)?;
        w.write_i32("id", self.id)?;
        w.write_string("label", &self.label)?;
        w.write_f64("amount", self.amount)?;
        self.ship_to.serialize(w, Some("shipTo"))?;
        self.tags.serialize(w, Some("tags"))?;
        w.write_bytes("scan", &self.scan)?;
        w.write_end(name)
    }

    fn deserialize(&mut self, r: &mut dyn Reader, name: Option<&str>) -> Result<(), StreamError> {
        let name = name.unwrap_or("Order");
        r.read_start(name)?;
        self.id = r.read_i32("id")?;
        self.label = r.read_string("label")?;
        self.amount = r.read_f64("amount")?;
        self.ship_to.deserialize(r, Some("shipTo"))?;
        self.tags.deserialize(r, Some("tags"))?;
        self.scan = r.read_bytes("scan")?;
        r.read_end(name)
    }
}
"#
        );
    }

    #[test]
    fn debug_and_validate() {
        let project = project();
        let content = generate(&project, "Order").unwrap();
        assert!(content.contains("write!(f, \"<Order [\")?;"));
        assert!(content.contains("write!(f, \", label:{:.32}\", self.label)?;"));
        assert!(content.contains("write!(f, \", scan:<{} bytes>\", self.scan.len())?;"));
        assert!(content.contains("dvc.add_rule(\"id\", Dav::new(DavKind::Min, DavValue::Int(1)));"));
        assert!(content.contains("dvc.validate(\"id\", &self.id)?;"));
        assert!(content.contains("dvc.validate_object(\"ship_to\", &self.ship_to)?;"));
        assert!(content.contains("dvc.validate(\"label\", &self.label)?;"));
    }

    #[test]
    fn list_companion() {
        let project = project();
        let content = generate(&project, "Address").unwrap();
        assert!(content.contains("pub struct AddressList(pub Vec<Address>);"));
        assert!(content.contains("let name = name.unwrap_or(\"AddressList\");"));
        assert!(content.contains("w.write_start_list(name, self.0.len())?;"));
        assert!(content.contains("        Address::cache_davs(dvc);"));
        // no rules on Address: the rule cache takes an unused parameter
        assert!(content.contains("fn cache_davs(_dvc: &mut DavCache)"));
        assert!(content.contains("        Address::cache_davs_for(dvc, mode);"));
    }

    #[test]
    fn keyword_members_are_raw() {
        let mut project = project();
        project.structs.insert(
            "Ticket".into(),
            Struct {
                name: "Ticket".into(),
                descr: None,
                fields: vec![
                    Field::new("type", FieldType::String).dav(DavKey::Null, json!(false)),
                    Field::new("ref", FieldType::Int32),
                    Field::new("self", FieldType::Bool),
                ],
            },
        );
        let content = generate(&project, "Ticket").unwrap();
        for line in [
            "    pub r#type: String,",
            "    pub r#ref: i32,",
            "    pub self_: bool,",
            "        w.write_string(\"type\", &self.r#type)?;",
            "        self.r#ref = r.read_i32(\"ref\")?;",
            "        dvc.add_rule(\"type\", Dav::new(DavKind::NotNull, DavValue::None));",
            "        dvc.validate(\"type\", &self.r#type)?;",
            "        write!(f, \", ref:{}\", self.r#ref)?;",
        ] {
            assert!(content.contains(line), "missing {line}");
        }
    }

    #[test]
    fn unknown_nested_struct() {
        let mut project = project();
        project.structs.get_mut("Order").unwrap().fields.push(Field::new(
            "customer",
            FieldType::Record("Customer".into()),
        ));
        let err = generate(&project, "Order").unwrap_err();
        assert!(matches!(err, GenError::ReferenceNotFound { .. }));
        assert!(err.to_string().contains("struct Order, field customer"));
    }
}
