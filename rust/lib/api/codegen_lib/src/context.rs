//! Shared state of one generation run and the type/stream helpers every
//! emitter goes through.

use std::fmt;

use stubgen_ir::{FieldType, IoKind, Project};

use crate::catalog::{TypeCatalog, TypeMapping};
use crate::error::{GenError, Result};
use crate::ident::{unraw, IdentClass, IdentPolicy};
use crate::options::Options;
use crate::{GenInfo, GeneratedFile};

/// What a field belongs to, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner<'a> {
    Struct(&'a str),
    Call(&'a str),
    Couplet(&'a str),
}

impl fmt::Display for Owner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Struct(name) => write!(f, "struct {name}"),
            Owner::Call(name) => write!(f, "call {name}"),
            Owner::Couplet(name) => write!(f, "couplet {name}"),
        }
    }
}

impl Owner<'_> {
    pub fn field(&self, field: &str) -> String {
        format!("{self}, field {field}")
    }
}

/// Where generated code reads or writes a value.
#[derive(Debug, Clone, Copy)]
pub enum Slot<'s> {
    /// `self.<member>` inside a record impl.
    Member(&'s str),
    /// An input parameter: `Copy` by value, anything else borrowed.
    Param(&'s str),
    /// A `&mut` output parameter.
    RefParam(&'s str),
    /// An owned local, declared on read.
    Local(&'s str),
    /// An owned local declared `mut` on read (bound back later).
    LocalMut(&'s str),
}

/// Writer or reader variable of the generated code.
#[derive(Debug, Clone, Copy)]
pub struct StreamVar<'s> {
    /// Receiver of typed calls (`w`, `_w`).
    pub call: &'s str,
    /// Argument handed to nested `serialize`/`deserialize` (`w`, `&mut _w`).
    pub pass: &'s str,
}

/// Type of a value travelling on the wire: a field or a return value.
#[derive(Debug, Clone, Copy)]
pub struct Wire<'t> {
    pub ty: &'t FieldType,
    pub is_array: bool,
}

impl<'t> Wire<'t> {
    pub fn of(field: &'t stubgen_ir::Field) -> Self {
        Self {
            ty: &field.ty,
            is_array: field.is_array,
        }
    }

    pub fn of_return(ret: &'t stubgen_ir::ReturnDef) -> Self {
        Self {
            ty: &ret.ty,
            is_array: ret.is_array,
        }
    }
}

pub struct GenContext<'a> {
    pub project: &'a Project,
    pub catalog: &'a TypeCatalog,
    pub options: &'a Options,
    pub info: &'a GenInfo,
    pub idents: IdentPolicy,
}

impl<'a> GenContext<'a> {
    pub fn new(
        project: &'a Project,
        catalog: &'a TypeCatalog,
        options: &'a Options,
        info: &'a GenInfo,
    ) -> Result<Self> {
        Ok(Self {
            project,
            catalog,
            options,
            info,
            idents: options.ident_policy()?,
        })
    }

    pub fn ident(&self, class: IdentClass, raw: &str) -> String {
        self.idents.resolve(class, raw)
    }

    pub fn member(&self, raw: &str) -> String {
        self.ident(IdentClass::Member, raw)
    }

    pub fn method(&self, raw: &str) -> String {
        self.ident(IdentClass::Method, raw)
    }

    /// Rule-cache target of member `raw`: its identifier without `r#`.
    pub fn target(&self, raw: &str) -> String {
        unraw(&self.member(raw)).to_string()
    }

    /// Crate path of the runtime library.
    pub fn rt(&self) -> &str {
        &self.options.runtime
    }

    pub fn mapping(&self, ty: &FieldType, context: &str) -> Result<&TypeMapping> {
        self.catalog.lookup_in(ty.kind(), context)
    }

    /// Name of the generated record for struct `name`.
    pub fn record_name(&self, name: &str, context: &str) -> Result<String> {
        self.project
            .struct_def(name)
            .ok_or_else(|| GenError::ReferenceNotFound {
                reference: name.to_string(),
                context: context.to_string(),
                missing: "struct".to_string(),
            })?;
        Ok(self.ident(IdentClass::Record, name))
    }

    /// Path of the record type of a `project.table` reference.
    pub fn foreign_path(&self, reference: &str, context: &str) -> Result<String> {
        let (db, table) =
            self.project
                .table(reference)
                .ok_or_else(|| GenError::ReferenceNotFound {
                    reference: reference.to_string(),
                    context: context.to_string(),
                    missing: "database table".to_string(),
                })?;
        Ok(format!("{}::{}", db.module, table.struct_name))
    }

    /// Element type, ignoring `is_array`.
    pub fn base_type(&self, ty: &FieldType, context: &str) -> Result<String> {
        let mapping = self.mapping(ty, context)?;
        match ty {
            FieldType::Record(name) => self.record_name(name, context),
            FieldType::Foreign(reference) => self.foreign_path(reference, context),
            _ => Ok(mapping.target_type.clone()),
        }
    }

    pub fn rust_type(&self, wire: Wire<'_>, context: &str) -> Result<String> {
        let base = self.base_type(wire.ty, context)?;
        Ok(match (wire.is_array, wire.ty.is_record()) {
            (false, _) => base,
            (true, true) => format!("{base}List"),
            (true, false) => format!("Vec<{base}>"),
        })
    }

    pub fn default_expr(&self, wire: Wire<'_>, context: &str) -> Result<String> {
        let mapping = self.mapping(wire.ty, context)?;
        if wire.is_array || mapping.category.is_record() {
            return Ok(format!("{}::new()", self.type_path(wire, context)?));
        }
        Ok(mapping.default_literal.clone())
    }

    /// Type in expression position (`Vec::<u8>::new()`, not `Vec<u8>::new()`).
    fn type_path(&self, wire: Wire<'_>, context: &str) -> Result<String> {
        let ty = self.rust_type(wire, context)?;
        Ok(match ty.split_once('<') {
            Some((head, tail)) => format!("{head}::<{tail}"),
            None => ty,
        })
    }

    /// Whether the value delegates to its own `serialize`/`deserialize`.
    pub fn delegates(&self, wire: Wire<'_>, context: &str) -> Result<bool> {
        Ok(wire.is_array || self.mapping(wire.ty, context)?.category.is_record())
    }

    /// Parameter type in a call signature.
    pub fn param_type(&self, wire: Wire<'_>, io: IoKind, context: &str) -> Result<String> {
        let ty = self.rust_type(wire, context)?;
        if io.is_output() {
            return Ok(format!("&mut {ty}"));
        }
        if self.delegates(wire, context)? {
            return Ok(format!("&{ty}"));
        }
        Ok(self.mapping(wire.ty, context)?.param_type.clone())
    }

    /// Argument expression handing the local `name` to an implementation.
    pub fn call_arg(&self, wire: Wire<'_>, io: IoKind, name: &str, context: &str) -> Result<String> {
        if io.is_output() {
            return Ok(format!("&mut {name}"));
        }
        if self.delegates(wire, context)? || self.mapping(wire.ty, context)?.by_ref {
            return Ok(format!("&{name}"));
        }
        Ok(name.to_string())
    }

    /// One statement writing `slot` under `tag`.
    pub fn write_stmt(
        &self,
        w: StreamVar<'_>,
        tag: &str,
        slot: Slot<'_>,
        wire: Wire<'_>,
        context: &str,
    ) -> Result<String> {
        if self.delegates(wire, context)? {
            let access = match slot {
                Slot::Member(m) => format!("self.{m}"),
                Slot::Param(m) | Slot::RefParam(m) | Slot::Local(m) | Slot::LocalMut(m) => {
                    m.to_string()
                }
            };
            return Ok(format!("{access}.serialize({}, Some(\"{tag}\"))?;", w.pass));
        }

        let mapping = self.mapping(wire.ty, context)?;
        let value = match (slot, mapping.by_ref) {
            (Slot::Member(m), true) => format!("&self.{m}"),
            (Slot::Member(m), false) => format!("self.{m}"),
            (Slot::Param(m), _) => m.to_string(),
            (Slot::RefParam(m), true) => format!("&*{m}"),
            (Slot::RefParam(m), false) => format!("*{m}"),
            (Slot::Local(m) | Slot::LocalMut(m), true) => format!("&{m}"),
            (Slot::Local(m) | Slot::LocalMut(m), false) => m.to_string(),
        };
        Ok(format!("{}.write_{}(\"{tag}\", {value})?;", w.call, mapping.wire))
    }

    /// Statements reading `tag` into `slot`. Locals are declared here.
    pub fn read_stmts(
        &self,
        r: StreamVar<'_>,
        tag: &str,
        slot: Slot<'_>,
        wire: Wire<'_>,
        context: &str,
    ) -> Result<Vec<String>> {
        if self.delegates(wire, context)? {
            let call = |target: &str| format!("{target}.deserialize({}, Some(\"{tag}\"))?;", r.pass);
            return Ok(match slot {
                Slot::Member(m) => vec![call(&format!("self.{m}"))],
                Slot::RefParam(m) => vec![format!("{m}.clear();"), call(m)],
                Slot::Local(m) | Slot::LocalMut(m) | Slot::Param(m) => vec![
                    format!("let mut {m} = {};", self.default_expr(wire, context)?),
                    call(m),
                ],
            });
        }

        let mapping = self.mapping(wire.ty, context)?;
        let read = format!("{}.read_{}(\"{tag}\")?;", r.call, mapping.wire);
        Ok(vec![match slot {
            Slot::Member(m) => format!("self.{m} = {read}"),
            Slot::RefParam(m) => format!("*{m} = {read}"),
            Slot::Local(m) | Slot::Param(m) => format!("let {m} = {read}"),
            Slot::LocalMut(m) => format!("let mut {m} = {read}"),
        }])
    }

    /// File for one generated unit named `raw` (before file casing).
    pub fn unit(&self, raw: &str, body: &str) -> GeneratedFile {
        let module = self.ident(IdentClass::File, raw);
        let mut content = self.info.banner();
        content.push_str("#![allow(unused_imports)]\n\n");
        content.push_str(&format!("use {}::prelude::*;\n\n", self.rt()));
        content.push_str(&format!("use {}::*;\n\n", self.options.namespace));
        content.push_str(body);
        GeneratedFile {
            path: format!("{}.rs", unraw(&module)),
            module,
            content,
        }
    }
}
