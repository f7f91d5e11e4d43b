//! DAV resolution and rule-cache emission.
//!
//! Resolution turns the raw JSON constraint values of a field into typed
//! rules, following couplet and `db:` references. The result is memoized on
//! the field, so later passes of the same run reuse it.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;
use stubgen_ir::{
    ColumnRef, CoupletEntry, DavCmd, DavKey, Field, FieldType, MemberRule, Project, ResolvedDav,
    Rule, RuleKind, RuleValue, Struct, TypeKind,
};

use crate::code_writer::CodeWriter;
use crate::context::{GenContext, Owner, Wire};
use crate::error::{GenError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DB_PREFIX: &str = "db:";

pub struct DavResolver<'a> {
    project: &'a Project,
}

impl<'a> DavResolver<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// Resolves `field`'s constraints once; later calls return the memo.
    pub fn resolve<'f>(&self, owner: Owner<'_>, field: &'f Field) -> Result<&'f ResolvedDav> {
        if let Some(resolved) = field.resolved.get() {
            return Ok(resolved);
        }
        let resolved = self.resolve_uncached(owner, field)?;
        Ok(field.resolved.get_or_init(|| resolved))
    }

    fn resolve_uncached(&self, owner: Owner<'_>, field: &Field) -> Result<ResolvedDav> {
        let context = owner.field(&field.name);
        let mut resolved = ResolvedDav::default();

        for (target, value) in &field.dav {
            let bad = |reason: &str| GenError::ConstraintParse {
                key: target.to_string(),
                value: value.to_string(),
                context: context.clone(),
                reason: reason.to_string(),
            };

            if target.key == DavKey::Cmds {
                if target.member.is_some() {
                    return Err(bad("cmds cannot target a member"));
                }
                let cmd = value
                    .as_str()
                    .and_then(DavCmd::parse)
                    .ok_or_else(|| bad("expected one of clear, insert, key"))?;
                if cmd != DavCmd::Clear && !matches!(field.ty, FieldType::Foreign(_)) {
                    return Err(bad("insert and key apply to database records only"));
                }
                resolved.cmds = Some(cmd);
                continue;
            }

            if let Some(member) = &target.member {
                let kind = self.member_kind(&field.ty, member, &context).map_err(|e| e.or(&bad))?;
                let add = self
                    .parse_rule(target.key, kind, value, &context)
                    .map_err(|e| e.or(&bad))?;
                if !target.replace && add.is_none() {
                    return Err(bad("nothing to add"));
                }
                resolved.overrides.push(MemberRule {
                    member: member.clone(),
                    remove: target.replace.then(|| rule_kind(target.key)).flatten(),
                    add,
                });
                continue;
            }

            if field.ty.is_record() {
                return Err(bad("only cmds and member rules apply to record fields"));
            }
            let parsed = self
                .parse_rule(target.key, field.ty.kind(), value, &context)
                .map_err(|e| e.or(&bad))?;
            resolved.rules.extend(parsed);
        }
        Ok(resolved)
    }

    /// One rule of `key` on a value of `kind`; `None` for `null: true`.
    fn parse_rule(
        &self,
        key: DavKey,
        kind: TypeKind,
        value: &Value,
        context: &str,
    ) -> std::result::Result<Option<Rule>, RuleError> {
        let shape = |reason: &str| RuleError::Shape(reason.to_string());
        let parsed = match key {
            DavKey::Null => match value.as_bool() {
                Some(false) => Some(rule(RuleKind::NotNull, RuleValue::None)),
                Some(true) => None,
                None => return Err(shape("expected a boolean")),
            },
            DavKey::Min => Some(rule(RuleKind::Min, bound(kind, value).map_err(RuleError::Shape)?)),
            DavKey::Max => Some(rule(RuleKind::Max, bound(kind, value).map_err(RuleError::Shape)?)),
            DavKey::Regex => {
                if !matches!(kind, TypeKind::String | TypeKind::Json) {
                    return Err(shape(&format!("regex does not apply to {kind}")));
                }
                let pattern = value.as_str().ok_or_else(|| shape("expected a string"))?;
                regex::Regex::new(pattern).map_err(|e| shape(&e.to_string()))?;
                Some(rule(RuleKind::Regex, RuleValue::Text(pattern.to_string())))
            }
            DavKey::Func => {
                let name = value
                    .as_str()
                    .filter(|s| is_identifier(s))
                    .ok_or_else(|| shape("expected a function name"))?;
                Some(rule(RuleKind::Func, RuleValue::Text(name.to_string())))
            }
            DavKey::In => Some(rule(RuleKind::In, self.member_set(kind, value, context)?)),
            DavKey::NotIn => Some(rule(RuleKind::NotIn, self.member_set(kind, value, context)?)),
            DavKey::Cmds => return Err(shape("cmds is not a rule")),
        };
        Ok(parsed)
    }

    /// Kind of `member` inside the record a field of type `ty` holds.
    fn member_kind(
        &self,
        ty: &FieldType,
        member: &str,
        context: &str,
    ) -> std::result::Result<TypeKind, RuleError> {
        let not_found = |reference: &str, missing: String| {
            RuleError::Gen(GenError::ReferenceNotFound {
                reference: reference.to_string(),
                context: context.to_string(),
                missing,
            })
        };
        let kind = match ty {
            FieldType::Record(name) => {
                let def = self
                    .project
                    .struct_def(name)
                    .ok_or_else(|| not_found(name, "struct".to_string()))?;
                def.fields
                    .iter()
                    .find(|f| f.name == member)
                    .ok_or_else(|| not_found(member, format!("member of struct {name}")))?
                    .ty
                    .kind()
            }
            FieldType::Foreign(reference) => {
                let (_, table) = self
                    .project
                    .table(reference)
                    .ok_or_else(|| not_found(reference, "database table".to_string()))?;
                table
                    .column(member)
                    .ok_or_else(|| not_found(member, format!("column of table {reference}")))?
                    .ty
            }
            _ => {
                return Err(RuleError::Shape(
                    "member rules apply to record fields only".to_string(),
                ))
            }
        };
        if matches!(kind, TypeKind::Record | TypeKind::Foreign) {
            return Err(RuleError::Shape(format!("member {member} is itself a record")));
        }
        Ok(kind)
    }

    fn member_set(
        &self,
        kind: TypeKind,
        value: &Value,
        context: &str,
    ) -> std::result::Result<RuleValue, RuleError> {
        let keys: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(RuleError::Shape(format!("unsupported set member {v}"))),
                })
                .collect::<std::result::Result<_, _>>()?,
            Value::Object(map) => map.keys().cloned().collect(),
            Value::String(token) => match token.strip_prefix(DB_PREFIX) {
                Some(column) => self.column_keys(kind, column, context)?,
                None => self.couplet_keys(kind, token, context)?,
            },
            _ => return Err(RuleError::Shape("expected a list, a couplet or a db: reference".into())),
        };
        if keys.is_empty() {
            return Err(RuleError::Shape("empty value set".into()));
        }
        typed_set(kind, keys).map_err(RuleError::Shape)
    }

    fn couplet_keys(&self, kind: TypeKind, name: &str, context: &str) -> Result<Vec<String>> {
        let couplet = self
            .project
            .couplet(name)
            .ok_or_else(|| GenError::ReferenceNotFound {
                reference: name.to_string(),
                context: context.to_string(),
                missing: "couplet".to_string(),
            })?;
        if couplet.ty.kind() != kind {
            return Err(GenError::TypeMismatch {
                reference: name.to_string(),
                context: context.to_string(),
                expected: kind.to_string(),
                found: couplet.ty.kind().to_string(),
            });
        }
        Ok(entry_keys(&couplet.entries))
    }

    fn column_keys(&self, kind: TypeKind, token: &str, context: &str) -> Result<Vec<String>> {
        let not_found = |missing: String| GenError::ReferenceNotFound {
            reference: format!("{DB_PREFIX}{token}"),
            context: context.to_string(),
            missing,
        };
        let r = ColumnRef::parse(token)
            .ok_or_else(|| not_found("project.table.column triple".to_string()))?;
        let db = self
            .project
            .db_projs
            .get(r.project)
            .ok_or_else(|| not_found(format!("project '{}'", r.project)))?;
        let table = db
            .tables
            .get(r.table)
            .ok_or_else(|| not_found(format!("table '{}' in project '{}'", r.table, r.project)))?;
        let column = table
            .column(r.column)
            .ok_or_else(|| not_found(format!("column '{}' in table '{}'", r.column, r.table)))?;

        if column.ty != kind {
            return Err(GenError::TypeMismatch {
                reference: format!("{DB_PREFIX}{token}"),
                context: context.to_string(),
                expected: kind.to_string(),
                found: column.ty.to_string(),
            });
        }
        if column.values.is_empty() {
            return Err(not_found(format!("value set on column '{}'", r.column)));
        }
        Ok(entry_keys(&column.values))
    }
}

/// Failure inside one constraint: a bad value shape, reported against the
/// declaring key, or a generator error that stands on its own.
enum RuleError {
    Shape(String),
    Gen(GenError),
}

impl RuleError {
    fn or(self, bad: &dyn Fn(&str) -> GenError) -> GenError {
        match self {
            RuleError::Shape(reason) => bad(&reason),
            RuleError::Gen(e) => e,
        }
    }
}

impl From<GenError> for RuleError {
    fn from(e: GenError) -> Self {
        RuleError::Gen(e)
    }
}

fn rule_kind(key: DavKey) -> Option<RuleKind> {
    Some(match key {
        DavKey::Null => RuleKind::NotNull,
        DavKey::Min => RuleKind::Min,
        DavKey::Max => RuleKind::Max,
        DavKey::Regex => RuleKind::Regex,
        DavKey::Func => RuleKind::Func,
        DavKey::In => RuleKind::In,
        DavKey::NotIn => RuleKind::NotIn,
        DavKey::Cmds => return None,
    })
}

fn rule(kind: RuleKind, value: RuleValue) -> Rule {
    Rule { kind, value }
}

fn entry_keys(entries: &[CoupletEntry]) -> Vec<String> {
    entries.iter().map(|e| e.key.clone()).collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Bound of a `min`/`max` rule for a field of `kind`.
fn bound(kind: TypeKind, value: &Value) -> std::result::Result<RuleValue, String> {
    let text = || value.as_str().ok_or_else(|| "expected a formatted string".to_string());
    match kind {
        TypeKind::Date => NaiveDate::parse_from_str(text()?, DATE_FORMAT)
            .map(RuleValue::Date)
            .map_err(|e| format!("{e}, expected {DATE_FORMAT}")),
        TypeKind::Time => NaiveTime::parse_from_str(text()?, TIME_FORMAT)
            .map(RuleValue::Time)
            .map_err(|e| format!("{e}, expected {TIME_FORMAT}")),
        TypeKind::DateTime => NaiveDateTime::parse_from_str(text()?, DATETIME_FORMAT)
            .map(RuleValue::DateTime)
            .map_err(|e| format!("{e}, expected {DATETIME_FORMAT}")),
        TypeKind::Double => value
            .as_f64()
            .map(RuleValue::Float)
            .ok_or_else(|| "expected a number".to_string()),
        k if k.is_integer() || matches!(k, TypeKind::String | TypeKind::Json | TypeKind::Memblock) => {
            value
                .as_i64()
                .map(RuleValue::Int)
                .ok_or_else(|| "expected an integer".to_string())
        }
        k => Err(format!("min/max does not apply to {k}")),
    }
}

fn typed_set(kind: TypeKind, keys: Vec<String>) -> std::result::Result<RuleValue, String> {
    if kind.is_integer() {
        let ints = keys
            .iter()
            .map(|k| k.parse::<i64>().map_err(|_| format!("'{k}' is not an integer")))
            .collect::<std::result::Result<_, _>>()?;
        return Ok(RuleValue::Ints(ints));
    }
    match kind {
        TypeKind::String | TypeKind::Json | TypeKind::Char => Ok(RuleValue::Texts(keys)),
        k => Err(format!("set membership does not apply to {k}")),
    }
}

/// Variant of the runtime `DavKind` matching `kind`.
fn kind_name(kind: RuleKind) -> &'static str {
    match kind {
        RuleKind::NotNull => "NotNull",
        RuleKind::Min => "Min",
        RuleKind::Max => "Max",
        RuleKind::Regex => "Regex",
        RuleKind::Func => "Func",
        RuleKind::In => "In",
        RuleKind::NotIn => "NotIn",
    }
}

/// Rust expression building the runtime `Dav` of `rule`.
pub fn rule_expr(rule: &Rule) -> String {
    let kind = kind_name(rule.kind);
    let value = match &rule.value {
        RuleValue::None => "DavValue::None".to_string(),
        RuleValue::Int(v) => format!("DavValue::Int({v})"),
        RuleValue::Float(v) => format!("DavValue::Float({v:?})"),
        RuleValue::Text(v) => format!("DavValue::text({v:?})"),
        RuleValue::Date(d) => format!("DavValue::date({}, {}, {})", d.year(), d.month(), d.day()),
        RuleValue::Time(t) => {
            format!("DavValue::time({}, {}, {})", t.hour(), t.minute(), t.second())
        }
        RuleValue::DateTime(dt) => format!(
            "DavValue::datetime({}, {}, {}, {}, {}, {})",
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ),
        RuleValue::Ints(v) => format!(
            "DavValue::ints(&[{}])",
            v.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
        ),
        RuleValue::Texts(v) => format!(
            "DavValue::texts(&[{}])",
            v.iter().map(|s| format!("{s:?}")).collect::<Vec<_>>().join(", ")
        ),
    };
    format!("Dav::new(DavKind::{kind}, {value})")
}

/// `impl Validate` of the record generated for `s`: the rule-cache builder
/// plus the per-member checks.
pub fn emit_rule_cache(ctx: &GenContext<'_>, s: &Struct) -> Result<String> {
    let owner = Owner::Struct(&s.name);
    let resolver = DavResolver::new(ctx.project);
    let name = ctx.record_name(&s.name, &owner.to_string())?;

    let mut adds = Vec::new();
    let mut checks = Vec::new();
    for field in &s.fields {
        let context = owner.field(&field.name);
        let target = ctx.target(&field.name);
        let dav = resolver.resolve(owner, field)?;
        if dav.is_cleared() {
            continue;
        }
        for r in &dav.rules {
            adds.push(format!("dvc.add_rule(\"{target}\", {});", rule_expr(r)));
        }
        let access = format!("self.{}", ctx.member(&field.name));
        checks.extend(check_stmts(ctx, "dvc", &access, &target, field, dav, &context)?);
    }

    let mut w = CodeWriter::new();
    w.block(&format!("impl Validate for {name}"), |w| {
        let param = if adds.is_empty() { "_dvc" } else { "dvc" };
        w.block(&format!("fn cache_davs({param}: &mut DavCache)"), |w| {
            for line in &adds {
                w.line(line)?;
            }
            Ok(())
        })?;
        w.blank_line()?;
        let param = if checks.iter().any(|l| l.starts_with("dvc.")) { "dvc" } else { "_dvc" };
        w.block(
            &format!("fn validate_davs(&self, {param}: &DavCache) -> Result<(), DavError>"),
            |w| {
                for line in &checks {
                    w.line(line)?;
                }
                w.line("Ok(())")?;
                Ok(())
            },
        )
    })?;
    Ok(w.finish())
}

/// Statements validating the value at `access`, registered as `target`.
///
/// Records and record lists are checked against their own rules, narrowed
/// by the field's command and member overrides. Primitive values are
/// checked against `dvc` even without declared rules of their own, since
/// overrides and hooks add rules the declaration does not show.
pub fn check_stmts(
    ctx: &GenContext<'_>,
    dvc: &str,
    access: &str,
    target: &str,
    field: &Field,
    dav: &ResolvedDav,
    context: &str,
) -> Result<Vec<String>> {
    let wire = Wire::of(field);
    let category = ctx.mapping(&field.ty, context)?.category;
    if !category.is_record() {
        return Ok(if wire.is_array {
            vec![format!("{dvc}.validate_each(\"{target}\", &{access})?;")]
        } else {
            vec![format!("{dvc}.validate(\"{target}\", &{access})?;")]
        });
    }

    let mode = match dav.cmds {
        Some(DavCmd::Insert) => Some("DavMode::Insert"),
        Some(DavCmd::Key) => Some("DavMode::KeyOnly"),
        _ => None,
    };
    if mode.is_none() && dav.overrides.is_empty() {
        return Ok(vec![format!("{dvc}.validate_object(\"{target}\", &{access})?;")]);
    }

    let ty = ctx.rust_type(wire, context)?;
    let local = format!("_dvc_{target}");
    let cache = match mode {
        Some(mode) => format!("{ty}::davs_for({mode})"),
        None => format!("{ty}::davs()"),
    };
    let binding = if dav.overrides.is_empty() { "let" } else { "let mut" };
    let mut stmts = vec![format!("{binding} {local} = {cache};")];
    for o in &dav.overrides {
        let member = ctx.target(&o.member);
        if let Some(kind) = o.remove {
            stmts.push(format!("{local}.remove_rules(\"{member}\", DavKind::{});", kind_name(kind)));
        }
        if let Some(r) = &o.add {
            stmts.push(format!("{local}.add_rule(\"{member}\", {});", rule_expr(r)));
        }
    }
    stmts.push(format!("{local}.validate_as(\"{target}\", &{access})?;"));
    Ok(stmts)
}
