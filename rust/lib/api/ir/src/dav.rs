//! DAV (declarative field validation) constraints.
//!
//! A field carries its constraints raw, exactly as declared in the project
//! file (`{"min": "2020-01-01", "in": "OrderStatus"}`). The generator
//! resolves them once into a [`ResolvedDav`] and memoizes the result on the
//! field.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Constraint kind as written in the project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DavKey {
    /// `false` means the value must be set.
    Null,
    Min,
    Max,
    Regex,
    Func,
    In,
    #[serde(alias = "not-in")]
    NotIn,
    /// Validation command (`clear`, `insert`, `key`).
    Cmds,
}

impl DavKey {
    pub const ALL: [DavKey; 8] = [
        DavKey::Null,
        DavKey::Min,
        DavKey::Max,
        DavKey::Regex,
        DavKey::Func,
        DavKey::In,
        DavKey::NotIn,
        DavKey::Cmds,
    ];

    /// Accepts the `not-in` spelling as well.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "not-in" {
            return Some(DavKey::NotIn);
        }
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DavKey::Null => "null",
            DavKey::Min => "min",
            DavKey::Max => "max",
            DavKey::Regex => "regex",
            DavKey::Func => "func",
            DavKey::In => "in",
            DavKey::NotIn => "notin",
            DavKey::Cmds => "cmds",
        }
    }
}

/// Key of one constraint declaration.
///
/// A plain key (`min`) constrains the field itself. On a record-typed field a
/// key may name a member of the record instead: `label:max` replaces the
/// record's own `max` rules on `label`, `label+max` adds to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DavTarget {
    pub member: Option<String>,
    pub replace: bool,
    pub key: DavKey,
}

impl DavTarget {
    /// `member:key`.
    pub fn replace(member: &str, key: DavKey) -> Self {
        Self {
            member: Some(member.to_string()),
            replace: true,
            key,
        }
    }

    /// `member+key`.
    pub fn add(member: &str, key: DavKey) -> Self {
        Self {
            member: Some(member.to_string()),
            replace: false,
            key,
        }
    }
}

impl From<DavKey> for DavTarget {
    fn from(key: DavKey) -> Self {
        Self {
            member: None,
            replace: false,
            key,
        }
    }
}

impl TryFrom<String> for DavTarget {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let unknown = |k: &str| format!("unknown constraint '{k}' in '{s}'");
        let (member, replace, key) = match s.find(|c: char| c == ':' || c == '+') {
            None => (None, false, s.as_str()),
            Some(at) => {
                let member = &s[..at];
                if member.is_empty() {
                    return Err(format!("missing member in '{s}'"));
                }
                (Some(member.to_string()), s[at..].starts_with(':'), &s[at + 1..])
            }
        };
        let key = DavKey::parse(key).ok_or_else(|| unknown(key))?;
        if member.is_some() && key == DavKey::Cmds {
            return Err(format!("cmds cannot target a member in '{s}'"));
        }
        Ok(Self {
            member,
            replace,
            key,
        })
    }
}

impl From<DavTarget> for String {
    fn from(t: DavTarget) -> Self {
        t.to_string()
    }
}

impl fmt::Display for DavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            None => f.write_str(self.key.as_str()),
            Some(m) => {
                let sep = if self.replace { ':' } else { '+' };
                write!(f, "{m}{sep}{}", self.key.as_str())
            }
        }
    }
}

/// Kind of a resolved rule. Mirrors the runtime `DavKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    NotNull,
    Min,
    Max,
    Regex,
    Func,
    In,
    NotIn,
}

/// Concrete value of a resolved rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    None,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Ints(Vec<i64>),
    Texts(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: RuleKind,
    pub value: RuleValue,
}

/// Validation command attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavCmd {
    /// Skip validation of this field.
    Clear,
    /// Database record about to be inserted: rules on generated columns are
    /// left out.
    Insert,
    /// Database record identified by its key: only key column rules apply.
    Key,
}

impl DavCmd {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clear" => Some(DavCmd::Clear),
            "insert" => Some(DavCmd::Insert),
            "key" => Some(DavCmd::Key),
            _ => None,
        }
    }
}

/// Change to the rules of one member of a record-typed field.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRule {
    /// Member name as declared in the record.
    pub member: String,
    /// Rules of this kind are dropped first.
    pub remove: Option<RuleKind>,
    pub add: Option<Rule>,
}

/// Fully resolved constraints of one field, in declaration-key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDav {
    pub rules: Vec<Rule>,
    pub overrides: Vec<MemberRule>,
    pub cmds: Option<DavCmd>,
}

impl ResolvedDav {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.overrides.is_empty() && self.cmds.is_none()
    }

    /// True when the only declared intent is to skip validation.
    pub fn is_cleared(&self) -> bool {
        self.cmds == Some(DavCmd::Clear) && self.rules.is_empty() && self.overrides.is_empty()
    }
}
