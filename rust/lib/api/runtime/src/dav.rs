//! Runtime side of DAV field validation.
//!
//! Generated records register their rules into a [`DavCache`] keyed by
//! member name; generated server marshalers build one per call and check
//! every input before the implementation runs.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavKind {
    NotNull,
    Min,
    Max,
    Regex,
    Func,
    In,
    NotIn,
}

impl fmt::Display for DavKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DavKind::NotNull => "not-null",
            DavKind::Min => "min",
            DavKind::Max => "max",
            DavKind::Regex => "regex",
            DavKind::Func => "func",
            DavKind::In => "in",
            DavKind::NotIn => "not-in",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DavValue {
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

impl DavValue {
    pub fn text(s: &str) -> Self {
        DavValue::Text(s.to_string())
    }

    pub fn date(year: i32, month: u32, day: u32) -> Self {
        NaiveDate::from_ymd_opt(year, month, day).map_or(DavValue::None, DavValue::Date)
    }

    pub fn time(hour: u32, min: u32, sec: u32) -> Self {
        NaiveTime::from_hms_opt(hour, min, sec).map_or(DavValue::None, DavValue::Time)
    }

    pub fn datetime(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, min, sec))
            .map_or(DavValue::None, DavValue::DateTime)
    }

    pub fn ints(values: &[i64]) -> Self {
        DavValue::Ints(values.to_vec())
    }

    pub fn texts(values: &[&str]) -> Self {
        DavValue::Texts(values.iter().map(|s| s.to_string()).collect())
    }
}

impl fmt::Display for DavValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DavValue::None => f.write_str("-"),
            DavValue::Int(v) => write!(f, "{v}"),
            DavValue::Float(v) => write!(f, "{v}"),
            DavValue::Text(v) => f.write_str(v),
            DavValue::Date(v) => write!(f, "{v}"),
            DavValue::Time(v) => write!(f, "{v}"),
            DavValue::DateTime(v) => write!(f, "{v}"),
            DavValue::Ints(v) => write!(f, "{v:?}"),
            DavValue::Texts(v) => write!(f, "{v:?}"),
        }
    }
}

/// One rule: a kind and its bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Dav {
    pub kind: DavKind,
    pub value: DavValue,
}

impl Dav {
    pub fn new(kind: DavKind, value: DavValue) -> Self {
        Self { kind, value }
    }
}

#[derive(Error, Debug)]
pub enum DavError {
    #[error("{target}: value {value} violates {kind} {bound}")]
    Violation {
        target: String,
        kind: DavKind,
        bound: DavValue,
        value: String,
    },

    #[error("{target}: {kind} rule does not apply to a {found} value")]
    NotApplicable {
        target: String,
        kind: DavKind,
        found: &'static str,
    },

    #[error("{target}: invalid pattern")]
    Pattern {
        target: String,
        #[source]
        source: regex::Error,
    },

    #[error("{target}: no validation function registered as '{name}'")]
    UnknownFunc { target: String, name: String },

    #[error("{target}.{source}")]
    Nested {
        target: String,
        #[source]
        source: Box<DavError>,
    },
}

/// A field value seen through the eyes of the validator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Checked<'a> {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(&'a str),
    Bytes(&'a [u8]),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl Checked<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Checked::Bool(_) => "bool",
            Checked::Char(_) => "char",
            Checked::Int(_) | Checked::UInt(_) => "integer",
            Checked::Float(_) => "double",
            Checked::Text(_) => "text",
            Checked::Bytes(_) => "binary",
            Checked::Date(_) => "date",
            Checked::Time(_) => "time",
            Checked::DateTime(_) => "datetime",
            Checked::Uuid(_) => "uuid",
        }
    }

    fn is_null(&self) -> bool {
        match self {
            Checked::Char(c) => *c == '\0',
            Checked::Text(s) => s.is_empty(),
            Checked::Bytes(b) => b.is_empty(),
            Checked::Uuid(u) => u.is_nil(),
            _ => false,
        }
    }

    /// Compares against a bound. Text and binary compare by length.
    fn compare(&self, bound: &DavValue) -> Option<Ordering> {
        match (self, bound) {
            (Checked::Int(v), DavValue::Int(b)) => Some(v.cmp(b)),
            (Checked::UInt(v), DavValue::Int(b)) => Some(i128::from(*v).cmp(&i128::from(*b))),
            (Checked::Float(v), DavValue::Float(b)) => v.partial_cmp(b),
            (Checked::Float(v), DavValue::Int(b)) => v.partial_cmp(&(*b as f64)),
            (Checked::Text(s), DavValue::Int(b)) => Some((s.chars().count() as i64).cmp(b)),
            (Checked::Bytes(s), DavValue::Int(b)) => Some((s.len() as i64).cmp(b)),
            (Checked::Date(v), DavValue::Date(b)) => Some(v.cmp(b)),
            (Checked::Time(v), DavValue::Time(b)) => Some(v.cmp(b)),
            (Checked::DateTime(v), DavValue::DateTime(b)) => Some(v.cmp(b)),
            _ => None,
        }
    }

    fn member_of(&self, set: &DavValue) -> Option<bool> {
        match (self, set) {
            (Checked::Int(v), DavValue::Ints(s)) => Some(s.contains(v)),
            (Checked::UInt(v), DavValue::Ints(s)) => {
                Some(i64::try_from(*v).is_ok_and(|v| s.contains(&v)))
            }
            (Checked::Text(v), DavValue::Texts(s)) => Some(s.iter().any(|x| x == v)),
            (Checked::Char(c), DavValue::Texts(s)) => {
                let mut buf = [0u8; 4];
                let c = c.encode_utf8(&mut buf);
                Some(s.iter().any(|x| x == c))
            }
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Checked::Bool(v) => v.to_string(),
            Checked::Char(v) => format!("{v:?}"),
            Checked::Int(v) => v.to_string(),
            Checked::UInt(v) => v.to_string(),
            Checked::Float(v) => v.to_string(),
            Checked::Text(v) => format!("{v:?}"),
            Checked::Bytes(v) => format!("<{} bytes>", v.len()),
            Checked::Date(v) => v.to_string(),
            Checked::Time(v) => v.to_string(),
            Checked::DateTime(v) => v.to_string(),
            Checked::Uuid(v) => v.to_string(),
        }
    }
}

/// A value a DAV rule can be checked against.
pub trait DavCheck {
    fn checked(&self) -> Checked<'_>;
}

macro_rules! dav_check {
    ($($ty:ty => $variant:ident $(as $cast:ty)?;)*) => {$(
        impl DavCheck for $ty {
            fn checked(&self) -> Checked<'_> {
                Checked::$variant(*self $(as $cast)?)
            }
        }
    )*};
}

dav_check! {
    bool => Bool;
    char => Char;
    i8 => Int as i64;
    i16 => Int as i64;
    i32 => Int as i64;
    i64 => Int;
    u8 => UInt as u64;
    u16 => UInt as u64;
    u32 => UInt as u64;
    u64 => UInt;
    f64 => Float;
    NaiveDate => Date;
    NaiveTime => Time;
    NaiveDateTime => DateTime;
    Uuid => Uuid;
}

impl DavCheck for String {
    fn checked(&self) -> Checked<'_> {
        Checked::Text(self)
    }
}

impl DavCheck for str {
    fn checked(&self) -> Checked<'_> {
        Checked::Text(self)
    }
}

impl DavCheck for Vec<u8> {
    fn checked(&self) -> Checked<'_> {
        Checked::Bytes(self)
    }
}

/// Custom check registered for `func` rules.
pub type DavFn = fn(&Checked<'_>) -> bool;

fn funcs() -> &'static RwLock<BTreeMap<String, DavFn>> {
    static FUNCS: OnceLock<RwLock<BTreeMap<String, DavFn>>> = OnceLock::new();
    FUNCS.get_or_init(|| RwLock::new(BTreeMap::new()))
}

/// Registers `f` under `name` for `func` rules. Call once at startup.
pub fn register_func(name: &str, f: DavFn) {
    let mut table = funcs().write().unwrap_or_else(|e| e.into_inner());
    table.insert(name.to_string(), f);
}

fn lookup_func(name: &str) -> Option<DavFn> {
    let table = funcs().read().unwrap_or_else(|e| e.into_inner());
    table.get(name).copied()
}

/// Rules of one record or call, keyed by member name.
#[derive(Debug, Clone, Default)]
pub struct DavCache {
    rules: Vec<(String, Dav)>,
}

impl DavCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, target: &str, dav: Dav) {
        self.rules.push((target.to_string(), dav));
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drops every `kind` rule registered for `target`.
    pub fn remove_rules(&mut self, target: &str, kind: DavKind) {
        self.rules.retain(|(t, d)| !(t == target && d.kind == kind));
    }

    pub fn rules_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Dav> + 'a {
        self.rules
            .iter()
            .filter(move |(t, _)| t == target)
            .map(|(_, d)| d)
    }

    /// Checks every rule registered for `target` against `value`.
    pub fn validate(&self, target: &str, value: &dyn DavCheck) -> Result<(), DavError> {
        let checked = value.checked();
        for dav in self.rules_for(target) {
            check(target, dav, &checked)?;
        }
        Ok(())
    }

    /// Checks every element of a primitive array.
    pub fn validate_each<T: DavCheck>(&self, target: &str, values: &[T]) -> Result<(), DavError> {
        for value in values {
            self.validate(target, value)?;
        }
        Ok(())
    }

    /// Checks a nested record against its own rules.
    pub fn validate_object<T: Validate>(&self, target: &str, value: &T) -> Result<(), DavError> {
        T::davs().validate_as(target, value)
    }

    /// Checks a nested record against the rules of this cache, which the
    /// caller built for it.
    pub fn validate_as<T: Validate>(&self, target: &str, value: &T) -> Result<(), DavError> {
        value.validate_davs(self).map_err(|e| DavError::Nested {
            target: target.to_string(),
            source: Box::new(e),
        })
    }
}

/// Which rules a database record registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DavMode {
    #[default]
    All,
    /// The record is about to be inserted: rules on columns the database
    /// generates are left out.
    Insert,
    /// Only the key columns are set.
    KeyOnly,
}

fn check(target: &str, dav: &Dav, value: &Checked<'_>) -> Result<(), DavError> {
    let not_applicable = || DavError::NotApplicable {
        target: target.to_string(),
        kind: dav.kind,
        found: value.kind(),
    };

    let ok = match dav.kind {
        DavKind::NotNull => !value.is_null(),
        DavKind::Min => value.compare(&dav.value).ok_or_else(not_applicable)? != Ordering::Less,
        DavKind::Max => {
            value.compare(&dav.value).ok_or_else(not_applicable)? != Ordering::Greater
        }
        DavKind::In => value.member_of(&dav.value).ok_or_else(not_applicable)?,
        DavKind::NotIn => !value.member_of(&dav.value).ok_or_else(not_applicable)?,
        DavKind::Regex => {
            let (Checked::Text(text), DavValue::Text(pattern)) = (value, &dav.value) else {
                return Err(not_applicable());
            };
            let re = Regex::new(pattern).map_err(|source| DavError::Pattern {
                target: target.to_string(),
                source,
            })?;
            re.is_match(text)
        }
        DavKind::Func => {
            let DavValue::Text(name) = &dav.value else {
                return Err(not_applicable());
            };
            let f = lookup_func(name).ok_or_else(|| DavError::UnknownFunc {
                target: target.to_string(),
                name: name.clone(),
            })?;
            f(value)
        }
    };

    if ok {
        Ok(())
    } else {
        Err(DavError::Violation {
            target: target.to_string(),
            kind: dav.kind,
            bound: dav.value.clone(),
            value: value.render(),
        })
    }
}

/// Implemented by generated records and lists.
pub trait Validate {
    /// Registers the rules of every member into `dvc`.
    fn cache_davs(dvc: &mut DavCache)
    where
        Self: Sized;

    fn validate_davs(&self, dvc: &DavCache) -> Result<(), DavError>;

    /// Rules for `mode`. Only database records tell the modes apart.
    fn cache_davs_for(dvc: &mut DavCache, _mode: DavMode)
    where
        Self: Sized,
    {
        Self::cache_davs(dvc)
    }

    fn davs() -> DavCache
    where
        Self: Sized,
    {
        Self::davs_for(DavMode::All)
    }

    fn davs_for(mode: DavMode) -> DavCache
    where
        Self: Sized,
    {
        let mut dvc = DavCache::new();
        Self::cache_davs_for(&mut dvc, mode);
        dvc
    }

    fn validate(&self) -> Result<(), DavError>
    where
        Self: Sized,
    {
        self.validate_davs(&Self::davs())
    }
}
