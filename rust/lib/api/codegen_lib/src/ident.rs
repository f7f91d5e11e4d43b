//! Identifier policy: per-class prefix/suffix wrapping and casing.

use std::collections::BTreeMap;
use std::fmt;

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase,
};
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Every kind of name the generator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentClass {
    Record,
    Couplet,
    ClientInterface,
    ClientMarshaler,
    DirectClient,
    ServerInterface,
    ServerMarshaler,
    Member,
    Method,
    File,
}

impl fmt::Display for IdentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdentClass::Record => "record",
            IdentClass::Couplet => "couplet",
            IdentClass::ClientInterface => "client-interface",
            IdentClass::ClientMarshaler => "client-marshaler",
            IdentClass::DirectClient => "direct-client",
            IdentClass::ServerInterface => "server-interface",
            IdentClass::ServerMarshaler => "server-marshaler",
            IdentClass::Member => "member",
            IdentClass::Method => "method",
            IdentClass::File => "file",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    None,
    Camel,
    Pascal,
    Snake,
    Spinal,
    Constant,
    Lower,
    Upper,
    Title,
}

impl Casing {
    pub const ALL: [Casing; 9] = [
        Casing::None,
        Casing::Camel,
        Casing::Pascal,
        Casing::Snake,
        Casing::Spinal,
        Casing::Constant,
        Casing::Lower,
        Casing::Upper,
        Casing::Title,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Casing::None => "none",
            Casing::Camel => "camel",
            Casing::Pascal => "pascal",
            Casing::Snake => "snake",
            Casing::Spinal => "spinal",
            Casing::Constant => "constant",
            Casing::Lower => "lower",
            Casing::Upper => "upper",
            Casing::Title => "title",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn apply(&self, s: &str) -> String {
        match self {
            Casing::None => s.to_string(),
            Casing::Camel => s.to_lower_camel_case(),
            Casing::Pascal => s.to_upper_camel_case(),
            Casing::Snake => s.to_snake_case(),
            Casing::Spinal => s.to_kebab_case(),
            Casing::Constant => s.to_shouty_snake_case(),
            Casing::Lower => s.to_lowercase(),
            Casing::Upper => s.to_uppercase(),
            Casing::Title => s.to_title_case(),
        }
    }

    fn valid_names() -> String {
        Self::ALL.map(|c| c.name()).join(", ")
    }
}

/// Naming rule of one identifier class, as written in the options file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentRule {
    /// `"prefix|suffix"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casing: Option<String>,
}

impl IdentRule {
    pub fn wrap(wrap: &str) -> Self {
        Self {
            wrap: Some(wrap.to_string()),
            casing: None,
        }
    }

    pub fn casing(casing: &str) -> Self {
        Self {
            wrap: None,
            casing: Some(casing.to_string()),
        }
    }

    pub fn with_casing(mut self, casing: &str) -> Self {
        self.casing = Some(casing.to_string());
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    prefix: String,
    suffix: String,
    casing: Casing,
}

/// Validated naming rules for every configured class.
#[derive(Debug, Clone, Default)]
pub struct IdentPolicy {
    rules: BTreeMap<IdentClass, CompiledRule>,
}

impl IdentPolicy {
    /// No rules: every class resolves by identity.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(rules: &BTreeMap<IdentClass, IdentRule>) -> Result<Self> {
        let mut compiled = BTreeMap::new();
        for (class, rule) in rules {
            let (prefix, suffix) = match &rule.wrap {
                None => (String::new(), String::new()),
                Some(wrap) => {
                    let mut parts = wrap.split('|');
                    match (parts.next(), parts.next(), parts.next()) {
                        (Some(pre), Some(suf), None) => (pre.to_string(), suf.to_string()),
                        _ => {
                            return Err(GenError::InvalidWrap {
                                wrap: wrap.clone(),
                                class: class.to_string(),
                            })
                        }
                    }
                }
            };
            let casing = match &rule.casing {
                None => Casing::None,
                Some(name) => Casing::parse(name).ok_or_else(|| GenError::UnsupportedCasing {
                    casing: name.clone(),
                    class: class.to_string(),
                    valid: Casing::valid_names(),
                })?,
            };
            compiled.insert(
                *class,
                CompiledRule {
                    prefix,
                    suffix,
                    casing,
                },
            );
        }
        Ok(Self { rules: compiled })
    }

    pub fn resolve(&self, class: IdentClass, raw: &str) -> String {
        let ident = match self.rules.get(&class) {
            Some(rule) => rule
                .casing
                .apply(&format!("{}{}{}", rule.prefix, raw, rule.suffix)),
            None => raw.to_string(),
        };
        escape_keyword(collapse_separators(ident))
    }
}

fn collapse_separators(mut s: String) -> String {
    while s.contains("__") {
        s = s.replace("__", "_");
    }
    s
}

/// Strict and reserved keywords of Rust 2021, plus `gen`.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const NON_RAW: &[&str] = &["crate", "self", "Self", "super"];

/// Makes `ident` usable as a Rust identifier: keywords become raw
/// identifiers, except those that cannot be raw, which get a `_` suffix.
pub fn escape_keyword(ident: String) -> String {
    if NON_RAW.contains(&ident.as_str()) {
        format!("{ident}_")
    } else if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else {
        ident
    }
}

/// `ident` without its raw prefix, for file names, string tags and
/// derived names.
pub fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}
