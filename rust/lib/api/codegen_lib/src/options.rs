//! Generator options, loaded from TOML.
//!
//! ```toml
//! namespace = "super"
//! runtime = "stubgen_runtime"
//! async = true
//!
//! [idents.server-interface]
//! wrap = "|Service"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::ident::{IdentClass, IdentPolicy, IdentRule};

/// Options as written in the file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsFile {
    pub namespace: Option<String>,
    pub runtime: Option<String>,
    #[serde(rename = "async")]
    pub async_variant: Option<bool>,
    #[serde(default)]
    pub idents: BTreeMap<IdentClass, IdentRule>,
}

/// Effective options of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Module path the generated units import each other from.
    pub namespace: String,
    /// Crate path of the runtime support library.
    pub runtime: String,
    /// Also emit the async server artifacts.
    pub async_variant: bool,
    pub idents: BTreeMap<IdentClass, IdentRule>,
}

impl Default for Options {
    fn default() -> Self {
        let idents = [
            (IdentClass::Record, IdentRule::casing("pascal")),
            (IdentClass::Couplet, IdentRule::casing("pascal")),
            (IdentClass::ClientInterface, IdentRule::wrap("|Client").with_casing("pascal")),
            (
                IdentClass::ClientMarshaler,
                IdentRule::wrap("|ClientMarshaler").with_casing("pascal"),
            ),
            (IdentClass::DirectClient, IdentRule::wrap("|DirectClient").with_casing("pascal")),
            (IdentClass::ServerInterface, IdentRule::wrap("|Server").with_casing("pascal")),
            (
                IdentClass::ServerMarshaler,
                IdentRule::wrap("|ServerMarshaler").with_casing("pascal"),
            ),
            (IdentClass::Member, IdentRule::casing("snake")),
            (IdentClass::Method, IdentRule::casing("snake")),
            (IdentClass::File, IdentRule::casing("snake")),
        ];
        Self {
            namespace: "super".to_string(),
            runtime: "stubgen_runtime".to_string(),
            async_variant: false,
            idents: idents.into_iter().collect(),
        }
    }
}

impl Options {
    /// Loads `path` and merges it over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        Self::from_toml(&text).map_err(|reason| GenError::InvalidModel {
            context: format!("options {}", path.display()),
            reason,
        })
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, String> {
        let file: OptionsFile = toml::from_str(text).map_err(|e| e.to_string())?;
        Ok(Self::default().merge(file))
    }

    /// Overlays `file`; an ident rule replaces the default rule of its class.
    pub fn merge(mut self, file: OptionsFile) -> Self {
        if let Some(ns) = file.namespace {
            self.namespace = ns;
        }
        if let Some(rt) = file.runtime {
            self.runtime = rt;
        }
        if let Some(a) = file.async_variant {
            self.async_variant = a;
        }
        self.idents.extend(file.idents);
        self
    }

    pub fn ident_policy(&self) -> Result<IdentPolicy> {
        IdentPolicy::new(&self.idents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_rpc_roles() {
        let policy = Options::default().ident_policy().unwrap();
        assert_eq!(policy.resolve(IdentClass::ServerInterface, "Orders"), "OrdersServer");
        assert_eq!(
            policy.resolve(IdentClass::ServerMarshaler, "OrdersAsync"),
            "OrdersAsyncServerMarshaler"
        );
        assert_eq!(policy.resolve(IdentClass::File, "OrdersClient"), "orders_client");
        assert_eq!(policy.resolve(IdentClass::Member, "shipTo"), "ship_to");
    }

    #[test]
    fn file_overrides_defaults() {
        let opts = Options::from_toml(
            r#"
            namespace = "crate::orders"
            async = true

            [idents.server-interface]
            wrap = "|Service"
            "#,
        )
        .unwrap();

        assert_eq!(opts.namespace, "crate::orders");
        assert_eq!(opts.runtime, "stubgen_runtime");
        assert!(opts.async_variant);

        let policy = opts.ident_policy().unwrap();
        assert_eq!(policy.resolve(IdentClass::ServerInterface, "Orders"), "OrdersService");
        assert_eq!(policy.resolve(IdentClass::Record, "order"), "Order");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Options::from_toml("namspace = \"x\"").is_err());
        assert!(Options::from_toml("[idents.widget]\ncasing = \"snake\"").is_err());
    }

    #[test]
    fn bad_casing_surfaces_when_building_the_policy() {
        let opts = Options::from_toml("[idents.member]\ncasing = \"hungarian\"").unwrap();
        assert!(matches!(
            opts.ident_policy(),
            Err(GenError::UnsupportedCasing { .. })
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stubgen.toml");
        std::fs::write(&path, "runtime = \"rt\"\n").unwrap();

        let opts = Options::load(&path).unwrap();
        assert_eq!(opts.runtime, "rt");
        assert!(Options::load(&dir.path().join("missing.toml")).is_err());
    }
}
