//! Stub generator library
//!
//! Turns a project IR into Rust record types, couplets, DAV rule caches and
//! RPC client/server stubs bound to `stubgen-runtime`.

pub mod catalog;
pub mod code_writer;
pub mod context;
pub mod couplet;
pub mod dav;
pub mod error;
pub mod ident;
pub mod options;
pub mod orchestrator;
pub mod record;
mod rpc;
pub mod rpc_client;
pub mod rpc_server;

pub use catalog::{Category, TypeCatalog, TypeMapping};
pub use context::{GenContext, Owner};
pub use error::{GenError, Result};
pub use ident::{escape_keyword, unraw, Casing, IdentClass, IdentPolicy, IdentRule};
pub use options::Options;
pub use orchestrator::Orchestrator;

/// Codegen trait - implement this for each generated artifact kind
pub trait Codegen {
    fn generate(&self, ctx: &GenContext<'_>) -> Result<GeneratedCode>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    pub files: Vec<GeneratedFile>,
}

impl GeneratedCode {
    pub fn single(file: GeneratedFile) -> Self {
        Self { files: vec![file] }
    }

    pub fn extend(&mut self, other: GeneratedCode) {
        self.files.extend(other.files);
    }

    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub path: String,
    /// Module name declared in the module index.
    pub module: String,
    pub content: String,
}

/// Identity of the generator, stamped into every banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenInfo {
    pub generator: String,
    pub version: String,
    pub timestamp: String,
}

impl GenInfo {
    pub fn now() -> Self {
        Self::fixed(&chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string())
    }

    /// Fixed timestamp, for reproducible output.
    pub fn fixed(timestamp: &str) -> Self {
        Self {
            generator: "stubgen".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    pub fn banner(&self) -> String {
        format!(
            "// This file was generated by {} [ver {}] on {}\n// Do not edit; changes are lost on the next run.\n\n",
            self.generator, self.version, self.timestamp
        )
    }
}
