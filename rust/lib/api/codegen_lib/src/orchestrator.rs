//! Runs the emitters over a project and writes the result.
//!
//! A run is generated completely in memory before anything touches the
//! destination. Each file is then written to a temporary file next to its
//! target and renamed into place. A run failing before the first rename
//! leaves previous output intact; a failed rename after that is reported as
//! [`GenError::PartialWrite`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use stubgen_ir::Project;
use tempfile::NamedTempFile;

use crate::catalog::TypeCatalog;
use crate::context::GenContext;
use crate::couplet::CoupletGenerator;
use crate::error::{GenError, Result};
use crate::options::Options;
use crate::record::RecordGenerator;
use crate::rpc_client::ClientGenerator;
use crate::rpc_server::{Flavor, ServerGenerator};
use crate::{Codegen, GenInfo, GeneratedCode, GeneratedFile};

/// File extensions removed by [`Orchestrator::clean`] by default.
pub const GENERATED_EXTENSIONS: &[&str] = &["rs"];

/// Name of the module index written next to the generated units.
pub const MODULE_INDEX: &str = "mod.rs";

pub struct Orchestrator<'a> {
    project: &'a Project,
    catalog: TypeCatalog,
    options: Options,
    info: GenInfo,
}

impl<'a> Orchestrator<'a> {
    pub fn new(project: &'a Project, options: Options) -> Self {
        Self {
            project,
            catalog: TypeCatalog::rust(),
            options,
            info: GenInfo::now(),
        }
    }

    pub fn with_catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Fixes the banner identity, for reproducible output.
    pub fn with_info(mut self, info: GenInfo) -> Self {
        self.info = info;
        self
    }

    /// Fails on the first signature shared by two calls.
    pub fn check_signatures(&self) -> Result<()> {
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for call in &self.project.calls {
            if let Some(first) = seen.insert(&call.signature, &call.name) {
                return Err(GenError::DuplicateSignature {
                    signature: call.signature.clone(),
                    first: first.to_string(),
                    second: call.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Fails on a struct left out of `struct_order`.
    pub fn check_struct_order(&self) -> Result<()> {
        for name in self.project.structs.keys() {
            if !self.project.struct_order.contains(name) {
                return Err(GenError::InvalidModel {
                    context: format!("struct {name}"),
                    reason: "missing from struct_order".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Generates every artifact of the project, in memory.
    pub fn generate(&self) -> Result<GeneratedCode> {
        self.check_signatures()?;
        self.check_struct_order()?;
        let ctx = GenContext::new(self.project, &self.catalog, &self.options, &self.info)?;

        let mut generators: Vec<Box<dyn Codegen + '_>> = Vec::new();
        for couplet in self.project.couplets.values() {
            generators.push(Box::new(CoupletGenerator::new(couplet)));
        }
        for name in &self.project.struct_order {
            let def = self
                .project
                .struct_def(name)
                .ok_or_else(|| GenError::ReferenceNotFound {
                    reference: name.clone(),
                    context: "struct_order".to_string(),
                    missing: "struct".to_string(),
                })?;
            generators.push(Box::new(RecordGenerator::new(def)));
        }
        if !self.project.calls.is_empty() {
            generators.push(Box::new(ClientGenerator));
            generators.push(Box::new(ServerGenerator::new(Flavor::SYNC)));
            if self.options.async_variant {
                generators.push(Box::new(ServerGenerator::new(Flavor::ASYNC)));
            }
        }

        let mut code = GeneratedCode::default();
        let mut owners: BTreeMap<String, &str> = BTreeMap::new();
        owners.insert(MODULE_INDEX.to_string(), "module index");
        for generator in &generators {
            tracing::debug!("running {} generator", generator.name());
            let unit = generator.generate(&ctx)?;
            for file in &unit.files {
                if let Some(first) = owners.insert(file.path.clone(), generator.name()) {
                    return Err(GenError::InvalidModel {
                        context: format!("output file {}", file.path),
                        reason: format!(
                            "written by both the {first} and the {} generator",
                            generator.name()
                        ),
                    });
                }
            }
            code.extend(unit);
        }
        code.files.push(self.module_index(&code));

        tracing::info!(
            "generated {} files for project {}",
            code.files.len(),
            self.project.name
        );
        Ok(code)
    }

    fn module_index(&self, code: &GeneratedCode) -> GeneratedFile {
        let mut content = self.info.banner();
        for file in &code.files {
            content.push_str(&format!("pub mod {};\n", file.module));
        }
        content.push('\n');
        for file in &code.files {
            content.push_str(&format!("pub use {}::*;\n", file.module));
        }
        GeneratedFile {
            path: MODULE_INDEX.to_string(),
            module: "mod".to_string(),
            content,
        }
    }

    /// Writes `code` under `dest`, creating it if needed.
    ///
    /// Every file is staged in a temporary file first; targets are replaced
    /// only once all of them were staged.
    pub fn write(&self, code: &GeneratedCode, dest: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dest).map_err(|e| GenError::io(dest, e))?;

        let mut staged = Vec::with_capacity(code.files.len());
        for file in &code.files {
            let target = dest.join(&file.path);
            let mut tmp = NamedTempFile::new_in(dest).map_err(|e| GenError::io(dest, e))?;
            tmp.write_all(file.content.as_bytes())
                .map_err(|e| GenError::io(tmp.path(), e))?;
            staged.push((tmp, target));
        }

        let total = staged.len();
        let mut written = Vec::with_capacity(total);
        for (tmp, target) in staged {
            tmp.persist(&target).map_err(|e| match written.len() {
                0 => GenError::io(&target, e.error),
                n => GenError::PartialWrite {
                    path: target.clone(),
                    written: n,
                    total,
                    source: e.error,
                },
            })?;
            tracing::info!("wrote {}", target.display());
            written.push(target);
        }
        Ok(written)
    }

    /// Generates and writes in one go.
    pub fn run(&self, dest: &Path) -> Result<Vec<PathBuf>> {
        let code = self.generate()?;
        self.write(&code, dest)
    }

    /// Deletes the regular files in `dir` whose extension is in `extensions`.
    ///
    /// Subdirectories are left alone. A missing `dir` cleans nothing.
    pub fn clean(dir: &Path, extensions: &[&str]) -> Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in std::fs::read_dir(dir).map_err(|e| GenError::io(dir, e))? {
            let entry = entry.map_err(|e| GenError::io(dir, e))?;
            let path = entry.path();
            let is_file = entry
                .file_type()
                .map_err(|e| GenError::io(&path, e))?
                .is_file();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext));
            if is_file && matches {
                std::fs::remove_file(&path).map_err(|e| GenError::io(&path, e))?;
                count += 1;
            }
        }
        tracing::warn!("cleaned {} files in {}", count, dir.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stubgen_ir::{Call, Couplet, CoupletEntry, Field, FieldType, IoKind, Struct};

    fn project() -> Project {
        let mut project = Project {
            name: "Orders".into(),
            struct_order: vec!["Order".into()],
            ..Default::default()
        };
        project.structs.insert(
            "Order".into(),
            Struct {
                name: "Order".into(),
                descr: None,
                fields: vec![Field::new("id", FieldType::Int32)],
            },
        );
        project.couplets.insert(
            "Status".into(),
            Couplet {
                name: "Status".into(),
                ty: FieldType::String,
                entries: vec![CoupletEntry::new("O", "Open")],
            },
        );
        project.calls.push(Call {
            name: "Ping".into(),
            signature: "P1".into(),
            descr: None,
            fields: vec![Field::new("n", FieldType::Int32).io(IoKind::In)],
            returns: None,
            auth: None,
        });
        project
    }

    fn orchestrator(project: &Project, options: Options) -> Orchestrator<'_> {
        Orchestrator::new(project, options).with_info(GenInfo::fixed("2026-01-01 00:00:00 UTC"))
    }

    #[test]
    fn emission_order() {
        let project = project();
        let code = orchestrator(&project, Options::default()).generate().unwrap();
        let paths: Vec<_> = code.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "status.rs",
                "order.rs",
                "orders_client.rs",
                "orders_client_marshaler.rs",
                "orders_direct_client.rs",
                "orders_server.rs",
                "orders_server_marshaler.rs",
                "mod.rs",
            ]
        );
    }

    #[test]
    fn module_index() {
        let project = Project {
            calls: vec![],
            ..project()
        };
        let code = orchestrator(&project, Options::default()).generate().unwrap();
        let index = &code.file("mod.rs").unwrap().content;
        assert!(index.ends_with("pub mod status;\npub mod order;\n\npub use status::*;\npub use order::*;\n"));
    }

    #[test]
    fn async_option_adds_server_variant() {
        let project = project();
        let options = Options {
            async_variant: true,
            ..Options::default()
        };
        let code = orchestrator(&project, options).generate().unwrap();
        assert!(code.file("orders_async_server.rs").is_some());
        assert!(code.file("orders_async_server_marshaler.rs").is_some());
    }

    #[test]
    fn missing_struct_in_order() {
        let mut project = project();
        project.struct_order.push("Customer".into());
        let err = orchestrator(&project, Options::default()).generate().unwrap_err();
        assert!(matches!(err, GenError::ReferenceNotFound { ref reference, .. } if reference == "Customer"));
    }

    #[test]
    fn duplicate_signature_writes_nothing() {
        let mut project = project();
        let mut twin = project.calls[0].clone();
        twin.name = "PingAgain".into();
        project.calls.push(twin);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let err = orchestrator(&project, Options::default()).run(&dest).unwrap_err();
        assert!(matches!(err, GenError::DuplicateSignature { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn write_then_clean() {
        let project = project();
        let dir = tempfile::tempdir().unwrap();
        let written = orchestrator(&project, Options::default()).run(dir.path()).unwrap();
        assert_eq!(written.len(), 8);
        let order = std::fs::read_to_string(dir.path().join("order.rs")).unwrap();
        assert!(order.starts_with("// This file was generated by stubgen"));

        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        std::fs::create_dir(dir.path().join("nested.rs")).unwrap();

        let removed = Orchestrator::clean(dir.path(), GENERATED_EXTENSIONS).unwrap();
        assert_eq!(removed, 8);
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("nested.rs").is_dir());
    }

    #[test]
    fn colliding_file_names() {
        let mut project = project();
        project.structs.insert(
            "Mod".into(),
            Struct {
                name: "Mod".into(),
                descr: None,
                fields: vec![],
            },
        );
        project.struct_order.push("Mod".into());
        let err = orchestrator(&project, Options::default()).generate().unwrap_err();
        assert!(
            matches!(err, GenError::InvalidModel { ref context, .. } if context == "output file mod.rs"),
            "{err}"
        );

        let mut project = self::project();
        project.couplets.insert(
            "Order".into(),
            Couplet {
                name: "Order".into(),
                ty: FieldType::Int32,
                entries: vec![CoupletEntry::new("1", "One")],
            },
        );
        let err = orchestrator(&project, Options::default()).generate().unwrap_err();
        assert!(
            matches!(err, GenError::InvalidModel { ref reason, .. } if reason.contains("couplet") && reason.contains("record")),
            "{err}"
        );
    }

    #[test]
    fn struct_missing_from_order() {
        let mut project = project();
        project.struct_order.clear();
        let err = orchestrator(&project, Options::default()).generate().unwrap_err();
        assert_eq!(err.to_string(), "invalid model (struct Order): missing from struct_order");
    }

    #[test]
    fn failed_rename_reports_partial_write() {
        let project = project();
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("order.rs")).unwrap();

        let err = orchestrator(&project, Options::default()).run(dir.path()).unwrap_err();
        match err {
            GenError::PartialWrite { written, total, ref path, .. } => {
                assert_eq!((written, total), (1, 8));
                assert!(path.ends_with("order.rs"));
            }
            other => panic!("unexpected {other}"),
        }
        assert!(dir.path().join("status.rs").is_file());
    }

    #[test]
    fn clean_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Orchestrator::clean(&dir.path().join("nope"), &["rs"]).unwrap(), 0);
    }
}
