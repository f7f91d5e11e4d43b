//! Runs the generator over the sample projects and mounts the output as
//! modules of this crate.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use stubgen_codegen_lib::orchestrator::{GENERATED_EXTENSIONS, MODULE_INDEX};
use stubgen_codegen_lib::{GenInfo, Options, Orchestrator};
use stubgen_ir::Project;

#[path = "src/fixture.rs"]
mod fixture;

use fixture::{FIXTURES, TIMESTAMP};

fn main() -> anyhow::Result<()> {
    let manifest = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out = PathBuf::from(env::var("OUT_DIR")?);
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/fixture.rs");

    let mut mounts = String::new();
    for f in FIXTURES {
        let schema = manifest.join(f.schema);
        println!("cargo:rerun-if-changed={}", schema.display());
        let project = Project::from_json(&fs::read_to_string(&schema)?)?;

        let options = match f.options {
            Some(path) => {
                let path = manifest.join(path);
                println!("cargo:rerun-if-changed={}", path.display());
                Options::load(&path)?
            }
            None => Options::default(),
        };

        let dest = out.join(f.module);
        Orchestrator::clean(&dest, GENERATED_EXTENSIONS)?;
        Orchestrator::new(&project, options)
            .with_info(GenInfo::fixed(TIMESTAMP))
            .run(&dest)?;

        let index = dest.join(MODULE_INDEX).display().to_string();
        writeln!(mounts, "#[path = {index:?}]\npub mod {};", f.module)?;
    }
    fs::write(out.join("generated.rs"), mounts)?;
    Ok(())
}
