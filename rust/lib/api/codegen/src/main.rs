//! `stubgen`: generates Rust records, couplets and RPC stubs from a project IR.
//!
//! Usage:
//!   stubgen --project orders.json --output src/gen [--options stubgen.toml] [--async] [--clean]
//!
//! `--clean` removes previously generated `.rs` files from the output
//! directory before writing; without `--project` it only cleans.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use stubgen_codegen_lib::orchestrator::GENERATED_EXTENSIONS;
use stubgen_codegen_lib::{Options, Orchestrator};
use stubgen_ir::Project;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stubgen", about = "Generate Rust records and RPC stubs from a project IR")]
struct Cli {
    /// Project IR (JSON).
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long)]
    output: PathBuf,

    /// Generator options (TOML).
    #[arg(long)]
    options: Option<PathBuf>,

    /// Also generate the async server variant.
    #[arg(long = "async")]
    async_variant: bool,

    /// Delete previously generated files in the output directory first.
    #[arg(long)]
    clean: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if !cli.clean && cli.project.is_none() {
        anyhow::bail!("nothing to do: pass --project, --clean or both");
    }

    if cli.clean {
        Orchestrator::clean(&cli.output, GENERATED_EXTENSIONS)
            .with_context(|| format!("failed to clean {}", cli.output.display()))?;
    }

    let Some(project_path) = &cli.project else {
        return Ok(());
    };

    let mut options = match &cli.options {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    if cli.async_variant {
        options.async_variant = true;
    }

    let project = load_project(project_path)?;
    info!("Generating {} into {}", project.name, cli.output.display());
    let written = Orchestrator::new(&project, options)
        .run(&cli.output)
        .with_context(|| format!("generation failed for {}", project_path.display()))?;
    info!("Done, {} files written", written.len());
    Ok(())
}

fn load_project(path: &Path) -> anyhow::Result<Project> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read project {}", path.display()))?;
    Project::from_json(&text).with_context(|| format!("invalid project IR in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "name": "Orders",
        "struct_order": ["Order"],
        "structs": {
            "Order": {
                "name": "Order",
                "fields": [{ "name": "id", "type": "int32" }]
            }
        },
        "calls": [{
            "name": "GetOrder",
            "signature": "GO1",
            "fields": [{ "name": "id", "type": "int32", "io": "in" }],
            "returns": { "type": "string" }
        }]
    }"#;

    fn cli(dir: &Path, args: &[&str]) -> Cli {
        let output = dir.join("out");
        let mut argv = vec!["stubgen", "--output", output.to_str().unwrap()];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn generates_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("orders.json");
        std::fs::write(&project, PROJECT).unwrap();

        run(&cli(dir.path(), &["--project", project.to_str().unwrap(), "--async"])).unwrap();
        let out = dir.path().join("out");
        assert!(out.join("order.rs").exists());
        assert!(out.join("orders_server_marshaler.rs").exists());
        assert!(out.join("orders_async_server_marshaler.rs").exists());
        assert!(out.join("mod.rs").exists());
    }

    #[test]
    fn clean_only() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("stale.rs"), "").unwrap();

        run(&cli(dir.path(), &["--clean"])).unwrap();
        assert!(!out.join("stale.rs").exists());
    }

    #[test]
    fn nothing_to_do() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&cli(dir.path(), &[])).is_err());
    }

    #[test]
    fn bad_project_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("broken.json");
        std::fs::write(&project, "{ not json").unwrap();

        let err = run(&cli(dir.path(), &["--project", project.to_str().unwrap()])).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
