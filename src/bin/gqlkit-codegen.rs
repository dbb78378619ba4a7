//! generate a typed graphql client from a schema
//!
//! the schema may be a single sdl file, a directory of fragments, or a
//! `.zip`, `.tar` or `.tar.gz` archive of them. settings come from an
//! optional toml config; flags override it.

use anyhow::{Context, Result};
use clap::Parser;
use gqlkit::codegen::{Generator, GeneratorConfig, OutputMode};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gqlkit-codegen", version, about = "generate a typed graphql client from a schema")]
struct Args {
    /// schema file, directory or archive
    #[arg(long, short = 's')]
    schema: PathBuf,

    /// output directory
    #[arg(long, short = 'o')]
    out: PathBuf,

    /// toml generator config
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// crate, models or client
    #[arg(long)]
    mode: Option<OutputMode>,

    /// root client struct name
    #[arg(long)]
    client_name: Option<String>,

    /// also emit a Cargo.toml for a crate of this name
    #[arg(long)]
    crate_name: Option<String>,

    /// depend on the runtime by path instead of by version
    #[arg(long)]
    runtime_path: Option<String>,

    /// directory with template overrides
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// more logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_file(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => GeneratorConfig::default(),
        };
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(name) = &self.client_name {
            config.client_name = name.clone();
        }
        if let Some(name) = &self.crate_name {
            config.crate_name = Some(name.clone());
        }
        if let Some(path) = &self.runtime_path {
            config.runtime_path = Some(path.clone());
        }
        if let Some(dir) = &self.template_dir {
            config.template_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.generator_config()?;
    let generator = Generator::new(config).context("invalid generator config")?;
    let report = generator
        .generate(&args.schema, &args.out)
        .with_context(|| format!("failed to generate from {}", args.schema.display()))?;

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "wrote {} files to {}",
        report.files.len(),
        args.out.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("codegen failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
