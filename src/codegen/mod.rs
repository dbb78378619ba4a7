//! client generator
//!
//! turns a graphql schema (file, directory or archive) into rust source:
//! model types, enums, scalar aliases and a namespaced client built on the
//! runtime in this crate.
//!
//! ```no_run
//! use gqlkit::codegen::{Generator, GeneratorConfig};
//! use std::path::Path;
//!
//! # fn example() -> gqlkit::Result<()> {
//! let config = GeneratorConfig::from_file(Path::new("gqlkit.toml"))?;
//! let report = Generator::new(config)?.generate(Path::new("schema/"), Path::new("generated/"))?;
//! for warning in &report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod emit;
pub mod hooks;
pub mod ir;
pub mod loader;
pub mod naming;
pub mod scalars;
pub mod topology;

pub use builder::{BuildOptions, IrBuilder};
pub use config::{GeneratorConfig, HooksConfig, OutputMode, SelectionPreset};
pub use emit::{Emission, Emitter, Templates};
pub use hooks::{
    AddHeaderHook, FilterTypesHook, FnPostHook, FnPreHook, HookPipeline, PostHook, PreHook,
    RenameTypesHook,
};
pub use ir::{Document, Operation, TypeDef, TypeKind, TypeRef, Warning};
pub use loader::{load_schema, LoadedSchema, SchemaFile};
pub use scalars::{ScalarMapping, ScalarRegistry};
pub use topology::{GroupingConvention, Topology};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// result of a generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// written files, absolute or relative to the working directory
    pub files: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

/// runs the generation stages: load, build, pre-hooks, topology, plan,
/// render, post-hooks, write
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    hooks: HookPipeline,
}

impl Generator {
    /// generator with the built-in hooks the config enables
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let hooks = config.hooks.pipeline();
        Ok(Self { config, hooks })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// register additional hooks; they run after the configured ones
    pub fn hooks_mut(&mut self) -> &mut HookPipeline {
        &mut self.hooks
    }

    pub fn with_pre_hook(mut self, hook: impl PreHook + 'static) -> Self {
        self.hooks.add_pre(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: impl PostHook + 'static) -> Self {
        self.hooks.add_post(hook);
        self
    }

    /// generate from `schema` and write the files under `out_dir`
    pub fn generate(&self, schema: &Path, out_dir: &Path) -> Result<GenerationReport> {
        let loaded = load_schema(schema)?;
        let (emission, warnings) = self.render(&loaded)?;
        let files = emission.flush(out_dir)?;
        tracing::info!(
            out_dir = %out_dir.display(),
            files = files.len(),
            warnings = warnings.len(),
            "generation finished"
        );
        Ok(GenerationReport { files, warnings })
    }

    /// every stage except writing
    pub fn render(&self, loaded: &LoadedSchema) -> Result<(Emission, Vec<Warning>)> {
        let registry = self.config.scalar_registry();
        let options = BuildOptions {
            namespace_suffixes: self.config.namespace_suffixes.clone(),
        };
        let document = IrBuilder::new(&registry, options).build(loaded)?;
        tracing::info!(
            types = document.types.len(),
            operations = document.operations.len(),
            "built schema document"
        );

        let document = self.hooks.run_pre(document)?;
        let topology = topology::resolve(&document, &self.config.grouping)?;
        let shape = document.shape(&self.config.identifier()?);
        let templates = Templates::load(self.config.template_dir.as_deref())?;

        let (emission, emit_warnings) =
            Emitter::new(&document, &topology, &shape, &self.config, &templates).emit()?;
        let emission = emission.apply_post_hooks(&self.hooks)?;

        let mut warnings = document.warnings.clone();
        for warning in emit_warnings {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
        for warning in &warnings {
            tracing::warn!(%warning, "generation warning");
        }
        Ok((emission, warnings))
    }
}
