//! generator configuration
//!
//! read from a toml file; the cli overrides individual values.
//!
//! ```toml
//! client_name = "InventoryClient"
//! crate_name = "inventory-client"
//! identifier_pattern = "^(id|uuid)$"
//!
//! [grouping]
//! style = "nouns"
//! nouns = ["firewall", "user"]
//!
//! [scalars.Money]
//! rust_type = "rust_decimal::Decimal"
//! dependency = 'rust_decimal = { version = "1", features = ["serde"] }'
//!
//! [hooks]
//! header = "// generated by gqlkit-codegen, do not edit"
//!
//! [[selections]]
//! name = "user_summary"
//! operation = "getUser"
//! fields = ["id", "profile.email"]
//! ```

use super::hooks::{AddHeaderHook, FilterTypesHook, HookPipeline, RenameTypesHook};
use super::scalars::{ScalarMapping, ScalarRegistry};
use super::topology::GroupingConvention;
use crate::error::{Error, Result};
use crate::selection::DEFAULT_MAX_DEPTH;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// which files a run emits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// models, client, `lib.rs` and (with a crate name) `Cargo.toml`
    #[default]
    Crate,
    /// scalars, enums and one file per model type
    Models,
    /// the client file only
    Client,
}

impl OutputMode {
    pub fn includes_models(self) -> bool {
        matches!(self, OutputMode::Crate | OutputMode::Models)
    }

    pub fn includes_client(self) -> bool {
        matches!(self, OutputMode::Crate | OutputMode::Client)
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "crate" => Ok(OutputMode::Crate),
            "models" => Ok(OutputMode::Models),
            "client" => Ok(OutputMode::Client),
            other => Err(format!(
                "unknown output mode `{other}` (expected crate, models or client)"
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputMode::Crate => "crate",
            OutputMode::Models => "models",
            OutputMode::Client => "client",
        })
    }
}

/// built-in hooks enabled from the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HooksConfig {
    /// prepended to every generated `.rs` file
    pub header: Option<String>,
    pub filter: Option<FilterTypesHook>,
    /// old type name to new type name
    pub rename: BTreeMap<String, String>,
}

impl HooksConfig {
    /// pipeline with the configured built-ins: rename, then filter, then header
    pub fn pipeline(&self) -> HookPipeline {
        let mut pipeline = HookPipeline::new();
        if !self.rename.is_empty() {
            pipeline.add_pre(RenameTypesHook::new(self.rename.clone()));
        }
        if let Some(filter) = &self.filter {
            pipeline.add_pre(filter.clone());
        }
        if let Some(header) = &self.header {
            pipeline.add_post(AddHeaderHook::new(header.clone()));
        }
        pipeline
    }
}

/// named custom selection planned at generation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionPreset {
    /// snake-case constructor name in the generated `selections` module
    pub name: String,
    /// operation field, dotted through namespace fields (`firewall.addRule`)
    pub operation: String,
    pub fields: Vec<String>,
}

/// everything one generation run needs besides the schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// root client struct name
    pub client_name: String,
    /// emit a `Cargo.toml` for a crate of this name
    pub crate_name: Option<String>,
    /// path dependency on the runtime crate instead of the published version
    pub runtime_path: Option<String>,
    pub mode: OutputMode,
    /// same-named templates here replace the built-in ones
    pub template_dir: Option<PathBuf>,
    pub max_depth: usize,
    /// field names treated as identifiers in minimal selections
    pub identifier_pattern: String,
    /// object type suffixes marking namespace types
    pub namespace_suffixes: Vec<String>,
    pub grouping: GroupingConvention,
    /// scalar mappings added to (or replacing) the defaults
    pub scalars: BTreeMap<String, ScalarMapping>,
    pub hooks: HooksConfig,
    pub selections: Vec<SelectionPreset>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            client_name: "GraphQlClient".to_string(),
            crate_name: None,
            runtime_path: None,
            mode: OutputMode::default(),
            template_dir: None,
            max_depth: DEFAULT_MAX_DEPTH,
            identifier_pattern: "^id$".to_string(),
            namespace_suffixes: vec!["Queries".to_string(), "Mutations".to_string()],
            grouping: GroupingConvention::default(),
            scalars: BTreeMap::new(),
            hooks: HooksConfig::default(),
            selections: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// load a toml config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        Self::from_toml(&text)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| Error::Config(err.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_type_ident(&self.client_name) {
            return Err(Error::Config(format!(
                "client_name `{}` is not a valid rust type name",
                self.client_name
            )));
        }
        if self.max_depth == 0 {
            return Err(Error::Config("max_depth must be at least 1".to_string()));
        }
        self.identifier()?;
        for preset in &self.selections {
            if !is_fn_ident(&preset.name) {
                return Err(Error::Config(format!(
                    "selection name `{}` is not a valid rust function name",
                    preset.name
                )));
            }
        }
        Ok(())
    }

    /// compiled identifier pattern
    pub fn identifier(&self) -> Result<Regex> {
        Regex::new(&self.identifier_pattern).map_err(|err| {
            Error::Config(format!(
                "invalid identifier_pattern `{}`: {err}",
                self.identifier_pattern
            ))
        })
    }

    /// default registry with the configured mappings applied
    pub fn scalar_registry(&self) -> ScalarRegistry {
        let mut registry = ScalarRegistry::new();
        for (name, mapping) in &self.scalars {
            registry.register(name.clone(), mapping.clone());
        }
        registry
    }
}

fn is_type_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_fn_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !super::naming::is_rust_keyword(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::from_toml("").unwrap();
        assert_eq!(config.client_name, "GraphQlClient");
        assert_eq!(config.mode, OutputMode::Crate);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(config.identifier().unwrap().is_match("id"));
        assert_eq!(config.grouping, GroupingConvention::default());
    }

    #[test]
    fn test_full_config() {
        let config = GeneratorConfig::from_toml(
            r#"
            client_name = "InventoryClient"
            crate_name = "inventory-client"
            mode = "models"

            [grouping]
            style = "nouns"
            nouns = ["firewall"]

            [scalars.Money]
            rust_type = "rust_decimal::Decimal"
            dependency = 'rust_decimal = "1"'

            [hooks]
            header = "// generated"

            [hooks.filter]
            exclude_prefix = "_"

            [hooks.rename]
            User = "Account"

            [[selections]]
            name = "user_summary"
            operation = "getUser"
            fields = ["id"]
            "#,
        )
        .unwrap();

        assert_eq!(config.client_name, "InventoryClient");
        assert_eq!(config.mode, OutputMode::Models);
        assert_eq!(
            config.grouping,
            GroupingConvention::Nouns {
                nouns: vec!["firewall".to_string()]
            }
        );
        let registry = config.scalar_registry();
        assert_eq!(
            registry.get("Money").unwrap().rust_type,
            "rust_decimal::Decimal"
        );
        assert!(registry.contains("DateTime"));
        assert_eq!(config.hooks.filter.as_ref().unwrap().exclude_prefix.as_deref(), Some("_"));
        assert_eq!(config.selections[0].fields, vec!["id".to_string()]);
        assert!(!config.hooks.pipeline().is_empty());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            GeneratorConfig::from_toml("client_name = \"lower\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_toml("identifier_pattern = \"(\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            GeneratorConfig::from_toml("unknown = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_output_mode_from_str() {
        assert_eq!("client".parse::<OutputMode>().unwrap(), OutputMode::Client);
        assert!("everything".parse::<OutputMode>().is_err());
        assert!(OutputMode::Crate.includes_models());
        assert!(!OutputMode::Models.includes_client());
    }
}
