//! Parser for Guards manifests (YAML/TOML formats).
//!
//! A manifest carries everything a host hands the engine at load time: the
//! configuration snapshot, alias mappings, subtype declarations, extra
//! relation facts and the guard declarations found by its scanner.
//!
//! # Example
//!
//! ```rust
//! use guards_parser::parse_yaml;
//!
//! let yaml = r#"
//! config:
//!   mode: exception
//! aliases:
//!   javax.annotation.Nonnull: NotNull
//! declarations:
//!   - kind: Range
//!     site: "Thermostat::set#0"
//!     type: int32
//!     args: { min: 0, max: 10 }
//! "#;
//!
//! let manifest = parse_yaml(yaml).expect("Failed to parse manifest");
//! assert_eq!(manifest.declarations.len(), 1);
//! ```

use guards_core::{DeclarationSource, EngineConfig, RelationFact};
use guards_engine::{Engine, EngineBuilder, RegistryError, ResolutionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during manifest parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,

    /// The manifest's aliases or hierarchy could not be applied
    #[error("Invalid manifest: {0}")]
    RegistryError(#[from] RegistryError),
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported manifest file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
}

/// Load-time input for one engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardManifest {
    /// Engine configuration
    pub config: EngineConfig,

    /// External identifier → guard kind
    pub aliases: BTreeMap<String, String>,

    /// Reference type → direct supertype
    pub hierarchy: BTreeMap<String, String>,

    /// Relation facts on top of those declared by handlers
    pub relations: Vec<RelationFact>,

    /// Guard declarations to observe
    pub declarations: Vec<DeclarationSource>,
}

/// An engine built from a manifest, with the declarations that failed to arm.
#[derive(Debug)]
pub struct LoadedManifest {
    /// Engine holding every declaration of the manifest
    pub engine: Engine,

    /// Resolution failures, in declaration order
    pub failures: Vec<ResolutionError>,
}

impl GuardManifest {
    /// Returns an engine builder carrying this manifest's configuration,
    /// aliases, hierarchy and relations.
    ///
    /// Custom handlers can be added to the builder before it is built.
    pub fn engine_builder(&self) -> EngineBuilder {
        let mut builder = Engine::builder()
            .config(self.config.clone())
            .aliases(self.aliases.iter().map(|(a, k)| (a.as_str(), k.as_str())));
        for (name, parent) in &self.hierarchy {
            builder = builder.subtype(name, parent);
        }
        for fact in &self.relations {
            builder = builder.relation(fact.clone());
        }
        builder
    }

    /// Observes this manifest's declarations on an engine.
    pub fn observe_on(&self, engine: &Engine) -> Vec<ResolutionError> {
        engine
            .observe_all(self.declarations.iter().cloned())
            .into_iter()
            .filter_map(std::result::Result::err)
            .collect()
    }

    /// Builds an engine from this manifest and observes its declarations.
    pub fn load(&self) -> Result<LoadedManifest> {
        let engine = self.engine_builder().build()?;
        let failures = self.observe_on(&engine);
        Ok(LoadedManifest { engine, failures })
    }
}

/// Parse a manifest from a YAML string.
///
/// # Arguments
///
/// * `content` - The YAML string to parse
pub fn parse_yaml(content: &str) -> Result<GuardManifest> {
    let manifest: GuardManifest = serde_yaml_ng::from_str(content)?;
    debug!(declarations = manifest.declarations.len(), "Parsed YAML manifest");
    Ok(manifest)
}

/// Parse a manifest from a TOML string.
///
/// # Example
///
/// ```rust
/// use guards_parser::parse_toml;
///
/// let toml = r#"
/// [config]
/// widen_to_long = false
///
/// [[declarations]]
/// kind = "NotNull"
/// site = "Repo::find#return"
/// type = "Object"
/// "#;
///
/// let manifest = parse_toml(toml).unwrap();
/// assert!(!manifest.config.widen_to_long);
/// ```
pub fn parse_toml(content: &str) -> Result<GuardManifest> {
    let manifest: GuardManifest =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    debug!(declarations = manifest.declarations.len(), "Parsed TOML manifest");
    Ok(manifest)
}

/// Detect the manifest format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `ManifestFormat::Yaml`
/// * `.toml` → `ManifestFormat::Toml`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<ManifestFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(ManifestFormat::Yaml),
        "toml" => Ok(ManifestFormat::Toml),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a manifest from a file with automatic format detection.
///
/// ```no_run
/// use guards_parser::parse_file;
/// use std::path::Path;
///
/// let manifest = parse_file(Path::new("guards/app.yml")).unwrap();
/// println!("{} declarations", manifest.declarations.len());
/// ```
pub fn parse_file(path: &Path) -> Result<GuardManifest> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    let manifest = match format {
        ManifestFormat::Yaml => parse_yaml(&content)?,
        ManifestFormat::Toml => parse_toml(&content)?,
    };
    info!(
        path = %path.display(),
        format = ?format,
        declarations = manifest.declarations.len(),
        "Loaded guard manifest"
    );
    Ok(manifest)
}

/// Parse a manifest file and build its engine.
pub fn load_file(path: &Path) -> Result<LoadedManifest> {
    parse_file(path)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use guards_core::{
        DeclarationSite, EnforcementMode, PrimitiveType, Relation, RelationKind, ValueType,
    };
    use pretty_assertions::assert_eq;

    const FULL_YAML: &str = r#"
config:
  mode: assertion
  assertions_enabled: true
  unbox: false
aliases:
  javax.annotation.Nonnull: NotNull
hierarchy:
  Money: Number
relations:
  - from: Positive
    relation: inconsistentWith
    to: Negative
declarations:
  - kind: javax.annotation.Nonnull
    site: "Repo::find#return"
    type: Object
  - kind: Range
    site: "Thermostat::set#0"
    type: int32
    args:
      min: 0
      max: 10
"#;

    #[test]
    fn test_parse_full_yaml() {
        let manifest = parse_yaml(FULL_YAML).expect("Failed to parse valid YAML");

        assert_eq!(manifest.config.mode, EnforcementMode::Assertion);
        assert!(manifest.config.assertions_enabled);
        assert!(!manifest.config.unbox);
        assert!(manifest.config.widen);
        assert_eq!(
            manifest.aliases.get("javax.annotation.Nonnull").map(String::as_str),
            Some("NotNull")
        );
        assert_eq!(
            manifest.relations,
            vec![RelationFact::new("Positive", Relation::InconsistentWith, "Negative")]
        );

        let range = &manifest.declarations[1];
        assert_eq!(range.site, DeclarationSite::parameter("Thermostat::set", 0));
        assert_eq!(range.static_type, ValueType::Primitive(PrimitiveType::Int32));
        assert_eq!(range.args.int("max").unwrap(), 10);
    }

    #[test]
    fn test_parse_empty_manifest() {
        let manifest = parse_yaml("{}").unwrap();
        assert_eq!(manifest, GuardManifest::default());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = parse_yaml("declarations: [ { kind: Range, site: nope, type: int32 } ]");
        assert!(matches!(result.unwrap_err(), ParserError::YamlError(_)));
    }

    #[test]
    fn test_parse_toml_with_declarations() {
        let toml = r#"
[config]
mode = "disabled"

[aliases]
"org.jetbrains.annotations.NotNull" = "NotNull"

[[declarations]]
kind = "Matches"
site = "Zip::parse#0"
type = "String"
args = { pattern = "\\d{5}" }
"#;

        let manifest = parse_toml(toml).expect("Failed to parse TOML");
        assert_eq!(manifest.config.mode, EnforcementMode::Disabled);
        assert_eq!(manifest.declarations[0].args.string("pattern").unwrap(), r"\d{5}");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse_toml("[[[invalid syntax");
        assert!(matches!(result.unwrap_err(), ParserError::TomlError(_)));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("guards.yaml")).unwrap(), ManifestFormat::Yaml);
        assert_eq!(detect_format(Path::new("guards.YML")).unwrap(), ManifestFormat::Yaml);
        assert_eq!(detect_format(Path::new("guards.toml")).unwrap(), ManifestFormat::Toml);
        assert!(matches!(
            detect_format(Path::new("guards.json")).unwrap_err(),
            ParserError::UnsupportedFormat(_)
        ));
        assert!(matches!(
            detect_format(Path::new("guards")).unwrap_err(),
            ParserError::InvalidExtension
        ));
    }

    #[test]
    fn test_load_builds_engine() {
        let loaded = parse_yaml(FULL_YAML).unwrap().load().unwrap();

        assert!(loaded.failures.is_empty());
        assert_eq!(loaded.engine.declarations().len(), 2);
        assert_eq!(
            loaded.engine.relate("Positive", "Negative"),
            RelationKind::Inconsistent
        );
        assert_eq!(loaded.engine.lattice().hierarchy().hops("Money", "Number"), Some(1));
    }

    #[test]
    fn test_load_rejects_alias_to_unknown_kind() {
        let manifest = parse_yaml("aliases: { x.Foo: Nope }").unwrap();
        assert!(matches!(
            manifest.load().unwrap_err(),
            ParserError::RegistryError(RegistryError::UnknownAliasTarget { .. })
        ));
    }
}
