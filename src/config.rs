use crate::mapping::DEFAULT_PROPERTIES;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Helper calls whose string arguments are always checked.
pub const DEFAULT_CLASS_HELPERS: [&str; 3] = ["classnames", "clsx", "cn"];

/// Properties checked by the strict preset.
pub const STRICT_PROPERTIES: [&str; 6] = ["text", "bg", "border", "outline", "divide", "ring"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warn => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Recommended,
    Strict,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "recommended" => Ok(Preset::Recommended),
            "strict" => Ok(Preset::Strict),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }
}

/// Resolved rule options, shared read-only by every fragment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOptions {
    pub properties: Vec<String>,
    pub mappings: BTreeMap<String, String>,
    pub autofix: bool,
    pub severity: Severity,
    pub custom_prefixes: Vec<String>,
    /// Report interpolated templates only when their static text looks
    /// like utility classes.
    pub dynamic_heuristic: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            properties: DEFAULT_PROPERTIES.iter().map(|p| p.to_string()).collect(),
            mappings: BTreeMap::new(),
            autofix: true,
            severity: Severity::Error,
            custom_prefixes: Vec::new(),
            dynamic_heuristic: false,
        }
    }
}

impl RuleOptions {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Recommended => Self::default(),
            Preset::Strict => Self {
                properties: STRICT_PROPERTIES.iter().map(|p| p.to_string()).collect(),
                autofix: true,
                ..Self::default()
            },
        }
    }

    /// Whether `callee` is a class combinator helper.
    pub fn is_class_helper(&self, callee: &str) -> bool {
        DEFAULT_CLASS_HELPERS.contains(&callee)
            || self.custom_prefixes.iter().any(|prefix| prefix == callee)
    }
}

/// On-disk configuration. Every key is optional and overrides the preset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub properties: Option<Vec<String>>,
    #[serde(default)]
    pub mappings: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub autofix: Option<bool>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default, alias = "customPrefixes")]
    pub custom_prefixes: Option<Vec<String>>,
    #[serde(default, alias = "dynamicHeuristic")]
    pub dynamic_heuristic: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unknown preset '{0}' (expected 'recommended' or 'strict')")]
    UnknownPreset(String),
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves options from the file's preset (or `fallback_preset`) and the
/// keys the file sets.
pub fn resolve_options(config: &Config, fallback_preset: Preset) -> RuleOptions {
    let mut options = RuleOptions::preset(config.preset.unwrap_or(fallback_preset));

    if let Some(properties) = &config.properties {
        options.properties = properties.clone();
    }
    if let Some(mappings) = &config.mappings {
        options.mappings = mappings.clone();
    }
    if let Some(autofix) = config.autofix {
        options.autofix = autofix;
    }
    if let Some(severity) = config.severity {
        options.severity = severity;
    }
    if let Some(prefixes) = &config.custom_prefixes {
        options.custom_prefixes = prefixes.clone();
    }
    if let Some(heuristic) = config.dynamic_heuristic {
        options.dynamic_heuristic = heuristic;
    }

    options
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError, Preset, RuleOptions, Severity, load, resolve_options};
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("darkpair.toml");
        fs::write(&path, text).expect("config should be written");
        path
    }

    #[test]
    fn empty_config_resolves_to_recommended() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "");
        let config = load(&path).expect("config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(
            resolve_options(&config, Preset::Recommended),
            RuleOptions::default()
        );
        assert_eq!(RuleOptions::default().properties.len(), 12);
    }

    #[test]
    fn loads_all_options() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
preset = "strict"
properties = ["text", "bg"]
autofix = false
severity = "warn"
customPrefixes = ["tw"]
dynamic_heuristic = true

[mappings]
"red-500" = "red-700"
"#,
        );
        let options = resolve_options(&load(&path).expect("config should parse"), Preset::Recommended);
        assert_eq!(options.properties, vec!["text", "bg"]);
        assert_eq!(options.mappings["red-500"], "red-700");
        assert!(!options.autofix);
        assert_eq!(options.severity, Severity::Warn);
        assert_eq!(options.custom_prefixes, vec!["tw"]);
        assert!(options.dynamic_heuristic);
        assert!(options.is_class_helper("tw"));
        assert!(options.is_class_helper("clsx"));
        assert!(!options.is_class_helper("twMerge"));
    }

    #[test]
    fn strict_preset_narrows_properties() {
        let options = RuleOptions::preset(Preset::Strict);
        assert_eq!(
            options.properties,
            vec!["text", "bg", "border", "outline", "divide", "ring"]
        );
        assert!(options.autofix);

        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "autofix = false");
        let options = resolve_options(&load(&path).expect("config should parse"), Preset::Strict);
        assert_eq!(options.properties.len(), 6);
        assert!(!options.autofix);
    }

    #[test]
    fn rejects_unknown_keys_and_presets() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "colour = true");
        assert!(matches!(load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            "loose".parse::<Preset>(),
            Err(ConfigError::UnknownPreset(_))
        ));
        assert_eq!("strict".parse::<Preset>().ok(), Some(Preset::Strict));
    }

    #[test]
    fn reports_missing_file() {
        let dir = TempDir::new().expect("temp dir");
        let result = load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
