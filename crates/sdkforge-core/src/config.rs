use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

/// Top-level project configuration loaded from `.sdkforge.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SdkforgeConfig {
    pub input: Option<String>,
    pub output: String,
    /// Python package name (defaults to the snake-cased spec title).
    pub package_name: Option<String>,
    pub target_version: TargetVersion,
    /// Extra headers sent when fetching a remote spec, `Name: Value`.
    pub headers: Vec<String>,
    pub naming: NamingConfig,
    pub group_by: GroupBy,
    pub client: ClientConfig,
}

impl Default for SdkforgeConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: "generated_sdk".to_string(),
            package_name: None,
            target_version: TargetVersion::default(),
            headers: Vec::new(),
            naming: NamingConfig::default(),
            group_by: GroupBy::Tag,
            client: ClientConfig::default(),
        }
    }
}

/// Naming strategy and aliases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub strategy: NamingStrategy,
    /// Map from resolved operation name (operationId or route-derived) to custom alias.
    pub aliases: IndexMap<String, String>,
}

/// How operation names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    #[default]
    UseOperationId,
    UseRouteBased,
}

/// How operations are bucketed into modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// First declared tag.
    #[default]
    Tag,
    /// First path segment.
    Route,
}

/// Client generation options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
}

/// Target language version, `MAJOR.MINOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct TargetVersion {
    pub major: u32,
    pub minor: u32,
}

impl TargetVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// `X | Y` unions and `X | None` optionals.
    pub fn supports_union_syntax(&self) -> bool {
        *self >= Self::new(3, 10)
    }

    /// `list[T]` / `dict[K, V]` without importing from `typing`.
    pub fn supports_builtin_generics(&self) -> bool {
        *self >= Self::new(3, 9)
    }
}

impl Default for TargetVersion {
    fn default() -> Self {
        Self::new(3, 13)
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for TargetVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidTargetVersion(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for TargetVersion {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for TargetVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("invalid target version `{0}`, expected MAJOR.MINOR")]
    InvalidTargetVersion(String),
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".sdkforge.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<SdkforgeConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# sdkforge configuration
# input: openapi.yaml
output: generated_sdk
# package_name: petstore_client   # defaults to the snake-cased spec title
target_version: "3.13"            # oldest Python the client must run on

# headers:                        # sent when input is a URL
#   - "Authorization: Bearer ..."

naming:
  strategy: use_operation_id      # use_operation_id | use_route_based
  aliases: {}
    # createChatCompletion: chat  # operationId → custom name

group_by: tag                     # tag | route

client:
  base_url: null                  # e.g. https://api.example.com
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SdkforgeConfig::default();
        assert_eq!(config.input, None);
        assert_eq!(config.output, "generated_sdk");
        assert_eq!(config.target_version, TargetVersion::new(3, 13));
        assert_eq!(config.naming.strategy, NamingStrategy::UseOperationId);
        assert!(config.naming.aliases.is_empty());
        assert_eq!(config.group_by, GroupBy::Tag);
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
input: spec.yaml
output: out
package_name: acme
target_version: "3.8"
headers:
  - "X-Token: abc"
naming:
  strategy: use_route_based
  aliases:
    createChatCompletion: chat
    listModels: models
group_by: route
client:
  base_url: https://api.example.com
"#;
        let config: SdkforgeConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.input.as_deref(), Some("spec.yaml"));
        assert_eq!(config.output, "out");
        assert_eq!(config.package_name.as_deref(), Some("acme"));
        assert_eq!(config.target_version, TargetVersion::new(3, 8));
        assert_eq!(config.headers, vec!["X-Token: abc".to_string()]);
        assert_eq!(config.naming.strategy, NamingStrategy::UseRouteBased);
        assert_eq!(config.naming.aliases["createChatCompletion"], "chat");
        assert_eq!(config.group_by, GroupBy::Route);
        assert_eq!(
            config.client.base_url,
            Some("https://api.example.com".to_string())
        );
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: SdkforgeConfig = serde_yaml_ng::from_str("input: api.yaml\n").unwrap();
        assert_eq!(config.input.as_deref(), Some("api.yaml"));
        assert_eq!(config.output, "generated_sdk");
        assert_eq!(config.group_by, GroupBy::Tag);
    }

    #[test]
    fn test_default_content_parses() {
        let config: SdkforgeConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        assert_eq!(config.target_version, TargetVersion::default());
    }

    #[test]
    fn test_target_version() {
        let v: TargetVersion = "3.9".parse().unwrap();
        assert!(v.supports_builtin_generics());
        assert!(!v.supports_union_syntax());
        assert_eq!(v.to_string(), "3.9");
        assert!("three".parse::<TargetVersion>().is_err());
        assert!("3.x".parse::<TargetVersion>().is_err());
    }

    #[test]
    fn test_bad_target_version_in_yaml() {
        let result: Result<SdkforgeConfig, _> = serde_yaml_ng::from_str("target_version: nope\n");
        assert!(result.is_err());
    }
}
