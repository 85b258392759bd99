use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::operations::Operation;
use super::schemas::TypeDescriptor;
use super::security::SecurityScheme;
use crate::config::TargetVersion;
use crate::diagnostics::Warning;

/// A fully resolved, renderer-ready model of an API.
#[derive(Debug, Clone, Serialize)]
pub struct ApiModel {
    pub context_version: u32,
    pub info: ApiInfo,
    pub servers: Vec<ApiServer>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
    pub target_version: TargetVersion,
    pub modules: Vec<GeneratedModule>,
    pub warnings: Vec<Warning>,
}

impl ApiModel {
    /// All generated types, in emission order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.modules.iter().flat_map(|m| m.types.iter())
    }

    /// All operations, in module order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.modules.iter().flat_map(|m| m.operations.iter())
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types().find(|t| t.name == name)
    }

    /// Look up an operation by its camelCase name.
    pub fn find_operation(&self, name: &str) -> Option<&Operation> {
        self.operations().find(|op| op.name.camel_case == name)
    }
}

/// API metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
}

/// A server URL with template variables substituted.
#[derive(Debug, Clone, Serialize)]
pub struct ApiServer {
    pub url: String,
    pub description: Option<String>,
}

/// What a module holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Models,
    Operations,
}

/// One output file's worth of types or operations.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedModule {
    pub name: NormalizedName,
    /// Logical file name without extension.
    pub file_name: String,
    pub kind: ModuleKind,
    pub description: Option<String>,
    pub types: Vec<TypeDescriptor>,
    pub operations: Vec<Operation>,
}

/// A name with multiple casing variants pre-computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedName {
    pub original: String,
    pub pascal_case: String,
    pub camel_case: String,
    pub snake_case: String,
    pub screaming_snake: String,
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}
