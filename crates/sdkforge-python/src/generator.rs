use heck::ToSnakeCase;
use sdkforge_core::config::SdkforgeConfig;
use sdkforge_core::ir::{ApiModel, ModuleKind};
use sdkforge_core::{CodeGenerator, GeneratedFile};
use thiserror::Error;

use crate::emitters;
use crate::emitters::api::ApiModule;
use crate::identifiers::{IdentifierSet, safe_identifier};
use crate::type_mapper::ModelIndex;

/// Type names the generated package defines or imports for itself.
pub const RESERVED_NAMES: &[&str] = &[
    "Any", "ApiError", "Client", "DecodeError", "Dict", "List", "Literal", "Optional", "Union",
];

/// Attributes of the generated `Client` that resource accessors must avoid.
const CLIENT_ATTRIBUTES: &[&str] = &["base_url", "timeout", "headers", "request"];

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("`{0}` is not a valid Python package name")]
    InvalidPackageName(String),
}

/// Renderer options not carried by the model.
#[derive(Debug, Clone, Default)]
pub struct PythonClientConfig {
    /// Import name of the package; derived from the API title when unset.
    pub package_name: Option<String>,
    /// Default base URL; the first server when unset.
    pub base_url: Option<String>,
}

impl PythonClientConfig {
    pub fn from_config(config: &SdkforgeConfig) -> Self {
        Self {
            package_name: config.package_name.clone(),
            base_url: config.client.base_url.clone(),
        }
    }
}

/// Python client SDK generator.
pub struct PythonClientGenerator;

impl CodeGenerator for PythonClientGenerator {
    type Config = PythonClientConfig;
    type Error = GeneratorError;

    fn generate(
        &self,
        model: &ApiModel,
        config: &PythonClientConfig,
    ) -> Result<Vec<GeneratedFile>, GeneratorError> {
        let package = package_name(model, config)?;
        let index = ModelIndex::new(model);
        let apis = plan_api_modules(model);
        log::debug!("rendering package `{package}` with {} resource modules", apis.len());

        let base_url = config
            .base_url
            .clone()
            .or_else(|| model.servers.first().map(|s| s.url.clone()))
            .unwrap_or_else(|| "http://localhost".to_string());

        let mut files = vec![
            GeneratedFile {
                path: format!("{package}/__init__.py"),
                content: emitters::package::emit_init(model)?,
            },
            GeneratedFile {
                path: format!("{package}/_runtime.py"),
                content: emitters::package::emit_runtime(),
            },
            GeneratedFile {
                path: format!("{package}/models.py"),
                content: emitters::models::emit_models(model, &index)?,
            },
            GeneratedFile {
                path: format!("{package}/client.py"),
                content: emitters::client::emit_client(model, &apis, &package, &base_url)?,
            },
            GeneratedFile {
                path: format!("{package}/api/__init__.py"),
                content: emitters::package::emit_api_init(&apis)?,
            },
        ];

        for api in &apis {
            files.push(GeneratedFile {
                path: format!("{package}/api/{}.py", api.file_name),
                content: emitters::api::emit_api_module(model, api, &index)?,
            });
        }

        files.push(GeneratedFile {
            path: "pyproject.toml".to_string(),
            content: emitters::package::emit_pyproject(model, &package)?,
        });

        Ok(files)
    }
}

fn package_name(model: &ApiModel, config: &PythonClientConfig) -> Result<String, GeneratorError> {
    match &config.package_name {
        Some(name) => {
            let snake = name.to_snake_case();
            if snake.is_empty() || safe_identifier(&snake) != snake {
                return Err(GeneratorError::InvalidPackageName(name.clone()));
            }
            Ok(snake)
        }
        None => Ok(safe_identifier(&model.info.title.to_snake_case())),
    }
}

/// Pick file, class and accessor names for every operations module.
fn plan_api_modules(model: &ApiModel) -> Vec<ApiModule<'_>> {
    let mut files = IdentifierSet::with_reserved(["__init__"]);
    let mut classes = IdentifierSet::with_reserved(RESERVED_NAMES.iter().copied());
    let mut attributes = IdentifierSet::with_reserved(CLIENT_ATTRIBUTES.iter().copied());

    model
        .modules
        .iter()
        .filter(|m| m.kind == ModuleKind::Operations)
        .map(|module| ApiModule {
            file_name: files.claim(&module.file_name),
            class_name: classes.claim(&format!("{}Api", module.name.pascal_case)),
            attribute: attributes.claim(&module.file_name),
            module,
        })
        .collect()
}
