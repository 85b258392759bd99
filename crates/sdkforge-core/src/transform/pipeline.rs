use serde_json::Value;

use super::dependency_order::dependency_order;
use super::grouping::group_modules;
use super::name_registry::NameRegistry;
use super::normalizer::normalize_graph;
use super::operation_builder::{OperationBuilder, annotate_permissive, translate_security_schemes};
use super::type_mapper::TypeMapper;
use crate::config::{GroupBy, NamingConfig, SdkforgeConfig, TargetVersion};
use crate::diagnostics::Diagnostics;
use crate::error::{GenerateError, PipelineFailure};
use crate::ir::{ApiInfo, ApiModel, ApiServer, CONTEXT_VERSION};
use crate::resolve::resolve_document;

/// Options for one generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub naming: NamingConfig,
    pub group_by: GroupBy,
    pub target_version: TargetVersion,
    /// Type names the renderer needs for itself.
    pub reserved_names: Vec<String>,
}

impl GenerateOptions {
    pub fn from_config(config: &SdkforgeConfig) -> Self {
        Self {
            naming: config.naming.clone(),
            group_by: config.group_by,
            target_version: config.target_version,
            reserved_names: Vec::new(),
        }
    }

    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Run every stage over a parsed document.
///
/// Fatal errors from normalization, type mapping and operation binding are
/// collected together, so one failed run reports all of them.
pub fn generate(document: &Value, options: &GenerateOptions) -> Result<ApiModel, PipelineFailure> {
    // Phase 1: Resolve every reference into the schema graph
    let resolved = resolve_document(document)?;
    log::debug!(
        "resolved {} schema nodes and {} operations",
        resolved.graph.len(),
        resolved.operations.len()
    );

    let mut diagnostics = Diagnostics::new();
    let mut errors: Vec<GenerateError> = Vec::new();

    // Phase 2: Normalize compositions, nullability, enums and defaults
    let (schemas, schema_errors) = normalize_graph(&resolved.graph, &mut diagnostics);
    errors.extend(schema_errors.into_iter().map(GenerateError::from));

    let security_schemes = translate_security_schemes(&resolved.security_schemes, &mut diagnostics);

    // Phase 3: Map components, then bind operations (mapping their inline schemas)
    let registry = NameRegistry::new(options.reserved_names.iter().cloned());
    let mut mapper = TypeMapper::new(document, &resolved.graph, &schemas, registry, &mut diagnostics);
    mapper.map_components();
    let builder = OperationBuilder::new(&security_schemes, &resolved.security, &options.naming);
    let (mut operations, operation_errors) =
        builder.build_all(&resolved.operations, &schemas, &mut mapper);
    let (types, map_errors) = mapper.finish();
    errors.extend(map_errors.into_iter().map(GenerateError::from));
    errors.extend(operation_errors.into_iter().map(GenerateError::from));

    if !errors.is_empty() {
        return Err(PipelineFailure::new(errors));
    }

    annotate_permissive(&mut operations, &types);

    // Phase 4: Order types and group everything into modules
    let types = dependency_order(types.into_vec());
    log::debug!("mapped {} types", types.len());
    let modules = group_modules(types, operations, &resolved.tags, options.group_by);

    let info = ApiInfo {
        title: resolved.info.title.clone(),
        description: resolved.info.description.clone(),
        version: resolved.info.version.clone(),
    };
    let servers = resolved
        .servers
        .iter()
        .map(|s| ApiServer {
            url: s.default_url(),
            description: s.description.clone(),
        })
        .collect();

    Ok(ApiModel {
        context_version: CONTEXT_VERSION,
        info,
        servers,
        security_schemes,
        target_version: options.target_version,
        modules,
        warnings: diagnostics.into_warnings(),
    })
}
