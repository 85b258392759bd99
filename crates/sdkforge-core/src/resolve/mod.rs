//! Reference resolution: raw document → resolved schema graph + operations.

pub mod graph;
pub mod pointer;
pub mod ref_resolve;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

pub use graph::{
    AdditionalLink, NodeId, ResolvedDiscriminator, ResolvedSchema, SchemaGraph, SchemaLink,
    SchemaNode,
};
pub use ref_resolve::RefResolver;

use crate::error::{GenerateError, ParseError, PipelineFailure, ResolveError};
use crate::ir::HttpMethod;
use crate::parse::parameter::ParameterLocation;
use crate::parse::security::{SecurityRequirement, SecurityScheme};
use crate::parse::server::Server;
use crate::parse::spec::{Info, Tag};

/// A parameter with its schema resolved.
#[derive(Debug, Clone)]
pub struct ResolvedParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub deprecated: bool,
    pub schema: Option<SchemaLink>,
    /// Location the parameter was defined at, after following references.
    pub source: String,
}

/// A request body with the chosen media type resolved.
#[derive(Debug, Clone)]
pub struct ResolvedBody {
    pub content_type: Option<String>,
    pub required: bool,
    pub description: Option<String>,
    pub schema: Option<SchemaLink>,
}

/// One declared response with the chosen media type resolved.
#[derive(Debug, Clone)]
pub struct ResolvedResponse {
    pub status: String,
    pub description: Option<String>,
    pub content_type: Option<String>,
    pub schema: Option<SchemaLink>,
}

/// One method on one path, with path-level parameters merged in.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub path: String,
    pub method: HttpMethod,
    pub location: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    pub parameters: Vec<ResolvedParameter>,
    pub request_body: Option<ResolvedBody>,
    pub responses: Vec<ResolvedResponse>,
    /// Operation-level override of the global requirement.
    pub security: Option<Vec<SecurityRequirement>>,
}

/// Output of the reference-resolution stage.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub info: Info,
    pub servers: Vec<Server>,
    pub tags: Vec<Tag>,
    pub graph: SchemaGraph,
    pub security_schemes: IndexMap<String, SecurityScheme>,
    pub security: Vec<SecurityRequirement>,
    pub operations: Vec<ResolvedOperation>,
}

/// Resolve a whole document.
///
/// Malformed references abort immediately. Other resolution errors are
/// collected per component and per operation so that one run reports them all.
pub fn resolve_document(document: &Value) -> Result<ResolvedDocument, PipelineFailure> {
    let mut errors: Vec<GenerateError> = Vec::new();
    let mut resolver = RefResolver::new(document);

    let info = match document.get("info") {
        Some(raw) => absorb(
            Info::deserialize(raw).map_err(|e| invalid("#/info", e)),
            &mut errors,
        )?,
        None => {
            errors.push(ParseError::MissingField("info".to_string()).into());
            None
        }
    };
    let servers = section::<Vec<Server>>(document, "servers", &mut errors)?.unwrap_or_default();
    let tags = section::<Vec<Tag>>(document, "tags", &mut errors)?.unwrap_or_default();
    let security =
        section::<Vec<SecurityRequirement>>(document, "security", &mut errors)?.unwrap_or_default();

    let components = document.get("components");

    if let Some(schemas) = components
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
    {
        for (name, raw) in schemas {
            log::debug!("resolving component schema {name}");
            absorb(resolver.resolve_component(name, raw), &mut errors)?;
        }
    }

    let mut security_schemes = IndexMap::new();
    if let Some(schemes) = components
        .and_then(|c| c.get("securitySchemes"))
        .and_then(Value::as_object)
    {
        for (name, raw) in schemes {
            let location = pointer::component("securitySchemes", name);
            if let Some((_, _, scheme)) = absorb(
                resolver.resolve_object::<SecurityScheme>(&location, raw),
                &mut errors,
            )? {
                security_schemes.insert(name.clone(), scheme);
            }
        }
    }

    let mut operations = Vec::new();
    if let Some(paths) = document.get("paths").and_then(Value::as_object) {
        for (path, raw_item) in paths {
            let item_location = pointer::child("#/paths", path);
            let Some((item_location, item)) =
                absorb(resolver.follow(&item_location, raw_item), &mut errors)?
            else {
                continue;
            };

            let mut shared = Vec::new();
            if let Some(raw_params) = item.get("parameters").and_then(Value::as_array) {
                let base = pointer::child(&item_location, "parameters");
                for (i, raw) in raw_params.iter().enumerate() {
                    let at = pointer::child(&base, &i.to_string());
                    if let Some(param) =
                        absorb(resolver.resolve_parameter(&at, raw), &mut errors)?
                    {
                        shared.push(param);
                    }
                }
            }

            let Some(methods) = item.as_object() else {
                continue;
            };
            for (key, raw_op) in methods {
                let Some(method) = HttpMethod::from_key(key) else {
                    continue;
                };
                let at = pointer::child(&item_location, key);
                log::debug!("resolving {} {path}", method.as_str());
                if let Some(op) = absorb(
                    resolver.resolve_operation(path, method, &at, raw_op, &shared),
                    &mut errors,
                )? {
                    operations.push(op);
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(PipelineFailure::new(errors));
    }
    let Some(info) = info else {
        return Err(ParseError::MissingField("info".to_string()).into());
    };

    Ok(ResolvedDocument {
        info,
        servers,
        tags,
        graph: resolver.into_graph(),
        security_schemes,
        security,
        operations,
    })
}

fn section<T>(
    document: &Value,
    key: &str,
    errors: &mut Vec<GenerateError>,
) -> Result<Option<T>, PipelineFailure>
where
    T: for<'de> Deserialize<'de>,
{
    match document.get(key) {
        None => Ok(None),
        Some(raw) => absorb(
            T::deserialize(raw).map_err(|e| invalid(&pointer::child(pointer::ROOT, key), e)),
            errors,
        ),
    }
}

fn invalid(location: &str, err: impl std::fmt::Display) -> ResolveError {
    ResolveError::InvalidNode {
        location: location.to_string(),
        message: err.to_string(),
    }
}

/// Keep going after recoverable resolution errors; stop on malformed references.
fn absorb<T>(
    result: Result<T, ResolveError>,
    errors: &mut Vec<GenerateError>,
) -> Result<Option<T>, PipelineFailure> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ ResolveError::MalformedReference(_)) => {
            errors.push(err.into());
            Err(PipelineFailure::new(std::mem::take(errors)))
        }
        Err(err) => {
            errors.push(err.into());
            Ok(None)
        }
    }
}
