//! Resolved operations → bound [`Operation`]s.

use std::collections::HashSet;

use heck::ToPascalCase;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use super::name_normalizer::{normalize_name, route_to_name, type_name};
use super::normalizer::NormalizedTable;
use super::type_mapper::{TypeMapper, TypeTable};
use crate::config::{NamingConfig, NamingStrategy};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::OperationError;
use crate::ir::normalized::{Primitive, SchemaKind};
use crate::ir::{
    BoundScheme, Builtin, CredentialLocation, NormalizedName, Operation, Parameter,
    ParameterLocation, RequestBody, Response, SecurityRequirement, SecurityScheme, TypeRef,
};
use crate::parse::parameter::ParameterLocation as WireLocation;
use crate::parse::response::is_success_status;
use crate::parse::security::{self as wire, ApiKeyLocation, SecuritySchemeType};
use crate::resolve::{ResolvedOperation, ResolvedParameter, SchemaLink, pointer};

/// Translate declared security schemes into what the client can apply.
pub fn translate_security_schemes(
    declared: &IndexMap<String, wire::SecurityScheme>,
    diagnostics: &mut Diagnostics,
) -> IndexMap<String, SecurityScheme> {
    declared
        .iter()
        .map(|(name, scheme)| {
            let translated = translate_scheme(scheme).unwrap_or_else(|reason| {
                diagnostics.warn(
                    WarningKind::UnsupportedSecurityScheme,
                    pointer::component("securitySchemes", name),
                    format!("security scheme `{name}` is ignored: {reason}"),
                );
                SecurityScheme::None
            });
            (name.clone(), translated)
        })
        .collect()
}

fn translate_scheme(scheme: &wire::SecurityScheme) -> Result<SecurityScheme, String> {
    match scheme.scheme_type {
        SecuritySchemeType::ApiKey => {
            let parameter_name = scheme
                .name
                .clone()
                .ok_or_else(|| "apiKey scheme has no `name`".to_string())?;
            let location = match scheme.location {
                Some(ApiKeyLocation::Header) => CredentialLocation::Header,
                Some(ApiKeyLocation::Query) => CredentialLocation::Query,
                Some(ApiKeyLocation::Cookie) => return Err("cookie API keys are not supported".into()),
                None => return Err("apiKey scheme has no `in`".into()),
            };
            Ok(SecurityScheme::ApiKey {
                location,
                parameter_name,
            })
        }
        SecuritySchemeType::Http => match scheme.scheme.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("bearer") => Ok(SecurityScheme::Bearer {
                format: scheme.bearer_format.clone(),
            }),
            other => Err(format!(
                "http `{}` authentication is not supported",
                other.unwrap_or("?")
            )),
        },
        SecuritySchemeType::OAuth2 | SecuritySchemeType::OpenIdConnect => {
            Ok(SecurityScheme::Bearer { format: None })
        }
        SecuritySchemeType::MutualTls => Err("mutual TLS is configured outside the client".into()),
    }
}

/// Binds resolved operations to mapped types, one operation at a time, in
/// document order.
pub struct OperationBuilder<'b> {
    schemes: &'b IndexMap<String, SecurityScheme>,
    global_security: &'b [wire::SecurityRequirement],
    naming: &'b NamingConfig,
    used_names: HashSet<String>,
    errors: Vec<OperationError>,
}

impl<'b> OperationBuilder<'b> {
    pub fn new(
        schemes: &'b IndexMap<String, SecurityScheme>,
        global_security: &'b [wire::SecurityRequirement],
        naming: &'b NamingConfig,
    ) -> Self {
        Self {
            schemes,
            global_security,
            naming,
            used_names: HashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Bind every operation; failures are collected, not returned early.
    pub fn build_all(
        mut self,
        operations: &[ResolvedOperation],
        schemas: &NormalizedTable,
        mapper: &mut TypeMapper<'_, '_>,
    ) -> (Vec<Operation>, Vec<OperationError>) {
        let built = operations
            .iter()
            .filter_map(|op| self.build(op, schemas, mapper))
            .collect();
        (built, self.errors)
    }

    pub fn build(
        &mut self,
        op: &ResolvedOperation,
        schemas: &NormalizedTable,
        mapper: &mut TypeMapper<'_, '_>,
    ) -> Option<Operation> {
        let name = self.operation_name(op);
        let type_base = name.pascal_case.clone();
        log::debug!("binding {} {} as {}", op.method.as_str(), op.path, name.camel_case);

        let security = match self.bind_security(op, &name) {
            Ok(security) => security,
            Err(err) => {
                self.errors.push(err);
                return None;
            }
        };

        let mut parameters = bind_parameters(op, &type_base, schemas, mapper);

        let request_body = op.request_body.as_ref().and_then(|body| {
            let content_type = body.content_type.clone()?;
            let ty = match body.schema {
                Some(link) => mapper.map(link.target, &format!("{type_base}Body")),
                None => TypeRef::any(),
            };
            Some(RequestBody {
                ty,
                required: body.required,
                content_type,
                description: body.description.clone(),
            })
        });

        if let Some(body) = &request_body {
            let taken: HashSet<String> =
                parameters.iter().map(|p| p.name.snake_case.clone()).collect();
            let name = if taken.contains("body") {
                free_name("request", "body", &taken)
            } else {
                normalize_name("body")
            };
            parameters.push(Parameter {
                name,
                wire_name: "body".to_string(),
                location: ParameterLocation::Body,
                ty: body.ty.clone(),
                required: body.required,
                description: body.description.clone(),
                deprecated: false,
                default: None,
            });
        }

        let (response, other_responses) = bind_responses(op, &type_base, schemas, mapper);

        Some(Operation {
            name,
            method: op.method,
            path: op.path.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            tags: op.tags.clone(),
            deprecated: op.deprecated,
            parameters,
            request_body,
            response,
            other_responses,
            security,
            notes: Vec::new(),
        })
    }

    fn operation_name(&mut self, op: &ResolvedOperation) -> NormalizedName {
        let derived = match (self.naming.strategy, &op.operation_id) {
            (NamingStrategy::UseOperationId, Some(id)) => id.clone(),
            _ => route_to_name(op.method, &op.path),
        };
        let raw = self.naming.aliases.get(&derived).cloned().unwrap_or(derived);

        let method = op.method.as_str().to_lowercase();
        let digest = hex::encode(Sha256::digest(op.location.as_bytes()));
        let candidates = [
            raw.clone(),
            format!("{raw}_{method}"),
            format!("{raw}_{method}_{}", &digest[..8]),
        ];
        let name = candidates
            .iter()
            .map(|c| normalize_name(c))
            .find(|n| !self.used_names.contains(&n.camel_case))
            .unwrap_or_else(|| normalize_name(&format!("{raw}_{method}_{digest}")));
        self.used_names.insert(name.camel_case.clone());
        name
    }

    fn bind_security(
        &self,
        op: &ResolvedOperation,
        name: &NormalizedName,
    ) -> Result<Vec<SecurityRequirement>, OperationError> {
        let requirements = op.security.as_deref().unwrap_or(self.global_security);
        requirements
            .iter()
            .map(|requirement| {
                let schemes = requirement
                    .iter()
                    .map(|(scheme, scopes)| {
                        let bound = self.schemes.get(scheme).ok_or_else(|| {
                            OperationError::UnknownSecurityScheme {
                                operation: name.original.clone(),
                                scheme: scheme.clone(),
                            }
                        })?;
                        Ok(BoundScheme {
                            name: scheme.clone(),
                            scheme: bound.clone(),
                            scopes: scopes.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SecurityRequirement { schemes })
            })
            .collect()
    }
}

/// `<raw>_<suffix>`, numbered from 2 until no name in `taken` matches.
fn free_name(raw: &str, suffix: &str, taken: &HashSet<String>) -> NormalizedName {
    let first = normalize_name(&format!("{raw}_{suffix}"));
    if !taken.contains(&first.snake_case) {
        return first;
    }
    (2..)
        .map(|n| normalize_name(&format!("{raw}_{suffix}_{n}")))
        .find(|name| !taken.contains(&name.snake_case))
        .unwrap_or(first)
}

/// Placeholder names of a path template, in order.
fn path_placeholders(path: &str) -> Vec<&str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
        .filter(|name| !name.is_empty())
        .collect()
}

fn bind_parameters(
    op: &ResolvedOperation,
    type_base: &str,
    schemas: &NormalizedTable,
    mapper: &mut TypeMapper<'_, '_>,
) -> Vec<Parameter> {
    let mut ordered: Vec<(ParameterLocation, Option<&ResolvedParameter>, String)> = Vec::new();

    for placeholder in path_placeholders(&op.path) {
        let declared = op
            .parameters
            .iter()
            .find(|p| p.location == WireLocation::Path && p.name == placeholder);
        if declared.is_none() {
            mapper.diagnostics().warn(
                WarningKind::UndeclaredPathParameter,
                &op.location,
                format!("path parameter `{placeholder}` is not declared; assuming a string"),
            );
        }
        ordered.push((ParameterLocation::Path, declared, placeholder.to_string()));
    }

    let placeholders = path_placeholders(&op.path);
    for (wire_location, location) in [
        (WireLocation::Path, ParameterLocation::Path),
        (WireLocation::Query, ParameterLocation::Query),
        (WireLocation::Header, ParameterLocation::Header),
        (WireLocation::Cookie, ParameterLocation::Cookie),
    ] {
        for param in op.parameters.iter().filter(|p| p.location == wire_location) {
            if location == ParameterLocation::Path && placeholders.contains(&param.name.as_str()) {
                continue;
            }
            ordered.push((location, Some(param), param.name.clone()));
        }
    }

    let mut taken: HashSet<String> = HashSet::new();
    let mut bound = Vec::with_capacity(ordered.len());
    for (location, declared, wire_name) in ordered {
        let mut name = normalize_name(&wire_name);
        if taken.contains(&name.snake_case) {
            name = free_name(&wire_name, location_label(location), &taken);
        }
        taken.insert(name.snake_case.clone());

        let parameter = match declared {
            Some(param) => {
                let (ty, default) = match param.schema {
                    Some(link) => (
                        mapper.map(link.target, &format!("{type_base}{}", type_name(&param.name))),
                        schemas.get(link.target).default.clone(),
                    ),
                    None => (TypeRef::builtin(Builtin::String), None),
                };
                Parameter {
                    name,
                    wire_name,
                    location,
                    ty,
                    required: param.required || location == ParameterLocation::Path,
                    description: param.description.clone(),
                    deprecated: param.deprecated,
                    default,
                }
            }
            None => Parameter {
                name,
                wire_name,
                location,
                ty: TypeRef::builtin(Builtin::String),
                required: true,
                description: None,
                deprecated: false,
                default: None,
            },
        };
        bound.push(parameter);
    }
    bound
}

fn location_label(location: ParameterLocation) -> &'static str {
    match location {
        ParameterLocation::Path => "path",
        ParameterLocation::Query => "query",
        ParameterLocation::Header => "header",
        ParameterLocation::Cookie => "cookie",
        ParameterLocation::Body => "body",
    }
}

/// How much a response schema says about the payload; the primary success
/// response is the most specific one.
fn specificity(schema: Option<SchemaLink>, schemas: &NormalizedTable) -> u8 {
    let Some(link) = schema else {
        return 0;
    };
    let normalized = schemas.get(schemas.effective(link.target));
    if normalized.component.is_some() {
        return 4;
    }
    match &normalized.kind {
        SchemaKind::Primitive(Primitive::Any) => 1,
        SchemaKind::Primitive(_) => 2,
        SchemaKind::Enumeration(e) if e.values.len() == 1 => 2,
        SchemaKind::Array(_) => 3,
        SchemaKind::Object(obj) if obj.properties.is_empty() => 3,
        SchemaKind::Object(_)
        | SchemaKind::Union(_)
        | SchemaKind::Enumeration(_)
        | SchemaKind::Intersection(_) => 4,
        SchemaKind::Negation(_) => 1,
    }
}

fn bind_responses(
    op: &ResolvedOperation,
    type_base: &str,
    schemas: &NormalizedTable,
    mapper: &mut TypeMapper<'_, '_>,
) -> (Option<Response>, IndexMap<String, Response>) {
    let mut primary: Option<(usize, u8)> = None;
    for (index, response) in op.responses.iter().enumerate() {
        if !is_success_status(&response.status) {
            continue;
        }
        let score = specificity(response.schema, schemas);
        if primary.is_none_or(|(_, best)| score > best) {
            primary = Some((index, score));
        }
    }
    let primary_index = primary.map(|(index, _)| index);

    let mut chosen = None;
    let mut others = IndexMap::new();
    for (index, response) in op.responses.iter().enumerate() {
        let is_primary = Some(index) == primary_index;
        let context = if is_primary {
            format!("{type_base}Response")
        } else {
            format!("{type_base}{}Response", response.status.to_pascal_case())
        };
        let ty = match response.schema {
            Some(link) => mapper.map(link.target, &context),
            None => TypeRef::Void,
        };
        let bound = Response {
            status: response.status.clone(),
            ty,
            content_type: response.content_type.clone(),
            description: response.description.clone(),
        };
        if is_primary {
            chosen = Some(bound);
        } else {
            others.insert(response.status.clone(), bound);
        }
    }
    (chosen, others)
}

/// Note every operation whose types include a permissively decoded union.
pub fn annotate_permissive(operations: &mut [Operation], types: &TypeTable) {
    for op in operations {
        let mut mentioned: Vec<String> = Vec::new();
        let signature = op
            .parameters
            .iter()
            .map(|p| &p.ty)
            .chain(op.response.iter().map(|r| &r.ty))
            .chain(op.other_responses.values().map(|r| &r.ty));
        for ty in signature {
            for name in ty.referenced_names() {
                let permissive = types.get(name).is_some_and(|t| t.is_permissive());
                if permissive && !mentioned.iter().any(|m| m == name) {
                    mentioned.push(name.to_string());
                }
            }
        }
        for name in mentioned {
            op.notes.push(format!(
                "`{name}` has no discriminator; responses are matched against its variants in order."
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_placeholders() {
        assert_eq!(
            path_placeholders("/orgs/{org}/repos/{repo}"),
            vec!["org", "repo"]
        );
        assert!(path_placeholders("/health").is_empty());
    }

    #[test]
    fn test_translate_schemes() {
        let declared: IndexMap<String, wire::SecurityScheme> = serde_json::from_value(serde_json::json!({
            "key": {"type": "apiKey", "in": "header", "name": "X-Key"},
            "cookie": {"type": "apiKey", "in": "cookie", "name": "sid"},
            "jwt": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"},
            "basic": {"type": "http", "scheme": "basic"},
            "oauth": {"type": "oauth2"}
        }))
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        let schemes = translate_security_schemes(&declared, &mut diagnostics);
        assert_eq!(
            schemes["key"],
            SecurityScheme::ApiKey {
                location: CredentialLocation::Header,
                parameter_name: "X-Key".into()
            }
        );
        assert_eq!(schemes["cookie"], SecurityScheme::None);
        assert_eq!(
            schemes["jwt"],
            SecurityScheme::Bearer {
                format: Some("JWT".into())
            }
        );
        assert_eq!(schemes["basic"], SecurityScheme::None);
        assert_eq!(schemes["oauth"], SecurityScheme::Bearer { format: None });
        assert_eq!(diagnostics.warnings().len(), 2);
    }
}
