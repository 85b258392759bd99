use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::Value;

use super::graph::{
    AdditionalLink, ResolvedDiscriminator, ResolvedSchema, SchemaGraph, SchemaLink,
};
use super::pointer;
use super::{ResolvedBody, ResolvedOperation, ResolvedParameter, ResolvedResponse};
use crate::error::ResolveError;
use crate::ir::HttpMethod;
use crate::parse::media_type::{MediaType, preferred_media_type};
use crate::parse::operation::Operation;
use crate::parse::parameter::Parameter;
use crate::parse::request_body::RequestBody;
use crate::parse::response::Response;
use crate::parse::schema::SchemaKeywords;

/// Resolves `$ref` pointers against one document, materializing schemas into a
/// [`SchemaGraph`].
///
/// Each location is materialized once. A reference to a location that is
/// still on the resolution stack produces a deferred link instead of being
/// expanded again, which is how recursive schemas terminate.
pub struct RefResolver<'a> {
    document: &'a Value,
    graph: SchemaGraph,
    stack: IndexSet<String>,
}

impl<'a> RefResolver<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            graph: SchemaGraph::default(),
            stack: IndexSet::new(),
        }
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SchemaGraph {
        self.graph
    }

    /// Return the node a reference string designates.
    pub fn lookup(&self, reference: &str) -> Result<&'a Value, ResolveError> {
        let location = pointer::parse_reference(reference)?;
        pointer::lookup(self.document, &location).ok_or_else(|| {
            ResolveError::UnresolvedReference {
                reference: reference.to_string(),
                location: pointer::ROOT.to_string(),
            }
        })
    }

    /// Follow `$ref` hops from `value` (found at `location`) to the first node
    /// that is not a reference. Returns that node and its location.
    pub fn follow(
        &self,
        location: &str,
        value: &'a Value,
    ) -> Result<(String, &'a Value), ResolveError> {
        let mut chain = vec![location.to_string()];
        let mut current = value;
        while let Some(reference) = reference_of(current) {
            let target = pointer::parse_reference(reference)?;
            if chain.contains(&target) {
                chain.push(target);
                return Err(ResolveError::CircularReference(chain));
            }
            current = pointer::lookup(self.document, &target).ok_or_else(|| {
                ResolveError::UnresolvedReference {
                    reference: reference.to_string(),
                    location: chain.last().cloned().unwrap_or_default(),
                }
            })?;
            chain.push(target);
        }
        let resolved = chain.pop().unwrap_or_default();
        Ok((resolved, current))
    }

    /// Follow references and deserialize the target into a typed view.
    pub fn resolve_object<T>(
        &self,
        location: &str,
        value: &'a Value,
    ) -> Result<(String, &'a Value, T), ResolveError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let (location, target) = self.follow(location, value)?;
        let typed = T::deserialize(target).map_err(|e| ResolveError::InvalidNode {
            location: location.clone(),
            message: e.to_string(),
        })?;
        Ok((location, target, typed))
    }

    /// Resolve one component schema and record it under its name.
    pub fn resolve_component(
        &mut self,
        name: &str,
        value: &'a Value,
    ) -> Result<SchemaLink, ResolveError> {
        let location = pointer::component("schemas", name);
        let link = self.resolve_schema(&location, value)?;
        self.graph.add_component(name.to_string(), link);
        Ok(link)
    }

    /// Materialize the schema at `location` and return a link to it.
    pub fn resolve_schema(
        &mut self,
        location: &str,
        value: &'a Value,
    ) -> Result<SchemaLink, ResolveError> {
        let (location, value) = self.follow(location, value)?;

        if let Some(id) = self.graph.lookup(&location) {
            return Ok(SchemaLink {
                target: id,
                deferred: self.stack.contains(&location),
            });
        }

        let component = pointer::component_name(&location, "schemas");
        let id = self.graph.reserve(location.clone(), component);
        self.stack.insert(location.clone());
        let built = self.build_schema(&location, value);
        self.stack.pop();

        self.graph.fill(id, built?);
        Ok(SchemaLink {
            target: id,
            deferred: false,
        })
    }

    fn build_schema(
        &mut self,
        location: &str,
        value: &'a Value,
    ) -> Result<ResolvedSchema, ResolveError> {
        let object = match value {
            // `true`/`false` schemas carry no structure.
            Value::Bool(_) => return Ok(ResolvedSchema::default()),
            Value::Object(object) => object,
            other => {
                return Err(ResolveError::InvalidNode {
                    location: location.to_string(),
                    message: format!("expected a schema object, found `{other}`"),
                });
            }
        };

        let keywords =
            SchemaKeywords::deserialize(value).map_err(|e| ResolveError::InvalidNode {
                location: location.to_string(),
                message: e.to_string(),
            })?;
        let mut schema = ResolvedSchema {
            keywords,
            ..ResolvedSchema::default()
        };

        if let Some(properties) = object.get("properties").and_then(Value::as_object) {
            let base = pointer::child(location, "properties");
            for (name, property) in properties {
                let link = self.resolve_schema(&pointer::child(&base, name), property)?;
                schema.properties.insert(name.clone(), link);
            }
        }

        schema.additional_properties = match object.get("additionalProperties") {
            None => None,
            Some(Value::Bool(allowed)) => Some(AdditionalLink::Allowed(*allowed)),
            Some(sub) => {
                let at = pointer::child(location, "additionalProperties");
                Some(AdditionalLink::Schema(self.resolve_schema(&at, sub)?))
            }
        };

        // Tuple-form `items` has no single element type and is left unresolved.
        if let Some(items) = object.get("items").filter(|v| !v.is_array()) {
            schema.items = Some(self.resolve_schema(&pointer::child(location, "items"), items)?);
        }

        schema.all_of = self.resolve_list(location, object.get("allOf"), "allOf")?;
        schema.one_of = self.resolve_list(location, object.get("oneOf"), "oneOf")?;
        schema.any_of = self.resolve_list(location, object.get("anyOf"), "anyOf")?;

        if let Some(negated) = object.get("not") {
            schema.not = Some(self.resolve_schema(&pointer::child(location, "not"), negated)?);
        }

        if let Some(discriminator) = object.get("discriminator") {
            schema.discriminator = Some(self.resolve_discriminator(location, discriminator)?);
        }

        Ok(schema)
    }

    fn resolve_list(
        &mut self,
        location: &str,
        value: Option<&'a Value>,
        keyword: &str,
    ) -> Result<Vec<SchemaLink>, ResolveError> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        let base = pointer::child(location, keyword);
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.resolve_schema(&pointer::child(&base, &i.to_string()), item))
            .collect()
    }

    fn resolve_discriminator(
        &mut self,
        location: &str,
        value: &'a Value,
    ) -> Result<ResolvedDiscriminator, ResolveError> {
        let at = pointer::child(location, "discriminator");
        let property_name = value
            .get("propertyName")
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::InvalidNode {
                location: at.clone(),
                message: "discriminator without `propertyName`".to_string(),
            })?
            .to_string();

        let mut mapping = IndexMap::new();
        if let Some(entries) = value.get("mapping").and_then(Value::as_object) {
            for (tag, target) in entries {
                let target = target.as_str().ok_or_else(|| ResolveError::InvalidNode {
                    location: pointer::child(&at, "mapping"),
                    message: format!("mapping for `{tag}` is not a string"),
                })?;
                // Bare names refer to component schemas.
                let reference = if target.starts_with('#') {
                    target.to_string()
                } else if target.contains('/') || target.contains('.') {
                    return Err(ResolveError::MalformedReference(target.to_string()));
                } else {
                    pointer::component("schemas", target)
                };
                let target_location = pointer::parse_reference(&reference)?;
                let node = pointer::lookup(self.document, &target_location).ok_or_else(|| {
                    ResolveError::UnresolvedReference {
                        reference: target.to_string(),
                        location: pointer::child(&at, "mapping"),
                    }
                })?;
                let link = self.resolve_schema(&target_location, node)?;
                mapping.insert(tag.clone(), link);
            }
        }

        Ok(ResolvedDiscriminator {
            property_name,
            mapping,
        })
    }

    /// Resolve a parameter list entry, following references.
    pub fn resolve_parameter(
        &mut self,
        location: &str,
        value: &'a Value,
    ) -> Result<ResolvedParameter, ResolveError> {
        let (location, raw, parameter) = self.resolve_object::<Parameter>(location, value)?;

        let schema = match raw.get("schema") {
            Some(schema) => Some(self.resolve_schema(&pointer::child(&location, "schema"), schema)?),
            None => self.resolve_content_schema(&location, raw, &parameter.content)?.1,
        };

        Ok(ResolvedParameter {
            name: parameter.name,
            location: parameter.location,
            required: parameter.required,
            description: parameter.description,
            deprecated: parameter.deprecated.unwrap_or(false),
            schema,
            source: location,
        })
    }

    /// Resolve the media type a client should use from a `content` map.
    fn resolve_content_schema(
        &mut self,
        location: &str,
        raw: &'a Value,
        content: &IndexMap<String, MediaType>,
    ) -> Result<(Option<String>, Option<SchemaLink>), ResolveError> {
        let Some((content_type, _)) = preferred_media_type(content) else {
            return Ok((None, None));
        };
        let media_location = pointer::child(&pointer::child(location, "content"), content_type);
        let schema = match raw
            .get("content")
            .and_then(|c| c.get(content_type))
            .and_then(|m| m.get("schema"))
        {
            Some(schema) => {
                Some(self.resolve_schema(&pointer::child(&media_location, "schema"), schema)?)
            }
            None => None,
        };
        Ok((Some(content_type.clone()), schema))
    }

    /// Resolve a request body, following references.
    pub fn resolve_request_body(
        &mut self,
        location: &str,
        value: &'a Value,
    ) -> Result<ResolvedBody, ResolveError> {
        let (location, raw, body) = self.resolve_object::<RequestBody>(location, value)?;
        let (content_type, schema) = self.resolve_content_schema(&location, raw, &body.content)?;
        Ok(ResolvedBody {
            content_type,
            required: body.required,
            description: body.description,
            schema,
        })
    }

    /// Resolve one response entry, following references.
    pub fn resolve_response(
        &mut self,
        status: &str,
        location: &str,
        value: &'a Value,
    ) -> Result<ResolvedResponse, ResolveError> {
        let (location, raw, response) = self.resolve_object::<Response>(location, value)?;
        let (content_type, schema) =
            self.resolve_content_schema(&location, raw, &response.content)?;
        Ok(ResolvedResponse {
            status: status.to_string(),
            description: response.description,
            content_type,
            schema,
        })
    }

    /// Resolve one operation of a path item. `shared` holds the path-level
    /// parameters, already resolved.
    pub fn resolve_operation(
        &mut self,
        path: &str,
        method: HttpMethod,
        location: &str,
        value: &'a Value,
        shared: &[ResolvedParameter],
    ) -> Result<ResolvedOperation, ResolveError> {
        let operation =
            Operation::deserialize(value).map_err(|e| ResolveError::InvalidNode {
                location: location.to_string(),
                message: e.to_string(),
            })?;

        let mut parameters: Vec<ResolvedParameter> = shared.to_vec();
        if let Some(raw_params) = value.get("parameters").and_then(Value::as_array) {
            let base = pointer::child(location, "parameters");
            for (i, raw) in raw_params.iter().enumerate() {
                let param = self.resolve_parameter(&pointer::child(&base, &i.to_string()), raw)?;
                match parameters
                    .iter_mut()
                    .find(|p| p.name == param.name && p.location == param.location)
                {
                    Some(existing) => *existing = param,
                    None => parameters.push(param),
                }
            }
        }

        let request_body = match value.get("requestBody") {
            Some(raw) => Some(
                self.resolve_request_body(&pointer::child(location, "requestBody"), raw)?,
            ),
            None => None,
        };

        let mut responses = Vec::new();
        if let Some(raw_responses) = value.get("responses").and_then(Value::as_object) {
            let base = pointer::child(location, "responses");
            for (status, raw) in raw_responses {
                let at = pointer::child(&base, status);
                responses.push(self.resolve_response(status, &at, raw)?);
            }
        }

        Ok(ResolvedOperation {
            path: path.to_string(),
            method,
            location: location.to_string(),
            operation_id: operation.operation_id,
            summary: operation.summary,
            description: operation.description,
            tags: operation.tags,
            deprecated: operation.deprecated.unwrap_or(false),
            parameters,
            request_body,
            responses,
            security: operation.security,
        })
    }
}

fn reference_of(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}
