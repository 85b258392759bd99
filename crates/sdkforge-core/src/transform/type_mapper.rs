//! Normalized schemas → use-site [`TypeRef`]s and named [`TypeDescriptor`]s.

use std::collections::{HashMap, HashSet};

use heck::ToPascalCase;
use indexmap::IndexMap;
use serde_json::Value;

use super::name_normalizer::{normalize_name, type_name};
use super::name_registry::{Claimed, NameRegistry};
use super::normalizer::NormalizedTable;
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::MapError;
use crate::ir::normalized::{AdditionalShape, EnumShape, ObjectShape, Primitive, SchemaKind, UnionShape};
use crate::ir::{
    Builtin, DiscriminatorDef, EnumDef, EnumMember, FieldDef, ObjectDef, TypeDefinition,
    TypeDescriptor, TypeRef, UnionDef,
};
use crate::resolve::{NodeId, SchemaGraph, SchemaLink, pointer};

const PERMISSIVE_NOTE: &str =
    "Variants are tried in order and the first that accepts the payload wins.";

/// Named types in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeTable {
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn into_vec(self) -> Vec<TypeDescriptor> {
        self.types.into_values().collect()
    }

    /// True when the reference mentions a union decoded without a discriminator.
    pub fn mentions_permissive(&self, ty: &TypeRef) -> bool {
        ty.referenced_names()
            .iter()
            .any(|name| self.get(name).is_some_and(TypeDescriptor::is_permissive))
    }
}

/// Maps normalized schemas to target types, sharing one name registry for
/// the whole run.
pub struct TypeMapper<'a, 'd> {
    document: &'a Value,
    graph: &'a SchemaGraph,
    schemas: &'a NormalizedTable,
    registry: NameRegistry,
    diagnostics: &'d mut Diagnostics,
    /// Declared names in declaration order; definitions land in `defined`.
    declared: Vec<String>,
    defined: HashMap<String, TypeDescriptor>,
    memo: HashMap<NodeId, TypeRef>,
    in_progress: HashSet<NodeId>,
    failed: HashSet<NodeId>,
    errors: Vec<MapError>,
}

impl<'a, 'd> TypeMapper<'a, 'd> {
    pub fn new(
        document: &'a Value,
        graph: &'a SchemaGraph,
        schemas: &'a NormalizedTable,
        registry: NameRegistry,
        diagnostics: &'d mut Diagnostics,
    ) -> Self {
        Self {
            document,
            graph,
            schemas,
            registry,
            diagnostics,
            declared: Vec::new(),
            defined: HashMap::new(),
            memo: HashMap::new(),
            in_progress: HashSet::new(),
            failed: HashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Map every component schema in declaration order.
    pub fn map_components(&mut self) {
        let graph = self.graph;
        for (name, link) in graph.components() {
            if graph.node(link.target).component.as_deref() == Some(name.as_str()) {
                self.map(link.target, &type_name(name));
            } else {
                self.map_component_alias(name, *link);
            }
        }
    }

    /// `components.schemas.X: {$ref: ...}` names another node.
    fn map_component_alias(&mut self, name: &str, link: SchemaLink) {
        let location = pointer::component("schemas", name);
        let shape = pointer::lookup(self.document, &location)
            .cloned()
            .unwrap_or(Value::Null);
        let claimed = match self.registry.claim(&type_name(name), &location, &shape) {
            Ok(Claimed::New(claimed)) => claimed,
            Ok(Claimed::Shared(_)) => return,
            Err(err) => {
                self.errors.push(err);
                return;
            }
        };
        self.declared.push(claimed.clone());
        let target = self.map(link.target, &claimed);
        let source = self.schemas.get(link.target);
        self.define(TypeDescriptor {
            name: claimed,
            definition: TypeDefinition::Alias { target },
            source: location,
            description: source.description.clone(),
            deprecated: source.deprecated,
            notes: Vec::new(),
        });
    }

    /// The use-site type of a node. `context` is the PascalCase name a new
    /// named type would get when the node has no component name.
    pub fn map(&mut self, id: NodeId, context: &str) -> TypeRef {
        if let Some(ty) = self.memo.get(&id) {
            return ty.clone();
        }
        if self.failed.contains(&id) {
            return TypeRef::any();
        }
        if !self.in_progress.insert(id) {
            let location = self.schemas.get(id).location.clone();
            return self.fail(
                id,
                MapError::UnsupportedConstruct {
                    path: location,
                    detail: "recursive schema has no name to refer to".to_string(),
                },
            );
        }
        let result = self.map_kind(id, context);
        self.in_progress.remove(&id);

        match result {
            Ok(ty) => {
                self.memo.insert(id, ty.clone());
                ty
            }
            Err(err) => self.fail(id, err),
        }
    }

    fn fail(&mut self, id: NodeId, err: MapError) -> TypeRef {
        log::debug!("mapping failed: {err}");
        self.errors.push(err);
        self.failed.insert(id);
        self.memo.insert(id, TypeRef::any());
        TypeRef::any()
    }

    fn map_kind(&mut self, id: NodeId, context: &str) -> Result<TypeRef, MapError> {
        let schemas = self.schemas;
        let schema = schemas.get(id);
        let base = schema
            .component
            .as_deref()
            .map(type_name)
            .unwrap_or_else(|| context.to_string());
        let is_component = schema.component.is_some();

        let ty = match &schema.kind {
            SchemaKind::Object(shape) if !shape.properties.is_empty() => {
                return self.named(id, &base, |mapper, name| {
                    mapper.object_definition(name, shape).map(TypeDefinition::Object)
                });
            }
            SchemaKind::Enumeration(shape) if shape.values.len() > 1 || is_component => {
                return self.named(id, &base, |mapper, _| {
                    Ok(TypeDefinition::Enumeration(mapper.enum_definition(shape)))
                });
            }
            SchemaKind::Union(shape) if shape.variants.len() > 1 => {
                return self.named(id, &base, |mapper, name| {
                    mapper.union_definition(id, name, shape).map(TypeDefinition::Union)
                });
            }
            SchemaKind::Negation(_) => {
                return Err(MapError::UnsupportedConstruct {
                    path: schema.location.clone(),
                    detail: "a schema defined only by `not` has no target type".to_string(),
                });
            }
            SchemaKind::Intersection(members) if members.len() > 1 => {
                return Err(MapError::UnsupportedConstruct {
                    path: pointer::child(&schema.location, "allOf"),
                    detail: "allOf members that are unions or arrays cannot be merged"
                        .to_string(),
                });
            }
            _ if is_component => {
                return self.named(id, &base, |mapper, name| {
                    let target = mapper.structural(id, name)?;
                    Ok(TypeDefinition::Alias { target })
                });
            }
            _ => self.structural(id, &base)?,
        };

        Ok(if schema.nullable { ty.into_nullable() } else { ty })
    }

    /// Types that need no declaration of their own.
    fn structural(&mut self, id: NodeId, context: &str) -> Result<TypeRef, MapError> {
        let schemas = self.schemas;
        let schema = schemas.get(id);
        Ok(match &schema.kind {
            SchemaKind::Primitive(p) => self.builtin(*p, schema.constraints.format.as_deref(), &schema.location),
            SchemaKind::Enumeration(EnumShape { values, .. }) => values
                .first()
                .cloned()
                .map(TypeRef::Literal)
                .unwrap_or_else(TypeRef::any),
            SchemaKind::Object(shape) => TypeRef::Map(Box::new(match &shape.additional {
                Some(AdditionalShape::Schema(link)) => {
                    self.map(link.target, &format!("{context}Value"))
                }
                Some(AdditionalShape::Any) | None => TypeRef::any(),
            })),
            SchemaKind::Array(items) => TypeRef::Sequence(Box::new(match items {
                Some(link) => self.map(link.target, &format!("{context}Item")),
                None => TypeRef::any(),
            })),
            SchemaKind::Union(UnionShape { variants, .. }) => match variants.first() {
                Some(only) => self.map(only.target, context),
                None => TypeRef::builtin(Builtin::Null),
            },
            SchemaKind::Intersection(members) => match members.first() {
                Some(only) => self.map(only.target, context),
                None => TypeRef::any(),
            },
            SchemaKind::Negation(_) => TypeRef::any(),
        })
    }

    /// Declare a named type before mapping its children so they can refer
    /// back to it.
    fn named<F>(&mut self, id: NodeId, base: &str, build: F) -> Result<TypeRef, MapError>
    where
        F: FnOnce(&mut Self, &str) -> Result<TypeDefinition, MapError>,
    {
        let schemas = self.schemas;
        let schema = schemas.get(id);
        let shape = pointer::lookup(self.document, &schema.location)
            .cloned()
            .unwrap_or(Value::Null);

        let use_site = |name: String| {
            let ty = TypeRef::Named(name);
            if schema.nullable { ty.into_nullable() } else { ty }
        };

        let name = match self.registry.claim(base, &schema.location, &shape)? {
            Claimed::Shared(existing) => return Ok(use_site(existing)),
            Claimed::New(name) => name,
        };
        self.declared.push(name.clone());
        self.memo.insert(id, use_site(name.clone()));

        let definition = build(self, &name)?;
        let mut notes = Vec::new();
        if matches!(&definition, TypeDefinition::Union(u) if u.discriminator.is_none()) {
            notes.push(PERMISSIVE_NOTE.to_string());
        }
        self.define(TypeDescriptor {
            name: name.clone(),
            definition,
            source: schema.location.clone(),
            description: schema.description.clone().or_else(|| schema.title.clone()),
            deprecated: schema.deprecated,
            notes,
        });
        Ok(use_site(name))
    }

    fn define(&mut self, descriptor: TypeDescriptor) {
        log::debug!("defined type {} from {}", descriptor.name, descriptor.source);
        self.defined.insert(descriptor.name.clone(), descriptor);
    }

    fn object_definition(&mut self, name: &str, shape: &ObjectShape) -> Result<ObjectDef, MapError> {
        let schemas = self.schemas;
        let mut fields = Vec::with_capacity(shape.properties.len());
        for property in &shape.properties {
            let context = format!("{name}{}", type_name(&property.name));
            let ty = self.map(property.schema.target, &context);
            let child = schemas.get(property.schema.target);
            fields.push(FieldDef {
                name: normalize_name(&property.name),
                wire_name: property.name.clone(),
                ty,
                required: property.required,
                default: child.default.clone(),
                description: child.description.clone(),
                read_only: child.read_only,
                write_only: child.write_only,
                deprecated: child.deprecated,
            });
        }
        let additional = match &shape.additional {
            Some(AdditionalShape::Any) => Some(TypeRef::any()),
            Some(AdditionalShape::Schema(link)) => Some(self.map(link.target, &format!("{name}Value"))),
            None => None,
        };
        Ok(ObjectDef { fields, additional })
    }

    fn enum_definition(&self, shape: &EnumShape) -> EnumDef {
        let members = shape
            .values
            .iter()
            .map(|value| EnumMember {
                name: normalize_name(&member_label(value)),
                value: value.clone(),
            })
            .collect();
        EnumDef {
            base: primitive_builtin(shape.base),
            members,
        }
    }

    fn union_definition(&mut self, id: NodeId, name: &str, shape: &UnionShape) -> Result<UnionDef, MapError> {
        let variants: Vec<TypeRef> = shape
            .variants
            .iter()
            .enumerate()
            .map(|(i, link)| self.map(link.target, &format!("{name}Variant{}", i + 1)))
            .collect();

        let discriminator = match &shape.discriminator {
            Some(d) => {
                let mut mapping = IndexMap::new();
                for (tag, link) in &d.mapping {
                    let context = format!("{name}{}", tag.to_pascal_case());
                    let ty = self.map(link.target, &context);
                    mapping.entry(tag.clone()).or_insert(ty);
                }
                Some(DiscriminatorDef {
                    property: d.property.clone(),
                    mapping,
                })
            }
            None => {
                let location = self.schemas.get(id).location.clone();
                self.diagnostics.warn(
                    WarningKind::UndiscriminatedUnion,
                    location,
                    format!("{name} has no discriminator; it is decoded permissively"),
                );
                None
            }
        };

        Ok(UnionDef {
            variants,
            discriminator,
        })
    }

    fn builtin(&mut self, primitive: Primitive, format: Option<&str>, location: &str) -> TypeRef {
        let base = primitive_builtin(primitive);
        let Some(format) = format else {
            return TypeRef::builtin(base);
        };
        let builtin = match (primitive, format) {
            (Primitive::String, "date") => Builtin::Date,
            (Primitive::String, "date-time") => Builtin::DateTime,
            (Primitive::String, "byte" | "binary") => Builtin::Bytes,
            (Primitive::String, "uuid") => Builtin::Uuid,
            (Primitive::Integer, "int32" | "int64") => Builtin::Integer,
            (Primitive::Number, "float" | "double") => Builtin::Number,
            _ => {
                self.diagnostics.warn(
                    WarningKind::FormatFallback,
                    location,
                    format!("format `{format}` has no dedicated type; using {}", primitive.as_str()),
                );
                base
            }
        };
        TypeRef::Builtin {
            builtin,
            format: Some(format.to_string()),
        }
    }

    /// The diagnostics sink shared with later stages.
    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut *self.diagnostics
    }

    /// Named types in declaration order plus every mapping failure.
    pub fn finish(self) -> (TypeTable, Vec<MapError>) {
        let mut defined = self.defined;
        let types = self
            .declared
            .into_iter()
            .filter_map(|name| defined.remove(&name).map(|t| (name, t)))
            .collect();
        (TypeTable { types }, self.errors)
    }
}

fn primitive_builtin(primitive: Primitive) -> Builtin {
    match primitive {
        Primitive::String => Builtin::String,
        Primitive::Integer => Builtin::Integer,
        Primitive::Number => Builtin::Number,
        Primitive::Boolean => Builtin::Boolean,
        Primitive::Null => Builtin::Null,
        Primitive::Any => Builtin::Any,
    }
}

/// The identifier an enum member is named after.
fn member_label(value: &Value) -> String {
    match value {
        Value::String(s) if s.trim().is_empty() => "empty".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format!("value_{}", n.to_string().replace(['-', '.'], "_")),
        other => format!("value_{other}"),
    }
}
