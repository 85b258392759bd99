//! Schema normalization: one resolved node → one [`NormalizedSchema`].

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::SchemaError;
use crate::ir::normalized::{
    AdditionalShape, Constraints, DiscriminatorShape, EnumShape, NormalizedSchema, ObjectShape,
    Primitive, PropertyShape, SchemaKind, UnionShape,
};
use crate::parse::schema::{ExclusiveBound, SchemaType};
use crate::resolve::{AdditionalLink, NodeId, SchemaGraph, SchemaLink, SchemaNode};

/// Normalized schemas for every node of a graph, indexed by node id.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    schemas: Vec<NormalizedSchema>,
}

impl NormalizedTable {
    pub fn get(&self, id: NodeId) -> &NormalizedSchema {
        &self.schemas[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedSchema> {
        self.schemas.iter()
    }

    /// Follow single-member intersections to the node they alias.
    pub fn effective(&self, mut id: NodeId) -> NodeId {
        let mut seen = HashSet::new();
        while let SchemaKind::Intersection(members) = &self.get(id).kind {
            match members.as_slice() {
                [only] if seen.insert(id) => id = only.target,
                _ => break,
            }
        }
        id
    }
}

/// Normalize every node of the graph.
///
/// A node that fails gets an unconstrained placeholder so later stages can
/// keep collecting errors; the failures are returned alongside the table.
pub fn normalize_graph(
    graph: &SchemaGraph,
    diagnostics: &mut Diagnostics,
) -> (NormalizedTable, Vec<SchemaError>) {
    let mut normalizer = SchemaNormalizer::new(graph, diagnostics);
    for node in graph.nodes() {
        let _ = normalizer.ensure(node.id);
    }
    normalizer.finish()
}

/// Marker for a node whose normalization failed; the cause is already recorded.
#[derive(Debug, Clone, Copy)]
struct Failed;

/// Error from building one node: a new error, or a failed dependency.
type BuildResult<T> = Result<T, Option<SchemaError>>;

/// Coarse shape used to detect conflicting property definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeClass {
    Primitive(Primitive),
    Object,
    Array,
}

impl ShapeClass {
    fn describe(self) -> &'static str {
        match self {
            ShapeClass::Primitive(p) => p.as_str(),
            ShapeClass::Object => "object",
            ShapeClass::Array => "array",
        }
    }

    fn conflicts_with(self, other: ShapeClass) -> bool {
        match (self, other) {
            (ShapeClass::Primitive(a), ShapeClass::Primitive(b)) => !a.compatible_with(b),
            (ShapeClass::Primitive(Primitive::Any), _) | (_, ShapeClass::Primitive(Primitive::Any)) => {
                false
            }
            (a, b) => a != b,
        }
    }
}

struct SchemaNormalizer<'g, 'd> {
    graph: &'g SchemaGraph,
    done: Vec<Option<NormalizedSchema>>,
    failed: HashSet<NodeId>,
    in_progress: HashSet<NodeId>,
    diagnostics: &'d mut Diagnostics,
    errors: Vec<SchemaError>,
}

impl<'g, 'd> SchemaNormalizer<'g, 'd> {
    fn new(graph: &'g SchemaGraph, diagnostics: &'d mut Diagnostics) -> Self {
        Self {
            graph,
            done: vec![None; graph.len()],
            failed: HashSet::new(),
            in_progress: HashSet::new(),
            diagnostics,
            errors: Vec::new(),
        }
    }

    fn finish(self) -> (NormalizedTable, Vec<SchemaError>) {
        let graph = self.graph;
        let schemas = self
            .done
            .into_iter()
            .enumerate()
            .map(|(i, schema)| schema.unwrap_or_else(|| placeholder(graph.node(NodeId(i)))))
            .collect();
        (NormalizedTable { schemas }, self.errors)
    }

    fn get(&self, id: NodeId) -> &NormalizedSchema {
        // `ensure` always fills the slot before returning.
        self.done[id.0]
            .as_ref()
            .unwrap_or_else(|| unreachable!("node {id:?} read before normalization"))
    }

    fn ensure(&mut self, id: NodeId) -> Result<(), Failed> {
        if self.done[id.0].is_some() {
            return if self.failed.contains(&id) {
                Err(Failed)
            } else {
                Ok(())
            };
        }

        let graph = self.graph;
        self.in_progress.insert(id);
        let built = self.build(graph.node(id));
        self.in_progress.remove(&id);

        match built {
            Ok(schema) => {
                self.done[id.0] = Some(schema);
                Ok(())
            }
            Err(cause) => {
                if let Some(err) = cause {
                    self.errors.push(err);
                }
                self.failed.insert(id);
                self.done[id.0] = Some(placeholder(graph.node(id)));
                Err(Failed)
            }
        }
    }

    /// Normalize a dependency, turning its failure into a silent failure of
    /// the dependant.
    fn require(&mut self, id: NodeId) -> BuildResult<&NormalizedSchema> {
        self.ensure(id).map_err(|Failed| None)?;
        Ok(self.get(id))
    }

    fn build(&mut self, node: &'g SchemaNode) -> BuildResult<NormalizedSchema> {
        let schema = &node.schema;
        let keywords = &schema.keywords;
        let location = node.location.as_str();

        let declared: Vec<SchemaType> = keywords
            .schema_type
            .as_ref()
            .map(|t| t.types().to_vec())
            .unwrap_or_default();
        let only_null = !declared.is_empty() && declared.iter().all(|t| *t == SchemaType::Null);
        let mut nullable = keywords.nullable == Some(true) || declared.contains(&SchemaType::Null);
        let types: Vec<SchemaType> = declared
            .into_iter()
            .filter(|t| *t != SchemaType::Null)
            .collect();

        let is_union = !schema.one_of.is_empty() || !schema.any_of.is_empty();
        let kind = if is_union {
            self.union_kind(node, &mut nullable)?
        } else if !schema.all_of.is_empty() {
            self.intersection_kind(node, &types)?
        } else if !keywords.enum_values.is_empty() || keywords.const_value.is_some() {
            enum_kind(node, &types, &mut nullable)
        } else if let Some(negated) = schema.not.filter(|_| is_bare(node, &types)) {
            SchemaKind::Negation(negated)
        } else {
            if schema.not.is_some() {
                self.diagnostics.warn(
                    WarningKind::IgnoredConstruct,
                    location,
                    "`not` next to type information is ignored",
                );
            }
            self.structural_kind(node, &types, only_null)
        };

        if matches!(kind, SchemaKind::Primitive(Primitive::Null)) {
            nullable = true;
        }

        let default = keywords
            .default_value
            .clone()
            .and_then(|value| self.check_default(location, &kind, nullable, value));

        let mut constraints = constraints_of(node);
        // allOf members are only normalized on the intersection path.
        if matches!(kind, SchemaKind::Primitive(_)) && !is_union {
            for member in &schema.all_of {
                constraints.merge_missing(&self.get(member.target).constraints);
            }
        }

        Ok(NormalizedSchema {
            node: node.id,
            location: node.location.clone(),
            component: node.component.clone(),
            kind,
            nullable,
            constraints,
            default,
            title: keywords.title.clone(),
            description: keywords.description.clone(),
            read_only: keywords.read_only.unwrap_or(false),
            write_only: keywords.write_only.unwrap_or(false),
            deprecated: keywords.deprecated.unwrap_or(false),
        })
    }

    fn structural_kind(
        &mut self,
        node: &SchemaNode,
        types: &[SchemaType],
        only_null: bool,
    ) -> SchemaKind {
        let schema = &node.schema;
        let looks_like_object =
            !schema.properties.is_empty() || schema.additional_properties.is_some();
        match types {
            [] if only_null => SchemaKind::Primitive(Primitive::Null),
            [] if looks_like_object => SchemaKind::Object(object_shape(node)),
            [] if schema.items.is_some() => SchemaKind::Array(schema.items),
            [] => SchemaKind::Primitive(Primitive::Any),
            [SchemaType::Object] => SchemaKind::Object(object_shape(node)),
            [SchemaType::Array] => SchemaKind::Array(schema.items),
            [SchemaType::String] => SchemaKind::Primitive(Primitive::String),
            [SchemaType::Integer] => SchemaKind::Primitive(Primitive::Integer),
            [SchemaType::Number] => SchemaKind::Primitive(Primitive::Number),
            [SchemaType::Boolean] => SchemaKind::Primitive(Primitive::Boolean),
            [SchemaType::Null] => SchemaKind::Primitive(Primitive::Null),
            _ => {
                self.diagnostics.warn(
                    WarningKind::IgnoredConstruct,
                    &node.location,
                    "a schema with several non-null types is treated as untyped",
                );
                SchemaKind::Primitive(Primitive::Any)
            }
        }
    }

    fn union_kind(&mut self, node: &SchemaNode, nullable: &mut bool) -> BuildResult<SchemaKind> {
        let schema = &node.schema;
        let members = if schema.one_of.is_empty() {
            &schema.any_of
        } else {
            &schema.one_of
        };

        if !schema.properties.is_empty() || !schema.all_of.is_empty() {
            self.diagnostics.warn(
                WarningKind::IgnoredConstruct,
                &node.location,
                "properties and allOf next to oneOf/anyOf are ignored",
            );
        }

        let mut variants = Vec::new();
        for link in members {
            if self.is_null_variant(*link)? {
                *nullable = true;
            } else {
                variants.push(*link);
            }
        }

        if variants.is_empty() {
            return Ok(SchemaKind::Primitive(Primitive::Null));
        }

        let discriminator = schema.discriminator.as_ref().map(|d| {
            let mut mapping: Vec<(String, SchemaLink)> = d
                .mapping
                .iter()
                .map(|(tag, link)| (tag.clone(), *link))
                .collect();
            for variant in &variants {
                if mapping.iter().any(|(_, l)| l.target == variant.target) {
                    continue;
                }
                if let Some(name) = &self.graph.node(variant.target).component {
                    mapping.push((name.clone(), *variant));
                }
            }
            DiscriminatorShape {
                property: d.property_name.clone(),
                mapping,
            }
        });

        Ok(SchemaKind::Union(UnionShape {
            variants,
            discriminator,
        }))
    }

    fn is_null_variant(&mut self, link: SchemaLink) -> BuildResult<bool> {
        // A variant still being normalized has structure; null-only schemas
        // cannot recurse.
        if self.in_progress.contains(&link.target) {
            return Ok(false);
        }
        let variant = self.require(link.target)?;
        Ok(matches!(variant.kind, SchemaKind::Primitive(Primitive::Null)))
    }

    fn intersection_kind(
        &mut self,
        node: &SchemaNode,
        own_types: &[SchemaType],
    ) -> BuildResult<SchemaKind> {
        let schema = &node.schema;
        let location = &node.location;

        let mut contributing: Vec<(SchemaLink, NodeId)> = Vec::new();
        for link in &schema.all_of {
            if self.in_progress.contains(&link.target) {
                return Err(Some(SchemaError::RecursiveComposition(location.clone())));
            }
            self.require(link.target)?;
            let effective = self.effective(link.target);
            if !self.get(effective).is_unconstrained() {
                contributing.push((*link, effective));
            }
        }

        let own_object = !schema.properties.is_empty()
            || schema.additional_properties.is_some()
            || own_types == [SchemaType::Object];

        if contributing.is_empty() {
            return Ok(self.structural_kind(node, own_types, false));
        }
        if contributing.len() == 1 && !own_object && schema.keywords.required.is_empty() {
            return Ok(SchemaKind::Intersection(vec![contributing[0].0]));
        }

        let mut objects = Vec::new();
        let mut primitives = Vec::new();
        let mut complex = Vec::new();
        for (link, effective) in &contributing {
            match &self.get(*effective).kind {
                SchemaKind::Object(_) => objects.push(*effective),
                SchemaKind::Primitive(_) | SchemaKind::Enumeration(_) => primitives.push(*effective),
                _ => complex.push(*link),
            }
        }

        if !complex.is_empty() {
            return Ok(SchemaKind::Intersection(
                contributing.iter().map(|(link, _)| *link).collect(),
            ));
        }

        if !primitives.is_empty() {
            if !objects.is_empty() || own_object {
                let first = self.get(primitives[0]).primitive().unwrap_or(Primitive::Any);
                return Err(Some(SchemaError::Conflicting {
                    path: pointer_child(location, "allOf"),
                    detail: format!("allOf mixes object and {} members", first.as_str()),
                }));
            }
            return self.merge_primitives(location, &primitives);
        }

        self.merge_objects(node, &objects).map(SchemaKind::Object)
    }

    fn merge_primitives(&mut self, location: &str, members: &[NodeId]) -> BuildResult<SchemaKind> {
        let mut merged: Option<Primitive> = None;
        let mut enumeration: Option<EnumShape> = None;
        for id in members {
            let member = self.get(*id);
            if let SchemaKind::Enumeration(shape) = &member.kind {
                enumeration.get_or_insert_with(|| shape.clone());
            }
            let kind = member.primitive().unwrap_or(Primitive::Any);
            merged = match merged {
                None => Some(kind),
                Some(current) if !current.compatible_with(kind) => {
                    return Err(Some(SchemaError::Conflicting {
                        path: pointer_child(location, "allOf"),
                        detail: format!(
                            "allOf combines {} and {} members",
                            current.as_str(),
                            kind.as_str()
                        ),
                    }));
                }
                // Integer is the narrower of integer/number.
                Some(Primitive::Any) | Some(Primitive::Number) => Some(kind),
                Some(current) => Some(current),
            };
        }
        Ok(match enumeration {
            Some(shape) => SchemaKind::Enumeration(shape),
            None => SchemaKind::Primitive(merged.unwrap_or(Primitive::Any)),
        })
    }

    fn merge_objects(&mut self, node: &SchemaNode, members: &[NodeId]) -> BuildResult<ObjectShape> {
        let mut sources: Vec<ObjectShape> = members
            .iter()
            .filter_map(|id| self.get(*id).as_object().cloned())
            .collect();
        sources.push(object_shape(node));

        let mut properties: IndexMap<String, PropertyShape> = IndexMap::new();
        let mut additional = None;
        for source in sources {
            for property in source.properties {
                match properties.get(&property.name).map(|p| p.schema) {
                    Some(existing) => {
                        self.check_property_conflict(node, &property.name, existing, property.schema)?;
                        if let Some(slot) = properties.get_mut(&property.name) {
                            slot.required |= property.required;
                        }
                    }
                    None => {
                        properties.insert(property.name.clone(), property);
                    }
                }
            }
            additional = additional.or(source.additional);
        }

        for name in &node.schema.keywords.required {
            if let Some(property) = properties.get_mut(name) {
                property.required = true;
            }
        }

        Ok(ObjectShape {
            properties: properties.into_values().collect(),
            additional,
        })
    }

    fn check_property_conflict(
        &mut self,
        node: &SchemaNode,
        name: &str,
        first: SchemaLink,
        second: SchemaLink,
    ) -> BuildResult<()> {
        if first.target == second.target {
            return Ok(());
        }
        let (Some(a), Some(b)) = (self.shape_class(first)?, self.shape_class(second)?) else {
            return Ok(());
        };
        if a.conflicts_with(b) {
            return Err(Some(SchemaError::Conflicting {
                path: pointer_child(&pointer_child(&node.location, "properties"), name),
                detail: format!(
                    "property `{name}` is {} in one allOf member and {} in another",
                    a.describe(),
                    b.describe()
                ),
            }));
        }
        Ok(())
    }

    fn shape_class(&mut self, link: SchemaLink) -> BuildResult<Option<ShapeClass>> {
        if link.deferred || self.in_progress.contains(&link.target) {
            return Ok(None);
        }
        self.require(link.target)?;
        let effective = self.effective(link.target);
        Ok(match &self.get(effective).kind {
            SchemaKind::Primitive(p) => Some(ShapeClass::Primitive(*p)),
            SchemaKind::Enumeration(e) => Some(ShapeClass::Primitive(e.base)),
            SchemaKind::Object(_) => Some(ShapeClass::Object),
            SchemaKind::Array(_) => Some(ShapeClass::Array),
            _ => None,
        })
    }

    fn effective(&self, mut id: NodeId) -> NodeId {
        let mut seen = HashSet::new();
        while let Some(SchemaKind::Intersection(members)) = self.done[id.0].as_ref().map(|s| &s.kind) {
            match members.as_slice() {
                [only] if seen.insert(id) && self.done[only.target.0].is_some() => id = only.target,
                _ => break,
            }
        }
        id
    }

    fn check_default(
        &mut self,
        location: &str,
        kind: &SchemaKind,
        nullable: bool,
        value: Value,
    ) -> Option<Value> {
        let fits = match kind {
            _ if value.is_null() => nullable,
            SchemaKind::Primitive(p) => p.admits(&value),
            SchemaKind::Enumeration(e) => e.values.contains(&value),
            SchemaKind::Object(_) => value.is_object(),
            SchemaKind::Array(_) => value.is_array(),
            SchemaKind::Union(_) | SchemaKind::Intersection(_) | SchemaKind::Negation(_) => true,
        };
        if fits {
            return Some(value);
        }
        let mismatch = SchemaError::DefaultMismatch {
            path: location.to_string(),
            expected: kind_name(kind).to_string(),
            value: value.to_string(),
        };
        self.diagnostics
            .warn(WarningKind::DefaultMismatch, location, mismatch.to_string());
        None
    }
}

fn enum_kind(node: &SchemaNode, types: &[SchemaType], nullable: &mut bool) -> SchemaKind {
    let keywords = &node.schema.keywords;
    let raw: Vec<&Value> = if keywords.enum_values.is_empty() {
        keywords.const_value.iter().collect()
    } else {
        keywords.enum_values.iter().collect()
    };

    let mut values: Vec<Value> = Vec::new();
    for value in raw {
        if value.is_null() {
            *nullable = true;
        } else if !values.contains(value) {
            values.push(value.clone());
        }
    }

    if values.is_empty() {
        return SchemaKind::Primitive(Primitive::Null);
    }

    let base = match types {
        [SchemaType::String] => Primitive::String,
        [SchemaType::Integer] => Primitive::Integer,
        [SchemaType::Number] => Primitive::Number,
        [SchemaType::Boolean] => Primitive::Boolean,
        _ => values
            .iter()
            .map(Primitive::of_value)
            .reduce(|a, b| match (a, b) {
                _ if a == b => a,
                (Primitive::Integer, Primitive::Number) | (Primitive::Number, Primitive::Integer) => {
                    Primitive::Number
                }
                _ => Primitive::Any,
            })
            .unwrap_or(Primitive::Any),
    };

    SchemaKind::Enumeration(EnumShape { base, values })
}

fn object_shape(node: &SchemaNode) -> ObjectShape {
    let schema = &node.schema;
    let properties = schema
        .properties
        .iter()
        .map(|(name, link)| PropertyShape {
            name: name.clone(),
            schema: *link,
            required: schema.keywords.required.contains(name),
        })
        .collect();
    let additional = match schema.additional_properties {
        Some(AdditionalLink::Allowed(true)) => Some(AdditionalShape::Any),
        Some(AdditionalLink::Schema(link)) => Some(AdditionalShape::Schema(link)),
        Some(AdditionalLink::Allowed(false)) | None => None,
    };
    ObjectShape {
        properties,
        additional,
    }
}

/// True when a schema has nothing but (possibly) `not`.
fn is_bare(node: &SchemaNode, types: &[SchemaType]) -> bool {
    let schema = &node.schema;
    types.is_empty()
        && schema.properties.is_empty()
        && schema.items.is_none()
        && schema.additional_properties.is_none()
}

fn constraints_of(node: &SchemaNode) -> Constraints {
    let keywords = &node.schema.keywords;
    let (minimum, exclusive_minimum) = bound(keywords.minimum, keywords.exclusive_minimum);
    let (maximum, exclusive_maximum) = bound(keywords.maximum, keywords.exclusive_maximum);
    Constraints {
        format: keywords.format.clone(),
        pattern: keywords.pattern.clone(),
        minimum,
        maximum,
        exclusive_minimum,
        exclusive_maximum,
        min_length: keywords.min_length,
        max_length: keywords.max_length,
        min_items: keywords.min_items,
        max_items: keywords.max_items,
        unique_items: keywords.unique_items.unwrap_or(false),
    }
}

/// Combine a bound with its 3.0-style flag or 3.1-style exclusive value.
fn bound(inclusive: Option<f64>, exclusive: Option<ExclusiveBound>) -> (Option<f64>, bool) {
    match exclusive {
        Some(ExclusiveBound::Bound(value)) => (Some(value), true),
        Some(ExclusiveBound::Flag(flag)) => (inclusive, flag),
        None => (inclusive, false),
    }
}

fn kind_name(kind: &SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Primitive(p) => p.as_str(),
        SchemaKind::Object(_) => "object",
        SchemaKind::Array(_) => "array",
        SchemaKind::Union(_) => "union",
        SchemaKind::Intersection(_) => "intersection",
        SchemaKind::Enumeration(_) => "enumeration",
        SchemaKind::Negation(_) => "negation",
    }
}

fn pointer_child(location: &str, segment: &str) -> String {
    crate::resolve::pointer::child(location, segment)
}

fn placeholder(node: &SchemaNode) -> NormalizedSchema {
    NormalizedSchema {
        node: node.id,
        location: node.location.clone(),
        component: node.component.clone(),
        kind: SchemaKind::Primitive(Primitive::Any),
        nullable: false,
        constraints: Constraints::default(),
        default: None,
        title: None,
        description: None,
        read_only: false,
        write_only: false,
        deprecated: false,
    }
}
