use indexmap::IndexMap;
use serde::Serialize;

use crate::parse::schema::SchemaKeywords;

/// Stable identity of a resolved schema node (its arena index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

/// A direct edge to another node.
///
/// `deferred` marks a back edge: the target was still being resolved when
/// the edge was created, so following it re-enters a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SchemaLink {
    pub target: NodeId,
    pub deferred: bool,
}

/// `additionalProperties`, with the schema form resolved to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalLink {
    Allowed(bool),
    Schema(SchemaLink),
}

/// A discriminator whose mapping targets are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDiscriminator {
    pub property_name: String,
    pub mapping: IndexMap<String, SchemaLink>,
}

/// A schema object with every subschema replaced by a link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSchema {
    pub keywords: SchemaKeywords,
    pub properties: IndexMap<String, SchemaLink>,
    pub additional_properties: Option<AdditionalLink>,
    pub items: Option<SchemaLink>,
    pub all_of: Vec<SchemaLink>,
    pub one_of: Vec<SchemaLink>,
    pub any_of: Vec<SchemaLink>,
    pub not: Option<SchemaLink>,
    pub discriminator: Option<ResolvedDiscriminator>,
}

/// One node of the resolved schema graph.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub id: NodeId,
    /// Location of the node in the source document (`#/components/schemas/Pet`).
    pub location: String,
    /// Set when the node is a named entry of `components.schemas`.
    pub component: Option<String>,
    pub schema: ResolvedSchema,
}

/// Arena of resolved schema nodes keyed by location.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    by_location: IndexMap<String, NodeId>,
    components: IndexMap<String, SchemaLink>,
}

impl SchemaGraph {
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node materialized for a location, if any.
    pub fn lookup(&self, location: &str) -> Option<NodeId> {
        self.by_location.get(location).copied()
    }

    /// Entries of `components.schemas` in declaration order. A component that
    /// is itself a `$ref` links to the node of its target.
    pub fn components(&self) -> &IndexMap<String, SchemaLink> {
        &self.components
    }

    pub(crate) fn reserve(&mut self, location: String, component: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_location.insert(location.clone(), id);
        self.nodes.push(SchemaNode {
            id,
            location,
            component,
            schema: ResolvedSchema::default(),
        });
        id
    }

    pub(crate) fn fill(&mut self, id: NodeId, schema: ResolvedSchema) {
        self.nodes[id.0].schema = schema;
    }

    pub(crate) fn add_component(&mut self, name: String, link: SchemaLink) {
        self.components.insert(name, link);
    }
}
