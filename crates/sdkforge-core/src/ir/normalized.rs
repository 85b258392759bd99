//! The canonical schema shape produced by the normalizer.
//!
//! Children are [`SchemaLink`]s into the resolved graph, so a cycle stays a
//! back edge to an existing node and is never expanded.

use serde_json::Value;

use crate::resolve::{NodeId, SchemaLink};

/// Primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    /// No type information at all.
    Any,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Null => "null",
            Primitive::Any => "any",
        }
    }

    /// Whether values of the two kinds can share one declaration.
    pub fn compatible_with(self, other: Primitive) -> bool {
        use Primitive::*;
        self == other
            || matches!((self, other), (Integer, Number) | (Number, Integer))
            || self == Any
            || other == Any
    }

    /// Whether a JSON value is an instance of this kind.
    pub fn admits(self, value: &Value) -> bool {
        match self {
            Primitive::String => value.is_string(),
            Primitive::Integer => value.is_i64() || value.is_u64(),
            Primitive::Number => value.is_number(),
            Primitive::Boolean => value.is_boolean(),
            Primitive::Null => value.is_null(),
            Primitive::Any => true,
        }
    }

    /// The kind of a JSON value.
    pub fn of_value(value: &Value) -> Primitive {
        match value {
            Value::String(_) => Primitive::String,
            Value::Number(n) if n.is_f64() => Primitive::Number,
            Value::Number(_) => Primitive::Integer,
            Value::Bool(_) => Primitive::Boolean,
            Value::Null => Primitive::Null,
            Value::Array(_) | Value::Object(_) => Primitive::Any,
        }
    }
}

/// Validation keywords carried through normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

impl Constraints {
    /// Fill every unset keyword from `other`; set keywords win.
    pub fn merge_missing(&mut self, other: &Constraints) {
        macro_rules! fill {
            ($($field:ident),*) => {
                $(if self.$field.is_none() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        fill!(format, pattern, minimum, maximum, min_length, max_length, min_items, max_items);
        self.exclusive_minimum |= other.exclusive_minimum;
        self.exclusive_maximum |= other.exclusive_maximum;
        self.unique_items |= other.unique_items;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyShape {
    pub name: String,
    pub schema: SchemaLink,
    pub required: bool,
}

/// `additionalProperties` after normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdditionalShape {
    /// Any value allowed.
    Any,
    Schema(SchemaLink),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub properties: Vec<PropertyShape>,
    /// `None` when undeclared properties are forbidden or unmentioned.
    pub additional: Option<AdditionalShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorShape {
    pub property: String,
    /// Tag value → variant, explicit entries first, then implicit ones.
    pub mapping: Vec<(String, SchemaLink)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionShape {
    /// Non-null variants in declaration order.
    pub variants: Vec<SchemaLink>,
    pub discriminator: Option<DiscriminatorShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumShape {
    pub base: Primitive,
    /// Deduplicated, source order, no `null`.
    pub values: Vec<Value>,
}

/// Kind of a normalized schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Primitive(Primitive),
    Object(ObjectShape),
    /// Item schema; `None` means items of any type.
    Array(Option<SchemaLink>),
    Union(UnionShape),
    /// Members that could not be merged into a single shape. A single member
    /// means the schema is an alias of that member.
    Intersection(Vec<SchemaLink>),
    Enumeration(EnumShape),
    /// A schema defined only by negation.
    Negation(SchemaLink),
}

/// One normalized schema per resolved node.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSchema {
    pub node: NodeId,
    pub location: String,
    pub component: Option<String>,
    pub kind: SchemaKind,
    pub nullable: bool,
    pub constraints: Constraints,
    /// Validated default; dropped when it does not fit the kind.
    pub default: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
}

impl NormalizedSchema {
    /// The primitive kind, when the schema is one (enumerations count as their base).
    pub fn primitive(&self) -> Option<Primitive> {
        match &self.kind {
            SchemaKind::Primitive(p) => Some(*p),
            SchemaKind::Enumeration(e) => Some(e.base),
            _ => None,
        }
    }

    /// The object shape, when the schema is one.
    pub fn as_object(&self) -> Option<&ObjectShape> {
        match &self.kind {
            SchemaKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// True when the schema carries no information at all.
    pub fn is_unconstrained(&self) -> bool {
        matches!(self.kind, SchemaKind::Primitive(Primitive::Any)) && !self.nullable
    }
}
