use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::types::NormalizedName;

/// Built-in types every target can express directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    DateTime,
    Bytes,
    Uuid,
    Any,
    Null,
}

/// A use-site type: what a field, parameter or return value is declared as.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeRef {
    /// A builtin. `format` keeps the source format hint even when the builtin
    /// does not encode it.
    Builtin {
        builtin: Builtin,
        format: Option<String>,
    },
    /// A single allowed value.
    Literal(Value),
    /// A generated type, by name.
    Named(String),
    Sequence(Box<TypeRef>),
    /// String-keyed map.
    Map(Box<TypeRef>),
    Nullable(Box<TypeRef>),
    /// No content.
    Void,
}

impl TypeRef {
    pub fn builtin(builtin: Builtin) -> Self {
        TypeRef::Builtin {
            builtin,
            format: None,
        }
    }

    pub fn any() -> Self {
        Self::builtin(Builtin::Any)
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// Wrap in `Nullable` unless already nullable.
    pub fn into_nullable(self) -> Self {
        match self {
            TypeRef::Nullable(_) | TypeRef::Void => self,
            TypeRef::Builtin {
                builtin: Builtin::Null | Builtin::Any,
                ..
            } => self,
            other => TypeRef::Nullable(Box::new(other)),
        }
    }

    /// True for references to generated named types.
    pub fn is_generated(&self) -> bool {
        matches!(self, TypeRef::Named(_))
    }

    /// Names of generated types this reference mentions, in order.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeRef::Named(name) => out.push(name),
            TypeRef::Sequence(inner) | TypeRef::Map(inner) | TypeRef::Nullable(inner) => {
                inner.collect_names(out)
            }
            TypeRef::Builtin { .. } | TypeRef::Literal(_) | TypeRef::Void => {}
        }
    }
}

/// A generated named type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    /// Unique within one run.
    pub name: String,
    pub definition: TypeDefinition,
    /// Location of the schema the type was generated from.
    pub source: String,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Documentation notes for degraded mappings.
    pub notes: Vec<String>,
}

impl TypeDescriptor {
    /// Names of generated types the definition mentions, in order.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match &self.definition {
            TypeDefinition::Object(obj) => {
                for field in &obj.fields {
                    field.ty.collect_names(&mut out);
                }
                if let Some(additional) = &obj.additional {
                    additional.collect_names(&mut out);
                }
            }
            TypeDefinition::Union(union) => {
                for variant in &union.variants {
                    variant.collect_names(&mut out);
                }
            }
            TypeDefinition::Alias { target } => target.collect_names(&mut out),
            TypeDefinition::Enumeration(_) => {}
        }
        out
    }

    /// True for unions without a discriminator.
    pub fn is_permissive(&self) -> bool {
        matches!(&self.definition, TypeDefinition::Union(u) if u.discriminator.is_none())
    }
}

/// Structure of a generated type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    Object(ObjectDef),
    Enumeration(EnumDef),
    Union(UnionDef),
    Alias { target: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDef {
    pub fields: Vec<FieldDef>,
    /// Value type of undeclared properties, when they are allowed.
    pub additional: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: NormalizedName,
    /// Property name on the wire.
    pub wire_name: String,
    pub ty: TypeRef,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDef {
    pub base: Builtin,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: NormalizedName,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDef {
    pub variants: Vec<TypeRef>,
    pub discriminator: Option<DiscriminatorDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscriminatorDef {
    pub property: String,
    /// Tag value → variant, in declaration order.
    pub mapping: IndexMap<String, TypeRef>,
}
