use std::collections::HashSet;

use minijinja::context;
use sdkforge_core::ir::{
    ApiModel, Builtin, EnumDef, ObjectDef, TypeDefinition, TypeDescriptor, TypeRef, UnionDef,
};

use super::{docstring, environment};
use crate::identifiers::{IdentifierSet, safe_identifier};
use crate::type_mapper::{Decode, Imports, ModelIndex, PythonTypes, is_scalar, py_literal, py_str};

/// Names a dataclass body must leave alone.
const CLASS_MEMBER_NAMES: &[&str] = &["from_dict", "to_dict", "dataclasses", "_rt"];

/// Emit `models.py`: dataclasses, enums, unions and aliases in dependency order.
pub fn emit_models(model: &ApiModel, index: &ModelIndex) -> Result<String, minijinja::Error> {
    let mut env = environment();
    env.add_template("models.py.j2", include_str!("../../templates/models.py.j2"))?;
    let tmpl = env.get_template("models.py.j2")?;

    let types = PythonTypes::new(model.target_version);
    let mut imports = Imports::default();
    imports.typing("Any");
    let dict_annotation = types.dict("Any".to_string(), &mut imports);

    let mut defined = HashSet::new();
    let mut contexts = Vec::new();
    for descriptor in model.types() {
        let ctx = match &descriptor.definition {
            TypeDefinition::Object(object) => {
                imports.module("dataclasses");
                object_ctx(descriptor, object, &types, index, &mut imports)
            }
            TypeDefinition::Enumeration(enumeration) => {
                imports.module("enum");
                enum_ctx(descriptor, enumeration)
            }
            TypeDefinition::Union(union) => {
                union_ctx(descriptor, union, &types, index, &defined, &mut imports)
            }
            TypeDefinition::Alias { target } => {
                alias_ctx(descriptor, target, &types, index, &defined, &mut imports)
            }
        };
        defined.insert(descriptor.name.clone());
        contexts.push(ctx);
    }

    tmpl.render(context! {
        title => model.info.title.clone(),
        imports => imports.lines(),
        dict_annotation => dict_annotation,
        types => contexts,
    })
}

fn type_doc(descriptor: &TypeDescriptor, indent: usize) -> Option<String> {
    let mut paragraphs = vec![descriptor.description.as_deref()];
    paragraphs.extend(descriptor.notes.iter().map(|n| Some(n.as_str())));
    if descriptor.deprecated {
        paragraphs.push(Some("Deprecated."));
    }
    docstring(&paragraphs, indent)
}

fn object_ctx(
    descriptor: &TypeDescriptor,
    object: &ObjectDef,
    types: &PythonTypes,
    index: &ModelIndex,
    imports: &mut Imports,
) -> minijinja::Value {
    let mut names = IdentifierSet::with_reserved(CLASS_MEMBER_NAMES.iter().copied());
    let owner = py_str(&descriptor.name);

    // Dataclass fields without defaults must come first.
    let mut ordered: Vec<_> = object.fields.iter().filter(|f| f.required).collect();
    ordered.extend(object.fields.iter().filter(|f| !f.required));

    let mut fields = Vec::new();
    let mut encode_lines = Vec::new();
    for field in ordered {
        let name = names.claim(&field.name.snake_case);
        let wire = py_str(&field.wire_name);
        let decoder = types.decoder(&field.ty, index);
        let mut annotation = types.annotation(&field.ty, imports);

        let (declaration, decode) = if field.required {
            (
                format!("{name}: {annotation}"),
                format!("_rt.required_field(data, {wire}, {decoder}, {owner})"),
            )
        } else {
            annotation = types.optional(annotation, imports);
            let default = field
                .default
                .as_ref()
                .filter(|_| is_scalar(&field.ty))
                .map(py_literal)
                .unwrap_or_else(|| "None".to_string());
            (
                format!("{name}: {annotation} = {default}"),
                format!("_rt.optional_field(data, {wire}, {decoder}, {default})"),
            )
        };

        if !field.read_only {
            if field.required {
                encode_lines.push(format!("data[{wire}] = _rt.encode(self.{name})"));
            } else {
                encode_lines.push(format!("if self.{name} is not None:"));
                encode_lines.push(format!("    data[{wire}] = _rt.encode(self.{name})"));
            }
        }

        let description = field.description.as_deref().map(|d| {
            d.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        });
        fields.push(context! {
            name => name,
            declaration => declaration,
            decode => decode,
            comment => description.filter(|d| !d.is_empty()),
        });
    }

    let additional = object.additional.as_ref().map(|value_ty| {
        let name = names.claim("additional_properties");
        let annotation = {
            let value = types.annotation(value_ty, imports);
            types.dict(value, imports)
        };
        let known: Vec<String> = object.fields.iter().map(|f| py_str(&f.wire_name)).collect();
        encode_lines.insert(0, format!("data.update(_rt.encode(self.{name}))"));
        context! {
            name => name.clone(),
            declaration => format!("{name}: {annotation} = dataclasses.field(default_factory=dict)"),
            decode => format!(
                "_rt.extra_fields(data, ({}), {})",
                tuple_items(&known),
                types.decoder(value_ty, index)
            ),
        }
    });

    context! {
        kind => "object",
        name => descriptor.name.clone(),
        doc => type_doc(descriptor, 4),
        fields => fields,
        additional => additional,
        encode_lines => encode_lines,
    }
}

fn tuple_items(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [single] => format!("{single},"),
        _ => items.join(", "),
    }
}

fn enum_ctx(descriptor: &TypeDescriptor, enumeration: &EnumDef) -> minijinja::Value {
    let bases = match enumeration.base {
        Builtin::String => "str, enum.Enum",
        Builtin::Integer => "int, enum.Enum",
        _ => "enum.Enum",
    };
    let mut names = IdentifierSet::default();
    let members: Vec<minijinja::Value> = enumeration
        .members
        .iter()
        .map(|m| {
            context! {
                name => names.claim(&m.name.screaming_snake),
                value => py_literal(&m.value),
            }
        })
        .collect();
    context! {
        kind => "enum",
        name => descriptor.name.clone(),
        doc => type_doc(descriptor, 4),
        bases => bases,
        members => members,
    }
}

fn decoder_name(index: &ModelIndex, name: &str) -> String {
    match index.get(name) {
        Some(Decode::Function(function)) => function.clone(),
        _ => format!("decode_{}", safe_identifier(name)),
    }
}

fn union_ctx(
    descriptor: &TypeDescriptor,
    union: &UnionDef,
    types: &PythonTypes,
    index: &ModelIndex,
    defined: &HashSet<String>,
    imports: &mut Imports,
) -> minijinja::Value {
    let discriminator = union.discriminator.as_ref().map(|d| {
        let cases: Vec<minijinja::Value> = d
            .mapping
            .iter()
            .map(|(tag, ty)| {
                context! {
                    tag => py_str(tag),
                    decode => types.decoder(ty, index),
                }
            })
            .collect();
        context! {
            property => py_str(&d.property),
            cases => cases,
        }
    });
    let decoders: Vec<String> = union.variants.iter().map(|v| types.decoder(v, index)).collect();

    context! {
        kind => "union",
        name => descriptor.name.clone(),
        doc => type_doc(descriptor, 0),
        runtime => types.runtime_union(&union.variants, defined, imports),
        decoder => decoder_name(index, &descriptor.name),
        discriminator => discriminator,
        candidates => tuple_items(&decoders),
    }
}

fn alias_ctx(
    descriptor: &TypeDescriptor,
    target: &TypeRef,
    types: &PythonTypes,
    index: &ModelIndex,
    defined: &HashSet<String>,
    imports: &mut Imports,
) -> minijinja::Value {
    context! {
        kind => "alias",
        name => descriptor.name.clone(),
        doc => type_doc(descriptor, 0),
        runtime => types.runtime(target, defined, imports),
        decoder => decoder_name(index, &descriptor.name),
        decode => types.decoder(target, index),
    }
}
