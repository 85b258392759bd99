use std::collections::{BTreeSet, HashMap, HashSet};

use heck::ToSnakeCase;
use sdkforge_core::config::TargetVersion;
use sdkforge_core::ir::{ApiModel, Builtin, TypeDefinition, TypeRef};
use serde_json::Value;

use crate::identifiers::IdentifierSet;

/// Names a generated file has to import.
#[derive(Debug, Default)]
pub struct Imports {
    typing: BTreeSet<&'static str>,
    modules: BTreeSet<&'static str>,
}

impl Imports {
    pub fn typing(&mut self, name: &'static str) {
        self.typing.insert(name);
    }

    pub fn module(&mut self, name: &'static str) {
        self.modules.insert(name);
    }

    /// Import statements, plain `import` lines first.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.modules.iter().map(|m| format!("import {m}")).collect();
        if !self.typing.is_empty() {
            let names: Vec<&str> = self.typing.iter().copied().collect();
            lines.push(format!("from typing import {}", names.join(", ")));
        }
        lines
    }
}

/// How generated code decodes a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decode {
    /// A dataclass with a `from_dict` classmethod.
    Class,
    /// An `Enum` subclass, decoded by calling it.
    Enum,
    /// A module-level `decode_*` function.
    Function(String),
}

/// Names `models.py` binds besides the generated types.
pub const MODELS_MODULE_NAMES: &[&str] =
    &["annotations", "dataclasses", "datetime", "enum", "uuid", "_rt"];

/// Decoder lookup for every generated type.
#[derive(Debug, Default)]
pub struct ModelIndex {
    decoders: HashMap<String, Decode>,
}

impl ModelIndex {
    pub fn new(model: &ApiModel) -> Self {
        let mut names = IdentifierSet::with_reserved(MODELS_MODULE_NAMES.iter().copied());
        let decoders = model
            .types()
            .map(|t| {
                let decode = match &t.definition {
                    TypeDefinition::Object(_) => Decode::Class,
                    TypeDefinition::Enumeration(_) => Decode::Enum,
                    TypeDefinition::Union(_) | TypeDefinition::Alias { .. } => {
                        Decode::Function(names.claim(&format!("decode_{}", t.name.to_snake_case())))
                    }
                };
                (t.name.clone(), decode)
            })
            .collect();
        Self { decoders }
    }

    pub fn get(&self, name: &str) -> Option<&Decode> {
        self.decoders.get(name)
    }
}

/// Renders `TypeRef`s as Python for one target version.
#[derive(Debug, Clone, Copy)]
pub struct PythonTypes<'a> {
    target: TargetVersion,
    prefix: &'a str,
}

impl<'a> PythonTypes<'a> {
    pub fn new(target: TargetVersion) -> Self {
        Self { target, prefix: "" }
    }

    /// Refer to generated types through a module, e.g. `models.`.
    pub fn qualified(target: TargetVersion, prefix: &'a str) -> Self {
        Self { target, prefix }
    }

    /// A type annotation. Files start with `from __future__ import
    /// annotations`, so forward references need no quoting.
    pub fn annotation(&self, ty: &TypeRef, imports: &mut Imports) -> String {
        match ty {
            TypeRef::Builtin { builtin, .. } => builtin_annotation(*builtin, imports),
            TypeRef::Literal(value) => literal_annotation(value, imports),
            TypeRef::Named(name) => format!("{}{name}", self.prefix),
            TypeRef::Sequence(inner) => {
                let inner = self.annotation(inner, imports);
                self.list(inner, imports)
            }
            TypeRef::Map(inner) => {
                let inner = self.annotation(inner, imports);
                self.dict(inner, imports)
            }
            TypeRef::Nullable(inner) => {
                let inner = self.annotation(inner, imports);
                self.optional(inner, imports)
            }
            TypeRef::Void => "None".to_string(),
        }
    }

    /// A type expression evaluated at import time, as on the right-hand side
    /// of an alias. Types not yet in `defined` are quoted.
    pub fn runtime(&self, ty: &TypeRef, defined: &HashSet<String>, imports: &mut Imports) -> String {
        match ty {
            TypeRef::Named(name) if defined.contains(name) => format!("{}{name}", self.prefix),
            TypeRef::Named(name) => format!("\"{}{name}\"", self.prefix),
            TypeRef::Sequence(inner) => {
                let inner = self.runtime(inner, defined, imports);
                self.list(inner, imports)
            }
            TypeRef::Map(inner) => {
                let inner = self.runtime(inner, defined, imports);
                self.dict(inner, imports)
            }
            TypeRef::Nullable(inner) => {
                let inner = self.runtime(inner, defined, imports);
                if inner == "None" || inner == "Any" {
                    return inner;
                }
                imports.typing("Optional");
                format!("Optional[{inner}]")
            }
            _ => self.annotation(ty, imports),
        }
    }

    pub fn runtime_union(
        &self,
        variants: &[TypeRef],
        defined: &HashSet<String>,
        imports: &mut Imports,
    ) -> String {
        imports.typing("Union");
        let parts: Vec<String> = variants
            .iter()
            .map(|v| self.runtime(v, defined, imports))
            .collect();
        format!("Union[{}]", parts.join(", "))
    }

    pub fn list(&self, inner: String, imports: &mut Imports) -> String {
        if self.target.supports_builtin_generics() {
            format!("list[{inner}]")
        } else {
            imports.typing("List");
            format!("List[{inner}]")
        }
    }

    pub fn dict(&self, value: String, imports: &mut Imports) -> String {
        if self.target.supports_builtin_generics() {
            format!("dict[str, {value}]")
        } else {
            imports.typing("Dict");
            format!("Dict[str, {value}]")
        }
    }

    pub fn optional(&self, inner: String, imports: &mut Imports) -> String {
        if inner == "None" || inner == "Any" || inner.ends_with(" | None") || inner.starts_with("Optional[")
        {
            return inner;
        }
        if self.target.supports_union_syntax() {
            format!("{inner} | None")
        } else {
            imports.typing("Optional");
            format!("Optional[{inner}]")
        }
    }

    /// A callable expression that decodes a JSON value into `ty`.
    pub fn decoder(&self, ty: &TypeRef, index: &ModelIndex) -> String {
        match ty {
            TypeRef::Builtin { builtin, .. } => builtin_decoder(*builtin).to_string(),
            TypeRef::Literal(value) => format!("_rt.literal({})", py_literal(value)),
            TypeRef::Named(name) => match index.get(name) {
                Some(Decode::Class) => format!("{}{name}.from_dict", self.prefix),
                Some(Decode::Enum) => format!("{}{name}", self.prefix),
                Some(Decode::Function(function)) => format!("{}{function}", self.prefix),
                None => "_rt.as_any".to_string(),
            },
            TypeRef::Sequence(inner) => format!("_rt.list_of({})", self.decoder(inner, index)),
            TypeRef::Map(inner) => format!("_rt.dict_of({})", self.decoder(inner, index)),
            TypeRef::Nullable(inner) => format!("_rt.optional({})", self.decoder(inner, index)),
            TypeRef::Void => "_rt.ignore".to_string(),
        }
    }
}

fn builtin_annotation(builtin: Builtin, imports: &mut Imports) -> String {
    let name = match builtin {
        Builtin::String => "str",
        Builtin::Integer => "int",
        Builtin::Number => "float",
        Builtin::Boolean => "bool",
        Builtin::Bytes => "bytes",
        Builtin::Null => "None",
        Builtin::Date => {
            imports.module("datetime");
            "datetime.date"
        }
        Builtin::DateTime => {
            imports.module("datetime");
            "datetime.datetime"
        }
        Builtin::Uuid => {
            imports.module("uuid");
            "uuid.UUID"
        }
        Builtin::Any => {
            imports.typing("Any");
            "Any"
        }
    };
    name.to_string()
}

fn literal_annotation(value: &Value, imports: &mut Imports) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Number(n) if n.is_f64() => "float".to_string(),
        Value::Array(_) | Value::Object(_) => {
            imports.typing("Any");
            "Any".to_string()
        }
        _ => {
            imports.typing("Literal");
            format!("Literal[{}]", py_literal(value))
        }
    }
}

fn builtin_decoder(builtin: Builtin) -> &'static str {
    match builtin {
        Builtin::String => "_rt.as_str",
        Builtin::Integer => "_rt.as_int",
        Builtin::Number => "_rt.as_float",
        Builtin::Boolean => "_rt.as_bool",
        Builtin::Date => "_rt.parse_date",
        Builtin::DateTime => "_rt.parse_datetime",
        Builtin::Bytes => "_rt.parse_bytes",
        Builtin::Uuid => "_rt.parse_uuid",
        Builtin::Any => "_rt.as_any",
        Builtin::Null => "_rt.as_none",
    }
}

/// Whether a default of this type can be written as a plain literal.
pub fn is_scalar(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Builtin { builtin, .. } => matches!(
            builtin,
            Builtin::String | Builtin::Integer | Builtin::Number | Builtin::Boolean
        ),
        TypeRef::Literal(value) => !value.is_array() && !value.is_object(),
        TypeRef::Nullable(inner) => is_scalar(inner),
        _ => false,
    }
}

/// A Python string literal.
pub fn py_str(value: &str) -> String {
    // JSON string escapes are valid Python escapes.
    Value::String(value.to_string()).to_string()
}

/// A Python literal for a JSON value.
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn version(raw: &str) -> TargetVersion {
        raw.parse().unwrap()
    }

    fn nullable_list_of_pets() -> TypeRef {
        TypeRef::Nullable(Box::new(TypeRef::Sequence(Box::new(TypeRef::named("Pet")))))
    }

    #[test]
    fn test_modern_annotations() {
        let types = PythonTypes::new(version("3.12"));
        let mut imports = Imports::default();
        assert_eq!(types.annotation(&nullable_list_of_pets(), &mut imports), "list[Pet] | None");
        assert!(imports.lines().is_empty());
    }

    #[test]
    fn test_legacy_annotations() {
        let types = PythonTypes::new(version("3.8"));
        let mut imports = Imports::default();
        assert_eq!(
            types.annotation(&nullable_list_of_pets(), &mut imports),
            "Optional[List[Pet]]"
        );
        assert_eq!(imports.lines(), vec!["from typing import List, Optional"]);

        let types = PythonTypes::new(version("3.9"));
        let mut imports = Imports::default();
        assert_eq!(
            types.annotation(&TypeRef::Map(Box::new(TypeRef::builtin(Builtin::Integer))), &mut imports),
            "dict[str, int]"
        );
    }

    #[test]
    fn test_builtins_pull_in_modules() {
        let types = PythonTypes::qualified(version("3.13"), "models.");
        let mut imports = Imports::default();
        let ty = TypeRef::Builtin {
            builtin: Builtin::DateTime,
            format: Some("date-time".into()),
        };
        assert_eq!(types.annotation(&ty, &mut imports), "datetime.datetime");
        assert_eq!(types.annotation(&TypeRef::named("Pet"), &mut imports), "models.Pet");
        assert_eq!(
            types.annotation(&TypeRef::Literal(json!("cat")), &mut imports),
            "Literal[\"cat\"]"
        );
        assert_eq!(
            imports.lines(),
            vec!["import datetime", "from typing import Literal"]
        );
    }

    #[test]
    fn test_runtime_quotes_forward_references() {
        let types = PythonTypes::new(version("3.13"));
        let mut imports = Imports::default();
        let defined: HashSet<String> = ["Cat".to_string()].into();
        let rendered = types.runtime_union(
            &[TypeRef::named("Cat"), nullable_list_of_pets()],
            &defined,
            &mut imports,
        );
        assert_eq!(rendered, "Union[Cat, Optional[list[\"Pet\"]]]");
    }

    #[test]
    fn test_decoders() {
        let types = PythonTypes::new(version("3.13"));
        let index = ModelIndex::default();
        assert_eq!(types.decoder(&nullable_list_of_pets(), &index), "_rt.optional(_rt.list_of(_rt.as_any))");
        assert_eq!(
            types.decoder(&TypeRef::Literal(json!(true)), &index),
            "_rt.literal(True)"
        );
        assert_eq!(types.decoder(&TypeRef::Void, &index), "_rt.ignore");
    }

    #[test]
    fn test_py_literal() {
        assert_eq!(
            py_literal(&json!({"a": [1, null, false], "b": "x\"y"})),
            r#"{"a": [1, None, False], "b": "x\"y"}"#
        );
    }
}
