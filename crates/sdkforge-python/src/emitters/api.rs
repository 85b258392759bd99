use minijinja::context;
use sdkforge_core::ir::{ApiModel, GeneratedModule, Operation, ParameterLocation, SecurityRequirement};

use super::{docstring, environment};
use crate::identifiers::IdentifierSet;
use crate::type_mapper::{Imports, ModelIndex, PythonTypes, is_scalar, py_literal, py_str};

/// Names a generated method body relies on.
const METHOD_SCOPE_NAMES: &[&str] = &["self", "models", "_rt"];

/// An operations module together with the Python names chosen for it.
#[derive(Debug, Clone)]
pub struct ApiModule<'a> {
    pub module: &'a GeneratedModule,
    /// File stem under `api/`.
    pub file_name: String,
    pub class_name: String,
    /// Accessor on the client, e.g. `client.pets`.
    pub attribute: String,
}

/// Emit `api/<module>.py`: one resource class with a method per operation.
pub fn emit_api_module(
    model: &ApiModel,
    api: &ApiModule<'_>,
    index: &ModelIndex,
) -> Result<String, minijinja::Error> {
    let mut env = environment();
    env.add_template("api_module.py.j2", include_str!("../../templates/api_module.py.j2"))?;
    let tmpl = env.get_template("api_module.py.j2")?;

    let types = PythonTypes::qualified(model.target_version, "models.");
    let mut imports = Imports::default();
    imports.typing("TYPE_CHECKING");

    let mut methods = IdentifierSet::with_reserved(["__init__"]);
    let operations: Vec<minijinja::Value> = api
        .module
        .operations
        .iter()
        .map(|op| operation_ctx(op, &types, index, &mut methods, &mut imports))
        .collect();

    let module_doc = docstring(
        &[Some(format!("Operations of the `{}` group.", api.module.name.original).as_str())],
        0,
    )
    .unwrap_or_default();

    tmpl.render(context! {
        module_doc => module_doc,
        imports => imports.lines(),
        class_name => api.class_name.clone(),
        doc => docstring(&[api.module.description.as_deref()], 4),
        operations => operations,
    })
}

fn operation_ctx(
    op: &Operation,
    types: &PythonTypes,
    index: &ModelIndex,
    methods: &mut IdentifierSet,
    imports: &mut Imports,
) -> minijinja::Value {
    let method_name = methods.claim(&op.name.snake_case);
    let mut names = IdentifierSet::with_reserved(METHOD_SCOPE_NAMES.iter().copied());

    let mut params = Vec::new();
    let mut keyword_only = false;
    let mut path = Vec::new();
    let mut query = Vec::new();
    let mut headers = Vec::new();
    let mut cookies = Vec::new();
    let mut body = None;

    // Parameters keep their binding order. Everything after the first
    // optional one is keyword-only so required ones may follow it.
    for param in &op.parameters {
        let ident = names.claim(&param.name.snake_case);
        let annotation = types.annotation(&param.ty, imports);
        if param.required {
            params.push(format!("{ident}: {annotation}"));
        } else {
            if !keyword_only {
                params.push("*".to_string());
                keyword_only = true;
            }
            let annotation = types.optional(annotation, imports);
            let default = param
                .default
                .as_ref()
                .filter(|_| is_scalar(&param.ty))
                .map(py_literal)
                .unwrap_or_else(|| "None".to_string());
            params.push(format!("{ident}: {annotation} = {default}"));
        }

        let entry = format!("{}: {ident}", py_str(&param.wire_name));
        match param.location {
            ParameterLocation::Path => path.push(entry),
            ParameterLocation::Query => query.push(entry),
            ParameterLocation::Header => headers.push(entry),
            ParameterLocation::Cookie => cookies.push(entry),
            ParameterLocation::Body => body = Some(ident),
        }
    }

    let mut arguments = Vec::new();
    for (keyword, entries) in [
        ("path_params", &path),
        ("query", &query),
        ("headers", &headers),
        ("cookies", &cookies),
    ] {
        if !entries.is_empty() {
            arguments.push(format!("{keyword}={{{}}}", entries.join(", ")));
        }
    }
    if let (Some(ident), Some(request_body)) = (body, &op.request_body) {
        arguments.push(format!("body={ident}"));
        arguments.push(format!("content_type={}", py_str(&request_body.content_type)));
    }
    arguments.push(format!("security={}", security_literal(&op.security)));

    let decoders: Vec<String> = op
        .response
        .iter()
        .chain(op.other_responses.values())
        .map(|r| format!("{}: {}", py_str(&r.status), types.decoder(&r.ty, index)))
        .collect();
    if !decoders.is_empty() {
        arguments.push(format!("decoders={{{}}}", decoders.join(", ")));
    }

    let mut paragraphs = vec![op.summary.as_deref(), op.description.as_deref()];
    paragraphs.extend(op.notes.iter().map(|n| Some(n.as_str())));
    if op.deprecated {
        paragraphs.push(Some("Deprecated."));
    }

    context! {
        method_name => method_name,
        params => params,
        returns => types.annotation(op.return_type(), imports),
        doc => docstring(&paragraphs, 8),
        http_method => py_str(op.method.as_str()),
        path => py_str(&op.path),
        arguments => arguments,
    }
}

/// Alternatives as a list of scheme-name lists; `[]` inside allows anonymous access.
fn security_literal(requirements: &[SecurityRequirement]) -> String {
    let alternatives: Vec<String> = requirements
        .iter()
        .map(|r| {
            let names: Vec<String> = r.schemes.iter().map(|s| py_str(&s.name)).collect();
            format!("[{}]", names.join(", "))
        })
        .collect();
    format!("[{}]", alternatives.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdkforge_core::ir::{BoundScheme, SecurityScheme};

    #[test]
    fn test_security_literal() {
        let bearer = BoundScheme {
            name: "bearerAuth".into(),
            scheme: SecurityScheme::Bearer { format: None },
            scopes: Vec::new(),
        };
        let requirements = vec![
            SecurityRequirement {
                schemes: vec![bearer],
            },
            SecurityRequirement {
                schemes: Vec::new(),
            },
        ];
        assert_eq!(security_literal(&requirements), r#"[["bearerAuth"], []]"#);
        assert_eq!(security_literal(&[]), "[]");
    }
}
