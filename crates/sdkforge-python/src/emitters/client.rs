use heck::{ToShoutySnakeCase, ToSnakeCase};
use minijinja::context;
use sdkforge_core::ir::{ApiModel, CredentialLocation, SecurityScheme};

use super::api::ApiModule;
use super::{docstring, environment};
use crate::identifiers::IdentifierSet;
use crate::type_mapper::{Imports, PythonTypes, py_str};

/// `Client.__init__` parameters credentials must not shadow.
const INIT_PARAMETERS: &[&str] = &["self", "base_url", "timeout", "headers"];

/// Emit `client.py`: the `Client` holding connection settings and credentials.
pub fn emit_client(
    model: &ApiModel,
    apis: &[ApiModule<'_>],
    package: &str,
    base_url: &str,
) -> Result<String, minijinja::Error> {
    let mut env = environment();
    env.add_template("client.py.j2", include_str!("../../templates/client.py.j2"))?;
    let tmpl = env.get_template("client.py.j2")?;

    let types = PythonTypes::new(model.target_version);
    let mut imports = Imports::default();
    imports.typing("Any");
    let optional_str = types.optional("str".to_string(), &mut imports);
    let optional_headers = {
        let headers = types.dict("str".to_string(), &mut imports);
        types.optional(headers, &mut imports)
    };

    let env_prefix = package.to_shouty_snake_case();
    let mut params = IdentifierSet::with_reserved(INIT_PARAMETERS.iter().copied());
    let credentials: Vec<minijinja::Value> = model
        .security_schemes
        .iter()
        .filter_map(|(name, scheme)| {
            let (kind, parameter_name) = match scheme {
                SecurityScheme::ApiKey {
                    location: CredentialLocation::Header,
                    parameter_name,
                } => ("header", parameter_name.as_str()),
                SecurityScheme::ApiKey {
                    location: CredentialLocation::Query,
                    parameter_name,
                } => ("query", parameter_name.as_str()),
                SecurityScheme::Bearer { .. } => ("bearer", ""),
                SecurityScheme::None => return None,
            };
            Some(context! {
                scheme => py_str(name),
                param => params.claim(&name.to_snake_case()),
                env_var => py_str(&format!("{env_prefix}_{}", name.to_shouty_snake_case())),
                kind => py_str(kind),
                parameter_name => py_str(parameter_name),
            })
        })
        .collect();

    let apis: Vec<minijinja::Value> = apis
        .iter()
        .map(|api| {
            context! {
                module => api.file_name.clone(),
                class_name => api.class_name.clone(),
                attribute => api.attribute.clone(),
            }
        })
        .collect();

    let doc = docstring(
        &[
            Some(format!("Client for {}.", model.info.title).as_str()),
            model.info.description.as_deref(),
        ],
        4,
    );

    tmpl.render(context! {
        title => model.info.title.clone(),
        doc => doc,
        imports => imports.lines(),
        base_url => py_str(base_url),
        base_url_env => py_str(&format!("{env_prefix}_BASE_URL")),
        optional_str => optional_str,
        optional_headers => optional_headers,
        credentials => credentials,
        apis => apis,
    })
}
