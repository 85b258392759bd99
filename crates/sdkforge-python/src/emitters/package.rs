use minijinja::context;
use sdkforge_core::ir::ApiModel;

use super::api::ApiModule;
use super::{docstring, environment};
use crate::type_mapper::py_str;

const RUNTIME: &str = include_str!("../../templates/_runtime.py");

/// Emit the package `__init__.py`, re-exporting the client and errors.
pub fn emit_init(model: &ApiModel) -> Result<String, minijinja::Error> {
    let mut env = environment();
    env.add_template("init.py.j2", include_str!("../../templates/init.py.j2"))?;
    let tmpl = env.get_template("init.py.j2")?;
    let doc = docstring(
        &[
            Some(format!("Python client for {}.", model.info.title).as_str()),
            model.info.description.as_deref(),
        ],
        0,
    )
    .unwrap_or_default();
    tmpl.render(context! {
        doc => doc,
        version => py_str(&model.info.version),
    })
}

/// `_runtime.py` is static.
pub fn emit_runtime() -> String {
    RUNTIME.to_string()
}

/// Emit `api/__init__.py` importing every resource class.
pub fn emit_api_init(apis: &[ApiModule<'_>]) -> Result<String, minijinja::Error> {
    let mut env = environment();
    env.add_template("api_init.py.j2", include_str!("../../templates/api_init.py.j2"))?;
    let tmpl = env.get_template("api_init.py.j2")?;
    let exports: Vec<String> = apis.iter().map(|a| py_str(&a.class_name)).collect();
    let apis: Vec<minijinja::Value> = apis
        .iter()
        .map(|a| {
            context! {
                module => a.file_name.clone(),
                class_name => a.class_name.clone(),
            }
        })
        .collect();
    tmpl.render(context! {
        apis => apis,
        exports => exports.join(", "),
    })
}

/// Emit a minimal `pyproject.toml` so the output installs with pip.
pub fn emit_pyproject(model: &ApiModel, package: &str) -> Result<String, minijinja::Error> {
    let mut env = environment();
    env.add_template("pyproject.toml.j2", include_str!("../../templates/pyproject.toml.j2"))?;
    let tmpl = env.get_template("pyproject.toml.j2")?;

    let version = &model.info.version;
    let version = if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        version.as_str()
    } else {
        "0.0.0"
    };
    let description = format!("Python client for {}", model.info.title);

    tmpl.render(context! {
        distribution => package.replace('_', "-"),
        package => package,
        version => version,
        // TOML basic strings share JSON's escapes.
        description => py_str(&description),
        python => model.target_version.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_defines_public_errors() {
        let runtime = emit_runtime();
        assert!(runtime.contains("class ApiError(Exception):"));
        assert!(runtime.contains("class DecodeError(ValueError):"));
    }
}
