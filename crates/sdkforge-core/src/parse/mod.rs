//! Document ingestion and typed views of OpenAPI sections.
//!
//! Documents are kept as an order-preserving [`serde_json::Value`] tree. Typed
//! structs in the submodules are deserialized on demand from individual nodes
//! once their references have been followed.

pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod request_body;
pub mod response;
pub mod schema;
pub mod security;
pub mod server;
pub mod spec;

use serde_json::Value;

use crate::error::ParseError;

/// Parse an OpenAPI document from YAML.
pub fn from_yaml(input: &str) -> Result<Value, ParseError> {
    let document: Value = serde_yaml_ng::from_str(input)?;
    from_value(document)
}

/// Parse an OpenAPI document from JSON.
pub fn from_json(input: &str) -> Result<Value, ParseError> {
    let document: Value = serde_json::from_str(input)?;
    from_value(document)
}

/// Accept an already-parsed document after checking its version.
pub fn from_value(document: Value) -> Result<Value, ParseError> {
    validate_version(&document)?;
    Ok(document)
}

fn validate_version(document: &Value) -> Result<(), ParseError> {
    let root = document.as_object().ok_or(ParseError::NotAMapping)?;
    let version = match root.get("openapi") {
        Some(Value::String(v)) => v,
        Some(other) => return Err(ParseError::UnsupportedVersion(other.to_string())),
        None => {
            if let Some(swagger) = root.get("swagger") {
                return Err(ParseError::UnsupportedVersion(format!("swagger {swagger}")));
            }
            return Err(ParseError::MissingField("openapi".to_string()));
        }
    };
    if !version.starts_with("3.") {
        return Err(ParseError::UnsupportedVersion(version.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_swagger_documents() {
        let err = from_yaml("swagger: '2.0'\ninfo: {title: x, version: '1'}\n").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_missing_version() {
        let err = from_json(r#"{"info": {"title": "x", "version": "1"}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(f) if f == "openapi"));
    }

    #[test]
    fn test_keys_keep_declaration_order() {
        let doc = from_yaml("openapi: 3.1.0\npaths:\n  /z: {}\n  /a: {}\n  /m: {}\n").unwrap();
        let keys: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["/z", "/a", "/m"]);
    }
}
