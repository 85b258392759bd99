use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("document root must be a mapping")]
    NotAMapping,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("unresolved reference `{reference}` at {location}")]
    UnresolvedReference { reference: String, location: String },

    #[error("malformed reference `{0}`")]
    MalformedReference(String),

    #[error("circular reference chain: {}", .0.join(" -> "))]
    CircularReference(Vec<String>),

    #[error("invalid node at {location}: {message}")]
    InvalidNode { location: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("conflicting schema at {path}: {detail}")]
    Conflicting { path: String, detail: String },

    #[error("schema composition at {0} contains itself")]
    RecursiveComposition(String),

    #[error("default value {value} at {path} does not match the declared {expected} kind")]
    DefaultMismatch {
        path: String,
        expected: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("unsupported schema construct at {path}: {detail}")]
    UnsupportedConstruct { path: String, detail: String },

    #[error("type name `{name}` for {location} still collides after disambiguation")]
    NameCollision { name: String, location: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("operation `{operation}` requires unknown security scheme `{scheme}`")]
    UnknownSecurityScheme { operation: String, scheme: String },
}

/// Any fatal error raised while turning a document into an `ApiModel`.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Every fatal error collected during one generation run.
#[derive(Debug, Error)]
pub struct PipelineFailure {
    pub errors: Vec<GenerateError>,
}

impl PipelineFailure {
    pub fn new(errors: Vec<GenerateError>) -> Self {
        Self { errors }
    }
}

macro_rules! single_failure {
    ($($err:ty),*) => {
        $(impl From<$err> for PipelineFailure {
            fn from(err: $err) -> Self {
                Self {
                    errors: vec![err.into()],
                }
            }
        })*
    };
}

single_failure!(
    GenerateError,
    ParseError,
    ResolveError,
    SchemaError,
    MapError,
    OperationError,
    crate::config::ConfigError
);

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "generation failed with {} errors:", errors.len())?;
                for err in errors {
                    write!(f, "\n  - {err}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_failure_displays_inner_message() {
        let failure = PipelineFailure::from(ResolveError::MalformedReference("Pet".into()));
        assert_eq!(failure.to_string(), "malformed reference `Pet`");
    }

    #[test]
    fn test_multiple_failures_are_listed() {
        let failure = PipelineFailure::new(vec![
            MapError::UnsupportedConstruct {
                path: "Pet.tag".into(),
                detail: "negation".into(),
            }
            .into(),
            OperationError::UnknownSecurityScheme {
                operation: "listPets".into(),
                scheme: "oauth".into(),
            }
            .into(),
        ]);
        let text = failure.to_string();
        assert!(text.starts_with("generation failed with 2 errors:"));
        assert!(text.contains("  - unsupported schema construct at Pet.tag: negation"));
        assert!(text.contains("unknown security scheme `oauth`"));
    }
}
