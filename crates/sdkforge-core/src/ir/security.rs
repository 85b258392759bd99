use serde::Serialize;

/// Where an API key travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialLocation {
    Header,
    Query,
}

/// A security scheme the client knows how to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecurityScheme {
    ApiKey {
        location: CredentialLocation,
        parameter_name: String,
    },
    Bearer {
        format: Option<String>,
    },
    /// Declared but not applicable by the client.
    None,
}

/// A scheme named by a security requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundScheme {
    pub name: String,
    pub scheme: SecurityScheme,
    pub scopes: Vec<String>,
}

/// One alternative of an operation's security: every listed scheme applies
/// together. An empty list allows anonymous access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityRequirement {
    pub schemes: Vec<BoundScheme>,
}
