use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::schemas::TypeRef;
use super::security::SecurityRequirement;
use super::types::NormalizedName;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// The method for a path-item key; `None` for non-operation keys.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }
}

/// A fully bound API operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub name: NormalizedName,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    /// Path, query, header, cookie, then body.
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// The primary success response; `None` when no 2xx is declared.
    pub response: Option<Response>,
    /// Every other declared status, in declaration order.
    pub other_responses: IndexMap<String, Response>,
    /// Alternatives; any one satisfies the operation. Empty means no auth.
    pub security: Vec<SecurityRequirement>,
    /// Documentation notes, e.g. for permissively decoded types.
    pub notes: Vec<String>,
}

impl Operation {
    /// Type returned on success.
    pub fn return_type(&self) -> &TypeRef {
        self.response.as_ref().map_or(&TypeRef::Void, |r| &r.ty)
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}

/// A bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: NormalizedName,
    /// Name on the wire (or `body`).
    pub wire_name: String,
    pub location: ParameterLocation,
    pub ty: TypeRef,
    pub required: bool,
    pub description: Option<String>,
    pub deprecated: bool,
    pub default: Option<Value>,
}

/// Parameter location, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

/// A bound request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    pub ty: TypeRef,
    pub required: bool,
    pub content_type: String,
    pub description: Option<String>,
}

/// A bound response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: String,
    pub ty: TypeRef,
    pub content_type: Option<String>,
    pub description: Option<String>,
}
