//! Reading the input document from disk or over HTTP.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use sdkforge_core::parse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a local file or download a URL, then parse it as an OpenAPI document.
pub fn load_document(input: &str, headers: &[String]) -> Result<Value> {
    let content = if is_url(input) {
        fetch(input, headers)?
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };

    let document = match detect_format(input, &content) {
        Format::Json => parse::from_json(&content),
        Format::Yaml => parse::from_yaml(&content),
    };
    document.with_context(|| format!("failed to parse {input}"))
}

/// GET `url` with the extra headers and return the body.
pub fn fetch(url: &str, headers: &[String]) -> Result<String> {
    let client = Client::builder()
        .default_headers(header_map(headers))
        .build()
        .context("failed to build HTTP client")?;

    log::debug!("fetching {url}");
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch {url}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Failed to fetch specification (Status: {})", status.as_u16());
    }
    response
        .text()
        .with_context(|| format!("failed to read the response from {url}"))
}

/// Parse `Name: Value` strings, skipping malformed ones.
fn header_map(headers: &[String]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for raw in headers {
        match parse_header(raw) {
            Some((name, value)) => {
                map.append(name, value);
            }
            None => log::warn!("ignoring malformed header `{raw}`, expected `Name: Value`"),
        }
    }
    map
}

fn parse_header(raw: &str) -> Option<(HeaderName, HeaderValue)> {
    let (name, value) = raw.split_once(':')?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}

/// By extension first, then by the first non-blank character.
fn detect_format(input: &str, content: &str) -> Format {
    let path = input.split(['?', '#']).next().unwrap_or(input);
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => Format::Json,
        Some("yaml" | "yml") => Format::Yaml,
        _ if content.trim_start().starts_with('{') => Format::Json,
        _ => Format::Yaml,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap as RequestHeaders, StatusCode};
    use axum::routing::get;

    const SPEC_YAML: &str = "openapi: 3.1.0\ninfo:\n  title: Remote\n  version: '1'\npaths: {}\n";
    const SPEC_JSON: &str =
        r#"{"openapi": "3.0.3", "info": {"title": "Remote", "version": "1"}, "paths": {}}"#;

    /// Serve `app` on an ephemeral port from a background runtime.
    fn serve(app: Router) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        format!("http://{addr}")
    }

    async fn guarded_spec(headers: RequestHeaders) -> Result<&'static str, StatusCode> {
        match headers.get("x-api-key") {
            Some(key) if key.as_bytes() == b"secret" => Ok(SPEC_YAML),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/openapi.yaml", get(guarded_spec))
            .route("/spec", get(|| async { SPEC_JSON }))
    }

    #[test]
    fn test_fetch_sends_headers() {
        let base = serve(app());
        let url = format!("{base}/openapi.yaml");

        let doc = load_document(&url, &["X-Api-Key: secret".to_string()]).unwrap();
        assert_eq!(doc["info"]["title"], "Remote");

        let err = load_document(&url, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch specification (Status: 401)");
    }

    #[test]
    fn test_fetch_missing_document() {
        let base = serve(app());
        let err = fetch(&format!("{base}/missing.yaml"), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch specification (Status: 404)");
    }

    #[test]
    fn test_fetch_detects_json_by_content() {
        let base = serve(app());
        let doc = load_document(&format!("{base}/spec"), &[]).unwrap();
        assert_eq!(doc["openapi"], "3.0.3");
    }

    #[test]
    fn test_malformed_headers_are_skipped() {
        let map = header_map(&[
            "no-colon".to_string(),
            "Bad Name: x".to_string(),
            "X-Token:  abc ".to_string(),
            "Accept: application/yaml".to_string(),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["x-token"], "abc");
        assert_eq!(map["accept"], "application/yaml");
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("api.json", "openapi: 3.0.0"), Format::Json);
        assert_eq!(detect_format("api.YML", "{}"), Format::Yaml);
        assert_eq!(detect_format("https://x.test/api.json?v=2", ""), Format::Json);
        assert_eq!(detect_format("https://x.test/spec", "  {\"openapi\": \"3.1.0\"}"), Format::Json);
        assert_eq!(detect_format("spec", "openapi: 3.1.0"), Format::Yaml);
    }

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://example.com/openapi.yaml"));
        assert!(is_url("http://localhost:8080/spec"));
        assert!(!is_url("specs/openapi.yaml"));
    }

    #[test]
    fn test_missing_local_file() {
        let err = load_document("does/not/exist.yaml", &[]).unwrap_err();
        assert!(err.to_string().contains("failed to read does/not/exist.yaml"));
    }
}
