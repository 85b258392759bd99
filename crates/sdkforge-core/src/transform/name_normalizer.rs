use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};

use crate::ir::{HttpMethod, NormalizedName};

/// Every casing of `raw` a renderer may need.
pub fn normalize_name(raw: &str) -> NormalizedName {
    let words = identifier_words(raw);
    NormalizedName {
        original: raw.to_string(),
        pascal_case: words.to_pascal_case(),
        camel_case: words.to_lower_camel_case(),
        snake_case: words.to_snake_case(),
        screaming_snake: words.to_shouty_snake_case(),
    }
}

/// A PascalCase type name. Names that would start with a digit get a
/// `Model` prefix.
pub fn type_name(raw: &str) -> String {
    let pascal = identifier_words(raw).to_pascal_case();
    match pascal.chars().next() {
        None => "Model".to_string(),
        Some(c) if c.is_ascii_digit() => format!("Model{pascal}"),
        Some(_) => pascal,
    }
}

/// camelCase operation name for a route without an `operationId`.
///
/// The verb comes from the method; a GET whose path ends in a placeholder
/// addresses a single item (`get`), otherwise a collection (`list`). The
/// literal path segments follow in PascalCase, the last one singular when it
/// names a single item: `GET /users/{id}/posts/{postId}` → `getUsersPost`.
pub fn route_to_name(method: HttpMethod, path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let single_item = segments.last().is_some_and(|s| is_placeholder(s));
    let literals: Vec<&str> = segments.into_iter().filter(|s| !is_placeholder(s)).collect();

    let mut name = verb(method, single_item).to_string();
    for (i, segment) in literals.iter().enumerate() {
        let word = if single_item && i + 1 == literals.len() {
            singular(segment)
        } else {
            segment.to_string()
        };
        name.push_str(&word.to_pascal_case());
    }
    name
}

fn verb(method: HttpMethod, single_item: bool) -> &'static str {
    match method {
        HttpMethod::Get if single_item => "get",
        HttpMethod::Get => "list",
        HttpMethod::Post => "create",
        HttpMethod::Put => "update",
        HttpMethod::Delete => "delete",
        HttpMethod::Patch => "patch",
        HttpMethod::Options => "options",
        HttpMethod::Head => "head",
        HttpMethod::Trace => "trace",
    }
}

fn is_placeholder(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// English plural stripping, good enough for resource names.
fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies").filter(|s| !s.is_empty()) {
        return format!("{stem}y");
    }
    if ["ses", "xes", "zes"].iter().any(|suffix| word.ends_with(suffix)) {
        return word[..word.len() - 2].to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Alphanumeric runs of `raw` joined by `_`, so `heck` sees word breaks at
/// every punctuation mark. A leading digit is kept behind a `_`.
fn identifier_words(raw: &str) -> String {
    let joined = raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    match joined.chars().next() {
        None => "unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{joined}"),
        Some(_) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casings() {
        let n = normalize_name("listModels");
        assert_eq!(n.pascal_case, "ListModels");
        assert_eq!(n.camel_case, "listModels");
        assert_eq!(n.snake_case, "list_models");
        assert_eq!(n.screaming_snake, "LIST_MODELS");

        let n = normalize_name("X-Request-Id");
        assert_eq!(n.snake_case, "x_request_id");
        assert_eq!(n.original, "X-Request-Id");

        assert_eq!(normalize_name("application/json").pascal_case, "ApplicationJson");
        assert_eq!(normalize_name("3dModel").snake_case, "3d_model");
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("user"), "User");
        assert_eq!(type_name("User_"), "User");
        assert_eq!(type_name("pet-store.v2"), "PetStoreV2");
        assert_eq!(type_name("3dModel"), "Model3dModel");
        assert_eq!(type_name("$$$"), "Unnamed");
    }

    #[test]
    fn test_route_names() {
        let cases = [
            (HttpMethod::Get, "/users", "listUsers"),
            (HttpMethod::Post, "/users", "createUsers"),
            (HttpMethod::Get, "/users/{userId}", "getUser"),
            (HttpMethod::Put, "/users/{userId}", "updateUser"),
            (HttpMethod::Delete, "/users/{userId}", "deleteUser"),
            (HttpMethod::Patch, "/users/{userId}", "patchUser"),
            (HttpMethod::Post, "/users/{userId}/messages", "createUsersMessages"),
            (HttpMethod::Get, "/users/{userId}/messages/{messageId}", "getUsersMessage"),
            (HttpMethod::Get, "/", "list"),
            (HttpMethod::Head, "/health", "headHealth"),
        ];
        for (method, path, expected) in cases {
            assert_eq!(route_to_name(method, path), expected, "{} {path}", method.as_str());
        }
    }

    #[test]
    fn test_singular() {
        assert_eq!(singular("pets"), "pet");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("addresses"), "address");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("status"), "statu");
        assert_eq!(singular("class"), "class");
        assert_eq!(singular("news"), "new");
        assert_eq!(singular("s"), "s");
    }
}
