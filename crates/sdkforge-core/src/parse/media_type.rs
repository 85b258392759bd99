use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A media type object. The schema stays raw until the resolver walks it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Pick the content entry a client should use.
///
/// Preference: `application/json`, any `+json` type, form encodings, then the
/// first declared entry.
pub fn preferred_media_type(
    content: &IndexMap<String, MediaType>,
) -> Option<(&String, &MediaType)> {
    let is_json = |ct: &str| {
        let essence = ct.split(';').next().unwrap_or(ct).trim();
        essence.ends_with("+json")
    };
    let is_form =
        |ct: &str| ct.starts_with("application/x-www-form-urlencoded") || ct.starts_with("multipart/form-data");

    content
        .get_key_value("application/json")
        .or_else(|| content.iter().find(|(ct, _)| ct.starts_with("application/json")))
        .or_else(|| content.iter().find(|(ct, _)| is_json(ct)))
        .or_else(|| content.iter().find(|(ct, _)| is_form(ct)))
        .or_else(|| content.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(types: &[&str]) -> IndexMap<String, MediaType> {
        types
            .iter()
            .map(|t| (t.to_string(), MediaType::default()))
            .collect()
    }

    #[test]
    fn test_prefers_plain_json() {
        let c = content(&["text/plain", "application/problem+json", "application/json"]);
        assert_eq!(preferred_media_type(&c).unwrap().0, "application/json");
    }

    #[test]
    fn test_prefers_structured_json_suffix() {
        let c = content(&["text/plain", "application/vnd.api+json"]);
        assert_eq!(preferred_media_type(&c).unwrap().0, "application/vnd.api+json");
    }

    #[test]
    fn test_falls_back_to_first() {
        let c = content(&["text/csv", "text/plain"]);
        assert_eq!(preferred_media_type(&c).unwrap().0, "text/csv");
        assert!(preferred_media_type(&IndexMap::new()).is_none());
    }
}
