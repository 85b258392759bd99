use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::media_type::MediaType;

/// A response definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// Whether a response key (`200`, `2XX`, `default`) denotes success.
pub fn is_success_status(status: &str) -> bool {
    status.len() == 3 && status.starts_with('2')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert!(is_success_status("200"));
        assert!(is_success_status("204"));
        assert!(is_success_status("2XX"));
        assert!(!is_success_status("default"));
        assert!(!is_success_status("404"));
        assert!(!is_success_status("2"));
    }
}
