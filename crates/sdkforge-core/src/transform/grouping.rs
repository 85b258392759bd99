use indexmap::IndexMap;

use super::name_normalizer::normalize_name;
use crate::config::GroupBy;
use crate::ir::{GeneratedModule, ModuleKind, Operation, TypeDescriptor};
use crate::parse::spec::Tag;

/// Bucket for operations without a tag.
pub const DEFAULT_MODULE: &str = "default";

/// Module name of the generated types.
pub const MODELS_MODULE: &str = "models";

/// File names a renderer keeps for itself.
pub const RESERVED_FILE_NAMES: &[&str] = &["models", "client", "__init__", "_runtime"];

/// Arrange types and operations into output modules: the models module
/// first, then one module per bucket in order of first appearance.
pub fn group_modules(
    types: Vec<TypeDescriptor>,
    operations: Vec<Operation>,
    tags: &[Tag],
    group_by: GroupBy,
) -> Vec<GeneratedModule> {
    let mut buckets: IndexMap<String, Vec<Operation>> = IndexMap::new();
    for op in operations {
        let key = match group_by {
            GroupBy::Tag => op
                .tags
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            GroupBy::Route => extract_path_prefix(&op.path),
        };
        buckets.entry(key).or_default().push(op);
    }

    let mut modules = Vec::with_capacity(buckets.len() + 1);
    modules.push(GeneratedModule {
        name: normalize_name(MODELS_MODULE),
        file_name: MODELS_MODULE.to_string(),
        kind: ModuleKind::Models,
        description: None,
        types,
        operations: Vec::new(),
    });

    let mut used_files: Vec<String> = Vec::new();
    for (key, operations) in buckets {
        let name = normalize_name(&key);
        let mut file_name = name.snake_case.clone();
        if RESERVED_FILE_NAMES.contains(&file_name.as_str()) {
            file_name.push_str("_api");
        }
        // Distinct tags can share a snake_case spelling.
        let base = file_name.clone();
        let mut n = 2;
        while used_files.contains(&file_name) {
            file_name = format!("{base}_{n}");
            n += 1;
        }
        used_files.push(file_name.clone());
        let description = tags
            .iter()
            .find(|t| t.name == key)
            .and_then(|t| t.description.clone());
        modules.push(GeneratedModule {
            name,
            file_name,
            kind: ModuleKind::Operations,
            description,
            types: Vec::new(),
            operations,
        });
    }
    modules
}

/// Extract the first meaningful path segment as a group name.
/// e.g. "/pets/{petId}" → "pets", "/store/inventory" → "store"
fn extract_path_prefix(path: &str) -> String {
    path.split('/')
        .find(|s| !s.is_empty() && !s.starts_with('{'))
        .unwrap_or(DEFAULT_MODULE)
        .to_string()
}
