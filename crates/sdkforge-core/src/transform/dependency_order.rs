use std::collections::{HashMap, HashSet};

use crate::ir::TypeDescriptor;

/// Reorder types so every type follows the types it mentions.
///
/// Depth-first post-order, visiting roots and dependencies in declaration
/// order. Edges back into a type still on the stack are skipped, which breaks
/// cycles at the same place on every run.
pub fn dependency_order(types: Vec<TypeDescriptor>) -> Vec<TypeDescriptor> {
    let index: HashMap<&str, usize> = types
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut order = Vec::with_capacity(types.len());
    let mut visited = HashSet::new();
    for root in 0..types.len() {
        visit(root, &types, &index, &mut visited, &mut order);
    }

    let mut slots: Vec<Option<TypeDescriptor>> = types.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

fn visit(
    i: usize,
    types: &[TypeDescriptor],
    index: &HashMap<&str, usize>,
    visited: &mut HashSet<usize>,
    order: &mut Vec<usize>,
) {
    if !visited.insert(i) {
        return;
    }
    for dependency in types[i].dependencies() {
        if let Some(&j) = index.get(dependency) {
            visit(j, types, index, visited, order);
        }
    }
    order.push(i);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{TypeDefinition, TypeRef};

    fn alias(name: &str, target: TypeRef) -> TypeDescriptor {
        TypeDescriptor {
            name: name.to_string(),
            definition: TypeDefinition::Alias { target },
            source: format!("#/components/schemas/{name}"),
            description: None,
            deprecated: false,
            notes: Vec::new(),
        }
    }

    fn names(types: &[TypeDescriptor]) -> Vec<&str> {
        types.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_dependencies_first() {
        let types = vec![
            alias("A", TypeRef::named("B")),
            alias("B", TypeRef::Sequence(Box::new(TypeRef::named("C")))),
            alias("C", TypeRef::any()),
        ];
        assert_eq!(names(&dependency_order(types)), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_cycle_is_broken_in_declaration_order() {
        let types = vec![
            alias("A", TypeRef::named("B")),
            alias("B", TypeRef::named("A")),
            alias("Z", TypeRef::any()),
        ];
        assert_eq!(names(&dependency_order(types)), vec!["B", "A", "Z"]);
    }
}
