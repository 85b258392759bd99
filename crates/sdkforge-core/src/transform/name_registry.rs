use indexmap::IndexMap;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::MapError;
use crate::resolve::pointer;

/// Outcome of claiming a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claimed {
    /// The name is now owned by the caller.
    New(String),
    /// A structurally identical schema already owns the name; reuse its type.
    Shared(String),
}

#[derive(Debug, Clone)]
enum Owner {
    Reserved,
    Schema { location: String, shape: Value },
}

/// Every type name handed out in one run.
///
/// Suffixes come from the claiming schema's location, never from a counter,
/// so the same document always yields the same names.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    owners: IndexMap<String, Owner>,
}

impl NameRegistry {
    /// A registry with target-language names pre-claimed.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let owners = reserved
            .into_iter()
            .map(|name| (name.into(), Owner::Reserved))
            .collect();
        Self { owners }
    }

    /// Claim `base` for the schema at `location` whose raw form is `shape`.
    ///
    /// Only inline schemas share a name by shape; every component schema
    /// gets a type of its own.
    pub fn claim(&mut self, base: &str, location: &str, shape: &Value) -> Result<Claimed, MapError> {
        let shareable = pointer::component_name(location, "schemas").is_none();
        match self.owners.get(base) {
            None => {}
            Some(Owner::Schema {
                location: owner,
                shape: owned,
            }) if owner == location || (shareable && owned == shape) => {
                return Ok(Claimed::Shared(base.to_string()));
            }
            Some(_) => {
                let digest = hex::encode(Sha256::digest(location.as_bytes()));
                let candidate = [8, 16]
                    .into_iter()
                    .map(|len| format!("{base}_{}", &digest[..len]))
                    .find(|name| !self.owners.contains_key(name))
                    .ok_or_else(|| MapError::NameCollision {
                        name: base.to_string(),
                        location: location.to_string(),
                    })?;
                log::debug!("type name {base} is taken; {location} becomes {candidate}");
                self.insert(&candidate, location, shape);
                return Ok(Claimed::New(candidate));
            }
        }
        self.insert(base, location, shape);
        Ok(Claimed::New(base.to_string()))
    }

    fn insert(&mut self, name: &str, location: &str, shape: &Value) {
        self.owners.insert(
            name.to_string(),
            Owner::Schema {
                location: location.to_string(),
                shape: shape.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_first_claim_wins() {
        let mut registry = NameRegistry::default();
        let shape = json!({"type": "object"});
        assert_eq!(
            registry.claim("User", "#/components/schemas/user", &shape).unwrap(),
            Claimed::New("User".into())
        );
        assert_eq!(
            registry.claim("User", "#/components/schemas/user", &shape).unwrap(),
            Claimed::Shared("User".into())
        );
    }

    #[test]
    fn test_identical_shape_is_shared() {
        let mut registry = NameRegistry::default();
        let shape = json!({"type": "object", "properties": {"id": {"type": "string"}}});
        registry.claim("Item", "#/a", &shape).unwrap();
        assert_eq!(
            registry.claim("Item", "#/b", &shape).unwrap(),
            Claimed::Shared("Item".into())
        );
    }

    #[test]
    fn test_identical_components_stay_distinct() {
        let mut registry = NameRegistry::default();
        let shape = json!({"type": "object", "properties": {"id": {"type": "string"}}});
        registry.claim("User", "#/components/schemas/user", &shape).unwrap();
        let Claimed::New(name) = registry
            .claim("User", "#/components/schemas/User_", &shape)
            .unwrap()
        else {
            panic!("a component never shares a name");
        };
        assert!(name.starts_with("User_"));
    }

    #[test]
    fn test_collision_suffix_is_location_derived() {
        let claim = || {
            let mut registry = NameRegistry::default();
            registry
                .claim("User", "#/components/schemas/user", &json!({"type": "object"}))
                .unwrap();
            registry
                .claim("User", "#/components/schemas/User_", &json!({"type": "string"}))
                .unwrap()
        };
        let Claimed::New(name) = claim() else {
            panic!("expected a new name");
        };
        assert!(name.starts_with("User_"));
        assert_eq!(name.len(), "User_".len() + 8);
        assert_eq!(claim(), Claimed::New(name));
    }

    #[test]
    fn test_reserved_names_force_suffix() {
        let mut registry = NameRegistry::new(["Client"]);
        let Claimed::New(name) = registry
            .claim("Client", "#/components/schemas/Client", &json!({}))
            .unwrap()
        else {
            panic!("expected a new name");
        };
        assert_ne!(name, "Client");
    }

    #[test]
    fn test_exhausted_suffixes_are_fatal() {
        let location = "#/components/schemas/x";
        let digest = hex::encode(Sha256::digest(location.as_bytes()));
        let mut registry = NameRegistry::new([
            "X".to_string(),
            format!("X_{}", &digest[..8]),
            format!("X_{}", &digest[..16]),
        ]);
        let err = registry.claim("X", location, &json!({})).unwrap_err();
        assert!(matches!(err, MapError::NameCollision { .. }));
    }
}
