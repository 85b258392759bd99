use sdkforge_core::config::{GroupBy, NamingStrategy};
use sdkforge_core::diagnostics::WarningKind;
use sdkforge_core::error::{GenerateError, MapError, OperationError, ResolveError, SchemaError};
use sdkforge_core::ir::{
    ApiModel, Builtin, CredentialLocation, ModuleKind, ParameterLocation, SecurityScheme,
    TypeDefinition, TypeRef,
};
use sdkforge_core::{GenerateOptions, generate, parse};
use serde_json::json;

const PETSTORE: &str = include_str!("fixtures/petstore.yaml");
const CYCLES: &str = include_str!("fixtures/cycles.yaml");
const COLLISIONS: &str = include_str!("fixtures/collisions.yaml");
const COMPOSITION: &str = include_str!("fixtures/composition.yaml");
const INVALID: &str = include_str!("fixtures/invalid.yaml");

fn model(yaml: &str) -> ApiModel {
    let doc = parse::from_yaml(yaml).unwrap();
    generate(&doc, &GenerateOptions::default()).unwrap()
}

fn object_fields(model: &ApiModel, name: &str) -> Vec<(String, TypeRef, bool)> {
    let TypeDefinition::Object(obj) = &model.find_type(name).unwrap().definition else {
        panic!("{name} should be an object");
    };
    obj.fields
        .iter()
        .map(|f| (f.wire_name.clone(), f.ty.clone(), f.required))
        .collect()
}

#[test]
fn petstore_metadata_and_servers() {
    let model = model(PETSTORE);
    assert_eq!(model.info.title, "Petstore");
    assert_eq!(model.info.version, "1.2.0");
    assert_eq!(model.servers[0].url, "https://eu.petstore.example.com/v1");
    assert!(model.warnings.is_empty(), "{:?}", model.warnings);
}

#[test]
fn petstore_modules_follow_first_tag() {
    let model = model(PETSTORE);
    let modules: Vec<(&str, ModuleKind, usize)> = model
        .modules
        .iter()
        .map(|m| (m.file_name.as_str(), m.kind, m.operations.len()))
        .collect();
    assert_eq!(
        modules,
        vec![
            ("models", ModuleKind::Models, 0),
            ("pets", ModuleKind::Operations, 4),
            ("store", ModuleKind::Operations, 1),
            ("default", ModuleKind::Operations, 1),
        ]
    );
    assert_eq!(
        model.modules[1].description.as_deref(),
        Some("Everything about pets")
    );
}

#[test]
fn petstore_types_are_dependency_ordered() {
    let model = model(PETSTORE);
    let names: Vec<&str> = model.types().map(|t| t.name.as_str()).collect();
    insta::assert_debug_snapshot!(names, @r###"
    [
        "PetStatus",
        "PetCategory",
        "Pet",
        "NewPet",
        "PetBase",
        "Error",
    ]
    "###);
}

#[test]
fn petstore_pet_fields() {
    let model = model(PETSTORE);
    let fields = object_fields(&model, "Pet");
    assert_eq!(
        fields,
        vec![
            (
                "id".to_string(),
                TypeRef::Builtin {
                    builtin: Builtin::Integer,
                    format: Some("int64".into())
                },
                true
            ),
            ("name".to_string(), TypeRef::builtin(Builtin::String), true),
            (
                "tag".to_string(),
                TypeRef::Nullable(Box::new(TypeRef::builtin(Builtin::String))),
                false
            ),
            ("status".to_string(), TypeRef::named("PetStatus"), false),
            ("category".to_string(), TypeRef::named("PetCategory"), false),
        ]
    );

    let TypeDefinition::Enumeration(status) = &model.find_type("PetStatus").unwrap().definition
    else {
        panic!("PetStatus should be an enumeration");
    };
    let values: Vec<_> = status.members.iter().map(|m| m.value.clone()).collect();
    assert_eq!(values, vec![json!("available"), json!("pending"), json!("sold")]);
}

#[test]
fn petstore_all_of_flattens_members() {
    let model = model(PETSTORE);
    let fields: Vec<(String, bool)> = object_fields(&model, "NewPet")
        .into_iter()
        .map(|(name, _, required)| (name, required))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("kind".to_string(), true),
            ("tag".to_string(), false),
            ("name".to_string(), true),
        ]
    );
}

#[test]
fn primary_response_and_auxiliary_map() {
    let model = model(PETSTORE);
    let get_pet = model.find_operation("getPet").unwrap();
    assert_eq!(get_pet.return_type(), &TypeRef::named("Pet"));
    assert_eq!(get_pet.other_responses.len(), 1);
    assert_eq!(get_pet.other_responses["404"].ty, TypeRef::named("Error"));

    let list = model.find_operation("listPets").unwrap();
    assert_eq!(
        list.return_type(),
        &TypeRef::Sequence(Box::new(TypeRef::named("Pet")))
    );
    assert_eq!(list.other_responses["default"].ty, TypeRef::named("Error"));

    let delete = model.find_operation("deletePet").unwrap();
    assert_eq!(delete.return_type(), &TypeRef::Void);

    let inventory = model.find_operation("getInventory").unwrap();
    assert_eq!(
        inventory.return_type(),
        &TypeRef::Map(Box::new(TypeRef::Builtin {
            builtin: Builtin::Integer,
            format: Some("int32".into())
        }))
    );
}

#[test]
fn petstore_parameters_and_body() {
    let model = model(PETSTORE);
    let list = model.find_operation("listPets").unwrap();
    let params: Vec<(&str, ParameterLocation)> = list
        .parameters
        .iter()
        .map(|p| (p.name.snake_case.as_str(), p.location))
        .collect();
    assert_eq!(
        params,
        vec![
            ("limit", ParameterLocation::Query),
            ("status", ParameterLocation::Query),
            ("x_request_id", ParameterLocation::Header),
        ]
    );
    assert_eq!(list.parameters[0].default, Some(json!(20)));
    assert_eq!(list.parameters[1].ty, TypeRef::named("PetStatus"));

    let get_pet = model.find_operation("getPet").unwrap();
    assert_eq!(get_pet.parameters[0].wire_name, "petId");
    assert!(get_pet.parameters[0].required);

    let create = model.find_operation("createPet").unwrap();
    let body = create.request_body.as_ref().unwrap();
    assert_eq!(body.ty, TypeRef::named("NewPet"));
    assert_eq!(body.content_type, "application/json");
    assert_eq!(create.parameters.last().unwrap().location, ParameterLocation::Body);
}

#[test]
fn petstore_security_overrides() {
    let model = model(PETSTORE);
    assert_eq!(
        model.security_schemes["apiKey"],
        SecurityScheme::ApiKey {
            location: CredentialLocation::Header,
            parameter_name: "X-API-Key".into()
        }
    );

    let list = model.find_operation("listPets").unwrap();
    assert_eq!(list.security.len(), 1);
    assert_eq!(list.security[0].schemes[0].name, "apiKey");

    let delete = model.find_operation("deletePet").unwrap();
    assert_eq!(delete.security[0].schemes[0].name, "bearerAuth");

    let inventory = model.find_operation("getInventory").unwrap();
    assert!(inventory.security.is_empty());
}

#[test]
fn route_based_names_for_missing_operation_ids() {
    let model = model(PETSTORE);
    assert!(model.find_operation("listHealth").is_some());

    let doc = parse::from_yaml(PETSTORE).unwrap();
    let mut options = GenerateOptions::default();
    options.naming.strategy = NamingStrategy::UseRouteBased;
    options.naming.aliases.insert("getPet".into(), "fetchPet".into());
    let model = generate(&doc, &options).unwrap();
    assert!(model.find_operation("listPets").is_some());
    assert!(model.find_operation("createPets").is_some());
    assert!(model.find_operation("fetchPet").is_some());
}

#[test]
fn group_by_route_uses_first_segment() {
    let doc = parse::from_yaml(PETSTORE).unwrap();
    let options = GenerateOptions {
        group_by: GroupBy::Route,
        ..GenerateOptions::default()
    };
    let model = generate(&doc, &options).unwrap();
    let files: Vec<&str> = model.modules.iter().map(|m| m.file_name.as_str()).collect();
    assert_eq!(files, vec!["models", "pets", "store", "health"]);
}

#[test]
fn mutual_cycle_refers_by_name() {
    let model = model(CYCLES);
    assert_eq!(
        object_fields(&model, "ComponentA")[0].1,
        TypeRef::named("ComponentB")
    );
    assert_eq!(
        object_fields(&model, "ComponentB")[0].1,
        TypeRef::named("ComponentA")
    );
}

#[test]
fn self_referencing_tree() {
    let model = model(CYCLES);
    let fields = object_fields(&model, "TreeNode");
    assert_eq!(
        fields[1].1,
        TypeRef::Nullable(Box::new(TypeRef::named("TreeNode")))
    );
    assert_eq!(
        fields[2].1,
        TypeRef::Sequence(Box::new(TypeRef::named("TreeNode")))
    );
    let get_tree = model.find_operation("getTree").unwrap();
    assert_eq!(get_tree.return_type(), &TypeRef::named("TreeNode"));
}

#[test]
fn colliding_component_names_are_disambiguated_deterministically() {
    let first = model(COLLISIONS);
    let names: Vec<String> = first.types().map(|t| t.name.clone()).collect();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], "User");
    assert!(names[1].starts_with("User_"));
    assert_eq!(names[1].len(), "User_".len() + 8);
    assert_eq!(
        first.find_type(&names[1]).unwrap().source,
        "#/components/schemas/User_"
    );

    let second = model(COLLISIONS);
    let again: Vec<String> = second.types().map(|t| t.name.clone()).collect();
    assert_eq!(names, again);
}

#[test]
fn identical_components_get_their_own_types() {
    let body = json!({"type": "object", "properties": {"id": {"type": "string"}}});
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "components": {"schemas": {"user": body, "User_": body}}
    });
    let model = generate(&doc, &GenerateOptions::default()).unwrap();
    let types: Vec<(&str, &str)> = model
        .types()
        .map(|t| (t.name.as_str(), t.source.as_str()))
        .collect();
    assert_eq!(types.len(), 2);
    assert_eq!(types[0], ("User", "#/components/schemas/user"));
    assert!(types[1].0.starts_with("User_"));
    assert_eq!(types[1].1, "#/components/schemas/User_");
}

#[test]
fn parameter_renames_never_collide() {
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {"/items/{id}": {"put": {
            "operationId": "putItem",
            "parameters": [
                {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}},
                {"name": "id_query", "in": "query", "schema": {"type": "string"}},
                {"name": "id", "in": "query", "schema": {"type": "string"}},
                {"name": "body", "in": "query", "schema": {"type": "string"}},
                {"name": "request_body", "in": "header", "schema": {"type": "string"}}
            ],
            "requestBody": {"content": {"application/json": {"schema": {"type": "string"}}}},
            "responses": {"204": {"description": "done"}}
        }}}
    });
    let model = generate(&doc, &GenerateOptions::default()).unwrap();
    let op = model.find_operation("putItem").unwrap();
    let names: Vec<&str> = op.parameters.iter().map(|p| p.name.snake_case.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "id_query", "id_query_2", "body", "request_body", "request_body_2"]
    );
}

#[test]
fn null_only_union_next_to_all_of_generates() {
    let doc = json!({
        "openapi": "3.1.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "components": {"schemas": {
            "Weird": {"oneOf": [{"type": "null"}], "allOf": [{"type": "string"}]}
        }}
    });
    let model = generate(&doc, &GenerateOptions::default()).unwrap();
    assert!(model.find_type("Weird").is_some());
}

#[test]
fn reserved_names_are_never_reused() {
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "components": {"schemas": {"Client": {"type": "object", "properties": {"id": {"type": "string"}}}}}
    });
    let options = GenerateOptions::default().with_reserved_names(["Client"]);
    let model = generate(&doc, &options).unwrap();
    let name = &model.types().next().unwrap().name;
    assert_ne!(name, "Client");
    assert!(name.starts_with("Client_"));
}

#[test]
fn discriminated_and_permissive_unions() {
    let model = model(COMPOSITION);

    let TypeDefinition::Union(pet) = &model.find_type("Pet").unwrap().definition else {
        panic!("Pet should be a union");
    };
    let mapping = &pet.discriminator.as_ref().unwrap().mapping;
    assert_eq!(mapping["kitty"], TypeRef::named("Cat"));
    assert_eq!(mapping["Dog"], TypeRef::named("Dog"));

    let hit = model.find_type("SearchHit").unwrap();
    assert!(hit.is_permissive());
    assert_eq!(hit.notes.len(), 1);

    let search = model.find_operation("search").unwrap();
    assert_eq!(search.notes.len(), 1);
    assert!(search.notes[0].contains("SearchHit"));
    assert!(model.find_operation("addPet").unwrap().notes.is_empty());

    let kinds: Vec<WarningKind> = model.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        vec![WarningKind::DefaultMismatch, WarningKind::UndiscriminatedUnion]
    );
}

#[test]
fn const_and_nullable_enums_stay_named() {
    let model = model(COMPOSITION);
    let TypeDefinition::Enumeration(fixed) = &model.find_type("Fixed").unwrap().definition else {
        panic!("Fixed should be an enumeration");
    };
    assert_eq!(fixed.base, Builtin::Integer);
    assert_eq!(fixed.members[0].name.snake_case, "value_42");
    assert!(model.find_type("Level").is_some());
}

#[test]
fn parameter_binding_order_is_fixed() {
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {"/orgs/{org}/repos/{repo}": {"post": {
            "operationId": "updateRepo",
            "parameters": [
                {"name": "X-Trace", "in": "header", "schema": {"type": "string"}},
                {"name": "page", "in": "query", "schema": {"type": "integer"}},
                {"name": "repo", "in": "path", "required": true, "schema": {"type": "string"}},
                {"name": "session", "in": "cookie", "schema": {"type": "string"}},
                {"name": "org", "in": "path", "required": true, "schema": {"type": "string"}},
                {"name": "body", "in": "query", "schema": {"type": "string"}}
            ],
            "requestBody": {"content": {"application/json": {"schema": {
                "type": "object", "properties": {"name": {"type": "string"}}
            }}}},
            "responses": {"204": {"description": "done"}}
        }}}
    });
    let model = generate(&doc, &GenerateOptions::default()).unwrap();
    let op = model.find_operation("updateRepo").unwrap();
    let order: Vec<(&str, ParameterLocation)> = op
        .parameters
        .iter()
        .map(|p| (p.name.snake_case.as_str(), p.location))
        .collect();
    assert_eq!(
        order,
        vec![
            ("org", ParameterLocation::Path),
            ("repo", ParameterLocation::Path),
            ("page", ParameterLocation::Query),
            ("body", ParameterLocation::Query),
            ("x_trace", ParameterLocation::Header),
            ("session", ParameterLocation::Cookie),
            ("request_body", ParameterLocation::Body),
        ]
    );
    assert_eq!(
        op.request_body.as_ref().unwrap().ty,
        TypeRef::named("UpdateRepoBody")
    );
}

#[test]
fn undeclared_path_placeholder_is_synthesized() {
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {"/items/{itemId}": {"get": {
            "operationId": "getItem",
            "responses": {"200": {"description": "ok"}}
        }}}
    });
    let model = generate(&doc, &GenerateOptions::default()).unwrap();
    let op = model.find_operation("getItem").unwrap();
    assert_eq!(op.parameters.len(), 1);
    assert_eq!(op.parameters[0].wire_name, "itemId");
    assert_eq!(op.parameters[0].ty, TypeRef::builtin(Builtin::String));
    assert!(op.parameters[0].required);
    assert_eq!(model.warnings[0].kind, WarningKind::UndeclaredPathParameter);
}

#[test]
fn duplicate_operation_names_get_method_suffix() {
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {"/a": {
            "get": {"operationId": "touch", "responses": {"204": {"description": "ok"}}},
            "post": {"operationId": "touch", "responses": {"204": {"description": "ok"}}}
        }}
    });
    let model = generate(&doc, &GenerateOptions::default()).unwrap();
    let names: Vec<&str> = model.operations().map(|op| op.name.camel_case.as_str()).collect();
    assert_eq!(names, vec!["touch", "touchPost"]);
}

#[test]
fn independent_fatal_errors_are_reported_together() {
    let doc = parse::from_yaml(INVALID).unwrap();
    let failure = generate(&doc, &GenerateOptions::default()).unwrap_err();
    assert_eq!(failure.errors.len(), 3, "{failure}");
    assert!(matches!(
        &failure.errors[0],
        GenerateError::Schema(SchemaError::Conflicting { .. })
    ));
    assert!(matches!(
        &failure.errors[1],
        GenerateError::Map(MapError::UnsupportedConstruct { path, .. })
            if path == "#/components/schemas/Nothing"
    ));
    assert!(matches!(
        &failure.errors[2],
        GenerateError::Operation(OperationError::UnknownSecurityScheme { operation, scheme })
            if operation == "listThings" && scheme == "missingScheme"
    ));
    assert!(failure.to_string().starts_with("generation failed with 3 errors:"));
}

#[test]
fn unresolved_references_are_all_reported() {
    let doc = json!({
        "openapi": "3.0.3",
        "info": {"title": "t", "version": "1"},
        "paths": {"/x": {"get": {
            "responses": {"200": {"description": "ok", "content": {"application/json": {
                "schema": {"$ref": "#/components/schemas/Gone"}
            }}}}
        }}},
        "components": {"schemas": {
            "Holder": {"type": "object", "properties": {"m": {"$ref": "#/components/schemas/Missing"}}}
        }}
    });
    let failure = generate(&doc, &GenerateOptions::default()).unwrap_err();
    assert_eq!(failure.errors.len(), 2);
    assert!(failure.errors.iter().all(|e| matches!(
        e,
        GenerateError::Resolve(ResolveError::UnresolvedReference { .. })
    )));
}

#[test]
fn generation_is_deterministic() {
    for fixture in [PETSTORE, CYCLES, COLLISIONS, COMPOSITION] {
        let a = serde_json::to_string(&model(fixture)).unwrap();
        let b = serde_json::to_string(&model(fixture)).unwrap();
        assert_eq!(a, b);
    }
}
