//! Endpoint metadata extraction and schema rendering.

use atuyka_services::endpoint::{endpoint_metadata, BASE_METHODS};
use atuyka_services::{MethodSignature, ParamSignature, ParamType, ServiceMethod};

const OFFSET: &[ParamSignature] = &[ParamSignature::optional("offset", ParamType::Integer)];
const QUERY: &[ParamSignature] = &[ParamSignature::required("q", ParamType::String)];

#[test]
fn liked_posts_metadata_from_declaration() {
    let signature = MethodSignature::new(
        "get_liked_posts",
        "Get liked posts.\n\nArgs:\n offset (int): description",
    )
    .with_params(OFFSET);

    let method = ServiceMethod::from_signature(&signature);

    assert_eq!(method.name, "liked_posts");
    assert_eq!(method.description, "Get liked posts.");
    assert_eq!(method.parameters.len(), 1);

    let offset = &method.parameters[0];
    assert_eq!(offset.name, "offset");
    assert_eq!(offset.ty, ParamType::Integer);
    assert_eq!(offset.description.as_deref(), Some("description"));
    assert!(!offset.required);
}

#[test]
fn extraction_is_deterministic() {
    let signature = MethodSignature::new("search_posts", "Search posts.\n\nArgs:\n    q (str): Query.")
        .with_params(QUERY);

    assert_eq!(
        ServiceMethod::from_signature(&signature),
        ServiceMethod::from_signature(&signature)
    );
}

#[test]
fn schema_puts_service_and_token_first() {
    let signature = MethodSignature::new("get_posts", "Get posts made by a user.").with_params(OFFSET);
    let schema = ServiceMethod::from_signature(&signature).to_schema();

    assert_eq!(schema["name"], "posts");
    assert_eq!(schema["description"], "Get posts made by a user.");

    let parameters = schema["parameters"].as_array().unwrap();
    assert_eq!(parameters.len(), 3);
    assert_eq!(parameters[0]["name"], "service");
    assert_eq!(parameters[0]["required"], true);
    assert_eq!(parameters[1]["name"], "token");
    assert_eq!(parameters[1]["required"], false);

    let offset = &parameters[2];
    assert_eq!(offset["name"], "offset");
    assert_eq!(offset["in"], "query");
    assert_eq!(offset["description"], "");
    assert_eq!(offset["schema"]["type"], "integer");
}

#[test]
fn declarations_override_base_operations() {
    let declared = [MethodSignature::new("get_posts", "Get posts made by a user.").with_params(OFFSET)];
    let methods = endpoint_metadata(&declared).unwrap();

    assert_eq!(methods.len(), BASE_METHODS.len());
    assert_eq!(methods["get_posts"].parameters.len(), 1);
    assert!(methods["get_user"].parameters.is_empty());
    assert_eq!(methods["get_following_feed"].name, "following_feed");
}
