use serde_json::Value;

#[test]
fn openapi_describes_permission_request() -> anyhow::Result<()> {
    // Build the OpenAPI document the same way the server does
    let doc = workgrid::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let props = v
        .get("components")
        .and_then(Value::as_object)
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
        .and_then(|s| s.get("PermissionRequestBody"))
        .and_then(Value::as_object)
        .and_then(|t| t.get("properties"))
        .and_then(Value::as_object)
        .expect("components.schemas.PermissionRequestBody.properties must exist");

    let keys = ["user_id", "resource_id", "requested_permission"];
    for k in &keys {
        assert!(props.contains_key(*k), "OpenAPI PermissionRequestBody schema missing '{}'", k);
    }

    Ok(())
}

#[test]
fn openapi_lists_authorization_routes_with_bearer_auth() -> anyhow::Result<()> {
    let doc = workgrid::docs::build_openapi(8123)?;
    let v = serde_json::to_value(&doc)?;

    for path in ["/authorization/check", "/authorization/direct", "/authorization/validate", "/authorization/cache"] {
        assert!(v["paths"].get(path).is_some(), "missing path {}", path);
    }

    assert_eq!(v["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
    assert_eq!(v["servers"][0]["url"], "http://localhost:8123");
    assert!(v["paths"]["/authorization/check"]["post"]["requestBody"]["content"]["application/json"]["example"].is_object());

    Ok(())
}
