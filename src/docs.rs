use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::authorization::check,
		routes::authorization::check_direct,
		routes::authorization::validate,
		routes::authorization::clear_cache
	),
	components(
		schemas(
			routes::health::HealthResponse,
			models::authz::PermissionRequestBody,
			models::authz::AuthorizationResponse,
			models::authz::ClaimsValidation
		)
	),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Authorization", description = "Work item permission checks")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(&ApiDoc::openapi())?;

	ensure_security_components(&mut doc);
	add_examples(&mut doc);
	ensure_servers(&mut doc, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);

	let json_route = {
		let doc_json = Arc::clone(&doc_json);
		get(move || {
			let doc_json = Arc::clone(&doc_json);
			async move { Json((*doc_json).clone()) }
		})
	};

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_security_components(doc: &mut Value) {
	let Some(root) = doc.as_object_mut() else {
		return;
	};

	let components = root.entry("components").or_insert_with(|| json!({}));
	if let Some(components) = components.as_object_mut() {
		let schemes = components.entry("securitySchemes").or_insert_with(|| json!({}));
		if let Some(schemes) = schemes.as_object_mut() {
			schemes.insert(
				"bearerAuth".to_string(),
				json!({
					"type": "http",
					"scheme": "bearer",
					"bearerFormat": "JWT"
				}),
			);
		}
	}
}

// Request body examples for Swagger UI's "Try it out".
fn add_examples(doc: &mut Value) {
	let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) else {
		return;
	};

	for (path, item) in paths.iter_mut() {
		if !path.starts_with("/authorization/") {
			continue;
		}
		let Some(content) = item
			.get_mut("post")
			.and_then(|op| op.get_mut("requestBody"))
			.and_then(|rb| rb.get_mut("content"))
			.and_then(|c| c.get_mut("application/json"))
			.and_then(Value::as_object_mut)
		else {
			continue;
		};

		content.entry("example").or_insert_with(|| {
			json!({
				"user_id": 5,
				"resource_id": 42,
				"requested_permission": 3
			})
		});
	}
}

fn ensure_servers(doc: &mut Value, port: u16) {
	if doc.get("servers").is_none() {
		doc["servers"] = json!([{ "url": format!("http://localhost:{}", port) }]);
	}
}
