use axum::Json;
use serde_json::{json, Value};

use super::models::{ENTRYPOINT_FIELD, FILE_FIELD};

pub async fn openapi() -> Json<Value> {
    Json(document())
}

fn model_summary() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "urn": { "type": "string" }
        }
    })
}

fn error_body() -> Value {
    json!({
        "type": "object",
        "properties": {
            "error": { "type": "string" },
            "message": { "type": "string", "nullable": true }
        }
    })
}

fn path_param(name: &str, description: &str) -> Value {
    json!({
        "in": "path",
        "name": name,
        "required": true,
        "schema": { "type": "string" },
        "description": description
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn document() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "APS Model API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Upload, list, translate and delete models stored in Autodesk Platform Services."
        },
        "tags": [ { "name": "Auth" }, { "name": "Models" } ],
        "paths": {
            "/api/auth/token": {
                "get": {
                    "tags": ["Auth"],
                    "summary": "Get a viewer access token",
                    "responses": {
                        "200": json_response("Access token", json!({
                            "type": "object",
                            "properties": {
                                "access_token": { "type": "string" },
                                "token_type": { "type": "string" },
                                "expires_in": { "type": "integer" }
                            }
                        })),
                        "502": json_response("Upstream failure", error_body())
                    }
                }
            },
            "/api/models": {
                "get": {
                    "tags": ["Models"],
                    "summary": "List uploaded models",
                    "responses": {
                        "200": json_response("Models in the bucket", json!({
                            "type": "array",
                            "items": model_summary()
                        })),
                        "502": json_response("Upstream failure", error_body())
                    }
                },
                "post": {
                    "tags": ["Models"],
                    "summary": "Upload a model and start its translation",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "multipart/form-data": {
                                "schema": {
                                    "type": "object",
                                    "required": [FILE_FIELD],
                                    "properties": {
                                        FILE_FIELD: { "type": "string", "format": "binary" },
                                        ENTRYPOINT_FIELD: { "type": "string", "example": "scene.svf" }
                                    }
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("Model uploaded, translation requested", model_summary()),
                        "400": json_response("Missing model file", error_body()),
                        "413": json_response("Upload too large", error_body()),
                        "502": json_response("Upstream failure", error_body())
                    }
                }
            },
            "/api/models/{urn}/status": {
                "get": {
                    "tags": ["Models"],
                    "summary": "Translation status of a model",
                    "parameters": [ path_param("urn", "Model urn returned by the list or upload routes") ],
                    "responses": {
                        "200": json_response("Status, progress and flattened messages", json!({
                            "type": "object",
                            "properties": {
                                "status": { "type": "string" },
                                "progress": { "type": "string" },
                                "messages": { "type": "array", "items": { "type": "object" } }
                            }
                        })),
                        "400": json_response("Malformed urn", error_body()),
                        "502": json_response("Upstream failure", error_body())
                    }
                }
            },
            "/api/models/{objectKey}/": {
                "delete": {
                    "tags": ["Models"],
                    "summary": "Delete a model by its object key",
                    "parameters": [ path_param("objectKey", "Object key (model name) in the bucket") ],
                    "responses": {
                        "200": {
                            "description": "Confirmation message",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        },
                        "404": json_response("No such object", error_body()),
                        "502": json_response("Upstream failure", error_body())
                    }
                }
            }
        }
    })
}
