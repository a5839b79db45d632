//! Request validation. Runs before any remote call; a request that passes
//! comes out as a typed [`ApiUpdate`] or document id.

use serde_json::Value;

use crate::error::RouteError;
use crate::model::{ActionInput, ActionTarget, ApiChange, ApiDoc, ApiRequest, ApiUpdate, DeleteRouteRequest, Id};

/// Treat absent and empty strings alike.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

pub fn validate_delete(req: &DeleteRouteRequest) -> Result<Id, RouteError> {
    present(&req.docid)
        .map(str::to_string)
        .ok_or_else(|| RouteError::validation("docid is required."))
}

pub fn validate_api_request(req: ApiRequest) -> Result<ApiUpdate, RouteError> {
    let namespace = present(&req.namespace)
        .ok_or_else(|| RouteError::validation("namespace is required."))?
        .to_string();

    match &req.swagger {
        Some(swagger) => {
            if present(&req.basepath).is_some() {
                return Err(RouteError::validation(
                    "swagger and basepath are mutually exclusive and cannot be specified together.",
                ));
            }
            if present(&req.relpath).is_some()
                || present(&req.operation).is_some()
                || req.action.is_some()
            {
                return Err(RouteError::validation(
                    "swagger and relpath, operation or action are mutually exclusive and cannot be specified together.",
                ));
            }
            let apidoc = parse_swagger(swagger)?;
            Ok(ApiUpdate {
                namespace,
                basepath: apidoc.base_path.clone(),
                apiname: req.apiname.clone(),
                change: ApiChange::Swagger(apidoc),
            })
        }
        None => {
            let action = req.action.as_ref().map(validate_action).transpose()?;
            let (Some(basepath), Some(relpath), Some(operation), Some(action)) = (
                present(&req.basepath),
                present(&req.relpath),
                present(&req.operation),
                action,
            ) else {
                return Err(RouteError::validation(
                    "When swagger is not specified, basepath, relpath, operation and action are required.",
                ));
            };
            Ok(ApiUpdate {
                namespace,
                basepath: basepath.to_string(),
                apiname: req.apiname.clone(),
                change: ApiChange::Path {
                    relpath: relpath.to_string(),
                    operation: operation.to_string(),
                    action,
                },
            })
        }
    }
}

fn validate_action(action: &ActionInput) -> Result<ActionTarget, RouteError> {
    match (
        present(&action.backend_method),
        present(&action.backend_url),
        present(&action.name),
        present(&action.namespace),
    ) {
        (Some(backend_method), Some(backend_url), Some(name), Some(namespace)) => Ok(ActionTarget {
            backend_method: backend_method.to_string(),
            backend_url: backend_url.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            authkey: action.authkey.clone(),
        }),
        _ => Err(RouteError::validation(
            "An action must include backendMethod, backendUrl, name (of action) and namespace (of action).",
        )),
    }
}

/// Accept the swagger document as an object or as a JSON string holding one.
fn parse_swagger(swagger: &Value) -> Result<ApiDoc, RouteError> {
    let parsed;
    let object = match swagger {
        Value::Object(_) => swagger,
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).map_err(|_| {
                RouteError::validation("swagger field cannot be parsed. Ensure it is valid JSON.")
            })?;
            &parsed
        }
        other => {
            return Err(RouteError::validation(format!(
                "swagger field is {} and should be an object or a JSON string.",
                json_type_name(other)
            )))
        }
    };

    if !object.is_object() {
        return Err(RouteError::validation(format!(
            "swagger field is {} and should be an object or a JSON string.",
            json_type_name(object)
        )));
    }
    match object.get("basePath").and_then(Value::as_str) {
        Some(base_path) if !base_path.is_empty() => {}
        _ => return Err(RouteError::validation("swagger document must declare a basePath.")),
    }

    serde_json::from_value(object.clone()).map_err(|e| {
        RouteError::validation(format!("swagger document is not a valid API description: {}", e))
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
