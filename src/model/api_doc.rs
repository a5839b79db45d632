use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::model::{api_doc_id, Id};

pub const SWAGGER_VERSION: &str = "2.0";
pub const DEFAULT_API_VERSION: &str = "1.0.0";
/// Policy type carrying the request transform of an operation.
pub const REQUEST_MAPPING_POLICY: &str = "reqMapping";
pub const AUTH_SCHEME: &str = "Bearer";

/// One swagger path item: its operations keyed verbatim by HTTP operation,
/// plus the path-level fields (`parameters`, `$ref`, `x-*`) kept as supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PathItem {
    pub operations: BTreeMap<String, OperationEntry>,
    pub fields: Map<String, Value>,
}

fn is_path_field(key: &str) -> bool {
    key == "parameters" || key == "$ref" || key.starts_with("x-")
}

impl PathItem {
    pub fn get(&self, operation: &str) -> Option<&OperationEntry> {
        self.operations.get(operation)
    }

    pub fn insert(&mut self, operation: String, entry: OperationEntry) -> Option<OperationEntry> {
        self.operations.insert(operation, entry)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for PathItem {
    type Error = serde_json::Error;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut item = PathItem::default();
        for (key, value) in raw {
            if is_path_field(&key) {
                item.fields.insert(key, value);
            } else {
                item.operations.insert(key, serde_json::from_value(value)?);
            }
        }
        Ok(item)
    }
}

impl From<PathItem> for Map<String, Value> {
    fn from(item: PathItem) -> Self {
        let mut raw = item.fields;
        for (operation, entry) in item.operations {
            // Operation entries are plain serde structs with string keys
            if let Ok(value) = serde_json::to_value(entry) {
                raw.insert(operation, value);
            }
        }
        raw
    }
}

/// One stored API document: every path and operation registered for a
/// (namespace, basepath) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDocument {
    #[serde(rename = "_id")]
    pub id: Id,
    /// Store-assigned revision. Never part of the persisted body.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub namespace: String,
    pub apidoc: ApiDoc,
    #[serde(
        rename = "documentTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RouteDocument {
    /// A fresh, revision-less document with no paths.
    pub fn new(namespace: impl Into<String>, apidoc: ApiDoc) -> Self {
        let namespace = namespace.into();
        Self {
            id: api_doc_id(&namespace, &apidoc.base_path),
            revision: None,
            namespace,
            apidoc,
            updated_at: None,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.apidoc.base_path
    }

    pub fn operation(&self, relpath: &str, operation: &str) -> Option<&OperationEntry> {
        self.apidoc.paths.get(relpath)?.get(operation)
    }

    /// The document as it is persisted: everything except the revision.
    pub fn body(&self) -> RouteDocument {
        RouteDocument {
            revision: None,
            ..self.clone()
        }
    }
}

/// Swagger 2.0 description of an API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDoc {
    #[serde(default = "default_swagger_version")]
    pub swagger: String,
    #[serde(default)]
    pub info: ApiInfo,
    #[serde(rename = "basePath")]
    pub base_path: String,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    /// Any other top-level swagger fields, kept as supplied.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_swagger_version() -> String {
    SWAGGER_VERSION.to_string()
}

impl ApiDoc {
    pub fn new(title: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            swagger: SWAGGER_VERSION.to_string(),
            info: ApiInfo {
                title: title.into(),
                version: DEFAULT_API_VERSION.to_string(),
            },
            base_path: base_path.into(),
            paths: BTreeMap::new(),
            extensions: Map::new(),
        }
    }

    /// Install `entry` at `paths[relpath][operation]`, leaving the other
    /// operations of the path untouched. Returns the entry it replaced.
    pub fn set_operation(
        &mut self,
        relpath: &str,
        operation: &str,
        entry: OperationEntry,
    ) -> Option<OperationEntry> {
        self.paths
            .entry(relpath.to_string())
            .or_default()
            .insert(operation.to_string(), entry)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
}

/// A swagger operation object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEntry {
    /// How the gateway fulfils the operation. Absent for operations supplied
    /// through a swagger document that do not target an action.
    #[serde(rename = "x-ibm-op-ext", default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<OperationBinding>,
    #[serde(default)]
    pub responses: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl OperationEntry {
    pub fn for_action(action: &ActionTarget) -> Self {
        let mut responses = BTreeMap::new();
        responses.insert(
            "default".to_string(),
            serde_json::json!({ "description": "Default response" }),
        );
        Self {
            binding: Some(OperationBinding::for_action(action)),
            responses,
            extensions: Map::new(),
        }
    }
}

/// Backend action that fulfils one (path, operation) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBinding {
    pub backend_method: String,
    pub backend_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_namespace: Option<String>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl OperationBinding {
    /// Binding for `action` with the standard request transform: all query
    /// parameters move into the body and the action's auth key is injected
    /// as the Authorization header.
    pub fn for_action(action: &ActionTarget) -> Self {
        let auth_value = format!(
            "{} {}",
            AUTH_SCHEME,
            action.authkey.as_deref().unwrap_or_default()
        );
        Self {
            backend_method: action.backend_method.clone(),
            backend_url: action.backend_url.clone(),
            action_name: Some(action.name.clone()),
            action_namespace: Some(action.namespace.clone()),
            policies: vec![Policy {
                kind: REQUEST_MAPPING_POLICY.to_string(),
                value: vec![
                    MappingRule {
                        action: MappingAction::Transform,
                        from: MappingEndpoint::param("*", ParamLocation::Query),
                        to: MappingEndpoint::param("*", ParamLocation::Body),
                    },
                    MappingRule {
                        action: MappingAction::Insert,
                        from: MappingEndpoint::literal(auth_value),
                        to: MappingEndpoint::param("Authorization", ParamLocation::Header),
                    },
                ],
            }],
        }
    }

    /// Rules of the request-mapping policy, in application order.
    pub fn request_transform(&self) -> &[MappingRule] {
        self.policies
            .iter()
            .find(|p| p.kind == REQUEST_MAPPING_POLICY)
            .map(|p| p.value.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Vec<MappingRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    pub action: MappingAction,
    pub from: MappingEndpoint,
    pub to: MappingEndpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingAction {
    Transform,
    Insert,
}

/// Source or target of a mapping rule: either a named parameter at a
/// location or a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParamLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl MappingEndpoint {
    pub fn param(name: impl Into<String>, location: ParamLocation) -> Self {
        Self {
            name: Some(name.into()),
            location: Some(location),
            value: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            name: None,
            location: None,
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Query,
    Body,
    Header,
    Path,
}

/// A fully specified backend action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTarget {
    pub backend_method: String,
    pub backend_url: String,
    pub name: String,
    pub namespace: String,
    pub authkey: Option<String>,
}
