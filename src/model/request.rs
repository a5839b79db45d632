use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{api_doc_id, ActionTarget, ApiDoc, Id};

/// Raw deleteRoute payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRouteRequest {
    pub docid: Option<String>,
}

/// Raw updateApi / createApi payload. Every field is optional here so that
/// missing input is reported by validation rather than by the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiRequest {
    pub namespace: Option<String>,
    pub basepath: Option<String>,
    pub relpath: Option<String>,
    pub operation: Option<String>,
    pub action: Option<ActionInput>,
    /// Entire swagger document, as an object or a JSON string.
    pub swagger: Option<Value>,
    pub apiname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub backend_method: Option<String>,
    pub backend_url: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub authkey: Option<String>,
}

/// What a validated request changes in the API document.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiChange {
    /// Bind one (relpath, operation) pair to an action.
    Path {
        relpath: String,
        operation: String,
        action: ActionTarget,
    },
    /// Replace the whole API description.
    Swagger(ApiDoc),
}

/// A validated updateApi / createApi request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiUpdate {
    pub namespace: String,
    pub basepath: String,
    pub apiname: Option<String>,
    pub change: ApiChange,
}

impl ApiUpdate {
    pub fn doc_id(&self) -> Id {
        api_doc_id(&self.namespace, &self.basepath)
    }
}
