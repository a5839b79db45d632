use serde::{Deserialize, Serialize};

pub type Id = String;

/// Prefix shared by every API document id.
pub const API_DOC_PREFIX: &str = "API";

/// Deterministic id of the API document owned by `namespace` for `basepath`.
pub fn api_doc_id(namespace: &str, basepath: &str) -> Id {
    format!("{}:{}:{}", API_DOC_PREFIX, namespace, basepath)
}

/// Acknowledgment returned by the store for a successful write or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAck {
    pub ok: bool,
    pub id: Id,
    pub rev: String,
}

impl WriteAck {
    pub fn new(id: impl Into<Id>, rev: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: id.into(),
            rev: rev.into(),
        }
    }
}
