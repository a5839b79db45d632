//! Client for the sibling read service (`getRoute` / `getApi`).

use reqwest::{Client as HttpClient, Response, StatusCode};
use std::time::Duration;

use crate::error::LookupError;
use crate::lookup::traits::{ApiDocFetcher, LookupResult, RevisionResolver};
use crate::model::RouteDocument;

pub const GET_ROUTE_PATH: &str = "routemgmt/getRoute";
pub const GET_API_PATH: &str = "routemgmt/getApi";

/// Looks documents up through another deployment's read endpoints.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    base_url: String,
    http: HttpClient,
}

impl HttpLookup {
    /// Create a client for the read service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the HTTP client cannot be
    /// created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> LookupResult<Self> {
        let base_url = base_url.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(LookupError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let http = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// GET a stored document as raw JSON; `missing` is the message used when
    /// the service has no document or returns one without a revision.
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        missing: String,
    ) -> LookupResult<serde_json::Value> {
        let url = self.url(path);
        log::debug!("lookup GET {} {:?}", url, query);
        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(missing));
        }
        if !status.is_success() {
            return Err(error_from_response(status, response).await);
        }

        let body: serde_json::Value = response.json().await?;
        if revision_of(&body).is_none() {
            log::error!("_rev value not returned from {}", url);
            return Err(LookupError::NotFound(missing));
        }
        Ok(body)
    }
}

fn revision_of(body: &serde_json::Value) -> Option<&str> {
    body.get("_rev").and_then(|rev| rev.as_str())
}

async fn error_from_response(status: StatusCode, response: Response) -> LookupError {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let message = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => json["error"]
            .as_str()
            .or_else(|| json["message"].as_str())
            .unwrap_or(&body)
            .to_string(),
        Err(_) => body,
    };

    LookupError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait::async_trait]
impl RevisionResolver for HttpLookup {
    async fn current_revision(&self, docid: &str) -> LookupResult<String> {
        // Any stored document kind may sit behind a docid; only its revision matters
        let missing = format!("Route {} was not located", docid);
        let body = self
            .get_json(GET_ROUTE_PATH, &[("docid", docid)], missing.clone())
            .await?;
        revision_of(&body)
            .map(str::to_string)
            .ok_or(LookupError::NotFound(missing))
    }
}

#[async_trait::async_trait]
impl ApiDocFetcher for HttpLookup {
    async fn fetch_api_doc(&self, namespace: &str, basepath: &str) -> LookupResult<RouteDocument> {
        let body = self
            .get_json(
                GET_API_PATH,
                &[("namespace", namespace), ("basepath", basepath)],
                format!("Document for basepath \"{}\" was not located", basepath),
            )
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}
