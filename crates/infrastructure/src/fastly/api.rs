use async_trait::async_trait;
use edge_bouncer_domain::BouncerError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::cleanup::CleanupList;
use crate::http::send_with_retry;

/// Provider-side cap on entries per ACL.
pub const ACL_CAPACITY: usize = 100;

/// Provider-side cap on operations per entry-patch request.
const MAX_OPS_PER_PATCH: usize = 100;

/// Name prefix of every remote resource this bouncer owns.
pub const MANAGED_PREFIX: &str = "crowdsec";

const BASE_URL: &str = "https://api.fastly.com";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceVersion {
    pub number: u64,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AclSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AclEntry {
    pub id: String,
    pub ip: String,
    #[serde(default)]
    pub subnet: Option<u8>,
}

impl AclEntry {
    /// Canonical `ip/len` key matching the normalized feed items.
    pub fn key(&self) -> String {
        format!("{}/{}", self.ip, self.subnet.unwrap_or(32))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnippetSummary {
    pub id: String,
    pub name: String,
}

/// One batched ACL entry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclOp {
    Create { ip: String, subnet: u8 },
    Delete { entry_id: String },
}

/// A VCL snippet to install into a service version.
#[derive(Debug, Clone)]
pub struct Snippet {
    pub name: String,
    pub snippet_type: String,
    pub dynamic: bool,
    pub content: String,
}

/// The Fastly API surface the backend needs; swapped for a mock in tests.
#[async_trait]
pub trait FastlyApi: Send + Sync {
    async fn list_versions(&self, service_id: &str) -> Result<Vec<ServiceVersion>, BouncerError>;

    /// Clone `version` into a fresh writable draft; returns its number.
    async fn clone_version(&self, service_id: &str, version: u64) -> Result<u64, BouncerError>;

    async fn list_acls(
        &self,
        service_id: &str,
        version: u64,
    ) -> Result<Vec<AclSummary>, BouncerError>;

    async fn create_acl(
        &self,
        service_id: &str,
        version: u64,
        name: &str,
    ) -> Result<AclSummary, BouncerError>;

    async fn delete_acl(
        &self,
        service_id: &str,
        version: u64,
        name: &str,
    ) -> Result<(), BouncerError>;

    async fn list_acl_entries(
        &self,
        service_id: &str,
        acl_id: &str,
    ) -> Result<Vec<AclEntry>, BouncerError>;

    /// Apply entry mutations, chunked to the provider's per-request cap.
    async fn patch_acl_entries(
        &self,
        service_id: &str,
        acl_id: &str,
        ops: &[AclOp],
    ) -> Result<(), BouncerError>;

    async fn list_snippets(
        &self,
        service_id: &str,
        version: u64,
    ) -> Result<Vec<SnippetSummary>, BouncerError>;

    /// Returns the created snippet's id.
    async fn create_snippet(
        &self,
        service_id: &str,
        version: u64,
        snippet: &Snippet,
    ) -> Result<String, BouncerError>;

    /// Dynamic snippets are updated in place, outside the version draft.
    async fn update_dynamic_snippet(
        &self,
        service_id: &str,
        snippet_id: &str,
        content: &str,
    ) -> Result<(), BouncerError>;

    async fn delete_snippet(
        &self,
        service_id: &str,
        version: u64,
        name: &str,
    ) -> Result<(), BouncerError>;

    /// All service ids visible to the account token (config generation).
    async fn list_service_ids(&self) -> Result<Vec<String>, BouncerError>;
}

pub struct FastlyHttpClient {
    http: reqwest::Client,
    token: String,
    cleanup: Option<Arc<CleanupList>>,
}

impl FastlyHttpClient {
    pub fn new(token: String, cleanup: Option<Arc<CleanupList>>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            token,
            cleanup,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{BASE_URL}{endpoint}")
    }

    fn record_cleanup(&self, endpoint: &str) {
        if let Some(cleanup) = &self.cleanup {
            cleanup.record(&self.token, &self.url(endpoint));
        }
    }

    fn get(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(endpoint))
            .header("Fastly-Key", self.token.as_str())
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(endpoint))
            .header("Fastly-Key", self.token.as_str())
    }

    fn put(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .put(self.url(endpoint))
            .header("Fastly-Key", self.token.as_str())
    }

    fn patch(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .patch(self.url(endpoint))
            .header("Fastly-Key", self.token.as_str())
    }

    fn delete(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .delete(self.url(endpoint))
            .header("Fastly-Key", self.token.as_str())
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, BouncerError> {
    response
        .json()
        .await
        .map_err(|e| BouncerError::RemoteValidation(format!("{context}: bad body: {e}")))
}

#[async_trait]
impl FastlyApi for FastlyHttpClient {
    async fn list_versions(&self, service_id: &str) -> Result<Vec<ServiceVersion>, BouncerError> {
        let response = send_with_retry(
            self.get(&format!("/service/{service_id}/version")),
            "fastly:versions",
        )
        .await?;
        parse_json(response, "fastly:versions").await
    }

    async fn clone_version(&self, service_id: &str, version: u64) -> Result<u64, BouncerError> {
        let response = send_with_retry(
            self.put(&format!("/service/{service_id}/version/{version}/clone")),
            "fastly:clone",
        )
        .await?;
        let body: serde_json::Value = parse_json(response, "fastly:clone").await?;
        body.get("number")
            .and_then(|n| n.as_u64())
            .ok_or_else(|| BouncerError::RemoteValidation("fastly:clone: no version".to_string()))
    }

    async fn list_acls(
        &self,
        service_id: &str,
        version: u64,
    ) -> Result<Vec<AclSummary>, BouncerError> {
        let response = send_with_retry(
            self.get(&format!("/service/{service_id}/version/{version}/acl")),
            "fastly:acls",
        )
        .await?;
        parse_json(response, "fastly:acls").await
    }

    async fn create_acl(
        &self,
        service_id: &str,
        version: u64,
        name: &str,
    ) -> Result<AclSummary, BouncerError> {
        let endpoint = format!("/service/{service_id}/version/{version}/acl");
        let response = send_with_retry(
            self.post(&endpoint).form(&[("name", name)]),
            "fastly:create-acl",
        )
        .await?;
        self.record_cleanup(&format!("{endpoint}/{name}"));
        parse_json(response, "fastly:create-acl").await
    }

    async fn delete_acl(
        &self,
        service_id: &str,
        version: u64,
        name: &str,
    ) -> Result<(), BouncerError> {
        send_with_retry(
            self.delete(&format!("/service/{service_id}/version/{version}/acl/{name}")),
            "fastly:delete-acl",
        )
        .await?;
        Ok(())
    }

    async fn list_acl_entries(
        &self,
        service_id: &str,
        acl_id: &str,
    ) -> Result<Vec<AclEntry>, BouncerError> {
        let response = send_with_retry(
            self.get(&format!(
                "/service/{service_id}/acl/{acl_id}/entries?per_page={ACL_CAPACITY}"
            )),
            "fastly:entries",
        )
        .await?;
        parse_json(response, "fastly:entries").await
    }

    async fn patch_acl_entries(
        &self,
        service_id: &str,
        acl_id: &str,
        ops: &[AclOp],
    ) -> Result<(), BouncerError> {
        for chunk in ops.chunks(MAX_OPS_PER_PATCH) {
            let entries: Vec<serde_json::Value> = chunk
                .iter()
                .map(|op| match op {
                    AclOp::Create { ip, subnet } => {
                        json!({"op": "create", "ip": ip, "subnet": subnet})
                    }
                    AclOp::Delete { entry_id } => json!({"op": "delete", "id": entry_id}),
                })
                .collect();
            send_with_retry(
                self.patch(&format!("/service/{service_id}/acl/{acl_id}/entries"))
                    .json(&json!({ "entries": entries })),
                "fastly:patch-entries",
            )
            .await?;
        }
        Ok(())
    }

    async fn list_snippets(
        &self,
        service_id: &str,
        version: u64,
    ) -> Result<Vec<SnippetSummary>, BouncerError> {
        let response = send_with_retry(
            self.get(&format!("/service/{service_id}/version/{version}/snippet")),
            "fastly:snippets",
        )
        .await?;
        parse_json(response, "fastly:snippets").await
    }

    async fn create_snippet(
        &self,
        service_id: &str,
        version: u64,
        snippet: &Snippet,
    ) -> Result<String, BouncerError> {
        let endpoint = format!("/service/{service_id}/version/{version}/snippet");
        let dynamic = if snippet.dynamic { "1" } else { "0" };
        let response = send_with_retry(
            self.post(&endpoint).form(&[
                ("name", snippet.name.as_str()),
                ("type", snippet.snippet_type.as_str()),
                ("dynamic", dynamic),
                ("content", snippet.content.as_str()),
                ("priority", "100"),
            ]),
            "fastly:create-snippet",
        )
        .await?;
        self.record_cleanup(&format!("{endpoint}/{}", snippet.name));
        let body: serde_json::Value = parse_json(response, "fastly:create-snippet").await?;
        Ok(body
            .get("id")
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn update_dynamic_snippet(
        &self,
        service_id: &str,
        snippet_id: &str,
        content: &str,
    ) -> Result<(), BouncerError> {
        send_with_retry(
            self.put(&format!("/service/{service_id}/snippet/{snippet_id}"))
                .form(&[("content", content)]),
            "fastly:update-snippet",
        )
        .await?;
        Ok(())
    }

    async fn delete_snippet(
        &self,
        service_id: &str,
        version: u64,
        name: &str,
    ) -> Result<(), BouncerError> {
        send_with_retry(
            self.delete(&format!(
                "/service/{service_id}/version/{version}/snippet/{name}"
            )),
            "fastly:delete-snippet",
        )
        .await?;
        Ok(())
    }

    async fn list_service_ids(&self) -> Result<Vec<String>, BouncerError> {
        #[derive(Deserialize)]
        struct ServiceSummary {
            id: String,
        }
        let per_page = 50;
        let mut page = 1;
        let mut ids = Vec::new();
        loop {
            let response = send_with_retry(
                self.get(&format!("/service?page={page}&per_page={per_page}")),
                "fastly:services",
            )
            .await?;
            let services: Vec<ServiceSummary> = parse_json(response, "fastly:services").await?;
            let count = services.len();
            ids.extend(services.into_iter().map(|s| s.id));
            if count < per_page {
                return Ok(ids);
            }
            page += 1;
        }
    }
}
