//! Minimal TC3-HMAC-SHA256 signed transport for the Tencent-style cloud
//! endpoints used by the CDN and edge-WAF backends.
//!
//! Only what the bouncer needs: one signed JSON `POST` per API action,
//! with the response envelope unwrapped and errors mapped onto the
//! bouncer error model.

use chrono::Utc;
use edge_bouncer_domain::BouncerError;
use ring::{digest, hmac};
use std::time::Duration;

use crate::http::send_with_retry;

const ALGORITHM: &str = "TC3-HMAC-SHA256";
const SIGNED_HEADERS: &str = "content-type;host";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub struct TencentClient {
    http: reqwest::Client,
    secret_id: String,
    secret_key: String,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn sha256_hex(data: &str) -> String {
    hex(digest::digest(&digest::SHA256, data.as_bytes()).as_ref())
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data.as_bytes()).as_ref().to_vec()
}

impl TencentClient {
    pub fn new(secret_id: String, secret_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            secret_id,
            secret_key,
        }
    }

    /// Issue one signed API action and return the unwrapped `Response`
    /// object from the envelope.
    pub async fn post_action(
        &self,
        service: &str,
        version: &str,
        action: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, BouncerError> {
        let host = format!("{service}.tencentcloudapi.com");
        let body = payload.to_string();
        let now = Utc::now();
        let timestamp = now.timestamp();
        let date = now.format("%Y-%m-%d").to_string();

        let authorization = self.sign(service, &host, &body, timestamp, &date);

        let request = self
            .http
            .post(format!("https://{host}/"))
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", host.clone())
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Version", version)
            .body(body);

        let context = format!("{service}:{action}");
        let response = send_with_retry(request, &context).await?;
        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BouncerError::TransientRemote(format!("{context}: bad body: {e}")))?;

        let inner = envelope
            .get("Response")
            .cloned()
            .ok_or_else(|| BouncerError::RemoteValidation(format!("{context}: no envelope")))?;
        if let Some(error) = inner.get("Error") {
            let code = error
                .get("Code")
                .and_then(|c| c.as_str())
                .unwrap_or("UnknownError");
            let message = error
                .get("Message")
                .and_then(|m| m.as_str())
                .unwrap_or_default();
            let rendered = format!("{context}: {code}: {message}");
            if code.starts_with("Internal") || code.starts_with("RequestLimitExceeded") {
                return Err(BouncerError::TransientRemote(rendered));
            }
            return Err(BouncerError::RemoteValidation(rendered));
        }
        Ok(inner)
    }

    /// Build the TC3 `Authorization` header for one request.
    fn sign(&self, service: &str, host: &str, body: &str, timestamp: i64, date: &str) -> String {
        let canonical_request = format!(
            "POST\n/\n\ncontent-type:{CONTENT_TYPE}\nhost:{host}\n\n{SIGNED_HEADERS}\n{}",
            sha256_hex(body)
        );
        let scope = format!("{date}/{service}/tc3_request");
        let string_to_sign = format!(
            "{ALGORITHM}\n{timestamp}\n{scope}\n{}",
            sha256_hex(&canonical_request)
        );

        let secret_date = hmac_sha256(format!("TC3{}", self.secret_key).as_bytes(), date);
        let secret_service = hmac_sha256(&secret_date, service);
        let secret_signing = hmac_sha256(&secret_service, "tc3_request");
        let signature = hex(&hmac_sha256(&secret_signing, &string_to_sign));

        format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            self.secret_id
        )
    }
}
