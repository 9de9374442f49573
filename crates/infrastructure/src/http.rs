use edge_bouncer_domain::BouncerError;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

pub(crate) const MAX_ATTEMPTS: u32 = 3;
const RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Map a non-success HTTP status onto the bouncer error model: 5xx and
/// rate limits are transient, the rest is a validation failure.
pub(crate) fn status_error(context: &str, status: StatusCode) -> BouncerError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        BouncerError::TransientRemote(format!("{context}: HTTP {status}"))
    } else {
        BouncerError::RemoteValidation(format!("{context}: HTTP {status}"))
    }
}

/// Send an idempotent request, retrying transport errors and transient
/// statuses up to `MAX_ATTEMPTS` times. 4xx responses fail immediately.
pub(crate) async fn send_with_retry(
    request: RequestBuilder,
    context: &str,
) -> Result<Response, BouncerError> {
    let mut last_err = None;
    for attempt in 1..=MAX_ATTEMPTS {
        let req = match request.try_clone() {
            Some(req) => req,
            None => {
                return Err(BouncerError::Io(format!(
                    "{context}: request body is not retryable"
                )))
            }
        };
        match req.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let err = status_error(context, status);
                if !err.is_transient() || attempt == MAX_ATTEMPTS {
                    return Err(err);
                }
                warn!(context, attempt, status = %status, "retrying remote call");
                last_err = Some(err);
            }
            Err(e) => {
                let err = BouncerError::TransientRemote(format!("{context}: {e}"));
                if attempt == MAX_ATTEMPTS {
                    return Err(err);
                }
                warn!(context, attempt, error = %e, "retrying remote call");
                last_err = Some(err);
            }
        }
        tokio::time::sleep(RETRY_PAUSE).await;
    }
    Err(last_err
        .unwrap_or_else(|| BouncerError::TransientRemote(format!("{context}: retries exhausted"))))
}
