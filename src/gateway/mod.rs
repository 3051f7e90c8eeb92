//! Request gateway: the single path from page modules to the backend.
//!
//! Builds each outgoing request, attaches the bearer credential held by the
//! [`SessionManager`], classifies the response and runs the reauthorization retry.
//! A 401 is retried only when the credential changed while the call was in flight,
//! and only while the call's retry budget lasts. Otherwise the session is cleared
//! and the location forced to the login route, unless the call is a background one.

pub mod download;
pub mod options;
pub mod response;

use std::path::PathBuf;
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{DownloadError, GatewayError};
use crate::notify::{Notifier, Severity};
use crate::router::location::{force_route, NavigationPort};
use crate::session::{ProfileSource, SessionManager};

pub use download::{DownloadSink, FileSink};
pub use options::{serialize_query, Expect, QueryValue, RequestBody, RequestOptions};
pub use response::Payload;

static MISSING_CREDENTIAL_WARNING: Once = Once::new();

pub struct RequestGateway {
    client: reqwest::Client,
    base_url: String,
    retry_budget: u8,
    login_route: String,
    session: Arc<SessionManager>,
    location: Arc<dyn NavigationPort>,
    notifier: Option<Arc<dyn Notifier>>,
    sink: Arc<dyn DownloadSink>,
}

impl RequestGateway {
    pub fn new(
        config: &AppConfig,
        session: Arc<SessionManager>,
        location: Arc<dyn NavigationPort>,
        notifier: Option<Arc<dyn Notifier>>,
        sink: Arc<dyn DownloadSink>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.clone(),
            retry_budget: config.api.retry_budget,
            login_route: config.routes.login.clone(),
            session,
            location,
            notifier,
            sink,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Issues one logical call and returns its decoded payload.
    pub async fn request(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> Result<Payload, GatewayError> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "request",
            %request_id,
            method = %options.method,
            target = %target,
            background = options.background,
        );
        self.dispatch(target, options, request_id)
            .instrument(span)
            .await
    }

    async fn dispatch(
        &self,
        target: &str,
        options: RequestOptions,
        request_id: Uuid,
    ) -> Result<Payload, GatewayError> {
        let mut budget = options.retry_budget.unwrap_or(self.retry_budget);

        loop {
            let credential = self.session.credential();
            let response = self
                .send(target, &options, credential.as_deref(), request_id)
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && budget > 0 {
                let fresh = self.session.credential();
                if fresh.is_some() && fresh != credential {
                    budget -= 1;
                    tracing::debug!("Credential changed during call, retrying once");
                    continue;
                }
            }

            return self.settle(response, &options).await;
        }
    }

    async fn send(
        &self,
        target: &str,
        options: &RequestOptions,
        credential: Option<&str>,
        request_id: Uuid,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = self.resolve_url(target, &options.query);
        tracing::debug!(url = %url, "Sending request");

        let mut builder = self
            .client
            .request(options.method.clone(), &url)
            .header("x-request-id", request_id.to_string());

        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match &options.body {
            Some(RequestBody::Json(value)) => {
                let payload = serde_json::to_vec(value).map_err(|e| {
                    GatewayError::transport(format!("Failed to encode request: {}", e))
                })?;
                if !options.has_content_type() {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder = builder.body(payload);
            }
            Some(RequestBody::Text(text)) => {
                builder = builder.body(text.clone());
            }
            Some(RequestBody::Binary {
                bytes,
                content_type,
            }) => {
                if let Some(content_type) = content_type {
                    if !options.has_content_type() {
                        builder = builder.header(CONTENT_TYPE, content_type.as_str());
                    }
                }
                builder = builder.body(bytes.clone());
            }
            None => {}
        }

        match credential {
            Some(token) => builder = builder.bearer_auth(token),
            None if !options.background && looks_like_api_call(target) => {
                MISSING_CREDENTIAL_WARNING.call_once(|| {
                    tracing::warn!("Calling the API without a credential; requests will be rejected until login");
                });
            }
            None => {}
        }

        builder.send().await.map_err(|e| {
            tracing::debug!("Transport failure: {}", e);
            GatewayError::from(e)
        })
    }

    async fn settle(
        &self,
        response: reqwest::Response,
        options: &RequestOptions,
    ) -> Result<Payload, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response::decode(response, options.expect).await);
        }

        let body = response.text().await.unwrap_or_default();
        let data = response::error_data(&body);
        let server_message = response::server_message(data.as_ref());
        let message = response::failure_message(status, data.as_ref());

        match status {
            StatusCode::UNAUTHORIZED if !options.background => {
                tracing::warn!("Authorization failed, ending session");
                self.session.clear_session();
                if let Some(text) = &server_message {
                    self.notify(text, Severity::Error);
                }
                force_route(self.location.as_ref(), &self.login_route);
            }
            StatusCode::FORBIDDEN => {
                tracing::warn!("Request forbidden: {}", message);
                if let (false, Some(text)) = (options.background, &server_message) {
                    self.notify(text, Severity::Warning);
                }
            }
            _ => {
                tracing::debug!(status = status.as_u16(), "Request failed: {}", message);
            }
        }

        Err(GatewayError::new(message, status.as_u16(), data))
    }

    fn notify(&self, message: &str, severity: Severity) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message, severity);
        }
    }

    /// Full URL for `target`. Absolute targets bypass the configured base.
    pub fn resolve_url(&self, target: &str, query: &[(String, QueryValue)]) -> String {
        let mut url = build_url_with_base(&self.base_url, target);
        let encoded = serialize_query(query);
        if !encoded.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encoded);
        }
        url
    }

    pub async fn get(&self, target: &str) -> Result<Payload, GatewayError> {
        self.request(target, RequestOptions::get()).await
    }

    pub async fn post(&self, target: &str, body: Value) -> Result<Payload, GatewayError> {
        self.request(target, RequestOptions::post().json(body)).await
    }

    pub async fn put(&self, target: &str, body: Value) -> Result<Payload, GatewayError> {
        self.request(target, RequestOptions::put().json(body)).await
    }

    pub async fn delete(&self, target: &str) -> Result<Payload, GatewayError> {
        self.request(target, RequestOptions::delete()).await
    }

    /// GET that may fail quietly: no auth warning, no session clear, no redirect.
    pub async fn background_get(&self, target: &str) -> Result<Payload, GatewayError> {
        self.request(target, RequestOptions::get().background()).await
    }

    /// Fetches binary content and saves it through the download sink.
    pub async fn download(
        &self,
        target: &str,
        options: RequestOptions,
        filename: Option<&str>,
    ) -> Result<PathBuf, DownloadError> {
        let payload = self.request(target, options.expect(Expect::Blob)).await?;
        let name = match filename {
            Some(name) => download::safe_filename(name),
            None => download::filename_from_target(target),
        };

        let path = self.sink.save(&name, payload.into_bytes()).await?;
        tracing::info!("Saved download to {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl ProfileSource for RequestGateway {
    async fn fetch_identity(&self, endpoint: &str) -> Result<Value, GatewayError> {
        let options = RequestOptions::get().background().expect(Expect::Json);
        self.request(endpoint, options).await.map(Payload::into_json)
    }
}

fn is_absolute(target: &str) -> bool {
    let lowered = target.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

fn looks_like_api_call(target: &str) -> bool {
    !is_absolute(target) || target.contains("/api/")
}

/// Joins a base URL and a target path, leaving absolute targets untouched.
fn build_url_with_base(base_url: &str, target: &str) -> String {
    let target = target.trim();
    if is_absolute(target) {
        return target.to_string();
    }

    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        target.to_string()
    } else {
        format!("{}/{}", base, target.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_relative_targets() {
        assert_eq!(
            build_url_with_base("http://erp.test/", "/api/students"),
            "http://erp.test/api/students"
        );
        assert_eq!(build_url_with_base("", "/api/students"), "/api/students");
    }

    #[test]
    fn test_build_url_keeps_absolute_targets() {
        assert_eq!(
            build_url_with_base("http://erp.test", "https://files.test/report.pdf"),
            "https://files.test/report.pdf"
        );
    }

    #[test]
    fn test_api_call_detection() {
        assert!(looks_like_api_call("/api/students"));
        assert!(looks_like_api_call("https://erp.test/api/students"));
        assert!(!looks_like_api_call("https://cdn.test/logo.png"));
    }
}
