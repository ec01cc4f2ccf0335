use chrono::Utc;
use reqwest::Method;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::GatewayError;
use crate::sigv4::{self, SigningParams};

const USER_AGENT: &str = concat!("fireprox/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the API Gateway management endpoint. Every request is
/// SigV4-signed with the session's credentials.
pub struct HttpClient {
    base_url: String,
    region: String,
    credentials: Credentials,
    client: Client,
}

impl HttpClient {
    pub fn new(
        base_url: String,
        region: String,
        credentials: Credentials,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url,
            region,
            credentials,
            client,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sends one request and returns the decoded JSON body (`Null` when
    /// empty). Non-2xx responses become `GatewayError::Remote`.
    pub fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Value, GatewayError> {
        let mut url = build_url(&self.base_url, path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }

        let payload = body.unwrap_or_default();
        let params = SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: sigv4::SERVICE,
            time: Utc::now(),
        };
        let signed = sigv4::sign(method.as_str(), &url, &payload, &params)?;

        tracing::debug!(%method, url = %url, bytes = payload.len(), "gateway request");

        let mut req = self
            .client
            .request(method, url)
            .header("accept", "application/json");
        for (k, v) in signed {
            req = req.header(k, v);
        }
        if !payload.is_empty() {
            req = req.header("content-type", "application/json").body(payload);
        }

        let resp = req.send()?;
        let status = resp.status();
        let error_type = resp
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp.text()?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(status = status.as_u16(), "gateway response");

        if !status.is_success() {
            return Err(remote_error(status.as_u16(), error_type, &body));
        }

        Ok(body)
    }
}

fn remote_error(status: u16, error_type: Option<String>, body: &Value) -> GatewayError {
    // x-amzn-ErrorType looks like "NotFoundException:http://internal.amazon.com/..."
    let kind = error_type
        .as_deref()
        .and_then(|v| v.split(':').next())
        .or_else(|| body.get("__type").and_then(Value::as_str))
        .unwrap_or("RemoteError")
        .to_string();
    let message = body
        .get("message")
        .or_else(|| body.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match body {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        });
    GatewayError::Remote {
        status,
        kind,
        message,
    }
}

fn build_url(base: &str, path: &str) -> Result<reqwest::Url, GatewayError> {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let full = format!("{}/{}", base, path);
    reqwest::Url::parse(&full).map_err(|_| GatewayError::Endpoint(full))
}
