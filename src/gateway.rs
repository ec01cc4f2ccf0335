//! API Gateway management calls, one method per remote operation.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::http::HttpClient;

pub const STAGE_NAME: &str = "fireprox";
pub const STAGE_DESCRIPTION: &str = "FireProx Prod";
pub const DEPLOYMENT_DESCRIPTION: &str = "FireProx Production Deployment";

/// Resources whose path starts with this are decoys and never enumerated.
pub const DECOY_PREFIX: &str = "/s-";
pub const PROXY_SUFFIX: &str = "/{proxy+}";
pub const PAGE_LIMIT: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApi {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl RestApi {
    pub fn created_display(&self) -> String {
        match self.created_date {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
            None => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
}

/// Only the success of `GET /account` matters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {}

/// One page of a collection. The wire format names the list `item`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "item", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub position: Option<String>,
}

/// A wildcard-suffix resource, with its path minus `/{proxy+}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResource {
    pub id: String,
    pub prefix: String,
}

pub trait Gateway {
    fn region(&self) -> &str;

    fn get_account(&self) -> Result<Account, GatewayError>;

    /// Imports a Swagger document as a new regional REST API.
    fn import_rest_api(&self, document: &[u8]) -> Result<RestApi, GatewayError>;

    fn create_deployment(&self, api_id: &str) -> Result<Deployment, GatewayError>;

    fn list_rest_apis(&self, position: Option<&str>) -> Result<Page<RestApi>, GatewayError>;

    fn get_resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError>;

    fn get_integration(&self, api_id: &str, resource_id: &str)
    -> Result<Integration, GatewayError>;

    fn update_integration_uri(
        &self,
        api_id: &str,
        resource_id: &str,
        uri: &str,
    ) -> Result<Integration, GatewayError>;

    fn delete_rest_api(&self, api_id: &str) -> Result<(), GatewayError>;

    fn proxy_resources(&self, api_id: &str) -> Result<Vec<ProxyResource>, GatewayError> {
        Ok(self
            .get_resources(api_id)?
            .into_iter()
            .filter_map(|res| {
                if res.path.starts_with(DECOY_PREFIX) {
                    return None;
                }
                let prefix = res.path.strip_suffix(PROXY_SUFFIX)?.to_string();
                Some(ProxyResource { id: res.id, prefix })
            })
            .collect())
    }
}

/// Lazily walks every REST API, requesting the next page only once the
/// current one is drained.
pub fn definitions<G: Gateway + ?Sized>(gateway: &G) -> Definitions<'_, G> {
    Definitions {
        gateway,
        buffer: Vec::new().into_iter(),
        position: None,
        done: false,
    }
}

pub struct Definitions<'a, G: ?Sized> {
    gateway: &'a G,
    buffer: std::vec::IntoIter<RestApi>,
    position: Option<String>,
    done: bool,
}

impl<G: Gateway + ?Sized> Iterator for Definitions<'_, G> {
    type Item = Result<RestApi, GatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(api) = self.buffer.next() {
                return Some(Ok(api));
            }
            if self.done {
                return None;
            }
            match self.gateway.list_rest_apis(self.position.as_deref()) {
                Ok(page) => {
                    self.done = page.position.is_none() || page.items.is_empty();
                    self.position = page.position;
                    self.buffer = page.items.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

pub struct GatewayClient {
    http: HttpClient,
}

impl GatewayClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn call<T: DeserializeOwned>(
        &self,
        what: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<T, GatewayError> {
        let body = self.http.execute(method, path, query, body)?;
        decode(what, body)
    }
}

fn decode<T: DeserializeOwned>(what: &'static str, body: Value) -> Result<T, GatewayError> {
    serde_json::from_value(body).map_err(|source| GatewayError::Decode { what, source })
}

fn json_body(value: Value) -> Option<Vec<u8>> {
    Some(value.to_string().into_bytes())
}

fn integration_path(api_id: &str, resource_id: &str) -> String {
    format!(
        "/restapis/{}/resources/{}/methods/ANY/integration",
        urlencoding::encode(api_id),
        urlencoding::encode(resource_id)
    )
}

impl Gateway for GatewayClient {
    fn region(&self) -> &str {
        self.http.region()
    }

    fn get_account(&self) -> Result<Account, GatewayError> {
        self.call("account", Method::GET, "/account", &[], None)
    }

    fn import_rest_api(&self, document: &[u8]) -> Result<RestApi, GatewayError> {
        let query = [
            ("mode", "import".to_string()),
            ("endpointConfigurationTypes", "REGIONAL".to_string()),
        ];
        self.call(
            "imported rest api",
            Method::POST,
            "/restapis",
            &query,
            Some(document.to_vec()),
        )
    }

    fn create_deployment(&self, api_id: &str) -> Result<Deployment, GatewayError> {
        let body = json!({
            "stageName": STAGE_NAME,
            "stageDescription": STAGE_DESCRIPTION,
            "description": DEPLOYMENT_DESCRIPTION,
        });
        let path = format!("/restapis/{}/deployments", urlencoding::encode(api_id));
        self.call("deployment", Method::POST, &path, &[], json_body(body))
    }

    fn list_rest_apis(&self, position: Option<&str>) -> Result<Page<RestApi>, GatewayError> {
        let mut query = vec![("limit", PAGE_LIMIT.to_string())];
        if let Some(position) = position {
            query.push(("position", position.to_string()));
        }
        self.call("rest api page", Method::GET, "/restapis", &query, None)
    }

    fn get_resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError> {
        let path = format!("/restapis/{}/resources", urlencoding::encode(api_id));
        let query = [("limit", PAGE_LIMIT.to_string())];
        let page: Page<Resource> = self.call("resources", Method::GET, &path, &query, None)?;
        Ok(page.items)
    }

    fn get_integration(
        &self,
        api_id: &str,
        resource_id: &str,
    ) -> Result<Integration, GatewayError> {
        let path = integration_path(api_id, resource_id);
        self.call("integration", Method::GET, &path, &[], None)
    }

    fn update_integration_uri(
        &self,
        api_id: &str,
        resource_id: &str,
        uri: &str,
    ) -> Result<Integration, GatewayError> {
        let body = json!({
            "patchOperations": [
                { "op": "replace", "path": "/uri", "value": uri }
            ]
        });
        let path = integration_path(api_id, resource_id);
        self.call("integration", Method::PATCH, &path, &[], json_body(body))
    }

    fn delete_rest_api(&self, api_id: &str) -> Result<(), GatewayError> {
        let path = format!("/restapis/{}", urlencoding::encode(api_id));
        self.http.execute(Method::DELETE, &path, &[], None)?;
        Ok(())
    }
}

fn epoch_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|secs| {
        let whole = secs.trunc() as i64;
        let nanos = ((secs - secs.trunc()) * 1e9) as u32;
        DateTime::from_timestamp(whole, nanos)
    }))
}
