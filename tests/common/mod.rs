#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::cell::RefCell;
use std::time::Duration;

use fireprox::batch::Pause;
use fireprox::error::GatewayError;
use fireprox::gateway::{Account, Deployment, Gateway, Integration, Page, Resource, RestApi};
use fireprox::words::WordSource;

pub struct FakeApi {
    pub api: RestApi,
    /// (resource, integration uri)
    pub resources: Vec<(Resource, Option<String>)>,
}

#[derive(Default)]
struct State {
    apis: Vec<FakeApi>,
    next_id: usize,
    calls: Vec<String>,
    imports_before_failure: Option<usize>,
}

/// In-memory API Gateway. Imports turn the document's paths into resources
/// the same way the real service does: trailing slashes are dropped.
pub struct FakeGateway {
    region: String,
    page_size: usize,
    state: RefCell<State>,
}

impl FakeGateway {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            page_size: 25,
            state: RefCell::new(State::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Imports after the first `n` fail with a throttling error.
    pub fn fail_imports_after(&self, n: usize) {
        self.state.borrow_mut().imports_before_failure = Some(n);
    }

    /// Adds a definition proxying `targets` under `/{word}/`.
    pub fn seed(&self, id: &str, targets: &[(&str, &str)]) {
        let mut resources = vec![resource(id, 0, "/", None)];
        for (i, (word, target)) in targets.iter().enumerate() {
            let target = target.trim_end_matches('/');
            resources.push(resource(id, i * 2 + 1, &format!("/{word}"), Some(target.to_string())));
            resources.push(resource(
                id,
                i * 2 + 2,
                &format!("/{word}/{{proxy+}}"),
                Some(format!("{target}/{{proxy}}")),
            ));
        }
        self.state.borrow_mut().apis.push(FakeApi {
            api: rest_api(id, &format!("fireprox_{id}")),
            resources,
        });
    }

    /// Adds a definition with only a root resource.
    pub fn seed_empty(&self, id: &str) {
        self.state.borrow_mut().apis.push(FakeApi {
            api: rest_api(id, "empty"),
            resources: vec![resource(id, 0, "/", None)],
        });
    }

    pub fn api_ids(&self) -> Vec<String> {
        self.state.borrow().apis.iter().map(|a| a.api.id.clone()).collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn uri_of(&self, api_id: &str, path: &str) -> Option<String> {
        let state = self.state.borrow();
        let api = state.apis.iter().find(|a| a.api.id == api_id)?;
        api.resources
            .iter()
            .find(|(r, _)| r.path == path)
            .and_then(|(_, uri)| uri.clone())
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn rest_api(id: &str, name: &str) -> RestApi {
    RestApi {
        id: id.to_string(),
        name: name.to_string(),
        created_date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single(),
        version: None,
    }
}

fn resource(api_id: &str, n: usize, path: &str, uri: Option<String>) -> (Resource, Option<String>) {
    (
        Resource {
            id: format!("{api_id}-r{n}"),
            path: path.to_string(),
        },
        uri,
    )
}

fn not_found(what: &str) -> GatewayError {
    GatewayError::Remote {
        status: 404,
        kind: "NotFoundException".to_string(),
        message: format!("Invalid {what} identifier specified"),
    }
}

impl Gateway for FakeGateway {
    fn region(&self) -> &str {
        &self.region
    }

    fn get_account(&self) -> Result<Account, GatewayError> {
        self.record("get_account".into());
        Ok(Account::default())
    }

    fn import_rest_api(&self, document: &[u8]) -> Result<RestApi, GatewayError> {
        self.record("import_rest_api".into());
        {
            let mut state = self.state.borrow_mut();
            if let Some(left) = state.imports_before_failure {
                if left == 0 {
                    return Err(GatewayError::Remote {
                        status: 429,
                        kind: "TooManyRequestsException".into(),
                        message: "Too Many Requests".into(),
                    });
                }
                state.imports_before_failure = Some(left - 1);
            }
        }

        let doc: Value = serde_json::from_slice(document)
            .map_err(|source| GatewayError::Decode { what: "document", source })?;
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("api{:04}", state.next_id);

        let mut resources = vec![resource(&id, 0, "/", None)];
        if let Some(paths) = doc["paths"].as_object() {
            for (i, (path, item)) in paths.iter().enumerate() {
                let normalized = path.trim_end_matches('/');
                let uri = item["x-amazon-apigateway-any-method"]["x-amazon-apigateway-integration"]
                    ["uri"]
                    .as_str()
                    .map(str::to_string);
                resources.push(resource(&id, i + 1, normalized, uri));
            }
        }

        let title = doc["info"]["title"].as_str().unwrap_or_default().to_string();
        let api = rest_api(&id, &title);
        state.apis.push(FakeApi {
            api: api.clone(),
            resources,
        });
        Ok(api)
    }

    fn create_deployment(&self, api_id: &str) -> Result<Deployment, GatewayError> {
        self.record(format!("create_deployment {api_id}"));
        Ok(Deployment {
            id: format!("dep-{api_id}"),
        })
    }

    fn list_rest_apis(&self, position: Option<&str>) -> Result<Page<RestApi>, GatewayError> {
        self.record(format!("list_rest_apis {}", position.unwrap_or("-")));
        let state = self.state.borrow();
        let start: usize = position.map(|p| p.parse().unwrap_or(0)).unwrap_or(0);
        let end = (start + self.page_size).min(state.apis.len());
        let items = state.apis[start.min(end)..end]
            .iter()
            .map(|a| a.api.clone())
            .collect();
        let position = (end < state.apis.len()).then(|| end.to_string());
        Ok(Page { items, position })
    }

    fn get_resources(&self, api_id: &str) -> Result<Vec<Resource>, GatewayError> {
        self.record(format!("get_resources {api_id}"));
        let state = self.state.borrow();
        let api = state
            .apis
            .iter()
            .find(|a| a.api.id == api_id)
            .ok_or_else(|| not_found("API"))?;
        Ok(api.resources.iter().map(|(r, _)| r.clone()).collect())
    }

    fn get_integration(&self, api_id: &str, resource_id: &str) -> Result<Integration, GatewayError> {
        self.record(format!("get_integration {api_id} {resource_id}"));
        let state = self.state.borrow();
        let uri = state
            .apis
            .iter()
            .find(|a| a.api.id == api_id)
            .and_then(|a| a.resources.iter().find(|(r, _)| r.id == resource_id))
            .ok_or_else(|| not_found("Resource"))?
            .1
            .clone();
        Ok(Integration { uri })
    }

    fn update_integration_uri(
        &self,
        api_id: &str,
        resource_id: &str,
        uri: &str,
    ) -> Result<Integration, GatewayError> {
        self.record(format!("update_integration_uri {api_id} {resource_id} {uri}"));
        let mut state = self.state.borrow_mut();
        let entry = state
            .apis
            .iter_mut()
            .find(|a| a.api.id == api_id)
            .and_then(|a| a.resources.iter_mut().find(|(r, _)| r.id == resource_id))
            .ok_or_else(|| not_found("Resource"))?;
        entry.1 = Some(uri.to_string());
        Ok(Integration {
            uri: Some(uri.to_string()),
        })
    }

    fn delete_rest_api(&self, api_id: &str) -> Result<(), GatewayError> {
        self.record(format!("delete_rest_api {api_id}"));
        let mut state = self.state.borrow_mut();
        let before = state.apis.len();
        state.apis.retain(|a| a.api.id != api_id);
        if state.apis.len() == before {
            return Err(not_found("API"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPause {
    pub pauses: RefCell<Vec<Duration>>,
}

impl Pause for RecordingPause {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}

impl RecordingPause {
    pub fn taken(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

/// Hands out `w0`, `w1`, ... so tests can predict paths.
#[derive(Default)]
pub struct CountingWords {
    next: usize,
}

impl WordSource for CountingWords {
    fn random_word(&mut self) -> String {
        let word = format!("w{}", self.next);
        self.next += 1;
        word
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn output(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).into_owned()
}

pub fn tmp_file(prefix: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).expect("write temp file");
    path
}
