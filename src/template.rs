//! Swagger 2.0 import documents for proxy definitions.
//!
//! Every target URL gets four paths: two decoys under `/s-{word}/` and the
//! two real entries under `/{word}/`, each in an exact and a `{proxy+}`
//! wildcard form. All of them pass any method straight through to the
//! target and forward `X-My-X-Forwarded-For` as `X-Forwarded-For`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::Serializer;

use crate::words::WordSource;

pub const TITLE_PREFIX: &str = "fireprox_";
const FORWARDED_HEADER: &str = "X-My-X-Forwarded-For";
const CACHE_NAMESPACE: &str = "19gna3";

/// Map that serializes its entries in insertion order.
#[derive(Debug, Clone)]
pub struct Ordered<V>(pub Vec<(String, V)>);

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V: Serialize> Serialize for Ordered<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl<V> Ordered<V> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub swagger: &'static str,
    pub info: Info,
    pub base_path: &'static str,
    pub schemes: Vec<&'static str>,
    pub paths: Ordered<PathItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub version: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathItem {
    #[serde(rename = "x-amazon-apigateway-any-method")]
    pub any_method: AnyMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnyMethod {
    pub parameters: Vec<Parameter>,
    pub responses: Ordered<StatusResponse>,
    #[serde(rename = "x-amazon-apigateway-integration")]
    pub integration: IntegrationSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: &'static str,
    #[serde(rename = "in")]
    pub location: &'static str,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "statusCode")]
    pub status_code: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSpec {
    pub uri: String,
    pub responses: Ordered<StatusResponse>,
    pub request_parameters: Ordered<&'static str>,
    pub passthrough_behavior: &'static str,
    pub http_method: &'static str,
    pub cache_namespace: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cache_key_parameters: Vec<&'static str>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ImportDocument {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn to_yaml(&self) -> serde_yaml::Result<String> {
        serde_yaml::to_string(self)
    }
}

/// Drops a single trailing slash.
pub fn clean_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Builds the import document for `urls`; returns it with the word drawn for
/// each URL, in input order.
pub fn build(urls: &[String], words: &mut dyn WordSource) -> (ImportDocument, Vec<String>) {
    build_at(urls, words, Utc::now())
}

pub fn build_at(
    urls: &[String],
    words: &mut dyn WordSource,
    now: DateTime<Utc>,
) -> (ImportDocument, Vec<String>) {
    let title = format!("{TITLE_PREFIX}{}", words.random_word());
    let drawn = words.random_words(urls.len());

    let mut paths = Vec::with_capacity(urls.len() * 4);
    for (url, word) in urls.iter().zip(&drawn) {
        let url = clean_url(url);
        paths.push((format!("/s-{word}/"), path_item(format!("{url}/"), false)));
        paths.push((
            format!("/s-{word}/{{proxy+}}/"),
            path_item(format!("{url}/{{proxy}}/"), true),
        ));
        paths.push((format!("/{word}/"), path_item(url.to_string(), false)));
        paths.push((
            format!("/{word}/{{proxy+}}"),
            path_item(format!("{url}/{{proxy}}"), true),
        ));
    }

    let document = ImportDocument {
        swagger: "2.0",
        info: Info {
            version: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            title,
        },
        base_path: "/",
        schemes: vec!["https"],
        paths: Ordered(paths),
    };
    (document, drawn)
}

fn path_item(uri: String, wildcard: bool) -> PathItem {
    let mut parameters = Vec::new();
    let mut request_parameters = Vec::new();
    let mut cache_key_parameters = Vec::new();
    if wildcard {
        parameters.push(Parameter {
            name: "proxy",
            location: "path",
            required: true,
            kind: "string",
        });
        request_parameters.push((
            "integration.request.path.proxy".to_string(),
            "method.request.path.proxy",
        ));
        cache_key_parameters.push("method.request.path.proxy");
    }
    parameters.push(Parameter {
        name: FORWARDED_HEADER,
        location: "header",
        required: true,
        kind: "string",
    });
    request_parameters.push((
        "integration.request.header.X-Forwarded-For".to_string(),
        "method.request.header.X-My-X-Forwarded-For",
    ));

    PathItem {
        any_method: AnyMethod {
            parameters,
            responses: Ordered::default(),
            integration: IntegrationSpec {
                uri,
                responses: Ordered(vec![(
                    "default".to_string(),
                    StatusResponse { status_code: "200" },
                )]),
                request_parameters: Ordered(request_parameters),
                passthrough_behavior: "when_no_match",
                http_method: "ANY",
                cache_namespace: CACHE_NAMESPACE,
                cache_key_parameters,
                kind: "http_proxy",
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    struct Fixed(Vec<&'static str>);

    impl WordSource for Fixed {
        fn random_word(&mut self) -> String {
            self.0.remove(0).to_string()
        }
    }

    fn render(urls: &[&str], words: Vec<&'static str>) -> (Value, Vec<String>) {
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let (doc, drawn) = build_at(&urls, &mut Fixed(words), now);
        (serde_json::from_slice(&doc.to_json().unwrap()).unwrap(), drawn)
    }

    #[test]
    fn header_fields() {
        let (doc, drawn) = render(&["https://example.com/"], vec!["title", "cat"]);
        assert_eq!(drawn, vec!["cat"]);
        assert_eq!(doc["swagger"], "2.0");
        assert_eq!(doc["info"]["title"], "fireprox_title");
        assert_eq!(doc["info"]["version"], "2024-05-06T07:08:09Z");
        assert_eq!(doc["basePath"], "/");
        assert_eq!(doc["schemes"], json!(["https"]));
    }

    #[test]
    fn four_paths_per_url_with_expected_uris() {
        let (doc, _) = render(
            &["https://a.example", "http://b.example:8080/"],
            vec!["t", "one", "two"],
        );
        let paths = doc["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 8);

        let uri = |p: &str| {
            paths[p]["x-amazon-apigateway-any-method"]["x-amazon-apigateway-integration"]["uri"]
                .as_str()
                .unwrap()
                .to_string()
        };
        assert_eq!(uri("/s-one/"), "https://a.example/");
        assert_eq!(uri("/s-one/{proxy+}/"), "https://a.example/{proxy}/");
        assert_eq!(uri("/one/"), "https://a.example");
        assert_eq!(uri("/one/{proxy+}"), "https://a.example/{proxy}");
        assert_eq!(uri("/two/"), "http://b.example:8080");
        assert_eq!(uri("/two/{proxy+}"), "http://b.example:8080/{proxy}");
    }

    #[test]
    fn wildcard_integration_shape() {
        let (doc, _) = render(&["https://a.example"], vec!["t", "w"]);
        let method = &doc["paths"]["/w/{proxy+}"]["x-amazon-apigateway-any-method"];
        assert_eq!(
            method["parameters"],
            json!([
                {"name": "proxy", "in": "path", "required": true, "type": "string"},
                {"name": "X-My-X-Forwarded-For", "in": "header", "required": true, "type": "string"}
            ])
        );
        assert_eq!(method["responses"], json!({}));
        let integration = &method["x-amazon-apigateway-integration"];
        assert_eq!(integration["responses"], json!({"default": {"statusCode": "200"}}));
        assert_eq!(
            integration["requestParameters"],
            json!({
                "integration.request.path.proxy": "method.request.path.proxy",
                "integration.request.header.X-Forwarded-For": "method.request.header.X-My-X-Forwarded-For"
            })
        );
        assert_eq!(integration["passthroughBehavior"], "when_no_match");
        assert_eq!(integration["httpMethod"], "ANY");
        assert_eq!(integration["cacheNamespace"], "19gna3");
        assert_eq!(integration["cacheKeyParameters"], json!(["method.request.path.proxy"]));
        assert_eq!(integration["type"], "http_proxy");
    }

    #[test]
    fn exact_paths_have_no_cache_keys() {
        let (doc, _) = render(&["https://a.example"], vec!["t", "w"]);
        let integration =
            &doc["paths"]["/w/"]["x-amazon-apigateway-any-method"]["x-amazon-apigateway-integration"];
        assert!(integration.get("cacheKeyParameters").is_none());
        assert_eq!(
            doc["paths"]["/w/"]["x-amazon-apigateway-any-method"]["parameters"]
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn paths_keep_insertion_order() {
        let urls = vec!["https://z.example".to_string()];
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (doc, _) = build_at(&urls, &mut Fixed(vec!["t", "zz"]), now);
        let keys: Vec<&str> = doc.paths.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["/s-zz/", "/s-zz/{proxy+}/", "/zz/", "/zz/{proxy+}"]);
        assert!(doc.to_yaml().unwrap().contains("x-amazon-apigateway-any-method"));
    }

    #[test]
    fn clean_url_strips_one_slash() {
        assert_eq!(clean_url("http://a//"), "http://a/");
        assert_eq!(clean_url("http://a"), "http://a");
    }
}
