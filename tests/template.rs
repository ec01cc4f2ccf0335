mod common;

use chrono::{TimeZone, Utc};
use common::{CountingWords, FakeGateway, strings};

use fireprox::gateway::Gateway;
use fireprox::inventory::Inventory;
use fireprox::template::build_at;

#[test]
fn imported_document_lists_back_its_targets() {
    let urls = strings(&["https://a.example/", "http://b.example:8443"]);
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let (doc, drawn) = build_at(&urls, &mut CountingWords::default(), now);
    assert_eq!(drawn, strings(&["w1", "w2"]));
    assert_eq!(doc.paths.len(), 8);

    let gateway = FakeGateway::new("us-east-1");
    let api = gateway.import_rest_api(&doc.to_json().unwrap()).unwrap();
    assert_eq!(api.name, "fireprox_w0");

    let mut targets = Inventory::new(&gateway).integrations(&api.id).unwrap();
    targets.sort_by(|a, b| a.subdir.cmp(&b.subdir));
    let found: Vec<(&str, &str)> = targets
        .iter()
        .map(|t| (t.subdir.as_str(), t.target_url.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![("w1", "https://a.example/"), ("w2", "http://b.example:8443/")]
    );
}

#[test]
fn decoy_paths_are_hidden_from_proxy_resources() {
    let urls = strings(&["https://a.example"]);
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let (doc, _) = build_at(&urls, &mut CountingWords::default(), now);

    let gateway = FakeGateway::new("us-east-1");
    let api = gateway.import_rest_api(&doc.to_json().unwrap()).unwrap();

    let all: Vec<String> = gateway
        .get_resources(&api.id)
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect();
    assert!(all.contains(&"/s-w1/{proxy+}".to_string()));

    let proxies = gateway.proxy_resources(&api.id).unwrap();
    assert_eq!(proxies.len(), 1);
    assert_eq!(proxies[0].prefix, "/w1");
}
