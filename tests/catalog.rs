mod common;

use assert_matches::assert_matches;
use camino::Utf8Path;

use common::http_server::{Route, TestServer};
use pdf_catalog_sync::catalog::{Catalog, CatalogClient, CatalogHttpClient};
use pdf_catalog_sync::config::SyncConfig;
use pdf_catalog_sync::error::SyncError;

const SCENARIO: &str = r#"[
    {"link": "http://x/a.pdf", "title": "A", "publication_year": 2020},
    {"link": "http://x/b.txt"},
    {"link": null, "title": "C"}
]"#;

fn config_for(url: String) -> SyncConfig {
    SyncConfig {
        catalog_url: url,
        timeout_secs: 5,
        ..SyncConfig::default()
    }
}

#[test]
fn scenario_yields_single_target() {
    let catalog = Catalog::from_slice(SCENARIO.as_bytes()).unwrap();
    assert_eq!(catalog.len(), 3);

    let targets = catalog.targets(Utf8Path::new("pdf_downloads"));
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].file_name, "A 2020.pdf");
    assert_eq!(targets[0].remote_url, "http://x/a.pdf");
}

#[test]
fn filtering_preserves_catalog_order() {
    let body = r#"[
        {"link": "http://x/3.pdf", "title": "three"},
        {"link": "http://x/skip.html"},
        {"link": "http://x/1.PDF", "title": "one"},
        {"link": "http://x/2.pdf", "title": "two"}
    ]"#;
    let catalog = Catalog::from_slice(body.as_bytes()).unwrap();
    let titles: Vec<_> = catalog
        .eligible_entries()
        .into_iter()
        .map(|entry| entry.title.unwrap())
        .collect();
    assert_eq!(titles, ["three", "one", "two"]);
}

#[test]
fn malformed_bodies_are_parse_errors() {
    assert_matches!(
        Catalog::from_slice(b"<html>oops</html>"),
        Err(SyncError::CatalogParse(_))
    );
    assert_matches!(
        Catalog::from_slice(br#"{"link": "http://x/a.pdf"}"#),
        Err(SyncError::CatalogParse(message)) if message.contains("object")
    );
}

#[test]
fn http_client_fetches_catalog() {
    let server = TestServer::start();
    server.route("/catalog", Route::ok(SCENARIO));
    let client = CatalogHttpClient::new(&config_for(server.url("/catalog"))).unwrap();

    let catalog = client.fetch().unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.eligible_entries().len(), 1);
}

#[test]
fn http_client_reports_server_error() {
    let server = TestServer::start();
    server.route("/catalog", Route::status(500));
    let client = CatalogHttpClient::new(&config_for(server.url("/catalog"))).unwrap();

    let err = client.fetch().unwrap_err();

    assert!(err.is_catalog());
    assert_matches!(err, SyncError::CatalogStatus { status: 500, .. });
}

#[test]
fn http_client_reports_invalid_json() {
    let server = TestServer::start();
    server.route("/catalog", Route::ok("not json"));
    let client = CatalogHttpClient::new(&config_for(server.url("/catalog"))).unwrap();

    assert_matches!(client.fetch(), Err(SyncError::CatalogParse(_)));
}
