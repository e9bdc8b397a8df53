//! Integration tests for `DocstoreClient::upload_csv` against wiremock.

use std::path::PathBuf;

use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopdoc_output::DocstoreClient;

const CSV: &str = "title;product_type;description;price\n\
                   Tent;Outdoor;Two person;$300.00\n\
                   Stove;Outdoor;Gas;$45.00\n\
                   Lantern;Outdoor;Bright;$20.00\n";

fn write_export(dir: &tempfile::TempDir) -> PathBuf {
    let file = dir.path().join("acme-outdoor.csv");
    std::fs::write(&file, CSV).unwrap();
    file
}

fn client(server: &MockServer) -> DocstoreClient {
    DocstoreClient::new(&format!("{}/docstore", server.uri()), 5)
        .expect("failed to build test DocstoreClient")
}

#[tokio::test]
async fn uploads_batches_as_multipart_docs_field() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_export(&dir);

    Mock::given(method("POST"))
        .and(path("/docstore"))
        .and(query_param("company", "42"))
        .and(query_param("path", "acme-outdoor.myshopify.com"))
        .and(body_string_contains("name=\"docs\""))
        .and(body_string_contains("filename=\"acme-outdoor.csv\""))
        .and(body_string_contains("title;product_type;description;price"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(2)
        .mount(&server)
        .await;

    let summary = client(&server)
        .upload_csv(&file, "42", "acme-outdoor.myshopify.com", 2)
        .await
        .unwrap();

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.rows_sent, 3);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn failed_batch_does_not_stop_remaining_batches() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = write_export(&dir);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("ingest down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let summary = client(&server)
        .upload_csv(&file, "42", "acme-outdoor.myshopify.com", 1)
        .await
        .unwrap();

    assert_eq!(summary.failed, vec![1]);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.rows_sent, 2);
    assert!(!summary.is_complete());
}

#[tokio::test]
async fn header_only_file_sends_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("empty.csv");
    std::fs::write(&file, "title;product_type;description;price\n").unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let summary = client(&server).upload_csv(&file, "42", "x", 500).await.unwrap();
    assert_eq!(summary.sent, 0);
    assert!(summary.is_complete());
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let result = client(&server)
        .upload_csv(&dir.path().join("absent.csv"), "42", "x", 500)
        .await;
    assert!(matches!(result, Err(shopdoc_output::OutputError::Io(_))));
}
