//! Catalog seeding against a mocked HTTP bridge.

mod common;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bytes::Bytes;
use common::Library;
use core_library::{CatalogSeeder, SeedReport, SongQuery};
use mockall::mock;
use std::collections::HashMap;
use std::sync::Arc;

const SEED_URL: &str = "http://localhost:3030/songs.json";

mock! {
    pub Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        async fn execute_with_retry(
            &self,
            request: HttpRequest,
            policy: RetryPolicy,
        ) -> BridgeResult<HttpResponse>;
    }
}

fn response(status: u16, body: &'static str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from_static(body.as_bytes()),
    }
}

fn seeder_with(http: MockHttp, library: &Library) -> CatalogSeeder {
    CatalogSeeder::new(Arc::new(http), library.catalog.clone())
}

#[tokio::test]
async fn imports_songs_from_endpoint() {
    let library = Library::in_memory();
    let mut http = MockHttp::new();
    http.expect_execute_with_retry()
        .withf(|request, _| request.url == SEED_URL)
        .times(1)
        .returning(|_, _| {
            Ok(response(
                200,
                r#"[{"id": 1, "title": "A", "seconds": 61},
                    {"id": "2", "path": "/m/b.mp3", "base_path": "/m"}]"#,
            ))
        });

    let report = seeder_with(http, &library).seed(SEED_URL).await;

    assert_eq!(report, SeedReport::Imported { count: 2 });
    assert_eq!(library.queries.count(&SongQuery::all()).await.unwrap(), 2);
}

#[tokio::test]
async fn transport_failure_is_skipped() {
    let library = Library::in_memory();
    let mut http = MockHttp::new();
    http.expect_execute_with_retry()
        .returning(|_, _| Err(BridgeError::OperationFailed("Connection refused".into())));

    let report = seeder_with(http, &library).seed(SEED_URL).await;

    assert!(matches!(report, SeedReport::Skipped { ref reason } if reason.contains("Connection refused")));
    assert_eq!(report.imported(), 0);
}

#[tokio::test]
async fn error_status_is_skipped() {
    let library = Library::in_memory();
    let mut http = MockHttp::new();
    http.expect_execute_with_retry()
        .returning(|_, _| Ok(response(404, "not found")));

    let report = seeder_with(http, &library).seed(SEED_URL).await;
    assert!(matches!(report, SeedReport::Skipped { ref reason } if reason.contains("404")));
}

#[tokio::test]
async fn malformed_body_leaves_catalog_untouched() {
    let library = Library::in_memory();
    library
        .catalog
        .import_songs(common::abc_songs())
        .await
        .unwrap();

    let mut http = MockHttp::new();
    http.expect_execute_with_retry()
        .returning(|_, _| Ok(response(200, r#"{"songs": []}"#)));

    let report = seeder_with(http, &library).seed(SEED_URL).await;
    assert!(matches!(report, SeedReport::Skipped { .. }));
    assert_eq!(library.queries.count(&SongQuery::all()).await.unwrap(), 3);
}

#[tokio::test]
async fn invalid_song_is_skipped() {
    let library = Library::in_memory();
    let mut http = MockHttp::new();
    http.expect_execute_with_retry()
        .returning(|_, _| Ok(response(200, r#"[{"id": 1, "seconds": -2}]"#)));

    let report = seeder_with(http, &library).seed(SEED_URL).await;
    assert!(matches!(report, SeedReport::Skipped { ref reason } if reason.contains("import failed")));
}
