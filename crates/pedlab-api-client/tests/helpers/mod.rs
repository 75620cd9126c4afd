//! Test helpers: a mock store server and a client pointed at it.
//!
//! Run from workspace root: `cargo test -p pedlab-api-client`.

#![allow(dead_code)]

use mockito::ServerGuard;
use pedlab_api_client::{ApiClient, Auth};

pub const TEST_API_KEY: &str = "test-key";

pub struct TestApi {
    pub server: ServerGuard,
    pub client: ApiClient,
}

pub async fn setup_test_api() -> TestApi {
    let server = mockito::Server::new_async().await;
    let client = ApiClient::new(server.url(), Some(Auth::XApiKey(TEST_API_KEY.to_string())))
        .expect("Failed to create client");
    TestApi { server, client }
}

pub fn article_json(id: i64, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "excerpt": "Кратко",
        "author": "Аноним",
        "category": "Методика",
        "date": "12 March 2024"
    })
}
