//! API integration tests against a running server

use reqwest::{header, Client};
use serde_json::Value;
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn record_visit(
    client: &Client,
    property_id: Uuid,
    cookie: Option<&str>,
) -> reqwest::Response {
    let mut request = client.post(format!("{}/properties/{}/visits", BASE_URL, property_id));
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.send().await.expect("Failed to send request")
}

async fn visit_count(client: &Client, property_id: Uuid) -> Value {
    let response = client
        .get(format!("{}/properties/{}/visits/count", BASE_URL, property_id))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_first_visit_issues_cookie() {
    let client = Client::new();

    let response = record_visit(&client, Uuid::new_v4(), None).await;
    assert_eq!(response.status(), 201);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("No visitor cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("visitor_id="));
    assert!(cookie.contains("SameSite=Lax"));

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["minted"], true);
}

#[tokio::test]
#[ignore]
async fn test_visits_are_counted() {
    let client = Client::new();
    let property_id = Uuid::new_v4();
    let cookie = format!("visitor_id={}", Uuid::new_v4());

    for _ in 0..3 {
        let response = record_visit(&client, property_id, Some(&cookie)).await;
        assert_eq!(response.status(), 201);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    let body = visit_count(&client, property_id).await;
    assert_eq!(body["count"], 3);

    let body = visit_count(&client, Uuid::new_v4()).await;
    assert_eq!(body["count"], 0);
}
