use std::sync::Arc;

use catalog_infra::InMemoryCatalogRepository;
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over the in-memory repository, on an ephemeral port.
        let app = catalog_api::app::build_app(Arc::new(InMemoryCatalogRepository::new()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, product: Value) -> i64 {
    let res = client
        .post(srv.url("/products"))
        .json(&json!({ "product": product }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["product_id"].as_i64().unwrap()
}

async fn create_packet(client: &reqwest::Client, srv: &TestServer, packet: Value) -> reqwest::Response {
    client
        .post(srv.url("/packets"))
        .json(&json!({ "packet": packet }))
        .send()
        .await
        .unwrap()
}

async fn error_message(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_outside_the_api_prefix() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn product_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_product(&client, &srv, json!({"name": "Milk", "price": 99.99, "sku": "SKU001"})).await;
    assert!(id > 0);

    let res = client.get(srv.url(&format!("/products/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["product"]["id"], id);
    assert_eq!(body["product"]["name"], "Milk");
    assert_eq!(body["product"]["price"], 99.99);
    assert_eq!(body["product"]["sku"], "SKU001");

    let res = client
        .put(srv.url(&format!("/products/{id}")))
        .json(&json!({"product": {"id": id, "name": "Milk 2.5%", "price": 109.99, "sku": "SKU001"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({}));

    let res = client.get(srv.url(&format!("/products/{id}"))).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["product"]["name"], "Milk 2.5%");
    assert_eq!(body["product"]["price"], 109.99);

    let res = client.delete(srv.url(&format!("/products/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url(&format!("/products/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(error_message(res).await.contains("not found"));
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    create_product(&client, &srv, json!({"name": "A", "sku": "DUP"})).await;

    let res = client
        .post(srv.url("/products"))
        .json(&json!({"product": {"name": "B", "sku": "DUP"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert!(error_message(res).await.contains("DUP"));
}

#[tokio::test]
async fn package_composition_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let m = create_product(&client, &srv, json!({"name": "Milk", "price": 99.99, "sku": "SKU001"})).await;

    let res = create_packet(
        &client,
        &srv,
        json!({"package_name": "Breakfast", "description": "", "content": [{"product_id": m, "quantity": 2}]}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let k = body["packet_id"].as_i64().unwrap();

    let res = client.get(srv.url(&format!("/packets/{k}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["packet"]["package_name"], "Breakfast");
    assert_eq!(body["packet"]["content"], json!([{"product_id": m, "quantity": 2}]));

    // Referenced products cannot be removed.
    let res = client.delete(srv.url(&format!("/products/{m}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client.delete(srv.url(&format!("/packets/{k}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client.get(srv.url(&format!("/packets/{k}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.delete(srv.url(&format!("/products/{m}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn composition_with_missing_product_leaves_no_package() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = create_packet(
        &client,
        &srv,
        json!({"package_name": "Ghost", "content": [{"product_id": 999999, "quantity": 1}]}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/packets/search?query=Ghost&limit=10&offset=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["packets"], json!([]));
}

#[tokio::test]
async fn empty_search_matches_listing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for name in ["Breakfast", "Lunch", "Dinner"] {
        let res = create_packet(&client, &srv, json!({"package_name": name, "description": "box"})).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    for (limit, offset) in [(10, 0), (2, 0), (2, 1), (0, 0), (5, 7)] {
        let search: Value = client
            .get(srv.url(&format!("/packets/search?query=&limit={limit}&offset={offset}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let listed: Value = client
            .get(srv.url(&format!("/packets?limit={limit}&offset={offset}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(search["packets"], listed["packets"], "limit={limit} offset={offset}");
    }
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    create_packet(&client, &srv, json!({"package_name": "Breakfast Box"})).await;
    create_packet(&client, &srv, json!({"package_name": "Other", "description": "not for BREAKFAST"})).await;

    let mut results = Vec::new();
    for q in ["breakfast", "BREAKFAST", "BreakFast"] {
        let body: Value = client
            .get(srv.url(&format!("/packets/search?query={q}&limit=10&offset=0")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        results.push(body["packets"].clone());
    }
    assert_eq!(results[0].as_array().unwrap().len(), 2);
    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], results[2]);
}

#[tokio::test]
async fn negative_pagination_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/packets/search?query=x&limit=-1&offset=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(res).await.contains("limit"));

    for path in [
        "/packets/search?query=x&limit=1&offset=-1",
        "/packets?limit=-5&offset=0",
        "/products?limit=1&offset=-1",
    ] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
    }
}

#[tokio::test]
async fn missing_pagination_parameters_are_named() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/packets/search?query=x&limit=10"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(res).await.contains("offset"));
}

#[tokio::test]
async fn non_numeric_ids_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/products/abc", "/packets/12x", "/products/99999999999999999999"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
    }
    let res = client.delete(srv.url("/products/nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_and_invalid_bodies_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/packets"))
        .header("content-type", "application/json")
        .body("{\"packet\":")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/products"))
        .json(&json!({"product": {"name": "", "price": 1.0}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_products_without_pagination_returns_everything() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for i in 0..3 {
        create_product(&client, &srv, json!({"name": format!("P{i}"), "price": 1.0})).await;
    }

    let body: Value = client
        .get(srv.url("/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["products"].as_array().unwrap().len(), 3);

    let body: Value = client
        .get(srv.url("/products?limit=1&offset=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let page = body["products"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["name"], "P1");
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url("/products/4242"))
        .json(&json!({"product": {"name": "Ghost", "price": 1.0}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn undecodable_path_is_a_json_validation_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/products/%FF", "/packets/%FF"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        assert!(error_message(res).await.starts_with("invalid path"));
    }
}

#[tokio::test]
async fn unsupported_method_is_a_json_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.patch(srv.url("/products/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_message(res).await, "method not allowed");

    let res = client.put(srv.url("/packets/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_message(res).await, "method not allowed");
}

#[tokio::test]
async fn unknown_route_is_a_json_error() {
    let srv = TestServer::spawn().await;

    for url in [srv.url("/nope"), format!("{}/elsewhere", srv.base_url)] {
        let res = reqwest::get(&url).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{url}");
        assert_eq!(error_message(res).await, "route not found");
    }
}
