//! Integration tests for the exchange voucher API
//!
//! These drive the full HTTP surface against the in-memory backend:
//! lifecycle, scan verification, bulk operations with the 200/207/4xx
//! outcome mapping, CSV rejection, and pickup-batch token expiry.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;

use exvo_api::{create_router, ApiConfig, AppState};

fn test_server() -> TestServer {
    let config = ApiConfig {
        payload_secret: "integration-test-secret".to_string(),
        ..ApiConfig::default()
    };
    let state = AppState::new(&config);
    TestServer::new(create_router(state)).unwrap()
}

fn admin_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-actor-role"),
        HeaderValue::from_static("admin"),
    )
}

fn voucher_body(serial_no: Option<&str>, name: &str) -> serde_json::Value {
    json!({
        "serial_no": serial_no,
        "amount": 10000,
        "association": "Northside",
        "member_id": format!("M-{name}"),
        "name": name,
        "dob": "1954-03-01",
        "phone": "010-1234-5678",
    })
}

/// Register a voucher and return its serial number
async fn register(server: &TestServer, name: &str) -> String {
    let response = server.post("/vouchers").json(&voucher_body(None, name)).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<serde_json::Value>()["serial_no"]
        .as_str()
        .unwrap()
        .to_string()
}

// ============ Health ============

#[tokio::test]
async fn test_health_check() {
    let server = test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

// ============ Voucher lifecycle ============

#[tokio::test]
async fn test_register_and_get() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;

    let response = server.get(&format!("/vouchers/{serial}")).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "registered");
    assert_eq!(body["amount"], 10000);
    assert_eq!(serial.len(), 11);
}

#[tokio::test]
async fn test_get_voucher_not_found() {
    let server = test_server();

    let response = server.get("/vouchers/99999999999").await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_register_duplicate_serial_conflicts() {
    let server = test_server();
    let body = voucher_body(Some("25080612345"), "Kim Su");
    server.post("/vouchers").json(&body).await.assert_status(StatusCode::CREATED);

    let response = server.post("/vouchers").json(&body).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DUPLICATE_SERIAL");
}

#[tokio::test]
async fn test_issue_verify_use_flow() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;

    let response = server.post(&format!("/vouchers/{serial}/issue")).await;
    response.assert_status_ok();
    let issued: serde_json::Value = response.json();
    let payload = issued["payload"].as_str().unwrap().to_string();
    assert!(payload.starts_with(&format!("VCH:{serial}|TS:")));
    assert!(issued["barcode_checksum"].is_number());
    assert_eq!(issued["voucher"]["status"], "issued");

    // Authentic and redeemable before use
    let response = server
        .post("/vouchers/verify")
        .json(&json!({ "payload": payload }))
        .await;
    response.assert_status_ok();
    let verified: serde_json::Value = response.json();
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["redeemable"], true);

    let response = server
        .post(&format!("/vouchers/{serial}/use"))
        .json(&json!({ "site_code": "S-01" }))
        .await;
    response.assert_status_ok();
    let used: serde_json::Value = response.json();
    assert_eq!(used["status"], "used");
    assert!(used["used_at"].is_string());
    assert_eq!(used["used_at_site"], "S-01");

    // Still authentic after use, but no longer redeemable
    let response = server
        .post("/vouchers/verify")
        .json(&json!({ "payload": payload }))
        .await;
    response.assert_status_ok();
    let verified: serde_json::Value = response.json();
    assert_eq!(verified["redeemable"], false);
    assert_eq!(verified["status"], "used");
}

#[tokio::test]
async fn test_second_use_conflicts_with_status_message() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;
    server.post(&format!("/vouchers/{serial}/issue")).await.assert_status_ok();
    server
        .post(&format!("/vouchers/{serial}/use"))
        .json(&json!({ "site_code": "S-01" }))
        .await
        .assert_status_ok();

    let response = server
        .post(&format!("/vouchers/{serial}/use"))
        .json(&json!({ "site_code": "S-01" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");
    assert!(body["error"].as_str().unwrap().contains("already used"));
}

#[tokio::test]
async fn test_tampered_payload_is_rejected() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;
    let response = server.post(&format!("/vouchers/{serial}/issue")).await;
    let payload = response.json::<serde_json::Value>()["payload"]
        .as_str()
        .unwrap()
        .to_string();

    // Flip the last signature character
    let tail = if payload.ends_with('0') { "1" } else { "0" };
    let forged = format!("{}{tail}", &payload[..payload.len() - 1]);
    let response = server
        .post("/vouchers/verify")
        .json(&json!({ "payload": forged }))
        .await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn test_delete_refuses_used_voucher() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;
    server.post(&format!("/vouchers/{serial}/issue")).await.assert_status_ok();
    server
        .post(&format!("/vouchers/{serial}/use"))
        .json(&json!({ "site_code": "S-01" }))
        .await
        .assert_status_ok();

    let response = server.delete(&format!("/vouchers/{serial}")).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_dispose_requires_admin() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;

    let response = server
        .post(&format!("/vouchers/{serial}/dispose"))
        .json(&json!({ "reason": "damaged" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = admin_header();
    let response = server
        .post(&format!("/vouchers/{serial}/dispose"))
        .add_header(name, value)
        .json(&json!({ "reason": "damaged" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "disposed");
}

// ============ Bulk operations ============

#[tokio::test]
async fn test_bulk_issue_csv_creates_distinct_serials() {
    let server = test_server();
    let csv = "serial_no,amount,association,member_id,name,dob\n\
               ,10000,Northside,M-001,\"Kim, Su\",1954-03-01\n\
               ,20000,Northside,M-002,Lee Ha,1960-12-24\n\
               ,30000,Northside,M-003,Park Jin,1950-07-07\n";

    let response = server.post("/bulk/issue/csv").text(csv).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["success"], 3);
    assert_eq!(body["summary"]["error"], 0);

    let results = body["results"].as_array().unwrap();
    let serials: std::collections::HashSet<&str> = results
        .iter()
        .map(|r| r["reference"].as_str().unwrap())
        .collect();
    assert_eq!(serials.len(), 3);

    // The created vouchers are live and issued
    let response = server
        .get(&format!("/vouchers/{}", results[0]["reference"].as_str().unwrap()))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "issued");
}

#[tokio::test]
async fn test_bulk_issue_csv_rejects_whole_file_on_bad_row() {
    let server = test_server();
    let csv = "serial_no,amount,association,member_id,name,dob\n\
               25080611111,10000,Northside,M-001,Kim Su,1954-03-01\n\
               25080622222,20000,Northside,M-002,Lee Ha,1960-12-24\n\
               25080633333,30000,Northside,M-003,Park Jin,1950-07-07\n\
               25080644444,,Northside,M-004,Choi Min,1948-01-15\n";

    let response = server.post("/bulk/issue/csv").text(csv).await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_FILE");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().contains("row 4"));
    assert!(errors[0].as_str().unwrap().contains("amount"));

    // No rows inserted, including the valid ones
    server.get("/vouchers/25080611111").await.assert_status_not_found();
}

#[tokio::test]
async fn test_bulk_use_partial_returns_multi_status() {
    let server = test_server();
    let good = register(&server, "Good").await;
    server.post(&format!("/vouchers/{good}/issue")).await.assert_status_ok();
    let pending = register(&server, "Pending").await;

    let response = server
        .post("/bulk/use")
        .json(&json!({
            "items": [
                { "serial_no": good, "site_code": "S-01" },
                { "serial_no": pending, "site_code": "S-01" },
            ]
        }))
        .await;
    response.assert_status(StatusCode::MULTI_STATUS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["summary"]["total"], 2);
    assert_eq!(body["summary"]["success"], 1);
    assert_eq!(body["summary"]["error"], 1);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[1]["success"], false);
    assert!(results[1]["message"]
        .as_str()
        .unwrap()
        .contains("not yet issued"));
}

#[tokio::test]
async fn test_bulk_use_all_conflicts_returns_conflict() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;

    let response = server
        .post("/bulk/use")
        .json(&json!({
            "items": [ { "serial_no": serial, "site_code": "S-01" } ]
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["summary"]["error"], 1);
}

#[tokio::test]
async fn test_bulk_use_all_not_found_returns_bad_request() {
    let server = test_server();

    let response = server
        .post("/bulk/use")
        .json(&json!({
            "items": [
                { "serial_no": "99999999991", "site_code": "S-01" },
                { "serial_no": "99999999992", "site_code": "S-01" },
            ]
        }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_bulk_issue_json_promotes_registered() {
    let server = test_server();
    let a = register(&server, "A").await;
    let b = register(&server, "B").await;

    let response = server
        .post("/bulk/issue")
        .json(&json!({ "items": [ { "serial_no": a }, { "serial_no": b } ] }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["summary"]["success"], 2);
}

#[tokio::test]
async fn test_bulk_recall_is_admin_only() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;
    server.post(&format!("/vouchers/{serial}/issue")).await.assert_status_ok();

    let request = json!({ "items": [ { "serial_no": serial, "reason": "event cancelled" } ] });

    let response = server.post("/bulk/recall").json(&request).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = admin_header();
    let response = server
        .post("/bulk/recall")
        .add_header(name, value)
        .json(&request)
        .await;
    response.assert_status_ok();

    let response = server.get(&format!("/vouchers/{serial}")).await;
    assert_eq!(response.json::<serde_json::Value>()["status"], "recalled");
}

// ============ Pickup batches ============

#[tokio::test]
async fn test_batch_create_and_access() {
    let server = test_server();

    let response = server
        .post("/batches")
        .json(&json!({
            "batch_name": "august-pickup",
            "expires_in_hours": 24,
            "items": [
                voucher_body(None, "A"),
                voucher_body(None, "B"),
            ]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["batch"]["status"], "completed");
    assert_eq!(body["batch"]["generated_count"], 2);
    let url = body["url"].as_str().unwrap();
    let token = url.rsplit('/').next().unwrap();

    let response = server.get(&format!("/batches/by-token/{token}")).await;
    response.assert_status_ok();
    let access: serde_json::Value = response.json();
    assert_eq!(access["batch"]["download_count"], 1);
    assert_eq!(access["vouchers"].as_array().unwrap().len(), 2);
    assert_eq!(access["vouchers"][0]["status"], "issued");
}

#[tokio::test]
async fn test_batch_access_after_expiry_is_denied() {
    let server = test_server();

    let response = server
        .post("/batches")
        .json(&json!({
            "batch_name": "already-expired",
            "expires_in_hours": 0,
            "items": [ voucher_body(None, "A") ]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let url = response.json::<serde_json::Value>()["url"]
        .as_str()
        .unwrap()
        .to_string();
    let token = url.rsplit('/').next().unwrap().to_string();

    let response = server.get(&format!("/batches/by-token/{token}")).await;
    response.assert_status(StatusCode::GONE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "LINK_EXPIRED");

    // Stays denied
    let response = server.get(&format!("/batches/by-token/{token}")).await;
    response.assert_status(StatusCode::GONE);
}

#[tokio::test]
async fn test_batch_access_unknown_token() {
    let server = test_server();

    let response = server
        .get("/batches/by-token/AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_voucher_link_endpoint() {
    let server = test_server();
    let serial = register(&server, "Kim Su").await;
    server.post(&format!("/vouchers/{serial}/issue")).await.assert_status_ok();

    let response = server
        .post(&format!("/vouchers/{serial}/link"))
        .json(&json!({ "expires_in_hours": 24 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["serial_no"], serial.as_str());
    assert!(body["url"].as_str().unwrap().contains("/m/"));
    assert!(body["expires_at"].is_string());
}
