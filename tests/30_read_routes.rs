mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::*;
use preferences_api::types::RightsRecord;

#[tokio::test]
async fn unknown_profile_reads_as_defaults() {
    let h = Harness::new();

    let (status, body) = h.get("/getPreferences/0x99").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["result"], serde_json::to_value(RightsRecord::new("0x99")).unwrap());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn reads_reflect_updates() {
    let h = Harness::new();

    h.post(
        "/updatePreferences",
        Some(&token_for(OWNER)),
        &json!({ "id": PROFILE, "isPride": true }),
    )
    .await;

    let (_, body) = h.get(&format!("/getPreferences/{}", PROFILE)).await;
    assert_eq!(body["result"]["is_pride"], json!(true));
}

#[tokio::test]
async fn admin_updates_refresh_the_verified_list() {
    let h = Harness::new();
    let mut verified = RightsRecord::new(PROFILE);
    verified.is_verified = true;
    h.seed(verified).await;

    let (_, body) = h.get("/getVerified").await;
    assert_eq!(body, json!({ "success": true, "result": [PROFILE] }));

    h.post(
        "/updatePreferences",
        Some(&token_for(ADMIN)),
        &json!({ "id": OTHER_PROFILE, "isVerified": true, "updateByAdmin": true }),
    )
    .await;

    let (_, body) = h.get("/getVerified").await;
    assert_eq!(body["result"], json!([PROFILE, OTHER_PROFILE]));
}

#[tokio::test]
async fn self_updates_leave_the_verified_list_cached() {
    let h = Harness::new();

    let (_, body) = h.get("/getVerified").await;
    assert_eq!(body["result"], json!([]));

    // Seeded behind the cache's back; only an invalidation would expose it
    let mut verified = RightsRecord::new(PROFILE);
    verified.is_verified = true;
    h.seed(verified).await;

    h.post(
        "/updatePreferences",
        Some(&token_for(OWNER)),
        &json!({ "id": PROFILE, "isPride": true }),
    )
    .await;

    let (_, body) = h.get("/getVerified").await;
    assert_eq!(body["result"], json!([]));
    assert_eq!(h.invalidations(), 0);
}

#[tokio::test]
async fn store_failures_surface_on_reads() {
    let h = Harness::with(Options {
        broken_store: true,
        ..Options::default()
    });

    let (status, body) = h.get("/getVerified").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));

    let (status, _) = h.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_and_root_respond() {
    let h = Harness::new();

    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], json!("ok"));

    let (status, body) = h.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["name"], json!("Preferences API"));
}
