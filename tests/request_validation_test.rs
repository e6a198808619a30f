// Request validation that must reject bad input before any database work.
// The router runs over an unreachable pool, so a 400 here proves nothing was
// written.

use axum::http::StatusCode;
use campus_admin_backend::models::user::UserRole;
use serde_json::json;

mod common;
use common::{setup_router_only, TestResponse};

async fn expect_400(response: TestResponse, fragment: &str) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.json().await;
    assert_eq!(body["success"], false);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(
        message.contains(fragment),
        "expected '{}' in '{}'",
        fragment,
        message
    );
}

#[tokio::test]
async fn test_country_code_longer_than_three_is_rejected() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/countries")
        .bearer(&token)
        .json(&json!({"name": "Atlantis", "code": "ATLA"}))
        .send()
        .await;

    expect_400(response, "Country code must be 2-3 characters").await;
}

#[tokio::test]
async fn test_country_code_is_trimmed_before_length_check() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/countries")
        .bearer(&token)
        .json(&json!({"name": "Atlantis", "code": " A  "}))
        .send()
        .await;
    expect_400(response, "Country code must be 2-3 characters").await;

    let response = app
        .put("/api/countries/8d3f7c3e-2f0a-4b7e-9a55-0f6a3c1d2b11")
        .bearer(&token)
        .json(&json!({"name": "    "}))
        .send()
        .await;
    expect_400(response, "Country name cannot be empty").await;
}

#[tokio::test]
async fn test_register_rejects_bad_email_and_weak_password() {
    let app = setup_router_only(&[]);

    let response = app
        .post("/api/auth/register")
        .json(&json!({"name": "Asha", "email": "not-an-email", "password": "s3cure1"}))
        .send()
        .await;
    expect_400(response, "Please provide a valid email").await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({"name": "Asha", "email": "asha@example.com", "password": "onlyletters"}))
        .send()
        .await;
    expect_400(
        response,
        "Password must contain at least one letter and one number",
    )
    .await;
}

#[tokio::test]
async fn test_otp_needs_an_identifier() {
    let app = setup_router_only(&[]);

    let response = app.post("/api/auth/send-otp").json(&json!({})).send().await;
    expect_400(response, "Please provide an email or phone number").await;
}

#[tokio::test]
async fn test_wrong_otp_is_rejected() {
    let app = setup_router_only(&[("STATIC_OTP_CODE", "424242")]);

    let response = app
        .post("/api/auth/verify-otp")
        .json(&json!({"email": "asha@example.com", "otp": "123456"}))
        .send()
        .await;
    expect_400(response, "Invalid OTP").await;
}

#[tokio::test]
async fn test_percentage_coupon_over_100_is_rejected() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/coupons")
        .bearer(&token)
        .json(&json!({
            "code": "HALFOFF",
            "discountType": "percentage",
            "discountValue": 150
        }))
        .send()
        .await;
    expect_400(response, "Percentage discount cannot exceed 100").await;
}

#[tokio::test]
async fn test_coupon_dates_must_be_ordered() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/coupons")
        .bearer(&token)
        .json(&json!({
            "code": "WINTER",
            "discountType": "fixed",
            "discountValue": 100,
            "validFrom": "2025-02-01T00:00:00Z",
            "validTo": "2025-01-01T00:00:00Z"
        }))
        .send()
        .await;
    expect_400(response, "Valid to date must be after valid from date").await;
}

#[tokio::test]
async fn test_coupon_code_charset() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/coupons")
        .bearer(&token)
        .json(&json!({
            "code": "SAVE 10%",
            "discountType": "fixed",
            "discountValue": 10
        }))
        .send()
        .await;
    expect_400(response, "Coupon code may only contain").await;
}

#[tokio::test]
async fn test_validate_coupon_rejects_negative_amount() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::User);

    let response = app
        .post("/api/coupons/validate")
        .bearer(&token)
        .json(&json!({"code": "SAVE10", "amount": -5}))
        .send()
        .await;
    expect_400(response, "Amount cannot be negative").await;
}

#[tokio::test]
async fn test_purchase_rejects_blank_coupon_code() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::User);

    let response = app
        .post("/api/purchases")
        .bearer(&token)
        .json(&json!({
            "itemId": "7d6a4c52-1a4f-4f7e-9a0f-3c1f0c1d2e3f",
            "itemType": "course",
            "couponCode": "   "
        }))
        .send()
        .await;
    expect_400(response, "Coupon code must be 1-50 characters").await;
}

#[tokio::test]
async fn test_university_name_without_slug_characters() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/universities")
        .bearer(&token)
        .json(&json!({"name": "!!!"}))
        .send()
        .await;
    expect_400(response, "Slug must contain at least one letter or digit").await;
}

#[tokio::test]
async fn test_wallet_transaction_amount_must_be_positive() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .post("/api/wallets/7d6a4c52-1a4f-4f7e-9a0f-3c1f0c1d2e3f/transactions")
        .bearer(&token)
        .json(&json!({"kind": "debit", "amount": 0}))
        .send()
        .await;
    expect_400(response, "Amount must be greater than zero").await;
}

#[tokio::test]
async fn test_invalid_list_filter_is_rejected() {
    let app = setup_router_only(&[]);
    let token = app.token_for(UserRole::Admin);

    let response = app
        .get("/api/coupons?status=Sometimes")
        .bearer(&token)
        .send()
        .await;
    expect_400(response, "Invalid CouponStatus 'Sometimes'").await;
}
