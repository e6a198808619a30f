// End-to-end purchase, coupon and wallet flows against a real database.
// Run with: DATABASE_URL=... cargo test -- --ignored

use axum::http::StatusCode;
use campus_admin_backend::models::user::UserRole;
use serde_json::{json, Value};

mod common;
use common::{setup_test_app, unique_code, TestApp};

async fn create_course(app: &TestApp, admin: &str, price: f64) -> String {
    let response = app
        .post("/api/courses")
        .bearer(admin)
        .json(&json!({"title": format!("Course {}", unique_code("C")), "price": price}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.json().await;
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_coupon(app: &TestApp, admin: &str, body: Value) -> String {
    let response = app.post("/api/coupons").bearer(admin).json(&body).send().await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.json().await;
    body["data"]["code"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_purchase_with_coupon_applies_discount_and_rewards() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let student = app.create_user(UserRole::User).await;
    let token = app.token_for_user(&student);

    let course_id = create_course(&app, &admin, 1000.0).await;
    let code = create_coupon(
        &app,
        &admin,
        json!({
            "code": unique_code("TEN"),
            "discountType": "percentage",
            "discountValue": 10,
            "maxDiscountAmount": 50,
            "usageLimit": 5
        }),
    )
    .await;

    // Preview does not consume a use
    let preview = app
        .post("/api/coupons/validate")
        .bearer(&token)
        .json(&json!({"code": code, "amount": 1000}))
        .send()
        .await;
    assert_eq!(preview.status(), StatusCode::OK);
    let preview = preview.json().await;
    assert_eq!(preview["data"]["valid"], true);
    assert_eq!(preview["data"]["discount"], 50.0);
    assert_eq!(preview["data"]["finalAmount"], 950.0);

    let response = app
        .post("/api/purchases")
        .bearer(&token)
        .json(&json!({"itemId": course_id, "itemType": "course", "couponCode": code.to_lowercase()}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let receipt = response.json().await;
    let purchase = &receipt["data"]["purchase"];
    assert_eq!(purchase["originalAmount"], 1000.0);
    assert_eq!(purchase["discountAmount"], 50.0);
    assert_eq!(purchase["finalAmount"], 950.0);
    assert_eq!(purchase["cashbackEarned"], 95.0);
    assert_eq!(purchase["pointsEarned"], 95);
    assert_eq!(purchase["paymentStatus"], "Completed");
    assert_eq!(receipt["data"]["rewards"]["totalPoints"], 95);

    // Same item again is refused
    let again = app
        .post("/api/purchases")
        .bearer(&token)
        .json(&json!({"itemId": course_id, "itemType": "course"}))
        .send()
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    assert_eq!(again.json().await["message"], "Item already purchased");

    let rewards = app
        .get("/api/purchases/rewards/me")
        .bearer(&token)
        .send()
        .await
        .json()
        .await;
    assert_eq!(rewards["data"]["totalPoints"], 95);
    assert_eq!(rewards["data"]["totalCashback"], 95.0);

    let mine = app
        .get("/api/purchases/my-purchases")
        .bearer(&token)
        .send()
        .await
        .json()
        .await;
    assert_eq!(mine["pagination"]["totalItems"], 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_points_are_capped_at_500() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let token = app.token_for_user(&app.create_user(UserRole::User).await);

    let course_id = create_course(&app, &admin, 12_000.0).await;
    let response = app
        .post("/api/purchases")
        .bearer(&token)
        .json(&json!({"itemId": course_id, "itemType": "course"}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let receipt = response.json().await;
    assert_eq!(receipt["data"]["purchase"]["cashbackEarned"], 1200.0);
    assert_eq!(receipt["data"]["purchase"]["pointsEarned"], 500);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_exhausted_coupon_is_refused() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let first = app.token_for_user(&app.create_user(UserRole::User).await);
    let second = app.token_for_user(&app.create_user(UserRole::User).await);

    let course_id = create_course(&app, &admin, 200.0).await;
    let code = create_coupon(
        &app,
        &admin,
        json!({
            "code": unique_code("ONCE"),
            "discountType": "fixed",
            "discountValue": 20,
            "usageLimit": 1
        }),
    )
    .await;

    let purchase = |token: String| {
        let body = json!({"itemId": course_id, "itemType": "course", "couponCode": code});
        let app = &app;
        async move { app.post("/api/purchases").bearer(&token).json(&body).send().await }
    };

    assert_eq!(purchase(first).await.status(), StatusCode::CREATED);

    let refused = purchase(second).await;
    assert_eq!(refused.status(), StatusCode::BAD_REQUEST);
    assert_eq!(refused.json().await["message"], "Coupon usage limit exceeded");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_unknown_coupon_code_is_404() {
    let app = setup_test_app().await;
    let token = app.token_for_user(&app.create_user(UserRole::User).await);

    let response = app
        .post("/api/coupons/validate")
        .bearer(&token)
        .json(&json!({"code": unique_code("NOPE"), "amount": 100}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.json().await["message"], "Invalid coupon code");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_wallet_debit_cannot_overdraw() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let owner = app.create_user(UserRole::User).await;
    let owner_token = app.token_for_user(&owner);

    let wallet = app
        .get("/api/wallets/me")
        .bearer(&owner_token)
        .send()
        .await
        .json()
        .await;
    assert_eq!(wallet["data"]["balance"], 0.0);
    assert_eq!(wallet["data"]["currency"], "INR");
    let wallet_id = wallet["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/wallets/{}/transactions", wallet_id);

    let credit = app
        .post(&uri)
        .bearer(&admin)
        .json(&json!({"kind": "credit", "amount": 100}))
        .send()
        .await;
    assert_eq!(credit.status(), StatusCode::CREATED);
    assert_eq!(credit.json().await["data"]["wallet"]["balance"], 100.0);

    let overdraw = app
        .post(&uri)
        .bearer(&admin)
        .json(&json!({"kind": "debit", "amount": 150}))
        .send()
        .await;
    assert_eq!(overdraw.status(), StatusCode::BAD_REQUEST);
    assert_eq!(overdraw.json().await["message"], "Insufficient wallet balance");

    let ledger = app.get(&uri).bearer(&admin).send().await.json().await;
    assert_eq!(ledger["pagination"]["totalItems"], 1);
    assert_eq!(ledger["data"][0]["balanceAfter"], 100.0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_sold_course_cannot_be_deleted() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let token = app.token_for_user(&app.create_user(UserRole::User).await);

    let course_id = create_course(&app, &admin, 300.0).await;
    let bought = app
        .post("/api/purchases")
        .bearer(&token)
        .json(&json!({"itemId": course_id, "itemType": "course"}))
        .send()
        .await;
    assert_eq!(bought.status(), StatusCode::CREATED);

    let uri = format!("/api/courses/{}", course_id);
    let refused = app.delete(&uri).bearer(&admin).send().await;
    assert_eq!(refused.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        refused.json().await["message"],
        "Course has purchases and cannot be deleted"
    );

    assert_eq!(app.get(&uri).send().await.status(), StatusCode::OK);

    // An unsold course still deletes
    let unsold = create_course(&app, &admin, 50.0).await;
    let deleted = app
        .delete(&format!("/api/courses/{}", unsold))
        .bearer(&admin)
        .send()
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
}
