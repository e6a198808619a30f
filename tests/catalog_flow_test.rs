// Account, catalog and CMS flows against a real database.
// Run with: DATABASE_URL=... cargo test -- --ignored

use axum::http::StatusCode;
use campus_admin_backend::models::user::UserRole;
use serde_json::json;
use uuid::Uuid;

mod common;
use common::{setup_test_app, unique_code, unique_email, TEST_PASSWORD};

/// Three letters that are unlikely to collide with rows left by earlier runs
fn country_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(3)
        .map(|b| (b'A' + b % 26) as char)
        .collect()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_register_login_and_profile() {
    let app = setup_test_app().await;
    let email = unique_email("asha");

    let response = app
        .post("/api/auth/register")
        .json(&json!({"name": "Asha Verma", "email": email, "password": TEST_PASSWORD}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.json().await;
    assert_eq!(body["data"]["user"]["role"], "user");
    assert_eq!(body["data"]["user"]["emailVerified"], false);

    let duplicate = app
        .post("/api/auth/register")
        .json(&json!({"name": "Asha Again", "email": email, "password": TEST_PASSWORD}))
        .send()
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json().await["message"], "User already exists");

    let wrong = app
        .post("/api/auth/login")
        .json(&json!({"email": email, "password": "wrong-password1"}))
        .send()
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json().await["message"], "Invalid email or password");

    let login = app
        .post("/api/auth/login")
        .json(&json!({"email": email.to_uppercase(), "password": TEST_PASSWORD}))
        .send()
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    let token = login.json().await["data"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    let verified = app
        .post("/api/auth/verify-otp")
        .json(&json!({"email": email, "otp": "123456"}))
        .send()
        .await;
    assert_eq!(verified.status(), StatusCode::OK);
    assert_eq!(verified.json().await["data"]["user"]["emailVerified"], true);

    let updated = app
        .put("/api/auth/profile")
        .bearer(&token)
        .json(&json!({"name": "Asha V."}))
        .send()
        .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let me = app.get("/api/auth/me").bearer(&token).send().await.json().await;
    assert_eq!(me["data"]["name"], "Asha V.");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_admin_cannot_change_own_role() {
    let app = setup_test_app().await;
    let admin = app.create_user(UserRole::Admin).await;
    let token = app.token_for_user(&admin);

    let response = app
        .put(&format!("/api/auth/users/{}/role", admin.id))
        .bearer(&token)
        .json(&json!({"role": "user"}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json().await["message"], "You cannot change your own role");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_role_and_status_changes_apply_to_existing_tokens() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let other = app.create_user(UserRole::Admin).await;
    let other_token = app.token_for_user(&other);

    assert_eq!(
        app.get("/api/auth/users").bearer(&other_token).send().await.status(),
        StatusCode::OK
    );

    let demoted = app
        .put(&format!("/api/auth/users/{}/role", other.id))
        .bearer(&admin)
        .json(&json!({"role": "user"}))
        .send()
        .await;
    assert_eq!(demoted.status(), StatusCode::OK);

    let refused = app.get("/api/auth/users").bearer(&other_token).send().await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
    assert_eq!(refused.json().await["message"], "Not authorized as an admin");

    let status_uri = format!("/api/auth/users/{}/status", other.id);
    let deactivated = app
        .put(&status_uri)
        .bearer(&admin)
        .json(&json!({"isActive": false}))
        .send()
        .await;
    assert_eq!(deactivated.status(), StatusCode::OK);
    assert_eq!(deactivated.json().await["data"]["isActive"], false);

    let blocked = app.get("/api/auth/me").bearer(&other_token).send().await;
    assert_eq!(blocked.status(), StatusCode::FORBIDDEN);
    assert_eq!(blocked.json().await["message"], "Account is deactivated");

    let login = app
        .post("/api/auth/login")
        .json(&json!({"email": other.email, "password": TEST_PASSWORD}))
        .send()
        .await;
    assert_eq!(login.status(), StatusCode::FORBIDDEN);

    let reactivated = app
        .put(&status_uri)
        .bearer(&admin)
        .json(&json!({"isActive": true}))
        .send()
        .await;
    assert_eq!(reactivated.status(), StatusCode::OK);
    assert_eq!(
        app.get("/api/auth/me").bearer(&other_token).send().await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_admin_cannot_deactivate_self() {
    let app = setup_test_app().await;
    let admin = app.create_user(UserRole::Admin).await;
    let token = app.token_for_user(&admin);

    let response = app
        .put(&format!("/api/auth/users/{}/status", admin.id))
        .bearer(&token)
        .json(&json!({"isActive": false}))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_country_crud_and_duplicate_code() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let code = country_code();

    let created = app
        .post("/api/countries")
        .bearer(&admin)
        .json(&json!({"name": format!("Country {}", unique_code("N")), "code": code.to_lowercase()}))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = created.json().await;
    assert_eq!(created["data"]["code"], code);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let duplicate = app
        .post("/api/countries")
        .bearer(&admin)
        .json(&json!({"name": format!("Country {}", unique_code("N")), "code": code}))
        .send()
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json().await["message"], "code already exists");

    // Reads are public
    let fetched = app.get(&format!("/api/countries/{}", id)).send().await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let deleted = app
        .delete(&format!("/api/countries/{}", id))
        .bearer(&admin)
        .send()
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let gone = app.get(&format!("/api/countries/{}", id)).send().await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(gone.json().await["message"], "Country not found");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_university_slug_and_listing() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let marker = unique_code("U");

    let created = app
        .post("/api/universities")
        .bearer(&admin)
        .json(&json!({"name": format!("University of  Testing {}!", marker)}))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = created.json().await;
    assert_eq!(
        created["data"]["slug"],
        format!("university-of-testing-{}", marker.to_lowercase())
    );

    let listed = app
        .get(&format!("/api/universities?search={}&limit=500", marker))
        .send()
        .await
        .json()
        .await;
    assert_eq!(listed["pagination"]["totalItems"], 1);
    assert_eq!(listed["pagination"]["itemsPerPage"], 100);
    assert_eq!(listed["pagination"]["currentPage"], 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_applications_are_scoped_to_their_owner() {
    let app = setup_test_app().await;
    let owner = app.token_for_user(&app.create_user(UserRole::User).await);
    let stranger = app.token_for_user(&app.create_user(UserRole::User).await);
    let counsellor = app.token_for_user(&app.create_user(UserRole::Counsellor).await);

    let created = app
        .post("/api/applications")
        .bearer(&owner)
        .json(&json!({"studentName": "Ravi Kumar", "passportNo": unique_code("P")}))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = created.json().await;
    assert_eq!(created["data"]["primaryStatus"], "Pending");
    let uri = format!("/api/applications/{}", created["data"]["id"].as_str().unwrap());

    assert_eq!(
        app.get(&uri).bearer(&stranger).send().await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get(&uri).bearer(&counsellor).send().await.status(),
        StatusCode::OK
    );

    let updated = app
        .put(&uri)
        .bearer(&counsellor)
        .json(&json!({"primaryStatus": "Offer Received"}))
        .send()
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(updated.json().await["data"]["primaryStatus"], "Offer Received");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_public_page_requires_published_outside_development() {
    let app = setup_test_app().await;
    let admin = app.token_for_user(&app.create_user(UserRole::Admin).await);
    let name = format!("About {}", unique_code("PG"));

    let created = app
        .post("/api/page-information")
        .bearer(&admin)
        .json(&json!({
            "pageName": name,
            "title": "About us",
            "status": "Draft",
            "sections": [
                {"type": "text", "order": 2, "data": {"body": "second"}},
                {"type": "hero", "order": 1, "data": {"heading": "first"}}
            ]
        }))
        .send()
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = created.json().await;
    assert_eq!(created["data"]["sections"][0]["type"], "hero");
    let slug = created["data"]["slug"].as_str().unwrap().to_string();
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let hidden = app
        .get(&format!("/api/page-information/public/{}", slug))
        .send()
        .await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let published = app
        .put(&format!("/api/page-information/{}", id))
        .bearer(&admin)
        .json(&json!({"status": "Published"}))
        .send()
        .await;
    assert_eq!(published.status(), StatusCode::OK);

    let visible = app
        .get(&format!("/api/page-information/public/{}", slug))
        .send()
        .await;
    assert_eq!(visible.status(), StatusCode::OK);
}
