// HTTP handlers and the route table. Each resource builds its own router;
// guards are attached per route group with `route_layer` so unmatched paths
// still fall through to the 404 fallback instead of a 401.

pub mod applications;
pub mod auth;
pub mod countries;
pub mod coupons;
pub mod courses;
pub mod docs;
pub mod health;
pub mod page_information;
pub mod programs;
pub mod purchases;
pub mod support;
pub mod universities;
pub mod wallets;

use axum::{
    http::Uri,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    app::AppState,
    middleware::{admin, protect, staff},
    utils::ApiError,
};

/// Any signed-in user
fn signed_in(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(from_fn_with_state(state.clone(), protect))
}

fn admin_only(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    signed_in(router.route_layer(from_fn(admin)), state)
}

fn staff_only(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    signed_in(router.route_layer(from_fn(staff)), state)
}

// Authentication and user administration
pub fn auth_routes(state: &AppState) -> Router<AppState> {
    let account = Router::new()
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile));

    let users = Router::new()
        .route("/users", get(auth::list_users))
        .route("/users/{id}/role", put(auth::update_role))
        .route("/users/{id}/status", put(auth::update_status));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/send-otp", post(auth::send_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/verify-email/{token}", get(auth::verify_email))
        .merge(signed_in(account, state))
        .merge(admin_only(users, state))
}

pub fn country_routes(state: &AppState) -> Router<AppState> {
    let writes = Router::new()
        .route("/", post(countries::create_country))
        .route(
            "/{id}",
            put(countries::update_country).delete(countries::delete_country),
        );

    Router::new()
        .route("/", get(countries::list_countries))
        .route("/{id}", get(countries::get_country))
        .merge(admin_only(writes, state))
}

pub fn university_routes(state: &AppState) -> Router<AppState> {
    let writes = Router::new()
        .route("/", post(universities::create_university))
        .route(
            "/{id}",
            put(universities::update_university).delete(universities::delete_university),
        );

    Router::new()
        .route("/", get(universities::list_universities))
        .route("/{id}", get(universities::get_university))
        .merge(admin_only(writes, state))
}

pub fn course_routes(state: &AppState) -> Router<AppState> {
    let writes = Router::new()
        .route("/", post(courses::create_course))
        .route(
            "/{id}",
            put(courses::update_course).delete(courses::delete_course),
        );

    Router::new()
        .route("/", get(courses::list_courses))
        .route("/{id}", get(courses::get_course))
        .merge(admin_only(writes, state))
}

pub fn program_routes(state: &AppState) -> Router<AppState> {
    let writes = Router::new()
        .route("/", post(programs::create_program))
        .route(
            "/{id}",
            put(programs::update_program).delete(programs::delete_program),
        );

    Router::new()
        .route("/", get(programs::list_programs))
        .route("/{id}", get(programs::get_program))
        .merge(admin_only(writes, state))
}

pub fn application_routes(state: &AppState) -> Router<AppState> {
    let owned = Router::new()
        .route(
            "/",
            get(applications::list_applications).post(applications::create_application),
        )
        .route(
            "/{id}",
            get(applications::get_application).put(applications::update_application),
        );

    let removal = Router::new().route("/{id}", delete(applications::delete_application));

    signed_in(owned, state).merge(admin_only(removal, state))
}

pub fn coupon_routes(state: &AppState) -> Router<AppState> {
    let manage = Router::new()
        .route("/", get(coupons::list_coupons).post(coupons::create_coupon))
        .route(
            "/{id}",
            get(coupons::get_coupon)
                .put(coupons::update_coupon)
                .delete(coupons::delete_coupon),
        );

    let redeem = Router::new().route("/validate", post(coupons::validate_coupon));

    signed_in(redeem, state).merge(admin_only(manage, state))
}

pub fn purchase_routes(state: &AppState) -> Router<AppState> {
    let buyer = Router::new()
        .route("/", post(purchases::create_purchase))
        .route("/my-purchases", get(purchases::my_purchases))
        .route("/rewards/me", get(purchases::my_rewards))
        .route("/{id}", get(purchases::get_purchase));

    let ledger = Router::new().route("/", get(purchases::list_purchases));

    signed_in(buyer, state).merge(admin_only(ledger, state))
}

pub fn page_information_routes(state: &AppState) -> Router<AppState> {
    let manage = Router::new()
        .route(
            "/",
            get(page_information::list_pages).post(page_information::create_page),
        )
        .route(
            "/{id}",
            get(page_information::get_page)
                .put(page_information::update_page)
                .delete(page_information::delete_page),
        );

    Router::new()
        .route("/public/{slug}", get(page_information::get_public_page))
        .merge(admin_only(manage, state))
}

pub fn support_routes(state: &AppState) -> Router<AppState> {
    let tickets = Router::new()
        .route("/", get(support::list_tickets).post(support::create_ticket))
        .route("/{id}", get(support::get_ticket));

    let triage = Router::new().route("/{id}", put(support::update_ticket));
    let removal = Router::new().route("/{id}", delete(support::delete_ticket));

    signed_in(tickets, state)
        .merge(staff_only(triage, state))
        .merge(admin_only(removal, state))
}

pub fn wallet_routes(state: &AppState) -> Router<AppState> {
    let own = Router::new().route("/me", get(wallets::my_wallet));

    let manage = Router::new()
        .route("/", get(wallets::list_wallets).post(wallets::create_wallet))
        .route(
            "/{id}",
            get(wallets::get_wallet)
                .put(wallets::update_wallet)
                .delete(wallets::delete_wallet),
        )
        .route(
            "/{id}/transactions",
            get(wallets::list_transactions).post(wallets::create_transaction),
        );

    signed_in(own, state).merge(admin_only(manage, state))
}

/// Everything served under /api
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes(state))
        .nest("/countries", country_routes(state))
        .nest("/universities", university_routes(state))
        .nest("/courses", course_routes(state))
        .nest("/programs", program_routes(state))
        .nest("/applications", application_routes(state))
        .nest("/coupons", coupon_routes(state))
        .nest("/purchases", purchase_routes(state))
        .nest("/page-information", page_information_routes(state))
        .nest("/support", support_routes(state))
        .nest("/wallets", wallet_routes(state));

    if state.config.features.enable_api_docs {
        router = router
            .route("/docs", get(docs::redirect_to_docs))
            .route("/docs/", get(docs::serve_swagger_ui))
            .route("/docs/openapi.json", get(docs::serve_openapi_spec));
    }

    router
}

pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Not found - {}", uri.path()))
}
