// API documentation: the OpenAPI document is derived from the handler and
// model annotations, and a Swagger UI page renders it.
pub mod swagger_ui;

use axum::{
    extract::{OriginalUri, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        server::ServerBuilder,
        OpenApi as OpenApiDocument,
    },
    Modify, OpenApi,
};

use crate::{
    app::AppState,
    app_config::AppConfig,
    handlers::{
        applications, auth, countries, coupons, courses, health, page_information, programs,
        purchases, support, universities, wallets,
    },
    models::{
        application::{
            Application, ApplicationView, CreateApplicationRequest, PrimaryStatus,
            UpdateApplicationRequest,
        },
        catalog::{
            Country, CountrySummary, Course, CourseSummary, CourseView, CreateCountryRequest,
            CreateCourseRequest, CreateProgramRequest, CreateUniversityRequest, Program,
            ProgramSummary, University, UniversitySummary, UniversityView, UpdateCountryRequest,
            UpdateCourseRequest, UpdateProgramRequest, UpdateUniversityRequest,
        },
        coupon::{
            ApplicableTo, Coupon, CouponStatus, CouponValidation, CreateCouponRequest,
            DiscountType, UpdateCouponRequest, ValidateCouponRequest,
        },
        page_information::{
            CreatePageInformationRequest, PageInformation, PageSection, PageStatus,
            UpdatePageInformationRequest,
        },
        pagination::Pagination,
        purchase::{
            CreatePurchaseRequest, ItemType, PaymentStatus, Purchase, PurchaseReceipt,
            PurchaseView, Reward, RewardBalance,
        },
        support_ticket::{
            CreateSupportTicketRequest, SupportTicket, SupportTicketView, TicketPriority,
            TicketStatus, UpdateSupportTicketRequest,
        },
        user::{
            AuthPayload, LoginRequest, RegisterRequest, SendOtpRequest, UpdateProfileRequest,
            UpdateRoleRequest, UpdateStatusRequest, UserResponse, UserRole, UserSummary,
            VerifyOtpRequest,
        },
        wallet::{
            CreateWalletRequest, TransactionKind, UpdateWalletRequest, Wallet, WalletStatus,
            WalletTransaction, WalletTransactionReceipt, WalletTransactionRequest, WalletView,
        },
        RecordStatus,
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Admin API",
        description = "Back-office API for the education catalog, student applications, coupons, purchases and wallets",
        version = "1.0.0"
    ),
    paths(
        auth::register,
        auth::login,
        auth::send_otp,
        auth::verify_otp,
        auth::verify_email,
        auth::me,
        auth::update_profile,
        auth::list_users,
        auth::update_role,
        auth::update_status,
        countries::list_countries,
        countries::get_country,
        countries::create_country,
        countries::update_country,
        countries::delete_country,
        universities::list_universities,
        universities::get_university,
        universities::create_university,
        universities::update_university,
        universities::delete_university,
        courses::list_courses,
        courses::get_course,
        courses::create_course,
        courses::update_course,
        courses::delete_course,
        programs::list_programs,
        programs::get_program,
        programs::create_program,
        programs::update_program,
        programs::delete_program,
        applications::list_applications,
        applications::get_application,
        applications::create_application,
        applications::update_application,
        applications::delete_application,
        coupons::list_coupons,
        coupons::get_coupon,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        coupons::validate_coupon,
        purchases::create_purchase,
        purchases::my_purchases,
        purchases::list_purchases,
        purchases::get_purchase,
        purchases::my_rewards,
        page_information::list_pages,
        page_information::get_page,
        page_information::get_public_page,
        page_information::create_page,
        page_information::update_page,
        page_information::delete_page,
        support::create_ticket,
        support::list_tickets,
        support::get_ticket,
        support::update_ticket,
        support::delete_ticket,
        wallets::my_wallet,
        wallets::list_wallets,
        wallets::get_wallet,
        wallets::create_wallet,
        wallets::update_wallet,
        wallets::delete_wallet,
        wallets::create_transaction,
        wallets::list_transactions,
        health::health_check,
    ),
    components(schemas(
        Pagination,
        RecordStatus,
        UserRole,
        RegisterRequest,
        LoginRequest,
        SendOtpRequest,
        VerifyOtpRequest,
        UpdateProfileRequest,
        UpdateRoleRequest,
        UpdateStatusRequest,
        UserResponse,
        UserSummary,
        AuthPayload,
        Country,
        CountrySummary,
        CreateCountryRequest,
        UpdateCountryRequest,
        University,
        UniversitySummary,
        UniversityView,
        CreateUniversityRequest,
        UpdateUniversityRequest,
        Course,
        CourseSummary,
        CourseView,
        CreateCourseRequest,
        UpdateCourseRequest,
        Program,
        ProgramSummary,
        CreateProgramRequest,
        UpdateProgramRequest,
        PrimaryStatus,
        Application,
        ApplicationView,
        CreateApplicationRequest,
        UpdateApplicationRequest,
        DiscountType,
        ApplicableTo,
        CouponStatus,
        Coupon,
        CreateCouponRequest,
        UpdateCouponRequest,
        ValidateCouponRequest,
        CouponValidation,
        ItemType,
        PaymentStatus,
        Purchase,
        Reward,
        RewardBalance,
        CreatePurchaseRequest,
        PurchaseReceipt,
        PurchaseView,
        PageStatus,
        PageSection,
        PageInformation,
        CreatePageInformationRequest,
        UpdatePageInformationRequest,
        TicketPriority,
        TicketStatus,
        SupportTicket,
        SupportTicketView,
        CreateSupportTicketRequest,
        UpdateSupportTicketRequest,
        WalletStatus,
        TransactionKind,
        Wallet,
        WalletView,
        WalletTransaction,
        CreateWalletRequest,
        UpdateWalletRequest,
        WalletTransactionRequest,
        WalletTransactionReceipt,
        health::HealthReport,
        health::ComponentHealth,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login, OTP and user administration"),
        (name = "Countries", description = "Country catalog"),
        (name = "Universities", description = "University catalog"),
        (name = "Courses", description = "Course catalog"),
        (name = "Programs", description = "Program catalog"),
        (name = "Applications", description = "Student applications"),
        (name = "Coupons", description = "Discount coupons"),
        (name = "Purchases", description = "Course and program purchases with rewards"),
        (name = "Page Information", description = "CMS pages"),
        (name = "Support", description = "Support tickets"),
        (name = "Wallets", description = "User wallets and ledger"),
        (name = "Health", description = "Service health checks")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut OpenApiDocument) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token returned by login, register or verify-otp"))
                        .build(),
                ),
            );
        }
    }
}

/// Build the OpenAPI document with the server list for the running environment
pub fn build_openapi_spec(config: &AppConfig) -> OpenApiDocument {
    let mut spec = ApiDoc::openapi();
    spec.servers = Some(vec![ServerBuilder::new()
        .url("/api")
        .description(Some(format!("Current server ({})", config.environment)))
        .build()]);
    spec
}

/// Serve the OpenAPI document at /api/docs/openapi.json
pub async fn serve_openapi_spec(State(state): State<AppState>) -> impl IntoResponse {
    Json(build_openapi_spec(state.config.as_ref()))
}

/// Redirect /docs to /docs/ for proper relative path resolution
pub async fn redirect_to_docs(original_uri: OriginalUri) -> impl IntoResponse {
    let mut path = original_uri.0.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, path)])
}

pub use swagger_ui::serve_swagger_ui;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_resource() {
        let spec = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/auth/users/{id}/status",
            "/countries/{id}",
            "/universities",
            "/courses",
            "/programs",
            "/applications/{id}",
            "/coupons/validate",
            "/purchases/my-purchases",
            "/page-information/public/{slug}",
            "/support",
            "/wallets/{id}/transactions",
            "/health",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearerAuth"));
    }
}
