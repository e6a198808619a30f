// Country handlers. Reads are public, writes need an admin token.

use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        catalog::{
            Country, CountryFilter, CountryQuery, CreateCountryRequest, UpdateCountryRequest,
        },
        pagination::{PageQuery, PageRequest},
        parse_filter,
        response::ApiResponse,
    },
    utils::{trim_optional_field, ApiError, ApiResult, AuditAction, AuditLogger, OrNotFound},
};

/// List countries
/// GET /api/countries
#[utoipa::path(
    get,
    path = "/countries",
    tag = "Countries",
    operation_id = "listCountries",
    params(PageQuery, CountryFilter),
    responses(
        (status = 200, description = "Paginated countries", body = [Country]),
        (status = 400, description = "Invalid filter value")
    )
)]
pub async fn list_countries(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CountryFilter>,
) -> ApiResult<impl IntoResponse> {
    let request = PageRequest::from(page);
    let query = CountryQuery {
        search: trim_optional_field(filter.search.as_ref()),
        status: parse_filter(filter.status.as_deref())?,
    };

    let page = Country::list(&state.diesel_pool, &query, &request).await?;
    Ok(ApiResponse::page(page))
}

/// Get a country by id
/// GET /api/countries/{id}
#[utoipa::path(
    get,
    path = "/countries/{id}",
    tag = "Countries",
    operation_id = "getCountry",
    params(("id" = Uuid, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country", body = Country),
        (status = 404, description = "Country not found")
    )
)]
pub async fn get_country(
    State(state): State<AppState>,
    Path(country_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    let country = Country::find_by_id(&mut conn, country_id)
        .await
        .or_not_found("Country")?;

    Ok(ApiResponse::ok(country))
}

/// Create a country
/// POST /api/countries
#[utoipa::path(
    post,
    path = "/countries",
    tag = "Countries",
    operation_id = "createCountry",
    request_body = CreateCountryRequest,
    responses(
        (status = 201, description = "Country created", body = Country),
        (status = 400, description = "Validation failed or duplicate name/code"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin only")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_country(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateCountryRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let country = Country::create(&mut conn, request.into()).await?;

    AuditLogger::record(
        AuditAction::Created,
        auth_user.user_id,
        "country",
        Some(country.id),
        Some(country.code.clone()),
    );

    Ok(ApiResponse::created(country).with_message("Country created successfully"))
}

/// Update a country
/// PUT /api/countries/{id}
#[utoipa::path(
    put,
    path = "/countries/{id}",
    tag = "Countries",
    operation_id = "updateCountry",
    params(("id" = Uuid, Path, description = "Country ID")),
    request_body = UpdateCountryRequest,
    responses(
        (status = 200, description = "Country updated", body = Country),
        (status = 400, description = "Validation failed or duplicate name/code"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Country not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_country(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(country_id): Path<Uuid>,
    Json(request): Json<UpdateCountryRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let country = Country::update(&mut conn, country_id, request.into())
        .await
        .or_not_found("Country")?;

    AuditLogger::record(AuditAction::Updated, auth_user.user_id, "country", Some(country.id), None);

    Ok(ApiResponse::ok(country).with_message("Country updated successfully"))
}

/// Delete a country
/// DELETE /api/countries/{id}
#[utoipa::path(
    delete,
    path = "/countries/{id}",
    tag = "Countries",
    operation_id = "deleteCountry",
    params(("id" = Uuid, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country deleted"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Country not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_country(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(country_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.diesel_pool.get().await?;
    if Country::delete(&mut conn, country_id).await? == 0 {
        return Err(ApiError::not_found("Country"));
    }

    AuditLogger::record(AuditAction::Deleted, auth_user.user_id, "country", Some(country_id), None);

    Ok(ApiResponse::message("Country deleted successfully"))
}
