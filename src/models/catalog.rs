// Catalog records: countries, universities, courses and programs

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::pagination::{paginate, Page, PageRequest};
use super::RecordStatus;
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::{countries, courses, programs, universities};
use crate::utils::validation::{trimmed, trimmed_opt};
use crate::utils::{like_pattern, ApiResult};

/// Blank optional strings clear the column, absent ones leave it alone
pub(crate) fn patch_optional(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// =============================================================================
// COUNTRIES
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = countries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub currency: Option<String>,
    pub flag_url: Option<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = countries)]
pub struct NewCountry {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub currency: Option<String>,
    pub flag_url: Option<String>,
    pub status: RecordStatus,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = countries)]
pub struct CountryChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub currency: Option<Option<String>>,
    pub flag_url: Option<Option<String>>,
    pub status: Option<RecordStatus>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"name": "India", "code": "IN", "currency": "INR"}))]
pub struct CreateCountryRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 120, message = "Please provide a country name"))]
    pub name: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 3, message = "Country code must be 2-3 characters"))]
    pub code: String,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    #[validate(url(message = "Invalid flag URL"))]
    pub flag_url: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCountryRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 120, message = "Country name cannot be empty"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 2, max = 3, message = "Country code must be 2-3 characters"))]
    pub code: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,

    pub flag_url: Option<String>,

    pub status: Option<RecordStatus>,
}

impl From<CreateCountryRequest> for NewCountry {
    fn from(req: CreateCountryRequest) -> Self {
        NewCountry {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            code: req.code.trim().to_uppercase(),
            currency: req.currency.map(|c| c.trim().to_uppercase()),
            flag_url: req.flag_url,
            status: req.status.unwrap_or_default(),
        }
    }
}

impl From<UpdateCountryRequest> for CountryChanges {
    fn from(req: UpdateCountryRequest) -> Self {
        CountryChanges {
            name: req.name.map(|n| n.trim().to_string()),
            code: req.code.map(|c| c.trim().to_uppercase()),
            currency: patch_optional(req.currency).map(|c| c.map(|v| v.to_uppercase())),
            flag_url: patch_optional(req.flag_url),
            status: req.status,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CountryFilter {
    /// Matches name or code
    pub search: Option<String>,
    /// Active or Inactive
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CountryQuery {
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Serialize, Queryable, ToSchema)]
pub struct CountrySummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

impl Country {
    fn filtered(filter: &CountryQuery) -> countries::BoxedQuery<'static, Pg> {
        let mut query = countries::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(countries::status.eq(status));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                countries::name
                    .ilike(pattern.clone())
                    .or(countries::code.ilike(pattern)),
            );
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &CountryQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Country>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, countries::created_at, {
                    "name" => countries::name,
                    "code" => countries::code,
                    "status" => countries::status,
                    "updatedAt" => countries::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Country>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, country_id: Uuid) -> QueryResult<Self> {
        countries::table.find(country_id).first(conn).await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewCountry) -> QueryResult<Self> {
        diesel::insert_into(countries::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        country_id: Uuid,
        changes: CountryChanges,
    ) -> QueryResult<Self> {
        diesel::update(countries::table.find(country_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, country_id: Uuid) -> QueryResult<usize> {
        diesel::delete(countries::table.find(country_id))
            .execute(conn)
            .await
    }

    pub async fn summaries(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> QueryResult<HashMap<Uuid, CountrySummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<CountrySummary> = countries::table
            .filter(countries::id.eq_any(ids))
            .select((countries::id, countries::name, countries::code))
            .load(conn)
            .await?;
        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }
}

// =============================================================================
// UNIVERSITIES
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = universities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct University {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub country_id: Option<Uuid>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub ranking: Option<i32>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = universities)]
pub struct NewUniversity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub country_id: Option<Uuid>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website: Option<String>,
    pub ranking: Option<i32>,
    pub status: RecordStatus,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = universities)]
pub struct UniversityChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub country_id: Option<Option<Uuid>>,
    pub city: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub ranking: Option<Option<i32>>,
    pub status: Option<RecordStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUniversityRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide a university name"))]
    pub name: String,

    #[validate(length(max = 255, message = "Slug is too long"))]
    pub slug: Option<String>,

    pub country_id: Option<Uuid>,

    #[validate(length(max = 120, message = "City is too long"))]
    pub city: Option<String>,

    pub description: Option<String>,

    #[validate(url(message = "Invalid logo URL"))]
    pub logo_url: Option<String>,

    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,

    #[validate(range(min = 1, message = "Ranking must be a positive number"))]
    pub ranking: Option<i32>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUniversityRequest {
    #[validate(length(min = 1, max = 255, message = "University name cannot be empty"))]
    pub name: Option<String>,

    #[validate(length(max = 255, message = "Slug is too long"))]
    pub slug: Option<String>,

    pub country_id: Option<Uuid>,

    pub city: Option<String>,

    pub description: Option<String>,

    pub logo_url: Option<String>,

    pub website: Option<String>,

    #[validate(range(min = 1, message = "Ranking must be a positive number"))]
    pub ranking: Option<i32>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UniversityFilter {
    /// Matches name or city
    pub search: Option<String>,
    /// Country id
    pub country: Option<Uuid>,
    /// Active or Inactive
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UniversityQuery {
    pub search: Option<String>,
    pub country: Option<Uuid>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Serialize, Queryable, ToSchema)]
pub struct UniversitySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// University with its country resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UniversityView {
    #[serde(flatten)]
    pub university: University,
    pub country: Option<CountrySummary>,
}

impl University {
    fn filtered(filter: &UniversityQuery) -> universities::BoxedQuery<'static, Pg> {
        let mut query = universities::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(universities::status.eq(status));
        }
        if let Some(country) = filter.country {
            query = query.filter(universities::country_id.eq(country));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                universities::name
                    .ilike(pattern.clone())
                    .or(universities::city.ilike(pattern)),
            );
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &UniversityQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<University>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, universities::created_at, {
                    "name" => universities::name,
                    "ranking" => universities::ranking,
                    "city" => universities::city,
                    "updatedAt" => universities::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<University>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, university_id: Uuid) -> QueryResult<Self> {
        universities::table.find(university_id).first(conn).await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewUniversity) -> QueryResult<Self> {
        diesel::insert_into(universities::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        university_id: Uuid,
        changes: UniversityChanges,
    ) -> QueryResult<Self> {
        diesel::update(universities::table.find(university_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, university_id: Uuid) -> QueryResult<usize> {
        diesel::delete(universities::table.find(university_id))
            .execute(conn)
            .await
    }

    pub async fn summaries(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> QueryResult<HashMap<Uuid, UniversitySummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<UniversitySummary> = universities::table
            .filter(universities::id.eq_any(ids))
            .select((universities::id, universities::name, universities::slug))
            .load(conn)
            .await?;
        Ok(rows.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Resolve country references for a page of universities in one query
    pub async fn populate(
        conn: &mut AsyncPgConnection,
        items: Vec<University>,
    ) -> QueryResult<Vec<UniversityView>> {
        let ids: Vec<Uuid> = items.iter().filter_map(|u| u.country_id).collect();
        let countries = Country::summaries(conn, &ids).await?;

        Ok(items
            .into_iter()
            .map(|university| UniversityView {
                country: university.country_id.and_then(|id| countries.get(&id).cloned()),
                university,
            })
            .collect())
    }
}

// =============================================================================
// COURSES
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub university_id: Option<Uuid>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub price: f64,
    pub students: i32,
    pub thumbnail_url: Option<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = courses)]
pub struct NewCourse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub university_id: Option<Uuid>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub price: f64,
    pub thumbnail_url: Option<String>,
    pub status: RecordStatus,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = courses)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub university_id: Option<Option<Uuid>>,
    pub description: Option<Option<String>>,
    pub level: Option<Option<String>>,
    pub duration: Option<Option<String>>,
    pub price: Option<f64>,
    pub thumbnail_url: Option<Option<String>>,
    pub status: Option<RecordStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide a course title"))]
    pub title: String,

    #[validate(length(max = 255, message = "Slug is too long"))]
    pub slug: Option<String>,

    pub university_id: Option<Uuid>,

    pub description: Option<String>,

    #[validate(length(max = 60, message = "Level is too long"))]
    pub level: Option<String>,

    #[validate(length(max = 60, message = "Duration is too long"))]
    pub duration: Option<String>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    #[validate(url(message = "Invalid thumbnail URL"))]
    pub thumbnail_url: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 255, message = "Course title cannot be empty"))]
    pub title: Option<String>,

    #[validate(length(max = 255, message = "Slug is too long"))]
    pub slug: Option<String>,

    pub university_id: Option<Uuid>,

    pub description: Option<String>,

    #[validate(length(max = 60, message = "Level is too long"))]
    pub level: Option<String>,

    #[validate(length(max = 60, message = "Duration is too long"))]
    pub duration: Option<String>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    pub thumbnail_url: Option<String>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseFilter {
    /// Matches title
    pub search: Option<String>,
    /// University id
    pub university: Option<Uuid>,
    pub level: Option<String>,
    /// Active or Inactive
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    pub search: Option<String>,
    pub university: Option<Uuid>,
    pub level: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Serialize, Queryable, ToSchema)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub price: f64,
}

/// Course with its university resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    pub university: Option<UniversitySummary>,
}

impl Course {
    fn filtered(filter: &CourseQuery) -> courses::BoxedQuery<'static, Pg> {
        let mut query = courses::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(courses::status.eq(status));
        }
        if let Some(university) = filter.university {
            query = query.filter(courses::university_id.eq(university));
        }
        if let Some(level) = filter.level.as_deref() {
            query = query.filter(courses::level.eq(level.to_string()));
        }
        if let Some(search) = filter.search.as_deref() {
            query = query.filter(courses::title.ilike(like_pattern(search)));
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &CourseQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Course>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, courses::created_at, {
                    "title" => courses::title,
                    "price" => courses::price,
                    "students" => courses::students,
                    "updatedAt" => courses::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Course>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, course_id: Uuid) -> QueryResult<Self> {
        courses::table.find(course_id).first(conn).await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewCourse) -> QueryResult<Self> {
        diesel::insert_into(courses::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        course_id: Uuid,
        changes: CourseChanges,
    ) -> QueryResult<Self> {
        diesel::update(courses::table.find(course_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, course_id: Uuid) -> QueryResult<usize> {
        diesel::delete(courses::table.find(course_id))
            .execute(conn)
            .await
    }

    pub async fn increment_students(
        conn: &mut AsyncPgConnection,
        course_id: Uuid,
    ) -> QueryResult<usize> {
        diesel::update(courses::table.find(course_id))
            .set(courses::students.eq(courses::students + 1))
            .execute(conn)
            .await
    }

    pub async fn summaries(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> QueryResult<HashMap<Uuid, CourseSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<CourseSummary> = courses::table
            .filter(courses::id.eq_any(ids))
            .select((courses::id, courses::title, courses::slug, courses::price))
            .load(conn)
            .await?;
        Ok(rows.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Resolve university references for a page of courses in one query
    pub async fn populate(
        conn: &mut AsyncPgConnection,
        items: Vec<Course>,
    ) -> QueryResult<Vec<CourseView>> {
        let ids: Vec<Uuid> = items.iter().filter_map(|c| c.university_id).collect();
        let universities = University::summaries(conn, &ids).await?;

        Ok(items
            .into_iter()
            .map(|course| CourseView {
                university: course.university_id.and_then(|id| universities.get(&id).cloned()),
                course,
            })
            .collect())
    }
}

// =============================================================================
// PROGRAMS
// =============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = programs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub price: f64,
    pub students: i32,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = programs)]
pub struct NewProgram {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub price: f64,
    pub status: RecordStatus,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = programs)]
pub struct ProgramChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub duration: Option<Option<String>>,
    pub price: Option<f64>,
    pub status: Option<RecordStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgramRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide a program title"))]
    pub title: String,

    #[validate(length(max = 255, message = "Slug is too long"))]
    pub slug: Option<String>,

    pub description: Option<String>,

    #[validate(length(max = 60, message = "Duration is too long"))]
    pub duration: Option<String>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgramRequest {
    #[validate(length(min = 1, max = 255, message = "Program title cannot be empty"))]
    pub title: Option<String>,

    #[validate(length(max = 255, message = "Slug is too long"))]
    pub slug: Option<String>,

    pub description: Option<String>,

    #[validate(length(max = 60, message = "Duration is too long"))]
    pub duration: Option<String>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgramFilter {
    /// Matches title
    pub search: Option<String>,
    /// Active or Inactive
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramQuery {
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Serialize, Queryable, ToSchema)]
pub struct ProgramSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub price: f64,
}

impl Program {
    fn filtered(filter: &ProgramQuery) -> programs::BoxedQuery<'static, Pg> {
        let mut query = programs::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(programs::status.eq(status));
        }
        if let Some(search) = filter.search.as_deref() {
            query = query.filter(programs::title.ilike(like_pattern(search)));
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &ProgramQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Program>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, programs::created_at, {
                    "title" => programs::title,
                    "price" => programs::price,
                    "students" => programs::students,
                    "updatedAt" => programs::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Program>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, program_id: Uuid) -> QueryResult<Self> {
        programs::table.find(program_id).first(conn).await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewProgram) -> QueryResult<Self> {
        diesel::insert_into(programs::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        program_id: Uuid,
        changes: ProgramChanges,
    ) -> QueryResult<Self> {
        diesel::update(programs::table.find(program_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, program_id: Uuid) -> QueryResult<usize> {
        diesel::delete(programs::table.find(program_id))
            .execute(conn)
            .await
    }

    pub async fn increment_students(
        conn: &mut AsyncPgConnection,
        program_id: Uuid,
    ) -> QueryResult<usize> {
        diesel::update(programs::table.find(program_id))
            .set(programs::students.eq(programs::students + 1))
            .execute(conn)
            .await
    }

    pub async fn summaries(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> QueryResult<HashMap<Uuid, ProgramSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<ProgramSummary> = programs::table
            .filter(programs::id.eq_any(ids))
            .select((programs::id, programs::title, programs::slug, programs::price))
            .load(conn)
            .await?;
        Ok(rows.into_iter().map(|p| (p.id, p)).collect())
    }
}

// =============================================================================
// REQUEST CONVERSIONS
// =============================================================================
// Slugs are resolved by the caller, which owns the "explicit or derived" rule.

impl CreateUniversityRequest {
    pub fn into_new(self, slug: String) -> NewUniversity {
        NewUniversity {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            slug,
            country_id: self.country_id,
            city: patch_optional(self.city).flatten(),
            description: patch_optional(self.description).flatten(),
            logo_url: patch_optional(self.logo_url).flatten(),
            website: patch_optional(self.website).flatten(),
            ranking: self.ranking,
            status: self.status.unwrap_or_default(),
        }
    }
}

impl UpdateUniversityRequest {
    pub fn into_changes(self, slug: Option<String>) -> UniversityChanges {
        UniversityChanges {
            name: self.name.map(|n| n.trim().to_string()),
            slug,
            country_id: self.country_id.map(Some),
            city: patch_optional(self.city),
            description: patch_optional(self.description),
            logo_url: patch_optional(self.logo_url),
            website: patch_optional(self.website),
            ranking: self.ranking.map(Some),
            status: self.status,
            updated_at: Some(Utc::now()),
        }
    }
}

impl CreateCourseRequest {
    pub fn into_new(self, slug: String) -> NewCourse {
        NewCourse {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            slug,
            university_id: self.university_id,
            description: patch_optional(self.description).flatten(),
            level: patch_optional(self.level).flatten(),
            duration: patch_optional(self.duration).flatten(),
            price: self.price,
            thumbnail_url: patch_optional(self.thumbnail_url).flatten(),
            status: self.status.unwrap_or_default(),
        }
    }
}

impl UpdateCourseRequest {
    pub fn into_changes(self, slug: Option<String>) -> CourseChanges {
        CourseChanges {
            title: self.title.map(|t| t.trim().to_string()),
            slug,
            university_id: self.university_id.map(Some),
            description: patch_optional(self.description),
            level: patch_optional(self.level),
            duration: patch_optional(self.duration),
            price: self.price,
            thumbnail_url: patch_optional(self.thumbnail_url),
            status: self.status,
            updated_at: Some(Utc::now()),
        }
    }
}

impl CreateProgramRequest {
    pub fn into_new(self, slug: String) -> NewProgram {
        NewProgram {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            slug,
            description: patch_optional(self.description).flatten(),
            duration: patch_optional(self.duration).flatten(),
            price: self.price,
            status: self.status.unwrap_or_default(),
        }
    }
}

impl UpdateProgramRequest {
    pub fn into_changes(self, slug: Option<String>) -> ProgramChanges {
        ProgramChanges {
            title: self.title.map(|t| t.trim().to_string()),
            slug,
            description: patch_optional(self.description),
            duration: patch_optional(self.duration),
            price: self.price,
            status: self.status,
            updated_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_length_is_validated() {
        let too_long = CreateCountryRequest {
            name: "Narnia".to_string(),
            code: "NARN".to_string(),
            currency: None,
            flag_url: None,
            status: None,
        };
        let err = too_long.validate().unwrap_err();
        assert!(err.field_errors().contains_key("code"));

        let too_short = CreateCountryRequest {
            code: "N".to_string(),
            ..too_long.clone()
        };
        assert!(too_short.validate().is_err());

        let ok = CreateCountryRequest {
            code: "in".to_string(),
            ..too_long
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_country_fields_are_trimmed_before_validation() {
        let padded: CreateCountryRequest =
            serde_json::from_value(serde_json::json!({"name": " India ", "code": " IN "})).unwrap();
        assert_eq!(padded.code, "IN");
        assert_eq!(padded.name, "India");
        assert!(padded.validate().is_ok());

        let short: CreateCountryRequest =
            serde_json::from_value(serde_json::json!({"name": "India", "code": "I  "})).unwrap();
        assert!(short.validate().unwrap_err().field_errors().contains_key("code"));

        let blank: UpdateCountryRequest =
            serde_json::from_value(serde_json::json!({"name": "   ", "currency": " inr "})).unwrap();
        assert_eq!(blank.currency.as_deref(), Some("inr"));
        assert!(blank.validate().unwrap_err().field_errors().contains_key("name"));

        let empty: UpdateCountryRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.name.is_none());
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_new_country_normalizes_code() {
        let new: NewCountry = CreateCountryRequest {
            name: "  India ".to_string(),
            code: "in".to_string(),
            currency: Some("inr".to_string()),
            flag_url: None,
            status: None,
        }
        .into();

        assert_eq!(new.name, "India");
        assert_eq!(new.code, "IN");
        assert_eq!(new.currency.as_deref(), Some("INR"));
        assert_eq!(new.status, RecordStatus::Active);
    }

    #[test]
    fn test_patch_optional() {
        assert_eq!(patch_optional(None), None);
        assert_eq!(patch_optional(Some("  ".to_string())), Some(None));
        assert_eq!(
            patch_optional(Some(" Pune ".to_string())),
            Some(Some("Pune".to_string()))
        );
    }

    #[test]
    fn test_negative_price_rejected() {
        let req = CreateCourseRequest {
            title: "MSc Data Science".to_string(),
            slug: None,
            university_id: None,
            description: None,
            level: None,
            duration: None,
            price: -1.0,
            thumbnail_url: None,
            status: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_course_view_flattens() {
        let now = Utc::now();
        let view = CourseView {
            course: Course {
                id: Uuid::new_v4(),
                title: "MBA".to_string(),
                slug: "mba".to_string(),
                university_id: None,
                description: None,
                level: Some("Postgraduate".to_string()),
                duration: None,
                price: 1200.0,
                students: 3,
                thumbnail_url: None,
                status: RecordStatus::Active,
                created_at: now,
                updated_at: now,
            },
            university: None,
        };
        let value = serde_json::to_value(view).unwrap();
        assert_eq!(value["title"], "MBA");
        assert_eq!(value["students"], 3);
        assert!(value["university"].is_null());
    }

    #[test]
    fn test_course_conversion_drops_blank_fields() {
        let req = CreateCourseRequest {
            title: " Data Science ".to_string(),
            slug: None,
            university_id: None,
            description: Some("   ".to_string()),
            level: Some("Masters".to_string()),
            duration: None,
            price: 1200.0,
            thumbnail_url: None,
            status: None,
        };
        let new = req.into_new("data-science".to_string());
        assert_eq!(new.title, "Data Science");
        assert_eq!(new.description, None);
        assert_eq!(new.level.as_deref(), Some("Masters"));
        assert_eq!(new.status, RecordStatus::Active);
    }
}
