// Student applications linking a user, a university and a course

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::catalog::{patch_optional, Course, CourseSummary, University, UniversitySummary};
use super::pagination::{paginate, Page, PageRequest};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::applications;
use crate::utils::{like_pattern, ApiResult};

text_enum! {
    /// Progress marker. Any value may be set directly; there is no transition graph.
    PrimaryStatus {
        Pending => "Pending",
        UnderReview => "Under Review",
        OfferReceived => "Offer Received",
        ApplicationRefused => "Application Refused",
        Withdrawn => "Withdrawn",
        CaseClosed => "Case Closed",
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = applications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub university_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub cams_id: Option<String>,
    pub student_id: Option<String>,
    pub student_name: String,
    pub passport_no: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub intake: Option<String>,
    pub primary_status: PrimaryStatus,
    pub secondary_status: Option<String>,
    pub notes: Option<String>,
    pub counsellor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub university_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub cams_id: Option<String>,
    pub student_id: Option<String>,
    pub student_name: String,
    pub passport_no: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub intake: Option<String>,
    pub primary_status: PrimaryStatus,
    pub secondary_status: Option<String>,
    pub notes: Option<String>,
    pub counsellor_id: Option<Uuid>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = applications)]
pub struct ApplicationChanges {
    pub university_id: Option<Option<Uuid>>,
    pub course_id: Option<Option<Uuid>>,
    pub cams_id: Option<Option<String>>,
    pub student_id: Option<Option<String>>,
    pub student_name: Option<String>,
    pub passport_no: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub intake: Option<Option<String>>,
    pub primary_status: Option<PrimaryStatus>,
    pub secondary_status: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub counsellor_id: Option<Option<Uuid>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "studentName": "Ravi Kumar",
    "camsId": "CAMS-2024-0193",
    "passportNo": "P1234567",
    "universityId": "123e4567-e89b-12d3-a456-426614174000",
    "intake": "September 2025"
}))]
pub struct CreateApplicationRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide the student name"))]
    pub student_name: String,

    pub university_id: Option<Uuid>,
    pub course_id: Option<Uuid>,

    #[validate(length(max = 100, message = "CAMS ID is too long"))]
    pub cams_id: Option<String>,

    #[validate(length(max = 100, message = "Student ID is too long"))]
    pub student_id: Option<String>,

    #[validate(length(max = 50, message = "Passport number is too long"))]
    pub passport_no: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,

    #[validate(length(max = 60, message = "Intake is too long"))]
    pub intake: Option<String>,

    pub primary_status: Option<PrimaryStatus>,

    #[validate(length(max = 120, message = "Secondary status is too long"))]
    pub secondary_status: Option<String>,

    pub notes: Option<String>,

    pub counsellor_id: Option<Uuid>,

    /// Staff may file on behalf of a student account
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    #[validate(length(min = 1, max = 255, message = "Student name cannot be empty"))]
    pub student_name: Option<String>,
    pub university_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    #[validate(length(max = 100, message = "CAMS ID is too long"))]
    pub cams_id: Option<String>,
    #[validate(length(max = 100, message = "Student ID is too long"))]
    pub student_id: Option<String>,
    #[validate(length(max = 50, message = "Passport number is too long"))]
    pub passport_no: Option<String>,
    pub email: Option<String>,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 60, message = "Intake is too long"))]
    pub intake: Option<String>,
    pub primary_status: Option<PrimaryStatus>,
    #[validate(length(max = 120, message = "Secondary status is too long"))]
    pub secondary_status: Option<String>,
    pub notes: Option<String>,
    pub counsellor_id: Option<Uuid>,
}

impl NewApplication {
    pub fn from_request(req: CreateApplicationRequest, owner: Uuid) -> Self {
        let trim = |v: Option<String>| patch_optional(v).flatten();
        NewApplication {
            id: Uuid::new_v4(),
            user_id: owner,
            university_id: req.university_id,
            course_id: req.course_id,
            cams_id: trim(req.cams_id),
            student_id: trim(req.student_id),
            student_name: req.student_name.trim().to_string(),
            passport_no: trim(req.passport_no).map(|p| p.to_uppercase()),
            email: trim(req.email),
            phone: trim(req.phone),
            intake: trim(req.intake),
            primary_status: req.primary_status.unwrap_or(PrimaryStatus::Pending),
            secondary_status: trim(req.secondary_status),
            notes: trim(req.notes),
            counsellor_id: req.counsellor_id,
        }
    }
}

impl From<UpdateApplicationRequest> for ApplicationChanges {
    fn from(req: UpdateApplicationRequest) -> Self {
        ApplicationChanges {
            university_id: req.university_id.map(Some),
            course_id: req.course_id.map(Some),
            cams_id: patch_optional(req.cams_id),
            student_id: patch_optional(req.student_id),
            student_name: req.student_name.map(|n| n.trim().to_string()),
            passport_no: patch_optional(req.passport_no).map(|p| p.map(|v| v.to_uppercase())),
            email: patch_optional(req.email),
            phone: patch_optional(req.phone),
            intake: patch_optional(req.intake),
            primary_status: req.primary_status,
            secondary_status: patch_optional(req.secondary_status),
            notes: patch_optional(req.notes),
            counsellor_id: req.counsellor_id.map(Some),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ApplicationFilter {
    /// Case-insensitive match over camsId, studentName, passportNo and studentId
    pub search: Option<String>,
    pub cams_id: Option<String>,
    pub student_name: Option<String>,
    pub passport_no: Option<String>,
    pub student_id: Option<String>,
    /// One of the primary status values
    pub primary_status: Option<String>,
    /// University id
    pub university: Option<Uuid>,
    /// Course id
    pub course: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationQuery {
    pub search: Option<String>,
    pub cams_id: Option<String>,
    pub student_name: Option<String>,
    pub passport_no: Option<String>,
    pub student_id: Option<String>,
    pub primary_status: Option<PrimaryStatus>,
    pub university: Option<Uuid>,
    pub course: Option<Uuid>,
    /// Restricts results to one applicant
    pub owner: Option<Uuid>,
}

/// Application with university and course resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: Application,
    pub university: Option<UniversitySummary>,
    pub course: Option<CourseSummary>,
}

impl Application {
    fn filtered(filter: &ApplicationQuery) -> applications::BoxedQuery<'static, Pg> {
        let mut query = applications::table.into_boxed();

        if let Some(owner) = filter.owner {
            query = query.filter(applications::user_id.eq(owner));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                applications::cams_id
                    .ilike(pattern.clone())
                    .or(applications::student_name.ilike(pattern.clone()))
                    .or(applications::passport_no.ilike(pattern.clone()))
                    .or(applications::student_id.ilike(pattern)),
            );
        }
        if let Some(cams) = filter.cams_id.as_deref() {
            query = query.filter(applications::cams_id.ilike(like_pattern(cams)));
        }
        if let Some(name) = filter.student_name.as_deref() {
            query = query.filter(applications::student_name.ilike(like_pattern(name)));
        }
        if let Some(passport) = filter.passport_no.as_deref() {
            query = query.filter(applications::passport_no.ilike(like_pattern(passport)));
        }
        if let Some(student) = filter.student_id.as_deref() {
            query = query.filter(applications::student_id.ilike(like_pattern(student)));
        }
        if let Some(status) = filter.primary_status {
            query = query.filter(applications::primary_status.eq(status));
        }
        if let Some(university) = filter.university {
            query = query.filter(applications::university_id.eq(university));
        }
        if let Some(course) = filter.course {
            query = query.filter(applications::course_id.eq(course));
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &ApplicationQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<Application>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, applications::created_at, {
                    "studentName" => applications::student_name,
                    "camsId" => applications::cams_id,
                    "primaryStatus" => applications::primary_status,
                    "intake" => applications::intake,
                    "updatedAt" => applications::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<Application>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, application_id: Uuid) -> QueryResult<Self> {
        applications::table.find(application_id).first(conn).await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewApplication) -> QueryResult<Self> {
        diesel::insert_into(applications::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        application_id: Uuid,
        changes: ApplicationChanges,
    ) -> QueryResult<Self> {
        diesel::update(applications::table.find(application_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, application_id: Uuid) -> QueryResult<usize> {
        diesel::delete(applications::table.find(application_id))
            .execute(conn)
            .await
    }

    /// Resolve university and course references with one query per table
    pub async fn populate(
        conn: &mut AsyncPgConnection,
        items: Vec<Application>,
    ) -> QueryResult<Vec<ApplicationView>> {
        let university_ids: Vec<Uuid> = items.iter().filter_map(|a| a.university_id).collect();
        let course_ids: Vec<Uuid> = items.iter().filter_map(|a| a.course_id).collect();

        let universities = University::summaries(conn, &university_ids).await?;
        let courses = Course::summaries(conn, &course_ids).await?;

        Ok(items
            .into_iter()
            .map(|application| ApplicationView {
                university: application
                    .university_id
                    .and_then(|id| universities.get(&id).cloned()),
                course: application.course_id.and_then(|id| courses.get(&id).cloned()),
                application,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_primary_status_text() {
        assert_eq!(PrimaryStatus::UnderReview.as_str(), "Under Review");
        assert_eq!(
            PrimaryStatus::from_str("Application Refused"),
            Ok(PrimaryStatus::ApplicationRefused)
        );
        assert!(PrimaryStatus::from_str("Rejected").is_err());
        assert_eq!(PrimaryStatus::ALL.len(), 6);
    }

    #[test]
    fn test_new_application_defaults_to_pending() {
        let request: CreateApplicationRequest = serde_json::from_value(serde_json::json!({
            "studentName": "  Ravi Kumar ",
            "passportNo": "p1234567",
            "camsId": "   "
        }))
        .unwrap();
        let owner = Uuid::new_v4();

        let new = NewApplication::from_request(request, owner);
        assert_eq!(new.user_id, owner);
        assert_eq!(new.student_name, "Ravi Kumar");
        assert_eq!(new.passport_no.as_deref(), Some("P1234567"));
        assert_eq!(new.cams_id, None);
        assert_eq!(new.primary_status, PrimaryStatus::Pending);
    }

    #[test]
    fn test_any_status_may_be_set_directly() {
        let request: UpdateApplicationRequest = serde_json::from_value(serde_json::json!({
            "primaryStatus": "Case Closed"
        }))
        .unwrap();
        let changes = ApplicationChanges::from(request);
        assert_eq!(changes.primary_status, Some(PrimaryStatus::CaseClosed));
        assert!(changes.student_name.is_none());
    }
}
