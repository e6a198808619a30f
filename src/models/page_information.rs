// CMS page records driving marketing pages

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::catalog::patch_optional;
use super::pagination::{paginate, Page, PageRequest};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::page_information;
use crate::utils::{like_pattern, ApiResult};

text_enum! {
    PageStatus {
        Draft => "Draft",
        Published => "Published",
        Archived => "Archived",
    }
}

/// A content block. `data` is opaque to the API and interpreted by the
/// frontend according to `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct PageSection {
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 60, message = "Section type is required"))]
    pub kind: String,

    #[serde(default)]
    pub order: i32,

    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

/// Serialize sections for storage, ordered by their `order` field.
/// The sort is stable so equal orders keep their submitted sequence.
pub fn sections_to_json(mut sections: Vec<PageSection>) -> Value {
    sections.sort_by_key(|s| s.order);
    serde_json::to_value(sections).unwrap_or_else(|_| Value::Array(Vec::new()))
}

/// Validate each submitted section, reporting the first failure
pub fn validate_sections(sections: &[PageSection]) -> Result<(), validator::ValidationErrors> {
    sections.iter().try_for_each(|section| section.validate())
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = page_information)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PageInformation {
    pub id: Uuid,
    pub page_name: String,
    pub slug: String,
    pub title: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    #[schema(value_type = Vec<PageSection>)]
    pub sections: Value,
    pub status: PageStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = page_information)]
pub struct NewPageInformation {
    pub id: Uuid,
    pub page_name: String,
    pub slug: String,
    pub title: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub sections: Value,
    pub status: PageStatus,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = page_information)]
pub struct PageInformationChanges {
    pub page_name: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
    pub meta_keywords: Option<Option<String>>,
    pub sections: Option<Value>,
    pub status: Option<PageStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "pageName": "Study in Canada",
    "title": "Study in Canada",
    "sections": [{"type": "hero", "order": 1, "data": {"heading": "Your future starts here"}}]
}))]
pub struct CreatePageInformationRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide a page name"))]
    pub page_name: String,

    #[validate(length(max = 255, message = "Slug must be at most 255 characters"))]
    pub slug: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Please provide a title"))]
    pub title: String,

    #[validate(length(max = 255, message = "Meta title must be at most 255 characters"))]
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,

    #[serde(default)]
    pub sections: Vec<PageSection>,

    pub status: Option<PageStatus>,
}

impl CreatePageInformationRequest {
    pub fn into_new(self, slug: String, created_by: Uuid) -> NewPageInformation {
        NewPageInformation {
            id: Uuid::new_v4(),
            page_name: self.page_name.trim().to_string(),
            slug,
            title: self.title.trim().to_string(),
            meta_title: patch_optional(self.meta_title).flatten(),
            meta_description: patch_optional(self.meta_description).flatten(),
            meta_keywords: patch_optional(self.meta_keywords).flatten(),
            sections: sections_to_json(self.sections),
            status: self.status.unwrap_or(PageStatus::Draft),
            created_by: Some(created_by),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageInformationRequest {
    #[validate(length(min = 1, max = 255, message = "Page name cannot be empty"))]
    pub page_name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Slug cannot be empty"))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "Meta title must be at most 255 characters"))]
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub sections: Option<Vec<PageSection>>,
    pub status: Option<PageStatus>,
}

impl UpdatePageInformationRequest {
    /// `slug` is the already-normalized slug, when one was supplied
    pub fn into_changes(self, slug: Option<String>) -> PageInformationChanges {
        PageInformationChanges {
            page_name: self.page_name.map(|n| n.trim().to_string()),
            slug,
            title: self.title.map(|t| t.trim().to_string()),
            meta_title: patch_optional(self.meta_title),
            meta_description: patch_optional(self.meta_description),
            meta_keywords: patch_optional(self.meta_keywords),
            sections: self.sections.map(sections_to_json),
            status: self.status,
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageInformationFilter {
    /// Matches page name, title or slug
    pub search: Option<String>,
    /// Draft, Published or Archived
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PageInformationQuery {
    pub search: Option<String>,
    pub status: Option<PageStatus>,
}

impl PageInformation {
    fn filtered(filter: &PageInformationQuery) -> page_information::BoxedQuery<'static, Pg> {
        let mut query = page_information::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(page_information::status.eq(status));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                page_information::page_name
                    .ilike(pattern.clone())
                    .or(page_information::title.ilike(pattern.clone()))
                    .or(page_information::slug.ilike(pattern)),
            );
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &PageInformationQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<PageInformation>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, page_information::created_at, {
                    "pageName" => page_information::page_name,
                    "title" => page_information::title,
                    "slug" => page_information::slug,
                    "status" => page_information::status,
                    "updatedAt" => page_information::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<PageInformation>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, page_id: Uuid) -> QueryResult<Self> {
        page_information::table.find(page_id).first(conn).await
    }

    /// Slug lookup for the public site; drafts are hidden when
    /// `published_only` is set.
    pub async fn find_by_slug(
        conn: &mut AsyncPgConnection,
        page_slug: &str,
        published_only: bool,
    ) -> QueryResult<Option<Self>> {
        let mut query = page_information::table
            .filter(page_information::slug.eq(page_slug.trim().to_lowercase()))
            .into_boxed();
        if published_only {
            query = query.filter(page_information::status.eq(PageStatus::Published));
        }
        query.first(conn).await.optional()
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new: NewPageInformation,
    ) -> QueryResult<Self> {
        diesel::insert_into(page_information::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        page_id: Uuid,
        changes: PageInformationChanges,
    ) -> QueryResult<Self> {
        diesel::update(page_information::table.find(page_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, page_id: Uuid) -> QueryResult<usize> {
        diesel::delete(page_information::table.find(page_id))
            .execute(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(kind: &str, order: i32) -> PageSection {
        PageSection {
            kind: kind.to_string(),
            order,
            data: json!({"kind": kind}),
        }
    }

    #[test]
    fn test_sections_sorted_by_order() {
        let stored = sections_to_json(vec![
            section("faq", 3),
            section("hero", 1),
            section("gallery", 2),
            section("cta", 2),
        ]);

        let kinds: Vec<&str> = stored
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["hero", "gallery", "cta", "faq"]);
    }

    #[test]
    fn test_section_data_is_opaque() {
        let parsed: PageSection = serde_json::from_value(json!({
            "type": "testimonials",
            "order": 4,
            "data": {"items": [{"quote": "Great", "rating": 5}], "layout": null}
        }))
        .unwrap();
        assert_eq!(parsed.data["items"][0]["rating"], 5);

        let round = sections_to_json(vec![parsed]);
        assert_eq!(round[0]["data"]["items"][0]["quote"], "Great");
    }

    #[test]
    fn test_section_defaults() {
        let parsed: PageSection = serde_json::from_value(json!({"type": "divider"})).unwrap();
        assert_eq!(parsed.order, 0);
        assert!(parsed.data.is_null());
    }

    #[test]
    fn test_nested_section_validation() {
        let req: CreatePageInformationRequest = serde_json::from_value(json!({
            "pageName": "About",
            "title": "About us",
            "sections": [{"type": "", "order": 1}]
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(validate_sections(&req.sections).is_err());
        assert!(validate_sections(&[section("hero", 1)]).is_ok());
    }

    #[test]
    fn test_new_page_defaults_to_draft() {
        let req: CreatePageInformationRequest = serde_json::from_value(json!({
            "pageName": " About ",
            "title": "About us",
            "metaTitle": "  "
        }))
        .unwrap();
        let new = req.into_new("about".to_string(), Uuid::new_v4());
        assert_eq!(new.status, PageStatus::Draft);
        assert_eq!(new.page_name, "About");
        assert_eq!(new.meta_title, None);
        assert_eq!(new.sections, json!([]));
    }
}
