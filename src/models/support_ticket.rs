// Support tickets raised by users and worked by staff

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::catalog::patch_optional;
use super::pagination::{paginate, Page, PageRequest};
use super::user::{User, UserSummary};
use crate::apply_sort;
use crate::db::DieselPool;
use crate::schema::support_tickets;
use crate::utils::{like_pattern, ApiResult};

text_enum! {
    TicketPriority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Urgent => "Urgent",
    }
}

text_enum! {
    TicketStatus {
        Open => "Open",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Closed => "Closed",
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, ToSchema)]
#[diesel(table_name = support_tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    pub category: Option<String>,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub response: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = support_tickets)]
pub struct NewSupportTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: String,
    pub category: Option<String>,
    pub priority: TicketPriority,
    pub status: TicketStatus,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = support_tickets)]
pub struct SupportTicketChanges {
    pub category: Option<Option<String>>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    pub response: Option<Option<String>>,
    pub assigned_to: Option<Option<Uuid>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "subject": "Unable to download offer letter",
    "message": "The download link on my application returns an error.",
    "category": "applications",
    "priority": "High"
}))]
pub struct CreateSupportTicketRequest {
    #[validate(length(min = 1, max = 255, message = "Please provide a subject"))]
    pub subject: String,

    #[validate(length(min = 1, max = 5000, message = "Please provide a message"))]
    pub message: String,

    #[validate(length(max = 60, message = "Category must be at most 60 characters"))]
    pub category: Option<String>,

    pub priority: Option<TicketPriority>,
}

impl NewSupportTicket {
    /// New tickets always start Open
    pub fn from_request(req: CreateSupportTicketRequest, owner: Uuid) -> Self {
        NewSupportTicket {
            id: Uuid::new_v4(),
            user_id: owner,
            subject: req.subject.trim().to_string(),
            message: req.message.trim().to_string(),
            category: patch_optional(req.category).flatten(),
            priority: req.priority.unwrap_or(TicketPriority::Medium),
            status: TicketStatus::Open,
        }
    }
}

/// Staff-side ticket update
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupportTicketRequest {
    #[validate(length(max = 60, message = "Category must be at most 60 characters"))]
    pub category: Option<String>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    #[validate(length(max = 5000, message = "Response must be at most 5000 characters"))]
    pub response: Option<String>,
    pub assigned_to: Option<Uuid>,
}

impl From<UpdateSupportTicketRequest> for SupportTicketChanges {
    fn from(req: UpdateSupportTicketRequest) -> Self {
        SupportTicketChanges {
            category: patch_optional(req.category),
            priority: req.priority,
            status: req.status,
            response: patch_optional(req.response),
            assigned_to: req.assigned_to.map(Some),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SupportTicketFilter {
    /// Matches subject or message
    pub search: Option<String>,
    /// Open, In Progress, Resolved or Closed
    pub status: Option<String>,
    /// Low, Medium, High or Urgent
    pub priority: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SupportTicketQuery {
    pub search: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<String>,
    pub owner: Option<Uuid>,
}

/// Ticket with the raising user resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupportTicketView {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub user: Option<UserSummary>,
    pub assignee: Option<UserSummary>,
}

impl SupportTicket {
    fn filtered(filter: &SupportTicketQuery) -> support_tickets::BoxedQuery<'static, Pg> {
        let mut query = support_tickets::table.into_boxed();

        if let Some(owner) = filter.owner {
            query = query.filter(support_tickets::user_id.eq(owner));
        }
        if let Some(status) = filter.status {
            query = query.filter(support_tickets::status.eq(status));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(support_tickets::priority.eq(priority));
        }
        if let Some(category) = filter.category.as_deref() {
            query = query.filter(support_tickets::category.eq(category.to_string()));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            query = query.filter(
                support_tickets::subject
                    .ilike(pattern.clone())
                    .or(support_tickets::message.ilike(pattern)),
            );
        }
        query
    }

    pub async fn list(
        pool: &DieselPool,
        filter: &SupportTicketQuery,
        request: &PageRequest,
    ) -> ApiResult<Page<SupportTicket>> {
        paginate(
            pool,
            request,
            |mut conn| async move { Self::filtered(filter).count().get_result(&mut conn).await },
            |mut conn| async move {
                apply_sort!(Self::filtered(filter), request, support_tickets::created_at, {
                    "subject" => support_tickets::subject,
                    "priority" => support_tickets::priority,
                    "status" => support_tickets::status,
                    "updatedAt" => support_tickets::updated_at,
                })
                .limit(request.limit)
                .offset(request.offset())
                .load::<SupportTicket>(&mut conn)
                .await
            },
        )
        .await
    }

    pub async fn find_by_id(conn: &mut AsyncPgConnection, ticket_id: Uuid) -> QueryResult<Self> {
        support_tickets::table.find(ticket_id).first(conn).await
    }

    pub async fn create(conn: &mut AsyncPgConnection, new: NewSupportTicket) -> QueryResult<Self> {
        diesel::insert_into(support_tickets::table)
            .values(&new)
            .get_result(conn)
            .await
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        ticket_id: Uuid,
        changes: SupportTicketChanges,
    ) -> QueryResult<Self> {
        diesel::update(support_tickets::table.find(ticket_id))
            .set(&changes)
            .get_result(conn)
            .await
    }

    pub async fn delete(conn: &mut AsyncPgConnection, ticket_id: Uuid) -> QueryResult<usize> {
        diesel::delete(support_tickets::table.find(ticket_id))
            .execute(conn)
            .await
    }

    pub async fn populate(
        conn: &mut AsyncPgConnection,
        items: Vec<SupportTicket>,
    ) -> QueryResult<Vec<SupportTicketView>> {
        let ids: Vec<Uuid> = items
            .iter()
            .flat_map(|t| std::iter::once(t.user_id).chain(t.assigned_to))
            .collect();
        let users = User::summaries(conn, &ids).await?;

        Ok(items
            .into_iter()
            .map(|ticket| SupportTicketView {
                user: users.get(&ticket.user_id).cloned(),
                assignee: ticket.assigned_to.and_then(|id| users.get(&id).cloned()),
                ticket,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_text_has_space() {
        assert_eq!(TicketStatus::InProgress.as_str(), "In Progress");
        assert_eq!(TicketStatus::from_str("In Progress"), Ok(TicketStatus::InProgress));
        assert_eq!(
            serde_json::to_value(TicketStatus::InProgress).unwrap(),
            serde_json::json!("In Progress")
        );
    }

    #[test]
    fn test_new_ticket_defaults() {
        let owner = Uuid::new_v4();
        let ticket = NewSupportTicket::from_request(
            CreateSupportTicketRequest {
                subject: "  Refund  ".to_string(),
                message: "Please refund my course".to_string(),
                category: Some(" ".to_string()),
                priority: None,
            },
            owner,
        );
        assert_eq!(ticket.user_id, owner);
        assert_eq!(ticket.subject, "Refund");
        assert_eq!(ticket.category, None);
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[test]
    fn test_empty_subject_rejected() {
        let req = CreateSupportTicketRequest {
            subject: String::new(),
            message: "body".to_string(),
            category: None,
            priority: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_staff_update_can_clear_response() {
        let changes: SupportTicketChanges = UpdateSupportTicketRequest {
            category: None,
            priority: Some(TicketPriority::Urgent),
            status: Some(TicketStatus::Resolved),
            response: Some(String::new()),
            assigned_to: None,
        }
        .into();
        assert_eq!(changes.response, Some(None));
        assert_eq!(changes.category, None);
        assert_eq!(changes.status, Some(TicketStatus::Resolved));
        assert!(changes.updated_at.is_some());
    }
}
