// Uniform pagination for every list endpoint

use diesel::QueryResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use utoipa::{IntoParams, ToSchema};

use crate::db::{DbConnection, DieselPool};
use crate::utils::ApiResult;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Raw pagination parameters. Kept as strings so a malformed value falls
/// back to its default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1
    pub page: Option<String>,
    /// Items per page, 1-100
    pub limit: Option<String>,
    /// Field to sort by (default createdAt)
    pub sort_by: Option<String>,
    /// asc or desc (default desc)
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageQuery::default().into()
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        let page = query
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE)
            .max(1);

        let limit = query
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        let sort_by = query
            .sort_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SORT_FIELD.to_string());

        let sort_order = match query.sort_order.as_deref().map(str::trim) {
            Some(order) if order.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        PageRequest {
            page,
            limit,
            sort_by,
            sort_order,
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn is_ascending(&self) -> bool {
        self.sort_order == SortOrder::Asc
    }
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: &PageRequest, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + request.limit - 1) / request.limit
        };

        Pagination {
            current_page: request.page,
            total_pages,
            total_items,
            items_per_page: request.limit,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Run the count and the page fetch concurrently, each on its own pooled
/// connection, and assemble the envelope.
pub async fn paginate<'p, T, C, CF, F, FF>(
    pool: &'p DieselPool,
    request: &PageRequest,
    count: C,
    fetch: F,
) -> ApiResult<Page<T>>
where
    C: FnOnce(DbConnection<'p>) -> CF,
    CF: Future<Output = QueryResult<i64>>,
    F: FnOnce(DbConnection<'p>) -> FF,
    FF: Future<Output = QueryResult<Vec<T>>>,
{
    let (count_conn, fetch_conn) = tokio::try_join!(pool.get(), pool.get())?;

    let (total_items, items) = tokio::try_join!(count(count_conn), fetch(fetch_conn))?;

    Ok(Page {
        items,
        pagination: Pagination::new(request, total_items),
    })
}

/// Order a boxed query by the requested field, falling back to a default column.
///
/// ```ignore
/// let query = apply_sort!(query, request, created_at, {
///     "name" => name,
///     "code" => code,
/// });
/// ```
#[macro_export]
macro_rules! apply_sort {
    ($query:expr, $request:expr, $default:expr, { $($key:literal => $column:expr),* $(,)? }) => {{
        let ascending = $request.is_ascending();
        match $request.sort_by.as_str() {
            $(
                $key => if ascending {
                    $query.order(diesel::ExpressionMethods::asc($column))
                } else {
                    $query.order(diesel::ExpressionMethods::desc($column))
                },
            )*
            _ => if ascending {
                $query.order(diesel::ExpressionMethods::asc($default))
            } else {
                $query.order(diesel::ExpressionMethods::desc($default))
            },
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let request = PageRequest::from(PageQuery::default());
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        assert_eq!(request.sort_by, "createdAt");
        assert_eq!(request.sort_order, SortOrder::Desc);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_limit_is_capped_at_100() {
        let request = PageRequest::from(query(None, Some("500")));
        assert_eq!(request.limit, 100);
    }

    #[test]
    fn test_page_zero_is_clamped_to_one() {
        let request = PageRequest::from(query(Some("0"), None));
        assert_eq!(request.page, 1);

        let request = PageRequest::from(query(Some("-4"), Some("0")));
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 1);
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let request = PageRequest::from(query(Some("two"), Some("lots")));
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
    }

    #[test]
    fn test_sort_order_parsing() {
        let asc = PageRequest::from(PageQuery {
            sort_by: Some("name".to_string()),
            sort_order: Some("ASC".to_string()),
            ..Default::default()
        });
        assert_eq!(asc.sort_order, SortOrder::Asc);
        assert_eq!(asc.sort_by, "name");

        let fallback = PageRequest::from(PageQuery {
            sort_order: Some("sideways".to_string()),
            ..Default::default()
        });
        assert_eq!(fallback.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_offset() {
        let request = PageRequest::from(query(Some("3"), Some("20")));
        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn test_pagination_envelope() {
        let request = PageRequest::from(query(Some("2"), Some("10")));
        let pagination = Pagination::new(&request, 25);

        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next_page);
        assert!(pagination.has_prev_page);

        let last = Pagination::new(&PageRequest::from(query(Some("3"), Some("10"))), 25);
        assert!(!last.has_next_page);

        let empty = Pagination::new(&PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let value = serde_json::to_value(Pagination::new(&PageRequest::default(), 5)).unwrap();
        assert_eq!(value["currentPage"], 1);
        assert_eq!(value["totalItems"], 5);
        assert_eq!(value["itemsPerPage"], 10);
        assert_eq!(value["hasNextPage"], false);
    }
}
