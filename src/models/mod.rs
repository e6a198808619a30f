/// Declare an enum persisted as text, with serde, FromStr and diesel conversions
/// derived from one variant-to-string table.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            utoipa::ToSchema,
            diesel::expression::AsExpression,
            diesel::deserialize::FromSqlRow,
        )]
        #[diesel(sql_type = diesel::sql_types::Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "Invalid {} '{}', expected one of: {}",
                        stringify!($name),
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for $name
        where
            DB: diesel::backend::Backend,
            String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
        {
            fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
                let value = String::from_sql(bytes)?;
                <Self as std::str::FromStr>::from_str(&value).map_err(|e| e.into())
            }
        }

        impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for $name
        where
            DB: diesel::backend::Backend,
            str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
        {
            fn to_sql<'b>(
                &'b self,
                out: &mut diesel::serialize::Output<'b, '_, DB>,
            ) -> diesel::serialize::Result {
                self.as_str().to_sql(out)
            }
        }
    };
}

pub mod application;
pub mod auth;
pub mod catalog;
pub mod coupon;
pub mod page_information;
pub mod pagination;
pub mod purchase;
pub mod response;
pub mod support_ticket;
pub mod user;
pub mod wallet;

/// Parse an optional query-string filter into its typed form
pub fn parse_filter<T>(raw: Option<&str>) -> Result<Option<T>, crate::utils::ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(crate::utils::ApiError::BadRequest),
        None => Ok(None),
    }
}

/// Shared Active/Inactive flag for catalog records
text_enum! {
    RecordStatus {
        Active => "Active",
        Inactive => "Inactive",
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Active
    }
}

pub use application::*;
pub use auth::AccessTokenClaims;
pub use catalog::*;
pub use coupon::*;
pub use page_information::*;
pub use pagination::{Page, PageQuery, PageRequest, Pagination, SortOrder};
pub use purchase::*;
pub use response::ApiResponse;
pub use support_ticket::*;
pub use user::*;
pub use wallet::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_text_enum_round_trip() {
        for status in RecordStatus::ALL {
            assert_eq!(RecordStatus::from_str(status.as_str()), Ok(*status));
        }
        assert!(RecordStatus::from_str("active").is_err());
    }

    #[test]
    fn test_text_enum_serde_uses_storage_text() {
        let json = serde_json::to_string(&RecordStatus::Inactive).unwrap();
        assert_eq!(json, "\"Inactive\"");
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter::<RecordStatus>(None).unwrap(), None);
        assert_eq!(parse_filter::<RecordStatus>(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_filter::<RecordStatus>(Some("Active")).unwrap(),
            Some(RecordStatus::Active)
        );
        assert!(parse_filter::<RecordStatus>(Some("Gone")).is_err());
    }
}
