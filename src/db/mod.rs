pub mod diesel_pool;

pub use diesel_pool::{
    check_diesel_health, create_diesel_pool, create_unchecked_pool, mask_connection_string,
    DbConnection, DieselDatabaseConfig, DieselPool, MIGRATIONS,
};
