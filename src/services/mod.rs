// Business logic that spans more than one model

pub mod accounts;
pub mod coupon;
pub mod jwt;
pub mod purchase;
pub mod verification;
pub mod wallet;

pub use accounts::{AccountDirectory, AccountStanding, PgAccountDirectory};
pub use coupon::CouponService;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use purchase::PurchaseService;
pub use verification::{VerificationError, VerificationService};
pub use wallet::WalletService;
