pub mod config;
pub mod review_status;
pub mod storage;
pub mod user_role;

pub use review_status::ReviewStatus;
pub use user_role::UserRole;
