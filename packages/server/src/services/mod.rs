pub mod picture;
pub mod policy;
pub mod user;
