pub mod picture;
pub mod user;
