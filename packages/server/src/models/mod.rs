pub mod picture;
pub mod shared;
pub mod user;
