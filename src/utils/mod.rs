pub mod auth;

pub use auth::{create_token, verify_password, verify_token};
