pub mod permission;

pub use permission::{authorize, current_role, AUTH_COOKIE};
