use tower_cookies::Cookies;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{Role, View},
    state::AppState,
    utils::verify_token,
};

pub const AUTH_COOKIE: &str = "auth_token";

/// Role of the caller. No cookie, or a cookie that does not verify, means viewer.
pub fn current_role(cookies: &Cookies, config: &AppConfig) -> Role {
    let token = match cookies.get(AUTH_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Role::Viewer,
    };

    match verify_token(&token, &config.jwt_secret) {
        Ok(claims) => claims.role,
        Err(e) => {
            log::debug!("Ignoring invalid session token: {}", e);
            Role::Viewer
        }
    }
}

/// The one capability check each handler performs before doing anything else.
pub fn authorize(cookies: &Cookies, state: &AppState, view: View) -> Result<Role, AppError> {
    decide(current_role(cookies, &state.config), view)
}

fn decide(role: Role, view: View) -> Result<Role, AppError> {
    if role.can(view) {
        Ok(role)
    } else if role == Role::Viewer {
        Err(AppError::LoginRequired)
    } else {
        Err(AppError::Forbidden)
    }
}
