use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::AppError,
    handlers::render,
    middleware::{current_role, AUTH_COOKIE},
    models::Role,
    state::AppState,
    utils::{auth::SESSION_HOURS, create_token, verify_password},
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    is_admin: bool,
    error: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    password: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    if current_role(&cookies, &state.config).is_admin() {
        return Ok(Redirect::to(Role::Admin.home()).into_response());
    }

    let template = LoginTemplate {
        is_admin: false,
        error: String::new(),
    };
    Ok(render(&template)?.into_response())
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if !verify_password(&form.password, &state.config.admin_password_hash) {
        log::warn!("Rejected admin sign-in attempt");
        let template = LoginTemplate {
            is_admin: false,
            error: "รหัสผ่านไม่ถูกต้อง".to_string(),
        };
        return Ok((StatusCode::UNAUTHORIZED, render(&template)?).into_response());
    }

    let token = create_token(Role::Admin, &state.config.jwt_secret)?;

    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(SESSION_HOURS))
        .build();

    cookies.add(cookie);
    log::info!("Admin signed in");

    Ok(Redirect::to(Role::Admin.home()).into_response())
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    cookies.remove(Cookie::build(AUTH_COOKIE).path("/").build());
    Redirect::to("/login")
}

/// `/` lands each role on its own start page.
pub async fn home(State(state): State<AppState>, cookies: Cookies) -> Redirect {
    Redirect::to(current_role(&cookies, &state.config).home())
}
