use axum::{extract::State, response::Html};
use askama::Template;
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    filters,
    handlers::{current_tanks, render, TankRow},
    middleware::authorize,
    models::View,
    state::AppState,
};

#[derive(Template)]
#[template(path = "tanks.html")]
struct TanksTemplate {
    is_admin: bool,
    tanks: Vec<TankRow>,
}

pub async fn tanks(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::Tanks)?;
    let tanks = current_tanks(&state).await?;

    let template = TanksTemplate {
        is_admin: role.is_admin(),
        tanks: tanks.iter().map(TankRow::from).collect(),
    };

    render(&template)
}
