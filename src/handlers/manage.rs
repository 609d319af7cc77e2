use axum::{
    extract::{Form, Query, State},
    response::{Html, Redirect},
};
use askama::Template;
use serde::Deserialize;
use std::collections::BTreeSet;
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    handlers::{render, LedgerRow, TankLedgerRow},
    ledger::{self, LedgerTable},
    middleware::authorize,
    models::{BatchSummary, View},
    state::AppState,
};

// Rows listed when no batch is selected.
const RECENT_ROWS: usize = 50;

#[derive(Deserialize)]
pub struct ManageQuery {
    batch: Option<String>,
    done: Option<String>,
}

#[derive(Template)]
#[template(path = "manage.html")]
struct ManageTemplate {
    is_admin: bool,
    batches: Vec<BatchSummary>,
    selected: String,
    notice: String,
    materials: Vec<LedgerRow>,
    tanks: Vec<TankLedgerRow>,
}

/// Batch list plus a preview: the selected batch, or the most recent rows.
pub async fn manage_page(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<ManageQuery>,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::Manage)?;

    let selected = params.batch.unwrap_or_default();
    let materials = ledger::load_all(&state.db).await?;
    let tanks = ledger::load_chemical(&state.db).await?;

    let (materials, tanks): (Vec<LedgerRow>, Vec<TankLedgerRow>) = if selected.is_empty() {
        (
            materials.iter().take(RECENT_ROWS).map(LedgerRow::from).collect(),
            tanks.iter().take(RECENT_ROWS).map(TankLedgerRow::from).collect(),
        )
    } else {
        (
            materials.iter().filter(|r| r.upload_time == selected).map(LedgerRow::from).collect(),
            tanks.iter().filter(|r| r.upload_time == selected).map(TankLedgerRow::from).collect(),
        )
    };

    let template = ManageTemplate {
        is_admin: role.is_admin(),
        batches: ledger::batches(&state.db).await?,
        selected,
        notice: params.done.unwrap_or_default(),
        materials,
        tanks,
    };

    render(&template)
}

#[derive(Deserialize)]
pub struct BatchForm {
    upload_time: String,
}

pub async fn delete_batch(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<BatchForm>,
) -> Result<Redirect, AppError> {
    authorize(&cookies, &state, View::Manage)?;

    let batch = form.upload_time.trim();
    if batch.is_empty() {
        return Err(AppError::BadRequest("no batch selected".to_string()));
    }

    let removed = ledger::delete_by_batch(&state.db, batch).await?;
    Ok(Redirect::to(&done_url(&format!("ลบชุด {} แล้ว {} รายการ", batch, removed))))
}

#[derive(Deserialize)]
pub struct RowsForm {
    table: String,
    ids: String,
}

/// Comma or whitespace separated row ids.
fn parse_ids(raw: &str) -> Result<BTreeSet<i64>, AppError> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| AppError::BadRequest(format!("invalid row id {:?}", token)))
        })
        .collect()
}

pub async fn delete_rows(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<RowsForm>,
) -> Result<Redirect, AppError> {
    authorize(&cookies, &state, View::Manage)?;

    let ids = parse_ids(&form.ids)?;
    if ids.is_empty() {
        return Err(AppError::BadRequest("no row ids given".to_string()));
    }

    let table = match form.table.as_str() {
        "materials" => LedgerTable::Materials,
        "tanks" => LedgerTable::Tanks,
        other => return Err(AppError::BadRequest(format!("unknown ledger {:?}", other))),
    };

    let removed = match table {
        LedgerTable::Materials => ledger::delete_by_ids(&state.db, &ids).await?,
        LedgerTable::Tanks => ledger::delete_chemical_by_ids(&state.db, &ids).await?,
    };

    Ok(Redirect::to(&done_url(&format!("ลบ {} รายการจาก {}", removed, table.name()))))
}

fn done_url(message: &str) -> String {
    format!("/manage?done={}", urlencoding::encode(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_commas_and_spaces() {
        let ids = parse_ids("3, 1 2,,5").unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 5]);
        assert!(parse_ids("").unwrap().is_empty());
        assert!(matches!(parse_ids("1, two"), Err(AppError::BadRequest(_))));
    }
}
