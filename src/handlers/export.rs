use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    export::{balances_csv, ledger_csv, tanks_csv},
    handlers::{current_balances, current_tanks, inventory::MaterialsQuery},
    ledger,
    middleware::authorize,
    models::View,
    report::filter_balances,
    state::AppState,
};

fn csv_response(file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        body,
    )
        .into_response()
}

pub async fn export_materials(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<MaterialsQuery>,
) -> Result<Response, AppError> {
    authorize(&cookies, &state, View::ExportBalances)?;

    let balances = current_balances(&state).await?;
    let shown = filter_balances(&balances, params.category(), params.query());
    Ok(csv_response("materials.csv", balances_csv(&shown)?))
}

#[derive(Deserialize)]
pub struct LedgerExportQuery {
    date: Option<String>,
}

pub async fn export_ledger(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(params): Query<LedgerExportQuery>,
) -> Result<Response, AppError> {
    authorize(&cookies, &state, View::ExportLedger)?;

    let day = match params.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::BadRequest(format!("invalid date {:?}", raw)))?,
        ),
        None => None,
    };

    let mut records = ledger::load_all(&state.db).await?;
    let file_name = match day {
        Some(d) => {
            records.retain(|r| r.date == Some(d));
            format!("ledger-{}.csv", d)
        }
        None => "ledger.csv".to_string(),
    };

    Ok(csv_response(&file_name, ledger_csv(&records)?))
}

pub async fn export_tanks(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    authorize(&cookies, &state, View::ExportTanks)?;

    let tanks = current_tanks(&state).await?;
    Ok(csv_response("tanks.csv", tanks_csv(&tanks)?))
}
