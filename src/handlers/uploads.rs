use axum::{extract::State, response::Html};
use axum_extra::extract::Multipart;
use askama::Template;
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    handlers::{current_balances, current_tanks, render},
    intake::{plan_materials, plan_tanks, UnknownCode},
    ledger,
    middleware::authorize,
    models::View,
    state::AppState,
    upload::{parse_material_sheet, parse_tank_sheet, FieldError, SheetKind},
};

struct KindOption {
    value: &'static str,
    label: &'static str,
    headers: String,
}

#[derive(Template)]
#[template(path = "upload.html")]
struct UploadTemplate {
    is_admin: bool,
    kinds: Vec<KindOption>,
    policy: String,
}

struct AdvisoryLine {
    text: String,
    rejected: bool,
}

#[derive(Template)]
#[template(path = "upload_result.html")]
struct UploadResultTemplate {
    is_admin: bool,
    kind_label: &'static str,
    batch_tag: String,
    inserted: usize,
    rejected: usize,
    field_errors: Vec<FieldError>,
    unknown_codes: Vec<UnknownCode>,
    advisories: Vec<AdvisoryLine>,
    ignored_columns: Vec<String>,
}

pub async fn upload_page(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::Upload)?;

    let template = UploadTemplate {
        is_admin: role.is_admin(),
        kinds: SheetKind::ALL
            .iter()
            .map(|kind| KindOption {
                value: kind.form_value(),
                label: kind.label(),
                headers: kind.headers().join(", "),
            })
            .collect(),
        policy: format!("{:?}", state.config.issue_policy).to_lowercase(),
    };

    render(&template)
}

struct UploadForm {
    kind: SheetKind,
    file: Vec<u8>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut kind = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed upload: {}", e)))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("malformed upload: {}", e)))?;

        match name.as_str() {
            "kind" => {
                let value = String::from_utf8_lossy(&data).to_string();
                kind = Some(
                    SheetKind::from_form_value(&value)
                        .ok_or_else(|| AppError::BadRequest(format!("unknown sheet kind {:?}", value)))?,
                );
            }
            "file" if !data.is_empty() => file = Some(data.to_vec()),
            _ => (),
        }
    }

    match (kind, file) {
        (Some(kind), Some(file)) => Ok(UploadForm { kind, file }),
        (None, _) => Err(AppError::BadRequest("sheet kind is required".to_string())),
        (_, None) => Err(AppError::BadRequest("a sheet file is required".to_string())),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    cookies: Cookies,
    multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::Upload)?;
    let UploadForm { kind, file } = read_upload_form(multipart).await?;
    let action = kind.action();
    let policy = state.config.issue_policy;

    let sheet_error = |e: crate::upload::SheetError| AppError::BadRequest(e.to_string());

    let mut result = UploadResultTemplate {
        is_admin: role.is_admin(),
        kind_label: kind.label(),
        batch_tag: String::new(),
        inserted: 0,
        rejected: 0,
        field_errors: Vec::new(),
        unknown_codes: Vec::new(),
        advisories: Vec::new(),
        ignored_columns: Vec::new(),
    };

    let advisories = if kind.is_tank() {
        let sheet = parse_tank_sheet(&file, kind).map_err(sheet_error)?;
        let current = current_tanks(&state).await?;
        let plan = plan_tanks(sheet.rows, action, &current, state.catalog(), policy);

        if !plan.accepted.is_empty() {
            result.batch_tag = ledger::append_chemical(&state.db, &plan.accepted, action).await?;
        }
        result.inserted = plan.accepted.len();
        result.rejected = plan.rejected();
        result.field_errors = sheet.errors;
        result.ignored_columns = sheet.ignored_columns;
        result.unknown_codes = plan.unknown_codes;
        plan.advisories
    } else {
        let sheet = parse_material_sheet(&file, kind).map_err(sheet_error)?;
        let current = current_balances(&state).await?;
        let plan = plan_materials(sheet.rows, action, &current, policy);

        if !plan.accepted.is_empty() {
            result.batch_tag = ledger::append(&state.db, &plan.accepted, action).await?;
        }
        result.inserted = plan.accepted.len();
        result.rejected = plan.rejected();
        result.field_errors = sheet.errors;
        result.ignored_columns = sheet.ignored_columns;
        plan.advisories
    };

    result.advisories = advisories
        .iter()
        .map(|a| AdvisoryLine { text: a.to_string(), rejected: a.is_rejection() })
        .collect();

    if !result.unknown_codes.is_empty() || !result.advisories.is_empty() {
        log::warn!(
            "Upload {:?}: {} unknown codes, {} advisories",
            kind,
            result.unknown_codes.len(),
            result.advisories.len()
        );
    }

    render(&result)
}
