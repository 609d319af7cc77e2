use axum::{extract::State, response::Html};
use askama::Template;
use chrono::{Local, NaiveDate};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    filters,
    handlers::{current_balances, current_tanks, render},
    middleware::authorize,
    models::{BalanceRecord, View},
    report::{expiry_alerts, out_of_stock_count},
    state::AppState,
};

struct AlertRow {
    item_code: String,
    item_name: String,
    balance: f64,
    unit: String,
    expiry: String,
    /// negative once expired
    days_left: i64,
}

impl AlertRow {
    fn new(b: &BalanceRecord, today: NaiveDate) -> Self {
        Self {
            item_code: b.item_code.clone(),
            item_name: b.item_name.clone(),
            balance: b.balance,
            unit: b.unit.clone(),
            expiry: b.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
            days_left: b.expiry_date.map(|d| (d - today).num_days()).unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    is_admin: bool,
    today: String,
    total_items: usize,
    out_of_stock: usize,
    tank_count: usize,
    tanks_over_capacity: usize,
    window_days: i64,
    expired: Vec<AlertRow>,
    expiring: Vec<AlertRow>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let role = authorize(&cookies, &state, View::Dashboard)?;

    let balances = current_balances(&state).await?;
    let tanks = current_tanks(&state).await?;
    let today = Local::now().date_naive();
    let window_days = state.config.expiry_warning_days;
    let alerts = expiry_alerts(&balances, today, window_days);

    let template = DashboardTemplate {
        is_admin: role.is_admin(),
        today: today.to_string(),
        total_items: balances.len(),
        out_of_stock: out_of_stock_count(&balances),
        tank_count: tanks.len(),
        tanks_over_capacity: tanks.iter().filter(|t| t.is_over_capacity()).count(),
        window_days,
        expired: alerts.expired.iter().map(|b| AlertRow::new(b, today)).collect(),
        expiring: alerts.expiring.iter().map(|b| AlertRow::new(b, today)).collect(),
    };

    render(&template)
}
