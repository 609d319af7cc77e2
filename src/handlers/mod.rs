pub mod auth;
pub mod dashboard;
pub mod export;
pub mod inventory;
pub mod manage;
pub mod tanks;
pub mod uploads;

pub use dashboard::dashboard;

use axum::response::Html;
use askama::Template;
use chrono::NaiveDate;

use crate::{
    aggregate::{aggregate, aggregate_tanks},
    error::AppError,
    filters::format_amount,
    ledger,
    models::{BalanceRecord, ChemTransaction, TankBalance, TransactionRecord},
    state::AppState,
};

pub(crate) fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

pub(crate) async fn current_balances(state: &AppState) -> Result<Vec<BalanceRecord>, AppError> {
    let records = ledger::load_all(&state.db).await?;
    Ok(aggregate(&records))
}

pub(crate) async fn current_tanks(state: &AppState) -> Result<Vec<TankBalance>, AppError> {
    let records = ledger::load_chemical(&state.db).await?;
    Ok(aggregate_tanks(&records, state.catalog()))
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn opt_amount(value: Option<f64>) -> String {
    value.map(format_amount).unwrap_or_default()
}

/// A balance line ready for templates.
pub(crate) struct BalanceRow {
    pub item_code: String,
    pub item_name: String,
    pub category: String,
    pub received: f64,
    pub issued: f64,
    pub balance: f64,
    pub unit: String,
    pub expiry: String,
    pub out_of_stock: bool,
}

impl From<&BalanceRecord> for BalanceRow {
    fn from(b: &BalanceRecord) -> Self {
        Self {
            item_code: b.item_code.clone(),
            item_name: b.item_name.clone(),
            category: b.category.clone(),
            received: b.received,
            issued: b.issued,
            balance: b.balance,
            unit: b.unit.clone(),
            expiry: date_text(b.expiry_date),
            out_of_stock: b.is_out_of_stock(),
        }
    }
}

/// A materials ledger line. Only admin screens render the requester columns.
pub(crate) struct LedgerRow {
    pub id: i64,
    pub date: String,
    pub item_code: String,
    pub item_name: String,
    pub action: &'static str,
    pub quantity: String,
    pub unit: String,
    pub category: String,
    pub expiry: String,
    pub department: String,
    pub requester: String,
    pub remark: String,
    pub upload_time: String,
}

impl From<&TransactionRecord> for LedgerRow {
    fn from(r: &TransactionRecord) -> Self {
        Self {
            id: r.id,
            date: date_text(r.date),
            item_code: r.item_code.clone(),
            item_name: r.item_name.clone(),
            action: r.action_type.as_str(),
            quantity: opt_amount(r.quantity),
            unit: r.unit.clone().unwrap_or_default(),
            category: r.category.clone().unwrap_or_default(),
            expiry: date_text(r.expiry_date),
            department: r.department.clone().unwrap_or_default(),
            requester: r.requester.clone().unwrap_or_default(),
            remark: r.remark.clone().unwrap_or_default(),
            upload_time: r.upload_time.clone(),
        }
    }
}

pub(crate) struct TankLedgerRow {
    pub id: i64,
    pub date: String,
    pub chem_code: String,
    pub chem_desc: String,
    pub action: &'static str,
    pub qty_kg: String,
    pub qty_l: String,
    pub department: String,
    pub requester: String,
    pub remark: String,
    pub upload_time: String,
}

impl From<&ChemTransaction> for TankLedgerRow {
    fn from(r: &ChemTransaction) -> Self {
        Self {
            id: r.id,
            date: date_text(r.date),
            chem_code: r.chem_code.clone(),
            chem_desc: r.chem_desc.clone().unwrap_or_default(),
            action: r.action_type.as_str(),
            qty_kg: opt_amount(r.qty_kg),
            qty_l: opt_amount(r.qty_l),
            department: r.department.clone().unwrap_or_default(),
            requester: r.requester.clone().unwrap_or_default(),
            remark: r.remark.clone().unwrap_or_default(),
            upload_time: r.upload_time.clone(),
        }
    }
}

pub(crate) struct TankRow {
    pub chem_code: String,
    pub description: String,
    pub received_kg: f64,
    pub issued_kg: f64,
    pub balance_kg: f64,
    pub balance_l: f64,
    pub capacity_kg: String,
    pub fill_percent: String,
    /// 0..=100 for the gauge width
    pub gauge: u8,
    pub out_of_stock: bool,
    pub over_capacity: bool,
}

impl From<&TankBalance> for TankRow {
    fn from(t: &TankBalance) -> Self {
        Self {
            chem_code: t.chem_code.clone(),
            description: t.description.clone(),
            received_kg: t.received_kg,
            issued_kg: t.issued_kg,
            balance_kg: t.balance_kg,
            balance_l: t.balance_l,
            capacity_kg: opt_amount(t.capacity_kg),
            fill_percent: t.fill_percent.map(|p| format!("{:.1}%", p)).unwrap_or_default(),
            gauge: t.fill_percent.map(|p| p.clamp(0.0, 100.0).round() as u8).unwrap_or(0),
            out_of_stock: t.is_out_of_stock(),
            over_capacity: t.is_over_capacity(),
        }
    }
}
