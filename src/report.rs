//! Read-side views over balances and ledger rows: alerts, filters, searches.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

use crate::models::{ActionType, BalanceRecord, TransactionRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpiryAlerts {
    pub expired: Vec<BalanceRecord>,
    pub expiring: Vec<BalanceRecord>,
}

/// Items still in stock whose earliest expiry has passed or falls within `window_days`.
pub fn expiry_alerts(balances: &[BalanceRecord], today: NaiveDate, window_days: i64) -> ExpiryAlerts {
    let horizon = Duration::try_days(window_days)
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX);
    let mut alerts = ExpiryAlerts::default();

    for balance in balances.iter().filter(|b| b.balance > 0.0) {
        match balance.expiry_date {
            Some(expiry) if expiry < today => alerts.expired.push(balance.clone()),
            Some(expiry) if expiry <= horizon => alerts.expiring.push(balance.clone()),
            _ => {}
        }
    }

    alerts.expired.sort_by_key(|b| b.expiry_date);
    alerts.expiring.sort_by_key(|b| b.expiry_date);
    alerts
}

pub fn out_of_stock_count(balances: &[BalanceRecord]) -> usize {
    balances.iter().filter(|b| b.is_out_of_stock()).count()
}

/// Sorted distinct categories, without the "-" placeholder.
pub fn categories(balances: &[BalanceRecord]) -> Vec<String> {
    balances
        .iter()
        .map(|b| b.category.as_str())
        .filter(|c| *c != "-")
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn normalized_query(query: Option<&str>) -> Option<String> {
    query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase)
}

fn balance_matches(balance: &BalanceRecord, needle: &str) -> bool {
    let expiry = balance.expiry_date.map(|d| d.to_string()).unwrap_or_default();
    [
        balance.item_code.as_str(),
        balance.item_name.as_str(),
        balance.category.as_str(),
        balance.unit.as_str(),
        expiry.as_str(),
    ]
    .iter()
    .any(|field| contains_ci(field, needle))
        || [balance.received, balance.issued, balance.balance]
            .iter()
            .any(|n| n.to_string().contains(needle))
}

/// Category is an exact match; the query is a case-insensitive substring of any column.
pub fn filter_balances(
    balances: &[BalanceRecord],
    category: Option<&str>,
    query: Option<&str>,
) -> Vec<BalanceRecord> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let needle = normalized_query(query);

    balances
        .iter()
        .filter(|b| category.map_or(true, |c| b.category == c))
        .filter(|b| needle.as_deref().map_or(true, |n| balance_matches(b, n)))
        .cloned()
        .collect()
}

fn record_matches(record: &TransactionRecord, needle: &str) -> bool {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let fields = [
        record.id.to_string(),
        record.date.map(|d| d.to_string()).unwrap_or_default(),
        record.item_code.clone(),
        record.item_name.clone(),
        record.action_type.to_string(),
        record.quantity.map(|q| q.to_string()).unwrap_or_default(),
        opt(&record.unit),
        opt(&record.category),
        record.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
        opt(&record.department),
        opt(&record.requester),
        opt(&record.remark),
        record.upload_time.clone(),
    ];
    fields.iter().any(|f| contains_ci(f, needle))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerSums {
    pub received: f64,
    pub issued: f64,
}

impl LedgerSums {
    pub fn of<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> Self {
        records.into_iter().fold(LedgerSums::default(), |mut sums, r| {
            let q = r.quantity.unwrap_or(0.0);
            match r.action_type {
                ActionType::In => sums.received += q,
                ActionType::Out => sums.issued += q,
            }
            sums
        })
    }

    pub fn net(&self) -> f64 {
        self.received - self.issued
    }
}

/// Ledger rows with the query in any column. An empty query matches nothing.
pub fn search_ledger<'a>(records: &'a [TransactionRecord], query: &str) -> Vec<&'a TransactionRecord> {
    match normalized_query(Some(query)) {
        Some(needle) => records.iter().filter(|r| record_matches(r, &needle)).collect(),
        None => Vec::new(),
    }
}

/// Rows of one day (or all rows), split into receipts and issues.
pub fn daily_split(
    records: &[TransactionRecord],
    day: Option<NaiveDate>,
) -> (Vec<&TransactionRecord>, Vec<&TransactionRecord>) {
    records
        .iter()
        .filter(|r| day.map_or(true, |d| r.date == Some(d)))
        .partition(|r| r.action_type == ActionType::In)
}
