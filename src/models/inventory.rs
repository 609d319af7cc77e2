use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// Direction of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionType {
    In,
    Out,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::In => "In",
            ActionType::Out => "Out",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    // Older snapshots wrote "in"/"IN"/" Out ", so casing and padding are forgiven.
    // Anything else is not a direction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("in") {
            Ok(ActionType::In)
        } else if trimmed.eq_ignore_ascii_case("out") {
            Ok(ActionType::Out)
        } else {
            Err(trimmed.to_string())
        }
    }
}

/// Raw row of the `transactions` table, before the direction is checked.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub action_type: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
    pub upload_time: String,
}

/// One received or issued line of the materials ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub item_code: String,
    pub item_name: String,
    pub action_type: ActionType,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
    pub upload_time: String,
}

impl TransactionRecord {
    pub fn from_row(row: TransactionRow) -> Result<Self, String> {
        let action_type = row.action_type.parse::<ActionType>()?;
        Ok(Self {
            id: row.id,
            date: row.date,
            item_code: row.item_code.unwrap_or_else(|| "-".to_string()),
            item_name: row.item_name.unwrap_or_default(),
            action_type,
            quantity: row.quantity,
            unit: row.unit,
            category: row.category,
            expiry_date: row.expiry_date,
            department: row.department,
            requester: row.requester,
            remark: row.remark,
            upload_time: row.upload_time,
        })
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.item_code, &self.item_name)
    }
}

/// A line parsed from an upload, not yet assigned an id, direction or batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: Option<NaiveDate>,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
}

/// Derived per-item state. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub item_code: String,
    pub item_name: String,
    pub received: f64,
    pub issued: f64,
    pub balance: f64,
    pub unit: String,
    pub category: String,
    pub expiry_date: Option<NaiveDate>,
}

impl BalanceRecord {
    pub fn is_out_of_stock(&self) -> bool {
        self.balance <= 0.0
    }
}

/// An upload batch as listed on the manage screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BatchSummary {
    pub upload_time: String,
    pub material_rows: i64,
    pub tank_rows: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_parses_loosely_but_rejects_other_values() {
        assert_eq!("In".parse::<ActionType>(), Ok(ActionType::In));
        assert_eq!(" out ".parse::<ActionType>(), Ok(ActionType::Out));
        assert_eq!("IN".parse::<ActionType>(), Ok(ActionType::In));
        assert_eq!("Transfer".parse::<ActionType>(), Err("Transfer".to_string()));
        assert!("".parse::<ActionType>().is_err());
    }

    #[test]
    fn missing_item_code_reads_as_dash() {
        let row = TransactionRow {
            id: 7,
            date: None,
            item_code: None,
            item_name: Some("Gloves".to_string()),
            action_type: "In".to_string(),
            quantity: Some(3.0),
            unit: None,
            category: None,
            expiry_date: None,
            department: None,
            requester: None,
            remark: None,
            upload_time: "2024-01-01 08:00:00".to_string(),
        };
        let record = TransactionRecord::from_row(row).unwrap();
        assert_eq!(record.key(), ("-", "Gloves"));
    }
}
