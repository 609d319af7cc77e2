use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDate;

use super::inventory::ActionType;
use crate::catalog::volume_litres;

#[derive(Debug, Clone, FromRow)]
pub struct ChemTransactionRow {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub chem_code: String,
    pub chem_desc: Option<String>,
    pub action_type: String,
    pub qty_kg: Option<f64>,
    pub qty_l: Option<f64>,
    pub density: Option<f64>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
    pub upload_time: String,
}

/// One movement in or out of a chemical tank.
///
/// `density` is the catalog value at insert time and `qty_l` was derived from it then;
/// neither follows later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemTransaction {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub chem_code: String,
    pub chem_desc: Option<String>,
    pub action_type: ActionType,
    pub qty_kg: Option<f64>,
    pub qty_l: Option<f64>,
    pub density: Option<f64>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
    pub upload_time: String,
}

impl ChemTransaction {
    pub fn from_row(row: ChemTransactionRow) -> Result<Self, String> {
        let action_type = row.action_type.parse::<ActionType>()?;
        Ok(Self {
            id: row.id,
            date: row.date,
            chem_code: row.chem_code,
            chem_desc: row.chem_desc,
            action_type,
            qty_kg: row.qty_kg,
            qty_l: row.qty_l,
            density: row.density,
            department: row.department,
            requester: row.requester,
            remark: row.remark,
            upload_time: row.upload_time,
        })
    }
}

/// A parsed tank sheet line. `raw_code` is whatever the sheet said.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewChemTransaction {
    pub date: Option<NaiveDate>,
    pub raw_code: String,
    pub chem_desc: Option<String>,
    pub qty_kg: Option<f64>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
}

/// A tank line whose code has been resolved, ready to append.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TankMovement {
    pub date: Option<NaiveDate>,
    pub chem_code: String,
    pub chem_desc: Option<String>,
    pub qty_kg: Option<f64>,
    /// catalog density when the line was accepted
    pub density: Option<f64>,
    pub department: Option<String>,
    pub requester: Option<String>,
    pub remark: Option<String>,
}

impl TankMovement {
    pub fn qty_l(&self) -> Option<f64> {
        self.qty_kg.map(|kg| volume_litres(kg, self.density))
    }
}

/// Derived per-tank state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankBalance {
    pub chem_code: String,
    pub description: String,
    pub received_kg: f64,
    pub issued_kg: f64,
    pub balance_kg: f64,
    pub balance_l: f64,
    pub capacity_kg: Option<f64>,
    pub fill_percent: Option<f64>,
}

impl TankBalance {
    pub fn is_out_of_stock(&self) -> bool {
        self.balance_kg <= 0.0
    }

    pub fn is_over_capacity(&self) -> bool {
        matches!(self.capacity_kg, Some(cap) if cap > 0.0 && self.balance_kg > cap)
    }
}
