//! Folds the ledgers into current per-item and per-tank state.
//!
//! Everything here is pure. Results depend only on the set of records passed
//! in, never on their order: "most recent" means greatest `(date, id)` with
//! undated rows oldest, and "earliest expiry" is the minimum date.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::{
    catalog::{volume_litres, ChemicalCatalog},
    models::{ActionType, BalanceRecord, ChemTransaction, TankBalance, TransactionRecord},
};

/// Category values that carry no information.
const EMPTY_CATEGORIES: [&str; 3] = ["", "-", "None"];

pub fn is_meaningful_category(category: Option<&str>) -> bool {
    match category {
        Some(c) => !EMPTY_CATEGORIES.contains(&c.trim()),
        None => false,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Totals {
    received: f64,
    issued: f64,
}

impl Totals {
    fn add(&mut self, action: ActionType, quantity: Option<f64>) {
        let quantity = quantity.filter(|q| q.is_finite()).unwrap_or(0.0);
        match action {
            ActionType::In => self.received += quantity,
            ActionType::Out => self.issued += quantity,
        }
    }

    fn balance(&self) -> f64 {
        self.received - self.issued
    }
}

fn recency(record: &TransactionRecord) -> (Option<NaiveDate>, i64) {
    (record.date, record.id)
}

/// One balance per (item_code, item_name), ordered by that key.
pub fn aggregate(records: &[TransactionRecord]) -> Vec<BalanceRecord> {
    let mut partitions: BTreeMap<(&str, &str), Vec<&TransactionRecord>> = BTreeMap::new();
    for record in records {
        partitions.entry(record.key()).or_default().push(record);
    }

    partitions
        .into_iter()
        .map(|((item_code, item_name), rows)| {
            let mut totals = Totals::default();
            for row in &rows {
                totals.add(row.action_type, row.quantity);
            }

            let unit = rows
                .iter()
                .max_by_key(|r| recency(r))
                .and_then(|r| r.unit.clone())
                .unwrap_or_default();

            let category = rows
                .iter()
                .filter(|r| is_meaningful_category(r.category.as_deref()))
                .max_by_key(|r| recency(r))
                .and_then(|r| r.category.as_deref())
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| "-".to_string());

            let expiry_date = rows
                .iter()
                .filter(|r| r.action_type == ActionType::In)
                .filter_map(|r| r.expiry_date)
                .min();

            BalanceRecord {
                item_code: item_code.to_string(),
                item_name: item_name.to_string(),
                received: totals.received,
                issued: totals.issued,
                balance: totals.balance(),
                unit,
                category,
                expiry_date,
            }
        })
        .collect()
}

/// One balance per tank: every catalog tank in catalog order, then any
/// other code found in the ledger, sorted.
pub fn aggregate_tanks(records: &[ChemTransaction], catalog: &ChemicalCatalog) -> Vec<TankBalance> {
    let mut totals: BTreeMap<&str, (Totals, f64)> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.chem_code.as_str()).or_default();
        entry.0.add(record.action_type, record.qty_kg);

        let litres = record.qty_l.filter(|l| l.is_finite()).unwrap_or_else(|| {
            let density = record.density.or_else(|| catalog.density(&record.chem_code));
            record.qty_kg.map_or(0.0, |kg| volume_litres(kg, density))
        });
        match record.action_type {
            ActionType::In => entry.1 += litres,
            ActionType::Out => entry.1 -= litres,
        }
    }

    let mut codes: Vec<&str> = catalog.tanks.iter().map(|t| t.code.as_str()).collect();
    codes.extend(totals.keys().copied().filter(|code| catalog.tank(code).is_none()));

    codes
        .into_iter()
        .map(|code| {
            let (sums, balance_l) = totals.get(code).copied().unwrap_or_default();
            let tank = catalog.tank(code);
            let description = tank
                .map(|t| t.description.clone())
                .or_else(|| {
                    records
                        .iter()
                        .filter(|r| r.chem_code == code)
                        .find_map(|r| r.chem_desc.clone())
                })
                .unwrap_or_default();
            let capacity_kg = tank.and_then(|t| t.capacity_kg);
            let fill_percent = capacity_kg
                .filter(|cap| *cap > 0.0)
                .map(|cap| sums.balance() / cap * 100.0);

            TankBalance {
                chem_code: code.to_string(),
                description,
                received_kg: sums.received,
                issued_kg: sums.issued,
                balance_kg: sums.balance(),
                balance_l,
                capacity_kg,
                fill_percent,
            }
        })
        .collect()
}
