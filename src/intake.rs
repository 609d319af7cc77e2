//! Decides which parsed lines of an upload go into the ledger.
//!
//! Unknown chemical codes are dropped and reported. Stock checks run against
//! the balance before the upload plus the lines already accepted from the same
//! sheet. Advisories never stop the batch; under [`IssuePolicy::Reject`] an
//! issue line that overdraws its item is left out.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::{
    catalog::ChemicalCatalog,
    config::IssuePolicy,
    models::{ActionType, BalanceRecord, NewChemTransaction, NewTransaction, TankBalance, TankMovement},
    upload::ParsedRow,
};

// Float noise when comparing sums of decimal quantities.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Advisory {
    InsufficientStock {
        line: usize,
        item: String,
        requested: f64,
        available: f64,
        rejected: bool,
    },
    TankOverLimit {
        line: usize,
        chem_code: String,
        resulting_kg: f64,
        capacity_kg: f64,
    },
}

impl Advisory {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Advisory::InsufficientStock { rejected: true, .. })
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::InsufficientStock { line, item, requested, available, rejected } => write!(
                f,
                "line {}: {} requested {:.2} but only {:.2} on hand{}",
                line,
                item,
                requested,
                available,
                if *rejected { " (not recorded)" } else { "" }
            ),
            Advisory::TankOverLimit { line, chem_code, resulting_kg, capacity_kg } => write!(
                f,
                "line {}: tank {} would hold {:.2} kg, above its {:.2} kg capacity",
                line, chem_code, resulting_kg, capacity_kg
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnknownCode {
    pub line: usize,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plan<T> {
    pub accepted: Vec<T>,
    pub advisories: Vec<Advisory>,
    pub unknown_codes: Vec<UnknownCode>,
}

impl<T> Plan<T> {
    pub fn rejected(&self) -> usize {
        self.advisories.iter().filter(|a| a.is_rejection()).count()
    }
}

/// Running on-hand quantities, seeded from the current balances.
struct OnHand<K> {
    levels: HashMap<K, f64>,
}

impl<K: std::hash::Hash + Eq> OnHand<K> {
    fn available(&self, key: &K) -> f64 {
        self.levels.get(key).copied().unwrap_or(0.0)
    }

    fn apply(&mut self, key: K, action: ActionType, quantity: f64) {
        let level = self.levels.entry(key).or_insert(0.0);
        match action {
            ActionType::In => *level += quantity,
            ActionType::Out => *level -= quantity,
        }
    }
}

fn material_key(record: &NewTransaction) -> (String, String) {
    let code = record
        .item_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("-");
    (code.to_string(), record.item_name.clone().unwrap_or_default())
}

pub fn plan_materials(
    rows: Vec<ParsedRow<NewTransaction>>,
    action: ActionType,
    current: &[BalanceRecord],
    policy: IssuePolicy,
) -> Plan<NewTransaction> {
    let mut on_hand = OnHand {
        levels: current
            .iter()
            .map(|b| ((b.item_code.clone(), b.item_name.clone()), b.balance))
            .collect(),
    };
    let mut plan = Plan { accepted: Vec::new(), advisories: Vec::new(), unknown_codes: Vec::new() };

    for ParsedRow { line, record } in rows {
        let key = material_key(&record);
        let quantity = record.quantity.unwrap_or(0.0);

        if action == ActionType::Out {
            let available = on_hand.available(&key);
            if quantity > available + EPSILON {
                let rejected = policy == IssuePolicy::Reject;
                plan.advisories.push(Advisory::InsufficientStock {
                    line,
                    item: format!("{} {}", key.0, key.1).trim().to_string(),
                    requested: quantity,
                    available,
                    rejected,
                });
                if rejected {
                    log::warn!("Rejected issue on line {} for {:?}: {} > {}", line, key, quantity, available);
                    continue;
                }
            }
        }

        on_hand.apply(key, action, quantity);
        plan.accepted.push(record);
    }

    plan
}

pub fn plan_tanks(
    rows: Vec<ParsedRow<NewChemTransaction>>,
    action: ActionType,
    current: &[TankBalance],
    catalog: &ChemicalCatalog,
    policy: IssuePolicy,
) -> Plan<TankMovement> {
    let mut on_hand = OnHand {
        levels: current.iter().map(|t| (t.chem_code.clone(), t.balance_kg)).collect(),
    };
    let mut plan = Plan { accepted: Vec::new(), advisories: Vec::new(), unknown_codes: Vec::new() };

    for ParsedRow { line, record } in rows {
        let tank = match catalog.resolve(&record.raw_code).tank() {
            Some(tank) => tank,
            None => {
                log::warn!("Unknown chemical code {:?} on line {}", record.raw_code, line);
                plan.unknown_codes.push(UnknownCode { line, raw: record.raw_code });
                continue;
            }
        };
        let quantity = record.qty_kg.unwrap_or(0.0);
        let available = on_hand.available(&tank.code);

        match action {
            ActionType::In => {
                if let Some(capacity_kg) = tank.capacity_kg.filter(|c| *c > 0.0) {
                    let resulting_kg = available + quantity;
                    if resulting_kg > capacity_kg + EPSILON {
                        plan.advisories.push(Advisory::TankOverLimit {
                            line,
                            chem_code: tank.code.clone(),
                            resulting_kg,
                            capacity_kg,
                        });
                    }
                }
            }
            ActionType::Out => {
                if quantity > available + EPSILON {
                    let rejected = policy == IssuePolicy::Reject;
                    plan.advisories.push(Advisory::InsufficientStock {
                        line,
                        item: tank.code.clone(),
                        requested: quantity,
                        available,
                        rejected,
                    });
                    if rejected {
                        continue;
                    }
                }
            }
        }

        on_hand.apply(tank.code.clone(), action, quantity);
        plan.accepted.push(TankMovement {
            date: record.date,
            chem_code: tank.code.clone(),
            chem_desc: record.chem_desc.or_else(|| Some(tank.description.clone())),
            qty_kg: record.qty_kg,
            density: Some(tank.density),
            department: record.department,
            requester: record.requester,
            remark: record.remark,
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_tanks;

    fn issue(line: usize, code: &str, qty: f64) -> ParsedRow<NewTransaction> {
        ParsedRow {
            line,
            record: NewTransaction {
                item_code: Some(code.to_string()),
                item_name: Some("Gloves".to_string()),
                quantity: Some(qty),
                ..Default::default()
            },
        }
    }

    fn stock(code: &str, balance: f64) -> BalanceRecord {
        BalanceRecord {
            item_code: code.to_string(),
            item_name: "Gloves".to_string(),
            received: balance.max(0.0),
            issued: 0.0,
            balance,
            unit: String::new(),
            category: "-".to_string(),
            expiry_date: None,
        }
    }

    #[test]
    fn warn_policy_records_overdraw_with_advisory() {
        let plan = plan_materials(
            vec![issue(2, "G", 6.0), issue(3, "G", 6.0)],
            ActionType::Out,
            &[stock("G", 10.0)],
            IssuePolicy::Warn,
        );
        assert_eq!(plan.accepted.len(), 2);
        assert_eq!(plan.advisories.len(), 1);
        match &plan.advisories[0] {
            Advisory::InsufficientStock { line, available, rejected, .. } => {
                assert_eq!(*line, 3);
                assert_eq!(*available, 4.0);
                assert!(!rejected);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(plan.rejected(), 0);
    }

    #[test]
    fn reject_policy_drops_only_the_overdrawing_line() {
        let plan = plan_materials(
            vec![issue(2, "G", 6.0), issue(3, "G", 6.0), issue(4, "G", 4.0)],
            ActionType::Out,
            &[stock("G", 10.0)],
            IssuePolicy::Reject,
        );
        let quantities: Vec<f64> = plan.accepted.iter().map(|r| r.quantity.unwrap()).collect();
        assert_eq!(quantities, vec![6.0, 4.0]);
        assert_eq!(plan.rejected(), 1);
    }

    #[test]
    fn receipts_never_raise_stock_advisories() {
        let plan = plan_materials(vec![issue(2, "NEW", 5.0)], ActionType::In, &[], IssuePolicy::Reject);
        assert_eq!(plan.accepted.len(), 1);
        assert!(plan.advisories.is_empty());
    }

    fn tank_row(line: usize, raw: &str, kg: f64) -> ParsedRow<NewChemTransaction> {
        ParsedRow {
            line,
            record: NewChemTransaction {
                raw_code: raw.to_string(),
                qty_kg: Some(kg),
                ..Default::default()
            },
        }
    }

    #[test]
    fn unknown_codes_are_reported_and_known_rows_still_accepted() {
        let catalog = ChemicalCatalog::default();
        let current = aggregate_tanks(&[], &catalog);
        let plan = plan_tanks(
            vec![
                tank_row(2, "T11-2005A", 152.0),
                tank_row(3, "unknown-xyz", 10.0),
                tank_row(4, "สารละลายโซดาไฟ", 10.0),
            ],
            ActionType::In,
            &current,
            &catalog,
            IssuePolicy::Warn,
        );

        assert_eq!(plan.unknown_codes, vec![UnknownCode { line: 3, raw: "unknown-xyz".to_string() }]);
        assert_eq!(plan.accepted.len(), 2);
        assert!(plan.accepted.iter().all(|m| m.chem_code == "T11-2005A"));
        assert_eq!(plan.accepted[0].density, Some(1.52));
        assert!((plan.accepted[0].qty_l().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(plan.accepted[0].chem_desc.as_deref(), Some("Sodium hydroxide 50%"));
    }

    #[test]
    fn receipt_above_capacity_is_advisory_only() {
        let catalog = ChemicalCatalog::default();
        let current = aggregate_tanks(&[], &catalog);
        let plan = plan_tanks(
            vec![tank_row(2, "T11-2007", 10_000.0), tank_row(3, "T11-2007", 10_000.0)],
            ActionType::In,
            &current,
            &catalog,
            IssuePolicy::Reject,
        );
        assert_eq!(plan.accepted.len(), 2);
        assert!(matches!(
            plan.advisories.as_slice(),
            [Advisory::TankOverLimit { line: 3, .. }]
        ));
    }

    #[test]
    fn tank_issue_beyond_balance_follows_policy() {
        let catalog = ChemicalCatalog::default();
        let current = aggregate_tanks(&[], &catalog);
        let rows = || vec![tank_row(2, "T11-2006", 5.0)];

        let warned = plan_tanks(rows(), ActionType::Out, &current, &catalog, IssuePolicy::Warn);
        assert_eq!(warned.accepted.len(), 1);
        let rejected = plan_tanks(rows(), ActionType::Out, &current, &catalog, IssuePolicy::Reject);
        assert!(rejected.accepted.is_empty());
        assert_eq!(rejected.rejected(), 1);
    }
}
