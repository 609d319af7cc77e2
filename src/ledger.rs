//! Ledger store: append-only materials and tank tables, tagged by upload batch.
//!
//! Every write runs inside one transaction, so a batch is either fully
//! visible or not at all. Rows are never updated in place.

use chrono::{Duration, Local, NaiveDateTime};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::BTreeSet;

use crate::{
    database::Database,
    error::StoreError,
    models::{
        ActionType, BatchSummary, ChemTransaction, ChemTransactionRow, NewTransaction,
        TankMovement, TransactionRecord, TransactionRow,
    },
};

pub const BATCH_TAG_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Stays well under SQLite's bound-parameter limit.
const DELETE_CHUNK: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerTable {
    Materials,
    Tanks,
}

impl LedgerTable {
    pub const ALL: [LedgerTable; 2] = [LedgerTable::Materials, LedgerTable::Tanks];

    pub fn name(self) -> &'static str {
        match self {
            LedgerTable::Materials => "transactions",
            LedgerTable::Tanks => "chem_transactions",
        }
    }
}

pub async fn append(
    db: &Database,
    records: &[NewTransaction],
    action: ActionType,
) -> Result<String, StoreError> {
    append_at(db, records, action, Local::now().naive_local()).await
}

/// Appends one batch of material lines stamped with a tag derived from `now`.
pub async fn append_at(
    db: &Database,
    records: &[NewTransaction],
    action: ActionType,
    now: NaiveDateTime,
) -> Result<String, StoreError> {
    let mut tx = db.begin().await?;
    let tag = claim_batch_tag(&mut tx, now).await?;

    for record in records {
        let item_code = record
            .item_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or("-");

        sqlx::query(
            r#"
            INSERT INTO transactions (
                date, item_code, item_name, action_type, quantity, unit, category,
                expiry_date, department, requester, remark, upload_time
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.date)
        .bind(item_code)
        .bind(&record.item_name)
        .bind(action.as_str())
        .bind(record.quantity)
        .bind(&record.unit)
        .bind(&record.category)
        .bind(record.expiry_date)
        .bind(&record.department)
        .bind(&record.requester)
        .bind(&record.remark)
        .bind(&tag)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    log::info!("Appended {} '{}' material rows as batch {}", records.len(), action, tag);
    Ok(tag)
}

pub async fn append_chemical(
    db: &Database,
    records: &[TankMovement],
    action: ActionType,
) -> Result<String, StoreError> {
    append_chemical_at(db, records, action, Local::now().naive_local()).await
}

pub async fn append_chemical_at(
    db: &Database,
    records: &[TankMovement],
    action: ActionType,
    now: NaiveDateTime,
) -> Result<String, StoreError> {
    let mut tx = db.begin().await?;
    let tag = claim_batch_tag(&mut tx, now).await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO chem_transactions (
                date, chem_code, chem_desc, action_type, qty_kg, qty_l, density,
                department, requester, remark, upload_time
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.date)
        .bind(&record.chem_code)
        .bind(&record.chem_desc)
        .bind(action.as_str())
        .bind(record.qty_kg)
        .bind(record.qty_l())
        .bind(record.density)
        .bind(&record.department)
        .bind(&record.requester)
        .bind(&record.remark)
        .bind(&tag)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    log::info!("Appended {} '{}' tank rows as batch {}", records.len(), action, tag);
    Ok(tag)
}

/// Picks the first free tag at or after `now`, looking at both ledgers.
async fn claim_batch_tag(
    tx: &mut Transaction<'_, Sqlite>,
    mut now: NaiveDateTime,
) -> Result<String, StoreError> {
    loop {
        let tag = now.format(BATCH_TAG_FORMAT).to_string();
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM transactions WHERE upload_time = ?)
                 + (SELECT COUNT(*) FROM chem_transactions WHERE upload_time = ?)
            "#,
        )
        .bind(&tag)
        .bind(&tag)
        .fetch_one(&mut **tx)
        .await?;

        if taken == 0 {
            return Ok(tag);
        }
        now += Duration::seconds(1);
    }
}

async fn table_exists(db: &Database, table: LedgerTable) -> Result<bool, StoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
    )
    .bind(table.name())
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

/// Every material row, newest `date` first, then newest id. Rows without a date come last.
pub async fn load_all(db: &Database) -> Result<Vec<TransactionRecord>, StoreError> {
    if !table_exists(db, LedgerTable::Materials).await? {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT * FROM transactions ORDER BY date DESC, id DESC"
    )
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| {
            let id = row.id;
            TransactionRecord::from_row(row).map_err(|value| StoreError::UnknownAction {
                table: LedgerTable::Materials.name(),
                id,
                value,
            })
        })
        .collect()
}

pub async fn load_chemical(db: &Database) -> Result<Vec<ChemTransaction>, StoreError> {
    if !table_exists(db, LedgerTable::Tanks).await? {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, ChemTransactionRow>(
        "SELECT * FROM chem_transactions ORDER BY date DESC, id DESC"
    )
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|row| {
            let id = row.id;
            ChemTransaction::from_row(row).map_err(|value| StoreError::UnknownAction {
                table: LedgerTable::Tanks.name(),
                id,
                value,
            })
        })
        .collect()
}

/// Removes material rows by id. Ids that do not exist are ignored.
pub async fn delete_by_ids(db: &Database, ids: &BTreeSet<i64>) -> Result<u64, StoreError> {
    delete_ids_from(db, LedgerTable::Materials, ids).await
}

pub async fn delete_chemical_by_ids(db: &Database, ids: &BTreeSet<i64>) -> Result<u64, StoreError> {
    delete_ids_from(db, LedgerTable::Tanks, ids).await
}

async fn delete_ids_from(
    db: &Database,
    table: LedgerTable,
    ids: &BTreeSet<i64>,
) -> Result<u64, StoreError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let ids: Vec<i64> = ids.iter().copied().collect();
    let mut tx = db.begin().await?;
    let mut removed = 0;

    for chunk in ids.chunks(DELETE_CHUNK) {
        let mut query = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE id IN (", table.name()));
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        removed += query.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    log::info!("Deleted {} rows from {} by id", removed, table.name());
    Ok(removed)
}

/// Undo: removes every row of the batch from both ledgers, or nothing.
pub async fn delete_by_batch(db: &Database, batch: &str) -> Result<u64, StoreError> {
    let mut tx = db.begin().await?;
    let mut removed = 0;

    for table in LedgerTable::ALL {
        removed += sqlx::query(&format!("DELETE FROM {} WHERE upload_time = ?", table.name()))
            .bind(batch)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    log::info!("Deleted batch {} ({} rows)", batch, removed);
    Ok(removed)
}

/// Distinct batch tags across both ledgers, newest first.
pub async fn batches(db: &Database) -> Result<Vec<BatchSummary>, StoreError> {
    let batches = sqlx::query_as::<_, BatchSummary>(
        r#"
        SELECT upload_time,
               SUM(material) AS material_rows,
               SUM(tank) AS tank_rows
        FROM (
            SELECT upload_time, 1 AS material, 0 AS tank FROM transactions
            UNION ALL
            SELECT upload_time, 0 AS material, 1 AS tank FROM chem_transactions
        )
        GROUP BY upload_time
        ORDER BY upload_time DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::database::{empty_memory_pool, memory_pool};
    use chrono::NaiveDate;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, BATCH_TAG_FORMAT).unwrap()
    }

    fn day(s: &str) -> Option<NaiveDate> {
        Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    fn line(code: Option<&str>, name: &str, qty: f64, date: Option<NaiveDate>) -> NewTransaction {
        NewTransaction {
            date,
            item_code: code.map(str::to_string),
            item_name: Some(name.to_string()),
            quantity: Some(qty),
            unit: Some("pcs".to_string()),
            ..Default::default()
        }
    }

    fn tank_line(code: &str, kg: f64) -> TankMovement {
        TankMovement {
            date: day("2024-02-01"),
            chem_code: code.to_string(),
            qty_kg: Some(kg),
            density: Some(1.52),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn append_stamps_one_batch_and_defaults_item_code() {
        let db = memory_pool().await;
        let records = vec![
            line(Some("A-1"), "Gloves", 10.0, day("2024-01-01")),
            line(None, "Masks", 5.0, day("2024-01-02")),
            line(Some("  "), "Tape", 1.0, None),
        ];

        let tag = append_at(&db, &records, ActionType::In, at("2024-03-01 09:00:00")).await.unwrap();
        assert_eq!(tag, "2024-03-01 09:00:00");

        let rows = load_all(&db).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.upload_time == tag && r.action_type == ActionType::In));
        assert_eq!(rows.iter().filter(|r| r.item_code == "-").count(), 2);
    }

    #[tokio::test]
    async fn load_all_orders_by_date_then_id_descending() {
        let db = memory_pool().await;
        let records = vec![
            line(Some("A"), "a", 1.0, day("2024-01-01")),
            line(Some("B"), "b", 1.0, None),
            line(Some("C"), "c", 1.0, day("2024-01-05")),
            line(Some("D"), "d", 1.0, day("2024-01-01")),
        ];
        append_at(&db, &records, ActionType::In, at("2024-03-01 09:00:00")).await.unwrap();

        let codes: Vec<String> = load_all(&db).await.unwrap().into_iter().map(|r| r.item_code).collect();
        assert_eq!(codes, vec!["C", "D", "A", "B"]);
    }

    #[tokio::test]
    async fn load_all_on_uninitialized_store_is_empty() {
        let db = empty_memory_pool().await;
        assert!(load_all(&db).await.unwrap().is_empty());
        assert!(load_chemical(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn colliding_batch_tags_are_advanced() {
        let db = memory_pool().await;
        let now = at("2024-03-01 09:00:00");
        let first = append_at(&db, &[line(Some("A"), "a", 1.0, None)], ActionType::In, now).await.unwrap();
        let second = append_chemical_at(&db, &[tank_line("T11-2005A", 10.0)], ActionType::In, now).await.unwrap();
        let third = append_at(&db, &[line(Some("A"), "a", 1.0, None)], ActionType::Out, now).await.unwrap();

        assert_eq!(first, "2024-03-01 09:00:00");
        assert_eq!(second, "2024-03-01 09:00:01");
        assert_eq!(third, "2024-03-01 09:00:02");
    }

    #[tokio::test]
    async fn failed_batch_leaves_nothing_behind() {
        let db = memory_pool().await;
        let mut bad = line(Some("B"), "b", 1.0, None);
        bad.quantity = Some(-4.0);
        let records = vec![line(Some("A"), "a", 1.0, None), bad];

        let result = append_at(&db, &records, ActionType::In, at("2024-03-01 09:00:00")).await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert!(load_all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_store_is_a_persistence_error() {
        let db = memory_pool().await;
        db.close().await;
        let result = append(&db, &[line(Some("A"), "a", 1.0, None)], ActionType::In).await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));
    }

    #[tokio::test]
    async fn delete_by_ids_ignores_missing_ids() {
        let db = memory_pool().await;
        let records = vec![
            line(Some("A"), "a", 1.0, None),
            line(Some("B"), "b", 1.0, None),
        ];
        append_at(&db, &records, ActionType::In, at("2024-03-01 09:00:00")).await.unwrap();
        let first_id = load_all(&db).await.unwrap().iter().map(|r| r.id).min().unwrap();

        let removed = delete_by_ids(&db, &BTreeSet::from([first_id, 9_999])).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(load_all(&db).await.unwrap().len(), 1);
        assert_eq!(delete_by_ids(&db, &BTreeSet::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_by_batch_restores_previous_balance_in_both_ledgers() {
        let db = memory_pool().await;
        append_at(&db, &[line(Some("A"), "a", 10.0, day("2024-01-01"))], ActionType::In, at("2024-03-01 09:00:00"))
            .await
            .unwrap();
        append_chemical_at(&db, &[tank_line("T11-2005A", 500.0)], ActionType::In, at("2024-03-01 09:00:00"))
            .await
            .unwrap();
        let before = aggregate(&load_all(&db).await.unwrap());

        let tag = append_at(&db, &[line(Some("A"), "a", 4.0, day("2024-01-03"))], ActionType::Out, at("2024-03-02 10:00:00"))
            .await
            .unwrap();
        // a tank row sharing the tag, as an older combined upload would have written
        sqlx::query("INSERT INTO chem_transactions (chem_code, action_type, qty_kg, upload_time) VALUES ('T11-2005A', 'Out', 50, ?)")
            .bind(&tag)
            .execute(&db)
            .await
            .unwrap();

        let removed = delete_by_batch(&db, &tag).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(aggregate(&load_all(&db).await.unwrap()), before);
        let tanks = load_chemical(&db).await.unwrap();
        assert_eq!(tanks.len(), 1);
        assert_eq!(tanks[0].upload_time, "2024-03-01 09:00:01");
    }

    #[tokio::test]
    async fn chemical_rows_keep_density_snapshot() {
        let db = memory_pool().await;
        append_chemical_at(&db, &[tank_line("T11-2005A", 152.0)], ActionType::In, at("2024-03-01 09:00:00"))
            .await
            .unwrap();
        let rows = load_chemical(&db).await.unwrap();
        assert_eq!(rows[0].density, Some(1.52));
        assert!((rows[0].qty_l.unwrap() - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_action_type_is_an_explicit_error() {
        let db = memory_pool().await;
        sqlx::query("INSERT INTO transactions (item_code, item_name, action_type, quantity, upload_time) VALUES ('A', 'a', 'Transfer', 1, 't')")
            .execute(&db)
            .await
            .unwrap();
        match load_all(&db).await {
            Err(StoreError::UnknownAction { table, value, .. }) => {
                assert_eq!(table, "transactions");
                assert_eq!(value, "Transfer");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn batches_are_listed_newest_first_with_counts() {
        let db = memory_pool().await;
        append_at(&db, &[line(Some("A"), "a", 1.0, None)], ActionType::In, at("2024-03-01 09:00:00")).await.unwrap();
        append_chemical_at(&db, &[tank_line("T11-2006", 1.0), tank_line("T11-2006", 2.0)], ActionType::In, at("2024-03-05 09:00:00"))
            .await
            .unwrap();

        let batches = batches(&db).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].upload_time, "2024-03-05 09:00:00");
        assert_eq!((batches[0].material_rows, batches[0].tank_rows), (0, 2));
        assert_eq!((batches[1].material_rows, batches[1].tank_rows), (1, 0));
    }
}
