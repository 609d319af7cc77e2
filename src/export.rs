//! CSV downloads. Output starts with a UTF-8 BOM so spreadsheet tools show Thai text correctly.

use crate::models::{BalanceRecord, TankBalance, TransactionRecord};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn writer() -> csv::Writer<Vec<u8>> {
    csv::Writer::from_writer(UTF8_BOM.to_vec())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, csv::Error> {
    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn opt_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub fn balances_csv(balances: &[BalanceRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut w = writer();
    w.write_record([
        "item_code", "item_name", "category", "In", "Out", "Balance", "unit", "expiry_date",
    ])?;
    for b in balances {
        w.write_record([
            b.item_code.as_str(),
            b.item_name.as_str(),
            b.category.as_str(),
            amount(b.received).as_str(),
            amount(b.issued).as_str(),
            amount(b.balance).as_str(),
            b.unit.as_str(),
            b.expiry_date.map(|d| d.to_string()).unwrap_or_default().as_str(),
        ])?;
    }
    finish(w)
}

pub fn ledger_csv(records: &[TransactionRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut w = writer();
    w.write_record([
        "id", "date", "item_code", "item_name", "action_type", "quantity", "unit", "category",
        "expiry_date", "department", "requester", "remark", "upload_time",
    ])?;
    for r in records {
        w.write_record([
            r.id.to_string().as_str(),
            r.date.map(|d| d.to_string()).unwrap_or_default().as_str(),
            r.item_code.as_str(),
            r.item_name.as_str(),
            r.action_type.as_str(),
            r.quantity.map(amount).unwrap_or_default().as_str(),
            opt_text(&r.unit),
            opt_text(&r.category),
            r.expiry_date.map(|d| d.to_string()).unwrap_or_default().as_str(),
            opt_text(&r.department),
            opt_text(&r.requester),
            opt_text(&r.remark),
            r.upload_time.as_str(),
        ])?;
    }
    finish(w)
}

pub fn tanks_csv(tanks: &[TankBalance]) -> Result<Vec<u8>, csv::Error> {
    let mut w = writer();
    w.write_record([
        "chem_code", "description", "in_kg", "out_kg", "balance_kg", "balance_l", "capacity_kg", "fill_percent",
    ])?;
    for t in tanks {
        w.write_record([
            t.chem_code.as_str(),
            t.description.as_str(),
            amount(t.received_kg).as_str(),
            amount(t.issued_kg).as_str(),
            amount(t.balance_kg).as_str(),
            amount(t.balance_l).as_str(),
            t.capacity_kg.map(amount).unwrap_or_default().as_str(),
            t.fill_percent.map(amount).unwrap_or_default().as_str(),
        ])?;
    }
    finish(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn balances_export_starts_with_bom_and_keeps_thai_text() {
        let balances = vec![BalanceRecord {
            item_code: "M-001".to_string(),
            item_name: "ถุงมือยาง, ไนไตรล์".to_string(),
            received: 10.0,
            issued: 2.5,
            balance: 7.5,
            unit: "คู่".to_string(),
            category: "PPE".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 1, 31),
        }];
        let bytes = balances_csv(&balances).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("item_code,item_name,category,In,Out,Balance,unit,expiry_date"));
        assert_eq!(
            lines.next(),
            Some("M-001,\"ถุงมือยาง, ไนไตรล์\",PPE,10.00,2.50,7.50,คู่,2025-01-31")
        );
    }

    #[test]
    fn empty_export_is_header_only() {
        let bytes = tanks_csv(&[]).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
