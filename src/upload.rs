//! Turns uploaded sheets into typed ledger lines.
//!
//! Sheets come from hand-edited spreadsheets, uploaded as `.xlsx` (first
//! worksheet) or saved as CSV. Headers are the Thai
//! labels of the paper forms (canonical English names work too). Bad cells
//! never fail the sheet: the field is left empty and a [`FieldError`] is
//! recorded for the upload report.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

use crate::models::{ActionType, NewChemTransaction, NewTransaction};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
// Local file header of a zip archive, which is what an .xlsx is.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

// Years above this are Buddhist era.
const BUDDHIST_ERA_THRESHOLD: i32 = 2400;
const BUDDHIST_ERA_OFFSET: i32 = 543;
// Anything earlier is a misread, e.g. a two-digit year taken as year 24.
const MIN_YEAR: i32 = 1900;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("could not read sheet: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read workbook: {0}")]
    Workbook(#[from] XlsxError),

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error("sheet has no recognised column headers")]
    NoRecognisedColumns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    MaterialIn,
    MaterialOut,
    TankIn,
    TankOut,
}

impl SheetKind {
    pub const ALL: [SheetKind; 4] = [
        SheetKind::MaterialIn,
        SheetKind::MaterialOut,
        SheetKind::TankIn,
        SheetKind::TankOut,
    ];

    pub fn from_form_value(value: &str) -> Option<Self> {
        match value.trim() {
            "in" => Some(SheetKind::MaterialIn),
            "out" => Some(SheetKind::MaterialOut),
            "tank-in" => Some(SheetKind::TankIn),
            "tank-out" => Some(SheetKind::TankOut),
            _ => None,
        }
    }

    pub fn form_value(self) -> &'static str {
        match self {
            SheetKind::MaterialIn => "in",
            SheetKind::MaterialOut => "out",
            SheetKind::TankIn => "tank-in",
            SheetKind::TankOut => "tank-out",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SheetKind::MaterialIn => "รับเข้า (In)",
            SheetKind::MaterialOut => "เบิกออก (Out)",
            SheetKind::TankIn => "รับสารเคมีเข้าถัง (Tank In)",
            SheetKind::TankOut => "จ่ายสารเคมีจากถัง (Tank Out)",
        }
    }

    pub fn action(self) -> ActionType {
        match self {
            SheetKind::MaterialIn | SheetKind::TankIn => ActionType::In,
            SheetKind::MaterialOut | SheetKind::TankOut => ActionType::Out,
        }
    }

    pub fn is_tank(self) -> bool {
        matches!(self, SheetKind::TankIn | SheetKind::TankOut)
    }

    fn columns(self) -> &'static [(&'static str, Field)] {
        match self {
            SheetKind::MaterialIn => MATERIAL_IN_COLUMNS,
            SheetKind::MaterialOut => MATERIAL_OUT_COLUMNS,
            SheetKind::TankIn | SheetKind::TankOut => TANK_COLUMNS,
        }
    }

    /// Expected Thai headers, for the upload screen.
    pub fn headers(self) -> Vec<&'static str> {
        self.columns().iter().map(|(label, _)| *label).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Field {
    Date,
    ItemCode,
    ItemName,
    Quantity,
    Unit,
    ExpiryDate,
    Category,
    Department,
    Requester,
    Remark,
    ChemCode,
    ChemDesc,
    QtyKg,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::ItemCode => "item_code",
            Field::ItemName => "item_name",
            Field::Quantity => "quantity",
            Field::Unit => "unit",
            Field::ExpiryDate => "expiry_date",
            Field::Category => "category",
            Field::Department => "department",
            Field::Requester => "requester",
            Field::Remark => "remark",
            Field::ChemCode => "chem_code",
            Field::ChemDesc => "chem_desc",
            Field::QtyKg => "qty_kg",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MATERIAL_IN_COLUMNS: &[(&str, Field)] = &[
    ("วันที่รับเข้า", Field::Date),
    ("รหัสวัสดุ", Field::ItemCode),
    ("คำอธิบาย", Field::ItemName),
    ("จำนวน", Field::Quantity),
    ("หน่วย", Field::Unit),
    ("วันที่หมดอายุ", Field::ExpiryDate),
    ("ประเภทวัสดุ", Field::Category),
    ("หมายเหตุ", Field::Remark),
];

const MATERIAL_OUT_COLUMNS: &[(&str, Field)] = &[
    ("วันที่เบิกจ่าย", Field::Date),
    ("รหัสวัสดุ", Field::ItemCode),
    ("คำอธิบาย", Field::ItemName),
    ("จำนวนที่เบิก", Field::Quantity),
    ("หน่วย", Field::Unit),
    ("หน่วยงานที่เบิก", Field::Department),
    ("ผู้ที่ทำการเบิก", Field::Requester),
    ("หมายเหตุ", Field::Remark),
];

const TANK_COLUMNS: &[(&str, Field)] = &[
    ("วันที่", Field::Date),
    ("รหัสสารเคมี", Field::ChemCode),
    ("ชื่อสารเคมี", Field::ChemDesc),
    ("ปริมาณ (kg)", Field::QtyKg),
    ("หน่วยงาน", Field::Department),
    ("ผู้เบิก", Field::Requester),
    ("หมายเหตุ", Field::Remark),
];

/// A cell that could not be coerced. The field was stored as absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub line: usize,
    pub field: Field,
    pub value: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow<T> {
    pub line: usize,
    pub record: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet<T> {
    pub rows: Vec<ParsedRow<T>>,
    pub errors: Vec<FieldError>,
    /// Headers that matched nothing and were ignored.
    pub ignored_columns: Vec<String>,
}

struct Cells {
    line: usize,
    values: Vec<(Field, String)>,
}

impl Cells {
    fn text(&self, field: Field) -> Option<String> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn date(&self, field: Field, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
        let raw = self.text(field)?;
        let parsed = parse_date(&raw);
        if parsed.is_none() {
            errors.push(FieldError { line: self.line, field, value: raw, reason: "not a date" });
        }
        parsed
    }

    fn quantity(&self, field: Field, errors: &mut Vec<FieldError>) -> Option<f64> {
        let raw = self.text(field)?;
        match parse_quantity(&raw) {
            Ok(q) => Some(q),
            Err(reason) => {
                errors.push(FieldError { line: self.line, field, value: raw, reason });
                None
            }
        }
    }
}

fn match_header(header: &str, kind: SheetKind) -> Option<Field> {
    let header = header.trim();
    kind.columns()
        .iter()
        .find(|(label, field)| *label == header || field.name().eq_ignore_ascii_case(header))
        .map(|(_, field)| *field)
}

/// Header row plus data rows, each tagged with its 1-based sheet line.
struct Table {
    headers: Vec<String>,
    rows: Vec<(usize, Vec<String>)>,
}

fn read_table(bytes: &[u8]) -> Result<Table, SheetError> {
    if bytes.starts_with(ZIP_MAGIC) {
        read_workbook(bytes)
    } else {
        read_delimited(bytes)
    }
}

fn read_delimited(bytes: &[u8]) -> Result<Table, SheetError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.byte_records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);
        let cells = record
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
            .collect();
        rows.push((line, cells));
    }

    Ok(Table { headers, rows })
}

/// First worksheet of an `.xlsx` workbook; its first used row is the header.
fn read_workbook(bytes: &[u8]) -> Result<Table, SheetError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::EmptyWorkbook)?;
    let range = workbook.worksheet_range(&first)?;
    let top = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut rows = range.rows().enumerate();
    let headers = match rows.next() {
        Some((_, cells)) => cells.iter().map(cell_text).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|(index, cells)| (top + index + 1, cells.iter().map(cell_text).collect()))
        .collect();

    Ok(Table { headers, rows })
}

// Whole numbers lose the ".0" so codes and serial dates read like the sheet shows them.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        other => other.to_string(),
    }
}

fn read_cells(bytes: &[u8], kind: SheetKind) -> Result<(Vec<Cells>, Vec<String>), SheetError> {
    let Table { headers, rows: table_rows } = read_table(bytes)?;

    let mapping: Vec<Option<Field>> = headers.iter().map(|h| match_header(h, kind)).collect();
    if mapping.iter().all(Option::is_none) {
        return Err(SheetError::NoRecognisedColumns);
    }
    let ignored = headers
        .iter()
        .zip(&mapping)
        .filter(|(h, m)| m.is_none() && !h.is_empty())
        .map(|(h, _)| h.clone())
        .collect();

    let mut rows = Vec::new();
    for (line, cells) in table_rows {
        let values: Vec<(Field, String)> = cells
            .into_iter()
            .zip(&mapping)
            .filter_map(|(cell, field)| field.map(|f| (f, cell)))
            .collect();

        if values.iter().all(|(_, v)| v.is_empty()) {
            continue;
        }
        rows.push(Cells { line, values });
    }

    Ok((rows, ignored))
}

/// Parses a receipt or issue sheet. Issue sheets never carry expiry or category.
pub fn parse_material_sheet(bytes: &[u8], kind: SheetKind) -> Result<ParsedSheet<NewTransaction>, SheetError> {
    let (cells, ignored_columns) = read_cells(bytes, kind)?;
    let mut errors = Vec::new();

    let rows = cells
        .into_iter()
        .map(|c| {
            let record = NewTransaction {
                date: c.date(Field::Date, &mut errors),
                item_code: c.text(Field::ItemCode),
                item_name: c.text(Field::ItemName),
                quantity: c.quantity(Field::Quantity, &mut errors),
                unit: c.text(Field::Unit),
                category: c.text(Field::Category),
                expiry_date: c.date(Field::ExpiryDate, &mut errors),
                department: c.text(Field::Department),
                requester: c.text(Field::Requester),
                remark: c.text(Field::Remark),
            };
            ParsedRow { line: c.line, record }
        })
        .collect();

    Ok(ParsedSheet { rows, errors, ignored_columns })
}

pub fn parse_tank_sheet(bytes: &[u8], kind: SheetKind) -> Result<ParsedSheet<NewChemTransaction>, SheetError> {
    let (cells, ignored_columns) = read_cells(bytes, kind)?;
    let mut errors = Vec::new();

    let rows = cells
        .into_iter()
        .map(|c| {
            let record = NewChemTransaction {
                date: c.date(Field::Date, &mut errors),
                raw_code: c.text(Field::ChemCode).unwrap_or_default(),
                chem_desc: c.text(Field::ChemDesc),
                qty_kg: c.quantity(Field::QtyKg, &mut errors),
                department: c.text(Field::Department),
                requester: c.text(Field::Requester),
                remark: c.text(Field::Remark),
            };
            ParsedRow { line: c.line, record }
        })
        .collect();

    Ok(ParsedSheet { rows, errors, ignored_columns })
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Lenient date coercion. Returns `None` for anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let text = gregorian_years(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok().filter(plausible))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
                .map(|dt| dt.date())
                .filter(plausible)
        })
        .or_else(|| spreadsheet_serial(raw))
}

fn plausible(date: &NaiveDate) -> bool {
    date.year() >= MIN_YEAR
}

/// Rewrites four-digit Buddhist-era years before chrono validates the date,
/// so 29/02/2567 is checked as 29/02/2024.
fn gregorian_years(raw: &str) -> Cow<'_, str> {
    if !raw.contains(|c: char| matches!(c, '-' | '/' | '.')) {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut changed = false;
    let mut digits = String::new();
    for c in raw.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        match digits.parse::<i32>() {
            Ok(year) if digits.len() == 4 && year > BUDDHIST_ERA_THRESHOLD => {
                out.push_str(&(year - BUDDHIST_ERA_OFFSET).to_string());
                changed = true;
            }
            _ => out.push_str(&digits),
        }
        digits.clear();
        out.push(c);
    }
    out.pop();

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(raw)
    }
}

// Day numbers as spreadsheets store them (1900 date system).
fn spreadsheet_serial(raw: &str) -> Option<NaiveDate> {
    let serial: f64 = raw.parse().ok()?;
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Non-negative number, thousands separators allowed.
pub fn parse_quantity(raw: &str) -> Result<f64, &'static str> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    let value: f64 = cleaned.parse().map_err(|_| "not a number")?;
    if !value.is_finite() {
        return Err("not a number");
    }
    if value < 0.0 {
        return Err("negative quantity");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dates_in_common_sheet_formats() {
        assert_eq!(parse_date("2024-01-05"), Some(day(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 00:00:00"), Some(day(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024"), Some(day(2024, 1, 5)));
        assert_eq!(parse_date("2024/01/05"), Some(day(2024, 1, 5)));
        assert_eq!(parse_date("45296"), Some(day(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2567"), Some(day(2024, 1, 5)));
        assert_eq!(parse_date("29/02/2567"), Some(day(2024, 2, 29)));
        assert_eq!(parse_date("2567-02-29 08:30:00"), Some(day(2024, 2, 29)));
    }

    #[test]
    fn two_digit_years_are_not_guessed() {
        assert_eq!(parse_date("05/01/24"), None);
        assert_eq!(parse_date("24/01/05"), None);
        assert_eq!(parse_date("0005-01-24"), None);
    }

    #[test]
    fn bad_two_digit_year_becomes_field_error() {
        let sheet = "วันที่รับเข้า,รหัสวัสดุ,จำนวน,วันที่หมดอายุ\n05/01/24,M-9,1,31/12/25\n";
        let parsed = parse_material_sheet(sheet.as_bytes(), SheetKind::MaterialIn).unwrap();
        let row = &parsed.rows[0].record;
        assert_eq!(row.date, None);
        assert_eq!(row.expiry_date, None);
        let fields: Vec<Field> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::Date, Field::ExpiryDate]);
    }

    #[test]
    fn receipt_workbook_reads_first_sheet() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        let headers = ["วันที่รับเข้า", "รหัสวัสดุ", "คำอธิบาย", "จำนวน", "หน่วย", "วันที่หมดอายุ"];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_number(1, 0, 45296.0).unwrap();
        sheet.write_string(1, 1, "M-001").unwrap();
        sheet.write_string(1, 2, "ถุงมือยาง").unwrap();
        sheet.write_number(1, 3, 1200.0).unwrap();
        sheet.write_string(1, 4, "คู่").unwrap();
        sheet.write_string(1, 5, "30/06/2568").unwrap();
        sheet.write_string(3, 1, "M-002").unwrap();
        sheet.write_number(3, 3, 2.5).unwrap();
        let other = workbook.add_worksheet();
        other.write_string(0, 0, "ignored").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = parse_material_sheet(&bytes, SheetKind::MaterialIn).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert!(parsed.errors.is_empty());

        let first = &parsed.rows[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.record.date, Some(day(2024, 1, 5)));
        assert_eq!(first.record.item_code.as_deref(), Some("M-001"));
        assert_eq!(first.record.quantity, Some(1200.0));
        assert_eq!(first.record.expiry_date, Some(day(2025, 6, 30)));

        let second = &parsed.rows[1];
        assert_eq!(second.line, 4);
        assert_eq!(second.record.quantity, Some(2.5));
    }

    #[test]
    fn truncated_workbook_is_an_error() {
        assert!(matches!(
            parse_material_sheet(b"PK\x03\x04not really a zip", SheetKind::MaterialIn),
            Err(SheetError::Workbook(_))
        ));
    }

    #[test]
    fn unparseable_dates_are_absent() {
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("1,250.5"), Ok(1250.5));
        assert_eq!(parse_quantity(" 3 "), Ok(3.0));
        assert_eq!(parse_quantity("-2"), Err("negative quantity"));
        assert_eq!(parse_quantity("ten"), Err("not a number"));
        assert_eq!(parse_quantity("NaN"), Err("not a number"));
    }

    #[test]
    fn receipt_sheet_with_thai_headers() {
        let sheet = "\u{FEFF}วันที่รับเข้า,รหัสวัสดุ,คำอธิบาย,จำนวน,หน่วย,วันที่หมดอายุ,ประเภทวัสดุ,หมายเหตุ,ผู้ตรวจ\n\
                     2024-01-05,M-001,ถุงมือยาง,\"1,000\",คู่,2025-06-30,PPE,,สมชาย\n\
                     ,,,,,,,,\n\
                     bad-date,M-002,หน้ากาก,lots,ชิ้น,,-,ล็อตใหม่,\n";
        let parsed = parse_material_sheet(sheet.as_bytes(), SheetKind::MaterialIn).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.ignored_columns, vec!["ผู้ตรวจ".to_string()]);

        let first = &parsed.rows[0].record;
        assert_eq!(first.date, Some(day(2024, 1, 5)));
        assert_eq!(first.item_code.as_deref(), Some("M-001"));
        assert_eq!(first.quantity, Some(1000.0));
        assert_eq!(first.expiry_date, Some(day(2025, 6, 30)));
        assert_eq!(first.category.as_deref(), Some("PPE"));
        assert_eq!(first.remark, None);

        let second = &parsed.rows[1];
        assert_eq!(second.line, 4);
        assert_eq!(second.record.date, None);
        assert_eq!(second.record.quantity, None);
        assert_eq!(second.record.remark.as_deref(), Some("ล็อตใหม่"));

        let fields: Vec<Field> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::Date, Field::Quantity]);
        assert!(parsed.errors.iter().all(|e| e.line == 4));
    }

    #[test]
    fn issue_sheet_ignores_receipt_only_columns() {
        let sheet = "วันที่เบิกจ่าย,รหัสวัสดุ,คำอธิบาย,จำนวนที่เบิก,หน่วย,หน่วยงานที่เบิก,ผู้ที่ทำการเบิก,วันที่หมดอายุ\n\
                     2024-02-01,M-001,ถุงมือยาง,20,คู่,ห้องแล็บ,สมหญิง,2025-01-01\n";
        let parsed = parse_material_sheet(sheet.as_bytes(), SheetKind::MaterialOut).unwrap();
        let row = &parsed.rows[0].record;
        assert_eq!(row.quantity, Some(20.0));
        assert_eq!(row.department.as_deref(), Some("ห้องแล็บ"));
        assert_eq!(row.requester.as_deref(), Some("สมหญิง"));
        assert_eq!(row.expiry_date, None);
        assert_eq!(parsed.ignored_columns, vec!["วันที่หมดอายุ".to_string()]);
    }

    #[test]
    fn canonical_english_headers_are_accepted() {
        let sheet = "date,item_code,item_name,quantity\n2024-02-01,X,Thing,2\n";
        let parsed = parse_material_sheet(sheet.as_bytes(), SheetKind::MaterialIn).unwrap();
        assert_eq!(parsed.rows[0].record.item_name.as_deref(), Some("Thing"));
    }

    #[test]
    fn missing_columns_are_absent_not_rejected() {
        let sheet = "คำอธิบาย,จำนวน\nเทปกาว,4\n";
        let parsed = parse_material_sheet(sheet.as_bytes(), SheetKind::MaterialIn).unwrap();
        let row = &parsed.rows[0].record;
        assert_eq!(row.item_code, None);
        assert_eq!(row.date, None);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn sheet_without_known_headers_is_rejected() {
        let sheet = "foo,bar\n1,2\n";
        assert!(matches!(
            parse_material_sheet(sheet.as_bytes(), SheetKind::MaterialIn),
            Err(SheetError::NoRecognisedColumns)
        ));
    }

    #[test]
    fn tank_sheet_keeps_raw_code() {
        let sheet = "วันที่,รหัสสารเคมี,ปริมาณ (kg),หน่วยงาน\n2024-03-01,สารละลายโซดาไฟ,\"1,520\",ผลิต\n";
        let parsed = parse_tank_sheet(sheet.as_bytes(), SheetKind::TankIn).unwrap();
        let row = &parsed.rows[0].record;
        assert_eq!(row.raw_code, "สารละลายโซดาไฟ");
        assert_eq!(row.qty_kg, Some(1520.0));
        assert_eq!(row.department.as_deref(), Some("ผลิต"));
    }

    #[test]
    fn sheet_kind_round_trips_through_form_values() {
        for kind in SheetKind::ALL {
            assert_eq!(SheetKind::from_form_value(kind.form_value()), Some(kind));
        }
        assert_eq!(SheetKind::from_form_value("sideways"), None);
    }
}
