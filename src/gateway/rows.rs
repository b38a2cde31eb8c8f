//! Row layout of the inventory and history sheets.
//!
//! Column order is a compatibility contract with sheets that already exist.
//! The spreadsheet service drops trailing empty cells, so decoding treats
//! missing cells as empty strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use uuid::Uuid;

use super::GatewayError;
use crate::models::{ConsumptionLog, InventoryItem, ItemId, ItemStatus, LogAction};

pub const INVENTORY_COLUMNS: [&str; 11] = [
    "ID",
    "Name",
    "Quantity",
    "Unit",
    "Category",
    "Location",
    "ExpiryDate",
    "AddedDate",
    "Status",
    "ImageID",
    "Note",
];

/// The first five columns are shared with older sheets; `LogID` and `ItemID`
/// are appended after them.
pub const HISTORY_COLUMNS: [&str; 7] = [
    "Date", "ItemName", "Quantity", "Action", "Reason", "LogID", "ItemID",
];

/// Zero-based column positions used for single-cell updates.
pub const QUANTITY_COLUMN: usize = 2;
pub const STATUS_COLUMN: usize = 8;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Spreadsheet column letter for a zero-based index (`0 -> A`).
pub fn column_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// True when `row` starts with the first header of `columns`, as written by
/// the header bootstrap or by hand.
pub fn is_header_row(row: &[String], columns: &[&str]) -> bool {
    match (row.first(), columns.first()) {
        (Some(cell), Some(name)) => cell.trim().eq_ignore_ascii_case(name),
        _ => false,
    }
}

pub fn item_to_row(item: &InventoryItem) -> Vec<String> {
    vec![
        item.id.to_string(),
        item.name.clone(),
        format_quantity(item.quantity),
        item.unit.clone().unwrap_or_default(),
        item.category.clone(),
        item.location.to_string(),
        item.expiry_date.format(DATE_FORMAT).to_string(),
        format_timestamp(&item.added_date),
        item.status.to_string(),
        item.image_id.clone().unwrap_or_default(),
        item.note.clone().unwrap_or_default(),
    ]
}

pub fn item_from_row(row: &[String]) -> Result<InventoryItem, GatewayError> {
    let id = cell(row, 0);
    if id.is_empty() {
        return Err(GatewayError::Decode("inventory row without ID".to_string()));
    }

    let status = cell(row, STATUS_COLUMN);
    let status = status
        .parse::<ItemStatus>()
        .map_err(|_| GatewayError::Decode(format!("row {}: unknown status '{}'", id, status)))?;

    Ok(InventoryItem {
        id: ItemId::new(id),
        name: cell(row, 1).to_string(),
        quantity: parse_quantity(cell(row, QUANTITY_COLUMN))?,
        unit: optional(row, 3),
        category: cell(row, 4).to_string(),
        location: cell(row, 5).to_string().into(),
        expiry_date: parse_date(cell(row, 6))?,
        added_date: parse_timestamp(cell(row, 7))?,
        status,
        image_id: optional(row, 9),
        note: optional(row, 10),
    })
}

pub fn log_to_row(entry: &ConsumptionLog) -> Vec<String> {
    vec![
        format_timestamp(&entry.date),
        entry.item_name.clone(),
        format_quantity(entry.quantity),
        entry.action.to_string(),
        entry.reason.clone().unwrap_or_default(),
        entry.id.to_string(),
        entry
            .item_id
            .as_ref()
            .map(ItemId::to_string)
            .unwrap_or_default(),
    ]
}

/// Decodes a history row. Legacy five-column rows get a freshly generated id
/// and no item reference.
pub fn log_from_row(row: &[String]) -> Result<ConsumptionLog, GatewayError> {
    let action = cell(row, 3);
    let action = action
        .parse::<LogAction>()
        .map_err(|_| GatewayError::Decode(format!("unknown history action '{}'", action)))?;

    let id = match optional(row, 5) {
        Some(raw) => Uuid::parse_str(&raw)
            .map_err(|e| GatewayError::Decode(format!("invalid log id '{}': {}", raw, e)))?,
        None => Uuid::new_v4(),
    };

    Ok(ConsumptionLog {
        id,
        item_id: optional(row, 6).map(ItemId::new),
        item_name: cell(row, 1).to_string(),
        date: parse_timestamp(cell(row, 0))?,
        quantity: parse_quantity(cell(row, 2))?,
        action,
        reason: optional(row, 4),
    })
}

/// Whole quantities are written without a fractional part (`3`, not `3.0`).
pub fn format_quantity(quantity: f64) -> String {
    quantity.to_string()
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or("")
}

fn optional(row: &[String], index: usize) -> Option<String> {
    let value = cell(row, index);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_quantity(raw: &str) -> Result<f64, GatewayError> {
    let quantity = raw
        .parse::<f64>()
        .map_err(|_| GatewayError::Decode(format!("invalid quantity '{}'", raw)))?;
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(GatewayError::Decode(format!("invalid quantity '{}'", raw)));
    }
    Ok(quantity)
}

/// Accepts a bare date or a full timestamp, keeping only the date part.
fn parse_date(raw: &str) -> Result<NaiveDate, GatewayError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| GatewayError::Decode(format!("invalid date '{}'", raw)))
}

/// Accepts an RFC 3339 timestamp or a bare date (read as midnight UTC).
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, GatewayError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .ok_or_else(|| GatewayError::Decode(format!("invalid timestamp '{}'", raw)))
}
