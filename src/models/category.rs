//! Shelf-life suggestions used to pre-fill expiry dates on new items.

use chrono::{Days, NaiveDate};

pub const DEFAULT_CATEGORY: &str = "other";

/// Fallback for categories without a suggestion, and the expiry a fresh
/// entry form starts with.
pub const DEFAULT_SHELF_LIFE_DAYS: u64 = 7;

/// Category, label used by older sheets, suggested shelf life in days.
const SHELF_LIFE_DAYS: [(&str, &str, u64); 9] = [
    ("vegetables", "野菜", 7),
    ("fruit", "果物", 7),
    ("meat", "肉類", 3),
    ("dairy", "乳製品", 14),
    ("beverages", "飲料", 30),
    ("grains", "穀物", 180),
    ("snacks", "お菓子", 60),
    ("condiments", "調味料", 180),
    ("other", "その他", 14),
];

/// Known categories in display order.
pub fn categories() -> impl Iterator<Item = &'static str> {
    SHELF_LIFE_DAYS.iter().map(|(name, _, _)| *name)
}

/// Maps a category name or its legacy label to the canonical name.
pub fn canonical_category(label: &str) -> Option<&'static str> {
    let label = label.trim();
    SHELF_LIFE_DAYS
        .iter()
        .find(|(name, legacy, _)| name.eq_ignore_ascii_case(label) || *legacy == label)
        .map(|(name, _, _)| *name)
}

pub fn suggested_shelf_life_days(category: &str) -> u64 {
    SHELF_LIFE_DAYS
        .iter()
        .find(|(name, _, _)| Some(*name) == canonical_category(category))
        .map(|(_, _, days)| *days)
        .unwrap_or(DEFAULT_SHELF_LIFE_DAYS)
}

pub fn suggested_expiry(category: &str, today: NaiveDate) -> NaiveDate {
    expiry_after(today, suggested_shelf_life_days(category))
}

pub(crate) fn expiry_after(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_add_days(Days::new(days)).unwrap_or(today)
}
