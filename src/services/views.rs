//! Derived views over the active item list.
//!
//! Everything here is a pure function of its inputs. Urgency depends on the
//! current time, so views are recomputed on every call rather than cached.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{AsRefStr, Display, EnumString};

use crate::models::{InventoryItem, StorageLocation};

const NANOS_PER_DAY: i128 = 86_400 * 1_000_000_000;

/// Items expiring within this many days are flagged as a warning.
pub const WARNING_WINDOW_DAYS: i64 = 3;

/// Ordering applied to the item list.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortKey {
    /// Soonest expiry first
    #[default]
    Expiry,
    /// Most recently added first
    Added,
    Name,
    /// Refrigerated, frozen, ambient, then anything else
    Location,
}

/// Returns a sorted copy of `items`. Ties keep their input order.
pub fn sort_items(items: &[InventoryItem], key: SortKey) -> Vec<InventoryItem> {
    let mut sorted = items.to_vec();
    match key {
        SortKey::Expiry => sorted.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date)),
        SortKey::Added => sorted.sort_by(|a, b| b.added_date.cmp(&a.added_date)),
        SortKey::Name => sorted.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortKey::Location => sorted.sort_by_key(|item| item.location.precedence()),
    }
    sorted
}

/// Case-insensitive first, so `apple < Banana < cherry`; exact spelling breaks ties.
///
/// This is code-point order after lowercasing, not locale collation. Japanese
/// names sort hiragana before katakana before kanji, and kanji by code point
/// rather than by reading.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Whole days left until the start (00:00 UTC) of `expiry`, rounded up.
///
/// Negative once the expiry date has passed; zero on the expiry date itself.
pub fn days_remaining(expiry: NaiveDate, now: DateTime<Utc>) -> i64 {
    // Far-future dates such as 9999-12-31 overflow i64 nanoseconds.
    let whole_days = i128::from(expiry.signed_duration_since(now.date_naive()).num_days());
    let into_today = i128::from(now.num_seconds_from_midnight()) * 1_000_000_000
        + i128::from(now.nanosecond());
    let remaining = whole_days * NANOS_PER_DAY - into_today;

    let mut days = remaining.div_euclid(NANOS_PER_DAY);
    if remaining.rem_euclid(NANOS_PER_DAY) != 0 {
        days += 1;
    }
    // Bounded by the span of `NaiveDate`, which is far inside i64.
    i64::try_from(days).unwrap_or(if days < 0 { i64::MIN } else { i64::MAX })
}

/// How close an item is to its expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UrgencyBand {
    Expired,
    DueToday,
    Warning,
    Normal,
}

impl UrgencyBand {
    pub fn from_days(days_remaining: i64) -> Self {
        match days_remaining {
            d if d < 0 => UrgencyBand::Expired,
            0 => UrgencyBand::DueToday,
            d if d <= WARNING_WINDOW_DAYS => UrgencyBand::Warning,
            _ => UrgencyBand::Normal,
        }
    }
}

pub fn urgency(expiry: NaiveDate, now: DateTime<Utc>) -> UrgencyBand {
    UrgencyBand::from_days(days_remaining(expiry, now))
}

/// An item together with its time-dependent presentation data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub item: InventoryItem,
    pub days_remaining: i64,
    pub band: UrgencyBand,
}

impl ItemView {
    pub fn new(item: InventoryItem, now: DateTime<Utc>) -> Self {
        let days = days_remaining(item.expiry_date, now);
        Self {
            item,
            days_remaining: days,
            band: UrgencyBand::from_days(days),
        }
    }
}

/// Sorts `items` by `key` and annotates each with its urgency at `now`.
pub fn item_views(items: &[InventoryItem], key: SortKey, now: DateTime<Utc>) -> Vec<ItemView> {
    sort_items(items, key)
        .into_iter()
        .map(|item| ItemView::new(item, now))
        .collect()
}

/// Subset of the item list to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ItemFilter {
    #[default]
    All,
    /// Items whose expiry date has passed
    Expired,
    Location(StorageLocation),
}

impl ItemFilter {
    pub fn matches(&self, item: &InventoryItem, now: DateTime<Utc>) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::Expired => days_remaining(item.expiry_date, now) < 0,
            ItemFilter::Location(location) => &item.location == location,
        }
    }
}

pub fn filter_items(
    items: &[InventoryItem],
    filter: &ItemFilter,
    now: DateTime<Utc>,
) -> Vec<InventoryItem> {
    items
        .iter()
        .filter(|item| filter.matches(item, now))
        .cloned()
        .collect()
}

/// What the consume action should ask for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsumePrompt {
    /// Consuming always finishes the item.
    WholeItem,
    /// The user picks an amount in `[1, max]`.
    ChooseAmount { max: f64 },
}

impl ConsumePrompt {
    pub fn for_quantity(quantity: f64) -> Self {
        if quantity <= 1.0 {
            ConsumePrompt::WholeItem
        } else {
            ConsumePrompt::ChooseAmount { max: quantity }
        }
    }
}

/// Clamps a requested consume amount into `[1, quantity]`.
pub fn clamp_consume_amount(requested: f64, quantity: f64) -> f64 {
    let max = quantity.max(1.0);
    if requested.is_nan() {
        1.0
    } else {
        requested.clamp(1.0, max)
    }
}
