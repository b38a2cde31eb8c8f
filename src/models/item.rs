use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::category::{expiry_after, suggested_expiry, DEFAULT_CATEGORY, DEFAULT_SHELF_LIFE_DAYS};

/// Opaque identifier of an inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle status of an item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemStatus {
    Active,
    Consumed,
    Wasted,
}

impl ItemStatus {
    /// Status only moves forward: active items may be consumed or wasted, nothing else.
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Active, ItemStatus::Consumed) | (ItemStatus::Active, ItemStatus::Wasted)
        )
    }

    pub fn is_active(self) -> bool {
        self == ItemStatus::Active
    }
}

/// Where an item is stored.
///
/// Labels written by earlier versions of the household sheet are accepted on
/// parse; anything unrecognised is kept verbatim as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageLocation {
    Refrigerated,
    Frozen,
    Ambient,
    Unknown(String),
}

impl StorageLocation {
    /// Fixed ordering used when sorting by location.
    pub fn precedence(&self) -> u8 {
        match self {
            StorageLocation::Refrigerated => 1,
            StorageLocation::Frozen => 2,
            StorageLocation::Ambient => 3,
            StorageLocation::Unknown(_) => 99,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StorageLocation::Refrigerated => "refrigerated",
            StorageLocation::Frozen => "frozen",
            StorageLocation::Ambient => "ambient",
            StorageLocation::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageLocation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "refrigerated" | "fridge" | "冷蔵" => StorageLocation::Refrigerated,
            "frozen" | "freezer" | "冷凍" => StorageLocation::Frozen,
            "ambient" | "pantry" | "常温" => StorageLocation::Ambient,
            _ => StorageLocation::Unknown(trimmed.to_string()),
        })
    }
}

impl From<String> for StorageLocation {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(location) => location,
            Err(never) => match never {},
        }
    }
}

impl From<StorageLocation> for String {
    fn from(value: StorageLocation) -> Self {
        value.as_str().to_string()
    }
}

/// A perishable item tracked by the household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub category: String,
    pub location: StorageLocation,
    pub expiry_date: NaiveDate,
    pub added_date: DateTime<Utc>,
    pub status: ItemStatus,
    pub image_id: Option<String>,
    pub note: Option<String>,
}

impl InventoryItem {
    /// Builds a new active item from a draft.
    pub fn from_draft(draft: ItemDraft, id: ItemId, added_date: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            quantity: draft.quantity,
            unit: draft.unit,
            category: draft.category,
            location: draft.location,
            expiry_date: draft.expiry_date,
            added_date,
            status: ItemStatus::Active,
            image_id: draft.image_id,
            note: draft.note,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// User-supplied fields of a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ItemDraft {
    #[validate(custom = "validate_item_name")]
    pub name: String,
    #[validate(custom = "validate_quantity")]
    pub quantity: f64,
    pub unit: Option<String>,
    #[validate(length(min = 1))]
    pub category: String,
    pub location: StorageLocation,
    pub expiry_date: NaiveDate,
    pub image_id: Option<String>,
    pub note: Option<String>,
}

impl ItemDraft {
    /// Draft pre-filled with the entry form defaults: one piece of an
    /// uncategorised refrigerated item, expiring in a week. Picking a category
    /// moves the expiry to that category's suggestion.
    pub fn new(name: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            name: name.into(),
            quantity: 1.0,
            unit: Some(DEFAULT_UNIT.to_string()),
            category: DEFAULT_CATEGORY.to_string(),
            location: StorageLocation::Refrigerated,
            expiry_date: expiry_after(today, DEFAULT_SHELF_LIFE_DAYS),
            image_id: None,
            note: None,
        }
    }

    pub fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the category and moves the expiry date to that category's suggestion.
    pub fn category(mut self, category: impl Into<String>, today: NaiveDate) -> Self {
        self.category = category.into();
        self.expiry_date = suggested_expiry(&self.category, today);
        self
    }

    pub fn location(mut self, location: StorageLocation) -> Self {
        self.location = location;
        self
    }

    pub fn expires_on(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = expiry_date;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

const DEFAULT_UNIT: &str = "pcs";

pub(crate) fn validate_item_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("name");
        err.message = Some("Item name must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_quantity(quantity: f64) -> Result<(), ValidationError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        let mut err = ValidationError::new("quantity");
        err.message = Some("Quantity must be a finite number greater than 0".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn status_wire_strings_are_fixed() {
        assert_eq!(ItemStatus::Active.to_string(), "active");
        assert_eq!(ItemStatus::Consumed.as_ref(), "consumed");
        assert_eq!("wasted".parse::<ItemStatus>().unwrap(), ItemStatus::Wasted);
        assert!("Eaten".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn status_only_moves_forward() {
        assert!(ItemStatus::Active.can_transition_to(ItemStatus::Consumed));
        assert!(ItemStatus::Active.can_transition_to(ItemStatus::Wasted));
        assert!(!ItemStatus::Consumed.can_transition_to(ItemStatus::Active));
        assert!(!ItemStatus::Wasted.can_transition_to(ItemStatus::Consumed));
        assert!(!ItemStatus::Active.can_transition_to(ItemStatus::Active));
    }

    #[test]
    fn location_accepts_legacy_labels() {
        assert_eq!(
            "冷凍".parse::<StorageLocation>().unwrap(),
            StorageLocation::Frozen
        );
        assert_eq!(
            "Refrigerated".parse::<StorageLocation>().unwrap(),
            StorageLocation::Refrigerated
        );
        assert_eq!(
            StorageLocation::from("cellar".to_string()),
            StorageLocation::Unknown("cellar".into())
        );
        assert_eq!(StorageLocation::Unknown("cellar".into()).precedence(), 99);
    }

    #[test]
    fn location_serializes_as_plain_string() {
        let json = serde_json::to_string(&StorageLocation::Ambient).unwrap();
        assert_eq!(json, "\"ambient\"");
        let back: StorageLocation = serde_json::from_str("\"frozen\"").unwrap();
        assert_eq!(back, StorageLocation::Frozen);
    }

    #[test]
    fn draft_starts_at_a_week_then_follows_category() {
        let draft = ItemDraft::new("Yogurt", today());
        assert_eq!(draft.quantity, 1.0);
        assert_eq!(draft.category, "other");
        assert_eq!(draft.expiry_date, NaiveDate::from_ymd_opt(2026, 10, 26).unwrap());

        let draft = draft.category("meat", today());
        assert_eq!(draft.expiry_date, NaiveDate::from_ymd_opt(2026, 10, 22).unwrap());

        let draft = draft.category("その他", today());
        assert_eq!(draft.expiry_date, NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
    }

    #[test]
    fn blank_name_and_non_positive_quantity_fail_validation() {
        let errors = ItemDraft::new("   ", today())
            .quantity(0.0)
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("quantity"));

        assert!(ItemDraft::new("Milk", today())
            .quantity(f64::NAN)
            .validate()
            .is_err());
        assert!(ItemDraft::new("Milk", today()).validate().is_ok());
    }

    #[test]
    fn from_draft_starts_active_with_trimmed_name() {
        let draft = ItemDraft::new("  Eggs ", today()).quantity(6.0);
        let item = InventoryItem::from_draft(draft, ItemId::new("item-1"), Utc::now());
        assert_eq!(item.name, "Eggs");
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(item.quantity, 6.0);
    }
}
