use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::item::{InventoryItem, ItemId, ItemStatus};

/// What happened to the item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogAction {
    Consumed,
    Wasted,
}

impl From<LogAction> for ItemStatus {
    fn from(action: LogAction) -> Self {
        match action {
            LogAction::Consumed => ItemStatus::Consumed,
            LogAction::Wasted => ItemStatus::Wasted,
        }
    }
}

/// Immutable history entry recording a consumption or disposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionLog {
    pub id: Uuid,
    /// Weak reference: the item may no longer exist, and legacy rows carry no id.
    pub item_id: Option<ItemId>,
    /// Name at the time of the event.
    pub item_name: String,
    pub date: DateTime<Utc>,
    pub quantity: f64,
    pub action: LogAction,
    /// Only meaningful for `Wasted`.
    pub reason: Option<String>,
}

impl ConsumptionLog {
    pub fn consumed(item: &InventoryItem, quantity: f64, date: DateTime<Utc>) -> Self {
        Self::record(item, quantity, LogAction::Consumed, None, date)
    }

    pub fn wasted(item: &InventoryItem, reason: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self::record(
            item,
            item.quantity,
            LogAction::Wasted,
            Some(reason.into()),
            date,
        )
    }

    fn record(
        item: &InventoryItem,
        quantity: f64,
        action: LogAction,
        reason: Option<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: Some(item.id.clone()),
            item_name: item.name.clone(),
            date,
            quantity,
            action,
            reason,
        }
    }
}
