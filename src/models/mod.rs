pub mod category;
pub mod consumption_log;
pub mod item;

pub use consumption_log::{ConsumptionLog, LogAction};
pub use item::{InventoryItem, ItemDraft, ItemId, ItemStatus, StorageLocation};
