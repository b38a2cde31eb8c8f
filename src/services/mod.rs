// Item lifecycle
pub mod inventory;

// Pure list views and history aggregation
pub mod stats;
pub mod views;

pub use inventory::{ConsumeOutcome, InventoryService};
pub use stats::{HistoryService, MonthlySummary, WastedItemCount};
pub use views::{ConsumePrompt, ItemFilter, ItemView, SortKey, UrgencyBand};
