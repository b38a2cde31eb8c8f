/*!
 * # Item Store Gateway
 *
 * The seam between the inventory services and the row-oriented data service
 * that actually persists items and their history. Services only depend on
 * [`ItemGateway`]; concrete backends live in the submodules.
 */

use async_trait::async_trait;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::models::{ConsumptionLog, InventoryItem, ItemId, ItemStatus};

pub mod memory;
pub mod rows;
pub mod sheets;

pub use memory::InMemoryGateway;
pub use sheets::{SheetsGateway, SpreadsheetFile};

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Row not found: {0}")]
    NotFound(String),
    #[error("Malformed row: {0}")]
    Decode(String),
    #[error("No access token available")]
    Unauthorized,
    #[error("Gateway misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

/// Names of the gateway calls, used for logging and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum GatewayOp {
    List,
    Append,
    SetStatus,
    SetQuantity,
    Update,
    AppendLog,
    ListLog,
}

/// Storage contract for items and their history.
///
/// Each call either fully succeeds or fully fails, and reads reflect every
/// earlier successful write made through the same gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemGateway: Send + Sync {
    /// All items whose status is `active`.
    async fn list(&self) -> Result<Vec<InventoryItem>, GatewayError>;
    async fn append(&self, item: InventoryItem) -> Result<InventoryItem, GatewayError>;
    async fn set_status(
        &self,
        id: &ItemId,
        status: ItemStatus,
        reason: Option<String>,
    ) -> Result<(), GatewayError>;
    async fn set_quantity(&self, id: &ItemId, quantity: f64) -> Result<(), GatewayError>;
    async fn update(&self, item: &InventoryItem) -> Result<(), GatewayError>;
    async fn append_log(&self, entry: &ConsumptionLog) -> Result<(), GatewayError>;
    async fn list_log(&self) -> Result<Vec<ConsumptionLog>, GatewayError>;
}
