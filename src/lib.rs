//! Larder
//!
//! Household food-inventory tracking: perishable items with expiry dates,
//! consumption and waste history, and monthly waste statistics. Rows are
//! persisted through an [`gateway::ItemGateway`], normally a spreadsheet.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod services;

use std::sync::Arc;
use tracing::info;

use crate::auth::Session;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::gateway::{GatewayError, InMemoryGateway, ItemGateway, SheetsGateway};
use crate::services::{HistoryService, InventoryService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<Session>,
    pub gateway: Arc<dyn ItemGateway>,
    pub inventory: Arc<InventoryService>,
    pub history: Arc<HistoryService>,
}

impl AppState {
    /// Wires both services to one gateway and session.
    pub fn new(config: AppConfig, session: Arc<Session>, gateway: Arc<dyn ItemGateway>) -> Self {
        let inventory = Arc::new(InventoryService::new(gateway.clone(), session.clone()));
        let history = Arc::new(HistoryService::new(gateway.clone(), session.clone()));
        Self {
            config,
            session,
            gateway,
            inventory,
            history,
        }
    }

    /// Builds the gateway selected by `config.gateway_backend`.
    pub fn from_config(config: AppConfig, session: Arc<Session>) -> Result<Self, GatewayError> {
        let gateway: Arc<dyn ItemGateway> = if config.uses_sheets() {
            Arc::new(SheetsGateway::new(&config.sheets, session.clone())?)
        } else {
            Arc::new(InMemoryGateway::new())
        };
        info!(backend = %config.gateway_backend, "Item gateway ready");
        Ok(Self::new(config, session, gateway))
    }

    /// Session-start load of the item list and the history log.
    pub async fn start(&self) -> Result<(), ServiceError> {
        let items = self.inventory.load().await?;
        let entries = self.history.refresh().await?;
        info!(
            items = items.len(),
            history = entries.len(),
            "Inventory session started"
        );
        Ok(())
    }
}
