use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::auth::Session;
use crate::errors::ServiceError;
use crate::gateway::ItemGateway;
use crate::models::item::{validate_item_name, validate_quantity};
use crate::models::{ConsumptionLog, InventoryItem, ItemDraft, ItemId, ItemStatus};

/// Result of a consume action.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// The item was used up and left the active set.
    Finished { log: ConsumptionLog },
    /// Part of the item was used; it stays active with `remaining`.
    Partial {
        remaining: f64,
        log: ConsumptionLog,
    },
}

impl ConsumeOutcome {
    pub fn log(&self) -> &ConsumptionLog {
        match self {
            ConsumeOutcome::Finished { log } | ConsumeOutcome::Partial { log, .. } => log,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ConsumeOutcome::Finished { .. })
    }
}

/// Service owning the active item list for the signed-in session.
///
/// Edits, consumption and waste update local state before the gateway call;
/// if the call fails the whole list is reloaded from the gateway and the
/// original error is returned. Additions are applied locally only after the
/// gateway accepts them.
pub struct InventoryService {
    gateway: Arc<dyn ItemGateway>,
    session: Arc<Session>,
    items: RwLock<Vec<InventoryItem>>,
}

impl InventoryService {
    /// Creates a new inventory service instance
    pub fn new(gateway: Arc<dyn ItemGateway>, session: Arc<Session>) -> Self {
        Self {
            gateway,
            session,
            items: RwLock::new(Vec::new()),
        }
    }

    /// Replaces local state with the gateway's active items.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        self.ensure_signed_in().await?;
        self.fetch_all().await
    }

    /// Snapshot of the active items.
    pub async fn items(&self) -> Vec<InventoryItem> {
        self.items.read().await.clone()
    }

    pub async fn get(&self, id: &ItemId) -> Option<InventoryItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| &item.id == id)
            .cloned()
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add(&self, draft: ItemDraft) -> Result<InventoryItem, ServiceError> {
        self.ensure_signed_in().await?;
        draft.validate()?;

        let item = InventoryItem::from_draft(draft, ItemId::generate(), Utc::now());
        let persisted = self
            .gateway
            .append(item)
            .await
            .map_err(ServiceError::persistence)?;

        self.items.write().await.push(persisted.clone());
        info!(item_id = %persisted.id, "Item added");
        Ok(persisted)
    }

    /// Replaces an active item's fields.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn edit(&self, mut item: InventoryItem) -> Result<InventoryItem, ServiceError> {
        self.ensure_signed_in().await?;
        validate_edit(&item)?;
        item.name = item.name.trim().to_string();

        {
            let mut items = self.items.write().await;
            let slot = items
                .iter_mut()
                .find(|existing| existing.id == item.id)
                .ok_or_else(|| ServiceError::NotFound(item.id.to_string()))?;
            *slot = item.clone();
        }

        match self.gateway.update(&item).await {
            Ok(()) => {
                info!("Item updated");
                Ok(item)
            }
            Err(e) => Err(self.recover(ServiceError::persistence(e)).await),
        }
    }

    /// Consumes `amount` of an item whose quantity the caller saw as `current_quantity`.
    ///
    /// Consuming at least `current_quantity` finishes the item; anything less
    /// lowers its quantity.
    #[instrument(skip(self))]
    pub async fn consume(
        &self,
        id: &ItemId,
        current_quantity: f64,
        amount: f64,
    ) -> Result<ConsumeOutcome, ServiceError> {
        self.ensure_signed_in().await?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ServiceError::ValidationError(format!(
                "consume amount must be greater than 0, got {}",
                amount
            )));
        }

        if amount >= current_quantity {
            let item = self.take_active(id, ItemStatus::Consumed).await?;
            if let Err(e) = self
                .gateway
                .set_status(id, ItemStatus::Consumed, None)
                .await
            {
                return Err(self.recover(ServiceError::persistence(e)).await);
            }

            let log = ConsumptionLog::consumed(&item, current_quantity, Utc::now());
            self.record(&log).await;
            info!("Item consumed");
            Ok(ConsumeOutcome::Finished { log })
        } else {
            let remaining = current_quantity - amount;
            let item = {
                let mut items = self.items.write().await;
                let item = items
                    .iter_mut()
                    .find(|item| &item.id == id)
                    .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
                item.quantity = remaining;
                item.clone()
            };

            if let Err(e) = self.gateway.set_quantity(id, remaining).await {
                return Err(self.recover(ServiceError::persistence(e)).await);
            }

            let log = ConsumptionLog::consumed(&item, amount, Utc::now());
            self.record(&log).await;
            info!(remaining, "Item partially consumed");
            Ok(ConsumeOutcome::Partial { remaining, log })
        }
    }

    /// Discards an item. `reason` is free text and may be empty.
    #[instrument(skip(self))]
    pub async fn waste(&self, id: &ItemId, reason: &str) -> Result<ConsumptionLog, ServiceError> {
        self.ensure_signed_in().await?;

        let item = self.take_active(id, ItemStatus::Wasted).await?;
        if let Err(e) = self
            .gateway
            .set_status(id, ItemStatus::Wasted, Some(reason.to_string()))
            .await
        {
            return Err(self.recover(ServiceError::persistence(e)).await);
        }

        let log = ConsumptionLog::wasted(&item, reason, Utc::now());
        self.record(&log).await;
        info!("Item wasted");
        Ok(log)
    }

    async fn ensure_signed_in(&self) -> Result<(), ServiceError> {
        if self.session.is_authenticated().await {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized("not signed in".to_string()))
        }
    }

    async fn fetch_all(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let items = self.gateway.list().await.map_err(ServiceError::fetch)?;
        info!(count = items.len(), "Inventory loaded");
        *self.items.write().await = items.clone();
        Ok(items)
    }

    /// Removes an item from the active set ahead of a terminal status change.
    async fn take_active(
        &self,
        id: &ItemId,
        next: ItemStatus,
    ) -> Result<InventoryItem, ServiceError> {
        let mut items = self.items.write().await;
        let index = items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        if !items[index].status.can_transition_to(next) {
            return Err(ServiceError::ValidationError(format!(
                "item {} cannot move from {} to {}",
                id, items[index].status, next
            )));
        }
        Ok(items.remove(index))
    }

    /// Resynchronises local state after a failed write and hands back `err`.
    async fn recover(&self, err: ServiceError) -> ServiceError {
        warn!(error = %err, "Write failed; reloading inventory");
        if let Err(reload_err) = self.fetch_all().await {
            error!(error = %reload_err, "Reload after failed write also failed");
        }
        err
    }

    /// History rows are best effort: the status change already happened.
    async fn record(&self, entry: &ConsumptionLog) {
        if let Err(e) = self.gateway.append_log(entry).await {
            warn!(
                item_name = %entry.item_name,
                action = %entry.action,
                error = %e,
                "Failed to record history entry"
            );
        }
    }
}

fn validate_edit(item: &InventoryItem) -> Result<(), ServiceError> {
    validate_item_name(&item.name)
        .and_then(|_| validate_quantity(item.quantity))
        .map_err(|e| {
            ServiceError::ValidationError(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            )
        })?;

    if !item.is_active() {
        return Err(ServiceError::ValidationError(format!(
            "only active items can be edited, {} is {}",
            item.id, item.status
        )));
    }
    Ok(())
}
