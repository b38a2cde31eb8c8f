use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

use super::{GatewayError, GatewayOp, ItemGateway};
use crate::models::{ConsumptionLog, InventoryItem, ItemId, ItemStatus};

/// In-memory gateway.
///
/// Keeps every row regardless of status, the way the sheet does, and can be
/// told to fail specific operations to exercise recovery paths.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    items: Mutex<Vec<InventoryItem>>,
    log: Mutex<Vec<ConsumptionLog>>,
    failing: Mutex<HashSet<GatewayOp>>,
    calls: Mutex<HashMap<GatewayOp, usize>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway pre-populated with rows.
    pub fn with_items(items: Vec<InventoryItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// Makes every subsequent call of `op` fail with a transport error.
    pub async fn fail_on(&self, op: GatewayOp) {
        self.failing.lock().await.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.failing.lock().await.clear();
    }

    /// Every stored row, including consumed and wasted items.
    pub async fn all_items(&self) -> Vec<InventoryItem> {
        self.items.lock().await.clone()
    }

    pub async fn log_entries(&self) -> Vec<ConsumptionLog> {
        self.log.lock().await.clone()
    }

    pub async fn seed_log(&self, entries: Vec<ConsumptionLog>) {
        self.log.lock().await.extend(entries);
    }

    /// Overwrites a stored row directly, bypassing failure injection.
    pub async fn put_item(&self, item: InventoryItem) {
        let mut items = self.items.lock().await;
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Removes a stored row, as another session deleting it would.
    pub async fn remove_item(&self, id: &ItemId) {
        self.items.lock().await.retain(|item| &item.id != id);
    }

    pub async fn call_count(&self, op: GatewayOp) -> usize {
        self.calls.lock().await.get(&op).copied().unwrap_or(0)
    }

    async fn enter(&self, op: GatewayOp) -> Result<(), GatewayError> {
        *self.calls.lock().await.entry(op).or_insert(0) += 1;
        if self.failing.lock().await.contains(&op) {
            debug!(%op, "Injected gateway failure");
            return Err(GatewayError::Transport(format!("injected failure in {}", op)));
        }
        Ok(())
    }

    async fn modify<F>(&self, id: &ItemId, apply: F) -> Result<(), GatewayError>
    where
        F: FnOnce(&mut InventoryItem),
    {
        let mut items = self.items.lock().await;
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        apply(item);
        Ok(())
    }
}

#[async_trait]
impl ItemGateway for InMemoryGateway {
    async fn list(&self) -> Result<Vec<InventoryItem>, GatewayError> {
        self.enter(GatewayOp::List).await?;
        let items = self.items.lock().await;
        Ok(items.iter().filter(|item| item.is_active()).cloned().collect())
    }

    async fn append(&self, item: InventoryItem) -> Result<InventoryItem, GatewayError> {
        self.enter(GatewayOp::Append).await?;
        self.items.lock().await.push(item.clone());
        Ok(item)
    }

    async fn set_status(
        &self,
        id: &ItemId,
        status: ItemStatus,
        _reason: Option<String>,
    ) -> Result<(), GatewayError> {
        self.enter(GatewayOp::SetStatus).await?;
        self.modify(id, |item| item.status = status).await
    }

    async fn set_quantity(&self, id: &ItemId, quantity: f64) -> Result<(), GatewayError> {
        self.enter(GatewayOp::SetQuantity).await?;
        self.modify(id, |item| item.quantity = quantity).await
    }

    async fn update(&self, item: &InventoryItem) -> Result<(), GatewayError> {
        self.enter(GatewayOp::Update).await?;
        let replacement = item.clone();
        self.modify(&item.id, move |existing| *existing = replacement)
            .await
    }

    async fn append_log(&self, entry: &ConsumptionLog) -> Result<(), GatewayError> {
        self.enter(GatewayOp::AppendLog).await?;
        self.log.lock().await.push(entry.clone());
        Ok(())
    }

    async fn list_log(&self) -> Result<Vec<ConsumptionLog>, GatewayError> {
        self.enter(GatewayOp::ListLog).await?;
        Ok(self.log.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::models::ItemDraft;

    fn item(id: &str, status: ItemStatus) -> InventoryItem {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut item =
            InventoryItem::from_draft(ItemDraft::new("Carrots", today), ItemId::new(id), Utc::now());
        item.status = status;
        item
    }

    #[tokio::test]
    async fn list_only_returns_active_rows() {
        let gateway = InMemoryGateway::with_items(vec![
            item("a", ItemStatus::Active),
            item("b", ItemStatus::Consumed),
            item("c", ItemStatus::Wasted),
        ]);

        let active = gateway.list().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, ItemId::new("a"));
        assert_eq!(gateway.all_items().await.len(), 3);
    }

    #[tokio::test]
    async fn status_change_on_missing_row_is_not_found() {
        let gateway = InMemoryGateway::new();
        let result = gateway
            .set_status(&ItemId::new("ghost"), ItemStatus::Wasted, None)
            .await;
        assert!(matches!(result, Err(GatewayError::NotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn injected_failures_apply_until_cleared() {
        let gateway = InMemoryGateway::with_items(vec![item("a", ItemStatus::Active)]);
        gateway.fail_on(GatewayOp::List).await;

        assert!(matches!(
            gateway.list().await,
            Err(GatewayError::Transport(_))
        ));
        gateway.clear_failures().await;
        assert_eq!(gateway.list().await.unwrap().len(), 1);
        assert_eq!(gateway.call_count(GatewayOp::List).await, 2);
    }
}
