mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{app, days_from_today, item, stocked_app, today, TestApp};
use larder::{
    errors::ServiceError,
    gateway::{GatewayOp, ItemGateway},
    models::{ItemDraft, ItemId, ItemStatus, LogAction},
    services::{
        views::{item_views, ItemView},
        ConsumeOutcome, SortKey, UrgencyBand,
    },
};
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn added_item_shows_seven_days_remaining(app: TestApp) {
    let draft = ItemDraft::new("Milk", today())
        .quantity(1.0)
        .expires_on(days_from_today(7));

    let added = app.state.inventory.add(draft).await.unwrap();

    let items = app.state.inventory.items().await;
    assert_eq!(items, vec![added.clone()]);
    assert_eq!(added.status, ItemStatus::Active);
    assert_eq!(app.gateway.all_items().await, vec![added.clone()]);

    let views: Vec<ItemView> = item_views(&items, SortKey::Expiry, Utc::now());
    assert_eq!(views[0].days_remaining, 7);
    assert_eq!(views[0].band, UrgencyBand::Normal);
}

#[rstest]
#[tokio::test]
async fn added_items_get_distinct_ids(app: TestApp) {
    let first = app
        .state
        .inventory
        .add(ItemDraft::new("Milk", today()))
        .await
        .unwrap();
    let second = app
        .state
        .inventory
        .add(ItemDraft::new("Milk", today()))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(app.state.inventory.items().await.len(), 2);
}

#[rstest]
#[tokio::test]
async fn full_consume_removes_item_and_logs_whole_quantity(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let id = ItemId::new("spinach");

    let outcome = app.state.inventory.consume(&id, 2.0, 2.0).await.unwrap();

    assert!(outcome.is_finished());
    assert!(app.state.inventory.get(&id).await.is_none());
    let log = app.gateway.log_entries().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].quantity, 2.0);
    assert_eq!(log[0].action, LogAction::Consumed);
    assert_eq!(log[0].item_id, Some(id.clone()));

    let stored = app.gateway.all_items().await;
    let row = stored.iter().find(|i| i.id == id).unwrap();
    assert_eq!(row.status, ItemStatus::Consumed);
}

#[rstest]
#[tokio::test]
async fn consuming_more_than_available_finishes_item(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let outcome = app
        .state
        .inventory
        .consume(&ItemId::new("spinach"), 2.0, 5.0)
        .await
        .unwrap();
    assert_matches!(outcome, ConsumeOutcome::Finished { ref log } if log.quantity == 2.0);
}

#[rstest]
#[tokio::test]
async fn partial_consume_keeps_item_with_remainder(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let id = ItemId::new("eggs");

    let outcome = app.state.inventory.consume(&id, 10.0, 3.0).await.unwrap();

    assert_matches!(outcome, ConsumeOutcome::Partial { remaining, .. } if remaining == 7.0);
    let local = app.state.inventory.get(&id).await.unwrap();
    assert_eq!(local.quantity, 7.0);
    assert_eq!(local.status, ItemStatus::Active);

    let log = app.gateway.log_entries().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].quantity, 3.0);

    let reloaded = app.state.inventory.load().await.unwrap();
    let eggs = reloaded.iter().find(|i| i.id == id).unwrap();
    assert_eq!(eggs.quantity, 7.0);
}

#[rstest]
#[tokio::test]
async fn waste_logs_reason_and_original_quantity(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let id = ItemId::new("eggs");

    let log = app.state.inventory.waste(&id, "expired").await.unwrap();

    assert!(app.state.inventory.get(&id).await.is_none());
    assert_eq!(log.action, LogAction::Wasted);
    assert_eq!(log.reason.as_deref(), Some("expired"));
    assert_eq!(log.quantity, 10.0);
    assert_eq!(app.gateway.log_entries().await, vec![log]);
}

#[rstest]
#[tokio::test]
async fn empty_waste_reason_is_accepted(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let log = app
        .state
        .inventory
        .waste(&ItemId::new("spinach"), "")
        .await
        .unwrap();
    assert_eq!(log.reason.as_deref(), Some(""));
}

#[rstest]
#[tokio::test]
async fn failed_edit_reverts_to_persisted_version(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let id = ItemId::new("eggs");

    // Another device renamed the row after this session loaded it.
    let mut persisted = item("eggs", "Free-range eggs", 10.0);
    persisted.added_date = app.state.inventory.get(&id).await.unwrap().added_date;
    app.gateway.put_item(persisted.clone()).await;
    app.gateway.fail_on(GatewayOp::Update).await;

    let mut edited = app.state.inventory.get(&id).await.unwrap();
    edited.note = Some("for the cake".into());
    let result = app.state.inventory.edit(edited).await;

    assert_matches!(result, Err(ServiceError::PersistenceError(_)));
    assert_eq!(app.state.inventory.get(&id).await, Some(persisted));
    assert_eq!(
        app.state.inventory.items().await,
        app.gateway.list().await.unwrap()
    );
}

#[rstest]
#[tokio::test]
async fn successful_edit_is_persisted(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let mut edited = app
        .state
        .inventory
        .get(&ItemId::new("spinach"))
        .await
        .unwrap();
    edited.name = "  Baby spinach ".into();
    edited.expiry_date = days_from_today(1);

    let saved = app.state.inventory.edit(edited).await.unwrap();

    assert_eq!(saved.name, "Baby spinach");
    let stored = app.gateway.list().await.unwrap();
    assert!(stored.contains(&saved));
}

#[rstest]
#[tokio::test]
async fn failed_partial_consume_restores_quantity(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    app.gateway.fail_on(GatewayOp::SetQuantity).await;

    let result = app
        .state
        .inventory
        .consume(&ItemId::new("eggs"), 10.0, 4.0)
        .await;

    assert_matches!(result, Err(ServiceError::PersistenceError(_)));
    let eggs = app.state.inventory.get(&ItemId::new("eggs")).await.unwrap();
    assert_eq!(eggs.quantity, 10.0);
    assert!(app.gateway.log_entries().await.is_empty());
}

#[rstest]
#[tokio::test]
async fn failed_waste_puts_item_back(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    app.gateway.fail_on(GatewayOp::SetStatus).await;

    let result = app.state.inventory.waste(&ItemId::new("eggs"), "moldy").await;

    assert_matches!(result, Err(ServiceError::PersistenceError(_)));
    assert!(app.state.inventory.get(&ItemId::new("eggs")).await.is_some());
    assert_eq!(app.gateway.call_count(GatewayOp::List).await, 2);
}

#[rstest]
#[tokio::test]
async fn history_write_failure_keeps_status_change(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    app.gateway.fail_on(GatewayOp::AppendLog).await;
    let id = ItemId::new("spinach");

    let log = app.state.inventory.waste(&id, "wilted").await.unwrap();

    assert_eq!(log.reason.as_deref(), Some("wilted"));
    assert!(app.state.inventory.get(&id).await.is_none());
    assert!(app.gateway.log_entries().await.is_empty());
    let stored = app.gateway.all_items().await;
    assert_eq!(
        stored.iter().find(|i| i.id == id).unwrap().status,
        ItemStatus::Wasted
    );
}

#[rstest]
#[tokio::test]
async fn row_removed_elsewhere_is_not_found(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let id = ItemId::new("eggs");
    app.gateway.remove_item(&id).await;

    let result = app.state.inventory.consume(&id, 10.0, 10.0).await;

    assert_matches!(result, Err(ServiceError::NotFound(ref missing)) if missing == "eggs");
    assert!(app.state.inventory.get(&id).await.is_none());
}

#[rstest]
#[tokio::test]
async fn unknown_id_fails_without_gateway_write(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    let result = app
        .state
        .inventory
        .waste(&ItemId::new("no-such-item"), "expired")
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(_)));
    assert_eq!(app.gateway.call_count(GatewayOp::SetStatus).await, 0);
}

#[rstest]
#[tokio::test]
async fn load_failure_is_retryable_and_keeps_items(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    app.gateway.fail_on(GatewayOp::List).await;

    let err = app.state.inventory.load().await.unwrap_err();

    assert_matches!(err, ServiceError::FetchError(_));
    assert!(err.is_retryable());
    assert_eq!(app.state.inventory.items().await.len(), 2);

    app.gateway.clear_failures().await;
    assert_eq!(app.state.inventory.load().await.unwrap().len(), 2);
}

#[rstest]
#[tokio::test]
async fn signed_out_user_cannot_touch_inventory(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    app.session().sign_out().await;

    let add = app.state.inventory.add(ItemDraft::new("Milk", today())).await;
    let waste = app.state.inventory.waste(&ItemId::new("eggs"), "").await;

    assert_matches!(add, Err(ServiceError::Unauthorized(_)));
    assert_matches!(waste, Err(ServiceError::Unauthorized(_)));
    assert_eq!(app.gateway.call_count(GatewayOp::Append).await, 0);
    assert_eq!(app.gateway.call_count(GatewayOp::SetStatus).await, 0);

    app.session().sign_in(common::alice(), "fresh-token").await;
    assert!(app.state.inventory.waste(&ItemId::new("eggs"), "").await.is_ok());
}

#[rstest]
#[tokio::test]
async fn history_reflects_inventory_actions(#[future] stocked_app: TestApp) {
    let app = stocked_app.await;
    app.state
        .inventory
        .consume(&ItemId::new("eggs"), 10.0, 2.0)
        .await
        .unwrap();
    app.state
        .inventory
        .waste(&ItemId::new("spinach"), "expired")
        .await
        .unwrap();

    app.state.history.refresh().await.unwrap();
    let summary = app.state.history.summary(Utc::now()).await;

    assert_eq!(summary.consumed_count, 1);
    assert_eq!(summary.wasted_count, 1);
    assert_eq!(summary.top_wasted.len(), 1);
    assert_eq!(summary.top_wasted[0].item_name, "Spinach");
}
