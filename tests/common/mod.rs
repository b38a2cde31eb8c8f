#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use larder::{
    auth::{Session, UserProfile},
    config::AppConfig,
    gateway::{InMemoryGateway, ItemGateway},
    models::{ConsumptionLog, InventoryItem, ItemId, ItemStatus, LogAction, StorageLocation},
    AppState,
};
use rstest::fixture;
use uuid::Uuid;

/// Application state over an in-memory gateway with a signed-in user.
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<InMemoryGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<InventoryItem>) -> Self {
        let gateway = Arc::new(InMemoryGateway::with_items(items));
        let session = Arc::new(Session::signed_in(alice(), "test-token"));
        let state = AppState::new(
            AppConfig::default(),
            session,
            gateway.clone() as Arc<dyn ItemGateway>,
        );
        Self { state, gateway }
    }

    pub fn session(&self) -> &Session {
        &self.state.session
    }
}

pub fn alice() -> UserProfile {
    UserProfile::new("Alice", "alice@example.com")
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_from_today(days: u64) -> NaiveDate {
    today().checked_add_days(Days::new(days)).unwrap()
}

/// An active item stored in the refrigerator.
pub fn item(id: &str, name: &str, quantity: f64) -> InventoryItem {
    InventoryItem {
        id: ItemId::new(id),
        name: name.to_string(),
        quantity,
        unit: Some("pcs".into()),
        category: "other".into(),
        location: StorageLocation::Refrigerated,
        expiry_date: days_from_today(5),
        added_date: Utc::now(),
        status: ItemStatus::Active,
        image_id: None,
        note: None,
    }
}

pub fn log_entry(name: &str, action: LogAction, at: DateTime<Utc>) -> ConsumptionLog {
    ConsumptionLog {
        id: Uuid::new_v4(),
        item_id: None,
        item_name: name.to_string(),
        date: at,
        quantity: 1.0,
        action,
        reason: match action {
            LogAction::Wasted => Some("expired".into()),
            LogAction::Consumed => None,
        },
    }
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[fixture]
pub fn app() -> TestApp {
    TestApp::new()
}

/// Eggs (10) and Spinach (2), already loaded into the inventory service.
#[fixture]
pub async fn stocked_app() -> TestApp {
    let app = TestApp::with_items(vec![item("eggs", "Eggs", 10.0), item("spinach", "Spinach", 2.0)]);
    app.state.start().await.unwrap();
    app
}
