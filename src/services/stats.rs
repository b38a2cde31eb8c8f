use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::auth::Session;
use crate::errors::ServiceError;
use crate::gateway::ItemGateway;
use crate::models::{ConsumptionLog, LogAction};

/// Number of entries in the most-wasted ranking.
pub const TOP_WASTED_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WastedItemCount {
    pub item_name: String,
    pub count: usize,
}

/// Statistics for one calendar month, plus the all-time waste ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub consumed_count: usize,
    pub wasted_count: usize,
    pub top_wasted: Vec<WastedItemCount>,
}

/// Calendar month of `at` in UTC, as `YYYY-MM`.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

pub fn entries_in_month<'a>(log: &'a [ConsumptionLog], month: &str) -> Vec<&'a ConsumptionLog> {
    log.iter()
        .filter(|entry| month_key(entry.date) == month)
        .collect()
}

/// Counts wasted entries per item name over the whole log and returns the
/// `limit` most frequent. Equal counts keep the order in which the names first
/// appear in the log.
pub fn top_wasted_items(log: &[ConsumptionLog], limit: usize) -> Vec<WastedItemCount> {
    let mut counts: Vec<WastedItemCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for entry in log.iter().filter(|e| e.action == LogAction::Wasted) {
        match positions.get(entry.item_name.as_str()) {
            Some(&index) => counts[index].count += 1,
            None => {
                positions.insert(entry.item_name.as_str(), counts.len());
                counts.push(WastedItemCount {
                    item_name: entry.item_name.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

pub fn summarize(log: &[ConsumptionLog], now: DateTime<Utc>) -> MonthlySummary {
    let month = month_key(now);
    let this_month = entries_in_month(log, &month);
    let count = |action: LogAction| this_month.iter().filter(|e| e.action == action).count();

    MonthlySummary {
        consumed_count: count(LogAction::Consumed),
        wasted_count: count(LogAction::Wasted),
        top_wasted: top_wasted_items(log, TOP_WASTED_LIMIT),
        month,
    }
}

/// Read-only projection of the consumption history.
pub struct HistoryService {
    gateway: Arc<dyn ItemGateway>,
    session: Arc<Session>,
    entries: RwLock<Vec<ConsumptionLog>>,
}

impl HistoryService {
    pub fn new(gateway: Arc<dyn ItemGateway>, session: Arc<Session>) -> Self {
        Self {
            gateway,
            session,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Re-reads the full log. On failure the previous snapshot is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Vec<ConsumptionLog>, ServiceError> {
        if !self.session.is_authenticated().await {
            return Err(ServiceError::Unauthorized("not signed in".to_string()));
        }

        let entries = self
            .gateway
            .list_log()
            .await
            .map_err(ServiceError::fetch)?;
        info!(count = entries.len(), "History loaded");

        *self.entries.write().await = entries.clone();
        Ok(entries)
    }

    pub async fn entries(&self) -> Vec<ConsumptionLog> {
        self.entries.read().await.clone()
    }

    pub async fn summary(&self, now: DateTime<Utc>) -> MonthlySummary {
        summarize(&self.entries.read().await, now)
    }
}
