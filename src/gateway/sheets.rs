/*!
 * # Spreadsheet Gateway
 *
 * Persists items and history rows through the spreadsheet values API. Rows
 * are located by re-reading the ID column; the sheet is small (one household)
 * so no index is kept.
 *
 * The spreadsheet is bootstrapped lazily on first use: a configured id is
 * taken as is, otherwise the file search API is asked for a spreadsheet with
 * the configured title, and a new one is created when none exists. Either
 * way, empty sheets get their header row before any data is written.
 */

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::rows::{self, column_letter, QUANTITY_COLUMN, STATUS_COLUMN};
use super::{GatewayError, ItemGateway};
use crate::auth::Session;
use crate::config::SheetsConfig;
use crate::models::{ConsumptionLog, InventoryItem, ItemId, ItemStatus};

const VALUE_INPUT_OPTION: &str = "RAW";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owners: Vec<DriveOwner>,
    #[serde(default)]
    shared: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveOwner {
    display_name: Option<String>,
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

/// A spreadsheet that can hold the inventory, as found by the file search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadsheetFile {
    pub id: String,
    pub name: String,
    /// Display name (or address) of the first owner
    pub owner: Option<String>,
    /// Whether the file is shared with other accounts
    pub shared: bool,
}

impl From<DriveFile> for SpreadsheetFile {
    fn from(file: DriveFile) -> Self {
        let owner = file
            .owners
            .into_iter()
            .next()
            .and_then(|o| o.display_name.or(o.email_address));
        Self {
            id: file.id,
            name: file.name,
            owner,
            shared: file.shared,
        }
    }
}

#[derive(Debug, Default)]
struct Database {
    id: Option<String>,
    /// Header rows have been checked for `id`.
    ready: bool,
}

/// Gateway backed by a spreadsheet with an inventory sheet and a history sheet.
#[derive(Debug, Clone)]
pub struct SheetsGateway {
    client: Client,
    base_url: Url,
    drive_url: Url,
    spreadsheet_title: String,
    database: Arc<Mutex<Database>>,
    inventory_sheet: String,
    history_sheet: String,
    session: Arc<Session>,
}

impl SheetsGateway {
    pub fn new(config: &SheetsConfig, session: Arc<Session>) -> Result<Self, GatewayError> {
        let spreadsheet_id = config
            .spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: parse_url(&config.api_base_url)?,
            drive_url: parse_url(&config.drive_api_base_url)?,
            spreadsheet_title: config.spreadsheet_title.clone(),
            database: Arc::new(Mutex::new(Database {
                id: spreadsheet_id,
                ready: false,
            })),
            inventory_sheet: config.inventory_sheet.clone(),
            history_sheet: config.history_sheet.clone(),
            session,
        })
    }

    /// Spreadsheet currently in use, if one has been configured or found.
    pub async fn spreadsheet_id(&self) -> Option<String> {
        self.database.lock().await.id.clone()
    }

    /// Switches to another spreadsheet, e.g. one shared by another household
    /// member. Its header rows are checked again on the next call.
    pub async fn set_spreadsheet_id(&self, id: impl Into<String>) {
        let id = id.into().trim().to_string();
        info!(spreadsheet_id = %id, "Switching spreadsheet");
        *self.database.lock().await = Database {
            id: Some(id),
            ready: false,
        };
    }

    /// Spreadsheets visible to the signed-in user whose title matches the
    /// configured one, own and shared alike.
    #[instrument(skip(self))]
    pub async fn find_databases(&self) -> Result<Vec<SpreadsheetFile>, GatewayError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            drive_literal(&self.spreadsheet_title),
            SPREADSHEET_MIME_TYPE
        );
        let response = self
            .client
            .get(self.drive_url.clone())
            .bearer_auth(self.token().await?)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name,owners(displayName,emailAddress),shared)"),
                ("includeItemsFromAllDrives", "true"),
                ("supportsAllDrives", "true"),
            ])
            .send()
            .await?;
        let body: FileList = Self::check(response).await?.json().await?;

        debug!(count = body.files.len(), "Spreadsheet search finished");
        Ok(body.files.into_iter().map(SpreadsheetFile::from).collect())
    }

    /// Resolves the spreadsheet to use, searching for or creating it when no
    /// id is known, and writes header rows into empty sheets.
    #[instrument(skip(self))]
    pub async fn ensure_database(&self) -> Result<String, GatewayError> {
        let mut database = self.database.lock().await;
        if let (Some(id), true) = (&database.id, database.ready) {
            return Ok(id.clone());
        }

        let id = match database.id.clone() {
            Some(id) => id,
            None => match self.find_databases().await?.into_iter().next() {
                Some(found) => {
                    info!(spreadsheet_id = %found.id, "Using existing spreadsheet");
                    found.id
                }
                None => self.create_database().await?,
            },
        };
        database.id = Some(id.clone());

        self.ensure_header(&id, &self.inventory_sheet, &rows::INVENTORY_COLUMNS)
            .await?;
        self.ensure_header(&id, &self.history_sheet, &rows::HISTORY_COLUMNS)
            .await?;
        database.ready = true;
        Ok(id)
    }

    async fn create_database(&self) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.base_url.clone())
            .bearer_auth(self.token().await?)
            .json(&json!({
                "properties": { "title": self.spreadsheet_title },
                "sheets": [
                    { "properties": { "title": self.inventory_sheet } },
                    { "properties": { "title": self.history_sheet } }
                ]
            }))
            .send()
            .await?;
        let created: CreatedSpreadsheet = Self::check(response).await?.json().await?;

        info!(spreadsheet_id = %created.spreadsheet_id, title = %self.spreadsheet_title, "Created spreadsheet");
        Ok(created.spreadsheet_id)
    }

    /// Writes `columns` into row 1 of `sheet` unless the row already has content.
    async fn ensure_header(
        &self,
        spreadsheet: &str,
        sheet: &str,
        columns: &[&str],
    ) -> Result<(), GatewayError> {
        let last = column_letter(columns.len() - 1);
        let range = a1(sheet, &format!("A1:{last}1"));
        let first_row = self.get_values(spreadsheet, &range).await?;
        if first_row.iter().flatten().any(|cell| !cell.trim().is_empty()) {
            return Ok(());
        }

        debug!(sheet, "Writing header row");
        let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.put_values(spreadsheet, &range, vec![header]).await
    }

    fn values_url(&self, spreadsheet: &str, range: &str) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Config(format!("unusable base URL {}", self.base_url)))?
            .pop_if_empty()
            .push(spreadsheet)
            .push("values")
            .push(range);
        Ok(url)
    }

    async fn token(&self) -> Result<String, GatewayError> {
        self.session
            .access_token()
            .await
            .ok_or(GatewayError::Unauthorized)
    }

    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Transport(format!(
            "{} returned {}: {}",
            url.path(),
            status,
            body
        )))
    }

    async fn get_values(
        &self,
        spreadsheet: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GatewayError> {
        let url = self.values_url(spreadsheet, range)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token().await?)
            .send()
            .await?;
        let body: ValueRange = Self::check(response).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn put_values(
        &self,
        spreadsheet: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), GatewayError> {
        let url = self.values_url(spreadsheet, range)?;
        let response = self
            .client
            .put(url)
            .bearer_auth(self.token().await?)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(&json!({ "values": values }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), GatewayError> {
        let spreadsheet = self.ensure_database().await?;
        let url = self.values_url(&spreadsheet, &format!("{}:append", a1(sheet, "A1")))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(self.token().await?)
            .query(&[
                ("valueInputOption", VALUE_INPUT_OPTION),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// One-based sheet row holding `id`; the header occupies row 1.
    async fn row_number(&self, spreadsheet: &str, id: &ItemId) -> Result<usize, GatewayError> {
        let ids = self
            .get_values(spreadsheet, &a1(&self.inventory_sheet, "A2:A"))
            .await?;
        ids.iter()
            .position(|row| row.first().map(|cell| cell.trim()) == Some(id.as_str()))
            .map(|index| index + 2)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn put_cell(&self, id: &ItemId, column: usize, value: String) -> Result<(), GatewayError> {
        let spreadsheet = self.ensure_database().await?;
        let row = self.row_number(&spreadsheet, id).await?;
        let cell = format!("{}{}", column_letter(column), row);
        self.put_values(&spreadsheet, &a1(&self.inventory_sheet, &cell), vec![vec![value]])
            .await
    }
}

#[async_trait]
impl ItemGateway for SheetsGateway {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<InventoryItem>, GatewayError> {
        let spreadsheet = self.ensure_database().await?;
        let rows = self
            .get_values(&spreadsheet, &a1(&self.inventory_sheet, "A2:K"))
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match rows::item_from_row(row) {
                Ok(item) if item.is_active() => items.push(item),
                Ok(_) => {}
                Err(e) => warn!(row = index + 2, error = %e, "Skipping unreadable inventory row"),
            }
        }
        Ok(items)
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn append(&self, item: InventoryItem) -> Result<InventoryItem, GatewayError> {
        self.append_row(&self.inventory_sheet, rows::item_to_row(&item))
            .await?;
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn set_status(
        &self,
        id: &ItemId,
        status: ItemStatus,
        reason: Option<String>,
    ) -> Result<(), GatewayError> {
        // The item row has no reason column; the reason travels in the history row.
        debug!(reason = reason.as_deref().unwrap_or(""), "Updating item status");
        self.put_cell(id, STATUS_COLUMN, status.to_string()).await
    }

    #[instrument(skip(self))]
    async fn set_quantity(&self, id: &ItemId, quantity: f64) -> Result<(), GatewayError> {
        self.put_cell(id, QUANTITY_COLUMN, rows::format_quantity(quantity))
            .await
    }

    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn update(&self, item: &InventoryItem) -> Result<(), GatewayError> {
        let spreadsheet = self.ensure_database().await?;
        let row = self.row_number(&spreadsheet, &item.id).await?;
        let last = column_letter(rows::INVENTORY_COLUMNS.len() - 1);
        let range = a1(&self.inventory_sheet, &format!("A{row}:{last}{row}"));
        self.put_values(&spreadsheet, &range, vec![rows::item_to_row(item)])
            .await
    }

    #[instrument(skip(self, entry), fields(item_name = %entry.item_name))]
    async fn append_log(&self, entry: &ConsumptionLog) -> Result<(), GatewayError> {
        self.append_row(&self.history_sheet, rows::log_to_row(entry))
            .await
    }

    #[instrument(skip(self))]
    async fn list_log(&self) -> Result<Vec<ConsumptionLog>, GatewayError> {
        let spreadsheet = self.ensure_database().await?;
        let last = column_letter(rows::HISTORY_COLUMNS.len() - 1);
        let rows = self
            .get_values(&spreadsheet, &a1(&self.history_sheet, &format!("A1:{}", last)))
            .await?;

        // Older history sheets have no header, so row 1 may already hold an entry.
        let skip = match rows.first() {
            Some(first) if rows::is_header_row(first, &rows::HISTORY_COLUMNS) => 1,
            _ => 0,
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate().skip(skip) {
            match rows::log_from_row(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(row = index + 1, error = %e, "Skipping unreadable history row"),
            }
        }
        Ok(entries)
    }
}

/// A1 notation for `cells` on `sheet`, quoting sheet titles that need it.
fn a1(sheet: &str, cells: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{}!{}", sheet, cells)
    } else {
        format!("'{}'!{}", sheet.replace('\'', "''"), cells)
    }
}

/// Quotes `value` for a file search query.
fn drive_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn parse_url(value: &str) -> Result<Url, GatewayError> {
    Url::parse(value).map_err(|e| GatewayError::Config(format!("invalid URL {value}: {e}")))
}

/// Cells come back as strings by default, but numbers and booleans are
/// possible when the sheet was edited by hand.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
