//! The metacatalog: the top-level index of all datastores.
//!
//! Loaded whole in one query; it is a metadata index, not bulk data. The
//! store keeps the result in memory and refuses to refetch while it is
//! populated and healthy, so navigating back to the index is free.

use crate::config::AppConfig;
use crate::datastore::{column_select_expr, LoadStatus};
use crate::error::LoadError;
use crate::fetch::fetch_bytes;
use crate::normalize::{rows_from_frame, CellValue, DataRow, FieldKind, NormalizeMode};
use crate::session::EngineSession;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// File name of the metacatalog resource under the base URL.
pub const CATALOG_FILE: &str = "metacatalog.parquet";

/// Logical table name the metacatalog buffer is registered under.
pub(crate) const CATALOG_TABLE: &str = "catalog";

/// The four list-typed catalog columns. Everything else is scalar.
pub const CATALOG_LIST_FIELDS: &[&str] = &["model", "realm", "frequency", "variable"];

const CATALOG_SCALAR_FIELDS: &[&str] = &["name", "description", "yaml"];

fn catalog_field_kind(name: &str) -> FieldKind {
    if CATALOG_LIST_FIELDS.contains(&name) {
        FieldKind::List
    } else {
        FieldKind::Scalar
    }
}

/// One row of the metacatalog.
///
/// The list fields are always materialized as sequences, never a raw scalar
/// or null. The `searchable_*` strings are flattened once here so substring
/// search does not rescan the lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub model: Vec<String>,
    pub realm: Vec<String>,
    pub frequency: Vec<String>,
    pub variable: Vec<String>,
    pub yaml: Option<String>,
    pub searchable_model: String,
    pub searchable_realm: String,
    pub searchable_frequency: String,
    pub searchable_variable: String,
}

impl CatalogEntry {
    fn from_row(row: &DataRow) -> Self {
        let model = list_field(row, "model");
        let realm = list_field(row, "realm");
        let frequency = list_field(row, "frequency");
        let variable = list_field(row, "variable");
        let yaml = scalar_field(row, "yaml");
        Self {
            name: scalar_field(row, "name"),
            description: scalar_field(row, "description"),
            searchable_model: model.join(", "),
            searchable_realm: realm.join(", "),
            searchable_frequency: frequency.join(", "),
            searchable_variable: variable.join(", "),
            model,
            realm,
            frequency,
            variable,
            yaml: if yaml.is_empty() { None } else { Some(yaml) },
        }
    }

    /// Case-insensitive substring match over the searchable surface.
    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
            || self.searchable_model.to_lowercase().contains(&q)
            || self.searchable_realm.to_lowercase().contains(&q)
            || self.searchable_frequency.to_lowercase().contains(&q)
            || self.searchable_variable.to_lowercase().contains(&q)
    }
}

fn scalar_field(row: &DataRow, name: &str) -> String {
    match row.get(name) {
        Some(CellValue::Scalar(s)) => s.clone(),
        Some(CellValue::List(items)) => items.join(", "),
        _ => String::new(),
    }
}

fn list_field(row: &DataRow, name: &str) -> Vec<String> {
    match row.get(name) {
        Some(CellValue::List(items)) => items.clone(),
        Some(CellValue::Scalar(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[derive(Default)]
struct CatalogState {
    entries: Arc<Vec<CatalogEntry>>,
    status: LoadStatus,
    error: Option<String>,
    last_fetched_at: Option<DateTime<Utc>>,
}

/// In-memory store for the metacatalog.
#[derive(Clone)]
pub struct CatalogStore {
    base_url: String,
    timeout: Duration,
    state: Arc<Mutex<CatalogState>>,
}

impl CatalogStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            state: Arc::new(Mutex::new(CatalogState::default())),
        }
    }

    /// URL of the metacatalog resource.
    pub fn catalog_url(&self) -> String {
        format!("{}/{}", self.base_url, CATALOG_FILE)
    }

    /// Load the metacatalog, or return the in-memory result when it is
    /// already populated and no error is recorded. Errors are absorbed into
    /// `error()` and an empty entry list.
    pub fn fetch_catalog_data(&self) -> Arc<Vec<CatalogEntry>> {
        {
            let mut state = self.lock_state();
            if state.status == LoadStatus::Ready
                && !state.entries.is_empty()
                && state.error.is_none()
            {
                return Arc::clone(&state.entries);
            }
            state.status = LoadStatus::Loading;
            state.error = None;
        }

        let result = self.run_load();
        let mut state = self.lock_state();
        state.last_fetched_at = Some(Utc::now());
        match result {
            Ok(entries) => {
                state.entries = Arc::new(entries);
                state.status = LoadStatus::Ready;
                state.error = None;
            }
            Err(err) => {
                state.entries = Arc::new(Vec::new());
                state.status = LoadStatus::Failed;
                state.error = Some(err.to_string());
            }
        }
        Arc::clone(&state.entries)
    }

    /// Entries currently in memory, without triggering a load.
    pub fn entries(&self) -> Arc<Vec<CatalogEntry>> {
        Arc::clone(&self.lock_state().entries)
    }

    pub fn status(&self) -> LoadStatus {
        self.lock_state().status
    }

    pub fn is_loading(&self) -> bool {
        self.status() == LoadStatus::Loading
    }

    /// Message of the last failed load, if the store is in a failed state.
    pub fn error(&self) -> Option<String> {
        self.lock_state().error.clone()
    }

    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_fetched_at
    }

    /// Drop the in-memory catalog; the next fetch starts fresh.
    pub fn clear_data(&self) {
        let mut state = self.lock_state();
        *state = CatalogState::default();
    }

    fn run_load(&self) -> Result<Vec<CatalogEntry>, LoadError> {
        let url = self.catalog_url();
        let timeout = self.timeout;
        // Fetch and engine startup overlap; proceed once both are done.
        let download = std::thread::spawn(move || fetch_bytes(&url, timeout));
        let mut session = EngineSession::open()?;
        let bytes = download.join().map_err(|_| LoadError::Network {
            status: None,
            message: "The download worker panicked.".to_string(),
        })??;

        session.register_buffer(CATALOG_TABLE, bytes)?;
        let probe = session.query(&format!("SELECT * FROM {} LIMIT 0", CATALOG_TABLE))?;
        let sql = catalog_projection_sql(&probe)?;
        let df = session.query(&sql)?;
        let rows = rows_from_frame(&df, NormalizeMode::Catalog(catalog_field_kind))?;
        session.close();
        Ok(rows.iter().map(CatalogEntry::from_row).collect())
    }

    fn lock_state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The fixed catalog projection: the classified fields, each selected with
/// the per-type branch (list columns pass through, scalar columns are
/// stringified by the engine). Fields missing from the file are skipped; the
/// normalizer fills their canonical empties.
fn catalog_projection_sql(probe: &DataFrame) -> Result<String, LoadError> {
    if probe.column("name").is_err() {
        return Err(LoadError::Query(
            "The metacatalog is missing the \"name\" column.".to_string(),
        ));
    }
    let mut parts = Vec::new();
    for field in CATALOG_SCALAR_FIELDS.iter().chain(CATALOG_LIST_FIELDS) {
        if let Ok(column) = probe.column(field) {
            parts.push(column_select_expr(field, column.dtype()));
        }
    }
    Ok(format!("SELECT {} FROM {}", parts.join(", "), CATALOG_TABLE))
}
