//! Per-datastore loading and the process-wide dataset cache.
//!
//! Each named datastore is fetched once, queried through a one-shot engine
//! session, normalized, and cached until a consumer evicts it. At most one
//! load is in flight per name: the `Loading` placeholder is written before
//! any I/O starts, so a concurrent caller observes it and polls instead of
//! starting a duplicate fetch. Eviction removes only the cache entry; an
//! in-flight load for an evicted name still completes and repopulates it.

use crate::config::AppConfig;
use crate::error::LoadError;
use crate::fetch::fetch_bytes;
use crate::filters::build_filter_options;
use crate::normalize::{rows_from_frame, DataRow, NormalizeMode};
use crate::session::EngineSession;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Positional-index column written by the catalog build pipeline; present in
/// the files but never shown as a data column.
pub const RESERVED_INDEX_COLUMN: &str = "__index_level_0__";

/// Logical table name a datastore buffer is registered under.
pub(crate) const DATASTORE_TABLE: &str = "src";

/// How often a caller waiting on another caller's in-flight load re-checks
/// the cache. Loads take seconds, so a coarse interval is fine.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Lifecycle of a cache record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Cached result of loading one named datastore.
#[derive(Debug, Clone, Serialize)]
pub struct DatastoreRecord {
    pub name: String,
    pub rows: Vec<DataRow>,
    pub total_records: usize,
    /// Column names of the rowset, excluding the reserved index column.
    pub columns: Vec<String>,
    /// Sorted distinct values per column, for selection filters.
    pub filter_options: BTreeMap<String, Vec<String>>,
    pub status: LoadStatus,
    /// Present iff `status` is `Failed`.
    pub error_message: Option<String>,
    /// When the last load attempt (successful or failed) completed.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl DatastoreRecord {
    pub(crate) fn loading(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            total_records: 0,
            columns: Vec::new(),
            filter_options: BTreeMap::new(),
            status: LoadStatus::Loading,
            error_message: None,
            last_fetched_at: None,
        }
    }

    pub(crate) fn ready(name: &str, rows: Vec<DataRow>, columns: Vec<String>) -> Self {
        let filter_options = build_filter_options(&rows);
        Self {
            name: name.to_string(),
            total_records: rows.len(),
            rows,
            columns,
            filter_options,
            status: LoadStatus::Ready,
            error_message: None,
            last_fetched_at: Some(Utc::now()),
        }
    }

    pub(crate) fn failed(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            total_records: 0,
            columns: Vec::new(),
            filter_options: BTreeMap::new(),
            status: LoadStatus::Failed,
            error_message: Some(message),
            last_fetched_at: Some(Utc::now()),
        }
    }
}

/// Cache of loaded datastores, keyed by name.
///
/// Consumers hold read references (`Arc`) to records; all mutation goes
/// through `load_datastore` and `evict`/`clear`. There is no size limit or
/// expiry; consumers evict a record when navigating away from it.
#[derive(Clone)]
pub struct DatastoreCache {
    base_url: String,
    timeout: Duration,
    records: Arc<Mutex<HashMap<String, Arc<DatastoreRecord>>>>,
}

impl DatastoreCache {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// URL of the columnar file backing `name`.
    pub fn datastore_url(&self, name: &str) -> String {
        format!("{}/source/{}.parquet", self.base_url, name)
    }

    /// Look up a record without triggering a load.
    pub fn get_from_cache(&self, name: &str) -> Option<Arc<DatastoreRecord>> {
        self.lock_records().get(name).map(Arc::clone)
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.lock_records()
            .get(name)
            .map(|r| r.status == LoadStatus::Loading)
            .unwrap_or(false)
    }

    /// Load `name`, reusing a cached record when one exists.
    ///
    /// A `Ready` record is returned as-is. A `Loading` record means another
    /// caller is already fetching; this call polls until that load settles
    /// and returns its outcome. A `Failed` record is treated as absent, so a
    /// repeated call is a manual retry. Errors never propagate out of here;
    /// they come back as a `Failed` record.
    pub fn load_datastore(&self, name: &str) -> Arc<DatastoreRecord> {
        {
            let mut records = self.lock_records();
            match records.get(name).map(Arc::clone) {
                Some(record) if record.status == LoadStatus::Loading => {
                    drop(records);
                    return self.wait_for_inflight(name);
                }
                Some(record) if record.status == LoadStatus::Ready => return record,
                _ => {}
            }
            // Written before any I/O so concurrent callers never both
            // observe "absent" and start duplicate fetches.
            records.insert(name.to_string(), Arc::new(DatastoreRecord::loading(name)));
        }

        let record = Arc::new(match self.run_load(name) {
            Ok((rows, columns)) => DatastoreRecord::ready(name, rows, columns),
            Err(err) => DatastoreRecord::failed(name, err.to_string()),
        });
        self.lock_records()
            .insert(name.to_string(), Arc::clone(&record));
        record
    }

    /// Remove one record. A later `load_datastore` for the same name fetches
    /// fresh data.
    pub fn evict(&self, name: &str) {
        self.lock_records().remove(name);
    }

    /// Remove every record.
    pub fn clear(&self) {
        self.lock_records().clear();
    }

    fn wait_for_inflight(&self, name: &str) -> Arc<DatastoreRecord> {
        loop {
            std::thread::sleep(LOAD_POLL_INTERVAL);
            let records = self.lock_records();
            match records.get(name) {
                Some(record) if record.status == LoadStatus::Loading => {}
                Some(record) => return Arc::clone(record),
                None => {
                    let err = LoadError::NotFound(format!(
                        "Datastore \"{}\" left the cache while its load was in flight.",
                        name
                    ));
                    return Arc::new(DatastoreRecord::failed(name, err.to_string()));
                }
            }
        }
    }

    fn run_load(&self, name: &str) -> Result<(Vec<DataRow>, Vec<String>), LoadError> {
        let url = self.datastore_url(name);
        let timeout = self.timeout;
        // Fetch and engine startup overlap; proceed once both are done.
        let download = std::thread::spawn(move || fetch_bytes(&url, timeout));
        let mut session = EngineSession::open()?;
        let bytes = download.join().map_err(|_| LoadError::Network {
            status: None,
            message: "The download worker panicked.".to_string(),
        })??;

        session.register_buffer(DATASTORE_TABLE, bytes)?;
        // The per-datastore schema is not known statically; enumerate it.
        let probe = session.query(&format!("SELECT * FROM {} LIMIT 0", DATASTORE_TABLE))?;
        let schema: Vec<(String, DataType)> = probe
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().clone()))
            .collect();
        if schema.is_empty() {
            session.close();
            return Err(LoadError::Query(
                "The data file contains no columns.".to_string(),
            ));
        }
        let df = session.query(&projection_sql(&schema, DATASTORE_TABLE))?;
        let rows = rows_from_frame(&df, NormalizeMode::Datastore)?;
        let columns = schema
            .iter()
            .map(|(column, _)| column.clone())
            .filter(|column| column != RESERVED_INDEX_COLUMN)
            .collect();
        session.close();
        Ok((rows, columns))
    }

    fn lock_records(&self) -> MutexGuard<'_, HashMap<String, Arc<DatastoreRecord>>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One projection over every discovered column, branching per column type:
/// lists and strings pass through, everything else is stringified by the
/// engine so each cell reaches the normalizer as text or a vector.
fn projection_sql(schema: &[(String, DataType)], table: &str) -> String {
    let parts: Vec<String> = schema
        .iter()
        .map(|(name, dtype)| column_select_expr(name, dtype))
        .collect();
    format!("SELECT {} FROM {}", parts.join(", "), table)
}

pub(crate) fn column_select_expr(name: &str, dtype: &DataType) -> String {
    match dtype {
        DataType::List(_) => format!("\"{}\"", name),
        DataType::String => format!("\"{}\"", name),
        _ => format!("CAST(\"{}\" AS VARCHAR) AS \"{}\"", name, name),
    }
}
