use catex::{
    build_search_snippet, AppConfig, Args, CatalogStore, CellValue, ConfigManager, DataRow,
    DatastoreCache, DatastoreRecord, LoadStatus, APP_NAME,
};
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::collections::BTreeMap;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let manager = ConfigManager::new(APP_NAME)?;
    if args.generate_config {
        let path = manager.write_default_config()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = manager.load_config()?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }

    match &args.datastore {
        Some(name) => show_datastore(&config, &args, name),
        None => show_catalog(&config, &args),
    }
}

fn show_catalog(config: &AppConfig, args: &Args) -> Result<()> {
    let store = CatalogStore::new(config);
    let entries = store.fetch_catalog_data();
    if let Some(error) = store.error() {
        return Err(eyre!(error));
    }

    let query = args.search.as_deref().unwrap_or("");
    let selected: Vec<_> = entries.iter().filter(|e| e.matches_search(query)).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }
    for entry in selected.iter().take(args.limit) {
        println!("{}  {}", entry.name, entry.description);
        if !entry.searchable_model.is_empty() {
            println!("    models:    {}", entry.searchable_model);
        }
        if !entry.searchable_realm.is_empty() {
            println!("    realms:    {}", entry.searchable_realm);
        }
        if !entry.searchable_frequency.is_empty() {
            println!("    frequency: {}", entry.searchable_frequency);
        }
    }
    println!(
        "{} of {} catalog entries shown",
        selected.len().min(args.limit),
        entries.len()
    );
    Ok(())
}

fn show_datastore(config: &AppConfig, args: &Args, name: &str) -> Result<()> {
    let cache = DatastoreCache::new(config);
    let record = cache.load_datastore(name);
    let result = render_datastore(&record, args);
    // Done with this datastore; release its cache entry on the way out.
    cache.evict(name);
    result
}

fn render_datastore(record: &DatastoreRecord, args: &Args) -> Result<()> {
    if record.status == LoadStatus::Failed {
        let message = record
            .error_message
            .clone()
            .unwrap_or_else(|| "The datastore failed to load.".to_string());
        return Err(eyre!(message));
    }

    let filters = args.parsed_filters().map_err(|e| eyre!(e))?;
    if args.snippet {
        println!("{}", build_search_snippet(&record.name, &filters));
        return Ok(());
    }

    let rows: Vec<&DataRow> = record
        .rows
        .iter()
        .filter(|row| row_matches(row, &filters))
        .collect();

    if args.json {
        let payload = serde_json::json!({
            "name": record.name,
            "total_records": record.total_records,
            "columns": record.columns,
            "filter_options": record.filter_options,
            "rows": rows,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{}", record.columns.join("  "));
    for row in rows.iter().take(args.limit) {
        let cells: Vec<String> = record
            .columns
            .iter()
            .map(|column| truncate(&cell_text(row.get(column)), 40))
            .collect();
        println!("{}", cells.join("  "));
    }
    println!(
        "{} of {} records shown",
        rows.len().min(args.limit),
        record.total_records
    );
    Ok(())
}

/// A row passes when, for every filtered column, the cell holds (scalar) or
/// contains (list) one of the selected values.
fn row_matches(row: &DataRow, filters: &BTreeMap<String, Vec<String>>) -> bool {
    filters.iter().all(|(column, values)| match row.get(column) {
        Some(CellValue::Scalar(s)) => values.iter().any(|v| v == s),
        Some(CellValue::List(items)) => values.iter().any(|v| items.contains(v)),
        _ => false,
    })
}

fn cell_text(cell: Option<&CellValue>) -> String {
    match cell {
        Some(CellValue::Scalar(s)) => s.clone(),
        Some(CellValue::List(items)) => items.join(", "),
        _ => String::new(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
