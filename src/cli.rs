//! Command-line definitions for catex.

use clap::Parser;
use std::collections::BTreeMap;

/// Command-line arguments for catex
#[derive(Clone, Parser, Debug)]
#[command(name = "catex", version, about = "Catalog Exploration in the Terminal")]
pub struct Args {
    /// Name of the datastore to open. Omit to list the catalog index.
    pub datastore: Option<String>,

    /// Base URL the catalog files are served under (overrides the config file)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Keep rows whose column holds the value, e.g. --filter realm=ocean.
    /// Repeatable; list cells match when they contain the value.
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,

    /// Case-insensitive substring search over the catalog index
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Maximum number of rows to print
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Print results as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Print a Python snippet for the datastore and active filters instead of rows
    #[arg(long)]
    pub snippet: bool,

    /// Write the default config file and exit
    #[arg(long)]
    pub generate_config: bool,
}

impl Args {
    /// Parse the `--filter COLUMN=VALUE` pairs into a column -> values map.
    pub fn parsed_filters(&self) -> Result<BTreeMap<String, Vec<String>>, String> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for raw in &self.filters {
            match raw.split_once('=') {
                Some((column, value)) if !column.is_empty() && !value.is_empty() => {
                    map.entry(column.to_string())
                        .or_default()
                        .push(value.to_string());
                }
                _ => {
                    return Err(format!(
                        "Invalid filter \"{}\": expected COLUMN=VALUE",
                        raw
                    ))
                }
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_group_by_column() {
        let args = Args::parse_from([
            "catex",
            "cmip6_fs38",
            "--filter",
            "realm=ocean",
            "--filter",
            "realm=atmos",
            "--filter",
            "frequency=mon",
        ]);
        let filters = args.parsed_filters().unwrap();
        assert_eq!(filters["realm"], vec!["ocean", "atmos"]);
        assert_eq!(filters["frequency"], vec!["mon"]);
    }

    #[test]
    fn malformed_filter_is_rejected() {
        let args = Args::parse_from(["catex", "x", "--filter", "no-equals-sign"]);
        assert!(args.parsed_filters().is_err());
        let args = Args::parse_from(["catex", "x", "--filter", "=value"]);
        assert!(args.parsed_filters().is_err());
    }

    #[test]
    fn datastore_is_optional() {
        let args = Args::parse_from(["catex"]);
        assert!(args.datastore.is_none());
        assert_eq!(args.limit, 20);
    }
}
