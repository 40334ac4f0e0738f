//! Client snippet generation: a copy-pasteable Python stanza for opening a
//! datastore with the intake stack, carrying the active filter selection.
//! Pure string formatting over the dataset name and filter state.

use std::collections::BTreeMap;

/// Build a Python snippet that opens `name` and applies `filters`
/// (column -> selected values) as search keywords.
pub fn build_search_snippet(name: &str, filters: &BTreeMap<String, Vec<String>>) -> String {
    let mut snippet = String::new();
    snippet.push_str("import intake\n\n");
    snippet.push_str(&format!("catalog = intake.cat.access_nri[\"{}\"]\n", name));
    if filters.is_empty() {
        snippet.push_str("data = catalog.to_dataset_dict()\n");
        return snippet;
    }
    snippet.push_str("search = catalog.search(\n");
    for (column, values) in filters {
        let quoted: Vec<String> = values.iter().map(|v| format!("\"{}\"", v)).collect();
        snippet.push_str(&format!("    {}=[{}],\n", column, quoted.join(", ")));
    }
    snippet.push_str(")\ndata = search.to_dataset_dict()\n");
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_snippet_opens_the_datastore_directly() {
        let snippet = build_search_snippet("cmip6_fs38", &BTreeMap::new());
        assert!(snippet.contains("intake.cat.access_nri[\"cmip6_fs38\"]"));
        assert!(snippet.contains("catalog.to_dataset_dict()"));
        assert!(!snippet.contains("search"));
    }

    #[test]
    fn filters_become_search_keywords() {
        let filters: BTreeMap<String, Vec<String>> = [
            (
                "realm".to_string(),
                vec!["ocean".to_string(), "atmos".to_string()],
            ),
            ("frequency".to_string(), vec!["mon".to_string()]),
        ]
        .into_iter()
        .collect();
        let snippet = build_search_snippet("cmip6_fs38", &filters);
        assert!(snippet.contains("frequency=[\"mon\"],"));
        assert!(snippet.contains("realm=[\"ocean\", \"atmos\"],"));
        assert!(snippet.contains("search.to_dataset_dict()"));
    }
}
