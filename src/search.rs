use serde::Serialize;

use crate::{error::Result, store::Store};

/// JSON shape of `ocrdex search --json`.
#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    count: usize,
    paths: &'a [String],
}

/// Every indexed path whose text contains `query`, ignoring case.
///
/// No ranking and no ordering guarantee.
pub fn execute_search(store: &Store, query: &str) -> Result<Vec<String>> {
    store.search(query)
}

/// `Found N matches:` followed by one path per line.
pub fn render_human(paths: &[String]) -> String {
    let mut out = format!("Found {} matches:\n", paths.len());
    for path in paths {
        out.push_str(path);
        out.push('\n');
    }
    out
}

pub fn render_json(query: &str, paths: &[String]) -> Result<String> {
    let output = SearchOutput {
        query,
        count: paths.len(),
        paths,
    };
    Ok(serde_json::to_string(&output)?)
}
