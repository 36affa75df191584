// ABOUTME: Reading the installed-extension catalog
// ABOUTME: Holds the catalog query and helpers to check required extensions against its rows

use crate::postgres::cursor::ResultSet;

/// The catalog statement sent by every probe
pub const EXTENSION_CATALOG_QUERY: &str = "SELECT * FROM pg_extension";

/// Column of `pg_extension` holding the extension name
pub const EXTENSION_NAME_COLUMN: &str = "extname";

/// Names of installed extensions, in catalog order
///
/// Empty if the result has no `extname` column.
pub fn installed_extension_names(result: &ResultSet) -> Vec<&str> {
    let Some(idx) = result.column_index(EXTENSION_NAME_COLUMN) else {
        return Vec::new();
    };
    result.rows().iter().filter_map(|row| row.get(idx)).collect()
}

/// Required extensions that do not appear in the catalog result
///
/// Names are trimmed and empty entries skipped, so `"vector, plpgsql"` and
/// `"vector,,"` split on commas behave as expected. Preserves the order of
/// `required` and drops duplicates.
pub fn missing_extensions(result: &ResultSet, required: &[String]) -> Vec<String> {
    let installed = installed_extension_names(result);
    let mut missing: Vec<String> = Vec::new();
    for name in required.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !installed.contains(&name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }
    missing
}
