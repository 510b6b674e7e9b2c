//! Tool-id namespacing
//!
//! Tool ids are `"<namespace(url)>__<localName>"`. The namespace transform is
//! deterministic (same URL always yields the same prefix) and keeps only the
//! URL's alphanumerics, so ids are valid function names for every model
//! provider. Decomposition back into `(url, name)` is NOT done by parsing the
//! id; the registry keeps the pair on each descriptor.

/// Delimiter between the provider namespace and the tool's local name
pub const NAMESPACE_DELIMITER: &str = "__";

/// Deterministic, collision-resistant transform of a provider URL
///
/// Strips scheme, host punctuation and path separators, keeping only
/// alphanumerics: `http://localhost:3005/mcp` -> `httplocalhost3005mcp`.
pub fn namespace(url: &str) -> String {
    url.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Build the namespaced registry id for a provider-local tool name
pub fn compose_id(url: &str, local_name: &str) -> String {
    format!("{}{}{}", namespace(url), NAMESPACE_DELIMITER, local_name)
}
