//! Endpoint URL assembly.

/// Joins a provider base URL and an endpoint path with exactly one
/// slash, whatever the caller stored on either side of the join.
///
/// Provider base URLs are kept verbatim in config, so `…/v1` and
/// `…/v1/` must resolve to the same endpoint.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
