//! HTTP handlers and shared request helpers

pub mod actions;
pub mod auth;
pub mod health;
pub mod logs;
pub mod metrics;
pub mod pages;

use std::collections::HashMap;

/// Decoded query parameters by name.
///
/// A name that appears more than once maps to `None`: repeated values are
/// not a single string and are ignored like any other malformed input.
pub(crate) fn query_params(raw: Option<&str>) -> HashMap<String, Option<String>> {
    let mut params: HashMap<String, Option<String>> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        params
            .entry(key.into_owned())
            .and_modify(|existing| *existing = None)
            .or_insert_with(|| Some(value.into_owned()));
    }
    params
}
