//! Shipped content types
//!
//! - `node`: a course page, body plus attachments
//! - `calendar`: a calendar record with a second preamble

pub mod calendar;
pub mod node;

pub use calendar::CalendarYeast;
pub use node::NodeYeast;

use crate::brewing::{BrewError, History, Meta};
use crate::storage::Storage;
use crate::yeast::Yeasts;
use std::sync::Arc;

/// Register every shipped content type over one storage
pub fn register_defaults(yeasts: &mut Yeasts, storage: Arc<dyn Storage>, base_url: &str) {
    let node_storage = storage.clone();
    let node_base = base_url.to_string();
    yeasts.register("node", move || {
        NodeYeast::new(node_storage.clone(), node_base.clone())
    });

    let calendar_base = base_url.to_string();
    yeasts.register("calendar", move || {
        CalendarYeast::new(storage.clone(), calendar_base.clone())
    });
}

/// A cleaned string field that is safe to use as one path segment
pub(crate) fn segment<'m>(
    meta: &'m Meta,
    key: &str,
    history: &History,
) -> Result<&'m str, BrewError> {
    let value = meta
        .get(key)
        .and_then(|value| value.as_str())
        .ok_or_else(|| history.error(format!("Expected {}.", key)))?;

    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\']);
    if !valid {
        return Err(history.error(format!(
            "{} must be a non-empty name without slashes.",
            key
        )));
    }
    Ok(value)
}

/// Store one blob, turning a storage failure into a brew error
pub(crate) fn store(
    storage: &dyn Storage,
    name: &str,
    content: &[u8],
    history: &mut History,
) -> Result<(), BrewError> {
    storage
        .save(name, content)
        .map_err(|e| history.error(format!("Could not store {}: {}", name, e)))?;
    history.push(format!("Stored {}.", name));
    Ok(())
}

/// Join a base URL and a relative path
pub(crate) fn url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
