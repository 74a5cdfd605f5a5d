// Capability and feed response documents.

use std::collections::BTreeSet;

use serde_json::{Value, json};

use crate::feed::{Feed, ValueMap};

/// Describe every non-blacklisted feed.
///
/// `{"capabilities":{"feeds":[{"name":..,"schema":..}, ..]}}`, sorted by name.
pub fn capabilities_document(feeds: &[Feed], blacklist: &BTreeSet<String>) -> Value {
    let mut visible: Vec<&Feed> = feeds
        .iter()
        .filter(|f| !blacklist.contains(f.name()))
        .collect();
    visible.sort_by(|a, b| a.name().cmp(b.name()));

    let entries: Vec<Value> = visible
        .into_iter()
        .map(|f| json!({ "name": f.name(), "schema": f.schema() }))
        .collect();

    json!({ "capabilities": { "feeds": entries } })
}

/// `{"name":<feed>,"feed":{..values..}}`
pub fn feed_document(name: &str, values: ValueMap) -> Value {
    json!({ "name": name, "feed": Value::Object(values) })
}
