//! Tolerant raw-record access for ingestion.
//!
//! Rate and criteria exports name the same logical field several different
//! ways depending on which sheet or import produced them. A [`RawRecord`]
//! holds one row as loose text and resolves a field by probing an ordered
//! alias list, skipping blank cells, so alias handling happens in exactly
//! one place.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct RawRecord(BTreeMap<String, String>);

impl RawRecord {
    pub fn from_csv_row(row: BTreeMap<String, String>) -> Self {
        Self(
            row.into_iter()
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .collect(),
        )
    }

    /// Flatten a JSON object row; scalar values are stringified, null and
    /// nested values are dropped.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut map = BTreeMap::new();
        for (key, value) in object {
            let text = match value {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            map.insert(key.trim().to_string(), text);
        }
        Self(map)
    }

    /// First non-empty value among the aliases, in order.
    pub fn probe(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.0.get(*alias))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    pub fn probe_owned(&self, aliases: &[&str]) -> Option<String> {
        self.probe(aliases).map(str::to_string)
    }
}
