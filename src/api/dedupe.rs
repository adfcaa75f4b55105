use std::collections::HashMap;

use serde_json::Value;

/// Collapse records sharing the same `identity_field` value.
///
/// The last record seen for an identity wins, but it takes the position of
/// the first occurrence. Records missing the field share a single bucket.
pub fn dedupe_by(records: Vec<Value>, identity_field: &str) -> Vec<Value> {
    let total = records.len();
    let mut positions: HashMap<Option<String>, usize> = HashMap::with_capacity(total);
    let mut unique: Vec<Value> = Vec::with_capacity(total);

    for record in records {
        let key = identity_key(&record, identity_field);
        match positions.get(&key) {
            Some(&index) => unique[index] = record,
            None => {
                positions.insert(key, unique.len());
                unique.push(record);
            }
        }
    }

    if unique.len() < total {
        tracing::debug!(
            "Dropped {} duplicate records by '{identity_field}'",
            total - unique.len()
        );
    }
    unique
}

/// JSON text of the identity value, so `1` and `"1"` stay distinct.
fn identity_key(record: &Value, identity_field: &str) -> Option<String> {
    record.get(identity_field).map(Value::to_string)
}
