// ── Attribute namespaces and diff arithmetic ──
//
// Every mutable namespace (device net/props/attrs, gadget panel/props/attrs)
// is a JSON object map. All registry mutations go through the three merge
// modes below; the returned diff contains exactly the fields a subscriber
// needs to see, so an empty diff means "suppress the change event".

use serde_json::{Map, Value};

/// A single attribute namespace: string keys to JSON values.
pub type AttrMap = Map<String, Value>;

/// Which namespace of a component a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    /// Network state: status, parent, role, addresses.
    Net,
    /// User-facing properties: name, description, location.
    Props,
    /// Reported attribute values.
    Attrs,
    /// Gadget classification data (gadgets only).
    Panel,
}

/// Partial merge ("modify"): apply `delta` on top of `current`, writing only
/// keys whose value actually differs. Returns the changed subset.
pub fn merge_diff(current: &mut AttrMap, delta: &AttrMap) -> AttrMap {
    let mut diff = AttrMap::new();
    for (key, value) in delta {
        if current.get(key) != Some(value) {
            current.insert(key.clone(), value.clone());
            diff.insert(key.clone(), value.clone());
        }
    }
    diff
}

/// Full overwrite ("replace"): `next` becomes the namespace wholesale.
/// The diff carries changed/added keys with their new values, and keys that
/// were removed as `null` so subscribers can tell removal from omission.
pub fn replace_diff(current: &mut AttrMap, next: AttrMap) -> AttrMap {
    let mut diff = AttrMap::new();
    for (key, value) in &next {
        if current.get(key) != Some(value) {
            diff.insert(key.clone(), value.clone());
        }
    }
    for key in current.keys() {
        if !next.contains_key(key) {
            diff.insert(key.clone(), Value::Null);
        }
    }
    *current = next;
    diff
}

/// Insert-only merge ("append"): keys already present keep their value.
/// Append is always-meaningful — callers emit the full input as the delta
/// regardless of what was inserted.
pub fn append(current: &mut AttrMap, delta: &AttrMap) {
    for (key, value) in delta {
        if !current.contains_key(key) {
            current.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn map(value: Value) -> AttrMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn merge_writes_only_changed_fields() {
        let mut current = map(json!({"temp": 20, "unit": "c"}));
        let diff = merge_diff(&mut current, &map(json!({"temp": 21, "unit": "c"})));

        assert_eq!(diff, map(json!({"temp": 21})));
        assert_eq!(current, map(json!({"temp": 21, "unit": "c"})));
    }

    #[test]
    fn merge_of_identical_values_is_empty() {
        let mut current = map(json!({"temp": 20}));
        let diff = merge_diff(&mut current, &map(json!({"temp": 20})));
        assert!(diff.is_empty());
    }

    #[test]
    fn merge_adds_new_keys() {
        let mut current = AttrMap::new();
        let diff = merge_diff(&mut current, &map(json!({"status": "online"})));
        assert_eq!(diff, map(json!({"status": "online"})));
    }

    #[test]
    fn replace_reports_removed_keys_as_null() {
        let mut current = map(json!({"name": "lamp", "room": "hall"}));
        let diff = replace_diff(&mut current, map(json!({"name": "desk lamp"})));

        assert_eq!(diff, map(json!({"name": "desk lamp", "room": null})));
        assert_eq!(current, map(json!({"name": "desk lamp"})));
    }

    #[test]
    fn replace_of_identical_map_is_empty() {
        let mut current = map(json!({"name": "lamp"}));
        let diff = replace_diff(&mut current, map(json!({"name": "lamp"})));
        assert!(diff.is_empty());
    }

    #[test]
    fn append_never_overwrites() {
        let mut current = map(json!({"temp": 20}));
        append(&mut current, &map(json!({"temp": 99, "hum": 40})));
        assert_eq!(current, map(json!({"temp": 20, "hum": 40})));
    }
}
