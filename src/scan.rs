/// file: src/scan.rs
/// description: Breadth-first search for marker-keyed records in a JSON tree.
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};

/// Key whose value holds one video entry in the search page payload.
pub const VIDEO_RENDERER_KEY: &str = "videoRenderer";

/// Collects every object stored under `marker`, anywhere in `root`, in
/// breadth-first discovery order. Non-object values under the marker are
/// ignored; traversal continues into them regardless.
pub fn find_renderers<'a>(root: &'a Value, marker: &str) -> Vec<&'a Map<String, Value>> {
    let mut found = Vec::new();
    let mut visited: HashSet<*const Value> = HashSet::new();
    let mut queue: VecDeque<&'a Value> = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        if !visited.insert(std::ptr::from_ref(node)) {
            continue;
        }

        match node {
            Value::Object(map) => {
                if let Some(Value::Object(renderer)) = map.get(marker) {
                    found.push(renderer);
                }
                queue.extend(map.values().filter(|v| is_container(v)));
            }
            Value::Array(items) => {
                queue.extend(items.iter().filter(|v| is_container(v)));
            }
            _ => {}
        }
    }

    found
}

fn is_container(v: &Value) -> bool {
    v.is_object() || v.is_array()
}
