//! Slash-separated paths into a JSON document (`live/scores/f_3`).

use serde_json::{Map, Value};

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub fn join(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{rel}"),
    }
}

/// Whether one path is an ancestor of (or equal to) the other.
pub fn related(a: &str, b: &str) -> bool {
    segments(a).zip(segments(b)).all(|(x, y)| x == y)
}

pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, seg| match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `path`, creating intermediate objects. Writing `null` deletes the leaf.
pub fn set(root: &mut Value, path: &str, value: Value) {
    let segs: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for seg in parents {
        if !node.is_object() {
            if value.is_null() {
                return;
            }
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        if value.is_null() {
            map.remove(*last);
        } else {
            map.insert(last.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_parents_and_null_deletes() {
        let mut doc = json!({});
        set(&mut doc, "live/scores/f_1", json!({"team1": 3, "team2": 5}));
        assert_eq!(get(&doc, "live/scores/f_1/team2"), Some(&json!(5)));

        set(&mut doc, "live/scores/f_1", Value::Null);
        assert_eq!(get(&doc, "live/scores/f_1"), None);
        assert_eq!(get(&doc, "live/scores"), Some(&json!({})));
    }

    #[test]
    fn get_walks_arrays_by_index() {
        let doc = json!({"players": [{"name": "Ana"}, {"name": "Ben"}]});
        assert_eq!(get(&doc, "players/1/name"), Some(&json!("Ben")));
        assert_eq!(get(&doc, "players/7/name"), None);
    }

    #[test]
    fn related_paths() {
        assert!(related("tournaments/a/live", "tournaments/a/live/scores/f_0"));
        assert!(related("tournaments/a", "tournaments/a"));
        assert!(!related("tournaments/a/live", "tournaments/a/meta"));
        assert_eq!(join("tournaments/a", "live"), "tournaments/a/live");
        assert_eq!(join("", "live"), "live");
    }
}
