//! Schema defaults relative to projected data, and the defaults merge.

use serde_json::{Map, Value};

use crate::path::ConfigPath;
use crate::schema::{DefaultsMeta, Schema};

/// Defaults for the node at `path`, following the data already present.
///
/// `conf` is the projected content of that node (its children). Descent
/// follows every object in `conf`, so tag values the user created receive
/// the defaults of their subtree even though the schema alone never descends
/// into tag nodes. The result has the same shape as `conf`.
pub fn relative_defaults(
    schema: &dyn Schema,
    path: &ConfigPath,
    conf: &Map<String, Value>,
    recursive: bool,
) -> Map<String, Value> {
    if schema.is_leaf(path) {
        return Map::new();
    }
    let mut res = schema.defaults(path, recursive);
    for (key, value) in conf {
        if let Value::Object(child) = value {
            let step = relative_defaults(schema, &path.child_unchecked(key.as_str()), child, recursive);
            if !step.is_empty() {
                res.insert(key.clone(), Value::Object(step));
            }
        }
    }
    res
}

/// Fills holes in `target` with `defaults`; values in `target` win.
///
/// Every inserted key is recorded in `meta` under `base` + key.
pub fn merge_defaults(
    target: &mut Map<String, Value>,
    defaults: Map<String, Value>,
    base: &ConfigPath,
    meta: &mut DefaultsMeta,
) {
    for (key, default) in defaults {
        let path = base.child_unchecked(key.as_str());
        match target.get_mut(&key) {
            None => {
                target.insert(key, default);
                meta.record(path);
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(nested) = default {
                    merge_defaults(existing, nested, &path, meta);
                }
            }
            Some(_) => {}
        }
    }
}
