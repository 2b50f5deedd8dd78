//! Regex-based renaming of projection keys.

use regex::Regex;
use serde_json::{Map, Value};

use super::ViewError;
use crate::path::ConfigPath;

/// A `(pattern, replacement)` pair applied to every key of a projection.
///
/// Tag values are exempt whenever the caller's predicate says so.
#[derive(Debug, Clone)]
pub struct KeyMangling {
    pattern: Regex,
    replacement: String,
}

impl PartialEq for KeyMangling {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str() && self.replacement == other.replacement
    }
}

impl Eq for KeyMangling {}

impl KeyMangling {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, ViewError> {
        if replacement.chars().any(char::is_whitespace) {
            return Err(ViewError::InvalidReplacement {
                replacement: replacement.to_string(),
            });
        }
        let pattern = Regex::new(pattern).map_err(|source| ViewError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Mangles one key.
    pub fn apply(&self, key: &str) -> String {
        self.pattern
            .replace_all(key, regex::NoExpand(&self.replacement))
            .into_owned()
    }

    /// Mangles every key of `data` recursively.
    ///
    /// `base` is the unmangled tree path of the map itself; `preserve` is
    /// asked about the tree path of each key and keeps it verbatim when true.
    pub fn apply_to_map(
        &self,
        data: Map<String, Value>,
        base: &ConfigPath,
        preserve: &dyn Fn(&ConfigPath) -> bool,
    ) -> Map<String, Value> {
        data.into_iter()
            .map(|(key, value)| {
                let path = base.child_unchecked(key.as_str());
                let new_key = if preserve(&path) {
                    key
                } else {
                    self.apply(&key)
                };
                let value = match value {
                    Value::Object(map) => Value::Object(self.apply_to_map(map, &path, preserve)),
                    other => other,
                };
                (new_key, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_path;
    use serde_json::json;

    #[test]
    fn test_rejects_whitespace_replacement() {
        assert!(KeyMangling::new("-", " ").unwrap_err().is_invalid_mangling());
        assert!(KeyMangling::new("(", "_").unwrap_err().is_invalid_mangling());
    }

    #[test]
    fn test_apply_is_literal() {
        let mangling = KeyMangling::new("-", "$1").unwrap();
        assert_eq!(mangling.apply("host-name"), "host$1name");
        assert_eq!(KeyMangling::new("-", "_").unwrap().apply("a-b-c"), "a_b_c");
    }

    #[test]
    fn test_preserves_selected_keys() {
        let data = json!({
            "ethernet": {"eth-0": {"hw-id": "00:11"}},
            "host-name": "r1"
        });
        let Value::Object(data) = data else { unreachable!() };
        let mangling = KeyMangling::new("-", "_").unwrap();
        let tag_values = config_path!("interfaces ethernet eth-0");
        let out = mangling.apply_to_map(data, &config_path!("interfaces"), &|p| p == &tag_values);
        assert_eq!(
            Value::Object(out),
            json!({"ethernet": {"eth-0": {"hw_id": "00:11"}}, "host_name": "r1"})
        );
    }

    #[test]
    fn test_equality_compares_source() {
        assert_eq!(
            KeyMangling::new("-", "_").unwrap(),
            KeyMangling::new("-", "_").unwrap()
        );
        assert_ne!(KeyMangling::new("-", "_").unwrap(), KeyMangling::new("-", ".").unwrap());
    }
}
