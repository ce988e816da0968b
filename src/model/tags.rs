use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Struct field tags, keyed by tag name (`json`, `yaml`, ...)
///
/// Values are kept raw; [`Tags::contains`] interprets them as comma-separated
/// option lists the way encoding/json does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([^\s:"]+):"((?:[^"\\]|\\.)*)""#).expect("tag pattern is valid")
    })
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a struct tag literal such as `` `json:"name,omitempty" yaml:"name"` ``.
    ///
    /// Surrounding backticks or double quotes are stripped. Malformed pairs are
    /// ignored rather than rejected.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw
            .strip_prefix('`')
            .and_then(|r| r.strip_suffix('`'))
            .unwrap_or(raw);

        let mut tags = BTreeMap::new();
        for cap in tag_pattern().captures_iter(raw) {
            tags.insert(cap[1].to_string(), cap[2].to_string());
        }
        Self(tags)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value for a tag key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether the comma-separated value list of `key` contains `element`
    pub fn contains(&self, key: &str, element: &str) -> bool {
        self.get(key)
            .map(|raw| raw.split(',').any(|e| e.trim() == element))
            .unwrap_or(false)
    }

    /// Shorthand for `contains("json", element)`
    pub fn json(&self, element: &str) -> bool {
        self.contains("json", element)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
