//! The configuration tree.

use std::collections::BTreeMap;
use std::ops::Index;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use super::value::{Value, NULL};
use crate::template::TemplateValue;

/// Keys starting with this prefix are reserved for bookkeeping.
///
/// They can be stored and read, but are never serialized, and are dropped
/// when a file is read.
pub const RESERVED_PREFIX: &str = "_";

pub(crate) fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// One mapping level of a configuration tree.
///
/// Values are converted when they enter the tree (see [`Value`]), so a
/// mapping assigned with [`set`](Self::set) is a `ConfigNode` by the time it
/// can be read back, and a string is a [`TemplateValue`].
///
/// Reads never fail: [`get`](Self::get) returns `None` for missing keys, and
/// indexing returns [`Value::Null`] at any depth.
///
/// ```
/// use konfigure::ConfigNode;
/// use serde_json::json;
///
/// let mut config = ConfigNode::from_json(json!({"a": {"b": "c"}, "d": "e"}));
/// assert_eq!(config["a"]["b"], "c");
/// assert!(config["z"]["y"].is_null());
///
/// config.node_mut("a").unwrap().set("b", "f");
/// assert_eq!(config.to_serializable(), json!({"a": {"b": "f"}, "d": "e"}));
/// ```
///
/// Each node records where it sits in its tree: the key it is stored under
/// and its [`location`](Self::location) from the root. These are for
/// introspection only and are kept up to date as subtrees are moved around.
/// A tree is not synchronized; callers sharing one across threads must
/// serialize mutation themselves.
#[derive(Debug, Clone, Default)]
pub struct ConfigNode {
    entries: BTreeMap<String, Value>,
    file_path: Option<PathBuf>,
    parent_key: Option<String>,
    location: Vec<String>,
}

impl ConfigNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a node from a plain structure.
    ///
    /// Anything other than an object (including `null`) yields an empty node.
    pub fn from_json(initial: Json) -> Self {
        match initial {
            Json::Object(map) => Self::from_map(map),
            _ => Self::new(),
        }
    }

    pub fn from_map(map: Map<String, Json>) -> Self {
        let mut node = Self::new();
        for (key, value) in map {
            node.set(key, value);
        }
        node
    }

    /// Binds this node to the file it is loaded from and saved to.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.bind_file(path);
        self
    }

    pub fn bind_file(&mut self, path: impl Into<PathBuf>) {
        self.file_path = Some(path.into());
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// The key this node is stored under in its parent.
    ///
    /// `None` for roots and for nodes held directly in a list.
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    /// Path of keys from the root to this node. List elements appear as
    /// their decimal index. Resolve it against the root with
    /// [`at_path`](Self::at_path).
    pub fn location(&self) -> &[String] {
        &self.location
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn node(&self, key: &str) -> Option<&ConfigNode> {
        self.get(key).and_then(Value::as_node)
    }

    pub fn node_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.get_mut(key).and_then(Value::as_node_mut)
    }

    pub fn template(&self, key: &str) -> Option<&TemplateValue> {
        self.get(key).and_then(Value::as_template)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Converts `value` and stores it under `key`, returning the previous
    /// value. Nodes inside `value` are re-parented to this node and lose any
    /// bound file path.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let mut value = value.into();
        place(&mut value, self.child_location(&key), Some(key.as_str()));
        self.entries.insert(key, value)
    }

    /// Removes `key`. Removing a missing key does nothing.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Appends `item` to the list under `key`, creating the list if the key
    /// is missing or null.
    ///
    /// Returns `false` and leaves the node untouched if `key` holds anything
    /// other than a list.
    pub fn push(&mut self, key: &str, item: impl Into<Value>) -> bool {
        let mut at = self.child_location(key);
        let slot = self.entries.entry(key.to_owned()).or_default();
        if slot.is_null() {
            *slot = Value::List(Vec::new());
        }
        let Value::List(items) = slot else {
            return false;
        };

        let mut item = item.into();
        at.push(items.len().to_string());
        place(&mut item, at, None);
        items.push(item);
        true
    }

    /// Follows a dotted path such as `"agents.0.prompt"`.
    ///
    /// Segments step into nodes by key and into lists by decimal index. An
    /// empty path or empty segment resolves to nothing.
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        let parts = split_dotted(dotted)?;
        self.at_path(&parts)
    }

    pub fn at_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.get(first.as_ref())?;
        for part in rest {
            let part = part.as_ref();
            current = match current {
                Value::Node(node) => node.get(part)?,
                Value::List(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Stores `value` at a dotted path, creating intermediate nodes and
    /// replacing intermediate values that aren't nodes.
    ///
    /// Returns `false` without changing anything if the path is empty or has
    /// an empty segment.
    pub fn assign(&mut self, dotted: &str, value: impl Into<Value>) -> bool {
        let Some(parts) = split_dotted(dotted) else {
            return false;
        };
        let Some((last, parents)) = parts.split_last() else {
            return false;
        };

        let mut node = self;
        for part in parents {
            if node.node(part).is_none() {
                node.set(*part, ConfigNode::new());
            }
            let Some(Value::Node(child)) = node.entries.get_mut(*part) else {
                return false;
            };
            node = child;
        }
        node.set(*last, value);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys in sorted order, reserved ones included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn visible(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().filter(|(k, _)| !is_reserved(k))
    }

    /// Plain structure of the visible keys, templates unwrapped to their raw
    /// strings. Bookkeeping never appears in the output.
    pub fn to_serializable(&self) -> Json {
        Json::Object(
            self.visible()
                .map(|(k, v)| (k.clone(), v.to_serializable()))
                .collect(),
        )
    }

    fn child_location(&self, key: &str) -> Vec<String> {
        let mut at = self.location.clone();
        at.push(key.to_owned());
        at
    }

    fn relocate(&mut self, location: Vec<String>) {
        for (key, value) in self.entries.iter_mut() {
            let mut at = location.clone();
            at.push(key.clone());
            place(value, at, Some(key.as_str()));
        }
        self.location = location;
    }
}

/// Records the position of every node inside `value`.
fn place(value: &mut Value, location: Vec<String>, parent_key: Option<&str>) {
    match value {
        Value::Node(node) => {
            node.file_path = None;
            node.parent_key = parent_key.map(str::to_owned);
            node.relocate(location);
        }
        Value::List(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                let mut at = location.clone();
                at.push(index.to_string());
                place(item, at, None);
            }
        }
        _ => {}
    }
}

fn split_dotted(dotted: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = dotted.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Drops reserved keys at every depth of a freshly parsed document.
pub(crate) fn strip_reserved(map: &mut Map<String, Json>) {
    map.retain(|key, _| !is_reserved(key));
    for value in map.values_mut() {
        strip_reserved_value(value);
    }
}

fn strip_reserved_value(value: &mut Json) {
    match value {
        Json::Object(map) => strip_reserved(map),
        Json::Array(items) => items.iter_mut().for_each(strip_reserved_value),
        _ => {}
    }
}

/// Nodes compare by their entries; bookkeeping is ignored.
impl PartialEq for ConfigNode {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Index<&str> for ConfigNode {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.visible() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ConfigNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Json::deserialize(deserializer)? {
            Json::Object(map) => Ok(Self::from_map(map)),
            Json::Null => Ok(Self::new()),
            other => Err(D::Error::custom(format!(
                "expected a mapping, found {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ConfigNode {
        ConfigNode::from_json(json!({"a": {"b": "c"}, "d": "e"}))
    }

    #[test]
    fn test_nested_access() {
        let config = sample();
        assert_eq!(config["a"]["b"], "c");
        assert_eq!(config["d"], "e");
        assert!(config.get("z").is_none());
        assert!(config["z"].is_null());
    }

    #[test]
    fn test_chained_absence() {
        let config = ConfigNode::new();
        assert!(config["x"]["y"]["z"].is_null());
        assert!(config.get("x").and_then(|v| v.get("y")).is_none());
        assert!(config.lookup("x.y.z").is_none());
    }

    #[test]
    fn test_values_are_converted() {
        let config = ConfigNode::from_json(json!({
            "text": "Hello {{ name }}",
            "count": 42,
            "ratio": 2.75,
            "flag": true,
            "nothing": null,
            "list": [1, 2, 3],
            "mixed": [1, "two", {"three": 3}]
        }));

        let text = config.template("text").unwrap();
        assert_eq!(text.render(&json!({"name": "World"})).unwrap(), "Hello World");
        assert_eq!(config["count"], 42);
        assert_eq!(config["ratio"], 2.75);
        assert_eq!(config["flag"], true);
        assert_eq!(config.get("nothing"), Some(&Value::Null));
        assert_eq!(config["list"].as_list().unwrap().len(), 3);
        assert_eq!(config["mixed"][2]["three"], 3);
    }

    #[test]
    fn test_set_overwrites_and_converts() {
        let mut config = ConfigNode::new();
        config.set("a", json!({"b": "c"}));
        config.set("d", "e");
        assert_eq!(config["a"]["b"], "c");

        config.node_mut("a").unwrap().set("b", "f");
        assert_eq!(config["a"]["b"], "f");
        assert_eq!(config.to_serializable(), json!({"a": {"b": "f"}, "d": "e"}));

        let previous = config.set("a", true);
        assert!(previous.unwrap().as_node().is_some());
        assert_eq!(config["a"], true);
    }

    #[test]
    fn test_deep_nesting() {
        let mut config = ConfigNode::from_json(json!({
            "level1": {"level2": {"level3": {"level4": {"level5": "deep value"}}}}
        }));
        assert_eq!(config["level1"]["level2"]["level3"]["level4"]["level5"], "deep value");

        let level4 = config
            .node_mut("level1")
            .and_then(|n| n.node_mut("level2"))
            .and_then(|n| n.node_mut("level3"))
            .and_then(|n| n.node_mut("level4"))
            .unwrap();
        level4.set("level5", "new deep value");
        level4.set("new_key", "another deep value");

        assert_eq!(config.lookup("level1.level2.level3.level4.level5").unwrap(), "new deep value");
        assert_eq!(config.lookup("level1.level2.level3.level4.new_key").unwrap(), "another deep value");
    }

    #[test]
    fn test_remove() {
        let mut config = sample();
        assert!(config.remove("d").is_some());
        assert!(config.remove("d").is_none());
        assert!(config.remove("never-there").is_none());
        assert_eq!(config.to_serializable(), json!({"a": {"b": "c"}}));
    }

    #[test]
    fn test_parent_tracking() {
        let config = ConfigNode::from_json(json!({
            "outer": {"inner": {"leaf": 1}},
            "users": [{"name": "Alice"}]
        }));

        let inner = config.node("outer").unwrap().node("inner").unwrap();
        assert_eq!(inner.parent_key(), Some("inner"));
        assert_eq!(inner.location(), ["outer", "inner"]);
        assert_eq!(config.at_path(inner.location()).unwrap().as_node(), Some(inner));

        let alice = config["users"][0].as_node().unwrap();
        assert_eq!(alice.parent_key(), None);
        assert_eq!(alice.location(), ["users", "0"]);
        assert_eq!(config.at_path(alice.location()).unwrap()["name"], "Alice");

        assert!(config.parent_key().is_none());
        assert!(config.location().is_empty());
    }

    #[test]
    fn test_set_reparents_existing_node() {
        let mut child = ConfigNode::from_json(json!({"nested": {"x": 1}})).with_file("/tmp/child.yaml");
        child.set("y", 2);

        let mut root = ConfigNode::new();
        root.set("moved", child);

        let moved = root.node("moved").unwrap();
        assert_eq!(moved.parent_key(), Some("moved"));
        assert!(moved.file_path().is_none());
        assert_eq!(moved.node("nested").unwrap().location(), ["moved", "nested"]);
        assert_eq!(moved["y"], 2);
    }

    #[test]
    fn test_push() {
        let mut config = ConfigNode::from_json(json!({
            "users": [{"name": "Alice", "roles": ["admin"]}],
            "scalar": 1
        }));

        assert!(config.push("users", json!({"name": "Charlie", "roles": ["tester"]})));
        assert_eq!(config["users"].as_list().unwrap().len(), 2);
        assert_eq!(config["users"][1]["name"], "Charlie");
        assert_eq!(config["users"][1].as_node().unwrap().location(), ["users", "1"]);

        let alice = config.get_mut("users").and_then(Value::as_list_mut).unwrap()[0]
            .as_node_mut()
            .unwrap();
        assert!(alice.push("roles", "developer"));
        assert_eq!(config["users"][0]["roles"][1], "developer");

        assert!(config.push("fresh", 1));
        assert_eq!(config.to_serializable()["fresh"], json!([1]));

        assert!(!config.push("scalar", 2));
        assert_eq!(config["scalar"], 1);
    }

    #[test]
    fn test_lookup() {
        let config = ConfigNode::from_json(json!({
            "agents": [{"prompt": "hi"}],
            "server": {"port": 8080}
        }));
        assert_eq!(config.lookup("server.port").unwrap(), 8080);
        assert_eq!(config.lookup("agents.0.prompt").unwrap(), "hi");
        assert!(config.lookup("agents.1.prompt").is_none());
        assert!(config.lookup("agents.x").is_none());
        assert!(config.lookup("server.port.deeper").is_none());
        assert!(config.lookup("").is_none());
        assert!(config.lookup("server..port").is_none());
    }

    #[test]
    fn test_assign() {
        let mut config = ConfigNode::from_json(json!({"a": 1}));
        assert!(config.assign("a.b.c", "deep"));
        assert!(config.assign("x", true));
        assert!(!config.assign("bad..path", 1));
        assert_eq!(
            config.to_serializable(),
            json!({"a": {"b": {"c": "deep"}}, "x": true})
        );
        assert_eq!(config.node("a").unwrap().node("b").unwrap().location(), ["a", "b"]);
    }

    #[test]
    fn test_reserved_keys_are_not_serialized() {
        let mut config = sample();
        config.set("_internal", "hidden");
        assert_eq!(config["_internal"], "hidden");
        assert_eq!(config.to_serializable(), json!({"a": {"b": "c"}, "d": "e"}));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"a": {"b": "c"}, "d": "e"})
        );
    }

    #[test]
    fn test_round_trip_law() {
        let plain = json!({
            "string": "hello",
            "integer": 42,
            "negative": -7,
            "float": 2.5,
            "boolean": false,
            "null": null,
            "list": [1, "two", null, [true], {"k": "v"}],
            "dict": {"a": 1, "b": {"c": []}},
            "empty": {}
        });
        assert_eq!(ConfigNode::from_json(plain.clone()).to_serializable(), plain);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(ConfigNode::from_json(Json::Null).is_empty());
        assert!(ConfigNode::from_json(json!({})).is_empty());
        assert!(ConfigNode::from_json(json!([1, 2])).is_empty());
        assert_eq!(ConfigNode::new().to_serializable(), json!({}));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = sample();
        let mut copy = original.clone();
        copy.node_mut("a").unwrap().set("b", "changed");
        assert_eq!(original["a"]["b"], "c");
        assert_eq!(copy["a"]["b"], "changed");
    }

    #[test]
    fn test_equality_ignores_bookkeeping() {
        let bound = sample().with_file("/tmp/a.yaml");
        assert_eq!(bound, sample());
    }

    #[test]
    fn test_deserialize() {
        let node: ConfigNode = serde_json::from_value(json!({"a": {"b": "c"}})).unwrap();
        assert_eq!(node["a"]["b"], "c");
        assert!(serde_json::from_value::<ConfigNode>(json!(3)).is_err());
    }

    #[test]
    fn test_strip_reserved() {
        let mut map = match json!({"_a": 1, "b": {"_c": 2, "d": [{"_e": 3, "f": 4}]}}) {
            Json::Object(map) => map,
            _ => unreachable!(),
        };
        strip_reserved(&mut map);
        assert_eq!(Json::Object(map), json!({"b": {"d": [{"f": 4}]}}));
    }
}
