//! Specification and status payloads shared by every entity kind.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Handler type used when a caller does not pick one.
pub const DEFAULT_TYPE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Persisted configuration of an entity.
///
/// `type` selects the handler that derives the stored specification and performs side
/// effects; it cannot change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default = "empty_object")]
    pub configuration: Value,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Specification {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = configuration;
        self
    }
}

impl Default for Specification {
    fn default() -> Self {
        Self {
            description: String::new(),
            tags: Vec::new(),
            kind: default_type(),
            configuration: empty_object(),
        }
    }
}

/// Runtime facts reported by agents. Never validated or derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub agent_status: Map<String, Value>,
}

impl Status {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.agent_status.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.agent_status.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.agent_status.is_empty()
    }
}
