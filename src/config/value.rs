//! Configuration tree and tagged leaves

use serde_yaml::value::{Tag as YamlTag, TaggedValue as YamlTagged};
use serde_yaml::{Mapping, Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Behavioral annotation on a configuration value (`!include foo.c`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    /// Submit matching files
    Include,
    /// Leave matching files out
    Exclude,
    /// File must exist
    Require,
    /// Tool-specific tag
    Other(String),
}

impl Tag {
    /// Tag from its name, with or without the leading `!`
    pub fn new(name: &str) -> Self {
        match name.strip_prefix('!').unwrap_or(name) {
            "include" => Self::Include,
            "exclude" => Self::Exclude,
            "require" => Self::Require,
            other => Self::Other(other.to_string()),
        }
    }

    /// Bare tag name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::Require => "require",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A configuration leaf carrying a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedValue {
    /// Scalar text (collections keep their YAML rendering)
    pub value: String,
    /// Tag attached in the document or by a default
    pub tag: Tag,
    /// Tags accepted at this position
    pub valid_tags: BTreeSet<Tag>,
}

impl TaggedValue {
    /// Leaf with no accepted tags yet
    pub fn new(value: impl Into<String>, tag: Tag) -> Self {
        Self {
            value: value.into(),
            tag,
            valid_tags: BTreeSet::new(),
        }
    }

    /// Whether the tag is accepted where this leaf sits
    pub fn is_valid(&self) -> bool {
        self.valid_tags.contains(&self.tag)
    }

    /// Render back to a tagged YAML node
    pub fn to_yaml(&self) -> Value {
        Value::Tagged(Box::new(YamlTagged {
            tag: YamlTag::new(self.tag.as_str()),
            value: Value::String(self.value.clone()),
        }))
    }
}

/// Tool section of a configuration document
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// `~` or an empty value
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Numeric scalar
    Number(Number),
    /// Untagged string that received no default
    String(String),
    /// Tagged leaf
    Tagged(TaggedValue),
    /// Ordered list
    Sequence(Vec<ConfigValue>),
    /// Key/value section
    Mapping(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Child under `key` if this is a mapping
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Text of a plain or tagged string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Tagged(t) => Some(&t.value),
            _ => None,
        }
    }

    /// Truthiness as configuration authors expect it: empty and zero are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::String(s) => !s.is_empty(),
            Self::Tagged(_) => true,
            Self::Sequence(items) => !items.is_empty(),
            Self::Mapping(map) => !map.is_empty(),
        }
    }

    /// Tagged leaves in document order
    pub fn tagged_values(&self) -> Vec<&TaggedValue> {
        let mut out = Vec::new();
        self.collect_tagged(&mut out);
        out
    }

    fn collect_tagged<'a>(&'a self, out: &mut Vec<&'a TaggedValue>) {
        match self {
            Self::Tagged(t) => out.push(t),
            Self::Sequence(items) => items.iter().for_each(|i| i.collect_tagged(out)),
            Self::Mapping(map) => map.values().for_each(|v| v.collect_tagged(out)),
            _ => {}
        }
    }

    /// Render back to YAML
    pub fn to_yaml(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Tagged(t) => t.to_yaml(),
            Self::Sequence(items) => Value::Sequence(items.iter().map(Self::to_yaml).collect()),
            Self::Mapping(map) => {
                let mut out = Mapping::new();
                for (k, v) in map {
                    out.insert(Value::String(k.clone()), v.to_yaml());
                }
                Value::Mapping(out)
            }
        }
    }
}
