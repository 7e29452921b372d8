//! Tag-aware loader for tool configuration

use super::value::{ConfigValue, Tag, TaggedValue};
use crate::error::{Error, Result};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
struct Scope {
    tags: BTreeSet<Tag>,
    default: Option<Tag>,
}

/// Loads the section of a configuration document that belongs to one tool
///
/// Tag validity is positional. Global tags are accepted everywhere, scope
/// tags only below the top-level key that registered them. A default tag is
/// attached to untagged strings, and also counts as valid where it applies.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    tool: String,
    global_tags: BTreeSet<Tag>,
    default: Option<Tag>,
    scopes: HashMap<String, Scope>,
}

impl ConfigLoader {
    /// Loader for the section keyed by `tool`
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            global_tags: BTreeSet::new(),
            default: None,
            scopes: HashMap::new(),
        }
    }

    /// Tags accepted anywhere in the section
    #[must_use]
    pub fn global_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.global_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Tag given to untagged strings outside any scope with its own default
    #[must_use]
    pub fn default_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.default = Some(tag.into());
        self
    }

    /// Register tags (and optionally a default) for the top-level `key`.
    ///
    /// Repeated calls for the same key merge tags; a later default replaces
    /// an earlier one, an absent default keeps it.
    pub fn scope<I, T>(&mut self, key: &str, tags: I, default: Option<Tag>) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let scope = self.scopes.entry(key.to_string()).or_default();
        scope.tags.extend(tags.into_iter().map(Into::into));
        if default.is_some() {
            scope.default = default;
        }
        self
    }

    /// Tool this loader reads
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Parse `content` and return the tool's section.
    pub fn load(&self, content: &str, validate: bool) -> Result<ConfigValue> {
        let document: Value = serde_yaml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("config is not valid yaml: {e}")))?;

        let section = match document {
            Value::Mapping(mut map) => map.remove(self.tool.as_str()),
            _ => None,
        };
        let Some(section) = section else {
            return Err(Error::MissingTool(self.tool.clone()));
        };

        let mut config = self.convert(section)?;
        if !config.is_truthy() {
            return Err(Error::MissingTool(self.tool.clone()));
        }

        match &mut config {
            ConfigValue::Mapping(map) => {
                for (key, value) in map.iter_mut() {
                    if let Some(scope) = self.scopes.get(key) {
                        let default = scope.default.as_ref().or(self.default.as_ref());
                        self.apply_default(value, default);
                        apply_scope(value, &scope.tags);
                    } else {
                        self.apply_default(value, self.default.as_ref());
                    }
                }
            }
            other => self.apply_default(other, self.default.as_ref()),
        }

        if validate {
            self.validate(&config)?;
        }

        Ok(config)
    }

    fn convert(&self, value: Value) -> Result<ConfigValue> {
        Ok(match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => ConfigValue::Number(n),
            Value::String(s) => ConfigValue::String(s),
            Value::Sequence(items) => ConfigValue::Sequence(
                items
                    .into_iter()
                    .map(|v| self.convert(v))
                    .collect::<Result<_>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(key_text(k)?, self.convert(v)?);
                }
                ConfigValue::Mapping(out)
            }
            Value::Tagged(tagged) => ConfigValue::Tagged(TaggedValue {
                value: scalar_text(tagged.value)?,
                tag: Tag::new(&tagged.tag.to_string()),
                valid_tags: self.global_tags.clone(),
            }),
        })
    }

    fn apply_default(&self, value: &mut ConfigValue, default: Option<&Tag>) {
        let Some(default) = default else {
            return;
        };
        match value {
            ConfigValue::String(s) => {
                let mut valid_tags = self.global_tags.clone();
                valid_tags.insert(default.clone());
                *value = ConfigValue::Tagged(TaggedValue {
                    value: std::mem::take(s),
                    tag: default.clone(),
                    valid_tags,
                });
            }
            ConfigValue::Tagged(t) => {
                t.valid_tags.insert(default.clone());
            }
            ConfigValue::Sequence(items) => {
                for item in items {
                    self.apply_default(item, Some(default));
                }
            }
            ConfigValue::Mapping(map) => {
                for item in map.values_mut() {
                    self.apply_default(item, Some(default));
                }
            }
            ConfigValue::Null | ConfigValue::Bool(_) | ConfigValue::Number(_) => {}
        }
    }

    fn validate(&self, value: &ConfigValue) -> Result<()> {
        for tagged in value.tagged_values() {
            if !tagged.is_valid() {
                return Err(Error::InvalidConfig(format!(
                    "!{} is not a valid tag for {}",
                    tagged.tag, self.tool
                )));
            }
        }
        Ok(())
    }
}

fn apply_scope(value: &mut ConfigValue, tags: &BTreeSet<Tag>) {
    match value {
        ConfigValue::Tagged(t) => t.valid_tags.extend(tags.iter().cloned()),
        ConfigValue::Sequence(items) => items.iter_mut().for_each(|i| apply_scope(i, tags)),
        ConfigValue::Mapping(map) => map.values_mut().for_each(|i| apply_scope(i, tags)),
        _ => {}
    }
}

fn key_text(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(Error::InvalidConfig(format!(
            "unsupported mapping key: {other:?}"
        ))),
    }
}

fn scalar_text(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        nested => serde_yaml::to_string(&nested)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| Error::InvalidConfig(e.to_string())),
    }
}
