use crate::error::{MediaError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// One tunable parameter of a model, as shown by `models`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Param {
    pub description: &'static str,
    #[serde(rename = "type")]
    pub type_: &'static str,
    #[serde(skip_serializing_if = "is_empty_list")]
    pub options: &'static [&'static str],
    #[serde(skip_serializing_if = "str::is_empty")]
    pub default: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl Param {
    pub const fn string(description: &'static str) -> Self {
        Self {
            description,
            type_: "string",
            options: &[],
            default: "",
            required: false,
        }
    }

    pub const fn typed(type_: &'static str, description: &'static str) -> Self {
        Self {
            description,
            type_,
            options: &[],
            default: "",
            required: false,
        }
    }

    pub const fn options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self
    }

    pub const fn default_value(mut self, default: &'static str) -> Self {
        self.default = default;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

fn is_empty_list(list: &&'static [&'static str]) -> bool {
    list.is_empty()
}

/// A model a CLI can drive, with its capabilities and parameters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Model {
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [&'static str],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<&'static str, Param>,
}

impl Model {
    pub fn new(
        name: &'static str,
        description: &'static str,
        capabilities: &'static [&'static str],
        params: impl IntoIterator<Item = (&'static str, Param)>,
    ) -> Self {
        Self {
            name,
            description,
            capabilities,
            params: params.into_iter().collect(),
        }
    }
}

/// The models one CLI tool exposes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Registry {
    pub tool: &'static str,
    pub models: Vec<Model>,
}

impl Registry {
    pub fn find(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Pretty JSON for the whole registry, or for one model when `name` is given.
    pub fn to_json(&self, name: Option<&str>) -> Result<String> {
        match name {
            Some(name) => {
                let model = self
                    .find(name)
                    .ok_or_else(|| MediaError::UnknownModel(name.to_string()))?;
                Ok(serde_json::to_string_pretty(model)?)
            }
            None => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry {
            tool: "demo-cli",
            models: vec![Model::new(
                "demo-model",
                "A demo",
                &["text-to-video"],
                [(
                    "ratio",
                    Param::string("Aspect ratio").options(&["16:9", "1:1"]).default_value("16:9"),
                )],
            )],
        }
    }

    #[test]
    fn single_model_json_omits_empty_fields() {
        let json: serde_json::Value =
            serde_json::from_str(&registry().to_json(Some("demo-model")).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "demo-model",
                "description": "A demo",
                "capabilities": ["text-to-video"],
                "params": {
                    "ratio": {
                        "description": "Aspect ratio",
                        "type": "string",
                        "options": ["16:9", "1:1"],
                        "default": "16:9"
                    }
                }
            })
        );
    }

    #[test]
    fn unknown_model_is_an_error() {
        assert!(matches!(
            registry().to_json(Some("nope")),
            Err(MediaError::UnknownModel(name)) if name == "nope"
        ));
    }
}
