//! # Charm configuration options
//!
//! A charm declares its options in `config.yaml`; the host hands back only
//! the values the operator set. This module parses the declarations, fills
//! in defaults and derives a validator [`Field`] table from the option types.

use std::path::Path;

use anyhow::{Context, Result};
use fn_error_context::context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::validator::{validate_fields, Field, FieldType};

/// The type of a charm option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// `string`
    String,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `boolean`
    Boolean,
}

impl OptionType {
    fn field_type(self) -> FieldType {
        match self {
            OptionType::String => FieldType::String,
            OptionType::Int => FieldType::Integer,
            OptionType::Float => FieldType::Float,
            OptionType::Boolean => FieldType::Boolean,
        }
    }
}

/// A single option declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOption {
    /// Value type.
    #[serde(rename = "type")]
    pub kind: OptionType,
    /// Default value; options without one are optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The contents of a charm's `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOptions {
    /// Declared options, in file order.
    #[serde(default)]
    pub options: IndexMap<String, ConfigOption>,
}

impl ConfigOptions {
    /// Parse `config.yaml` contents.
    pub fn from_yaml(contents: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load and parse a `config.yaml` file.
    #[context("Loading charm config options from {}", path.display())]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let options = Self::from_yaml(&contents).context("Parsing")?;
        tracing::debug!("Loaded {} config options", options.options.len());
        Ok(options)
    }

    /// Values of all options which declare a default.
    pub fn defaults(&self) -> Map<String, Value> {
        self.options
            .iter()
            .filter_map(|(name, opt)| Some((name.clone(), opt.default.clone()?)))
            .collect()
    }

    /// Merge host provided `values` over the declared defaults.
    ///
    /// Values for undeclared options are kept, so that validation can report
    /// them as extra.
    pub fn resolve(&self, values: &Map<String, Value>) -> Map<String, Value> {
        let mut config = self.defaults();
        for (k, v) in values {
            config.insert(k.clone(), v.clone());
        }
        config
    }

    /// One field per option. Options without a default are optional.
    pub fn fields(&self) -> Vec<Field<'_>> {
        self.options
            .iter()
            .map(|(name, opt)| {
                let ty = match (opt.kind, opt.default.is_some()) {
                    (kind, true) => kind.field_type(),
                    (OptionType::String, false) => FieldType::Optional(&FieldType::String),
                    (OptionType::Int, false) => FieldType::Optional(&FieldType::Integer),
                    (OptionType::Float, false) => FieldType::Optional(&FieldType::Float),
                    (OptionType::Boolean, false) => FieldType::Optional(&FieldType::Boolean),
                };
                Field::new(name, ty)
            })
            .collect()
    }

    /// Resolve `values` and check the result against the declared types.
    pub fn check(&self, values: &Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        validate_fields(&self.fields(), &self.resolve(values))
    }
}
