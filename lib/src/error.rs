//! Error types shared across the crate.

use std::collections::BTreeMap;

use thiserror::Error;

/// Why a single attribute failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttributeErrorKind {
    /// The value is present but does not have the declared type.
    InvalidType,
    /// A mandatory value is absent.
    Missing,
    /// The value does not correspond to any declared field.
    Extra,
}

/// A structural validation failure.
///
/// All offending fields are collected; validation never stops at the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", self.message())]
pub struct ValidationError {
    /// Fields whose value does not match the declared type.
    pub invalid: Vec<String>,
    /// Mandatory fields that were not provided.
    pub missing: Vec<String>,
    /// Provided fields that are not declared.
    pub extra: Vec<String>,
}

impl ValidationError {
    /// Returns true if no field failed.
    pub fn is_empty(&self) -> bool {
        self.invalid.is_empty() && self.missing.is_empty() && self.extra.is_empty()
    }

    /// All failing fields, in invalid, missing, extra order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.invalid
            .iter()
            .chain(self.missing.iter())
            .chain(self.extra.iter())
            .map(String::as_str)
    }

    /// The failure reason for each field.
    pub fn attribute_errors(&self) -> BTreeMap<&str, AttributeErrorKind> {
        let kinds = [
            (&self.invalid, AttributeErrorKind::InvalidType),
            (&self.missing, AttributeErrorKind::Missing),
            (&self.extra, AttributeErrorKind::Extra),
        ];
        kinds
            .into_iter()
            .flat_map(|(names, kind)| names.iter().map(move |n| (n.as_str(), kind)))
            .collect()
    }

    /// Human readable summary, e.g. `Errors found in port hostname`.
    pub fn message(&self) -> String {
        let fields = self.fields().collect::<Vec<_>>();
        let plural = if fields.len() > 1 { "s" } else { "" };
        format!("Error{plural} found in {}", fields.join(" "))
    }
}

/// The image resource attached to the charm could not be resolved.
#[derive(Debug, Error)]
#[error("fetching image resource {resource}: {reason}")]
pub struct ImageFetchError {
    /// Name of the resource, e.g. `image`.
    pub resource: String,
    /// What went wrong.
    pub reason: String,
}

impl ImageFetchError {
    /// Create a new error for `resource`.
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// A charm could not assemble its pod spec.
#[derive(Debug, Error)]
pub enum SpecBuildError {
    /// The charm configuration or relation data did not validate.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A configuration value is well typed but unusable.
    #[error("{0}")]
    Config(String),
    /// Anything else raised while building.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by relation interfaces and config loading.
#[derive(Debug, Error)]
pub enum Error {
    /// Input did not match the declared fields.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A relation field holds a value that cannot be parsed.
    #[error("invalid value {value:?} for field {field} on relation {relation}")]
    InvalidRelationData {
        /// Relation endpoint name.
        relation: String,
        /// Offending field.
        field: String,
        /// The raw value.
        value: String,
    },
    /// Structurally valid data did not fit the target type.
    #[error("deserializing validated data: {0}")]
    Deserialize(#[from] serde_json::Error),
    /// `config.yaml` is malformed.
    #[error("parsing config.yaml: {0}")]
    ConfigYaml(#[from] serde_yaml::Error),
}

/// The type of Result.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_message_pluralization() {
        let e = ValidationError {
            missing: names(&["port"]),
            ..Default::default()
        };
        assert_eq!(e.to_string(), "Error found in port");

        let e = ValidationError {
            invalid: names(&["port"]),
            missing: names(&["hostname"]),
            extra: names(&["bogus"]),
        };
        assert_eq!(e.to_string(), "Errors found in port hostname bogus");
    }

    #[test]
    fn test_attribute_errors() {
        let e = ValidationError {
            invalid: names(&["a"]),
            missing: names(&["b", "c"]),
            extra: names(&["d"]),
        };
        let errs = e.attribute_errors();
        assert_eq!(errs.len(), 4);
        assert_eq!(errs["a"], AttributeErrorKind::InvalidType);
        assert_eq!(errs["c"], AttributeErrorKind::Missing);
        assert_eq!(errs["d"], AttributeErrorKind::Extra);
        assert!(!e.is_empty());
        assert!(ValidationError::default().is_empty());
    }
}
