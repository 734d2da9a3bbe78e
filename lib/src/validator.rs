//! # Structural validation of untyped input
//!
//! Charm configuration and relation data arrive as loosely typed key/value
//! mappings. A [`Validator`] declares the expected shape as an explicit
//! [`Field`] table; [`validate_fields`] checks a mapping against it and
//! collects every invalid, missing and extra field into one
//! [`ValidationError`]. Once the shape is known to be right, the mapping is
//! deserialized into the implementing type with serde.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// The declared type of a field.
///
/// Container types are parametrized by the type of their elements (or keys
/// and values for [`FieldType::Map`]), and every element is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `true` or `false`.
    Boolean,
    /// A JSON integer within the `i64` range; booleans and floats are
    /// rejected.
    Integer,
    /// Any JSON number, integers included.
    Float,
    /// A JSON string.
    String,
    /// An array whose elements all have the given type.
    List(&'static FieldType),
    /// An array of unique elements of the given type.
    Set(&'static FieldType),
    /// A homogeneous array, for values which are tuples on the producing side.
    Tuple(&'static FieldType),
    /// An object. Keys are JSON strings, so an [`FieldType::Integer`] key
    /// type requires every key to parse as an integer.
    Map {
        /// Type of the keys.
        key: &'static FieldType,
        /// Type of the values.
        value: &'static FieldType,
    },
    /// The field may be absent or `null`.
    Optional(&'static FieldType),
}

impl FieldType {
    /// Whether this is an [`FieldType::Optional`] wrapper.
    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// The type with any optional wrappers removed.
    pub fn unwrap_optional(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    /// Check `value` against this type, recursing into containers.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Optional(_), Value::Null) => true,
            (FieldType::Optional(inner), v) => inner.matches(v),
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Integer, Value::Number(n)) => n.is_i64(),
            (FieldType::Float, Value::Number(_)) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::List(elem) | FieldType::Tuple(elem), Value::Array(items)) => {
                items.iter().all(|v| elem.matches(v))
            }
            (FieldType::Set(elem), Value::Array(items)) => {
                items.iter().all(|v| elem.matches(v))
                    && items
                        .iter()
                        .enumerate()
                        .all(|(i, v)| !items[..i].contains(v))
            }
            (FieldType::Map { key, value }, Value::Object(entries)) => entries
                .iter()
                .all(|(k, v)| key.matches_key(k) && value.matches(v)),
            _ => false,
        }
    }

    fn matches_key(&self, key: &str) -> bool {
        match self.unwrap_optional() {
            FieldType::String => true,
            FieldType::Integer => key.parse::<i64>().is_ok(),
            _ => false,
        }
    }
}

/// A declared field: the name it is looked up under and its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field name. Dashes and underscores are interchangeable.
    pub name: &'a str,
    /// Declared type.
    pub ty: FieldType,
}

impl<'a> Field<'a> {
    /// Declare a field.
    pub const fn new(name: &'a str, ty: FieldType) -> Self {
        Self { name, ty }
    }

    /// Whether the field may be omitted.
    pub fn is_optional(&self) -> bool {
        self.ty.is_optional()
    }
}

/// Charm option names use dashes, field names use underscores.
fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

/// Check `data` against `fields`.
///
/// On success, returns the input with normalized keys, ready to be
/// deserialized. `null` is treated the same as an absent value. Two input
/// keys which normalize to the same name, such as `log-level` and
/// `log_level`, make that field invalid (or extra, if undeclared).
pub fn validate_fields(
    fields: &[Field<'_>],
    data: &Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    let mut normalized = Map::new();
    let mut collisions = Vec::new();
    for (k, v) in data {
        let key = normalize_key(k);
        if normalized.insert(key.clone(), v.clone()).is_some() && !collisions.contains(&key) {
            collisions.push(key);
        }
    }

    let declared = fields
        .iter()
        .map(|f| (normalize_key(f.name), f.ty))
        .collect::<Vec<_>>();

    let mut err = ValidationError::default();
    err.extra = normalized
        .keys()
        .filter(|k| !declared.iter().any(|(name, _)| name == *k))
        .cloned()
        .collect();

    for (name, ty) in declared {
        if collisions.contains(&name) {
            err.invalid.push(name);
            continue;
        }
        match normalized.get(&name).filter(|v| !v.is_null()) {
            None if ty.is_optional() => {}
            None => err.missing.push(name),
            Some(v) => {
                if !ty.unwrap_optional().matches(v) {
                    err.invalid.push(name);
                }
            }
        }
    }

    if err.is_empty() {
        Ok(normalized)
    } else {
        tracing::debug!("Validation failed: {err:?}");
        Err(err)
    }
}

/// A type populated from an untyped mapping after structural validation.
///
/// ```
/// use opslib_osm::validator::{Field, FieldType, Validator};
///
/// #[derive(serde::Deserialize)]
/// struct PrometheusConfig {
///     web_subpath: String,
///     max_file_size: Option<i64>,
/// }
///
/// impl Validator for PrometheusConfig {
///     const FIELDS: &'static [Field<'static>] = &[
///         Field::new("web_subpath", FieldType::String),
///         Field::new("max_file_size", FieldType::Optional(&FieldType::Integer)),
///     ];
/// }
///
/// let data = serde_json::json!({"web-subpath": "/"});
/// let config = PrometheusConfig::validate(data.as_object().unwrap()).unwrap();
/// assert_eq!(config.web_subpath, "/");
/// assert_eq!(config.max_file_size, None);
/// ```
pub trait Validator: DeserializeOwned {
    /// The declared fields.
    const FIELDS: &'static [Field<'static>];

    /// Names of the fields which are not optional.
    fn mandatory_fields() -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .filter(|f| !f.is_optional())
            .map(|f| f.name)
            .collect()
    }

    /// Validate without populating.
    fn check(data: &Map<String, Value>) -> Result<(), ValidationError> {
        validate_fields(Self::FIELDS, data).map(|_| ())
    }

    /// Validate `data` and populate an instance from it.
    fn validate(data: &Map<String, Value>) -> crate::Result<Self> {
        let normalized = validate_fields(Self::FIELDS, data)?;
        Ok(serde_json::from_value(Value::Object(normalized))?)
    }
}
