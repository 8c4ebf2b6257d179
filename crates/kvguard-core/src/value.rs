//! The untyped reply model returned by drivers.

use crate::error::DriverError;

/// A single reply from the underlying store.
///
/// Drivers return replies in this shape; the command executor in
/// `kvguard-client` converts each reply into the natural Rust type for the
/// command that produced it. Absent values are always `Nil`, never an
/// empty string or a missing map entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value (missing key, missing field, nil reply).
    Nil,

    /// An integer reply (counters, lengths, boolean-as-0/1).
    Integer(i64),

    /// A floating point reply (sorted-set scores).
    Double(f64),

    /// A text reply (values, simple status strings such as `OK`).
    Text(String),

    /// An array reply, element order preserved.
    Array(Vec<Value>),

    /// A field/value map reply (hash contents).
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Returns `true` for the `Nil` variant.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Converts the reply into an optional string, mapping `Nil` to `None`.
    pub fn into_text(self) -> Result<Option<String>, DriverError> {
        match self {
            Value::Nil => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            Value::Integer(n) => Ok(Some(n.to_string())),
            other => Err(DriverError::unexpected_reply("text", &other)),
        }
    }

    /// Converts the reply into an integer.
    pub fn into_integer(self) -> Result<i64, DriverError> {
        match self {
            Value::Integer(n) => Ok(n),
            other => Err(DriverError::unexpected_reply("integer", &other)),
        }
    }

    /// Converts the reply into an optional float, mapping `Nil` to `None`.
    pub fn into_double(self) -> Result<Option<f64>, DriverError> {
        match self {
            Value::Nil => Ok(None),
            Value::Double(d) => Ok(Some(d)),
            Value::Integer(n) => Ok(Some(n as f64)),
            other => Err(DriverError::unexpected_reply("double", &other)),
        }
    }

    /// Converts the reply into an array of elements.
    pub fn into_array(self) -> Result<Vec<Value>, DriverError> {
        match self {
            Value::Nil => Ok(Vec::new()),
            Value::Array(items) => Ok(items),
            other => Err(DriverError::unexpected_reply("array", &other)),
        }
    }

    /// Converts the reply into a list of strings.
    ///
    /// `Nil` elements inside the array are skipped; a wholly `Nil` reply is
    /// an empty list.
    pub fn into_text_array(self) -> Result<Vec<String>, DriverError> {
        let items = self.into_array()?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Some(text) = item.into_text()? {
                out.push(text);
            }
        }
        Ok(out)
    }

    /// Converts the reply into field/value pairs.
    pub fn into_pairs(self) -> Result<Vec<(String, Value)>, DriverError> {
        match self {
            Value::Nil => Ok(Vec::new()),
            Value::Map(pairs) => Ok(pairs),
            other => Err(DriverError::unexpected_reply("map", &other)),
        }
    }

    /// A short tag naming the variant, used in error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => Value::Text(s),
            None => Value::Nil,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Value::Array(values.into_iter().map(Value::Text).collect())
    }
}
