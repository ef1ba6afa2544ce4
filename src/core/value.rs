//! Purpose: Dynamic typed value consumed by `dump` and produced by `load`.
//! Exports: `Value`, `Record`, `Variant`.
//! Role: Explicit sum type over the shapes a schema can describe.
//! Invariants: Union members are always wrapped in `Variant`; nothing probes runtime types.
//! Invariants: Record field order is preserved as constructed; lookups are by name.
use crate::core::error::Error;
use crate::core::timestamp::ZonedTimestamp;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Record(Record),
    Variant(Variant),
    Timestamp(ZonedTimestamp),
}

impl Value {
    pub fn record<N, I>(fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        Value::Record(fields.into_iter().collect())
    }

    pub fn variant(tag: impl Into<String>, value: Value) -> Self {
        Value::Variant(Variant::new(tag, value))
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Value::Variant(variant) => Some(variant),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Variant(_) => "variant",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<ZonedTimestamp> for Value {
    fn from(value: ZonedTimestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl From<Variant> for Value {
    fn from(value: Variant) -> Self {
        Value::Variant(value)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    // Positional fast path: records built in declared order hit `hint` directly.
    pub(crate) fn lookup(&self, hint: usize, name: &str) -> Option<&Value> {
        match self.fields.get(hint) {
            Some((field, value)) if field == name => Some(value),
            _ => self.get(name),
        }
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// A union value: the member's tag plus its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    tag: String,
    value: Box<Value>,
}

impl Variant {
    pub fn new(tag: impl Into<String>, value: Value) -> Self {
        Self {
            tag: tag.into(),
            value: Box::new(value),
        }
    }

    /// Unwraps a `Value::Variant`, failing with `TypeMismatch` for any other shape.
    pub fn from_value(union_name: &str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Variant(variant) => Ok(variant),
            other => Err(crate::core::codec::value_mismatch(
                &format!("variant of union {union_name}"),
                &other,
            )),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.tag, *self.value)
    }
}
