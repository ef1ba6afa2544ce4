//! Purpose: Compiled codec tree and the generic record/primitive/optional/list codecs.
//! Exports: `Node`, `RecordNode`, `FieldNode` (crate), `json_mismatch`, `value_mismatch`.
//! Role: Recursive `dump(Value) -> Json` / `load(Json) -> Value` driven by a compiled schema.
//! Invariants: Record objects are emitted in declared field order.
//! Invariants: Records are read by name; missing required or undeclared fields fail with `FieldMismatch`.
//! Invariants: No codec emits a non-finite number.
use std::collections::HashMap;
use std::fmt::Write as _;

use serde_json::{Map, Number, Value as Json};

use crate::core::desc::PrimitiveKind;
use crate::core::error::{Error, ErrorKind};
use crate::core::timestamp::TimestampNode;
use crate::core::union::UnionNode;
use crate::core::value::{Record, Value};

#[derive(Debug)]
pub(crate) enum Node {
    Primitive(PrimitiveKind),
    Optional(Box<Node>),
    List(Box<Node>),
    Record(RecordNode),
    Union(UnionNode),
    Timestamp(TimestampNode),
}

#[derive(Debug)]
pub(crate) struct RecordNode {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldNode>,
    pub(crate) index: HashMap<String, usize>,
}

#[derive(Debug)]
pub(crate) struct FieldNode {
    pub(crate) name: String,
    pub(crate) node: Node,
}

impl FieldNode {
    fn is_optional(&self) -> bool {
        matches!(self.node, Node::Optional(_))
    }
}

impl Node {
    pub(crate) fn dump(&self, value: &Value) -> Result<Json, Error> {
        match self {
            Node::Primitive(kind) => dump_primitive(*kind, value),
            Node::Optional(inner) => match value {
                Value::Null => Ok(Json::Null),
                other => inner.dump(other),
            },
            Node::List(inner) => match value {
                Value::List(items) => items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| inner.dump(item).map_err(|err| err.at_index(idx)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Json::Array),
                other => Err(value_mismatch("list", other)),
            },
            Node::Record(record) => match value {
                Value::Record(fields) => record.dump(fields),
                other => Err(value_mismatch(&format!("record {}", record.name), other)),
            },
            Node::Union(union) => union.dump(value),
            Node::Timestamp(timestamp) => match value {
                Value::Timestamp(ts) => timestamp.dump(ts),
                other => Err(value_mismatch("timestamp", other)),
            },
        }
    }

    pub(crate) fn load(&self, json: &Json) -> Result<Value, Error> {
        match self {
            Node::Primitive(kind) => load_primitive(*kind, json),
            Node::Optional(inner) => match json {
                Json::Null => Ok(Value::Null),
                other => inner.load(other),
            },
            Node::List(inner) => match json {
                Json::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| inner.load(item).map_err(|err| err.at_index(idx)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::List),
                other => Err(json_mismatch("array", other)),
            },
            Node::Record(record) => record.load(json),
            Node::Union(union) => union.load(json),
            Node::Timestamp(timestamp) => timestamp.load(json).map(Value::Timestamp),
        }
    }

    /// Canonical text form of the compiled (normalised) schema.
    pub(crate) fn write_canonical(&self, out: &mut String) {
        match self {
            Node::Primitive(kind) => out.push_str(kind.name()),
            Node::Optional(inner) => {
                out.push_str("optional<");
                inner.write_canonical(out);
                out.push('>');
            }
            Node::List(inner) => {
                out.push_str("list<");
                inner.write_canonical(out);
                out.push('>');
            }
            Node::Record(record) => {
                let _ = write!(out, "{}{{", record.name);
                for (idx, field) in record.fields.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}:", field.name);
                    field.node.write_canonical(out);
                }
                out.push('}');
            }
            Node::Union(union) => union.write_canonical(out),
            Node::Timestamp(_) => out.push_str("timestamp"),
        }
    }

    /// Visits every union in the tree, outermost first.
    pub(crate) fn visit_unions<'a>(&'a self, visit: &mut dyn FnMut(&'a UnionNode)) {
        match self {
            Node::Primitive(_) | Node::Timestamp(_) => {}
            Node::Optional(inner) | Node::List(inner) => inner.visit_unions(visit),
            Node::Record(record) => {
                for field in &record.fields {
                    field.node.visit_unions(visit);
                }
            }
            Node::Union(union) => {
                visit(union);
                for variant in &union.variants {
                    variant.node.visit_unions(visit);
                }
            }
        }
    }
}

impl RecordNode {
    fn dump(&self, record: &Record) -> Result<Json, Error> {
        let mut map = Map::with_capacity(self.fields.len());
        let mut consumed = 0usize;
        for (idx, field) in self.fields.iter().enumerate() {
            let encoded = match record.lookup(idx, &field.name) {
                Some(value) => {
                    consumed += 1;
                    field
                        .node
                        .dump(value)
                        .map_err(|err| err.at_field(field.name.as_str()))?
                }
                None if field.is_optional() => Json::Null,
                None => return Err(self.missing_field(&field.name)),
            };
            map.insert(field.name.clone(), encoded);
        }
        if consumed != record.len() {
            return Err(match record.iter().find(|(name, _)| !self.index.contains_key(*name)) {
                Some((name, _)) => self.undeclared_field(name),
                None => Error::new(ErrorKind::FieldMismatch)
                    .with_message(format!("duplicate field in record {}", self.name)),
            });
        }
        Ok(Json::Object(map))
    }

    fn load(&self, json: &Json) -> Result<Value, Error> {
        let map = json
            .as_object()
            .ok_or_else(|| json_mismatch(&format!("object for record {}", self.name), json))?;
        let mut record = Record::with_capacity(self.fields.len());
        let mut present = 0usize;
        for field in &self.fields {
            let value = match map.get(&field.name) {
                Some(encoded) => {
                    present += 1;
                    field
                        .node
                        .load(encoded)
                        .map_err(|err| err.at_field(field.name.as_str()))?
                }
                None if field.is_optional() => Value::Null,
                None => return Err(self.missing_field(&field.name)),
            };
            record.push(field.name.as_str(), value);
        }
        if present != map.len() {
            if let Some(name) = map.keys().find(|name| !self.index.contains_key(name.as_str())) {
                return Err(self.undeclared_field(name));
            }
        }
        Ok(Value::Record(record))
    }

    fn missing_field(&self, name: &str) -> Error {
        Error::new(ErrorKind::FieldMismatch).with_message(format!(
            "missing required field `{name}` of record {}",
            self.name
        ))
    }

    fn undeclared_field(&self, name: &str) -> Error {
        Error::new(ErrorKind::FieldMismatch).with_message(format!(
            "undeclared field `{name}` for record {}",
            self.name
        ))
    }
}

fn dump_primitive(kind: PrimitiveKind, value: &Value) -> Result<Json, Error> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(flag)) => Ok(Json::Bool(*flag)),
        (PrimitiveKind::Int, Value::Int(number)) => Ok(Json::from(*number)),
        (PrimitiveKind::Float, Value::Float(number)) => Number::from_f64(*number)
            .map(Json::Number)
            .ok_or_else(|| {
                Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!("non-finite float {number} has no JSON form"))
            }),
        (PrimitiveKind::Text, Value::Text(text)) => Ok(Json::String(text.clone())),
        (kind, other) => Err(value_mismatch(kind.name(), other)),
    }
}

fn load_primitive(kind: PrimitiveKind, json: &Json) -> Result<Value, Error> {
    match (kind, json) {
        (PrimitiveKind::Bool, Json::Bool(flag)) => Ok(Value::Bool(*flag)),
        (PrimitiveKind::Int, Json::Number(number)) => {
            if let Some(int) = number.as_i64() {
                Ok(Value::Int(int))
            } else if number.is_u64() {
                Err(Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!("integer {number} overflows a 64-bit signed int")))
            } else {
                Err(Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!("expected int, found float {number}")))
            }
        }
        // Integral JSON numbers are accepted for floats; writers may drop the `.0`.
        (PrimitiveKind::Float, Json::Number(number)) => number
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| json_mismatch("float", json)),
        (PrimitiveKind::Text, Json::String(text)) => Ok(Value::Text(text.clone())),
        (kind, other) => Err(json_mismatch(kind.name(), other)),
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(number) if number.is_f64() => "float",
        Json::Number(_) => "int",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

pub(crate) fn json_mismatch(expected: &str, found: &Json) -> Error {
    Error::new(ErrorKind::TypeMismatch)
        .with_message(format!("expected {expected}, found {}", json_kind(found)))
}

pub(crate) fn value_mismatch(expected: &str, found: &Value) -> Error {
    Error::new(ErrorKind::TypeMismatch)
        .with_message(format!("expected {expected}, found {}", found.kind_name()))
}
