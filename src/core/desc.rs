//! Purpose: Static type descriptors handed to the schema compiler.
//! Exports: `TypeDesc`, `PrimitiveKind`, `RecordDesc`, `FieldDesc`, `UnionDesc`.
//! Role: Caller-facing description of a record type; built in code or read from JSON.
//! Invariants: Descriptors are plain data; validation happens in `schema::compile`.
//! Invariants: `tag()` depends only on type identity, never on position in a union.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    Text,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Text => "text",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "DescRepr", into = "DescRepr")]
pub enum TypeDesc {
    Primitive(PrimitiveKind),
    Optional(Box<TypeDesc>),
    List(Box<TypeDesc>),
    Record(RecordDesc),
    Union(UnionDesc),
    /// Absence; only valid as a union member.
    Absent,
    Timestamp,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDesc {
    pub name: String,
    pub fields: Vec<FieldDesc>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnionDesc {
    pub name: String,
    pub variants: Vec<TypeDesc>,
}

impl TypeDesc {
    pub fn boolean() -> Self {
        TypeDesc::Primitive(PrimitiveKind::Bool)
    }

    pub fn int() -> Self {
        TypeDesc::Primitive(PrimitiveKind::Int)
    }

    pub fn float() -> Self {
        TypeDesc::Primitive(PrimitiveKind::Float)
    }

    pub fn text() -> Self {
        TypeDesc::Primitive(PrimitiveKind::Text)
    }

    pub fn timestamp() -> Self {
        TypeDesc::Timestamp
    }

    pub fn absent() -> Self {
        TypeDesc::Absent
    }

    pub fn optional(inner: TypeDesc) -> Self {
        TypeDesc::Optional(Box::new(inner))
    }

    pub fn list(inner: TypeDesc) -> Self {
        TypeDesc::List(Box::new(inner))
    }

    pub fn record<N, I>(name: impl Into<String>, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, TypeDesc)>,
    {
        TypeDesc::Record(RecordDesc {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, ty)| FieldDesc {
                    name: name.into(),
                    ty,
                })
                .collect(),
        })
    }

    pub fn union<I>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = TypeDesc>,
    {
        TypeDesc::Union(UnionDesc {
            name: name.into(),
            variants: variants.into_iter().collect(),
        })
    }

    /// Stable identity used as the discriminator tag when this type is a union member.
    pub fn tag(&self) -> String {
        match self {
            TypeDesc::Primitive(kind) => kind.name().to_string(),
            TypeDesc::Optional(inner) => format!("optional<{}>", inner.tag()),
            TypeDesc::List(inner) => format!("list<{}>", inner.tag()),
            TypeDesc::Record(record) => record.name.clone(),
            TypeDesc::Union(union) => union.name.clone(),
            TypeDesc::Absent => "none".to_string(),
            TypeDesc::Timestamp => "timestamp".to_string(),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Primitive(kind) => f.write_str(kind.name()),
            TypeDesc::Optional(inner) => write!(f, "optional<{inner}>"),
            TypeDesc::List(inner) => write!(f, "list<{inner}>"),
            TypeDesc::Record(record) => {
                write!(f, "{}{{", record.name)?;
                for (idx, field) in record.fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", field.name, field.ty)?;
                }
                f.write_str("}")
            }
            TypeDesc::Union(union) => {
                write!(f, "{}[", union.name)?;
                for (idx, variant) in union.variants.iter().enumerate() {
                    if idx > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{variant}")?;
                }
                f.write_str("]")
            }
            TypeDesc::Absent => f.write_str("none"),
            TypeDesc::Timestamp => f.write_str("timestamp"),
        }
    }
}

// Wire form for descriptor files: primitives are bare strings ("int"), composites
// are single-key objects ({"optional": ...}).
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DescRepr {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    None,
    Optional(Box<TypeDesc>),
    List(Box<TypeDesc>),
    Record(RecordDesc),
    Union(UnionDesc),
}

impl From<DescRepr> for TypeDesc {
    fn from(repr: DescRepr) -> Self {
        match repr {
            DescRepr::Bool => TypeDesc::boolean(),
            DescRepr::Int => TypeDesc::int(),
            DescRepr::Float => TypeDesc::float(),
            DescRepr::Text => TypeDesc::text(),
            DescRepr::Timestamp => TypeDesc::Timestamp,
            DescRepr::None => TypeDesc::Absent,
            DescRepr::Optional(inner) => TypeDesc::Optional(inner),
            DescRepr::List(inner) => TypeDesc::List(inner),
            DescRepr::Record(record) => TypeDesc::Record(record),
            DescRepr::Union(union) => TypeDesc::Union(union),
        }
    }
}

impl From<TypeDesc> for DescRepr {
    fn from(desc: TypeDesc) -> Self {
        match desc {
            TypeDesc::Primitive(PrimitiveKind::Bool) => DescRepr::Bool,
            TypeDesc::Primitive(PrimitiveKind::Int) => DescRepr::Int,
            TypeDesc::Primitive(PrimitiveKind::Float) => DescRepr::Float,
            TypeDesc::Primitive(PrimitiveKind::Text) => DescRepr::Text,
            TypeDesc::Timestamp => DescRepr::Timestamp,
            TypeDesc::Absent => DescRepr::None,
            TypeDesc::Optional(inner) => DescRepr::Optional(inner),
            TypeDesc::List(inner) => DescRepr::List(inner),
            TypeDesc::Record(record) => DescRepr::Record(record),
            TypeDesc::Union(union) => DescRepr::Union(union),
        }
    }
}
