//! Purpose: Compile type descriptors into immutable codec trees.
//! Exports: `compile`, `Schema`, `MarshalOptions`.
//! Role: One-time validation and metadata capture so per-value calls do no descriptor work.
//! Invariants: Compiling the same descriptor with the same options yields the same fingerprint.
//! Invariants: `none` members are folded into `optional<..>`; unions never tag absence.
//! Invariants: Schema errors carry the location of the offending node.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;
use sha2::{Digest, Sha256};

use crate::core::codec::{FieldNode, Node, RecordNode};
use crate::core::desc::{RecordDesc, TypeDesc, UnionDesc};
use crate::core::error::{Error, ErrorKind};
use crate::core::timestamp::TimestampNode;
use crate::core::union::{UnionNode, VariantNode};
use crate::core::value::Value;
use crate::core::zone::{Tzdb, ZoneResolver};

pub const DEFAULT_UNION_TAG_KEY: &str = "tag";
pub const DEFAULT_UNION_VALUE_KEY: &str = "value";

#[derive(Clone)]
pub struct MarshalOptions {
    pub union_tag_key: String,
    pub union_value_key: String,
    pub zones: Arc<dyn ZoneResolver>,
}

impl MarshalOptions {
    pub fn new() -> Self {
        Self {
            union_tag_key: DEFAULT_UNION_TAG_KEY.to_string(),
            union_value_key: DEFAULT_UNION_VALUE_KEY.to_string(),
            zones: Arc::new(Tzdb),
        }
    }

    pub fn with_union_keys(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.union_tag_key = tag.into();
        self.union_value_key = value.into();
        self
    }

    pub fn with_zones(mut self, zones: Arc<dyn ZoneResolver>) -> Self {
        self.zones = zones;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if self.union_tag_key.is_empty() || self.union_value_key.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("union keys must be non-empty"));
        }
        if self.union_tag_key.contains(',') || self.union_value_key.contains(',') {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("union keys may not contain `,`"));
        }
        if self.union_tag_key == self.union_value_key {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "union tag and value keys are both `{}`",
                    self.union_tag_key
                ))
                .with_hint("Pick two distinct keys, e.g. `tag` and `value`."));
        }
        Ok(())
    }
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MarshalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalOptions")
            .field("union_tag_key", &self.union_tag_key)
            .field("union_value_key", &self.union_value_key)
            .finish_non_exhaustive()
    }
}

/// A compiled, immutable schema. Safe to share across threads.
#[derive(Debug)]
pub struct Schema {
    root: Node,
    canonical: String,
    fingerprint: String,
}

impl Schema {
    pub fn dump(&self, value: &Value) -> Result<Json, Error> {
        self.root.dump(value)
    }

    pub fn load(&self, json: &Json) -> Result<Value, Error> {
        self.root.load(json)
    }

    /// Normalised text form plus union keys; the input to `fingerprint`.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Lowercase hex SHA-256 of `canonical`, usable as a cache invalidation key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Every union in the schema with its variant tags, outermost first.
    pub fn unions(&self) -> Vec<(&str, Vec<&str>)> {
        let mut unions = Vec::new();
        self.root.visit_unions(&mut |union| {
            unions.push((union.name.as_str(), union.tags().collect()));
        });
        unions
    }
}

pub fn compile(desc: &TypeDesc, options: &MarshalOptions) -> Result<Schema, Error> {
    options.validate()?;
    let compiler = Compiler {
        tag_key: Arc::from(options.union_tag_key.as_str()),
        value_key: Arc::from(options.union_value_key.as_str()),
        zones: Arc::clone(&options.zones),
    };
    let root = compiler.node(desc)?;

    let mut canonical = String::new();
    root.write_canonical(&mut canonical);
    canonical.push_str(&format!(
        " @union({},{})",
        options.union_tag_key, options.union_value_key
    ));
    let fingerprint = hex_digest(canonical.as_bytes());
    tracing::debug!(%canonical, %fingerprint, "compiled schema");

    Ok(Schema {
        root,
        canonical,
        fingerprint,
    })
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Characters that delimit the canonical form; names may not contain them.
pub const RESERVED_NAME_CHARS: &[char] = &[':', ',', '{', '}', '[', ']', '|', '<', '>', '@'];

fn check_name(what: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(schema_error(format!("{what} name must be non-empty")));
    }
    match name.chars().find(|ch| RESERVED_NAME_CHARS.contains(ch)) {
        Some(ch) => Err(schema_error(format!("{what} name `{name}` contains reserved `{ch}`"))
            .with_hint("Names may not contain any of : , { } [ ] | < > @")),
        None => Ok(()),
    }
}

fn schema_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Schema).with_message(message)
}

struct Compiler {
    tag_key: Arc<str>,
    value_key: Arc<str>,
    zones: Arc<dyn ZoneResolver>,
}

impl Compiler {
    fn node(&self, desc: &TypeDesc) -> Result<Node, Error> {
        match desc {
            TypeDesc::Primitive(kind) => Ok(Node::Primitive(*kind)),
            TypeDesc::Timestamp => Ok(Node::Timestamp(TimestampNode::new(Arc::clone(&self.zones)))),
            TypeDesc::Absent => Err(schema_error("`none` is only valid as a union member")),
            TypeDesc::Optional(inner) => self.optional(self.node(inner)?, desc),
            TypeDesc::List(inner) => Ok(Node::List(Box::new(self.node(inner)?))),
            TypeDesc::Record(record) => self.record(record),
            TypeDesc::Union(union) => self.union(union),
        }
    }

    fn optional(&self, inner: Node, desc: &TypeDesc) -> Result<Node, Error> {
        if matches!(inner, Node::Optional(_)) {
            return Err(schema_error(format!(
                "nested optional in `{desc}` makes absence ambiguous"
            )));
        }
        Ok(Node::Optional(Box::new(inner)))
    }

    fn record(&self, desc: &RecordDesc) -> Result<Node, Error> {
        check_name("record", &desc.name)?;
        let mut fields = Vec::with_capacity(desc.fields.len());
        let mut index = HashMap::with_capacity(desc.fields.len());
        for (idx, field) in desc.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(schema_error(format!(
                    "record {} has a field with an empty name (position {idx})",
                    desc.name
                )));
            }
            check_name("field", &field.name).map_err(|err| err.at_field(field.name.as_str()))?;
            match index.entry(field.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(schema_error(format!(
                        "record {} declares field `{}` twice",
                        desc.name, field.name
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
            }
            let node = self
                .node(&field.ty)
                .map_err(|err| err.at_field(field.name.as_str()))?;
            fields.push(FieldNode {
                name: field.name.clone(),
                node,
            });
        }
        Ok(Node::Record(RecordNode {
            name: desc.name.clone(),
            fields,
            index,
        }))
    }

    fn union(&self, desc: &UnionDesc) -> Result<Node, Error> {
        check_name("union", &desc.name)?;
        let (absent, members): (Vec<&TypeDesc>, Vec<&TypeDesc>) = desc
            .variants
            .iter()
            .partition(|variant| matches!(variant, TypeDesc::Absent));
        let nullable = !absent.is_empty();

        if members.is_empty() {
            return Err(schema_error(format!(
                "union {} has no variants besides `none`",
                desc.name
            )));
        }
        if nullable && members.len() == 1 {
            let inner = self.node(members[0])?;
            return self.optional(inner, &TypeDesc::Union(desc.clone()));
        }

        let mut variants = Vec::with_capacity(members.len());
        let mut by_tag = HashMap::with_capacity(members.len());
        for member in members {
            let tag = member.tag();
            if matches!(member, TypeDesc::Optional(_)) {
                return Err(schema_error(format!(
                    "union {} has optional member `{member}`; add `none` as a member instead",
                    desc.name
                ))
                .at_variant(tag));
            }
            if by_tag.insert(tag.clone(), variants.len()).is_some() {
                return Err(schema_error(format!(
                    "union {} has two members tagged `{tag}`",
                    desc.name
                )));
            }
            let node = self.node(member).map_err(|err| err.at_variant(tag.as_str()))?;
            variants.push(VariantNode { tag, node });
        }

        let node = Node::Union(UnionNode {
            name: desc.name.clone(),
            tag_key: Arc::clone(&self.tag_key),
            value_key: Arc::clone(&self.value_key),
            variants,
            by_tag,
        });
        if nullable {
            Ok(Node::Optional(Box::new(node)))
        } else {
            Ok(node)
        }
    }
}
