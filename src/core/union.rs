//! Purpose: Discriminated-union codec.
//! Exports: `UnionNode`, `VariantNode` (crate), `unknown_variant`.
//! Role: Emits `{<tag_key>: tag, <value_key>: payload}` and dispatches load by tag alone.
//! Invariants: Decoding never tries more than one variant; the tag selects the branch.
//! Invariants: Tags come from type identity, so reordering variants keeps the wire format.
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::core::codec::{Node, json_mismatch, value_mismatch};
use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Value, Variant};

#[derive(Debug)]
pub(crate) struct UnionNode {
    pub(crate) name: String,
    pub(crate) tag_key: Arc<str>,
    pub(crate) value_key: Arc<str>,
    pub(crate) variants: Vec<VariantNode>,
    pub(crate) by_tag: HashMap<String, usize>,
}

#[derive(Debug)]
pub(crate) struct VariantNode {
    pub(crate) tag: String,
    pub(crate) node: Node,
}

pub fn unknown_variant(union_name: &str, tag: &str) -> Error {
    Error::new(ErrorKind::UnknownVariant)
        .with_message(format!("tag `{tag}` is not a variant of union {union_name}"))
}

impl UnionNode {
    fn variant(&self, tag: &str) -> Result<&VariantNode, Error> {
        self.by_tag
            .get(tag)
            .map(|idx| &self.variants[*idx])
            .ok_or_else(|| unknown_variant(&self.name, tag))
    }

    pub(crate) fn dump(&self, value: &Value) -> Result<Json, Error> {
        let Value::Variant(variant) = value else {
            return Err(value_mismatch(&format!("variant of union {}", self.name), value));
        };
        let target = self.variant(variant.tag())?;
        let payload = target
            .node
            .dump(variant.value())
            .map_err(|err| err.at_variant(target.tag.as_str()))?;
        let mut map = Map::with_capacity(2);
        map.insert(self.tag_key.to_string(), Json::String(target.tag.clone()));
        map.insert(self.value_key.to_string(), payload);
        Ok(Json::Object(map))
    }

    pub(crate) fn load(&self, json: &Json) -> Result<Value, Error> {
        let map = json
            .as_object()
            .ok_or_else(|| json_mismatch(&format!("tagged object for union {}", self.name), json))?;
        if let Some(extra) = map
            .keys()
            .find(|key| key.as_str() != &*self.tag_key && key.as_str() != &*self.value_key)
        {
            return Err(Error::new(ErrorKind::FieldMismatch).with_message(format!(
                "undeclared key `{extra}` in union {}",
                self.name
            )));
        }
        let tag = match map.get(&*self.tag_key) {
            Some(Json::String(tag)) => tag,
            Some(other) => {
                return Err(json_mismatch("string tag", other).at_field(&*self.tag_key));
            }
            None => return Err(self.missing_key(&self.tag_key)),
        };
        let payload = map
            .get(&*self.value_key)
            .ok_or_else(|| self.missing_key(&self.value_key))?;
        let target = self.variant(tag)?;
        let value = target
            .node
            .load(payload)
            .map_err(|err| err.at_variant(target.tag.as_str()))?;
        Ok(Value::Variant(Variant::new(target.tag.as_str(), value)))
    }

    fn missing_key(&self, key: &str) -> Error {
        Error::new(ErrorKind::FieldMismatch)
            .with_message(format!("missing key `{key}` in union {}", self.name))
    }

    pub(crate) fn tags(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|variant| variant.tag.as_str())
    }

    pub(crate) fn write_canonical(&self, out: &mut String) {
        out.push_str(&self.name);
        out.push('[');
        for (idx, variant) in self.variants.iter().enumerate() {
            if idx > 0 {
                out.push('|');
            }
            variant.node.write_canonical(out);
        }
        out.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::{UnionNode, VariantNode};
    use crate::core::codec::Node;
    use crate::core::desc::PrimitiveKind;
    use crate::core::error::ErrorKind;
    use crate::core::value::Value;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn int_or_text() -> UnionNode {
        let variants = vec![
            VariantNode {
                tag: "int".to_string(),
                node: Node::Primitive(PrimitiveKind::Int),
            },
            VariantNode {
                tag: "text".to_string(),
                node: Node::Primitive(PrimitiveKind::Text),
            },
        ];
        let by_tag = variants
            .iter()
            .enumerate()
            .map(|(idx, variant)| (variant.tag.clone(), idx))
            .collect::<HashMap<_, _>>();
        UnionNode {
            name: "Id".to_string(),
            tag_key: Arc::from("tag"),
            value_key: Arc::from("value"),
            variants,
            by_tag,
        }
    }

    #[test]
    fn overlapping_payloads_follow_the_tag() {
        let union = int_or_text();
        let as_text = union.load(&json!({"tag": "text", "value": "5"})).unwrap();
        assert_eq!(as_text, Value::variant("text", Value::Text("5".into())));
        let err = union.load(&json!({"tag": "int", "value": "5"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.location().as_deref(), Some("$<int>"));
    }

    #[test]
    fn tagged_shape_is_strict() {
        let union = int_or_text();
        let cases = [
            (json!(5), ErrorKind::TypeMismatch),
            (json!({"tag": "int"}), ErrorKind::FieldMismatch),
            (json!({"value": 5}), ErrorKind::FieldMismatch),
            (json!({"tag": "int", "value": 5, "extra": 1}), ErrorKind::FieldMismatch),
            (json!({"tag": 1, "value": 5}), ErrorKind::TypeMismatch),
            (json!({"tag": "float", "value": 5.0}), ErrorKind::UnknownVariant),
        ];
        for (json, kind) in cases {
            assert_eq!(union.load(&json).unwrap_err().kind(), kind, "payload: {json}");
        }
    }

    #[test]
    fn dump_requires_explicit_variant() {
        let union = int_or_text();
        let err = union.dump(&Value::Int(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        let err = union.dump(&Value::variant("bool", Value::Bool(true))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownVariant);
        assert_eq!(
            union.dump(&Value::variant("int", Value::Int(5))).unwrap(),
            json!({"tag": "int", "value": 5})
        );
    }
}
