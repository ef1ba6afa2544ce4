//! Purpose: Bridge Rust types to the dynamic `Value` model.
//! Exports: `Marshal`, `RecordFields`, macros `marshal_record!` and `marshal_union!`.
//! Role: Lets callers hand the engine their own structs and enums.
//! Invariants: Enum impls produce `Variant`s tagged with the member's `type_tag()`.
//! Invariants: `type_tag()` agrees with `type_desc().tag()`.
use std::borrow::Cow;

use crate::core::codec::value_mismatch;
use crate::core::desc::TypeDesc;
use crate::core::error::{Error, ErrorKind};
use crate::core::timestamp::ZonedTimestamp;
use crate::core::value::Value;

pub trait Marshal: Sized {
    fn type_desc() -> TypeDesc;

    fn type_tag() -> Cow<'static, str> {
        Cow::Owned(Self::type_desc().tag())
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, Error>;
}

impl Marshal for bool {
    fn type_desc() -> TypeDesc {
        TypeDesc::boolean()
    }

    fn type_tag() -> Cow<'static, str> {
        Cow::Borrowed("bool")
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Bool(flag) => Ok(flag),
            other => Err(value_mismatch("bool", &other)),
        }
    }
}

impl Marshal for i64 {
    fn type_desc() -> TypeDesc {
        TypeDesc::int()
    }

    fn type_tag() -> Cow<'static, str> {
        Cow::Borrowed("int")
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Int(number) => Ok(number),
            other => Err(value_mismatch("int", &other)),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),+) => {
        $(
            impl Marshal for $ty {
                fn type_desc() -> TypeDesc {
                    TypeDesc::int()
                }

                fn type_tag() -> Cow<'static, str> {
                    Cow::Borrowed("int")
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, Error> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|err| {
                        Error::new(ErrorKind::TypeMismatch)
                            .with_message(format!(
                                "{wide} is out of range for {}",
                                stringify!($ty)
                            ))
                            .with_source(err)
                    })
                }
            }
        )+
    };
}

narrow_int!(i32, u32);

impl Marshal for f64 {
    fn type_desc() -> TypeDesc {
        TypeDesc::float()
    }

    fn type_tag() -> Cow<'static, str> {
        Cow::Borrowed("float")
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Float(number) => Ok(number),
            other => Err(value_mismatch("float", &other)),
        }
    }
}

impl Marshal for String {
    fn type_desc() -> TypeDesc {
        TypeDesc::text()
    }

    fn type_tag() -> Cow<'static, str> {
        Cow::Borrowed("text")
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(value_mismatch("text", &other)),
        }
    }
}

impl Marshal for ZonedTimestamp {
    fn type_desc() -> TypeDesc {
        TypeDesc::timestamp()
    }

    fn type_tag() -> Cow<'static, str> {
        Cow::Borrowed("timestamp")
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(value_mismatch("timestamp", &other)),
        }
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::optional(T::type_desc())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::list(T::type_desc())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Marshal::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| T::from_value(item).map_err(|err| err.at_index(idx)))
                .collect(),
            other => Err(value_mismatch("list", &other)),
        }
    }
}

/// Field-by-name reader used by `marshal_record!`.
pub struct RecordFields {
    record: &'static str,
    entries: Vec<(String, Option<Value>)>,
    cursor: usize,
}

impl RecordFields {
    pub fn new(record: &'static str, value: Value) -> Result<Self, Error> {
        match value {
            Value::Record(fields) => Ok(Self {
                record,
                entries: fields
                    .into_fields()
                    .into_iter()
                    .map(|(name, value)| (name, Some(value)))
                    .collect(),
                cursor: 0,
            }),
            other => Err(value_mismatch(&format!("record {record}"), &other)),
        }
    }

    pub fn take<T: Marshal>(&mut self, name: &str) -> Result<T, Error> {
        let position = match self.entries.get(self.cursor) {
            Some((field, _)) if field == name => Some(self.cursor),
            _ => self.entries.iter().position(|(field, _)| field == name),
        };
        let value = position.and_then(|idx| {
            self.cursor = idx + 1;
            self.entries[idx].1.take()
        });
        match value {
            Some(value) => T::from_value(value).map_err(|err| err.at_field(name)),
            // Absent fields are only acceptable where the type admits null.
            None => T::from_value(Value::Null).map_err(|_| {
                Error::new(ErrorKind::FieldMismatch).with_message(format!(
                    "missing required field `{name}` of record {}",
                    self.record
                ))
            }),
        }
    }

    pub fn finish(self) -> Result<(), Error> {
        match self.entries.iter().find(|(_, value)| value.is_some()) {
            Some((name, _)) => Err(Error::new(ErrorKind::FieldMismatch).with_message(format!(
                "undeclared field `{name}` for record {}",
                self.record
            ))),
            None => Ok(()),
        }
    }
}

/// Implements [`Marshal`] for a struct with named fields.
///
/// ```
/// use cachew_marshal::{TypedMarshaller, marshal_record};
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
/// marshal_record!(Point { x: i64, y: i64 });
///
/// let marshaller = TypedMarshaller::<Point>::new().unwrap();
/// let json = marshaller.dump(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(json.to_string(), r#"{"x":1,"y":2}"#);
/// ```
#[macro_export]
macro_rules! marshal_record {
    ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::Marshal for $ty {
            fn type_desc() -> $crate::TypeDesc {
                $crate::TypeDesc::record(
                    stringify!($ty),
                    [$((stringify!($field), <$fty as $crate::Marshal>::type_desc())),+],
                )
            }

            fn type_tag() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(stringify!($ty))
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::record([
                    $((stringify!($field), $crate::Marshal::to_value(&self.$field))),+
                ])
            }

            fn from_value(value: $crate::Value) -> ::std::result::Result<Self, $crate::Error> {
                let mut fields = $crate::RecordFields::new(stringify!($ty), value)?;
                let record = Self {
                    $($field: fields.take::<$fty>(stringify!($field))?,)+
                };
                fields.finish()?;
                ::std::result::Result::Ok(record)
            }
        }
    };
}

/// Implements [`Marshal`] for an enum whose variants each wrap one marshalable type.
#[macro_export]
macro_rules! marshal_union {
    ($ty:ident { $($variant:ident ( $vty:ty )),+ $(,)? }) => {
        impl $crate::Marshal for $ty {
            fn type_desc() -> $crate::TypeDesc {
                $crate::TypeDesc::union(
                    stringify!($ty),
                    [$(<$vty as $crate::Marshal>::type_desc()),+],
                )
            }

            fn type_tag() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(stringify!($ty))
            }

            fn to_value(&self) -> $crate::Value {
                match self {
                    $(
                        $ty::$variant(inner) => $crate::Value::variant(
                            <$vty as $crate::Marshal>::type_tag(),
                            $crate::Marshal::to_value(inner),
                        ),
                    )+
                }
            }

            fn from_value(value: $crate::Value) -> ::std::result::Result<Self, $crate::Error> {
                let variant = $crate::Variant::from_value(stringify!($ty), value)?;
                $(
                    if variant.tag() == <$vty as $crate::Marshal>::type_tag() {
                        let (tag, payload) = variant.into_parts();
                        return <$vty as $crate::Marshal>::from_value(payload)
                            .map($ty::$variant)
                            .map_err(|err| err.at_variant(tag));
                    }
                )+
                ::std::result::Result::Err($crate::core::union::unknown_variant(
                    stringify!($ty),
                    variant.tag(),
                ))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::{Marshal, RecordFields};
    use crate::core::error::ErrorKind;
    use crate::core::value::{Record, Value};

    #[test]
    fn narrow_ints_check_range() {
        assert_eq!(i32::from_value(Value::Int(-5)).unwrap(), -5);
        let err = u32::from_value(Value::Int(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        let err = i32::from_value(Value::Int(i64::from(i32::MAX) + 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn record_fields_read_by_name() {
        let value = Value::Record(Record::new().with("b", "two").with("a", 1i64));
        let mut fields = RecordFields::new("AB", value).unwrap();
        assert_eq!(fields.take::<i64>("a").unwrap(), 1);
        assert_eq!(fields.take::<String>("b").unwrap(), "two");
        assert_eq!(fields.take::<Option<i64>>("c").unwrap(), None);
        fields.finish().unwrap();
    }

    #[test]
    fn record_fields_report_missing_and_extra() {
        let value = Value::Record(Record::new().with("a", 1i64).with("zz", true));
        let mut fields = RecordFields::new("A", value.clone()).unwrap();
        let err = fields.take::<i64>("b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldMismatch);

        let mut fields = RecordFields::new("A", value).unwrap();
        fields.take::<i64>("a").unwrap();
        assert_eq!(fields.finish().unwrap_err().kind(), ErrorKind::FieldMismatch);
    }

    #[test]
    fn std_tags_match_descriptors() {
        assert_eq!(bool::type_tag(), bool::type_desc().tag());
        assert_eq!(i64::type_tag(), i64::type_desc().tag());
        assert_eq!(u32::type_tag(), u32::type_desc().tag());
        assert_eq!(f64::type_tag(), f64::type_desc().tag());
        assert_eq!(String::type_tag(), String::type_desc().tag());
        assert_eq!(Vec::<String>::type_tag(), "list<text>");
    }
}
