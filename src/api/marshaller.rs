//! Purpose: Marshaller handles that own one compiled schema each.
//! Exports: `Marshaller`, `TypedMarshaller`.
//! Role: Construct once per record type, then `dump`/`load` any number of values.
//! Invariants: Stateless across calls; the compiled schema is never mutated.
//! Invariants: A failed call returns an error and no partial output.
use std::fmt;
use std::marker::PhantomData;

use crate::api::marshal::Marshal;
use crate::core::desc::TypeDesc;
use crate::core::error::Error;
use crate::core::schema::{MarshalOptions, Schema, compile};
use crate::core::value::Value;
use crate::json::Json;

#[derive(Debug)]
pub struct Marshaller {
    schema: Schema,
}

impl Marshaller {
    pub fn new(desc: &TypeDesc) -> Result<Self, Error> {
        Self::with_options(desc, &MarshalOptions::default())
    }

    pub fn with_options(desc: &TypeDesc, options: &MarshalOptions) -> Result<Self, Error> {
        Ok(Self {
            schema: compile(desc, options)?,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fingerprint(&self) -> &str {
        self.schema.fingerprint()
    }

    pub fn dump(&self, value: &Value) -> Result<Json, Error> {
        self.schema.dump(value)
    }

    pub fn load(&self, json: &Json) -> Result<Value, Error> {
        self.schema.load(json)
    }
}

/// Marshaller for a Rust type implementing [`Marshal`].
pub struct TypedMarshaller<T> {
    inner: Marshaller,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Marshal> TypedMarshaller<T> {
    pub fn new() -> Result<Self, Error> {
        Self::with_options(&MarshalOptions::default())
    }

    pub fn with_options(options: &MarshalOptions) -> Result<Self, Error> {
        Ok(Self {
            inner: Marshaller::with_options(&T::type_desc(), options)?,
            _marker: PhantomData,
        })
    }

    pub fn untyped(&self) -> &Marshaller {
        &self.inner
    }

    pub fn fingerprint(&self) -> &str {
        self.inner.fingerprint()
    }

    pub fn dump(&self, value: &T) -> Result<Json, Error> {
        self.inner.dump(&value.to_value())
    }

    pub fn load(&self, json: &Json) -> Result<T, Error> {
        T::from_value(self.inner.load(json)?)
    }
}

impl<T> fmt::Debug for TypedMarshaller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedMarshaller")
            .field("type", &std::any::type_name::<T>())
            .field("schema", &self.inner.schema().canonical())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Marshaller, TypedMarshaller};
    use crate::core::desc::TypeDesc;
    use crate::core::value::Value;
    use serde_json::json;

    #[test]
    fn marshaller_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Marshaller>();
        assert_send_sync::<TypedMarshaller<Vec<Option<i64>>>>();
    }

    #[test]
    fn typed_marshaller_wraps_std_types() {
        let marshaller = TypedMarshaller::<Vec<Option<i64>>>::new().unwrap();
        let values = vec![Some(1), None, Some(-7)];
        let json = marshaller.dump(&values).unwrap();
        assert_eq!(json, json!([1, null, -7]));
        assert_eq!(marshaller.load(&json).unwrap(), values);
    }

    #[test]
    fn shared_marshaller_serves_many_threads() {
        let marshaller = Marshaller::new(&TypeDesc::record("P", [("n", TypeDesc::int())])).unwrap();
        std::thread::scope(|scope| {
            for n in 0..4i64 {
                let marshaller = &marshaller;
                scope.spawn(move || {
                    let value = Value::record([("n", Value::Int(n))]);
                    let json = marshaller.dump(&value).unwrap();
                    assert_eq!(marshaller.load(&json).unwrap(), value);
                });
            }
        });
    }
}
