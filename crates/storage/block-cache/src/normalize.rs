//! Serializes block payloads with wide integers rendered as decimal strings.
//!
//! [`Normalized`] wraps any [`Serialize`] payload and intercepts the serializer calls for 64- and
//! 128-bit integers, so a typed provider block with `u128` difficulty serializes into JSON instead
//! of failing. JSON integers held in a [`serde_json::Value`] are 64-bit and follow the same rule.
//! Narrower integers, floats and everything else pass through unchanged.

use serde::{
    Serialize, Serializer,
    ser::{
        SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant, SerializeTuple,
        SerializeTupleStruct, SerializeTupleVariant,
    },
};
use serde_json::Value;

/// Top-level fields stored as typed integers and therefore not rewritten.
const TYPED_FIELDS: [&str; 2] = ["number", "timestamp"];

/// Position of a value within the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The block object itself.
    Root,
    /// A top-level typed field. Wide integers stay numeric when they fit in 64 bits.
    Typed,
    /// Anything else. Wide integers become decimal strings.
    Nested,
}

impl Mode {
    /// Mode of a field named `key` inside a compound in this mode.
    fn field(self, key: &str) -> Self {
        if self == Self::Root && TYPED_FIELDS.contains(&key) { Self::Typed } else { Self::Nested }
    }
}

/// A payload that serializes with wide integers rendered as decimal strings.
#[derive(Debug)]
pub(crate) struct Normalized<'a, T: ?Sized> {
    value: &'a T,
    mode: Mode,
}

impl<'a, T: ?Sized> Normalized<'a, T> {
    /// Wraps a block payload.
    pub(crate) const fn new(value: &'a T) -> Self {
        Self { value, mode: Mode::Root }
    }

    const fn with_mode(value: &'a T, mode: Mode) -> Self {
        Self { value, mode }
    }
}

impl<T: Serialize + ?Sized> Serialize for Normalized<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(IntegerSerializer { inner: serializer, mode: self.mode })
    }
}

struct IntegerSerializer<S> {
    inner: S,
    mode: Mode,
}

impl<S> IntegerSerializer<S> {
    /// Mode of the fields of an object serialized in this mode.
    const fn fields(&self) -> Mode {
        match self.mode {
            Mode::Root => Mode::Root,
            Mode::Typed | Mode::Nested => Mode::Nested,
        }
    }
}

impl<S: Serializer> Serializer for IntegerSerializer<S> {
    type Ok = S::Ok;
    type Error = S::Error;
    type SerializeSeq = Compound<S::SerializeSeq>;
    type SerializeTuple = Compound<S::SerializeTuple>;
    type SerializeTupleStruct = Compound<S::SerializeTupleStruct>;
    type SerializeTupleVariant = Compound<S::SerializeTupleVariant>;
    type SerializeMap = Compound<S::SerializeMap>;
    type SerializeStruct = Compound<S::SerializeStruct>;
    type SerializeStructVariant = Compound<S::SerializeStructVariant>;

    fn serialize_bool(self, v: bool) -> Result<S::Ok, S::Error> {
        self.inner.serialize_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<S::Ok, S::Error> {
        self.inner.serialize_i8(v)
    }

    fn serialize_i16(self, v: i16) -> Result<S::Ok, S::Error> {
        self.inner.serialize_i16(v)
    }

    fn serialize_i32(self, v: i32) -> Result<S::Ok, S::Error> {
        self.inner.serialize_i32(v)
    }

    fn serialize_i64(self, v: i64) -> Result<S::Ok, S::Error> {
        match self.mode {
            Mode::Typed => self.inner.serialize_i64(v),
            Mode::Root | Mode::Nested => self.inner.collect_str(&v),
        }
    }

    fn serialize_i128(self, v: i128) -> Result<S::Ok, S::Error> {
        match (self.mode, i64::try_from(v)) {
            (Mode::Typed, Ok(v)) => self.inner.serialize_i64(v),
            _ => self.inner.collect_str(&v),
        }
    }

    fn serialize_u8(self, v: u8) -> Result<S::Ok, S::Error> {
        self.inner.serialize_u8(v)
    }

    fn serialize_u16(self, v: u16) -> Result<S::Ok, S::Error> {
        self.inner.serialize_u16(v)
    }

    fn serialize_u32(self, v: u32) -> Result<S::Ok, S::Error> {
        self.inner.serialize_u32(v)
    }

    fn serialize_u64(self, v: u64) -> Result<S::Ok, S::Error> {
        match self.mode {
            Mode::Typed => self.inner.serialize_u64(v),
            Mode::Root | Mode::Nested => self.inner.collect_str(&v),
        }
    }

    fn serialize_u128(self, v: u128) -> Result<S::Ok, S::Error> {
        match (self.mode, u64::try_from(v)) {
            (Mode::Typed, Ok(v)) => self.inner.serialize_u64(v),
            _ => self.inner.collect_str(&v),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<S::Ok, S::Error> {
        self.inner.serialize_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<S::Ok, S::Error> {
        self.inner.serialize_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<S::Ok, S::Error> {
        self.inner.serialize_char(v)
    }

    fn serialize_str(self, v: &str) -> Result<S::Ok, S::Error> {
        self.inner.serialize_str(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<S::Ok, S::Error> {
        self.inner.serialize_bytes(v)
    }

    fn serialize_none(self) -> Result<S::Ok, S::Error> {
        self.inner.serialize_none()
    }

    fn serialize_some<T>(self, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_some(&Normalized::with_mode(value, self.mode))
    }

    fn serialize_unit(self) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit_struct(name)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<S::Ok, S::Error> {
        self.inner.serialize_unit_variant(name, variant_index, variant)
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_newtype_struct(name, &Normalized::with_mode(value, self.mode))
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<S::Ok, S::Error>
    where
        T: ?Sized + Serialize,
    {
        let value = Normalized::with_mode(value, Mode::Nested);
        self.inner.serialize_newtype_variant(name, variant_index, variant, &value)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, S::Error> {
        Ok(Compound::nested(self.inner.serialize_seq(len)?))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, S::Error> {
        Ok(Compound::nested(self.inner.serialize_tuple(len)?))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, S::Error> {
        Ok(Compound::nested(self.inner.serialize_tuple_struct(name, len)?))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, S::Error> {
        let inner = self.inner.serialize_tuple_variant(name, variant_index, variant, len)?;
        Ok(Compound::nested(inner))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, S::Error> {
        let mode = self.fields();
        Ok(Compound { inner: self.inner.serialize_map(len)?, mode, next: Mode::Nested })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, S::Error> {
        let mode = self.fields();
        Ok(Compound { inner: self.inner.serialize_struct(name, len)?, mode, next: Mode::Nested })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, S::Error> {
        let inner = self.inner.serialize_struct_variant(name, variant_index, variant, len)?;
        Ok(Compound::nested(inner))
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}

/// A compound value under construction. `mode` is the mode of the compound itself, `next` the
/// mode of the map value whose key was serialized last.
struct Compound<C> {
    inner: C,
    mode: Mode,
    next: Mode,
}

impl<C> Compound<C> {
    const fn nested(inner: C) -> Self {
        Self { inner, mode: Mode::Nested, next: Mode::Nested }
    }
}

impl<C: SerializeSeq> SerializeSeq for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_element(&Normalized::with_mode(value, Mode::Nested))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: SerializeTuple> SerializeTuple for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_element(&Normalized::with_mode(value, Mode::Nested))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: SerializeTupleStruct> SerializeTupleStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(&Normalized::with_mode(value, Mode::Nested))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: SerializeTupleVariant> SerializeTupleVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(&Normalized::with_mode(value, Mode::Nested))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: SerializeMap> SerializeMap for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.next = match self.mode {
            Mode::Root => match serde_json::to_value(key) {
                Ok(Value::String(name)) => self.mode.field(&name),
                _ => Mode::Nested,
            },
            Mode::Typed | Mode::Nested => Mode::Nested,
        };
        self.inner.serialize_key(key)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_value(&Normalized::with_mode(value, self.next))
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: SerializeStruct> SerializeStruct for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(key, &Normalized::with_mode(value, self.mode.field(key)))
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), C::Error> {
        self.inner.skip_field(key)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}

impl<C: SerializeStructVariant> SerializeStructVariant for Compound<C> {
    type Ok = C::Ok;
    type Error = C::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), C::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(key, &Normalized::with_mode(value, Mode::Nested))
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), C::Error> {
        self.inner.skip_field(key)
    }

    fn end(self) -> Result<C::Ok, C::Error> {
        self.inner.end()
    }
}
