//! Turns in-memory records into a newline-delimited payload.

use std::fmt;

use serde::Serialize;
use serde::ser::{self, Impossible};

use crate::errors::Error;

/// Encodes one record as a single line terminated by `\n`.
///
/// Structured values (objects, arrays, `null`) are written as compact JSON.
/// Strings are written verbatim. Numbers and booleans use their plain
/// string form: finite numbers match their JSON encoding, non-finite floats
/// become `NaN`, `Infinity` or `-Infinity`. Non-finite floats nested inside
/// structured values are JSON `null`.
pub fn encode_line<T: Serialize + ?Sized>(record: &T) -> Result<String, Error> {
    let mut line = match record.serialize(ScalarText) {
        Ok(text) => text,
        Err(NotScalar) => serde_json::to_string(record)?,
    };
    line.push('\n');
    Ok(line)
}

/// Concatenates [`encode_line`] over `records`, preserving input order.
pub fn encode_lines<I>(records: I) -> Result<Vec<u8>, Error>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let mut payload = Vec::new();
    for record in records {
        payload.extend_from_slice(encode_line(&record)?.as_bytes());
    }
    Ok(payload)
}

/// Renders a top-level scalar as plain text. Anything else is refused so
/// the caller falls back to JSON.
struct ScalarText;

#[derive(Debug)]
struct NotScalar;

impl fmt::Display for NotScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is not a scalar")
    }
}

impl std::error::Error for NotScalar {}

impl ser::Error for NotScalar {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        NotScalar
    }
}

fn non_finite_text(nan: bool, positive: bool) -> String {
    match (nan, positive) {
        (true, _) => "NaN".to_string(),
        (false, true) => "Infinity".to_string(),
        (false, false) => "-Infinity".to_string(),
    }
}

impl ser::Serializer for ScalarText {
    type Ok = String;
    type Error = NotScalar;
    type SerializeSeq = Impossible<String, NotScalar>;
    type SerializeTuple = Impossible<String, NotScalar>;
    type SerializeTupleStruct = Impossible<String, NotScalar>;
    type SerializeTupleVariant = Impossible<String, NotScalar>;
    type SerializeMap = Impossible<String, NotScalar>;
    type SerializeStruct = Impossible<String, NotScalar>;
    type SerializeStructVariant = Impossible<String, NotScalar>;

    fn serialize_bool(self, v: bool) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> Result<String, NotScalar> {
        if v.is_finite() {
            serde_json::to_string(&v).map_err(|_| NotScalar)
        } else {
            Ok(non_finite_text(v.is_nan(), v.is_sign_positive()))
        }
    }

    fn serialize_f64(self, v: f64) -> Result<String, NotScalar> {
        if v.is_finite() {
            serde_json::to_string(&v).map_err(|_| NotScalar)
        } else {
            Ok(non_finite_text(v.is_nan(), v.is_sign_positive()))
        }
    }

    fn serialize_char(self, v: char) -> Result<String, NotScalar> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, NotScalar> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_none(self) -> Result<String, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, NotScalar> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, NotScalar> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, NotScalar> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, NotScalar> {
        Err(NotScalar)
    }
}
