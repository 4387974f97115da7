//! Attribute values (7.18 Data Types).
//!
//! An [`AttrValue`] is a small tagged union, its tag is an [`AttrValType`].
//! Values are persisted as a record of one tag byte followed by the payload in
//! little-endian order, see [`AttrValue::to_record`].

use core::cmp::Ordering;

use bytes::{Buf, BufMut, BytesMut};
use num::FromPrimitive;

use crate::{
    constants::{LONG_STRING_MAX_LEN, SHORT_STRING_MAX_LEN},
    Error, Result,
};

/// Set on the tag byte of a persisted null value
const NULL_TAG_FLAG: u8 = 0x80;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum AttrValType {
    Empty = 0x00,
    Boolean = 0x01,
    Int8 = 0x02,
    Int16 = 0x03,
    Int32 = 0x04,
    Int64 = 0x05,
    Uint8 = 0x06,
    Uint16 = 0x07,
    Uint32 = 0x08,
    Uint64 = 0x09,
    Float = 0x0a,
    Double = 0x0b,
    Enum8 = 0x0c,
    Enum16 = 0x0d,
    Bitmap8 = 0x0e,
    Bitmap16 = 0x0f,
    Bitmap32 = 0x10,
    CharString = 0x11,
    LongCharString = 0x12,
    OctetString = 0x13,
    LongOctetString = 0x14,
    /// Encoded list payload, opaque to the data model
    Array = 0x15,
}

impl AttrValType {
    /// Scalar numeric types accept `[min, max]` bounds
    pub fn is_boundable(&self) -> bool {
        use AttrValType::*;
        matches!(
            self,
            Int8 | Int16
                | Int32
                | Int64
                | Uint8
                | Uint16
                | Uint32
                | Uint64
                | Float
                | Double
                | Enum8
                | Enum16
        )
    }

    pub fn is_variable_length(&self) -> bool {
        use AttrValType::*;
        matches!(
            self,
            CharString | LongCharString | OctetString | LongOctetString | Array
        )
    }

    /// Size of the payload of fixed size types
    pub fn fixed_size(&self) -> Option<usize> {
        use AttrValType::*;
        match self {
            Empty => Some(0),
            Boolean | Int8 | Uint8 | Enum8 | Bitmap8 => Some(1),
            Int16 | Uint16 | Enum16 | Bitmap16 => Some(2),
            Int32 | Uint32 | Float | Bitmap32 => Some(4),
            Int64 | Uint64 | Double => Some(8),
            CharString | LongCharString | OctetString | LongOctetString | Array => None,
        }
    }

    fn max_len(&self) -> Option<usize> {
        use AttrValType::*;
        match self {
            CharString | OctetString => Some(SHORT_STRING_MAX_LEN),
            LongCharString | LongOctetString | Array => Some(LONG_STRING_MAX_LEN),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Empty,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Enum8(u8),
    Enum16(u16),
    Bitmap8(u8),
    Bitmap16(u16),
    Bitmap32(u32),
    CharString(String),
    LongCharString(String),
    OctetString(Vec<u8>),
    LongOctetString(Vec<u8>),
    Array(Vec<u8>),
    /// The null value of a nullable attribute of the given type
    Null(AttrValType),
}

impl AttrValue {
    pub fn val_type(&self) -> AttrValType {
        use AttrValue::*;
        match self {
            Empty => AttrValType::Empty,
            Boolean(_) => AttrValType::Boolean,
            Int8(_) => AttrValType::Int8,
            Int16(_) => AttrValType::Int16,
            Int32(_) => AttrValType::Int32,
            Int64(_) => AttrValType::Int64,
            Uint8(_) => AttrValType::Uint8,
            Uint16(_) => AttrValType::Uint16,
            Uint32(_) => AttrValType::Uint32,
            Uint64(_) => AttrValType::Uint64,
            Float(_) => AttrValType::Float,
            Double(_) => AttrValType::Double,
            Enum8(_) => AttrValType::Enum8,
            Enum16(_) => AttrValType::Enum16,
            Bitmap8(_) => AttrValType::Bitmap8,
            Bitmap16(_) => AttrValType::Bitmap16,
            Bitmap32(_) => AttrValType::Bitmap32,
            CharString(_) => AttrValType::CharString,
            LongCharString(_) => AttrValType::LongCharString,
            OctetString(_) => AttrValType::OctetString,
            LongOctetString(_) => AttrValType::LongOctetString,
            Array(_) => AttrValType::Array,
            Null(t) => *t,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Compare two non-null values of the same scalar type
    pub fn compare(&self, other: &AttrValue) -> Option<Ordering> {
        use AttrValue::*;
        match (self, other) {
            (Int8(a), Int8(b)) => a.partial_cmp(b),
            (Int16(a), Int16(b)) => a.partial_cmp(b),
            (Int32(a), Int32(b)) => a.partial_cmp(b),
            (Int64(a), Int64(b)) => a.partial_cmp(b),
            (Uint8(a), Uint8(b)) | (Enum8(a), Enum8(b)) => a.partial_cmp(b),
            (Uint16(a), Uint16(b)) | (Enum16(a), Enum16(b)) => a.partial_cmp(b),
            (Uint32(a), Uint32(b)) => a.partial_cmp(b),
            (Uint64(a), Uint64(b)) => a.partial_cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Check the length limit of strings and arrays
    pub fn check_len(&self) -> Result<()> {
        match self.val_type().max_len() {
            Some(max) if self.payload_len() > max => Err(Error::ConstraintError),
            _ => Ok(()),
        }
    }

    pub fn payload_len(&self) -> usize {
        use AttrValue::*;
        match self {
            Null(_) => 0,
            CharString(s) | LongCharString(s) => s.len(),
            OctetString(b) | LongOctetString(b) | Array(b) => b.len(),
            v => v.val_type().fixed_size().unwrap_or_default(),
        }
    }

    /// Write the payload, without tag or length prefix
    pub fn encode_payload<B: BufMut>(&self, buf: &mut B) {
        use AttrValue::*;
        match self {
            Empty | Null(_) => {}
            Boolean(v) => buf.put_u8(u8::from(*v)),
            Int8(v) => buf.put_i8(*v),
            Int16(v) => buf.put_i16_le(*v),
            Int32(v) => buf.put_i32_le(*v),
            Int64(v) => buf.put_i64_le(*v),
            Uint8(v) | Enum8(v) | Bitmap8(v) => buf.put_u8(*v),
            Uint16(v) | Enum16(v) | Bitmap16(v) => buf.put_u16_le(*v),
            Uint32(v) | Bitmap32(v) => buf.put_u32_le(*v),
            Uint64(v) => buf.put_u64_le(*v),
            Float(v) => buf.put_f32_le(*v),
            Double(v) => buf.put_f64_le(*v),
            CharString(s) | LongCharString(s) => buf.put_slice(s.as_bytes()),
            OctetString(b) | LongOctetString(b) | Array(b) => buf.put_slice(b),
        }
    }

    /// Decode a payload written by [`encode_payload`](Self::encode_payload).
    /// The payload must be consumed exactly.
    pub fn decode_payload(val_type: AttrValType, mut payload: &[u8]) -> Result<Self> {
        use AttrValType as T;
        if let Some(size) = val_type.fixed_size() {
            if payload.len() != size {
                return Err(Error::InvalidValue);
            }
        }
        let value = match val_type {
            T::Empty => AttrValue::Empty,
            T::Boolean => match payload.get_u8() {
                0 => AttrValue::Boolean(false),
                1 => AttrValue::Boolean(true),
                _ => return Err(Error::InvalidValue),
            },
            T::Int8 => AttrValue::Int8(payload.get_i8()),
            T::Int16 => AttrValue::Int16(payload.get_i16_le()),
            T::Int32 => AttrValue::Int32(payload.get_i32_le()),
            T::Int64 => AttrValue::Int64(payload.get_i64_le()),
            T::Uint8 => AttrValue::Uint8(payload.get_u8()),
            T::Uint16 => AttrValue::Uint16(payload.get_u16_le()),
            T::Uint32 => AttrValue::Uint32(payload.get_u32_le()),
            T::Uint64 => AttrValue::Uint64(payload.get_u64_le()),
            T::Float => AttrValue::Float(payload.get_f32_le()),
            T::Double => AttrValue::Double(payload.get_f64_le()),
            T::Enum8 => AttrValue::Enum8(payload.get_u8()),
            T::Enum16 => AttrValue::Enum16(payload.get_u16_le()),
            T::Bitmap8 => AttrValue::Bitmap8(payload.get_u8()),
            T::Bitmap16 => AttrValue::Bitmap16(payload.get_u16_le()),
            T::Bitmap32 => AttrValue::Bitmap32(payload.get_u32_le()),
            T::CharString => AttrValue::CharString(utf8(payload)?),
            T::LongCharString => AttrValue::LongCharString(utf8(payload)?),
            T::OctetString => AttrValue::OctetString(payload.to_vec()),
            T::LongOctetString => AttrValue::LongOctetString(payload.to_vec()),
            T::Array => AttrValue::Array(payload.to_vec()),
        };
        value.check_len().map_err(|_| Error::InvalidValue)?;
        Ok(value)
    }

    /// Persisted form: tag byte (with the null flag for null values), then payload
    pub fn to_record(&self) -> BytesMut {
        let mut record = BytesMut::with_capacity(1 + self.payload_len());
        let mut tag = self.val_type() as u8;
        if self.is_null() {
            tag |= NULL_TAG_FLAG;
        }
        record.put_u8(tag);
        self.encode_payload(&mut record);
        record
    }

    /// Decode a persisted record. Unknown tags and malformed payloads are
    /// reported as [`Error::PersistedTypeMismatch`].
    pub fn from_record(record: &[u8]) -> Result<Self> {
        let (&tag, payload) = record.split_first().ok_or(Error::PersistedTypeMismatch)?;
        let val_type =
            AttrValType::from_u8(tag & !NULL_TAG_FLAG).ok_or(Error::PersistedTypeMismatch)?;
        if tag & NULL_TAG_FLAG != 0 {
            return if payload.is_empty() {
                Ok(AttrValue::Null(val_type))
            } else {
                Err(Error::PersistedTypeMismatch)
            };
        }
        Self::decode_payload(val_type, payload).map_err(|_| Error::PersistedTypeMismatch)
    }
}

fn utf8(payload: &[u8]) -> Result<String> {
    core::str::from_utf8(payload)
        .map(str::to_owned)
        .map_err(|_| Error::InvalidValue)
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$t> for AttrValue {
                fn from(value: $t) -> Self {
                    AttrValue::$variant(value)
                }
            }
        )+
    };
}

impl_from!(
    bool => Boolean,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float,
    f64 => Double,
    String => CharString,
);

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::CharString(value.to_owned())
    }
}
