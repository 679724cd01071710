//! # RESP2 Value Model
//!
//! Purpose: Represent decoded RESP2 values in memory so the proxy can inspect
//! and forward them without re-parsing.
//!
//! ## Design Principles
//! 1. **Closed Variant Set**: Five wire types map to five enum variants; the
//!    payload a variant carries is the only one that is valid for it.
//! 2. **Binary-Safe**: Payloads are raw `Bytes`, integers included; nothing is
//!    validated or parsed here.
//! 3. **Borrowed Children**: Arrays hold references to their children, whose
//!    lifetime is governed by the arena (or stack) that owns them.
//! 4. **Null Is Not Empty**: `$-1`/`*-1` and `$0`/`*0` stay distinguishable.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use crate::error::{RespError, RespResult};

/// RESP2 type marker. The discriminant is the leading wire byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespType {
    /// `+OK` style simple strings.
    String = b'+',
    /// `-ERR ...` replies.
    Error = b'-',
    /// `:123` integers, kept as their decimal text.
    Int = b':',
    /// `$...` bulk strings.
    BulkBytes = b'$',
    /// `*...` arrays.
    Array = b'*',
}

impl RespType {
    /// Returns the wire byte for this type.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the fixed debug label.
    pub const fn label(self) -> &'static str {
        match self {
            RespType::String => "<string>",
            RespType::Error => "<error>",
            RespType::Int => "<int>",
            RespType::BulkBytes => "<bulkbytes>",
            RespType::Array => "<array>",
        }
    }
}

impl TryFrom<u8> for RespType {
    type Error = RespError;

    fn try_from(byte: u8) -> RespResult<Self> {
        match byte {
            b'+' => Ok(RespType::String),
            b'-' => Ok(RespType::Error),
            b':' => Ok(RespType::Int),
            b'$' => Ok(RespType::BulkBytes),
            b'*' => Ok(RespType::Array),
            other => Err(RespError::UnknownType(other)),
        }
    }
}

impl fmt::Display for RespType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Debug label for any leading byte.
///
/// Known types get their fixed label; anything else renders as
/// `<unknown-0xNN>` so malformed input can be logged without failing.
pub fn type_label(byte: u8) -> Cow<'static, str> {
    match RespType::try_from(byte) {
        Ok(ty) => Cow::Borrowed(ty.label()),
        Err(_) => Cow::Owned(format!("<unknown-0x{:02x}>", byte)),
    }
}

/// Array slot: a reference to a child value, `None` until populated.
pub type RespRef<'a> = Option<&'a Resp<'a>>;

/// Decoded RESP2 value.
///
/// Byte payloads are owned; array children are borrowed for `'a`, usually from
/// a [`RespArena`](crate::RespArena).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resp<'a> {
    /// Simple string payload, without the `+` and CRLF.
    String(Bytes),
    /// Error message, without the `-` and CRLF.
    Error(Bytes),
    /// Integer as decimal text.
    Int(Bytes),
    /// Bulk string payload, `None` for `$-1`.
    BulkBytes(Option<Bytes>),
    /// Array children, `None` for `*-1`.
    Array(Option<&'a [RespRef<'a>]>),
}

// Fresh arena nodes read as a null bulk string until the caller fills them.
impl Default for Resp<'_> {
    fn default() -> Self {
        Resp::BulkBytes(None)
    }
}

impl<'a> Resp<'a> {
    /// Builds a simple string (`+`).
    pub fn new_string(value: impl Into<Bytes>) -> Self {
        Resp::String(value.into())
    }

    /// Builds an error reply (`-`).
    pub fn new_error(value: impl Into<Bytes>) -> Self {
        Resp::Error(value.into())
    }

    /// Builds an integer from its decimal text; the bytes are not checked.
    pub fn new_int(value: impl Into<Bytes>) -> Self {
        Resp::Int(value.into())
    }

    /// Builds a non-null bulk string (`$`).
    pub fn new_bulk_bytes(value: impl Into<Bytes>) -> Self {
        Resp::BulkBytes(Some(value.into()))
    }

    /// `$-1`.
    pub const fn null_bulk_bytes() -> Self {
        Resp::BulkBytes(None)
    }

    /// Builds an array over `children`. An empty slice is `*0`, not `*-1`.
    pub const fn new_array(children: &'a [RespRef<'a>]) -> Self {
        Resp::Array(Some(children))
    }

    /// `*-1`.
    pub const fn null_array() -> Self {
        Resp::Array(None)
    }

    /// Returns the type tag.
    #[inline]
    pub const fn ty(&self) -> RespType {
        match self {
            Resp::String(_) => RespType::String,
            Resp::Error(_) => RespType::Error,
            Resp::Int(_) => RespType::Int,
            Resp::BulkBytes(_) => RespType::BulkBytes,
            Resp::Array(_) => RespType::Array,
        }
    }

    /// True for `+` simple strings.
    #[inline]
    pub const fn is_string(&self) -> bool {
        matches!(self, Resp::String(_))
    }

    /// True for `-` error replies.
    #[inline]
    pub const fn is_error(&self) -> bool {
        matches!(self, Resp::Error(_))
    }

    /// True for `:` integers.
    #[inline]
    pub const fn is_int(&self) -> bool {
        matches!(self, Resp::Int(_))
    }

    /// True for `$` bulk strings, null or not.
    #[inline]
    pub const fn is_bulk_bytes(&self) -> bool {
        matches!(self, Resp::BulkBytes(_))
    }

    /// True for `*` arrays, null or not.
    #[inline]
    pub const fn is_array(&self) -> bool {
        matches!(self, Resp::Array(_))
    }

    /// True for `$-1` and `*-1`.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Resp::BulkBytes(None) | Resp::Array(None))
    }

    /// True only for `*-1`.
    #[inline]
    pub const fn is_null_array(&self) -> bool {
        matches!(self, Resp::Array(None))
    }

    /// Byte payload of a scalar value.
    ///
    /// Returns `None` for arrays and for a null bulk string.
    pub fn value(&self) -> Option<&Bytes> {
        match self {
            Resp::String(value) | Resp::Error(value) | Resp::Int(value) => Some(value),
            Resp::BulkBytes(value) => value.as_ref(),
            Resp::Array(_) => None,
        }
    }

    /// Children of an array. Returns `None` for scalars and for `*-1`.
    pub fn array(&self) -> Option<&'a [RespRef<'a>]> {
        match self {
            Resp::Array(children) => *children,
            _ => None,
        }
    }

    /// Payload length: bytes for scalars, elements for arrays, 0 for nulls.
    pub fn len(&self) -> usize {
        match self {
            Resp::Array(children) => children.map_or(0, <[_]>::len),
            _ => self.value().map_or(0, Bytes::len),
        }
    }

    /// True when `len()` is 0, nulls included.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
