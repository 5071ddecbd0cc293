// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! The atomic `(tag, value)` unit of a FIX message.
//!
//! Values are fundamentally byte sequences in wire form, with on-demand views
//! as string, integer, or boolean. Fields are immutable after construction.

use std::fmt;

use bytes::Bytes;

use crate::{
    consts::NULL_SENTINEL,
    dictionary::tag_name,
    error::ValidationError,
};

/// A FIX field value: bytes in wire form with typed views.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldValue(Bytes);

impl FieldValue {
    /// Creates a new [`FieldValue`] from raw wire bytes.
    #[must_use]
    pub const fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// The raw wire bytes of this value.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this value is the protocol null sentinel (`-2147483648`).
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.as_ref() == NULL_SENTINEL
    }

    /// Views the value as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, ValidationError> {
        std::str::from_utf8(&self.0).map_err(|e| ValidationError::InvalidValue {
            tag: 0,
            reason: format!("invalid UTF-8: {e}"),
        })
    }

    /// Parses the value as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a decimal integer.
    pub fn as_i64(&self) -> Result<i64, ValidationError> {
        self.as_str()?
            .parse()
            .map_err(|e| ValidationError::InvalidValue {
                tag: 0,
                reason: format!("not an integer: {e}"),
            })
    }

    /// Parses the value as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-negative decimal integer.
    pub fn as_u64(&self) -> Result<u64, ValidationError> {
        self.as_str()?
            .parse()
            .map_err(|e| ValidationError::InvalidValue {
                tag: 0,
                reason: format!("not an unsigned integer: {e}"),
            })
    }

    /// Parses the value as a boolean.
    ///
    /// Truthy values are `y`, `yes`, `t`, `true`, `on`, and `1`; falsy values
    /// are `n`, `no`, `f`, `false`, `off`, and `0` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error for any other value.
    pub fn as_bool(&self) -> Result<bool, ValidationError> {
        match self.as_str()?.to_ascii_lowercase().as_str() {
            "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
            "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
            other => Err(ValidationError::InvalidValue {
                tag: 0,
                reason: format!("not a boolean: '{other}'"),
            }),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<Bytes> for FieldValue {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self(Bytes::from(value.into_bytes()))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self(Bytes::from_static(if value { b"Y" } else { b"N" }))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self(Bytes::from(value.to_string().into_bytes()))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self(Bytes::from(value.to_string().into_bytes()))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self(Bytes::from(value.to_string().into_bytes()))
    }
}

/// A FIX field: an integer tag (≥ 1) paired with a wire-form value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Field {
    tag: u32,
    value: FieldValue,
}

impl Field {
    /// Creates a new [`Field`] instance.
    #[must_use]
    pub fn new(tag: u32, value: impl Into<FieldValue>) -> Self {
        debug_assert!(tag >= 1, "FIX tags start at 1");
        Self {
            tag,
            value: value.into(),
        }
    }

    /// The tag number.
    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.tag
    }

    /// The wire-form value.
    #[must_use]
    pub const fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Whether the value is the protocol null sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Views the value as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid UTF-8.
    pub fn as_str(&self) -> Result<&str, ValidationError> {
        self.value.as_str().map_err(|e| self.retag(e))
    }

    /// Parses the value as a signed integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a decimal integer.
    pub fn as_i64(&self) -> Result<i64, ValidationError> {
        self.value.as_i64().map_err(|e| self.retag(e))
    }

    /// Parses the value as an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a non-negative decimal integer.
    pub fn as_u64(&self) -> Result<u64, ValidationError> {
        self.value.as_u64().map_err(|e| self.retag(e))
    }

    /// Parses the value as a boolean (`Y`/`N` and the canonical truthy set).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not boolean-like.
    pub fn as_bool(&self) -> Result<bool, ValidationError> {
        self.value.as_bool().map_err(|e| self.retag(e))
    }

    /// Appends the `tag=value` SOH-terminated wire form to `buf`.
    pub(crate) fn to_wire(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.tag.to_string().as_bytes());
        buf.push(b'=');
        buf.extend_from_slice(self.value.as_bytes());
        buf.push(crate::consts::SOH);
    }

    fn retag(&self, error: ValidationError) -> ValidationError {
        match error {
            ValidationError::InvalidValue { reason, .. } => ValidationError::InvalidValue {
                tag: self.tag,
                reason,
            },
            other => other,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tag, self.value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match tag_name(self.tag) {
            Some(name) => write!(f, "{name} ({}): {}", self.tag, self.value),
            None => write!(f, "{}: {}", self.tag, self.value),
        }
    }
}
