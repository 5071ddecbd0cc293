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

//! The FIX message model: fields, ordered field collections, repeating
//! groups, and the message itself.

pub mod admin;
pub mod field;
pub mod group;
pub mod map;

use std::fmt;

use crate::{
    dictionary::{MsgType, Tag, is_admin_msg_type},
    error::{FieldMapError, ValidationError},
    message::{
        field::{Field, FieldValue},
        group::Group,
        map::{Entry, FieldMap},
    },
};

/// A FIX message: an ordered, tag-keyed field collection with derived header
/// accessors.
///
/// Messages are constructed either by decoding raw bytes or by the
/// application; they are enriched with header fields and checksum at send
/// time and archived in the message store keyed by
/// `(session_id, originator, seq_num)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    fields: FieldMap,
}

impl Message {
    /// Creates a new empty [`Message`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message of the given type.
    #[must_use]
    pub fn of_type(msg_type: MsgType) -> Self {
        let mut message = Self::new();
        message.set(Tag::MsgType.code(), msg_type.code());
        message
    }

    /// Creates a message from `(tag, value)` pairs, rejecting duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if a tag is repeated.
    pub fn from_pairs<V>(pairs: impl IntoIterator<Item = (u32, V)>) -> Result<Self, FieldMapError>
    where
        V: Into<FieldValue>,
    {
        let mut fields = FieldMap::new();
        for (tag, value) in pairs {
            fields.insert(Entry::Field(Field::new(tag, value)))?;
        }
        Ok(Self { fields })
    }

    pub(crate) const fn from_field_map(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// The underlying field map.
    #[must_use]
    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Sets a field, replacing any existing value in place.
    pub fn set(&mut self, tag: u32, value: impl Into<FieldValue>) {
        self.fields.set(Entry::Field(Field::new(tag, value)));
    }

    /// Sets a repeating group, replacing any previous group with the same
    /// identifier tag.
    pub fn set_group(&mut self, group: Group) {
        self.fields.set(Entry::Group(group));
    }

    /// Returns the field at `tag`, if present.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&Field> {
        match self.fields.get(tag) {
            Some(Entry::Field(field)) => Some(field),
            _ => None,
        }
    }

    /// Returns the field at `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is absent or keys a group.
    pub fn field(&self, tag: u32) -> Result<&Field, FieldMapError> {
        self.fields.field(tag)
    }

    /// Returns the repeating group at `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is absent or keys a single field.
    pub fn group(&self, tag: u32) -> Result<&Group, FieldMapError> {
        self.fields.group(tag)
    }

    /// Whether a field or group with `tag` exists.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.fields.contains(tag)
    }

    /// Removes the entry at `tag`.
    pub fn remove(&mut self, tag: u32) -> Option<Entry> {
        self.fields.remove(tag)
    }

    /// Iterates entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.fields.entries()
    }

    /// The message type (tag 35).
    ///
    /// # Errors
    ///
    /// Returns an error if tag 35 is absent.
    pub fn msg_type(&self) -> Result<&str, ValidationError> {
        self.fields
            .field(Tag::MsgType.code())
            .map_err(|_| ValidationError::MissingMsgType)?
            .as_str()
    }

    /// The human friendly name of the message type, when known.
    #[must_use]
    pub fn type_name(&self) -> Option<&'static str> {
        let code = self.msg_type().ok()?;
        MsgType::from_code(code).map(MsgType::name).ok()
    }

    /// The message sequence number (tag 34).
    ///
    /// # Errors
    ///
    /// Returns an error if tag 34 is absent or non-numeric.
    pub fn seq_num(&self) -> Result<u64, ValidationError> {
        self.fields
            .field(Tag::MsgSeqNum.code())
            .map_err(|_| ValidationError::InvalidValue {
                tag: Tag::MsgSeqNum.code(),
                reason: "missing".to_string(),
            })?
            .as_u64()
    }

    /// The sender comp id (tag 49).
    ///
    /// # Errors
    ///
    /// Returns an error if tag 49 is absent or holds invalid bytes.
    pub fn sender_id(&self) -> Result<&str, ValidationError> {
        self.fields
            .field(Tag::SenderCompID.code())
            .map_err(|_| ValidationError::InvalidValue {
                tag: Tag::SenderCompID.code(),
                reason: "missing".to_string(),
            })?
            .as_str()
    }

    /// The target comp id (tag 56).
    ///
    /// # Errors
    ///
    /// Returns an error if tag 56 is absent or holds invalid bytes.
    pub fn target_id(&self) -> Result<&str, ValidationError> {
        self.fields
            .field(Tag::TargetCompID.code())
            .map_err(|_| ValidationError::InvalidValue {
                tag: Tag::TargetCompID.code(),
                reason: "missing".to_string(),
            })?
            .as_str()
    }

    /// Whether this message is of the given type.
    #[must_use]
    pub fn is_type(&self, msg_type: MsgType) -> bool {
        self.msg_type().is_ok_and(|t| t == msg_type.code())
    }

    /// Whether this is a session-level administrative message.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.msg_type().is_ok_and(is_admin_msg_type)
    }

    /// Whether `PossDupFlag` (43) is set.
    #[must_use]
    pub fn is_poss_dup(&self) -> bool {
        self.get(Tag::PossDupFlag.code())
            .is_some_and(|f| f.as_bool().unwrap_or(false))
    }

    /// Validates that the message is well formed (tag 35 present).
    ///
    /// # Errors
    ///
    /// Returns an error if tag 35 is absent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.fields.contains(Tag::MsgType.code()) {
            return Err(ValidationError::MissingMsgType);
        }
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.type_name() {
            write!(f, "{name} ")?;
        }
        write!(f, "{{{}}}", self.fields)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_header_accessors() {
        let message = Message::from_pairs([
            (35, "A"),
            (34, "7"),
            (49, "SENDER"),
            (56, "TARGET"),
        ])
        .unwrap();

        assert_eq!(message.msg_type().unwrap(), "A");
        assert_eq!(message.seq_num().unwrap(), 7);
        assert_eq!(message.sender_id().unwrap(), "SENDER");
        assert_eq!(message.target_id().unwrap(), "TARGET");
        assert_eq!(message.type_name(), Some("Logon"));
        assert!(message.is_admin());
        assert!(message.validate().is_ok());
    }

    #[rstest]
    fn test_duplicate_pairs_rejected() {
        let result = Message::from_pairs([(55, "EURUSD"), (55, "GBPUSD")]);
        assert_eq!(result.unwrap_err(), FieldMapError::DuplicateTag(55));
    }

    #[rstest]
    fn test_missing_msg_type_fails_validation() {
        let message = Message::from_pairs([(49, "SENDER")]).unwrap();
        assert_eq!(message.validate(), Err(ValidationError::MissingMsgType));
        assert_eq!(message.msg_type(), Err(ValidationError::MissingMsgType));
    }

    #[rstest]
    fn test_missing_comp_ids_are_errors() {
        let message = Message::of_type(MsgType::Heartbeat);
        assert!(matches!(
            message.sender_id(),
            Err(ValidationError::InvalidValue { tag: 49, .. })
        ));
        assert!(matches!(
            message.target_id(),
            Err(ValidationError::InvalidValue { tag: 56, .. })
        ));
    }

    #[rstest]
    fn test_malformed_comp_id_bytes_propagate() {
        // A lenient decode can deliver non-UTF8 bytes into tag 49.
        let mut message = Message::of_type(MsgType::Heartbeat);
        message.set(49, &b"\xff\xfeSENDER"[..]);
        assert!(matches!(
            message.sender_id(),
            Err(ValidationError::InvalidValue { tag: 49, .. })
        ));
    }

    #[rstest]
    fn test_poss_dup_flag() {
        let mut message = Message::of_type(MsgType::NewOrderSingle);
        assert!(!message.is_poss_dup());
        message.set(43, "Y");
        assert!(message.is_poss_dup());
        assert!(!message.is_admin());
    }

    #[rstest]
    fn test_set_replaces_in_place() {
        let mut message = Message::from_pairs([(35, "D"), (55, "EURUSD")]).unwrap();
        message.set(35, "G");
        let tags: Vec<u32> = message.entries().map(super::map::Entry::tag).collect();
        assert_eq!(tags, vec![35, 55]);
        assert_eq!(message.msg_type().unwrap(), "G");
    }
}
