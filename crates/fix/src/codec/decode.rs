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

//! The frame decoder.
//!
//! Accepts raw SOH-delimited bytes and yields a [`Message`], parsing nested
//! repeating groups against the declared templates. Fields preceding the
//! BeginString are discarded (with a debug log). Declared body length and
//! checksum are not verified against their computation unless the decoder is
//! strict; the lenient default tolerates minor counterparty drift.

use bytes::Bytes;

use crate::{
    codec::{checksum, templates::GroupTemplates},
    consts::SOH,
    dictionary::Tag,
    error::ParseError,
    message::{
        Message,
        field::Field,
        group::Group,
        map::{Entry, FieldMap},
    },
};

/// Decodes FIX 4.4 wire frames into messages.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    templates: GroupTemplates,
    strict: bool,
}

impl Decoder {
    /// Creates a new [`Decoder`] instance with the given group templates.
    #[must_use]
    pub fn new(templates: GroupTemplates) -> Self {
        Self {
            templates,
            strict: false,
        }
    }

    /// Upgrades body-length and checksum drift to parse failures.
    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Decodes a single raw frame into a [`Message`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame has no BeginString or Checksum field, a
    /// non-group tag repeats, a group identifier has no template for the
    /// message type, or (in strict mode) the declared length or checksum does
    /// not match the computation.
    pub fn decode(&self, data: &[u8]) -> Result<Message, ParseError> {
        let start = find_message_start(data)?;
        if start > 0 {
            tracing::debug!(
                "Discarding bytes that precede BeginString (8): {}",
                String::from_utf8_lossy(&data[..start]),
            );
        }
        let data = &data[start..];

        let checksum_pos = find_checksum(data)?;
        if self.strict {
            verify_frame(data, checksum_pos)?;
        }

        let end = data[checksum_pos..]
            .iter()
            .position(|&b| b == SOH)
            .map_or(data.len(), |p| checksum_pos + p + 1);

        let pairs = split_pairs(&data[..end])?;
        let msg_type = pairs
            .iter()
            .find(|(tag, _)| *tag == Tag::MsgType.code())
            .map(|(_, value)| String::from_utf8_lossy(value).into_owned())
            .unwrap_or_default();

        let mut idx = 0;
        let fields = self.parse_level(&pairs, &mut idx, &msg_type)?;

        Ok(Message::from_field_map(fields))
    }

    /// Parses fields at one nesting level until the input is exhausted.
    fn parse_level(
        &self,
        pairs: &[(u32, Bytes)],
        idx: &mut usize,
        msg_type: &str,
    ) -> Result<FieldMap, ParseError> {
        let mut map = FieldMap::new();

        while *idx < pairs.len() {
            let (tag, value) = &pairs[*idx];

            if self.templates.is_identifier(*tag) {
                let group = self.parse_group(pairs, idx, msg_type)?;
                map.insert(Entry::Group(group))
                    .map_err(|_| ParseError::DuplicateTag(*tag))?;
                continue;
            }

            map.insert(Entry::Field(Field::new(*tag, value.clone())))
                .map_err(|_| ParseError::DuplicateTag(*tag))?;
            *idx += 1;
        }

        Ok(map)
    }

    /// Parses one repeating group starting at the identifier pair.
    ///
    /// Instances are delimited by the reappearance of a tag already present
    /// in the current instance; a tag outside the template ends the group.
    fn parse_group(
        &self,
        pairs: &[(u32, Bytes)],
        idx: &mut usize,
        msg_type: &str,
    ) -> Result<Group, ParseError> {
        let (identifier_tag, identifier_value) = &pairs[*idx];
        let template = self
            .templates
            .template_for(*identifier_tag, msg_type)
            .ok_or_else(|| ParseError::UnknownGroupTemplate {
                tag: *identifier_tag,
                msg_type: msg_type.to_string(),
            })?
            .to_vec();
        *idx += 1;

        let identifier = Field::new(*identifier_tag, identifier_value.clone());
        let mut group = Group::new(identifier, template.clone());
        let mut instance = FieldMap::new();

        while *idx < pairs.len() {
            let (tag, value) = &pairs[*idx];

            if !template.contains(tag) {
                break;
            }

            if instance.contains(*tag) {
                group
                    .push_instance(std::mem::take(&mut instance))
                    .map_err(|e| ParseError::InvalidField(e.to_string()))?;
            }

            if self.templates.is_identifier(*tag) {
                let nested = self.parse_group(pairs, idx, msg_type)?;
                instance
                    .insert(Entry::Group(nested))
                    .map_err(|_| ParseError::DuplicateTag(*tag))?;
                continue;
            }

            instance
                .insert(Entry::Field(Field::new(*tag, value.clone())))
                .map_err(|_| ParseError::DuplicateTag(*tag))?;
            *idx += 1;
        }

        if !instance.is_empty() {
            group
                .push_instance(instance)
                .map_err(|e| ParseError::InvalidField(e.to_string()))?;
        }

        group
            .validate()
            .map_err(|e| ParseError::InvalidField(e.to_string()))?;

        Ok(group)
    }
}

/// Locates the first `8=` prefixed by start-of-buffer or SOH.
fn find_message_start(data: &[u8]) -> Result<usize, ParseError> {
    let finder = memchr::memmem::Finder::new(b"8=");
    for pos in finder.find_iter(data) {
        if pos == 0 || data[pos - 1] == SOH {
            return Ok(pos);
        }
    }
    Err(ParseError::MissingBeginString)
}

/// Locates `10=` prefixed by SOH, returning the index of the `1`.
fn find_checksum(data: &[u8]) -> Result<usize, ParseError> {
    let finder = memchr::memmem::Finder::new(b"\x0110=");
    finder
        .find(data)
        .map(|p| p + 1)
        .ok_or(ParseError::MissingChecksum)
}

/// Verifies declared body length and checksum against the frame bytes.
fn verify_frame(data: &[u8], checksum_pos: usize) -> Result<(), ParseError> {
    let declared_checksum = parse_value_at(data, checksum_pos)
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| ParseError::InvalidField("unreadable Checksum (10)".to_string()))?;
    let computed = checksum(&data[..checksum_pos]);
    if declared_checksum != computed {
        return Err(ParseError::ChecksumMismatch {
            declared: declared_checksum,
            computed,
        });
    }

    let body_start = memchr::memmem::find(data, b"\x0135=")
        .map(|p| p + 1)
        .ok_or_else(|| ParseError::InvalidField("no MsgType (35) in frame".to_string()))?;
    let declared_length = memchr::memmem::find(data, b"\x019=")
        .map(|p| p + 1)
        .and_then(|p| parse_value_at(data, p))
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| ParseError::InvalidField("unreadable BodyLength (9)".to_string()))?;
    let actual = checksum_pos - body_start;
    if declared_length != actual {
        return Err(ParseError::LengthMismatch {
            declared: declared_length,
            actual,
        });
    }

    Ok(())
}

/// Returns the value bytes of the `tag=value` pair starting at `pos`.
fn parse_value_at(data: &[u8], pos: usize) -> Option<&[u8]> {
    let eq = memchr::memchr(b'=', &data[pos..])? + pos;
    let end = memchr::memchr(SOH, &data[eq..]).map_or(data.len(), |p| eq + p);
    Some(&data[eq + 1..end])
}

/// Splits a frame into `(tag, value)` pairs on SOH.
fn split_pairs(data: &[u8]) -> Result<Vec<(u32, Bytes)>, ParseError> {
    let mut pairs = Vec::new();
    for raw in data.split(|&b| b == SOH) {
        if raw.is_empty() {
            continue;
        }
        let eq = memchr::memchr(b'=', raw)
            .ok_or_else(|| ParseError::InvalidField(String::from_utf8_lossy(raw).into_owned()))?;
        let tag: u32 = std::str::from_utf8(&raw[..eq])
            .ok()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| {
                ParseError::InvalidField(format!(
                    "tag '{}' must be an integer",
                    String::from_utf8_lossy(&raw[..eq])
                ))
            })?;
        pairs.push((tag, Bytes::copy_from_slice(&raw[eq + 1..])));
    }
    Ok(pairs)
}
