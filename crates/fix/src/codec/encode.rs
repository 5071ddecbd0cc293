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

//! The frame encoder.
//!
//! Produces `BeginString(8) | BodyLength(9) | body | Checksum(10)` with the
//! standard header generated fresh on every send. Header values are never
//! copied from an application-supplied message; any such values are replaced.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    codec::checksum,
    consts::{SOH, TIMESTAMP_FORMAT},
    dictionary::Tag,
    error::ValidationError,
    message::{Message, map::Entry},
};

/// Tags generated by the encoder itself on each send.
pub(crate) const GENERATED_TAGS: [u32; 10] = [8, 9, 10, 35, 34, 49, 52, 56, 43, 128];

/// Encodes messages into FIX 4.4 wire frames for one configured session.
#[derive(Clone, Debug)]
pub struct Encoder {
    begin_string: String,
    sender_comp_id: String,
    target_comp_id: String,
    ascii_only: bool,
}

impl Encoder {
    /// Creates a new [`Encoder`] instance.
    #[must_use]
    pub fn new(begin_string: &str, sender_comp_id: &str, target_comp_id: &str) -> Self {
        Self {
            begin_string: begin_string.to_string(),
            sender_comp_id: sender_comp_id.to_string(),
            target_comp_id: target_comp_id.to_string(),
            ascii_only: true,
        }
    }

    /// Permits non-ASCII field values (lenient CP1252 interop).
    #[must_use]
    pub const fn with_lenient_encoding(mut self) -> Self {
        self.ascii_only = false;
        self
    }

    /// Encodes `message` into its wire frame, generating the standard header
    /// and trailer.
    ///
    /// The sequence number (34) is taken from the message, which must have
    /// been stamped upstream; `SendingTime` (52) is generated from `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if tag 35 or 34 is absent, or if a field value
    /// contains SOH (or non-ASCII bytes under strict encoding).
    pub fn encode(&self, message: &Message, now: DateTime<Utc>) -> Result<Bytes, ValidationError> {
        message.validate()?;
        let msg_type = message.msg_type()?;
        let seq_num = message.seq_num()?;

        let mut body = Vec::with_capacity(256);
        push_field(&mut body, 35, msg_type.as_bytes());
        push_field(&mut body, 34, seq_num.to_string().as_bytes());
        push_field(&mut body, 49, self.sender_comp_id.as_bytes());
        push_field(
            &mut body,
            52,
            now.format(TIMESTAMP_FORMAT).to_string().as_bytes(),
        );
        push_field(&mut body, 56, self.target_comp_id.as_bytes());
        if let Some(poss_dup) = message.get(Tag::PossDupFlag.code()) {
            push_field(&mut body, 43, poss_dup.value().as_bytes());
        }
        if let Some(deliver_to) = message.get(Tag::DeliverToCompID.code()) {
            push_field(&mut body, 128, deliver_to.value().as_bytes());
        }

        for entry in message.entries() {
            if GENERATED_TAGS.contains(&entry.tag()) {
                continue;
            }
            self.validate_entry(entry)?;
            entry.to_wire(&mut body);
        }

        let mut frame = Vec::with_capacity(body.len() + 32);
        push_field(&mut frame, 8, self.begin_string.as_bytes());
        push_field(&mut frame, 9, body.len().to_string().as_bytes());
        frame.extend_from_slice(&body);

        let checksum = checksum(&frame);
        push_field(&mut frame, 10, format!("{checksum:03}").as_bytes());

        Ok(Bytes::from(frame))
    }

    fn validate_entry(&self, entry: &Entry) -> Result<(), ValidationError> {
        match entry {
            Entry::Field(field) => {
                let bytes = field.value().as_bytes();
                if bytes.contains(&SOH) {
                    return Err(ValidationError::InvalidValue {
                        tag: field.tag(),
                        reason: "value contains SOH".to_string(),
                    });
                }
                if self.ascii_only && !bytes.is_ascii() {
                    return Err(ValidationError::InvalidValue {
                        tag: field.tag(),
                        reason: "value is not ASCII".to_string(),
                    });
                }
                Ok(())
            }
            Entry::Group(group) => {
                self.validate_entry(&Entry::Field(group.identifier().clone()))?;
                for instance in group.instances() {
                    for entry in instance.entries() {
                        self.validate_entry(entry)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn push_field(buf: &mut Vec<u8>, tag: u32, value: &[u8]) {
    buf.extend_from_slice(tag.to_string().as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value);
    buf.push(SOH);
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn encoder() -> Encoder {
        Encoder::new("FIX.4.4", "SENDER", "TARGET")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 12, 6, 10, 24, 27).unwrap()
    }

    #[rstest]
    fn test_encode_generates_header_in_order() {
        let message = Message::from_pairs([(35, "0"), (34, "3")]).unwrap();
        let frame = encoder().encode(&message, now()).unwrap();

        let expected =
            "8=FIX.4.4\x019=55\x0135=0\x0134=3\x0149=SENDER\x0152=20181206-10:24:27.000\x0156=TARGET\x01";
        assert!(frame.starts_with(expected.as_bytes()));
    }

    #[rstest]
    fn test_encode_replaces_supplied_header_values() {
        // Application-supplied 49/52/56 must be replaced, not copied.
        let message = Message::from_pairs([
            (35, "0"),
            (34, "1"),
            (49, "SPOOFED"),
            (52, "19700101-00:00:00.000"),
            (56, "ELSEWHERE"),
        ])
        .unwrap();
        let frame = encoder().encode(&message, now()).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        assert!(text.contains("49=SENDER\x01"));
        assert!(text.contains("56=TARGET\x01"));
        assert!(text.contains("52=20181206-10:24:27.000\x01"));
        assert!(!text.contains("SPOOFED"));
        assert!(!text.contains("ELSEWHERE"));
    }

    #[rstest]
    fn test_encode_requires_msg_type() {
        let message = Message::from_pairs([(34, "1"), (58, "text")]).unwrap();
        assert_eq!(
            encoder().encode(&message, now()).unwrap_err(),
            ValidationError::MissingMsgType
        );
    }

    #[rstest]
    fn test_encode_carries_poss_dup_and_deliver_to() {
        let mut message = Message::from_pairs([(35, "0"), (34, "9")]).unwrap();
        message.set(43, "Y");
        message.set(128, "THIRDPARTY");
        let frame = encoder().encode(&message, now()).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        assert!(text.contains("56=TARGET\x0143=Y\x01128=THIRDPARTY\x01"));
    }

    #[rstest]
    fn test_encode_rejects_soh_in_value() {
        let mut message = Message::from_pairs([(35, "0"), (34, "1")]).unwrap();
        message.set(58, "bad\x01value");
        assert!(matches!(
            encoder().encode(&message, now()),
            Err(ValidationError::InvalidValue { tag: 58, .. })
        ));
    }

    #[rstest]
    fn test_encode_rejects_non_ascii_when_strict() {
        let mut message = Message::from_pairs([(35, "0"), (34, "1")]).unwrap();
        message.set(58, "héllo");
        assert!(encoder().encode(&message, now()).is_err());
        assert!(
            encoder()
                .with_lenient_encoding()
                .encode(&message, now())
                .is_ok()
        );
    }

    #[rstest]
    fn test_body_length_counts_from_tag_35() {
        let message = Message::from_pairs([(35, "0"), (34, "1")]).unwrap();
        let frame = encoder().encode(&message, now()).unwrap();
        let text = std::str::from_utf8(&frame).unwrap();

        let body_start = text.find("35=").unwrap();
        let body_end = text.find("10=").unwrap();
        let declared: usize = text
            .split('\x01')
            .find_map(|f| f.strip_prefix("9="))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(declared, body_end - body_start);
    }

    #[rstest]
    fn test_checksum_is_three_digits_mod_256() {
        let message = Message::from_pairs([(35, "0"), (34, "1")]).unwrap();
        let frame = encoder().encode(&message, now()).unwrap();

        let checksum_start = frame.len() - 7; // "10=NNN\x01"
        assert_eq!(&frame[checksum_start..checksum_start + 3], b"10=");
        let declared: u32 = std::str::from_utf8(&frame[checksum_start + 3..frame.len() - 1])
            .unwrap()
            .parse()
            .unwrap();
        let computed = frame[..checksum_start]
            .iter()
            .map(|&b| u32::from(b))
            .sum::<u32>()
            % 256;
        assert_eq!(declared, computed);
    }
}
